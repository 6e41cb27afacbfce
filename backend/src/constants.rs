// =============================================================================
// Spotlight Backend Constants
// =============================================================================
// This file contains all constants used throughout the backend to enable
// easy tuning and configuration from a single location.

// =============================================================================
// PRESENCE
// =============================================================================

/// How long a beacon stays live when no meet time was given
pub const BEACON_DEFAULT_TTL_MINUTES: i64 = 90;

/// How long a beacon stays live when the owner proposed a meet time
pub const BEACON_SCHEDULED_TTL_MINUTES: i64 = 120;

/// Search radius for nearby beacons
pub const NEARBY_RADIUS_KM: f64 = 5.0;

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

// =============================================================================
// REQUESTS
// =============================================================================

/// Pending requests older than this are purged on next touch
pub const PENDING_REQUEST_TTL_MINUTES: i64 = 60;

// =============================================================================
// TRUST
// =============================================================================

/// Trust score assigned at signup
pub const DEFAULT_TRUST_SCORE: i64 = 100;

/// Lowest trust score a user can reach
pub const MIN_TRUST_SCORE: i64 = 50;

/// Highest trust score a user can reach
pub const MAX_TRUST_SCORE: i64 = 150;

/// Lowest accepted rating
pub const MIN_RATING: i64 = 1;

/// Highest accepted rating
pub const MAX_RATING: i64 = 10;

/// Rating that leaves trust untouched
pub const NEUTRAL_RATING: i64 = 5;

/// Repeat reviews for the same pair inside this window replace the earlier one
pub const FEEDBACK_DEDUPE_WINDOW_MINUTES: i64 = 60;

/// Page size used when only `page` is given
pub const DEFAULT_FEEDBACK_PER_PAGE: u32 = 20;

/// Upper bound for `per_page` when listing feedback
pub const MAX_FEEDBACK_PER_PAGE: u32 = 100;

// =============================================================================
// TEXT LIMITS
// =============================================================================

/// Character limit for bios, clues, places, intents and review comments
pub const TEXT_CHAR_LIMIT: usize = 280;

/// Character limit for the reason given when ending a match
pub const END_REASON_CHAR_LIMIT: usize = 280;

/// Username length bounds
pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 32;

// =============================================================================
// SERVER CONFIGURATION
// =============================================================================

/// Default server port if not specified in environment
pub const DEFAULT_SERVER_PORT: u16 = 3000;

/// Header the upstream auth gateway uses to pass the authenticated user id
pub const ACTOR_HEADER: &str = "x-user-id";

// =============================================================================
// HELPER FUNCTIONS FOR VALIDATION
// =============================================================================

/// Validates if a latitude/longitude pair is a usable WGS84 coordinate
pub fn is_valid_coordinate(lat: f64, lon: f64) -> bool {
    lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Validates that free text fits the shared character limit
pub fn fits_text_limit(text: &str) -> bool {
    text.chars().count() <= TEXT_CHAR_LIMIT
}
