use serde::Serialize;
use thiserror::Error;

/// Broad class of a core failure, so callers can branch without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Internal,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    Invalid(&'static str),

    #[error("coordinates must be finite WGS84 degrees")]
    InvalidCoordinates,

    #[error("unknown action: {0}")]
    InvalidAction(String),

    #[error("rating must be between 1 and 10, got {0}")]
    InvalidRating(i64),

    #[error("{field} exceeds {max} characters")]
    TextTooLong { field: &'static str, max: usize },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("match not found")]
    MatchNotFound,

    #[error("one of the users is already matched")]
    AlreadyMatched,

    #[error("a pending request to this user already exists")]
    AlreadySent,

    #[error("username already taken")]
    UsernameTaken,

    #[error("no active match")]
    NoActiveMatch,

    #[error("a reason is required to end a match you have not marked as reached")]
    ReasonRequired,

    #[error("reason exceeds {max} characters")]
    ReasonTooLong { max: usize },

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Invalid(_)
            | CoreError::InvalidCoordinates
            | CoreError::InvalidAction(_)
            | CoreError::InvalidRating(_)
            | CoreError::TextTooLong { .. }
            | CoreError::ReasonTooLong { .. } => ErrorKind::Validation,
            CoreError::NotFound(_) | CoreError::MatchNotFound => ErrorKind::NotFound,
            CoreError::AlreadyMatched
            | CoreError::AlreadySent
            | CoreError::UsernameTaken
            | CoreError::NoActiveMatch
            | CoreError::ReasonRequired => ErrorKind::Conflict,
            CoreError::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code returned to clients.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Invalid(_) => "invalid",
            CoreError::InvalidCoordinates => "invalid_coordinates",
            CoreError::InvalidAction(_) => "invalid_action",
            CoreError::InvalidRating(_) => "invalid_rating",
            CoreError::TextTooLong { .. } => "text_too_long",
            CoreError::NotFound(_) => "not_found",
            CoreError::MatchNotFound => "match_not_found",
            CoreError::AlreadyMatched => "already_matched",
            CoreError::AlreadySent => "already_sent",
            CoreError::UsernameTaken => "username_taken",
            CoreError::NoActiveMatch => "no_active_match",
            CoreError::ReasonRequired => "reason_required",
            CoreError::ReasonTooLong { .. } => "reason_too_long",
            CoreError::Storage(_) => "internal",
        }
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Success of an operation that tolerates replay.
///
/// `AlreadyApplied` means the effect was produced earlier, by this caller or a
/// concurrent one, and nothing changed during this call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    Applied(T),
    AlreadyApplied(T),
}

impl<T> Outcome<T> {
    pub fn is_already_applied(&self) -> bool {
        matches!(self, Outcome::AlreadyApplied(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Outcome::Applied(value) | Outcome::AlreadyApplied(value) => value,
        }
    }
}

/// Unique-index violations surface as conflicts instead of storage failures.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
