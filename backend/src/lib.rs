pub mod models;
pub mod db;
pub mod services;
pub mod handlers;
pub mod utils;
pub mod constants;
pub mod error;

#[cfg(test)]
mod test_support;

pub use utils::config::Config;
pub use db::connection::get_db_pool;
pub use db::UnitOfWork;
pub use error::{CoreError, CoreResult, ErrorKind, Outcome};

// Re-export common types
pub use sqlx::SqlitePool;
pub use anyhow::Result;
pub use chrono::{DateTime, Utc};
