//! Core operations. Each takes the caller's [`UnitOfWork`](crate::db::UnitOfWork)
//! and performs one atomic step of the presence and matchmaking flow.

pub mod matches;
pub mod presence;
pub mod profiles;
pub mod proximity;
pub mod requests;
pub mod trust;

use sqlx::SqliteConnection;

use crate::db::users;
use crate::error::{CoreError, CoreResult};
use crate::models::User;

pub(crate) async fn require_user(conn: &mut SqliteConnection, user_id: i64) -> CoreResult<User> {
    users::get_user_by_id(conn, user_id)
        .await?
        .ok_or(CoreError::NotFound("user"))
}
