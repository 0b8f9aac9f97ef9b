//! Persistence for the user registry and the attendance event log.
//!
//! Both live behind one trait so that a check-in/out can commit the new event
//! and the user's new state as a single unit.

pub mod memory;
pub mod mysql;
pub mod seed;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{attendance::AttendanceEvent, user::User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("username already exists: {0}")]
    UsernameTaken(String),

    #[error("user not found: {0}")]
    UserNotFound(Uuid),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// All users in registration order.
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Registers a new user. Fails with `UsernameTaken` on a clash.
    async fn create_user(&self, user: &User) -> StoreResult<()>;

    /// Rewrites name, username and password hash of an existing user. Role,
    /// status and `last_check_in` are left alone, so an edit never undoes a
    /// concurrent check-in/out. Returns `false` when no such user exists.
    async fn update_profile(&self, user: &User) -> StoreResult<bool>;

    /// Returns `false` when no such user existed. Events of the user are kept.
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;

    /// Every recorded event. Callers must not rely on the order.
    async fn list_events(&self) -> StoreResult<Vec<AttendanceEvent>>;

    /// Appends `event` and stores `user.status` and `user.last_check_in` as
    /// one atomic pair. No other column of the user is written.
    async fn commit_toggle(&self, user: &User, event: &AttendanceEvent) -> StoreResult<()>;

    /// Bulk data reset: drops the whole event log and puts every user back
    /// into the checked-out state.
    async fn reset(&self) -> StoreResult<()>;
}
