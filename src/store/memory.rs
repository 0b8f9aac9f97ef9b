use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{
    attendance::AttendanceEvent,
    user::{AttendanceStatus, User},
};
use crate::store::{AttendanceStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    events: Vec<AttendanceEvent>,
}

/// Process-local store. Users and events share one lock, so readers see a
/// toggle either completely or not at all.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Tables {
    fn ensure_username_free(&self, user: &User) -> StoreResult<()> {
        let taken = self
            .users
            .iter()
            .any(|u| u.id != user.id && u.username.eq_ignore_ascii_case(&user.username));
        if taken {
            return Err(StoreError::UsernameTaken(user.username.clone()));
        }
        Ok(())
    }

    fn user_mut(&mut self, id: Uuid) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.read().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .read()
            .users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.read().users.clone())
    }

    async fn create_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.write();
        tables.ensure_username_free(user)?;
        tables.users.push(user.clone());
        Ok(())
    }

    async fn update_profile(&self, user: &User) -> StoreResult<bool> {
        let mut tables = self.write();
        tables.ensure_username_free(user)?;
        let Some(existing) = tables.user_mut(user.id) else {
            return Ok(false);
        };
        existing.name = user.name.clone();
        existing.username = user.username.clone();
        existing.password_hash = user.password_hash.clone();
        Ok(true)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.write();
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        Ok(tables.users.len() != before)
    }

    async fn list_events(&self) -> StoreResult<Vec<AttendanceEvent>> {
        Ok(self.read().events.clone())
    }

    async fn commit_toggle(&self, user: &User, event: &AttendanceEvent) -> StoreResult<()> {
        let mut tables = self.write();
        let existing = tables
            .user_mut(user.id)
            .ok_or(StoreError::UserNotFound(user.id))?;
        existing.status = user.status;
        existing.last_check_in = user.last_check_in;
        tables.events.push(event.clone());
        Ok(())
    }

    async fn reset(&self) -> StoreResult<()> {
        let mut tables = self.write();
        tables.events.clear();
        for user in tables.users.iter_mut() {
            user.status = AttendanceStatus::CheckedOut;
            user.last_check_in = None;
        }
        Ok(())
    }
}
