use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

/// Users with a check-in/out currently being processed.
#[derive(Debug, Default)]
pub struct InFlight {
    users: Mutex<HashSet<Uuid>>,
}

impl InFlight {
    fn lock(&self) -> MutexGuard<'_, HashSet<Uuid>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `None` when `user` already has an operation in flight.
    pub fn try_acquire(&self, user: Uuid) -> Option<InFlightGuard<'_>> {
        let inserted = self.lock().insert(user);
        inserted.then(|| InFlightGuard { owner: self, user })
    }

    pub fn is_busy(&self, user: Uuid) -> bool {
        self.lock().contains(&user)
    }
}

/// Releases the user on drop, whichever way the operation ends.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    user: Uuid,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.owner.lock().remove(&self.user);
    }
}
