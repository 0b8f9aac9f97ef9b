use tracing::debug;

use crate::auth::password::verify_password;
use crate::model::user::User;
use crate::store::{AttendanceStore, StoreResult};

/// The user owning `username` if `password` matches its hash.
///
/// Unknown usernames and wrong passwords both yield `None`.
pub async fn find_by_credentials(
    store: &dyn AttendanceStore,
    username: &str,
    password: &str,
) -> StoreResult<Option<User>> {
    let Some(user) = store.find_by_username(username.trim()).await? else {
        debug!("No user with that username");
        return Ok(None);
    };

    match verify_password(password, &user.password_hash) {
        Ok(()) => Ok(Some(user)),
        Err(e) => {
            debug!(error = %e, "Password mismatch");
            Ok(None)
        }
    }
}
