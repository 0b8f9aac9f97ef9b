use anyhow::{Context, Result, anyhow};
use tracing::info;

use crate::auth::password::hash_password;
use crate::model::{role::Role, user::User};
use crate::store::AttendanceStore;

/// Demo employees as `(name, username, password)`.
pub const DEMO_EMPLOYEES: [(&str, &str, &str); 3] = [
    ("Alice", "alice", "alice123"),
    ("Bob", "bob", "bob123"),
    ("Charlie", "charlie", "charlie123"),
];

async fn create(
    store: &dyn AttendanceStore,
    name: &str,
    username: &str,
    password: &str,
    role: Role,
) -> Result<()> {
    let hash =
        hash_password(password).map_err(|e| anyhow!("hashing password of {username}: {e}"))?;
    let user = User::new(name.to_string(), username.to_string(), hash, role);
    store
        .create_user(&user)
        .await
        .with_context(|| format!("creating account {username}"))
}

/// Populates an empty registry with the administrator account and, when
/// `with_demo_employees` is set, the demo employees. Returns `false` when the
/// registry already had users and nothing was written.
pub async fn seed_accounts(
    store: &dyn AttendanceStore,
    admin_username: &str,
    admin_password: &str,
    with_demo_employees: bool,
) -> Result<bool> {
    let users = store.list_users().await.context("listing users")?;
    if !users.is_empty() {
        return Ok(false);
    }

    create(store, "Admin User", admin_username, admin_password, Role::Admin).await?;
    info!(username = admin_username, "Created initial admin account");

    if with_demo_employees {
        for (name, username, password) in DEMO_EMPLOYEES {
            create(store, name, username, password, Role::Employee).await?;
        }
        info!(count = DEMO_EMPLOYEES.len(), "Created demo employees");
    }

    Ok(true)
}
