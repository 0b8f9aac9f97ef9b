use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, MySql, MySqlPool, Transaction};
use uuid::Uuid;

use crate::model::{
    attendance::{AttendanceEvent, Direction, LocationFix},
    role::Role,
    user::{AttendanceStatus, User},
};
use crate::store::{AttendanceStore, StoreError, StoreResult};

/// MySQL-backed store. Schema lives in `migrations/`.
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserSql {
    id: Uuid,
    name: String,
    username: String,
    password_hash: String,
    role_id: u8,
    status: String,
    last_check_in: Option<DateTime<Utc>>,
}

impl TryFrom<UserSql> for User {
    type Error = StoreError;

    fn try_from(row: UserSql) -> Result<Self, Self::Error> {
        let role = Role::from_id(row.role_id)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown role id {}", row.role_id)))?;
        let status = AttendanceStatus::from_str(&row.status)
            .map_err(|_| StoreError::Corrupt(format!("unknown status {:?}", row.status)))?;

        Ok(User {
            id: row.id,
            name: row.name,
            username: row.username,
            password_hash: row.password_hash,
            role,
            status,
            last_check_in: row.last_check_in,
        })
    }
}

#[derive(FromRow)]
struct EventSql {
    id: Uuid,
    user_id: Uuid,
    user_name: String,
    timestamp: DateTime<Utc>,
    direction: String,
    ip: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    location_error: Option<String>,
}

impl TryFrom<EventSql> for AttendanceEvent {
    type Error = StoreError;

    fn try_from(row: EventSql) -> Result<Self, Self::Error> {
        let direction = Direction::from_str(&row.direction)
            .map_err(|_| StoreError::Corrupt(format!("unknown direction {:?}", row.direction)))?;

        Ok(AttendanceEvent {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name,
            timestamp: row.timestamp,
            direction,
            ip: row.ip,
            location: LocationFix::from_parts(row.latitude, row.longitude, row.location_error),
        })
    }
}

const USER_COLUMNS: &str =
    "id, name, username, password_hash, role_id, status, last_check_in";

fn is_duplicate_key(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23000"),
        _ => false,
    }
}

fn write_error(e: sqlx::Error, username: &str) -> StoreError {
    if is_duplicate_key(&e) {
        StoreError::UsernameTaken(username.to_string())
    } else {
        e.into()
    }
}

/// Row-locks the user for the rest of the transaction. `false` if missing.
async fn lock_user(tx: &mut Transaction<'_, MySql>, id: Uuid) -> StoreResult<bool> {
    let row = sqlx::query("SELECT id FROM users WHERE id = ? FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.is_some())
}

async fn insert_event(tx: &mut Transaction<'_, MySql>, event: &AttendanceEvent) -> StoreResult<()> {
    let coordinates = event.location.coordinates();

    sqlx::query(
        r#"
        INSERT INTO attendance_events
        (id, user_id, user_name, timestamp, direction, ip, latitude, longitude, location_error)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(event.id)
    .bind(event.user_id)
    .bind(&event.user_name)
    .bind(event.timestamp)
    .bind(event.direction.to_string())
    .bind(&event.ip)
    .bind(coordinates.map(|c| c.latitude))
    .bind(coordinates.map(|c| c.longitude))
    .bind(event.location.error())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserSql>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserSql>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        // v7 ids sort by creation time
        sqlx::query_as::<_, UserSql>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn create_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.id())
        .bind(user.status.to_string())
        .bind(user.last_check_in)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, &user.username))?;

        Ok(())
    }

    async fn update_profile(&self, user: &User) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        if !lock_user(&mut tx, user.id).await? {
            return Ok(false);
        }

        sqlx::query("UPDATE users SET name = ?, username = ?, password_hash = ? WHERE id = ?")
            .bind(&user.name)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| write_error(e, &user.username))?;

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_events(&self) -> StoreResult<Vec<AttendanceEvent>> {
        sqlx::query_as::<_, EventSql>(
            r#"
            SELECT id, user_id, user_name, timestamp, direction, ip,
                   latitude, longitude, location_error
            FROM attendance_events
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(AttendanceEvent::try_from)
        .collect()
    }

    async fn commit_toggle(&self, user: &User, event: &AttendanceEvent) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        // Dropping `tx` on any early return rolls back both writes.
        if !lock_user(&mut tx, user.id).await? {
            return Err(StoreError::UserNotFound(user.id));
        }

        sqlx::query("UPDATE users SET status = ?, last_check_in = ? WHERE id = ?")
            .bind(user.status.to_string())
            .bind(user.last_check_in)
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
        insert_event(&mut tx, event).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn reset(&self) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM attendance_events")
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE users SET status = ?, last_check_in = NULL")
            .bind(AttendanceStatus::CheckedOut.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
