use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::model::role::Role;

/// Recorded attendance state of a user. Every user starts checked out.
#[derive(
    Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
pub enum AttendanceStatus {
    #[serde(rename = "Checked In")]
    #[strum(serialize = "Checked In")]
    CheckedIn,
    #[default]
    #[serde(rename = "Checked Out")]
    #[strum(serialize = "Checked Out")]
    CheckedOut,
}

impl AttendanceStatus {
    pub fn toggled(self) -> Self {
        match self {
            AttendanceStatus::CheckedIn => AttendanceStatus::CheckedOut,
            AttendanceStatus::CheckedOut => AttendanceStatus::CheckedIn,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub status: AttendanceStatus,
    pub last_check_in: Option<DateTime<Utc>>,
}

impl User {
    /// A freshly registered employee: checked out and never checked in.
    pub fn new_employee(name: String, username: String, password_hash: String) -> Self {
        Self::new(name, username, password_hash, Role::Employee)
    }

    pub fn new(name: String, username: String, password_hash: String, role: Role) -> Self {
        Self {
            id: Uuid::now_v7(),
            name,
            username,
            password_hash,
            role,
            status: AttendanceStatus::CheckedOut,
            last_check_in: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_text_matches_display_form() {
        assert_eq!(AttendanceStatus::CheckedIn.to_string(), "Checked In");
        assert_eq!(
            AttendanceStatus::from_str("Checked Out").unwrap(),
            AttendanceStatus::CheckedOut
        );
        assert!(AttendanceStatus::from_str("checked-in").is_err());
    }

    #[test]
    fn new_employee_starts_checked_out() {
        let user = User::new_employee("Alice".into(), "alice".into(), "hash".into());
        assert_eq!(user.role, Role::Employee);
        assert_eq!(user.status, AttendanceStatus::CheckedOut);
        assert!(user.last_check_in.is_none());
        assert_eq!(user.status.toggled(), AttendanceStatus::CheckedIn);
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User::new_employee("Bob".into(), "bob".into(), "secret-hash".into());
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["status"], "Checked Out");
        assert_eq!(json["role"], "EMPLOYEE");
    }
}
