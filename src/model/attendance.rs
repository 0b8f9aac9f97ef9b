use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::model::user::AttendanceStatus;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    /// Direction of the event emitted when leaving `status`.
    pub fn leaving(status: AttendanceStatus) -> Self {
        match status {
            AttendanceStatus::CheckedOut => Direction::In,
            AttendanceStatus::CheckedIn => Direction::Out,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    #[schema(example = 10.7769)]
    pub latitude: f64,
    #[schema(example = 106.7009)]
    pub longitude: f64,
}

/// Outcome of the geolocation lookup attached to an event.
///
/// On the wire and in storage this is a nullable `location` plus a nullable
/// `location_error`; at most one of them is ever set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LocationFields", into = "LocationFields")]
pub enum LocationFix {
    Fixed(Coordinates),
    Failed(String),
    Skipped,
}

impl LocationFix {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match self {
            LocationFix::Fixed(c) => Some(*c),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LocationFix::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Rebuilds the fix from its column form. Coordinates win if a row somehow
    /// carries both.
    pub fn from_parts(
        latitude: Option<f64>,
        longitude: Option<f64>,
        error: Option<String>,
    ) -> Self {
        match (latitude, longitude, error) {
            (Some(latitude), Some(longitude), _) => LocationFix::Fixed(Coordinates {
                latitude,
                longitude,
            }),
            (_, _, Some(reason)) => LocationFix::Failed(reason),
            _ => LocationFix::Skipped,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LocationFields {
    location: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location_error: Option<String>,
}

impl From<LocationFields> for LocationFix {
    fn from(fields: LocationFields) -> Self {
        match (fields.location, fields.location_error) {
            (Some(c), _) => LocationFix::Fixed(c),
            (None, Some(reason)) => LocationFix::Failed(reason),
            (None, None) => LocationFix::Skipped,
        }
    }
}

impl From<LocationFix> for LocationFields {
    fn from(fix: LocationFix) -> Self {
        match fix {
            LocationFix::Fixed(c) => LocationFields {
                location: Some(c),
                location_error: None,
            },
            LocationFix::Failed(reason) => LocationFields {
                location: None,
                location_error: Some(reason),
            },
            LocationFix::Skipped => LocationFields {
                location: None,
                location_error: None,
            },
        }
    }
}

/// Immutable audit record of one check-in or check-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Name at the time of the event, kept even if the user is renamed later.
    pub user_name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub direction: Direction,
    pub ip: String,
    #[serde(flatten)]
    pub location: LocationFix,
}
