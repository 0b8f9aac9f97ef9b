use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::attendance::{
    inflight::InFlight,
    lookup::{Geolocator, IpLookup, LookupError},
};
use crate::model::{
    attendance::{AttendanceEvent, Direction, LocationFix},
    user::{AttendanceStatus, User},
};
use crate::store::{AttendanceStore, StoreError};

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("Another check-in/out is already in progress. Please wait.")]
    Busy,

    #[error("Check-in process failed. Please try again.")]
    IpLookup(#[source] LookupError),

    #[error("Invalid QR Code. Please scan the official TimeGuard code.")]
    InvalidQrPayload,

    #[error("User not found.")]
    UserNotFound(Uuid),

    #[error("Check-in process failed. Please try again.")]
    Store(#[from] StoreError),
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Outcome of a successful toggle.
#[derive(Debug, Clone, Serialize)]
pub struct Toggled {
    pub status: AttendanceStatus,
    pub event: AttendanceEvent,
    pub message: String,
}

/// Compares the decoded QR text with the expected attendance payload.
pub fn validate_qr_payload(decoded: &str, expected: &str) -> Result<(), AttendanceError> {
    if decoded == expected {
        Ok(())
    } else {
        Err(AttendanceError::InvalidQrPayload)
    }
}

/// Check-in/out state machine over an injected store.
pub struct AttendanceService {
    store: Arc<dyn AttendanceStore>,
    clock: Arc<dyn Clock>,
    in_flight: InFlight,
}

impl AttendanceService {
    pub fn new(store: Arc<dyn AttendanceStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn AttendanceStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            in_flight: InFlight::default(),
        }
    }

    pub fn store(&self) -> &dyn AttendanceStore {
        self.store.as_ref()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn is_busy(&self, user_id: Uuid) -> bool {
        self.in_flight.is_busy(user_id)
    }

    /// Flips the user between checked in and checked out and records the
    /// matching event.
    ///
    /// A second call for the same user while one is pending fails with
    /// [`AttendanceError::Busy`]. The IP address is required; a failed
    /// geolocation is recorded on the event and does not abort. Passing no
    /// geolocator records the location as skipped.
    #[instrument(name = "attendance_toggle", skip(self, ip, geo), fields(user_id = %user_id))]
    pub async fn toggle(
        &self,
        user_id: Uuid,
        ip: &dyn IpLookup,
        geo: Option<&dyn Geolocator>,
    ) -> Result<Toggled, AttendanceError> {
        let Some(_guard) = self.in_flight.try_acquire(user_id) else {
            info!("Rejected: toggle already in flight");
            return Err(AttendanceError::Busy);
        };

        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(AttendanceError::UserNotFound(user_id))?;

        let ip = ip.current_ip().await.map_err(|e| {
            error!(error = %e, "IP lookup failed");
            AttendanceError::IpLookup(e)
        })?;

        let location = match geo {
            Some(geo) => match geo.current_coordinates().await {
                Ok(coordinates) => LocationFix::Fixed(coordinates),
                Err(e) => {
                    warn!(error = %e, "Geolocation failed, recording without location");
                    LocationFix::Failed(e.to_string())
                }
            },
            None => LocationFix::Skipped,
        };

        let now = self.clock.now();
        let direction = Direction::leaving(user.status);
        let event = AttendanceEvent {
            id: Uuid::now_v7(),
            user_id: user.id,
            user_name: user.name.clone(),
            timestamp: now,
            direction,
            ip,
            location,
        };

        let status = user.status.toggled();
        let updated = User {
            status,
            last_check_in: match status {
                AttendanceStatus::CheckedIn => Some(now),
                AttendanceStatus::CheckedOut => user.last_check_in,
            },
            ..user
        };

        self.store.commit_toggle(&updated, &event).await.map_err(|e| {
            error!(error = %e, "Failed to commit attendance toggle");
            AttendanceError::from(e)
        })?;

        debug!(event_id = %event.id, %direction, "Attendance event recorded");
        info!(%status, "Attendance toggled");

        Ok(Toggled {
            status,
            message: format!("Successfully Checked {direction}!"),
            event,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::lookup::{PeerIp, ReportedLocation};
    use crate::model::attendance::Coordinates;
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use futures::channel::oneshot;
    use futures::lock::Mutex as AsyncMutex;
    use std::sync::Mutex;

    struct SteppingClock(Mutex<DateTime<Utc>>);

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut now = self.0.lock().unwrap();
            let current = *now;
            *now += Duration::minutes(30);
            current
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 1, 0, 0).unwrap()
    }

    async fn setup() -> (Arc<MemoryStore>, AttendanceService, User) {
        let store = Arc::new(MemoryStore::new());
        let alice = User::new_employee("Alice".into(), "alice".into(), "h".into());
        store.create_user(&alice).await.unwrap();
        let clock = Arc::new(SteppingClock(Mutex::new(start())));
        let service = AttendanceService::with_clock(store.clone(), clock);
        (store, service, alice)
    }

    fn ip() -> PeerIp {
        PeerIp::from_remote(Some("203.0.113.9:40000"))
    }

    #[actix_web::test]
    async fn toggles_in_then_out() {
        let (store, service, alice) = setup().await;

        let first = service.toggle(alice.id, &ip(), None).await.unwrap();
        assert_eq!(first.status, AttendanceStatus::CheckedIn);
        assert_eq!(first.event.direction, Direction::In);
        assert_eq!(first.message, "Successfully Checked in!");
        assert_eq!(first.event.ip, "203.0.113.9");
        assert_eq!(first.event.user_name, "Alice");
        assert_eq!(first.event.location, LocationFix::Skipped);

        let second = service.toggle(alice.id, &ip(), None).await.unwrap();
        assert_eq!(second.status, AttendanceStatus::CheckedOut);
        assert_eq!(second.message, "Successfully Checked out!");

        let stored = store.find_user(alice.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AttendanceStatus::CheckedOut);
        // leaving does not touch the last check-in
        assert_eq!(stored.last_check_in, Some(start()));
        assert_eq!(store.list_events().await.unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn profile_edit_from_an_earlier_read_keeps_direction() {
        let (store, service, alice) = setup().await;
        let mut form = store.find_user(alice.id).await.unwrap().unwrap();

        service.toggle(alice.id, &ip(), None).await.unwrap();
        form.name = "Alice Nguyen".into();
        assert!(store.update_profile(&form).await.unwrap());

        let next = service.toggle(alice.id, &ip(), None).await.unwrap();
        assert_eq!(next.event.direction, Direction::Out);
        assert_eq!(next.event.user_name, "Alice Nguyen");
        assert_eq!(next.status, AttendanceStatus::CheckedOut);
    }

    #[actix_web::test]
    async fn geolocation_failure_still_commits() {
        let (store, service, alice) = setup().await;
        let geo = ReportedLocation::Failed("User denied Geolocation".into());

        let toggled = service.toggle(alice.id, &ip(), Some(&geo)).await.unwrap();
        assert_eq!(
            toggled.event.location,
            LocationFix::Failed("User denied Geolocation".into())
        );
        assert_eq!(toggled.event.location.coordinates(), None);

        let events = store.list_events().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].location.error(), Some("User denied Geolocation"));
    }

    #[actix_web::test]
    async fn coordinates_are_recorded() {
        let (_store, service, alice) = setup().await;
        let here = Coordinates {
            latitude: 21.0285,
            longitude: 105.8542,
        };
        let geo = ReportedLocation::Fixed(here);
        let toggled = service.toggle(alice.id, &ip(), Some(&geo)).await.unwrap();
        assert_eq!(toggled.event.location, LocationFix::Fixed(here));
    }

    #[actix_web::test]
    async fn ip_failure_aborts_without_writing() {
        let (store, service, alice) = setup().await;

        let err = service
            .toggle(alice.id, &PeerIp::from_remote(None), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::IpLookup(LookupError::Network(_))));
        assert_eq!(err.to_string(), "Check-in process failed. Please try again.");

        assert!(store.list_events().await.unwrap().is_empty());
        let stored = store.find_user(alice.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AttendanceStatus::CheckedOut);
        assert!(stored.last_check_in.is_none());
        assert!(!service.is_busy(alice.id));
    }

    #[actix_web::test]
    async fn unknown_user_is_reported() {
        let (_store, service, _alice) = setup().await;
        let ghost = Uuid::now_v7();
        let err = service.toggle(ghost, &ip(), None).await.unwrap_err();
        assert!(matches!(err, AttendanceError::UserNotFound(id) if id == ghost));
        assert!(!service.is_busy(ghost));
    }

    /// IP lookup that stays pending until released.
    struct GatedIp(AsyncMutex<Option<oneshot::Receiver<()>>>);

    #[async_trait]
    impl IpLookup for GatedIp {
        async fn current_ip(&self) -> Result<String, LookupError> {
            if let Some(gate) = self.0.lock().await.take() {
                let _ = gate.await;
            }
            Ok("198.51.100.1".into())
        }
    }

    #[actix_web::test]
    async fn concurrent_toggle_is_busy() {
        let (store, service, alice) = setup().await;
        let (release, gate) = oneshot::channel();
        let gated = GatedIp(AsyncMutex::new(Some(gate)));

        let pending = service.toggle(alice.id, &gated, None);
        let second = async {
            let result = service.toggle(alice.id, &ip(), None).await;
            assert!(store.list_events().await.unwrap().is_empty());
            let _ = release.send(());
            result
        };

        let (first, second) = futures::join!(pending, second);
        assert!(matches!(second, Err(AttendanceError::Busy)));
        assert_eq!(first.unwrap().status, AttendanceStatus::CheckedIn);
        assert_eq!(store.list_events().await.unwrap().len(), 1);
        assert!(!service.is_busy(alice.id));
    }

    #[test]
    fn qr_payload_must_match_exactly() {
        let expected = r#"{"companyId": "TimeGuard-Demo", "action": "attendance-scan"}"#;
        assert!(validate_qr_payload(expected, expected).is_ok());
        assert!(matches!(
            validate_qr_payload("https://example.com", expected),
            Err(AttendanceError::InvalidQrPayload)
        ));
        assert!(validate_qr_payload(&format!("{expected} "), expected).is_err());
    }
}
