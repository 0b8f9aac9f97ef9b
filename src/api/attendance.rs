use crate::{
    api::errors::ApiError,
    attendance::{
        AttendanceError, AttendanceService,
        lookup::{Geolocator, PeerIp, ReportedLocation},
        validate_qr_payload,
    },
    auth::auth::AuthUser,
    config::Config,
    model::{
        attendance::{AttendanceEvent, Coordinates},
        user::User,
    },
};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct ScanRequest {
    /// Text decoded from the scanned QR code
    #[schema(example = r#"{"companyId": "TimeGuard-Demo", "action": "attendance-scan"}"#)]
    pub qr_payload: String,
    /// Browser geolocation, when it succeeded
    pub location: Option<Coordinates>,
    /// Browser geolocation failure message, when it failed
    #[schema(example = "User denied Geolocation")]
    pub location_error: Option<String>,
}

#[derive(Serialize)]
struct MyAttendance {
    user: User,
    logs: Vec<AttendanceEvent>,
}

fn newest_first(events: &mut [AttendanceEvent]) {
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
}

/// Scan the attendance QR code to check in or out
#[utoipa::path(
    post,
    path = "/api/attendance/scan",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "State toggled", body = Object, example = json!({
            "success": true,
            "message": "Successfully Checked in!",
            "status": "Checked In"
        })),
        (status = 400, description = "Invalid QR code", body = Object, example = json!({
            "success": false,
            "message": "Invalid QR Code. Please scan the official TimeGuard code."
        })),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Another check-in/out is in progress"),
        (status = 502, description = "Client IP could not be determined")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "attendance_scan", skip_all, fields(user_id = %auth.user_id))]
pub async fn scan(
    auth: AuthUser,
    req: HttpRequest,
    service: web::Data<AttendanceService>,
    config: web::Data<Config>,
    payload: web::Json<ScanRequest>,
) -> Result<HttpResponse, ApiError> {
    if let Err(e) = validate_qr_payload(&payload.qr_payload, &config.qr_payload) {
        warn!("Rejected scan with unexpected QR payload");
        return Err(e.into());
    }

    let ip = PeerIp::from_remote(req.connection_info().realip_remote_addr());
    let payload = payload.into_inner();
    let location = ReportedLocation::from_report(payload.location, payload.location_error);

    let toggled = service
        .toggle(
            auth.user_id,
            &ip,
            location.as_ref().map(|l| l as &dyn Geolocator),
        )
        .await
        .map_err(|e| {
            if !matches!(e, AttendanceError::Busy) {
                warn!(error = %e, "Check-in/out failed");
            }
            ApiError::from(e)
        })?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": toggled.message,
        "status": toggled.status,
        "event": toggled.event,
    })))
}

/// Current status and own attendance history, newest first
#[utoipa::path(
    get,
    path = "/api/attendance/me",
    responses(
        (status = 200, description = "Own status and logs", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Account no longer exists")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn my_attendance(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse, ApiError> {
    let store = service.store();
    let user = store
        .find_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let mut logs: Vec<AttendanceEvent> = store
        .list_events()
        .await?
        .into_iter()
        .filter(|e| e.user_id == auth.user_id)
        .collect();
    newest_first(&mut logs);

    Ok(HttpResponse::Ok().json(MyAttendance { user, logs }))
}

/// Attendance status of every employee
#[utoipa::path(
    get,
    path = "/api/attendance/status",
    responses(
        (status = 200, description = "Employee statuses", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn employee_status(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let employees: Vec<User> = service
        .store()
        .list_users()
        .await?
        .into_iter()
        .filter(|u| !u.is_admin())
        .collect();

    Ok(HttpResponse::Ok().json(employees))
}

/// Raw attendance log, newest first
#[utoipa::path(
    get,
    path = "/api/attendance/logs",
    responses(
        (status = 200, description = "All attendance events", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn attendance_logs(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let mut logs = service.store().list_events().await?;
    newest_first(&mut logs);

    Ok(HttpResponse::Ok().json(logs))
}

/// Delete every attendance event and check all users out
#[utoipa::path(
    delete,
    path = "/api/attendance/logs",
    responses(
        (status = 200, description = "Attendance data reset", body = Object, example = json!({
            "success": true,
            "message": "Attendance data reset"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn reset_attendance(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    service.store().reset().await?;
    info!(admin = %auth.username, "Attendance data reset");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Attendance data reset"
    })))
}

/// Text to render as the attendance QR code
#[utoipa::path(
    get,
    path = "/api/attendance/qr",
    responses(
        (status = 200, description = "QR payload", body = Object, example = json!({
            "payload": r#"{"companyId": "TimeGuard-Demo", "action": "attendance-scan"}"#
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn qr_payload(
    auth: AuthUser,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    Ok(HttpResponse::Ok().json(json!({ "payload": config.qr_payload })))
}
