use crate::api::attendance::ScanRequest;
use crate::api::users::{CreateUser, UpdateUser};
use crate::model::attendance::Coordinates;
use crate::model::role::Role;
use crate::model::user::AttendanceStatus;
use crate::models::LoginReqDto;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "TimeGuard Attendance API",
        version = "1.0.0",
        description = r#"
## TimeGuard QR Attendance

Employees scan the company QR code to check in and out. Every scan records
who, when, the client IP address and (when the browser allows it) the
location.

### Key Features
- **Check-in / check-out** by scanning the attendance QR code
- **Status & logs** of every employee
- **Weekly timesheet**: first check-in, last check-out and hours worked per day
- **CSV export** of the weekly timesheet
- **Employee management** for administrators

### Security
All endpoints except login require a **JWT Bearer** token.
Status, logs, timesheets and employee management are **Admin** only.
"#,
    ),
    paths(
        crate::auth::handlers::login,

        crate::api::attendance::scan,
        crate::api::attendance::my_attendance,
        crate::api::attendance::employee_status,
        crate::api::attendance::attendance_logs,
        crate::api::attendance::reset_attendance,
        crate::api::attendance::qr_payload,

        crate::api::timesheet::get_timesheet,
        crate::api::timesheet::export_timesheet,

        crate::api::users::list_users,
        crate::api::users::create_user,
        crate::api::users::update_user,
        crate::api::users::delete_user
    ),
    components(
        schemas(
            LoginReqDto,
            ScanRequest,
            Coordinates,
            CreateUser,
            UpdateUser,
            Role,
            AttendanceStatus
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login"),
        (name = "Attendance", description = "Check-in/out, status and logs"),
        (name = "Timesheet", description = "Weekly timesheet and CSV export"),
        (name = "Employee", description = "Employee management APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/auth/login",
            "/api/attendance/scan",
            "/api/attendance/logs",
            "/api/attendance/qr",
            "/api/timesheet",
            "/api/timesheet/export",
            "/api/users/{id}",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
        assert!(
            doc.components
                .unwrap()
                .security_schemes
                .contains_key("bearer_auth")
        );
    }
}
