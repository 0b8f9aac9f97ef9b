use std::collections::BTreeMap;

use crate::{
    api::errors::ApiError,
    attendance::AttendanceService,
    auth::auth::AuthUser,
    config::Config,
    model::user::User,
    timesheet::{
        aggregate::{DayEntry, aggregate},
        export::{export_filename, export_rows, to_csv},
        week::WeekWindow,
    },
};
use actix_web::{HttpResponse, http::header, web};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TimesheetQuery {
    /// Any date inside the wanted week, defaults to today
    #[param(value_type = Option<String>, example = "2024-03-06")]
    pub date: Option<NaiveDate>,
}

#[derive(Serialize)]
struct EmployeeWeek {
    id: Uuid,
    name: String,
    days: BTreeMap<NaiveDate, DayEntry>,
}

#[derive(Serialize)]
struct TimesheetResponse {
    week_start: DateTime<FixedOffset>,
    week_end: DateTime<FixedOffset>,
    days: [NaiveDate; 7],
    /// Reference dates for paging, absent at the calendar edges
    previous_week: Option<NaiveDate>,
    next_week: Option<NaiveDate>,
    employees: Vec<EmployeeWeek>,
}

fn window_for(
    query: &TimesheetQuery,
    config: &Config,
    service: &AttendanceService,
) -> Result<WeekWindow, ApiError> {
    let window = match query.date {
        Some(date) => WeekWindow::containing(date, config.utc_offset),
        None => WeekWindow::around(service.now(), config.utc_offset),
    };
    window.ok_or_else(|| ApiError::bad_request("Date is out of range"))
}

async fn employees(service: &AttendanceService) -> Result<Vec<User>, ApiError> {
    Ok(service
        .store()
        .list_users()
        .await?
        .into_iter()
        .filter(|u| !u.is_admin())
        .collect())
}

/// Weekly timesheet of all employees
#[utoipa::path(
    get,
    path = "/api/timesheet",
    params(TimesheetQuery),
    responses(
        (status = 200, description = "Per employee, per day first check-in, last check-out and hours", body = Object),
        (status = 400, description = "Date out of range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Timesheet"
)]
pub async fn get_timesheet(
    auth: AuthUser,
    query: web::Query<TimesheetQuery>,
    service: web::Data<AttendanceService>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let window = window_for(&query, &config, &service)?;
    let users = employees(&service).await?;
    let events = service.store().list_events().await?;
    let sheet = aggregate(&users, &events, &window);

    debug!(week_start = %window.start_date(), events = events.len(), "Timesheet aggregated");

    let employees = users
        .into_iter()
        .map(|user| EmployeeWeek {
            days: sheet.days_of(user.id).cloned().unwrap_or_default(),
            id: user.id,
            name: user.name,
        })
        .collect();

    Ok(HttpResponse::Ok().json(TimesheetResponse {
        week_start: window.start,
        week_end: window.end,
        days: window.days(),
        previous_week: window.previous().map(|w| w.start_date()),
        next_week: window.next().map(|w| w.start_date()),
        employees,
    }))
}

/// Download the weekly timesheet as CSV
#[utoipa::path(
    get,
    path = "/api/timesheet/export",
    params(TimesheetQuery),
    responses(
        (status = 200, description = "CSV attachment named timesheet_<week start>.csv", content_type = "text/csv", body = String),
        (status = 400, description = "Date out of range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Timesheet"
)]
pub async fn export_timesheet(
    auth: AuthUser,
    query: web::Query<TimesheetQuery>,
    service: web::Data<AttendanceService>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let window = window_for(&query, &config, &service)?;
    let users = employees(&service).await?;
    let events = service.store().list_events().await?;
    let sheet = aggregate(&users, &events, &window);

    let rows = export_rows(&users, &sheet);
    let csv = to_csv(&rows)?;
    let filename = export_filename(&window);

    info!(%filename, rows = rows.len(), "Timesheet exported");

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(csv))
}
