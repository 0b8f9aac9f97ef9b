use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::Serialize;
use thiserror::Error;

use crate::model::user::User;
use crate::timesheet::{aggregate::Timesheet, week::WeekWindow};

pub const CSV_HEADER: [&str; 5] = [
    "Employee Name",
    "Date",
    "Check In",
    "Check Out",
    "Total Hours Worked",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("csv buffer error: {0}")]
    Buffer(String),

    #[error("csv output is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// One line of the exported timesheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimesheetRow {
    pub employee_name: String,
    pub date: NaiveDate,
    pub check_in: String,
    pub check_out: String,
    pub total_hours: String,
}

fn format_time(at: Option<DateTime<Utc>>, offset: FixedOffset) -> String {
    at.map(|t| t.with_timezone(&offset).format("%H:%M").to_string())
        .unwrap_or_default()
}

/// Rows for every user and every day of the week, Monday first. A day only
/// yields a row when the aggregation produced an entry for it.
pub fn export_rows(users: &[User], sheet: &Timesheet) -> Vec<TimesheetRow> {
    let offset = sheet.window.offset();
    let days = sheet.window.days();

    users
        .iter()
        .flat_map(|user| {
            days.iter().filter_map(move |day| {
                sheet.entry(user.id, *day).map(|entry| TimesheetRow {
                    employee_name: user.name.clone(),
                    date: *day,
                    check_in: format_time(entry.check_in, offset),
                    check_out: format_time(entry.check_out, offset),
                    total_hours: format!("{:.2}", entry.duration_hours),
                })
            })
        })
        .collect()
}

/// Comma separated, one header line, `\n` after every row. Fields are only
/// quoted when they contain a comma, quote or line break.
pub fn to_csv(rows: &[TimesheetRow]) -> Result<String, ExportError> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

pub fn export_filename(window: &WeekWindow) -> String {
    format!("timesheet_{}.csv", window.start_date().format("%Y-%m-%d"))
}
