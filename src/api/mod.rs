pub mod attendance;
pub mod errors;
pub mod timesheet;
pub mod users;
