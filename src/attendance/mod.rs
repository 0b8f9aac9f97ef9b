pub mod inflight;
pub mod lookup;
pub mod toggle;

pub use toggle::{AttendanceError, AttendanceService, Toggled, validate_qr_payload};
