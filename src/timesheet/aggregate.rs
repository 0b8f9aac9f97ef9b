use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::model::{
    attendance::{AttendanceEvent, Direction},
    user::User,
};
use crate::timesheet::week::WeekWindow;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// First check-in and last check-out seen for one user on one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DayEntry {
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    /// `check_out - check_in` in hours, 0 unless both are present.
    pub duration_hours: f64,
}

impl DayEntry {
    fn record(&mut self, direction: Direction, at: DateTime<Utc>) {
        match direction {
            Direction::In => {
                if self.check_in.is_none_or(|current| at < current) {
                    self.check_in = Some(at);
                }
            }
            Direction::Out => {
                if self.check_out.is_none_or(|current| at > current) {
                    self.check_out = Some(at);
                }
            }
        }
    }

    fn settle(&mut self) {
        self.duration_hours = match (self.check_in, self.check_out) {
            (Some(check_in), Some(check_out)) => {
                (check_out - check_in).num_milliseconds() as f64 / MILLIS_PER_HOUR
            }
            _ => 0.0,
        };
    }

    /// The day's last check-out precedes its first check-in. The duration is
    /// negative and is not clamped.
    pub fn is_inverted(&self) -> bool {
        self.duration_hours < 0.0
    }
}

pub type UserDays = BTreeMap<NaiveDate, DayEntry>;

#[derive(Debug, Clone, Serialize)]
pub struct Timesheet {
    pub window: WeekWindow,
    pub users: HashMap<Uuid, UserDays>,
}

impl Timesheet {
    pub fn days_of(&self, user_id: Uuid) -> Option<&UserDays> {
        self.users.get(&user_id)
    }

    pub fn entry(&self, user_id: Uuid, date: NaiveDate) -> Option<&DayEntry> {
        self.users.get(&user_id).and_then(|days| days.get(&date))
    }
}

/// Folds the events falling inside `window` into per-user, per-day entries.
///
/// Every user in `users` gets a key, possibly with no days. Events of users
/// not in `users` are dropped. The result does not depend on event order.
pub fn aggregate(users: &[User], events: &[AttendanceEvent], window: &WeekWindow) -> Timesheet {
    let mut sheet: HashMap<Uuid, UserDays> =
        users.iter().map(|u| (u.id, UserDays::new())).collect();
    let mut dropped = 0usize;

    for event in events.iter().filter(|e| window.contains(e.timestamp)) {
        let Some(days) = sheet.get_mut(&event.user_id) else {
            dropped += 1;
            continue;
        };
        days.entry(window.local_date(event.timestamp))
            .or_default()
            .record(event.direction, event.timestamp);
    }

    let mut inverted = 0usize;
    for entry in sheet.values_mut().flat_map(|days| days.values_mut()) {
        entry.settle();
        if entry.is_inverted() {
            inverted += 1;
        }
    }

    if dropped > 0 {
        debug!(dropped, "Skipped events of unknown users");
    }
    if inverted > 0 {
        debug!(inverted, "Days with a check-out before the check-in");
    }

    Timesheet {
        window: *window,
        users: sheet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::LocationFix;
    use chrono::{Duration, FixedOffset, TimeZone};

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn window() -> WeekWindow {
        WeekWindow::containing(NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(), offset()).unwrap()
    }

    fn at(day: u32, h: u32, m: u32) -> DateTime<Utc> {
        offset()
            .with_ymd_and_hms(2024, 3, day, h, m, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn user(name: &str) -> User {
        User::new_employee(name.into(), name.to_lowercase(), "h".into())
    }

    fn ev(user: &User, direction: Direction, timestamp: DateTime<Utc>) -> AttendanceEvent {
        AttendanceEvent {
            id: Uuid::now_v7(),
            user_id: user.id,
            user_name: user.name.clone(),
            timestamp,
            direction,
            ip: "10.0.0.1".into(),
            location: LocationFix::Skipped,
        }
    }

    #[test]
    fn users_without_events_get_an_empty_day_map() {
        let alice = user("Alice");
        let sheet = aggregate(std::slice::from_ref(&alice), &[], &window());
        assert_eq!(sheet.days_of(alice.id), Some(&UserDays::new()));
    }

    #[test]
    fn earliest_check_in_and_latest_check_out_win() {
        let alice = user("Alice");
        let events = vec![
            ev(&alice, Direction::In, at(5, 9, 0)),
            ev(&alice, Direction::Out, at(5, 17, 0)),
            ev(&alice, Direction::In, at(5, 8, 0)),
            ev(&alice, Direction::Out, at(5, 17, 30)),
        ];
        let sheet = aggregate(std::slice::from_ref(&alice), &events, &window());
        let entry = sheet.entry(alice.id, date(5)).unwrap();
        assert_eq!(entry.check_in, Some(at(5, 8, 0)));
        assert_eq!(entry.check_out, Some(at(5, 17, 30)));
        assert_eq!(entry.duration_hours, 9.5);
    }

    #[test]
    fn eight_and_a_half_hours() {
        let bob = user("Bob");
        let events = vec![
            ev(&bob, Direction::In, at(4, 8, 0)),
            ev(&bob, Direction::Out, at(4, 16, 30)),
        ];
        let sheet = aggregate(std::slice::from_ref(&bob), &events, &window());
        assert_eq!(sheet.entry(bob.id, date(4)).unwrap().duration_hours, 8.5);
    }

    #[test]
    fn result_is_independent_of_event_order() {
        let alice = user("Alice");
        let bob = user("Bob");
        let users = vec![alice.clone(), bob.clone()];
        let events = vec![
            ev(&alice, Direction::In, at(4, 8, 5)),
            ev(&alice, Direction::In, at(4, 7, 55)),
            ev(&alice, Direction::Out, at(4, 12, 0)),
            ev(&alice, Direction::Out, at(4, 18, 10)),
            ev(&bob, Direction::In, at(6, 9, 0)),
            ev(&bob, Direction::Out, at(7, 1, 0)),
            ev(&alice, Direction::In, at(8, 10, 0)),
        ];
        let expected = aggregate(&users, &events, &window());

        let mut reversed = events.clone();
        reversed.reverse();
        let mut rotated = events.clone();
        rotated.rotate_left(3);
        let mut interleaved = events.clone();
        interleaved.swap(0, 5);
        interleaved.swap(2, 6);

        for permutation in [reversed, rotated, interleaved] {
            let sheet = aggregate(&users, &permutation, &window());
            assert_eq!(sheet.users, expected.users);
        }
    }

    #[test]
    fn events_outside_window_or_of_unknown_users_are_ignored() {
        let alice = user("Alice");
        let stranger = user("Mallory");
        let w = window();
        let events = vec![
            ev(&alice, Direction::In, w.start.with_timezone(&Utc) - Duration::milliseconds(1)),
            ev(&alice, Direction::Out, w.end.with_timezone(&Utc) + Duration::milliseconds(1)),
            ev(&stranger, Direction::In, at(5, 9, 0)),
        ];
        let sheet = aggregate(std::slice::from_ref(&alice), &events, &w);
        assert!(sheet.days_of(alice.id).unwrap().is_empty());
        assert!(sheet.days_of(stranger.id).is_none());
        assert_eq!(sheet.users.len(), 1);
    }

    #[test]
    fn window_edges_are_included() {
        let alice = user("Alice");
        let w = window();
        let events = vec![
            ev(&alice, Direction::In, w.start.with_timezone(&Utc)),
            ev(&alice, Direction::Out, w.end.with_timezone(&Utc)),
        ];
        let sheet = aggregate(std::slice::from_ref(&alice), &events, &w);
        let days = sheet.days_of(alice.id).unwrap();
        assert_eq!(days.len(), 2);
        assert!(days[&date(4)].check_in.is_some());
        assert!(days[&date(10)].check_out.is_some());
    }

    #[test]
    fn partial_days_have_zero_duration() {
        let alice = user("Alice");
        let events = vec![
            ev(&alice, Direction::In, at(5, 8, 0)),
            ev(&alice, Direction::In, at(5, 13, 0)),
            ev(&alice, Direction::Out, at(6, 17, 0)),
        ];
        let sheet = aggregate(std::slice::from_ref(&alice), &events, &window());

        let tuesday = sheet.entry(alice.id, date(5)).unwrap();
        assert_eq!(tuesday.check_in, Some(at(5, 8, 0)));
        assert_eq!(tuesday.check_out, None);
        assert_eq!(tuesday.duration_hours, 0.0);

        let wednesday = sheet.entry(alice.id, date(6)).unwrap();
        assert_eq!(wednesday.check_in, None);
        assert_eq!(wednesday.duration_hours, 0.0);
    }

    #[test]
    fn check_out_before_check_in_yields_negative_duration() {
        let alice = user("Alice");
        let events = vec![
            ev(&alice, Direction::Out, at(7, 7, 0)),
            ev(&alice, Direction::In, at(7, 9, 0)),
        ];
        let sheet = aggregate(std::slice::from_ref(&alice), &events, &window());
        let entry = sheet.entry(alice.id, date(7)).unwrap();
        assert_eq!(entry.duration_hours, -2.0);
        assert!(entry.is_inverted());
    }

    #[test]
    fn days_are_keyed_by_local_date() {
        let alice = user("Alice");
        // 23:30 local on Tuesday is 16:30 UTC, 00:30 local Wednesday is still Tuesday in UTC
        let events = vec![
            ev(&alice, Direction::In, at(5, 23, 30)),
            ev(&alice, Direction::Out, at(6, 0, 30)),
        ];
        let sheet = aggregate(std::slice::from_ref(&alice), &events, &window());
        assert!(sheet.entry(alice.id, date(5)).unwrap().check_out.is_none());
        assert!(sheet.entry(alice.id, date(6)).unwrap().check_in.is_none());
    }
}
