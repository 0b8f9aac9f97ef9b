//! Monday-first calendar weeks in a fixed UTC offset.
//!
//! The offset comes from configuration, so a window never depends on the
//! locale or timezone of the host.

use chrono::{DateTime, Datelike, Days, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

/// Local wall-clock `time` on `date` in `offset`. `None` past chrono's range.
fn at_local(
    date: NaiveDate,
    time: NaiveTime,
    offset: FixedOffset,
) -> Option<DateTime<FixedOffset>> {
    let utc = date
        .and_time(time)
        .checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))?;
    Some(DateTime::from_naive_utc_and_offset(utc, offset))
}

fn monday_of(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
}

/// Monday 00:00:00.000 of the week containing `at`, in `at`'s offset.
pub fn week_start(at: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    at_local(monday_of(at.date_naive())?, NaiveTime::MIN, *at.offset())
}

/// 23:59:59.999 six days after the calendar date of `start`.
pub fn week_end(start: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    let following = start.date_naive().checked_add_days(Days::new(7))?;
    at_local(following, NaiveTime::MIN, *start.offset())?
        .checked_sub_signed(Duration::milliseconds(1))
}

/// Inclusive `[start, end]` range of one Monday..Sunday week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl WeekWindow {
    /// The week holding `date`, or `None` when that week runs past the
    /// representable calendar.
    pub fn containing(date: NaiveDate, offset: FixedOffset) -> Option<Self> {
        let start = at_local(monday_of(date)?, NaiveTime::MIN, offset)?;
        Some(Self {
            start,
            end: week_end(start)?,
        })
    }

    pub fn around(at: DateTime<Utc>, offset: FixedOffset) -> Option<Self> {
        Self::containing(at.with_timezone(&offset).date_naive(), offset)
    }

    pub fn offset(&self) -> FixedOffset {
        *self.start.offset()
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Monday first.
    pub fn days(&self) -> [NaiveDate; 7] {
        let mut days = self.start_date().iter_days();
        // `end` exists, so all seven dates are in range
        std::array::from_fn(|_| days.next().unwrap_or(NaiveDate::MAX))
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let at = at.with_timezone(&self.offset());
        self.start <= at && at <= self.end
    }

    /// Calendar date of `at` in this window's offset.
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset()).date_naive()
    }

    pub fn previous(&self) -> Option<Self> {
        let date = self.start_date().checked_sub_days(Days::new(7))?;
        Self::containing(date, self.offset())
    }

    pub fn next(&self) -> Option<Self> {
        let date = self.start_date().checked_add_days(Days::new(7))?;
        Self::containing(date, self.offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike, Weekday};

    fn ict() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        ict().with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn every_weekday_maps_to_its_monday() {
        // 2024-03-04 is a Monday
        for day in 4..=10 {
            let start = week_start(local(2024, 3, day, 15, 30)).unwrap();
            assert_eq!(start, local(2024, 3, 4, 0, 0), "day {day}");
        }
        assert_eq!(week_start(local(2024, 3, 11, 0, 0)), Some(local(2024, 3, 11, 0, 0)));
    }

    #[test]
    fn sunday_belongs_to_the_previous_monday() {
        let sunday = local(2024, 3, 10, 23, 59);
        assert_eq!(sunday.weekday(), Weekday::Sun);
        assert_eq!(
            week_start(sunday).unwrap().date_naive(),
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
        );
    }

    #[test]
    fn start_is_idempotent_monday_midnight_and_brackets_input() {
        let mut at = local(2023, 12, 25, 9, 15);
        for _ in 0..40 {
            let start = week_start(at).unwrap();
            assert_eq!(week_start(start), Some(start));
            assert_eq!(start.weekday(), Weekday::Mon);
            assert_eq!((start.hour(), start.minute(), start.second()), (0, 0, 0));
            assert_eq!(start.nanosecond(), 0);
            assert!(start <= at && at <= week_end(start).unwrap());
            at += Duration::hours(29);
        }
    }

    #[test]
    fn end_is_sunday_last_millisecond() {
        let end = week_end(local(2024, 12, 30, 0, 0)).unwrap();
        assert_eq!(end.date_naive(), NaiveDate::from_ymd_opt(2025, 1, 5).unwrap());
        assert_eq!(end.weekday(), Weekday::Sun);
        assert_eq!((end.hour(), end.minute(), end.second()), (23, 59, 59));
        assert_eq!(end.timestamp_subsec_millis(), 999);
    }

    #[test]
    fn window_uses_local_calendar_date() {
        // Monday 02:00 in +07:00 is still Sunday in UTC
        let at = Utc.with_ymd_and_hms(2024, 3, 10, 19, 0, 0).unwrap();
        let window = WeekWindow::around(at, ict()).unwrap();
        assert_eq!(window.start_date(), NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
        assert!(window.contains(at));
        assert_eq!(window.local_date(at), window.start_date());

        let utc_window = WeekWindow::around(at, FixedOffset::east_opt(0).unwrap()).unwrap();
        assert_eq!(utc_window.start_date(), NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
    }

    #[test]
    fn bounds_are_inclusive() {
        let window =
            WeekWindow::containing(NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(), ict()).unwrap();
        let start = window.start.with_timezone(&Utc);
        let end = window.end.with_timezone(&Utc);
        assert!(window.contains(start));
        assert!(window.contains(end));
        assert!(!window.contains(start - Duration::milliseconds(1)));
        assert!(!window.contains(end + Duration::milliseconds(1)));
    }

    #[test]
    fn days_and_navigation() {
        let window =
            WeekWindow::containing(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(), ict()).unwrap();
        let days = window.days();
        assert_eq!(days[0], NaiveDate::from_ymd_opt(2024, 2, 26).unwrap());
        assert_eq!(days[6], NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
        let next = window.next().unwrap();
        assert_eq!(next.start_date(), NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(next.previous(), Some(window));
    }

    #[test]
    fn weeks_past_the_calendar_edges_are_none() {
        assert_eq!(WeekWindow::containing(NaiveDate::MAX, ict()), None);
        assert_eq!(WeekWindow::containing(NaiveDate::MIN, ict()), None);

        let utc = FixedOffset::east_opt(0).unwrap();
        let last = NaiveDate::MAX.checked_sub_days(Days::new(7)).unwrap();
        let window = WeekWindow::containing(last, utc).unwrap();
        assert_eq!(window.next(), None);
        assert!(window.previous().is_some());
    }
}
