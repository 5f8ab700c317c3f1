//! Calendar model for the schedule dashboard
//!
//! Date range generation and ISO week grouping live here; the employee x day
//! grid is in [`grid`] and the optimistic edit state in [`board`].

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

pub mod board;
pub mod grid;

pub use board::{ChangeResult, PendingEdit, ScheduleBoard, ScheduleChange};
pub use grid::{CalendarGrid, GridEmployee, GridShift};

/// A schedule row as the calendar sees it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    /// Server id, negative for an unsaved placeholder
    pub schedule_id: i64,
    pub employee_id: i64,
    pub shift_type_id: i64,
    pub date: NaiveDate,
}

/// Days of one ISO week inside the displayed range
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarWeek {
    pub iso_year: i32,
    pub week: u32,
    pub days: Vec<NaiveDate>,
}

/// Every day from `start` to `end`, both inclusive
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if end < start {
        return Vec::new();
    }
    let len = (end - start).num_days() + 1;
    (0..len).map(|offset| start + Duration::days(offset)).collect()
}

/// Bucket days by ISO week. Days are expected in ascending order; a bucket
/// closes whenever the (ISO year, week) pair changes.
pub fn group_by_week(days: &[NaiveDate]) -> Vec<CalendarWeek> {
    let mut weeks: Vec<CalendarWeek> = Vec::new();

    for &day in days {
        let iso = day.iso_week();
        match weeks.last_mut() {
            Some(week) if week.iso_year == iso.year() && week.week == iso.week() => {
                week.days.push(day);
            }
            _ => weeks.push(CalendarWeek {
                iso_year: iso.year(),
                week: iso.week(),
                days: vec![day],
            }),
        }
    }

    weeks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_date_range_inclusive() {
        let days = date_range(d(2024, 2, 27), d(2024, 3, 2));
        assert_eq!(
            days,
            vec![d(2024, 2, 27), d(2024, 2, 28), d(2024, 2, 29), d(2024, 3, 1), d(2024, 3, 2)]
        );
    }

    #[test]
    fn test_date_range_single_and_reversed() {
        assert_eq!(date_range(d(2024, 5, 1), d(2024, 5, 1)), vec![d(2024, 5, 1)]);
        assert!(date_range(d(2024, 5, 2), d(2024, 5, 1)).is_empty());
    }

    #[test]
    fn test_group_by_week_splits_on_monday() {
        // 2024-01-04 is a Thursday, 2024-01-08 a Monday
        let weeks = group_by_week(&date_range(d(2024, 1, 4), d(2024, 1, 15)));
        assert_eq!(weeks.len(), 3);
        assert_eq!(weeks[0].week, 1);
        assert_eq!(weeks[0].days.len(), 4);
        assert_eq!(weeks[1].week, 2);
        assert_eq!(weeks[1].days.len(), 7);
        assert_eq!(weeks[2].days, vec![d(2024, 1, 15)]);
    }

    #[test]
    fn test_group_by_week_year_boundary() {
        // 2024-12-30 belongs to ISO week 1 of 2025; 2020-12-31 to week 53 of 2020
        let weeks = group_by_week(&date_range(d(2024, 12, 28), d(2025, 1, 1)));
        assert_eq!(weeks.len(), 2);
        assert_eq!((weeks[0].iso_year, weeks[0].week), (2024, 52));
        assert_eq!((weeks[1].iso_year, weeks[1].week), (2025, 1));
        assert_eq!(weeks[1].days.first(), Some(&d(2024, 12, 30)));

        let weeks = group_by_week(&[d(2020, 12, 31), d(2021, 1, 3), d(2021, 1, 4)]);
        assert_eq!((weeks[0].iso_year, weeks[0].week), (2020, 53));
        assert_eq!(weeks[0].days.len(), 2);
        assert_eq!((weeks[1].iso_year, weeks[1].week), (2021, 1));
    }

    #[test]
    fn test_group_by_week_empty() {
        assert!(group_by_week(&[]).is_empty());
    }
}
