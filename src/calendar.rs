use crate::models::{CalendarCell, Shift};
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

pub const PEAK_DAYS: [u32; 2] = [15, 30];

/// Day-of-month 15 or 30, whatever the month length.
pub fn is_peak_day(date: NaiveDate) -> bool {
    PEAK_DAYS.contains(&date.day())
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub fn same_day(ts: NaiveDateTime, date: NaiveDate) -> bool {
    ts.date() == date
}

pub fn first_of_month(reference: NaiveDate) -> NaiveDate {
    reference.with_day(1).unwrap_or(reference)
}

/// Every day of the month containing `reference`, first to last.
pub fn days_in_month(reference: NaiveDate) -> Vec<NaiveDate> {
    let first = first_of_month(reference);
    first
        .iter_days()
        .take_while(|d| d.month() == first.month())
        .collect()
}

/// `count` consecutive first-of-month anchors starting at `reference`'s month.
pub fn months_from(reference: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let first = first_of_month(reference);
    (0..count as u32)
        .map_while(|offset| first.checked_add_months(Months::new(offset)))
        .collect()
}

/// Moves `delta` calendar months, clamping the day to the last valid day of
/// the target month. Results outside chrono's range leave `current` as is.
pub fn shift_month(current: NaiveDate, delta: i32) -> NaiveDate {
    let months = Months::new(delta.unsigned_abs());
    let shifted = if delta >= 0 {
        current.checked_add_months(months)
    } else {
        current.checked_sub_months(months)
    };
    shifted.unwrap_or(current)
}

/// Empty cells before day 1 in a seven-column grid starting on `week_start`.
pub fn leading_blanks(reference: NaiveDate, week_start: Weekday) -> usize {
    let first = first_of_month(reference);
    let offset = 7 + first.weekday().num_days_from_monday() - week_start.num_days_from_monday();
    (offset % 7) as usize
}

/// One cell per day of the month, each carrying the shifts that start on it.
pub fn project_month(reference: NaiveDate, shifts: &[Shift]) -> Vec<CalendarCell> {
    days_in_month(reference)
        .into_iter()
        .map(|date| {
            let mut on_day: Vec<Shift> = shifts
                .iter()
                .filter(|s| same_day(s.start_time, date))
                .cloned()
                .collect();
            on_day.sort_by_key(|s| s.start_time);
            CalendarCell {
                date,
                is_peak_day: is_peak_day(date),
                shifts: on_day,
            }
        })
        .collect()
}
