use crate::calendar::is_peak_day;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ShiftId(Uuid);

impl ShiftId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ShiftId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ShiftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ShiftId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// One employee's work block on one calendar date.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Shift {
    pub id: ShiftId,
    pub employee_name: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    /// Fixed when the shift is created, never recomputed.
    pub is_peak_day: bool,
    #[serde(default)]
    pub attended: bool,
}

impl Shift {
    /// Builds a shift on `date` with the given times of day.
    ///
    /// The end is not checked against the start: an end time earlier than
    /// the start is stored as given.
    pub fn on_date(employee_name: &str, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Self {
        Self::new_at(employee_name, date.and_time(start), date.and_time(end))
    }

    pub fn new_at(employee_name: &str, start_time: NaiveDateTime, end_time: NaiveDateTime) -> Self {
        Self {
            id: ShiftId::new(),
            employee_name: employee_name.to_string(),
            start_time,
            end_time,
            is_peak_day: is_peak_day(start_time.date()),
            attended: false,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.start_time.date()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct Database {
    pub shifts: Vec<Shift>,
}

/// Emitted by the store for the reminder pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum ShiftEvent {
    Created(Shift),
    Deleted(ShiftId),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReminderDescriptor {
    pub shift_id: ShiftId,
    pub fire_at: NaiveDateTime,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub is_peak_day: bool,
    pub shifts: Vec<Shift>,
}
