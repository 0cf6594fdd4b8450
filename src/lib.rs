pub mod calendar;
pub mod config;
pub mod error;
pub mod models;
pub mod reminder;
pub mod report;
pub mod stats;
pub mod storage;
pub mod store;
pub mod tui;
pub mod utils;

pub use error::{Result, ShiftError};
pub use models::{CalendarCell, ReminderDescriptor, Shift, ShiftEvent, ShiftId};
pub use store::ShiftStore;
