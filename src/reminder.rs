//! Reminders derived from shifts and the pipeline that hands them to a
//! notifier.
//!
//! The store emits [`ShiftEvent`]s; a [`ReminderWorker`] thread turns each
//! created shift into one [`ReminderDescriptor`] and schedules it. Scheduling
//! is best effort: failures are logged and never touch the shift itself.

use crate::models::{ReminderDescriptor, Shift, ShiftEvent, ShiftId};
use crate::storage::{read_json, write_json};
use anyhow::Result;
use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

pub const REMINDER_TITLE: &str = "Shift reminder";

pub fn format_when(ts: NaiveDateTime) -> String {
    ts.format("%b %-d, %Y %H:%M").to_string()
}

/// Fires at the shift start, to the minute.
pub fn derive(shift: &Shift) -> ReminderDescriptor {
    let fire_at = shift
        .start_time
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(shift.start_time);
    ReminderDescriptor {
        shift_id: shift.id,
        fire_at,
        title: REMINDER_TITLE.to_string(),
        message: format!(
            "Remember that {} has a shift on {}",
            shift.employee_name,
            format_when(shift.start_time)
        ),
    }
}

pub trait Notifier {
    fn schedule(&self, reminder: &ReminderDescriptor) -> Result<()>;

    fn cancel(&self, _shift_id: ShiftId) -> Result<()> {
        Ok(())
    }
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn schedule(&self, reminder: &ReminderDescriptor) -> Result<()> {
        (**self).schedule(reminder)
    }

    fn cancel(&self, shift_id: ShiftId) -> Result<()> {
        (**self).cancel(shift_id)
    }
}

/// Only logs. Used when notifications are turned off.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn schedule(&self, reminder: &ReminderDescriptor) -> Result<()> {
        info!(shift = %reminder.shift_id, fire_at = %reminder.fire_at, "{}", reminder.message);
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Outbox {
    pub reminders: Vec<ReminderDescriptor>,
}

/// Queues reminders in `reminders.json` for a desktop notifier to deliver.
///
/// Reminders that already fired are dropped whenever a new one is queued.
pub struct OutboxNotifier {
    path: PathBuf,
    clock: fn() -> NaiveDateTime,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl OutboxNotifier {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            path: base_dir.join("reminders.json"),
            clock: local_now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn load(&self) -> Result<Outbox> {
        read_json(&self.path)
    }

    /// Reminders that have not fired yet at `now`, soonest first.
    pub fn pending(&self, now: NaiveDateTime) -> Result<Vec<ReminderDescriptor>> {
        let mut reminders: Vec<_> = self
            .load()?
            .reminders
            .into_iter()
            .filter(|r| r.fire_at > now)
            .collect();
        reminders.sort_by_key(|r| r.fire_at);
        Ok(reminders)
    }
}

impl Notifier for OutboxNotifier {
    fn schedule(&self, reminder: &ReminderDescriptor) -> Result<()> {
        let now = (self.clock)();
        let mut outbox = self.load()?;
        outbox
            .reminders
            .retain(|r| r.shift_id != reminder.shift_id && r.fire_at > now);
        outbox.reminders.push(reminder.clone());
        write_json(&self.path, &outbox)
    }

    fn cancel(&self, shift_id: ShiftId) -> Result<()> {
        let mut outbox = self.load()?;
        let before = outbox.reminders.len();
        outbox.reminders.retain(|r| r.shift_id != shift_id);
        if outbox.reminders.len() != before {
            write_json(&self.path, &outbox)?;
        }
        Ok(())
    }
}

pub struct ReminderWorker {
    handle: JoinHandle<usize>,
}

impl ReminderWorker {
    /// Runs until every event sender is dropped.
    pub fn spawn<N>(events: Receiver<ShiftEvent>, notifier: N) -> Self
    where
        N: Notifier + Send + 'static,
    {
        let handle = thread::spawn(move || {
            let mut scheduled = 0;
            for event in events {
                match event {
                    ShiftEvent::Created(shift) => {
                        let reminder = derive(&shift);
                        match notifier.schedule(&reminder) {
                            Ok(()) => {
                                scheduled += 1;
                                debug!(shift = %shift.id, fire_at = %reminder.fire_at, "scheduled reminder");
                            }
                            Err(err) => {
                                warn!(shift = %shift.id, error = %err, "failed to schedule reminder")
                            }
                        }
                    }
                    ShiftEvent::Deleted(id) => {
                        if let Err(err) = notifier.cancel(id) {
                            warn!(shift = %id, error = %err, "failed to cancel reminder");
                        }
                    }
                }
            }
            scheduled
        });
        Self { handle }
    }

    /// Waits for the backlog to drain and returns how many reminders were
    /// scheduled.
    pub fn join(self) -> Result<usize> {
        self.handle
            .join()
            .map_err(|_| anyhow::anyhow!("reminder worker panicked"))
    }
}
