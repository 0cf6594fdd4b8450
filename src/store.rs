use crate::calendar::{same_day, start_of_day};
use crate::error::{Result, ShiftError};
use crate::models::{Database, Shift, ShiftEvent, ShiftId};
use crate::storage::Persistence;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::BTreeSet;
use std::sync::mpsc::Sender;
use tracing::{debug, error, info, warn};

/// Owns the shift collection and writes it through to a [`Persistence`]
/// backend after every mutation.
///
/// A failed write is logged and the in-memory change is kept, so the session
/// still sees the record. Call [`ShiftStore::flush`] to surface the error.
pub struct ShiftStore<P: Persistence> {
    persistence: P,
    db: Database,
    events: Option<Sender<ShiftEvent>>,
}

impl<P: Persistence> ShiftStore<P> {
    pub fn open(persistence: P) -> anyhow::Result<Self> {
        let db = persistence.load()?;
        debug!(shifts = db.shifts.len(), "loaded shift database");
        Ok(Self {
            persistence,
            db,
            events: None,
        })
    }

    /// Sends a [`ShiftEvent`] for every create and delete from now on.
    pub fn with_events(mut self, events: Sender<ShiftEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Creates one shift per selected date. Either every shift is created or,
    /// on a validation error, none is.
    pub fn create(
        &mut self,
        employee_name: &str,
        start: NaiveTime,
        end: NaiveTime,
        dates: &BTreeSet<NaiveDate>,
    ) -> Result<Vec<Shift>> {
        if end < start {
            warn!(%start, %end, "shift ends before it starts");
        }
        self.create_with(employee_name, dates, |name, date| {
            Shift::on_date(name, date, start, end)
        })
    }

    /// Like [`ShiftStore::create`] but the end is `start + length`, so a
    /// shift may run past midnight into the next date.
    pub fn create_for(
        &mut self,
        employee_name: &str,
        start: NaiveTime,
        length: Duration,
        dates: &BTreeSet<NaiveDate>,
    ) -> Result<Vec<Shift>> {
        if length <= Duration::zero() {
            return Err(ShiftError::Validation("shift length must be positive".into()));
        }
        self.create_with(employee_name, dates, |name, date| {
            let start_time = date.and_time(start);
            Shift::new_at(name, start_time, start_time + length)
        })
    }

    fn create_with(
        &mut self,
        employee_name: &str,
        dates: &BTreeSet<NaiveDate>,
        build: impl Fn(&str, NaiveDate) -> Shift,
    ) -> Result<Vec<Shift>> {
        let employee_name = employee_name.trim();
        if employee_name.is_empty() {
            return Err(ShiftError::Validation("employee name is empty".into()));
        }
        if dates.is_empty() {
            return Err(ShiftError::Validation("no dates selected".into()));
        }

        let created: Vec<Shift> = dates.iter().map(|date| build(employee_name, *date)).collect();

        self.db.shifts.extend(created.iter().cloned());
        self.persist();
        info!(employee = employee_name, count = created.len(), "created shifts");

        for shift in &created {
            self.emit(ShiftEvent::Created(shift.clone()));
        }
        Ok(created)
    }

    pub fn delete(&mut self, id: ShiftId) -> Result<Shift> {
        let idx = self.position(id)?;
        let removed = self.db.shifts.remove(idx);
        self.persist();
        info!(%id, employee = %removed.employee_name, "deleted shift");
        self.emit(ShiftEvent::Deleted(id));
        Ok(removed)
    }

    pub fn toggle_attendance(&mut self, id: ShiftId) -> Result<Shift> {
        let idx = self.position(id)?;
        let shift = &mut self.db.shifts[idx];
        shift.attended = !shift.attended;
        let updated = shift.clone();
        self.persist();
        debug!(%id, attended = updated.attended, "toggled attendance");
        Ok(updated)
    }

    /// Shifts starting in `[from, to)` or ending in `(from, to]`, by start time.
    pub fn query(&self, from: NaiveDateTime, to: NaiveDateTime) -> Vec<Shift> {
        self.sorted(|s| {
            (s.start_time >= from && s.start_time < to) || (s.end_time > from && s.end_time <= to)
        })
    }

    /// Shifts whose start falls on `date`, by start time.
    pub fn query_by_day(&self, date: NaiveDate) -> Vec<Shift> {
        self.sorted(|s| same_day(s.start_time, date))
    }

    /// Shifts active on the day of `now`.
    pub fn today(&self, now: NaiveDateTime) -> Vec<Shift> {
        let from = start_of_day(now.date());
        self.query(from, from + Duration::days(1))
    }

    pub fn get(&self, id: ShiftId) -> Option<&Shift> {
        self.db.shifts.iter().find(|s| s.id == id)
    }

    pub fn all(&self) -> &[Shift] {
        &self.db.shifts
    }

    /// Finds the single shift whose id starts with `prefix`.
    pub fn resolve(&self, prefix: &str) -> anyhow::Result<ShiftId> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() {
            anyhow::bail!("empty shift id");
        }
        let mut matches = self
            .db
            .shifts
            .iter()
            .filter(|s| s.id.to_string().starts_with(&prefix));
        match (matches.next(), matches.next()) {
            (Some(shift), None) => Ok(shift.id),
            (None, _) => anyhow::bail!("no shift matches '{}'", prefix),
            (Some(_), Some(_)) => anyhow::bail!("'{}' matches more than one shift", prefix),
        }
    }

    /// Saves the current state and reports a failure to the caller.
    pub fn flush(&self) -> Result<()> {
        self.persistence
            .save(&self.db)
            .map_err(|e| ShiftError::Persistence(format!("{:#}", e)))
    }

    fn persist(&self) {
        if let Err(err) = self.flush() {
            error!(error = %err, "failed to save shifts, keeping changes in memory");
        }
    }

    fn emit(&self, event: ShiftEvent) {
        if let Some(events) = &self.events {
            if events.send(event).is_err() {
                warn!("reminder pipeline is gone, event dropped");
            }
        }
    }

    fn position(&self, id: ShiftId) -> Result<usize> {
        self.db
            .shifts
            .iter()
            .position(|s| s.id == id)
            .ok_or(ShiftError::NotFound(id))
    }

    fn sorted(&self, keep: impl Fn(&Shift) -> bool) -> Vec<Shift> {
        let mut shifts: Vec<Shift> = self.db.shifts.iter().filter(|s| keep(s)).cloned().collect();
        shifts.sort_by_key(|s| s.start_time);
        shifts
    }
}
