use crate::models::Shift;
use chrono::Duration;
use std::collections::BTreeMap;

#[derive(Default, Clone, Debug, PartialEq)]
pub struct AttendanceStats {
    pub shifts: u32,
    pub attended: u32,
    pub peak_day_shifts: u32,
    pub scheduled: Duration,
    pub worked: Duration,
}

impl AttendanceStats {
    fn add(&mut self, shift: &Shift) {
        // reversed shifts count as zero time
        let span = shift.duration().max(Duration::zero());
        self.shifts += 1;
        self.scheduled += span;
        if shift.attended {
            self.attended += 1;
            self.worked += span;
        }
        if shift.is_peak_day {
            self.peak_day_shifts += 1;
        }
    }

    pub fn missed(&self) -> u32 {
        self.shifts - self.attended
    }
}

pub struct Summary {
    pub by_employee: BTreeMap<String, AttendanceStats>,
    pub total: AttendanceStats,
}

pub fn summarize(shifts: &[Shift]) -> Summary {
    let mut by_employee: BTreeMap<String, AttendanceStats> = BTreeMap::new();
    let mut total = AttendanceStats::default();

    for shift in shifts {
        by_employee
            .entry(shift.employee_name.clone())
            .or_default()
            .add(shift);
        total.add(shift);
    }

    Summary { by_employee, total }
}
