use crate::calendar::{leading_blanks, project_month};
use crate::models::{CalendarCell, ReminderDescriptor, Shift};
use crate::reminder::format_when;
use crate::stats::summarize;
use crate::utils::format_span;
use chrono::{Datelike, NaiveDate, Weekday};

pub fn shift_line(shift: &Shift) -> String {
    format!(
        "{}  {} {}-{} ({}){}{}  {}",
        &shift.id.to_string()[..8],
        shift.start_time.format("%Y-%m-%d"),
        shift.start_time.format("%H:%M"),
        shift.end_time.format("%H:%M"),
        format_span(shift.duration()),
        if shift.is_peak_day { " [peak]" } else { "" },
        if shift.attended { " [attended]" } else { "" },
        shift.employee_name,
    )
}

pub fn print_shifts(title: &str, shifts: &[Shift]) {
    println!("{}", title);
    println!("{}", "=".repeat(title.chars().count()));
    if shifts.is_empty() {
        println!("No shifts scheduled.");
        return;
    }
    for shift in shifts {
        println!("{}", shift_line(shift));
    }
}

pub fn print_day(date: NaiveDate, shifts: &[Shift]) {
    let title = format!("Working on {}", date.format("%B %d, %Y"));
    print_shifts(&title, shifts);
}

pub fn print_summary(shifts: &[Shift]) {
    let summary = summarize(shifts);
    if summary.by_employee.is_empty() {
        return;
    }

    println!("\nAttendance");
    println!("----------");
    for (name, stats) in &summary.by_employee {
        println!(
            "{:<20} {}/{} attended, {} missed, {} worked of {}",
            name,
            stats.attended,
            stats.shifts,
            stats.missed(),
            format_span(stats.worked),
            format_span(stats.scheduled),
        );
    }
    println!(
        "Total: {} shifts, {} on peak days, {} attended",
        summary.total.shifts, summary.total.peak_day_shifts, summary.total.attended
    );
}

/// Month grid with `*` on peak days and `+` on days with shifts.
pub fn render_month(reference: NaiveDate, cells: &[CalendarCell], week_start: Weekday) -> String {
    let mut out = format!("{:^28}\n", reference.format("%B %Y").to_string());

    let mut day = week_start;
    for _ in 0..7 {
        out.push_str(&format!(" {:<3}", &day.to_string()[..2]));
        day = day.succ();
    }
    out.push('\n');

    let blanks = leading_blanks(reference, week_start);
    let mut column = 0;
    for _ in 0..blanks {
        out.push_str("    ");
        column += 1;
    }
    for cell in cells {
        let marker = if !cell.shifts.is_empty() {
            '+'
        } else if cell.is_peak_day {
            '*'
        } else {
            ' '
        };
        out.push_str(&format!(" {:>2}{}", cell.date.day(), marker));
        column += 1;
        if column % 7 == 0 {
            out.push('\n');
        }
    }
    if column % 7 != 0 {
        out.push('\n');
    }
    out
}

pub fn print_calendar(months: &[NaiveDate], shifts: &[Shift], week_start: Weekday) {
    for month in months {
        let cells = project_month(*month, shifts);
        println!("{}", render_month(*month, &cells, week_start));
    }
    println!("* peak day   + shifts scheduled");
}

pub fn print_reminders(reminders: &[ReminderDescriptor]) {
    if reminders.is_empty() {
        println!("No pending reminders.");
        return;
    }
    for reminder in reminders {
        println!("{}  {}", format_when(reminder.fire_at), reminder.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_shift_line() {
        let shift = Shift::on_date(
            "Ana",
            ymd(2025, 1, 15),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
        );
        let line = shift_line(&shift);
        assert!(line.starts_with(&shift.id.to_string()[..8]));
        assert!(line.contains("2025-01-15 09:00-13:00 (4h) [peak]  Ana"));
        assert!(!line.contains("[attended]"));
    }

    #[test]
    fn test_render_month() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let shifts = vec![Shift::on_date("Ana", ymd(2025, 2, 3), nine, nine)];
        let cells = project_month(ymd(2025, 2, 1), &shifts);

        let text = render_month(ymd(2025, 2, 1), &cells, Weekday::Mon);
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0].trim(), "February 2025");
        assert_eq!(lines[1], " Mo  Tu  We  Th  Fr  Sa  Su ");
        // 2025-02-01 is a Saturday
        assert_eq!(lines[2], format!("{}  1   2 ", " ".repeat(20)));
        assert!(lines[3].starts_with("  3+"));
        assert!(text.contains(" 15*"));
        assert!(!text.contains("30"));
        // 5 blank cells + 28 days spread over 5 rows
        assert_eq!(lines.len(), 7);
    }
}
