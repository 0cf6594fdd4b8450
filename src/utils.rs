use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveTime};

/// Shift length as "4h", "7h 30m" or "45m". Reversed shifts get a minus sign.
pub fn format_span(span: Duration) -> String {
    let total = span.num_minutes();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    let hours = total / 60;
    let mins = total % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if mins > 0 || hours == 0 {
        parts.push(format!("{}m", mins));
    }

    format!("{}{}", sign, parts.join(" "))
}

/// Accepts "HH:MM" or "HH:MM:SS".
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .with_context(|| format!("invalid time '{}', expected HH:MM", s))
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date '{}', expected YYYY-MM-DD", s))
}

/// Accepts "YYYY-MM" or a full date, returning a day in that month.
pub fn parse_month(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d")
        .or_else(|_| parse_date(s))
        .with_context(|| format!("invalid month '{}', expected YYYY-MM", s))
}

/// Shift length such as "4h" or "7h 30m". Must be positive and under a day.
pub fn parse_length(length: &str) -> Result<Duration> {
    let std_length = humantime::parse_duration(length.trim())
        .with_context(|| format!("invalid shift length '{}'", length))?;
    let length = Duration::from_std(std_length)?;
    if length <= Duration::zero() {
        anyhow::bail!("a shift must last longer than zero");
    }
    if length >= Duration::days(1) {
        anyhow::bail!("a shift cannot last a full day or more");
    }
    Ok(length)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tod(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_format_span() {
        assert_eq!(format_span(Duration::zero()), "0m");
        assert_eq!(format_span(Duration::minutes(45)), "45m");
        assert_eq!(format_span(Duration::hours(4)), "4h");
        assert_eq!(format_span(Duration::minutes(450)), "7h 30m");
        assert_eq!(format_span(-Duration::hours(16)), "-16h");
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(parse_time_of_day("09:00").unwrap(), tod(9, 0));
        assert_eq!(parse_time_of_day(" 17:45 ").unwrap(), tod(17, 45));
        assert_eq!(parse_time_of_day("08:15:00").unwrap(), tod(8, 15));
        assert!(parse_time_of_day("25:00").is_err());
        assert!(parse_time_of_day("nine").is_err());
    }

    #[test]
    fn test_parse_dates() {
        let jan15 = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(parse_date("2025-01-15").unwrap(), jan15);
        assert!(parse_date("2025-02-30").is_err());
        assert_eq!(parse_month("2025-01").unwrap(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(parse_month("2025-01-15").unwrap(), jan15);
        assert!(parse_month("2025-13").is_err());
    }

    #[test]
    fn test_parse_length() {
        assert_eq!(parse_length("4h").unwrap(), Duration::hours(4));
        assert_eq!(parse_length(" 8h ").unwrap(), Duration::hours(8));
        assert_eq!(parse_length("7h 30m").unwrap(), Duration::minutes(450));
        assert!(parse_length("0s").is_err());
        assert!(parse_length("1day").is_err());
        assert!(parse_length("soon").is_err());
    }
}
