use chrono::{Datelike, NaiveDate};

/// Parse a date from a string (lenient about the separator)
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%Y/%m/%d", // 2024/01/15
        "%Y.%m.%d", // 2024.01.15
        "%Y%m%d",   // 20240115
    ];

    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
}

/// Whether two dates fall in the same calendar month
pub fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Render a number of seconds as HH:MM:SS
pub fn format_hms(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-01-15"),
            Some(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
        );
        assert_eq!(
            parse_date("2024.01.15"),
            Some(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
        );
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("invalid"), None);
    }

    #[test]
    fn test_same_month() {
        let a = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let c = NaiveDate::from_ymd_opt(2023, 3, 15).unwrap();
        assert!(same_month(a, b));
        assert!(!same_month(a, c));
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(9000), "02:30:00");
        assert_eq!(format_hms(3661), "01:01:01");
    }
}
