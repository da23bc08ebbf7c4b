//! Display formatting for publication timestamps.
//!
//! Month names come from a fixed Brazilian-Portuguese table so the output
//! never depends on the machine's locale. Timestamps are rendered in the
//! offset they carry; the build machine's timezone is never consulted.

use chrono::{DateTime, Datelike, TimeZone, Timelike};

/// Abbreviated pt-BR month names, January first.
const PT_BR_MONTHS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// `dd MMM yyyy`, e.g. `05 mar 2023`.
pub fn format_date<Tz: TimeZone>(ts: &DateTime<Tz>) -> String {
    let month = PT_BR_MONTHS[ts.month0() as usize];
    format!("{:02} {} {:04}", ts.day(), month, ts.year())
}

/// 24-hour `HH:mm`, e.g. `08:05`.
pub fn format_hours<Tz: TimeZone>(ts: &DateTime<Tz>) -> String {
    format!("{:02}:{:02}", ts.hour(), ts.minute())
}

/// `dd MMM yyyy, às HH:mm`, used for the "edited at" line of a post.
pub fn format_edited<Tz: TimeZone>(ts: &DateTime<Tz>) -> String {
    format!("{}, às {}", format_date(ts), format_hours(ts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn formats_date_with_portuguese_month() {
        assert_eq!(format_date(&at(2023, 3, 5, 0, 0)), "05 mar 2023");
    }

    #[test]
    fn formats_every_month() {
        let months: Vec<String> = (1..=12)
            .map(|m| format_date(&at(2021, m, 15, 12, 0)))
            .collect();
        assert_eq!(months[1], "15 fev 2021");
        assert_eq!(months[4], "15 mai 2021");
        assert_eq!(months[7], "15 ago 2021");
        assert_eq!(months[8], "15 set 2021");
        assert_eq!(months[9], "15 out 2021");
        assert_eq!(months[11], "15 dez 2021");
    }

    #[test]
    fn formats_hours_zero_padded() {
        assert_eq!(format_hours(&at(2023, 3, 5, 8, 5)), "08:05");
    }

    #[test]
    fn midnight_is_zero_hour() {
        assert_eq!(format_hours(&at(2023, 3, 5, 0, 0)), "00:00");
        assert_eq!(format_hours(&at(2023, 3, 5, 23, 59)), "23:59");
    }

    #[test]
    fn uses_the_timestamps_own_offset() {
        let brt = FixedOffset::west_opt(3 * 3600).unwrap();
        // 02:30 UTC on the 6th is still the 5th in UTC-3.
        let ts = brt.with_ymd_and_hms(2023, 3, 5, 23, 30, 0).unwrap();
        assert_eq!(format_date(&ts), "05 mar 2023");
        assert_eq!(format_hours(&ts), "23:30");
    }

    #[test]
    fn formats_edited_line() {
        assert_eq!(format_edited(&at(2021, 3, 19, 15, 49)), "19 mar 2021, às 15:49");
    }
}
