//! Time related utils.

use chrono::Utc;

/// DateTime is the alias for `chrono::DateTime<Utc>`.
pub type DateTime = chrono::DateTime<Utc>;

/// Create datetime of now.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format time into date: `20220301`
pub fn format_date(t: DateTime) -> String {
    t.format("%Y%m%d").to_string()
}

/// Format time into ISO8601: `20220313T072004Z`
pub fn format_iso8601(t: DateTime) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, "19700101", "19700101T000000Z"; "unix epoch")]
    #[test_case(1_634_733_720, "20211020", "20211020T124200Z"; "with time of day")]
    fn test_format(secs: i64, date: &str, iso8601: &str) {
        let t = DateTime::from_timestamp(secs, 0).expect("in range");
        assert_eq!(format_date(t), date);
        assert_eq!(format_iso8601(t), iso8601);
    }
}
