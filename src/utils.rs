use crate::error::{ReportError, Result};
use chrono::NaiveDate;

/// Formats a date the way the cooperative's pages display it: `dd/mm/yyyy`.
pub fn date_fr(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Parses a `YYYY-MM-DD` date as sent by the search forms.
pub fn parse_iso_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ReportError::DateError(format!(
            "Invalid date format: {}. Expected YYYY-MM-DD",
            value
        ))
    })
}

/// Builds a date from parts, reporting impossible combinations instead of panicking.
pub fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        ReportError::DateError(format!(
            "{:04}-{:02}-{:02} is not a valid date",
            year, month, day
        ))
    })
}

/// Joins display names with the separator used across the recap pages.
pub fn join_names<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|n| n.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_fr() {
        let date = NaiveDate::from_ymd_opt(2023, 3, 7).unwrap();
        assert_eq!(date_fr(date), "07/03/2023");
    }

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(
            parse_iso_date(" 2022-06-01 ").unwrap(),
            NaiveDate::from_ymd_opt(2022, 6, 1).unwrap()
        );
        assert!(parse_iso_date("01/06/2022").is_err());
        assert!(parse_iso_date("2022-13-01").is_err());
    }

    #[test]
    fn test_ymd_rejects_impossible_dates() {
        assert!(ymd(2023, 2, 29).is_err());
        assert!(ymd(2024, 2, 29).is_ok());
    }

    #[test]
    fn test_join_names() {
        assert_eq!(join_names(["Chêne", "Hêtre"]), "Chêne, Hêtre");
        assert_eq!(join_names(Vec::<String>::new()), "");
    }
}
