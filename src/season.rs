use crate::error::{ReportError, Result};
use crate::utils::ymd;
use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Month and day at which every reporting season begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeasonAnchor {
    month: u32,
    day: u32,
}

impl SeasonAnchor {
    pub fn new(month: u32, day: u32) -> Result<Self> {
        // Checked against a non-leap year, so 02-29 is rejected.
        if NaiveDate::from_ymd_opt(2023, month, day).is_none() {
            return Err(ReportError::InvalidSeasonAnchor(format!(
                "{:02}-{:02}",
                month, day
            )));
        }
        Ok(Self { month, day })
    }

    /// Parses the `MM-DD` form used in the configuration (e.g. `"06-01"`).
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || ReportError::InvalidSeasonAnchor(value.to_string());

        let (month, day) = value.trim().split_once('-').ok_or_else(invalid)?;
        if month.len() != 2 || day.len() != 2 {
            return Err(invalid());
        }
        let month: u32 = month.parse().map_err(|_| invalid())?;
        let day: u32 = day.parse().map_err(|_| invalid())?;

        Self::new(month, day).map_err(|_| invalid())
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// First day of the season starting in `year`.
    pub fn start_in(&self, year: i32) -> Result<NaiveDate> {
        ymd(year, self.month, self.day)
    }

    /// First day of the season `date` belongs to.
    pub fn season_start_for(&self, date: NaiveDate) -> Result<NaiveDate> {
        let start = self.start_in(date.year())?;
        if date >= start {
            Ok(start)
        } else {
            self.start_in(date.year() - 1)
        }
    }
}

impl Default for SeasonAnchor {
    fn default() -> Self {
        Self { month: 1, day: 1 }
    }
}

impl fmt::Display for SeasonAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

impl FromStr for SeasonAnchor {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SeasonAnchor {
    type Error = ReportError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<SeasonAnchor> for String {
    fn from(anchor: SeasonAnchor) -> Self {
        anchor.to_string()
    }
}

/// Half-open date range `[start, end)` covering one season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SeasonBoundary {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SeasonBoundary {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Label shown in the reports, e.g. `2022-2023`.
    /// A season anchored on January 1st is labelled with its single year.
    pub fn label(&self) -> String {
        if self.start.year() == self.end.year() - 1 && self.start.ordinal() == 1 {
            self.start.year().to_string()
        } else {
            format!("{}-{}", self.start.year(), self.end.year())
        }
    }
}

/// Season limits from the season starting in `first_year` up to the one
/// containing `last_date`, most recent first.
pub fn compute_season_limits(
    anchor: SeasonAnchor,
    first_year: i32,
    last_date: NaiveDate,
) -> Result<Vec<SeasonBoundary>> {
    let first_start = anchor.start_in(first_year)?;
    let last_start = anchor.season_start_for(last_date)?;

    let mut limits = Vec::new();
    let mut year = last_start.year();
    while year >= first_start.year() {
        limits.push(SeasonBoundary {
            start: anchor.start_in(year)?,
            end: anchor.start_in(year + 1)?,
        });
        year -= 1;
    }

    Ok(limits)
}

/// Season limits spanning every date given, most recent first.
pub fn compute_season_limits_for_dates<I>(
    anchor: SeasonAnchor,
    dates: I,
) -> Result<Vec<SeasonBoundary>>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut bounds: Option<(NaiveDate, NaiveDate)> = None;
    for date in dates {
        bounds = Some(match bounds {
            None => (date, date),
            Some((min, max)) => (min.min(date), max.max(date)),
        });
    }

    match bounds {
        None => Ok(Vec::new()),
        Some((min, max)) => {
            let first_year = anchor.season_start_for(min)?.year();
            compute_season_limits(anchor, first_year, max)
        }
    }
}
