use chrono::NaiveDate;

use crate::error::IngestError;

pub const DEFAULT_FIRST_END_YEAR: i32 = 2013;
pub const DEFAULT_LAST_END_YEAR: i32 = 2020;

const SEASON_END_MONTH: u32 = 5;
const SEASON_END_DAY: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonBoundary {
    /// First day that no longer belongs to `label`.
    pub ends_on: NaiveDate,
    pub label: String,
}

/// Ordered season-end boundaries used to label match dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonCalendar {
    boundaries: Vec<SeasonBoundary>,
}

impl SeasonCalendar {
    /// One season per end year, each ending on May 30 and labelled
    /// "{year-1}/{year}".
    pub fn from_end_years(first: i32, last: i32) -> Result<Self, IngestError> {
        if first > last {
            return Err(IngestError::Config(format!(
                "season end years out of order: {first} > {last}"
            )));
        }
        let mut boundaries = Vec::new();
        for year in first..=last {
            let ends_on = NaiveDate::from_ymd_opt(year, SEASON_END_MONTH, SEASON_END_DAY)
                .ok_or_else(|| IngestError::Config(format!("invalid season end year {year}")))?;
            boundaries.push(SeasonBoundary {
                ends_on,
                label: season_label(year),
            });
        }
        Ok(Self { boundaries })
    }

    pub fn boundaries(&self) -> &[SeasonBoundary] {
        &self.boundaries
    }

    pub fn season_for(&self, date: NaiveDate) -> Result<&str, IngestError> {
        self.boundaries
            .iter()
            .find(|b| date < b.ends_on)
            .map(|b| b.label.as_str())
            .ok_or(IngestError::SeasonOutOfRange(date))
    }
}

impl Default for SeasonCalendar {
    fn default() -> Self {
        Self::from_end_years(DEFAULT_FIRST_END_YEAR, DEFAULT_LAST_END_YEAR).unwrap_or_else(|_| {
            Self {
                boundaries: Vec::new(),
            }
        })
    }
}

fn season_label(end_year: i32) -> String {
    format!("{}/{}", end_year - 1, end_year)
}

/// Parses the lineup source date format, e.g. "12 May 2018".
pub fn parse_match_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d %B %Y").ok()
}

pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
