//! Academic calendar windows shared by the store filters and the analytics engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Scheduling bucket used for targets and analytics windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum AcademicTerm {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "1st")]
    First,
    #[serde(rename = "2nd")]
    Second,
    #[serde(rename = "summer")]
    Summer,
}

impl AcademicTerm {
    pub const fn label(self) -> &'static str {
        match self {
            AcademicTerm::All => "all",
            AcademicTerm::First => "1st",
            AcademicTerm::Second => "2nd",
            AcademicTerm::Summer => "summer",
        }
    }

    /// Inclusive month range covered by the term. April is not part of any named term.
    pub const fn months(self) -> (u32, u32) {
        match self {
            AcademicTerm::All => (1, 12),
            AcademicTerm::First => (1, 3),
            AcademicTerm::Second => (5, 8),
            AcademicTerm::Summer => (9, 12),
        }
    }
}

impl fmt::Display for AcademicTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AcademicTerm {
    type Err = UnknownTermError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(AcademicTerm::All),
            "1st" | "first" => Ok(AcademicTerm::First),
            "2nd" | "second" => Ok(AcademicTerm::Second),
            "summer" => Ok(AcademicTerm::Summer),
            _ => Err(UnknownTermError {
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a recognised term (expected all, 1st, 2nd, or summer)")]
pub struct UnknownTermError {
    pub value: String,
}

/// Inclusive range of submission dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn calendar_year(year: i32) -> Option<Self> {
        Self::for_term(year, AcademicTerm::All)
    }

    pub fn for_term(year: i32, term: AcademicTerm) -> Option<Self> {
        let (first_month, last_month) = term.months();
        let start = NaiveDate::from_ymd_opt(year, first_month, 1)?;
        let end = last_day_of_month(year, last_month)?;
        Some(Self { start, end })
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Compares on the UTC calendar date of the timestamp.
    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        self.contains_date(timestamp.date_naive())
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// Short English month name for a 1-based month number.
pub fn month_name(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    NAMES
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("")
}

/// 1-based month of the UTC submission date.
pub fn submission_month(timestamp: &DateTime<Utc>) -> u32 {
    timestamp.date_naive().month()
}
