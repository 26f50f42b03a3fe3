//! Validated rental period.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when constructing a [`RentalPeriod`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    /// A date string could not be parsed as an ISO-8601 calendar date.
    #[error("invalid date format: {0}")]
    InvalidDate(String),

    /// The end date is not strictly after the start date.
    #[error("rental period must end after it starts")]
    EmptyPeriod,
}

/// A half-open rental date range: `[date_from, date_to)`.
///
/// The end date is exclusive, so the number of billed days is the calendar
/// difference between the two dates. Construction enforces a strictly
/// positive duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalPeriod {
    date_from: NaiveDate,
    date_to: NaiveDate,
}

impl RentalPeriod {
    /// Creates a period from two dates, requiring `date_to > date_from`.
    pub fn new(date_from: NaiveDate, date_to: NaiveDate) -> Result<Self, PeriodError> {
        if date_to <= date_from {
            return Err(PeriodError::EmptyPeriod);
        }
        Ok(Self { date_from, date_to })
    }

    /// Parses a period from two ISO-8601 date strings (`YYYY-MM-DD`).
    pub fn parse(date_from: &str, date_to: &str) -> Result<Self, PeriodError> {
        let from = NaiveDate::parse_from_str(date_from, "%Y-%m-%d")
            .map_err(|_| PeriodError::InvalidDate(date_from.to_string()))?;
        let to = NaiveDate::parse_from_str(date_to, "%Y-%m-%d")
            .map_err(|_| PeriodError::InvalidDate(date_to.to_string()))?;
        Self::new(from, to)
    }

    /// Returns the first rental day.
    pub fn date_from(&self) -> NaiveDate {
        self.date_from
    }

    /// Returns the exclusive end date.
    pub fn date_to(&self) -> NaiveDate {
        self.date_to
    }

    /// Number of billed days; always positive. This is the price multiplier
    /// for the rental.
    pub fn duration_days(&self) -> i64 {
        (self.date_to - self.date_from).num_days()
    }
}
