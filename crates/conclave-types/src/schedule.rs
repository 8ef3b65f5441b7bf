use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Date format accepted by [`DateRange::parse`] (`2024-05-28`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The days a conference runs, inclusive on both ends.
///
/// Construction guarantees `end >= start`; a single-day conference has
/// `start == end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TypeError> {
        if end < start {
            return Err(TypeError::InvertedDates {
                start: start.format(DATE_FORMAT).to_string(),
                end: end.format(DATE_FORMAT).to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse both ends from `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, TypeError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, TypeError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| TypeError::InvalidDate {
        value: value.to_string(),
    })
}
