use std::{fmt, str::FromStr};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Format of every `dt=` partition segment.
pub const RUN_DATE_FORMAT: &str = "%Y-%m-%d";

/// The calendar date a pipeline run produces partitions for.
///
/// All artifacts written by one run (raw partitions, the curated partition,
/// derived-table rows) share the same `RunDate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunDate(NaiveDate);

impl RunDate {
    pub const fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Today's date on the local clock, the default partition of a run.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for RunDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(RUN_DATE_FORMAT))
    }
}

impl FromStr for RunDate {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), RUN_DATE_FORMAT).map(Self)
    }
}

impl TryFrom<String> for RunDate {
    type Error = chrono::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RunDate> for String {
    fn from(value: RunDate) -> Self {
        value.to_string()
    }
}

impl From<NaiveDate> for RunDate {
    fn from(value: NaiveDate) -> Self {
        Self(value)
    }
}
