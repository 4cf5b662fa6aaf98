//! Date handling for the bank's `dd.mm.yyyy` locale format.

use chrono::{Days, NaiveDate};

pub const DE_DATE_FORMAT: &str = "%d.%m.%Y";

/// Parse a `dd.mm.yyyy` date as it appears in exports and CLI arguments.
pub fn parse_de_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), DE_DATE_FORMAT)
}

/// Inclusive export window, rendered in the bank's locale format on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// The default window: `days` back through `today`.
    pub fn last_days(today: NaiveDate, days: u64) -> Self {
        let from = today.checked_sub_days(Days::new(days)).unwrap_or(today);
        Self { from, to: today }
    }

    pub fn from_de(&self) -> String {
        self.from.format(DE_DATE_FORMAT).to_string()
    }

    pub fn to_de(&self) -> String {
        self.to.format(DE_DATE_FORMAT).to_string()
    }
}
