//! Fixed-point money amounts with German-locale parsing and rendering.
//!
//! Bank exports write `-1.234,56` (period as thousands separator, comma as
//! decimal separator); the canonical form is `-1234.56` with exactly two
//! decimal places. A negative amount always means money leaving the account.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unparseable amount {0:?}")]
pub struct AmountParseError(pub String);

/// Signed amount in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(i64);

impl Amount {
    pub fn from_cents(cents: i64) -> Self {
        Amount(cents)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    /// Parse a German-locale amount: optional sign, optional period thousands
    /// separators, comma before one or two decimal digits.
    pub fn parse_de(input: &str) -> Result<Self, AmountParseError> {
        let err = || AmountParseError(input.to_string());
        let s = input.trim();

        let (negative, rest) = match s.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };

        let (int_part, frac_part) = match rest.split_once(',') {
            Some((i, f)) => (i, f),
            None => (rest, ""),
        };

        let digits: String = int_part.chars().filter(|c| *c != '.').collect();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        if frac_part.len() > 2 || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }

        let whole: i64 = digits.parse().map_err(|_| err())?;
        let frac: i64 = if frac_part.is_empty() {
            0
        } else {
            let parsed: i64 = frac_part.parse().map_err(|_| err())?;
            if frac_part.len() == 1 { parsed * 10 } else { parsed }
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .ok_or_else(err)?;
        Ok(Amount(if negative { -cents } else { cents }))
    }

    /// Render back into the locale form, thousands separators included.
    pub fn format_de(self) -> String {
        let cents = self.0.unsigned_abs();
        let whole = cents / 100;
        let frac = cents % 100;

        let plain = whole.to_string();
        let mut grouped = String::new();
        for (i, c) in plain.chars().enumerate() {
            if i > 0 && (plain.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }

        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{sign}{grouped},{frac:02}")
    }
}

impl std::ops::Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount(-self.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cents = self.0.unsigned_abs();
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{sign}{}.{:02}", cents / 100, cents % 100)
    }
}
