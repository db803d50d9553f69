// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted duration strings: `<positive integer><H|D|M|Y>`, case-insensitive.
//!
//! `M` and `Y` are calendar months and years, so `1M` issued on Jan 31
//! expires on the last day of February.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Months, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlUnit {
    Hours,
    Days,
    Months,
    Years,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ttl {
    pub count: u32,
    pub unit: TtlUnit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TtlError {
    #[error("duration must be <positive integer><H|D|M|Y> (e.g. 1H, 2D, 30M, 1Y), got `{0}`")]
    Malformed(String),
    #[error("duration `{0}` is out of range")]
    OutOfRange(String),
}

impl FromStr for Ttl {
    type Err = TtlError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let malformed = || TtlError::Malformed(raw.to_string());

        let mut chars = trimmed.chars();
        let unit = match chars.next_back().map(|c| c.to_ascii_uppercase()) {
            Some('H') => TtlUnit::Hours,
            Some('D') => TtlUnit::Days,
            Some('M') => TtlUnit::Months,
            Some('Y') => TtlUnit::Years,
            _ => return Err(malformed()),
        };

        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) || digits.starts_with('0')
        {
            return Err(malformed());
        }
        let count = digits
            .parse::<u32>()
            .map_err(|_| TtlError::OutOfRange(raw.to_string()))?;

        Ok(Ttl { count, unit })
    }
}

impl Ttl {
    /// Absolute expiry for a key issued at `issued_at`.
    pub fn expires_from(&self, issued_at: DateTime<Utc>) -> Result<DateTime<Utc>, TtlError> {
        let out_of_range = || TtlError::OutOfRange(self.to_string());
        let count = i64::from(self.count);
        match self.unit {
            TtlUnit::Hours => Duration::try_hours(count)
                .and_then(|d| issued_at.checked_add_signed(d))
                .ok_or_else(out_of_range),
            TtlUnit::Days => Duration::try_days(count)
                .and_then(|d| issued_at.checked_add_signed(d))
                .ok_or_else(out_of_range),
            TtlUnit::Months => issued_at
                .checked_add_months(Months::new(self.count))
                .ok_or_else(out_of_range),
            TtlUnit::Years => self
                .count
                .checked_mul(12)
                .and_then(|months| issued_at.checked_add_months(Months::new(months)))
                .ok_or_else(out_of_range),
        }
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            TtlUnit::Hours => 'H',
            TtlUnit::Days => 'D',
            TtlUnit::Months => 'M',
            TtlUnit::Years => 'Y',
        };
        write!(f, "{}{unit}", self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_all_units_case_insensitively() {
        assert_eq!(
            "1H".parse::<Ttl>().unwrap(),
            Ttl { count: 1, unit: TtlUnit::Hours }
        );
        assert_eq!(
            "2d".parse::<Ttl>().unwrap(),
            Ttl { count: 2, unit: TtlUnit::Days }
        );
        assert_eq!(
            " 30m ".parse::<Ttl>().unwrap(),
            Ttl { count: 30, unit: TtlUnit::Months }
        );
        assert_eq!(
            "1Y".parse::<Ttl>().unwrap(),
            Ttl { count: 1, unit: TtlUnit::Years }
        );
    }

    #[test]
    fn rejects_malformed_durations() {
        for raw in ["", "H", "0H", "01D", "-1D", "1W", "1.5H", "1 H", "H1", "12"] {
            assert!(
                matches!(raw.parse::<Ttl>(), Err(TtlError::Malformed(_))),
                "expected `{raw}` to be rejected"
            );
        }
        assert!(matches!(
            "99999999999H".parse::<Ttl>(),
            Err(TtlError::OutOfRange(_))
        ));
    }

    #[test]
    fn computes_expiry() {
        let issued = Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap();

        let ttl: Ttl = "1H".parse().unwrap();
        assert_eq!(
            ttl.expires_from(issued).unwrap(),
            Utc.with_ymd_and_hms(2026, 1, 31, 13, 0, 0).unwrap()
        );

        let ttl: Ttl = "1M".parse().unwrap();
        assert_eq!(
            ttl.expires_from(issued).unwrap(),
            Utc.with_ymd_and_hms(2026, 2, 28, 12, 0, 0).unwrap()
        );

        let ttl: Ttl = "2Y".parse().unwrap();
        assert_eq!(
            ttl.expires_from(issued).unwrap(),
            Utc.with_ymd_and_hms(2028, 1, 31, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn huge_durations_overflow_cleanly() {
        let ttl: Ttl = "4000000000Y".parse().unwrap();
        assert!(matches!(
            ttl.expires_from(Utc::now()),
            Err(TtlError::OutOfRange(_))
        ));
    }
}
