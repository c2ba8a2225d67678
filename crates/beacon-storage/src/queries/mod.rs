// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each takes a [`Database`](crate::Database) and runs on
//! its background connection.

pub mod cache;
pub mod queue;

use chrono::{DateTime, SecondsFormat, Utc};

/// Fixed-width UTC timestamp, so text comparison matches time order.
pub(crate) fn encode_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn decode_time(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn encoded_times_sort_chronologically() {
        let early = Utc.with_ymd_and_hms(2026, 3, 9, 23, 59, 59).unwrap();
        let late = early + chrono::Duration::milliseconds(1);
        assert!(encode_time(&early) < encode_time(&late));
        assert_eq!(encode_time(&early).len(), encode_time(&late).len());
        assert_eq!(decode_time(0, &encode_time(&late)).unwrap(), late);
    }
}
