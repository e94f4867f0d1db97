//! Trading-day derivation from `ts_ns`, used by the raw writer and the
//! columnar writer's row schema (spec §4.3, §4.4).

use chrono::{DateTime, Utc};

/// Derive the `YYYY-MM-DD` trading day (UTC) from a `ts_ns` timestamp.
///
/// Mirrors `shijim/recorder/raw_writer.py`'s
/// `datetime.fromtimestamp(ts_ns / 1e9, tz=utc).strftime("%Y-%m-%d")`.
pub fn trading_day(ts_ns: i64) -> String {
    datetime_from_ts_ns(ts_ns).format("%Y-%m-%d").to_string()
}

/// Convert `ts_ns` (UTC nanoseconds since epoch) into a `DateTime<Utc>`.
pub fn datetime_from_ts_ns(ts_ns: i64) -> DateTime<Utc> {
    let secs = ts_ns.div_euclid(1_000_000_000);
    let nanos = ts_ns.rem_euclid(1_000_000_000) as u32;
    DateTime::from_timestamp(secs, nanos).expect("ts_ns out of range for DateTime<Utc>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_expected_trading_day() {
        // 2024-01-02T00:00:00Z
        let ts_ns = 1_704_153_600_000_000_000;
        assert_eq!(trading_day(ts_ns), "2024-01-02");
    }

    #[test]
    fn handles_sub_second_nanos() {
        let ts_ns = 1_704_153_600_123_456_789;
        let dt = datetime_from_ts_ns(ts_ns);
        assert_eq!(dt.timestamp_subsec_nanos(), 123_456_789);
    }
}
