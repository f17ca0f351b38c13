use chrono::{DateTime, TimeZone, Utc};

/// Current Unix time with sub-second precision
pub fn unix_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Unix timestamp of midnight, in `now`'s own timezone, of the day `now`
/// falls on
pub fn day_start<Tz: TimeZone>(now: &DateTime<Tz>) -> i64 {
    let midnight = now.date_naive().and_hms_opt(0, 0, 0).unwrap_or_default();

    now.timezone()
        .from_local_datetime(&midnight)
        .earliest()
        .map(|start| start.timestamp())
        // Midnight skipped by a DST jump: fall back to the UTC reading
        .unwrap_or_else(|| midnight.and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn test_day_start_utc() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 17, 42, 9).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        assert_eq!(day_start(&now), start.timestamp());
    }

    #[test]
    fn test_day_start_uses_local_midnight() {
        let jakarta = FixedOffset::east_opt(7 * 3600).unwrap();
        // 23:30 UTC on the 4th is already the 5th in UTC+7
        let now = Utc
            .with_ymd_and_hms(2024, 3, 4, 23, 30, 0)
            .unwrap()
            .with_timezone(&jakarta);
        let start = jakarta.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        assert_eq!(day_start(&now), start.timestamp());
    }

    #[test]
    fn test_same_day_shares_bucket() {
        let morning = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 1).unwrap();
        let night = Utc.with_ymd_and_hms(2024, 3, 5, 23, 59, 59).unwrap();
        assert_eq!(day_start(&morning), day_start(&night));
        assert_eq!(day_start(&night) + 86_400, day_start(&(night + chrono::Duration::seconds(1))));
    }
}
