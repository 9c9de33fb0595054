const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 86_400_000;

/// Buckets the age of `timestamp` relative to `now` (both epoch ms):
/// under a minute is "just now", then minutes, hours and days, and from 30
/// days on the absolute UTC date. Future timestamps count as "just now".
pub fn format_relative_time(timestamp: i64, now: i64) -> String {
    let diff = now - timestamp;
    let minutes = diff.div_euclid(MINUTE_MS);
    let hours = diff.div_euclid(HOUR_MS);
    let days = diff.div_euclid(DAY_MS);

    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days < 30 {
        format!("{days}d ago")
    } else {
        format_date(timestamp)
    }
}

/// `YYYY-MM-DD` in UTC.
pub fn format_date(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000_000;

    fn ago(diff: i64) -> String {
        format_relative_time(NOW - diff, NOW)
    }

    #[test]
    fn minute_boundary() {
        assert_eq!(ago(0), "just now");
        assert_eq!(ago(59_999), "just now");
        assert_eq!(ago(60_000), "1m ago");
    }

    #[test]
    fn hour_boundary() {
        assert_eq!(ago(3_599_999), "59m ago");
        assert_eq!(ago(3_600_000), "1h ago");
    }

    #[test]
    fn day_boundary() {
        assert_eq!(ago(86_399_999), "23h ago");
        assert_eq!(ago(86_400_000), "1d ago");
    }

    #[test]
    fn thirty_day_boundary_switches_to_date() {
        assert_eq!(ago(2_591_999_999), "29d ago");
        assert_eq!(ago(2_592_000_000), format_date(NOW - 2_592_000_000));
        assert_eq!(format_relative_time(0, 2_592_000_000), "1970-01-01");
    }

    #[test]
    fn pure_for_equal_inputs() {
        let a = format_relative_time(NOW - 7_200_000, NOW);
        let b = format_relative_time(NOW - 7_200_000, NOW);
        assert_eq!(a, b);
        assert_eq!(a, "2h ago");
    }

    #[test]
    fn future_timestamp_is_just_now() {
        assert_eq!(format_relative_time(NOW + 5_000, NOW), "just now");
    }

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Велосипед горный", 5), "Вело…");
    }
}
