/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One hour in milliseconds
pub const HOUR_MS: i64 = 60 * 60 * 1000;

/// One day in milliseconds
pub const DAY_MS: i64 = 24 * HOUR_MS;
