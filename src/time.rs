use chrono::Utc;

/// Current wall clock time in unix milliseconds, the unit the reporting service expects
pub fn now_unix_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Timestamp `duration_ms` before now, used to backdate item starts
pub fn millis_ago(duration_ms: u64) -> i64 {
    now_unix_millis().saturating_sub(i64::try_from(duration_ms).unwrap_or(i64::MAX))
}
