//! Pure transition rules shared by the timer service.

use time::{Duration, OffsetDateTime};

use crate::error::AppError;

/// Current UTC time truncated to whole milliseconds, the resolution
/// durations are computed at.
pub fn now_millis() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now - Duration::nanoseconds(i64::from(now.nanosecond() % 1_000_000))
}

/// Whole seconds between `start` and `end`, truncated toward zero on the
/// millisecond difference. Can be one second short of the wall-clock
/// interval when sub-second parts differ.
pub fn duration_seconds(start: OffsetDateTime, end: OffsetDateTime) -> i64 {
    let millis = (end - start).whole_milliseconds();
    (millis / 1000) as i64
}

/// A closed range must have `start` strictly before `end`.
pub fn validate_range(start: OffsetDateTime, end: OffsetDateTime) -> Result<(), AppError> {
    let start_millis = start.unix_timestamp_nanos() / 1_000_000;
    let end_millis = end.unix_timestamp_nanos() / 1_000_000;

    if start_millis == end_millis {
        return Err(AppError::InvalidRange(
            "End time cannot be the same as start time".into(),
        ));
    }
    if end_millis < start_millis {
        return Err(AppError::InvalidRange(
            "Start time cannot be greater than end time".into(),
        ));
    }
    Ok(())
}
