//! Time and timestamp helpers.

use chrono::{DateTime, Local, NaiveDateTime, Timelike, Utc};

/// UTC timestamp used for record metadata such as `created_at`.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Return the current local wall-clock time, which is what job triggers
/// are expressed in.
#[must_use]
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Drop seconds and sub-second precision.
#[must_use]
pub fn truncate_to_minute(at: NaiveDateTime) -> NaiveDateTime {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}
