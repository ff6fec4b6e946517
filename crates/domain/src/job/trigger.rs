//! Trigger: the daily wall-clock time at which a job fires.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Fires every day at `hour:minute` local time.
///
/// Ordering is chronological within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Build a trigger after range-checking both fields.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::HourOutOfRange`] or
    /// [`ValidationError::MinuteOutOfRange`].
    pub fn new(hour: u32, minute: u32) -> Result<Self, ValidationError> {
        let hour = u8::try_from(hour)
            .ok()
            .filter(|h| *h <= 23)
            .ok_or(ValidationError::HourOutOfRange(hour))?;
        let minute = u8::try_from(minute)
            .ok()
            .filter(|m| *m <= 59)
            .ok_or(ValidationError::MinuteOutOfRange(minute))?;
        Ok(Self { hour, minute })
    }

    #[must_use]
    pub fn hour(self) -> u8 {
        self.hour
    }

    #[must_use]
    pub fn minute(self) -> u8 {
        self.minute
    }

    /// Whether this trigger is due at `time` (seconds are ignored).
    #[must_use]
    pub fn matches(self, time: NaiveTime) -> bool {
        time.hour() == u32::from(self.hour) && time.minute() == u32::from(self.minute)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    /// Parse `H:MM` or `HH:MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ValidationError::MalformedTime(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(malformed)?;
        let hour = parse_field(hour).ok_or_else(malformed)?;
        let minute = parse_field(minute).ok_or_else(malformed)?;
        Self::new(hour, minute)
    }
}

fn parse_field(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_accept_every_valid_time_of_day() {
        for hour in 0..24 {
            for minute in 0..60 {
                let t = TimeOfDay::new(hour, minute).unwrap();
                assert_eq!(t.to_string(), format!("{hour:02}:{minute:02}"));
            }
        }
    }

    #[test]
    fn should_reject_hour_24() {
        assert_eq!(
            "24:00".parse::<TimeOfDay>().unwrap_err(),
            ValidationError::HourOutOfRange(24)
        );
    }

    #[test]
    fn should_reject_minute_60() {
        assert_eq!(
            "12:60".parse::<TimeOfDay>().unwrap_err(),
            ValidationError::MinuteOutOfRange(60)
        );
    }

    #[test]
    fn should_parse_single_digit_hour() {
        let t: TimeOfDay = "6:30".parse().unwrap();
        assert_eq!((t.hour(), t.minute()), (6, 30));
        assert_eq!(t.to_string(), "06:30");
    }

    #[test]
    fn should_reject_malformed_times() {
        for raw in ["", "0630", "6:", ":30", "ab:cd", "-1:00", "6:30:00", "6 :3x"] {
            assert!(
                matches!(
                    raw.parse::<TimeOfDay>(),
                    Err(ValidationError::MalformedTime(_))
                ),
                "{raw:?} should be malformed"
            );
        }
    }

    #[test]
    fn should_not_overflow_on_huge_numbers() {
        assert!("99999999999:00".parse::<TimeOfDay>().is_err());
        assert_eq!(
            TimeOfDay::new(300, 0).unwrap_err(),
            ValidationError::HourOutOfRange(300)
        );
    }

    #[test]
    fn should_order_chronologically() {
        let early: TimeOfDay = "06:30".parse().unwrap();
        let late: TimeOfDay = "18:05".parse().unwrap();
        assert!(early < late);
    }

    #[test]
    fn should_match_wall_clock_minute_ignoring_seconds() {
        let t = TimeOfDay::new(6, 30).unwrap();
        assert!(t.matches(NaiveTime::from_hms_opt(6, 30, 59).unwrap()));
        assert!(!t.matches(NaiveTime::from_hms_opt(6, 31, 0).unwrap()));
    }
}
