//! Resample cadences for calendar-time bars

use crate::error::{Result, StylizedFactsError};
use crate::types::TimeOfDay;
use chrono::{Duration, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bar cadence used by calendar resampling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResampleRule {
    #[serde(rename = "1s")]
    Second,
    #[serde(rename = "30s")]
    ThirtySeconds,
    #[serde(rename = "1min")]
    Minute,
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "15min")]
    FifteenMinutes,
}

impl ResampleRule {
    /// Bucket width in seconds
    pub fn seconds(&self) -> u32 {
        match self {
            ResampleRule::Second => 1,
            ResampleRule::ThirtySeconds => 30,
            ResampleRule::Minute => 60,
            ResampleRule::FiveMinutes => 300,
            ResampleRule::FifteenMinutes => 900,
        }
    }

    /// Get the duration represented by this cadence
    pub fn duration(&self) -> Duration {
        Duration::seconds(self.seconds() as i64)
    }

    /// Number of bars in a complete two-session trading day
    ///
    /// Both sessions last 150 minutes and both end points are labeled bars,
    /// so a full day has `2 * (150 min / cadence + 1)` bars.
    pub fn full_session_len(&self) -> usize {
        match self {
            ResampleRule::Second => 18002,
            ResampleRule::ThirtySeconds => 602,
            ResampleRule::Minute => 302,
            ResampleRule::FiveMinutes => 62,
            ResampleRule::FifteenMinutes => 22,
        }
    }

    /// Left edge of the bucket containing `time` (buckets are anchored at midnight)
    pub fn bucket_start(&self, time: TimeOfDay) -> TimeOfDay {
        let step = self.seconds();
        let secs = time.num_seconds_from_midnight();
        let floored = secs - secs % step;
        NaiveTime::from_num_seconds_from_midnight_opt(floored, 0).unwrap_or(time)
    }

    /// Index of the bucket containing `time`, counted from midnight
    pub fn bucket_index(&self, time: TimeOfDay) -> u32 {
        time.num_seconds_from_midnight() / self.seconds()
    }

    /// Left edge of the bucket with the given index
    pub fn bucket_label(&self, index: u32) -> Option<TimeOfDay> {
        NaiveTime::from_num_seconds_from_midnight_opt(index * self.seconds(), 0)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResampleRule::Second => "1s",
            ResampleRule::ThirtySeconds => "30s",
            ResampleRule::Minute => "1min",
            ResampleRule::FiveMinutes => "5min",
            ResampleRule::FifteenMinutes => "15min",
        }
    }
}

impl Default for ResampleRule {
    fn default() -> Self {
        ResampleRule::Minute
    }
}

impl FromStr for ResampleRule {
    type Err = StylizedFactsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "1s" | "s" | "second" => Ok(ResampleRule::Second),
            "30s" => Ok(ResampleRule::ThirtySeconds),
            "1min" | "min" | "minute" | "1t" => Ok(ResampleRule::Minute),
            "5min" | "5t" => Ok(ResampleRule::FiveMinutes),
            "15min" | "15t" => Ok(ResampleRule::FifteenMinutes),
            _ => Err(StylizedFactsError::ParseError(format!(
                "Unknown resample rule: {} (expected one of 1s, 30s, 1min, 5min, 15min)",
                s
            ))),
        }
    }
}

impl fmt::Display for ResampleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
