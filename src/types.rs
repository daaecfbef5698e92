//! Core types and constants

use crate::error::{Result, StylizedFactsError};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Time-of-day index used by bar sequences
pub type TimeOfDay = NaiveTime;

/// Price type
pub type Price = f64;

/// Quantity/volume type
pub type Quantity = f64;

/// Parse a time-of-day such as `09:00:00.357000` or `11:30:00`
pub fn parse_time_of_day(s: &str) -> Result<TimeOfDay> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|e| StylizedFactsError::ParseError(format!("Invalid time of day '{}': {}", s, e)))
}

/// Trading session within one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SessionId {
    /// Morning session (before the lunch break)
    Session1,
    /// Afternoon session (after the lunch break)
    Session2,
}

impl SessionId {
    /// Numeric id as written in synthetic event logs
    pub fn number(&self) -> u8 {
        match self {
            SessionId::Session1 => 1,
            SessionId::Session2 => 2,
        }
    }

    /// Session from its numeric id
    pub fn from_number(id: i64) -> Result<Self> {
        match id {
            1 => Ok(SessionId::Session1),
            2 => Ok(SessionId::Session2),
            _ => Err(StylizedFactsError::ParseError(format!("Unknown session id: {}", id))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionId::Session1 => "session1",
            SessionId::Session2 => "session2",
        }
    }
}

impl FromStr for SessionId {
    type Err = StylizedFactsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "session1" | "1" => Ok(SessionId::Session1),
            "session2" | "2" => Ok(SessionId::Session2),
            _ => Err(StylizedFactsError::ParseError(format!("Unknown session name: {}", s))),
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One tick/trade record
///
/// Real-market events carry a time of day; synthetic events carry the
/// session they were generated in and are ordered by position only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub price: Price,
    pub volume: Quantity,
    pub time: Option<TimeOfDay>,
    pub session: Option<SessionId>,
}

impl Event {
    /// Create a timestamped event (real market)
    pub fn timed(time: TimeOfDay, price: Price, volume: Quantity) -> Self {
        Self {
            price,
            volume,
            time: Some(time),
            session: None,
        }
    }

    /// Create a session-tagged event (synthetic market)
    pub fn in_session(session: SessionId, price: Price, volume: Quantity) -> Self {
        Self {
            price,
            volume,
            time: None,
            session: Some(session),
        }
    }
}
