//! Trading sessions and session-scoped column derivation

use crate::data::bar::{BarSequence, DerivedColumn};
use crate::error::{Result, StylizedFactsError};
use crate::types::{parse_time_of_day, SessionId, TimeOfDay};
use serde::{Deserialize, Serialize};

/// End of the morning session and start of the afternoon session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBoundary {
    pub session1_end: TimeOfDay,
    pub session2_start: TimeOfDay,
}

impl SessionBoundary {
    pub fn new(session1_end: TimeOfDay, session2_start: TimeOfDay) -> Result<Self> {
        if session2_start < session1_end {
            return Err(StylizedFactsError::ValueError(format!(
                "Session 2 start {} precedes session 1 end {}",
                session2_start, session1_end
            )));
        }
        Ok(Self {
            session1_end,
            session2_start,
        })
    }

    /// Parse both times from strings such as `11:30:00` and `12:30:00`
    pub fn parse(session1_end: &str, session2_start: &str) -> Result<Self> {
        Self::new(
            parse_time_of_day(session1_end)?,
            parse_time_of_day(session2_start)?,
        )
    }

    /// Check if a time of day belongs to the given session
    pub fn contains(&self, session: SessionId, time: TimeOfDay) -> bool {
        match session {
            SessionId::Session1 => time <= self.session1_end,
            SessionId::Session2 => self.session2_start <= time,
        }
    }

    /// Check if a time of day falls in either session (i.e. not in the break)
    pub fn is_trading_time(&self, time: TimeOfDay) -> bool {
        self.contains(SessionId::Session1, time) || self.contains(SessionId::Session2, time)
    }
}

/// Applies the one-time column derivation pass to bar sequences
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionPartitioner {
    boundary: Option<SessionBoundary>,
}

impl SessionPartitioner {
    pub fn new(boundary: Option<SessionBoundary>) -> Self {
        Self { boundary }
    }

    /// Pick the boundary to use: explicit, else inferred, else none
    pub fn resolve(
        explicit: Option<SessionBoundary>,
        inferred: Option<SessionBoundary>,
    ) -> Option<SessionBoundary> {
        explicit.or(inferred)
    }

    pub fn boundary(&self) -> Option<SessionBoundary> {
        self.boundary
    }

    /// Attach scaled columns, plus session-scoped ones when the boundary is known
    ///
    /// Columns already present are left untouched, so calling this more than
    /// once yields the same sequence. The index and row count never change.
    pub fn derive(&self, sequence: BarSequence) -> Result<BarSequence> {
        let volume: Vec<f64> = sequence.bars().iter().map(|b| b.volume).collect();
        let num_events: Vec<f64> = sequence
            .bars()
            .iter()
            .map(|b| b.num_events as f64)
            .collect();

        let mut sequence = sequence
            .with_derived(DerivedColumn::ScaledVolume, scale_to_unit_sum(&volume))?
            .with_derived(DerivedColumn::ScaledNumEvents, scale_to_unit_sum(&num_events))?;

        let Some(boundary) = self.boundary else {
            return Ok(sequence);
        };

        let times = sequence.times();
        for session in [SessionId::Session1, SessionId::Session2] {
            for (base, scoped) in [
                (
                    DerivedColumn::ScaledVolume,
                    DerivedColumn::SessionScaledVolume(session),
                ),
                (
                    DerivedColumn::ScaledNumEvents,
                    DerivedColumn::SessionScaledNumEvents(session),
                ),
            ] {
                if sequence.has_column(scoped.into()) {
                    continue;
                }
                let scaled = sequence.derived(base).unwrap_or_default();
                let restricted: Vec<f64> = times
                    .iter()
                    .zip(scaled)
                    .map(|(&time, &v)| {
                        if boundary.contains(session, time) && !v.is_nan() {
                            v
                        } else {
                            0.0
                        }
                    })
                    .collect();
                sequence = sequence.with_derived(scoped, scale_to_unit_sum(&restricted))?;
            }
        }

        log::debug!(
            "Derived {} columns for {} bars",
            sequence.derived_columns().count(),
            sequence.len()
        );
        Ok(sequence)
    }
}

/// Divide by the sum so the values add up to one; all zeros if the sum is zero
pub fn scale_to_unit_sum(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().filter(|v| !v.is_nan()).sum();
    if total == 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| v / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::bar::{Bar, Column};
    use approx::assert_relative_eq;
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> TimeOfDay {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day() -> BarSequence {
        BarSequence::new(vec![
            Bar::new(t(11, 29), 100.0, 100.0, 100.0, 100.0, 10.0, 2),
            Bar::new(t(11, 30), 100.0, 101.0, 100.0, 101.0, 30.0, 6),
            Bar::new(t(12, 30), 101.0, 101.0, 99.0, 99.0, 40.0, 1),
            Bar::new(t(12, 31), 99.0, 99.0, 98.0, 98.0, 20.0, 1),
        ])
    }

    fn boundary() -> SessionBoundary {
        SessionBoundary::parse("11:30:00", "12:30:00").unwrap()
    }

    #[test]
    fn test_boundary_contains() {
        let b = boundary();
        assert!(b.contains(SessionId::Session1, t(11, 30)));
        assert!(!b.contains(SessionId::Session1, t(11, 31)));
        assert!(b.contains(SessionId::Session2, t(12, 30)));
        assert!(!b.is_trading_time(t(12, 0)));
        assert!(SessionBoundary::parse("12:30:00", "11:30:00").is_err());
        assert!(SessionBoundary::parse("noon", "12:30:00").is_err());
    }

    #[test]
    fn test_resolve_prefers_explicit() {
        let explicit = boundary();
        let inferred = SessionBoundary::parse("11:00:00", "13:00:00").unwrap();
        assert_eq!(
            SessionPartitioner::resolve(Some(explicit), Some(inferred)),
            Some(explicit)
        );
        assert_eq!(SessionPartitioner::resolve(None, Some(inferred)), Some(inferred));
        assert_eq!(SessionPartitioner::resolve(None, None), None);
    }

    #[test]
    fn test_derive_without_boundary() {
        let seq = SessionPartitioner::new(None).derive(day()).unwrap();
        let scaled = seq.derived(DerivedColumn::ScaledVolume).unwrap();
        assert_relative_eq!(scaled.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(scaled[2], 0.4, epsilon = 1e-12);
        assert!(!seq.has_column(Column::Derived(DerivedColumn::SessionScaledVolume(
            SessionId::Session1
        ))));
        assert_eq!(seq.len(), 4);
    }

    #[test]
    fn test_derive_session_columns() {
        let seq = SessionPartitioner::new(Some(boundary())).derive(day()).unwrap();
        let s1 = seq
            .derived(DerivedColumn::SessionScaledVolume(SessionId::Session1))
            .unwrap();
        assert_relative_eq!(s1[0], 0.25, epsilon = 1e-12);
        assert_relative_eq!(s1[1], 0.75, epsilon = 1e-12);
        assert_eq!(s1[2], 0.0);
        let s2 = seq
            .derived(DerivedColumn::SessionScaledNumEvents(SessionId::Session2))
            .unwrap();
        assert_eq!(s2[0], 0.0);
        assert_relative_eq!(s2[2], 0.5, epsilon = 1e-12);
        assert_relative_eq!(s2.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_derive_is_idempotent() {
        let partitioner = SessionPartitioner::new(Some(boundary()));
        let once = partitioner.derive(day()).unwrap();
        let twice = partitioner.derive(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_zero_sum_scales_to_zeros() {
        assert_eq!(scale_to_unit_sum(&[0.0, 0.0]), vec![0.0, 0.0]);
    }
}
