//! Event-to-bar resampling
//!
//! Converts tick-level event streams into OHLCV bar sequences under two
//! policies: calendar-time buckets for real markets, and transaction-count
//! buckets (driven by a reference curve) for synthetic markets that replay a
//! fixed number of events per session.

use crate::context::RunContext;
use crate::data::bar::{Bar, BarSequence};
use crate::data::curve::{ReferenceCurves, TransactionAllocationCurve};
use crate::data::frequency::ResampleRule;
use crate::data::session::SessionBoundary;
use crate::error::{Result, StylizedFactsError};
use crate::types::{Event, SessionId, TimeOfDay};

/// Output of a resampling pass
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledBars {
    pub bars: BarSequence,
    /// Session boundary read off the resampled index, when the policy knows it
    pub inferred_boundary: Option<SessionBoundary>,
}

/// Trait for turning events into bars
pub trait Resampler: Send + Sync {
    /// Resample one event stream into a bar sequence
    fn resample(&self, events: &[Event], ctx: &mut RunContext) -> Result<ResampledBars>;
}

/// OHLCV aggregation helper
#[derive(Debug, Default)]
struct OhlcvAggregator {
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: f64,
    num_events: u64,
}

impl OhlcvAggregator {
    fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the bar
    fn add_event(&mut self, event: &Event) {
        // Open: first event's price
        if self.open.is_none() {
            self.open = Some(event.price);
        }

        self.high = Some(self.high.map_or(event.price, |h| h.max(event.price)));
        self.low = Some(self.low.map_or(event.price, |l| l.min(event.price)));

        // Close: last event's price
        self.close = Some(event.price);

        self.volume += event.volume;
        self.num_events += 1;
    }

    /// Build the bar; an aggregator without events yields an empty bar
    fn build(&self, time: TimeOfDay) -> Bar {
        Bar {
            time,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            num_events: self.num_events,
        }
    }

    fn aggregate(events: &[Event], time: TimeOfDay) -> Bar {
        let mut aggregator = Self::new();
        for event in events {
            aggregator.add_event(event);
        }
        aggregator.build(time)
    }
}

/// Fixed-cadence resampler for real markets
///
/// Buckets are left-closed and left-labeled, anchored at midnight. Empty
/// buckets inside the traded range produce empty bars with a forward-filled
/// close. When a session boundary is known, lunch-break bars are dropped.
#[derive(Debug, Clone)]
pub struct CalendarResampler {
    rule: ResampleRule,
    boundary: Option<SessionBoundary>,
}

impl CalendarResampler {
    pub fn new(rule: ResampleRule) -> Self {
        Self {
            rule,
            boundary: None,
        }
    }

    /// Create with a session boundary for lunch-break filtering
    pub fn with_boundary(rule: ResampleRule, boundary: SessionBoundary) -> Self {
        Self {
            rule,
            boundary: Some(boundary),
        }
    }

    pub fn rule(&self) -> ResampleRule {
        self.rule
    }

    fn event_times(events: &[Event]) -> Result<Vec<TimeOfDay>> {
        let times = events
            .iter()
            .enumerate()
            .map(|(i, e)| {
                e.time.ok_or_else(|| {
                    StylizedFactsError::ValueError(format!("Event {} has no time of day", i))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(i) = times.windows(2).position(|w| w[1] < w[0]) {
            return Err(StylizedFactsError::ValueError(format!(
                "Event times must be monotonic: {} follows {}",
                times[i + 1],
                times[i]
            )));
        }
        Ok(times)
    }
}

impl Resampler for CalendarResampler {
    fn resample(&self, events: &[Event], _ctx: &mut RunContext) -> Result<ResampledBars> {
        let times = Self::event_times(events)?;
        let (Some(&first), Some(&last)) = (times.first(), times.last()) else {
            return Ok(ResampledBars {
                bars: BarSequence::default(),
                inferred_boundary: None,
            });
        };

        let first_bucket = self.rule.bucket_index(first);
        let last_bucket = self.rule.bucket_index(last);
        let mut bars = Vec::with_capacity((last_bucket - first_bucket + 1) as usize);
        let mut cursor = 0;

        for bucket in first_bucket..=last_bucket {
            let label = self.rule.bucket_label(bucket).ok_or_else(|| {
                StylizedFactsError::ValueError(format!("Bucket {} is past midnight", bucket))
            })?;
            let end = cursor
                + times[cursor..]
                    .iter()
                    .take_while(|&&t| self.rule.bucket_index(t) == bucket)
                    .count();
            bars.push(OhlcvAggregator::aggregate(&events[cursor..end], label));
            cursor = end;
        }

        let mut sequence = BarSequence::new(bars).forward_fill_close();
        if let Some(boundary) = self.boundary {
            let before = sequence.len();
            sequence = sequence.retain_bars(|b| boundary.is_trading_time(b.time));
            log::debug!(
                "Dropped {} break bars outside {} / {}",
                before - sequence.len(),
                boundary.session1_end,
                boundary.session2_start
            );
        }

        Ok(ResampledBars {
            bars: sequence,
            inferred_boundary: None,
        })
    }
}

/// Transaction-count resampler for synthetic markets
///
/// Each session draws one reference curve from its pool; the curve decides
/// how many of the session's events fall into each target bar, so the bar
/// count equals the curve length rather than following a time cadence.
#[derive(Debug, Clone)]
pub struct TransactionCountResampler {
    session1_curves: ReferenceCurves,
    session2_curves: ReferenceCurves,
}

impl TransactionCountResampler {
    pub fn new(session1_curves: ReferenceCurves, session2_curves: ReferenceCurves) -> Self {
        Self {
            session1_curves,
            session2_curves,
        }
    }

    fn curves(&self, session: SessionId) -> &ReferenceCurves {
        match session {
            SessionId::Session1 => &self.session1_curves,
            SessionId::Session2 => &self.session2_curves,
        }
    }

    /// Split one session's events into bars along the given curve
    pub fn resample_session(events: &[Event], curve: &TransactionAllocationCurve) -> BarSequence {
        let cuts = curve.cut_points(events.len());
        let mut bars = Vec::with_capacity(cuts.len());
        let mut previous = 0;

        for (&cut, &time) in cuts.iter().zip(curve.index()) {
            let cut = cut.max(previous);
            bars.push(OhlcvAggregator::aggregate(&events[previous..cut], time));
            previous = cut;
        }

        BarSequence::new(bars).forward_fill_close()
    }
}

impl Resampler for TransactionCountResampler {
    fn resample(&self, events: &[Event], ctx: &mut RunContext) -> Result<ResampledBars> {
        let mut sessions: Vec<BarSequence> = Vec::with_capacity(2);

        for session in [SessionId::Session1, SessionId::Session2] {
            let session_events = events
                .iter()
                .enumerate()
                .filter_map(|(i, e)| match e.session {
                    Some(s) if s == session => Some(Ok(*e)),
                    Some(_) => None,
                    None => Some(Err(StylizedFactsError::ValueError(format!(
                        "Event {} has no session id",
                        i
                    )))),
                })
                .collect::<Result<Vec<_>>>()?;

            let curve = self.curves(session).choose(ctx.rng())?;
            if curve.is_empty() {
                return Err(StylizedFactsError::ValueError(format!(
                    "Reference curve '{}' for {} is empty",
                    curve.name(),
                    session
                )));
            }
            log::debug!(
                "{}: {} events over {} bars (curve '{}')",
                session,
                session_events.len(),
                curve.len(),
                curve.name()
            );
            sessions.push(Self::resample_session(&session_events, &curve));
        }

        let session2 = sessions.pop().unwrap_or_default();
        let session1 = sessions.pop().unwrap_or_default();

        let inferred_boundary = match (session1.bars().last(), session2.bars().first()) {
            (Some(end), Some(start)) => Some(SessionBoundary::new(end.time, start.time)?),
            _ => None,
        };

        Ok(ResampledBars {
            bars: session1.concat(session2).forward_fill_close(),
            inferred_boundary,
        })
    }
}
