//! OHLCV bars and bar sequences
//!
//! A [`BarSequence`] is the unit every estimator works on: an ordered run of
//! bars for one instrument or one simulation, plus any derived columns that
//! have been attached by the session partitioner.

use crate::error::{Result, StylizedFactsError};
use crate::types::{Price, Quantity, SessionId, TimeOfDay};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One OHLCV observation
///
/// Price fields are `None` for an empty bar (no events in its bucket), except
/// `close`, which is forward-filled once the sequence is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Time-of-day label (left edge of the bucket)
    pub time: TimeOfDay,
    pub open: Option<Price>,
    pub high: Option<Price>,
    pub low: Option<Price>,
    pub close: Option<Price>,
    /// Summed event volume
    pub volume: Quantity,
    /// Number of underlying events
    pub num_events: u64,
}

impl Bar {
    pub fn new(
        time: TimeOfDay,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Quantity,
        num_events: u64,
    ) -> Self {
        Self {
            time,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume,
            num_events,
        }
    }

    /// Bar for a bucket without events
    pub fn empty(time: TimeOfDay) -> Self {
        Self {
            time,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: 0.0,
            num_events: 0,
        }
    }

    /// True when no event fell into this bar
    pub fn is_empty(&self) -> bool {
        self.num_events == 0 && self.open.is_none()
    }

    /// Check OHLC relationships for a non-empty bar
    pub fn is_valid(&self) -> bool {
        match (self.open, self.high, self.low, self.close) {
            (Some(o), Some(h), Some(l), Some(c)) => {
                h >= l && h >= o && h >= c && l <= o && l <= c && l > 0.0 && self.volume >= 0.0
            }
            (None, None, None, _) => self.volume >= 0.0,
            _ => false,
        }
    }
}

/// Columns derived from volume and event counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DerivedColumn {
    /// volume / sum(volume)
    ScaledVolume,
    /// num_events / sum(num_events)
    ScaledNumEvents,
    /// scaled volume restricted to one session, renormalized within it
    SessionScaledVolume(SessionId),
    /// scaled event count restricted to one session, renormalized within it
    SessionScaledNumEvents(SessionId),
}

impl DerivedColumn {
    pub const ALL: [DerivedColumn; 6] = [
        DerivedColumn::ScaledVolume,
        DerivedColumn::ScaledNumEvents,
        DerivedColumn::SessionScaledVolume(SessionId::Session1),
        DerivedColumn::SessionScaledNumEvents(SessionId::Session1),
        DerivedColumn::SessionScaledVolume(SessionId::Session2),
        DerivedColumn::SessionScaledNumEvents(SessionId::Session2),
    ];

    /// Column name as used in tables
    pub fn name(&self) -> &'static str {
        match self {
            DerivedColumn::ScaledVolume => "scaled_volume",
            DerivedColumn::ScaledNumEvents => "scaled_num_events",
            DerivedColumn::SessionScaledVolume(SessionId::Session1) => "session1_scaled_volume",
            DerivedColumn::SessionScaledVolume(SessionId::Session2) => "session2_scaled_volume",
            DerivedColumn::SessionScaledNumEvents(SessionId::Session1) => {
                "session1_scaled_num_events"
            }
            DerivedColumn::SessionScaledNumEvents(SessionId::Session2) => {
                "session2_scaled_num_events"
            }
        }
    }

    /// Session this column is scoped to, if any
    pub fn session(&self) -> Option<SessionId> {
        match self {
            DerivedColumn::ScaledVolume | DerivedColumn::ScaledNumEvents => None,
            DerivedColumn::SessionScaledVolume(s) | DerivedColumn::SessionScaledNumEvents(s) => {
                Some(*s)
            }
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }
}

/// Any column of a bar sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    Open,
    High,
    Low,
    Close,
    Volume,
    NumEvents,
    Derived(DerivedColumn),
}

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Column::Open => "open",
            Column::High => "high",
            Column::Low => "low",
            Column::Close => "close",
            Column::Volume => "volume",
            Column::NumEvents => "num_events",
            Column::Derived(d) => d.name(),
        }
    }
}

impl FromStr for Column {
    type Err = StylizedFactsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(Column::Open),
            "high" => Ok(Column::High),
            "low" => Ok(Column::Low),
            "close" => Ok(Column::Close),
            "volume" => Ok(Column::Volume),
            "num_events" => Ok(Column::NumEvents),
            other => DerivedColumn::from_name(other)
                .map(Column::Derived)
                .ok_or_else(|| StylizedFactsError::ParseError(format!("Unknown column: {}", s))),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<DerivedColumn> for Column {
    fn from(column: DerivedColumn) -> Self {
        Column::Derived(column)
    }
}

/// Ordered collection of bars for one instrument or run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BarSequence {
    bars: Vec<Bar>,
    derived: BTreeMap<DerivedColumn, Vec<f64>>,
}

impl BarSequence {
    /// Create a sequence from bars ordered by time
    pub fn new(bars: Vec<Bar>) -> Self {
        Self {
            bars,
            derived: BTreeMap::new(),
        }
    }

    /// Create a sequence that already carries derived columns (e.g. read from a table)
    pub fn from_parts(bars: Vec<Bar>, derived: BTreeMap<DerivedColumn, Vec<f64>>) -> Result<Self> {
        for (column, values) in &derived {
            if values.len() != bars.len() {
                return Err(StylizedFactsError::ValueError(format!(
                    "Derived column '{}' has {} values for {} bars",
                    column.name(),
                    values.len(),
                    bars.len()
                )));
            }
        }
        Ok(Self { bars, derived })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Time-of-day index
    pub fn times(&self) -> Vec<TimeOfDay> {
        self.bars.iter().map(|b| b.time).collect()
    }

    /// Carry the last defined close forward over empty bars
    ///
    /// Leading bars before the first defined close stay undefined.
    pub fn forward_fill_close(mut self) -> Self {
        let mut last: Option<Price> = None;
        for bar in self.bars.iter_mut() {
            match bar.close {
                Some(c) if !c.is_nan() => last = Some(c),
                _ => bar.close = last,
            }
        }
        self
    }

    /// Concatenate two sequences (derived columns are not carried over)
    pub fn concat(mut self, other: BarSequence) -> Self {
        self.bars.extend(other.bars);
        self.derived.clear();
        self
    }

    /// Keep only bars matching the predicate (derived columns are filtered alongside)
    pub fn retain_bars<F: Fn(&Bar) -> bool>(self, keep: F) -> Self {
        let mask: Vec<bool> = self.bars.iter().map(|b| keep(b)).collect();
        let bars = self
            .bars
            .into_iter()
            .zip(&mask)
            .filter_map(|(b, &k)| k.then_some(b))
            .collect();
        let derived = self
            .derived
            .into_iter()
            .map(|(column, values)| {
                let kept = values
                    .into_iter()
                    .zip(&mask)
                    .filter_map(|(v, &k)| k.then_some(v))
                    .collect();
                (column, kept)
            })
            .collect();
        Self { bars, derived }
    }

    pub fn has_column(&self, column: Column) -> bool {
        match column {
            Column::Derived(d) => self.derived.contains_key(&d),
            _ => true,
        }
    }

    /// Derived column values, if attached
    pub fn derived(&self, column: DerivedColumn) -> Option<&[f64]> {
        self.derived.get(&column).map(|v| v.as_slice())
    }

    /// Derived columns currently attached, in a stable order
    pub fn derived_columns(&self) -> impl Iterator<Item = DerivedColumn> + '_ {
        self.derived.keys().copied()
    }

    /// Attach a derived column unless one of that kind is already present
    pub fn with_derived(mut self, column: DerivedColumn, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.bars.len() {
            return Err(StylizedFactsError::ValueError(format!(
                "Derived column '{}' has {} values for {} bars",
                column.name(),
                values.len(),
                self.bars.len()
            )));
        }
        self.derived.entry(column).or_insert(values);
        Ok(self)
    }

    /// Column values with missing entries as `None`
    pub fn column(&self, column: Column) -> Option<Vec<Option<f64>>> {
        let defined = |v: f64| (!v.is_nan()).then_some(v);
        let values = match column {
            Column::Open => self.bars.iter().map(|b| b.open.and_then(defined)).collect(),
            Column::High => self.bars.iter().map(|b| b.high.and_then(defined)).collect(),
            Column::Low => self.bars.iter().map(|b| b.low.and_then(defined)).collect(),
            Column::Close => self.bars.iter().map(|b| b.close.and_then(defined)).collect(),
            Column::Volume => self.bars.iter().map(|b| defined(b.volume)).collect(),
            Column::NumEvents => self.bars.iter().map(|b| Some(b.num_events as f64)).collect(),
            Column::Derived(d) => self.derived.get(&d)?.iter().map(|&v| defined(v)).collect(),
        };
        Some(values)
    }

    /// Defined values of a column, missing entries dropped
    pub fn column_values(&self, column: Column) -> Option<Vec<f64>> {
        self.column(column)
            .map(|values| values.into_iter().flatten().collect())
    }

    /// Number of missing values in a column
    pub fn missing_count(&self, column: Column) -> Option<usize> {
        self.column(column)
            .map(|values| values.iter().filter(|v| v.is_none()).count())
    }

    /// Positions of missing values in a column
    pub fn missing_mask(&self, column: Column) -> Option<Vec<bool>> {
        self.column(column)
            .map(|values| values.iter().map(|v| v.is_none()).collect())
    }
}
