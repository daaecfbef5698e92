//! Reference cumulative transaction curves for synthetic resampling

use crate::error::{Result, StylizedFactsError};
use crate::types::TimeOfDay;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Cumulative proportion of a session's events reached at each target bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionAllocationCurve {
    name: String,
    index: Vec<TimeOfDay>,
    proportions: Vec<f64>,
}

impl TransactionAllocationCurve {
    /// Build a curve; proportions must lie in [0, 1] and never decrease
    pub fn new(name: impl Into<String>, index: Vec<TimeOfDay>, proportions: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if index.len() != proportions.len() {
            return Err(StylizedFactsError::ValueError(format!(
                "Curve '{}' has {} index entries for {} proportions",
                name,
                index.len(),
                proportions.len()
            )));
        }
        if proportions.iter().any(|p| !(0.0..=1.0).contains(p)) {
            return Err(StylizedFactsError::ValueError(format!(
                "Curve '{}' has proportions outside [0, 1]",
                name
            )));
        }
        if proportions.windows(2).any(|w| w[1] < w[0]) {
            return Err(StylizedFactsError::ValueError(format!(
                "Curve '{}' is not non-decreasing",
                name
            )));
        }
        Ok(Self {
            name,
            index,
            proportions,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> &[TimeOfDay] {
        &self.index
    }

    pub fn proportions(&self) -> &[f64] {
        &self.proportions
    }

    /// Number of bars this curve produces
    pub fn len(&self) -> usize {
        self.proportions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proportions.is_empty()
    }

    /// Integer cut points for a session with `total` events
    ///
    /// Each proportion is scaled by `total` and floored. The last cut point is
    /// pinned to `total` so every event lands in exactly one bar.
    pub fn cut_points(&self, total: usize) -> Vec<usize> {
        let mut cuts: Vec<usize> = self
            .proportions
            .iter()
            .map(|p| ((p * total as f64) + 1e-9).floor() as usize)
            .map(|c| c.min(total))
            .collect();
        if let Some(last) = cuts.last_mut() {
            *last = total;
        }
        cuts
    }
}

/// Pool of historical reference curves sharing one time-of-day index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCurves {
    index: Vec<TimeOfDay>,
    columns: Vec<(String, Vec<f64>)>,
}

impl ReferenceCurves {
    /// Build a pool; every column is validated as a curve
    pub fn new(index: Vec<TimeOfDay>, columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        if columns.is_empty() {
            return Err(StylizedFactsError::ValueError(
                "Reference curve table has no columns".to_string(),
            ));
        }
        for (name, values) in &columns {
            TransactionAllocationCurve::new(name.clone(), index.clone(), values.clone())?;
        }
        Ok(Self { index, columns })
    }

    pub fn index(&self) -> &[TimeOfDay] {
        &self.index
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn columns(&self) -> &[(String, Vec<f64>)] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Curve by column name
    pub fn curve(&self, name: &str) -> Option<TransactionAllocationCurve> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(n, values)| TransactionAllocationCurve {
                name: n.clone(),
                index: self.index.clone(),
                proportions: values.clone(),
            })
    }

    /// Draw one curve from the pool
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<TransactionAllocationCurve> {
        let (name, values) = self.columns.choose(rng).ok_or_else(|| {
            StylizedFactsError::ValueError("Reference curve table has no columns".to_string())
        })?;
        log::debug!("Selected reference curve '{}'", name);
        Ok(TransactionAllocationCurve {
            name: name.clone(),
            index: self.index.clone(),
            proportions: values.clone(),
        })
    }
}
