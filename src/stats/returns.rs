//! Log-return computation

use crate::data::bar::{BarSequence, Column};
use crate::error::{Result, StylizedFactsError};
use crate::stats::batch::BatchHomogeneityChecker;
use ndarray::{s, Array2, ArrayView2};

/// Derives log returns `ln(p[t+1] / p[t] + floor)` from price rows
#[derive(Debug, Clone, Copy)]
pub struct ReturnComputer {
    floor: f64,
}

impl ReturnComputer {
    pub fn new(floor: f64) -> Self {
        Self { floor }
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// Returns of an (N, L) price array, shape (N, L - 1)
    pub fn log_returns(&self, prices: ArrayView2<f64>) -> Result<Array2<f64>> {
        if let Some(bad) = prices.iter().find(|&&p| !(p > 0.0)) {
            return Err(StylizedFactsError::DataError(format!(
                "Prices must be strictly positive, found {}",
                bad
            )));
        }

        let (rows, cols) = prices.dim();
        if cols < 2 {
            return Ok(Array2::zeros((rows, 0)));
        }

        let ratio = &prices.slice(s![.., 1..]) / &prices.slice(s![.., ..-1]);
        let floor = self.floor;
        Ok(ratio.mapv(|r| (r + floor).ln()))
    }

    /// Returns of a single sequence, shape (1, L' - 1) where L' excludes missing prices
    pub fn sequence_returns(&self, sequence: &BarSequence, column: Column) -> Result<Array2<f64>> {
        let prices = sequence
            .column_values(column)
            .ok_or_else(|| StylizedFactsError::DataError(format!("Column '{}' not found", column)))?;
        let prices = Array2::from_shape_vec((1, prices.len()), prices)
            .map_err(|e| StylizedFactsError::ShapeError(e.to_string()))?;
        self.log_returns(prices.view())
    }

    /// Returns of a stacked batch, shape (N, L - missing - 1)
    pub fn batch_returns(&self, sequences: &[BarSequence], column: Column) -> Result<Array2<f64>> {
        let prices = BatchHomogeneityChecker::stack(sequences, column)?;
        self.log_returns(prices.view())
    }
}

impl Default for ReturnComputer {
    fn default() -> Self {
        Self::new(1e-10)
    }
}
