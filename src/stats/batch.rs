//! Batch homogeneity check and column stacking

use crate::config::MissingPolicy;
use crate::data::bar::{BarSequence, Column};
use crate::error::{Result, StylizedFactsError};
use ndarray::Array2;

/// Decides whether a collection of bar sequences can be processed as one array
#[derive(Debug, Clone, Copy)]
pub struct BatchHomogeneityChecker;

impl BatchHomogeneityChecker {
    /// True iff the column exists everywhere, all sequences have equal length,
    /// and all have the same number of missing values in that column
    ///
    /// Only counts are compared. Callers stacking data whose gaps may sit at
    /// different positions should use [`Self::has_aligned_missing`] as well.
    pub fn is_stacking_possible(sequences: &[BarSequence], column: Column) -> bool {
        let Some(first) = sequences.first() else {
            return false;
        };
        if !sequences.iter().all(|s| s.has_column(column)) {
            return false;
        }
        if sequences.iter().any(|s| s.len() != first.len()) {
            return false;
        }
        let missing = first.missing_count(column);
        sequences.iter().all(|s| s.missing_count(column) == missing)
    }

    /// True iff missing values sit at identical positions in every sequence
    pub fn has_aligned_missing(sequences: &[BarSequence], column: Column) -> bool {
        let Some(first) = sequences.first() else {
            return false;
        };
        let mask = first.missing_mask(column);
        mask.is_some() && sequences.iter().all(|s| s.missing_mask(column) == mask)
    }

    /// Apply the check required by the given policy
    pub fn check(sequences: &[BarSequence], column: Column, policy: MissingPolicy) -> bool {
        let possible = Self::is_stacking_possible(sequences, column);
        match policy {
            MissingPolicy::Count => possible,
            MissingPolicy::Positional => possible && Self::has_aligned_missing(sequences, column),
        }
    }

    /// Stack the defined values of a column into an (N, L - missing) array
    pub fn stack(sequences: &[BarSequence], column: Column) -> Result<Array2<f64>> {
        if !Self::is_stacking_possible(sequences, column) {
            return Err(StylizedFactsError::ValueError(format!(
                "Cannot stack column '{}': sequences differ in length or missing values",
                column
            )));
        }

        let rows: Vec<Vec<f64>> = sequences
            .iter()
            .map(|s| s.column_values(column).unwrap_or_default())
            .collect();
        let width = rows.first().map_or(0, Vec::len);
        let flat: Vec<f64> = rows.into_iter().flatten().collect();

        Array2::from_shape_vec((sequences.len(), width), flat)
            .map_err(|e| StylizedFactsError::ShapeError(format!("Failed to stack '{}': {}", column, e)))
    }

    /// Stack a column restricted to the positions where another column is defined
    ///
    /// Used to align volume with the bars that carry a close price.
    pub fn stack_aligned(
        sequences: &[BarSequence],
        column: Column,
        mask_column: Column,
    ) -> Result<Array2<f64>> {
        if !Self::is_stacking_possible(sequences, mask_column) {
            return Err(StylizedFactsError::ValueError(format!(
                "Cannot stack column '{}' aligned to '{}'",
                column, mask_column
            )));
        }
        let rows = sequences
            .iter()
            .map(|s| aligned_values(s, column, mask_column))
            .collect::<Result<Vec<_>>>()?;
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != width) {
            return Err(StylizedFactsError::ValueError(format!(
                "Column '{}' has missing values where '{}' is defined",
                column, mask_column
            )));
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        Array2::from_shape_vec((sequences.len(), width), flat)
            .map_err(|e| StylizedFactsError::ShapeError(format!("Failed to stack '{}': {}", column, e)))
    }
}

/// Values of `column` at positions where `mask_column` is defined
pub fn aligned_values(sequence: &BarSequence, column: Column, mask_column: Column) -> Result<Vec<f64>> {
    let values = sequence
        .column(column)
        .ok_or_else(|| StylizedFactsError::DataError(format!("Column '{}' not found", column)))?;
    let mask = sequence
        .missing_mask(mask_column)
        .ok_or_else(|| StylizedFactsError::DataError(format!("Column '{}' not found", mask_column)))?;
    Ok(values
        .into_iter()
        .zip(mask)
        .filter_map(|(v, missing)| if missing { None } else { v })
        .collect())
}
