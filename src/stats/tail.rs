//! Hill estimator of the power-law tail index

use crate::error::{Result, StylizedFactsError};
use ndarray::{s, Array2, ArrayBase, ArrayView2, Data, Dimension, Ix2};

/// Tail indices of the pooled return sample, each of shape (1, 1)
#[derive(Debug, Clone, PartialEq)]
pub struct TailIndices {
    pub left: Array2<f64>,
    pub right: Array2<f64>,
    pub abs: Array2<f64>,
}

/// Index of the first tail element in a sorted row of length `len`
pub fn tail_start(len: usize, cut_off_th: f64) -> usize {
    ((len as f64) * (1.0 - cut_off_th)).floor() as usize
}

/// Hill estimate for each ascending-sorted row, shape (N, 1)
///
/// The tail is the top `cut_off_th` fraction of each row. Every tail value
/// must be strictly positive.
pub fn hill_tail_index<S, D>(sorted: &ArrayBase<S, D>, cut_off_th: f64) -> Result<Array2<f64>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    if !(cut_off_th > 0.0 && cut_off_th < 1.0) {
        return Err(StylizedFactsError::ValueError(format!(
            "cut_off_th must lie in (0, 1), got {}",
            cut_off_th
        )));
    }
    let sorted = sorted.view().into_dimensionality::<Ix2>().map_err(|_| {
        StylizedFactsError::ShapeError(format!(
            "Hill estimator expects a 2-D array, got {} dimension(s)",
            sorted.ndim()
        ))
    })?;

    let mut indices = Array2::zeros((sorted.nrows(), 1));
    for (i, row) in sorted.outer_iter().enumerate() {
        if row.iter().zip(row.iter().skip(1)).any(|(a, b)| a > b) {
            return Err(StylizedFactsError::ValueError(
                "Hill estimator requires rows sorted in ascending order".to_string(),
            ));
        }

        let start = tail_start(row.len(), cut_off_th);
        let tail = row.slice(s![start..]);
        if tail.is_empty() {
            return Err(StylizedFactsError::DataError(format!(
                "Tail of a {}-element row is empty at cut-off {}",
                row.len(),
                cut_off_th
            )));
        }
        if let Some(bad) = tail.iter().find(|&&x| !(x > 0.0)) {
            return Err(StylizedFactsError::DataError(format!(
                "Tail values must be strictly positive, found {}",
                bad
            )));
        }

        let x_min = tail[0];
        let mean_log = tail.iter().map(|x| (x / x_min).ln()).sum::<f64>() / tail.len() as f64;
        indices[[i, 0]] = 1.0 / mean_log;
    }

    Ok(indices)
}

/// Flatten all rows into one ascending-sorted (1, N*L) sample
pub fn pooled_sorted(values: ArrayView2<f64>) -> Array2<f64> {
    let mut pooled: Vec<f64> = values.iter().copied().collect();
    pooled.sort_by(f64::total_cmp);
    let len = pooled.len();
    Array2::from_shape_vec((1, len), pooled).unwrap_or_else(|_| Array2::zeros((1, 0)))
}

/// Left, right and absolute tail indices of a pooled return sample
pub fn both_sides_hill_indices(returns: ArrayView2<f64>, cut_off_th: f64) -> Result<TailIndices> {
    let right = hill_tail_index(&pooled_sorted(returns), cut_off_th)?;
    let left = hill_tail_index(&pooled_sorted(returns.mapv(|r| -r).view()), cut_off_th)?;
    let abs = hill_tail_index(&pooled_sorted(returns.mapv(f64::abs).view()), cut_off_th)?;
    Ok(TailIndices { left, right, abs })
}

/// Concatenate per-series (1, L_i) return rows into a single (1, sum L_i) row
pub fn pool_rows(rows: &[Array2<f64>]) -> Result<Array2<f64>> {
    let flat: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
    let len = flat.len();
    Array2::from_shape_vec((1, len), flat).map_err(|e| StylizedFactsError::ShapeError(e.to_string()))
}
