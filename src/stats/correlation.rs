//! Volatility clustering and volume-volatility correlation

use crate::error::{Result, StylizedFactsError};
use ndarray::{s, Array2, ArrayView1, ArrayView2};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Autocorrelation of one row at a single lag
fn row_autocorrelation(row: ArrayView1<f64>, lag: usize, floor: f64) -> f64 {
    let mean = row.iter().mean();
    let variance = row.iter().population_variance();
    let leading = row.slice(s![lag..]);
    let lagging = row.slice(s![..row.len() - lag]);
    let acov = leading
        .iter()
        .zip(lagging.iter())
        .map(|(a, b)| (a - mean) * (b - mean))
        .sum::<f64>()
        / leading.len() as f64;
    acov / (variance + floor)
}

/// Autocorrelation of each row of `abs_returns` at every requested lag
///
/// Each entry of the result has shape (N, 1). A lag of zero is rejected;
/// lags at or beyond the series length have no overlapping pairs and yield NaN.
pub fn autocorrelation(
    abs_returns: ArrayView2<f64>,
    lags: &[usize],
    floor: f64,
) -> Result<BTreeMap<usize, Array2<f64>>> {
    if lags.contains(&0) {
        return Err(StylizedFactsError::ValueError(
            "Autocorrelation lag must be positive".to_string(),
        ));
    }

    let len = abs_returns.ncols();
    let rows = abs_returns.nrows();
    let mut result = BTreeMap::new();
    for &lag in lags {
        if lag >= len {
            log::warn!(
                "Lag {} exceeds series of length {}; reporting NaN",
                lag,
                len
            );
            result.insert(lag, Array2::from_elem((rows, 1), f64::NAN));
            continue;
        }
        let mut values = Array2::zeros((rows, 1));
        for (i, row) in abs_returns.outer_iter().enumerate() {
            values[[i, 0]] = row_autocorrelation(row, lag, floor);
        }
        result.insert(lag, values);
    }
    Ok(result)
}

/// Pearson-style correlation of absolute returns with volume, shape (N, 1)
///
/// Both arrays must have identical shape.
pub fn volume_volatility_correlation(
    abs_returns: ArrayView2<f64>,
    volume: ArrayView2<f64>,
    floor: f64,
) -> Result<Array2<f64>> {
    if abs_returns.dim() != volume.dim() {
        return Err(StylizedFactsError::ShapeError(format!(
            "Returns {:?} and volume {:?} differ in shape",
            abs_returns.dim(),
            volume.dim()
        )));
    }
    if abs_returns.ncols() == 0 {
        return Err(StylizedFactsError::ValueError(
            "Volume-volatility correlation needs at least one observation".to_string(),
        ));
    }

    let mut result = Array2::zeros((abs_returns.nrows(), 1));
    for (i, (a, v)) in abs_returns.outer_iter().zip(volume.outer_iter()).enumerate() {
        let mean_a = a.iter().mean();
        let mean_v = v.iter().mean();
        let cov = a
            .iter()
            .zip(v.iter())
            .map(|(x, y)| (x - mean_a) * (y - mean_v))
            .sum::<f64>()
            / a.len() as f64;
        let std_a = a.iter().population_std_dev();
        let std_v = v.iter().population_std_dev();
        result[[i, 0]] = cov / (std_a * std_v + floor);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array1};

    #[test]
    fn test_autocorrelation_alternating() {
        let row: Array1<f64> = (0..100).map(|i| if i % 2 == 0 { 1.0 } else { 3.0 }).collect();
        let abs = row.insert_axis(ndarray::Axis(0));
        let result = autocorrelation(abs.view(), &[1, 2], 1e-10).unwrap();
        assert_eq!(result[&1].dim(), (1, 1));
        assert_relative_eq!(result[&1][[0, 0]], -1.0, epsilon = 1e-6);
        assert_relative_eq!(result[&2][[0, 0]], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_constant_series_is_finite() {
        let abs = Array2::from_elem((2, 20), 0.01);
        let result = autocorrelation(abs.view(), &[1], 1e-10).unwrap();
        assert!(result[&1].iter().all(|v| v.is_finite()));
        let vv = volume_volatility_correlation(abs.view(), abs.view(), 1e-10).unwrap();
        assert!(vv.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_lag_beyond_length_is_nan() {
        let abs = array![[0.1, 0.3, 0.2, 0.5, 0.4], [0.2, 0.2, 0.1, 0.3, 0.6]];
        let result = autocorrelation(abs.view(), &[1, 5, 30], 1e-10).unwrap();
        assert_eq!(result.len(), 3);
        assert!(result[&1].iter().all(|v| v.is_finite()));
        assert_eq!(result[&5].dim(), (2, 1));
        assert!(result[&5].iter().all(|v| v.is_nan()));
        assert!(result[&30].iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_zero_lag_rejected() {
        let abs = Array2::from_elem((1, 5), 1.0);
        assert!(matches!(
            autocorrelation(abs.view(), &[0], 1e-10),
            Err(StylizedFactsError::ValueError(_))
        ));
    }

    #[test]
    fn test_affine_volume_correlates_perfectly() {
        let abs = array![[0.01, 0.03, 0.02, 0.05, 0.04], [0.2, 0.1, 0.4, 0.3, 0.5]];
        let volume = abs.mapv(|a| 250.0 * a + 7.0);
        let corr = volume_volatility_correlation(abs.view(), volume.view(), 1e-10).unwrap();
        assert_eq!(corr.dim(), (2, 1));
        assert_relative_eq!(corr[[0, 0]], 1.0, epsilon = 1e-6);
        assert_relative_eq!(corr[[1, 0]], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_shape_mismatch() {
        let abs = Array2::from_elem((1, 5), 1.0);
        let volume = Array2::from_elem((1, 4), 1.0);
        assert!(matches!(
            volume_volatility_correlation(abs.view(), volume.view(), 1e-10),
            Err(StylizedFactsError::ShapeError(_))
        ));
    }
}
