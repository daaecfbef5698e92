//! Excess kurtosis and the one-sided kurtosis normality test

use crate::error::{Result, StylizedFactsError};
use ndarray::{Array2, ArrayBase, ArrayView1, Data, Dimension, Ix2};
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::statistics::Statistics;

/// Smallest sample the normal approximation of the test accepts
pub const MIN_KURTOSIS_SAMPLE: usize = 5;

/// Per-row kurtosis estimates, both of shape (N, 1)
#[derive(Debug, Clone, PartialEq)]
pub struct KurtosisResult {
    pub kurtosis: Array2<f64>,
    pub p_values: Array2<f64>,
}

/// Central moments m2 and m4 with the biased (1/n) normalisation
fn central_moments(row: ArrayView1<f64>) -> (f64, f64) {
    let mean = row.iter().mean();
    let (m2, m4) = row.iter().fold((0.0, 0.0), |(m2, m4), &x| {
        let d2 = (x - mean) * (x - mean);
        (m2 + d2, m4 + d2 * d2)
    });
    let n = row.len() as f64;
    (m2 / n, m4 / n)
}

/// Pearson kurtosis m4 / m2^2, NaN when the row has zero variance
pub fn pearson_kurtosis(row: ArrayView1<f64>) -> f64 {
    let (m2, m4) = central_moments(row);
    if m2 == 0.0 {
        return f64::NAN;
    }
    m4 / (m2 * m2)
}

/// Fisher (excess) kurtosis, zero for a normal distribution
pub fn excess_kurtosis(row: ArrayView1<f64>) -> f64 {
    pearson_kurtosis(row) - 3.0
}

/// Anscombe-Glynn test statistic for kurtosis above the normal value
fn kurtosis_z_score(n: usize, b2: f64) -> f64 {
    let n = n as f64;
    let expected = 3.0 * (n - 1.0) / (n + 1.0);
    let var_b2 = 24.0 * n * (n - 2.0) * (n - 3.0) / ((n + 1.0) * (n + 1.0) * (n + 3.0) * (n + 5.0));
    let x = (b2 - expected) / var_b2.sqrt();

    let sqrt_beta1 = 6.0 * (n * n - 5.0 * n + 2.0) / ((n + 7.0) * (n + 9.0))
        * (6.0 * (n + 3.0) * (n + 5.0) / (n * (n - 2.0) * (n - 3.0))).sqrt();
    let a = 6.0
        + 8.0 / sqrt_beta1 * (2.0 / sqrt_beta1 + (1.0 + 4.0 / (sqrt_beta1 * sqrt_beta1)).sqrt());

    let term1 = 1.0 - 2.0 / (9.0 * a);
    let denom = 1.0 + x * (2.0 / (a - 4.0)).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    let term2 = denom.signum() * ((1.0 - 2.0 / a) / denom.abs()).cbrt();
    (term1 - term2) / (2.0 / (9.0 * a)).sqrt()
}

/// Excess kurtosis and p-value of the one-sided test for a single row
pub fn kurtosis_test_row(row: ArrayView1<f64>) -> Result<(f64, f64)> {
    let n = row.len();
    if n < MIN_KURTOSIS_SAMPLE {
        return Err(StylizedFactsError::ValueError(format!(
            "Kurtosis test requires at least {} observations, got {}",
            MIN_KURTOSIS_SAMPLE, n
        )));
    }

    let b2 = pearson_kurtosis(row);
    if b2.is_nan() {
        return Ok((f64::NAN, f64::NAN));
    }

    let z = kurtosis_z_score(n, b2);
    let standard = Normal::new(0.0, 1.0)
        .map_err(|e| StylizedFactsError::ValueError(format!("Standard normal: {}", e)))?;
    let p_value = if z.is_nan() { f64::NAN } else { standard.sf(z) };
    Ok((b2 - 3.0, p_value))
}

/// Row-wise kurtosis test over a two-dimensional return array
///
/// Arrays of any other dimensionality are rejected with a shape error.
pub fn kurtosis_test<S, D>(returns: &ArrayBase<S, D>) -> Result<KurtosisResult>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let returns = returns.view().into_dimensionality::<Ix2>().map_err(|_| {
        StylizedFactsError::ShapeError(format!(
            "Kurtosis test expects a 2-D (series, time) array, got {} dimension(s)",
            returns.ndim()
        ))
    })?;

    let rows = returns.nrows();
    let mut kurtosis = Array2::zeros((rows, 1));
    let mut p_values = Array2::zeros((rows, 1));
    for (i, row) in returns.outer_iter().enumerate() {
        let (k, p) = kurtosis_test_row(row)?;
        kurtosis[[i, 0]] = k;
        p_values[[i, 0]] = p;
    }

    Ok(KurtosisResult { kurtosis, p_values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array1};
    use rand::distributions::Distribution;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use statrs::distribution::StudentsT;

    #[test]
    fn test_excess_kurtosis_known_values() {
        // two-point distribution: m4 / m2^2 = 1
        let row = array![1.0, -1.0, 1.0, -1.0];
        assert_relative_eq!(excess_kurtosis(row.view()), -2.0, epsilon = 1e-12);

        let row = array![1.0, 2.0, 3.0, 4.0, 5.0];
        // m2 = 2, m4 = 6.8
        assert_relative_eq!(pearson_kurtosis(row.view()), 1.7, epsilon = 1e-12);
    }

    #[test]
    fn test_uniform_row_is_not_heavy_tailed() {
        let row = Array1::linspace(0.0, 1.0, 200);
        let (k, p) = kurtosis_test_row(row.view()).unwrap();
        assert!(k < 0.0);
        assert!(p > 0.5);
    }

    #[test]
    fn test_heavy_tails_are_significant() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let t = StudentsT::new(0.0, 1.0, 3.0).unwrap();
        let row: Array1<f64> = (0..2000).map(|_| t.sample(&mut rng)).collect();
        let (k, p) = kurtosis_test_row(row.view()).unwrap();
        assert!(k > 1.0);
        assert!(p < 0.01);
    }

    #[test]
    fn test_extreme_kurtosis_keeps_positive_p_value() {
        // one spike among 499 tiny alternating moves puts z near 17
        let row: Array1<f64> = (0..500)
            .map(|i| match i {
                499 => 1.0,
                i if i % 2 == 1 => 0.001,
                _ => -0.001,
            })
            .collect();
        let (k, p) = kurtosis_test_row(row.view()).unwrap();
        assert_relative_eq!(k, 494.5043854948587, max_relative = 1e-9);
        assert!(p > 0.0);
        assert_relative_eq!(p, 1.788112827322e-64, max_relative = 1e-6);
    }

    #[test]
    fn test_constant_row_gives_nan() {
        let row = Array1::from_elem(10, 0.5);
        let (k, p) = kurtosis_test_row(row.view()).unwrap();
        assert!(k.is_nan());
        assert!(p.is_nan());
    }

    #[test]
    fn test_short_row_rejected() {
        let row = array![0.1, 0.2, 0.3, 0.4];
        assert!(matches!(
            kurtosis_test_row(row.view()),
            Err(StylizedFactsError::ValueError(_))
        ));
    }

    #[test]
    fn test_shapes_and_dimensionality() {
        let returns = Array2::from_shape_fn((3, 50), |(i, j)| ((i * 50 + j) as f64 * 0.37).sin());
        let result = kurtosis_test(&returns).unwrap();
        assert_eq!(result.kurtosis.dim(), (3, 1));
        assert_eq!(result.p_values.dim(), (3, 1));

        let flat = Array1::from_elem(50, 1.0);
        assert!(matches!(
            kurtosis_test(&flat),
            Err(StylizedFactsError::ShapeError(_))
        ));
    }
}
