//! End-to-end stylized facts run over a batch of bar sequences
//!
//! The checker owns the configuration, the run context and the stored
//! series. Each estimator takes the vectorized path when the batch can be
//! stacked and falls back to a per-series loop otherwise.

use crate::config::{CheckerConfig, MarketMode};
use crate::context::RunContext;
use crate::data::bar::{BarSequence, Column, DerivedColumn};
use crate::data::curve::ReferenceCurves;
use crate::data::resample::{CalendarResampler, Resampler, TransactionCountResampler};
use crate::data::session::{SessionBoundary, SessionPartitioner};
use crate::error::{Result, StylizedFactsError};
use crate::stats::batch::{aligned_values, BatchHomogeneityChecker};
use crate::stats::correlation::{autocorrelation, volume_volatility_correlation};
use crate::stats::kurtosis::{kurtosis_test, kurtosis_test_row, KurtosisResult};
use crate::stats::report::FactReport;
use crate::stats::returns::ReturnComputer;
use crate::stats::tail::{both_sides_hill_indices, pool_rows, TailIndices};
use crate::types::{Event, SessionId, TimeOfDay};
use ndarray::{s, Array2};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Sorted absolute returns with their empirical CCDF `1 - (i + 1) / n`
#[derive(Debug, Clone, PartialEq)]
pub struct CcdfCurve {
    pub abs_returns: Vec<f64>,
    pub ccdf: Vec<f64>,
}

/// Cumulative scaled event counts per series, plus their mean
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeTransactions {
    pub index: Vec<TimeOfDay>,
    pub series: Vec<(String, Vec<f64>)>,
    pub mean: Vec<f64>,
}

impl CumulativeTransactions {
    /// Reference curve table with one column per series and a `mean` column
    ///
    /// Values are clamped to [0, 1] to absorb summation rounding.
    pub fn into_reference_curves(self) -> Result<ReferenceCurves> {
        let clamp = |values: Vec<f64>| -> Vec<f64> {
            values.into_iter().map(|v| v.clamp(0.0, 1.0)).collect()
        };
        let mut columns: Vec<(String, Vec<f64>)> = self
            .series
            .into_iter()
            .map(|(name, values)| (name, clamp(values)))
            .collect();
        columns.push(("mean".to_string(), clamp(self.mean)));
        ReferenceCurves::new(self.index, columns)
    }
}

fn memoized_returns<'a>(
    ctx: &'a mut RunContext,
    sequences: &[BarSequence],
    computer: ReturnComputer,
) -> Result<&'a Array2<f64>> {
    ctx.returns_or_compute(|| computer.batch_returns(sequences, Column::Close))
}

fn column_array(values: Vec<f64>) -> Result<Array2<f64>> {
    let rows = values.len();
    Array2::from_shape_vec((rows, 1), values)
        .map_err(|e| StylizedFactsError::ShapeError(e.to_string()))
}

/// Stylized facts checker
pub struct StylizedFactsChecker {
    config: CheckerConfig,
    ctx: RunContext,
    partitioner: SessionPartitioner,
    returns: ReturnComputer,
    names: Vec<String>,
    sequences: Vec<BarSequence>,
}

impl StylizedFactsChecker {
    /// Create a checker from a validated configuration
    pub fn new(config: CheckerConfig) -> Result<Self> {
        config.validate()?;
        let partitioner = SessionPartitioner::new(config.session_boundary()?);
        Ok(Self {
            ctx: RunContext::new(config.seed),
            returns: ReturnComputer::new(config.epsilon.return_floor),
            partitioner,
            config,
            names: Vec::new(),
            sequences: Vec::new(),
        })
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Session boundary in effect (explicit, else the first inferred one)
    pub fn session_boundary(&self) -> Option<SessionBoundary> {
        self.partitioner.boundary()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn sequences(&self) -> &[BarSequence] {
        &self.sequences
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Build the aggregator matching the configured market mode
    ///
    /// Synthetic mode needs one reference curve pool per session.
    pub fn resampler(
        &self,
        curves: Option<(ReferenceCurves, ReferenceCurves)>,
    ) -> Result<Box<dyn Resampler>> {
        match self.config.mode {
            MarketMode::Real => {
                let rule = self.config.resample_rule;
                Ok(match self.config.session_boundary()? {
                    Some(boundary) => Box::new(CalendarResampler::with_boundary(rule, boundary)),
                    None => Box::new(CalendarResampler::new(rule)),
                })
            }
            MarketMode::Synthetic => {
                let (session1, session2) = curves.ok_or_else(|| {
                    StylizedFactsError::ConfigError(
                        "synthetic mode requires reference curves for both sessions".to_string(),
                    )
                })?;
                Ok(Box::new(TransactionCountResampler::new(session1, session2)))
            }
        }
    }

    /// Store an OHLCV sequence after attaching the derived columns
    pub fn add_sequence(&mut self, name: impl Into<String>, sequence: BarSequence) -> Result<()> {
        let name = name.into();
        let sequence = self.partitioner.derive(sequence)?;
        log::debug!("Added series '{}' with {} bars", name, sequence.len());
        self.names.push(name);
        self.sequences.push(sequence);
        self.ctx.clear_cache();
        Ok(())
    }

    /// Resample a tick stream and store the result
    ///
    /// Returns `false` when a calendar-resampled series is dropped for being
    /// shorter than a full session at the configured cadence.
    pub fn add_ticks(
        &mut self,
        name: impl Into<String>,
        events: &[Event],
        resampler: &dyn Resampler,
    ) -> Result<bool> {
        let name = name.into();
        let resampled = resampler.resample(events, &mut self.ctx)?;

        let full_len = self.config.resample_rule.full_session_len();
        let calendar = self.config.mode == MarketMode::Real;
        if calendar && self.config.choose_full_size && resampled.bars.len() < full_len {
            log::warn!(
                "Dropping series '{}': {} bars, a full session has {}",
                name,
                resampled.bars.len(),
                full_len
            );
            return Ok(false);
        }

        let current = self.partitioner.boundary();
        let resolved = SessionPartitioner::resolve(current, resampled.inferred_boundary);
        if let (None, Some(boundary)) = (current, resolved) {
            log::info!(
                "Inferred session boundary: session 1 ends {}, session 2 starts {}",
                boundary.session1_end,
                boundary.session2_start
            );
            // series added earlier still lack the session-scoped columns
            self.partitioner = SessionPartitioner::new(Some(boundary));
            self.sequences = std::mem::take(&mut self.sequences)
                .into_iter()
                .map(|s| self.partitioner.derive(s))
                .collect::<Result<Vec<_>>>()?;
        }

        self.add_sequence(name, resampled.bars)?;
        Ok(true)
    }

    /// Start an independent run over the same data
    pub fn reset(&mut self) {
        self.ctx.reset();
    }

    fn require_sequences(&self) -> Result<()> {
        if self.sequences.is_empty() {
            return Err(StylizedFactsError::DataError("no bar sequences".to_string()));
        }
        Ok(())
    }

    /// Whether the close prices of the batch can be processed as one array
    pub fn is_batchable(&self) -> bool {
        BatchHomogeneityChecker::check(&self.sequences, Column::Close, self.config.missing_policy)
    }

    fn warn_fallback(&self, estimator: &str) {
        log::warn!(
            "Could not stack {} series for {}; lengths or missing closes differ. \
             Falling back to a per-series loop",
            self.sequences.len(),
            estimator
        );
    }

    fn per_series<T, F>(&self, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(&BarSequence) -> Result<T> + Sync + Send,
    {
        self.sequences.par_iter().map(f).collect()
    }

    /// Batched close-price returns of this run, shape (N, L - 1)
    pub fn batch_returns(&mut self) -> Result<&Array2<f64>> {
        self.require_sequences()?;
        if !self.is_batchable() {
            return Err(StylizedFactsError::ValueError(
                "Cannot stack close prices of this batch".to_string(),
            ));
        }
        memoized_returns(&mut self.ctx, &self.sequences, self.returns)
    }

    /// Excess kurtosis and its one-sided p-value per series
    pub fn check_kurtosis(&mut self) -> Result<KurtosisResult> {
        self.require_sequences()?;
        if self.is_batchable() {
            let returns = memoized_returns(&mut self.ctx, &self.sequences, self.returns)?;
            return kurtosis_test(returns);
        }

        self.warn_fallback("kurtosis");
        let computer = self.returns;
        let rows = self.per_series(|seq| {
            let returns = computer.sequence_returns(seq, Column::Close)?;
            kurtosis_test_row(returns.row(0))
        })?;
        let (kurtosis, p_values): (Vec<f64>, Vec<f64>) = rows.into_iter().unzip();
        Ok(KurtosisResult {
            kurtosis: column_array(kurtosis)?,
            p_values: column_array(p_values)?,
        })
    }

    /// Left, right and absolute Hill tail indices of the pooled batch
    pub fn check_hill_index(&mut self) -> Result<TailIndices> {
        self.require_sequences()?;
        let cut_off_th = self.config.cut_off_th;
        if self.is_batchable() {
            let returns = memoized_returns(&mut self.ctx, &self.sequences, self.returns)?;
            return both_sides_hill_indices(returns.view(), cut_off_th);
        }

        self.warn_fallback("tail index");
        let computer = self.returns;
        let rows = self.per_series(|seq| computer.sequence_returns(seq, Column::Close))?;
        let pooled = pool_rows(&rows)?;
        both_sides_hill_indices(pooled.view(), cut_off_th)
    }

    /// Autocorrelation of absolute returns per series at each lag
    ///
    /// Uses the configured lags when `lags` is `None`.
    pub fn check_autocorrelation(
        &mut self,
        lags: Option<&[usize]>,
    ) -> Result<BTreeMap<usize, Array2<f64>>> {
        self.require_sequences()?;
        let lags: Vec<usize> = lags.map_or_else(|| self.config.lags.clone(), <[usize]>::to_vec);
        let floor = self.config.epsilon.denominator_floor;
        if self.is_batchable() {
            let returns = memoized_returns(&mut self.ctx, &self.sequences, self.returns)?;
            return autocorrelation(returns.mapv(f64::abs).view(), &lags, floor);
        }

        self.warn_fallback("autocorrelation");
        let computer = self.returns;
        let per_series = self.per_series(|seq| {
            let returns = computer.sequence_returns(seq, Column::Close)?;
            autocorrelation(returns.mapv(f64::abs).view(), &lags, floor)
        })?;

        lags.iter()
            .map(|&lag| {
                let values = per_series
                    .iter()
                    .map(|acorr| acorr.get(&lag).map_or(f64::NAN, |v| v[[0, 0]]))
                    .collect();
                Ok((lag, column_array(values)?))
            })
            .collect()
    }

    /// Correlation between absolute returns and traded volume per series
    ///
    /// Volume is taken at the bars with a defined close, minus the first one,
    /// so it lines up with the return series.
    pub fn check_volume_volatility_correlation(&mut self) -> Result<Array2<f64>> {
        self.require_sequences()?;
        let floor = self.config.epsilon.denominator_floor;
        if self.is_batchable() {
            let volume =
                BatchHomogeneityChecker::stack_aligned(&self.sequences, Column::Volume, Column::Close)?;
            let returns = memoized_returns(&mut self.ctx, &self.sequences, self.returns)?;
            let first = volume.ncols().min(1);
            let volume = volume.slice(s![.., first..]);
            return volume_volatility_correlation(returns.mapv(f64::abs).view(), volume, floor);
        }

        self.warn_fallback("volume-volatility correlation");
        let computer = self.returns;
        let values = self.per_series(|seq| {
            let returns = computer.sequence_returns(seq, Column::Close)?;
            let volume: Vec<f64> = aligned_values(seq, Column::Volume, Column::Close)?
                .into_iter()
                .skip(1)
                .collect();
            let volume = Array2::from_shape_vec((1, volume.len()), volume)
                .map_err(|e| StylizedFactsError::ShapeError(e.to_string()))?;
            let corr = volume_volatility_correlation(returns.mapv(f64::abs).view(), volume.view(), floor)?;
            Ok(corr[[0, 0]])
        })?;
        column_array(values)
    }

    /// Run every estimator and assemble the report
    pub fn check_stylized_facts(&mut self) -> Result<FactReport> {
        log::info!("Checking stylized facts of {} series", self.sequences.len());
        let kurtosis = self.check_kurtosis()?;
        let tails = self.check_hill_index()?;
        let vv_corr = self.check_volume_volatility_correlation()?;
        let acorr = self.check_autocorrelation(None)?;

        FactReport::from_estimates(
            self.names.clone(),
            &kurtosis.kurtosis,
            &kurtosis.p_values,
            &tails.left,
            &tails.right,
            &tails.abs,
            &vv_corr,
            &acorr,
        )
    }

    /// Empirical CCDF of absolute returns, pooled or for the series at `draw_idx`
    pub fn ccdf(&mut self, draw_idx: Option<usize>) -> Result<CcdfCurve> {
        self.require_sequences()?;
        let mut abs_returns: Vec<f64> = match draw_idx {
            Some(idx) => {
                let seq = self.sequences.get(idx).ok_or_else(|| {
                    StylizedFactsError::ValueError(format!(
                        "Series index {} out of range for {} series",
                        idx,
                        self.sequences.len()
                    ))
                })?;
                self.returns.sequence_returns(seq, Column::Close)?.iter().map(|r| r.abs()).collect()
            }
            None if self.is_batchable() => {
                let returns = memoized_returns(&mut self.ctx, &self.sequences, self.returns)?;
                returns.iter().map(|r| r.abs()).collect()
            }
            None => {
                self.warn_fallback("CCDF");
                let computer = self.returns;
                let rows = self.per_series(|seq| computer.sequence_returns(seq, Column::Close))?;
                rows.iter().flat_map(|r| r.iter().map(|v| v.abs())).collect()
            }
        };
        abs_returns.sort_by(f64::total_cmp);

        let n = abs_returns.len() as f64;
        let ccdf = (0..abs_returns.len())
            .map(|i| 1.0 - (i as f64 + 1.0) / n)
            .collect();
        Ok(CcdfCurve { abs_returns, ccdf })
    }

    /// Cumulative scaled event counts over the whole day or one session
    pub fn mean_cumulative_transactions(
        &self,
        session: Option<SessionId>,
    ) -> Result<CumulativeTransactions> {
        self.require_sequences()?;
        let column: Column = match session {
            None => DerivedColumn::ScaledNumEvents,
            Some(s) => DerivedColumn::SessionScaledNumEvents(s),
        }
        .into();
        let restrict = match session {
            None => None,
            Some(s) => {
                let boundary = self.partitioner.boundary().ok_or_else(|| {
                    StylizedFactsError::ConfigError(format!(
                        "Session boundary is unknown; cannot restrict to {}",
                        s
                    ))
                })?;
                Some((s, boundary))
            }
        };
        let stacked = BatchHomogeneityChecker::stack(&self.sequences, column)?;

        // stacking drops missing cells, so the index follows the defined ones
        let first = &self.sequences[0];
        let mask = first.missing_mask(column).ok_or_else(|| {
            StylizedFactsError::DataError(format!("Column '{}' not found", column))
        })?;
        let times: Vec<TimeOfDay> = first
            .times()
            .into_iter()
            .zip(mask)
            .filter_map(|(t, missing)| (!missing).then_some(t))
            .collect();
        if times.len() != stacked.ncols() {
            return Err(StylizedFactsError::DataError(format!(
                "Column '{}' has {} defined values for {} index entries",
                column,
                stacked.ncols(),
                times.len()
            )));
        }

        let keep: Vec<bool> = match restrict {
            None => vec![true; times.len()],
            Some((s, boundary)) => times.iter().map(|&t| boundary.contains(s, t)).collect(),
        };
        let index: Vec<TimeOfDay> = times
            .iter()
            .zip(&keep)
            .filter_map(|(&t, &k)| k.then_some(t))
            .collect();

        let series: Vec<(String, Vec<f64>)> = self
            .names
            .iter()
            .zip(stacked.outer_iter())
            .map(|(name, row)| {
                let cumulative = row
                    .iter()
                    .scan(0.0, |acc, v| {
                        *acc += v;
                        Some(*acc)
                    })
                    .zip(&keep)
                    .filter_map(|(c, &k)| k.then_some(c))
                    .collect();
                (name.clone(), cumulative)
            })
            .collect();

        let count = series.len() as f64;
        let mean = (0..index.len())
            .map(|i| series.iter().map(|(_, v)| v[i]).sum::<f64>() / count)
            .collect();

        Ok(CumulativeTransactions {
            index,
            series,
            mean,
        })
    }
}
