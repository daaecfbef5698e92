//! Tabular result of a full stylized facts run

use crate::error::{Result, StylizedFactsError};
use ndarray::Array2;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::io::Write;

/// Mean and sample standard deviation of one report column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub mean: f64,
    pub std: f64,
}

/// One row per series; pooled tail indices are repeated on every row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactReport {
    series: Vec<String>,
    kurtosis: Vec<f64>,
    kurtosis_p: Vec<f64>,
    tail_left: f64,
    tail_right: f64,
    tail_abs: f64,
    vv_corr: Vec<f64>,
    autocorrelation: BTreeMap<usize, Vec<f64>>,
}

fn column_of(values: &Array2<f64>, rows: usize, name: &str) -> Result<Vec<f64>> {
    if values.dim() != (rows, 1) {
        return Err(StylizedFactsError::ShapeError(format!(
            "Column '{}' has shape {:?}, expected ({}, 1)",
            name,
            values.dim(),
            rows
        )));
    }
    Ok(values.iter().copied().collect())
}

fn scalar_of(values: &Array2<f64>, name: &str) -> Result<f64> {
    match values.dim() {
        (1, 1) => Ok(values[[0, 0]]),
        dim => Err(StylizedFactsError::ShapeError(format!(
            "Column '{}' has shape {:?}, expected (1, 1)",
            name, dim
        ))),
    }
}

impl FactReport {
    /// Assemble a report from estimator outputs
    ///
    /// Per-series outputs must be (N, 1) where N is the number of names;
    /// tail indices must be (1, 1).
    #[allow(clippy::too_many_arguments)]
    pub fn from_estimates(
        series: Vec<String>,
        kurtosis: &Array2<f64>,
        kurtosis_p: &Array2<f64>,
        tail_left: &Array2<f64>,
        tail_right: &Array2<f64>,
        tail_abs: &Array2<f64>,
        vv_corr: &Array2<f64>,
        autocorrelation: &BTreeMap<usize, Array2<f64>>,
    ) -> Result<Self> {
        let rows = series.len();
        let autocorrelation = autocorrelation
            .iter()
            .map(|(&lag, values)| Ok((lag, column_of(values, rows, &format!("acorr lag{}", lag))?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(Self {
            kurtosis: column_of(kurtosis, rows, "kurtosis")?,
            kurtosis_p: column_of(kurtosis_p, rows, "kurtosis_p")?,
            tail_left: scalar_of(tail_left, "tail (left)")?,
            tail_right: scalar_of(tail_right, "tail (right)")?,
            tail_abs: scalar_of(tail_abs, "tail (abs)")?,
            vv_corr: column_of(vv_corr, rows, "vv_corr")?,
            autocorrelation,
            series,
        })
    }

    pub fn series(&self) -> &[String] {
        &self.series
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn kurtosis(&self) -> &[f64] {
        &self.kurtosis
    }

    pub fn kurtosis_p(&self) -> &[f64] {
        &self.kurtosis_p
    }

    pub fn tail_indices(&self) -> (f64, f64, f64) {
        (self.tail_left, self.tail_right, self.tail_abs)
    }

    pub fn vv_corr(&self) -> &[f64] {
        &self.vv_corr
    }

    pub fn autocorrelation(&self, lag: usize) -> Option<&[f64]> {
        self.autocorrelation.get(&lag).map(Vec::as_slice)
    }

    /// Named columns in report order
    pub fn columns(&self) -> Vec<(String, Vec<f64>)> {
        let rows = self.len();
        let mut columns = vec![
            ("kurtosis".to_string(), self.kurtosis.clone()),
            ("kurtosis_p".to_string(), self.kurtosis_p.clone()),
            ("tail (left)".to_string(), vec![self.tail_left; rows]),
            ("tail (right)".to_string(), vec![self.tail_right; rows]),
            ("tail (abs)".to_string(), vec![self.tail_abs; rows]),
            ("vv_corr".to_string(), self.vv_corr.clone()),
        ];
        columns.extend(
            self.autocorrelation
                .iter()
                .map(|(lag, values)| (format!("acorr lag{}", lag), values.clone())),
        );
        columns
    }

    /// Mean and sample standard deviation of every column
    pub fn summary(&self) -> Vec<ColumnSummary> {
        self.columns()
            .into_iter()
            .map(|(column, values)| ColumnSummary {
                mean: values.iter().mean(),
                std: values.iter().std_dev(),
                column,
            })
            .collect()
    }

    /// Write the report as CSV with a leading `series` column
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        let columns = self.columns();

        let mut header = vec!["series".to_string()];
        header.extend(columns.iter().map(|(name, _)| name.clone()));
        wtr.write_record(&header)?;

        for (row, name) in self.series.iter().enumerate() {
            let mut record = vec![name.clone()];
            record.extend(columns.iter().map(|(_, values)| values[row].to_string()));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
