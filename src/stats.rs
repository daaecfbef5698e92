//! Stylized fact estimators over (series, time) return arrays

pub mod batch;
pub mod correlation;
pub mod kurtosis;
pub mod report;
pub mod returns;
pub mod tail;

pub use batch::BatchHomogeneityChecker;
pub use correlation::{autocorrelation, volume_volatility_correlation};
pub use kurtosis::{kurtosis_test, KurtosisResult};
pub use report::{ColumnSummary, FactReport};
pub use returns::ReturnComputer;
pub use tail::{both_sides_hill_indices, hill_tail_index, TailIndices};
