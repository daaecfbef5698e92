//! # Stylized Facts
//!
//! Resampling and estimation engine for checking the stylized facts of
//! intraday market data: fat tails, tail decay, volatility clustering and
//! the volume-volatility relation.
//!
//! Tick streams are turned into OHLCV bars (calendar buckets for real
//! markets, transaction-count buckets for synthetic ones), a batch of bar
//! sequences is stacked into a (series, time) array when possible, and each
//! estimator returns one value per series.
//!
//! ## Example
//!
//! ```rust,no_run
//! use stylized_facts::prelude::*;
//!
//! fn run(a: BarSequence, b: BarSequence) -> Result<()> {
//!     let mut checker = StylizedFactsChecker::new(CheckerConfig::default())?;
//!     checker.add_sequence("day1", a)?;
//!     checker.add_sequence("day2", b)?;
//!     let report = checker.check_stylized_facts()?;
//!     report.write_csv(std::io::stdout())?;
//!     Ok(())
//! }
//! ```

pub mod checker;
pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod stats;
pub mod types;

pub mod prelude {
    //! Commonly used types and traits
    pub use crate::checker::{CcdfCurve, CumulativeTransactions, StylizedFactsChecker};
    pub use crate::config::{CheckerConfig, EstimatorConfig, MarketMode, MissingPolicy};
    pub use crate::context::RunContext;
    pub use crate::data::{
        Bar, BarSequence, CalendarResampler, Column, DerivedColumn, ReferenceCurves,
        ResampleRule, Resampler, SessionBoundary, SessionPartitioner,
        TransactionAllocationCurve, TransactionCountResampler,
    };
    pub use crate::error::{Result, StylizedFactsError};
    pub use crate::stats::{FactReport, KurtosisResult, ReturnComputer, TailIndices};
    pub use crate::types::*;
}
