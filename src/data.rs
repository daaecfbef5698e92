//! Market data handling
//!
//! Tick events are turned into [`BarSequence`]s by a [`Resampler`], then
//! enriched with scaled activity columns by the [`SessionPartitioner`].

pub mod bar;
pub mod csv_io;
pub mod curve;
pub mod frequency;
pub mod resample;
pub mod session;

pub use bar::{Bar, BarSequence, Column, DerivedColumn};
pub use curve::{ReferenceCurves, TransactionAllocationCurve};
pub use frequency::ResampleRule;
pub use resample::{CalendarResampler, ResampledBars, Resampler, TransactionCountResampler};
pub use session::{SessionBoundary, SessionPartitioner};
