//! Simulation engine: cardinality sampling, the nested-cue delta rule, and
//! convergence tracking.
//!
//! A run is strictly sequential — every trial depends on the matrix and
//! generator state left by the previous one — and fully reproducible from
//! its `(seed1, seed2)` pair plus configuration. Nothing in this crate
//! touches a clock or OS entropy.
//!
//! # Modules
//!
//! - [`distribution`] — ZTNBD mass function, cumulative threshold tables,
//!   and the per-trial cardinality draw
//! - [`assoc`]        — cue×marker weight matrix and the delta-rule update
//! - [`convergence`]  — streak counters, early-quit decision, correctness
//!   bitsets
//! - [`config`]       — run configuration and the flat token-list grammar
//! - [`runner`]       — one-run orchestration
//! - [`report`]       — run output records and CSV rendering

pub mod assoc;
pub mod config;
pub mod convergence;
pub mod distribution;
pub mod report;
pub mod runner;

pub use assoc::{AssociationEngine, PredictionTable, WeightInit};
pub use config::{OutputMode, RunConfig, RunRequest};
pub use convergence::{ConvergenceSummary, ConvergenceTracker, TrialBitset};
pub use distribution::{CardinalitySampler, DistributionSpec, ThresholdTable, ztnbd_mass};
pub use report::{FullReport, RangeReport, RunReport, SummaryReport, TrialRow};
pub use runner::run;
