//! Changeover Analysis
//!
//! Turns recorded timings into filtered, sorted per-operation rows with
//! phase and global roll-ups. Every function here is a pure read of its
//! inputs.

#![warn(missing_docs)]

pub mod collate;
pub mod sort;
pub mod dataset;
pub mod export;

pub use collate::ReadingOrder;
pub use sort::{AnalysisFilter, SortKey, SortDirection, SortSpec, ParseSortKeyError};
pub use dataset::{
    achievement, build_dataset, AnalysisDataset, GlobalAggregate, OperationRow, PhaseAggregate,
    ResultSource, ACHIEVEMENT_CAP,
};
pub use export::{export_rows, top_delays, ExportRow, DEFAULT_TOP_DELAYS};
