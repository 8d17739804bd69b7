//! Export rows and the delay ranking.

use serde::Serialize;
use smed_core::{OperationId, OperatorId, PhaseId};
use crate::dataset::{AnalysisDataset, OperationRow};

/// How many delays the ranking shows by default.
pub const DEFAULT_TOP_DELAYS: usize = 3;

/// Flat record of one operation row, for any exchange format.
///
/// Durations are in minutes; pending operations carry `null` rather than zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    /// Operation
    pub operation_id: OperationId,
    /// Operation label
    pub label: String,
    /// Owning phase
    pub phase_id: PhaseId,
    /// Phase display name
    pub phase_name: String,
    /// Assigned operator
    pub operator_id: OperatorId,
    /// Operator display name
    pub operator_name: String,
    /// Planned duration
    pub target_minutes: f64,
    /// Measured duration
    pub actual_minutes: Option<f64>,
    /// Measured minus planned
    pub delta_minutes: Option<f64>,
    /// Clamped achievement
    pub achievement_percent: Option<f64>,
}

impl From<&OperationRow> for ExportRow {
    fn from(row: &OperationRow) -> Self {
        Self {
            operation_id: row.operation_id.clone(),
            label: row.label.clone(),
            phase_id: row.phase_id.clone(),
            phase_name: row.phase_name.clone(),
            operator_id: row.operator_id.clone(),
            operator_name: row.operator_name.clone(),
            target_minutes: row.target_minutes,
            actual_minutes: row.actual_minutes(),
            delta_minutes: row.delta_minutes(),
            achievement_percent: row.achievement(),
        }
    }
}

/// Export rows in dataset order.
pub fn export_rows(dataset: &AnalysisDataset) -> Vec<ExportRow> {
    dataset.operations.iter().map(ExportRow::from).collect()
}

/// The `n` recorded operations that overran their target the most, worst first.
///
/// Operations on or under target never appear.
pub fn top_delays(rows: &[OperationRow], n: usize) -> Vec<&OperationRow> {
    let mut late: Vec<(&OperationRow, i64)> = rows
        .iter()
        .filter_map(|row| row.delta_ms().filter(|delta| *delta > 0).map(|delta| (row, delta)))
        .collect();
    late.sort_by(|a, b| b.1.cmp(&a.1));
    late.into_iter().take(n).map(|(row, _)| row).collect()
}
