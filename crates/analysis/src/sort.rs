//! Row filters and sort specification.

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use smed_core::{OperatorId, PhaseId};

/// Restricts the analysed operations. `None` means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisFilter {
    /// Only operations assigned to this operator
    pub operator: Option<OperatorId>,

    /// Only operations of this phase
    pub phase: Option<PhaseId>,
}

impl AnalysisFilter {
    /// Filter on one operator.
    pub fn with_operator(mut self, operator: impl Into<OperatorId>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    /// Filter on one phase.
    pub fn with_phase(mut self, phase: impl Into<PhaseId>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    /// Whether an operation passes the filter.
    pub fn accepts(&self, phase: &PhaseId, operator: &OperatorId) -> bool {
        self.phase.as_ref().map_or(true, |p| p == phase)
            && self.operator.as_ref().map_or(true, |o| o == operator)
    }
}

/// Column the rows are ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    /// Phase name
    #[default]
    Phase,
    /// Operation label
    Label,
    /// Operator name
    Operator,
    /// Planned duration
    Target,
    /// Measured duration
    Actual,
    /// Measured minus planned
    Delta,
    /// Achievement percentage
    Achievement,
}

impl SortKey {
    /// All keys, in column order.
    pub const ALL: [SortKey; 7] = [
        SortKey::Phase,
        SortKey::Label,
        SortKey::Operator,
        SortKey::Target,
        SortKey::Actual,
        SortKey::Delta,
        SortKey::Achievement,
    ];

    /// Lowercase name used on the command line and in JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Phase => "phase",
            SortKey::Label => "label",
            SortKey::Operator => "operator",
            SortKey::Target => "target",
            SortKey::Actual => "actual",
            SortKey::Delta => "delta",
            SortKey::Achievement => "achievement",
        }
    }

    /// Whether the key orders text.
    pub fn is_textual(&self) -> bool {
        matches!(self, SortKey::Phase | SortKey::Label | SortKey::Operator)
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized sort key name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown sort key '{0}' (expected one of phase, label, operator, target, actual, delta, achievement)")]
pub struct ParseSortKeyError(pub String);

impl FromStr for SortKey {
    type Err = ParseSortKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str() == wanted)
            .ok_or_else(|| ParseSortKeyError(s.to_string()))
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    /// Smallest first
    #[default]
    Asc,
    /// Largest first
    Desc,
}

impl SortDirection {
    /// The other direction.
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Active sort key and direction. Defaults to phase, ascending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    /// Column to sort by
    pub key: SortKey,

    /// Direction
    pub direction: SortDirection,
}

impl SortSpec {
    /// Ascending sort on `key`.
    pub fn new(key: SortKey) -> Self {
        Self { key, direction: SortDirection::Asc }
    }

    /// Descending sort on `key`.
    pub fn descending(key: SortKey) -> Self {
        Self { key, direction: SortDirection::Desc }
    }

    /// Column-header behavior: the active key flips direction, another key
    /// becomes active in ascending order.
    pub fn toggle(&mut self, key: SortKey) {
        if self.key == key {
            self.direction = self.direction.flipped();
        } else {
            *self = Self::new(key);
        }
    }
}
