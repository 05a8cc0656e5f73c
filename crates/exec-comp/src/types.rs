use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type a column is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    /// Neither list mentions the column; it is carried through untouched.
    Passthrough,
}

/// Value used to replace missing cells in a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillValue {
    Numeric(f64),
    Categorical(String),
}

impl fmt::Display for FillValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "{}", v),
            Self::Categorical(s) => write!(f, "'{}'", s),
        }
    }
}

// ============================================================================
// Preparation Summary Types
// ============================================================================

/// Human-readable audit of what the preparation stages did.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreparationSummary {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,
    /// Rows in every table (loading, cleaning and imputation never drop rows).
    pub rows: usize,
    pub columns: usize,
    /// Share of non-null cells in the clean table (0.0 - 1.0).
    pub completeness_before: f64,
    /// Share of non-null cells in the imputed table (0.0 - 1.0).
    pub completeness_after: f64,
    pub actions: Vec<PreparationAction>,
    pub column_summaries: Vec<ColumnSummary>,
    pub warnings: Vec<String>,
}

impl PreparationSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_action(&mut self, action: PreparationAction) {
        self.actions.push(action);
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Actions of one type, in the order they happened.
    pub fn actions_of(&self, action_type: ActionType) -> impl Iterator<Item = &PreparationAction> {
        self.actions
            .iter()
            .filter(move |a| a.action_type == action_type)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.column_summaries.iter().find(|c| c.name == name)
    }
}

/// A single action taken during preparation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparationAction {
    pub action_type: ActionType,
    /// Column name or "dataset".
    pub target: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl PreparationAction {
    pub fn new(
        action_type: ActionType,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            target: target.into(),
            description: description.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    ColumnRenamed,
    /// A rename or column lookup failed and was skipped.
    RenameSkipped,
    /// Numeric strings were converted; some may have degraded to missing.
    ValueCleaned,
    ValueImputed,
    /// An entirely-missing column was left unimputed.
    ColumnExcluded,
}

impl ActionType {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ColumnRenamed => "Column Renamed",
            Self::RenameSkipped => "Rename Skipped",
            Self::ValueCleaned => "Value Cleaned",
            Self::ValueImputed => "Value Imputed",
            Self::ColumnExcluded => "Column Excluded",
        }
    }
}

/// What happened to a single column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub kind: ColumnKind,
    /// Missing cells right after loading (empty cells and missing tokens).
    pub missing_loaded: usize,
    /// Missing cells in the clean table (adds cells that failed to parse).
    pub missing_clean: usize,
    pub missing_imputed: usize,
    /// Present cells that could not be parsed as numbers.
    pub values_degraded: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_value: Option<FillValue>,
    pub excluded: bool,
}

impl ColumnSummary {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            missing_loaded: 0,
            missing_clean: 0,
            missing_imputed: 0,
            values_degraded: 0,
            fill_value: None,
            excluded: false,
        }
    }

    /// Number of cells the imputer filled.
    pub fn imputed_count(&self) -> usize {
        self.missing_clean.saturating_sub(self.missing_imputed)
    }
}

// ============================================================================
// Tests
// ============================================================================
