//! Error taxonomy for the clustering pipeline.
//!
//! Schema errors abort a domain, degenerate input skips a single tier, and
//! value coercions are collected as warnings without interrupting anything.

use std::fmt;

use polars::prelude::PolarsError;
use serde::Serialize;
use thiserror::Error;

/// Result alias used throughout the pipeline core.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Source-schema mismatch. Fatal for the domain, never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// A configured column position is beyond the table width.
    #[error("column index {index} is beyond table width {width}{}", context_suffix(.context))]
    IndexOutOfRange {
        index: usize,
        width: usize,
        context: Option<String>,
    },

    /// A named column is absent from the table it was resolved against.
    #[error("required column '{column}' not present in {location}")]
    MissingColumn { column: String, location: String },

    /// An index range with `start > end`.
    #[error("invalid column range {start}..{end}")]
    InvalidRange { start: usize, end: usize },

    /// Two selected or renamed columns collapse onto the same name.
    #[error("duplicate column '{column}' in selection")]
    DuplicateColumn { column: String },
}

fn context_suffix(context: &Option<String>) -> String {
    context
        .as_ref()
        .map(|c| format!(" ({})", c))
        .unwrap_or_default()
}

/// Input that cannot be clustered. Recoverable: only the affected tier is
/// skipped.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DegenerateInputError {
    #[error("tier has no rows")]
    EmptyTier,

    #[error("tier has {rows} row(s), fewer than k = {k}")]
    TooFewRows { rows: usize, k: usize },

    #[error("no usable feature columns remain after dropping zero-variance columns")]
    NoUsableColumns,

    #[error("column '{column}' has {count} missing value(s) and is not zero-filled")]
    UnimputedMissing { column: String, count: usize },

    #[error("k must be at least 1")]
    ZeroClusters,
}

/// Top-level error for a pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("schema mismatch: {0}")]
    Schema(#[from] SchemaError),

    #[error("degenerate input: {0}")]
    Degenerate(#[from] DegenerateInputError),

    #[error("dataframe operation failed: {0}")]
    Polars(#[from] PolarsError),
}

impl PipelineError {
    /// Fatal errors abort the whole domain; everything else is scoped to a tier.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PipelineError::Degenerate(_))
    }
}

/// A value that was expected to be numeric (or within range) and was
/// coerced to missing instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCoercionWarning {
    pub column: String,
    pub count: usize,
    pub reason: CoercionReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoercionReason {
    NotNumeric,
    OutOfRange,
}

impl fmt::Display for ValueCoercionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let why = match self.reason {
            CoercionReason::NotNumeric => "non-numeric",
            CoercionReason::OutOfRange => "out-of-range",
        };
        write!(
            f,
            "column '{}': {} {} value(s) coerced to missing",
            self.column, self.count, why
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_message_includes_context() {
        let err = SchemaError::IndexOutOfRange {
            index: 140,
            width: 100,
            context: Some("selection".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "column index 140 is beyond table width 100 (selection)"
        );
    }

    #[test]
    fn test_degenerate_is_not_fatal() {
        let err: PipelineError = DegenerateInputError::EmptyTier.into();
        assert!(!err.is_fatal());

        let err: PipelineError = SchemaError::MissingColumn {
            column: "Total.Population.of.Village".to_string(),
            location: "selection".to_string(),
        }
        .into();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_coercion_warning_display() {
        let warning = ValueCoercionWarning {
            column: "Distance".to_string(),
            count: 3,
            reason: CoercionReason::NotNumeric,
        };
        assert_eq!(
            warning.to_string(),
            "column 'Distance': 3 non-numeric value(s) coerced to missing"
        );
    }
}
