//! Error types for the fieldmap mapping pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`CsvError`] - Delimited file reading/writing errors
//! - [`DatasetError`] - Malformed in-memory datasets
//! - [`SpecError`] - Mapping table loading errors (configuration)
//! - [`MappingError`] - Rule engine failures
//! - [`RegistryError`] - Mapping spec store errors
//! - [`ConfigError`] - Invalid runtime settings
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

use crate::models::ValueKind;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while reading or writing delimited files.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed delimited content.
    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,

    /// The parsed header row is not a valid schema.
    #[error("Invalid header row: {0}")]
    Dataset(#[from] DatasetError),
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(0);
        CsvError::Parse {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Dataset Errors
// =============================================================================

/// A dataset could not be built from the supplied fields and rows.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatasetError {
    /// The same field name appears twice in a schema.
    #[error("Duplicate field '{0}' in schema")]
    DuplicateField(String),

    /// A row does not carry one value per field.
    #[error("Row {row} has {found} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Columns of different lengths were combined.
    #[error("Column '{field}' has {found} values, expected {expected}")]
    ColumnLength {
        field: String,
        expected: usize,
        found: usize,
    },
}

// =============================================================================
// Mapping Spec Errors
// =============================================================================

/// Errors while loading a mapping table.
#[derive(Debug, Error)]
pub enum SpecError {
    /// Failed to read the mapping file.
    #[error("Failed to read mapping file: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed delimited mapping table.
    #[error("Invalid mapping table: {0}")]
    Csv(#[from] CsvError),

    /// A required column of the mapping table is missing.
    #[error("Mapping table is missing required column '{0}'")]
    MissingColumn(String),

    /// A row of the mapping table has an empty cell.
    #[error("Mapping row {row}: '{column}' is empty")]
    EmptyCell { row: usize, column: String },

    /// Invalid JSON document.
    #[error("Invalid mapping JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON document does not match the mapping schema.
    #[error("Mapping JSON does not match schema: {}", .0.join("; "))]
    Schema(Vec<String>),
}

// =============================================================================
// Rule Engine Errors
// =============================================================================

/// Errors raised while applying a mapping spec.
///
/// Every per-rule variant names the offending rule (its position in the spec,
/// source field, target field and transform name) so a failure can be located
/// without re-running.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MappingError {
    /// The rule names a transform that is not registered.
    #[error("Rule {rule_index} ({source_field} -> {target_field}): unknown transform rule '{rule}'")]
    UnknownRule {
        rule_index: usize,
        source_field: String,
        target_field: String,
        rule: String,
    },

    /// The rule reads a field that the input schema does not have.
    #[error("Rule {rule_index} ({source_field} -> {target_field}, {rule}): source field '{source_field}' not found in input")]
    MissingSourceField {
        rule_index: usize,
        source_field: String,
        target_field: String,
        rule: String,
    },

    /// A value does not have the type the transform requires.
    #[error("Rule {rule_index} ({source_field} -> {target_field}, {rule}): record {record} holds a {found} value, expected {expected}")]
    TypeMismatch {
        rule_index: usize,
        source_field: String,
        target_field: String,
        rule: String,
        record: usize,
        expected: ValueKind,
        found: ValueKind,
    },

    /// Two rules write the same target field; the later one wins.
    #[error("Rule {rule_index} ({source_field} -> {target_field}, {rule}) overrides rule {overridden} for target '{target_field}'")]
    DuplicateTargetField {
        rule_index: usize,
        source_field: String,
        target_field: String,
        rule: String,
        overridden: usize,
    },

    /// A number-only transform received NaN or an infinity.
    #[error("Rule {rule_index} ({source_field} -> {target_field}, {rule}): record {record} holds a non-finite number")]
    NonFiniteNumber {
        rule_index: usize,
        source_field: String,
        target_field: String,
        rule: String,
        record: usize,
    },

    /// The produced columns could not be assembled into a dataset.
    #[error("Mapped columns do not form a dataset: {0}")]
    InvalidOutput(DatasetError),
}

impl MappingError {
    /// Target field of the offending rule, when the error belongs to one rule.
    pub fn target_field(&self) -> Option<&str> {
        match self {
            MappingError::UnknownRule { target_field, .. }
            | MappingError::MissingSourceField { target_field, .. }
            | MappingError::TypeMismatch { target_field, .. }
            | MappingError::DuplicateTargetField { target_field, .. }
            | MappingError::NonFiniteNumber { target_field, .. } => Some(target_field),
            MappingError::InvalidOutput(_) => None,
        }
    }

    /// Position of the offending rule in the spec, when the error belongs to one rule.
    pub fn rule_index(&self) -> Option<usize> {
        match self {
            MappingError::UnknownRule { rule_index, .. }
            | MappingError::MissingSourceField { rule_index, .. }
            | MappingError::TypeMismatch { rule_index, .. }
            | MappingError::DuplicateTargetField { rule_index, .. }
            | MappingError::NonFiniteNumber { rule_index, .. } => Some(*rule_index),
            MappingError::InvalidOutput(_) => None,
        }
    }

    /// Whether this condition is resolved by last-write-wins and only warrants a warning.
    pub fn is_warning(&self) -> bool {
        matches!(self, MappingError::DuplicateTargetField { .. })
    }
}

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors from the mapping spec store.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Spec not found.
    #[error("Mapping spec not found: {0}")]
    NotFound(String),

    /// Imported file is not a valid mapping table.
    #[error("Invalid mapping spec: {0}")]
    InvalidSpec(#[from] SpecError),

    /// IO error.
    #[error("Registry IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error.
    #[error("Registry JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Invalid runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be used.
    #[error("Invalid value '{value}' for {key}: {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::transform::pipeline::map_file`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Mapping table could not be loaded.
    #[error("Mapping spec error: {0}")]
    Spec(#[from] SpecError),

    /// The rule engine failed.
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// The pre-flight check found errors.
    #[error("Mapping spec check failed: {}", .0.join("; "))]
    Check(Vec<String>),

    /// Registry error.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No records to map.
    #[error("No records to map")]
    EmptyInput,

    /// No stored spec matches the input columns.
    #[error("No stored mapping spec matches columns: {}", .0.join(", "))]
    NoCompatibleSpec(Vec<String>),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for mapping table loading.
pub type SpecResult<T> = Result<T, SpecError>;

/// Result type for rule engine operations.
pub type MappingResult<T> = Result<T, MappingError>;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let csv_err = CsvError::EmptyFile;
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        let mapping_err = MappingError::MissingSourceField {
            rule_index: 0,
            source_field: "Email".into(),
            target_field: "Domain".into(),
            rule: "extract_domain".into(),
        };
        let pipeline_err: PipelineError = mapping_err.into();
        assert!(pipeline_err.to_string().contains("Email"));
    }

    #[test]
    fn test_type_mismatch_names_rule_and_record() {
        let err = MappingError::TypeMismatch {
            rule_index: 2,
            source_field: "Age".into(),
            target_field: "Shout".into(),
            rule: "uppercase".into(),
            record: 7,
            expected: ValueKind::Text,
            found: ValueKind::Number,
        };
        let msg = err.to_string();
        assert!(msg.contains("Shout"));
        assert!(msg.contains("Age"));
        assert!(msg.contains("uppercase"));
        assert!(msg.contains("record 7"));
        assert_eq!(err.target_field(), Some("Shout"));
        assert_eq!(err.rule_index(), Some(2));
        assert!(!err.is_warning());
    }

    #[test]
    fn test_schema_error_joins_messages() {
        let err = SpecError::Schema(vec!["a".into(), "b".into()]);
        assert!(err.to_string().ends_with("a; b"));
    }
}
