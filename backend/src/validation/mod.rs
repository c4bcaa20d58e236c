//! Mapping spec validation.
//!
//! Two layers:
//!
//! - **Document shape**: JSON mapping documents are validated against the
//!   embedded `schemas/mapping-spec-schema.json` (JSON Schema Draft 7)
//!   before they are deserialized.
//! - **Pre-flight check**: [`check_spec`] compares a loaded spec with an input
//!   schema and the transform registry, and reports every problem the rule
//!   engine would hit, without stopping at the first one.
//!
//! # Example
//!
//! ```rust,ignore
//! use fieldmap::{check_spec, example_spec, TransformRegistry};
//!
//! let fields = vec!["Name".to_string(), "Email".to_string()];
//! let report = check_spec(&example_spec(), &fields, &TransformRegistry::builtin(), None);
//! assert!(!report.is_ok()); // Age is missing
//! for issue in report.issues() {
//!     println!("{}", issue);
//! }
//! ```

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

use crate::models::ValueKind;
use crate::profile::{DataType, SchemaProfile};
use crate::transform::dsl::{MappingSpec, TransformRegistry};

static MAPPING_SPEC_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/mapping-spec-schema.json"))
        .expect("Invalid embedded schema")
});

/// Validate a JSON document against a JSON schema.
///
/// Returns every validation error message when the document is invalid.
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick boolean check of a document against a schema.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate a JSON mapping document (array of rules or `{"rules": [...]}`).
pub fn validate_spec_json(data: &Value) -> Result<(), Vec<String>> {
    validate(&MAPPING_SPEC_SCHEMA, data)
}

/// Quick check of a JSON mapping document.
pub fn is_valid_spec_json(data: &Value) -> bool {
    is_valid(&MAPPING_SPEC_SCHEMA, data)
}

// =============================================================================
// Pre-flight check
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Applying the spec will fail.
    Error,
    /// Applying the spec succeeds but probably not as intended.
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    UnknownRule,
    MissingSourceField,
    DuplicateTargetField,
    TypeRisk,
}

/// One finding of [`check_spec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecIssue {
    pub severity: Severity,
    pub kind: IssueKind,
    /// Position of the rule in the spec.
    pub rule_index: usize,
    pub target_field: String,
    pub message: String,
}

impl fmt::Display for SpecIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "[{}] rule {}: {}", level, self.rule_index, self.message)
    }
}

/// Every issue found in a spec, in rule order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpecReport {
    issues: Vec<SpecIssue>,
}

impl SpecReport {
    pub fn issues(&self) -> &[SpecIssue] {
        &self.issues
    }

    pub fn errors(&self) -> impl Iterator<Item = &SpecIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &SpecIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// True when no error-level issue was found.
    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none()
    }

    /// Error messages, one per error-level issue.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors().map(|i| i.to_string()).collect()
    }
}

/// Check a spec against the fields of an input schema.
///
/// Reports unknown transform rules, source fields missing from `fields`,
/// targets written by several rules (warning) and, when a profile of the
/// input is given, transforms restricted to one value kind that are applied
/// to a column of another kind.
pub fn check_spec(
    spec: &MappingSpec,
    fields: &[String],
    registry: &TransformRegistry,
    profile: Option<&SchemaProfile>,
) -> SpecReport {
    let known: HashSet<&str> = fields.iter().map(String::as_str).collect();
    let mut issues = Vec::new();

    let overrides: Vec<(usize, usize)> = spec
        .duplicate_targets()
        .into_iter()
        .map(|d| (d.winner, d.overridden))
        .collect();

    for (idx, rule) in spec.rules().iter().enumerate() {
        let issue = |severity, kind, message: String| SpecIssue {
            severity,
            kind,
            rule_index: idx,
            target_field: rule.target_field.clone(),
            message,
        };

        let transform = registry.get(&rule.transform_rule);
        if transform.is_none() {
            issues.push(issue(
                Severity::Error,
                IssueKind::UnknownRule,
                format!(
                    "unknown transform rule '{}' ({} -> {})",
                    rule.transform_rule, rule.source_field, rule.target_field
                ),
            ));
        }

        if !known.contains(rule.source_field.as_str()) {
            issues.push(issue(
                Severity::Error,
                IssueKind::MissingSourceField,
                format!("source field '{}' not found in input", rule.source_field),
            ));
        }

        for &(_, overridden) in overrides.iter().filter(|(winner, _)| *winner == idx) {
            issues.push(issue(
                Severity::Warning,
                IssueKind::DuplicateTargetField,
                format!(
                    "overrides rule {} for target '{}'",
                    overridden, rule.target_field
                ),
            ));
        }

        let expected = transform.and_then(|t| t.func.accepts());
        let column = profile.and_then(|p| p.get(&rule.source_field));
        if let (Some(expected), Some(column)) = (expected, column) {
            if column.present_count == 0 {
                continue;
            }
            let severity = match (expected, column.data_type) {
                (ValueKind::Text, DataType::Text) | (ValueKind::Number, DataType::Number) => None,
                (_, DataType::Mixed) => Some(Severity::Warning),
                _ => Some(Severity::Error),
            };
            if let Some(severity) = severity {
                issues.push(issue(
                    severity,
                    IssueKind::TypeRisk,
                    format!(
                        "'{}' expects {} values but column '{}' is {}",
                        rule.transform_rule, expected, rule.source_field, column.data_type
                    ),
                ));
            }
        }
    }

    SpecReport { issues }
}
