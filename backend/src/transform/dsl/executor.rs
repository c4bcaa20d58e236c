//! Rule engine
//!
//! Applies a mapping spec to a dataset and builds the output dataset column
//! by column.

use log::{debug, warn};

use super::rules::TransformRegistry;
use super::spec::{MappingRule, MappingSpec};
use crate::error::{MappingError, MappingResult};
use crate::models::{Dataset, Value};

/// Executes mapping specs against a transform registry.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    registry: TransformRegistry,
}

impl RuleEngine {
    /// An engine using the built-in transforms.
    pub fn new() -> Self {
        Self {
            registry: TransformRegistry::builtin(),
        }
    }

    /// An engine using a custom registry.
    pub fn with_registry(registry: TransformRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TransformRegistry {
        &self.registry
    }

    /// Apply every rule of `spec` to `input`, in order.
    ///
    /// A rule whose target field was already produced replaces that column's
    /// values; the column keeps its original position. The first error in
    /// rule order aborts the call and no output is returned.
    pub fn apply(&self, input: &Dataset, spec: &MappingSpec) -> MappingResult<Dataset> {
        let mut columns: Vec<(String, Vec<Value>)> = Vec::new();
        let mut writers: Vec<usize> = Vec::new();

        for (rule_index, rule) in spec.rules().iter().enumerate() {
            let values = self.apply_rule(input, rule_index, rule)?;

            match columns.iter().position(|(name, _)| name == &rule.target_field) {
                Some(pos) => {
                    let notice = MappingError::DuplicateTargetField {
                        rule_index,
                        source_field: rule.source_field.clone(),
                        target_field: rule.target_field.clone(),
                        rule: rule.transform_rule.clone(),
                        overridden: writers[pos],
                    };
                    warn!("{}", notice);
                    columns[pos].1 = values;
                    writers[pos] = rule_index;
                }
                None => {
                    columns.push((rule.target_field.clone(), values));
                    writers.push(rule_index);
                }
            }
        }

        debug!(
            "Applied {} rule(s) to {} record(s), producing {} column(s)",
            spec.len(),
            input.len(),
            columns.len()
        );

        debug_assert!(columns.iter().all(|(_, values)| values.len() == input.len()));
        Dataset::from_columns(columns).map_err(MappingError::InvalidOutput)
    }

    /// Produce one output column from one rule.
    fn apply_rule(
        &self,
        input: &Dataset,
        rule_index: usize,
        rule: &MappingRule,
    ) -> MappingResult<Vec<Value>> {
        let transform = self.registry.get(&rule.transform_rule).ok_or_else(|| {
            MappingError::UnknownRule {
                rule_index,
                source_field: rule.source_field.clone(),
                target_field: rule.target_field.clone(),
                rule: rule.transform_rule.clone(),
            }
        })?;

        let column = input.column(&rule.source_field).ok_or_else(|| {
            MappingError::MissingSourceField {
                rule_index,
                source_field: rule.source_field.clone(),
                target_field: rule.target_field.clone(),
                rule: rule.transform_rule.clone(),
            }
        })?;

        debug!(
            "Rule {}: {} -> {} ({})",
            rule_index, rule.source_field, rule.target_field, rule.transform_rule
        );

        column
            .enumerate()
            .map(|(record, value)| {
                transform.func.call(value).map_err(|expected| {
                    let found = value.kind();
                    if found == expected {
                        MappingError::NonFiniteNumber {
                            rule_index,
                            source_field: rule.source_field.clone(),
                            target_field: rule.target_field.clone(),
                            rule: rule.transform_rule.clone(),
                            record,
                        }
                    } else {
                        MappingError::TypeMismatch {
                            rule_index,
                            source_field: rule.source_field.clone(),
                            target_field: rule.target_field.clone(),
                            rule: rule.transform_rule.clone(),
                            record,
                            expected,
                            found,
                        }
                    }
                })
            })
            .collect()
    }
}

/// Apply a mapping spec with the built-in transforms.
pub fn apply(input: &Dataset, spec: &MappingSpec) -> MappingResult<Dataset> {
    RuleEngine::new().apply(input, spec)
}
