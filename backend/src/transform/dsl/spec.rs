//! Mapping spec definition
//!
//! A mapping spec is an ordered list of rules, each mapping one source field
//! to one target field through a named transform. Its exchange form is a
//! table with exactly three columns: `source_field`, `target_field`,
//! `transform_rule`.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::rules::TransformKind;
use crate::error::{SpecError, SpecResult};
use crate::parser::{decode_content, detect_delimiter, detect_encoding, read_raw_table};
use crate::validation::validate_spec_json;

/// Column names of the mapping table, in order.
pub const SPEC_COLUMNS: [&str; 3] = ["source_field", "target_field", "transform_rule"];

/// One mapping instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRule {
    /// Column read from the input dataset
    pub source_field: String,

    /// Column produced in the output dataset
    pub target_field: String,

    /// Transform name, resolved against the registry when the spec is applied
    pub transform_rule: String,
}

impl MappingRule {
    pub fn new(source_field: &str, target_field: &str, transform_rule: &str) -> Self {
        Self {
            source_field: source_field.to_string(),
            target_field: target_field.to_string(),
            transform_rule: transform_rule.to_string(),
        }
    }

    /// Build a rule from a built-in transform kind.
    pub fn with_kind(source_field: &str, target_field: &str, kind: TransformKind) -> Self {
        Self::new(source_field, target_field, kind.name())
    }

    /// The built-in kind named by this rule, if any.
    pub fn kind(&self) -> Option<TransformKind> {
        self.transform_rule.parse().ok()
    }
}

/// A target field written by more than one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateTarget {
    pub target_field: String,
    /// Index of the rule whose output is discarded
    pub overridden: usize,
    /// Index of the later rule that wins
    pub winner: usize,
}

/// An ordered list of mapping rules.
///
/// When two rules share a target field, the later one wins and the output
/// column keeps the position of the first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingSpec {
    pub rules: Vec<MappingRule>,
}

/// JSON shapes accepted for a spec document.
#[derive(Deserialize)]
#[serde(untagged)]
enum SpecDocument {
    Table(Vec<MappingRule>),
    Wrapped { rules: Vec<MappingRule> },
}

impl MappingSpec {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn from_rules(rules: Vec<MappingRule>) -> Self {
        Self { rules }
    }

    /// Append a rule (builder style).
    pub fn with_rule(mut self, source_field: &str, target_field: &str, transform_rule: &str) -> Self {
        self.push(MappingRule::new(source_field, target_field, transform_rule));
        self
    }

    pub fn push(&mut self, rule: MappingRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Source fields in first-use order, without repeats.
    pub fn source_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = Vec::new();
        for rule in &self.rules {
            if !fields.contains(&rule.source_field) {
                fields.push(rule.source_field.clone());
            }
        }
        fields
    }

    /// Output columns in first-appearance order, without repeats.
    pub fn target_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = Vec::new();
        for rule in &self.rules {
            if !fields.contains(&rule.target_field) {
                fields.push(rule.target_field.clone());
            }
        }
        fields
    }

    /// Every override caused by a repeated target field, in rule order.
    pub fn duplicate_targets(&self) -> Vec<DuplicateTarget> {
        let mut last_writer: HashMap<&str, usize> = HashMap::new();
        let mut duplicates = Vec::new();
        for (idx, rule) in self.rules.iter().enumerate() {
            if let Some(prev) = last_writer.insert(rule.target_field.as_str(), idx) {
                duplicates.push(DuplicateTarget {
                    target_field: rule.target_field.clone(),
                    overridden: prev,
                    winner: idx,
                });
            }
        }
        duplicates
    }

    /// Load a spec file: `.json` as JSON, anything else as a delimited table.
    pub fn load(path: &Path) -> SpecResult<Self> {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        if is_json {
            let content = fs::read_to_string(path)?;
            Self::from_json(&content)
        } else {
            let bytes = fs::read(path)?;
            let encoding = detect_encoding(&bytes);
            let content = decode_content(&bytes, &encoding);
            let delimiter = detect_delimiter(&content);
            Self::from_csv_str(&content, delimiter)
        }
    }

    /// Parse a delimited mapping table.
    ///
    /// The header must contain the three spec columns; extra columns (such as
    /// the annotations of a reviewed candidate table) are ignored.
    pub fn from_csv_str(content: &str, delimiter: char) -> SpecResult<Self> {
        let table = read_raw_table(content, delimiter)?;

        let mut positions = [0usize; 3];
        for (slot, column) in SPEC_COLUMNS.iter().enumerate() {
            positions[slot] = table
                .headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| SpecError::MissingColumn(column.to_string()))?;
        }

        let mut rules = Vec::with_capacity(table.rows.len());
        for (row_idx, row) in table.rows.iter().enumerate() {
            let mut cells = [""; 3];
            for (slot, &pos) in positions.iter().enumerate() {
                let cell = row.get(pos).map(|s| s.trim()).unwrap_or("");
                if cell.is_empty() {
                    return Err(SpecError::EmptyCell {
                        row: row_idx + 1,
                        column: SPEC_COLUMNS[slot].to_string(),
                    });
                }
                cells[slot] = cell;
            }
            rules.push(MappingRule::new(cells[0], cells[1], cells[2]));
        }

        Ok(Self { rules })
    }

    /// Parse a JSON spec: an array of rules or `{"rules": [...]}`.
    ///
    /// The document is checked against the embedded mapping schema first.
    pub fn from_json(json: &str) -> SpecResult<Self> {
        let document: JsonValue = serde_json::from_str(json)?;
        Self::from_json_value(&document)
    }

    pub fn from_json_value(document: &JsonValue) -> SpecResult<Self> {
        validate_spec_json(document).map_err(SpecError::Schema)?;
        let rules = match serde_json::from_value::<SpecDocument>(document.clone())? {
            SpecDocument::Table(rules) => rules,
            SpecDocument::Wrapped { rules } => rules,
        };
        Ok(Self { rules })
    }

    /// Serialize as `{"rules": [...]}`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Serialize as a comma-separated mapping table.
    pub fn to_csv_string(&self) -> Result<String, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(SPEC_COLUMNS)?;
        for rule in &self.rules {
            writer.write_record([
                rule.source_field.as_str(),
                rule.target_field.as_str(),
                rule.transform_rule.as_str(),
            ])?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Example spec for documentation and the `example-spec` command
pub fn example_spec() -> MappingSpec {
    MappingSpec::new()
        .with_rule("Name", "FullName", "uppercase")
        .with_rule("Email", "Domain", "extract_domain")
        .with_rule("Age", "AgeGroup", "age_category")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_csv_str() {
        let table = "source_field,target_field,transform_rule\nName,FullName,uppercase\nEmail,Domain,extract_domain\n";
        let spec = MappingSpec::from_csv_str(table, ',').unwrap();
        assert_eq!(spec.len(), 2);
        assert_eq!(spec.rules()[0], MappingRule::new("Name", "FullName", "uppercase"));
        assert_eq!(spec.rules()[1].kind(), Some(TransformKind::ExtractDomain));
    }

    #[test]
    fn test_from_csv_str_column_order_and_extras() {
        let table = "criterion;transform_rule;target_field;source_field\ndata_type;direct;id;uid\n";
        let spec = MappingSpec::from_csv_str(table, ';').unwrap();
        assert_eq!(spec.rules()[0], MappingRule::new("uid", "id", "direct"));
    }

    #[test]
    fn test_missing_column() {
        let table = "source_field,target_field\nName,FullName\n";
        let err = MappingSpec::from_csv_str(table, ',').unwrap_err();
        assert!(matches!(err, SpecError::MissingColumn(ref c) if c == "transform_rule"));
    }

    #[test]
    fn test_empty_cell() {
        let table = "source_field,target_field,transform_rule\nName,,uppercase\n";
        let err = MappingSpec::from_csv_str(table, ',').unwrap_err();
        assert!(matches!(err, SpecError::EmptyCell { row: 1, .. }));
    }

    #[test]
    fn test_unknown_rule_is_kept_for_apply_time() {
        let table = "source_field,target_field,transform_rule\nName,FullName,titlecase\n";
        let spec = MappingSpec::from_csv_str(table, ',').unwrap();
        assert_eq!(spec.rules()[0].transform_rule, "titlecase");
        assert_eq!(spec.rules()[0].kind(), None);
    }

    #[test]
    fn test_json_shapes() {
        let array = r#"[{"source_field":"a","target_field":"b","transform_rule":"direct"}]"#;
        let wrapped = r#"{"rules":[{"source_field":"a","target_field":"b","transform_rule":"direct"}]}"#;
        assert_eq!(
            MappingSpec::from_json(array).unwrap(),
            MappingSpec::from_json(wrapped).unwrap()
        );
    }

    #[test]
    fn test_json_schema_violation() {
        let bad = r#"[{"source_field":"a","transform_rule":"direct"}]"#;
        assert!(matches!(MappingSpec::from_json(bad), Err(SpecError::Schema(_))));
    }

    #[test]
    fn test_json_serialization() {
        let spec = example_spec();
        let json = spec.to_json().unwrap();
        assert_eq!(MappingSpec::from_json(&json).unwrap(), spec);
    }

    #[test]
    fn test_csv_serialization() {
        let spec = example_spec();
        let csv = spec.to_csv_string().unwrap();
        assert!(csv.starts_with("source_field,target_field,transform_rule\n"));
        assert_eq!(MappingSpec::from_csv_str(&csv, ',').unwrap(), spec);
    }

    #[test]
    fn test_duplicate_targets() {
        let spec = MappingSpec::new()
            .with_rule("a", "Status", "direct")
            .with_rule("b", "Other", "direct")
            .with_rule("c", "Status", "uppercase")
            .with_rule("d", "Status", "lowercase");
        assert_eq!(
            spec.duplicate_targets(),
            vec![
                DuplicateTarget { target_field: "Status".into(), overridden: 0, winner: 2 },
                DuplicateTarget { target_field: "Status".into(), overridden: 2, winner: 3 },
            ]
        );
        assert_eq!(spec.target_fields(), vec!["Status".to_string(), "Other".to_string()]);
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("rules.csv");
        fs::write(&csv_path, "source_field;target_field;transform_rule\nAge;AgeGroup;age_category\n").unwrap();
        let spec = MappingSpec::load(&csv_path).unwrap();
        assert_eq!(spec.rules()[0].kind(), Some(TransformKind::AgeCategory));

        let json_path = dir.path().join("rules.json");
        fs::write(&json_path, example_spec().to_json().unwrap()).unwrap();
        assert_eq!(MappingSpec::load(&json_path).unwrap(), example_spec());
    }
}
