//! Tabular data model shared by the whole pipeline.
//!
//! - [`Value`] - A single cell: text, number or absent
//! - [`ValueKind`] - The tag of a value, used in type errors
//! - [`Dataset`] - Ordered records sharing one insertion-ordered schema
//! - [`Record`] - Borrowed view of one row of a dataset

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

use crate::error::DatasetError;

// =============================================================================
// Values
// =============================================================================

/// A scalar cell value.
///
/// Serializes as a JSON string, number or `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Textual value.
    Text(String),
    /// Numeric value.
    Number(f64),
    /// Missing cell.
    Absent,
}

/// Tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Text,
    Number,
    Absent,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Text => "text",
            ValueKind::Number => "number",
            ValueKind::Absent => "absent",
        };
        f.write_str(name)
    }
}

impl Value {
    /// Build a text value.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Text(_) => ValueKind::Text,
            Value::Number(_) => ValueKind::Number,
            Value::Absent => ValueKind::Absent,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Hashable identity used to count distinct values.
    ///
    /// `Number(1.0)` and `Text("1")` have different keys.
    pub(crate) fn distinct_key(&self) -> Option<DistinctKey<'_>> {
        match self {
            Value::Text(s) => Some(DistinctKey::Text(s)),
            // -0.0 and 0.0 compare equal, so they share a key.
            Value::Number(n) if *n == 0.0 => Some(DistinctKey::Number(0f64.to_bits())),
            Value::Number(n) => Some(DistinctKey::Number(n.to_bits())),
            Value::Absent => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum DistinctKey<'a> {
    Text(&'a str),
    Number(u64),
}

impl fmt::Display for Value {
    /// Renders the cell as it would appear in a delimited file.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{}", n),
            Value::Absent => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Absent)
    }
}

// =============================================================================
// Dataset
// =============================================================================

/// An ordered collection of records sharing one schema.
///
/// Field order is insertion order. Every row carries exactly one value per
/// field; construction rejects anything else, so consumers never see a
/// ragged dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    fields: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Create an empty dataset with the given schema.
    pub fn new(fields: Vec<String>) -> Result<Self, DatasetError> {
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.as_str()) {
                return Err(DatasetError::DuplicateField(field.clone()));
            }
        }
        Ok(Self {
            fields,
            rows: Vec::new(),
        })
    }

    /// Create a dataset from a schema and row-major values.
    pub fn from_rows(fields: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, DatasetError> {
        let mut dataset = Self::new(fields)?;
        for row in rows {
            dataset.push_row(row)?;
        }
        Ok(dataset)
    }

    /// Create a dataset from named columns of equal length.
    ///
    /// With no columns the dataset has no rows.
    pub fn from_columns(columns: Vec<(String, Vec<Value>)>) -> Result<Self, DatasetError> {
        let row_count = columns.first().map(|(_, values)| values.len()).unwrap_or(0);
        for (field, values) in &columns {
            if values.len() != row_count {
                return Err(DatasetError::ColumnLength {
                    field: field.clone(),
                    expected: row_count,
                    found: values.len(),
                });
            }
        }

        let (fields, columns): (Vec<String>, Vec<Vec<Value>>) = columns.into_iter().unzip();
        let mut dataset = Self::new(fields)?;

        let mut iters: Vec<_> = columns.into_iter().map(Vec::into_iter).collect();
        for _ in 0..row_count {
            let row: Vec<Value> = iters
                .iter_mut()
                .map(|it| it.next().unwrap_or(Value::Absent))
                .collect();
            dataset.rows.push(row);
        }
        Ok(dataset)
    }

    /// Append one row; its width must match the schema.
    pub(crate) fn push_row(&mut self, row: Vec<Value>) -> Result<(), DatasetError> {
        if row.len() != self.fields.len() {
            return Err(DatasetError::RowWidth {
                row: self.rows.len(),
                expected: self.fields.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Field names in schema order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column in record order.
    pub fn column(&self, field: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let idx = self.field_index(field)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Value of `field` in record `row`.
    pub fn get(&self, row: usize, field: &str) -> Option<&Value> {
        let idx = self.field_index(field)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    pub fn record(&self, row: usize) -> Option<Record<'_>> {
        self.rows.get(row).map(|values| Record {
            fields: &self.fields,
            values,
        })
    }

    /// Records in order.
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> + '_ {
        self.rows.iter().map(move |values| Record {
            fields: &self.fields,
            values,
        })
    }
}

/// One row of a [`Dataset`], viewed as an ordered field → value mapping.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    fields: &'a [String],
    values: &'a [Value],
}

impl<'a> Record<'a> {
    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.fields
            .iter()
            .position(|f| f == field)
            .map(|idx| &self.values[idx])
    }

    /// `(field, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        self.fields
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }
}

impl Serialize for Record<'_> {
    /// A JSON object whose keys follow schema order.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

impl Serialize for Dataset {
    /// An array of record objects.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for record in self.records() {
            seq.serialize_element(&record)?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_rows_rejects_ragged_row() {
        let result = Dataset::from_rows(
            fields(&["a", "b"]),
            vec![vec![Value::from("x"), Value::from("y")], vec![Value::from("z")]],
        );
        assert_eq!(
            result.unwrap_err(),
            DatasetError::RowWidth {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = Dataset::new(fields(&["a", "a"]));
        assert_eq!(result.unwrap_err(), DatasetError::DuplicateField("a".into()));
    }

    #[test]
    fn test_from_columns_transposes() {
        let ds = Dataset::from_columns(vec![
            ("name".into(), vec![Value::from("ann"), Value::from("bob")]),
            ("age".into(), vec![Value::from(31i64), Value::Absent]),
        ])
        .unwrap();

        assert_eq!(ds.fields(), &["name".to_string(), "age".to_string()]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(1, "name"), Some(&Value::from("bob")));
        assert_eq!(ds.get(1, "age"), Some(&Value::Absent));
    }

    #[test]
    fn test_from_columns_rejects_uneven_lengths() {
        let result = Dataset::from_columns(vec![
            ("a".into(), vec![Value::from("1")]),
            ("b".into(), vec![]),
        ]);
        assert!(matches!(result, Err(DatasetError::ColumnLength { .. })));
    }

    #[test]
    fn test_record_view_is_ordered() {
        let ds = Dataset::from_rows(
            fields(&["z", "a"]),
            vec![vec![Value::from("last"), Value::from("first")]],
        )
        .unwrap();
        let record = ds.record(0).unwrap();
        let names: Vec<&str> = record.iter().map(|(f, _)| f).collect();
        assert_eq!(names, vec!["z", "a"]);
        assert_eq!(record.get("a"), Some(&Value::from("first")));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Number(32.0).to_string(), "32");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Absent.to_string(), "");
        assert_eq!(Value::from("x").to_string(), "x");
    }

    #[test]
    fn test_value_json_shape() {
        let json = serde_json::to_string(&vec![
            Value::from("a"),
            Value::Number(1.5),
            Value::Absent,
        ])
        .unwrap();
        assert_eq!(json, r#"["a",1.5,null]"#);

        let back: Vec<Value> = serde_json::from_str(r#"["a",1.5,null]"#).unwrap();
        assert_eq!(back, vec![Value::from("a"), Value::Number(1.5), Value::Absent]);
    }

    #[test]
    fn test_dataset_json_keeps_field_order() {
        let ds = Dataset::from_rows(
            fields(&["z", "a"]),
            vec![vec![Value::from("x"), Value::Absent]],
        )
        .unwrap();
        assert_eq!(serde_json::to_string(&ds).unwrap(), r#"[{"z":"x","a":null}]"#);
    }

    #[test]
    fn test_distinct_key_separates_kinds() {
        assert_ne!(
            Value::from("1").distinct_key(),
            Value::Number(1.0).distinct_key()
        );
        assert_eq!(
            Value::Number(0.0).distinct_key(),
            Value::Number(-0.0).distinct_key()
        );
        assert!(Value::Absent.distinct_key().is_none());
    }
}
