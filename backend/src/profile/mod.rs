//! Column profiling.
//!
//! Computes a structural summary of every column of a dataset: its data
//! type, how many distinct values it holds, a few sample values and a set of
//! text pattern flags. Profiling never fails.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::models::{Dataset, Value};

/// Number of sample values kept per column by default.
pub const DEFAULT_SAMPLE_SIZE: usize = 5;

/// Data type of a column, judged over its present values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Text,
    Number,
    Mixed,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Text => "text",
            DataType::Number => "number",
            DataType::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

/// Text pattern flags. All false for non-text columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternFlags {
    /// Some value contains `@`.
    pub has_email: bool,
    /// Every value is unchanged by upper-casing.
    pub all_uppercase: bool,
    /// Every value is unchanged by lower-casing.
    pub all_lowercase: bool,
    /// Every value is a non-empty run of digits.
    pub numeric_only: bool,
}

/// Structural summary of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub data_type: DataType,
    pub unique_value_count: usize,
    pub present_count: usize,
    pub absent_count: usize,
    /// First present values in record order.
    pub sample_values: Vec<Value>,
    #[serde(flatten)]
    pub patterns: PatternFlags,
}

impl ColumnProfile {
    pub fn has_email(&self) -> bool {
        self.patterns.has_email
    }

    pub fn all_uppercase(&self) -> bool {
        self.patterns.all_uppercase
    }

    pub fn all_lowercase(&self) -> bool {
        self.patterns.all_lowercase
    }

    pub fn numeric_only(&self) -> bool {
        self.patterns.numeric_only
    }
}

/// Profiles of every column of a dataset, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaProfile {
    pub columns: Vec<ColumnProfile>,
    /// Number of records profiled.
    pub record_count: usize,
}

impl SchemaProfile {
    pub fn get(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnProfile> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Builds [`SchemaProfile`]s.
#[derive(Debug, Clone, Copy)]
pub struct SchemaProfiler {
    sample_size: usize,
}

impl Default for SchemaProfiler {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl SchemaProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `sample_size` sample values per column.
    pub fn with_sample_size(sample_size: usize) -> Self {
        Self { sample_size }
    }

    pub fn profile(&self, dataset: &Dataset) -> SchemaProfile {
        let columns = dataset
            .fields()
            .iter()
            .map(|field| {
                let values: Vec<&Value> = dataset
                    .column(field)
                    .map(|c| c.collect())
                    .unwrap_or_default();
                self.profile_column(field, &values)
            })
            .collect();

        SchemaProfile {
            columns,
            record_count: dataset.len(),
        }
    }

    /// Profile one column given its values in record order.
    pub fn profile_column(&self, name: &str, values: &[&Value]) -> ColumnProfile {
        let present: Vec<&Value> = values.iter().copied().filter(|v| !v.is_absent()).collect();

        let text_count = present.iter().filter(|v| v.as_str().is_some()).count();
        let data_type = if text_count == present.len() {
            DataType::Text
        } else if text_count == 0 {
            DataType::Number
        } else {
            DataType::Mixed
        };

        let unique_value_count = present
            .iter()
            .filter_map(|v| v.distinct_key())
            .collect::<HashSet<_>>()
            .len();

        let patterns = if data_type == DataType::Text {
            text_patterns(present.iter().filter_map(|v| v.as_str()))
        } else {
            PatternFlags::default()
        };

        ColumnProfile {
            name: name.to_string(),
            data_type,
            unique_value_count,
            present_count: present.len(),
            absent_count: values.len() - present.len(),
            sample_values: present
                .iter()
                .take(self.sample_size)
                .map(|v| (*v).clone())
                .collect(),
            patterns,
        }
    }
}

/// Pattern flags over the values of a text column.
///
/// Case flags are vacuously true when there are no values; `numeric_only`
/// needs at least one value.
fn text_patterns<'a>(values: impl Iterator<Item = &'a str>) -> PatternFlags {
    let mut flags = PatternFlags {
        has_email: false,
        all_uppercase: true,
        all_lowercase: true,
        numeric_only: true,
    };
    let mut seen_any = false;

    for value in values {
        seen_any = true;
        flags.has_email |= value.contains('@');
        flags.all_uppercase &= value.to_uppercase() == value;
        flags.all_lowercase &= value.to_lowercase() == value;
        flags.numeric_only &= !value.is_empty() && value.chars().all(|c| c.is_ascii_digit());
    }

    flags.numeric_only &= seen_any;
    flags
}

/// Profile a dataset with the default sample size.
pub fn profile(dataset: &Dataset) -> SchemaProfile {
    SchemaProfiler::new().profile(dataset)
}
