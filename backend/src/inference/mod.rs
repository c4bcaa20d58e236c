//! Mapping inference
//!
//! Proposes candidate mapping rules by comparing the column profiles of a
//! source and a target dataset.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fieldmap::{infer, profile, parse_file_auto};
//!
//! let source = profile(&parse_file_auto("customers.csv")?.dataset);
//! let target = profile(&parse_file_auto("employees.csv")?.dataset);
//!
//! for candidate in infer(&source, &target) {
//!     println!("{} -> {} ({})", candidate.source_field, candidate.target_field, candidate.criterion);
//! }
//! ```
//!
//! Matching is deliberately permissive and many-to-many: every similar pair
//! is returned, and a target may receive several candidate sources. Picking
//! one is left to the reviewer; [`ambiguous_targets`] and
//! [`ambiguous_sources`] point at the columns that need a decision.

pub mod advisor;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::profile::{ColumnProfile, SchemaProfile};
use crate::transform::dsl::{MappingRule, MappingSpec, TransformKind};

pub use advisor::{suggest, Advice, AdviceBasis};

/// Why two columns were considered similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCriterion {
    /// Same data type
    DataType,
    /// Both hold email-like text
    HasEmail,
    /// Both hold digit-only text
    NumericOnly,
}

impl MatchCriterion {
    pub fn name(&self) -> &'static str {
        match self {
            MatchCriterion::DataType => "data_type",
            MatchCriterion::HasEmail => "has_email",
            MatchCriterion::NumericOnly => "numeric_only",
        }
    }
}

impl fmt::Display for MatchCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A machine-suggested rule awaiting review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateMapping {
    pub source_field: String,
    pub target_field: String,
    /// Primary transform suggested for the source column
    pub transform_rule: TransformKind,
    /// Always true; distinguishes candidates from authored rules
    pub inferred: bool,
    /// First criterion that matched, checked in declaration order
    pub criterion: MatchCriterion,
    /// Every criterion that matched
    pub criteria: Vec<MatchCriterion>,
    /// Other plausible transforms, most likely first
    pub alternatives: Vec<TransformKind>,
    /// The suggested transform must be confirmed by someone who knows the field
    pub needs_confirmation: bool,
}

impl CandidateMapping {
    /// The rule this candidate proposes.
    pub fn to_rule(&self) -> MappingRule {
        MappingRule::with_kind(&self.source_field, &self.target_field, self.transform_rule)
    }
}

/// Criteria under which two column profiles are similar, in check order.
pub fn match_criteria(source: &ColumnProfile, target: &ColumnProfile) -> Vec<MatchCriterion> {
    let mut criteria = Vec::new();
    if source.data_type == target.data_type {
        criteria.push(MatchCriterion::DataType);
    }
    if source.has_email() && target.has_email() {
        criteria.push(MatchCriterion::HasEmail);
    }
    if source.numeric_only() && target.numeric_only() {
        criteria.push(MatchCriterion::NumericOnly);
    }
    criteria
}

/// Pair every similar (source, target) column.
///
/// Output is ordered by target schema order, then source schema order.
/// An empty result is valid.
pub fn infer(source: &SchemaProfile, target: &SchemaProfile) -> Vec<CandidateMapping> {
    let advice: Vec<Advice> = source.iter().map(suggest).collect();

    let mut candidates = Vec::new();
    for target_col in target.iter() {
        for (source_col, advice) in source.iter().zip(&advice) {
            let criteria = match_criteria(source_col, target_col);
            let Some(&criterion) = criteria.first() else {
                continue;
            };
            candidates.push(CandidateMapping {
                source_field: source_col.name.clone(),
                target_field: target_col.name.clone(),
                transform_rule: advice.primary(),
                inferred: true,
                criterion,
                criteria,
                alternatives: advice.alternatives().to_vec(),
                needs_confirmation: advice.needs_confirmation,
            });
        }
    }

    log::debug!(
        "Inferred {} candidate(s) from {} source and {} target column(s)",
        candidates.len(),
        source.len(),
        target.len()
    );
    candidates
}

/// Target fields that received more than one candidate, in output order.
pub fn ambiguous_targets(candidates: &[CandidateMapping]) -> Vec<String> {
    repeated(candidates.iter().map(|c| c.target_field.as_str()))
}

/// Source fields proposed for more than one target, in first-seen order.
pub fn ambiguous_sources(candidates: &[CandidateMapping]) -> Vec<String> {
    repeated(candidates.iter().map(|c| c.source_field.as_str()))
}

fn repeated<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<(&str, usize)> = Vec::new();
    for name in names {
        match seen.iter_mut().find(|(n, _)| *n == name) {
            Some((_, count)) => *count += 1,
            None => seen.push((name, 1)),
        }
    }
    seen.into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Turn candidates into a reviewable spec, keeping every candidate in order.
///
/// With several candidates for one target, the spec's last-write-wins rule
/// means the last one would take effect; the reviewer is expected to delete
/// the rows they do not want.
pub fn candidates_to_spec(candidates: &[CandidateMapping]) -> MappingSpec {
    MappingSpec::from_rules(candidates.iter().map(CandidateMapping::to_rule).collect())
}

/// Serialize candidates as a review table (CSV with a header row).
///
/// The first three columns form a valid mapping table, so a reviewed file
/// can be loaded directly as a spec.
pub fn candidates_to_csv(candidates: &[CandidateMapping]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "source_field",
        "target_field",
        "transform_rule",
        "criterion",
        "inferred",
        "alternatives",
        "needs_confirmation",
    ])?;
    for c in candidates {
        let alternatives: Vec<&str> = c.alternatives.iter().map(|k| k.name()).collect();
        let alternatives = alternatives.join(" ");
        writer.write_record([
            c.source_field.as_str(),
            c.target_field.as_str(),
            c.transform_rule.name(),
            c.criterion.name(),
            if c.inferred { "true" } else { "false" },
            alternatives.as_str(),
            if c.needs_confirmation { "true" } else { "false" },
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dataset, Value};
    use crate::profile::profile;

    fn schema(columns: Vec<(&str, Vec<Value>)>) -> SchemaProfile {
        let ds = Dataset::from_columns(
            columns
                .into_iter()
                .map(|(name, values)| (name.to_string(), values))
                .collect(),
        )
        .unwrap();
        profile(&ds)
    }

    #[test]
    fn test_single_numeric_pair() {
        let source = schema(vec![("uid", vec![Value::Number(1.0), Value::Number(2.0)])]);
        let target = schema(vec![("id", vec![Value::Number(10.0)])]);

        let candidates = infer(&source, &target);
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.source_field, "uid");
        assert_eq!(c.target_field, "id");
        assert_eq!(c.criterion, MatchCriterion::DataType);
        assert!(c.inferred);
        assert_eq!(c.transform_rule, TransformKind::Direct);
        assert_eq!(c.alternatives, vec![TransformKind::AgeCategory]);
        assert!(c.needs_confirmation);
    }

    #[test]
    fn test_many_to_many_and_ordering() {
        let source = schema(vec![
            ("first", vec![Value::from("Ann")]),
            ("age", vec![Value::Number(30.0)]),
            ("last", vec![Value::from("Lee")]),
        ]);
        let target = schema(vec![
            ("FULL_NAME", vec![Value::from("ANN LEE")]),
            ("Years", vec![Value::Number(30.0)]),
        ]);

        let pairs: Vec<(String, String)> = infer(&source, &target)
            .into_iter()
            .map(|c| (c.source_field, c.target_field))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("first".into(), "FULL_NAME".into()),
                ("last".into(), "FULL_NAME".into()),
                ("age".into(), "Years".into()),
            ]
        );
    }

    #[test]
    fn test_email_and_numeric_only_criteria() {
        let source = schema(vec![
            ("mail", vec![Value::from("a@b.io"), Value::Absent]),
            ("zip", vec![Value::from("00123"), Value::Absent]),
            ("n", vec![Value::Number(1.0), Value::from("x")]),
        ]);
        let target = schema(vec![
            ("contact", vec![Value::from("c@d.io"), Value::Number(5.0)]),
            ("postcode", vec![Value::from("75001"), Value::Absent]),
        ]);

        let candidates = infer(&source, &target);

        // mixed `contact` has no flags, so only the mixed source matches it
        let contact: Vec<&CandidateMapping> =
            candidates.iter().filter(|c| c.target_field == "contact").collect();
        assert_eq!(contact.len(), 1);
        assert_eq!(contact[0].source_field, "n");
        assert_eq!(contact[0].criterion, MatchCriterion::DataType);

        let zip = candidates
            .iter()
            .find(|c| c.source_field == "zip" && c.target_field == "postcode")
            .unwrap();
        assert_eq!(
            zip.criteria,
            vec![MatchCriterion::DataType, MatchCriterion::NumericOnly]
        );

        let mail = candidates
            .iter()
            .find(|c| c.source_field == "mail" && c.target_field == "postcode")
            .unwrap();
        assert_eq!(mail.criteria, vec![MatchCriterion::DataType]);
        assert_eq!(mail.transform_rule, TransformKind::ExtractDomain);
    }

    #[test]
    fn test_email_criterion_across_types() {
        let source = schema(vec![("mail", vec![Value::from("a@b.io")])]);
        let target = schema(vec![("mixed_mail", vec![Value::from("x@y.io"), Value::Number(1.0)])]);
        // The mixed target carries no flags, so nothing matches.
        assert!(infer(&source, &target).is_empty());

        let criteria = match_criteria(
            source.get("mail").unwrap(),
            schema(vec![("m", vec![Value::from("q@r.io")])]).get("m").unwrap(),
        );
        assert_eq!(criteria, vec![MatchCriterion::DataType, MatchCriterion::HasEmail]);
    }

    #[test]
    fn test_no_similar_columns() {
        let source = schema(vec![("n", vec![Value::Number(1.0)])]);
        let target = schema(vec![("t", vec![Value::from("x")])]);
        assert!(infer(&source, &target).is_empty());
    }

    #[test]
    fn test_ambiguity_is_surfaced() {
        let source = schema(vec![
            ("a", vec![Value::from("x")]),
            ("b", vec![Value::from("y")]),
        ]);
        let target = schema(vec![
            ("t1", vec![Value::from("z")]),
            ("t2", vec![Value::from("w")]),
        ]);
        let candidates = infer(&source, &target);
        assert_eq!(candidates.len(), 4);
        assert_eq!(ambiguous_targets(&candidates), vec!["t1", "t2"]);
        assert_eq!(ambiguous_sources(&candidates), vec!["a", "b"]);
    }

    #[test]
    fn test_candidates_to_spec_and_csv() {
        let source = schema(vec![("uid", vec![Value::Number(1.0)])]);
        let target = schema(vec![("id", vec![Value::Number(2.0)])]);
        let candidates = infer(&source, &target);

        let spec = candidates_to_spec(&candidates);
        assert_eq!(spec.rules(), &[MappingRule::new("uid", "id", "direct")]);

        let csv = candidates_to_csv(&candidates).unwrap();
        assert!(csv.contains("uid,id,direct,data_type,true,age_category,true"));
        assert_eq!(MappingSpec::from_csv_str(&csv, ',').unwrap(), spec);
    }
}
