//! Transform advice for a single column
//!
//! Looks at one column profile and proposes transform rules through a fixed
//! precedence table. The first matching row wins:
//!
//! | # | condition | candidates |
//! |---|-----------|------------|
//! | 1 | `has_email` | `extract_domain`, `before_at` |
//! | 2 | `data_type == number` | `direct`, `age_category` (needs confirmation) |
//! | 3 | `all_uppercase` | `direct`, `lowercase` |
//! | 4 | `all_lowercase` | `direct`, `uppercase` |
//! | 5 | otherwise | `direct` |
//!
//! Advice is a heuristic for a human reviewer, never a guarantee.

use serde::{Deserialize, Serialize};

use crate::profile::{ColumnProfile, DataType};
use crate::transform::dsl::TransformKind;

/// Which precedence row produced the advice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdviceBasis {
    Email,
    Numeric,
    Uppercase,
    Lowercase,
    Default,
}

/// Ordered transform candidates for one column, most likely first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advice {
    /// Never empty.
    pub candidates: Vec<TransformKind>,
    pub basis: AdviceBasis,
    /// The advisor cannot see field semantics; a numeric column is only an
    /// age once someone says so.
    pub needs_confirmation: bool,
}

impl Advice {
    fn new(basis: AdviceBasis, candidates: Vec<TransformKind>) -> Self {
        Self {
            candidates,
            basis,
            needs_confirmation: basis == AdviceBasis::Numeric,
        }
    }

    /// The most likely transform.
    pub fn primary(&self) -> TransformKind {
        self.candidates
            .first()
            .copied()
            .unwrap_or(TransformKind::Direct)
    }

    /// Candidates after the primary one.
    pub fn alternatives(&self) -> &[TransformKind] {
        self.candidates.get(1..).unwrap_or(&[])
    }
}

/// Suggest transforms for one column.
pub fn suggest(profile: &ColumnProfile) -> Advice {
    use TransformKind::{AgeCategory, BeforeAt, Direct, ExtractDomain, Lowercase, Uppercase};

    if profile.has_email() {
        Advice::new(AdviceBasis::Email, vec![ExtractDomain, BeforeAt])
    } else if profile.data_type == DataType::Number {
        Advice::new(AdviceBasis::Numeric, vec![Direct, AgeCategory])
    } else if profile.all_uppercase() {
        Advice::new(AdviceBasis::Uppercase, vec![Direct, Lowercase])
    } else if profile.all_lowercase() {
        Advice::new(AdviceBasis::Lowercase, vec![Direct, Uppercase])
    } else {
        Advice::new(AdviceBasis::Default, vec![Direct])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dataset, Value};
    use crate::profile::profile;

    fn column(values: Vec<Value>) -> ColumnProfile {
        let ds = Dataset::from_columns(vec![("c".to_string(), values)]).unwrap();
        profile(&ds).columns.remove(0)
    }

    #[test]
    fn test_email_wins_over_case() {
        let advice = suggest(&column(vec![Value::from("a@b.io"), Value::from("c@d.io")]));
        assert_eq!(advice.basis, AdviceBasis::Email);
        assert_eq!(advice.primary(), TransformKind::ExtractDomain);
        assert_eq!(advice.alternatives(), &[TransformKind::BeforeAt]);
        assert!(!advice.needs_confirmation);
    }

    #[test]
    fn test_numeric_never_assumed_age() {
        let advice = suggest(&column(vec![Value::Number(32.0), Value::Number(51.0)]));
        assert_eq!(advice.basis, AdviceBasis::Numeric);
        assert_eq!(advice.primary(), TransformKind::Direct);
        assert_eq!(advice.alternatives(), &[TransformKind::AgeCategory]);
        assert!(advice.needs_confirmation);
    }

    #[test]
    fn test_uppercase_before_lowercase() {
        // Digits only: unchanged by both case mappings, so the uppercase row fires.
        let advice = suggest(&column(vec![Value::from("123")]));
        assert_eq!(advice.basis, AdviceBasis::Uppercase);
        assert_eq!(advice.candidates, vec![TransformKind::Direct, TransformKind::Lowercase]);
    }

    #[test]
    fn test_lowercase() {
        let advice = suggest(&column(vec![Value::from("paris"), Value::from("lyon")]));
        assert_eq!(advice.basis, AdviceBasis::Lowercase);
        assert_eq!(advice.candidates, vec![TransformKind::Direct, TransformKind::Uppercase]);
    }

    #[test]
    fn test_default() {
        let advice = suggest(&column(vec![Value::from("Paris"), Value::Number(3.0)]));
        assert_eq!(advice.basis, AdviceBasis::Default);
        assert_eq!(advice.candidates, vec![TransformKind::Direct]);
        assert!(advice.alternatives().is_empty());
    }
}
