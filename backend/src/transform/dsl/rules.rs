//! Transform rules for field mapping
//!
//! Every rule is a pure per-value function. The [`TransformRegistry`] maps a
//! rule name to its function and the type of value it accepts; the executor
//! only ever goes through the registry, so adding a rule never touches the
//! engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::models::{Value, ValueKind};

/// The built-in transform vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// Copy the value unchanged
    Direct,

    /// Convert text to uppercase
    Uppercase,

    /// Convert text to lowercase
    Lowercase,

    /// Keep the first three characters
    FirstThreeChars,

    /// Keep what follows the first `@`
    ExtractDomain,

    /// Bucket a number into Young / Middle / Senior
    AgeCategory,

    /// Keep what precedes the first `@`
    BeforeAt,

    /// Keep the first character
    FirstLetter,
}

impl TransformKind {
    /// All built-in kinds, in documentation order.
    pub const ALL: [TransformKind; 8] = [
        TransformKind::Direct,
        TransformKind::Uppercase,
        TransformKind::Lowercase,
        TransformKind::FirstThreeChars,
        TransformKind::ExtractDomain,
        TransformKind::AgeCategory,
        TransformKind::BeforeAt,
        TransformKind::FirstLetter,
    ];

    /// Rule name as written in a mapping table.
    pub fn name(&self) -> &'static str {
        match self {
            TransformKind::Direct => "direct",
            TransformKind::Uppercase => "uppercase",
            TransformKind::Lowercase => "lowercase",
            TransformKind::FirstThreeChars => "first_three_chars",
            TransformKind::ExtractDomain => "extract_domain",
            TransformKind::AgeCategory => "age_category",
            TransformKind::BeforeAt => "before_at",
            TransformKind::FirstLetter => "first_letter",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TransformKind::Direct => "Copy the value unchanged",
            TransformKind::Uppercase => "Convert text to uppercase",
            TransformKind::Lowercase => "Convert text to lowercase",
            TransformKind::FirstThreeChars => "First 3 characters (shorter text kept whole)",
            TransformKind::ExtractDomain => "Text after the first '@' (empty if none)",
            TransformKind::AgeCategory => "Young (< 30), Middle (30-44), Senior (>= 45)",
            TransformKind::BeforeAt => "Text before the first '@' (whole text if none)",
            TransformKind::FirstLetter => "First character (empty text stays empty)",
        }
    }

    /// The function implementing this kind.
    pub fn function(&self) -> TransformFn {
        match self {
            TransformKind::Direct => TransformFn::Any(direct),
            TransformKind::Uppercase => TransformFn::Text(|s| Value::Text(uppercase(s))),
            TransformKind::Lowercase => TransformFn::Text(|s| Value::Text(lowercase(s))),
            TransformKind::FirstThreeChars => {
                TransformFn::Text(|s| Value::Text(first_three_chars(s).to_string()))
            }
            TransformKind::ExtractDomain => {
                TransformFn::Text(|s| Value::Text(extract_domain(s).to_string()))
            }
            TransformKind::AgeCategory => {
                TransformFn::Number(|n| Value::Text(age_category(n).to_string()))
            }
            TransformKind::BeforeAt => TransformFn::Text(|s| Value::Text(before_at(s).to_string())),
            TransformKind::FirstLetter => {
                TransformFn::Text(|s| Value::Text(first_letter(s).to_string()))
            }
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown rule name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTransform(pub String);

impl fmt::Display for UnknownTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown transform rule '{}'", self.0)
    }
}

impl std::error::Error for UnknownTransform {}

impl FromStr for TransformKind {
    type Err = UnknownTransform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransformKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| UnknownTransform(s.to_string()))
    }
}

// =============================================================================
// Value functions
// =============================================================================

pub fn direct(value: &Value) -> Value {
    value.clone()
}

pub fn uppercase(input: &str) -> String {
    input.to_uppercase()
}

pub fn lowercase(input: &str) -> String {
    input.to_lowercase()
}

/// First three characters, counted as Unicode scalar values.
pub fn first_three_chars(input: &str) -> &str {
    match input.char_indices().nth(3) {
        Some((end, _)) => &input[..end],
        None => input,
    }
}

pub fn first_letter(input: &str) -> &str {
    match input.chars().next() {
        Some(c) => &input[..c.len_utf8()],
        None => "",
    }
}

/// Everything after the first `@`, or empty text when there is none.
pub fn extract_domain(input: &str) -> &str {
    input.split_once('@').map(|(_, domain)| domain).unwrap_or("")
}

/// Everything before the first `@`, or the whole text when there is none.
pub fn before_at(input: &str) -> &str {
    input.split_once('@').map(|(local, _)| local).unwrap_or(input)
}

pub fn age_category(age: f64) -> &'static str {
    if age < 30.0 {
        "Young"
    } else if age < 45.0 {
        "Middle"
    } else {
        "Senior"
    }
}

// =============================================================================
// Registry
// =============================================================================

/// A pure value transform, typed by the value kind it accepts.
///
/// Absent values never reach these functions.
#[derive(Clone, Copy)]
pub enum TransformFn {
    /// Accepts text and numbers.
    Any(fn(&Value) -> Value),
    /// Accepts text only.
    Text(fn(&str) -> Value),
    /// Accepts numbers only.
    Number(fn(f64) -> Value),
}

impl TransformFn {
    /// Kind of value this function requires, if it is restricted to one.
    pub fn accepts(&self) -> Option<ValueKind> {
        match self {
            TransformFn::Any(_) => None,
            TransformFn::Text(_) => Some(ValueKind::Text),
            TransformFn::Number(_) => Some(ValueKind::Number),
        }
    }

    /// Apply to one value.
    ///
    /// Absent propagates unchanged. A value of the wrong kind is returned as
    /// `Err(expected_kind)`; number-only functions also reject NaN and
    /// infinities with `Err(ValueKind::Number)`.
    pub fn call(&self, value: &Value) -> Result<Value, ValueKind> {
        match (self, value) {
            (_, Value::Absent) => Ok(Value::Absent),
            (TransformFn::Any(f), v) => Ok(f(v)),
            (TransformFn::Text(f), Value::Text(s)) => Ok(f(s)),
            (TransformFn::Number(f), Value::Number(n)) if n.is_finite() => Ok(f(*n)),
            (TransformFn::Text(_), _) => Err(ValueKind::Text),
            (TransformFn::Number(_), _) => Err(ValueKind::Number),
        }
    }
}

impl fmt::Debug for TransformFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.accepts() {
            None => f.write_str("TransformFn(any)"),
            Some(kind) => write!(f, "TransformFn({})", kind),
        }
    }
}

/// A named transform held by the registry.
#[derive(Debug, Clone)]
pub struct Transform {
    pub name: String,
    pub description: String,
    pub func: TransformFn,
}

/// Maps rule names to transforms.
#[derive(Debug, Clone)]
pub struct TransformRegistry {
    transforms: HashMap<String, Transform>,
}

impl TransformRegistry {
    /// A registry with no transforms.
    pub fn empty() -> Self {
        Self {
            transforms: HashMap::new(),
        }
    }

    /// A registry holding every [`TransformKind`].
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for kind in TransformKind::ALL {
            registry.register(kind.name(), kind.description(), kind.function());
        }
        registry
    }

    /// Register (or replace) a transform under `name`.
    pub fn register(&mut self, name: &str, description: &str, func: TransformFn) {
        self.transforms.insert(
            name.to_string(),
            Transform {
                name: name.to_string(),
                description: description.to_string(),
                func,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Transform> {
        self.transforms.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Registered transforms sorted by name.
    pub fn list(&self) -> Vec<&Transform> {
        let mut all: Vec<&Transform> = self.transforms.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Get a description of all built-in transform rules
pub fn rules_description() -> String {
    let mut out = String::from(
        "Available transform rules:\n\n| Rule | Accepts | Description |\n|------|---------|-------------|\n",
    );
    for kind in TransformKind::ALL {
        let accepts = match kind.function().accepts() {
            Some(k) => k.to_string(),
            None => "any".to_string(),
        };
        out.push_str(&format!("| {} | {} | {} |\n", kind, accepts, kind.description()));
    }
    out.push_str("\nAbsent (empty) cells stay absent under every rule.\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_three_chars() {
        assert_eq!(first_three_chars("ab"), "ab");
        assert_eq!(first_three_chars("abcdef"), "abc");
        assert_eq!(first_three_chars("abc"), "abc");
        assert_eq!(first_three_chars("ééééé"), "ééé");
    }

    #[test]
    fn test_first_letter() {
        assert_eq!(first_letter("john"), "j");
        assert_eq!(first_letter(""), "");
        assert_eq!(first_letter("Élise"), "É");
    }

    #[test]
    fn test_email_splitting_uses_first_at() {
        assert_eq!(extract_domain("user@example.com"), "example.com");
        assert_eq!(extract_domain("noatsign"), "");
        assert_eq!(extract_domain("a@b@c"), "b@c");
        assert_eq!(before_at("user@example.com"), "user");
        assert_eq!(before_at("noatsign"), "noatsign");
        assert_eq!(before_at("a@b@c"), "a");
    }

    #[test]
    fn test_age_category_boundaries() {
        assert_eq!(age_category(29.0), "Young");
        assert_eq!(age_category(29.9), "Young");
        assert_eq!(age_category(30.0), "Middle");
        assert_eq!(age_category(44.0), "Middle");
        assert_eq!(age_category(45.0), "Senior");
    }

    #[test]
    fn test_case_transforms_idempotent() {
        let once = uppercase("MiXed");
        assert_eq!(uppercase(&once), once);
        let once = lowercase("MiXed");
        assert_eq!(lowercase(&once), once);
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("extract_domain".parse::<TransformKind>(), Ok(TransformKind::ExtractDomain));
        assert_eq!(
            "titlecase".parse::<TransformKind>(),
            Err(UnknownTransform("titlecase".into()))
        );
        for kind in TransformKind::ALL {
            assert_eq!(kind.name().parse::<TransformKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_kind_serde_names() {
        let json = serde_json::to_string(&TransformKind::FirstThreeChars).unwrap();
        assert_eq!(json, "\"first_three_chars\"");
    }

    #[test]
    fn test_call_checks_value_kind() {
        let upper = TransformKind::Uppercase.function();
        assert_eq!(upper.call(&Value::from("a")), Ok(Value::from("A")));
        assert_eq!(upper.call(&Value::Number(1.0)), Err(ValueKind::Text));
        assert_eq!(upper.call(&Value::Absent), Ok(Value::Absent));

        let age = TransformKind::AgeCategory.function();
        assert_eq!(age.call(&Value::Number(32.0)), Ok(Value::from("Middle")));
        assert_eq!(age.call(&Value::from("32")), Err(ValueKind::Number));
        assert_eq!(age.call(&Value::Absent), Ok(Value::Absent));
        assert_eq!(age.call(&Value::Number(f64::NAN)), Err(ValueKind::Number));
        assert_eq!(age.call(&Value::Number(f64::INFINITY)), Err(ValueKind::Number));

        let direct = TransformKind::Direct.function();
        assert_eq!(direct.call(&Value::Number(3.0)), Ok(Value::Number(3.0)));
    }

    #[test]
    fn test_absent_propagates_for_every_kind() {
        for kind in TransformKind::ALL {
            assert_eq!(kind.function().call(&Value::Absent), Ok(Value::Absent), "{kind}");
        }
    }

    #[test]
    fn test_registry_extension() {
        let mut registry = TransformRegistry::builtin();
        assert!(!registry.contains("trim"));
        registry.register("trim", "Trim whitespace", TransformFn::Text(|s| Value::text(s.trim())));
        let trim = registry.get("trim").unwrap();
        assert_eq!(trim.func.call(&Value::from("  x ")), Ok(Value::from("x")));
        assert_eq!(registry.list().len(), TransformKind::ALL.len() + 1);
    }

    #[test]
    fn test_rules_description_lists_all() {
        let text = rules_description();
        for kind in TransformKind::ALL {
            assert!(text.contains(kind.name()));
        }
    }
}
