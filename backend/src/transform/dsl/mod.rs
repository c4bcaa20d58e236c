//! Mapping DSL: the rule vocabulary and the engine that runs it
//!
//! This module provides:
//! - `rules`: Built-in transform kinds and the transform registry
//! - `spec`: Mapping rules and specs (the three-column mapping table)
//! - `executor`: The rule engine that applies a spec to a dataset
//!
//! ## Usage Flow
//!
//! ```text
//! Dataset + MappingSpec → RuleEngine::apply → output Dataset
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use fieldmap::{apply, parse_str, MappingSpec};
//!
//! // 1. Read the input dataset
//! let input = parse_str("Name;Email;Age\njohn;john@co.com;32", ';')?.dataset;
//!
//! // 2. Describe the mapping
//! let spec = MappingSpec::new()
//!     .with_rule("Name", "FullName", "uppercase")
//!     .with_rule("Email", "Domain", "extract_domain")
//!     .with_rule("Age", "AgeGroup", "age_category");
//!
//! // 3. Apply it
//! let output = apply(&input, &spec)?;
//! assert_eq!(output.get(0, "AgeGroup").unwrap().to_string(), "Middle");
//! ```

pub mod executor;
pub mod rules;
pub mod spec;

// Re-exports for convenience
pub use executor::{apply, RuleEngine};
pub use rules::{rules_description, Transform, TransformFn, TransformKind, TransformRegistry, UnknownTransform};
pub use spec::{example_spec, DuplicateTarget, MappingRule, MappingSpec, SPEC_COLUMNS};
