//! # Fieldmap - rule-based field mapping between tabular schemas
//!
//! Fieldmap rewrites records from one tabular schema into another through an
//! ordered table of mapping rules, and helps draft that table by profiling
//! both schemas and proposing candidate rules.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Input CSV  │────▶│   Parser    │────▶│ Rule engine │────▶│ Output CSV/ │
//! │  (any enc)  │     │  (auto-enc) │     │ (spec+regs) │     │    JSON     │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                            │                    ▲
//!                            ▼                    │ reviewed spec
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │  Profiler   │────▶│ Inferencer  │
//!                     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fieldmap::{apply, example_spec, parse_file_auto};
//!
//! let input = parse_file_auto("customers.csv")?.dataset;
//! let output = apply(&input, &example_spec())?;
//! println!("{}", fieldmap::output::to_csv_string(&output, ',')?);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Values, datasets and records
//! - [`parser`] - CSV parsing with auto-detection
//! - [`output`] - CSV and JSON writers
//! - [`transform`] - Rule engine, mapping specs and pipeline
//! - [`profile`] - Column profiling
//! - [`inference`] - Transform advice and candidate mappings
//! - [`validation`] - Spec schema validation and pre-flight checks
//! - [`cache`] - Stored spec registry
//! - [`config`] - Environment configuration

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing and output
pub mod output;
pub mod parser;

// Transformation
pub mod transform;

// Profiling and inference
pub mod inference;
pub mod profile;

// Validation
pub mod validation;

// Spec registry
pub mod cache;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    CsvError,
    DatasetError,
    MappingError,
    PipelineError,
    RegistryError,
    SpecError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Dataset, Record, Value, ValueKind};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content,
    detect_delimiter,
    detect_encoding,
    parse_bytes,
    parse_bytes_auto,
    parse_file,
    parse_file_auto,
    parse_str,
    ParseResult,
};

pub use output::OutputFormat;

// =============================================================================
// Re-exports - Rule engine
// =============================================================================

pub use transform::dsl::{
    apply,
    example_spec,
    rules_description,
    MappingRule,
    MappingSpec,
    RuleEngine,
    Transform,
    TransformFn,
    TransformKind,
    TransformRegistry,
};

// =============================================================================
// Re-exports - Profiling and inference
// =============================================================================

pub use profile::{profile, ColumnProfile, DataType, SchemaProfile, SchemaProfiler};

pub use inference::{
    candidates_to_spec,
    infer,
    suggest,
    Advice,
    CandidateMapping,
    MatchCriterion,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{check_spec, validate_spec_json, SpecIssue, SpecReport};

// =============================================================================
// Re-exports - Registry (Cache)
// =============================================================================

pub use cache::{SpecRegistry, StoredSpec};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use config::Config;

pub use transform::pipeline::{
    map_dataset,
    map_file,
    map_with_registry,
    suggest_files,
    CsvInfo,
    MapOptions,
    MapResult,
    SuggestResult,
};
