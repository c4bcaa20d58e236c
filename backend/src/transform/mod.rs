//! Transformation module.
//!
//! This module handles source-to-target field mapping:
//! - DSL: Transform rules, mapping specs and the rule engine
//! - Pipeline: File-level entry points (direct and assisted mapping)

pub mod dsl;
pub mod pipeline;

pub use dsl::*;
pub use pipeline::*;
