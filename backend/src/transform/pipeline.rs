//! High-level pipeline API.
//!
//! Combines parsing, spec loading (from a file or the spec registry), the
//! pre-flight check and the rule engine into single calls, plus the profiling
//! and inference steps used to draft a spec for a new pair of files.
//!
//! # Example
//!
//! ```rust,ignore
//! use fieldmap::{map_file, MapOptions};
//! use std::path::Path;
//!
//! let result = map_file(
//!     Path::new("customers.csv"),
//!     Path::new("mapping.csv"),
//!     &MapOptions::default(),
//! )?;
//!
//! println!("Mapped {} records", result.output.len());
//! ```

use log::{info, warn};
use serde::Serialize;
use std::path::Path;

use crate::cache::SpecRegistry;
use crate::error::{PipelineError, PipelineResult};
use crate::inference::{ambiguous_sources, ambiguous_targets, infer, CandidateMapping};
use crate::models::Dataset;
use crate::parser::{format_delimiter, parse_file, ParseResult};
use crate::profile::{SchemaProfile, SchemaProfiler};
use crate::transform::dsl::{MappingSpec, RuleEngine};
use crate::validation::check_spec;

/// Options for [`map_file`]
#[derive(Debug, Clone)]
pub struct MapOptions {
    /// Force the input delimiter instead of detecting it
    pub delimiter: Option<char>,
    /// Run the pre-flight check before applying
    pub check: bool,
    /// Engine to apply the spec with
    pub engine: RuleEngine,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            check: true,
            engine: RuleEngine::new(),
        }
    }
}

/// Input file information
#[derive(Debug, Clone, Serialize)]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

impl CsvInfo {
    fn from_parse(parsed: &ParseResult) -> Self {
        Self {
            encoding: parsed.encoding.clone(),
            delimiter: parsed.delimiter,
            headers: parsed.headers.clone(),
            row_count: parsed.dataset.len(),
        }
    }
}

/// Result of [`map_file`]
#[derive(Debug, Clone)]
pub struct MapResult {
    /// The mapped dataset
    pub output: Dataset,
    /// The spec that was applied
    pub spec: MappingSpec,
    /// Registry ID of the spec, when it came from the registry
    pub spec_id: Option<String>,
    pub csv_info: CsvInfo,
    /// Non-fatal findings (overridden targets, mixed-type columns)
    pub warnings: Vec<String>,
}

/// Result of [`suggest_files`]
#[derive(Debug, Clone, Serialize)]
pub struct SuggestResult {
    pub source: SchemaProfile,
    pub target: SchemaProfile,
    pub candidates: Vec<CandidateMapping>,
    /// Target fields with more than one candidate source
    pub ambiguous_targets: Vec<String>,
    /// Source fields proposed for more than one target
    pub ambiguous_sources: Vec<String>,
}

/// Map an input file with a mapping file.
pub fn map_file(input: &Path, mapping: &Path, options: &MapOptions) -> PipelineResult<MapResult> {
    let parsed = read_input(input, options)?;

    let spec = MappingSpec::load(mapping)?;
    info!("Loaded {} rule(s) from {}", spec.len(), mapping.display());

    map_parsed(parsed, spec, options)
}

/// Map an input file with the best compatible spec from a registry.
///
/// The stored spec whose source columns best cover the input headers (see
/// [`SpecRegistry::find_compatible`]) is applied, and the outcome is recorded
/// in the registry's usage statistics.
pub fn map_with_registry(
    input: &Path,
    registry: &mut SpecRegistry,
    options: &MapOptions,
) -> PipelineResult<MapResult> {
    let parsed = read_input(input, options)?;

    let (id, spec) = match registry.find_compatible(&parsed.headers).first() {
        Some((stored, score)) => {
            info!(
                "Using stored spec '{}' ({}), {:.0}% column match",
                stored.name,
                stored.id,
                score * 100.0
            );
            (stored.id.clone(), stored.spec.clone())
        }
        None => return Err(PipelineError::NoCompatibleSpec(parsed.headers)),
    };

    let result = map_parsed(parsed, spec, options);
    if let Err(e) = registry.record_use(&id, result.is_ok()) {
        warn!("Could not record use of spec {}: {}", id, e);
    }

    let mut result = result?;
    result.spec_id = Some(id);
    Ok(result)
}

/// Parse the input file and reject an input without records.
fn read_input(input: &Path, options: &MapOptions) -> PipelineResult<ParseResult> {
    info!("Reading {}", input.display());
    let parsed = parse_file(input, options.delimiter)?;
    info!(
        "Detected encoding {}, separator '{}', {} row(s)",
        parsed.encoding,
        format_delimiter(parsed.delimiter),
        parsed.dataset.len()
    );
    if parsed.dataset.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(parsed)
}

/// Check (optionally) and apply a spec to parsed input.
fn map_parsed(parsed: ParseResult, spec: MappingSpec, options: &MapOptions) -> PipelineResult<MapResult> {
    let csv_info = CsvInfo::from_parse(&parsed);
    let dataset = parsed.dataset;

    let mut warnings = Vec::new();
    if options.check {
        let profile = SchemaProfiler::new().profile(&dataset);
        let report = check_spec(
            &spec,
            dataset.fields(),
            options.engine.registry(),
            Some(&profile),
        );
        if !report.is_ok() {
            return Err(PipelineError::Check(report.error_messages()));
        }
        for issue in report.warnings() {
            warn!("{}", issue);
            warnings.push(issue.to_string());
        }
    } else {
        warnings.extend(spec.duplicate_targets().iter().map(|d| {
            format!(
                "rule {} overrides rule {} for target '{}'",
                d.winner, d.overridden, d.target_field
            )
        }));
    }

    let output = options.engine.apply(&dataset, &spec)?;
    info!(
        "Mapped {} record(s) into {} column(s)",
        output.len(),
        output.fields().len()
    );

    Ok(MapResult {
        output,
        spec,
        spec_id: None,
        csv_info,
        warnings,
    })
}

/// Apply a spec to an in-memory dataset with the built-in transforms.
pub fn map_dataset(dataset: &Dataset, spec: &MappingSpec) -> PipelineResult<Dataset> {
    Ok(RuleEngine::new().apply(dataset, spec)?)
}

/// Profile two files and propose candidate mappings from source to target.
pub fn suggest_files(
    source: &Path,
    target: &Path,
    delimiter: Option<char>,
    sample_size: usize,
) -> PipelineResult<SuggestResult> {
    let profiler = SchemaProfiler::with_sample_size(sample_size);

    let source_profile = profiler.profile(&parse_file(source, delimiter)?.dataset);
    let target_profile = profiler.profile(&parse_file(target, delimiter)?.dataset);
    info!(
        "Profiled {} source and {} target column(s)",
        source_profile.len(),
        target_profile.len()
    );

    Ok(suggest_profiles(source_profile, target_profile))
}

/// Propose candidate mappings between two profiles.
pub fn suggest_profiles(source: SchemaProfile, target: SchemaProfile) -> SuggestResult {
    let candidates = infer(&source, &target);
    let ambiguous_targets = ambiguous_targets(&candidates);
    let ambiguous_sources = ambiguous_sources(&candidates);

    info!("Found {} candidate mapping(s)", candidates.len());
    if !ambiguous_targets.is_empty() {
        warn!(
            "Several candidates for target field(s): {}",
            ambiguous_targets.join(", ")
        );
    }

    SuggestResult {
        source,
        target,
        candidates,
        ambiguous_targets,
        ambiguous_sources,
    }
}
