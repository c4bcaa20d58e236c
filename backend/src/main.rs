//! Fieldmap CLI - Map tabular files between schemas
//!
//! # Main Commands
//!
//! ```bash
//! fieldmap map input.csv mapping.csv        # Apply a mapping spec
//! fieldmap map input.csv                    # Apply the best matching stored spec
//! fieldmap suggest source.csv target.csv    # Draft a spec from two files
//! fieldmap template list                    # Manage stored specs
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! fieldmap parse input.csv                  # Parse CSV to JSON
//! fieldmap profile input.csv                # Column profiles as JSON
//! fieldmap check input.csv mapping.csv      # Pre-flight check of a spec
//! fieldmap rules                            # Show available transform rules
//! fieldmap example-spec                     # Show an example mapping spec
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use fieldmap::inference::candidates_to_csv;
use fieldmap::output::{render, OutputFormat};
use fieldmap::{
    check_spec, example_spec, map_file, map_with_registry, parse_file, rules_description,
    suggest_files, Config, MapOptions, MappingSpec, RuleEngine, SchemaProfiler, SpecRegistry,
};
use log::LevelFilter;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("fieldmap", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

#[derive(Parser)]
#[command(name = "fieldmap")]
#[command(about = "Map tabular files between schemas with declarative rules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Format of a mapping spec printed by `example-spec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SpecFormat {
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a CSV file and output its records
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (default: from output extension, else JSON)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Profile every column of a CSV file
    Profile {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Sample values kept per column
        #[arg(long)]
        sample_size: Option<usize>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Propose candidate mapping rules from a source file to a target file
    Suggest {
        /// Source CSV file (the data to map)
        source: PathBuf,

        /// Target CSV file (an example of the desired schema)
        target: PathBuf,

        /// CSV delimiter for both files (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Sample values kept per column
        #[arg(long)]
        sample_size: Option<usize>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: CSV review table or full JSON report
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Check a mapping spec against an input file without applying it
    Check {
        /// Input CSV file
        input: PathBuf,

        /// Mapping spec (CSV or JSON)
        mapping: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,
    },

    /// Apply a mapping spec to a CSV file
    Map {
        /// Input CSV file
        input: PathBuf,

        /// Mapping spec (CSV or JSON). Without it, the best compatible
        /// stored spec is used.
        mapping: Option<PathBuf>,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (default: from output extension, else CSV)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Delimiter for CSV output
        #[arg(long, default_value = ",")]
        output_delimiter: char,

        /// Skip the pre-flight check
        #[arg(long)]
        no_check: bool,

        /// Store the spec in the registry under this name after a successful run
        #[arg(long)]
        save_as: Option<String>,
    },

    /// Show available transform rules
    Rules,

    /// Show an example mapping spec
    ExampleSpec {
        #[arg(short, long, value_enum, default_value = "csv")]
        format: SpecFormat,
    },

    /// Manage stored mapping specs
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },
}

#[derive(Subcommand)]
enum TemplateAction {
    /// List all stored specs
    List,

    /// Import a CSV or JSON mapping spec
    Import {
        /// Mapping spec file to import
        file: PathBuf,
        /// Name for the stored spec
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Show details of a stored spec
    Show {
        /// Spec ID
        id: String,
    },

    /// Delete a stored spec
    Delete {
        /// Spec ID
        id: String,
    },

    /// List stored specs compatible with a CSV file's columns
    Match {
        /// Input CSV file
        input: PathBuf,
    },

    /// Use a stored spec to map a CSV file
    Use {
        /// Spec ID
        id: String,
        /// Input CSV file
        input: PathBuf,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format (default: from output extension, else CSV)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },
}

fn main() {
    init_logging();

    let cli = Cli::parse();

    let result = match Config::from_env() {
        Ok(config) => run(cli.command, &config),
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Parse {
            input,
            delimiter,
            output,
            format,
        } => cmd_parse(
            &input,
            delimiter.or(config.delimiter),
            output.as_deref(),
            format,
        ),

        Commands::Profile {
            input,
            delimiter,
            sample_size,
            output,
        } => cmd_profile(
            &input,
            delimiter.or(config.delimiter),
            sample_size.unwrap_or(config.sample_size),
            output.as_deref(),
        ),

        Commands::Suggest {
            source,
            target,
            delimiter,
            sample_size,
            output,
            format,
        } => cmd_suggest(
            &source,
            &target,
            delimiter.or(config.delimiter),
            sample_size.unwrap_or(config.sample_size),
            output.as_deref(),
            format,
        ),

        Commands::Check {
            input,
            mapping,
            delimiter,
        } => cmd_check(&input, &mapping, delimiter.or(config.delimiter)),

        Commands::Map {
            input,
            mapping,
            delimiter,
            output,
            format,
            output_delimiter,
            no_check,
            save_as,
        } => cmd_map(
            &input,
            mapping.as_deref(),
            delimiter.or(config.delimiter),
            output.as_deref(),
            format,
            output_delimiter,
            !no_check,
            save_as.as_deref(),
            config,
        ),

        Commands::Rules => cmd_rules(),

        Commands::ExampleSpec { format } => cmd_example_spec(format),

        Commands::Template { action } => cmd_template(action, config),
    }
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    output: Option<&Path>,
    format: Option<OutputFormat>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = parse_file(input, delimiter)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        fieldmap::parser::format_delimiter(result.delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("✅ Parsed {} records", result.dataset.len());

    let format = resolve_format(format, output, OutputFormat::Json);
    let content = render(&result.dataset, format, result.delimiter)?;
    write_output(&content, output)?;

    Ok(())
}

fn cmd_profile(
    input: &Path,
    delimiter: Option<char>,
    sample_size: usize,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🔍 Profiling: {}", input.display());

    let parsed = parse_file(input, delimiter)?;
    let profile = SchemaProfiler::with_sample_size(sample_size).profile(&parsed.dataset);

    for column in profile.iter() {
        eprintln!(
            "   {} ({}, {} unique, {} absent)",
            column.name, column.data_type, column.unique_value_count, column.absent_count
        );
    }

    let json = serde_json::to_string_pretty(&profile)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_suggest(
    source: &Path,
    target: &Path,
    delimiter: Option<char>,
    sample_size: usize,
    output: Option<&Path>,
    format: Option<OutputFormat>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🔍 Comparing {} -> {}", source.display(), target.display());

    let result = suggest_files(source, target, delimiter, sample_size)?;

    if result.candidates.is_empty() {
        eprintln!("   No similar columns found.");
    } else {
        eprintln!("   {} candidate mapping(s)", result.candidates.len());
    }
    for field in &result.ambiguous_targets {
        eprintln!("   ⚠️  Several candidates for target '{}': keep one", field);
    }
    if result.candidates.iter().any(|c| c.needs_confirmation) {
        eprintln!("   ⚠️  Numeric columns: confirm whether age_category applies");
    }

    let content = match resolve_format(format, output, OutputFormat::Csv) {
        OutputFormat::Csv => candidates_to_csv(&result.candidates)?,
        OutputFormat::Json => serde_json::to_string_pretty(&result)?,
    };
    write_output(&content, output)?;

    Ok(())
}

fn cmd_check(
    input: &Path,
    mapping: &Path,
    delimiter: Option<char>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Checking {} against {}", mapping.display(), input.display());

    let parsed = parse_file(input, delimiter)?;
    let spec = MappingSpec::load(mapping)?;
    let profile = SchemaProfiler::new().profile(&parsed.dataset);
    let report = check_spec(
        &spec,
        parsed.dataset.fields(),
        RuleEngine::new().registry(),
        Some(&profile),
    );

    for issue in report.issues() {
        eprintln!("   {}", issue);
    }

    if !report.is_ok() {
        return Err(format!("{} error(s) in mapping spec", report.errors().count()).into());
    }

    eprintln!(
        "✅ {} rule(s) OK ({} warning(s))",
        spec.len(),
        report.warnings().count()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_map(
    input: &Path,
    mapping: Option<&Path>,
    delimiter: Option<char>,
    output: Option<&Path>,
    format: Option<OutputFormat>,
    output_delimiter: char,
    check: bool,
    save_as: Option<&str>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let options = MapOptions {
        delimiter,
        check,
        ..MapOptions::default()
    };
    let result = match mapping {
        Some(mapping) => map_file(input, mapping, &options)?,
        None => {
            let mut registry = SpecRegistry::with_dir(&config.registry_dir);
            map_with_registry(input, &mut registry, &options)?
        }
    };

    eprintln!("   Encoding: {}", result.csv_info.encoding);
    eprintln!(
        "   Delimiter: '{}'",
        fieldmap::parser::format_delimiter(result.csv_info.delimiter)
    );
    eprintln!("   Rows: {}", result.csv_info.row_count);
    eprintln!("   Columns: {}", result.csv_info.headers.join(", "));
    if let Some(ref id) = result.spec_id {
        eprintln!("   Stored spec: {}", id);
    }
    for warning in &result.warnings {
        eprintln!("   ⚠️  {}", warning);
    }
    eprintln!("\n⚙️  Mapped: {} records", result.output.len());

    if let Some(name) = save_as {
        let mut registry = SpecRegistry::with_dir(&config.registry_dir);
        let id = registry.save(result.spec.clone(), name)?;
        registry.record_use(&id, true)?;
        eprintln!("   💾 Spec saved with ID: {}", id);
    }

    let format = resolve_format(format, output, OutputFormat::Csv);
    let content = render(&result.output, format, output_delimiter)?;
    write_output(&content, output)?;

    Ok(())
}

fn cmd_rules() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", rules_description());
    Ok(())
}

fn cmd_example_spec(format: SpecFormat) -> Result<(), Box<dyn std::error::Error>> {
    let spec = example_spec();
    match format {
        SpecFormat::Csv => print!("{}", spec.to_csv_string()?),
        SpecFormat::Json => println!("{}", spec.to_json()?),
    }
    Ok(())
}

fn resolve_format(
    format: Option<OutputFormat>,
    output: Option<&Path>,
    default: OutputFormat,
) -> OutputFormat {
    format.unwrap_or_else(|| match output {
        Some(path) => OutputFormat::from_path(path),
        None => default,
    })
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            print!("{}", content);
            if !content.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}

fn cmd_template(action: TemplateAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = SpecRegistry::with_dir(&config.registry_dir);

    match action {
        TemplateAction::List => {
            let specs = registry.list();
            if specs.is_empty() {
                eprintln!("📋 No specs stored yet.");
                eprintln!("   Use 'fieldmap template import <file>' to add one.");
                return Ok(());
            }

            eprintln!("📋 Stored specs ({}):\n", specs.len());
            for s in specs {
                println!("  📄 {} ({})", s.name, s.id);
                println!("     Source columns: {}", s.source_columns.join(", "));
                println!("     Target columns: {}", s.target_columns.join(", "));
                println!("     Success rate: {:.0}%", s.success_rate * 100.0);
                println!("     Uses: {}", s.use_count);
                if let Some(ref last) = s.last_used {
                    println!("     Last used: {}", last);
                }
                println!();
            }
        }

        TemplateAction::Import { file, name } => {
            eprintln!("📥 Importing spec from: {}", file.display());
            let id = registry.import(&file, name.as_deref())?;
            eprintln!("✅ Spec saved with ID: {}", id);
        }

        TemplateAction::Show { id } => match registry.get(&id) {
            Some(s) => {
                println!("📄 Spec: {} ({})\n", s.name, s.id);
                println!("Source columns: {}", s.source_columns.join(", "));
                println!("Created: {}", s.created_at);
                println!("Success rate: {:.0}%", s.success_rate * 100.0);
                println!("Uses: {}", s.use_count);
                println!("\nRules:");
                print!("{}", s.spec.to_csv_string()?);
            }
            None => {
                return Err(format!("Spec not found: {}", id).into());
            }
        },

        TemplateAction::Delete { id } => {
            registry.delete(&id)?;
            eprintln!("🗑️  Spec deleted: {}", id);
        }

        TemplateAction::Match { input } => {
            let parsed = parse_file(&input, config.delimiter)?;
            let compatible = registry.find_compatible(&parsed.headers);
            if compatible.is_empty() {
                eprintln!("📋 No stored spec matches: {}", parsed.headers.join(", "));
                return Ok(());
            }

            eprintln!("📋 Compatible specs ({}):\n", compatible.len());
            for (s, score) in compatible {
                println!("  📄 {} ({})", s.name, s.id);
                println!("     Column match: {:.0}%", score * 100.0);
                println!("     Success rate: {:.0}%", s.success_rate * 100.0);
            }
        }

        TemplateAction::Use {
            id,
            input,
            output,
            format,
        } => {
            let stored = registry
                .get(&id)
                .ok_or_else(|| format!("Spec not found: {}", id))?;
            eprintln!("📄 Using spec: {} ({})", stored.name, stored.id);

            let parsed = parse_file(&input, config.delimiter)?;
            eprintln!("   Found {} rows", parsed.dataset.len());

            let outcome = RuleEngine::new().apply(&parsed.dataset, &stored.spec);
            registry.record_use(&id, outcome.is_ok())?;
            let mapped = outcome?;
            eprintln!("   ✅ Mapped: {} records", mapped.len());

            let format = resolve_format(format, output.as_deref(), OutputFormat::Csv);
            let content = render(&mapped, format, ',')?;
            write_output(&content, output.as_deref())?;
        }
    }

    Ok(())
}
