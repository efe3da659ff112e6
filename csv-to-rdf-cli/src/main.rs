use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use csv_to_rdf::{
    CsvRecordSource, MappingSpec, OutputFormat, ProcessingOutcome, Processor, RecordSource,
    SpreadsheetRecordSource,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::{fs, io::Write};
use templates::{Template, BASIC_MAPPING, FULL_MAPPING};
use tracing::{info, warn, Level};

mod templates;

/// CSV to RDF Processor
/// Converts bibliographic CSV exports to RDF based on a mapping file
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output for detailed processing information
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a CSV or spreadsheet export to RDF
    Process {
        /// Input file (.csv, or .xlsx/.xls/.ods)
        #[arg(short, long, value_name = "PATH TO INPUT")]
        input: PathBuf,

        /// Path to the mapping file
        #[arg(short, long, value_name = "PATH TO MAPPING")]
        mapping: PathBuf,

        /// Output file; defaults to the input path with the format's extension
        #[arg(short, long, value_name = "OUTPUT PATH")]
        output: Option<PathBuf>,

        /// Output format, overriding the mapping (turtle, nt, xml, json-ld)
        #[arg(short, long)]
        format: Option<String>,

        /// Write the serialized graph to stdout instead of a file
        #[arg(long)]
        stdout: bool,

        /// Enable strict mode for more rigorous validation
        #[arg(short, long)]
        strict: bool,

        /// Worksheet to read from a spreadsheet input (first sheet by default)
        #[arg(long)]
        sheet: Option<String>,

        /// Project records on a single thread
        #[arg(long)]
        sequential: bool,
    },
    /// Validate a mapping file, optionally against an input's header row
    Validate {
        /// Path to the mapping file to validate
        #[arg(
            short,
            long,
            default_value = "mapping.jsonc",
            value_name = "PATH TO MAPPING"
        )]
        mapping: PathBuf,

        /// Input file whose headers are checked against the mapping
        #[arg(short, long, value_name = "PATH TO INPUT")]
        input: Option<PathBuf>,

        /// Enable strict mode for more rigorous validation
        #[arg(short, long, default_value = "false")]
        strict: bool,
    },
    /// Generate a mapping template
    GenerateMapping {
        /// Type of mapping template to generate (basic/full)
        #[arg(short = 't', long = "type", default_value = "basic")]
        template_type: String,

        /// Output path for the generated mapping
        #[arg(
            short,
            long,
            default_value = "mapping.jsonc",
            value_name = "OUTPUT PATH"
        )]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with appropriate level
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    info!("CSV to RDF Processor starting up...");

    match &cli.command {
        Commands::GenerateMapping {
            template_type,
            output,
        } => generate_mapping_command(template_type, output),
        Commands::Validate {
            mapping,
            input,
            strict,
        } => validate_command(mapping, input.as_deref(), *strict),
        Commands::Process {
            input,
            mapping,
            output,
            format,
            stdout,
            strict,
            sheet,
            sequential,
        } => {
            process_command(
                input,
                mapping,
                output.as_deref(),
                format.as_deref(),
                *stdout,
                *strict,
                sheet.as_deref(),
                *sequential,
            )
            .await
        }
    }
}

fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_lowercase().as_str(), "xlsx" | "xlsm" | "xls" | "ods"))
        .unwrap_or(false)
}

fn open_source(
    input: &Path,
    csv: &csv_to_rdf::CsvOptions,
    sheet: Option<&str>,
) -> Result<Box<dyn RecordSource>> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    if is_spreadsheet(input) {
        let source = SpreadsheetRecordSource::open(input, sheet, csv.skip_rows)
            .context("Failed to read spreadsheet")?;
        info!("Reading sheet '{}' of {}", source.sheet_name(), input.display());
        Ok(Box::new(source))
    } else {
        Ok(Box::new(CsvRecordSource::new(input, csv.clone())))
    }
}

fn load_mapping(mapping_path: &Path) -> Result<csv_to_rdf::CompiledMapping> {
    if !mapping_path.exists() {
        anyhow::bail!(
            "Mapping file not found: {}. Try using --mapping <PATH TO MAPPING>",
            mapping_path.display()
        );
    }
    info!("Loading mapping from {}", mapping_path.display());
    let spec = MappingSpec::from_file(mapping_path)
        .context("Failed to parse mapping. See errors for additional details:")?;
    spec.validate().context("Failed to validate mapping")
}

#[allow(clippy::too_many_arguments)]
async fn process_command(
    input: &Path,
    mapping_path: &Path,
    output: Option<&Path>,
    format: Option<&str>,
    stdout: bool,
    strict: bool,
    sheet: Option<&str>,
    sequential: bool,
) -> Result<()> {
    if strict {
        info!("Running in strict mode");
    }

    let mut mapping = load_mapping(mapping_path)?;
    if let Some(tag) = format {
        mapping.format = OutputFormat::from_tag(tag).context("Invalid --format")?;
    }
    let source = open_source(input, &mapping.csv, sheet)?;

    // Ctrl-C stops the run at the next record
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            flag.store(true, Ordering::Relaxed);
        }
    });

    info!("Initializing processor...");
    let processor = Processor::new(mapping)
        .strict(strict)
        .parallel(!sequential)
        .cancel_flag(cancelled);

    info!("Beginning CSV processing...");
    let result = if stdout {
        let result = processor
            .run(source.as_ref())
            .context("Failed to process input")?;
        let text = result.serialize(result.format)?;
        std::io::stdout()
            .lock()
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
        result
    } else {
        let destination = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| input.with_extension(processor.mapping().format.extension()));
        processor
            .process(source.as_ref(), &destination)
            .await
            .context("Failed to process input")?
    };

    result.report.log();
    match result.outcome() {
        ProcessingOutcome::Success => info!("Processing completed successfully"),
        ProcessingOutcome::SuccessWithWarnings(warnings) => {
            warn!("Processing completed with {} warning(s)", warnings.len())
        }
        ProcessingOutcome::Failure { rejected, .. } => {
            if strict {
                anyhow::bail!("{} record(s) were rejected", rejected.len());
            }
            warn!(
                "Processing completed; {} record(s) were rejected",
                rejected.len()
            );
        }
    }
    Ok(())
}

fn generate_mapping_command(template_type: &str, output: &PathBuf) -> Result<()> {
    let template = match template_type.to_lowercase().as_str() {
        "basic" => Template::Basic,
        "full" => Template::Full,
        _ => anyhow::bail!("Invalid template type. Must be either 'basic' or 'full'"),
    };

    info!("Generating {} mapping template...", template_type);

    let template_content = match template {
        Template::Basic => BASIC_MAPPING,
        Template::Full => FULL_MAPPING,
    };

    // if output is a directory, append the default file name
    let full_file_output_path = if output.is_dir() {
        output.join("mapping.jsonc")
    } else {
        output.into()
    };

    fs::write(&full_file_output_path, template_content)
        .context(format!("Failed to write mapping to: {}", output.display()))?;

    info!(
        "Successfully generated mapping template at: {}",
        full_file_output_path.display()
    );
    Ok(())
}

fn validate_command(mapping_path: &Path, input: Option<&Path>, is_strict: bool) -> Result<()> {
    info!("Validating mapping...");
    let mut mapping = load_mapping(mapping_path)?;

    if let Some(input) = input {
        let source = open_source(input, &mapping.csv, None)?;
        let headers = source.headers().context("Failed to read input headers")?;
        let report = mapping
            .check_headers(headers.names(), is_strict)
            .context("Mapping does not match the input")?;
        report.log();
        info!("Input headers match the mapping ({} columns)", headers.len());
    }

    info!("Mapping validation successful");
    info!("Primary key: {}", mapping.primary_key);
    info!("Output format: {}", mapping.format);
    Ok(())
}
