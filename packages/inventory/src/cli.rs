//! Command-line interface for the harvester.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::config::{validate_date, InventoryConfig};
use crate::document::InventoryDocument;
use crate::error::Result;
use crate::harvester::{harvest, HarvestOutcome};
use crate::http::{create_client, download_bytes};
use crate::parser::InventoryParser;
use crate::reconcile::{previous_from_records, PreviousRecords};
use crate::types::{DatasetRecord, DocumentMetadata, PreviousRecord};

/// Inventory Harvester - Validate, parse and reconcile Inventory XML documents.
#[derive(Parser)]
#[command(name = "inventory-harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a document against the Inventory schema.
    Validate {
        /// File path or http(s) URL
        source: String,
    },

    /// Print the document metadata and its datasets.
    Parse {
        /// File path or http(s) URL
        source: String,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },

    /// Decide which datasets are new, changed or unchanged.
    Reconcile {
        /// File path or http(s) URL
        source: String,

        /// JSON array of previous records ({key, modified_date, external_reference})
        #[arg(short, long)]
        previous: Option<PathBuf>,

        /// Date of the last successful run in YYYY-MM-DD format
        #[arg(short, long)]
        last_run: Option<String>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Serialize)]
struct ParseOutput {
    metadata: DocumentMetadata,
    datasets: Vec<DatasetRecord>,
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = InventoryConfig::from_env()?;

    match cli.command {
        Commands::Validate { source } => validate_command(&source),
        Commands::Parse { source, format } => parse_command(&source, format, &config),
        Commands::Reconcile {
            source,
            previous,
            last_run,
            format,
        } => reconcile_command(
            &source,
            previous.as_deref(),
            last_run.as_deref(),
            format,
            &config,
        ),
    }
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Read a document from a file, or download it with a spinner.
fn load_source(source: &str) -> Result<Vec<u8>> {
    if !is_url(source) {
        return Ok(std::fs::read(source)?);
    }

    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message(format!("Downloading {source}..."));
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let result = create_client().and_then(|client| download_bytes(&client, source));
    pb.finish_and_clear();
    result
}

fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Yaml => serde_yaml_ng::to_string(value)?,
        OutputFormat::Json => serde_json::to_string_pretty(value)? + "\n",
    })
}

fn load_previous(path: Option<&std::path::Path>) -> Result<PreviousRecords> {
    let Some(path) = path else {
        return Ok(PreviousRecords::new());
    };
    let content = std::fs::read_to_string(path)?;
    let records: Vec<PreviousRecord> = serde_json::from_str(&content)?;
    Ok(previous_from_records(records))
}

/// Execute the validate command.
fn validate_command(source: &str) -> Result<()> {
    let raw = load_source(source)?;
    InventoryDocument::parse(&raw)?;

    println!("{} {}", style("Valid:").green().bold(), source);
    Ok(())
}

/// Execute the parse command.
fn parse_command(source: &str, format: OutputFormat, config: &InventoryConfig) -> Result<()> {
    let raw = load_source(source)?;
    let doc = InventoryDocument::parse(&raw)?;
    let (metadata, datasets) = InventoryParser::new(config.parser).parse(&doc)?;

    let output = ParseOutput {
        metadata,
        datasets: datasets.collect_all(),
    };
    print!("{}", render(&output, format)?);
    Ok(())
}

/// Execute the reconcile command.
fn reconcile_command(
    source: &str,
    previous: Option<&std::path::Path>,
    last_run: Option<&str>,
    format: OutputFormat,
    config: &InventoryConfig,
) -> Result<()> {
    // Validate inputs before fetching anything
    let last_run = last_run.map(validate_date).transpose()?;
    let previous = load_previous(previous)?;

    let raw = load_source(source)?;
    let outcome = harvest(&raw, &previous, last_run, config)?;

    print!("{}", render(&outcome, format)?);

    match &outcome {
        HarvestOutcome::NotModified { .. } => {
            eprintln!("{}", style("Not modified since last run").yellow());
        }
        HarvestOutcome::Processed(run) => {
            let summary = run.summary();
            eprintln!("{} {summary}", style("Summary:").bold());
            if !run.errors.is_empty() {
                eprintln!(
                    "{} {}",
                    style("Dataset errors:").yellow().bold(),
                    run.errors.len()
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_validate() {
        let cli = Cli::parse_from(["inventory-harvester", "validate", "inventory.xml"]);
        match cli.command {
            Commands::Validate { source } => assert_eq!(source, "inventory.xml"),
            _ => panic!("expected validate"),
        }
    }

    #[test]
    fn test_cli_parse_reconcile_with_options() {
        let cli = Cli::parse_from([
            "inventory-harvester",
            "reconcile",
            "https://example.gov/inventory.xml",
            "--previous",
            "previous.json",
            "--last-run",
            "2013-12-01",
            "--format",
            "json",
        ]);

        match cli.command {
            Commands::Reconcile {
                source,
                previous,
                last_run,
                format,
            } => {
                assert_eq!(source, "https://example.gov/inventory.xml");
                assert_eq!(previous, Some(PathBuf::from("previous.json")));
                assert_eq!(last_run.as_deref(), Some("2013-12-01"));
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected reconcile"),
        }
    }

    #[test]
    fn test_parse_format_defaults_to_yaml() {
        let cli = Cli::parse_from(["inventory-harvester", "parse", "inventory.xml"]);
        match cli.command {
            Commands::Parse { format, .. } => assert_eq!(format, OutputFormat::Yaml),
            _ => panic!("expected parse"),
        }
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("http://example.gov/inventory.xml"));
        assert!(is_url("https://example.gov/inventory.xml"));
        assert!(!is_url("inventory.xml"));
        assert!(!is_url("/tmp/http.xml"));
    }

    #[test]
    fn test_load_previous_without_file_is_empty() {
        assert!(load_previous(None).unwrap().is_empty());
    }
}
