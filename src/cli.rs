use crate::manifest::Manifest;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use crate::source_types::load_catalog;
use crate::types::TypeCatalog;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;

/// Synthesize an OpenAPI document from an endpoint manifest and Rust type declarations
#[derive(Parser, Debug)]
#[command(name = "apidoc-synth")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Manifest describing endpoints, services and auth schemes (.yaml, .yml or .json)
    #[arg(value_name = "MANIFEST")]
    pub manifest_path: PathBuf,

    /// Directory of Rust sources whose structs and enums describe the payload types
    #[arg(short = 's', long = "source", value_name = "SOURCE_DIR")]
    pub source_dir: Option<PathBuf>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Document title, overriding the manifest
    #[arg(long = "title")]
    pub title: Option<String>,

    /// Document version, overriding the manifest
    #[arg(long = "api-version")]
    pub api_version: Option<String>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.manifest_path.is_file() {
        anyhow::bail!("Manifest file does not exist: {}", args.manifest_path.display());
    }

    if let Some(source_dir) = &args.source_dir {
        if !source_dir.is_dir() {
            anyhow::bail!("Source path is not a directory: {}", source_dir.display());
        }
        info!("Source directory: {}", source_dir.display());
    }

    info!("Manifest: {}", args.manifest_path.display());
    info!("Output format: {:?}", args.output_format);
    match &args.output_path {
        Some(output) => info!("Output file: {}", output.display()),
        None => info!("Output: stdout"),
    }

    Ok(args)
}

/// Run one generation pass and write the document
pub fn run(args: CliArgs) -> Result<()> {
    let content = generate(&args)?;

    if let Some(output_path) = &args.output_path {
        write_to_file(&content, output_path)?;
        info!("Wrote API document to {}", output_path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

/// Builds the document described by `args` and renders it in the requested format.
pub fn generate(args: &CliArgs) -> Result<String> {
    let mut manifest = Manifest::load(&args.manifest_path)
        .with_context(|| format!("Failed to load manifest {}", args.manifest_path.display()))?;
    if let Some(title) = &args.title {
        manifest.info.title = title.clone();
    }
    if let Some(version) = &args.api_version {
        manifest.info.version = version.clone();
    }

    let catalog = match &args.source_dir {
        Some(source_dir) => load_catalog(source_dir)?,
        None => TypeCatalog::new(),
    };
    let collected_types = catalog.len();
    let declared_endpoints = manifest.endpoints.len();

    let service = manifest
        .into_service(catalog)
        .context("Failed to prepare document generation")?;
    let document = service.generate();

    let documented = document.operation_count();
    if documented == 0 && declared_endpoints > 0 {
        warn!("None of the {} endpoints could be documented", declared_endpoints);
    }
    info!("Summary:");
    info!("  - Types collected from sources: {}", collected_types);
    info!("  - Endpoints declared: {}", declared_endpoints);
    info!("  - Operations documented: {}", documented);
    info!("  - Schemas: {}", document.components.schemas.len());

    match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&document),
        OutputFormat::Json => serialize_json(&document),
    }
}
