//! Command-line interface: argument parsing and the generate, environment, sync and cache commands.

use crate::config::DocConfig;
use crate::links::RepositoryKind;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use crate::service::{Delivery, DocRequest, DocService};
use crate::sync::PostmanClient;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Postman From Source - Generate a Postman collection from annotated route-definition files
#[derive(Parser, Debug)]
#[command(name = "postman-from-source")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the project directory
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Configuration file (YAML); defaults apply when omitted
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Postman API key used by the sync commands
    #[arg(long = "postman-key", env = "DEVTOOLS_POSTMAN_KEY", hide_env_values = true)]
    pub postman_key: Option<String>,

    /// Keep excluded requests in the collection, flagged as excluded
    #[arg(long = "add-excluded", env = "DEVTOOLS_DOC_ADD_EXCLUDED")]
    pub add_excluded: bool,

    /// Base URL of source links
    #[arg(long = "files-url", env = "DEVTOOLS_FILES_URL", value_name = "URL")]
    pub files_url: Option<String>,

    /// Kind of source links (github, gitlab, bitbucket or local)
    #[arg(long = "files-type", env = "DEVTOOLS_FILES_TYPE", value_name = "KIND")]
    pub files_type: Option<String>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate the collection
    Generate {
        /// Ignore the cached collection
        #[arg(long)]
        force: bool,

        /// Write `<title>.postman_collection.json` (into the output directory if given)
        #[arg(long)]
        download: bool,

        /// Output file path, or directory with --download (if not specified, outputs to stdout)
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output_path: Option<PathBuf>,

        /// Output format (json or yaml)
        #[arg(short = 'f', long = "format", value_enum, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Export a Postman environment holding the collection variables
    Environment {
        /// Write `<title>.postman_environment.json` (into the output directory if given)
        #[arg(long)]
        download: bool,

        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output_path: Option<PathBuf>,
    },

    /// Push the collection to Postman
    Sync {
        #[command(subcommand)]
        action: SyncAction,
    },

    /// Manage cached collections
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// List remote collections
    List,
    /// Create a remote collection
    Create,
    /// Replace a remote collection
    Update {
        #[arg(value_name = "ID")]
        id: String,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Remove every cached collection
    Clear,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format, as imported by Postman
    Json,
    /// YAML format
    Yaml,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args.command);

    // Validate project path exists
    if !args.project_path.exists() {
        anyhow::bail!(
            "Project path does not exist: {}",
            args.project_path.display()
        );
    }

    // Validate project path is a directory
    if !args.project_path.is_dir() {
        anyhow::bail!(
            "Project path is not a directory: {}",
            args.project_path.display()
        );
    }

    info!("Project path: {}", args.project_path.display());
    if let Some(ref config) = args.config_path {
        info!("Configuration: {}", config.display());
    } else {
        info!("Configuration: defaults");
    }

    Ok(args)
}

/// Configuration file merged with the command-line and environment overrides.
pub fn load_config(args: &CliArgs) -> Result<DocConfig> {
    let mut config = match &args.config_path {
        Some(path) => DocConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => DocConfig::default(),
    };

    if let Some(key) = &args.postman_key {
        config.postman.key = Some(key.clone());
    }
    if args.add_excluded {
        config.add_excluded = true;
    }
    if let Some(url) = &args.files_url {
        config.repository.link = url.clone();
    }
    if let Some(kind) = &args.files_type {
        config.repository.kind = Some(RepositoryKind::from_name(kind));
    }

    Ok(config)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Loading configuration...");
    let config = load_config(&args)?;
    let service = DocService::new(args.project_path.clone(), config)
        .context("Failed to initialise the generator")?;

    match args.command {
        Command::Generate {
            force,
            download,
            output_path,
            output_format,
        } => {
            info!("Generating collection...");
            let delivery = service.request(DocRequest { force, download })?;
            deliver(&delivery, output_path.as_deref(), output_format)?;

            info!("Generation complete!");
            info!("Summary:");
            info!("  - Requests: {}", delivery.document().requests().count());
            info!("  - Variables: {}", delivery.document().variable.len());
        }
        Command::Environment {
            download,
            output_path,
        } => {
            info!("Exporting environment...");
            let delivery = service.environment(download)?;
            info!("Environment holds {} values", delivery.document().values.len());
            deliver(&delivery, output_path.as_deref(), OutputFormat::Json)?;
        }
        Command::Sync { action } => {
            let config = service.config();
            let client = PostmanClient::new(config.postman.base_url.clone(), config.postman.key.clone())?;
            match action {
                SyncAction::List => {
                    for summary in service.sync_list(&client)? {
                        println!("{}\t{}\t{}", summary.id, summary.uid, summary.name);
                    }
                }
                SyncAction::Create => {
                    let summary = service.sync_create(&client).context("Sync failed")?;
                    println!("{}", summary.id);
                }
                SyncAction::Update { id } => {
                    let summary = service.sync_update(&client, &id).context("Sync failed")?;
                    println!("{}", summary.id);
                }
            }
        }
        Command::Cache {
            action: CacheAction::Clear,
        } => {
            let removed = service.cache().clear().with_context(|| {
                format!("Failed to clear {}", service.cache().dir().display())
            })?;
            info!("Removed {} cached collections", removed);
        }
    }

    Ok(())
}

/// Writes a delivered document: inline to the output file or stdout, as an attachment into
/// the output directory (or the current directory).
fn deliver<T: Serialize>(
    delivery: &Delivery<T>,
    output_path: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    info!("Serializing to {:?} format...", format);
    let content = match format {
        OutputFormat::Yaml => serialize_yaml(delivery.document())?,
        OutputFormat::Json => serialize_json(delivery.document())?,
    };

    let target = match delivery.filename() {
        Some(filename) => {
            let filename = match format {
                OutputFormat::Json => filename.to_string(),
                OutputFormat::Yaml => format!("{}.yaml", filename.trim_end_matches(".json")),
            };
            Some(output_path.unwrap_or(Path::new(".")).join(filename))
        }
        None => output_path.map(Path::to_path_buf),
    };

    if let Some(path) = target {
        info!("Writing output to: {}", path.display());
        write_to_file(&content, &path)?;
        info!("Successfully wrote {}", path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}
