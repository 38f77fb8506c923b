//! CLI - Command Line Interface
//!
//! Available Commands:
//! - docpref get <key>                 - Print a stored value
//! - docpref set <key> <value> -t int  - Store a typed value
//! - docpref remove <key>              - Remove a key
//! - docpref contains <key>            - Print whether a key is set
//! - docpref list                      - Print every key and value
//! - docpref clear                     - Remove every key
//! - docpref collections               - List preference collections
//!
//! Configuration comes from a YAML file, then `DOCPREF_*` environment
//! variables, then command-line flags.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

use docpref_core::{Backend, DocprefConfig, PrefError, PrefValue};
use docpref_runtime::DbPref;
use docpref_storage::DocumentDatabase;

/// CLI Errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CliError {
    #[error("Invalid {kind} value: {value}")]
    InvalidValue { kind: String, value: String },

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Commit failed for collection: {0}")]
    CommitFailed(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl From<PrefError> for CliError {
    fn from(e: PrefError) -> Self {
        match e {
            PrefError::Config(msg) => CliError::ConfigError(msg),
            other => CliError::StorageError(other.to_string()),
        }
    }
}

/// CLI Configuration
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Resolved store configuration
    pub store: DocprefConfig,

    /// Verbose output
    pub verbose: bool,

    /// Output format
    pub output_format: OutputFormat,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            store: DocprefConfig::default(),
            verbose: false,
            output_format: OutputFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

/// Value type accepted by `set`
#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum ValueKind {
    Bool,
    Int,
    Long,
    Float,
    String,
    /// Comma-separated string set
    Set,
}

/// Docpref CLI
#[derive(Parser, Debug)]
#[command(name = "docpref")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file
    #[arg(long, global = true, default_value = ".docpref/config.yaml")]
    config: PathBuf,

    /// Database path
    #[arg(short, long, global = true)]
    db: Option<PathBuf>,

    /// Collection name
    #[arg(short, long, global = true)]
    collection: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum)]
    output: Option<OutputFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a stored value
    Get(KeyArgs),

    /// Store a value
    Set(SetArgs),

    /// Remove a key
    Remove(KeyArgs),

    /// Print whether a key is set
    Contains(KeyArgs),

    /// Print every key and value
    List,

    /// Remove every key
    Clear,

    /// List preference collections
    Collections,
}

#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Preference key
    pub key: String,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Preference key
    pub key: String,

    /// Value to store
    pub value: String,

    /// Value type
    #[arg(short = 't', long = "type", value_enum, default_value = "string")]
    pub kind: ValueKind,
}

/// Parse a command-line value into a typed preference value
pub fn parse_value(kind: ValueKind, raw: &str) -> Result<PrefValue, CliError> {
    let invalid = || CliError::InvalidValue {
        kind: format!("{kind:?}").to_lowercase(),
        value: raw.to_string(),
    };
    Ok(match kind {
        ValueKind::Bool => PrefValue::Bool(raw.parse().map_err(|_| invalid())?),
        ValueKind::Int => PrefValue::Int(raw.parse().map_err(|_| invalid())?),
        ValueKind::Long => PrefValue::Long(raw.parse().map_err(|_| invalid())?),
        ValueKind::Float => PrefValue::Float(raw.parse().map_err(|_| invalid())?),
        ValueKind::String => PrefValue::String(raw.to_string()),
        ValueKind::Set => {
            let set: BTreeSet<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            PrefValue::StringSet(set)
        }
    })
}

/// Resolve configuration: file, then environment, then flags
fn resolve_config(cli: &Cli) -> Result<CliConfig, CliError> {
    let mut store = DocprefConfig::load(&cli.config)?;
    store.apply_process_env()?;

    if let Some(db) = &cli.db {
        store.storage.db_path = db.clone();
        store.storage.backend = Backend::Sqlite;
    }
    if let Some(collection) = &cli.collection {
        store.storage.collection = collection.clone();
    }

    Ok(CliConfig {
        store,
        verbose: cli.verbose,
        output_format: cli.output.unwrap_or(OutputFormat::Pretty),
    })
}

/// Parse CLI arguments and execute commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let output = execute(cli).await?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

/// Execute a parsed command, returning what should be printed
pub async fn execute(cli: Cli) -> Result<String, CliError> {
    let config = resolve_config(&cli)?;

    if config.verbose {
        tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    }

    let db = docpref_storage::open_database(&config.store.storage).await?;

    if let Commands::Collections = cli.command {
        let names = db.list_collections().await?;
        return Ok(match config.output_format {
            OutputFormat::Pretty => names.join("\n"),
            OutputFormat::Json => serde_json::json!(names).to_string(),
        });
    }

    let collection = db.collection(&config.store.storage.collection).await?;
    let pref = DbPref::with_config(collection, config.store.runtime.clone()).await?;

    match cli.command {
        Commands::Get(args) => cmd_get(&pref, &args.key, &config).await,
        Commands::Set(args) => cmd_set(&pref, args).await,
        Commands::Remove(args) => {
            commit(&pref, pref.edit().remove(args.key.as_str())).await?;
            Ok(String::new())
        }
        Commands::Contains(args) => Ok(pref.contains(&args.key).await?.to_string()),
        Commands::List => cmd_list(&pref, &config).await,
        Commands::Clear => {
            commit(&pref, pref.edit().clear()).await?;
            info!("Cleared collection {}", pref.name());
            Ok(String::new())
        }
        Commands::Collections => Ok(String::new()),
    }
}

async fn commit(pref: &DbPref, editor: &docpref_runtime::PrefEditor) -> Result<(), CliError> {
    if editor.commit().await {
        Ok(())
    } else {
        Err(CliError::CommitFailed(pref.name().to_string()))
    }
}

async fn cmd_get(pref: &DbPref, key: &str, config: &CliConfig) -> Result<String, CliError> {
    let value = pref
        .get_value(key)
        .await?
        .ok_or_else(|| CliError::KeyNotFound(key.to_string()))?;

    Ok(match config.output_format {
        OutputFormat::Pretty => value.to_string(),
        OutputFormat::Json => serde_json::json!({ "key": key, "value": value }).to_string(),
    })
}

async fn cmd_set(pref: &DbPref, args: SetArgs) -> Result<String, CliError> {
    let value = parse_value(args.kind, &args.value)?;
    commit(pref, pref.edit().put(args.key.as_str(), value)).await?;
    Ok(String::new())
}

async fn cmd_list(pref: &DbPref, config: &CliConfig) -> Result<String, CliError> {
    let mut entries: Vec<(String, PrefValue)> = pref.get_all().await?.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(match config.output_format {
        OutputFormat::Pretty => entries
            .iter()
            .map(|(key, value)| format!("{key} = {value}"))
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Json => {
            let map: serde_json::Map<String, serde_json::Value> = entries
                .into_iter()
                .map(|(key, value)| {
                    let json = serde_json::to_value(&value).unwrap_or(serde_json::Value::Null);
                    (key, json)
                })
                .collect();
            serde_json::Value::Object(map).to_string()
        }
    })
}
