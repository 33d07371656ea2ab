use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(
    name = "reflex",
    about = "Reflex: inspect and query self-describing document models",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Session configuration (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load a model and resolve every class schema
    Check(CheckArgs),
    /// Print one document
    Get(GetArgs),
    /// List documents of a class (subclasses and mixins included)
    Find(FindArgs),
    /// Instantiate a document and print its exerted attributes
    Show(ShowArgs),
}

#[derive(Args)]
pub struct CheckArgs {
    /// JSON array of documents
    pub model: PathBuf,
}

#[derive(Args)]
pub struct GetArgs {
    pub model: PathBuf,
    pub id: String,
}

#[derive(Args)]
pub struct FindArgs {
    pub model: PathBuf,
    pub class: String,
    /// Equality constraint; the value is JSON, or a bare string
    #[arg(long = "where", value_name = "KEY=JSON", value_parser = parse_filter)]
    pub filters: Vec<(String, Value)>,
    /// Stop at the first match
    #[arg(long)]
    pub one: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    pub model: PathBuf,
    pub id: String,
    /// Read through this mixin's schema instead of the document's class
    #[arg(long)]
    pub mixin: Option<String>,
}

/// Parse `key=value`, reading the value as JSON when it is valid JSON.
pub fn parse_filter(s: &str) -> Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{s}`"));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}
