//! CLI argument definitions for the `tecton` binary.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `get-features` | Fetch feature values from a feature service |
//! | `metadata` | Describe a feature service's inputs and outputs |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--url` | `$TECTON_URL` | Cluster base URL |
//! | `--api-key` | `$TECTON_API_KEY` | Service account API key |
//! | `--workspace` | `$TECTON_WORKSPACE` | Default workspace |
//! | `--timeout-ms` | `2000` | Per-request timeout |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--verbose` | `false` | Debug logging on stderr |
//!
//! # Examples
//!
//! ```bash
//! tecton get-features --feature-service fraud_detection \
//!     --join-key user_id=user_42 --request-context amount=12.5 --pretty
//!
//! tecton metadata --feature-service fraud_detection --workspace prod
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value as JsonValue;
use tecton_core::MetadataOption;

/// Query the Tecton feature serving API from the command line.
#[derive(Debug, Parser)]
#[command(name = "tecton", author, version, about = "Tecton feature serving CLI")]
pub struct Cli {
    /// Cluster base URL, e.g. https://acme.tecton.ai. Falls back to TECTON_URL.
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Service account API key. Falls back to TECTON_API_KEY.
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Workspace used when a command does not override it. Falls back to TECTON_WORKSPACE.
    #[arg(long, global = true)]
    pub workspace: Option<String>,

    /// Per-request timeout in milliseconds.
    #[arg(long, global = true, default_value_t = 2000)]
    pub timeout_ms: u64,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Log requests at debug level on stderr (RUST_LOG takes precedence).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch feature values for one set of join keys.
    ///
    /// Values are given as KEY=VALUE. VALUE is read as JSON when it parses
    /// (`42`, `1.5`, `null`, `"007"`), otherwise as a plain string.
    ///
    /// # Examples
    ///
    ///   tecton get-features --feature-service fraud --join-key user_id=u1
    ///   tecton get-features --feature-service-id 4a1c --request-context amount=3.5 --metadata slo-info
    GetFeatures(GetFeaturesArgs),

    /// Describe the join keys, request context and features of a service.
    Metadata(MetadataArgs),
}

/// Exactly one of name or id identifies the feature service.
#[derive(Debug, Clone, Args)]
pub struct FeatureServiceArgs {
    #[arg(long)]
    pub feature_service: Option<String>,

    #[arg(long)]
    pub feature_service_id: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct GetFeaturesArgs {
    #[command(flatten)]
    pub service: FeatureServiceArgs,

    #[arg(long = "join-key", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub join_keys: Vec<(String, JsonValue)>,

    #[arg(long = "request-context", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub request_context: Vec<(String, JsonValue)>,

    /// Extra metadata to request; names and data types are always included.
    #[arg(long, value_enum)]
    pub metadata: Vec<MetadataArg>,

    /// Return whatever features are available instead of failing the request.
    #[arg(long, default_value_t = false)]
    pub allow_partial_results: bool,

    #[arg(long)]
    pub read_from_cache: Option<bool>,

    #[arg(long)]
    pub write_to_cache: Option<bool>,

    #[arg(long, default_value_t = false)]
    pub ignore_extra_request_context_fields: bool,

    #[arg(long)]
    pub latency_budget_ms: Option<u64>,

    /// Print only a `{name: value}` object.
    #[arg(long, default_value_t = false)]
    pub values_only: bool,
}

#[derive(Debug, Clone, Args)]
pub struct MetadataArgs {
    #[command(flatten)]
    pub service: FeatureServiceArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetadataArg {
    Name,
    EffectiveTime,
    DataType,
    SloInfo,
    FeatureStatus,
}

impl From<MetadataArg> for MetadataOption {
    fn from(value: MetadataArg) -> Self {
        match value {
            MetadataArg::Name => Self::Name,
            MetadataArg::EffectiveTime => Self::EffectiveTime,
            MetadataArg::DataType => Self::DataType,
            MetadataArg::SloInfo => Self::SloInfo,
            MetadataArg::FeatureStatus => Self::FeatureStatus,
        }
    }
}

fn parse_key_value(input: &str) -> Result<(String, JsonValue), String> {
    let (key, raw) = input
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{input}'"))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_owned()));
    Ok((key.to_owned(), value))
}
