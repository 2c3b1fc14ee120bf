mod get_features;
mod metadata;

use std::env;
use std::time::Duration;

use serde_json::Value;
use tecton_core::config::{API_KEY_ENV, URL_ENV, WORKSPACE_ENV};
use tecton_core::{ClientConfig, ClientOptions, FeatureServiceRef, TectonClient};
use tracing::debug;

use crate::cli::{Cli, Command, FeatureServiceArgs};
use crate::error::CliError;

/// Run the selected command and return its JSON output.
pub async fn run(cli: &Cli) -> Result<Value, CliError> {
    let client = build_client(cli)?;

    let result = match &cli.command {
        Command::GetFeatures(args) => get_features::run(args, &client).await,
        Command::Metadata(args) => metadata::run(args, &client).await,
    };

    client.close()?;
    result
}

fn build_client(cli: &Cli) -> Result<TectonClient, CliError> {
    let config = ClientConfig::from_lookup(|name| {
        let flag = match name {
            URL_ENV => cli.url.clone(),
            API_KEY_ENV => cli.api_key.clone(),
            WORKSPACE_ENV => cli.workspace.clone(),
            _ => None,
        };
        flag.or_else(|| env::var(name).ok())
    })?;

    let options = ClientOptions::default().with_read_timeout(Duration::from_millis(cli.timeout_ms));
    let config = config.with_options(options);
    debug!(?config, "building tecton client");

    Ok(TectonClient::new(config)?)
}

fn feature_service(args: &FeatureServiceArgs) -> Result<FeatureServiceRef, CliError> {
    Ok(FeatureServiceRef::from_parts(
        args.feature_service.as_deref(),
        args.feature_service_id.as_deref(),
    )?)
}
