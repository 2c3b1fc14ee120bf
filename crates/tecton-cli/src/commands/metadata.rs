use serde_json::Value;
use tecton_core::{GetFeatureServiceMetadataRequest, TectonClient};

use crate::cli::MetadataArgs;
use crate::error::CliError;

pub async fn run(args: &MetadataArgs, client: &TectonClient) -> Result<Value, CliError> {
    let request = GetFeatureServiceMetadataRequest::new(super::feature_service(&args.service)?);
    let response = client.get_feature_service_metadata(&request).await?;
    Ok(serde_json::to_value(&response)?)
}
