use serde_json::{Map, Value};
use tecton_core::{
    GetFeatureRequestData, GetFeaturesRequest, MetadataOption, RequestOptions, TectonClient,
};

use crate::cli::GetFeaturesArgs;
use crate::error::CliError;

pub async fn run(args: &GetFeaturesArgs, client: &TectonClient) -> Result<Value, CliError> {
    let request_data = GetFeatureRequestData::new(
        to_map(&args.join_keys),
        to_map(&args.request_context),
    )?;

    let request_options = RequestOptions {
        read_from_cache: args.read_from_cache,
        write_to_cache: args.write_to_cache,
        ignore_extra_request_context_fields: args.ignore_extra_request_context_fields.then_some(true),
        latency_budget_ms: args.latency_budget_ms,
    };

    let request = GetFeaturesRequest::new(super::feature_service(&args.service)?, request_data)
        .with_metadata_options(args.metadata.iter().copied().map(MetadataOption::from))
        .with_request_options(request_options)
        .with_allow_partial_results(args.allow_partial_results);

    let response = client.get_features(&request).await?;
    if args.values_only {
        return Ok(Value::Object(response.to_value_map()));
    }
    Ok(serde_json::to_value(&response)?)
}

fn to_map(entries: &[(String, Value)]) -> Option<Map<String, Value>> {
    (!entries.is_empty()).then(|| entries.iter().cloned().collect())
}
