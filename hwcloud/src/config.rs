//! Provider block schema and conversion into [`ProviderConfig`]
//!
//! Values set in the provider block win; unset ones fall back to the
//! `HW_*` environment variables.

use std::time::Duration;
use tfreconcile::config::DEFAULT_CLOUD;
use tfreconcile::validator::IntRange;
use tfreconcile::{
    AttributeBag, AttributeBuilder, AttributeType, ProviderConfig, ReconcileError, Result, Schema,
    SchemaBuilder,
};
use url::Url;

pub const ENV_REGION: &str = "HW_REGION_NAME";
pub const ENV_PROJECT_ID: &str = "HW_PROJECT_ID";
pub const ENV_AUTH_TOKEN: &str = "HW_AUTH_TOKEN";
pub const ENV_CLOUD: &str = "HW_CLOUD";
pub const ENV_INSECURE: &str = "HW_INSECURE";

pub fn provider_schema() -> Schema {
    SchemaBuilder::new()
        .description("Huawei Cloud provider")
        .attribute(
            AttributeBuilder::new("region", AttributeType::String)
                .description("Region name, e.g. cn-north-4. Falls back to HW_REGION_NAME")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("project_id", AttributeType::String)
                .description("Project ID in the region. Falls back to HW_PROJECT_ID")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("auth_token", AttributeType::String)
                .description("IAM token sent as X-Auth-Token. Falls back to HW_AUTH_TOKEN")
                .optional()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("cloud", AttributeType::String)
                .description("Base domain of the service endpoints")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("endpoints", AttributeType::map_of(AttributeType::String))
                .description("Endpoint overrides keyed by service name (vpc, as, cce, ecs)")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("insecure", AttributeType::Bool)
                .description("Skip TLS certificate verification")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("request_timeout", AttributeType::Int)
                .description("Timeout of a single API request in seconds")
                .optional()
                .validator(IntRange::between(1, 3600))
                .build(),
        )
        .build()
}

/// Builds the provider configuration from the provider block
pub fn from_attributes(block: &AttributeBag) -> Result<ProviderConfig> {
    provider_schema().validate_config(block).into_result()?;

    let region = setting(block, "region", ENV_REGION)?;
    let project_id = setting(block, "project_id", ENV_PROJECT_ID)?;
    let auth_token = setting(block, "auth_token", ENV_AUTH_TOKEN)?;
    let cloud = setting(block, "cloud", ENV_CLOUD)?.unwrap_or_else(|| DEFAULT_CLOUD.to_string());

    let insecure = block
        .get_bool("insecure")?
        .or_else(|| {
            std::env::var(ENV_INSECURE)
                .ok()
                .and_then(|v| v.parse::<bool>().ok())
        })
        .unwrap_or(false);

    let mut config = ProviderConfig::new(
        region.as_deref().unwrap_or_default(),
        project_id.as_deref().unwrap_or_default(),
        auth_token.as_deref().unwrap_or_default(),
    )
    .with_cloud(&cloud);
    config.insecure = insecure;

    if let Some(seconds) = block.get_int("request_timeout")? {
        config = config.with_request_timeout(Duration::from_secs(seconds.max(0) as u64));
    }

    for (service, endpoint) in block.get_string_map("endpoints")? {
        check_endpoint(&service, &endpoint)?;
        config = config.with_endpoint(&service, &endpoint);
    }

    config.validate()?;
    Ok(config)
}

fn setting(block: &AttributeBag, name: &str, env: &str) -> Result<Option<String>> {
    Ok(block
        .get_str(name)?
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| std::env::var(env).ok().filter(|v| !v.is_empty())))
}

fn check_endpoint(service: &str, endpoint: &str) -> Result<()> {
    let url = Url::parse(endpoint).map_err(|e| {
        ReconcileError::Config(format!("invalid endpoint for {}: {}", service, e))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ReconcileError::Config(format!(
            "invalid endpoint for {}: unsupported scheme '{}'",
            service, other
        ))),
    }
}
