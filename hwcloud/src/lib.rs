//! Huawei Cloud provider built on tfreconcile

pub mod api;
pub mod config;
pub mod data_sources;
pub mod resources;

use async_trait::async_trait;
use data_sources::AvailabilityZonesDataSource;
use resources::{AsGroupResource, CceAddonResource, VpcResource};
use std::sync::Arc;
use tfreconcile::{
    AttributeBag, Context, DataSource, Provider, ProviderConfig, ProviderRegistry, Resource,
    Result, Schema,
};
use tracing::info;

#[derive(Debug, Default)]
pub struct HwCloudProvider;

impl HwCloudProvider {
    pub fn new() -> Self {
        Self
    }

    /// Configures the API client from the provider block and registers every
    /// resource and data source
    pub async fn connect(
        &self,
        ctx: Context,
        block: &AttributeBag,
    ) -> Result<(ProviderRegistry<api::Client>, api::Client)> {
        let config = config::from_attributes(block)?;
        let client = self.configure(ctx, &config).await?;
        let registry = ProviderRegistry::new(self)?;
        Ok((registry, client))
    }
}

#[async_trait]
impl Provider for HwCloudProvider {
    type Meta = api::Client;

    fn type_name(&self) -> &str {
        "hwcloud"
    }

    fn schema(&self) -> Schema {
        config::provider_schema()
    }

    async fn configure(&self, _ctx: Context, config: &ProviderConfig) -> Result<api::Client> {
        config.validate()?;
        let client = api::Client::new(config)?;
        info!(
            region = %config.region,
            project_id = %config.project_id,
            "Configured Huawei Cloud provider"
        );
        Ok(client)
    }

    fn resources(&self) -> Vec<Arc<dyn Resource<Meta = api::Client>>> {
        vec![
            Arc::new(VpcResource::new()),
            Arc::new(AsGroupResource::new()),
            Arc::new(CceAddonResource::new()),
        ]
    }

    fn data_sources(&self) -> Vec<Arc<dyn DataSource<Meta = api::Client>>> {
        vec![Arc::new(AvailabilityZonesDataSource::new())]
    }
}
