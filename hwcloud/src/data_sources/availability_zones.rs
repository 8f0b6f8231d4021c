//! Availability zones data source

use crate::api::Client;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tfreconcile::validator::OneOf;
use tfreconcile::{
    AttributeBag, AttributeBuilder, AttributeType, Context, DataSource, Result, Schema,
    SchemaBuilder, Value,
};

#[derive(Debug, Default)]
pub struct AvailabilityZonesDataSource;

impl AvailabilityZonesDataSource {
    pub fn new() -> Self {
        Self
    }
}

/// Stable identifier for a zone list: the hex SHA-256 prefix of the names
/// joined by commas
pub fn zones_id(names: &[String]) -> String {
    let digest = Sha256::digest(names.join(",").as_bytes());
    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

#[async_trait]
impl DataSource for AvailabilityZonesDataSource {
    type Meta = Client;

    fn type_name(&self) -> &str {
        "hwcloud_availability_zones"
    }

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .description("Lists the availability zones of the configured region")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("state", AttributeType::String)
                    .optional()
                    .default("available")
                    .validator(OneOf::new(["available", "unavailable"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("names", AttributeType::list_of(AttributeType::String))
                    .description("Zone names, sorted")
                    .computed()
                    .build(),
            )
            .build()
    }

    async fn read(&self, _ctx: Context, client: &Client, config: &AttributeBag) -> Result<AttributeBag> {
        let want_available = config.get_str("state")? != Some("unavailable");

        let mut names: Vec<String> = client
            .ecs()
            .availability_zones()
            .await?
            .into_iter()
            .filter(|zone| zone.zone_state.available == want_available)
            .map(|zone| zone.zone_name)
            .collect();
        names.sort();

        Ok(AttributeBag::new()
            .with("id", zones_id(&names))
            .with("names", Value::strings(names)))
    }
}
