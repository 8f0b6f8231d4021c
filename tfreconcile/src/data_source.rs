//! DataSource trait
//!
//! Data sources are read-only lookups. They receive their validated
//! configuration and return the full attribute bag.

use crate::context::Context;
use crate::error::Result;
use crate::schema::Schema;
use crate::value::AttributeBag;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Base trait for data sources - implement the read operation
#[async_trait]
pub trait DataSource: Send + Sync {
    type Meta: Send + Sync;

    /// Type name should be constant (e.g., "hwcloud_availability_zones")
    fn type_name(&self) -> &str;

    fn schema(&self) -> Schema;

    /// Returns every attribute, including computed ones. The returned bag
    /// MUST contain an `id`
    async fn read(
        &self,
        ctx: Context,
        meta: &Self::Meta,
        config: &AttributeBag,
    ) -> Result<AttributeBag>;
}

/// Validates `config` and runs the data source read
pub async fn read_data_source<M>(
    ctx: Context,
    data_source: &Arc<dyn DataSource<Meta = M>>,
    meta: &M,
    config: &AttributeBag,
) -> Result<AttributeBag>
where
    M: Send + Sync,
{
    let schema = data_source.schema();
    let mut config = config.clone();
    schema.apply_defaults(&mut config);
    schema.validate_config(&config).into_result()?;

    let mut state = data_source.read(ctx, meta, &config).await?;
    for (name, value) in config.iter() {
        if !state.is_set(name) {
            state.set(name, value.clone());
        }
    }
    if !state.is_set("id") {
        let id = data_source.type_name().to_string();
        state.set("id", id);
    }

    debug!(data_source = data_source.type_name(), "Read data source");
    Ok(state)
}
