//! Provider trait and registry
//!
//! A provider turns a [`ProviderConfig`] into its API client (`Meta`) and
//! lists the resources and data sources it serves. [`ProviderRegistry`]
//! checks every schema once and hands out reconcilers by type name.

use crate::config::ProviderConfig;
use crate::context::Context;
use crate::data_source::{read_data_source, DataSource};
use crate::error::{ReconcileError, Result};
use crate::reconciler::Reconciler;
use crate::resource::Resource;
use crate::schema::Schema;
use crate::value::AttributeBag;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Configured API client shared by every resource
    type Meta: Send + Sync + 'static;

    /// Type name should be constant (e.g., "hwcloud")
    fn type_name(&self) -> &str;

    /// Provider-level configuration schema
    fn schema(&self) -> Schema;

    async fn configure(&self, ctx: Context, config: &ProviderConfig) -> Result<Self::Meta>;

    fn resources(&self) -> Vec<Arc<dyn Resource<Meta = Self::Meta>>>;

    fn data_sources(&self) -> Vec<Arc<dyn DataSource<Meta = Self::Meta>>>;
}

/// Lookup table from type name to reconciler or data source
pub struct ProviderRegistry<M> {
    resources: BTreeMap<String, Reconciler<M>>,
    data_sources: BTreeMap<String, Arc<dyn DataSource<Meta = M>>>,
}

impl<M: Send + Sync + 'static> ProviderRegistry<M> {
    /// Checks every schema definition and that type names are unique
    pub fn new<P>(provider: &P) -> Result<Self>
    where
        P: Provider<Meta = M>,
    {
        provider.schema().check_definition(provider.type_name())?;

        let mut resources = BTreeMap::new();
        for resource in provider.resources() {
            let name = resource.type_name().to_string();
            let reconciler = Reconciler::new(resource)?;
            if resources.insert(name.clone(), reconciler).is_some() {
                return Err(duplicate(&name));
            }
        }

        let mut data_sources = BTreeMap::new();
        for data_source in provider.data_sources() {
            let name = data_source.type_name().to_string();
            data_source.schema().check_definition(&name)?;
            if resources.contains_key(&name) || data_sources.insert(name.clone(), data_source).is_some() {
                return Err(duplicate(&name));
            }
        }

        debug!(
            provider = provider.type_name(),
            resources = resources.len(),
            data_sources = data_sources.len(),
            "Registered provider"
        );

        Ok(Self {
            resources,
            data_sources,
        })
    }

    pub fn reconciler(&self, type_name: &str) -> Result<&Reconciler<M>> {
        self.resources
            .get(type_name)
            .ok_or_else(|| ReconcileError::UnknownResource(type_name.to_string()))
    }

    pub fn data_source(&self, type_name: &str) -> Result<&Arc<dyn DataSource<Meta = M>>> {
        self.data_sources
            .get(type_name)
            .ok_or_else(|| ReconcileError::UnknownResource(type_name.to_string()))
    }

    /// Looks up and reads a data source in one step
    pub async fn read_data_source(
        &self,
        ctx: Context,
        meta: &M,
        type_name: &str,
        config: &AttributeBag,
    ) -> Result<AttributeBag> {
        let data_source = self.data_source(type_name)?;
        read_data_source(ctx, data_source, meta, config).await
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn data_source_types(&self) -> impl Iterator<Item = &str> {
        self.data_sources.keys().map(String::as_str)
    }

    /// Replaces the clock of every reconciler
    pub fn with_clock(mut self, clock: Arc<dyn crate::clock::Clock>) -> Self {
        self.resources = self
            .resources
            .into_iter()
            .map(|(name, r)| (name, r.with_clock(clock.clone())))
            .collect();
        self
    }
}

impl<M> fmt::Debug for ProviderRegistry<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("data_sources", &self.data_sources.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn duplicate(name: &str) -> ReconcileError {
    ReconcileError::Schema {
        type_name: name.to_string(),
        message: "type name registered more than once".to_string(),
    }
}
