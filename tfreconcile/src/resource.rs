//! Resource trait and related types
//!
//! A resource implements the vendor-specific hooks. The [`Reconciler`]
//! drives them in order, handles polling and absorbs not-found errors.
//!
//! [`Reconciler`]: crate::reconciler::Reconciler

use crate::context::Context;
use crate::diff::ChangeSet;
use crate::error::{ApiError, Result};
use crate::import::ImportFormat;
use crate::poller::{Observation, PollTarget, Poller};
use crate::schema::Schema;
use crate::value::AttributeBag;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One managed remote object: type, remote identifier and attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceInstance {
    pub type_name: String,
    /// Assigned by the remote API at creation, never changes afterwards
    pub id: String,
    pub attributes: AttributeBag,
}

impl ResourceInstance {
    /// The `id` attribute inside the bag always mirrors the identifier
    pub fn new(type_name: &str, id: &str, mut attributes: AttributeBag) -> Self {
        attributes.set("id", id);
        Self {
            type_name: type_name.to_string(),
            id: id.to_string(),
            attributes,
        }
    }
}

/// Upper bounds for the polling phase of each operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            update: timeout,
            delete: timeout,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::uniform(Duration::from_secs(10 * 60))
    }
}

/// Base trait for resources - implement the vendor API mapping
/// Type name should be constant and unique within a provider
#[async_trait]
pub trait Resource: Send + Sync {
    /// Configured API client handed to every hook
    type Meta: Send + Sync;

    /// Type name should be constant (e.g., "hwcloud_vpc")
    fn type_name(&self) -> &str;

    fn schema(&self) -> Schema;

    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    fn import_format(&self) -> ImportFormat {
        ImportFormat::Id
    }

    /// Submits the create request and returns the identifier the API assigned.
    /// The configuration has defaults applied and is already validated
    async fn create(
        &self,
        ctx: Context,
        meta: &Self::Meta,
        config: &AttributeBag,
    ) -> Result<String>;

    /// Poll target after create. Receives the configuration, since some
    /// resources only settle into a target state when asked to
    fn create_target(&self, _config: &AttributeBag) -> Option<PollTarget> {
        None
    }

    /// Current lifecycle state, used while polling. Not-found is reported
    /// as an error; the reconciler decides what absence means
    async fn observe(
        &self,
        _ctx: Context,
        _meta: &Self::Meta,
        instance: &ResourceInstance,
    ) -> Result<Observation> {
        Err(ApiError::unsupported(format!(
            "{} does not report lifecycle states",
            instance.type_name
        ))
        .into())
    }

    /// Maps the remote object onto `instance.attributes`. Attributes the API
    /// does not return keep their last-known value
    async fn read(
        &self,
        ctx: Context,
        meta: &Self::Meta,
        instance: &mut ResourceInstance,
    ) -> Result<()>;

    /// Issues one API call per independent change group
    async fn update(
        &self,
        ctx: Context,
        meta: &Self::Meta,
        instance: &ResourceInstance,
        changes: &ChangeSet<'_>,
    ) -> Result<()>;

    fn update_target(&self, _config: &AttributeBag) -> Option<PollTarget> {
        None
    }

    /// Preconditions that must reach a terminal state before the delete call
    async fn before_delete(
        &self,
        _ctx: Context,
        _meta: &Self::Meta,
        _instance: &ResourceInstance,
        _poller: &Poller,
    ) -> Result<()> {
        Ok(())
    }

    async fn delete(
        &self,
        ctx: Context,
        meta: &Self::Meta,
        instance: &ResourceInstance,
    ) -> Result<()>;

    fn delete_target(&self) -> Option<PollTarget> {
        None
    }
}
