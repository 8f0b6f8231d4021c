//! The CRUD reconciliation loop
//!
//! [`Reconciler`] wraps one [`Resource`] and runs the fixed sequence of steps
//! for each operation: defaults and validation before any API call, the
//! vendor hook, optional polling, and a final read to resynchronize computed
//! attributes. Not-found is absorbed by read and delete only.

use crate::clock::{Clock, TokioClock};
use crate::context::Context;
use crate::diff::{ChangeSet, Diff};
use crate::error::{ReconcileError, Result};
use crate::poller::{Observation, PollTarget, Poller};
use crate::resource::{Resource, ResourceInstance};
use crate::schema::Schema;
use crate::value::AttributeBag;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What applying a configuration to the current state would do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    Create,
    NoOp,
    Update,
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub action: PlanAction,
    /// Every changed attribute or block
    pub changed: Vec<String>,
    /// The subset that forces replacement
    pub replace: Vec<String>,
}

pub struct Reconciler<M> {
    resource: Arc<dyn Resource<Meta = M>>,
    schema: Schema,
    poller: Poller,
}

impl<M> Clone for Reconciler<M> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
            schema: self.schema.clone(),
            poller: self.poller.clone(),
        }
    }
}

impl<M: Send + Sync> Reconciler<M> {
    /// Fails if the resource schema breaks a descriptor invariant
    pub fn new(resource: Arc<dyn Resource<Meta = M>>) -> Result<Self> {
        let schema = resource.schema();
        schema.check_definition(resource.type_name())?;
        Ok(Self {
            resource,
            schema,
            poller: Poller::new(Arc::new(TokioClock)),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.poller = Poller::new(clock);
        self
    }

    pub fn type_name(&self) -> &str {
        self.resource.type_name()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn prepare(&self, config: &AttributeBag) -> Result<AttributeBag> {
        let mut config = config.clone();
        self.schema.apply_defaults(&mut config);
        self.schema.validate_config(&config).into_result()?;
        Ok(config)
    }

    pub async fn create(
        &self,
        ctx: &Context,
        meta: &M,
        config: &AttributeBag,
    ) -> Result<ResourceInstance> {
        let config = self.prepare(config)?;

        let id = self.resource.create(ctx.clone(), meta, &config).await?;
        let instance = ResourceInstance::new(self.type_name(), &id, config);
        info!(resource = self.type_name(), id = %id, "Created resource");

        match self.finish_create(ctx, meta, &instance).await {
            Ok(created) => Ok(created),
            Err(e) => {
                warn!(
                    resource = self.type_name(),
                    id = %id,
                    error = %e,
                    "Resource created but not ready"
                );
                Err(ReconcileError::tainted(instance, e))
            }
        }
    }

    async fn finish_create(
        &self,
        ctx: &Context,
        meta: &M,
        instance: &ResourceInstance,
    ) -> Result<ResourceInstance> {
        if let Some(target) = self.resource.create_target(&instance.attributes) {
            let timeout = self.resource.timeouts().create;
            self.poll(ctx, meta, instance, &target, timeout).await?;
        }
        self.read_back(ctx, meta, instance).await
    }

    /// Refreshes the instance from the remote object. `None` means the object
    /// is gone and should be removed from state
    pub async fn read(
        &self,
        ctx: &Context,
        meta: &M,
        instance: &ResourceInstance,
    ) -> Result<Option<ResourceInstance>> {
        let mut current = instance.clone();
        match self.resource.read(ctx.clone(), meta, &mut current).await {
            Ok(()) => {
                current.attributes.set("id", current.id.clone());
                Ok(Some(current))
            }
            Err(e) if e.is_not_found() => {
                warn!(
                    resource = self.type_name(),
                    id = %instance.id,
                    "Resource not found, removing from state"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn read_back(
        &self,
        ctx: &Context,
        meta: &M,
        instance: &ResourceInstance,
    ) -> Result<ResourceInstance> {
        self.read(ctx, meta, instance)
            .await?
            .ok_or_else(|| ReconcileError::Vanished {
                resource: format!("{} {}", self.type_name(), instance.id),
                checks: 1,
            })
    }

    /// Detects what applying `config` would do without calling the API
    pub fn plan(&self, prior: Option<&ResourceInstance>, config: &AttributeBag) -> Result<Plan> {
        let config = self.prepare(config)?;

        let prior = match prior {
            Some(prior) => prior,
            None => {
                return Ok(Plan {
                    action: PlanAction::Create,
                    changed: config
                        .iter()
                        .filter(|(_, v)| !v.is_null())
                        .map(|(k, _)| k.clone())
                        .collect(),
                    replace: Vec::new(),
                })
            }
        };

        let diff = Diff::compute(&self.schema, &prior.attributes, &config);
        let action = if diff.requires_replace() {
            PlanAction::Replace
        } else if diff.is_empty() {
            PlanAction::NoOp
        } else {
            PlanAction::Update
        };

        Ok(Plan {
            action,
            changed: diff.changed(),
            replace: diff.force_new,
        })
    }

    pub async fn update(
        &self,
        ctx: &Context,
        meta: &M,
        prior: &ResourceInstance,
        config: &AttributeBag,
    ) -> Result<ResourceInstance> {
        let config = self.prepare(config)?;

        let diff = Diff::compute(&self.schema, &prior.attributes, &config);
        if diff.requires_replace() {
            return Err(ReconcileError::ReplaceRequired(diff.force_new));
        }

        let desired = ResourceInstance::new(
            self.type_name(),
            &prior.id,
            self.desired_attributes(&prior.attributes, &config),
        );

        if diff.is_empty() {
            debug!(resource = self.type_name(), id = %prior.id, "No changes to apply");
        } else {
            let changed = diff.changed();
            let changes = ChangeSet::new(&prior.attributes, &config, diff);
            self.resource
                .update(ctx.clone(), meta, prior, &changes)
                .await?;

            if let Some(target) = self.resource.update_target(&config) {
                let timeout = self.resource.timeouts().update;
                self.poll(ctx, meta, &desired, &target, timeout).await?;
            }
            info!(
                resource = self.type_name(),
                id = %prior.id,
                changed = ?changed,
                "Updated resource"
            );
        }

        self.read_back(ctx, meta, &desired).await
    }

    /// Prior values overlaid with the user's new values. Optional attributes
    /// the user removed are dropped unless the remote side computes them
    fn desired_attributes(&self, prior: &AttributeBag, config: &AttributeBag) -> AttributeBag {
        let mut desired = prior.clone();
        let block = &self.schema.block;

        let settable = block
            .attributes
            .iter()
            .filter(|a| a.is_user_settable())
            .map(|a| (a.name.as_str(), a.computed))
            .chain(
                block
                    .block_types
                    .iter()
                    .map(|b| (b.type_name.as_str(), b.computed)),
            );

        for (name, computed) in settable {
            match config.get(name) {
                Some(value) if !value.is_null() => desired.set(name, value.clone()),
                _ if !computed => {
                    desired.remove(name);
                }
                _ => {}
            }
        }
        desired
    }

    /// Deleting something that is already gone succeeds
    pub async fn delete(&self, ctx: &Context, meta: &M, instance: &ResourceInstance) -> Result<()> {
        match self
            .resource
            .before_delete(ctx.clone(), meta, instance, &self.poller)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!(resource = self.type_name(), id = %instance.id, "Resource already deleted");
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        match self.resource.delete(ctx.clone(), meta, instance).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!(resource = self.type_name(), id = %instance.id, "Resource already deleted");
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        if let Some(target) = self.resource.delete_target() {
            let timeout = self.resource.timeouts().delete;
            self.poll(ctx, meta, instance, &target, timeout).await?;
        }

        info!(resource = self.type_name(), id = %instance.id, "Deleted resource");
        Ok(())
    }

    /// Parses the import ID, then reads the remote object
    pub async fn import(&self, ctx: &Context, meta: &M, import_id: &str) -> Result<ResourceInstance> {
        let parsed = self.resource.import_format().parse(import_id)?;
        let instance = ResourceInstance::new(self.type_name(), &parsed.id, parsed.attributes);

        match self.read(ctx, meta, &instance).await? {
            Some(imported) => {
                info!(resource = self.type_name(), id = %imported.id, "Imported resource");
                Ok(imported)
            }
            None => Err(ReconcileError::ImportNotFound {
                type_name: self.type_name().to_string(),
                id: import_id.to_string(),
            }),
        }
    }

    async fn poll(
        &self,
        ctx: &Context,
        meta: &M,
        instance: &ResourceInstance,
        target: &PollTarget,
        timeout: Duration,
    ) -> Result<Observation> {
        let label = format!("{} {}", self.type_name(), instance.id);
        let resource = &self.resource;

        self.poller
            .wait(ctx, &label, target, timeout, move || async move {
                match resource.observe(ctx.clone(), meta, instance).await {
                    Err(e) if e.is_not_found() => Ok(Observation::Absent),
                    other => other,
                }
            })
            .await
    }
}
