//! In-memory fake cloud shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tfreconcile::poller::Interval;
use tfreconcile::validator::{IntRange, StringLength};
use tfreconcile::{
    ApiError, AttributeBag, AttributeBuilder, AttributeType, ChangeSet, Context, DataSource,
    ImportFormat, Observation, PollTarget, Poller, ReconcileError, Resource, ResourceInstance,
    Result, Schema, SchemaBuilder, Timeouts, Value,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Disk {
    pub name: String,
    pub zone: String,
    pub size: Option<i64>,
    pub description: String,
    pub tags: BTreeMap<String, String>,
    pub status: String,
}

#[derive(Default)]
pub struct FakeCloud {
    pub disks: Mutex<BTreeMap<String, Disk>>,
    /// (cluster, addon id) -> version
    pub addons: Mutex<BTreeMap<(String, String), String>>,
    /// States handed out by observe before falling back to the stored status
    pub script: Mutex<VecDeque<Observation>>,
    pub calls: Mutex<Vec<String>>,
    next_id: AtomicU32,
}

impl FakeCloud {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, states: &[&str]) {
        let mut script = self.script.lock().unwrap();
        for state in states {
            script.push_back(match *state {
                "<absent>" => Observation::Absent,
                other => Observation::state(other),
            });
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn scripted(&self) -> Option<Observation> {
        self.script.lock().unwrap().pop_front()
    }
}

pub struct DiskResource;

#[async_trait]
impl Resource for DiskResource {
    type Meta = FakeCloud;

    fn type_name(&self) -> &str {
        "fake_disk"
    }

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .validator(StringLength {
                        min: Some(1),
                        max: Some(16),
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("zone", AttributeType::String)
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("size", AttributeType::Int)
                    .optional()
                    .validator(IntRange::between(0, 1024))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::map_of(AttributeType::String))
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .computed()
                    .build(),
            )
            .build()
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::uniform(Duration::from_secs(60))
    }

    async fn create(&self, _ctx: Context, meta: &FakeCloud, config: &AttributeBag) -> Result<String> {
        let id = meta.next_id("disk");
        meta.record(format!("create:{}", id));
        let disk = Disk {
            name: config.require_str("name")?.to_string(),
            zone: config.require_str("zone")?.to_string(),
            size: config.get_int("size")?,
            description: config
                .get_str("description")?
                .unwrap_or("managed disk")
                .to_string(),
            tags: config.get_string_map("tags")?,
            status: "OK".to_string(),
        };
        meta.disks.lock().unwrap().insert(id.clone(), disk);
        Ok(id)
    }

    fn create_target(&self, _config: &AttributeBag) -> Option<PollTarget> {
        Some(
            PollTarget::new(&["CREATING"], &["OK"])
                .failed(&["ERROR"])
                .interval(Interval::Fixed(Duration::from_secs(5))),
        )
    }

    async fn observe(
        &self,
        _ctx: Context,
        meta: &FakeCloud,
        instance: &ResourceInstance,
    ) -> Result<Observation> {
        meta.record(format!("observe:{}", instance.id));
        if let Some(observation) = meta.scripted() {
            return Ok(observation);
        }
        match meta.disks.lock().unwrap().get(&instance.id) {
            Some(disk) => Ok(Observation::state(disk.status.clone())),
            None => Err(ApiError::not_found(format!("disk {}", instance.id)).into()),
        }
    }

    async fn read(
        &self,
        _ctx: Context,
        meta: &FakeCloud,
        instance: &mut ResourceInstance,
    ) -> Result<()> {
        meta.record(format!("read:{}", instance.id));
        let disk = meta
            .disks
            .lock()
            .unwrap()
            .get(&instance.id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("disk {}", instance.id)))?;

        let attrs = &mut instance.attributes;
        attrs.set("name", disk.name);
        attrs.set("zone", disk.zone);
        attrs.set_opt("size", disk.size);
        attrs.set("description", disk.description);
        attrs.set("status", disk.status);
        if disk.tags.is_empty() {
            attrs.remove("tags");
        } else {
            attrs.set("tags", Value::string_map(&disk.tags));
        }
        Ok(())
    }

    async fn update(
        &self,
        _ctx: Context,
        meta: &FakeCloud,
        instance: &ResourceInstance,
        changes: &ChangeSet<'_>,
    ) -> Result<()> {
        let mut disks = meta.disks.lock().unwrap();
        let disk = disks
            .get_mut(&instance.id)
            .ok_or_else(|| ApiError::not_found(format!("disk {}", instance.id)))?;

        if changes.has_changes(&["name", "size", "description"]) {
            meta.record(format!("update:{}", instance.id));
            disk.name = changes.new.require_str("name")?.to_string();
            disk.size = changes.new.get_int("size")?;
            if let Some(description) = changes.new.get_str("description")? {
                disk.description = description.to_string();
            }
        }

        if changes.has_change("tags") {
            let delta = changes.tag_delta("tags")?;
            for key in delta.remove.keys() {
                meta.record(format!("untag:{}", key));
                disk.tags.remove(key);
            }
            for (key, value) in delta.upsert {
                meta.record(format!("tag:{}={}", key, value));
                disk.tags.insert(key, value);
            }
        }
        Ok(())
    }

    async fn delete(&self, _ctx: Context, meta: &FakeCloud, instance: &ResourceInstance) -> Result<()> {
        meta.record(format!("delete:{}", instance.id));
        match meta.disks.lock().unwrap().remove(&instance.id) {
            Some(_) => Ok(()),
            None => Err(ApiError::not_found(format!("disk {}", instance.id)).into()),
        }
    }

    fn delete_target(&self) -> Option<PollTarget> {
        Some(PollTarget::absent(&["DELETING"]).interval(Interval::Fixed(Duration::from_secs(2))))
    }
}

/// Scoped under a cluster; imported as `<cluster_id>/<id>`
pub struct AddonResource;

#[async_trait]
impl Resource for AddonResource {
    type Meta = FakeCloud;

    fn type_name(&self) -> &str {
        "fake_addon"
    }

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cluster_id", AttributeType::String)
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("version", AttributeType::String)
                    .required()
                    .force_new()
                    .build(),
            )
            .build()
    }

    fn import_format(&self) -> ImportFormat {
        ImportFormat::Composite(&["cluster_id"])
    }

    async fn create(&self, _ctx: Context, meta: &FakeCloud, config: &AttributeBag) -> Result<String> {
        let id = meta.next_id("addon");
        meta.record(format!("create:{}", id));
        meta.addons.lock().unwrap().insert(
            (config.require_str("cluster_id")?.to_string(), id.clone()),
            config.require_str("version")?.to_string(),
        );
        Ok(id)
    }

    async fn read(
        &self,
        _ctx: Context,
        meta: &FakeCloud,
        instance: &mut ResourceInstance,
    ) -> Result<()> {
        meta.record(format!("read:{}", instance.id));
        let cluster = instance.attributes.require_str("cluster_id")?.to_string();
        let version = meta
            .addons
            .lock()
            .unwrap()
            .get(&(cluster, instance.id.clone()))
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("addon {}", instance.id)))?;
        instance.attributes.set("version", version);
        Ok(())
    }

    async fn update(
        &self,
        _ctx: Context,
        _meta: &FakeCloud,
        _instance: &ResourceInstance,
        _changes: &ChangeSet<'_>,
    ) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _ctx: Context, meta: &FakeCloud, instance: &ResourceInstance) -> Result<()> {
        let cluster = instance.attributes.require_str("cluster_id")?.to_string();
        meta.addons
            .lock()
            .unwrap()
            .remove(&(cluster, instance.id.clone()))
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found(format!("addon {}", instance.id)).into())
    }
}

/// Resource whose delete is blocked by a precondition
pub struct GuardedResource;

#[async_trait]
impl Resource for GuardedResource {
    type Meta = FakeCloud;

    fn type_name(&self) -> &str {
        "fake_guarded"
    }

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .build()
    }

    async fn create(&self, _ctx: Context, meta: &FakeCloud, _config: &AttributeBag) -> Result<String> {
        Ok(meta.next_id("guarded"))
    }

    async fn read(&self, _ctx: Context, _meta: &FakeCloud, _instance: &mut ResourceInstance) -> Result<()> {
        Ok(())
    }

    async fn update(
        &self,
        _ctx: Context,
        _meta: &FakeCloud,
        _instance: &ResourceInstance,
        _changes: &ChangeSet<'_>,
    ) -> Result<()> {
        Ok(())
    }

    async fn before_delete(
        &self,
        _ctx: Context,
        meta: &FakeCloud,
        _instance: &ResourceInstance,
        _poller: &Poller,
    ) -> Result<()> {
        meta.record("before_delete");
        Err(ReconcileError::Precondition(
            "instance i-1 is PENDING; remove it first".to_string(),
        ))
    }

    async fn delete(&self, _ctx: Context, meta: &FakeCloud, _instance: &ResourceInstance) -> Result<()> {
        meta.record("delete");
        Ok(())
    }
}

pub struct ZonesDataSource;

#[async_trait]
impl DataSource for ZonesDataSource {
    type Meta = FakeCloud;

    fn type_name(&self) -> &str {
        "fake_zones"
    }

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("state", AttributeType::String)
                    .optional()
                    .default("available")
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("names", AttributeType::list_of(AttributeType::String))
                    .computed()
                    .build(),
            )
            .build()
    }

    async fn read(&self, _ctx: Context, meta: &FakeCloud, config: &AttributeBag) -> Result<AttributeBag> {
        meta.record(format!("zones:{}", config.require_str("state")?));
        Ok(AttributeBag::new().with("names", Value::strings(["zone-a", "zone-b"])))
    }
}
