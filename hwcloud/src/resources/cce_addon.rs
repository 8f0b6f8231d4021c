//! CCE add-on resource implementation
//!
//! Add-ons are addressed by cluster and add-on ID, so imports take the
//! composite form `<cluster_id>/<id>`. Every configurable field forces a
//! new add-on; there is no update call.

use crate::api::cce::{AddonSpec, AddonValues, CreateAddonRequest};
use crate::api::Client;
use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use tfreconcile::validator::JsonObject;
use tfreconcile::{
    AttributeBag, AttributeBuilder, AttributePath, AttributeType, ChangeSet, Context,
    Diagnostics, ImportFormat, NestedBlockBuilder, Observation, PollTarget, ReconcileError,
    Resource, ResourceInstance, Result, Schema, SchemaBuilder,
};

#[derive(Debug, Default)]
pub struct CceAddonResource;

impl CceAddonResource {
    pub fn new() -> Self {
        Self
    }

    fn cluster_id(instance: &ResourceInstance) -> Result<&str> {
        instance.attributes.require_str("cluster_id")
    }

    /// Builds the installer values from the `values` block. JSON documents are
    /// the base; the plain maps are merged over them key by key
    pub fn template_values(config: &AttributeBag) -> Result<AddonValues> {
        let block = match config.get_block("values")? {
            Some(block) => block,
            None => return Ok(AddonValues::default()),
        };

        let mut diags = Diagnostics::new();
        let basic = merge_values(&block, "basic_json", "basic", &mut diags)?;
        let custom = merge_values(&block, "custom_json", "custom", &mut diags)?;
        let flavor = match block.get_str("flavor_json")? {
            Some(raw) => parse_object(raw, "flavor_json", &mut diags).map(JsonValue::Object),
            None => None,
        };
        diags.into_result()?;

        Ok(AddonValues {
            basic,
            custom,
            flavor,
        })
    }
}

fn values_path(name: &str) -> AttributePath {
    AttributePath::new("values").index(0).attribute(name)
}

fn parse_object(raw: &str, name: &str, diags: &mut Diagnostics) -> Option<Map<String, JsonValue>> {
    match serde_json::from_str::<JsonValue>(raw) {
        Ok(JsonValue::Object(map)) => Some(map),
        Ok(_) => {
            diags.add_attribute_error(&values_path(name), "must be a JSON object", None::<String>);
            None
        }
        Err(e) => {
            diags.add_attribute_error(&values_path(name), "must be valid JSON", Some(e.to_string()));
            None
        }
    }
}

fn merge_values(
    block: &AttributeBag,
    json_name: &str,
    map_name: &str,
    diags: &mut Diagnostics,
) -> Result<Map<String, JsonValue>> {
    let mut merged = match block.get_str(json_name)? {
        Some(raw) => parse_object(raw, json_name, diags).unwrap_or_default(),
        None => Map::new(),
    };
    let overrides: BTreeMap<String, String> = block.get_string_map(map_name)?;
    for (key, value) in overrides {
        merged.insert(key, JsonValue::String(value));
    }
    Ok(merged)
}

#[async_trait]
impl Resource for CceAddonResource {
    type Meta = Client;

    fn type_name(&self) -> &str {
        "hwcloud_cce_addon"
    }

    fn schema(&self) -> Schema {
        let string_map = || AttributeType::map_of(AttributeType::String);
        let json = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .optional()
                .validator(JsonObject)
                .build()
        };

        SchemaBuilder::new()
            .version(0)
            .description("Manages an add-on installed in a CCE cluster")
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
                AttributeBuilder::new("template_name", AttributeType::String)
                    .description("Add-on template, e.g. coredns")
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
            .block(
                NestedBlockBuilder::list("values")
                    .max_items(1)
                    .force_new()
                    .attribute(
                        AttributeBuilder::new("basic", string_map())
                            .optional()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("custom", string_map())
                            .optional()
                            .build(),
                    )
                    .attribute(json("flavor_json", "Flavor document as a JSON object"))
                    .attribute(json("basic_json", "Basic values as a JSON object"))
                    .attribute(json("custom_json", "Custom values as a JSON object"))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .computed()
                    .build(),
            )
            .build()
    }

    fn import_format(&self) -> ImportFormat {
        ImportFormat::Composite(&["cluster_id"])
    }

    async fn create(&self, _ctx: Context, client: &Client, config: &AttributeBag) -> Result<String> {
        let values = Self::template_values(config)?;
        let spec = AddonSpec {
            cluster_id: config.require_str("cluster_id")?.to_string(),
            version: config.require_str("version")?.to_string(),
            addon_template_name: config.require_str("template_name")?.to_string(),
            description: None,
            values,
        };

        let addon = client.cce().create(&CreateAddonRequest::install(spec)).await?;
        if addon.metadata.uid.is_empty() {
            return Err(ReconcileError::Decoding(
                "add-on create response carried no uid".to_string(),
            ));
        }
        Ok(addon.metadata.uid)
    }

    fn create_target(&self, _config: &AttributeBag) -> Option<PollTarget> {
        Some(
            PollTarget::new(&["installing", "upgrading"], &["running", "available"])
                .failed(&["installFailed", "abnormal"]),
        )
    }

    async fn observe(
        &self,
        _ctx: Context,
        client: &Client,
        instance: &ResourceInstance,
    ) -> Result<Observation> {
        let addon = client
            .cce()
            .get(Self::cluster_id(instance)?, &instance.id)
            .await?;
        let detail = addon.failure_detail();
        Ok(Observation::state(addon.status.status).with_detail(detail))
    }

    async fn read(
        &self,
        _ctx: Context,
        client: &Client,
        instance: &mut ResourceInstance,
    ) -> Result<()> {
        let addon = client
            .cce()
            .get(Self::cluster_id(instance)?, &instance.id)
            .await?;

        let attrs = &mut instance.attributes;
        attrs.set("cluster_id", addon.spec.cluster_id);
        attrs.set("template_name", addon.spec.addon_template_name);
        attrs.set("version", addon.spec.version);
        attrs.set("status", addon.status.status);
        attrs.set_opt("description", addon.spec.description);
        Ok(())
    }

    async fn update(
        &self,
        _ctx: Context,
        _client: &Client,
        _instance: &ResourceInstance,
        changes: &ChangeSet<'_>,
    ) -> Result<()> {
        // every settable field is force-new, so a diff never reaches here
        Err(ReconcileError::ReplaceRequired(changes.diff.changed()))
    }

    async fn delete(
        &self,
        _ctx: Context,
        client: &Client,
        instance: &ResourceInstance,
    ) -> Result<()> {
        client
            .cce()
            .delete(Self::cluster_id(instance)?, &instance.id)
            .await?;
        Ok(())
    }

    fn delete_target(&self) -> Option<PollTarget> {
        Some(PollTarget::absent(&[
            "deleting",
            "running",
            "available",
            "abnormal",
        ]))
    }
}
