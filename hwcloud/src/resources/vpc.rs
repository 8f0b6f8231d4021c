//! VPC resource implementation

use crate::api::vpc::{CreateVpcRequest, UpdateVpcRequest, Vpc};
use crate::api::Client;
use async_trait::async_trait;
use tfreconcile::validator::{StringLength, StringPattern};
use tfreconcile::{
    AttributeBag, AttributeBuilder, AttributeType, ChangeSet, Context, Observation, PollTarget,
    Resource, ResourceInstance, Result, Schema, SchemaBuilder, Setting, Value,
};

/// Enterprise project every account has
const DEFAULT_ENTERPRISE_PROJECT: &str = "0";

const NAME_PATTERN: &str = r"^[A-Za-z0-9_.\-]+$";
const CIDR_PATTERN: &str = r"^(\d{1,3}\.){3}\d{1,3}/\d{1,2}$";

#[derive(Debug, Default)]
pub struct VpcResource;

impl VpcResource {
    pub fn new() -> Self {
        Self
    }

    fn apply(attrs: &mut AttributeBag, vpc: Vpc) {
        attrs.set("name", vpc.name);
        attrs.set("cidr", vpc.cidr);
        attrs.set("status", vpc.status);
        if vpc.description.is_empty() {
            attrs.remove("description");
        } else {
            attrs.set("description", vpc.description);
        }
        attrs.set_opt("enterprise_project_id", vpc.enterprise_project_id);
    }
}

#[async_trait]
impl Resource for VpcResource {
    type Meta = Client;

    fn type_name(&self) -> &str {
        "hwcloud_vpc"
    }

    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Virtual Private Cloud")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("VPC identifier")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("VPC name")
                    .required()
                    .validator(StringLength {
                        min: Some(1),
                        max: Some(64),
                    })
                    .validator(StringPattern::new(
                        NAME_PATTERN,
                        "letters, digits, underscores, hyphens and periods",
                    ))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cidr", AttributeType::String)
                    .description("Address range of the VPC, e.g. 192.168.0.0/16")
                    .required()
                    .force_new()
                    .validator(StringPattern::new(CIDR_PATTERN, "an IPv4 CIDR block"))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .optional()
                    .validator(StringLength {
                        min: None,
                        max: Some(255),
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enterprise_project_id", AttributeType::String)
                    .description("Enterprise project. An empty string selects the default project")
                    .optional()
                    .computed()
                    .force_new()
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

    async fn create(&self, _ctx: Context, client: &Client, config: &AttributeBag) -> Result<String> {
        let enterprise_project_id = match config.setting_str("enterprise_project_id")? {
            Setting::Unset => None,
            Setting::Default => Some(DEFAULT_ENTERPRISE_PROJECT.to_string()),
            Setting::Explicit(id) => Some(id),
        };
        let request = CreateVpcRequest {
            name: config.require_str("name")?.to_string(),
            cidr: config.require_str("cidr")?.to_string(),
            description: config.get_str("description")?.map(str::to_string),
            enterprise_project_id,
        };

        let vpc = client.vpc().create(&request).await?;

        let tags = config.get_string_map("tags")?;
        if !tags.is_empty() {
            client.vpc().add_tags(&vpc.id, &tags).await?;
        }
        Ok(vpc.id)
    }

    fn create_target(&self, _config: &AttributeBag) -> Option<PollTarget> {
        Some(PollTarget::new(&["CREATING"], &["OK"]).failed(&["ERROR"]))
    }

    async fn observe(
        &self,
        _ctx: Context,
        client: &Client,
        instance: &ResourceInstance,
    ) -> Result<Observation> {
        let vpc = client.vpc().get(&instance.id).await?;
        Ok(Observation::state(vpc.status))
    }

    async fn read(
        &self,
        _ctx: Context,
        client: &Client,
        instance: &mut ResourceInstance,
    ) -> Result<()> {
        let vpc = client.vpc().get(&instance.id).await?;
        let tags = client.vpc().tags(&instance.id).await?;

        // "" asks for the default project, which the API reports as "0"
        let default_requested = matches!(
            instance.attributes.setting_str("enterprise_project_id")?,
            Setting::Default
        );
        Self::apply(&mut instance.attributes, vpc);
        if default_requested
            && instance.attributes.get_str("enterprise_project_id")?
                == Some(DEFAULT_ENTERPRISE_PROJECT)
        {
            instance.attributes.set("enterprise_project_id", "");
        }
        if tags.is_empty() {
            instance.attributes.remove("tags");
        } else {
            instance.attributes.set("tags", Value::string_map(&tags));
        }
        Ok(())
    }

    async fn update(
        &self,
        _ctx: Context,
        client: &Client,
        instance: &ResourceInstance,
        changes: &ChangeSet<'_>,
    ) -> Result<()> {
        if changes.has_changes(&["name", "description"]) {
            let request = UpdateVpcRequest {
                name: Some(changes.new.require_str("name")?.to_string()),
                // an empty description clears it
                description: Some(
                    changes
                        .new
                        .get_str("description")?
                        .unwrap_or_default()
                        .to_string(),
                ),
            };
            client.vpc().update(&instance.id, &request).await?;
        }

        if changes.has_change("tags") {
            let delta = changes.tag_delta("tags")?;
            if !delta.remove.is_empty() {
                client.vpc().remove_tags(&instance.id, &delta.remove).await?;
            }
            if !delta.upsert.is_empty() {
                client.vpc().add_tags(&instance.id, &delta.upsert).await?;
            }
        }
        Ok(())
    }

    async fn delete(
        &self,
        _ctx: Context,
        client: &Client,
        instance: &ResourceInstance,
    ) -> Result<()> {
        client.vpc().delete(&instance.id).await?;
        Ok(())
    }

    fn delete_target(&self) -> Option<PollTarget> {
        Some(PollTarget::absent(&["OK", "DELETING"]))
    }
}
