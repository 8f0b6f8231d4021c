//! Auto Scaling group resource implementation

use crate::api::autoscaling::{
    CreateScalingGroupRequest, ResourceRef, ScalingGroup, UpdateScalingGroupRequest,
};
use crate::api::Client;
use async_trait::async_trait;
use std::time::Duration;
use tfreconcile::poller::Interval;
use tfreconcile::validator::{IntRange, OneOf, StringLength};
use tfreconcile::{
    AttributeBag, AttributeBuilder, AttributePath, AttributeType, ChangeSet, Context,
    Diagnostics, NestedBlockBuilder, Observation, PollTarget, Poller, ReconcileError, Resource,
    ResourceInstance, Result, Schema, SchemaBuilder, Timeouts, Value,
};
use tracing::{debug, info};

const IN_SERVICE: &str = "INSERVICE";
const INSTANCE_LIMIT: i64 = 300;

const TERMINATE_POLICIES: [&str; 4] = [
    "OLD_CONFIG_OLD_INSTANCE",
    "OLD_CONFIG_NEW_INSTANCE",
    "OLD_INSTANCE",
    "NEW_INSTANCE",
];

/// `NOVA_AUDIT` is what the API reports for groups created without a method
const AUDIT_METHODS: [&str; 3] = ["ECS_HEALTH_AUDIT", "ELB_AUDIT", "NOVA_AUDIT"];

#[derive(Debug, Default)]
pub struct AsGroupResource;

impl AsGroupResource {
    pub fn new() -> Self {
        Self
    }

    fn enabled(config: &AttributeBag) -> Result<bool> {
        Ok(config.get_bool("enable")?.unwrap_or(true))
    }

    fn target_for(enabled: bool) -> PollTarget {
        if enabled {
            PollTarget::new(&["PAUSED", "PAUSING"], &[IN_SERVICE]).failed(&["ERROR"])
        } else {
            PollTarget::new(&[IN_SERVICE, "PAUSING"], &["PAUSED"]).failed(&["ERROR"])
        }
    }

    /// `min <= desire <= max`, checked before any call
    fn check_instance_bounds(config: &AttributeBag) -> Result<()> {
        let min = config.get_int("min_instance_number")?.unwrap_or(0);
        let max = config.get_int("max_instance_number")?.unwrap_or(0);
        let mut diags = Diagnostics::new();

        if min > max {
            diags.add_attribute_error(
                &AttributePath::new("min_instance_number"),
                "must not exceed max_instance_number",
                Some(format!("min {} > max {}", min, max)),
            );
        }
        if let Some(desire) = config.get_int("desire_instance_number")? {
            if desire < min || desire > max {
                diags.add_attribute_error(
                    &AttributePath::new("desire_instance_number"),
                    "must lie between min_instance_number and max_instance_number",
                    Some(format!("{} is outside [{}, {}]", desire, min, max)),
                );
            }
        }
        diags.into_result()
    }

    fn refs(config: &AttributeBag, name: &str) -> Result<Vec<ResourceRef>> {
        config
            .get_blocks(name)?
            .iter()
            .map(|block| {
                Ok(ResourceRef {
                    id: block.require_str("id")?.to_string(),
                })
            })
            .collect()
    }

    fn ref_blocks(refs: Vec<ResourceRef>) -> Value {
        Value::blocks(
            refs.into_iter()
                .map(|r| AttributeBag::new().with("id", r.id))
                .collect(),
        )
    }

    fn optional_string(config: &AttributeBag, name: &str) -> Result<Option<String>> {
        Ok(config.get_str(name)?.map(str::to_string))
    }

    fn apply(attrs: &mut AttributeBag, group: ScalingGroup) {
        attrs.set("scaling_group_name", group.scaling_group_name);
        attrs.set_opt("scaling_configuration_id", group.scaling_configuration_id);
        attrs.set_opt("desire_instance_number", group.desire_instance_number);
        attrs.set_opt("min_instance_number", group.min_instance_number);
        attrs.set_opt("max_instance_number", group.max_instance_number);
        attrs.set_opt("cool_down_time", group.cool_down_time);
        attrs.set("vpc_id", group.vpc_id);
        attrs.set("networks", Self::ref_blocks(group.networks));
        if group.security_groups.is_empty() {
            attrs.remove("security_groups");
        } else {
            attrs.set("security_groups", Self::ref_blocks(group.security_groups));
        }
        attrs.set("available_zones", Value::strings(group.available_zones));
        attrs.set_opt(
            "health_periodic_audit_method",
            group.health_periodic_audit_method,
        );
        attrs.set_opt("instance_terminate_policy", group.instance_terminate_policy);
        attrs.set_opt("delete_publicip", group.delete_publicip);
        attrs.set_opt("current_instance_number", group.current_instance_number);
        match group.scaling_group_status.as_str() {
            IN_SERVICE => attrs.set("enable", true),
            "PAUSED" => attrs.set("enable", false),
            _ => {}
        }
        attrs.set("status", group.scaling_group_status);
    }

    fn update_request(changes: &ChangeSet<'_>) -> Result<UpdateScalingGroupRequest> {
        let new = changes.new;
        let changed = |name: &str| changes.has_change(name);
        let mut request = UpdateScalingGroupRequest::default();

        if changed("scaling_group_name") {
            request.scaling_group_name = Self::optional_string(new, "scaling_group_name")?;
        }
        if changed("scaling_configuration_id") {
            request.scaling_configuration_id =
                Self::optional_string(new, "scaling_configuration_id")?;
        }
        // the bounds are validated together, so they are sent together
        if changed("desire_instance_number")
            || changed("min_instance_number")
            || changed("max_instance_number")
        {
            request.desire_instance_number = new.get_int("desire_instance_number")?;
            request.min_instance_number = new.get_int("min_instance_number")?;
            request.max_instance_number = new.get_int("max_instance_number")?;
        }
        if changed("cool_down_time") {
            request.cool_down_time = new.get_int("cool_down_time")?;
        }
        if changed("networks") {
            request.networks = Some(Self::refs(new, "networks")?);
        }
        if changed("security_groups") {
            request.security_groups = Some(Self::refs(new, "security_groups")?);
        }
        if changed("available_zones") {
            request.available_zones = Some(new.get_string_list("available_zones")?);
        }
        if changed("health_periodic_audit_method") {
            request.health_periodic_audit_method =
                Self::optional_string(new, "health_periodic_audit_method")?;
        }
        if changed("instance_terminate_policy") {
            request.instance_terminate_policy =
                Self::optional_string(new, "instance_terminate_policy")?;
        }
        if changed("delete_publicip") {
            request.delete_publicip = new.get_bool("delete_publicip")?;
        }
        Ok(request)
    }
}

#[async_trait]
impl Resource for AsGroupResource {
    type Meta = Client;

    fn type_name(&self) -> &str {
        "hwcloud_as_group"
    }

    fn schema(&self) -> Schema {
        let id_block = |name: &str| {
            NestedBlockBuilder::list(name).attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .required()
                    .build(),
            )
        };
        let instance_count = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::Int)
                .description(description)
                .optional()
                .validator(IntRange::between(0, INSTANCE_LIMIT))
        };

        SchemaBuilder::new()
            .version(0)
            .description("Manages an Auto Scaling group")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("scaling_group_name", AttributeType::String)
                    .required()
                    .validator(StringLength {
                        min: Some(1),
                        max: Some(64),
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("scaling_configuration_id", AttributeType::String)
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                instance_count("desire_instance_number", "Expected number of instances")
                    .computed()
                    .build(),
            )
            .attribute(
                instance_count("min_instance_number", "Minimum number of instances")
                    .default(0i64)
                    .build(),
            )
            .attribute(
                instance_count("max_instance_number", "Maximum number of instances")
                    .default(0i64)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cool_down_time", AttributeType::Int)
                    .description("Cooling duration in seconds")
                    .optional()
                    .default(300i64)
                    .validator(IntRange::between(0, 86400))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("vpc_id", AttributeType::String)
                    .required()
                    .force_new()
                    .build(),
            )
            .block(id_block("networks").min_items(1).max_items(5).build())
            .block(id_block("security_groups").max_items(1).build())
            .attribute(
                AttributeBuilder::new("available_zones", AttributeType::list_of(AttributeType::String))
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("health_periodic_audit_method", AttributeType::String)
                    .optional()
                    .computed()
                    .validator(OneOf::new(AUDIT_METHODS))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("instance_terminate_policy", AttributeType::String)
                    .optional()
                    .computed()
                    .validator(OneOf::new(TERMINATE_POLICIES))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("delete_publicip", AttributeType::Bool)
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("force_delete", AttributeType::Bool)
                    .description("Delete the group together with its instances")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enable", AttributeType::Bool)
                    .optional()
                    .default(true)
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
            .attribute(
                AttributeBuilder::new("current_instance_number", AttributeType::Int)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("instances", AttributeType::list_of(AttributeType::String))
                    .computed()
                    .build(),
            )
            .build()
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::uniform(Duration::from_secs(10 * 60))
    }

    async fn create(&self, _ctx: Context, client: &Client, config: &AttributeBag) -> Result<String> {
        Self::check_instance_bounds(config)?;

        let request = CreateScalingGroupRequest {
            scaling_group_name: config.require_str("scaling_group_name")?.to_string(),
            scaling_configuration_id: Self::optional_string(config, "scaling_configuration_id")?,
            desire_instance_number: config.get_int("desire_instance_number")?,
            min_instance_number: config.get_int("min_instance_number")?,
            max_instance_number: config.get_int("max_instance_number")?,
            cool_down_time: config.get_int("cool_down_time")?,
            vpc_id: config.require_str("vpc_id")?.to_string(),
            networks: Self::refs(config, "networks")?,
            security_groups: Self::refs(config, "security_groups")?,
            available_zones: config.get_string_list("available_zones")?,
            health_periodic_audit_method: Self::optional_string(
                config,
                "health_periodic_audit_method",
            )?,
            instance_terminate_policy: Self::optional_string(config, "instance_terminate_policy")?,
            delete_publicip: config.get_bool("delete_publicip")?,
        };

        let id = client.autoscaling().create(&request).await?;

        let tags = config.get_string_map("tags")?;
        if !tags.is_empty() {
            client.autoscaling().add_tags(&id, &tags).await?;
        }
        if Self::enabled(config)? {
            client.autoscaling().resume(&id).await?;
        }
        Ok(id)
    }

    fn create_target(&self, config: &AttributeBag) -> Option<PollTarget> {
        // a paused group is already settled
        match Self::enabled(config) {
            Ok(false) => None,
            _ => Some(Self::target_for(true)),
        }
    }

    async fn observe(
        &self,
        _ctx: Context,
        client: &Client,
        instance: &ResourceInstance,
    ) -> Result<Observation> {
        let group = client.autoscaling().get(&instance.id).await?;
        Ok(Observation::state(group.scaling_group_status))
    }

    async fn read(
        &self,
        _ctx: Context,
        client: &Client,
        instance: &mut ResourceInstance,
    ) -> Result<()> {
        let api = client.autoscaling();
        let group = api.get(&instance.id).await?;
        let instances = api.instances(&instance.id).await?;
        let tags = api.tags(&instance.id).await?;

        let attrs = &mut instance.attributes;
        Self::apply(attrs, group);
        attrs.set(
            "instances",
            Value::strings(instances.into_iter().map(|i| i.instance_id)),
        );
        if tags.is_empty() {
            attrs.remove("tags");
        } else {
            attrs.set("tags", Value::string_map(&tags));
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
        Self::check_instance_bounds(changes.new)?;
        let api = client.autoscaling();

        let request = Self::update_request(changes)?;
        if !request.is_empty() {
            api.update(&instance.id, &request).await?;
        }

        if changes.has_change("enable") {
            if Self::enabled(changes.new)? {
                api.resume(&instance.id).await?;
            } else {
                api.pause(&instance.id).await?;
            }
        }

        if changes.has_change("tags") {
            let delta = changes.tag_delta("tags")?;
            if !delta.remove.is_empty() {
                api.remove_tags(&instance.id, &delta.remove).await?;
            }
            if !delta.upsert.is_empty() {
                api.add_tags(&instance.id, &delta.upsert).await?;
            }
        }
        Ok(())
    }

    fn update_target(&self, config: &AttributeBag) -> Option<PollTarget> {
        Self::enabled(config).ok().map(Self::target_for)
    }

    /// Empties the group unless `force_delete` lets the API do it
    async fn before_delete(
        &self,
        ctx: Context,
        client: &Client,
        instance: &ResourceInstance,
        poller: &Poller,
    ) -> Result<()> {
        if instance.attributes.get_bool("force_delete")?.unwrap_or(false) {
            return Ok(());
        }

        let api = client.autoscaling();
        let members = api.instances(&instance.id).await?;
        if members.is_empty() {
            return Ok(());
        }

        let busy: Vec<&str> = members
            .iter()
            .filter(|m| m.life_cycle_state != IN_SERVICE)
            .map(|m| m.instance_id.as_str())
            .collect();
        if !busy.is_empty() {
            return Err(ReconcileError::Precondition(format!(
                "instances of scaling group {} are not in service: {}",
                instance.id,
                busy.join(", ")
            )));
        }

        let ids: Vec<String> = members.into_iter().map(|m| m.instance_id).collect();
        info!(id = %instance.id, instances = ids.len(), "Removing instances from scaling group");

        let drain = UpdateScalingGroupRequest {
            min_instance_number: Some(0),
            desire_instance_number: Some(0),
            ..Default::default()
        };
        api.update(&instance.id, &drain).await?;
        api.remove_instances(&instance.id, &ids, true).await?;

        let target = PollTarget::new(&["REMOVING"], &["EMPTY"])
            .interval(Interval::Fixed(Duration::from_secs(10)));
        let group_id = instance.id.as_str();
        poller
            .wait(
                &ctx,
                &format!("{} {} instances", self.type_name(), group_id),
                &target,
                self.timeouts().delete,
                move || async move {
                    let remaining = client.autoscaling().instances(group_id).await?;
                    debug!(id = group_id, remaining = remaining.len(), "Waiting for instance removal");
                    Ok(if remaining.is_empty() {
                        Observation::state("EMPTY")
                    } else {
                        Observation::state("REMOVING")
                            .with_detail(Some(format!("{} instances left", remaining.len())))
                    })
                },
            )
            .await?;
        Ok(())
    }

    async fn delete(
        &self,
        _ctx: Context,
        client: &Client,
        instance: &ResourceInstance,
    ) -> Result<()> {
        let force = instance.attributes.get_bool("force_delete")?.unwrap_or(false);
        client.autoscaling().delete(&instance.id, force).await?;
        Ok(())
    }

    fn delete_target(&self) -> Option<PollTarget> {
        Some(
            PollTarget::absent(&[IN_SERVICE, "PAUSED", "DELETING"])
                .interval(Interval::Fixed(Duration::from_secs(5))),
        )
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tfreconcile::{ManualClock, PlanAction, Reconciler};

    const GROUP_PATH: &str = "/autoscaling-api/v1/project-1/scaling_group/asg-1";
    const INSTANCES_PATH: &str =
        "/autoscaling-api/v1/project-1/scaling_group_instance/asg-1/list";

    fn group_body(status: &str) -> String {
        serde_json::json!({
            "scaling_group": {
                "scaling_group_id": "asg-1",
                "scaling_group_name": "web",
                "scaling_group_status": status,
                "desire_instance_number": 0,
                "min_instance_number": 0,
                "max_instance_number": 2,
                "cool_down_time": 300,
                "vpc_id": "vpc-1",
                "networks": [{"id": "subnet-1"}],
                "security_groups": [],
                "available_zones": ["az-1"],
                "current_instance_number": 0
            }
        })
        .to_string()
    }

    fn instances_body(states: &[&str]) -> String {
        let instances: Vec<serde_json::Value> = states
            .iter()
            .enumerate()
            .map(|(i, state)| {
                serde_json::json!({"instance_id": format!("i-{}", i), "life_cycle_state": state})
            })
            .collect();
        serde_json::json!({"scaling_group_instances": instances}).to_string()
    }

    fn reconciler() -> Reconciler<Client> {
        Reconciler::new(Arc::new(AsGroupResource::new()))
            .unwrap()
            .with_clock(Arc::new(ManualClock::new()))
    }

    fn config() -> AttributeBag {
        AttributeBag::new()
            .with("scaling_group_name", "web")
            .with("vpc_id", "vpc-1")
            .with("desire_instance_number", 0i64)
            .with("max_instance_number", 2i64)
            .with(
                "networks",
                Value::blocks(vec![AttributeBag::new().with("id", "subnet-1")]),
            )
    }

    #[tokio::test]
    async fn create_resumes_and_waits_for_service() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/autoscaling-api/v1/project-1/scaling_group")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "desire_instance_number": 0,
                "min_instance_number": 0,
                "cool_down_time": 300
            })))
            .with_status(200)
            .with_body(r#"{"scaling_group_id": "asg-1"}"#)
            .create_async()
            .await;
        let resume = server
            .mock("POST", format!("{}/action", GROUP_PATH).as_str())
            .match_body(Matcher::Json(serde_json::json!({"action": "resume"})))
            .with_status(204)
            .create_async()
            .await;
        let _group = server
            .mock("GET", GROUP_PATH)
            .with_status(200)
            .with_body(group_body("INSERVICE"))
            .create_async()
            .await;
        let _instances = server
            .mock("GET", INSTANCES_PATH)
            .with_status(200)
            .with_body(instances_body(&[]))
            .create_async()
            .await;
        let _tags = server
            .mock("GET", "/autoscaling-api/v1/project-1/scaling_group_tag/asg-1/tags")
            .with_status(200)
            .with_body(r#"{"tags": []}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let instance = reconciler()
            .create(&Context::new(), &client, &config())
            .await
            .unwrap();

        assert_eq!(instance.id, "asg-1");
        assert_eq!(instance.attributes.get_bool("enable").unwrap(), Some(true));
        assert_eq!(
            instance.attributes.get_int("desire_instance_number").unwrap(),
            Some(0)
        );
        assert_eq!(
            instance.attributes.get_blocks("networks").unwrap()[0]
                .get_str("id")
                .unwrap(),
            Some("subnet-1")
        );
        create.assert_async().await;
        resume.assert_async().await;
    }

    fn group_body_with_api_defaults() -> String {
        let mut body: serde_json::Value = serde_json::from_str(&group_body("INSERVICE")).unwrap();
        let group = &mut body["scaling_group"];
        group["scaling_configuration_id"] = serde_json::json!("config-1");
        group["instance_terminate_policy"] = serde_json::json!("OLD_CONFIG_OLD_INSTANCE");
        group["delete_publicip"] = serde_json::json!(false);
        group["health_periodic_audit_method"] = serde_json::json!("NOVA_AUDIT");
        body.to_string()
    }

    #[tokio::test]
    async fn api_defaults_plan_no_changes_after_create() {
        let mut server = Server::new_async().await;
        let _create = server
            .mock("POST", "/autoscaling-api/v1/project-1/scaling_group")
            .with_status(200)
            .with_body(r#"{"scaling_group_id": "asg-1"}"#)
            .create_async()
            .await;
        let _resume = server
            .mock("POST", format!("{}/action", GROUP_PATH).as_str())
            .with_status(204)
            .create_async()
            .await;
        let _group = server
            .mock("GET", GROUP_PATH)
            .with_status(200)
            .with_body(group_body_with_api_defaults())
            .create_async()
            .await;
        let _instances = server
            .mock("GET", INSTANCES_PATH)
            .with_status(200)
            .with_body(instances_body(&[]))
            .create_async()
            .await;
        let _tags = server
            .mock("GET", "/autoscaling-api/v1/project-1/scaling_group_tag/asg-1/tags")
            .with_status(200)
            .with_body(r#"{"tags": []}"#)
            .create_async()
            .await;

        let config = AttributeBag::new()
            .with("scaling_group_name", "web")
            .with("vpc_id", "vpc-1")
            .with("max_instance_number", 2i64)
            .with(
                "networks",
                Value::blocks(vec![AttributeBag::new().with("id", "subnet-1")]),
            );
        let client = create_test_client(&server.url());
        let instance = reconciler()
            .create(&Context::new(), &client, &config)
            .await
            .unwrap();

        assert_eq!(
            instance.attributes.get_str("health_periodic_audit_method").unwrap(),
            Some("NOVA_AUDIT")
        );
        let plan = reconciler().plan(Some(&instance), &config).unwrap();
        assert_eq!(plan.action, PlanAction::NoOp, "changed: {:?}", plan.changed);

        // the reported audit method is accepted back as configuration
        let imported = reconciler()
            .import(&Context::new(), &client, "asg-1")
            .await
            .unwrap();
        let pinned = config.with("health_periodic_audit_method", "NOVA_AUDIT");
        let plan = reconciler().plan(Some(&imported), &pinned).unwrap();
        assert_eq!(plan.action, PlanAction::NoOp, "changed: {:?}", plan.changed);
    }

    #[tokio::test]
    async fn desire_outside_bounds_is_rejected_before_any_call() {
        let server = Server::new_async().await;
        let client = create_test_client(&server.url());

        let err = reconciler()
            .create(
                &Context::new(),
                &client,
                &config().with("desire_instance_number", 5i64),
            )
            .await
            .unwrap_err();

        match err {
            ReconcileError::Validation(diags) => {
                assert_eq!(diags.errors.len(), 1);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn delete_refuses_groups_with_busy_instances() {
        let mut server = Server::new_async().await;
        let _instances = server
            .mock("GET", INSTANCES_PATH)
            .with_status(200)
            .with_body(instances_body(&["INSERVICE", "PENDING"]))
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", Matcher::Regex(r"^/autoscaling-api/.*".to_string()))
            .expect(0)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let instance = ResourceInstance::new("hwcloud_as_group", "asg-1", config());
        let err = reconciler()
            .delete(&Context::new(), &client, &instance)
            .await
            .unwrap_err();

        match err {
            ReconcileError::Precondition(message) => assert!(message.contains("i-1")),
            other => panic!("expected precondition error, got {:?}", other),
        }
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn delete_of_missing_group_succeeds() {
        let mut server = Server::new_async().await;
        let _instances = server
            .mock("GET", INSTANCES_PATH)
            .with_status(404)
            .with_body(r#"{"error": {"code": "AS.2007", "message": "scaling group not found"}}"#)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", Matcher::Regex(r"^/autoscaling-api/.*".to_string()))
            .expect(0)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let instance = ResourceInstance::new("hwcloud_as_group", "asg-1", config());
        reconciler()
            .delete(&Context::new(), &client, &instance)
            .await
            .unwrap();
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn forced_delete_of_missing_group_succeeds() {
        let mut server = Server::new_async().await;
        let delete = server
            .mock("DELETE", format!("{}?force_delete=yes", GROUP_PATH).as_str())
            .with_status(404)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let instance = ResourceInstance::new(
            "hwcloud_as_group",
            "asg-1",
            config().with("force_delete", true),
        );
        reconciler()
            .delete(&Context::new(), &client, &instance)
            .await
            .unwrap();
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn delete_drains_instances_first() {
        let mut server = Server::new_async().await;
        let listed = Arc::new(AtomicUsize::new(0));
        let counter = listed.clone();
        let _instances = server
            .mock("GET", INSTANCES_PATH)
            .with_status(200)
            .with_body_from_request(move |_| {
                let states: &[&str] = match counter.fetch_add(1, Ordering::SeqCst) {
                    0 => &["INSERVICE", "INSERVICE"],
                    1 => &["REMOVING"],
                    _ => &[],
                };
                instances_body(states).into_bytes()
            })
            .create_async()
            .await;
        let drain = server
            .mock("PUT", GROUP_PATH)
            .match_body(Matcher::Json(serde_json::json!({
                "desire_instance_number": 0,
                "min_instance_number": 0
            })))
            .with_status(200)
            .with_body(r#"{"scaling_group_id": "asg-1"}"#)
            .create_async()
            .await;
        let remove = server
            .mock(
                "POST",
                "/autoscaling-api/v1/project-1/scaling_group_instance/asg-1/action",
            )
            .match_body(Matcher::Json(serde_json::json!({
                "action": "REMOVE",
                "instances_id": ["i-0", "i-1"],
                "instance_delete": "yes"
            })))
            .with_status(204)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", format!("{}?force_delete=no", GROUP_PATH).as_str())
            .with_status(204)
            .create_async()
            .await;
        let _gone = server
            .mock("GET", GROUP_PATH)
            .with_status(404)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let instance = ResourceInstance::new("hwcloud_as_group", "asg-1", config());
        reconciler()
            .delete(&Context::new(), &client, &instance)
            .await
            .unwrap();

        drain.assert_async().await;
        remove.assert_async().await;
        delete.assert_async().await;
        assert_eq!(listed.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn bounds_follow_the_new_configuration() {
        assert!(AsGroupResource::check_instance_bounds(&config()).is_ok());
        assert!(AsGroupResource::check_instance_bounds(
            &config()
                .with("min_instance_number", 3i64)
                .with("desire_instance_number", Value::Null)
        )
        .is_err());
    }
}
