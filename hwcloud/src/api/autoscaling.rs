//! Auto Scaling group API implementation

use super::common::{tags_to_map, ApiQueryParams, TagAction, TagsResponse};
use super::{ApiResult, Client};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const SERVICE: &str = "as";

/// Largest number of instances one batch action accepts
pub const INSTANCE_BATCH_SIZE: usize = 10;

/// Reference to a subnet or security group by ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScalingGroup {
    pub scaling_group_id: String,
    pub scaling_group_name: String,
    /// INSERVICE, PAUSED, ERROR or DELETING
    pub scaling_group_status: String,
    #[serde(default)]
    pub scaling_configuration_id: Option<String>,
    #[serde(default)]
    pub desire_instance_number: Option<i64>,
    #[serde(default)]
    pub min_instance_number: Option<i64>,
    #[serde(default)]
    pub max_instance_number: Option<i64>,
    #[serde(default)]
    pub cool_down_time: Option<i64>,
    pub vpc_id: String,
    #[serde(default)]
    pub networks: Vec<ResourceRef>,
    #[serde(default)]
    pub security_groups: Vec<ResourceRef>,
    #[serde(default)]
    pub available_zones: Vec<String>,
    #[serde(default)]
    pub health_periodic_audit_method: Option<String>,
    #[serde(default)]
    pub instance_terminate_policy: Option<String>,
    #[serde(default)]
    pub delete_publicip: Option<bool>,
    #[serde(default)]
    pub current_instance_number: Option<i64>,
}

/// Request body for creating scaling groups
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateScalingGroupRequest {
    pub scaling_group_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaling_configuration_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desire_instance_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_instance_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_instance_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cool_down_time: Option<i64>,
    pub vpc_id: String,
    pub networks: Vec<ResourceRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<ResourceRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_zones: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_periodic_audit_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_terminate_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_publicip: Option<bool>,
}

/// Request body for updating scaling groups
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateScalingGroupRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaling_group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaling_configuration_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desire_instance_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_instance_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_instance_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cool_down_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub networks: Option<Vec<ResourceRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_groups: Option<Vec<ResourceRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_zones: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_periodic_audit_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_terminate_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_publicip: Option<bool>,
}

impl UpdateScalingGroupRequest {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScalingGroupInstance {
    pub instance_id: String,
    #[serde(default)]
    pub instance_name: String,
    /// INSERVICE, PENDING, REMOVING, ...
    pub life_cycle_state: String,
}

#[derive(Deserialize)]
struct CreateScalingGroupResponse {
    scaling_group_id: String,
}

#[derive(Deserialize)]
struct ScalingGroupResponse {
    scaling_group: ScalingGroup,
}

#[derive(Deserialize)]
struct InstanceListResponse {
    #[serde(default)]
    scaling_group_instances: Vec<ScalingGroupInstance>,
}

#[derive(Serialize)]
struct GroupAction {
    action: &'static str,
}

#[derive(Serialize)]
struct InstanceBatchAction<'a> {
    action: &'static str,
    instances_id: &'a [String],
    instance_delete: &'static str,
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Auto Scaling API for scaling group operations
pub struct AutoscalingApi<'a> {
    client: &'a Client,
}

impl<'a> AutoscalingApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn base_path(&self) -> String {
        format!("/autoscaling-api/v1/{}", self.client.project_id())
    }

    fn group_path(&self, id: &str) -> String {
        format!("{}/scaling_group/{}", self.base_path(), id)
    }

    /// GET /autoscaling-api/v1/{project_id}/scaling_group/{id}
    pub async fn get(&self, id: &str) -> ApiResult<ScalingGroup> {
        let response: ScalingGroupResponse =
            self.client.get(SERVICE, &self.group_path(id)).await?;
        Ok(response.scaling_group)
    }

    /// POST /autoscaling-api/v1/{project_id}/scaling_group, returns the new group ID
    pub async fn create(&self, request: &CreateScalingGroupRequest) -> ApiResult<String> {
        let path = format!("{}/scaling_group", self.base_path());
        let response: CreateScalingGroupResponse =
            self.client.post(SERVICE, &path, request).await?;
        Ok(response.scaling_group_id)
    }

    /// PUT /autoscaling-api/v1/{project_id}/scaling_group/{id}
    pub async fn update(&self, id: &str, request: &UpdateScalingGroupRequest) -> ApiResult<()> {
        self.client
            .put::<IgnoredAny, _>(SERVICE, &self.group_path(id), request)
            .await
            .map(|_| ())
    }

    /// POST .../scaling_group/{id}/action with `resume`
    pub async fn resume(&self, id: &str) -> ApiResult<()> {
        self.group_action(id, "resume").await
    }

    /// POST .../scaling_group/{id}/action with `pause`
    pub async fn pause(&self, id: &str) -> ApiResult<()> {
        self.group_action(id, "pause").await
    }

    async fn group_action(&self, id: &str, action: &'static str) -> ApiResult<()> {
        let path = format!("{}/action", self.group_path(id));
        self.client
            .post::<IgnoredAny, _>(SERVICE, &path, &GroupAction { action })
            .await
            .map(|_| ())
    }

    /// DELETE .../scaling_group/{id}?force_delete=yes|no
    pub async fn delete(&self, id: &str, force: bool) -> ApiResult<()> {
        let params = ApiQueryParams::new().add("force_delete", yes_no(force));
        let path = format!("{}{}", self.group_path(id), params.to_query_string());
        self.client
            .delete::<IgnoredAny>(SERVICE, &path)
            .await
            .map(|_| ())
    }

    /// GET .../scaling_group_instance/{id}/list
    pub async fn instances(&self, id: &str) -> ApiResult<Vec<ScalingGroupInstance>> {
        let path = format!("{}/scaling_group_instance/{}/list", self.base_path(), id);
        let response: InstanceListResponse = self.client.get(SERVICE, &path).await?;
        Ok(response.scaling_group_instances)
    }

    /// POST .../scaling_group_instance/{id}/action with `REMOVE`, one call per
    /// batch of [`INSTANCE_BATCH_SIZE`]
    pub async fn remove_instances(
        &self,
        id: &str,
        instance_ids: &[String],
        delete_instances: bool,
    ) -> ApiResult<()> {
        let path = format!("{}/scaling_group_instance/{}/action", self.base_path(), id);
        for batch in instance_ids.chunks(INSTANCE_BATCH_SIZE) {
            let action = InstanceBatchAction {
                action: "REMOVE",
                instances_id: batch,
                instance_delete: yes_no(delete_instances),
            };
            self.client
                .post::<IgnoredAny, _>(SERVICE, &path, &action)
                .await?;
        }
        Ok(())
    }

    fn tags_path(&self, id: &str) -> String {
        format!("{}/scaling_group_tag/{}/tags", self.base_path(), id)
    }

    pub async fn tags(&self, id: &str) -> ApiResult<BTreeMap<String, String>> {
        let response: TagsResponse = self.client.get(SERVICE, &self.tags_path(id)).await?;
        Ok(tags_to_map(response.tags))
    }

    pub async fn add_tags(&self, id: &str, tags: &BTreeMap<String, String>) -> ApiResult<()> {
        self.tag_action(id, &TagAction::create(tags)).await
    }

    pub async fn remove_tags(&self, id: &str, tags: &BTreeMap<String, String>) -> ApiResult<()> {
        self.tag_action(id, &TagAction::delete(tags)).await
    }

    async fn tag_action(&self, id: &str, action: &TagAction) -> ApiResult<()> {
        let path = format!("{}/action", self.tags_path(id));
        self.client
            .post::<IgnoredAny, _>(SERVICE, &path, action)
            .await
            .map(|_| ())
    }
}
