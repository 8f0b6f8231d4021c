//! VPC API implementation

use super::common::{tags_to_map, TagAction, TagsResponse};
use super::{ApiResult, Client};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const SERVICE: &str = "vpc";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Vpc {
    pub id: String,
    pub name: String,
    pub cidr: String,
    #[serde(default)]
    pub description: String,
    pub status: String,
    #[serde(default)]
    pub enterprise_project_id: Option<String>,
}

/// Request body for creating VPCs
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateVpcRequest {
    pub name: String,
    pub cidr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enterprise_project_id: Option<String>,
}

/// Request body for updating VPCs
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateVpcRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Serialize)]
struct VpcBody<'a, T> {
    vpc: &'a T,
}

#[derive(Deserialize)]
struct VpcResponse {
    vpc: Vpc,
}

/// VPC API for VPC operations
pub struct VpcApi<'a> {
    client: &'a Client,
}

impl<'a> VpcApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn vpcs_path(&self) -> String {
        format!("/v1/{}/vpcs", self.client.project_id())
    }

    fn tags_path(&self, id: &str) -> String {
        format!("/v2.0/{}/vpcs/{}/tags", self.client.project_id(), id)
    }

    /// GET /v1/{project_id}/vpcs/{vpc_id}
    pub async fn get(&self, id: &str) -> ApiResult<Vpc> {
        let path = format!("{}/{}", self.vpcs_path(), id);
        let response: VpcResponse = self.client.get(SERVICE, &path).await?;
        Ok(response.vpc)
    }

    /// POST /v1/{project_id}/vpcs
    pub async fn create(&self, request: &CreateVpcRequest) -> ApiResult<Vpc> {
        let response: VpcResponse = self
            .client
            .post(SERVICE, &self.vpcs_path(), &VpcBody { vpc: request })
            .await?;
        Ok(response.vpc)
    }

    /// PUT /v1/{project_id}/vpcs/{vpc_id}
    pub async fn update(&self, id: &str, request: &UpdateVpcRequest) -> ApiResult<Vpc> {
        let path = format!("{}/{}", self.vpcs_path(), id);
        let response: VpcResponse = self
            .client
            .put(SERVICE, &path, &VpcBody { vpc: request })
            .await?;
        Ok(response.vpc)
    }

    /// DELETE /v1/{project_id}/vpcs/{vpc_id}
    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        let path = format!("{}/{}", self.vpcs_path(), id);
        self.client
            .delete::<IgnoredAny>(SERVICE, &path)
            .await
            .map(|_| ())
    }

    /// GET /v2.0/{project_id}/vpcs/{vpc_id}/tags
    pub async fn tags(&self, id: &str) -> ApiResult<BTreeMap<String, String>> {
        let response: TagsResponse = self.client.get(SERVICE, &self.tags_path(id)).await?;
        Ok(tags_to_map(response.tags))
    }

    /// POST /v2.0/{project_id}/vpcs/{vpc_id}/tags/action with `create`
    pub async fn add_tags(&self, id: &str, tags: &BTreeMap<String, String>) -> ApiResult<()> {
        self.tag_action(id, &TagAction::create(tags)).await
    }

    /// POST /v2.0/{project_id}/vpcs/{vpc_id}/tags/action with `delete`
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
