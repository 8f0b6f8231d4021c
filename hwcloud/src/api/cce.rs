//! CCE add-on API implementation

use super::common::ApiQueryParams;
use super::{ApiResult, Client};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

const SERVICE: &str = "cce";
const ADDONS_PATH: &str = "/api/v3/addons";

/// Template values handed to the add-on installer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddonValues {
    #[serde(default)]
    pub basic: Map<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub custom: Map<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor: Option<JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonSpec {
    #[serde(rename = "clusterID")]
    pub cluster_id: String,
    pub version: String,
    pub addon_template_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub values: AddonValues,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AddonMetadata {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AddonStatus {
    /// installing, running, available, abnormal, installFailed, deleting, ...
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "Reason")]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Addon {
    pub metadata: AddonMetadata,
    pub spec: AddonSpec,
    #[serde(default)]
    pub status: AddonStatus,
}

impl Addon {
    /// Reason and message of a failed installation, if the API gave any
    pub fn failure_detail(&self) -> Option<String> {
        let parts: Vec<&str> = [self.status.reason.as_str(), self.status.message.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(": "))
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestMetadata {
    annotations: BTreeMap<String, String>,
}

/// Request body for installing add-ons
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAddonRequest {
    kind: &'static str,
    api_version: &'static str,
    metadata: RequestMetadata,
    spec: AddonSpec,
}

impl CreateAddonRequest {
    pub fn install(spec: AddonSpec) -> Self {
        let annotations = [("addon.install/type".to_string(), "install".to_string())]
            .into_iter()
            .collect();
        Self {
            kind: "Addon",
            api_version: "v3",
            metadata: RequestMetadata { annotations },
            spec,
        }
    }
}

/// CCE API for add-on operations
pub struct CceApi<'a> {
    client: &'a Client,
}

impl<'a> CceApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn addon_path(id: &str, cluster_id: &str) -> String {
        let params = ApiQueryParams::new().add("cluster_id", cluster_id);
        format!("{}/{}{}", ADDONS_PATH, id, params.to_query_string())
    }

    /// POST /api/v3/addons
    pub async fn create(&self, request: &CreateAddonRequest) -> ApiResult<Addon> {
        self.client.post(SERVICE, ADDONS_PATH, request).await
    }

    /// GET /api/v3/addons/{id}?cluster_id={cluster_id}
    pub async fn get(&self, cluster_id: &str, id: &str) -> ApiResult<Addon> {
        self.client
            .get(SERVICE, &Self::addon_path(id, cluster_id))
            .await
    }

    /// DELETE /api/v3/addons/{id}?cluster_id={cluster_id}
    pub async fn delete(&self, cluster_id: &str, id: &str) -> ApiResult<()> {
        self.client
            .delete::<IgnoredAny>(SERVICE, &Self::addon_path(id, cluster_id))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    const ADDON_BODY: &str = r#"{
        "kind": "Addon",
        "metadata": {"uid": "addon-1", "name": "coredns"},
        "spec": {
            "clusterID": "cluster-1",
            "version": "1.17.4",
            "addonTemplateName": "coredns",
            "description": "DNS server",
            "values": {"basic": {"swr_addr": "swr.example.com"}}
        },
        "status": {"status": "installing"}
    }"#;

    #[tokio::test]
    async fn install_request_carries_kind_and_annotation() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v3/addons")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "kind": "Addon",
                "apiVersion": "v3",
                "metadata": {"annotations": {"addon.install/type": "install"}},
                "spec": {"clusterID": "cluster-1", "addonTemplateName": "coredns"}
            })))
            .with_status(201)
            .with_body(ADDON_BODY)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let addon = client
            .cce()
            .create(&CreateAddonRequest::install(AddonSpec {
                cluster_id: "cluster-1".to_string(),
                version: "1.17.4".to_string(),
                addon_template_name: "coredns".to_string(),
                description: None,
                values: AddonValues::default(),
            }))
            .await
            .unwrap();

        assert_eq!(addon.metadata.uid, "addon-1");
        assert_eq!(addon.status.status, "installing");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn get_scopes_by_cluster() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v3/addons/addon-1?cluster_id=cluster-1")
            .with_status(200)
            .with_body(ADDON_BODY)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let addon = client.cce().get("cluster-1", "addon-1").await.unwrap();

        assert_eq!(addon.spec.description.as_deref(), Some("DNS server"));
        assert_eq!(
            addon.spec.values.basic.get("swr_addr"),
            Some(&JsonValue::from("swr.example.com"))
        );
        mock.assert_async().await;
    }

    #[test]
    fn failure_detail_joins_reason_and_message() {
        let mut addon: Addon = serde_json::from_str(ADDON_BODY).unwrap();
        assert_eq!(addon.failure_detail(), None);

        addon.status.reason = "Install failed".to_string();
        addon.status.message = "image pull error".to_string();
        assert_eq!(
            addon.failure_detail().as_deref(),
            Some("Install failed: image pull error")
        );
    }
}
