//! ECS API implementation (availability zones)

use super::{ApiResult, Client};
use serde::Deserialize;

const SERVICE: &str = "ecs";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityZone {
    pub zone_name: String,
    pub zone_state: ZoneState,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ZoneState {
    pub available: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityZoneList {
    #[serde(default)]
    availability_zone_info: Vec<AvailabilityZone>,
}

pub struct EcsApi<'a> {
    client: &'a Client,
}

impl<'a> EcsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /v2.1/{project_id}/os-availability-zone
    pub async fn availability_zones(&self) -> ApiResult<Vec<AvailabilityZone>> {
        let path = format!("/v2.1/{}/os-availability-zone", self.client.project_id());
        let response: AvailabilityZoneList = self.client.get(SERVICE, &path).await?;
        Ok(response.availability_zone_info)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity
mod tests {
    use crate::api::test_helpers::create_test_client;
    use mockito::Server;

    #[tokio::test]
    async fn lists_zones_with_state() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/v2.1/project-1/os-availability-zone")
            .with_status(200)
            .with_body(
                r#"{"availabilityZoneInfo": [
                    {"zoneName": "az-2", "zoneState": {"available": true}, "hosts": null},
                    {"zoneName": "az-1", "zoneState": {"available": false}, "hosts": null}
                ]}"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let zones = client.ecs().availability_zones().await.unwrap();

        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].zone_name, "az-2");
        assert!(zones[0].zone_state.available);
        assert!(!zones[1].zone_state.available);
    }
}
