use hwcloud::api::Client;
use hwcloud::HwCloudProvider;
use mockito::{Matcher, Server, ServerGuard};
use std::collections::BTreeMap;
use std::sync::Arc;
use tfreconcile::{
    AttributeBag, Context, ManualClock, PlanAction, ProviderRegistry, ReconcileError, Value,
};

fn tags(pairs: &[(&str, &str)]) -> Value {
    let map: BTreeMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Value::string_map(&map)
}

async fn connect(server: &ServerGuard) -> (ProviderRegistry<Client>, Client) {
    let mut endpoints = BTreeMap::new();
    for service in ["vpc", "as", "cce", "ecs"] {
        endpoints.insert(service.to_string(), server.url());
    }
    let block = AttributeBag::new()
        .with("region", "cn-north-4")
        .with("project_id", "proj")
        .with("auth_token", "secret-token")
        .with("endpoints", Value::string_map(&endpoints));

    let (registry, client) = HwCloudProvider::new()
        .connect(Context::new(), &block)
        .await
        .unwrap();
    (registry.with_clock(Arc::new(ManualClock::new())), client)
}

fn vpc_body() -> String {
    serde_json::json!({
        "vpc": {
            "id": "vpc-1",
            "name": "main",
            "cidr": "10.0.0.0/16",
            "description": "",
            "status": "OK",
            "enterprise_project_id": "0"
        }
    })
    .to_string()
}

#[tokio::test(flavor = "multi_thread")]
async fn vpc_lifecycle_through_registry() {
    let mut server = Server::new_async().await;
    let (registry, client) = connect(&server).await;
    let vpcs = registry.reconciler("hwcloud_vpc").unwrap();
    let ctx = Context::new();

    let _create = server
        .mock("POST", "/v1/proj/vpcs")
        .match_header("x-auth-token", "secret-token")
        .with_status(200)
        .with_body(vpc_body())
        .create_async()
        .await;
    let _get = server
        .mock("GET", "/v1/proj/vpcs/vpc-1")
        .with_status(200)
        .with_body(vpc_body())
        .create_async()
        .await;
    let add_tags = server
        .mock("POST", "/v2.0/proj/vpcs/vpc-1/tags/action")
        .match_body(Matcher::Json(serde_json::json!({
            "action": "create",
            "tags": [{"key": "env", "value": "prod"}]
        })))
        .with_status(204)
        .create_async()
        .await;
    let tags_before = server
        .mock("GET", "/v2.0/proj/vpcs/vpc-1/tags")
        .with_status(200)
        .with_body(r#"{"tags": [{"key": "env", "value": "prod"}]}"#)
        .create_async()
        .await;

    let config = AttributeBag::new()
        .with("name", "main")
        .with("cidr", "10.0.0.0/16")
        .with("tags", tags(&[("env", "prod")]));
    let created = vpcs.create(&ctx, &client, &config).await.unwrap();
    assert_eq!(created.id, "vpc-1");
    assert_eq!(created.attributes.get_str("enterprise_project_id").unwrap(), Some("0"));
    add_tags.assert_async().await;

    // Re-applying the same configuration is a no-op
    let plan = vpcs.plan(Some(&created), &config).unwrap();
    assert_eq!(plan.action, PlanAction::NoOp);

    let new_config = config.clone().with("tags", tags(&[("team", "net")]));
    let plan = vpcs.plan(Some(&created), &new_config).unwrap();
    assert_eq!(plan.action, PlanAction::Update);
    assert_eq!(plan.changed, vec!["tags".to_string()]);

    let remove_tags = server
        .mock("POST", "/v2.0/proj/vpcs/vpc-1/tags/action")
        .match_body(Matcher::Json(serde_json::json!({
            "action": "delete",
            "tags": [{"key": "env", "value": "prod"}]
        })))
        .with_status(204)
        .create_async()
        .await;
    let add_team = server
        .mock("POST", "/v2.0/proj/vpcs/vpc-1/tags/action")
        .match_body(Matcher::Json(serde_json::json!({
            "action": "create",
            "tags": [{"key": "team", "value": "net"}]
        })))
        .with_status(204)
        .create_async()
        .await;
    tags_before.remove_async().await;
    let _tags_after = server
        .mock("GET", "/v2.0/proj/vpcs/vpc-1/tags")
        .with_status(200)
        .with_body(r#"{"tags": [{"key": "team", "value": "net"}]}"#)
        .create_async()
        .await;

    let updated = vpcs
        .update(&ctx, &client, &created, &new_config)
        .await
        .unwrap();
    remove_tags.assert_async().await;
    add_team.assert_async().await;
    assert_eq!(
        updated.attributes.get_string_map("tags").unwrap().get("team").map(String::as_str),
        Some("net")
    );

    let imported = vpcs.import(&ctx, &client, "vpc-1").await.unwrap();
    assert_eq!(imported.attributes.get_str("cidr").unwrap(), Some("10.0.0.0/16"));
    assert_eq!(imported.attributes.get_str("id").unwrap(), Some("vpc-1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn import_of_missing_vpc_fails() {
    let mut server = Server::new_async().await;
    let (registry, client) = connect(&server).await;
    let _missing = server
        .mock("GET", "/v1/proj/vpcs/vpc-404")
        .with_status(404)
        .with_body(r#"{"error_code":"VPC.0202","error_msg":"Query resource by id vpc-404 fail."}"#)
        .create_async()
        .await;

    let err = registry
        .reconciler("hwcloud_vpc")
        .unwrap()
        .import(&Context::new(), &client, "vpc-404")
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::ImportNotFound { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn availability_zones_through_registry() {
    let mut server = Server::new_async().await;
    let (registry, client) = connect(&server).await;
    let _zones = server
        .mock("GET", "/v2.1/proj/os-availability-zone")
        .with_status(200)
        .with_body(
            r#"{"availabilityZoneInfo": [
                {"zoneName": "cn-north-4b", "zoneState": {"available": true}},
                {"zoneName": "cn-north-4a", "zoneState": {"available": true}}
            ]}"#,
        )
        .create_async()
        .await;

    let state = registry
        .read_data_source(
            Context::new(),
            &client,
            "hwcloud_availability_zones",
            &AttributeBag::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        state.get_string_list("names").unwrap(),
        vec!["cn-north-4a".to_string(), "cn-north-4b".to_string()]
    );
    assert!(state.get_str("id").unwrap().is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn connect_rejects_bad_endpoint() {
    let mut endpoints = BTreeMap::new();
    endpoints.insert("vpc".to_string(), "::not-a-url".to_string());
    let block = AttributeBag::new()
        .with("region", "cn-north-4")
        .with("project_id", "proj")
        .with("auth_token", "secret-token")
        .with("endpoints", Value::string_map(&endpoints));

    let err = HwCloudProvider::new()
        .connect(Context::new(), &block)
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Config(_)));
}
