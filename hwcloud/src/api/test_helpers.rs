//! Test helpers for the Huawei Cloud API

use tfreconcile::ProviderConfig;

pub const TEST_PROJECT: &str = "project-1";

/// Configuration with every service endpoint pointed at `url`
pub fn test_config(url: &str) -> ProviderConfig {
    ["vpc", "as", "cce", "ecs"]
        .iter()
        .fold(
            ProviderConfig::new("region-1", TEST_PROJECT, "test-token"),
            |config, service| config.with_endpoint(service, url),
        )
}

#[allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity
pub fn create_test_client(url: &str) -> super::Client {
    super::Client::new(&test_config(url)).unwrap()
}
