//! Lists the availability zones of a region
//!
//! Credentials come from HW_REGION_NAME, HW_PROJECT_ID and HW_AUTH_TOKEN.
//! Set TF_LOG=DEBUG to see each request.

use hwcloud::HwCloudProvider;
use tfreconcile::{init_logging, AttributeBag, Context};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_logging();

    let (registry, client) = HwCloudProvider::new()
        .connect(Context::new(), &AttributeBag::new())
        .await?;

    let zones = registry
        .read_data_source(
            Context::new(),
            &client,
            "hwcloud_availability_zones",
            &AttributeBag::new(),
        )
        .await?;

    for name in zones.get_string_list("names")? {
        println!("{}", name);
    }
    Ok(())
}
