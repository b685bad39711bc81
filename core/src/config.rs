use std::time::Duration;

use aws_config::{BehaviorVersion, Region, SdkConfig, meta::region::RegionProviderChain, timeout::TimeoutConfig};

const OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the shared AWS SDK configuration used by every service client the
/// broker constructs. Falls back to the ambient provider chain when `region`
/// is empty.
pub async fn load_sdk_config(region: &str) -> SdkConfig {
    let region_provider = if region.is_empty() {
        RegionProviderChain::default_provider()
    } else {
        RegionProviderChain::first_try(Region::new(region.to_owned())).or_default_provider()
    };

    aws_config::defaults(BehaviorVersion::latest())
        .region(region_provider)
        .timeout_config(
            TimeoutConfig::builder()
                .connect_timeout(OPERATION_TIMEOUT)
                .operation_timeout(OPERATION_TIMEOUT)
                .operation_attempt_timeout(OPERATION_TIMEOUT)
                .read_timeout(OPERATION_TIMEOUT)
                .build(),
        )
        .load()
        .await
}
