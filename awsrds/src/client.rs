use async_trait::async_trait;
use aws_config::SdkConfig;

use crate::error::RdsError;
use crate::instance::{
    CreateInstanceInput, CreateParameterGroupInput, DbInstanceDetails, DbParameterGroupDetails, DbSnapshotDetails,
    ModifyInstanceInput, ParameterSetting, RdsInstanceClient, RestoreFromSnapshotInput, RestoreToPointInTimeInput,
};
use crate::tags::Tags;

mod describe;
mod lifecycle;
mod parameter_groups;
mod resource_tags;
mod versions;

/// Production [`RdsInstanceClient`] backed by the AWS SDK.
pub struct AwsRdsClient {
    pub(crate) client: aws_sdk_rds::Client,
}

impl AwsRdsClient {
    pub fn new(config: &SdkConfig) -> Self {
        AwsRdsClient {
            client: aws_sdk_rds::Client::new(config),
        }
    }
}

#[async_trait]
impl RdsInstanceClient for AwsRdsClient {
    async fn create(&self, identifier: &str, input: CreateInstanceInput) -> Result<(), RdsError> {
        self.do_create(identifier, input).await
    }

    async fn restore_from_snapshot(&self, identifier: &str, input: RestoreFromSnapshotInput) -> Result<(), RdsError> {
        self.do_restore_from_snapshot(identifier, input).await
    }

    async fn restore_to_point_in_time(
        &self,
        identifier: &str,
        input: RestoreToPointInTimeInput,
    ) -> Result<(), RdsError> {
        self.do_restore_to_point_in_time(identifier, input).await
    }

    async fn modify(&self, identifier: &str, input: ModifyInstanceInput) -> Result<(), RdsError> {
        self.do_modify(identifier, input).await
    }

    async fn reboot(&self, identifier: &str, force_failover: Option<bool>) -> Result<(), RdsError> {
        self.do_reboot(identifier, force_failover).await
    }

    async fn delete(&self, identifier: &str, skip_final_snapshot: bool) -> Result<(), RdsError> {
        self.do_delete(identifier, skip_final_snapshot).await
    }

    async fn describe(&self, identifier: &str) -> Result<DbInstanceDetails, RdsError> {
        self.do_describe(identifier).await
    }

    async fn describe_by_tag(&self, key: &str, value: &str) -> Result<Vec<DbInstanceDetails>, RdsError> {
        self.do_describe_by_tag(key, value).await
    }

    async fn describe_snapshots(&self, instance_identifier: &str) -> Result<Vec<DbSnapshotDetails>, RdsError> {
        self.do_describe_snapshots(instance_identifier).await
    }

    async fn get_resource_tags(&self, arn: &str) -> Result<Tags, RdsError> {
        self.do_get_resource_tags(arn).await
    }

    async fn add_tags_to_resource(&self, arn: &str, tags: &Tags) -> Result<(), RdsError> {
        self.do_add_tags_to_resource(arn, tags).await
    }

    async fn get_tag(&self, identifier: &str, key: &str) -> Result<Option<String>, RdsError> {
        self.do_get_tag(identifier, key).await
    }

    async fn remove_tag(&self, identifier: &str, key: &str) -> Result<(), RdsError> {
        self.do_remove_tag(identifier, key).await
    }

    async fn get_parameter_group(&self, name: &str) -> Result<DbParameterGroupDetails, RdsError> {
        self.do_get_parameter_group(name).await
    }

    async fn create_parameter_group(&self, input: CreateParameterGroupInput) -> Result<(), RdsError> {
        self.do_create_parameter_group(input).await
    }

    async fn modify_parameter_group(&self, name: &str, parameters: &[ParameterSetting]) -> Result<(), RdsError> {
        self.do_modify_parameter_group(name, parameters).await
    }

    async fn get_latest_minor_version(&self, engine: &str, version: &str) -> Result<Option<String>, RdsError> {
        self.do_get_latest_minor_version(engine, version).await
    }

    async fn get_full_valid_target_version(
        &self,
        engine: &str,
        current_version: &str,
        target_major: u64,
    ) -> Result<Option<String>, RdsError> {
        self.do_get_full_valid_target_version(engine, current_version, target_major).await
    }
}
