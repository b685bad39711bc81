use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::RdsError;
use crate::tags::Tags;

/// What the broker knows about a database instance after a `Describe`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbInstanceDetails {
    pub identifier: String,
    pub arn: String,
    pub status: String,
    pub engine: String,
    pub engine_version: String,
    pub db_name: Option<String>,
    pub master_username: String,
    pub address: Option<String>,
    pub port: Option<i64>,
    pub parameter_group_name: Option<String>,
    pub parameter_apply_status: Option<String>,
    pub pending_modifications: bool,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DbSnapshotDetails {
    pub identifier: String,
    pub arn: String,
    pub instance_identifier: String,
    pub create_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbParameterGroupDetails {
    pub name: String,
    pub family: String,
}

/// Create-time shape handed to the production client, which maps it onto the
/// fluent SDK builder field by field. `None` fields are left unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateInstanceInput {
    pub engine: String,
    pub engine_version: Option<String>,
    pub db_instance_class: Option<String>,
    pub db_name: Option<String>,
    pub master_username: Option<String>,
    pub master_user_password: Option<String>,
    pub allocated_storage: Option<i32>,
    pub auto_minor_version_upgrade: Option<bool>,
    pub availability_zone: Option<String>,
    pub backup_retention_period: Option<i32>,
    pub character_set_name: Option<String>,
    pub copy_tags_to_snapshot: Option<bool>,
    pub db_parameter_group_name: Option<String>,
    pub db_subnet_group_name: Option<String>,
    pub license_model: Option<String>,
    pub multi_az: Option<bool>,
    pub option_group_name: Option<String>,
    pub port: Option<i32>,
    pub preferred_backup_window: Option<String>,
    pub preferred_maintenance_window: Option<String>,
    pub publicly_accessible: Option<bool>,
    pub storage_encrypted: Option<bool>,
    pub kms_key_id: Option<String>,
    pub storage_type: Option<String>,
    pub iops: Option<i32>,
    pub vpc_security_group_ids: Option<Vec<String>>,
    pub tags: Tags,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoreFromSnapshotInput {
    pub snapshot_identifier: String,
    pub engine: String,
    pub db_instance_class: Option<String>,
    pub auto_minor_version_upgrade: Option<bool>,
    pub availability_zone: Option<String>,
    pub copy_tags_to_snapshot: Option<bool>,
    pub db_parameter_group_name: Option<String>,
    pub db_subnet_group_name: Option<String>,
    pub license_model: Option<String>,
    pub multi_az: Option<bool>,
    pub option_group_name: Option<String>,
    pub publicly_accessible: Option<bool>,
    pub storage_type: Option<String>,
    pub iops: Option<i32>,
    pub vpc_security_group_ids: Option<Vec<String>>,
    pub tags: Tags,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoreToPointInTimeInput {
    pub source_instance_identifier: String,
    pub restore_time: Option<DateTime<Utc>>,
    pub engine: String,
    pub db_instance_class: Option<String>,
    pub auto_minor_version_upgrade: Option<bool>,
    pub availability_zone: Option<String>,
    pub copy_tags_to_snapshot: Option<bool>,
    pub db_parameter_group_name: Option<String>,
    pub db_subnet_group_name: Option<String>,
    pub license_model: Option<String>,
    pub multi_az: Option<bool>,
    pub option_group_name: Option<String>,
    pub publicly_accessible: Option<bool>,
    pub storage_type: Option<String>,
    pub iops: Option<i32>,
    pub vpc_security_group_ids: Option<Vec<String>>,
    pub tags: Tags,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModifyInstanceInput {
    pub apply_immediately: bool,
    pub allow_major_version_upgrade: Option<bool>,
    pub db_instance_class: Option<String>,
    pub engine_version: Option<String>,
    pub allocated_storage: Option<i32>,
    pub auto_minor_version_upgrade: Option<bool>,
    pub backup_retention_period: Option<i32>,
    pub copy_tags_to_snapshot: Option<bool>,
    pub db_parameter_group_name: Option<String>,
    pub master_user_password: Option<String>,
    pub multi_az: Option<bool>,
    pub option_group_name: Option<String>,
    pub preferred_backup_window: Option<String>,
    pub preferred_maintenance_window: Option<String>,
    pub storage_type: Option<String>,
    pub iops: Option<i32>,
    pub vpc_security_group_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMethod {
    Immediate,
    PendingReboot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSetting {
    pub name: String,
    pub value: String,
    pub apply_method: ApplyMethod,
}

impl ParameterSetting {
    pub fn new(name: &str, value: &str, apply_method: ApplyMethod) -> Self {
        ParameterSetting {
            name: name.to_string(),
            value: value.to_string(),
            apply_method,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateParameterGroupInput {
    pub name: String,
    pub family: String,
    pub description: String,
    pub tags: Tags,
}

/// The RDS control-plane surface the broker orchestrates against. The
/// production implementation is [`crate::AwsRdsClient`]; tests substitute a
/// recording mock.
#[async_trait]
pub trait RdsInstanceClient: Send + Sync {
    async fn create(&self, identifier: &str, input: CreateInstanceInput) -> Result<(), RdsError>;

    async fn restore_from_snapshot(&self, identifier: &str, input: RestoreFromSnapshotInput) -> Result<(), RdsError>;

    async fn restore_to_point_in_time(&self, identifier: &str, input: RestoreToPointInTimeInput)
    -> Result<(), RdsError>;

    async fn modify(&self, identifier: &str, input: ModifyInstanceInput) -> Result<(), RdsError>;

    async fn reboot(&self, identifier: &str, force_failover: Option<bool>) -> Result<(), RdsError>;

    async fn delete(&self, identifier: &str, skip_final_snapshot: bool) -> Result<(), RdsError>;

    async fn describe(&self, identifier: &str) -> Result<DbInstanceDetails, RdsError>;

    /// All instances carrying `key=value`, across the account and region.
    async fn describe_by_tag(&self, key: &str, value: &str) -> Result<Vec<DbInstanceDetails>, RdsError>;

    /// Snapshots of `instance_identifier`, most recent first.
    async fn describe_snapshots(&self, instance_identifier: &str) -> Result<Vec<DbSnapshotDetails>, RdsError>;

    async fn get_resource_tags(&self, arn: &str) -> Result<Tags, RdsError>;

    async fn add_tags_to_resource(&self, arn: &str, tags: &Tags) -> Result<(), RdsError>;

    async fn get_tag(&self, identifier: &str, key: &str) -> Result<Option<String>, RdsError>;

    async fn remove_tag(&self, identifier: &str, key: &str) -> Result<(), RdsError>;

    async fn get_parameter_group(&self, name: &str) -> Result<DbParameterGroupDetails, RdsError>;

    async fn create_parameter_group(&self, input: CreateParameterGroupInput) -> Result<(), RdsError>;

    async fn modify_parameter_group(&self, name: &str, parameters: &[ParameterSetting]) -> Result<(), RdsError>;

    /// Highest non-major upgrade target for `(engine, version)`, if any.
    async fn get_latest_minor_version(&self, engine: &str, version: &str) -> Result<Option<String>, RdsError>;

    /// Exact upgrade target with major version `target_major` reachable from
    /// `current_version`, if the engine offers one.
    async fn get_full_valid_target_version(
        &self,
        engine: &str,
        current_version: &str,
        target_major: u64,
    ) -> Result<Option<String>, RdsError>;
}
