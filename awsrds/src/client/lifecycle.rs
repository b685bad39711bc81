use crate::error::RdsError;
use crate::instance::{CreateInstanceInput, ModifyInstanceInput, RestoreFromSnapshotInput, RestoreToPointInTimeInput};

use super::AwsRdsClient;

impl AwsRdsClient {
    pub(crate) async fn do_create(&self, identifier: &str, input: CreateInstanceInput) -> Result<(), RdsError> {
        let mut request = self
            .client
            .create_db_instance()
            .db_instance_identifier(identifier)
            .engine(&input.engine);

        if let Some(engine_version) = &input.engine_version {
            request = request.engine_version(engine_version);
        }
        if let Some(class) = &input.db_instance_class {
            request = request.db_instance_class(class);
        }
        if let Some(db_name) = &input.db_name {
            request = request.db_name(db_name);
        }
        if let Some(username) = &input.master_username {
            request = request.master_username(username);
        }
        if let Some(password) = &input.master_user_password {
            request = request.master_user_password(password);
        }
        if let Some(storage) = input.allocated_storage {
            request = request.allocated_storage(storage);
        }
        if let Some(auto_minor) = input.auto_minor_version_upgrade {
            request = request.auto_minor_version_upgrade(auto_minor);
        }
        if let Some(zone) = &input.availability_zone {
            request = request.availability_zone(zone);
        }
        if let Some(retention) = input.backup_retention_period {
            request = request.backup_retention_period(retention);
        }
        if let Some(charset) = &input.character_set_name {
            request = request.character_set_name(charset);
        }
        if let Some(copy_tags) = input.copy_tags_to_snapshot {
            request = request.copy_tags_to_snapshot(copy_tags);
        }
        if let Some(parameter_group) = &input.db_parameter_group_name {
            request = request.db_parameter_group_name(parameter_group);
        }
        if let Some(subnet_group) = &input.db_subnet_group_name {
            request = request.db_subnet_group_name(subnet_group);
        }
        if let Some(license) = &input.license_model {
            request = request.license_model(license);
        }
        if let Some(multi_az) = input.multi_az {
            request = request.multi_az(multi_az);
        }
        if let Some(option_group) = &input.option_group_name {
            request = request.option_group_name(option_group);
        }
        if let Some(port) = input.port {
            request = request.port(port);
        }
        if let Some(backup_window) = &input.preferred_backup_window {
            request = request.preferred_backup_window(backup_window);
        }
        if let Some(maintenance_window) = &input.preferred_maintenance_window {
            request = request.preferred_maintenance_window(maintenance_window);
        }
        if let Some(public) = input.publicly_accessible {
            request = request.publicly_accessible(public);
        }
        if let Some(encrypted) = input.storage_encrypted {
            request = request.storage_encrypted(encrypted);
        }
        if let Some(kms_key_id) = &input.kms_key_id {
            request = request.kms_key_id(kms_key_id);
        }
        if let Some(storage_type) = &input.storage_type {
            request = request.storage_type(storage_type);
        }
        if let Some(iops) = input.iops {
            request = request.iops(iops);
        }
        if let Some(security_groups) = input.vpc_security_group_ids.clone() {
            request = request.set_vpc_security_group_ids(Some(security_groups));
        }
        request = request.set_tags(input.tags.clone().into());

        tracing::info!(identifier, engine = %input.engine, "creating db instance");
        if let Err(err) = request.send().await {
            return Err(RdsError::from_metadata(err.into_service_error()));
        }
        Ok(())
    }

    pub(crate) async fn do_restore_from_snapshot(
        &self,
        identifier: &str,
        input: RestoreFromSnapshotInput,
    ) -> Result<(), RdsError> {
        let mut request = self
            .client
            .restore_db_instance_from_db_snapshot()
            .db_instance_identifier(identifier)
            .db_snapshot_identifier(&input.snapshot_identifier)
            .engine(&input.engine);

        if let Some(class) = &input.db_instance_class {
            request = request.db_instance_class(class);
        }
        if let Some(auto_minor) = input.auto_minor_version_upgrade {
            request = request.auto_minor_version_upgrade(auto_minor);
        }
        if let Some(zone) = &input.availability_zone {
            request = request.availability_zone(zone);
        }
        if let Some(copy_tags) = input.copy_tags_to_snapshot {
            request = request.copy_tags_to_snapshot(copy_tags);
        }
        if let Some(parameter_group) = &input.db_parameter_group_name {
            request = request.db_parameter_group_name(parameter_group);
        }
        if let Some(subnet_group) = &input.db_subnet_group_name {
            request = request.db_subnet_group_name(subnet_group);
        }
        if let Some(license) = &input.license_model {
            request = request.license_model(license);
        }
        if let Some(multi_az) = input.multi_az {
            request = request.multi_az(multi_az);
        }
        if let Some(option_group) = &input.option_group_name {
            request = request.option_group_name(option_group);
        }
        if let Some(public) = input.publicly_accessible {
            request = request.publicly_accessible(public);
        }
        if let Some(storage_type) = &input.storage_type {
            request = request.storage_type(storage_type);
        }
        if let Some(iops) = input.iops {
            request = request.iops(iops);
        }
        if let Some(security_groups) = input.vpc_security_group_ids.clone() {
            request = request.set_vpc_security_group_ids(Some(security_groups));
        }
        request = request.set_tags(input.tags.clone().into());

        tracing::info!(identifier, snapshot = %input.snapshot_identifier, "restoring db instance from snapshot");
        if let Err(err) = request.send().await {
            let err = err.into_service_error();
            if err.is_db_snapshot_not_found_fault() {
                return Err(RdsError::InstanceNotFound);
            }
            return Err(RdsError::from_metadata(err));
        }
        Ok(())
    }

    pub(crate) async fn do_restore_to_point_in_time(
        &self,
        identifier: &str,
        input: RestoreToPointInTimeInput,
    ) -> Result<(), RdsError> {
        let mut request = self
            .client
            .restore_db_instance_to_point_in_time()
            .source_db_instance_identifier(&input.source_instance_identifier)
            .target_db_instance_identifier(identifier)
            .engine(&input.engine);

        match input.restore_time {
            Some(restore_time) => {
                request = request.restore_time(aws_smithy_types::DateTime::from_secs(restore_time.timestamp()));
            }
            None => {
                request = request.use_latest_restorable_time(true);
            }
        }

        if let Some(class) = &input.db_instance_class {
            request = request.db_instance_class(class);
        }
        if let Some(auto_minor) = input.auto_minor_version_upgrade {
            request = request.auto_minor_version_upgrade(auto_minor);
        }
        if let Some(zone) = &input.availability_zone {
            request = request.availability_zone(zone);
        }
        if let Some(copy_tags) = input.copy_tags_to_snapshot {
            request = request.copy_tags_to_snapshot(copy_tags);
        }
        if let Some(parameter_group) = &input.db_parameter_group_name {
            request = request.db_parameter_group_name(parameter_group);
        }
        if let Some(subnet_group) = &input.db_subnet_group_name {
            request = request.db_subnet_group_name(subnet_group);
        }
        if let Some(license) = &input.license_model {
            request = request.license_model(license);
        }
        if let Some(multi_az) = input.multi_az {
            request = request.multi_az(multi_az);
        }
        if let Some(option_group) = &input.option_group_name {
            request = request.option_group_name(option_group);
        }
        if let Some(public) = input.publicly_accessible {
            request = request.publicly_accessible(public);
        }
        if let Some(storage_type) = &input.storage_type {
            request = request.storage_type(storage_type);
        }
        if let Some(iops) = input.iops {
            request = request.iops(iops);
        }
        if let Some(security_groups) = input.vpc_security_group_ids.clone() {
            request = request.set_vpc_security_group_ids(Some(security_groups));
        }
        request = request.set_tags(input.tags.clone().into());

        tracing::info!(identifier, source = %input.source_instance_identifier, "restoring db instance to point in time");
        if let Err(err) = request.send().await {
            let err = err.into_service_error();
            if err.is_db_instance_not_found_fault() {
                return Err(RdsError::InstanceNotFound);
            }
            return Err(RdsError::from_metadata(err));
        }
        Ok(())
    }

    pub(crate) async fn do_modify(&self, identifier: &str, input: ModifyInstanceInput) -> Result<(), RdsError> {
        let mut request = self
            .client
            .modify_db_instance()
            .db_instance_identifier(identifier)
            .apply_immediately(input.apply_immediately);

        if let Some(allow_major) = input.allow_major_version_upgrade {
            request = request.allow_major_version_upgrade(allow_major);
        }
        if let Some(class) = &input.db_instance_class {
            request = request.db_instance_class(class);
        }
        if let Some(engine_version) = &input.engine_version {
            request = request.engine_version(engine_version);
        }
        if let Some(storage) = input.allocated_storage {
            request = request.allocated_storage(storage);
        }
        if let Some(auto_minor) = input.auto_minor_version_upgrade {
            request = request.auto_minor_version_upgrade(auto_minor);
        }
        if let Some(retention) = input.backup_retention_period {
            request = request.backup_retention_period(retention);
        }
        if let Some(copy_tags) = input.copy_tags_to_snapshot {
            request = request.copy_tags_to_snapshot(copy_tags);
        }
        if let Some(parameter_group) = &input.db_parameter_group_name {
            request = request.db_parameter_group_name(parameter_group);
        }
        if let Some(password) = &input.master_user_password {
            request = request.master_user_password(password);
        }
        if let Some(multi_az) = input.multi_az {
            request = request.multi_az(multi_az);
        }
        if let Some(option_group) = &input.option_group_name {
            request = request.option_group_name(option_group);
        }
        if let Some(backup_window) = &input.preferred_backup_window {
            request = request.preferred_backup_window(backup_window);
        }
        if let Some(maintenance_window) = &input.preferred_maintenance_window {
            request = request.preferred_maintenance_window(maintenance_window);
        }
        if let Some(storage_type) = &input.storage_type {
            request = request.storage_type(storage_type);
        }
        if let Some(iops) = input.iops {
            request = request.iops(iops);
        }
        if let Some(security_groups) = input.vpc_security_group_ids.clone() {
            request = request.set_vpc_security_group_ids(Some(security_groups));
        }

        tracing::info!(identifier, "modifying db instance");
        if let Err(err) = request.send().await {
            let err = err.into_service_error();
            if err.is_db_instance_not_found_fault() {
                return Err(RdsError::InstanceNotFound);
            }
            return Err(RdsError::from_metadata(err));
        }
        Ok(())
    }

    pub(crate) async fn do_reboot(&self, identifier: &str, force_failover: Option<bool>) -> Result<(), RdsError> {
        let mut request = self.client.reboot_db_instance().db_instance_identifier(identifier);
        if let Some(force) = force_failover {
            request = request.force_failover(force);
        }

        tracing::info!(identifier, "rebooting db instance");
        if let Err(err) = request.send().await {
            let err = err.into_service_error();
            if err.is_db_instance_not_found_fault() {
                return Err(RdsError::InstanceNotFound);
            }
            return Err(RdsError::from_metadata(err));
        }
        Ok(())
    }

    pub(crate) async fn do_delete(&self, identifier: &str, skip_final_snapshot: bool) -> Result<(), RdsError> {
        let mut request = self
            .client
            .delete_db_instance()
            .db_instance_identifier(identifier)
            .skip_final_snapshot(skip_final_snapshot);

        if !skip_final_snapshot {
            request = request.final_db_snapshot_identifier(format!("{identifier}-final-snapshot"));
        }

        tracing::info!(identifier, skip_final_snapshot, "deleting db instance");
        if let Err(err) = request.send().await {
            let err = err.into_service_error();
            if err.is_db_instance_not_found_fault() {
                return Err(RdsError::InstanceNotFound);
            }
            return Err(RdsError::from_metadata(err));
        }
        Ok(())
    }
}
