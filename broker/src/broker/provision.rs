use rds_broker_awsrds::tags::build_instance_tags;
use rds_broker_awsrds::{Action, CreateInstanceInput, RestoreFromSnapshotInput, RestoreToPointInTimeInput, Tags};

use crate::api::{ProvisionDetails, ProvisionedServiceSpec};
use crate::broker::merge_extensions;
use crate::catalog::{Engine, ServicePlan};
use crate::errors::BrokerError;
use crate::naming;
use crate::params::ProvisionParameters;

use super::RdsBroker;

impl RdsBroker {
    pub(crate) async fn do_provision(
        &self,
        instance_id: &str,
        details: ProvisionDetails,
        accepts_incomplete: bool,
    ) -> Result<ProvisionedServiceSpec, BrokerError> {
        if !accepts_incomplete {
            return Err(BrokerError::AsyncRequired);
        }

        let params = self.provision_parameters(&details)?;
        self.config
            .catalog
            .find_service(&details.service_id)
            .ok_or_else(|| BrokerError::ServiceNotFound(details.service_id.clone()))?;
        let (_, plan) = self.find_service_plan(&details.plan_id)?;
        let engine = plan
            .engine_kind()
            .ok_or_else(|| BrokerError::InvalidParameters(format!("plan '{}' has an unsupported engine", plan.id)))?;

        let extensions = requested_extensions(engine, plan, &params)?;

        tracing::info!(instance_id, plan_id = %plan.id, "provisioning service instance");

        if let Some(source) = params.restore_from_latest_snapshot_of.clone() {
            self.provision_from_snapshot(instance_id, &details, plan, engine, &params, extensions, &source)
                .await?;
        } else if let Some(source) = params.restore_from_point_in_time_of.clone() {
            self.provision_to_point_in_time(instance_id, &details, plan, engine, &params, extensions, &source)
                .await?;
        } else {
            self.provision_new(instance_id, &details, plan, &params, extensions).await?;
        }

        Ok(ProvisionedServiceSpec { is_async: true })
    }

    async fn provision_new(
        &self,
        instance_id: &str,
        details: &ProvisionDetails,
        plan: &ServicePlan,
        params: &ProvisionParameters,
        extensions: Vec<String>,
    ) -> Result<(), BrokerError> {
        let group = self.parameter_groups.select(plan, &extensions).await?;

        let mut spec = self.instance_tag_spec(instance_id);
        spec.service_id = Some(details.service_id.clone());
        spec.plan_id = Some(details.plan_id.clone());
        spec.organization_id = Some(details.organization_guid.clone());
        spec.space_id = Some(details.space_guid.clone());
        spec.skip_final_snapshot = params.skip_final_snapshot;
        spec.extensions = extensions;
        let tags = build_instance_tags(Action::Created, &spec);

        let input = self.create_instance_input(instance_id, plan, params, &group, tags);
        self.rds.create(&self.instance_identifier(instance_id), input).await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn provision_from_snapshot(
        &self,
        instance_id: &str,
        details: &ProvisionDetails,
        plan: &ServicePlan,
        engine: Engine,
        params: &ProvisionParameters,
        extensions: Vec<String>,
        source_instance_id: &str,
    ) -> Result<(), BrokerError> {
        if engine != Engine::Postgres {
            return Err(BrokerError::InvalidParameters(
                "restoring from a snapshot is only supported for postgres plans".to_string(),
            ));
        }

        let source_identifier = self.instance_identifier(source_instance_id);
        let snapshots = self.rds.describe_snapshots(&source_identifier).await?;
        let cutoff = params.snapshot_cutoff()?;
        let snapshot = snapshots
            .into_iter()
            .find(|snapshot| cutoff.is_none_or(|cutoff| snapshot.create_time < cutoff))
            .ok_or(BrokerError::NoSnapshotsFound)?;

        let snapshot_tags = self.rds.get_resource_tags(&snapshot.arn).await?;
        check_restore_source(&snapshot_tags, details)?;

        let extensions = merge_extensions(&extensions, &snapshot_tags.extensions());
        let group = self.parameter_groups.select(plan, &extensions).await?;

        let mut spec = self.instance_tag_spec(instance_id);
        spec.service_id = Some(details.service_id.clone());
        spec.plan_id = Some(details.plan_id.clone());
        spec.organization_id = Some(details.organization_guid.clone());
        spec.space_id = Some(details.space_guid.clone());
        spec.skip_final_snapshot = params.skip_final_snapshot;
        spec.extensions = extensions;
        spec.origin_snapshot_identifier = Some(snapshot.identifier.clone());
        let tags = build_instance_tags(Action::Restored, &spec);

        tracing::info!(instance_id, snapshot = %snapshot.identifier, "restoring from latest matching snapshot");

        let props = &plan.rds_properties;
        let input = RestoreFromSnapshotInput {
            snapshot_identifier: snapshot.identifier.clone(),
            engine: props.engine.clone(),
            db_instance_class: Some(props.db_instance_class.clone()),
            auto_minor_version_upgrade: props.auto_minor_version_upgrade,
            availability_zone: props.availability_zone.clone(),
            copy_tags_to_snapshot: props.copy_tags_to_snapshot,
            db_parameter_group_name: Some(group),
            db_subnet_group_name: props.db_subnet_group_name.clone(),
            license_model: props.license_model.clone(),
            multi_az: props.multi_az,
            option_group_name: props.option_group_name.clone(),
            publicly_accessible: props.publicly_accessible,
            storage_type: props.storage_type.clone(),
            iops: props.iops,
            vpc_security_group_ids: props.vpc_security_group_ids.clone(),
            tags,
        };
        self.rds
            .restore_from_snapshot(&self.instance_identifier(instance_id), input)
            .await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn provision_to_point_in_time(
        &self,
        instance_id: &str,
        details: &ProvisionDetails,
        plan: &ServicePlan,
        engine: Engine,
        params: &ProvisionParameters,
        extensions: Vec<String>,
        source_instance_id: &str,
    ) -> Result<(), BrokerError> {
        if engine != Engine::Postgres {
            return Err(BrokerError::InvalidParameters(
                "restoring to a point in time is only supported for postgres plans".to_string(),
            ));
        }

        let source_identifier = self.instance_identifier(source_instance_id);
        let source = self.rds.describe(&source_identifier).await?;
        let source_tags = self.rds.get_resource_tags(&source.arn).await?;
        check_restore_source(&source_tags, details)?;

        let extensions = merge_extensions(&extensions, &source_tags.extensions());
        let group = self.parameter_groups.select(plan, &extensions).await?;

        let mut spec = self.instance_tag_spec(instance_id);
        spec.service_id = Some(details.service_id.clone());
        spec.plan_id = Some(details.plan_id.clone());
        spec.organization_id = Some(details.organization_guid.clone());
        spec.space_id = Some(details.space_guid.clone());
        spec.skip_final_snapshot = params.skip_final_snapshot;
        spec.extensions = extensions;
        spec.origin_database_identifier = Some(source_identifier.clone());
        spec.origin_point_in_time = params.restore_from_point_in_time_before.clone();
        let tags = build_instance_tags(Action::Restored, &spec);

        tracing::info!(instance_id, source = %source_identifier, "restoring to a point in time");

        let props = &plan.rds_properties;
        let input = RestoreToPointInTimeInput {
            source_instance_identifier: source_identifier,
            restore_time: params.point_in_time()?,
            engine: props.engine.clone(),
            db_instance_class: Some(props.db_instance_class.clone()),
            auto_minor_version_upgrade: props.auto_minor_version_upgrade,
            availability_zone: props.availability_zone.clone(),
            copy_tags_to_snapshot: props.copy_tags_to_snapshot,
            db_parameter_group_name: Some(group),
            db_subnet_group_name: props.db_subnet_group_name.clone(),
            license_model: props.license_model.clone(),
            multi_az: props.multi_az,
            option_group_name: props.option_group_name.clone(),
            publicly_accessible: props.publicly_accessible,
            storage_type: props.storage_type.clone(),
            iops: props.iops,
            vpc_security_group_ids: props.vpc_security_group_ids.clone(),
            tags,
        };
        self.rds
            .restore_to_point_in_time(&self.instance_identifier(instance_id), input)
            .await?;
        Ok(())
    }

    fn create_instance_input(
        &self,
        instance_id: &str,
        plan: &ServicePlan,
        params: &ProvisionParameters,
        group: &str,
        tags: Tags,
    ) -> CreateInstanceInput {
        let props = &plan.rds_properties;
        CreateInstanceInput {
            engine: props.engine.clone(),
            engine_version: Some(props.engine_version.clone()),
            db_instance_class: Some(props.db_instance_class.clone()),
            db_name: Some(naming::db_name(&self.config.db_prefix, instance_id)),
            master_username: Some(naming::generate_master_username()),
            master_user_password: Some(self.master_password(instance_id)),
            allocated_storage: props.allocated_storage,
            auto_minor_version_upgrade: props.auto_minor_version_upgrade,
            availability_zone: props.availability_zone.clone(),
            backup_retention_period: props.backup_retention_period,
            character_set_name: props.character_set_name.clone(),
            copy_tags_to_snapshot: props.copy_tags_to_snapshot,
            db_parameter_group_name: Some(group.to_string()),
            db_subnet_group_name: props.db_subnet_group_name.clone(),
            license_model: props.license_model.clone(),
            multi_az: props.multi_az,
            option_group_name: props.option_group_name.clone(),
            port: props.port,
            preferred_backup_window: params
                .preferred_backup_window
                .clone()
                .or_else(|| props.preferred_backup_window.clone()),
            preferred_maintenance_window: params
                .preferred_maintenance_window
                .clone()
                .or_else(|| props.preferred_maintenance_window.clone()),
            publicly_accessible: props.publicly_accessible,
            storage_encrypted: props.storage_encrypted,
            kms_key_id: props.kms_key_id.clone(),
            storage_type: props.storage_type.clone(),
            iops: props.iops,
            vpc_security_group_ids: props.vpc_security_group_ids.clone(),
            tags,
        }
    }
}

fn requested_extensions(
    engine: Engine,
    plan: &ServicePlan,
    params: &ProvisionParameters,
) -> Result<Vec<String>, BrokerError> {
    if engine != Engine::Postgres {
        if !params.extensions.is_empty() {
            return Err(BrokerError::InvalidParameters(
                "extensions are only supported for postgres plans".to_string(),
            ));
        }
        return Ok(Vec::new());
    }

    for extension in &params.extensions {
        if !plan.rds_properties.allowed_extensions.contains(extension) {
            return Err(BrokerError::UnsupportedExtension(extension.clone()));
        }
    }
    Ok(merge_extensions(&plan.rds_properties.default_extensions, &params.extensions))
}

fn check_restore_source(source_tags: &Tags, details: &ProvisionDetails) -> Result<(), BrokerError> {
    use rds_broker_awsrds::tags::{TAG_ORGANIZATION_ID, TAG_PLAN_ID, TAG_SPACE_ID};

    if source_tags.get(TAG_ORGANIZATION_ID) != Some(details.organization_guid.as_str())
        || source_tags.get(TAG_SPACE_ID) != Some(details.space_guid.as_str())
    {
        return Err(BrokerError::RestoreSourceNotPermitted);
    }
    if source_tags.get(TAG_PLAN_ID) != Some(details.plan_id.as_str()) {
        return Err(BrokerError::RestoreSourcePlanMismatch);
    }
    Ok(())
}
