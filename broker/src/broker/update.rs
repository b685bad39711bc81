use rds_broker_awsrds::tags::build_instance_tags;
use rds_broker_awsrds::{Action, ModifyInstanceInput};

use crate::api::{UpdateDetails, UpdateServiceSpec};
use crate::broker::merge_extensions;
use crate::catalog::{Engine, ServicePlan, parse_version};
use crate::errors::BrokerError;
use crate::params::UpdateParameters;

use super::RdsBroker;

impl RdsBroker {
    pub(crate) async fn do_update(
        &self,
        instance_id: &str,
        details: UpdateDetails,
        accepts_incomplete: bool,
    ) -> Result<UpdateServiceSpec, BrokerError> {
        if !accepts_incomplete {
            return Err(BrokerError::AsyncRequired);
        }

        let params = self.update_parameters(&details)?;
        let service = self
            .config
            .catalog
            .find_service(&details.service_id)
            .ok_or_else(|| BrokerError::ServiceNotFound(details.service_id.clone()))?;
        let (_, plan) = self.find_service_plan(&details.plan_id)?;
        let (_, previous_plan) = self.find_service_plan(&details.previous_values.plan_id)?;
        let engine = plan
            .engine_kind()
            .ok_or_else(|| BrokerError::InvalidParameters(format!("plan '{}' has an unsupported engine", plan.id)))?;

        let identifier = self.instance_identifier(instance_id);
        let plan_changed = plan.id != previous_plan.id;
        let reboot = params.reboot.unwrap_or(false);

        if reboot {
            if plan_changed {
                return Err(BrokerError::InvalidParameters(
                    "cannot change the plan and reboot in the same request".to_string(),
                ));
            }
            if params.is_reboot_only() {
                self.rds.reboot(&identifier, params.force_failover).await?;
                return Ok(UpdateServiceSpec { is_async: true });
            }
        }

        if plan_changed {
            if !service.plan_updateable {
                return Err(BrokerError::PlanChangeNotSupported);
            }
            if !params.enable_extensions.is_empty()
                || !params.disable_extensions.is_empty()
                || params.update_minor_version_to_latest.unwrap_or(false)
            {
                return Err(BrokerError::InvalidParameters(
                    "plan changes cannot be combined with extension changes or version pinning".to_string(),
                ));
            }
        }

        let props = &plan.rds_properties;
        let previous_props = &previous_plan.rds_properties;
        if props.storage_encrypted != previous_props.storage_encrypted
            || props.kms_key_id != previous_props.kms_key_id
        {
            return Err(BrokerError::EncryptionNotUpdateable);
        }

        let new_version = parse_version(&props.engine_version)?;
        let previous_version = parse_version(&previous_props.engine_version)?;
        if new_version.major < previous_version.major {
            return Err(BrokerError::CannotDowngrade {
                from: previous_version.major,
                to: new_version.major,
            });
        }
        if engine == Engine::Postgres && new_version.major - previous_version.major > 1 {
            return Err(BrokerError::CannotSkipMajorVersion {
                from: previous_version.major,
                to: new_version.major,
            });
        }
        let is_upgrade = plan.is_upgrade_from(previous_plan)?;

        let instance = self.rds.describe(&identifier).await?;
        let existing_group = instance.parameter_group_name.clone();

        let new_extensions = self.effective_extensions(engine, plan, &instance.tags.extensions(), &params)?;

        // The existing group is the baseline: it may already carry preloads
        // for enabled extensions. An extension-driven change needs an
        // explicit reboot request; the reboot itself happens in the
        // last_operation loop once the modify has settled.
        let mut target_group = existing_group.clone();
        let composed = self.parameter_groups.group_name(plan, &new_extensions);
        let group_changes = existing_group.as_deref() != Some(composed.as_str());
        if group_changes {
            if !plan_changed && existing_group.is_some() && !reboot {
                return Err(BrokerError::RebootRequired);
            }
            target_group = Some(self.parameter_groups.select(plan, &new_extensions).await?);
        }

        if !params.disable_extensions.is_empty() {
            let mut session = self.open_master_session(&instance, instance_id).await?;
            let outcome = session.drop_extensions(&params.disable_extensions).await;
            session.close().await;
            outcome?;
        }

        let mut input = self.modify_instance_input(plan, &params, target_group);
        if params.update_minor_version_to_latest.unwrap_or(false) {
            if let Some(latest) = self
                .rds
                .get_latest_minor_version(&props.engine, &instance.engine_version)
                .await?
            {
                input.engine_version = Some(latest);
            }
        } else if is_upgrade {
            input.engine_version = match self
                .rds
                .get_full_valid_target_version(&props.engine, &instance.engine_version, new_version.major)
                .await?
            {
                Some(target) => Some(target),
                None => Some(props.engine_version.clone()),
            };
            if new_version.major > previous_version.major {
                input.allow_major_version_upgrade = Some(true);
            }
        }

        tracing::info!(instance_id, plan_id = %plan.id, "modifying service instance");
        self.rds.modify(&identifier, input).await?;

        let mut spec = self.instance_tag_spec(instance_id);
        spec.service_id = Some(details.service_id.clone());
        spec.plan_id = Some(details.plan_id.clone());
        spec.skip_final_snapshot = params.skip_final_snapshot;
        spec.extensions = new_extensions;
        let tags = build_instance_tags(Action::Updated, &spec);
        self.rds.add_tags_to_resource(&instance.arn, &tags).await?;

        if reboot && !group_changes {
            self.rds.reboot(&identifier, params.force_failover).await?;
        }

        Ok(UpdateServiceSpec { is_async: true })
    }

    fn effective_extensions(
        &self,
        engine: Engine,
        plan: &ServicePlan,
        existing: &[String],
        params: &UpdateParameters,
    ) -> Result<Vec<String>, BrokerError> {
        if engine != Engine::Postgres {
            if !params.enable_extensions.is_empty() || !params.disable_extensions.is_empty() {
                return Err(BrokerError::InvalidParameters(
                    "extensions are only supported for postgres plans".to_string(),
                ));
            }
            return Ok(Vec::new());
        }

        let props = &plan.rds_properties;
        for extension in params.enable_extensions.iter().chain(params.disable_extensions.iter()) {
            if !props.allowed_extensions.contains(extension) {
                return Err(BrokerError::UnsupportedExtension(extension.clone()));
            }
        }
        for extension in &params.disable_extensions {
            if props.default_extensions.contains(extension) {
                return Err(BrokerError::CannotDisableDefaultExtension(extension.clone()));
            }
        }

        let mut extensions = merge_extensions(&props.default_extensions, existing);
        extensions = merge_extensions(&extensions, &params.enable_extensions);
        extensions.retain(|extension| !params.disable_extensions.contains(extension));
        Ok(extensions)
    }

    pub(crate) fn modify_instance_input(
        &self,
        plan: &ServicePlan,
        params: &UpdateParameters,
        parameter_group: Option<String>,
    ) -> ModifyInstanceInput {
        let props = &plan.rds_properties;
        ModifyInstanceInput {
            apply_immediately: !params.apply_at_maintenance_window,
            allow_major_version_upgrade: None,
            db_instance_class: Some(props.db_instance_class.clone()),
            engine_version: None,
            allocated_storage: props.allocated_storage,
            auto_minor_version_upgrade: props.auto_minor_version_upgrade,
            backup_retention_period: props.backup_retention_period,
            copy_tags_to_snapshot: props.copy_tags_to_snapshot,
            db_parameter_group_name: parameter_group,
            master_user_password: None,
            multi_az: props.multi_az,
            option_group_name: props.option_group_name.clone(),
            preferred_backup_window: params
                .preferred_backup_window
                .clone()
                .or_else(|| props.preferred_backup_window.clone()),
            preferred_maintenance_window: params
                .preferred_maintenance_window
                .clone()
                .or_else(|| props.preferred_maintenance_window.clone()),
            storage_type: props.storage_type.clone(),
            iops: props.iops,
            vpc_security_group_ids: props.vpc_security_group_ids.clone(),
        }
    }
}
