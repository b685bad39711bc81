use rds_broker_awsrds::DbInstanceDetails;
use rds_broker_awsrds::tags::{
    TAG_ORGANIZATION_ID, TAG_PENDING_REBOOT, TAG_PENDING_RESET_USER_PASSWORD, TAG_PENDING_UPDATE_SETTINGS, TAG_PLAN_ID,
    TAG_SERVICE_ID, TAG_SPACE_ID, build_instance_tags,
};
use rds_broker_awsrds::Action;

use crate::api::{LastOperation, LastOperationState};
use crate::catalog::Engine;
use crate::errors::BrokerError;
use crate::params::UpdateParameters;
use crate::status::operation_state_for_status;

use super::RdsBroker;

/// The post-restore flags, in the order they must be processed. One step per
/// poll: each action puts the instance back into `modifying`, which cannot
/// accept the next action until it settles.
const RESTORE_STATE_SEQUENCE: [&str; 3] = [
    TAG_PENDING_UPDATE_SETTINGS,
    TAG_PENDING_REBOOT,
    TAG_PENDING_RESET_USER_PASSWORD,
];

impl RdsBroker {
    pub(crate) async fn do_last_operation(&self, instance_id: &str) -> Result<LastOperation, BrokerError> {
        let identifier = self.instance_identifier(instance_id);
        let instance = self.rds.describe(&identifier).await?;

        let state = operation_state_for_status(&instance.status);
        let description = format!("DB instance '{identifier}' status is '{}'", instance.status);
        if state != LastOperationState::Succeeded {
            return Ok(LastOperation { state, description });
        }

        if instance.pending_modifications {
            return Ok(LastOperation::in_progress(format!(
                "DB instance '{identifier}' has pending modifications"
            )));
        }

        if self.run_post_restore_step(instance_id, &instance).await? {
            return Ok(LastOperation::in_progress(format!(
                "DB instance '{identifier}' is converging after a restore"
            )));
        }

        match instance.parameter_apply_status.as_deref() {
            Some("applying") => {
                return Ok(LastOperation::in_progress(format!(
                    "DB instance '{identifier}' is applying parameter group changes"
                )));
            }
            Some("pending-reboot") => {
                self.rds.reboot(&identifier, None).await?;
                return Ok(LastOperation::in_progress(format!(
                    "DB instance '{identifier}' is rebooting to apply parameter group changes"
                )));
            }
            _ => {}
        }

        self.ensure_create_extensions(instance_id, &instance).await?;

        Ok(LastOperation {
            state: LastOperationState::Succeeded,
            description,
        })
    }

    /// Processes the first armed restore-state flag, removing it once the
    /// action has been issued. Returns whether an async action was
    /// triggered.
    async fn run_post_restore_step(
        &self,
        instance_id: &str,
        instance: &DbInstanceDetails,
    ) -> Result<bool, BrokerError> {
        for tag in RESTORE_STATE_SEQUENCE {
            if instance.tags.bool_value(tag) != Some(true) {
                continue;
            }

            tracing::info!(instance_id, step = tag, "running post-restore step");
            match tag {
                TAG_PENDING_UPDATE_SETTINGS => self.post_restore_update_settings(instance_id, instance).await?,
                TAG_PENDING_REBOOT => self.rds.reboot(&instance.identifier, None).await?,
                _ => self.post_restore_reset_user_password(instance_id, instance).await?,
            }

            self.rds.remove_tag(&instance.identifier, tag).await?;
            return Ok(true);
        }
        Ok(false)
    }

    /// A restored instance still runs with the origin's settings and master
    /// password. Reconcile everything against the plan, keeping the
    /// parameter group the restore chose.
    async fn post_restore_update_settings(
        &self,
        instance_id: &str,
        instance: &DbInstanceDetails,
    ) -> Result<(), BrokerError> {
        let plan_id = instance
            .tags
            .get(TAG_PLAN_ID)
            .ok_or_else(|| BrokerError::InvalidParameters("restored instance is missing the Plan ID tag".to_string()))?;
        let (_, plan) = self.find_service_plan(plan_id)?;

        let mut input = self.modify_instance_input(plan, &UpdateParameters::default(), instance.parameter_group_name.clone());
        input.master_user_password = Some(self.master_password(instance_id));
        self.rds.modify(&instance.identifier, input).await?;

        let mut spec = self.instance_tag_spec(instance_id);
        spec.service_id = instance.tags.get(TAG_SERVICE_ID).map(str::to_string);
        spec.plan_id = Some(plan_id.to_string());
        spec.organization_id = instance.tags.get(TAG_ORGANIZATION_ID).map(str::to_string);
        spec.space_id = instance.tags.get(TAG_SPACE_ID).map(str::to_string);
        spec.extensions = instance.tags.extensions();
        let tags = build_instance_tags(Action::Updated, &spec);
        self.rds.add_tags_to_resource(&instance.arn, &tags).await?;
        Ok(())
    }

    /// The snapshot brought the origin's application roles with it; drop
    /// them so stale credentials stop working.
    async fn post_restore_reset_user_password(
        &self,
        instance_id: &str,
        instance: &DbInstanceDetails,
    ) -> Result<(), BrokerError> {
        let mut session = self.open_master_session(instance, instance_id).await?;
        let outcome = session.reset_state().await;
        session.close().await;
        outcome?;
        Ok(())
    }

    /// Converged postgres instances must have every extension recorded in
    /// their tag actually created in the database.
    async fn ensure_create_extensions(
        &self,
        instance_id: &str,
        instance: &DbInstanceDetails,
    ) -> Result<(), BrokerError> {
        if Engine::parse(&instance.engine) != Some(Engine::Postgres) {
            return Ok(());
        }
        let extensions = instance.tags.extensions();
        if extensions.is_empty() {
            return Ok(());
        }

        let mut session = self.open_master_session(instance, instance_id).await?;
        let outcome = session.create_extensions(&extensions).await;
        session.close().await;
        outcome?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::generate_master_password;
    use crate::testing::{available_instance, make_broker, postgres_plan, test_catalog};
    use rds_broker_awsrds::tags::TAG_EXTENSIONS;

    fn restored_instance() -> DbInstanceDetails {
        let mut instance = available_instance("cf-i-1", "postgres", "12.5");
        instance.tags.insert(TAG_PLAN_ID, "Plan-PG");
        instance.tags.insert(TAG_SERVICE_ID, "svc-1");
        instance.tags.insert(TAG_PENDING_UPDATE_SETTINGS, "true");
        instance.tags.insert(TAG_PENDING_REBOOT, "true");
        instance.tags.insert(TAG_PENDING_RESET_USER_PASSWORD, "true");
        instance.tags.insert(TAG_EXTENSIONS, "postgis");
        instance
    }

    #[tokio::test]
    async fn raw_statuses_map_to_operation_states() {
        let (broker, rds, _) = make_broker(test_catalog(vec![postgres_plan("Plan-PG", "12", "postgres12")]));

        let mut instance = available_instance("cf-i-1", "postgres", "12.5");
        instance.status = "creating".to_string();
        rds.set_instance(instance);
        let op = broker.do_last_operation("i-1").await.unwrap();
        assert_eq!(op.state, LastOperationState::InProgress);
        assert!(op.description.contains("creating"));

        let mut instance = available_instance("cf-i-1", "postgres", "12.5");
        instance.status = "failed".to_string();
        rds.set_instance(instance);
        let op = broker.do_last_operation("i-1").await.unwrap();
        assert_eq!(op.state, LastOperationState::Failed);
    }

    #[tokio::test]
    async fn pending_modifications_hold_the_operation_open() {
        let (broker, rds, _) = make_broker(test_catalog(vec![postgres_plan("Plan-PG", "12", "postgres12")]));
        let mut instance = available_instance("cf-i-1", "postgres", "12.5");
        instance.pending_modifications = true;
        rds.set_instance(instance);

        let op = broker.do_last_operation("i-1").await.unwrap();
        assert_eq!(op.state, LastOperationState::InProgress);
        assert!(op.description.contains("pending modifications"));
    }

    #[tokio::test]
    async fn post_restore_convergence_runs_one_step_per_poll() {
        let (broker, rds, sql) = make_broker(test_catalog(vec![postgres_plan("Plan-PG", "12", "postgres12")]));
        rds.set_instance(restored_instance());

        // poll 1: settings reconciliation with the derived master password
        let op = broker.do_last_operation("i-1").await.unwrap();
        assert_eq!(op.state, LastOperationState::InProgress);
        let modifies = rds.modify_calls();
        assert_eq!(modifies.len(), 1);
        assert_eq!(
            modifies[0].1.master_user_password.as_deref(),
            Some(generate_master_password("a-seed", "i-1").as_str())
        );
        assert_eq!(
            modifies[0].1.db_parameter_group_name.as_deref(),
            Some("cf-postgres12-mybroker")
        );
        assert_eq!(
            rds.removed_tags(),
            vec![("cf-i-1".to_string(), TAG_PENDING_UPDATE_SETTINGS.to_string())]
        );
        assert!(rds.reboot_calls().is_empty());

        // poll 2: reboot
        let op = broker.do_last_operation("i-1").await.unwrap();
        assert_eq!(op.state, LastOperationState::InProgress);
        assert_eq!(rds.reboot_calls().len(), 1);
        assert_eq!(rds.removed_tags().len(), 2);
        assert_eq!(rds.removed_tags()[1].1, TAG_PENDING_REBOOT);
        assert_eq!(sql.reset_state_calls(), 0);

        // poll 3: credential reset in the database
        let op = broker.do_last_operation("i-1").await.unwrap();
        assert_eq!(op.state, LastOperationState::InProgress);
        assert_eq!(sql.reset_state_calls(), 1);
        assert_eq!(rds.removed_tags().len(), 3);
        assert_eq!(rds.removed_tags()[2].1, TAG_PENDING_RESET_USER_PASSWORD);

        // poll 4: converged, extensions ensured
        let op = broker.do_last_operation("i-1").await.unwrap();
        assert_eq!(op.state, LastOperationState::Succeeded);
        assert_eq!(sql.created_extensions(), vec![vec!["postgis".to_string()]]);
        assert_eq!(rds.modify_calls().len(), 1);
        assert_eq!(rds.reboot_calls().len(), 1);
    }

    #[tokio::test]
    async fn a_pending_reboot_parameter_group_triggers_the_deferred_reboot() {
        let (broker, rds, _) = make_broker(test_catalog(vec![postgres_plan("Plan-PG", "12", "postgres12")]));
        let mut instance = available_instance("cf-i-1", "postgres", "12.5");
        instance.parameter_apply_status = Some("pending-reboot".to_string());
        rds.set_instance(instance);

        let op = broker.do_last_operation("i-1").await.unwrap();
        assert_eq!(op.state, LastOperationState::InProgress);
        assert!(op.description.contains("rebooting"));
        assert_eq!(rds.reboot_calls().len(), 1);
    }

    #[tokio::test]
    async fn an_applying_parameter_group_waits_without_rebooting() {
        let (broker, rds, _) = make_broker(test_catalog(vec![postgres_plan("Plan-PG", "12", "postgres12")]));
        let mut instance = available_instance("cf-i-1", "postgres", "12.5");
        instance.parameter_apply_status = Some("applying".to_string());
        rds.set_instance(instance);

        let op = broker.do_last_operation("i-1").await.unwrap();
        assert_eq!(op.state, LastOperationState::InProgress);
        assert!(rds.reboot_calls().is_empty());
    }

    #[tokio::test]
    async fn converged_instances_without_extensions_touch_no_sql() {
        let (broker, rds, sql) = make_broker(test_catalog(vec![postgres_plan("Plan-PG", "12", "postgres12")]));
        rds.set_instance(available_instance("cf-i-1", "postgres", "12.5"));

        let op = broker.do_last_operation("i-1").await.unwrap();
        assert_eq!(op.state, LastOperationState::Succeeded);
        assert!(sql.open_calls().is_empty());
    }

    #[tokio::test]
    async fn extension_creation_is_postgres_only() {
        let (broker, rds, sql) = make_broker(test_catalog(vec![postgres_plan("Plan-PG", "12", "postgres12")]));
        let mut instance = available_instance("cf-i-1", "mysql", "8.0.36");
        instance.tags.insert(TAG_EXTENSIONS, "postgis");
        rds.set_instance(instance);

        let op = broker.do_last_operation("i-1").await.unwrap();
        assert_eq!(op.state, LastOperationState::Succeeded);
        assert!(sql.open_calls().is_empty());
    }

    #[tokio::test]
    async fn missing_instances_surface_as_gone() {
        let (broker, _, _) = make_broker(test_catalog(vec![postgres_plan("Plan-PG", "12", "postgres12")]));
        let err = broker.do_last_operation("i-1").await.unwrap_err();
        assert!(matches!(err, BrokerError::InstanceDoesNotExist));
    }
}
