use rds_broker_awsrds::ModifyInstanceInput;
use rds_broker_awsrds::tags::{TAG_BROKER_NAME, TAG_CHARGEABLE_ENTITY};
use rds_broker_sqlengine::SqlEngineError;

use crate::errors::BrokerError;
use crate::naming;

use super::RdsBroker;

impl RdsBroker {
    pub(crate) async fn do_check_and_rotate_credentials(&self) -> Result<usize, BrokerError> {
        tracing::info!("checking master credentials of all broker instances");
        let instances = self
            .rds
            .describe_by_tag(TAG_BROKER_NAME, &self.config.broker_name)
            .await?;

        let mut rotated = 0;
        for instance in &instances {
            let Some(instance_id) = instance.tags.get(TAG_CHARGEABLE_ENTITY) else {
                tracing::warn!(identifier = %instance.identifier, "skipping instance without a chargeable_entity tag");
                continue;
            };
            let (Some(address), Some(port)) = (instance.address.as_deref(), instance.port) else {
                continue;
            };
            let db_name = instance
                .db_name
                .clone()
                .unwrap_or_else(|| naming::db_name(&self.config.db_prefix, instance_id));
            let password = self.master_password(instance_id);

            let mut session = match self.sql.engine(&instance.engine) {
                Ok(session) => session,
                Err(err) => {
                    tracing::warn!(identifier = %instance.identifier, error = %err, "skipping instance with unknown engine");
                    continue;
                }
            };
            let probe = session
                .open(address, port, &db_name, &instance.master_username, &password)
                .await;
            session.close().await;

            match probe {
                Ok(()) => {}
                Err(SqlEngineError::LoginFailed) => {
                    tracing::warn!(identifier = %instance.identifier, "master password drifted, resetting it");
                    let input = ModifyInstanceInput {
                        apply_immediately: true,
                        master_user_password: Some(password),
                        ..Default::default()
                    };
                    self.rds.modify(&instance.identifier, input).await?;
                    rotated += 1;
                }
                Err(err) => {
                    tracing::warn!(identifier = %instance.identifier, error = %err, "sql probe failed, skipping instance");
                }
            }
        }

        Ok(rotated)
    }
}

#[cfg(test)]
mod tests {
    use crate::naming::generate_master_password;
    use crate::testing::{OpenBehavior, available_instance, make_broker, postgres_plan, test_catalog};
    use rds_broker_awsrds::tags::{TAG_BROKER_NAME, TAG_CHARGEABLE_ENTITY};

    fn owned_instance() -> rds_broker_awsrds::DbInstanceDetails {
        let mut instance = available_instance("cf-i-1", "postgres", "12.5");
        instance.tags.insert(TAG_BROKER_NAME, "mybroker");
        instance.tags.insert(TAG_CHARGEABLE_ENTITY, "i-1");
        instance
    }

    #[tokio::test]
    async fn healthy_credentials_are_left_alone() {
        let (broker, rds, sql) = make_broker(test_catalog(vec![postgres_plan("Plan-PG", "12", "postgres12")]));
        rds.set_instance(owned_instance());

        let rotated = broker.do_check_and_rotate_credentials().await.unwrap();
        assert_eq!(rotated, 0);
        assert_eq!(sql.open_calls().len(), 1);
        assert_eq!(sql.open_calls()[0].4, generate_master_password("a-seed", "i-1"));
        assert!(rds.modify_calls().is_empty());
    }

    #[tokio::test]
    async fn a_failed_login_resets_the_master_password() {
        let (broker, rds, sql) = make_broker(test_catalog(vec![postgres_plan("Plan-PG", "12", "postgres12")]));
        rds.set_instance(owned_instance());
        sql.set_open_behavior(OpenBehavior::LoginFailed);

        let rotated = broker.do_check_and_rotate_credentials().await.unwrap();
        assert_eq!(rotated, 1);

        let modifies = rds.modify_calls();
        assert_eq!(modifies.len(), 1);
        assert!(modifies[0].1.apply_immediately);
        assert_eq!(
            modifies[0].1.master_user_password.as_deref(),
            Some(generate_master_password("a-seed", "i-1").as_str())
        );
    }

    #[tokio::test]
    async fn other_probe_failures_are_skipped() {
        let (broker, rds, sql) = make_broker(test_catalog(vec![postgres_plan("Plan-PG", "12", "postgres12")]));
        rds.set_instance(owned_instance());
        sql.set_open_behavior(OpenBehavior::OtherError);

        let rotated = broker.do_check_and_rotate_credentials().await.unwrap();
        assert_eq!(rotated, 0);
        assert!(rds.modify_calls().is_empty());
    }

    #[tokio::test]
    async fn only_broker_owned_instances_are_visited() {
        let (broker, rds, sql) = make_broker(test_catalog(vec![postgres_plan("Plan-PG", "12", "postgres12")]));
        rds.set_instance(available_instance("cf-i-1", "postgres", "12.5"));

        let rotated = broker.do_check_and_rotate_credentials().await.unwrap();
        assert_eq!(rotated, 0);
        assert!(sql.open_calls().is_empty());
    }
}
