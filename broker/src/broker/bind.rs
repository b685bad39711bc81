use crate::api::{BindDetails, Binding, Credentials, UnbindDetails};
use crate::catalog::Engine;
use crate::errors::BrokerError;
use crate::naming;

use super::RdsBroker;

impl RdsBroker {
    pub(crate) async fn do_bind(
        &self,
        instance_id: &str,
        binding_id: &str,
        details: BindDetails,
    ) -> Result<Binding, BrokerError> {
        let params = self.bind_parameters(&details)?;
        let (_, plan) = self.find_service_plan(&details.plan_id)?;
        let engine = plan
            .engine_kind()
            .ok_or_else(|| BrokerError::InvalidParameters(format!("plan '{}' has an unsupported engine", plan.id)))?;

        let read_only = params.read_only.unwrap_or(false);
        if read_only && engine != Engine::Postgres {
            return Err(BrokerError::InvalidParameters(
                "read-only bindings are only supported for postgres plans".to_string(),
            ));
        }

        let instance = self.rds.describe(&self.instance_identifier(instance_id)).await?;
        let address = instance.address.clone().ok_or(BrokerError::InstanceNotAvailable)?;
        let port = instance.port.ok_or(BrokerError::InstanceNotAvailable)?;
        let db_name = instance
            .db_name
            .clone()
            .unwrap_or_else(|| naming::db_name(&self.config.db_prefix, instance_id));

        tracing::info!(instance_id, binding_id, read_only, "creating binding");

        let mut session = self.sql.engine(&instance.engine)?;
        session
            .open(
                &address,
                port,
                &db_name,
                &instance.master_username,
                &self.master_password(instance_id),
            )
            .await?;
        let outcome = session.create_user(binding_id, &db_name, read_only).await;
        session.close().await;
        let user = outcome?;

        Ok(Binding {
            credentials: Credentials {
                host: address.clone(),
                port,
                name: db_name.clone(),
                username: user.username.clone(),
                password: user.password.clone(),
                uri: session.uri(&address, port, &db_name, &user.username, &user.password),
                jdbcuri: session.jdbc_uri(&address, port, &db_name, &user.username, &user.password),
            },
        })
    }

    pub(crate) async fn do_unbind(
        &self,
        instance_id: &str,
        binding_id: &str,
        details: UnbindDetails,
    ) -> Result<(), BrokerError> {
        self.find_service_plan(&details.plan_id)?;
        let instance = self.rds.describe(&self.instance_identifier(instance_id)).await?;

        tracing::info!(instance_id, binding_id, "removing binding");

        let mut session = self.open_master_session(&instance, instance_id).await?;
        let outcome = session.drop_user(binding_id).await;
        session.close().await;
        outcome?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::generate_master_password;
    use crate::testing::{available_instance, make_broker, mysql_plan, postgres_plan, test_catalog};

    fn bind_details(plan_id: &str) -> BindDetails {
        BindDetails {
            service_id: "svc-1".to_string(),
            plan_id: plan_id.to_string(),
            parameters: None,
        }
    }

    #[tokio::test]
    async fn bind_creates_a_user_and_returns_credentials() {
        let (broker, rds, sql) = make_broker(test_catalog(vec![postgres_plan("Plan-PG", "12", "postgres12")]));
        rds.set_instance(available_instance("cf-i-1", "postgres", "12.5"));

        let binding = broker.do_bind("i-1", "b-1", bind_details("Plan-PG")).await.unwrap();
        let credentials = &binding.credentials;
        assert_eq!(credentials.host, "db.example.com");
        assert_eq!(credentials.port, 5432);
        assert_eq!(credentials.name, "cf_i_1");
        assert_eq!(credentials.username, "user-b-1");
        assert_eq!(credentials.password, "generated-password");
        assert!(credentials.uri.contains("user-b-1"));
        assert!(credentials.jdbcuri.starts_with("jdbc:"));

        let opens = sql.open_calls();
        assert_eq!(opens.len(), 1);
        let (address, port, db_name, username, password) = &opens[0];
        assert_eq!(address, "db.example.com");
        assert_eq!(*port, 5432);
        assert_eq!(db_name, "cf_i_1");
        assert_eq!(username, "master");
        assert_eq!(password, &generate_master_password("a-seed", "i-1"));

        assert_eq!(sql.created_users(), vec![("b-1".to_string(), "cf_i_1".to_string(), false)]);
        assert_eq!(sql.close_calls(), 1);
    }

    #[tokio::test]
    async fn read_only_bindings_are_postgres_only() {
        let (broker, rds, _) = make_broker(test_catalog(vec![mysql_plan("Plan-MY", "8.0", "mysql8.0")]));
        let mut instance = available_instance("cf-i-1", "mysql", "8.0.36");
        instance.port = Some(3306);
        rds.set_instance(instance);

        let mut details = bind_details("Plan-MY");
        details.parameters = Some(serde_json::json!({"read_only": true}));
        let err = broker.do_bind("i-1", "b-1", details).await.unwrap_err();
        assert!(matches!(err, BrokerError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn read_only_bindings_work_on_postgres() {
        let (broker, rds, sql) = make_broker(test_catalog(vec![postgres_plan("Plan-PG", "12", "postgres12")]));
        rds.set_instance(available_instance("cf-i-1", "postgres", "12.5"));

        let mut details = bind_details("Plan-PG");
        details.parameters = Some(serde_json::json!({"read_only": true}));
        broker.do_bind("i-1", "b-1", details).await.unwrap();

        assert_eq!(sql.created_users(), vec![("b-1".to_string(), "cf_i_1".to_string(), true)]);
    }

    #[tokio::test]
    async fn bind_to_a_missing_instance_is_gone() {
        let (broker, _, _) = make_broker(test_catalog(vec![postgres_plan("Plan-PG", "12", "postgres12")]));
        let err = broker.do_bind("i-1", "b-1", bind_details("Plan-PG")).await.unwrap_err();
        assert!(matches!(err, BrokerError::InstanceDoesNotExist));
    }

    #[tokio::test]
    async fn unbind_drops_the_binding_user() {
        let (broker, rds, sql) = make_broker(test_catalog(vec![postgres_plan("Plan-PG", "12", "postgres12")]));
        rds.set_instance(available_instance("cf-i-1", "postgres", "12.5"));

        let details = UnbindDetails {
            service_id: "svc-1".to_string(),
            plan_id: "Plan-PG".to_string(),
        };
        broker.do_unbind("i-1", "b-1", details).await.unwrap();

        assert_eq!(sql.dropped_users(), vec!["b-1".to_string()]);
        assert_eq!(sql.close_calls(), 1);
    }
}
