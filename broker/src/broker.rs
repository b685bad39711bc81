use std::sync::Arc;

use async_trait::async_trait;
use rds_broker_awsrds::tags::InstanceTags;
use rds_broker_awsrds::{DbInstanceDetails, RdsInstanceClient};
use rds_broker_sqlengine::{SqlEngine, SqlEngineProvider};

use crate::api::{
    BindDetails, Binding, DeprovisionDetails, DeprovisionServiceSpec, LastOperation, ProvisionDetails,
    ProvisionedServiceSpec, UnbindDetails, UpdateDetails, UpdateServiceSpec,
};
use crate::catalog::{ApiService, Service, ServicePlan};
use crate::config::BrokerConfig;
use crate::errors::BrokerError;
use crate::naming;
use crate::parameter_groups::ParameterGroupSelector;
use crate::params::{BindParameters, ProvisionParameters, UpdateParameters};

mod bind;
mod deprovision;
mod last_operation;
mod provision;
mod sweep;
mod update;

/// The OSBAPI verb surface. The HTTP layer in front of the broker routes
/// each request to one of these.
#[async_trait]
pub trait ServiceBroker: Send + Sync {
    fn services(&self) -> Vec<ApiService>;

    async fn provision(
        &self,
        instance_id: &str,
        details: ProvisionDetails,
        accepts_incomplete: bool,
    ) -> Result<ProvisionedServiceSpec, BrokerError>;

    async fn update(
        &self,
        instance_id: &str,
        details: UpdateDetails,
        accepts_incomplete: bool,
    ) -> Result<UpdateServiceSpec, BrokerError>;

    async fn deprovision(
        &self,
        instance_id: &str,
        details: DeprovisionDetails,
        accepts_incomplete: bool,
    ) -> Result<DeprovisionServiceSpec, BrokerError>;

    async fn bind(&self, instance_id: &str, binding_id: &str, details: BindDetails) -> Result<Binding, BrokerError>;

    async fn unbind(&self, instance_id: &str, binding_id: &str, details: UnbindDetails) -> Result<(), BrokerError>;

    async fn last_operation(&self, instance_id: &str) -> Result<LastOperation, BrokerError>;
}

pub struct RdsBroker {
    pub(crate) config: BrokerConfig,
    pub(crate) rds: Arc<dyn RdsInstanceClient>,
    pub(crate) sql: Arc<dyn SqlEngineProvider>,
    pub(crate) parameter_groups: ParameterGroupSelector,
}

impl RdsBroker {
    pub fn new(config: BrokerConfig, rds: Arc<dyn RdsInstanceClient>, sql: Arc<dyn SqlEngineProvider>) -> Self {
        let parameter_groups =
            ParameterGroupSelector::new(Arc::clone(&rds), config.db_prefix.clone(), config.broker_name.clone());
        RdsBroker {
            config,
            rds,
            sql,
            parameter_groups,
        }
    }

    /// Periodic self-heal: aligns master passwords of every broker-owned
    /// instance with their derived value. Returns how many were reset.
    pub async fn check_and_rotate_credentials(&self) -> Result<usize, BrokerError> {
        self.do_check_and_rotate_credentials().await
    }

    pub(crate) fn instance_identifier(&self, instance_id: &str) -> String {
        naming::db_instance_identifier(&self.config.db_prefix, instance_id)
    }

    pub(crate) fn master_password(&self, instance_id: &str) -> String {
        naming::generate_master_password(&self.config.master_password_seed, instance_id)
    }

    pub(crate) fn find_service_plan(&self, plan_id: &str) -> Result<(&Service, &ServicePlan), BrokerError> {
        self.config
            .catalog
            .find_plan(plan_id)
            .ok_or_else(|| BrokerError::PlanNotFound(plan_id.to_string()))
    }

    pub(crate) fn instance_tag_spec(&self, instance_id: &str) -> InstanceTags {
        InstanceTags {
            owner: self.config.owner.clone(),
            broker_name: self.config.broker_name.clone(),
            chargeable_entity: instance_id.to_string(),
            ..Default::default()
        }
    }

    /// Opens a SQL session on the instance's database as the master user,
    /// with the derived password. Callers must `close` the returned engine
    /// on every path.
    pub(crate) async fn open_master_session(
        &self,
        instance: &DbInstanceDetails,
        instance_id: &str,
    ) -> Result<Box<dyn SqlEngine>, BrokerError> {
        let address = instance.address.as_deref().ok_or(BrokerError::InstanceNotAvailable)?;
        let port = instance.port.ok_or(BrokerError::InstanceNotAvailable)?;
        let db_name = instance
            .db_name
            .clone()
            .unwrap_or_else(|| naming::db_name(&self.config.db_prefix, instance_id));

        let mut engine = self.sql.engine(&instance.engine)?;
        engine
            .open(
                address,
                port,
                &db_name,
                &instance.master_username,
                &self.master_password(instance_id),
            )
            .await?;
        Ok(engine)
    }

    pub(crate) fn provision_parameters(&self, details: &ProvisionDetails) -> Result<ProvisionParameters, BrokerError> {
        if !self.config.allow_user_provision_parameters {
            return Ok(ProvisionParameters::default());
        }
        let params = decode_parameters::<ProvisionParameters>(&details.parameters)?;
        params.validate()?;
        Ok(params)
    }

    pub(crate) fn update_parameters(&self, details: &UpdateDetails) -> Result<UpdateParameters, BrokerError> {
        if !self.config.allow_user_update_parameters {
            return Ok(UpdateParameters::default());
        }
        let params = decode_parameters::<UpdateParameters>(&details.parameters)?;
        params.validate()?;
        Ok(params)
    }

    pub(crate) fn bind_parameters(&self, details: &BindDetails) -> Result<BindParameters, BrokerError> {
        if !self.config.allow_user_bind_parameters {
            return Ok(BindParameters::default());
        }
        decode_parameters::<BindParameters>(&details.parameters)
    }
}

fn decode_parameters<T>(raw: &Option<serde_json::Value>) -> Result<T, BrokerError>
where
    T: Default + serde::de::DeserializeOwned,
{
    match raw {
        None => Ok(T::default()),
        Some(value) => {
            serde_json::from_value(value.clone()).map_err(|err| BrokerError::InvalidParameters(err.to_string()))
        }
    }
}

/// Order-preserving union with duplicates removed.
pub(crate) fn merge_extensions(base: &[String], additional: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(base.len() + additional.len());
    for extension in base.iter().chain(additional.iter()) {
        if !merged.contains(extension) {
            merged.push(extension.clone());
        }
    }
    merged
}

#[async_trait]
impl ServiceBroker for RdsBroker {
    fn services(&self) -> Vec<ApiService> {
        self.config.catalog.api_services()
    }

    async fn provision(
        &self,
        instance_id: &str,
        details: ProvisionDetails,
        accepts_incomplete: bool,
    ) -> Result<ProvisionedServiceSpec, BrokerError> {
        self.do_provision(instance_id, details, accepts_incomplete).await
    }

    async fn update(
        &self,
        instance_id: &str,
        details: UpdateDetails,
        accepts_incomplete: bool,
    ) -> Result<UpdateServiceSpec, BrokerError> {
        self.do_update(instance_id, details, accepts_incomplete).await
    }

    async fn deprovision(
        &self,
        instance_id: &str,
        details: DeprovisionDetails,
        accepts_incomplete: bool,
    ) -> Result<DeprovisionServiceSpec, BrokerError> {
        self.do_deprovision(instance_id, details, accepts_incomplete).await
    }

    async fn bind(&self, instance_id: &str, binding_id: &str, details: BindDetails) -> Result<Binding, BrokerError> {
        self.do_bind(instance_id, binding_id, details).await
    }

    async fn unbind(&self, instance_id: &str, binding_id: &str, details: UnbindDetails) -> Result<(), BrokerError> {
        self.do_unbind(instance_id, binding_id, details).await
    }

    async fn last_operation(&self, instance_id: &str) -> Result<LastOperation, BrokerError> {
        self.do_last_operation(instance_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_order_and_drops_duplicates() {
        let base = vec!["postgis".to_string(), "citext".to_string()];
        let additional = vec!["citext".to_string(), "pgaudit".to_string()];
        assert_eq!(merge_extensions(&base, &additional), vec!["postgis", "citext", "pgaudit"]);
    }
}
