//! Recording fakes for the two collaborators, plus catalog fixtures. Tests
//! configure the state up front and assert on the recorded calls afterwards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rds_broker_awsrds::{
    CreateInstanceInput, CreateParameterGroupInput, DbInstanceDetails, DbParameterGroupDetails, DbSnapshotDetails,
    ModifyInstanceInput, ParameterSetting, RdsError, RdsInstanceClient, RestoreFromSnapshotInput,
    RestoreToPointInTimeInput, Tags,
};
use rds_broker_sqlengine::{CreatedUser, SqlEngine, SqlEngineError, SqlEngineProvider};

use crate::catalog::{Catalog, RdsProperties, Service, ServicePlan};
use crate::config::BrokerConfig;

#[derive(Default)]
pub(crate) struct MockRdsState {
    pub instance: Option<DbInstanceDetails>,
    pub snapshots: Vec<DbSnapshotDetails>,
    pub resource_tags: HashMap<String, Tags>,
    pub parameter_groups: HashMap<String, DbParameterGroupDetails>,
    pub latest_minor_version: Option<String>,
    pub full_valid_target_version: Option<String>,

    pub create_calls: Vec<(String, CreateInstanceInput)>,
    pub restore_calls: Vec<(String, RestoreFromSnapshotInput)>,
    pub restore_pit_calls: Vec<(String, RestoreToPointInTimeInput)>,
    pub modify_calls: Vec<(String, ModifyInstanceInput)>,
    pub reboot_calls: Vec<(String, Option<bool>)>,
    pub delete_calls: Vec<(String, bool)>,
    pub add_tags_calls: Vec<(String, Tags)>,
    pub removed_tags: Vec<(String, String)>,
    pub created_parameter_groups: Vec<CreateParameterGroupInput>,
    pub modified_parameter_groups: Vec<(String, Vec<ParameterSetting>)>,
}

#[derive(Default)]
pub(crate) struct MockRdsClient {
    pub state: Mutex<MockRdsState>,
}

impl MockRdsClient {
    pub fn new() -> Arc<MockRdsClient> {
        Arc::new(MockRdsClient::default())
    }

    pub fn set_instance(&self, instance: DbInstanceDetails) {
        self.state.lock().unwrap().instance = Some(instance);
    }

    pub fn set_snapshots(&self, snapshots: Vec<DbSnapshotDetails>) {
        self.state.lock().unwrap().snapshots = snapshots;
    }

    pub fn set_resource_tags(&self, arn: &str, tags: Tags) {
        self.state.lock().unwrap().resource_tags.insert(arn.to_string(), tags);
    }

    pub fn add_parameter_group(&self, name: &str) {
        self.state.lock().unwrap().parameter_groups.insert(
            name.to_string(),
            DbParameterGroupDetails {
                name: name.to_string(),
                family: String::new(),
            },
        );
    }

    pub fn set_full_valid_target_version(&self, version: &str) {
        self.state.lock().unwrap().full_valid_target_version = Some(version.to_string());
    }

    pub fn set_latest_minor_version(&self, version: &str) {
        self.state.lock().unwrap().latest_minor_version = Some(version.to_string());
    }

    pub fn create_calls(&self) -> Vec<(String, CreateInstanceInput)> {
        self.state.lock().unwrap().create_calls.clone()
    }

    pub fn restore_calls(&self) -> Vec<(String, RestoreFromSnapshotInput)> {
        self.state.lock().unwrap().restore_calls.clone()
    }

    pub fn restore_pit_calls(&self) -> Vec<(String, RestoreToPointInTimeInput)> {
        self.state.lock().unwrap().restore_pit_calls.clone()
    }

    pub fn modify_calls(&self) -> Vec<(String, ModifyInstanceInput)> {
        self.state.lock().unwrap().modify_calls.clone()
    }

    pub fn reboot_calls(&self) -> Vec<(String, Option<bool>)> {
        self.state.lock().unwrap().reboot_calls.clone()
    }

    pub fn delete_calls(&self) -> Vec<(String, bool)> {
        self.state.lock().unwrap().delete_calls.clone()
    }

    pub fn add_tags_calls(&self) -> Vec<(String, Tags)> {
        self.state.lock().unwrap().add_tags_calls.clone()
    }

    pub fn removed_tags(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().removed_tags.clone()
    }

    pub fn created_parameter_groups(&self) -> Vec<CreateParameterGroupInput> {
        self.state.lock().unwrap().created_parameter_groups.clone()
    }

    pub fn modified_parameter_groups(&self) -> Vec<(String, Vec<ParameterSetting>)> {
        self.state.lock().unwrap().modified_parameter_groups.clone()
    }
}

#[async_trait]
impl RdsInstanceClient for MockRdsClient {
    async fn create(&self, identifier: &str, input: CreateInstanceInput) -> Result<(), RdsError> {
        self.state
            .lock()
            .unwrap()
            .create_calls
            .push((identifier.to_string(), input));
        Ok(())
    }

    async fn restore_from_snapshot(&self, identifier: &str, input: RestoreFromSnapshotInput) -> Result<(), RdsError> {
        self.state
            .lock()
            .unwrap()
            .restore_calls
            .push((identifier.to_string(), input));
        Ok(())
    }

    async fn restore_to_point_in_time(
        &self,
        identifier: &str,
        input: RestoreToPointInTimeInput,
    ) -> Result<(), RdsError> {
        self.state
            .lock()
            .unwrap()
            .restore_pit_calls
            .push((identifier.to_string(), input));
        Ok(())
    }

    async fn modify(&self, identifier: &str, input: ModifyInstanceInput) -> Result<(), RdsError> {
        self.state
            .lock()
            .unwrap()
            .modify_calls
            .push((identifier.to_string(), input));
        Ok(())
    }

    async fn reboot(&self, identifier: &str, force_failover: Option<bool>) -> Result<(), RdsError> {
        self.state
            .lock()
            .unwrap()
            .reboot_calls
            .push((identifier.to_string(), force_failover));
        Ok(())
    }

    async fn delete(&self, identifier: &str, skip_final_snapshot: bool) -> Result<(), RdsError> {
        let mut state = self.state.lock().unwrap();
        if state.instance.is_none() {
            return Err(RdsError::InstanceNotFound);
        }
        state.delete_calls.push((identifier.to_string(), skip_final_snapshot));
        Ok(())
    }

    async fn describe(&self, _identifier: &str) -> Result<DbInstanceDetails, RdsError> {
        self.state
            .lock()
            .unwrap()
            .instance
            .clone()
            .ok_or(RdsError::InstanceNotFound)
    }

    async fn describe_by_tag(&self, key: &str, value: &str) -> Result<Vec<DbInstanceDetails>, RdsError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .instance
            .iter()
            .filter(|instance| instance.tags.get(key) == Some(value))
            .cloned()
            .collect())
    }

    async fn describe_snapshots(&self, _instance_identifier: &str) -> Result<Vec<DbSnapshotDetails>, RdsError> {
        Ok(self.state.lock().unwrap().snapshots.clone())
    }

    async fn get_resource_tags(&self, arn: &str) -> Result<Tags, RdsError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .resource_tags
            .get(arn)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_tags_to_resource(&self, arn: &str, tags: &Tags) -> Result<(), RdsError> {
        self.state
            .lock()
            .unwrap()
            .add_tags_calls
            .push((arn.to_string(), tags.clone()));
        Ok(())
    }

    async fn get_tag(&self, _identifier: &str, key: &str) -> Result<Option<String>, RdsError> {
        let state = self.state.lock().unwrap();
        let instance = state.instance.as_ref().ok_or(RdsError::InstanceNotFound)?;
        Ok(instance.tags.get(key).map(str::to_string))
    }

    async fn remove_tag(&self, identifier: &str, key: &str) -> Result<(), RdsError> {
        let mut state = self.state.lock().unwrap();
        if let Some(instance) = state.instance.as_mut() {
            instance.tags.remove(key);
        }
        state.removed_tags.push((identifier.to_string(), key.to_string()));
        Ok(())
    }

    async fn get_parameter_group(&self, name: &str) -> Result<DbParameterGroupDetails, RdsError> {
        self.state
            .lock()
            .unwrap()
            .parameter_groups
            .get(name)
            .cloned()
            .ok_or_else(|| RdsError::ParameterGroupNotFound(name.to_string()))
    }

    async fn create_parameter_group(&self, input: CreateParameterGroupInput) -> Result<(), RdsError> {
        let mut state = self.state.lock().unwrap();
        state.parameter_groups.insert(
            input.name.clone(),
            DbParameterGroupDetails {
                name: input.name.clone(),
                family: input.family.clone(),
            },
        );
        state.created_parameter_groups.push(input);
        Ok(())
    }

    async fn modify_parameter_group(&self, name: &str, parameters: &[ParameterSetting]) -> Result<(), RdsError> {
        self.state
            .lock()
            .unwrap()
            .modified_parameter_groups
            .push((name.to_string(), parameters.to_vec()));
        Ok(())
    }

    async fn get_latest_minor_version(&self, _engine: &str, _version: &str) -> Result<Option<String>, RdsError> {
        Ok(self.state.lock().unwrap().latest_minor_version.clone())
    }

    async fn get_full_valid_target_version(
        &self,
        _engine: &str,
        _current_version: &str,
        _target_major: u64,
    ) -> Result<Option<String>, RdsError> {
        Ok(self.state.lock().unwrap().full_valid_target_version.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum OpenBehavior {
    #[default]
    Succeed,
    LoginFailed,
    OtherError,
}

#[derive(Default)]
pub(crate) struct MockSqlState {
    pub open_behavior: OpenBehavior,
    pub open_calls: Vec<(String, i64, String, String, String)>,
    pub close_calls: usize,
    pub created_users: Vec<(String, String, bool)>,
    pub dropped_users: Vec<String>,
    pub created_extensions: Vec<Vec<String>>,
    pub dropped_extensions: Vec<Vec<String>>,
    pub reset_state_calls: usize,
}

pub(crate) struct MockSqlProvider {
    pub state: Arc<Mutex<MockSqlState>>,
}

impl MockSqlProvider {
    pub fn new() -> Arc<MockSqlProvider> {
        Arc::new(MockSqlProvider {
            state: Arc::new(Mutex::new(MockSqlState::default())),
        })
    }

    pub fn set_open_behavior(&self, behavior: OpenBehavior) {
        self.state.lock().unwrap().open_behavior = behavior;
    }

    pub fn open_calls(&self) -> Vec<(String, i64, String, String, String)> {
        self.state.lock().unwrap().open_calls.clone()
    }

    pub fn close_calls(&self) -> usize {
        self.state.lock().unwrap().close_calls
    }

    pub fn created_users(&self) -> Vec<(String, String, bool)> {
        self.state.lock().unwrap().created_users.clone()
    }

    pub fn dropped_users(&self) -> Vec<String> {
        self.state.lock().unwrap().dropped_users.clone()
    }

    pub fn created_extensions(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().created_extensions.clone()
    }

    pub fn dropped_extensions(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().dropped_extensions.clone()
    }

    pub fn reset_state_calls(&self) -> usize {
        self.state.lock().unwrap().reset_state_calls
    }
}

impl SqlEngineProvider for MockSqlProvider {
    fn engine(&self, _engine: &str) -> Result<Box<dyn SqlEngine>, SqlEngineError> {
        Ok(Box::new(MockSqlEngine {
            state: Arc::clone(&self.state),
        }))
    }
}

pub(crate) struct MockSqlEngine {
    state: Arc<Mutex<MockSqlState>>,
}

#[async_trait]
impl SqlEngine for MockSqlEngine {
    async fn open(
        &mut self,
        address: &str,
        port: i64,
        db_name: &str,
        username: &str,
        password: &str,
    ) -> Result<(), SqlEngineError> {
        let mut state = self.state.lock().unwrap();
        state.open_calls.push((
            address.to_string(),
            port,
            db_name.to_string(),
            username.to_string(),
            password.to_string(),
        ));
        match state.open_behavior {
            OpenBehavior::Succeed => Ok(()),
            OpenBehavior::LoginFailed => Err(SqlEngineError::LoginFailed),
            OpenBehavior::OtherError => Err(SqlEngineError::NotOpen),
        }
    }

    async fn close(&mut self) {
        self.state.lock().unwrap().close_calls += 1;
    }

    async fn create_user(
        &self,
        binding_id: &str,
        db_name: &str,
        read_only: bool,
    ) -> Result<CreatedUser, SqlEngineError> {
        self.state
            .lock()
            .unwrap()
            .created_users
            .push((binding_id.to_string(), db_name.to_string(), read_only));
        Ok(CreatedUser {
            username: format!("user-{binding_id}"),
            password: "generated-password".to_string(),
        })
    }

    async fn drop_user(&self, binding_id: &str) -> Result<(), SqlEngineError> {
        self.state.lock().unwrap().dropped_users.push(binding_id.to_string());
        Ok(())
    }

    async fn create_extensions(&self, extensions: &[String]) -> Result<(), SqlEngineError> {
        self.state.lock().unwrap().created_extensions.push(extensions.to_vec());
        Ok(())
    }

    async fn drop_extensions(&self, extensions: &[String]) -> Result<(), SqlEngineError> {
        self.state.lock().unwrap().dropped_extensions.push(extensions.to_vec());
        Ok(())
    }

    async fn reset_state(&self) -> Result<(), SqlEngineError> {
        self.state.lock().unwrap().reset_state_calls += 1;
        Ok(())
    }

    fn uri(&self, address: &str, port: i64, db_name: &str, username: &str, password: &str) -> String {
        format!("mock://{username}:{password}@{address}:{port}/{db_name}")
    }

    fn jdbc_uri(&self, address: &str, port: i64, db_name: &str, username: &str, password: &str) -> String {
        format!("jdbc:mock://{address}:{port}/{db_name}?user={username}&password={password}")
    }
}

pub(crate) fn rds_trait(rds: &Arc<MockRdsClient>) -> Arc<dyn RdsInstanceClient> {
    let client: Arc<MockRdsClient> = Arc::clone(rds);
    client
}

pub(crate) fn sql_trait(sql: &Arc<MockSqlProvider>) -> Arc<dyn SqlEngineProvider> {
    let provider: Arc<MockSqlProvider> = Arc::clone(sql);
    provider
}

pub(crate) fn make_broker(catalog: Catalog) -> (crate::RdsBroker, Arc<MockRdsClient>, Arc<MockSqlProvider>) {
    let rds = MockRdsClient::new();
    let sql = MockSqlProvider::new();
    let broker = crate::RdsBroker::new(test_config(catalog), rds_trait(&rds), sql_trait(&sql));
    (broker, rds, sql)
}

pub(crate) fn postgres_plan(id: &str, version: &str, family: &str) -> ServicePlan {
    ServicePlan {
        id: id.to_string(),
        name: id.to_string(),
        description: format!("postgres {version}"),
        free: None,
        metadata: None,
        rds_properties: RdsProperties {
            db_instance_class: "db.t3.medium".to_string(),
            engine: "postgres".to_string(),
            engine_version: version.to_string(),
            engine_family: family.to_string(),
            allocated_storage: Some(100),
            backup_retention_period: Some(7),
            storage_encrypted: Some(true),
            allowed_extensions: vec![
                "postgis".to_string(),
                "pg_stat_statements".to_string(),
                "pgaudit".to_string(),
                "citext".to_string(),
            ],
            ..Default::default()
        },
    }
}

pub(crate) fn mysql_plan(id: &str, version: &str, family: &str) -> ServicePlan {
    ServicePlan {
        id: id.to_string(),
        name: id.to_string(),
        description: format!("mysql {version}"),
        free: None,
        metadata: None,
        rds_properties: RdsProperties {
            db_instance_class: "db.t3.medium".to_string(),
            engine: "mysql".to_string(),
            engine_version: version.to_string(),
            engine_family: family.to_string(),
            ..Default::default()
        },
    }
}

pub(crate) fn test_catalog(plans: Vec<ServicePlan>) -> Catalog {
    Catalog {
        services: vec![Service {
            id: "svc-1".to_string(),
            name: "rds".to_string(),
            description: "managed relational databases".to_string(),
            bindable: true,
            tags: vec![],
            metadata: None,
            plan_updateable: true,
            plans,
        }],
        exclude_engines: vec![],
    }
}

pub(crate) fn test_config(catalog: Catalog) -> BrokerConfig {
    BrokerConfig {
        region: "eu-west-1".to_string(),
        db_prefix: "cf".to_string(),
        broker_name: "mybroker".to_string(),
        master_password_seed: "a-seed".to_string(),
        owner: "Cloud Foundry".to_string(),
        allow_user_provision_parameters: true,
        allow_user_update_parameters: true,
        allow_user_bind_parameters: true,
        catalog,
    }
}

pub(crate) fn available_instance(identifier: &str, engine: &str, version: &str) -> DbInstanceDetails {
    DbInstanceDetails {
        identifier: identifier.to_string(),
        arn: format!("arn:aws:rds:eu-west-1:123456789012:db:{identifier}"),
        status: "available".to_string(),
        engine: engine.to_string(),
        engine_version: version.to_string(),
        db_name: Some(identifier.replace('-', "_")),
        master_username: "master".to_string(),
        address: Some("db.example.com".to_string()),
        port: Some(5432),
        parameter_group_name: Some("cf-postgres12-mybroker".to_string()),
        parameter_apply_status: Some("in-sync".to_string()),
        pending_modifications: false,
        tags: Tags::new(),
    }
}
