//! Selection and materialization of DB parameter groups. Identity is the
//! deterministic name: instances whose plan family and preload extension set
//! coincide land on the same group, with no side table anywhere.

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use rds_broker_awsrds::tags::TAG_BROKER_NAME;
use rds_broker_awsrds::{ApplyMethod, CreateParameterGroupInput, ParameterSetting, RdsError, RdsInstanceClient, Tags};

use crate::catalog::{Engine, ServicePlan};
use crate::errors::BrokerError;

#[derive(Debug, Clone, Copy)]
pub struct DbExtension {
    pub name: &'static str,
    pub requires_preload_library: bool,
}

lazy_static! {
    /// Extensions the broker understands, by engine family. Only entries
    /// with `requires_preload_library` influence parameter-group identity.
    pub static ref SUPPORTED_EXTENSIONS: HashMap<&'static str, Vec<DbExtension>> = {
        let postgres = vec![
            DbExtension { name: "pg_stat_statements", requires_preload_library: true },
            DbExtension { name: "pgaudit", requires_preload_library: true },
            DbExtension { name: "pg_cron", requires_preload_library: true },
            DbExtension { name: "postgis", requires_preload_library: false },
            DbExtension { name: "uuid-ossp", requires_preload_library: false },
            DbExtension { name: "pgcrypto", requires_preload_library: false },
            DbExtension { name: "citext", requires_preload_library: false },
            DbExtension { name: "hstore", requires_preload_library: false },
            DbExtension { name: "pg_trgm", requires_preload_library: false },
            DbExtension { name: "btree_gin", requires_preload_library: false },
            DbExtension { name: "btree_gist", requires_preload_library: false },
            DbExtension { name: "ltree", requires_preload_library: false },
            DbExtension { name: "tablefunc", requires_preload_library: false },
            DbExtension { name: "unaccent", requires_preload_library: false },
        ];
        let mut map = HashMap::new();
        for family in [
            "postgres10",
            "postgres11",
            "postgres12",
            "postgres13",
            "postgres14",
            "postgres15",
            "postgres16",
        ] {
            map.insert(family, postgres.clone());
        }
        for family in ["mysql5.7", "mysql8.0", "mariadb10.4", "mariadb10.5", "mariadb10.6"] {
            map.insert(family, Vec::new());
        }
        map
    };
}

fn normalize(name: &str) -> String {
    name.chars().filter(|c| !matches!(c, '.' | '_' | '-')).collect()
}

/// The subset of `requested` that needs a shared-library preload in
/// `engine_family`, sorted by normalized name so callers get an
/// order-independent result.
pub fn preload_extensions(engine_family: &str, requested: &[String]) -> Vec<String> {
    let Some(supported) = SUPPORTED_EXTENSIONS.get(engine_family) else {
        return Vec::new();
    };
    let mut preload: Vec<String> = requested
        .iter()
        .filter(|name| {
            supported
                .iter()
                .any(|ext| ext.requires_preload_library && ext.name == name.as_str())
        })
        .cloned()
        .collect();
    preload.sort_by_key(|name| normalize(name));
    preload.dedup();
    preload
}

/// `<prefix>-<family>-<broker>[-<preload extensions>]`, everything
/// normalized. The suffix appears only for postgres plans that request
/// preload-requiring extensions.
pub fn compose_group_name(db_prefix: &str, broker_name: &str, plan: &ServicePlan, extensions: &[String]) -> String {
    let family = &plan.rds_properties.engine_family;
    let mut name = format!("{}-{}-{}", db_prefix, normalize(family), broker_name);
    if plan.engine_kind() == Some(Engine::Postgres) {
        let preload = preload_extensions(family, extensions);
        if !preload.is_empty() {
            let suffix: Vec<String> = preload.iter().map(|ext| normalize(ext)).collect();
            name = format!("{name}-{}", suffix.join("-"));
        }
    }
    name
}

pub struct ParameterGroupSelector {
    rds: Arc<dyn RdsInstanceClient>,
    db_prefix: String,
    broker_name: String,
}

impl ParameterGroupSelector {
    pub fn new(rds: Arc<dyn RdsInstanceClient>, db_prefix: String, broker_name: String) -> Self {
        ParameterGroupSelector {
            rds,
            db_prefix,
            broker_name,
        }
    }

    pub fn group_name(&self, plan: &ServicePlan, extensions: &[String]) -> String {
        compose_group_name(&self.db_prefix, &self.broker_name, plan, extensions)
    }

    /// Returns the name of the parameter group the instance must run under,
    /// creating and configuring the group on first use.
    pub async fn select(&self, plan: &ServicePlan, extensions: &[String]) -> Result<String, BrokerError> {
        let name = self.group_name(plan, extensions);

        match self.rds.get_parameter_group(&name).await {
            Ok(_) => return Ok(name),
            Err(RdsError::ParameterGroupNotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }

        tracing::info!(name = %name, "parameter group missing, creating it");
        self.materialize(plan, extensions, &name).await?;
        Ok(name)
    }

    async fn materialize(&self, plan: &ServicePlan, extensions: &[String], name: &str) -> Result<(), BrokerError> {
        let family = &plan.rds_properties.engine_family;

        let mut tags = Tags::new();
        tags.insert(TAG_BROKER_NAME, self.broker_name.clone());

        self.rds
            .create_parameter_group(CreateParameterGroupInput {
                name: name.to_string(),
                family: family.clone(),
                description: format!("{family} parameter group managed by {}", self.broker_name),
                tags,
            })
            .await?;

        let mut parameters = vec![
            ParameterSetting::new("rds.force_ssl", "1", ApplyMethod::PendingReboot),
            ParameterSetting::new("rds.log_retention_period", "10080", ApplyMethod::Immediate),
        ];
        if plan.engine_kind() == Some(Engine::Postgres) {
            let preload = preload_extensions(family, extensions);
            if !preload.is_empty() {
                parameters.push(ParameterSetting::new(
                    "shared_preload_libraries",
                    &preload.join(","),
                    ApplyMethod::PendingReboot,
                ));
            }
        }

        self.rds.modify_parameter_group(name, &parameters).await?;
        Ok(())
    }
}
