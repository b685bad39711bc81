use anyhow::bail;
use rds_broker_core::version::parse_lenient;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::BrokerError;

/// The engines this broker knows how to orchestrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Postgres,
    Mysql,
    Mariadb,
}

impl Engine {
    pub fn parse(engine: &str) -> Option<Engine> {
        match engine.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Engine::Postgres),
            "mysql" => Some(Engine::Mysql),
            "mariadb" => Some(Engine::Mariadb),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub services: Vec<Service>,
    #[serde(default)]
    pub exclude_engines: Vec<EngineExclusion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineExclusion {
    pub engine: String,
    pub version_pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub bindable: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub plan_updateable: bool,
    pub plans: Vec<ServicePlan>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicePlan {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub free: Option<bool>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    pub rds_properties: RdsProperties,
}

/// Per-plan RDS shape. Every instance created from the plan inherits these;
/// only the windows and the final-snapshot flag can be overridden per
/// request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RdsProperties {
    pub db_instance_class: String,
    pub engine: String,
    pub engine_version: String,
    pub engine_family: String,
    #[serde(default)]
    pub allocated_storage: Option<i32>,
    #[serde(default)]
    pub auto_minor_version_upgrade: Option<bool>,
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub backup_retention_period: Option<i32>,
    #[serde(default)]
    pub character_set_name: Option<String>,
    #[serde(default)]
    pub copy_tags_to_snapshot: Option<bool>,
    #[serde(default)]
    pub db_subnet_group_name: Option<String>,
    #[serde(default)]
    pub license_model: Option<String>,
    #[serde(default)]
    pub multi_az: Option<bool>,
    #[serde(default)]
    pub option_group_name: Option<String>,
    #[serde(default)]
    pub port: Option<i32>,
    #[serde(default)]
    pub preferred_backup_window: Option<String>,
    #[serde(default)]
    pub preferred_maintenance_window: Option<String>,
    #[serde(default)]
    pub publicly_accessible: Option<bool>,
    #[serde(default)]
    pub skip_final_snapshot: Option<bool>,
    #[serde(default)]
    pub storage_encrypted: Option<bool>,
    #[serde(default)]
    pub kms_key_id: Option<String>,
    #[serde(default)]
    pub storage_type: Option<String>,
    #[serde(default)]
    pub iops: Option<i32>,
    #[serde(default)]
    pub vpc_security_group_ids: Option<Vec<String>>,
    #[serde(default)]
    pub default_extensions: Vec<String>,
    #[serde(default)]
    pub allowed_extensions: Vec<String>,
}

impl Catalog {
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut exclusions = Vec::with_capacity(self.exclude_engines.len());
        for exclusion in &self.exclude_engines {
            match Regex::new(&exclusion.version_pattern) {
                Ok(pattern) => exclusions.push((exclusion.engine.as_str(), pattern)),
                Err(err) => bail!(
                    "exclude_engines pattern '{}' does not compile: {err}",
                    exclusion.version_pattern
                ),
            }
        }

        for service in &self.services {
            for plan in &service.plans {
                let props = &plan.rds_properties;
                if props.db_instance_class.is_empty() {
                    bail!("service '{}' plan '{}': db_instance_class is required", service.id, plan.id);
                }
                if props.engine.is_empty() {
                    bail!("service '{}' plan '{}': engine is required", service.id, plan.id);
                }
                if Engine::parse(&props.engine).is_none() {
                    bail!(
                        "service '{}' plan '{}': engine '{}' is not supported",
                        service.id,
                        plan.id,
                        props.engine
                    );
                }
                if parse_lenient(&props.engine_version).is_err() {
                    bail!(
                        "service '{}' plan '{}': engine version '{}' is not a valid version",
                        service.id,
                        plan.id,
                        props.engine_version
                    );
                }
                for (engine, pattern) in &exclusions {
                    if engine.eq_ignore_ascii_case(&props.engine) && pattern.is_match(&props.engine_version) {
                        bail!(
                            "service '{}' plan '{}': engine version '{}' is excluded",
                            service.id,
                            plan.id,
                            props.engine_version
                        );
                    }
                }
            }
        }
        Ok(())
    }

    pub fn find_service(&self, service_id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == service_id)
    }

    pub fn find_plan(&self, plan_id: &str) -> Option<(&Service, &ServicePlan)> {
        for service in &self.services {
            if let Some(plan) = service.plans.iter().find(|p| p.id == plan_id) {
                return Some((service, plan));
            }
        }
        None
    }

    /// The catalog as served over `GET /v2/catalog`: engine internals are
    /// stripped and every service is forced bindable.
    pub fn api_services(&self) -> Vec<ApiService> {
        self.services
            .iter()
            .map(|service| ApiService {
                id: service.id.clone(),
                name: service.name.clone(),
                description: service.description.clone(),
                bindable: true,
                tags: service.tags.clone(),
                metadata: service.metadata.clone(),
                plan_updateable: service.plan_updateable,
                plans: service
                    .plans
                    .iter()
                    .map(|plan| ApiServicePlan {
                        id: plan.id.clone(),
                        name: plan.name.clone(),
                        description: plan.description.clone(),
                        free: plan.free,
                        metadata: plan.metadata.clone(),
                        maintenance_info: MaintenanceInfo {
                            version: plan.rds_properties.engine_version.clone(),
                        },
                    })
                    .collect(),
            })
            .collect()
    }
}

impl ServicePlan {
    pub fn engine_kind(&self) -> Option<Engine> {
        Engine::parse(&self.rds_properties.engine)
    }

    /// True iff this plan's engine version is strictly newer than
    /// `previous`'s. Errors when the plans run different engines.
    pub fn is_upgrade_from(&self, previous: &ServicePlan) -> Result<bool, BrokerError> {
        if !self.rds_properties.engine.eq_ignore_ascii_case(&previous.rds_properties.engine) {
            return Err(BrokerError::InvalidParameters(
                "cannot change the engine of an existing instance".to_string(),
            ));
        }
        let new = parse_version(&self.rds_properties.engine_version)?;
        let old = parse_version(&previous.rds_properties.engine_version)?;
        Ok(new > old)
    }
}

pub(crate) fn parse_version(version: &str) -> Result<semver::Version, BrokerError> {
    parse_lenient(version).map_err(|_| BrokerError::InvalidEngineVersion(version.to_string()))
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiService {
    pub id: String,
    pub name: String,
    pub description: String,
    pub bindable: bool,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub plan_updateable: bool,
    pub plans: Vec<ApiServicePlan>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiServicePlan {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub maintenance_info: MaintenanceInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceInfo {
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(id: &str, engine: &str, version: &str) -> ServicePlan {
        ServicePlan {
            id: id.to_string(),
            name: id.to_string(),
            description: "a plan".to_string(),
            free: None,
            metadata: None,
            rds_properties: RdsProperties {
                db_instance_class: "db.t3.medium".to_string(),
                engine: engine.to_string(),
                engine_version: version.to_string(),
                engine_family: format!("{engine}{version}"),
                ..Default::default()
            },
        }
    }

    fn catalog_with(plans: Vec<ServicePlan>) -> Catalog {
        Catalog {
            services: vec![Service {
                id: "svc-1".to_string(),
                name: "rds".to_string(),
                description: "managed databases".to_string(),
                bindable: false,
                tags: vec![],
                metadata: None,
                plan_updateable: true,
                plans,
            }],
            exclude_engines: vec![],
        }
    }

    #[test]
    fn validates_a_well_formed_catalog() {
        let catalog = catalog_with(vec![plan("p1", "postgres", "12"), plan("p2", "mariadb", "10.4")]);
        assert!(catalog.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_engines() {
        let catalog = catalog_with(vec![plan("p1", "oracle", "19")]);
        let err = catalog.validate().unwrap_err().to_string();
        assert!(err.contains("not supported"), "{err}");
    }

    #[test]
    fn rejects_plans_missing_the_instance_class() {
        let mut bad = plan("p1", "postgres", "12");
        bad.rds_properties.db_instance_class.clear();
        let catalog = catalog_with(vec![bad]);
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn rejects_excluded_engine_versions() {
        let mut catalog = catalog_with(vec![plan("p1", "postgres", "9.5")]);
        catalog.exclude_engines = vec![EngineExclusion {
            engine: "postgres".to_string(),
            version_pattern: r"^9\..*".to_string(),
        }];
        let err = catalog.validate().unwrap_err().to_string();
        assert!(err.contains("excluded"), "{err}");
    }

    #[test]
    fn finds_plans_across_services() {
        let catalog = catalog_with(vec![plan("p1", "postgres", "12"), plan("p2", "mysql", "8.0")]);
        assert!(catalog.find_service("svc-1").is_some());
        assert!(catalog.find_service("nope").is_none());
        let (service, found) = catalog.find_plan("p2").unwrap();
        assert_eq!(service.id, "svc-1");
        assert_eq!(found.id, "p2");
        assert!(catalog.find_plan("nope").is_none());
    }

    #[test]
    fn api_view_forces_bindable_and_strips_rds_properties() {
        let catalog = catalog_with(vec![plan("p1", "postgres", "12")]);
        let services = catalog.api_services();
        assert!(services[0].bindable);
        assert_eq!(services[0].plans[0].maintenance_info.version, "12");
        let rendered = serde_json::to_string(&services).unwrap();
        assert!(!rendered.contains("db_instance_class"));
        assert!(!rendered.contains("engine"));
    }

    #[test]
    fn upgrade_comparison_is_strict_semver() {
        let pg10 = plan("pg10", "postgres", "10");
        let pg12 = plan("pg12", "postgres", "12");
        let pg12_again = plan("pg12b", "postgres", "12");
        assert!(pg12.is_upgrade_from(&pg10).unwrap());
        assert!(!pg10.is_upgrade_from(&pg12).unwrap());
        assert!(!pg12.is_upgrade_from(&pg12_again).unwrap());
    }

    #[test]
    fn upgrade_comparison_rejects_engine_changes() {
        let pg = plan("pg", "postgres", "12");
        let my = plan("my", "mysql", "8.0");
        assert!(pg.is_upgrade_from(&my).is_err());
    }
}
