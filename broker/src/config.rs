use std::path::Path;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;

/// Broker settings, loaded once at startup from `config.ron`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub region: String,
    pub db_prefix: String,
    pub broker_name: String,
    pub master_password_seed: String,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default)]
    pub allow_user_provision_parameters: bool,
    #[serde(default)]
    pub allow_user_update_parameters: bool,
    #[serde(default)]
    pub allow_user_bind_parameters: bool,
    #[serde(default)]
    pub catalog: Catalog,
}

fn default_owner() -> String {
    String::from("Cloud Foundry")
}

impl Default for BrokerConfig {
    fn default() -> Self {
        BrokerConfig {
            region: String::new(),
            db_prefix: String::new(),
            broker_name: String::new(),
            master_password_seed: String::new(),
            owner: default_owner(),
            allow_user_provision_parameters: false,
            allow_user_update_parameters: false,
            allow_user_bind_parameters: false,
            catalog: Catalog::default(),
        }
    }
}

impl BrokerConfig {
    pub fn try_load(path: &Path) -> anyhow::Result<BrokerConfig> {
        tracing::info!("loading broker config file at {:?}", path);
        let config: BrokerConfig = ron::from_str(&std::fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.region.is_empty() {
            bail!("region is required");
        }
        if self.db_prefix.is_empty() {
            bail!("db_prefix is required");
        }
        if self.broker_name.is_empty() {
            bail!("broker_name is required");
        }
        if self.master_password_seed.is_empty() {
            bail!("master_password_seed is required");
        }
        self.catalog.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> BrokerConfig {
        BrokerConfig {
            region: "eu-west-1".to_string(),
            db_prefix: "cf".to_string(),
            broker_name: "mybroker".to_string(),
            master_password_seed: "a-seed".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_a_complete_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn rejects_missing_required_fields() {
        for strip in ["region", "db_prefix", "broker_name", "master_password_seed"] {
            let mut config = valid_config();
            match strip {
                "region" => config.region.clear(),
                "db_prefix" => config.db_prefix.clear(),
                "broker_name" => config.broker_name.clear(),
                _ => config.master_password_seed.clear(),
            }
            let err = config.validate().unwrap_err().to_string();
            assert!(err.contains(strip), "{err}");
        }
    }

    #[test]
    fn parses_the_ron_shape() {
        let raw = r#"(
            region: "eu-west-1",
            db_prefix: "cf",
            broker_name: "mybroker",
            master_password_seed: "a-seed",
            allow_user_provision_parameters: true,
        )"#;
        let config: BrokerConfig = ron::from_str(raw).unwrap();
        assert_eq!(config.region, "eu-west-1");
        assert!(config.allow_user_provision_parameters);
        assert!(!config.allow_user_update_parameters);
        assert_eq!(config.owner, "Cloud Foundry");
    }
}
