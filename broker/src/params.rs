//! User-supplied request parameters. Decoding is strict: unknown fields are
//! rejected so a typo never silently drops an option.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::errors::BrokerError;

lazy_static! {
    static ref BACKUP_WINDOW: Regex =
        Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]-([01][0-9]|2[0-3]):[0-5][0-9]$").unwrap();
    static ref MAINTENANCE_WINDOW: Regex = Regex::new(
        r"^(mon|tue|wed|thu|fri|sat|sun):([01][0-9]|2[0-3]):[0-5][0-9]-(mon|tue|wed|thu|fri|sat|sun):([01][0-9]|2[0-3]):[0-5][0-9]$"
    )
    .unwrap();
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvisionParameters {
    #[serde(default)]
    pub skip_final_snapshot: Option<bool>,
    #[serde(default)]
    pub preferred_backup_window: Option<String>,
    #[serde(default)]
    pub preferred_maintenance_window: Option<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub restore_from_latest_snapshot_of: Option<String>,
    #[serde(default)]
    pub restore_from_latest_snapshot_before: Option<String>,
    #[serde(default)]
    pub restore_from_point_in_time_of: Option<String>,
    #[serde(default)]
    pub restore_from_point_in_time_before: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateParameters {
    #[serde(default)]
    pub apply_at_maintenance_window: bool,
    #[serde(default)]
    pub skip_final_snapshot: Option<bool>,
    #[serde(default)]
    pub enable_extensions: Vec<String>,
    #[serde(default)]
    pub disable_extensions: Vec<String>,
    #[serde(default)]
    pub reboot: Option<bool>,
    #[serde(default)]
    pub force_failover: Option<bool>,
    #[serde(default)]
    pub update_minor_version_to_latest: Option<bool>,
    #[serde(default)]
    pub preferred_backup_window: Option<String>,
    #[serde(default)]
    pub preferred_maintenance_window: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindParameters {
    #[serde(default)]
    pub read_only: Option<bool>,
}

impl ProvisionParameters {
    pub fn validate(&self) -> Result<(), BrokerError> {
        validate_windows(&self.preferred_backup_window, &self.preferred_maintenance_window)?;

        if self.restore_from_latest_snapshot_of.is_some() && self.restore_from_point_in_time_of.is_some() {
            return Err(BrokerError::InvalidParameters(
                "restore_from_latest_snapshot_of and restore_from_point_in_time_of are mutually exclusive".to_string(),
            ));
        }
        if self.restore_from_latest_snapshot_before.is_some() && self.restore_from_latest_snapshot_of.is_none() {
            return Err(BrokerError::InvalidParameters(
                "restore_from_latest_snapshot_before requires restore_from_latest_snapshot_of".to_string(),
            ));
        }
        if self.restore_from_point_in_time_before.is_some() && self.restore_from_point_in_time_of.is_none() {
            return Err(BrokerError::InvalidParameters(
                "restore_from_point_in_time_before requires restore_from_point_in_time_of".to_string(),
            ));
        }

        self.snapshot_cutoff()?;
        self.point_in_time()?;
        Ok(())
    }

    /// Upper bound on snapshot creation time, when a `…_before` was given.
    pub fn snapshot_cutoff(&self) -> Result<Option<DateTime<Utc>>, BrokerError> {
        parse_timestamp(&self.restore_from_latest_snapshot_before)
    }

    pub fn point_in_time(&self) -> Result<Option<DateTime<Utc>>, BrokerError> {
        parse_timestamp(&self.restore_from_point_in_time_before)
    }
}

impl UpdateParameters {
    pub fn validate(&self) -> Result<(), BrokerError> {
        validate_windows(&self.preferred_backup_window, &self.preferred_maintenance_window)?;

        for extension in &self.enable_extensions {
            if self.disable_extensions.contains(extension) {
                return Err(BrokerError::InvalidParameters(format!(
                    "extension '{extension}' cannot be enabled and disabled in the same request"
                )));
            }
        }
        if self.force_failover.is_some() && !self.reboot.unwrap_or(false) {
            return Err(BrokerError::InvalidParameters(
                "force_failover requires reboot".to_string(),
            ));
        }
        Ok(())
    }

    /// True when the request asks for nothing but the reboot itself, which
    /// the broker then performs immediately instead of going through a
    /// modify cycle.
    pub fn is_reboot_only(&self) -> bool {
        self.enable_extensions.is_empty()
            && self.disable_extensions.is_empty()
            && !self.update_minor_version_to_latest.unwrap_or(false)
            && self.skip_final_snapshot.is_none()
            && self.preferred_backup_window.is_none()
            && self.preferred_maintenance_window.is_none()
    }
}

fn validate_windows(backup: &Option<String>, maintenance: &Option<String>) -> Result<(), BrokerError> {
    if let Some(window) = backup {
        if !BACKUP_WINDOW.is_match(window) {
            return Err(BrokerError::InvalidParameters(format!(
                "preferred_backup_window '{window}' must match hh:mm-hh:mm"
            )));
        }
    }
    if let Some(window) = maintenance {
        if !MAINTENANCE_WINDOW.is_match(window) {
            return Err(BrokerError::InvalidParameters(format!(
                "preferred_maintenance_window '{window}' must match ddd:hh:mm-ddd:hh:mm"
            )));
        }
    }
    Ok(())
}

fn parse_timestamp(value: &Option<String>) -> Result<Option<DateTime<Utc>>, BrokerError> {
    match value {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|err| BrokerError::InvalidParameters(format!("'{raw}' is not a valid RFC3339 timestamp: {err}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_are_rejected() {
        let raw = serde_json::json!({"skip_final_snapshot": true, "skip_final_snapshott": false});
        assert!(serde_json::from_value::<ProvisionParameters>(raw).is_err());

        let raw = serde_json::json!({"rebot": true});
        assert!(serde_json::from_value::<UpdateParameters>(raw).is_err());
    }

    #[test]
    fn restore_modes_are_mutually_exclusive() {
        let params = ProvisionParameters {
            restore_from_latest_snapshot_of: Some("a".to_string()),
            restore_from_point_in_time_of: Some("b".to_string()),
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(BrokerError::InvalidParameters(_))));
    }

    #[test]
    fn snapshot_cutoff_requires_a_source() {
        let params = ProvisionParameters {
            restore_from_latest_snapshot_before: Some("2024-01-01T00:00:00Z".to_string()),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn cutoff_timestamps_must_be_rfc3339() {
        let params = ProvisionParameters {
            restore_from_latest_snapshot_of: Some("a".to_string()),
            restore_from_latest_snapshot_before: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = ProvisionParameters {
            restore_from_latest_snapshot_of: Some("a".to_string()),
            restore_from_latest_snapshot_before: Some("2024-01-01T00:00:00Z".to_string()),
            ..Default::default()
        };
        assert!(params.validate().is_ok());
        assert!(params.snapshot_cutoff().unwrap().is_some());
    }

    #[test]
    fn windows_are_format_checked() {
        let params = ProvisionParameters {
            preferred_backup_window: Some("25:00-26:00".to_string()),
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = ProvisionParameters {
            preferred_backup_window: Some("01:00-02:00".to_string()),
            preferred_maintenance_window: Some("sun:03:00-sun:04:00".to_string()),
            ..Default::default()
        };
        assert!(params.validate().is_ok());

        let params = UpdateParameters {
            preferred_maintenance_window: Some("someday:03:00-sun:04:00".to_string()),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn overlapping_extension_requests_are_rejected() {
        let params = UpdateParameters {
            enable_extensions: vec!["postgis".to_string()],
            disable_extensions: vec!["postgis".to_string()],
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn force_failover_requires_reboot() {
        let params = UpdateParameters {
            force_failover: Some(true),
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = UpdateParameters {
            reboot: Some(true),
            force_failover: Some(true),
            ..Default::default()
        };
        assert!(params.validate().is_ok());
        assert!(params.is_reboot_only());
    }

    #[test]
    fn reboot_only_detection() {
        let params = UpdateParameters {
            reboot: Some(true),
            enable_extensions: vec!["postgis".to_string()],
            ..Default::default()
        };
        assert!(!params.is_reboot_only());
    }
}
