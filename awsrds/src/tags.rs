use std::collections::HashMap;
use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

pub const TAG_OWNER: &str = "Owner";
pub const TAG_BROKER_NAME: &str = "Broker Name";
pub const TAG_SERVICE_ID: &str = "Service ID";
pub const TAG_PLAN_ID: &str = "Plan ID";
pub const TAG_ORGANIZATION_ID: &str = "Organization ID";
pub const TAG_SPACE_ID: &str = "Space ID";
pub const TAG_SKIP_FINAL_SNAPSHOT: &str = "SkipFinalSnapshot";
pub const TAG_RESTORED_FROM_SNAPSHOT: &str = "Restored From Snapshot";
pub const TAG_ORIGIN_DATABASE: &str = "Origin Database";
pub const TAG_ORIGIN_POINT_IN_TIME: &str = "Origin Point In Time";
pub const TAG_EXTENSIONS: &str = "Extensions";
pub const TAG_CHARGEABLE_ENTITY: &str = "chargeable_entity";
pub const TAG_PENDING_UPDATE_SETTINGS: &str = "PendingUpdateSettings";
pub const TAG_PENDING_REBOOT: &str = "PendingReboot";
pub const TAG_PENDING_RESET_USER_PASSWORD: &str = "PendingResetUserPassword";

pub const EXTENSIONS_SEPARATOR: char = ':';

/// Agent string stamped into the `<Action> by` tag.
const TAGGED_BY: &str = "RDS Service Broker";

/// RFC822Z, the format the platform tooling expects in `<Action> at` tags.
const TAG_TIME_FORMAT: &str = "%d %b %y %H:%M %z";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Created,
    Updated,
    Restored,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Created => write!(f, "Created"),
            Action::Updated => write!(f, "Updated"),
            Action::Restored => write!(f, "Restored"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Tags(HashMap<String, String>);

impl From<&Option<Vec<aws_sdk_rds::types::Tag>>> for Tags {
    fn from(tags: &Option<Vec<aws_sdk_rds::types::Tag>>) -> Self {
        Tags::from(tags.clone())
    }
}

impl From<Option<Vec<aws_sdk_rds::types::Tag>>> for Tags {
    fn from(tags: Option<Vec<aws_sdk_rds::types::Tag>>) -> Self {
        let mut out_map = HashMap::new();
        for tag in tags.unwrap_or_default() {
            let Some(key) = tag.key else {
                continue;
            };
            let Some(value) = tag.value else {
                continue;
            };
            out_map.insert(key, value);
        }
        Tags(out_map)
    }
}

impl From<Tags> for Option<Vec<aws_sdk_rds::types::Tag>> {
    fn from(val: Tags) -> Self {
        let mut out_vec = Vec::new();
        for (k, v) in val.0 {
            out_vec.push(aws_sdk_rds::types::Tag::builder().key(k).value(v).build())
        }
        Some(out_vec)
    }
}

impl Tags {
    pub fn new() -> Self {
        Tags(HashMap::new())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) {
        self.0.remove(name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The colon-joined `Extensions` tag, split back into names.
    pub fn extensions(&self) -> Vec<String> {
        match self.get(TAG_EXTENSIONS) {
            Some(value) if !value.is_empty() => {
                value.split(EXTENSIONS_SEPARATOR).map(str::to_string).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn bool_value(&self, name: &str) -> Option<bool> {
        self.get(name).map(|v| v.eq_ignore_ascii_case("true"))
    }
}

/// Everything the broker records about an instance, flattened into the tag
/// set stored on the cloud resource. This is the sole durable broker state.
#[derive(Debug, Clone, Default)]
pub struct InstanceTags {
    pub owner: String,
    pub broker_name: String,
    pub chargeable_entity: String,
    pub service_id: Option<String>,
    pub plan_id: Option<String>,
    pub organization_id: Option<String>,
    pub space_id: Option<String>,
    pub skip_final_snapshot: Option<bool>,
    pub origin_snapshot_identifier: Option<String>,
    pub origin_database_identifier: Option<String>,
    pub origin_point_in_time: Option<String>,
    pub extensions: Vec<String>,
}

/// Composes the tag set for `action`. When the tags record a restore origin
/// (snapshot or source database), the three restore-state flags are armed so
/// the `last_operation` loop drives the post-restore sequence.
pub fn build_instance_tags(action: Action, spec: &InstanceTags) -> Tags {
    let mut tags = Tags::new();
    tags.insert(TAG_OWNER, spec.owner.clone());
    tags.insert(TAG_BROKER_NAME, spec.broker_name.clone());
    tags.insert(format!("{action} by"), TAGGED_BY);
    tags.insert(format!("{action} at"), Utc::now().format(TAG_TIME_FORMAT).to_string());
    tags.insert(TAG_CHARGEABLE_ENTITY, spec.chargeable_entity.clone());

    if let Some(service_id) = &spec.service_id {
        tags.insert(TAG_SERVICE_ID, service_id.clone());
    }
    if let Some(plan_id) = &spec.plan_id {
        tags.insert(TAG_PLAN_ID, plan_id.clone());
    }
    if let Some(organization_id) = &spec.organization_id {
        tags.insert(TAG_ORGANIZATION_ID, organization_id.clone());
    }
    if let Some(space_id) = &spec.space_id {
        tags.insert(TAG_SPACE_ID, space_id.clone());
    }
    if let Some(skip) = spec.skip_final_snapshot {
        tags.insert(TAG_SKIP_FINAL_SNAPSHOT, skip.to_string());
    }
    if !spec.extensions.is_empty() {
        let joined: Vec<&str> = spec.extensions.iter().map(String::as_str).collect();
        tags.insert(TAG_EXTENSIONS, joined.join(&EXTENSIONS_SEPARATOR.to_string()));
    }

    if let Some(snapshot) = &spec.origin_snapshot_identifier {
        tags.insert(TAG_RESTORED_FROM_SNAPSHOT, snapshot.clone());
    }
    if let Some(database) = &spec.origin_database_identifier {
        tags.insert(TAG_ORIGIN_DATABASE, database.clone());
    }
    if let Some(point_in_time) = &spec.origin_point_in_time {
        tags.insert(TAG_ORIGIN_POINT_IN_TIME, point_in_time.clone());
    }
    if spec.origin_snapshot_identifier.is_some() || spec.origin_database_identifier.is_some() {
        tags.insert(TAG_PENDING_UPDATE_SETTINGS, "true");
        tags.insert(TAG_PENDING_REBOOT, "true");
        tags.insert(TAG_PENDING_RESET_USER_PASSWORD, "true");
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_spec() -> InstanceTags {
        InstanceTags {
            owner: "Cloud Foundry".to_string(),
            broker_name: "mybroker".to_string(),
            chargeable_entity: "i-1".to_string(),
            service_id: Some("svc-1".to_string()),
            plan_id: Some("plan-1".to_string()),
            organization_id: Some("o-1".to_string()),
            space_id: Some("s-1".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn created_tags_carry_identity_and_stamps() {
        let tags = build_instance_tags(Action::Created, &base_spec());

        assert_eq!(tags.get(TAG_OWNER), Some("Cloud Foundry"));
        assert_eq!(tags.get(TAG_BROKER_NAME), Some("mybroker"));
        assert_eq!(tags.get(TAG_CHARGEABLE_ENTITY), Some("i-1"));
        assert_eq!(tags.get(TAG_SERVICE_ID), Some("svc-1"));
        assert_eq!(tags.get(TAG_PLAN_ID), Some("plan-1"));
        assert_eq!(tags.get(TAG_ORGANIZATION_ID), Some("o-1"));
        assert_eq!(tags.get(TAG_SPACE_ID), Some("s-1"));
        assert!(tags.contains("Created by"));
        assert!(tags.contains("Created at"));
        assert!(!tags.contains(TAG_PENDING_REBOOT));
    }

    #[test]
    fn restore_origin_arms_the_state_machine() {
        let mut spec = base_spec();
        spec.origin_snapshot_identifier = Some("snap-1".to_string());
        let tags = build_instance_tags(Action::Restored, &spec);

        assert_eq!(tags.get(TAG_RESTORED_FROM_SNAPSHOT), Some("snap-1"));
        assert_eq!(tags.get(TAG_PENDING_UPDATE_SETTINGS), Some("true"));
        assert_eq!(tags.get(TAG_PENDING_REBOOT), Some("true"));
        assert_eq!(tags.get(TAG_PENDING_RESET_USER_PASSWORD), Some("true"));
        assert!(tags.contains("Restored by"));
    }

    #[test]
    fn extensions_round_trip_through_the_colon_join() {
        let mut spec = base_spec();
        spec.extensions = vec!["postgis".to_string(), "pg_stat_statements".to_string()];
        let tags = build_instance_tags(Action::Created, &spec);

        assert_eq!(tags.get(TAG_EXTENSIONS), Some("postgis:pg_stat_statements"));
        assert_eq!(tags.extensions(), spec.extensions);
    }

    #[test]
    fn sdk_tag_vector_round_trip() {
        let mut tags = Tags::new();
        tags.insert("Plan ID", "plan-1");
        tags.insert("Space ID", "s-1");

        let sdk: Option<Vec<aws_sdk_rds::types::Tag>> = tags.clone().into();
        let back: Tags = sdk.into();
        assert_eq!(back, tags);
    }

    #[test]
    fn skip_final_snapshot_parses_back_as_bool() {
        let mut spec = base_spec();
        spec.skip_final_snapshot = Some(true);
        let tags = build_instance_tags(Action::Updated, &spec);
        assert_eq!(tags.bool_value(TAG_SKIP_FINAL_SNAPSHOT), Some(true));
    }

    proptest::proptest! {
        #[test]
        fn every_preserved_field_survives_the_codec(
            service_id in "[a-zA-Z0-9-]{1,24}",
            plan_id in "[a-zA-Z0-9-]{1,24}",
            organization_id in "[a-z0-9-]{1,24}",
            space_id in "[a-z0-9-]{1,24}",
            skip in proptest::option::of(proptest::bool::ANY),
            extensions in proptest::sample::subsequence(
                vec!["postgis", "pg_stat_statements", "citext", "pgaudit"], 0..4),
        ) {
            let spec = InstanceTags {
                owner: "Cloud Foundry".to_string(),
                broker_name: "mybroker".to_string(),
                chargeable_entity: "i-1".to_string(),
                service_id: Some(service_id.clone()),
                plan_id: Some(plan_id.clone()),
                organization_id: Some(organization_id.clone()),
                space_id: Some(space_id.clone()),
                skip_final_snapshot: skip,
                extensions: extensions.iter().map(|e| e.to_string()).collect(),
                ..Default::default()
            };
            let tags = build_instance_tags(Action::Created, &spec);

            // through the SDK tag vector and back
            let sdk: Option<Vec<aws_sdk_rds::types::Tag>> = tags.clone().into();
            let decoded: Tags = sdk.into();

            proptest::prop_assert_eq!(decoded.get(TAG_SERVICE_ID), Some(service_id.as_str()));
            proptest::prop_assert_eq!(decoded.get(TAG_PLAN_ID), Some(plan_id.as_str()));
            proptest::prop_assert_eq!(decoded.get(TAG_ORGANIZATION_ID), Some(organization_id.as_str()));
            proptest::prop_assert_eq!(decoded.get(TAG_SPACE_ID), Some(space_id.as_str()));
            proptest::prop_assert_eq!(decoded.bool_value(TAG_SKIP_FINAL_SNAPSHOT), skip);
            proptest::prop_assert_eq!(decoded.extensions(), spec.extensions);
        }
    }
}
