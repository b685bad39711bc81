use aws_sdk_rds::types::{DbInstance, DbSnapshot, PendingModifiedValues};

use crate::error::RdsError;
use crate::instance::{DbInstanceDetails, DbSnapshotDetails};

use super::AwsRdsClient;

impl AwsRdsClient {
    pub(crate) async fn do_describe(&self, identifier: &str) -> Result<DbInstanceDetails, RdsError> {
        let out = match self
            .client
            .describe_db_instances()
            .db_instance_identifier(identifier)
            .send()
            .await
        {
            Ok(out) => out,
            Err(err) => {
                let err = err.into_service_error();
                if err.is_db_instance_not_found_fault() {
                    return Err(RdsError::InstanceNotFound);
                }
                return Err(RdsError::from_metadata(err));
            }
        };

        let db_instance = out.db_instances().first().ok_or(RdsError::InstanceNotFound)?;
        Ok(map_db_instance(db_instance))
    }

    pub(crate) async fn do_describe_by_tag(&self, key: &str, value: &str) -> Result<Vec<DbInstanceDetails>, RdsError> {
        let mut results = Vec::new();

        let mut pages = self.client.describe_db_instances().into_paginator().send();
        while let Some(page) = pages.next().await {
            let page = match page {
                Ok(page) => page,
                Err(err) => return Err(RdsError::from_metadata(err.into_service_error())),
            };
            for db_instance in page.db_instances() {
                let details = map_db_instance(db_instance);
                if details.tags.get(key) == Some(value) {
                    results.push(details);
                }
            }
        }

        Ok(results)
    }

    pub(crate) async fn do_describe_snapshots(
        &self,
        instance_identifier: &str,
    ) -> Result<Vec<DbSnapshotDetails>, RdsError> {
        let out = match self
            .client
            .describe_db_snapshots()
            .db_instance_identifier(instance_identifier)
            .send()
            .await
        {
            Ok(out) => out,
            Err(err) => return Err(RdsError::from_metadata(err.into_service_error())),
        };

        let mut snapshots: Vec<DbSnapshotDetails> = out.db_snapshots().iter().map(map_db_snapshot).collect();
        snapshots.sort_by(|a, b| b.create_time.cmp(&a.create_time));
        Ok(snapshots)
    }
}

fn map_db_instance(db_instance: &DbInstance) -> DbInstanceDetails {
    DbInstanceDetails {
        identifier: db_instance.db_instance_identifier().unwrap_or_default().to_string(),
        arn: db_instance.db_instance_arn().unwrap_or_default().to_string(),
        status: db_instance.db_instance_status().unwrap_or_default().to_string(),
        engine: db_instance.engine().unwrap_or_default().to_string(),
        engine_version: db_instance.engine_version().unwrap_or_default().to_string(),
        db_name: db_instance.db_name().map(str::to_string),
        master_username: db_instance.master_username().unwrap_or_default().to_string(),
        address: db_instance.endpoint().and_then(|e| e.address()).map(str::to_string),
        port: db_instance.endpoint().and_then(|e| e.port()).map(i64::from),
        parameter_group_name: db_instance
            .db_parameter_groups()
            .first()
            .and_then(|pg| pg.db_parameter_group_name())
            .map(str::to_string),
        parameter_apply_status: db_instance
            .db_parameter_groups()
            .first()
            .and_then(|pg| pg.parameter_apply_status())
            .map(str::to_string),
        pending_modifications: db_instance
            .pending_modified_values()
            .is_some_and(|pmv| pmv != &PendingModifiedValues::builder().build()),
        tags: db_instance.tag_list.clone().into(),
    }
}

fn map_db_snapshot(db_snapshot: &DbSnapshot) -> DbSnapshotDetails {
    DbSnapshotDetails {
        identifier: db_snapshot.db_snapshot_identifier().unwrap_or_default().to_string(),
        arn: db_snapshot.db_snapshot_arn().unwrap_or_default().to_string(),
        instance_identifier: db_snapshot.db_instance_identifier().unwrap_or_default().to_string(),
        create_time: db_snapshot
            .snapshot_create_time()
            .and_then(|t| chrono::DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_rds::types::{DbParameterGroupStatus, Endpoint, Tag};

    #[test]
    fn maps_the_describe_shape_the_broker_relies_on() {
        let db_instance = DbInstance::builder()
            .db_instance_identifier("cf-i-1")
            .db_instance_arn("arn:aws:rds:eu-west-1:123:db:cf-i-1")
            .db_instance_status("available")
            .engine("postgres")
            .engine_version("12.7")
            .db_name("cf_i_1")
            .master_username("master")
            .endpoint(Endpoint::builder().address("host.example.com").port(5432).build())
            .db_parameter_groups(
                DbParameterGroupStatus::builder()
                    .db_parameter_group_name("cf-postgres12-mybroker")
                    .parameter_apply_status("in-sync")
                    .build(),
            )
            .tag_list(Tag::builder().key("Plan ID").value("plan-1").build())
            .build();

        let details = map_db_instance(&db_instance);
        assert_eq!(details.identifier, "cf-i-1");
        assert_eq!(details.status, "available");
        assert_eq!(details.address.as_deref(), Some("host.example.com"));
        assert_eq!(details.port, Some(5432));
        assert_eq!(details.parameter_group_name.as_deref(), Some("cf-postgres12-mybroker"));
        assert_eq!(details.parameter_apply_status.as_deref(), Some("in-sync"));
        assert!(!details.pending_modifications);
        assert_eq!(details.tags.get("Plan ID"), Some("plan-1"));
    }

    #[test]
    fn pending_modified_values_flip_the_flag() {
        let db_instance = DbInstance::builder()
            .db_instance_identifier("cf-i-1")
            .pending_modified_values(PendingModifiedValues::builder().master_user_password("x").build())
            .build();
        assert!(map_db_instance(&db_instance).pending_modifications);
    }
}
