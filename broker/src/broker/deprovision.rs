use rds_broker_awsrds::tags::TAG_SKIP_FINAL_SNAPSHOT;

use crate::api::{DeprovisionDetails, DeprovisionServiceSpec};
use crate::errors::BrokerError;

use super::RdsBroker;

impl RdsBroker {
    pub(crate) async fn do_deprovision(
        &self,
        instance_id: &str,
        details: DeprovisionDetails,
        accepts_incomplete: bool,
    ) -> Result<DeprovisionServiceSpec, BrokerError> {
        if !accepts_incomplete {
            return Err(BrokerError::AsyncRequired);
        }

        let (_, plan) = self.find_service_plan(&details.plan_id)?;
        let identifier = self.instance_identifier(instance_id);

        // The tag wins over the plan default; an unset plan default means skip.
        let skip_final_snapshot = match self.rds.get_tag(&identifier, TAG_SKIP_FINAL_SNAPSHOT).await? {
            Some(value) => value.eq_ignore_ascii_case("true"),
            None => plan.rds_properties.skip_final_snapshot.unwrap_or(true),
        };

        tracing::info!(instance_id, skip_final_snapshot, "deprovisioning service instance");
        self.rds.delete(&identifier, skip_final_snapshot).await?;

        Ok(DeprovisionServiceSpec { is_async: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{available_instance, make_broker, postgres_plan, test_catalog};

    fn details() -> DeprovisionDetails {
        DeprovisionDetails {
            service_id: "svc-1".to_string(),
            plan_id: "Plan-PG".to_string(),
        }
    }

    #[tokio::test]
    async fn the_tag_overrides_the_plan_default() {
        let mut plan = postgres_plan("Plan-PG", "12", "postgres12");
        plan.rds_properties.skip_final_snapshot = Some(false);
        let (broker, rds, _) = make_broker(test_catalog(vec![plan]));

        let mut instance = available_instance("cf-i-1", "postgres", "12.5");
        instance.tags.insert(TAG_SKIP_FINAL_SNAPSHOT, "true");
        rds.set_instance(instance);

        broker.do_deprovision("i-1", details(), true).await.unwrap();
        assert_eq!(rds.delete_calls(), vec![("cf-i-1".to_string(), true)]);
    }

    #[tokio::test]
    async fn the_plan_default_applies_without_a_tag() {
        let mut plan = postgres_plan("Plan-PG", "12", "postgres12");
        plan.rds_properties.skip_final_snapshot = Some(false);
        let (broker, rds, _) = make_broker(test_catalog(vec![plan]));
        rds.set_instance(available_instance("cf-i-1", "postgres", "12.5"));

        broker.do_deprovision("i-1", details(), true).await.unwrap();
        assert_eq!(rds.delete_calls(), vec![("cf-i-1".to_string(), false)]);
    }

    #[tokio::test]
    async fn an_unset_plan_default_skips_the_final_snapshot() {
        let (broker, rds, _) = make_broker(test_catalog(vec![postgres_plan("Plan-PG", "12", "postgres12")]));
        rds.set_instance(available_instance("cf-i-1", "postgres", "12.5"));

        broker.do_deprovision("i-1", details(), true).await.unwrap();
        assert_eq!(rds.delete_calls(), vec![("cf-i-1".to_string(), true)]);
    }

    #[tokio::test]
    async fn missing_instances_surface_as_gone() {
        let (broker, _, _) = make_broker(test_catalog(vec![postgres_plan("Plan-PG", "12", "postgres12")]));
        let err = broker.do_deprovision("i-1", details(), true).await.unwrap_err();
        assert!(matches!(err, BrokerError::InstanceDoesNotExist));
        assert_eq!(err.status_code(), 410);
    }

    #[tokio::test]
    async fn synchronous_deprovisioning_is_rejected() {
        let (broker, _, _) = make_broker(test_catalog(vec![postgres_plan("Plan-PG", "12", "postgres12")]));
        let err = broker.do_deprovision("i-1", details(), false).await.unwrap_err();
        assert!(matches!(err, BrokerError::AsyncRequired));
    }
}
