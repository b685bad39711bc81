use crate::error::RdsError;
use crate::tags::Tags;

use super::AwsRdsClient;

impl AwsRdsClient {
    pub(crate) async fn do_get_resource_tags(&self, arn: &str) -> Result<Tags, RdsError> {
        let out = match self.client.list_tags_for_resource().resource_name(arn).send().await {
            Ok(out) => out,
            Err(err) => {
                let err = err.into_service_error();
                if err.is_db_instance_not_found_fault() {
                    return Err(RdsError::InstanceNotFound);
                }
                return Err(RdsError::from_metadata(err));
            }
        };

        Ok(out.tag_list.into())
    }

    pub(crate) async fn do_add_tags_to_resource(&self, arn: &str, tags: &Tags) -> Result<(), RdsError> {
        let request = self
            .client
            .add_tags_to_resource()
            .resource_name(arn)
            .set_tags(tags.clone().into());

        if let Err(err) = request.send().await {
            let err = err.into_service_error();
            if err.is_db_instance_not_found_fault() {
                return Err(RdsError::InstanceNotFound);
            }
            return Err(RdsError::from_metadata(err));
        }
        Ok(())
    }

    pub(crate) async fn do_get_tag(&self, identifier: &str, key: &str) -> Result<Option<String>, RdsError> {
        let details = self.do_describe(identifier).await?;
        Ok(details.tags.get(key).map(str::to_string))
    }

    pub(crate) async fn do_remove_tag(&self, identifier: &str, key: &str) -> Result<(), RdsError> {
        let details = self.do_describe(identifier).await?;

        let request = self
            .client
            .remove_tags_from_resource()
            .resource_name(&details.arn)
            .tag_keys(key);

        if let Err(err) = request.send().await {
            let err = err.into_service_error();
            if err.is_db_instance_not_found_fault() {
                return Err(RdsError::InstanceNotFound);
            }
            return Err(RdsError::from_metadata(err));
        }
        Ok(())
    }
}
