use aws_sdk_rds::types::Parameter;

use crate::error::RdsError;
use crate::instance::{ApplyMethod, CreateParameterGroupInput, DbParameterGroupDetails, ParameterSetting};

use super::AwsRdsClient;

impl AwsRdsClient {
    pub(crate) async fn do_get_parameter_group(&self, name: &str) -> Result<DbParameterGroupDetails, RdsError> {
        let out = match self
            .client
            .describe_db_parameter_groups()
            .db_parameter_group_name(name)
            .send()
            .await
        {
            Ok(out) => out,
            Err(err) => {
                let err = err.into_service_error();
                if err.is_db_parameter_group_not_found_fault() {
                    return Err(RdsError::ParameterGroupNotFound(name.to_string()));
                }
                return Err(RdsError::from_metadata(err));
            }
        };

        let group = out
            .db_parameter_groups()
            .first()
            .ok_or_else(|| RdsError::ParameterGroupNotFound(name.to_string()))?;

        Ok(DbParameterGroupDetails {
            name: group.db_parameter_group_name().unwrap_or_default().to_string(),
            family: group.db_parameter_group_family().unwrap_or_default().to_string(),
        })
    }

    pub(crate) async fn do_create_parameter_group(&self, input: CreateParameterGroupInput) -> Result<(), RdsError> {
        let request = self
            .client
            .create_db_parameter_group()
            .db_parameter_group_name(&input.name)
            .db_parameter_group_family(&input.family)
            .description(&input.description)
            .set_tags(input.tags.clone().into());

        tracing::info!(name = %input.name, family = %input.family, "creating db parameter group");
        if let Err(err) = request.send().await {
            return Err(RdsError::from_metadata(err.into_service_error()));
        }
        Ok(())
    }

    pub(crate) async fn do_modify_parameter_group(
        &self,
        name: &str,
        parameters: &[ParameterSetting],
    ) -> Result<(), RdsError> {
        let parameters: Vec<Parameter> = parameters
            .iter()
            .map(|setting| {
                Parameter::builder()
                    .parameter_name(&setting.name)
                    .parameter_value(&setting.value)
                    .apply_method(match setting.apply_method {
                        ApplyMethod::Immediate => aws_sdk_rds::types::ApplyMethod::Immediate,
                        ApplyMethod::PendingReboot => aws_sdk_rds::types::ApplyMethod::PendingReboot,
                    })
                    .build()
            })
            .collect();

        let request = self
            .client
            .modify_db_parameter_group()
            .db_parameter_group_name(name)
            .set_parameters(Some(parameters));

        tracing::info!(name, "modifying db parameter group");
        if let Err(err) = request.send().await {
            let err = err.into_service_error();
            if err.is_db_parameter_group_not_found_fault() {
                return Err(RdsError::ParameterGroupNotFound(name.to_string()));
            }
            return Err(RdsError::from_metadata(err));
        }
        Ok(())
    }
}
