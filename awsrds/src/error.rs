use aws_sdk_rds::error::ProvideErrorMetadata;
use thiserror::Error;

pub const INVALID_PARAMETER_COMBINATION: &str = "InvalidParameterCombination";

#[derive(Debug, Error)]
pub enum RdsError {
    #[error("db instance does not exist")]
    InstanceNotFound,

    #[error("db parameter group '{0}' does not exist")]
    ParameterGroupNotFound(String),

    #[error("aws rds error ({code:?}): {message}")]
    Aws { code: Option<String>, message: String },
}

impl RdsError {
    /// Wraps any SDK error that is not one of the modeled faults the broker
    /// branches on, preserving the AWS error code for callers that do.
    pub fn from_metadata<E>(err: E) -> Self
    where
        E: ProvideErrorMetadata + std::fmt::Display,
    {
        RdsError::Aws {
            code: err.code().map(str::to_string),
            message: err.message().map(str::to_string).unwrap_or_else(|| err.to_string()),
        }
    }

    pub fn is_invalid_parameter_combination(&self) -> bool {
        matches!(self, RdsError::Aws { code: Some(code), .. } if code == INVALID_PARAMETER_COMBINATION)
    }
}
