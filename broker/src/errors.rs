use rds_broker_awsrds::RdsError;
use rds_broker_sqlengine::SqlEngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("This service plan requires client support for asynchronous service operations")]
    AsyncRequired,

    #[error("instance does not exist")]
    InstanceDoesNotExist,

    #[error("service '{0}' was not found in the catalog")]
    ServiceNotFound(String),

    #[error("plan '{0}' was not found in the catalog")]
    PlanNotFound(String),

    #[error("service is not plan updateable")]
    PlanChangeNotSupported,

    #[error("storage encryption settings of an existing instance cannot be updated")]
    EncryptionNotUpdateable,

    #[error("cannot downgrade the engine major version from {from} to {to}")]
    CannotDowngrade { from: u64, to: u64 },

    #[error("cannot skip major engine versions when upgrading from {from} to {to}")]
    CannotSkipMajorVersion { from: u64, to: u64 },

    #[error("extension '{0}' is not supported by this plan")]
    UnsupportedExtension(String),

    #[error("extension '{0}' is enabled by default on this plan and cannot be disabled")]
    CannotDisableDefaultExtension(String),

    #[error("the requested extensions require the instance to be manually rebooted")]
    RebootRequired,

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("invalid parameter combination: {0}")]
    InvalidParameterCombination(String),

    #[error("invalid engine version '{0}'")]
    InvalidEngineVersion(String),

    #[error("the source instance is not in the same org or space")]
    RestoreSourceNotPermitted,

    #[error("the source instance was not created from the same plan")]
    RestoreSourcePlanMismatch,

    #[error("no snapshots found for the source instance")]
    NoSnapshotsFound,

    #[error("the service instance is not yet available")]
    InstanceNotAvailable,

    #[error(transparent)]
    Rds(RdsError),

    #[error(transparent)]
    Sql(#[from] SqlEngineError),
}

impl From<RdsError> for BrokerError {
    fn from(err: RdsError) -> Self {
        match err {
            RdsError::InstanceNotFound => BrokerError::InstanceDoesNotExist,
            other if other.is_invalid_parameter_combination() => {
                BrokerError::InvalidParameterCombination(other.to_string())
            }
            other => BrokerError::Rds(other),
        }
    }
}

impl BrokerError {
    /// The OSBAPI status the fronting HTTP layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            BrokerError::AsyncRequired
            | BrokerError::PlanChangeNotSupported
            | BrokerError::InvalidParameterCombination(_) => 422,
            BrokerError::InstanceDoesNotExist => 410,
            BrokerError::Rds(_) | BrokerError::Sql(_) => 500,
            _ => 400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_missing_instances_to_gone() {
        let err: BrokerError = RdsError::InstanceNotFound.into();
        assert!(matches!(err, BrokerError::InstanceDoesNotExist));
        assert_eq!(err.status_code(), 410);
    }

    #[test]
    fn preserves_the_invalid_parameter_combination_code() {
        let err: BrokerError = RdsError::Aws {
            code: Some("InvalidParameterCombination".to_string()),
            message: "cannot change".to_string(),
        }
        .into();
        assert!(matches!(err, BrokerError::InvalidParameterCombination(_)));
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn surfaces_async_required_as_unprocessable() {
        assert_eq!(BrokerError::AsyncRequired.status_code(), 422);
        assert_eq!(BrokerError::RebootRequired.status_code(), 400);
    }
}
