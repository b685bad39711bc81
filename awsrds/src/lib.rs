pub mod client;
pub mod error;
pub mod instance;
pub mod tags;

pub use client::AwsRdsClient;
pub use error::RdsError;
pub use instance::{
    ApplyMethod, CreateInstanceInput, CreateParameterGroupInput, DbInstanceDetails, DbParameterGroupDetails,
    DbSnapshotDetails, ModifyInstanceInput, ParameterSetting, RdsInstanceClient, RestoreFromSnapshotInput,
    RestoreToPointInTimeInput,
};
pub use tags::{Action, InstanceTags, Tags};
