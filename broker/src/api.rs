//! Request and response shapes of the OSBAPI verbs. The HTTP layer in front
//! of the broker decodes requests into these and serializes the responses.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisionDetails {
    pub service_id: String,
    pub plan_id: String,
    pub organization_guid: String,
    pub space_guid: String,
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreviousValues {
    #[serde(default)]
    pub plan_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDetails {
    pub service_id: String,
    pub plan_id: String,
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
    #[serde(default)]
    pub previous_values: PreviousValues,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeprovisionDetails {
    pub service_id: String,
    pub plan_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BindDetails {
    pub service_id: String,
    pub plan_id: String,
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnbindDetails {
    pub service_id: String,
    pub plan_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedServiceSpec {
    pub is_async: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateServiceSpec {
    pub is_async: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeprovisionServiceSpec {
    pub is_async: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub host: String,
    pub port: i64,
    pub name: String,
    pub username: String,
    pub password: String,
    pub uri: String,
    pub jdbcuri: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Binding {
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LastOperationState {
    #[serde(rename = "succeeded")]
    Succeeded,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "failed")]
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct LastOperation {
    pub state: LastOperationState,
    pub description: String,
}

impl LastOperation {
    pub fn in_progress(description: String) -> Self {
        LastOperation {
            state: LastOperationState::InProgress,
            description,
        }
    }
}
