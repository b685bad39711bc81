use crate::api::LastOperationState;

/// Maps a `DBInstanceStatus` string onto the OSBAPI operation state.
/// Unknown statuses read as in-progress; the platform keeps polling.
pub(crate) fn operation_state_for_status(status: &str) -> LastOperationState {
    match status {
        "available" | "storage-optimization" => LastOperationState::Succeeded,
        "backing-up"
        | "configuring-enhanced-monitoring"
        | "creating"
        | "deleting"
        | "maintenance"
        | "modifying"
        | "rebooting"
        | "renaming"
        | "resetting-master-credentials"
        | "starting"
        | "stopped"
        | "stopping"
        | "storage-full"
        | "upgrading" => LastOperationState::InProgress,
        "failed"
        | "inaccessible-encryption-credentials"
        | "incompatible-credentials"
        | "incompatible-network"
        | "incompatible-option-group"
        | "incompatible-parameters"
        | "incompatible-restore"
        | "restore-error" => LastOperationState::Failed,
        _ => LastOperationState::InProgress,
    }
}
