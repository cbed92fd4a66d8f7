// src/mcp/tools/remote.rs
// Classification-gated dispatch to the Kit API

use super::forbidden_message;
use crate::kit::Operation;
use crate::mcp::KitServer;
use crate::policy::OperationClass;
use crate::utils::ResultExt;
use tracing::info;

/// Route one remote-backed request through the policy table.
///
/// Reads execute immediately and return the collaborator's raw JSON. Writes
/// are staged and return an approval handle without touching the remote API.
/// Forbidden operations are rejected outright.
pub async fn dispatch(server: &KitServer, operation: Operation) -> Result<String, String> {
    let kind = operation.kind();
    match server.policy.classify(kind) {
        OperationClass::Forbidden => Err(forbidden_message(kind)),
        OperationClass::Read => {
            let result = server.client.execute(&operation).await.str_err()?;
            serde_json::to_string_pretty(&result).str_err()
        }
        OperationClass::Write => {
            let summary = operation.summary();
            let approval_id = server.approvals.register(operation, summary.clone(), None);
            info!(approval_id = %approval_id, operation = kind, "staged operation for approval");
            Ok(approval_banner(&approval_id, &summary))
        }
    }
}

/// The staging response: preview plus the handle the user must confirm.
pub fn approval_banner(approval_id: &str, summary: &str) -> String {
    format!(
        "APPROVAL REQUIRED\n\n{summary}\n\n\
         This operation will make changes to your Kit account. Nothing has been sent yet.\n\n\
         Approval ID: {approval_id}\n\n\
         To proceed, the user must explicitly approve this operation; then call \
         approve_operation with approval_id \"{approval_id}\". Call cancel_approval to discard it."
    )
}
