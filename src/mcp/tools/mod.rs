// src/mcp/tools/mod.rs

pub mod approvals;
pub mod drafts;
pub mod remote;

use crate::error::KitError;
use crate::mcp::KitServer;
use crate::policy::OperationClass;

/// Every tool rejects up front when its own identifier is in the forbidden
/// set, before any state is touched.
pub(crate) fn reject_if_forbidden(server: &KitServer, tool: &str) -> Result<(), String> {
    if server.policy.classify(tool) == OperationClass::Forbidden {
        return Err(forbidden_message(tool));
    }
    Ok(())
}

pub(crate) fn forbidden_message(operation: &str) -> String {
    format!(
        "OPERATION FORBIDDEN\n\n{}\nThe operation will not be executed.",
        KitError::Forbidden(operation.to_string())
    )
}
