// src/mcp/tools/approvals.rs
// Confirmation handling: approve, cancel, review

use super::reject_if_forbidden;
use crate::drafts::DraftStatus;
use crate::mcp::KitServer;
use crate::utils::ResultExt;
use chrono::SecondsFormat;
use tracing::{info, warn};

/// Execute a staged operation. The entry is consumed only after a
/// successful remote call; on collaborator failure it stays in the ledger
/// and the operator re-approves the same handle.
pub async fn approve(server: &KitServer, approval_id: &str) -> Result<String, String> {
    reject_if_forbidden(server, "approve_operation")?;

    let Some(pending) = server.approvals.resolve(approval_id) else {
        return Err(format!(
            "Approval \"{approval_id}\" not found or already expired."
        ));
    };

    let result = server.client.execute(&pending.operation).await.str_err()?;
    server.approvals.consume(approval_id);

    if let Some(draft_id) = &pending.draft_id {
        match server.drafts.update_status(draft_id, DraftStatus::Sent) {
            Ok(true) => info!(draft_id = %draft_id, "marked promoted draft as sent"),
            Ok(false) => warn!(draft_id = %draft_id, "promoted draft no longer present"),
            Err(e) => warn!(draft_id = %draft_id, error = %e, "failed to update promoted draft"),
        }
    }

    info!(
        approval_id = %approval_id,
        operation = pending.operation.kind(),
        "approved operation executed"
    );

    let rendered = serde_json::to_string_pretty(&result).str_err()?;
    Ok(format!(
        "OPERATION APPROVED AND EXECUTED\n\nOperation: {}\nApproval ID: {}\n\nResult:\n{}",
        pending.operation.kind(),
        approval_id,
        rendered
    ))
}

/// Discard a staged operation without executing it.
pub async fn cancel(server: &KitServer, approval_id: &str) -> Result<String, String> {
    reject_if_forbidden(server, "cancel_approval")?;

    if server.approvals.resolve(approval_id).is_none() {
        return Err(format!("Approval \"{approval_id}\" not found."));
    }
    server.approvals.consume(approval_id);
    info!(approval_id = %approval_id, "approval cancelled");

    Ok(format!(
        "Approval \"{approval_id}\" has been cancelled. No changes were made."
    ))
}

/// Render the ledger for operator review, oldest first.
pub async fn list_pending(server: &KitServer) -> Result<String, String> {
    reject_if_forbidden(server, "list_pending_approvals")?;

    let mut pending = server.approvals.list();
    if pending.is_empty() {
        return Ok("No pending approvals.".to_string());
    }

    // Map order is arbitrary; creation time is the order that matters.
    pending.sort_by_key(|entry| entry.created_at);

    let mut out = String::from("PENDING APPROVALS:\n");
    for entry in pending {
        out.push_str(&format!(
            "\nID: {}\nRequested: {}\n{}\n",
            entry.id,
            entry.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            entry.summary
        ));
    }
    Ok(out)
}
