// src/mcp/tools/drafts.rs
// Draft lifecycle: local staging for broadcast payloads

use super::{forbidden_message, reject_if_forbidden};
use crate::drafts::{DraftMetadata, DraftStatus, NewDraft};
use crate::kit::{BroadcastParams, Operation};
use crate::mcp::KitServer;
use crate::policy::OperationClass;
use crate::utils::ResultExt;
use chrono::SecondsFormat;
use tracing::info;

pub async fn create(server: &KitServer, new: NewDraft) -> Result<String, String> {
    reject_if_forbidden(server, "create_draft")?;

    let draft = server.drafts.create(new).str_err()?;
    info!(draft_id = %draft.metadata.draft_id, "draft created");

    Ok(format!(
        "Draft created.\n\nDraft ID: {}\nFile: {}\nStatus: {}\n\n\
         Edit the file directly, or promote it with promote_draft when it is ready to send.",
        draft.metadata.draft_id,
        draft.path.display(),
        draft.metadata.status
    ))
}

pub async fn list(server: &KitServer) -> Result<String, String> {
    reject_if_forbidden(server, "list_drafts")?;

    let drafts = server.drafts.list().str_err()?;
    if drafts.is_empty() {
        return Ok("No local drafts.".to_string());
    }

    let mut out = String::from("LOCAL DRAFTS:\n");
    for draft in drafts {
        out.push_str(&format!(
            "\n{} [{}]\n  id: {}\n  created: {}\n",
            draft.subject,
            draft.status,
            draft.draft_id,
            draft.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        ));
    }
    Ok(out)
}

pub async fn read(server: &KitServer, draft_id: &str) -> Result<String, String> {
    reject_if_forbidden(server, "read_draft")?;

    let Some(draft) = server.drafts.read(draft_id).str_err()? else {
        return Err(format!("Draft \"{draft_id}\" not found."));
    };

    let meta = &draft.metadata;
    let mut out = format!(
        "Subject: {}\nStatus: {}\nCreated: {}\nModified: {}\n",
        meta.subject,
        meta.status,
        meta.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        meta.modified_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    if let Some(description) = &meta.description {
        out.push_str(&format!("Description: {description}\n"));
    }
    if let Some(send_at) = &meta.send_at {
        out.push_str(&format!("Scheduled for: {send_at}\n"));
    }
    if let Some(published) = meta.published {
        out.push_str(&format!("Published: {published}\n"));
    }
    if let Some(template) = &meta.layout_template {
        out.push_str(&format!("Layout template: {template}\n"));
    }
    out.push_str(&format!("File: {}\n\n{}\n", draft.path.display(), draft.body));
    Ok(out)
}

pub async fn update_status(
    server: &KitServer,
    draft_id: &str,
    status: &str,
) -> Result<String, String> {
    reject_if_forbidden(server, "update_draft_status")?;

    let status: DraftStatus = status.parse().str_err()?;
    if server.drafts.update_status(draft_id, status).str_err()? {
        Ok(format!("Draft \"{draft_id}\" is now {status}."))
    } else {
        Err(format!("Draft \"{draft_id}\" not found."))
    }
}

pub async fn delete(server: &KitServer, draft_id: &str) -> Result<String, String> {
    reject_if_forbidden(server, "delete_draft")?;

    if server.drafts.delete(draft_id).str_err()? {
        info!(draft_id = %draft_id, "draft deleted");
        Ok(format!("Draft \"{draft_id}\" deleted."))
    } else {
        Err(format!("Draft \"{draft_id}\" not found."))
    }
}

/// Register the draft's content as a pending create_broadcast approval.
/// The draft file itself is not modified; the ledger entry references it.
pub async fn promote(server: &KitServer, draft_id: &str) -> Result<String, String> {
    reject_if_forbidden(server, "promote_draft")?;

    let Some(draft) = server.drafts.read(draft_id).str_err()? else {
        return Err(format!("Draft \"{draft_id}\" not found."));
    };

    if server.policy.classify("create_broadcast") == OperationClass::Forbidden {
        return Err(forbidden_message("create_broadcast"));
    }

    let DraftMetadata {
        draft_id: id,
        subject,
        description,
        send_at,
        published,
        layout_template,
        ..
    } = draft.metadata;

    let operation = Operation::CreateBroadcast(BroadcastParams {
        subject,
        content: draft.body,
        description,
        email_layout_template: layout_template,
        published,
        send_at,
    });

    let summary = operation.summary();
    let approval_id = server
        .approvals
        .register(operation, summary.clone(), Some(id.clone()));
    info!(approval_id = %approval_id, draft_id = %id, "draft promoted for approval");

    Ok(super::remote::approval_banner(&approval_id, &summary))
}
