// src/mcp/mod.rs
// MCP Server implementation

pub mod tools;

use crate::approvals::ApprovalQueue;
use crate::drafts::{DraftStore, NewDraft};
use crate::kit::{BroadcastParams, KitClient, Operation, SubscriberParams};
use crate::policy::PolicyTable;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ServerHandler,
};
use serde::Deserialize;
use std::sync::Arc;

/// MCP Server state
#[derive(Clone)]
pub struct KitServer {
    pub client: Arc<KitClient>,
    pub policy: Arc<PolicyTable>,
    pub approvals: Arc<ApprovalQueue>,
    pub drafts: Arc<DraftStore>,
    tool_router: ToolRouter<Self>,
}

impl KitServer {
    pub fn new(
        client: Arc<KitClient>,
        policy: Arc<PolicyTable>,
        approvals: Arc<ApprovalQueue>,
        drafts: Arc<DraftStore>,
    ) -> Self {
        Self {
            client,
            policy,
            approvals,
            drafts,
            tool_router: Self::tool_router(),
        }
    }
}

// Request types for tools with parameters

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateBroadcastRequest {
    #[schemars(description = "Email subject line")]
    pub subject: String,
    #[schemars(description = "Email body content")]
    pub content: String,
    #[schemars(description = "Internal description")]
    pub description: Option<String>,
    #[schemars(description = "Publish immediately (default: false)")]
    pub published: Option<bool>,
    #[schemars(description = "ISO 8601 datetime to schedule the send")]
    pub send_at: Option<String>,
    #[schemars(description = "Email layout template name")]
    pub email_layout_template: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddSubscriberRequest {
    #[schemars(description = "Subscriber email address")]
    pub email: String,
    #[schemars(description = "First name")]
    pub first_name: Option<String>,
    #[schemars(description = "Tags to apply")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateTagRequest {
    #[schemars(description = "Tag name")]
    pub name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TagSubscriberRequest {
    #[schemars(description = "Subscriber email address")]
    pub email: String,
    #[schemars(description = "Tag name to apply")]
    pub tag_name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteBroadcastRequest {
    #[schemars(description = "Broadcast ID")]
    pub broadcast_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListBroadcastsRequest {
    #[schemars(description = "Number to return (default: 10)")]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetBroadcastRequest {
    #[schemars(description = "Broadcast ID")]
    pub broadcast_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListSubscribersRequest {
    #[schemars(description = "Filter by tag name")]
    pub tag_name: Option<String>,
    #[schemars(description = "Number to return (default: 10)")]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ApprovalIdRequest {
    #[schemars(description = "The approval ID")]
    pub approval_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateDraftRequest {
    #[schemars(description = "Email subject line")]
    pub subject: String,
    #[schemars(description = "Email body content")]
    pub content: String,
    #[schemars(description = "Internal description")]
    pub description: Option<String>,
    #[schemars(description = "ISO 8601 datetime to schedule the send")]
    pub send_at: Option<String>,
    #[schemars(description = "Publish immediately once sent to Kit")]
    pub published: Option<bool>,
    #[schemars(description = "Email layout template name")]
    pub email_layout_template: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DraftIdRequest {
    #[schemars(description = "The draft ID")]
    pub draft_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateDraftStatusRequest {
    #[schemars(description = "The draft ID")]
    pub draft_id: String,
    #[schemars(description = "New status: composing/ready/sent")]
    pub status: String,
}

#[tool_router]
impl KitServer {
    // Remote-backed operations; routing is decided by the policy table.

    #[tool(
        description = "Request creation of a new email broadcast. THIS REQUIRES USER APPROVAL: the operation is staged and an approval ID is returned; nothing is sent to Kit yet."
    )]
    async fn create_broadcast(
        &self,
        Parameters(req): Parameters<CreateBroadcastRequest>,
    ) -> Result<String, String> {
        tools::remote::dispatch(
            self,
            Operation::CreateBroadcast(BroadcastParams {
                subject: req.subject,
                content: req.content,
                description: req.description,
                email_layout_template: req.email_layout_template,
                published: req.published,
                send_at: req.send_at,
            }),
        )
        .await
    }

    #[tool(description = "Request to add a new subscriber. THIS REQUIRES USER APPROVAL.")]
    async fn add_subscriber(
        &self,
        Parameters(req): Parameters<AddSubscriberRequest>,
    ) -> Result<String, String> {
        tools::remote::dispatch(
            self,
            Operation::AddSubscriber(SubscriberParams {
                email: req.email,
                first_name: req.first_name,
                tags: req.tags,
            }),
        )
        .await
    }

    #[tool(description = "Request to create a new tag. THIS REQUIRES USER APPROVAL.")]
    async fn create_tag(
        &self,
        Parameters(req): Parameters<CreateTagRequest>,
    ) -> Result<String, String> {
        tools::remote::dispatch(self, Operation::CreateTag { name: req.name }).await
    }

    #[tool(description = "Request to add a tag to a subscriber. THIS REQUIRES USER APPROVAL.")]
    async fn tag_subscriber(
        &self,
        Parameters(req): Parameters<TagSubscriberRequest>,
    ) -> Result<String, String> {
        tools::remote::dispatch(
            self,
            Operation::TagSubscriber {
                email: req.email,
                tag_name: req.tag_name,
            },
        )
        .await
    }

    #[tool(description = "Request deletion of a broadcast. Forbidden under the default policy.")]
    async fn delete_broadcast(
        &self,
        Parameters(req): Parameters<DeleteBroadcastRequest>,
    ) -> Result<String, String> {
        tools::remote::dispatch(
            self,
            Operation::DeleteBroadcast {
                broadcast_id: req.broadcast_id,
            },
        )
        .await
    }

    #[tool(description = "List recent email broadcasts (read-only, no approval needed).")]
    async fn list_broadcasts(
        &self,
        Parameters(req): Parameters<ListBroadcastsRequest>,
    ) -> Result<String, String> {
        tools::remote::dispatch(
            self,
            Operation::ListBroadcasts {
                limit: req.limit.unwrap_or(10),
            },
        )
        .await
    }

    #[tool(description = "Get details of a specific broadcast (read-only).")]
    async fn get_broadcast(
        &self,
        Parameters(req): Parameters<GetBroadcastRequest>,
    ) -> Result<String, String> {
        tools::remote::dispatch(
            self,
            Operation::GetBroadcast {
                broadcast_id: req.broadcast_id,
            },
        )
        .await
    }

    #[tool(description = "List subscribers (read-only).")]
    async fn list_subscribers(
        &self,
        Parameters(req): Parameters<ListSubscribersRequest>,
    ) -> Result<String, String> {
        tools::remote::dispatch(
            self,
            Operation::ListSubscribers {
                tag_name: req.tag_name,
                limit: req.limit.unwrap_or(10),
            },
        )
        .await
    }

    #[tool(description = "List all tags (read-only).")]
    async fn list_tags(&self) -> Result<String, String> {
        tools::remote::dispatch(self, Operation::ListTags).await
    }

    // Approval management

    #[tool(
        description = "Execute a pending operation by its approval ID. Only call this after the user has explicitly confirmed."
    )]
    async fn approve_operation(
        &self,
        Parameters(req): Parameters<ApprovalIdRequest>,
    ) -> Result<String, String> {
        tools::approvals::approve(self, &req.approval_id).await
    }

    #[tool(description = "Cancel/deny a pending approval without executing it.")]
    async fn cancel_approval(
        &self,
        Parameters(req): Parameters<ApprovalIdRequest>,
    ) -> Result<String, String> {
        tools::approvals::cancel(self, &req.approval_id).await
    }

    #[tool(description = "List all pending operations awaiting approval.")]
    async fn list_pending_approvals(&self) -> Result<String, String> {
        tools::approvals::list_pending(self).await
    }

    // Local draft lifecycle

    #[tool(
        description = "Save a broadcast as a local draft file for review and editing. Nothing is sent to Kit until the draft is promoted and approved."
    )]
    async fn create_draft(
        &self,
        Parameters(req): Parameters<CreateDraftRequest>,
    ) -> Result<String, String> {
        tools::drafts::create(
            self,
            NewDraft {
                subject: req.subject,
                content: req.content,
                description: req.description,
                send_at: req.send_at,
                published: req.published,
                layout_template: req.email_layout_template,
            },
        )
        .await
    }

    #[tool(description = "List all local drafts.")]
    async fn list_drafts(&self) -> Result<String, String> {
        tools::drafts::list(self).await
    }

    #[tool(description = "Read a local draft by its draft ID.")]
    async fn read_draft(
        &self,
        Parameters(req): Parameters<DraftIdRequest>,
    ) -> Result<String, String> {
        tools::drafts::read(self, &req.draft_id).await
    }

    #[tool(description = "Update a local draft's status (composing/ready/sent).")]
    async fn update_draft_status(
        &self,
        Parameters(req): Parameters<UpdateDraftStatusRequest>,
    ) -> Result<String, String> {
        tools::drafts::update_status(self, &req.draft_id, &req.status).await
    }

    #[tool(description = "Delete a local draft file.")]
    async fn delete_draft(
        &self,
        Parameters(req): Parameters<DraftIdRequest>,
    ) -> Result<String, String> {
        tools::drafts::delete(self, &req.draft_id).await
    }

    #[tool(
        description = "Promote a local draft into the approval pipeline as a create_broadcast request. The draft file is left untouched; an approval ID is returned."
    )]
    async fn promote_draft(
        &self,
        Parameters(req): Parameters<DraftIdRequest>,
    ) -> Result<String, String> {
        tools::drafts::promote(self, &req.draft_id).await
    }
}

#[tool_handler]
impl ServerHandler for KitServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: rmcp::model::Implementation {
                name: "kit-mcp".into(),
                title: Some("Approval-gated MCP server for the Kit email marketing API".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Mutating Kit operations are staged behind an approval step: stage the operation, show the returned summary to the user, and call approve_operation only after they explicitly confirm.".into(),
            ),
        }
    }
}
