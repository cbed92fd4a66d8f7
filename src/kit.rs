// src/kit.rs
// Kit API client (api.kit.com/v4) and the typed remote operation repertoire

use crate::error::{KitError, Result};
use crate::utils::truncate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.kit.com/v4";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SUMMARY_CONTENT_CHARS: usize = 200;

/// Broadcast creation payload, passed through to POST /broadcasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastParams {
    pub subject: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_layout_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_at: Option<String>,
}

/// Subscriber creation payload, passed through to POST /subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriberParams {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Every remote verb the server can perform, as a replayable value.
///
/// The approval ledger stores these, and `KitClient::execute` matches on
/// them exhaustively: adding a verb without its replay arm is a compile
/// error, not a runtime "unknown operation" failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    CreateBroadcast(BroadcastParams),
    AddSubscriber(SubscriberParams),
    CreateTag { name: String },
    TagSubscriber { email: String, tag_name: String },
    DeleteBroadcast { broadcast_id: String },
    ListBroadcasts { limit: u32 },
    GetBroadcast { broadcast_id: String },
    ListSubscribers { tag_name: Option<String>, limit: u32 },
    ListTags,
}

impl Operation {
    /// The identifier this operation is classified under in the policy table.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::CreateBroadcast(_) => "create_broadcast",
            Operation::AddSubscriber(_) => "add_subscriber",
            Operation::CreateTag { .. } => "create_tag",
            Operation::TagSubscriber { .. } => "tag_subscriber",
            Operation::DeleteBroadcast { .. } => "delete_broadcast",
            Operation::ListBroadcasts { .. } => "list_broadcasts",
            Operation::GetBroadcast { .. } => "get_broadcast",
            Operation::ListSubscribers { .. } => "list_subscribers",
            Operation::ListTags => "list_tags",
        }
    }

    /// Human-readable preview shown to the operator while the operation
    /// sits in the approval ledger.
    pub fn summary(&self) -> String {
        match self {
            Operation::CreateBroadcast(params) => {
                let mut out = format!(
                    "CREATE EMAIL BROADCAST\n\nSubject: {}\nContent: {}",
                    params.subject,
                    truncate(&params.content, SUMMARY_CONTENT_CHARS)
                );
                if let Some(description) = &params.description {
                    out.push_str(&format!("\nDescription: {description}"));
                }
                match &params.send_at {
                    Some(send_at) => out.push_str(&format!("\nScheduled for: {send_at}")),
                    None => out.push_str("\nStatus: draft"),
                }
                if params.published == Some(true) {
                    out.push_str("\nWILL BE PUBLISHED IMMEDIATELY");
                }
                out
            }
            Operation::AddSubscriber(params) => {
                let mut out = format!("ADD SUBSCRIBER\n\nEmail: {}", params.email);
                if let Some(first_name) = &params.first_name {
                    out.push_str(&format!("\nName: {first_name}"));
                }
                if let Some(tags) = &params.tags {
                    out.push_str(&format!("\nTags: {}", tags.join(", ")));
                }
                out
            }
            Operation::CreateTag { name } => {
                format!("CREATE TAG\n\nTag name: {name}")
            }
            Operation::TagSubscriber { email, tag_name } => {
                format!("TAG SUBSCRIBER\n\nEmail: {email}\nTag: {tag_name}")
            }
            Operation::DeleteBroadcast { broadcast_id } => {
                format!("DELETE BROADCAST\n\nBroadcast ID: {broadcast_id}")
            }
            Operation::ListBroadcasts { limit } => {
                format!("LIST BROADCASTS (limit {limit})")
            }
            Operation::GetBroadcast { broadcast_id } => {
                format!("GET BROADCAST {broadcast_id}")
            }
            Operation::ListSubscribers { tag_name, limit } => match tag_name {
                Some(tag) => format!("LIST SUBSCRIBERS tagged \"{tag}\" (limit {limit})"),
                None => format!("LIST SUBSCRIBERS (limit {limit})"),
            },
            Operation::ListTags => "LIST TAGS".to_string(),
        }
    }
}

/// Thin client over the Kit v4 HTTP API.
///
/// Every call is bounded by the client timeout; a non-success status maps
/// to `KitError::Api` carrying the response body. No retries at this layer.
pub struct KitClient {
    http: reqwest::Client,
    base_url: String,
}

impl KitClient {
    pub fn new(api_key: &str, base_url: impl Into<String>) -> Result<Self> {
        let mut key = reqwest::header::HeaderValue::from_str(api_key).map_err(|_| {
            KitError::Config("KIT_API_KEY contains characters not valid in a header".to_string())
        })?;
        key.set_sensitive(true);

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("X-Kit-Api-Key", key);

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        let mut base_url: String = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self { http, base_url })
    }

    /// Replay a staged operation against the remote API.
    pub async fn execute(&self, operation: &Operation) -> Result<Value> {
        match operation {
            Operation::CreateBroadcast(params) => self.create_broadcast(params).await,
            Operation::AddSubscriber(params) => self.add_subscriber(params).await,
            Operation::CreateTag { name } => self.create_tag(name).await,
            Operation::TagSubscriber { email, tag_name } => {
                self.tag_subscriber(email, tag_name).await
            }
            Operation::DeleteBroadcast { broadcast_id } => {
                self.delete_broadcast(broadcast_id).await
            }
            Operation::ListBroadcasts { limit } => self.list_broadcasts(*limit).await,
            Operation::GetBroadcast { broadcast_id } => self.get_broadcast(broadcast_id).await,
            Operation::ListSubscribers { tag_name, limit } => {
                self.list_subscribers(tag_name.as_deref(), *limit).await
            }
            Operation::ListTags => self.list_tags().await,
        }
    }

    // Broadcasts

    pub async fn create_broadcast(&self, params: &BroadcastParams) -> Result<Value> {
        self.post("/broadcasts", &serde_json::to_value(params)?).await
    }

    pub async fn list_broadcasts(&self, limit: u32) -> Result<Value> {
        self.get("/broadcasts", &[("per_page", limit.to_string())]).await
    }

    pub async fn get_broadcast(&self, broadcast_id: &str) -> Result<Value> {
        self.get(&format!("/broadcasts/{broadcast_id}"), &[]).await
    }

    pub async fn delete_broadcast(&self, broadcast_id: &str) -> Result<Value> {
        self.delete(&format!("/broadcasts/{broadcast_id}")).await
    }

    // Subscribers

    pub async fn add_subscriber(&self, params: &SubscriberParams) -> Result<Value> {
        self.post("/subscribers", &serde_json::to_value(params)?).await
    }

    pub async fn list_subscribers(&self, tag_name: Option<&str>, limit: u32) -> Result<Value> {
        let mut query = vec![("per_page", limit.to_string())];
        if let Some(tag) = tag_name {
            query.push(("tag_name", tag.to_string()));
        }
        self.get("/subscribers", &query).await
    }

    // Tags

    pub async fn create_tag(&self, name: &str) -> Result<Value> {
        self.post("/tags", &serde_json::json!({ "name": name })).await
    }

    pub async fn list_tags(&self) -> Result<Value> {
        self.get("/tags", &[]).await
    }

    /// Apply a tag to a subscriber by email: find-or-create the tag, resolve
    /// the subscriber, then attach. A subscriber the API does not know is an
    /// error, not a silent creation.
    pub async fn tag_subscriber(&self, email: &str, tag_name: &str) -> Result<Value> {
        let tags = self.list_tags().await?;
        let existing = tags["tags"].as_array().and_then(|list| {
            list.iter()
                .find(|t| t["name"].as_str() == Some(tag_name))
                .map(|t| t["id"].clone())
        });

        let tag_id = match existing {
            Some(id) if !id.is_null() => id,
            _ => {
                let created = self.create_tag(tag_name).await?;
                created["tag"]["id"].clone()
            }
        };

        let found = self
            .get("/subscribers", &[("email_address", email.to_string())])
            .await?;
        let subscriber_id = found["subscribers"]
            .as_array()
            .and_then(|subs| subs.first())
            .map(|s| s["id"].clone())
            .filter(|id| !id.is_null())
            .ok_or_else(|| KitError::NotFound(format!("subscriber with email {email}")))?;

        self.post(
            &format!("/subscribers/{}/tags", id_segment(&subscriber_id)),
            &serde_json::json!({ "tag_id": tag_id }),
        )
        .await
    }

    // Transport helpers

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");
        let response = self.http.get(&url).query(query).send().await?;
        Self::into_json(response).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "POST");
        let response = self.http.post(&url).json(body).send().await?;
        Self::into_json(response).await
    }

    async fn delete(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "DELETE");
        let response = self.http.delete(&url).send().await?;
        Self::into_json(response).await
    }

    async fn into_json(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(KitError::Api {
                status: status.as_u16(),
                message,
            });
        }
        let text = response.text().await?;
        if text.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Render a JSON id (number or string) as a URL path segment.
fn id_segment(id: &Value) -> String {
    match id.as_str() {
        Some(s) => s.to_string(),
        None => id.to_string(),
    }
}
