//! Host application boundary.
//!
//! When embedded in a parent application, local file access, sign-in and
//! user-facing notifications belong to the host. Each request names an
//! operation and carries a JSON payload; the host answers exactly once with
//! `{ok, data | errorDetail}`.
//!
//! [`HostBridge`] exposes one async call per operation on top of a single
//! [`HostBridge::request`] primitive. [`ChannelHostBridge`] implements that
//! primitive over a tokio channel, pairing each request with a oneshot reply
//! so that no request can be answered twice.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use profilecloud_model::{BaseEntity, LocalRecord};
use profilecloud_types::{PrincipalId, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// The named operations a host understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HostOperation {
    DeleteLocalConfig,
    #[serde(rename = "configImportCommunication")]
    ImportConfig,
    SendLogMessage,
    LoginToProfileCloud,
    LogoutFromProfileCloud,
    SubmitAnalytics,
}

impl HostOperation {
    /// Returns the channel name the host listens on.
    pub fn channel_name(&self) -> &'static str {
        match self {
            Self::DeleteLocalConfig => "deleteLocalConfig",
            Self::ImportConfig => "configImportCommunication",
            Self::SendLogMessage => "sendLogMessage",
            Self::LoginToProfileCloud => "loginToProfileCloud",
            Self::LogoutFromProfileCloud => "logoutFromProfileCloud",
            Self::SubmitAnalytics => "submitAnalytics",
        }
    }
}

/// The host's answer to one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostReply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<Value>,
}

impl HostReply {
    /// A successful reply.
    pub fn ok(data: Option<Value>) -> Self {
        Self {
            ok: true,
            data,
            error_detail: None,
        }
    }

    /// A rejection.
    pub fn rejected(detail: impl Into<Value>) -> Self {
        Self {
            ok: false,
            data: None,
            error_detail: Some(detail.into()),
        }
    }

    /// Converts into the reply data, or an external write failure.
    pub fn into_result(self, operation: HostOperation) -> SyncResult<Option<Value>> {
        if self.ok {
            return Ok(self.data);
        }
        let detail = match self.error_detail {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => "no detail".to_string(),
        };
        Err(SyncError::ExternalWriteFailure {
            operation: operation.channel_name().to_string(),
            detail,
        })
    }
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// A notification shown to the user by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessage {
    #[serde(rename = "type")]
    pub level: LogLevel,
    pub message: String,
}

impl LogMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Info,
            message: message.into(),
        }
    }
}

/// An analytics event forwarded to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub event_name: String,
    pub payload: Value,
}

/// Asks the host to create or update a local config file.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportConfigRequest {
    pub entity: BaseEntity,
    /// Id of the local record to write: the existing one, or the id the new
    /// file should take.
    pub local_id: RecordId,
    /// Remote counterpart the local record should reference.
    pub remote_id: Option<RecordId>,
    pub file_name: Option<String>,
    pub owner_id: Option<PrincipalId>,
}

impl ImportConfigRequest {
    /// Builds the wire payload: the entity's fields with `id`, `cloudId`,
    /// `fileName` and `owner` replaced by the request's values.
    pub fn to_payload(&self) -> SyncResult<Value> {
        let mut payload = serde_json::to_value(&self.entity)?;
        if let Some(fields) = payload.as_object_mut() {
            fields.insert("id".into(), json!(self.local_id));
            set_or_remove(fields, "cloudId", self.remote_id.as_ref().map(|id| json!(id)));
            set_or_remove(fields, "fileName", self.file_name.as_ref().map(|f| json!(f)));
            set_or_remove(fields, "owner", self.owner_id.as_ref().map(|o| json!(o)));
        }
        Ok(payload)
    }
}

fn set_or_remove(fields: &mut serde_json::Map<String, Value>, key: &str, value: Option<Value>) {
    match value {
        Some(v) => {
            fields.insert(key.to_string(), v);
        }
        None => {
            fields.remove(key);
        }
    }
}

/// Request/response calls into the host application.
#[async_trait]
pub trait HostBridge: Send + Sync {
    /// Sends one request and waits for its single reply.
    async fn request(&self, operation: HostOperation, payload: Value) -> SyncResult<Option<Value>>;

    async fn delete_local_config(&self, record: &LocalRecord) -> SyncResult<()> {
        let payload = json!({ "config": serde_json::to_value(record)? });
        self.request(HostOperation::DeleteLocalConfig, payload).await?;
        Ok(())
    }

    async fn import_config(&self, request: &ImportConfigRequest) -> SyncResult<()> {
        let payload = request.to_payload()?;
        self.request(HostOperation::ImportConfig, payload).await?;
        Ok(())
    }

    async fn send_log_message(&self, message: &LogMessage) -> SyncResult<()> {
        let payload = serde_json::to_value(message)?;
        self.request(HostOperation::SendLogMessage, payload).await?;
        Ok(())
    }

    async fn login(&self) -> SyncResult<()> {
        self.request(HostOperation::LoginToProfileCloud, json!({})).await?;
        Ok(())
    }

    async fn logout(&self) -> SyncResult<()> {
        self.request(HostOperation::LogoutFromProfileCloud, json!({})).await?;
        Ok(())
    }

    async fn submit_analytics(&self, event: &AnalyticsEvent) -> SyncResult<()> {
        let payload = serde_json::to_value(event)?;
        self.request(HostOperation::SubmitAnalytics, payload).await?;
        Ok(())
    }
}

/// A request waiting for the host's answer.
#[derive(Debug)]
pub struct HostRequest {
    pub operation: HostOperation,
    pub payload: Value,
    reply: oneshot::Sender<HostReply>,
}

impl HostRequest {
    /// Answers the request. Consumes it, so a request is answered at most once.
    pub fn respond(self, reply: HostReply) {
        if self.reply.send(reply).is_err() {
            debug!("{} reply dropped: requester went away", self.operation.channel_name());
        }
    }
}

/// Host side of a [`ChannelHostBridge`].
pub type HostRequestReceiver = mpsc::UnboundedReceiver<HostRequest>;

/// A [`HostBridge`] that forwards requests over a channel.
#[derive(Debug, Clone)]
pub struct ChannelHostBridge {
    sender: mpsc::UnboundedSender<HostRequest>,
}

impl ChannelHostBridge {
    /// Creates a bridge and the receiver the host reads requests from.
    pub fn new() -> (Self, HostRequestReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl HostBridge for ChannelHostBridge {
    async fn request(&self, operation: HostOperation, payload: Value) -> SyncResult<Option<Value>> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(HostRequest {
                operation,
                payload,
                reply,
            })
            .map_err(|_| SyncError::ChannelClosed)?;
        let reply = response.await.map_err(|_| SyncError::ChannelClosed)?;
        reply.into_result(operation)
    }
}
