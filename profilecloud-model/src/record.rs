//! Per-source record shapes.

use crate::entity::BaseEntity;
use profilecloud_types::{PrincipalId, RecordId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// A config as stored in a file on the local device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalRecord {
    #[serde(flatten)]
    pub base: BaseEntity,
    /// Id of the remote counterpart, once one is known.
    #[serde(rename = "cloudId", default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<RecordId>,
    #[serde(rename = "fileName", default)]
    pub source_file_name: String,
    #[serde(rename = "owner", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<PrincipalId>,
}

impl LocalRecord {
    #[must_use]
    pub fn id(&self) -> &RecordId {
        &self.base.id
    }
}

/// A config as stored in the shared remote document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    #[serde(flatten)]
    pub base: BaseEntity,
    #[serde(rename = "owner", default)]
    pub owner_id: Option<PrincipalId>,
    /// Principals allowed to modify this record.
    #[serde(rename = "access", default)]
    pub access_list: Vec<PrincipalId>,
    #[serde(rename = "public", default)]
    pub is_public: bool,
}

impl RemoteRecord {
    #[must_use]
    pub fn id(&self) -> &RecordId {
        &self.base.id
    }

    /// Returns true when `principal` may modify this record.
    #[must_use]
    pub fn grants_access(&self, principal: Option<&PrincipalId>) -> bool {
        principal.is_some_and(|p| self.access_list.contains(p))
    }
}

/// Parses a snapshot of raw documents, dropping the ones that do not fit.
///
/// A malformed document never fails the snapshot: it is logged and omitted.
pub fn parse_snapshot<T: DeserializeOwned>(documents: Vec<Value>) -> Vec<T> {
    let total = documents.len();
    let parsed: Vec<T> = documents
        .into_iter()
        .filter_map(|doc| {
            let id = doc.get("id").cloned().unwrap_or(Value::Null);
            match serde_json::from_value(doc) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("dropping unreadable record {}: {}", id, e);
                    None
                }
            }
        })
        .collect();
    if parsed.len() != total {
        warn!("kept {}/{} records from snapshot", parsed.len(), total);
    }
    parsed
}
