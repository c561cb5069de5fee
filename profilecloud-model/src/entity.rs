use crate::error::ModelError;
use crate::payload::Payload;
use profilecloud_types::{ApplicationId, PrincipalId, RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a config describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Profile,
    Preset,
    Snippet,
}

impl EntityKind {
    /// Returns the wire name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Preset => "preset",
            Self::Snippet => "snippet",
        }
    }
}

/// Where the winning copy of a merged config came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncState {
    /// The local copy is newer, or no remote copy exists.
    LocalOnly,
    /// The remote copy is newer, or no local copy exists.
    RemoteOnly,
    /// Both copies exist with identical modification times.
    Synced,
}

/// Semantic version triple, stored as strings like the firmware reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: String,
    pub minor: String,
    pub patch: String,
}

/// The fields shared by every config record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BaseEntityWire", into = "BaseEntityWire")]
pub struct BaseEntity {
    /// Storage-local id of the record.
    pub id: RecordId,
    pub name: String,
    pub description: String,
    pub payload: Payload,
    pub modified_at: Timestamp,
    pub created_at: Option<Timestamp>,
    /// Module or element type tag (`"PBF4"`, `"knob"`, ...).
    pub semantic_type: String,
    pub version: Option<Version>,
    /// Slash-delimited folder hint, e.g. `"Studio/Mixing"`.
    pub hierarchy_path: Option<String>,
}

impl BaseEntity {
    /// Returns the kind of this config, as implied by its payload.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.payload.kind()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BaseEntityWire {
    id: RecordId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "type", default)]
    semantic_type: String,
    config_type: EntityKind,
    #[serde(default)]
    configs: Value,
    #[serde(default)]
    modified_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<Version>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    virtual_path: Option<String>,
}

impl TryFrom<BaseEntityWire> for BaseEntity {
    type Error = ModelError;

    fn try_from(wire: BaseEntityWire) -> Result<Self, Self::Error> {
        let payload = Payload::from_parts(wire.config_type, wire.configs)?;
        Ok(Self {
            id: wire.id,
            name: wire.name,
            description: wire.description,
            payload,
            modified_at: wire.modified_at,
            created_at: wire.created_at,
            semantic_type: wire.semantic_type,
            version: wire.version,
            hierarchy_path: wire.virtual_path,
        })
    }
}

impl From<BaseEntity> for BaseEntityWire {
    fn from(entity: BaseEntity) -> Self {
        let config_type = entity.kind();
        // Payload types are plain serde structs; encoding them cannot fail.
        let configs = entity.payload.to_value().unwrap_or(Value::Null);
        Self {
            id: entity.id,
            name: entity.name,
            description: entity.description,
            semantic_type: entity.semantic_type,
            config_type,
            configs,
            modified_at: entity.modified_at,
            created_at: entity.created_at,
            version: entity.version,
            virtual_path: entity.hierarchy_path,
        }
    }
}

/// The single reconciled view of one logical config.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedEntity {
    pub application_id: ApplicationId,
    /// Fields of the winning copy; `base.id` is that copy's storage id.
    #[serde(flatten)]
    pub base: BaseEntity,
    pub owner_id: Option<PrincipalId>,
    pub editable: bool,
    pub sync_state: SyncState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

impl MergedEntity {
    /// Wraps a base entity that exists only on this device.
    #[must_use]
    pub fn local(application_id: ApplicationId, base: BaseEntity) -> Self {
        Self {
            application_id,
            base,
            owner_id: None,
            editable: true,
            sync_state: SyncState::LocalOnly,
            is_public: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.base.kind()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.base.name
    }

    /// Returns the hierarchy hint, treating an empty string as absent.
    #[must_use]
    pub fn hierarchy_path(&self) -> Option<&str> {
        self.base.hierarchy_path.as_deref().filter(|p| !p.is_empty())
    }
}

/// A read-only preset synthesized from one element of a profile.
///
/// Never persisted: it exists only inside a built tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedEntity {
    #[serde(flatten)]
    pub entity: MergedEntity,
    pub parent_id: ApplicationId,
    pub sub_index: i64,
    /// `"<profile name> / <preset name>"`.
    pub display_name: String,
}
