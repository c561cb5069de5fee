//! Config bodies, one concrete schema per [`EntityKind`].
//!
//! On the wire a config carries `configType` next to an untyped `configs`
//! value. [`Payload::from_parts`] pairs the two so the rest of the system can
//! walk profile elements without guessing at their shape.

use crate::entity::EntityKind;
use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event index of the initialization phase of an element.
pub const INIT_EVENT: i64 = 0;

/// The body of a config.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A full module profile: one entry per configured control element.
    Profile(Vec<ElementConfig>),
    /// A single control element's configuration.
    Preset(ElementConfig),
    /// A reusable script fragment.
    Snippet(SnippetConfig),
}

impl Payload {
    /// Interprets a raw `configs` value according to `kind`.
    pub fn from_parts(kind: EntityKind, configs: Value) -> ModelResult<Self> {
        match kind {
            EntityKind::Profile => {
                if configs.is_null() {
                    return Ok(Self::Profile(Vec::new()));
                }
                serde_json::from_value(configs)
                    .map(Self::Profile)
                    .map_err(|e| ModelError::Validation(format!("profile elements: {e}")))
            }
            EntityKind::Preset => {
                if configs.is_null() {
                    return Ok(Self::Preset(ElementConfig::default()));
                }
                serde_json::from_value(configs)
                    .map(Self::Preset)
                    .map_err(|e| ModelError::Validation(format!("preset element: {e}")))
            }
            EntityKind::Snippet => match configs {
                Value::Null => Ok(Self::Snippet(SnippetConfig::default())),
                Value::String(script) => Ok(Self::Snippet(SnippetConfig {
                    script,
                    extra: Map::new(),
                })),
                other => serde_json::from_value(other)
                    .map(Self::Snippet)
                    .map_err(|e| ModelError::Validation(format!("snippet: {e}"))),
            },
        }
    }

    /// Returns the kind this payload belongs to.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Profile(_) => EntityKind::Profile,
            Self::Preset(_) => EntityKind::Preset,
            Self::Snippet(_) => EntityKind::Snippet,
        }
    }

    /// Serializes back to the untyped `configs` value.
    pub fn to_value(&self) -> ModelResult<Value> {
        let value = match self {
            Self::Profile(elements) => serde_json::to_value(elements)?,
            Self::Preset(element) => serde_json::to_value(element)?,
            Self::Snippet(snippet) => serde_json::to_value(snippet)?,
        };
        Ok(value)
    }

    /// Returns every script fragment carried by this payload, in order.
    #[must_use]
    pub fn script_fragments(&self) -> Vec<&str> {
        match self {
            Self::Profile(elements) => elements
                .iter()
                .flat_map(|e| e.events.iter().map(|ev| ev.config.as_str()))
                .collect(),
            Self::Preset(element) => element.events.iter().map(|ev| ev.config.as_str()).collect(),
            Self::Snippet(snippet) => vec![snippet.script.as_str()],
        }
    }
}

/// Configuration of one control element. The default is an unconfigured
/// element in slot 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementConfig {
    /// Slot index of the element on its module.
    pub control_element_number: i64,
    #[serde(default)]
    pub events: Vec<EventConfig>,
    /// Fields this model does not interpret, preserved on write.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ElementConfig {
    /// Returns the script of the first initialization-phase event.
    #[must_use]
    pub fn init_script(&self) -> Option<&str> {
        self.events
            .iter()
            .find(|e| e.event_index() == Some(INIT_EVENT))
            .map(|e| e.config.as_str())
    }
}

/// One event handler of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventConfig {
    /// Event type, stored either as a number or a numeric string.
    pub event: Value,
    /// Script body.
    #[serde(default)]
    pub config: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EventConfig {
    /// Returns the numeric event index, accepting `0` and `"0"` alike.
    #[must_use]
    pub fn event_index(&self) -> Option<i64> {
        match &self.event {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// A shareable script fragment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnippetConfig {
    #[serde(default)]
    pub script: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
