//! Config entity model for ProfileCloud.
//!
//! Defines the shapes every other subsystem consumes:
//! - [`BaseEntity`]: the fields shared by every config, whatever its source
//! - [`LocalRecord`] / [`RemoteRecord`]: a config as one source stores it
//! - [`MergedEntity`]: the reconciled view produced by the merge engine
//! - [`DerivedEntity`]: a read-only preset synthesized from a profile element
//! - [`Payload`]: the config body, tagged by [`EntityKind`]
//!
//! Records are read defensively: malformed timestamps are coerced, and a
//! record whose body does not fit its kind's schema is rejected on its own
//! without failing the rest of its snapshot.

mod entity;
mod error;
mod payload;
mod record;

pub use entity::{BaseEntity, DerivedEntity, EntityKind, MergedEntity, SyncState, Version};
pub use error::{ModelError, ModelResult};
pub use payload::{ElementConfig, EventConfig, INIT_EVENT, Payload, SnippetConfig};
pub use record::{LocalRecord, RemoteRecord, parse_snapshot};
