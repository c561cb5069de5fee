//! Identifier types used throughout ProfileCloud.
//!
//! Storage ids come from two independent sources (local files and the remote
//! document store) and are opaque strings. Freshly allocated ids use UUID v7
//! so they sort by creation time.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an existing identifier string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Allocates a fresh, time-ordered identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            /// Parses an identifier, rejecting the empty string.
            pub fn parse(s: &str) -> crate::Result<Self> {
                if s.is_empty() {
                    return Err(crate::Error::EmptyId);
                }
                Ok(Self(s.to_string()))
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier, returning the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = crate::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Storage-local identifier of a record, unique within its source
    /// (a local file id or a remote document id).
    RecordId
}

string_id! {
    /// Stable identity of one logical config across both sources.
    ///
    /// Defaults to the storage id of whichever record was seen first, so a
    /// config keeps its identity when it later acquires a counterpart.
    ApplicationId
}

string_id! {
    /// Account id of the signed-in user (the "principal").
    PrincipalId
}

impl ApplicationId {
    /// Builds the identity of a derived item: `<parent>#<sub_index>`.
    #[must_use]
    pub fn derived(parent: &ApplicationId, sub_index: i64) -> Self {
        Self(format!("{}#{}", parent.0, sub_index))
    }
}

impl From<&RecordId> for ApplicationId {
    fn from(id: &RecordId) -> Self {
        Self(id.0.clone())
    }
}
