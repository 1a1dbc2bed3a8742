// SPDX-License-Identifier: MIT OR Apache-2.0

//! Newtype identifiers for all engine entities.
//!
//! Every id wraps a v4 UUID. Distinct newtypes keep node, grant, user, role
//! and workspace identifiers from being confused at compile time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error returned when parsing an identifier from a string.
#[derive(Debug, Error)]
#[error("invalid identifier: {0}")]
pub struct IdError(#[from] uuid::Error);

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from an existing UUID.
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// The underlying UUID.
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::try_parse(value)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Identifier of a workspace, the boundary of one content tree forest.
    WorkspaceId
);

uuid_id!(
    /// Identifier of a node ("page") in a workspace tree.
    NodeId
);

uuid_id!(
    /// Identifier of a user account.
    UserId
);

uuid_id!(
    /// Identifier of a role defined within a workspace.
    RoleId
);

uuid_id!(
    /// Identifier of a single access grant.
    GrantId
);

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{GrantId, NodeId};

    #[test]
    fn display_round_trip() {
        let id = NodeId::random();
        let parsed = NodeId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(GrantId::from_str("not-a-uuid").is_err());
    }
}
