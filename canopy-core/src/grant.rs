// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::access::PermissionLevel;
use crate::identifiers::{GrantId, NodeId, RoleId, UserId, WorkspaceId};

/// The subject of a grant.
///
/// A closed sum type: a grant is assigned to exactly one of a user, a role,
/// the whole workspace, or the public. "Exactly one populated" is therefore a
/// type-level invariant, not a runtime check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assignee {
    User(UserId),
    Role(RoleId),
    Workspace(WorkspaceId),
    Public,
}

impl Display for Assignee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Assignee::User(id) => write!(f, "user:{}", id),
            Assignee::Role(id) => write!(f, "role:{}", id),
            Assignee::Workspace(id) => write!(f, "workspace:{}", id),
            Assignee::Public => write!(f, "public"),
        }
    }
}

/// An access-control entry binding an assignee to a permission level on a
/// node.
///
/// At most one grant exists per `(node_id, assignee)` pair. A grant with
/// `inherited_from = None` is "local" to its node; an inherited grant tracks
/// the _original local_ grant it was materialised from. Propagation always
/// stamps descendants with that original id, never an intermediate inherited
/// one, so cascade deletion is a single indexed lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub id: GrantId,

    pub node_id: NodeId,

    pub assignee: Assignee,

    pub level: PermissionLevel,

    /// Weak reference to the local grant this one was materialised from.
    /// Lookup only, carries no ownership.
    pub inherited_from: Option<GrantId>,
}

impl Grant {
    /// A new local grant on the given node.
    pub fn local(node_id: NodeId, assignee: Assignee, level: PermissionLevel) -> Self {
        Self {
            id: GrantId::random(),
            node_id,
            assignee,
            level,
            inherited_from: None,
        }
    }

    /// A new grant materialised from the local grant `source` on an ancestor
    /// node.
    pub fn inherited(
        node_id: NodeId,
        assignee: Assignee,
        level: PermissionLevel,
        source: GrantId,
    ) -> Self {
        Self {
            id: GrantId::random(),
            node_id,
            assignee,
            level,
            inherited_from: Some(source),
        }
    }

    pub fn is_local(&self) -> bool {
        self.inherited_from.is_none()
    }

    /// The ultimate local source of this grant: its own id when local,
    /// otherwise the id it inherits from.
    pub fn source_id(&self) -> GrantId {
        self.inherited_from.unwrap_or(self.id)
    }
}
