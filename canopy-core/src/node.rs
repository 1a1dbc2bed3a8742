// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

use crate::identifiers::{NodeId, UserId, WorkspaceId};

/// A position in the per-workspace content tree which can hold access grants.
///
/// Nodes are created, deleted and moved by the content layer. The engine only
/// reads identity and parent pointers, and is notified when a node moves so
/// it can rewrite inherited grants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,

    /// `None` marks a root of the workspace forest.
    pub parent_id: Option<NodeId>,

    pub workspace_id: WorkspaceId,

    /// User who created the node. The lock transform restores this user to
    /// full access when a node is frozen.
    pub created_by: UserId,

    /// Set once the node's grant set has been frozen to a minimal explicit
    /// one.
    pub locked: bool,
}

impl Node {
    /// A new root node in the given workspace.
    pub fn root(workspace_id: WorkspaceId, created_by: UserId) -> Self {
        Self {
            id: NodeId::random(),
            parent_id: None,
            workspace_id,
            created_by,
            locked: false,
        }
    }

    /// A new child of an existing node, in the same workspace.
    pub fn child_of(parent: &Node, created_by: UserId) -> Self {
        Self {
            id: NodeId::random(),
            parent_id: Some(parent.id),
            workspace_id: parent.workspace_id,
            created_by,
            locked: false,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
