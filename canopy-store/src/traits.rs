// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for querying and mutating node, grant and membership
//! state.

use canopy_core::{
    Grant, GrantId, Membership, Node, NodeId, PermissionLevel, RoleId, UserId, WorkspaceId,
};
use thiserror::Error;

/// Error raised by a store implementation.
///
/// The in-memory store never fails; fallible backends map their native
/// errors onto these variants. Callers treat any store error as a
/// transactional failure and retry the whole operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transaction conflict: {0}")]
    TransactionConflict(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Interface for storing and querying nodes.
///
/// Two variants of the trait are provided: one which is thread-safe
/// (returning `Send` futures) and one which is purely intended for
/// single-threaded execution contexts.
#[trait_variant::make(NodeStore: Send)]
pub trait LocalNodeStore {
    /// Get a node by id.
    async fn node(&self, id: NodeId) -> Result<Option<Node>, StoreError>;

    /// Get all nodes of a workspace, in stable (id) order.
    ///
    /// The engine builds its per-transaction parent→children index from this
    /// snapshot.
    async fn workspace_nodes(&self, workspace: WorkspaceId) -> Result<Vec<Node>, StoreError>;

    /// Insert a node, replacing any previous node with the same id.
    async fn insert_node(&mut self, node: Node) -> Result<(), StoreError>;

    /// Re-point a node's parent.
    ///
    /// Returns `true` when the node was found and updated.
    async fn set_node_parent(
        &mut self,
        id: NodeId,
        parent: Option<NodeId>,
    ) -> Result<bool, StoreError>;

    /// Mark a node as locked or unlocked.
    ///
    /// Returns `true` when the node was found and updated.
    async fn set_node_locked(&mut self, id: NodeId, locked: bool) -> Result<bool, StoreError>;
}

/// Interface for storing and querying access grants.
///
/// Implementations must maintain a lookup index over `inherited_from` so
/// that [`LocalGrantStore::grants_inherited_from`] is a single indexed query,
/// never a scan chasing intermediate references.
#[trait_variant::make(GrantStore: Send)]
pub trait LocalGrantStore {
    /// Get a grant by id.
    async fn grant(&self, id: GrantId) -> Result<Option<Grant>, StoreError>;

    /// All grants attached to a node, in stable (id) order.
    async fn node_grants(&self, node: NodeId) -> Result<Vec<Grant>, StoreError>;

    /// All grants whose `inherited_from` equals `source`, anywhere in the
    /// store.
    async fn grants_inherited_from(&self, source: GrantId) -> Result<Vec<Grant>, StoreError>;

    /// Insert a grant, replacing any previous grant with the same id.
    async fn put_grant(&mut self, grant: Grant) -> Result<(), StoreError>;

    /// Delete a grant by id.
    ///
    /// Returns `true` when the removal occurred and `false` when the grant
    /// was not found in the store.
    async fn delete_grant(&mut self, id: GrantId) -> Result<bool, StoreError>;
}

/// Read-only interface onto the membership layer.
///
/// Workspace membership, role assignment and workspace defaults are owned by
/// an external collaborator; the engine only queries them.
#[trait_variant::make(MembershipStore: Send)]
pub trait LocalMembershipStore {
    /// The membership kind a user holds in a workspace, or `None` when the
    /// user does not belong to it.
    async fn membership(
        &self,
        workspace: WorkspaceId,
        user: UserId,
    ) -> Result<Option<Membership>, StoreError>;

    /// The roles a user holds in a workspace.
    async fn member_roles(
        &self,
        workspace: WorkspaceId,
        user: UserId,
    ) -> Result<Vec<RoleId>, StoreError>;

    /// Whether a role is registered in a workspace.
    async fn workspace_has_role(
        &self,
        workspace: WorkspaceId,
        role: RoleId,
    ) -> Result<bool, StoreError>;

    /// The workspace's default level for workspace-wide grants on fresh root
    /// nodes, when configured.
    async fn default_grant_level(
        &self,
        workspace: WorkspaceId,
    ) -> Result<Option<PermissionLevel>, StoreError>;
}
