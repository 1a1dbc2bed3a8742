// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory persistence for nodes, grants and membership state.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use canopy_core::{
    Grant, GrantId, Membership, Node, NodeId, PermissionLevel, RoleId, UserId, WorkspaceId,
};

use crate::traits::{GrantStore, MembershipStore, NodeStore, StoreError};
use crate::transactions::{Transaction, WritableStore};

/// Plain-data state shared by the store handle and its transactions.
///
/// Grants are indexed twice: by owning node, and by `inherited_from` source.
/// The source index is what makes cascade deletion a single lookup.
#[derive(Clone, Debug, Default)]
pub struct InnerMemoryStore {
    nodes: HashMap<NodeId, Node>,
    grants: HashMap<GrantId, Grant>,
    grants_by_node: HashMap<NodeId, BTreeSet<GrantId>>,
    grants_by_source: HashMap<GrantId, BTreeSet<GrantId>>,
    memberships: HashMap<(WorkspaceId, UserId), Membership>,
    member_roles: HashMap<(WorkspaceId, UserId), Vec<RoleId>>,
    workspace_roles: HashMap<WorkspaceId, HashSet<RoleId>>,
    default_levels: HashMap<WorkspaceId, PermissionLevel>,
}

impl InnerMemoryStore {
    fn node(&self, id: NodeId) -> Option<Node> {
        self.nodes.get(&id).cloned()
    }

    fn workspace_nodes(&self, workspace: WorkspaceId) -> Vec<Node> {
        let mut nodes: Vec<Node> = self
            .nodes
            .values()
            .filter(|node| node.workspace_id == workspace)
            .cloned()
            .collect();
        nodes.sort_by_key(|node| node.id);
        nodes
    }

    fn insert_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    fn set_node_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.parent_id = parent;
                true
            }
            None => false,
        }
    }

    fn set_node_locked(&mut self, id: NodeId, locked: bool) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.locked = locked;
                true
            }
            None => false,
        }
    }

    fn node_grants(&self, node: NodeId) -> Vec<Grant> {
        self.grants_by_node
            .get(&node)
            .into_iter()
            .flatten()
            .filter_map(|id| self.grants.get(id))
            .cloned()
            .collect()
    }

    fn grants_inherited_from(&self, source: GrantId) -> Vec<Grant> {
        self.grants_by_source
            .get(&source)
            .into_iter()
            .flatten()
            .filter_map(|id| self.grants.get(id))
            .cloned()
            .collect()
    }

    fn put_grant(&mut self, grant: Grant) {
        self.unindex_grant(grant.id);

        self.grants_by_node
            .entry(grant.node_id)
            .or_default()
            .insert(grant.id);
        if let Some(source) = grant.inherited_from {
            self.grants_by_source
                .entry(source)
                .or_default()
                .insert(grant.id);
        }
        self.grants.insert(grant.id, grant);
    }

    fn delete_grant(&mut self, id: GrantId) -> bool {
        self.unindex_grant(id);
        self.grants.remove(&id).is_some()
    }

    fn unindex_grant(&mut self, id: GrantId) {
        let Some(previous) = self.grants.get(&id) else {
            return;
        };

        if let Some(ids) = self.grants_by_node.get_mut(&previous.node_id) {
            ids.remove(&id);
            if ids.is_empty() {
                self.grants_by_node.remove(&previous.node_id);
            }
        }
        if let Some(source) = previous.inherited_from {
            if let Some(ids) = self.grants_by_source.get_mut(&source) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.grants_by_source.remove(&source);
                }
            }
        }
    }
}

/// An in-memory store for canopy nodes, grants and membership state.
///
/// `MemoryStore` supports usage in asynchronous and multi-threaded contexts
/// by wrapping an [`InnerMemoryStore`] with an `RwLock` and `Arc`. Cloning
/// the handle shares the underlying state.
///
/// Writes through the handle itself apply immediately ("autocommit");
/// [`WritableStore::begin`] opens a transaction which operates on a working
/// copy of the whole state and swaps it in on commit. Readers therefore
/// observe either the pre- or post-transaction state, never a partial batch,
/// and conflicting transactions resolve as last-committed-write-wins.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<InnerMemoryStore>>,
}

impl MemoryStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtain a read-lock on the store.
    fn read_store(&self) -> RwLockReadGuard<'_, InnerMemoryStore> {
        self.inner
            .read()
            .expect("acquire shared read access on store")
    }

    /// Obtain a write-lock on the store.
    fn write_store(&self) -> RwLockWriteGuard<'_, InnerMemoryStore> {
        self.inner
            .write()
            .expect("acquire exclusive write access on store")
    }

    /// Register a user as workspace member with the given membership kind.
    pub fn add_member(&self, workspace: WorkspaceId, user: UserId, membership: Membership) {
        self.write_store()
            .memberships
            .insert((workspace, user), membership);
    }

    /// Register a role in a workspace.
    pub fn add_role(&self, workspace: WorkspaceId, role: RoleId) {
        self.write_store()
            .workspace_roles
            .entry(workspace)
            .or_default()
            .insert(role);
    }

    /// Assign a workspace role to a member, registering the role as needed.
    pub fn assign_role(&self, workspace: WorkspaceId, user: UserId, role: RoleId) {
        let mut store = self.write_store();
        store
            .workspace_roles
            .entry(workspace)
            .or_default()
            .insert(role);
        let roles = store.member_roles.entry((workspace, user)).or_default();
        if !roles.contains(&role) {
            roles.push(role);
        }
    }

    /// Configure the workspace's default level for workspace-wide grants on
    /// fresh root nodes.
    pub fn set_default_grant_level(&self, workspace: WorkspaceId, level: PermissionLevel) {
        self.write_store().default_levels.insert(workspace, level);
    }
}

impl NodeStore for MemoryStore {
    async fn node(&self, id: NodeId) -> Result<Option<Node>, StoreError> {
        Ok(self.read_store().node(id))
    }

    async fn workspace_nodes(&self, workspace: WorkspaceId) -> Result<Vec<Node>, StoreError> {
        Ok(self.read_store().workspace_nodes(workspace))
    }

    async fn insert_node(&mut self, node: Node) -> Result<(), StoreError> {
        self.write_store().insert_node(node);
        Ok(())
    }

    async fn set_node_parent(
        &mut self,
        id: NodeId,
        parent: Option<NodeId>,
    ) -> Result<bool, StoreError> {
        Ok(self.write_store().set_node_parent(id, parent))
    }

    async fn set_node_locked(&mut self, id: NodeId, locked: bool) -> Result<bool, StoreError> {
        Ok(self.write_store().set_node_locked(id, locked))
    }
}

impl GrantStore for MemoryStore {
    async fn grant(&self, id: GrantId) -> Result<Option<Grant>, StoreError> {
        Ok(self.read_store().grants.get(&id).cloned())
    }

    async fn node_grants(&self, node: NodeId) -> Result<Vec<Grant>, StoreError> {
        Ok(self.read_store().node_grants(node))
    }

    async fn grants_inherited_from(&self, source: GrantId) -> Result<Vec<Grant>, StoreError> {
        Ok(self.read_store().grants_inherited_from(source))
    }

    async fn put_grant(&mut self, grant: Grant) -> Result<(), StoreError> {
        self.write_store().put_grant(grant);
        Ok(())
    }

    async fn delete_grant(&mut self, id: GrantId) -> Result<bool, StoreError> {
        Ok(self.write_store().delete_grant(id))
    }
}

impl MembershipStore for MemoryStore {
    async fn membership(
        &self,
        workspace: WorkspaceId,
        user: UserId,
    ) -> Result<Option<Membership>, StoreError> {
        Ok(self.read_store().memberships.get(&(workspace, user)).copied())
    }

    async fn member_roles(
        &self,
        workspace: WorkspaceId,
        user: UserId,
    ) -> Result<Vec<RoleId>, StoreError> {
        Ok(self
            .read_store()
            .member_roles
            .get(&(workspace, user))
            .cloned()
            .unwrap_or_default())
    }

    async fn workspace_has_role(
        &self,
        workspace: WorkspaceId,
        role: RoleId,
    ) -> Result<bool, StoreError> {
        Ok(self
            .read_store()
            .workspace_roles
            .get(&workspace)
            .is_some_and(|roles| roles.contains(&role)))
    }

    async fn default_grant_level(
        &self,
        workspace: WorkspaceId,
    ) -> Result<Option<PermissionLevel>, StoreError> {
        Ok(self.read_store().default_levels.get(&workspace).cloned())
    }
}

/// A transaction over a [`MemoryStore`].
///
/// Operates on a working copy of the whole inner state; `commit` swaps the
/// copy in atomically, `rollback` (or drop) discards it.
#[derive(Debug)]
pub struct MemoryTransaction {
    shared: Arc<RwLock<InnerMemoryStore>>,
    working: InnerMemoryStore,
}

impl NodeStore for MemoryTransaction {
    async fn node(&self, id: NodeId) -> Result<Option<Node>, StoreError> {
        Ok(self.working.node(id))
    }

    async fn workspace_nodes(&self, workspace: WorkspaceId) -> Result<Vec<Node>, StoreError> {
        Ok(self.working.workspace_nodes(workspace))
    }

    async fn insert_node(&mut self, node: Node) -> Result<(), StoreError> {
        self.working.insert_node(node);
        Ok(())
    }

    async fn set_node_parent(
        &mut self,
        id: NodeId,
        parent: Option<NodeId>,
    ) -> Result<bool, StoreError> {
        Ok(self.working.set_node_parent(id, parent))
    }

    async fn set_node_locked(&mut self, id: NodeId, locked: bool) -> Result<bool, StoreError> {
        Ok(self.working.set_node_locked(id, locked))
    }
}

impl GrantStore for MemoryTransaction {
    async fn grant(&self, id: GrantId) -> Result<Option<Grant>, StoreError> {
        Ok(self.working.grants.get(&id).cloned())
    }

    async fn node_grants(&self, node: NodeId) -> Result<Vec<Grant>, StoreError> {
        Ok(self.working.node_grants(node))
    }

    async fn grants_inherited_from(&self, source: GrantId) -> Result<Vec<Grant>, StoreError> {
        Ok(self.working.grants_inherited_from(source))
    }

    async fn put_grant(&mut self, grant: Grant) -> Result<(), StoreError> {
        self.working.put_grant(grant);
        Ok(())
    }

    async fn delete_grant(&mut self, id: GrantId) -> Result<bool, StoreError> {
        Ok(self.working.delete_grant(id))
    }
}

impl MembershipStore for MemoryTransaction {
    async fn membership(
        &self,
        workspace: WorkspaceId,
        user: UserId,
    ) -> Result<Option<Membership>, StoreError> {
        Ok(self.working.memberships.get(&(workspace, user)).copied())
    }

    async fn member_roles(
        &self,
        workspace: WorkspaceId,
        user: UserId,
    ) -> Result<Vec<RoleId>, StoreError> {
        Ok(self
            .working
            .member_roles
            .get(&(workspace, user))
            .cloned()
            .unwrap_or_default())
    }

    async fn workspace_has_role(
        &self,
        workspace: WorkspaceId,
        role: RoleId,
    ) -> Result<bool, StoreError> {
        Ok(self
            .working
            .workspace_roles
            .get(&workspace)
            .is_some_and(|roles| roles.contains(&role)))
    }

    async fn default_grant_level(
        &self,
        workspace: WorkspaceId,
    ) -> Result<Option<PermissionLevel>, StoreError> {
        Ok(self.working.default_levels.get(&workspace).cloned())
    }
}

impl Transaction for MemoryTransaction {
    async fn commit(self) -> Result<(), StoreError> {
        let mut shared = self
            .shared
            .write()
            .expect("acquire exclusive write access on store");
        *shared = self.working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl WritableStore for MemoryStore {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> Result<Self::Transaction, StoreError> {
        let working = self.read_store().clone();

        Ok(MemoryTransaction {
            shared: Arc::clone(&self.inner),
            working,
        })
    }
}
