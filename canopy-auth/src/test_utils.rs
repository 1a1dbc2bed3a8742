// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helpers for exercising the engine against an in-memory store.

use canopy_core::{Membership, Node, NodeId, RoleId, UserId, WorkspaceId};
use canopy_store::{GrantStore, MemoryStore, NodeStore};

use crate::engine::Engine;

/// One workspace, one store, one engine: the fixture every test builds on.
#[derive(Clone, Debug)]
pub struct TestBed {
    pub store: MemoryStore,
    pub engine: Engine<MemoryStore>,
    pub workspace: WorkspaceId,
}

impl TestBed {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let engine = Engine::new(store.clone());

        Self {
            store,
            engine,
            workspace: WorkspaceId::random(),
        }
    }

    /// Register a fresh full member of the workspace.
    pub fn member(&self) -> UserId {
        let user = UserId::random();
        self.store
            .add_member(self.workspace, user, Membership::Member);
        user
    }

    /// Register a fresh workspace administrator.
    pub fn admin(&self) -> UserId {
        let user = UserId::random();
        self.store
            .add_member(self.workspace, user, Membership::Admin);
        user
    }

    /// Register a fresh guest member.
    pub fn guest(&self) -> UserId {
        let user = UserId::random();
        self.store
            .add_member(self.workspace, user, Membership::Guest);
        user
    }

    /// Register a fresh role in the workspace.
    pub fn role(&self) -> RoleId {
        let role = RoleId::random();
        self.store.add_role(self.workspace, role);
        role
    }

    /// Insert a root node into the workspace tree. No grants are seeded;
    /// use [`Engine::node_created`] for that.
    pub async fn insert_root(&self, created_by: UserId) -> Node {
        let node = Node::root(self.workspace, created_by);
        self.insert_foreign_node(&node).await;
        node
    }

    /// Insert a child node under an existing one.
    pub async fn insert_child(&self, parent: &Node, created_by: UserId) -> Node {
        let node = Node::child_of(parent, created_by);
        self.insert_foreign_node(&node).await;
        node
    }

    /// Insert an arbitrary node, whatever workspace it claims to belong to.
    pub async fn insert_foreign_node(&self, node: &Node) {
        let mut store = self.store.clone();
        store
            .insert_node(node.clone())
            .await
            .expect("insert node into memory store");
    }

    /// Assert that no grant anywhere in the workspace carries a dangling or
    /// inconsistent inheritance reference: every source must exist, bind the
    /// same assignee, and live on a strict ancestor of the grant's node.
    pub async fn assert_inheritance_consistent(&self) {
        let nodes = self
            .store
            .workspace_nodes(self.workspace)
            .await
            .expect("list workspace nodes");

        for node in &nodes {
            let ancestors = self.ancestor_ids(&nodes, node.id);
            let grants = self
                .store
                .node_grants(node.id)
                .await
                .expect("list node grants");

            for grant in grants {
                let Some(source_id) = grant.inherited_from else {
                    continue;
                };
                let source = self
                    .store
                    .grant(source_id)
                    .await
                    .expect("look up source grant")
                    .unwrap_or_else(|| {
                        panic!("grant {} inherits from missing grant {}", grant.id, source_id)
                    });
                assert_eq!(
                    source.assignee, grant.assignee,
                    "grant {} inherits across assignees",
                    grant.id
                );
                assert!(
                    ancestors.contains(&source.node_id),
                    "grant {} on {} inherits from non-ancestor node {}",
                    grant.id,
                    node.id,
                    source.node_id
                );
            }
        }
    }

    fn ancestor_ids(&self, nodes: &[Node], node_id: NodeId) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut cursor = nodes
            .iter()
            .find(|node| node.id == node_id)
            .and_then(|node| node.parent_id);
        while let Some(parent_id) = cursor {
            if ancestors.contains(&parent_id) {
                break;
            }
            ancestors.push(parent_id);
            cursor = nodes
                .iter()
                .find(|node| node.id == parent_id)
                .and_then(|node| node.parent_id);
        }
        ancestors
    }
}

impl Default for TestBed {
    fn default() -> Self {
        Self::new()
    }
}
