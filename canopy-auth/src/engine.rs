// SPDX-License-Identifier: MIT OR Apache-2.0

//! The engine facade: every grant mutation and permission query.

use canopy_core::{
    Assignee, CapabilitySet, Grant, GrantId, Node, NodeId, PermissionLevel, UserId,
};
use canopy_store::{GrantStore, MembershipStore, NodeStore, Transaction, WritableStore};
use tracing::debug;

use crate::error::EngineError;
use crate::lock::lock_to_minimal_access;
use crate::propagate::propagate_to_descendants;
use crate::reparent::reparent;
use crate::resolve::effective_capabilities;
use crate::tree::resolve_tree;

/// Bookkeeping result of a cascade deletion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeletedGrants {
    /// Number of grants removed, the deleted grant itself included.
    pub count: usize,
}

/// The permission engine.
///
/// All mutations run inside a single store transaction spanning tree
/// resolution, descendant enumeration and the full batch of grant writes;
/// any failure rolls the transaction back so partially-propagated state is
/// never observable. Reads ([`Engine::compute_effective`],
/// [`Engine::node_grants`]) touch committed state only and take no
/// transaction.
#[derive(Clone, Debug)]
pub struct Engine<S> {
    store: S,
}

impl<S> Engine<S>
where
    S: WritableStore + NodeStore + GrantStore + MembershipStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store handle.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a grant for `(node, assignee)`, or update its level when one
    /// already exists, and propagate the result through the node's subtree.
    ///
    /// An update keeps the grant's identity and provenance; only the level
    /// changes. At most one grant per `(node, assignee)` pair exists
    /// afterwards, whatever sequence of calls led there.
    pub async fn create_or_update_grant(
        &self,
        node_id: NodeId,
        assignee: Assignee,
        level: PermissionLevel,
    ) -> Result<Grant, EngineError> {
        debug!(node = %node_id, %assignee, %level, "create or update grant");

        let mut tx = self.store.begin().await?;
        match create_or_update_inner(&mut tx, node_id, assignee, level).await {
            Ok(grant) => {
                tx.commit().await?;
                Ok(grant)
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err)
            }
        }
    }

    /// Delete a grant and every grant in its node's subtree that was
    /// materialised from it.
    ///
    /// Because descendants always carry the original local source id, the
    /// cascade is one indexed lookup, not a recursive chase. Grants outside
    /// the subtree and descendant grants with a different source are never
    /// touched.
    pub async fn delete_grant(&self, grant_id: GrantId) -> Result<DeletedGrants, EngineError> {
        debug!(grant = %grant_id, "delete grant");

        let mut tx = self.store.begin().await?;
        match delete_inner(&mut tx, grant_id).await {
            Ok(deleted) => {
                tx.commit().await?;
                Ok(deleted)
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err)
            }
        }
    }

    /// Process a node move: convert grants whose inheritance source is no
    /// longer an ancestor into local grants and re-point the node's own
    /// descendants at them.
    ///
    /// `new_parent = None` moves the node to the workspace root.
    pub async fn reparent_node(
        &self,
        node_id: NodeId,
        new_parent: Option<NodeId>,
    ) -> Result<(), EngineError> {
        debug!(node = %node_id, ?new_parent, "reparent node");

        let mut tx = self.store.begin().await?;
        match reparent(&mut tx, node_id, new_parent).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err)
            }
        }
    }

    /// Freeze a node's grant set to a minimal explicit one: full access for
    /// its creator, at most read-and-comment for everyone else.
    ///
    /// The caller must hold [`Capability::EditLock`] on the node or be a
    /// workspace administrator. Descendants are not touched.
    ///
    /// [`Capability::EditLock`]: canopy_core::Capability::EditLock
    pub async fn lock_node(
        &self,
        node_id: NodeId,
        acting_user: UserId,
    ) -> Result<Vec<Grant>, EngineError> {
        debug!(node = %node_id, user = %acting_user, "lock node to minimal access");

        let mut tx = self.store.begin().await?;
        match lock_to_minimal_access(&mut tx, node_id, acting_user).await {
            Ok(grants) => {
                tx.commit().await?;
                Ok(grants)
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err)
            }
        }
    }

    /// Seed the grant set of a freshly created node.
    ///
    /// The creator receives full access. A root node additionally receives a
    /// workspace-wide grant at the workspace's default level (full access
    /// when none is configured); a child node instead materialises every
    /// grant of its parent as an inherited grant.
    pub async fn node_created(&self, node_id: NodeId) -> Result<Vec<Grant>, EngineError> {
        debug!(node = %node_id, "seed grants for created node");

        let mut tx = self.store.begin().await?;
        match node_created_inner(&mut tx, node_id).await {
            Ok(grants) => {
                tx.commit().await?;
                Ok(grants)
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err)
            }
        }
    }

    /// Compute the effective capability set of a user (or the anonymous
    /// public, `user = None`) on a node.
    ///
    /// Never errors on an empty result: a user without any matching grant
    /// gets the empty set.
    pub async fn compute_effective(
        &self,
        user: Option<UserId>,
        node_id: NodeId,
    ) -> Result<CapabilitySet, EngineError> {
        effective_capabilities(&self.store, user, node_id).await
    }

    /// List a node's own grants from committed state.
    pub async fn node_grants(&self, node_id: NodeId) -> Result<Vec<Grant>, EngineError> {
        if self.store.node(node_id).await?.is_none() {
            return Err(EngineError::NodeNotFound(node_id));
        }

        Ok(self.store.node_grants(node_id).await?)
    }
}

async fn create_or_update_inner<T>(
    tx: &mut T,
    node_id: NodeId,
    assignee: Assignee,
    level: PermissionLevel,
) -> Result<Grant, EngineError>
where
    T: Transaction,
{
    let Some(node) = tx.node(node_id).await? else {
        return Err(EngineError::NodeNotFound(node_id));
    };
    validate_assignee(tx, &node, assignee, &level).await?;

    let tree = resolve_tree(tx, node_id).await?;

    let existing = tx
        .node_grants(node_id)
        .await?
        .into_iter()
        .find(|grant| grant.assignee == assignee);

    let grant = match existing {
        // Update in place, keeping identity and provenance.
        Some(mut grant) => {
            grant.level = level;
            grant
        }
        None => Grant::local(node_id, assignee, level),
    };
    tx.put_grant(grant.clone()).await?;

    propagate_to_descendants(tx, &tree, &grant).await?;

    Ok(grant)
}

async fn delete_inner<T>(tx: &mut T, grant_id: GrantId) -> Result<DeletedGrants, EngineError>
where
    T: Transaction,
{
    let Some(grant) = tx.grant(grant_id).await? else {
        return Err(EngineError::GrantNotFound(grant_id));
    };

    let tree = resolve_tree(tx, grant.node_id).await?;
    let subtree_ids = tree.subtree_ids();

    let mut count = 0;
    for dependent in tx.grants_inherited_from(grant_id).await? {
        // Cascade stays scoped to the node's subtree.
        if subtree_ids.contains(&dependent.node_id) && tx.delete_grant(dependent.id).await? {
            count += 1;
        }
    }
    if tx.delete_grant(grant_id).await? {
        count += 1;
    }

    Ok(DeletedGrants { count })
}

async fn node_created_inner<T>(tx: &mut T, node_id: NodeId) -> Result<Vec<Grant>, EngineError>
where
    T: Transaction,
{
    let Some(node) = tx.node(node_id).await? else {
        return Err(EngineError::NodeNotFound(node_id));
    };

    let creator = Assignee::User(node.created_by);
    stamp_grant(tx, node_id, creator, PermissionLevel::FullAccess, None).await?;

    match node.parent_id {
        None => {
            let level = tx
                .default_grant_level(node.workspace_id)
                .await?
                .unwrap_or(PermissionLevel::FullAccess);
            stamp_grant(
                tx,
                node_id,
                Assignee::Workspace(node.workspace_id),
                level,
                None,
            )
            .await?;
        }
        Some(parent_id) => {
            for parent_grant in tx.node_grants(parent_id).await? {
                stamp_grant(
                    tx,
                    node_id,
                    parent_grant.assignee,
                    parent_grant.level.clone(),
                    Some(parent_grant.source_id()),
                )
                .await?;
            }
        }
    }

    Ok(tx.node_grants(node_id).await?)
}

/// Upsert a grant for `(node, assignee)` with an explicit provenance,
/// without propagation. Only used while seeding fresh nodes.
async fn stamp_grant<T>(
    tx: &mut T,
    node_id: NodeId,
    assignee: Assignee,
    level: PermissionLevel,
    source: Option<GrantId>,
) -> Result<Grant, EngineError>
where
    T: Transaction,
{
    let existing = tx
        .node_grants(node_id)
        .await?
        .into_iter()
        .find(|grant| grant.assignee == assignee);

    let grant = match existing {
        Some(mut grant) => {
            grant.level = level;
            grant.inherited_from = source;
            grant
        }
        None => match source {
            Some(source) => Grant::inherited(node_id, assignee, level, source),
            None => Grant::local(node_id, assignee, level),
        },
    };
    tx.put_grant(grant.clone()).await?;

    Ok(grant)
}

async fn validate_assignee<T>(
    tx: &T,
    node: &Node,
    assignee: Assignee,
    level: &PermissionLevel,
) -> Result<(), EngineError>
where
    T: Transaction,
{
    if let PermissionLevel::Custom(capabilities) = level {
        if capabilities.is_empty() {
            return Err(EngineError::InvalidInput(
                "custom level with an empty capability set".into(),
            ));
        }
    }

    match assignee {
        Assignee::Public => Ok(()),
        Assignee::Workspace(workspace) if workspace == node.workspace_id => Ok(()),
        Assignee::Workspace(workspace) => Err(EngineError::InvalidInput(format!(
            "workspace-wide grants must target the node's own workspace, not {}",
            workspace
        ))),
        Assignee::Role(role) => {
            if tx.workspace_has_role(node.workspace_id, role).await? {
                Ok(())
            } else {
                Err(EngineError::InvalidInput(format!(
                    "role {} is not registered in workspace {}",
                    role, node.workspace_id
                )))
            }
        }
        Assignee::User(user) => {
            if tx.membership(node.workspace_id, user).await?.is_some() {
                Ok(())
            } else {
                Err(EngineError::InvalidInput(format!(
                    "user {} is not a member of workspace {}",
                    user, node.workspace_id
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use canopy_core::{
        Assignee, Capability, CapabilitySet, GrantId, PermissionLevel, RoleId, UserId, WorkspaceId,
    };
    use canopy_store::GrantStore;

    use crate::error::EngineError;
    use crate::test_utils::TestBed;

    #[tokio::test]
    async fn creates_local_grant_and_propagates() {
        let bed = TestBed::new();
        let owner = bed.member();
        let root = bed.insert_root(owner).await;
        let child = bed.insert_child(&root, owner).await;
        let grandchild = bed.insert_child(&child, owner).await;

        let grant = bed
            .engine
            .create_or_update_grant(root.id, Assignee::User(owner), PermissionLevel::Editor)
            .await
            .unwrap();
        assert!(grant.is_local());

        // Both descendants carry the original grant as source, the
        // grandchild is not stamped with the child's intermediate id.
        for node in [&child, &grandchild] {
            let grants = bed.engine.node_grants(node.id).await.unwrap();
            assert_eq!(grants.len(), 1);
            assert_eq!(grants[0].level, PermissionLevel::Editor);
            assert_eq!(grants[0].inherited_from, Some(grant.id));
        }

        bed.assert_inheritance_consistent().await;
    }

    #[tokio::test]
    async fn repeated_upserts_keep_one_grant_per_assignee() {
        let bed = TestBed::new();
        let owner = bed.member();
        let root = bed.insert_root(owner).await;

        let assignee = Assignee::User(owner);
        for level in [
            PermissionLevel::View,
            PermissionLevel::FullAccess,
            PermissionLevel::Comment,
        ] {
            bed.engine
                .create_or_update_grant(root.id, assignee, level)
                .await
                .unwrap();
        }

        let grants = bed.engine.node_grants(root.id).await.unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].level, PermissionLevel::Comment);
    }

    #[tokio::test]
    async fn update_propagates_new_level_to_descendants() {
        let bed = TestBed::new();
        let owner = bed.member();
        let root = bed.insert_root(owner).await;
        let child = bed.insert_child(&root, owner).await;

        let original = bed
            .engine
            .create_or_update_grant(root.id, Assignee::Public, PermissionLevel::View)
            .await
            .unwrap();
        let updated = bed
            .engine
            .create_or_update_grant(root.id, Assignee::Public, PermissionLevel::Comment)
            .await
            .unwrap();
        assert_eq!(updated.id, original.id);

        let child_grants = bed.engine.node_grants(child.id).await.unwrap();
        assert_eq!(child_grants.len(), 1);
        assert_eq!(child_grants[0].level, PermissionLevel::Comment);
        assert_eq!(child_grants[0].inherited_from, Some(original.id));
    }

    #[tokio::test]
    async fn ancestor_write_overrides_descendant_grant() {
        let bed = TestBed::new();
        let owner = bed.member();
        let root = bed.insert_root(owner).await;
        let child = bed.insert_child(&root, owner).await;

        // The child first gets its own local grant for the assignee.
        let child_grant = bed
            .engine
            .create_or_update_grant(child.id, Assignee::Public, PermissionLevel::FullAccess)
            .await
            .unwrap();
        assert!(child_grant.is_local());

        // A write on the ancestor re-stamps it.
        let root_grant = bed
            .engine
            .create_or_update_grant(root.id, Assignee::Public, PermissionLevel::View)
            .await
            .unwrap();

        let grants = bed.engine.node_grants(child.id).await.unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].id, child_grant.id);
        assert_eq!(grants[0].level, PermissionLevel::View);
        assert_eq!(grants[0].inherited_from, Some(root_grant.id));
    }

    #[tokio::test]
    async fn delete_cascade_removes_exactly_the_inherited_set() {
        let bed = TestBed::new();
        let owner = bed.member();
        let root = bed.insert_root(owner).await;
        let child = bed.insert_child(&root, owner).await;
        let grandchild = bed.insert_child(&child, owner).await;

        let inherited_source = bed
            .engine
            .create_or_update_grant(root.id, Assignee::Public, PermissionLevel::View)
            .await
            .unwrap();
        // An independently sourced grant on the child survives the cascade.
        let independent = bed
            .engine
            .create_or_update_grant(child.id, Assignee::User(owner), PermissionLevel::Editor)
            .await
            .unwrap();

        let deleted = bed.engine.delete_grant(inherited_source.id).await.unwrap();
        // Root grant plus the two inherited copies.
        assert_eq!(deleted.count, 3);

        assert!(bed.engine.node_grants(root.id).await.unwrap().is_empty());
        let child_grants = bed.engine.node_grants(child.id).await.unwrap();
        assert_eq!(child_grants.len(), 1);
        assert_eq!(child_grants[0].id, independent.id);
        let grandchild_grants = bed.engine.node_grants(grandchild.id).await.unwrap();
        assert_eq!(grandchild_grants.len(), 1);
        assert_eq!(grandchild_grants[0].inherited_from, Some(independent.id));

        bed.assert_inheritance_consistent().await;
    }

    #[tokio::test]
    async fn deleting_an_inherited_grant_leaves_the_source_alone() {
        let bed = TestBed::new();
        let owner = bed.member();
        let root = bed.insert_root(owner).await;
        let child = bed.insert_child(&root, owner).await;
        let grandchild = bed.insert_child(&child, owner).await;

        let source = bed
            .engine
            .create_or_update_grant(root.id, Assignee::Public, PermissionLevel::View)
            .await
            .unwrap();

        let on_grandchild = bed
            .engine
            .node_grants(grandchild.id)
            .await
            .unwrap()
            .remove(0);
        let deleted = bed.engine.delete_grant(on_grandchild.id).await.unwrap();
        assert_eq!(deleted.count, 1);

        // Root and child keep their grants.
        assert_eq!(bed.engine.node_grants(root.id).await.unwrap().len(), 1);
        assert_eq!(bed.engine.node_grants(child.id).await.unwrap().len(), 1);
        assert!(
            bed.store
                .grant(source.id)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn delete_unknown_grant_fails() {
        let bed = TestBed::new();
        let missing = GrantId::random();
        assert_matches!(
            bed.engine.delete_grant(missing).await,
            Err(EngineError::GrantNotFound(id)) if id == missing
        );
    }

    #[tokio::test]
    async fn rejects_grants_for_foreign_workspace() {
        let bed = TestBed::new();
        let owner = bed.member();
        let root = bed.insert_root(owner).await;

        let result = bed
            .engine
            .create_or_update_grant(
                root.id,
                Assignee::Workspace(WorkspaceId::random()),
                PermissionLevel::View,
            )
            .await;
        assert_matches!(result, Err(EngineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn rejects_unregistered_role_and_non_member_user() {
        let bed = TestBed::new();
        let owner = bed.member();
        let root = bed.insert_root(owner).await;

        assert_matches!(
            bed.engine
                .create_or_update_grant(
                    root.id,
                    Assignee::Role(RoleId::random()),
                    PermissionLevel::View
                )
                .await,
            Err(EngineError::InvalidInput(_))
        );
        assert_matches!(
            bed.engine
                .create_or_update_grant(
                    root.id,
                    Assignee::User(UserId::random()),
                    PermissionLevel::View
                )
                .await,
            Err(EngineError::InvalidInput(_))
        );

        // Failed mutations leave no partial state behind.
        assert!(bed.engine.node_grants(root.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_empty_custom_level() {
        let bed = TestBed::new();
        let owner = bed.member();
        let root = bed.insert_root(owner).await;

        let result = bed
            .engine
            .create_or_update_grant(
                root.id,
                Assignee::Public,
                PermissionLevel::Custom(CapabilitySet::new()),
            )
            .await;
        assert_matches!(result, Err(EngineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn seeds_root_node_with_creator_and_workspace_default() {
        let bed = TestBed::new();
        let owner = bed.member();
        bed.store
            .set_default_grant_level(bed.workspace, PermissionLevel::Comment);
        let root = bed.insert_root(owner).await;

        let grants = bed.engine.node_created(root.id).await.unwrap();
        assert_eq!(grants.len(), 2);

        let creator_grant = grants
            .iter()
            .find(|grant| grant.assignee == Assignee::User(owner))
            .unwrap();
        assert_eq!(creator_grant.level, PermissionLevel::FullAccess);
        assert!(creator_grant.is_local());

        let workspace_grant = grants
            .iter()
            .find(|grant| grant.assignee == Assignee::Workspace(bed.workspace))
            .unwrap();
        assert_eq!(workspace_grant.level, PermissionLevel::Comment);
        assert!(workspace_grant.is_local());
    }

    #[tokio::test]
    async fn seeds_child_node_from_parent_grants() {
        let bed = TestBed::new();
        let owner = bed.member();
        let root = bed.insert_root(owner).await;

        let user_grant = bed
            .engine
            .create_or_update_grant(root.id, Assignee::User(owner), PermissionLevel::FullAccess)
            .await
            .unwrap();
        let workspace_grant = bed
            .engine
            .create_or_update_grant(
                root.id,
                Assignee::Workspace(bed.workspace),
                PermissionLevel::View,
            )
            .await
            .unwrap();

        let child = bed.insert_child(&root, owner).await;
        let grants = bed.engine.node_created(child.id).await.unwrap();
        assert_eq!(grants.len(), 2);

        let inherited_user = grants
            .iter()
            .find(|grant| grant.assignee == Assignee::User(owner))
            .unwrap();
        assert_eq!(inherited_user.level, PermissionLevel::FullAccess);
        assert_eq!(inherited_user.inherited_from, Some(user_grant.id));

        let inherited_workspace = grants
            .iter()
            .find(|grant| grant.assignee == Assignee::Workspace(bed.workspace))
            .unwrap();
        assert_eq!(inherited_workspace.inherited_from, Some(workspace_grant.id));

        bed.assert_inheritance_consistent().await;
    }

    #[tokio::test]
    async fn resolver_unions_capabilities_from_custom_grants() {
        let bed = TestBed::new();
        let owner = bed.member();
        let user = bed.member();
        let role = bed.role();
        bed.store.assign_role(bed.workspace, user, role);
        let root = bed.insert_root(owner).await;

        bed.engine
            .create_or_update_grant(
                root.id,
                Assignee::Role(role),
                PermissionLevel::Custom(CapabilitySet::from([Capability::Comment])),
            )
            .await
            .unwrap();
        bed.engine
            .create_or_update_grant(
                root.id,
                Assignee::User(user),
                PermissionLevel::Custom(CapabilitySet::from([Capability::EditContent])),
            )
            .await
            .unwrap();

        let effective = bed.engine.compute_effective(Some(user), root.id).await.unwrap();
        assert!(effective.contains(Capability::Comment));
        assert!(effective.contains(Capability::EditContent));
        assert_eq!(effective.len(), 2);
    }
}
