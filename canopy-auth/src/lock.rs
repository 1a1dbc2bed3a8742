// SPDX-License-Identifier: MIT OR Apache-2.0

//! The lock transform: freezing a node's grant set to a minimal explicit
//! one.

use canopy_core::{Assignee, Capability, Grant, NodeId, PermissionLevel, UserId};
use canopy_store::Transaction;

use crate::error::EngineError;
use crate::resolve::effective_capabilities_on;

/// Rewrite a node's grant set so that only its creator keeps full control.
///
/// The caller must hold [`Capability::EditLock`] on the node or be a
/// workspace administrator. The rewrite is not an inheritance cascade: it
/// operates on the node's own grants only and never touches descendants.
///
/// - The creator ends up with a local [`PermissionLevel::FullAccess`] grant,
///   created when missing.
/// - Every other assignee holding capabilities beyond read-and-comment is
///   downgraded to [`PermissionLevel::Comment`]; assignees already at or
///   below that boundary keep their level.
/// - All resulting grants are local. Grant identities are preserved so that
///   descendant grants materialised from them earlier stay valid.
///
/// Applying the transform twice yields the same grant set as applying it
/// once.
pub(crate) async fn lock_to_minimal_access<T>(
    tx: &mut T,
    node_id: NodeId,
    acting_user: UserId,
) -> Result<Vec<Grant>, EngineError>
where
    T: Transaction,
{
    let Some(node) = tx.node(node_id).await? else {
        return Err(EngineError::NodeNotFound(node_id));
    };

    let is_admin = tx
        .membership(node.workspace_id, acting_user)
        .await?
        .is_some_and(|membership| membership.is_admin());
    if !is_admin {
        let capabilities = effective_capabilities_on(tx, Some(acting_user), &node).await?;
        if !capabilities.contains(Capability::EditLock) {
            return Err(EngineError::Unauthorized(acting_user));
        }
    }

    let creator = Assignee::User(node.created_by);
    let reduced_capabilities = PermissionLevel::Comment.capabilities();

    let mut grants = Vec::new();
    let mut creator_present = false;
    for mut grant in tx.node_grants(node_id).await? {
        if grant.assignee == creator {
            grant.level = PermissionLevel::FullAccess;
            creator_present = true;
        } else if !grant.level.capabilities().is_subset(&reduced_capabilities) {
            grant.level = PermissionLevel::Comment;
        }
        grant.inherited_from = None;
        tx.put_grant(grant.clone()).await?;
        grants.push(grant);
    }

    if !creator_present {
        let grant = Grant::local(node_id, creator, PermissionLevel::FullAccess);
        tx.put_grant(grant.clone()).await?;
        grants.push(grant);
    }

    tx.set_node_locked(node_id, true).await?;

    Ok(grants)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use canopy_core::{Assignee, Capability, CapabilitySet, PermissionLevel};
    use canopy_store::NodeStore;

    use crate::error::EngineError;
    use crate::test_utils::TestBed;

    #[tokio::test]
    async fn replaces_the_grant_set_with_a_minimal_one() {
        let bed = TestBed::new();
        let creator = bed.member();
        let collaborator = bed.member();
        let root = bed.insert_root(creator).await;

        bed.engine
            .create_or_update_grant(root.id, Assignee::User(creator), PermissionLevel::FullAccess)
            .await
            .unwrap();
        bed.engine
            .create_or_update_grant(
                root.id,
                Assignee::User(collaborator),
                PermissionLevel::FullAccess,
            )
            .await
            .unwrap();
        bed.engine
            .create_or_update_grant(
                root.id,
                Assignee::Workspace(bed.workspace),
                PermissionLevel::Editor,
            )
            .await
            .unwrap();
        bed.engine
            .create_or_update_grant(root.id, Assignee::Public, PermissionLevel::View)
            .await
            .unwrap();

        let grants = bed.engine.lock_node(root.id, creator).await.unwrap();
        assert_eq!(grants.len(), 4);
        assert!(grants.iter().all(|grant| grant.is_local()));

        let creator_grant = grants
            .iter()
            .find(|grant| grant.assignee == Assignee::User(creator))
            .unwrap();
        assert_eq!(creator_grant.level, PermissionLevel::FullAccess);

        let collaborator_grant = grants
            .iter()
            .find(|grant| grant.assignee == Assignee::User(collaborator))
            .unwrap();
        assert_eq!(collaborator_grant.level, PermissionLevel::Comment);

        let workspace_grant = grants
            .iter()
            .find(|grant| grant.assignee == Assignee::Workspace(bed.workspace))
            .unwrap();
        assert_eq!(workspace_grant.level, PermissionLevel::Comment);

        // Grants already at or below the reduced level keep it.
        let public_grant = grants
            .iter()
            .find(|grant| grant.assignee == Assignee::Public)
            .unwrap();
        assert_eq!(public_grant.level, PermissionLevel::View);

        let node = bed.store.node(root.id).await.unwrap().unwrap();
        assert!(node.locked);
    }

    #[tokio::test]
    async fn locking_twice_is_idempotent() {
        let bed = TestBed::new();
        let creator = bed.member();
        let collaborator = bed.member();
        let root = bed.insert_root(creator).await;

        bed.engine
            .create_or_update_grant(root.id, Assignee::User(creator), PermissionLevel::FullAccess)
            .await
            .unwrap();
        bed.engine
            .create_or_update_grant(
                root.id,
                Assignee::User(collaborator),
                PermissionLevel::Editor,
            )
            .await
            .unwrap();

        let first = bed.engine.lock_node(root.id, creator).await.unwrap();
        let second = bed.engine.lock_node(root.id, creator).await.unwrap();

        let sort = |mut grants: Vec<canopy_core::Grant>| {
            grants.sort_by_key(|grant| grant.id);
            grants
        };
        assert_eq!(sort(first), sort(second));
    }

    #[tokio::test]
    async fn does_not_touch_descendants() {
        let bed = TestBed::new();
        let creator = bed.member();
        let admin = bed.admin();
        let root = bed.insert_root(creator).await;
        let child = bed.insert_child(&root, creator).await;

        let source = bed
            .engine
            .create_or_update_grant(
                root.id,
                Assignee::Workspace(bed.workspace),
                PermissionLevel::Editor,
            )
            .await
            .unwrap();

        bed.engine.lock_node(root.id, admin).await.unwrap();

        // The child still carries the pre-lock inherited grant, its
        // provenance reference intact.
        let child_grants = bed.engine.node_grants(child.id).await.unwrap();
        assert_eq!(child_grants.len(), 1);
        assert_eq!(child_grants[0].level, PermissionLevel::Editor);
        assert_eq!(child_grants[0].inherited_from, Some(source.id));

        bed.assert_inheritance_consistent().await;
    }

    #[tokio::test]
    async fn requires_the_lock_capability() {
        let bed = TestBed::new();
        let creator = bed.member();
        let editor = bed.member();
        let root = bed.insert_root(creator).await;

        bed.engine
            .create_or_update_grant(root.id, Assignee::User(editor), PermissionLevel::Editor)
            .await
            .unwrap();

        // An editor cannot lock.
        assert_matches!(
            bed.engine.lock_node(root.id, editor).await,
            Err(EngineError::Unauthorized(user)) if user == editor
        );

        // A member holding an explicit lock capability can.
        let locker = bed.member();
        bed.engine
            .create_or_update_grant(
                root.id,
                Assignee::User(locker),
                PermissionLevel::Custom(CapabilitySet::from([Capability::EditLock])),
            )
            .await
            .unwrap();
        assert!(bed.engine.lock_node(root.id, locker).await.is_ok());
    }

    #[tokio::test]
    async fn admins_can_lock_without_any_grant() {
        let bed = TestBed::new();
        let creator = bed.member();
        let admin = bed.admin();
        let root = bed.insert_root(creator).await;

        let grants = bed.engine.lock_node(root.id, admin).await.unwrap();
        let creator_grant = grants
            .iter()
            .find(|grant| grant.assignee == Assignee::User(creator))
            .unwrap();
        assert_eq!(creator_grant.level, PermissionLevel::FullAccess);
    }
}
