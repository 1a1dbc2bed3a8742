// SPDX-License-Identifier: MIT OR Apache-2.0

//! Grant materialisation when a node moves to a new parent.

use canopy_core::{Grant, NodeId};
use canopy_store::Transaction;

use crate::error::EngineError;
use crate::tree::resolve_tree;

/// Process a parent change for `node_id`.
///
/// After the move, any grant on the node whose inheritance source no longer
/// lies on an ancestor is converted into a local grant under a fresh
/// identity, and every grant in the moved subtree still pointing at the old
/// source is re-pointed at the new local one. Grants that were already
/// local, or inherit from an ancestor that is still in the chain, are left
/// untouched, as is everything outside the moved subtree.
pub(crate) async fn reparent<T>(
    tx: &mut T,
    node_id: NodeId,
    new_parent: Option<NodeId>,
) -> Result<(), EngineError>
where
    T: Transaction,
{
    let Some(node) = tx.node(node_id).await? else {
        return Err(EngineError::NodeNotFound(node_id));
    };

    if new_parent == Some(node_id) {
        return Err(EngineError::InvalidOperation(format!(
            "node {} cannot become its own parent",
            node_id
        )));
    }
    if let Some(parent_id) = new_parent {
        let Some(parent) = tx.node(parent_id).await? else {
            return Err(EngineError::InvalidOperation(format!(
                "reparent target {} does not exist",
                parent_id
            )));
        };
        if parent.workspace_id != node.workspace_id {
            return Err(EngineError::InvalidOperation(format!(
                "reparent target {} belongs to a different workspace",
                parent_id
            )));
        }
    }

    let tree = resolve_tree(tx, node_id).await?;
    if let Some(parent_id) = new_parent {
        if tree.subtree_ids().contains(&parent_id) {
            return Err(EngineError::InvalidOperation(format!(
                "moving {} under its own descendant {} would create a cycle",
                node_id, parent_id
            )));
        }
    }

    tx.set_node_parent(node_id, new_parent).await?;

    let tree = resolve_tree(tx, node_id).await?;
    let ancestor_ids = tree.ancestor_ids();
    let subtree_ids = tree.subtree_ids();

    for grant in tx.node_grants(node_id).await? {
        let Some(source_id) = grant.inherited_from else {
            continue;
        };

        let source_node = match tx.grant(source_id).await? {
            Some(source) => Some(source.node_id),
            // Source no longer resolvable; treat it as outside the chain.
            None => None,
        };
        if source_node.is_some_and(|id| ancestor_ids.contains(&id)) {
            continue;
        }

        // Materialise as local under a fresh identity.
        tx.delete_grant(grant.id).await?;
        let materialised = Grant::local(node_id, grant.assignee, grant.level.clone());
        tx.put_grant(materialised.clone()).await?;

        // The moved subtree keeps inheriting, now from the node itself.
        for dependent in tx.grants_inherited_from(source_id).await? {
            if !subtree_ids.contains(&dependent.node_id) {
                continue;
            }
            let mut dependent = dependent;
            dependent.inherited_from = Some(materialised.id);
            tx.put_grant(dependent).await?;
        }
    }

    Ok(())
}
