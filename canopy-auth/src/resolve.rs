// SPDX-License-Identifier: MIT OR Apache-2.0

//! Permission resolution: computing a user's effective capabilities on a
//! node.

use canopy_core::{Assignee, CapabilitySet, Membership, Node, NodeId, UserId};
use canopy_store::{GrantStore, MembershipStore, NodeStore};
use tracing::debug;

use crate::error::EngineError;

/// Compute the effective capability set of a user (or the anonymous public)
/// on a node.
///
/// Reads only the node's own grant set: inheritance was materialised at
/// write time, so no ancestor walk happens here.
pub(crate) async fn effective_capabilities<S>(
    store: &S,
    user: Option<UserId>,
    node_id: NodeId,
) -> Result<CapabilitySet, EngineError>
where
    S: NodeStore + GrantStore + MembershipStore,
{
    let Some(node) = store.node(node_id).await? else {
        return Err(EngineError::NodeNotFound(node_id));
    };

    effective_capabilities_on(store, user, &node).await
}

/// [`effective_capabilities`] against an already loaded node. Shared with
/// the lock transform, which authorises its caller inside a transaction.
pub(crate) async fn effective_capabilities_on<S>(
    store: &S,
    user: Option<UserId>,
    node: &Node,
) -> Result<CapabilitySet, EngineError>
where
    S: GrantStore + MembershipStore,
{
    let grants = store.node_grants(node.id).await?;

    let Some(user) = user else {
        // Anonymous callers only ever match public grants.
        let mut capabilities = CapabilitySet::new();
        for grant in &grants {
            if matches!(grant.assignee, Assignee::Public) {
                capabilities.union_with(&grant.level.capabilities());
            }
        }
        return Ok(capabilities);
    };

    let membership = store.membership(node.workspace_id, user).await?;

    if membership.is_some_and(|membership| membership.is_admin()) {
        if node.locked {
            debug!(node = %node.id, user = %user, "administrator override applied to locked node");
        }
        return Ok(CapabilitySet::full());
    }

    // Guests only match grants assigned to them directly, besides public
    // ones.
    let roles = match membership {
        Some(Membership::Member) => store.member_roles(node.workspace_id, user).await?,
        _ => Vec::new(),
    };

    let mut capabilities = CapabilitySet::new();
    for grant in &grants {
        let applies = match grant.assignee {
            Assignee::Public => true,
            Assignee::User(id) => id == user,
            Assignee::Role(role) => {
                membership == Some(Membership::Member) && roles.contains(&role)
            }
            Assignee::Workspace(workspace) => {
                membership == Some(Membership::Member) && workspace == node.workspace_id
            }
        };

        if applies {
            capabilities.union_with(&grant.level.capabilities());
        }
    }

    Ok(capabilities)
}
