// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tree resolution: ancestor chains and descendant subtrees.

use std::collections::{HashMap, HashSet, VecDeque};

use canopy_core::{Node, NodeId};
use canopy_store::NodeStore;

use crate::error::EngineError;

/// The resolved surroundings of one node: its ancestor chain and its full
/// descendant subtree.
#[derive(Clone, Debug)]
pub struct ResolvedTree {
    pub target: Node,

    /// Ancestors ordered root first, immediate parent last.
    pub ancestors: Vec<Node>,

    /// All descendants of the target, parents before children. Excludes the
    /// target itself.
    pub subtree: Vec<Node>,
}

impl ResolvedTree {
    pub fn ancestor_ids(&self) -> HashSet<NodeId> {
        self.ancestors.iter().map(|node| node.id).collect()
    }

    pub fn subtree_ids(&self) -> HashSet<NodeId> {
        self.subtree.iter().map(|node| node.id).collect()
    }
}

/// Resolve the ancestor chain and descendant subtree of a node.
///
/// Works over a per-call snapshot of the node's workspace: a parent→children
/// index is built once, then both walks are iterative, so depth is bounded
/// by loop iterations rather than stack frames. A repeated node on the
/// ancestor walk means the stored tree is corrupt and resolution fails
/// rather than looping.
pub async fn resolve_tree<S>(store: &S, node_id: NodeId) -> Result<ResolvedTree, EngineError>
where
    S: NodeStore,
{
    let Some(target) = store.node(node_id).await? else {
        return Err(EngineError::NodeNotFound(node_id));
    };

    let nodes = store.workspace_nodes(target.workspace_id).await?;
    let by_id: HashMap<NodeId, &Node> = nodes.iter().map(|node| (node.id, node)).collect();

    let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for node in &nodes {
        if let Some(parent_id) = node.parent_id {
            children.entry(parent_id).or_default().push(node.id);
        }
    }

    let mut ancestors = Vec::new();
    let mut visited = HashSet::from([node_id]);
    let mut cursor = target.parent_id;
    while let Some(parent_id) = cursor {
        if !visited.insert(parent_id) {
            return Err(EngineError::InvalidOperation(format!(
                "ancestor chain of {} contains a cycle at {}",
                node_id, parent_id
            )));
        }
        let Some(parent) = by_id.get(&parent_id) else {
            return Err(EngineError::NodeNotFound(parent_id));
        };
        ancestors.push((*parent).clone());
        cursor = parent.parent_id;
    }
    ancestors.reverse();

    let mut subtree = Vec::new();
    let mut queue = VecDeque::from([node_id]);
    while let Some(id) = queue.pop_front() {
        let Some(child_ids) = children.get(&id) else {
            continue;
        };
        for child_id in child_ids {
            if let Some(child) = by_id.get(child_id) {
                subtree.push((*child).clone());
                queue.push_back(*child_id);
            }
        }
    }

    Ok(ResolvedTree {
        target,
        ancestors,
        subtree,
    })
}
