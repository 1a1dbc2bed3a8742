// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inheritance propagation: keeping descendant grants consistent after a
//! grant create or update.

use canopy_core::Grant;
use canopy_store::Transaction;

use crate::error::EngineError;
use crate::tree::ResolvedTree;

/// Push a created or updated grant down to every descendant of its node.
///
/// Descendants are stamped with the grant's _ultimate local source_
/// (`Grant::source_id`), never an intermediate inherited id. Because every
/// inherited grant in the store already carries its ultimate source, a
/// single pass over the subtree suffices and later cascade deletion stays a
/// single indexed lookup.
///
/// An existing descendant grant for the same assignee has its level and
/// provenance overwritten, even when it was local or inherited from
/// elsewhere: the write on the ancestor wins for everything beneath it.
pub(crate) async fn propagate_to_descendants<T>(
    tx: &mut T,
    tree: &ResolvedTree,
    grant: &Grant,
) -> Result<(), EngineError>
where
    T: Transaction,
{
    let source = grant.source_id();

    for descendant in &tree.subtree {
        let existing = tx
            .node_grants(descendant.id)
            .await?
            .into_iter()
            .find(|candidate| candidate.assignee == grant.assignee);

        match existing {
            Some(mut descendant_grant) => {
                descendant_grant.level = grant.level.clone();
                descendant_grant.inherited_from = Some(source);
                tx.put_grant(descendant_grant).await?;
            }
            None => {
                tx.put_grant(Grant::inherited(
                    descendant.id,
                    grant.assignee,
                    grant.level.clone(),
                    source,
                ))
                .await?;
            }
        }
    }

    Ok(())
}
