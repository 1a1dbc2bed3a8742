// SPDX-License-Identifier: MIT OR Apache-2.0

//! Atomic write transactions.
//!
//! Multiple writes to a store are grouped into one single, atomic
//! transaction when they need to strictly _all_ occur or _none_ occur. Every
//! grant cascade in the engine follows this pattern: tree resolution,
//! descendant enumeration and the full batch of grant writes share one
//! transaction, so a partially-propagated grant set is never observable.

use crate::traits::{GrantStore, MembershipStore, NodeStore, StoreError};

/// A scoped unit of atomic work against a store.
///
/// A transaction reads its own uncommitted writes. Dropping a transaction
/// without committing discards it; [`Transaction::rollback`] does so
/// explicitly.
pub trait Transaction: NodeStore + GrantStore + MembershipStore + Send + Sized {
    /// Persist all writes made within this transaction.
    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Discard all writes made within this transaction.
    fn rollback(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// A store which can open atomic write transactions.
pub trait WritableStore {
    type Transaction: Transaction;

    /// Begin a new transaction.
    fn begin(&self) -> impl Future<Output = Result<Self::Transaction, StoreError>> + Send;
}
