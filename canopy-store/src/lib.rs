// SPDX-License-Identifier: MIT OR Apache-2.0

#![cfg_attr(doctest, doc = include_str!("../README.md"))]

//! Interfaces and implementations of persistence layers for canopy nodes,
//! grants and membership state.
//!
//! The crate separates three concerns:
//!
//! - **Query and mutation traits** ([`NodeStore`], [`GrantStore`],
//!   [`MembershipStore`]) describing the state the engine reads and writes.
//!   Grant storage must maintain a lookup index over `inherited_from`, which
//!   is what keeps cascade deletion a single indexed query.
//! - **Atomic write transactions** ([`WritableStore`], [`Transaction`]).
//!   Every engine mutation groups tree resolution, descendant enumeration
//!   and the full batch of grant writes into one transaction which either
//!   commits entirely or leaves no trace. Concurrent readers observe the
//!   pre- or post-transaction state, never a partial cascade.
//! - **A reference in-memory implementation** ([`MemoryStore`]) usable in
//!   asynchronous and multi-threaded contexts. Its transactions work on a
//!   copy of the whole state and swap it in on commit, giving
//!   last-committed-write-wins semantics between conflicting transactions.
//!
//! The membership traits are read-only on purpose: workspace membership and
//! role assignment are owned by an external collaborator, the engine only
//! queries them.

pub mod memory;
pub mod traits;
pub mod transactions;

pub use memory::{InnerMemoryStore, MemoryStore, MemoryTransaction};
pub use traits::{
    GrantStore, LocalGrantStore, LocalMembershipStore, LocalNodeStore, MembershipStore, NodeStore,
    StoreError,
};
pub use transactions::{Transaction, WritableStore};
