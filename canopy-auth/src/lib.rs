// SPDX-License-Identifier: MIT OR Apache-2.0

#![cfg_attr(doctest, doc = include_str!("../README.md"))]

//! Hierarchical permission inheritance, propagation and resolution for
//! canopy page trees.
//!
//! Access grants can be attached to any node of a workspace tree and are
//! automatically materialised onto every descendant, so answering "what may
//! user U do with node P?" never walks the tree: a node's own grant set is
//! self-sufficient. The price is paid at write time, where the engine keeps
//! descendant grants consistent under grant creation, update and deletion,
//! subtree moves, and lock transforms, each inside one atomic store
//! transaction.
//!
//! Inherited grants track the _original local_ grant they were materialised
//! from via a weak `inherited_from` reference. Propagation always stamps
//! descendants with that original id, never an intermediate one, which keeps
//! cascade deletion a single indexed lookup.
//!
//! The entry point is [`Engine`], generic over the `canopy-store` traits;
//! see `canopy_store::MemoryStore` for the reference backend.

pub mod engine;
pub mod error;
pub mod tree;

mod lock;
mod propagate;
mod reparent;
mod resolve;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use engine::{DeletedGrants, Engine};
pub use error::EngineError;
pub use tree::{ResolvedTree, resolve_tree};
