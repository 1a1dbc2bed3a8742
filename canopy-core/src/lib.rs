// SPDX-License-Identifier: MIT OR Apache-2.0

#![cfg_attr(doctest, doc = include_str!("../README.md"))]

//! Core data types for canopy, an engine managing access grants over nested
//! content nodes ("pages") organised in a tree per workspace.
//!
//! This crate contains no storage or engine logic. It defines the vocabulary
//! shared by the rest of the stack:
//!
//! - Identifiers for workspaces, nodes, users, roles and grants.
//! - [`Node`], a position in the per-workspace content tree.
//! - [`Grant`], an access-control entry binding an [`Assignee`] to a
//!   [`PermissionLevel`] on a node, with optional inheritance provenance.
//! - [`Capability`] and [`CapabilitySet`], the atomic permitted actions a
//!   resolved permission check reports.
//!
//! Higher layers (`canopy-store`, `canopy-auth`) build persistence and the
//! inheritance algorithms on top of these types.

pub mod access;
pub mod grant;
pub mod identifiers;
pub mod node;
pub mod workspace;

pub use access::{Capability, CapabilitySet, PermissionLevel};
pub use grant::{Assignee, Grant};
pub use identifiers::{GrantId, IdError, NodeId, RoleId, UserId, WorkspaceId};
pub use node::Node;
pub use workspace::Membership;
