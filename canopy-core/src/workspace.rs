// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

/// The kind of membership a user holds in a workspace.
///
/// Membership is owned by the membership layer; the engine only reads it.
/// Administrators bypass grant matching entirely, guests only match grants
/// assigned to them directly (or to the public).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Membership {
    Admin,
    Member,
    Guest,
}

impl Membership {
    pub fn is_admin(&self) -> bool {
        matches!(self, Membership::Admin)
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Membership::Guest)
    }
}
