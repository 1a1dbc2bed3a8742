// SPDX-License-Identifier: MIT OR Apache-2.0

//! Permission levels and the capabilities they map to.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A single permitted action on a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// View the node.
    Read,

    /// Leave comments on the node.
    Comment,

    /// Change the node's content.
    EditContent,

    /// Freeze the node's grant set to a minimal explicit one.
    EditLock,

    /// Delete the node.
    Delete,

    /// Manage the node's grants.
    Administer,
}

impl Capability {
    /// All capabilities, from least to most privileged.
    pub const ALL: [Capability; 6] = [
        Capability::Read,
        Capability::Comment,
        Capability::EditContent,
        Capability::EditLock,
        Capability::Delete,
        Capability::Administer,
    ];
}

impl Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Capability::Read => "read",
            Capability::Comment => "comment",
            Capability::EditContent => "edit_content",
            Capability::EditLock => "edit_lock",
            Capability::Delete => "delete",
            Capability::Administer => "administer",
        };

        write!(f, "{}", s)
    }
}

/// A set of capabilities, as returned by permission resolution.
///
/// The effective capabilities of a user on a node are the _union_ of the
/// capability sets of all grants matching that user, so the set is the unit
/// resolution works in, not the level.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// The empty capability set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The set containing every capability.
    pub fn full() -> Self {
        Capability::ALL.into_iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn insert(&mut self, capability: Capability) -> bool {
        self.0.insert(capability)
    }

    /// Extend this set with all capabilities of `other`.
    pub fn union_with(&mut self, other: &CapabilitySet) {
        self.0.extend(other.0.iter().copied());
    }

    /// The union of this set and `other` as a new set.
    pub fn union(&self, other: &CapabilitySet) -> CapabilitySet {
        let mut result = self.clone();
        result.union_with(other);
        result
    }

    /// True when every capability of `other` is contained in this set.
    pub fn is_superset(&self, other: &CapabilitySet) -> bool {
        self.0.is_superset(&other.0)
    }

    /// True when every capability of this set is contained in `other`.
    pub fn is_subset(&self, other: &CapabilitySet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Capability; N]> for CapabilitySet {
    fn from(capabilities: [Capability; N]) -> Self {
        capabilities.into_iter().collect()
    }
}

impl Display for CapabilitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for capability in &self.0 {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}", capability)?;
            first = false;
        }

        Ok(())
    }
}

/// A permission tier which can be assigned to an assignee on a node.
///
/// Each named level maps to a fixed capability set, and the capability set of
/// a higher named level is a strict superset of any lower one. `Custom`
/// carries an explicit capability set which need not nest inside the named
/// tiers, which is what makes the overall order _partial_: levels compare by
/// capability-set inclusion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    /// Read only.
    View,

    /// Read and comment.
    Comment,

    /// Read, comment and edit content.
    Editor,

    /// Every capability, including lock, delete and grant management.
    FullAccess,

    /// An explicit capability set.
    Custom(CapabilitySet),
}

impl PermissionLevel {
    /// The fixed capability set this level maps to.
    pub fn capabilities(&self) -> CapabilitySet {
        match self {
            PermissionLevel::View => CapabilitySet::from([Capability::Read]),
            PermissionLevel::Comment => {
                CapabilitySet::from([Capability::Read, Capability::Comment])
            }
            PermissionLevel::Editor => CapabilitySet::from([
                Capability::Read,
                Capability::Comment,
                Capability::EditContent,
            ]),
            PermissionLevel::FullAccess => CapabilitySet::full(),
            PermissionLevel::Custom(capabilities) => capabilities.clone(),
        }
    }

    /// True when this level includes the given capability.
    pub fn grants(&self, capability: Capability) -> bool {
        self.capabilities().contains(capability)
    }
}

impl Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionLevel::View => write!(f, "view"),
            PermissionLevel::Comment => write!(f, "comment"),
            PermissionLevel::Editor => write!(f, "editor"),
            PermissionLevel::FullAccess => write!(f, "full_access"),
            PermissionLevel::Custom(capabilities) => write!(f, "custom({})", capabilities),
        }
    }
}

impl PartialOrd for PermissionLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let own = self.capabilities();
        let their = other.capabilities();

        if own == their {
            // A custom level spelling out the exact capability set of a
            // named one is still a distinct level.
            if self == other {
                Some(Ordering::Equal)
            } else {
                None
            }
        } else if own.is_superset(&their) {
            Some(Ordering::Greater)
        } else if own.is_subset(&their) {
            Some(Ordering::Less)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Capability, CapabilitySet, PermissionLevel};

    #[test]
    fn named_levels_nest_strictly() {
        assert!(PermissionLevel::Comment > PermissionLevel::View);
        assert!(PermissionLevel::Editor > PermissionLevel::Comment);
        assert!(PermissionLevel::FullAccess > PermissionLevel::Editor);
    }

    #[test]
    fn custom_levels_can_be_incomparable() {
        let comment_only = PermissionLevel::Custom(CapabilitySet::from([Capability::Comment]));
        let edit_only = PermissionLevel::Custom(CapabilitySet::from([Capability::EditContent]));

        assert!(!(comment_only < edit_only));
        assert!(!(comment_only > edit_only));
        assert_ne!(comment_only, edit_only);
    }

    #[test]
    fn union_merges_non_overlapping_sets() {
        let comment_only = CapabilitySet::from([Capability::Comment]);
        let edit_only = CapabilitySet::from([Capability::EditContent]);

        let union = comment_only.union(&edit_only);
        assert!(union.contains(Capability::Comment));
        assert!(union.contains(Capability::EditContent));
        assert_eq!(union.len(), 2);
    }

    #[test]
    fn full_access_covers_all_capabilities() {
        let capabilities = PermissionLevel::FullAccess.capabilities();
        for capability in Capability::ALL {
            assert!(capabilities.contains(capability));
        }
    }

    #[test]
    fn serde_level_representation() {
        let level = PermissionLevel::FullAccess;
        let json = serde_json::to_string(&level).unwrap();
        assert_eq!(json, "\"full_access\"");

        let custom = PermissionLevel::Custom(CapabilitySet::from([Capability::Read]));
        let json = serde_json::to_string(&custom).unwrap();
        assert_eq!(json, "{\"custom\":[\"read\"]}");
    }
}
