//! Permission capability tags and sets.
//!
//! Authorization in the storefront is permission-based: every user carries a
//! set of capability tags, and protected mutations require a non-empty
//! intersection with the tags they demand. Ownership checks are layered on
//! top of this by the authorization guards, not encoded here.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A single capability tag.
///
/// Serialized as the stored uppercase form (`"ITEMDELETE"`, no separators).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Permission {
    /// Baseline capability every signed-up user holds.
    #[serde(rename = "USER")]
    User,
    /// Full administrative capability.
    #[serde(rename = "ADMIN")]
    Admin,
    /// May create items.
    #[serde(rename = "ITEMCREATE")]
    ItemCreate,
    /// May update items owned by others.
    #[serde(rename = "ITEMUPDATE")]
    ItemUpdate,
    /// May delete items owned by others.
    #[serde(rename = "ITEMDELETE")]
    ItemDelete,
    /// May change other users' permission sets.
    #[serde(rename = "PERMISSIONUPDATE")]
    PermissionUpdate,
}

impl Permission {
    /// The stored string form of this tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
            Self::ItemCreate => "ITEMCREATE",
            Self::ItemUpdate => "ITEMUPDATE",
            Self::ItemDelete => "ITEMDELETE",
            Self::PermissionUpdate => "PERMISSIONUPDATE",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a permission tag.
#[derive(thiserror::Error, Debug, Clone)]
#[error("unknown permission tag: {0}")]
pub struct PermissionError(pub String);

impl std::str::FromStr for Permission {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Self::User),
            "ADMIN" => Ok(Self::Admin),
            "ITEMCREATE" => Ok(Self::ItemCreate),
            "ITEMUPDATE" => Ok(Self::ItemUpdate),
            "ITEMDELETE" => Ok(Self::ItemDelete),
            "PERMISSIONUPDATE" => Ok(Self::PermissionUpdate),
            other => Err(PermissionError(other.to_owned())),
        }
    }
}

/// A user's set of capability tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    /// Empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// The set every freshly signed-up user gets.
    #[must_use]
    pub fn signup_default() -> Self {
        Self::from_iter([Permission::User])
    }

    /// Whether the set holds a specific tag.
    #[must_use]
    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    /// Whether the set intersects the required tags.
    ///
    /// An empty `required` slice allows nothing: authorization must name the
    /// capabilities it demands.
    #[must_use]
    pub fn allows_any(&self, required: &[Permission]) -> bool {
        required.iter().any(|p| self.0.contains(p))
    }

    /// Add a tag.
    pub fn insert(&mut self, permission: Permission) {
        self.0.insert(permission);
    }

    /// Iterate tags in stored order.
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    /// Number of tags in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The stored string forms, for persistence as a text array.
    #[must_use]
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|p| p.as_str().to_owned()).collect()
    }

    /// Parse from stored string forms.
    ///
    /// # Errors
    ///
    /// Returns `PermissionError` on an unknown tag.
    pub fn from_strings<S: AsRef<str>>(tags: &[S]) -> Result<Self, PermissionError> {
        tags.iter()
            .map(|s| s.as_ref().parse())
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self)
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
