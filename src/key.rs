//! Identity types for the object store: [`GroupKind`], [`ObjectKey`],
//! [`UnversionedObjectID`] and [`ChecksumPath`] (spec §3).

use std::fmt;

/// Canonical group used for objects whose API group is empty.
pub const CORE_GROUP: &str = "core";

/// A `(group, kind)` pair. String-compared; an empty `group` is canonicalized
/// to [`CORE_GROUP`] wherever it is turned into a storage path or index key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct GroupKind {
    pub group: String,
    pub kind: String,
}

impl GroupKind {
    pub fn new(group: impl Into<String>, kind: impl Into<String>) -> Self {
        GroupKind { group: group.into(), kind: kind.into() }
    }

    /// `group`, or [`CORE_GROUP`] if empty. Used by every on-disk path and
    /// index key that mentions the group.
    pub fn storage_group(&self) -> &str {
        if self.group.is_empty() { CORE_GROUP } else { &self.group }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.storage_group(), self.kind)
    }
}

/// A `(namespace, name)` pair. `namespace == ""` denotes cluster-scoped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        ObjectKey { namespace: namespace.into(), name: name.into() }
    }

    pub fn cluster_scoped(name: impl Into<String>) -> Self {
        ObjectKey { namespace: String::new(), name: name.into() }
    }

    pub fn is_namespaced(&self) -> bool {
        !self.namespace.is_empty()
    }
}

/// The primary key of the store: `(GroupKind, ObjectKey)`. Versions/
/// APIVersion are deliberately not part of identity (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct UnversionedObjectID {
    pub gk: GroupKind,
    pub key: ObjectKey,
}

impl UnversionedObjectID {
    pub fn new(gk: GroupKind, key: ObjectKey) -> Self {
        UnversionedObjectID { gk, key }
    }

    pub fn namespace(&self) -> &str {
        &self.key.namespace
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }
}

impl fmt::Display for UnversionedObjectID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.gk, self.key.namespace, self.key.name)
    }
}

/// `(checksum, path)`. `checksum` is opaque; it must be a pure function of
/// file content (or a monotone proxy such as modification time).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumPath {
    pub checksum: String,
    pub path: String,
}

impl ChecksumPath {
    pub fn new(checksum: impl Into<String>, path: impl Into<String>) -> Self {
        ChecksumPath { checksum: checksum.into(), path: path.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_group_canonicalizes_to_core() {
        let gk = GroupKind::new("", "Car");
        assert_eq!(gk.storage_group(), CORE_GROUP);
        assert_eq!(gk.to_string(), "core/Car");
    }

    #[test]
    fn cluster_scoped_key_has_empty_namespace() {
        let key = ObjectKey::cluster_scoped("widgets");
        assert!(!key.is_namespaced());
    }
}
