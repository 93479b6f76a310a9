//! `MappedFileFinder` (spec §4.F): the index-backed bidirectional mapping
//! between object identities and arbitrary paths, with checksum tracking
//! and duplicate-across-files detection.
//!
//! Grounded on `prataprc-rdms`'s `Mvcc` usage pattern (acquire, mutate under
//! one lock scope, release) but built on this crate's own `Index`/
//! `IndexRegistry` rather than `Llrb`, since the value/pointer choreography
//! (§3's `id`/`path`/`chk` rows) has no counterpart in `prataprc-rdms`'s flat
//! key-value records.

use std::collections::HashSet;
use std::sync::Arc;

use super::FileFinder;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::index::{
    checksum_key, id_key, id_prefix_gk, id_prefix_gk_ns, parse_id_key, parse_path_pointer_key,
    path_pointer_key, path_prefix, Record,
};
use crate::key::{ChecksumPath, GroupKind, ObjectKey, UnversionedObjectID};
use crate::namespacer::Namespacer;
use crate::registry::IndexRegistry;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetMappingResult {
    pub added: HashSet<UnversionedObjectID>,
    pub duplicates: HashSet<UnversionedObjectID>,
    pub removed: HashSet<UnversionedObjectID>,
}

pub struct MappedFileFinder<N: Namespacer> {
    registry: Arc<IndexRegistry>,
    namespacer: Arc<N>,
}

impl<N: Namespacer> MappedFileFinder<N> {
    pub fn new(registry: Arc<IndexRegistry>, namespacer: Arc<N>) -> Self {
        MappedFileFinder { registry, namespacer }
    }

    fn validate_namespacing(&self, gk: &GroupKind, ns: &str) -> Result<()> {
        let namespaced = self.namespacer.is_namespaced(gk);
        if namespaced != !ns.is_empty() {
            return Err(Error::NamespacedMismatch {
                id: UnversionedObjectID::new(gk.clone(), ObjectKey::new(ns, "")),
                ns: ns.to_string(),
            });
        }
        Ok(())
    }

    /// The current set of IDs mapped to `path`. Empty, not an error, when
    /// nothing is mapped — callers that need `NotTracked` on empty (spec
    /// §4.F's `ObjectsAt`) call `objects_at` instead.
    fn objects_at_raw(idx: &crate::index::Index<Record>, path: &str) -> HashSet<UnversionedObjectID> {
        let mut out = HashSet::new();
        idx.list(&path_prefix(path), |k, _is_value| {
            if let Some(id) = parse_path_pointer_key(k) {
                out.insert(id);
            }
            true
        });
        out
    }

    pub fn object_path(&self, ctx: &Context, id: &UnversionedObjectID) -> Result<String> {
        FileFinder::object_path(self, ctx, id)
    }

    pub fn objects_at(&self, ctx: &Context, path: &str) -> Result<HashSet<UnversionedObjectID>> {
        let guard = self.registry.get(ctx.version_ref())?;
        let idx = guard.read();
        let ids = Self::objects_at_raw(&idx, path);
        if ids.is_empty() {
            return Err(Error::NotTracked(path.to_string()));
        }
        Ok(ids)
    }

    pub fn checksum_for_path(&self, ctx: &Context, path: &str) -> Result<Option<String>> {
        let guard = self.registry.get(ctx.version_ref())?;
        let idx = guard.read();
        Ok(idx.get(&checksum_key(path)).and_then(|r| r.as_checksum().map(str::to_string)))
    }

    /// Every path currently tracked (i.e. carrying a `chk:` entry), used by
    /// the Synchronizer to find mappings whose path disappeared from disk.
    pub fn tracked_paths(&self, ctx: &Context) -> Result<Vec<String>> {
        let guard = self.registry.get(ctx.version_ref())?;
        let idx = guard.read();
        let mut out = vec![];
        idx.list("chk:", |k, is_value| {
            if is_value {
                if let Some(path) = k.strip_prefix("chk:") {
                    out.push(path.to_string());
                }
            }
            true
        });
        Ok(out)
    }

    /// Atomically sets the exact ID set mapped to `cp.path`, per the set
    /// algebra of spec §4.F: `added = newIDs \ old`, `removed = old \
    /// newIDs`; an `added` ID already mapped elsewhere moves into
    /// `duplicates` instead of displacing the existing mapping.
    pub fn set_mapping(
        &self,
        ctx: &Context,
        cp: &ChecksumPath,
        new_ids: &HashSet<UnversionedObjectID>,
    ) -> Result<SetMappingResult> {
        let guard = self.registry.get(ctx.version_ref())?;
        let mut idx = guard.write();
        Ok(Self::set_mapping_locked(&mut idx, cp, new_ids))
    }

    fn set_mapping_locked(
        idx: &mut crate::index::Index<Record>,
        cp: &ChecksumPath,
        new_ids: &HashSet<UnversionedObjectID>,
    ) -> SetMappingResult {
        let old = Self::objects_at_raw(idx, &cp.path);

        let mut added = HashSet::new();
        let mut duplicates = HashSet::new();
        for id in new_ids.difference(&old) {
            if idx.get(&id_key(id)).is_some() {
                duplicates.insert(id.clone());
            } else {
                added.insert(id.clone());
            }
        }
        let removed: HashSet<UnversionedObjectID> = old.difference(new_ids).cloned().collect();

        for id in &added {
            idx.put(Record::Id { id: id.clone(), path: cp.path.clone() });
        }
        for id in &removed {
            idx.delete(&id_key(id));
        }
        if new_ids.is_empty() {
            idx.delete(&checksum_key(&cp.path));
        } else {
            idx.put(Record::Checksum { path: cp.path.clone(), checksum: cp.checksum.clone() });
        }

        SetMappingResult { added, duplicates, removed }
    }

    /// Equivalent to `set_mapping((path, ""), ∅)` (spec §4.F).
    pub fn delete_mapping(&self, ctx: &Context, path: &str) -> Result<HashSet<UnversionedObjectID>> {
        let result = self.set_mapping(ctx, &ChecksumPath::new("", path), &HashSet::new())?;
        Ok(result.removed)
    }

    /// Clears the entire version-ref's index, then applies each mapping in
    /// turn; returns every ID rejected as a duplicate across the whole
    /// batch.
    pub fn reset_mappings(
        &self,
        ctx: &Context,
        mappings: &[(ChecksumPath, HashSet<UnversionedObjectID>)],
    ) -> Result<HashSet<UnversionedObjectID>> {
        let guard = self.registry.get(ctx.version_ref())?;
        let mut idx = guard.write();
        *idx = crate::index::Index::new();
        let mut duplicates = HashSet::new();
        for (cp, ids) in mappings {
            let result = Self::set_mapping_locked(&mut idx, cp, ids);
            duplicates.extend(result.duplicates);
        }
        Ok(duplicates)
    }

    /// Re-points all IDs and the checksum entry from `old` to `new`,
    /// overwriting any checksum already at `new` (spec §9's resolution of
    /// the source's under-specified move semantics). Returns whether a
    /// mapping existed at `old`.
    pub fn move_file(&self, ctx: &Context, old: &str, new: &str) -> Result<bool> {
        let guard = self.registry.get(ctx.version_ref())?;
        let mut idx = guard.write();
        let ids = Self::objects_at_raw(&idx, old);
        let checksum = idx.get(&checksum_key(old)).and_then(|r| r.as_checksum().map(str::to_string));
        if ids.is_empty() && checksum.is_none() {
            return Ok(false);
        }
        for id in &ids {
            idx.delete(&id_key(id));
        }
        idx.delete(&checksum_key(old));
        for id in &ids {
            idx.put(Record::Id { id: id.clone(), path: new.to_string() });
        }
        if let Some(checksum) = checksum {
            idx.put(Record::Checksum { path: new.to_string(), checksum });
        }
        Ok(true)
    }
}

impl<N: Namespacer> FileFinder for MappedFileFinder<N> {
    fn object_path(&self, ctx: &Context, id: &UnversionedObjectID) -> Result<String> {
        let guard = self.registry.get(ctx.version_ref())?;
        let idx = guard.read();
        idx.get(&id_key(id))
            .and_then(|r| r.as_id().map(|(_, path)| path.to_string()))
            .ok_or_else(|| Error::NotTracked(id.to_string()))
    }

    fn list_group_kinds(&self, ctx: &Context) -> Result<Vec<GroupKind>> {
        let guard = self.registry.get(ctx.version_ref())?;
        let idx = guard.read();
        let mut out = vec![];
        let prefix = "id:";
        let mut pivot: Option<String> = None;
        loop {
            let next_key = match &pivot {
                None => idx.find(prefix).map(|(k, _)| k),
                Some(p) => {
                    let mut found = None;
                    idx.list_pivot(prefix, p, |k, is_value| {
                        if is_value {
                            found = Some(k.to_string());
                        }
                        false
                    });
                    found
                }
            };
            let Some(key) = next_key else { break };
            let Some(id) = parse_id_key(&key) else { break };
            let gk_part = format!("{}/{}", id.gk.storage_group(), id.gk.kind);
            out.push(id.gk.clone());
            pivot = Some(format!("{gk_part}:"));
        }
        Ok(out)
    }

    fn list_namespaces(&self, ctx: &Context, gk: &GroupKind) -> Result<Vec<String>> {
        let guard = self.registry.get(ctx.version_ref())?;
        let idx = guard.read();
        let prefix = id_prefix_gk(gk);
        let mut out = vec![];
        let mut pivot: Option<String> = None;
        loop {
            let next_key = match &pivot {
                None => idx.find(&prefix).map(|(k, _)| k),
                Some(p) => {
                    let mut found = None;
                    idx.list_pivot(&prefix, p, |k, is_value| {
                        if is_value {
                            found = Some(k.to_string());
                        }
                        false
                    });
                    found
                }
            };
            let Some(key) = next_key else { break };
            let Some(id) = parse_id_key(&key) else { break };
            out.push(id.key.namespace.clone());
            pivot = Some(format!("{}:", id.key.namespace));
        }
        Ok(out)
    }

    fn list_object_ids(&self, ctx: &Context, gk: &GroupKind, ns: &str) -> Result<Vec<ObjectKey>> {
        self.validate_namespacing(gk, ns)?;
        let guard = self.registry.get(ctx.version_ref())?;
        let idx = guard.read();
        let prefix = id_prefix_gk_ns(gk, ns);
        let mut out = vec![];
        idx.list(&prefix, |k, is_value| {
            if is_value {
                if let Some(id) = parse_id_key(k) {
                    out.push(id.key);
                }
            }
            true
        });
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespacer::StaticNamespacer;
    use proptest::prelude::*;

    fn finder() -> MappedFileFinder<StaticNamespacer> {
        let registry = Arc::new(IndexRegistry::new());
        registry.register("v1", None).unwrap();
        MappedFileFinder::new(registry, Arc::new(StaticNamespacer::new()))
    }

    fn id(ns: &str, name: &str) -> UnversionedObjectID {
        UnversionedObjectID::new(GroupKind::new("", "Car"), ObjectKey::new(ns, name))
    }

    #[test]
    fn set_mapping_creates_bijection() {
        let f = finder();
        let ctx = Context::new("v1");
        let ids: HashSet<_> = [id("default", "a"), id("default", "b")].into_iter().collect();
        let result = f.set_mapping(&ctx, &ChecksumPath::new("c1", "cars.yaml"), &ids).unwrap();
        assert_eq!(result.added, ids);
        assert!(result.duplicates.is_empty());
        assert!(result.removed.is_empty());

        assert_eq!(f.objects_at(&ctx, "cars.yaml").unwrap(), ids);
        assert_eq!(f.object_path(&ctx, &id("default", "a")).unwrap(), "cars.yaml");
        assert_eq!(f.checksum_for_path(&ctx, "cars.yaml").unwrap(), Some("c1".to_string()));
    }

    #[test]
    fn set_mapping_rejects_duplicate_from_other_path() {
        let f = finder();
        let ctx = Context::new("v1");
        let a: HashSet<_> = [id("default", "a")].into_iter().collect();
        f.set_mapping(&ctx, &ChecksumPath::new("c1", "cars.yaml"), &a).unwrap();

        let result = f.set_mapping(&ctx, &ChecksumPath::new("c2", "other.yaml"), &a).unwrap();
        assert!(result.added.is_empty());
        assert_eq!(result.duplicates, a);
        assert_eq!(f.object_path(&ctx, &id("default", "a")).unwrap(), "cars.yaml");
    }

    #[test]
    fn set_mapping_twice_is_idempotent() {
        let f = finder();
        let ctx = Context::new("v1");
        let ids: HashSet<_> = [id("default", "a")].into_iter().collect();
        f.set_mapping(&ctx, &ChecksumPath::new("c1", "cars.yaml"), &ids).unwrap();
        let result = f.set_mapping(&ctx, &ChecksumPath::new("c1", "cars.yaml"), &ids).unwrap();
        assert!(result.added.is_empty());
        assert!(result.duplicates.is_empty());
        assert!(result.removed.is_empty());
    }

    #[test]
    fn move_file_repoints_ids_and_checksum() {
        let f = finder();
        let ctx = Context::new("v1");
        let ids: HashSet<_> = [id("default", "a"), id("default", "b")].into_iter().collect();
        f.set_mapping(&ctx, &ChecksumPath::new("c1", "cars.yaml"), &ids).unwrap();

        let moved = f.move_file(&ctx, "cars.yaml", "moved.yaml").unwrap();
        assert!(moved);
        assert_eq!(f.object_path(&ctx, &id("default", "a")).unwrap(), "moved.yaml");
        assert_eq!(f.object_path(&ctx, &id("default", "b")).unwrap(), "moved.yaml");
        assert!(f.checksum_for_path(&ctx, "cars.yaml").unwrap().is_none());
        assert_eq!(f.checksum_for_path(&ctx, "moved.yaml").unwrap(), Some("c1".to_string()));
    }

    #[test]
    fn move_file_returns_false_when_nothing_was_mapped() {
        let f = finder();
        let ctx = Context::new("v1");
        assert!(!f.move_file(&ctx, "nope.yaml", "elsewhere.yaml").unwrap());
    }

    #[test]
    fn delete_mapping_removes_and_reports_ids() {
        let f = finder();
        let ctx = Context::new("v1");
        let ids: HashSet<_> = [id("default", "a")].into_iter().collect();
        f.set_mapping(&ctx, &ChecksumPath::new("c1", "cars.yaml"), &ids).unwrap();
        let removed = f.delete_mapping(&ctx, "cars.yaml").unwrap();
        assert_eq!(removed, ids);
        assert!(matches!(f.object_path(&ctx, &id("default", "a")), Err(Error::NotTracked(_))));
    }

    #[test]
    fn reset_mappings_clears_then_applies_in_order() {
        let f = finder();
        let ctx = Context::new("v1");
        let seed: HashSet<_> = [id("default", "stale")].into_iter().collect();
        f.set_mapping(&ctx, &ChecksumPath::new("c0", "stale.yaml"), &seed).unwrap();

        let batch = vec![
            (ChecksumPath::new("c1", "cars.yaml"), [id("default", "a")].into_iter().collect()),
            (ChecksumPath::new("c2", "other.yaml"), [id("default", "a")].into_iter().collect()),
        ];
        let duplicates = f.reset_mappings(&ctx, &batch).unwrap();
        assert_eq!(duplicates, [id("default", "a")].into_iter().collect::<HashSet<_>>());
        assert!(matches!(f.object_path(&ctx, &id("default", "stale")), Err(Error::NotTracked(_))));
        assert_eq!(f.object_path(&ctx, &id("default", "a")).unwrap(), "cars.yaml");
    }

    #[test]
    fn list_namespaces_skips_duplicate_buckets() {
        let f = finder();
        let ctx = Context::new("v1");
        let ids: HashSet<_> =
            [id("default", "a"), id("default", "b"), id("prod", "c")].into_iter().collect();
        f.set_mapping(&ctx, &ChecksumPath::new("c1", "cars.yaml"), &ids).unwrap();
        let namespaces = f.list_namespaces(&ctx, &GroupKind::new("", "Car")).unwrap();
        assert_eq!(namespaces, vec!["default".to_string(), "prod".to_string()]);
    }

    #[test]
    fn set_mapping_result_compares_whole_struct() {
        let f = finder();
        let ctx = Context::new("v1");
        let ids: HashSet<_> = [id("default", "a")].into_iter().collect();
        let result = f.set_mapping(&ctx, &ChecksumPath::new("c1", "cars.yaml"), &ids).unwrap();
        pretty_assertions::assert_eq!(
            result,
            SetMappingResult { added: ids, duplicates: HashSet::new(), removed: HashSet::new() }
        );
    }

    proptest::proptest! {
        /// P1 (bijection-per-path): after `SetMapping((p,c), S)`, `ObjectsAt(p) == S`,
        /// every id in `S` resolves back to `p`, and `ChecksumForPath(p) == c`.
        #[test]
        fn prop_set_mapping_is_a_bijection(names in proptest::collection::hash_set("[a-z]{1,8}", 0..6)) {
            let f = finder();
            let ctx = Context::new("v1");
            let ids: HashSet<_> = names.iter().map(|n| id("default", n)).collect();
            f.set_mapping(&ctx, &ChecksumPath::new("c1", "cars.yaml"), &ids).unwrap();

            prop_assert_eq!(f.objects_at(&ctx, "cars.yaml").unwrap(), ids.clone());
            for oid in &ids {
                prop_assert_eq!(f.object_path(&ctx, oid).unwrap(), "cars.yaml");
            }
            if ids.is_empty() {
                prop_assert_eq!(f.checksum_for_path(&ctx, "cars.yaml").unwrap(), None);
            } else {
                prop_assert_eq!(f.checksum_for_path(&ctx, "cars.yaml").unwrap(), Some("c1".to_string()));
            }
        }

        /// P2 (disjointness): `added`/`duplicates`/`removed` are pairwise disjoint,
        /// `added ⊆ newIDs`, `removed ⊆ oldIDs`, and `added ∪ duplicates == newIDs \ oldIDs`.
        #[test]
        fn prop_set_mapping_result_is_disjoint(
            old_names in proptest::collection::hash_set("[a-z]{1,8}", 0..6),
            new_names in proptest::collection::hash_set("[a-z]{1,8}", 0..6),
        ) {
            let f = finder();
            let ctx = Context::new("v1");
            let old_ids: HashSet<_> = old_names.iter().map(|n| id("default", n)).collect();
            let new_ids: HashSet<_> = new_names.iter().map(|n| id("default", n)).collect();
            f.set_mapping(&ctx, &ChecksumPath::new("c1", "cars.yaml"), &old_ids).unwrap();
            let result = f.set_mapping(&ctx, &ChecksumPath::new("c2", "cars.yaml"), &new_ids).unwrap();

            prop_assert!(result.added.is_disjoint(&result.duplicates));
            prop_assert!(result.added.is_disjoint(&result.removed));
            prop_assert!(result.duplicates.is_disjoint(&result.removed));
            prop_assert!(result.added.is_subset(&new_ids));
            prop_assert!(result.removed.is_subset(&old_ids));
            let new_minus_old: HashSet<_> = new_ids.difference(&old_ids).cloned().collect();
            let added_union_duplicates: HashSet<_> =
                result.added.union(&result.duplicates).cloned().collect();
            prop_assert_eq!(added_union_duplicates, new_minus_old);
        }

        /// P3 (idempotence): calling `SetMapping` twice with the same inputs after the
        /// first returns empty `added`/`duplicates`/`removed`.
        #[test]
        fn prop_set_mapping_twice_is_idempotent(names in proptest::collection::hash_set("[a-z]{1,8}", 0..6)) {
            let f = finder();
            let ctx = Context::new("v1");
            let ids: HashSet<_> = names.iter().map(|n| id("default", n)).collect();
            f.set_mapping(&ctx, &ChecksumPath::new("c1", "cars.yaml"), &ids).unwrap();
            let result = f.set_mapping(&ctx, &ChecksumPath::new("c1", "cars.yaml"), &ids).unwrap();
            prop_assert!(result.added.is_empty());
            prop_assert!(result.duplicates.is_empty());
            prop_assert!(result.removed.is_empty());
        }
    }
}
