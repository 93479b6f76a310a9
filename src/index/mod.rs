//! The Ordered Index (spec §4.A): a finite ordered map supporting equality,
//! prefix, and "pivot" (skip-duplicate-bucket) queries over a compact,
//! prefix-tagged string key space, plus the generic value/pointer
//! choreography that keeps secondary indexes in sync (I1-I3).
//!
//! Grounded on `prataprc-rdms`'s `Llrb`/`Mvcc` (see `src/index/tree.rs`) for
//! the copy-on-write tree; this module is the part that understands value
//! entries vs. pointer entries and "Put must delete what it orphans".

mod record;
mod tree;

pub use record::{
    checksum_key, id_key, id_prefix_gk, id_prefix_gk_ns, parse_id_key, parse_path_pointer_key,
    path_pointer_key, path_prefix, Keyed, Record,
};
pub use tree::increment_last_byte;

use std::ops::Bound;

use tree::Tree;

/// What's stored at one key: either the payload itself, or a back-reference
/// marker whose target is recoverable from the key (the `path:` rows of
/// spec §3 embed their target `id:` key verbatim, so the marker itself
/// carries no data — see `record::parse_path_pointer_key`).
#[derive(Clone)]
enum Slot<R> {
    Value(R),
    Pointer,
}

/// A copy-on-write ordered index over `R`'s value entries and their
/// derived pointer entries.
#[derive(Clone)]
pub struct Index<R: Keyed> {
    tree: Tree<Slot<R>>,
}

impl<R: Keyed> Default for Index<R> {
    fn default() -> Self {
        Index { tree: Tree::new() }
    }
}

impl<R: Keyed> Index<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Equality query: the unique value entry at `key`, if any.
    pub fn get(&self, key: &str) -> Option<R> {
        match self.tree.get(key) {
            Some(Slot::Value(r)) => Some(r),
            _ => None,
        }
    }

    pub fn contains_pointer(&self, key: &str) -> bool {
        matches!(self.tree.get(key), Some(Slot::Pointer))
    }

    /// Prefix query: the smallest entry whose key has `prefix` as a prefix.
    pub fn find(&self, prefix: &str) -> Option<(String, bool)> {
        let upper = increment_last_byte(prefix);
        let hi = if upper == prefix { Bound::Unbounded } else { Bound::Excluded(upper.as_str()) };
        let mut found = None;
        self.tree.range(Bound::Included(prefix), hi, |k, slot| {
            found = Some((k.to_string(), matches!(slot, Slot::Value(_))));
            false
        });
        found
    }

    /// Iterate entries with `prefix`, ascending, until `f` returns `false`.
    /// `f` receives the key and whether the slot is a value entry (`true`)
    /// or a pointer entry (`false`).
    pub fn list<F>(&self, prefix: &str, mut f: F)
    where
        F: FnMut(&str, bool) -> bool,
    {
        let upper = increment_last_byte(prefix);
        let hi = if upper == prefix { Bound::Unbounded } else { Bound::Excluded(upper.as_str()) };
        self.tree.range(Bound::Included(prefix), hi, |k, slot| f(k, matches!(slot, Slot::Value(_))));
    }

    /// Pivot query (spec §4.A): iterate entries with `prefix`, ascending,
    /// skipping the entire contiguous sub-range whose keys start with
    /// `prefix` + `pivot`. `pivot` must be nonempty.
    ///
    /// Implemented as two bounded range scans around the excluded bucket,
    /// so the skipped bucket is never descended into — the index gets
    /// O(log n + distinct-buckets) enumeration instead of O(n), which is
    /// the entire point of the pivot (spec calls this "jump over a bucket
    /// of duplicates").
    pub fn list_pivot<F>(&self, prefix: &str, pivot: &str, mut f: F)
    where
        F: FnMut(&str, bool) -> bool,
    {
        assert!(!pivot.is_empty(), "pivot must be nonempty (spec §4.A)");
        let prefix_upper = increment_last_byte(prefix);
        let prefix_hi =
            if prefix_upper == prefix { Bound::Unbounded } else { Bound::Excluded(prefix_upper.as_str()) };

        let exclude_lo = format!("{prefix}{pivot}");
        let exclude_hi = increment_last_byte(&exclude_lo);

        let mut keep_going = true;
        self.tree.range(Bound::Included(prefix), Bound::Excluded(exclude_lo.as_str()), |k, slot| {
            keep_going = f(k, matches!(slot, Slot::Value(_)));
            keep_going
        });
        if !keep_going {
            return;
        }
        self.tree.range(Bound::Included(exclude_hi.as_str()), prefix_hi, |k, slot| {
            f(k, matches!(slot, Slot::Value(_)))
        });
    }

    /// Atomically insert `record`'s value entry and all of its pointer
    /// entries. If another value entry already lived at `record`'s primary
    /// key, its now-orphaned pointers are deleted first. Returns the
    /// previous value entry, if any.
    pub fn put(&mut self, record: R) -> Option<R> {
        let key = record.primary_key();
        let previous = self.tree.get(&key).and_then(|s| match s {
            Slot::Value(r) => Some(r),
            Slot::Pointer => None,
        });
        if let Some(old) = &previous {
            for pk in old.pointer_keys() {
                self.tree = self.tree.remove(&pk);
            }
        }
        self.tree = self.tree.insert(&key, Slot::Value(record.clone()));
        for pk in record.pointer_keys() {
            self.tree = self.tree.insert(&pk, Slot::Pointer);
        }
        previous
    }

    /// Remove the value entry at `key` and every pointer entry it owns.
    /// Returns the removed value entry, if any.
    pub fn delete(&mut self, key: &str) -> Option<R> {
        let removed = self.tree.get(key).and_then(|s| match s {
            Slot::Value(r) => Some(r),
            Slot::Pointer => None,
        });
        if let Some(r) = &removed {
            self.tree = self.tree.remove(key);
            for pk in r.pointer_keys() {
                self.tree = self.tree.remove(&pk);
            }
        }
        removed
    }

    /// Remove a bare pointer entry (used when a value entry without any
    /// pointer-owning semantics still needs cleanup, e.g. stale `path:`
    /// pointers left over from a schema migration). Not used on the happy
    /// path — `delete`/`put` keep pointers consistent on their own.
    #[cfg(test)]
    pub(crate) fn remove_raw(&mut self, key: &str) {
        self.tree = self.tree.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{GroupKind, ObjectKey, UnversionedObjectID};
    use proptest::prelude::*;

    fn oid(ns: &str, name: &str) -> UnversionedObjectID {
        UnversionedObjectID::new(GroupKind::new("", "Car"), ObjectKey::new(ns, name))
    }

    #[test]
    fn put_creates_value_and_pointer_atomically() {
        let mut idx: Index<Record> = Index::new();
        let id = oid("default", "red");
        idx.put(Record::Id { id: id.clone(), path: "a.yaml".into() });

        assert_eq!(idx.get(&id_key(&id)), Some(Record::Id { id: id.clone(), path: "a.yaml".into() }));
        assert!(idx.contains_pointer(&path_pointer_key("a.yaml", &id)));
    }

    #[test]
    fn put_overwrite_deletes_orphaned_pointer() {
        let mut idx: Index<Record> = Index::new();
        let id = oid("default", "red");
        idx.put(Record::Id { id: id.clone(), path: "a.yaml".into() });
        idx.put(Record::Id { id: id.clone(), path: "b.yaml".into() });

        assert!(!idx.contains_pointer(&path_pointer_key("a.yaml", &id)));
        assert!(idx.contains_pointer(&path_pointer_key("b.yaml", &id)));
        assert_eq!(idx.get(&id_key(&id)).unwrap().as_id().unwrap().1, "b.yaml");
    }

    #[test]
    fn delete_removes_value_and_pointer() {
        let mut idx: Index<Record> = Index::new();
        let id = oid("default", "red");
        idx.put(Record::Id { id: id.clone(), path: "a.yaml".into() });
        let removed = idx.delete(&id_key(&id));
        assert!(removed.is_some());
        assert_eq!(idx.get(&id_key(&id)), None);
        assert!(!idx.contains_pointer(&path_pointer_key("a.yaml", &id)));
    }

    #[test]
    fn list_pivot_skips_one_namespace_bucket() {
        let mut idx: Index<Record> = Index::new();
        for (ns, name) in [("default", "a"), ("default", "b"), ("prod", "c"), ("staging", "d")] {
            idx.put(Record::Id { id: oid(ns, name), path: format!("{ns}/{name}.yaml") });
        }
        let prefix = id_prefix_gk(&GroupKind::new("", "Car"));
        let mut namespaces = vec![];
        let mut pivot: Option<String> = None;
        loop {
            let next = match &pivot {
                None => idx.find(&prefix),
                Some(p) => {
                    let mut found = None;
                    idx.list_pivot(&prefix, p, |k, is_value| {
                        if is_value {
                            found = Some(k.to_string());
                        }
                        false
                    });
                    found.map(|k| (k, true))
                }
            };
            match next {
                Some((key, true)) => {
                    let id = parse_id_key(&key).unwrap();
                    namespaces.push(id.key.namespace.clone());
                    pivot = Some(format!("{}:", id.key.namespace));
                }
                _ => break,
            }
        }
        assert_eq!(namespaces, vec!["default", "prod", "staging"]);
    }

    proptest::proptest! {
        /// P7 (prefix/pivot ordering): `list(prefix)` yields ascending, duplicate-free
        /// keys, and `list_pivot(prefix, pivot)` never yields a key under `prefix+pivot`.
        #[test]
        fn prop_list_is_sorted_and_pivot_excludes_bucket(
            names in proptest::collection::hash_set("[a-z]{1,6}", 0..10),
            pivot_name in "[a-z]{1,6}",
        ) {
            let mut idx: Index<Record> = Index::new();
            for name in &names {
                idx.put(Record::Id { id: oid("default", name), path: format!("{name}.yaml") });
            }
            let prefix = id_prefix_gk(&GroupKind::new("", "Car"));

            let mut seen = vec![];
            idx.list(&prefix, |k, is_value| {
                if is_value {
                    seen.push(k.to_string());
                }
                true
            });
            let mut sorted = seen.clone();
            sorted.sort();
            prop_assert_eq!(&seen, &sorted);
            let unique: std::collections::HashSet<_> = seen.iter().cloned().collect();
            prop_assert_eq!(unique.len(), seen.len());

            let excluded_bucket = format!("{prefix}{pivot_name}:");
            let mut pivoted = vec![];
            idx.list_pivot(&prefix, &format!("{pivot_name}:"), |k, is_value| {
                if is_value {
                    pivoted.push(k.to_string());
                }
                true
            });
            for k in &pivoted {
                prop_assert!(!k.starts_with(&excluded_bucket));
            }
        }
    }
}
