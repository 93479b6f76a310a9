//! The Versioned Index Registry (spec §4.B): a family of [`Index`]es keyed
//! by version reference, with cheap copy-on-write forking.
//!
//! `prataprc-rdms` has no equivalent of its own — each `Mvcc`/`Llrb`
//! instance in that crate *is* a single index, and managing a family of
//! named ones is left to the caller. The concurrent map here is grounded on
//! `AlrikOlson-codescope`'s use of `dashmap` for its own in-memory indices
//! (`server/Cargo.toml`): independent version references should not
//! contend on a registry-wide lock (invariant I5), only `dashmap`'s
//! per-shard locking.

use dashmap::DashMap;

use crate::error::{Error, Result};
use crate::index::{Index, Record};

/// An `Index<Record>` guarded for concurrent single-operation access. The
/// `parking_lot::RwLock` here plays the role of `prataprc-rdms`'s
/// hand-rolled `RWSpinlock` (`src/spinlock.rs`): held for the duration of
/// one whole Mapped File Finder operation (spec §5), released between
/// operations.
pub(crate) type GuardedIndex = parking_lot::RwLock<Index<Record>>;

/// Maps version-reference strings to independent `Index`es.
#[derive(Default)]
pub struct IndexRegistry {
    indexes: DashMap<String, std::sync::Arc<GuardedIndex>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new `Index` for `head`. If `base` is `Some`, the new index
    /// starts as a structural clone of `base`'s current contents
    /// (copy-on-write fork — cheap, and later mutations under `head` never
    /// affect `base`, satisfying invariant I5). If `base` is empty, `head`
    /// starts empty.
    ///
    /// Fails with `VersionRefAlreadyExists` if `head` is already
    /// registered.
    pub fn register(&self, head: &str, base: Option<&str>) -> Result<()> {
        if self.indexes.contains_key(head) {
            return Err(Error::VersionRefAlreadyExists(head.to_string()));
        }
        let index = match base {
            Some(base_ref) => {
                let base_index = self.get(base_ref)?;
                let guard = base_index.read();
                guard.clone()
            }
            None => Index::new(),
        };
        self.indexes.insert(head.to_string(), std::sync::Arc::new(parking_lot::RwLock::new(index)));
        Ok(())
    }

    /// Idempotent: dropping an unregistered `head` is not an error. Nodes
    /// shared with forks are reclaimed by `Arc` refcounting, not an
    /// explicit free-list (cf. spec §4.A's "shared free-list of nodes" —
    /// Rust's allocator plays that role here).
    pub fn delete(&self, head: &str) {
        self.indexes.remove(head);
    }

    pub(crate) fn get(&self, head: &str) -> Result<std::sync::Arc<GuardedIndex>> {
        self.indexes
            .get(head)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::VersionRefNotFound(head.to_string()))
    }

    pub fn contains(&self, head: &str) -> bool {
        self.indexes.contains_key(head)
    }
}
