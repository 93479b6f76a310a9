//! A filesystem-backed, multi-version-aware object index: maps logical
//! object identities (group, kind, namespace, name) to files on disk,
//! reconciles that index with filesystem changes, and emits a stream of
//! object-level change events.
//!
//! The hard engineering concentrates in three coupled pieces: a
//! copy-on-write ordered [`index`] over a compact, prefix-encoded key
//! space; a [`finder::MappedFileFinder`] that uses the index to maintain
//! the bidirectional relation between object identities and file paths;
//! and a [`sync::Synchronizer`] that reconciles on-disk state with the
//! index and produces `CREATE`/`MODIFY`/`DELETE` events.
//!
//! Decoding file bytes into full domain objects, the specific object type
//! registry, version-control integration, and the HTTP/CLI surface above
//! this library are all out of scope — this crate hands back raw bytes
//! plus recognized identities and leaves the rest to the caller.

pub mod context;
pub mod error;
pub mod finder;
pub mod fs;
pub mod index;
pub mod key;
pub mod namespacer;
pub mod policy;
pub mod recognizer;
pub mod registry;
pub mod storage;
pub mod sync;

pub use context::Context;
pub use error::{Error, Result};
pub use key::{ChecksumPath, GroupKind, ObjectKey, UnversionedObjectID};
pub use registry::IndexRegistry;
pub use storage::{ObjectStat, Storage};
