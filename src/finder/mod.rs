//! File Finders (spec §4.E/§4.F): the two strategies for turning an object
//! identity into a path. Storage (`src/storage.rs`) is generic over this
//! trait so it can be backed by either a `SimpleFileFinder`'s deterministic
//! layout or a `MappedFileFinder`'s index-backed bidirectional mapping.

mod mapped;
mod simple;

pub use mapped::{MappedFileFinder, SetMappingResult};
pub use simple::SimpleFileFinder;

use crate::context::Context;
use crate::error::Result;
use crate::key::{GroupKind, ObjectKey, UnversionedObjectID};

/// The subset of behavior Storage (§4.H) needs from any File Finder.
/// `MappedFileFinder` additionally exposes `ObjectsAt`/`SetMapping`/
/// `DeleteMapping`/`ResetMappings`/`MoveFile`/`ChecksumForPath` as inherent
/// methods, since `SimpleFileFinder` has no reverse path→ID lookup at all
/// (spec §4.E: "does not implement reverse path→ID lookup").
pub trait FileFinder: Send + Sync {
    fn object_path(&self, ctx: &Context, id: &UnversionedObjectID) -> Result<String>;
    fn list_group_kinds(&self, ctx: &Context) -> Result<Vec<GroupKind>>;
    fn list_namespaces(&self, ctx: &Context, gk: &GroupKind) -> Result<Vec<String>>;
    fn list_object_ids(&self, ctx: &Context, gk: &GroupKind, ns: &str) -> Result<Vec<ObjectKey>>;
}
