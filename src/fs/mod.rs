//! The Filesystem Abstraction (spec §4.C): a minimal, pluggable interface
//! over a rooted tree, carrying the active version reference on the
//! `Context` that flows through every call.
//!
//! `prataprc-rdms` touches real files only incidentally (`src/util.rs`'s
//! `open_file_r`/`open_file_w`, used by its write-ahead log); there's no
//! portable trait to adapt. This is grounded instead on the gitops-store
//! example (`AlexGrek-critical/backend/gitops_lib/src/store/mod.rs`), which
//! has exactly this seam (`GenericDatabaseProvider` + a
//! `FilesystemDatabaseProvider`) — generalized here from one resource type
//! to an arbitrary rooted tree, and kept synchronous (no `tokio::fs`) to
//! match the rest of this crate's non-async concurrency model.

mod mem;
mod os;

pub use mem::MemFilesystem;
pub use os::OsFilesystem;

use std::time::SystemTime;

use crate::context::Context;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
}

#[derive(Debug, Clone)]
pub struct FileInfo {
    pub kind: FileKind,
    pub len: u64,
    pub modified: SystemTime,
}

#[derive(Debug, Clone)]
pub struct DirEntry {
    /// Path relative to the filesystem root, `/`-separated.
    pub path: String,
    pub kind: FileKind,
}

/// A rooted tree of files, addressed by `/`-separated paths relative to the
/// root. Absolute paths are forbidden in the Index (spec §6) — callers are
/// expected to pass only relative paths here too.
pub trait Filesystem: Send + Sync {
    fn stat(&self, ctx: &Context, path: &str) -> Result<Option<FileInfo>>;
    fn read_file(&self, ctx: &Context, path: &str) -> Result<Option<Vec<u8>>>;
    fn write_file(&self, ctx: &Context, path: &str, contents: &[u8]) -> Result<()>;
    fn read_dir(&self, ctx: &Context, path: &str) -> Result<Option<Vec<DirEntry>>>;
    fn mkdir_all(&self, ctx: &Context, path: &str) -> Result<()>;
    fn remove(&self, ctx: &Context, path: &str) -> Result<()>;

    /// A checksum for `path`'s current content. Default: decimal nanosecond
    /// mtime (a monotone proxy, not a content hash — spec §4.C explicitly
    /// allows either). Backends that have a cheaper or stronger checksum
    /// (content hash, VCS blob/commit id) should override this.
    fn checksum(&self, ctx: &Context, path: &str) -> Result<Option<String>> {
        Ok(self
            .stat(ctx, path)?
            .map(|info| match info.modified.duration_since(SystemTime::UNIX_EPOCH) {
                Ok(d) => d.as_nanos().to_string(),
                Err(_) => "0".to_string(),
            }))
    }
}

pub(crate) fn parent_of(path: &str) -> Option<&str> {
    path.rfind('/').map(|idx| &path[..idx])
}
