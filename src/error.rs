//! Error kinds surfaced at every boundary named in spec §6/§7.
//!
//! These are *kinds*, not a taxonomy of Rust types: `prataprc-rdms` gets
//! away with a single flat `BognError` enum (`src/error.rs`); this crate
//! does the same, but derives `Display`/`std::error::Error` with `thiserror`
//! instead of hand-rolling them, and carries structured payloads where the
//! spec calls for them (e.g. the offending path on `NamespacedMismatch`).

use thiserror::Error;

use crate::key::UnversionedObjectID;

#[derive(Debug, Error)]
pub enum Error {
    /// Storage-level: no file backs this object ID.
    #[error("object not found: {0}")]
    NotFound(UnversionedObjectID),

    /// Mapping-level: the File Finder has no mapping for this ID/path.
    #[error("not tracked: {0}")]
    NotTracked(String),

    /// `gk.namespaced` and `id.namespace != ""` disagree (I4/P6).
    #[error("namespaced mismatch for {id}: namespace={ns:?}")]
    NamespacedMismatch { id: UnversionedObjectID, ns: String },

    #[error("version reference not found: {0}")]
    VersionRefNotFound(String),

    #[error("version reference already exists: {0}")]
    VersionRefAlreadyExists(String),

    #[error("cannot determine content type for path: {0}")]
    CannotDetermineContentType(String),

    #[error("unrecognized content type: {0:?}")]
    UnrecognizedContentType(crate::policy::ContentType),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Malformed recognition results: missing group/version, kind, or name;
    /// or a scheme that rejects the kind (§4.G). Logged and skipped during
    /// `Sync` (§7, *Data* family); surfaced directly from point operations.
    #[error("failed to recognize object in {path}: {reason}")]
    Decode { path: String, reason: String },

    /// Surfaced verbatim from the Filesystem abstraction (§7, *I/O* family).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
