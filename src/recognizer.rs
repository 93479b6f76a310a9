//! Object Recognizer (spec §4.G): extracts identities from a file's bytes
//! without materializing full objects, iterating multi-document frames.
//!
//! Decoding YAML/JSON frames themselves is out of scope (spec §1 names the
//! byte-format reader as an external collaborator); this module only reads
//! the handful of metadata fields it needs via `serde_yaml`/`serde_json`,
//! grounded on `WarriorsSami-bit`'s metadata-only extraction pass
//! (`metadata/src/lib.rs`, which likewise deserializes into a small struct
//! rather than the full domain type).

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::key::{GroupKind, ObjectKey, UnversionedObjectID};
use crate::policy::ContentType;

#[derive(Debug, Deserialize, Default)]
struct RawMeta {
    #[serde(default)]
    group: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    kind: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    name: String,
}

/// Tells the Recognizer whether a `(group, kind)` is a known object type.
/// The registry of actual types is an external collaborator (spec §1); this
/// crate only defines the seam a caller plugs a registry into.
pub trait ObjectScheme: Send + Sync {
    fn is_known(&self, gk: &GroupKind) -> bool;
}

/// Accepts every `(group, kind)` — used when `allow_unrecognized` makes the
/// scheme irrelevant, and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissiveScheme;

impl ObjectScheme for PermissiveScheme {
    fn is_known(&self, _gk: &GroupKind) -> bool {
        true
    }
}

pub struct Recognizer<S: ObjectScheme> {
    scheme: S,
    allow_unrecognized: bool,
    allow_duplicates: bool,
}

impl<S: ObjectScheme> Recognizer<S> {
    pub fn new(scheme: S) -> Self {
        Recognizer { scheme, allow_unrecognized: false, allow_duplicates: false }
    }

    pub fn with_allow_unrecognized(mut self, allow: bool) -> Self {
        self.allow_unrecognized = allow;
        self
    }

    pub fn with_allow_duplicates(mut self, allow: bool) -> Self {
        self.allow_duplicates = allow;
        self
    }

    /// Extracts the ordered list of identities declared in `bytes`,
    /// decoded as `content_type`. Each document is validated independently;
    /// any one failing (empty kind, empty name, unknown kind when
    /// `allow_unrecognized` is false, or a duplicate ID when
    /// `allow_duplicates` is false) fails the whole call — Sync (§4.I) is
    /// the caller that downgrades this into a per-file log-and-skip. `group`
    /// and `version` are both allowed blank: the worked examples (§8) name
    /// objects with neither field set.
    pub fn recognize(
        &self,
        file_name: &str,
        bytes: &[u8],
        content_type: ContentType,
    ) -> Result<Vec<UnversionedObjectID>> {
        let mut ids = vec![];
        let mut seen = std::collections::HashSet::new();
        for raw in self.iter_documents(file_name, bytes, content_type)? {
            let raw = raw?;
            if raw.kind.is_empty() {
                return Err(Error::Decode { path: file_name.to_string(), reason: "empty kind".to_string() });
            }
            if raw.name.is_empty() {
                return Err(Error::Decode { path: file_name.to_string(), reason: "empty name".to_string() });
            }
            let gk = GroupKind::new(raw.group, raw.kind);
            if !self.allow_unrecognized && !self.scheme.is_known(&gk) {
                return Err(Error::Decode {
                    path: file_name.to_string(),
                    reason: format!("unrecognized kind {gk}"),
                });
            }
            let id = UnversionedObjectID::new(gk, ObjectKey::new(raw.namespace, raw.name));
            if !self.allow_duplicates && !seen.insert(id.clone()) {
                return Err(Error::Decode {
                    path: file_name.to_string(),
                    reason: format!("duplicate object {id} in the same file"),
                });
            }
            ids.push(id);
        }
        Ok(ids)
    }

    fn iter_documents(
        &self,
        file_name: &str,
        bytes: &[u8],
        content_type: ContentType,
    ) -> Result<Vec<Result<RawMeta>>> {
        match content_type {
            ContentType::Yaml => {
                let text = std::str::from_utf8(bytes).map_err(|e| Error::Decode {
                    path: file_name.to_string(),
                    reason: e.to_string(),
                })?;
                let mut docs = vec![];
                for doc in serde_yaml::Deserializer::from_str(text) {
                    docs.push(
                        RawMeta::deserialize(doc)
                            .map_err(|e| Error::Decode { path: file_name.to_string(), reason: e.to_string() }),
                    );
                }
                Ok(docs)
            }
            ContentType::Json => {
                let stream = serde_json::Deserializer::from_slice(bytes).into_iter::<RawMeta>();
                let mut docs = vec![];
                for doc in stream {
                    docs.push(
                        doc.map_err(|e| Error::Decode { path: file_name.to_string(), reason: e.to_string() }),
                    );
                }
                Ok(docs)
            }
        }
    }
}
