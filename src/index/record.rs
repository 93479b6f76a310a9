//! The `id:` / `path:` / `chk:` key schema of spec §3, and the `Record`
//! value entries stored at `id:`/`chk:` keys.

use crate::key::{GroupKind, UnversionedObjectID};

/// A value entry's own key, plus the secondary pointer keys it should also
/// be reachable from. `Index::put`/`Index::delete` (`src/index/mod.rs`) use
/// this to keep pointers in sync atomically with the value they point at —
/// the generic mechanism spec §4.A describes ("Put... atomically inserts
/// the value entry and all its secondary pointers").
pub trait Keyed: Clone {
    fn primary_key(&self) -> String;
    fn pointer_keys(&self) -> Vec<String>;
}

/// The two kinds of value entry this store keeps (spec §3's `id` and `chk`
/// rows; the `path` row is a bare pointer with no payload of its own, see
/// `Slot::Pointer` in `src/index/mod.rs`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// `id:<group>/<kind>:<ns>:<name>` → path.
    Id { id: UnversionedObjectID, path: String },
    /// `chk:<path>` → checksum.
    Checksum { path: String, checksum: String },
}

impl Record {
    pub fn as_id(&self) -> Option<(&UnversionedObjectID, &str)> {
        match self {
            Record::Id { id, path } => Some((id, path)),
            Record::Checksum { .. } => None,
        }
    }

    pub fn as_checksum(&self) -> Option<&str> {
        match self {
            Record::Checksum { checksum, .. } => Some(checksum),
            Record::Id { .. } => None,
        }
    }
}

impl Keyed for Record {
    fn primary_key(&self) -> String {
        match self {
            Record::Id { id, .. } => id_key(id),
            Record::Checksum { path, .. } => checksum_key(path),
        }
    }

    fn pointer_keys(&self) -> Vec<String> {
        match self {
            Record::Id { id, path } => vec![path_pointer_key(path, id)],
            Record::Checksum { .. } => vec![],
        }
    }
}

/// `id:<group>/<kind>:<ns>:<name>`
pub fn id_key(id: &UnversionedObjectID) -> String {
    format!("id:{}/{}:{}:{}", id.gk.storage_group(), id.gk.kind, id.key.namespace, id.key.name)
}

/// `id:<group>/<kind>:` — every object of this GroupKind.
pub fn id_prefix_gk(gk: &GroupKind) -> String {
    format!("id:{}/{}:", gk.storage_group(), gk.kind)
}

/// `id:<group>/<kind>:<ns>:` — every object of this GroupKind in `ns`.
pub fn id_prefix_gk_ns(gk: &GroupKind, ns: &str) -> String {
    format!("id:{}/{}:{}:", gk.storage_group(), gk.kind, ns)
}

/// `path:<path>:id:<group>/<kind>:<ns>:<name>` — a pointer key that embeds
/// its target's full `id:` key, per spec §9's explicit adoption of this
/// (otherwise ambiguous) choice from the source's test suite.
pub fn path_pointer_key(path: &str, id: &UnversionedObjectID) -> String {
    format!("path:{}:{}", path, id_key(id))
}

/// `path:<path>:` — every ID currently mapped to `path`.
pub fn path_prefix(path: &str) -> String {
    format!("path:{}:", path)
}

/// `chk:<path>`
pub fn checksum_key(path: &str) -> String {
    format!("chk:{}", path)
}

/// Recover the `UnversionedObjectID` embedded in a `path:` pointer key.
/// Returns `None` if `key` isn't a well-formed pointer key.
pub fn parse_path_pointer_key(key: &str) -> Option<UnversionedObjectID> {
    let rest = key.strip_prefix("path:")?;
    let idx = rest.find(":id:")?;
    let id_part = &rest[idx + 1..]; // "id:<group>/<kind>:<ns>:<name>"
    parse_id_key(id_part)
}

/// Recover the `UnversionedObjectID` encoded by an `id:` key.
///
/// Namespace and name are not escaped, so values containing `:` are not
/// round-trippable — an accepted limitation of the flat string key space
/// (spec §3 specifies the shape but not an escaping scheme).
pub fn parse_id_key(key: &str) -> Option<UnversionedObjectID> {
    let rest = key.strip_prefix("id:")?;
    let mut parts = rest.splitn(3, ':');
    let gk_part = parts.next()?;
    let ns = parts.next()?;
    let name = parts.next()?;
    let (group, kind) = gk_part.split_once('/')?;
    Some(UnversionedObjectID::new(
        GroupKind::new(group, kind),
        crate::key::ObjectKey::new(ns, name),
    ))
}
