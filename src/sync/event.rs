//! The outbound event stream's wire shape (spec §4.I/§6).

use crate::key::UnversionedObjectID;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Create,
    Modify,
    Delete,
    /// Marks completion of a full reconciliation pass. Carries no object ID:
    /// spec §4.I names `CREATE`/`MODIFY`/`DELETE`/`SYNC` as the event kinds
    /// but only gives per-object meaning to the first three, so this crate
    /// reads `SYNC` as a single pass-completion marker rather than a fourth
    /// per-object kind (see `DESIGN.md`).
    Sync,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub id: Option<UnversionedObjectID>,
    pub old_checksum: Option<String>,
    pub new_checksum: Option<String>,
    pub path: Option<String>,
}

impl Event {
    pub fn create(id: UnversionedObjectID, path: String, checksum: String) -> Self {
        Event { kind: EventKind::Create, id: Some(id), old_checksum: None, new_checksum: Some(checksum), path: Some(path) }
    }

    pub fn modify(id: UnversionedObjectID, path: String, old_checksum: Option<String>, new_checksum: String) -> Self {
        Event { kind: EventKind::Modify, id: Some(id), old_checksum, new_checksum: Some(new_checksum), path: Some(path) }
    }

    pub fn delete(id: UnversionedObjectID, old_checksum: Option<String>) -> Self {
        Event { kind: EventKind::Delete, id: Some(id), old_checksum, new_checksum: None, path: None }
    }

    pub fn sync_complete() -> Self {
        Event { kind: EventKind::Sync, id: None, old_checksum: None, new_checksum: None, path: None }
    }
}
