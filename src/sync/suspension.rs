//! Per-path, per-event-kind one-shot suspension flags (spec §4.I/§5): a
//! write Storage performs must not echo back as a synthetic event once the
//! filesystem watcher reports it.

use dashmap::DashSet;

use super::event::EventKind;

#[derive(Default)]
pub struct WriteSuspension {
    flags: DashSet<(String, EventKindTag)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EventKindTag {
    Create,
    Modify,
    Delete,
}

impl From<EventKind> for EventKindTag {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Create => EventKindTag::Create,
            EventKind::Modify => EventKindTag::Modify,
            EventKind::Delete => EventKindTag::Delete,
            EventKind::Sync => EventKindTag::Modify,
        }
    }
}

impl WriteSuspension {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a one-shot suppression for the next `kind` notification on
    /// `path`.
    pub fn suspend(&self, path: &str, kind: EventKind) {
        self.flags.insert((path.to_string(), kind.into()));
    }

    /// Consumes a matching suspension if one is armed. Returns `true` if
    /// the caller should suppress reacting to this notification.
    pub fn consume(&self, path: &str, kind: EventKind) -> bool {
        self.flags.remove(&(path.to_string(), kind.into())).is_some()
    }
}
