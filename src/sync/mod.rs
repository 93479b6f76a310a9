//! Synchronizer & Event Emitter (spec §4.I): reconciles on-disk state with
//! the Mapped File Finder's index and produces the `CREATE`/`MODIFY`/
//! `DELETE`/`SYNC` event stream.

mod event;
mod suspension;
mod watch;

pub use event::{Event, EventKind};
pub use suspension::WriteSuspension;
pub use watch::{DirWatcher, WatchEvent, WatchEventKind};

use std::collections::HashSet;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::context::Context;
use crate::error::Result;
use crate::finder::MappedFileFinder;
use crate::fs::{FileKind, Filesystem};
use crate::key::{ChecksumPath, UnversionedObjectID};
use crate::namespacer::Namespacer;
use crate::policy::{ContentTyper, PathExcluder};
use crate::recognizer::{ObjectScheme, Recognizer};

/// Default outbound channel capacity (spec §5: "implementation default
/// ~4096").
pub const DEFAULT_CHANNEL_CAPACITY: usize = 4096;

pub struct Synchronizer<FS, N, S, T, Ex>
where
    FS: Filesystem,
    N: Namespacer,
    S: ObjectScheme,
    T: ContentTyper,
    Ex: PathExcluder,
{
    fs: Arc<FS>,
    finder: Arc<MappedFileFinder<N>>,
    recognizer: Arc<Recognizer<S>>,
    typer: Arc<T>,
    excluder: Arc<Ex>,
    suspension: Arc<WriteSuspension>,
    sender: Sender<Event>,
    receiver: Receiver<Event>,
}

impl<FS, N, S, T, Ex> Synchronizer<FS, N, S, T, Ex>
where
    FS: Filesystem,
    N: Namespacer,
    S: ObjectScheme,
    T: ContentTyper,
    Ex: PathExcluder,
{
    pub fn new(
        fs: Arc<FS>,
        finder: Arc<MappedFileFinder<N>>,
        recognizer: Arc<Recognizer<S>>,
        typer: Arc<T>,
        excluder: Arc<Ex>,
        suspension: Arc<WriteSuspension>,
    ) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(DEFAULT_CHANNEL_CAPACITY);
        Synchronizer { fs, finder, recognizer, typer, excluder, suspension, sender, receiver }
    }

    /// A clone of the outbound event stream's receiving end. Multiple
    /// clones all drain the same bounded queue (spec's channel is a single
    /// stream, not a broadcast).
    pub fn events(&self) -> Receiver<Event> {
        self.receiver.clone()
    }

    /// The Mapped File Finder backing this synchronizer, for callers that
    /// want to issue point queries (`ObjectPath`, `ObjectsAt`, ...)
    /// alongside reconciliation.
    pub fn finder(&self) -> &MappedFileFinder<N> {
        &self.finder
    }

    /// Drop-newest back-pressure policy (spec §5 leaves the choice to the
    /// implementation): if the channel is full, the event is logged and
    /// discarded rather than blocking the reconciliation loop. Dropping the
    /// newest instead of the oldest avoids needing pop-from-front support
    /// the underlying `crossbeam_channel::Sender` doesn't expose.
    fn emit(&self, event: Event) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(?event, "outbound event channel full, dropping event");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    fn walk(&self, ctx: &Context, dir: &str, out: &mut Vec<String>) -> Result<()> {
        if ctx.is_cancelled() {
            return Ok(());
        }
        let Some(entries) = self.fs.read_dir(ctx, dir)? else { return Ok(()) };
        for entry in entries {
            if ctx.is_cancelled() {
                return Ok(());
            }
            if self.excluder.excluded(&entry.path) {
                continue;
            }
            match entry.kind {
                FileKind::Directory => self.walk(ctx, &entry.path, out)?,
                FileKind::File => {
                    if self.typer.content_type(&entry.path).is_some() {
                        out.push(entry.path);
                    }
                }
            }
        }
        Ok(())
    }

    /// Full reconciliation pass (spec §4.I, step 1-5): walk the tree,
    /// reconcile every candidate path against the index, then drop mappings
    /// for anything the index still tracks but the walk didn't observe.
    /// Emits a trailing `SYNC` marker event once the pass completes.
    ///
    /// Per-path reconciliation runs across a `rayon` pool (grounded on
    /// `prataprc-rdms`'s `mq` pipeline, `src/mq/map.rs`, which fans work
    /// out with `rayon::prelude::*` rather than a hand-rolled thread pool)
    /// — each path only touches the `Index` through its own reader-writer
    /// lock scope, so concurrent reconciliation of distinct paths is safe.
    pub fn sync(&self, ctx: &Context) -> Result<()> {
        let mut paths = vec![];
        self.walk(ctx, "", &mut paths)?;
        if ctx.is_cancelled() {
            return Ok(());
        }

        use rayon::prelude::*;
        paths.par_iter().for_each(|path| {
            if ctx.is_cancelled() {
                return;
            }
            if let Err(e) = self.reconcile_path(ctx, path) {
                tracing::warn!(path, error = %e, "failed to reconcile path during sync, skipping");
            }
        });
        if ctx.is_cancelled() {
            return Ok(());
        }

        let observed: HashSet<String> = paths.into_iter().collect();
        for tracked in self.finder.tracked_paths(ctx)? {
            if !observed.contains(&tracked) {
                let removed = self.finder.delete_mapping(ctx, &tracked)?;
                for id in removed {
                    self.emit(Event::delete(id, None));
                }
            }
        }

        self.emit(Event::sync_complete());
        Ok(())
    }

    /// Reconciles a single path: skip if the stored checksum already
    /// matches (fast path), otherwise recognize the file and update the
    /// mapping, emitting `CREATE`/`MODIFY` for the ids that changed.
    fn reconcile_path(&self, ctx: &Context, path: &str) -> Result<()> {
        let Some(checksum) = self.fs.checksum(ctx, path)? else {
            return self.reconcile_missing(ctx, path);
        };
        if self.finder.checksum_for_path(ctx, path)?.as_deref() == Some(checksum.as_str()) {
            return Ok(());
        }

        let Some(content_type) = self.typer.content_type(path) else { return Ok(()) };
        let Some(bytes) = self.fs.read_file(ctx, path)? else { return self.reconcile_missing(ctx, path) };

        let ids = self.recognizer.recognize(path, &bytes, content_type)?;
        let new_ids: HashSet<UnversionedObjectID> = ids.into_iter().collect();
        let old_ids = self.objects_at_or_empty(ctx, path)?;
        let old_checksum = self.finder.checksum_for_path(ctx, path)?;

        let result = self.finder.set_mapping(ctx, &ChecksumPath::new(checksum.clone(), path), &new_ids)?;
        for id in &result.duplicates {
            tracing::warn!(path, id = %id, "duplicate object declaration, keeping existing mapping");
        }
        for id in result.added {
            self.emit(Event::create(id, path.to_string(), checksum.clone()));
        }
        for id in old_ids.intersection(&new_ids) {
            self.emit(Event::modify(id.clone(), path.to_string(), old_checksum.clone(), checksum.clone()));
        }
        for id in result.removed {
            self.emit(Event::delete(id, old_checksum.clone()));
        }
        Ok(())
    }

    fn reconcile_missing(&self, ctx: &Context, path: &str) -> Result<()> {
        let old_checksum = self.finder.checksum_for_path(ctx, path)?;
        let removed = self.finder.delete_mapping(ctx, path)?;
        for id in removed {
            self.emit(Event::delete(id, old_checksum.clone()));
        }
        Ok(())
    }

    fn objects_at_or_empty(&self, ctx: &Context, path: &str) -> Result<HashSet<UnversionedObjectID>> {
        match self.finder.objects_at(ctx, path) {
            Ok(ids) => Ok(ids),
            Err(crate::error::Error::NotTracked(_)) => Ok(HashSet::new()),
            Err(e) => Err(e),
        }
    }

    /// Applies one filesystem-watch notification (spec §6): a single-path
    /// delta reduces to a one-path reconciliation, except `MOVE` which goes
    /// straight to `MoveFile`. Self-originated writes suspended via
    /// [`WriteSuspension`] are consumed silently.
    pub fn handle_watch_event(&self, ctx: &Context, event: WatchEvent) -> Result<()> {
        match event.kind {
            WatchEventKind::Create => {
                if self.suspension.consume(&event.path, EventKind::Create) {
                    return Ok(());
                }
                self.reconcile_path(ctx, &event.path)
            }
            WatchEventKind::Modify => {
                if self.suspension.consume(&event.path, EventKind::Modify) {
                    return Ok(());
                }
                self.reconcile_path(ctx, &event.path)
            }
            WatchEventKind::Delete => {
                if self.suspension.consume(&event.path, EventKind::Delete) {
                    return Ok(());
                }
                self.reconcile_missing(ctx, &event.path)
            }
            WatchEventKind::Move { from } => {
                let moved = self.finder.move_file(ctx, &from, &event.path)?;
                if moved {
                    let checksum = self.finder.checksum_for_path(ctx, &event.path)?;
                    for id in self.objects_at_or_empty(ctx, &event.path)? {
                        self.emit(Event::modify(id, event.path.clone(), checksum.clone(), checksum.clone().unwrap_or_default()));
                    }
                }
                Ok(())
            }
        }
    }

    /// Runs `handle_watch_event` for every notification from `rx` until the
    /// channel disconnects or `ctx` is cancelled, then returns. Intended to
    /// run on its own thread per watched directory (spec §5: "one dedicated
    /// loop per watched directory").
    pub fn run_watch_loop(&self, ctx: &Context, rx: Receiver<WatchEvent>) {
        loop {
            if ctx.is_cancelled() {
                return;
            }
            match rx.recv_timeout(std::time::Duration::from_millis(250)) {
                Ok(event) => {
                    if let Err(e) = self.handle_watch_event(ctx, event.clone()) {
                        tracing::warn!(path = event.path, error = %e, "failed to handle watch event");
                    }
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finder::FileFinder;
    use crate::fs::MemFilesystem;
    use crate::key::{GroupKind, ObjectKey};
    use crate::namespacer::StaticNamespacer;
    use crate::policy::{DefaultContentTyper, DefaultExcluder};
    use crate::recognizer::{PermissiveScheme, Recognizer};
    use crate::registry::IndexRegistry;

    type TestSync = Synchronizer<MemFilesystem, StaticNamespacer, PermissiveScheme, DefaultContentTyper, DefaultExcluder>;

    fn harness() -> (TestSync, Arc<MemFilesystem>, Context) {
        let fs = Arc::new(MemFilesystem::new());
        let registry = Arc::new(IndexRegistry::new());
        registry.register("v1", None).unwrap();
        let namespacer = Arc::new(StaticNamespacer::new());
        let finder = Arc::new(MappedFileFinder::new(registry, namespacer));
        let recognizer = Arc::new(Recognizer::new(PermissiveScheme));
        let sync = Synchronizer::new(
            fs.clone(),
            finder,
            recognizer,
            Arc::new(DefaultContentTyper),
            Arc::new(DefaultExcluder::default()),
            Arc::new(WriteSuspension::new()),
        );
        (sync, fs, Context::new("v1"))
    }

    #[test]
    fn single_object_create_scenario() {
        let (sync, fs, ctx) = harness();
        fs.write_file(&ctx, "core/Car/default/red.yaml", b"kind: Car\nname: red\nnamespace: default\n").unwrap();

        sync.sync(&ctx).unwrap();

        let events: Vec<_> = sync.events().try_iter().collect();
        let creates: Vec<_> = events.iter().filter(|e| e.kind == EventKind::Create).collect();
        assert_eq!(creates.len(), 1);
        assert_eq!(
            creates[0].id.as_ref().unwrap(),
            &UnversionedObjectID::new(GroupKind::new("", "Car"), ObjectKey::new("default", "red"))
        );
        assert!(events.iter().any(|e| e.kind == EventKind::Sync));

        assert_eq!(
            sync.finder
                .object_path(&ctx, &UnversionedObjectID::new(GroupKind::new("", "Car"), ObjectKey::new("default", "red")))
                .unwrap(),
            "core/Car/default/red.yaml"
        );
    }

    #[test]
    fn multi_doc_file_scenario() {
        let (sync, fs, ctx) = harness();
        fs.write_file(
            &ctx,
            "cars.yaml",
            b"kind: Car\nname: a\nnamespace: default\n---\nkind: Car\nname: b\nnamespace: default\n",
        )
        .unwrap();

        sync.sync(&ctx).unwrap();
        let creates = sync.events().try_iter().filter(|e| e.kind == EventKind::Create).count();
        assert_eq!(creates, 2);
        let ids = sync.finder().objects_at(&ctx, "cars.yaml").unwrap();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn delete_scenario_emits_delete_events() {
        let (sync, fs, ctx) = harness();
        fs.write_file(&ctx, "core/Car/default/red.yaml", b"kind: Car\nname: red\nnamespace: default\n").unwrap();
        sync.sync(&ctx).unwrap();
        sync.events().try_iter().for_each(drop);

        fs.remove(&ctx, "core/Car/default/red.yaml").unwrap();
        sync.sync(&ctx).unwrap();

        let deletes: Vec<_> = sync.events().try_iter().filter(|e| e.kind == EventKind::Delete).collect();
        assert_eq!(deletes.len(), 1);
        assert!(matches!(
            sync.finder().object_path(&ctx, &UnversionedObjectID::new(GroupKind::new("", "Car"), ObjectKey::new("default", "red"))),
            Err(crate::error::Error::NotTracked(_))
        ));
    }

    #[test]
    fn suspended_write_does_not_reconcile() {
        let (sync, fs, ctx) = harness();
        sync.suspension.suspend("red.yaml", EventKind::Create);
        fs.write_file(&ctx, "red.yaml", b"kind: Car\nname: red\nnamespace: default\n").unwrap();

        sync.handle_watch_event(&ctx, WatchEvent { path: "red.yaml".to_string(), kind: WatchEventKind::Create }).unwrap();

        assert!(matches!(
            sync.finder().object_path(&ctx, &UnversionedObjectID::new(GroupKind::new("", "Car"), ObjectKey::new("default", "red"))),
            Err(crate::error::Error::NotTracked(_))
        ));
    }
}
