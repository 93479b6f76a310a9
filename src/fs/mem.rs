//! `MemFilesystem`: an in-memory `Filesystem` backend, so the Filesystem
//! Storage and Synchronizer components can be exercised without touching
//! disk, in the spirit of `prataprc-rdms`'s tests building an in-memory
//! `Llrb` rather than round-tripping through a real WAL file.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;

use super::{DirEntry, FileInfo, FileKind, Filesystem};
use crate::context::Context;
use crate::error::Result;

struct Entry {
    contents: Vec<u8>,
    modified: SystemTime,
}

/// A flat map from path to contents; directories are synthesized from the
/// paths that exist under them rather than stored as entries of their own.
#[derive(Default)]
pub struct MemFilesystem {
    files: Mutex<BTreeMap<String, Entry>>,
    clock: Mutex<SystemTime>,
}

impl MemFilesystem {
    pub fn new() -> Self {
        MemFilesystem { files: Mutex::new(BTreeMap::new()), clock: Mutex::new(SystemTime::UNIX_EPOCH) }
    }

    fn tick(&self) -> SystemTime {
        let mut clock = self.clock.lock();
        *clock += Duration::from_nanos(1);
        *clock
    }
}

impl Filesystem for MemFilesystem {
    fn stat(&self, _ctx: &Context, path: &str) -> Result<Option<FileInfo>> {
        let files = self.files.lock();
        if let Some(entry) = files.get(path) {
            return Ok(Some(FileInfo {
                kind: FileKind::File,
                len: entry.contents.len() as u64,
                modified: entry.modified,
            }));
        }
        let dir_prefix = format!("{path}/");
        let is_dir = path.is_empty() || files.keys().any(|k| k.starts_with(&dir_prefix));
        if is_dir {
            return Ok(Some(FileInfo { kind: FileKind::Directory, len: 0, modified: SystemTime::UNIX_EPOCH }));
        }
        Ok(None)
    }

    fn read_file(&self, _ctx: &Context, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.files.lock().get(path).map(|e| e.contents.clone()))
    }

    fn write_file(&self, _ctx: &Context, path: &str, contents: &[u8]) -> Result<()> {
        let modified = self.tick();
        self.files.lock().insert(path.to_string(), Entry { contents: contents.to_vec(), modified });
        Ok(())
    }

    fn read_dir(&self, _ctx: &Context, path: &str) -> Result<Option<Vec<DirEntry>>> {
        let files = self.files.lock();
        let prefix = if path.is_empty() { String::new() } else { format!("{path}/") };
        if !path.is_empty() && !files.keys().any(|k| k.starts_with(&prefix)) {
            return Ok(None);
        }
        let mut seen = std::collections::BTreeSet::new();
        let mut entries = vec![];
        for key in files.keys() {
            let Some(rest) = key.strip_prefix(&prefix) else { continue };
            let child = rest.split('/').next().unwrap();
            if !seen.insert(child.to_string()) {
                continue;
            }
            let child_path = format!("{prefix}{child}");
            let kind = if rest.contains('/') { FileKind::Directory } else { FileKind::File };
            entries.push(DirEntry { path: child_path, kind });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(Some(entries))
    }

    fn mkdir_all(&self, _ctx: &Context, _path: &str) -> Result<()> {
        // Directories are implicit (see `stat`); nothing to record.
        Ok(())
    }

    fn remove(&self, _ctx: &Context, path: &str) -> Result<()> {
        let mut files = self.files.lock();
        if files.remove(path).is_some() {
            return Ok(());
        }
        let dir_prefix = format!("{path}/");
        files.retain(|k, _| !k.starts_with(&dir_prefix));
        Ok(())
    }
}
