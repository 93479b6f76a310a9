//! `OsFilesystem`: the real, disk-backed `Filesystem` impl. All paths are
//! relative to a configured root; version references are ignored (a single
//! working tree has one filesystem state regardless of which index version
//! an operation is reading through — that's what the `IndexRegistry` forks
//! are for).

use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use super::{DirEntry, FileInfo, FileKind, Filesystem};
use crate::context::Context;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct OsFilesystem {
    root: PathBuf,
}

impl OsFilesystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        OsFilesystem { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl Filesystem for OsFilesystem {
    fn stat(&self, _ctx: &Context, path: &str) -> Result<Option<FileInfo>> {
        match fs::metadata(self.resolve(path)) {
            Ok(meta) => Ok(Some(FileInfo {
                kind: if meta.is_dir() { FileKind::Directory } else { FileKind::File },
                len: meta.len(),
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn read_file(&self, _ctx: &Context, path: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.resolve(path)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_file(&self, _ctx: &Context, path: &str, contents: &[u8]) -> Result<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(full, contents)?;
        Ok(())
    }

    fn read_dir(&self, _ctx: &Context, path: &str) -> Result<Option<Vec<DirEntry>>> {
        let full = self.resolve(path);
        let iter = match fs::read_dir(&full) {
            Ok(iter) => iter,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut entries = vec![];
        for entry in iter {
            let entry = entry?;
            let meta = entry.metadata()?;
            let rel = if path.is_empty() {
                entry.file_name().to_string_lossy().into_owned()
            } else {
                format!("{path}/{}", entry.file_name().to_string_lossy())
            };
            entries.push(DirEntry {
                path: rel,
                kind: if meta.is_dir() { FileKind::Directory } else { FileKind::File },
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(Some(entries))
    }

    fn mkdir_all(&self, _ctx: &Context, path: &str) -> Result<()> {
        fs::create_dir_all(self.resolve(path))?;
        Ok(())
    }

    fn remove(&self, _ctx: &Context, path: &str) -> Result<()> {
        let full = self.resolve(path);
        match fs::symlink_metadata(&full) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&full)?,
            Ok(_) => fs::remove_file(&full)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}
