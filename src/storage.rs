//! Filesystem Storage (spec §4.H): the bytes-in/bytes-out public contract,
//! delegating path resolution to a File Finder and I/O to a Filesystem.
//!
//! Grounded on `AlexGrek-critical`'s `FilesystemDatabaseProvider`
//! (`backend/gitops_lib/src/store/mod.rs`), which is exactly this shape —
//! resolve a logical key to a path, then read/write/delete through a
//! storage backend — generalized from its fixed resource type to the
//! `UnversionedObjectID` identity of this crate.

use std::sync::Arc;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::finder::FileFinder;
use crate::fs::Filesystem;
use crate::key::{GroupKind, ObjectKey, UnversionedObjectID};
use crate::namespacer::Namespacer;
use crate::policy::ContentType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStat {
    pub content_type: Option<ContentType>,
    pub checksum: Option<String>,
    pub path: String,
    pub id: UnversionedObjectID,
}

pub struct Storage<FS: Filesystem, F: FileFinder, N: Namespacer, T: crate::policy::ContentTyper> {
    fs: Arc<FS>,
    finder: Arc<F>,
    namespacer: Arc<N>,
    typer: Arc<T>,
}

impl<FS: Filesystem, F: FileFinder, N: Namespacer, T: crate::policy::ContentTyper> Storage<FS, F, N, T> {
    pub fn new(fs: Arc<FS>, finder: Arc<F>, namespacer: Arc<N>, typer: Arc<T>) -> Self {
        Storage { fs, finder, namespacer, typer }
    }

    fn validate(&self, id: &UnversionedObjectID) -> Result<()> {
        let namespaced = self.namespacer.is_namespaced(&id.gk);
        if namespaced != id.key.is_namespaced() {
            return Err(Error::NamespacedMismatch { id: id.clone(), ns: id.key.namespace.clone() });
        }
        Ok(())
    }

    fn path_for(&self, ctx: &Context, id: &UnversionedObjectID) -> Result<String> {
        self.validate(id)?;
        match self.finder.object_path(ctx, id) {
            Ok(path) => Ok(path),
            Err(Error::NotTracked(_)) => Err(Error::NotFound(id.clone())),
            Err(e) => Err(e),
        }
    }

    pub fn read(&self, ctx: &Context, id: &UnversionedObjectID) -> Result<Vec<u8>> {
        let path = self.path_for(ctx, id)?;
        self.fs.read_file(ctx, &path)?.ok_or_else(|| Error::NotFound(id.clone()))
    }

    pub fn write(&self, ctx: &Context, id: &UnversionedObjectID, bytes: &[u8]) -> Result<()> {
        self.validate(id)?;
        let path = self.finder.object_path(ctx, id)?;
        self.fs.mkdir_all(ctx, crate::fs::parent_of(&path).unwrap_or(""))?;
        self.fs.write_file(ctx, &path, bytes)
    }

    pub fn delete(&self, ctx: &Context, id: &UnversionedObjectID) -> Result<()> {
        let path = self.path_for(ctx, id)?;
        if self.fs.stat(ctx, &path)?.is_none() {
            return Err(Error::NotFound(id.clone()));
        }
        self.fs.remove(ctx, &path)
    }

    pub fn exists(&self, ctx: &Context, id: &UnversionedObjectID) -> Result<bool> {
        match self.path_for(ctx, id) {
            Ok(path) => Ok(self.fs.stat(ctx, &path)?.is_some()),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn checksum(&self, ctx: &Context, id: &UnversionedObjectID) -> Result<Option<String>> {
        let path = self.path_for(ctx, id)?;
        self.fs.checksum(ctx, &path)
    }

    pub fn content_type(&self, ctx: &Context, id: &UnversionedObjectID) -> Result<Option<ContentType>> {
        let path = self.path_for(ctx, id)?;
        Ok(self.typer.content_type(&path))
    }

    pub fn stat(&self, ctx: &Context, id: &UnversionedObjectID) -> Result<ObjectStat> {
        let path = self.path_for(ctx, id)?;
        Ok(ObjectStat {
            content_type: self.typer.content_type(&path),
            checksum: self.fs.checksum(ctx, &path)?,
            path,
            id: id.clone(),
        })
    }

    pub fn list_group_kinds(&self, ctx: &Context) -> Result<Vec<GroupKind>> {
        self.finder.list_group_kinds(ctx)
    }

    pub fn list_namespaces(&self, ctx: &Context, gk: &GroupKind) -> Result<Vec<String>> {
        self.finder.list_namespaces(ctx, gk)
    }

    pub fn list_object_ids(&self, ctx: &Context, gk: &GroupKind, ns: &str) -> Result<Vec<ObjectKey>> {
        self.finder.list_object_ids(ctx, gk, ns)
    }
}
