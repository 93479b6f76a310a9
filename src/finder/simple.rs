//! `SimpleFileFinder` (spec §4.E): a deterministic, cacheless layout.
//! `ObjectPath` is computed, never looked up; enumeration walks the
//! filesystem directly rather than consulting an index, since there is no
//! index behind this finder at all.

use std::sync::Arc;

use super::FileFinder;
use crate::context::Context;
use crate::error::Result;
use crate::fs::Filesystem;
use crate::key::{GroupKind, ObjectKey, UnversionedObjectID, CORE_GROUP};
use crate::policy::{ContentType, ExtensionResolver};

/// Layout knobs (spec §4.E): `disable_group_directory` drops the leading
/// `<group>/` segment; `sub_dir_file_name`, if set, turns `<name>` into a
/// directory containing a fixed-name file instead of `<name>.<ext>`.
pub struct SimpleFileFinder<F: Filesystem, E: ExtensionResolver> {
    fs: Arc<F>,
    extensions: E,
    content_type: ContentType,
    disable_group_directory: bool,
    sub_dir_file_name: Option<String>,
}

impl<F: Filesystem, E: ExtensionResolver> SimpleFileFinder<F, E> {
    pub fn new(fs: Arc<F>, extensions: E, content_type: ContentType) -> Self {
        SimpleFileFinder {
            fs,
            extensions,
            content_type,
            disable_group_directory: false,
            sub_dir_file_name: None,
        }
    }

    pub fn with_disable_group_directory(mut self, disable: bool) -> Self {
        self.disable_group_directory = disable;
        self
    }

    pub fn with_sub_dir_file_name(mut self, name: impl Into<String>) -> Self {
        self.sub_dir_file_name = Some(name.into());
        self
    }

    fn group_segment(&self, gk: &GroupKind) -> Option<&str> {
        if self.disable_group_directory { None } else { Some(gk.storage_group()) }
    }
}

impl<F: Filesystem, E: ExtensionResolver> FileFinder for SimpleFileFinder<F, E> {
    fn object_path(&self, _ctx: &Context, id: &UnversionedObjectID) -> Result<String> {
        let ext = self.extensions.extension_for(self.content_type)?;
        let mut segments = vec![];
        if let Some(group) = self.group_segment(&id.gk) {
            segments.push(group.to_string());
        }
        segments.push(id.gk.kind.clone());
        if !id.key.namespace.is_empty() {
            segments.push(id.key.namespace.clone());
        }
        match &self.sub_dir_file_name {
            Some(sub) => {
                segments.push(id.key.name.clone());
                segments.push(format!("{sub}.{ext}"));
            }
            None => segments.push(format!("{}.{ext}", id.key.name)),
        }
        Ok(segments.join("/"))
    }

    fn list_group_kinds(&self, ctx: &Context) -> Result<Vec<GroupKind>> {
        let mut out = vec![];
        let top = match self.fs.read_dir(ctx, "")? {
            Some(entries) => entries,
            None => return Ok(out),
        };
        if self.disable_group_directory {
            for entry in top {
                if entry.kind == crate::fs::FileKind::Directory {
                    out.push(GroupKind::new("", kind_from_dir(&entry.path)));
                }
            }
            return Ok(out);
        }
        for group_entry in top {
            if group_entry.kind != crate::fs::FileKind::Directory {
                continue;
            }
            let group = kind_from_dir(&group_entry.path);
            let group = if group == CORE_GROUP { String::new() } else { group.to_string() };
            let kinds = self.fs.read_dir(ctx, &group_entry.path)?.unwrap_or_default();
            for kind_entry in kinds {
                if kind_entry.kind == crate::fs::FileKind::Directory {
                    out.push(GroupKind::new(group.clone(), kind_from_dir(&kind_entry.path)));
                }
            }
        }
        Ok(out)
    }

    fn list_namespaces(&self, ctx: &Context, gk: &GroupKind) -> Result<Vec<String>> {
        let kind_dir = self.kind_dir(gk);
        let entries = match self.fs.read_dir(ctx, &kind_dir)? {
            Some(e) => e,
            None => return Ok(vec![]),
        };
        let mut out = vec![];
        for entry in entries {
            if entry.kind == crate::fs::FileKind::Directory {
                out.push(kind_from_dir(&entry.path).to_string());
            }
        }
        Ok(out)
    }

    fn list_object_ids(&self, ctx: &Context, gk: &GroupKind, ns: &str) -> Result<Vec<ObjectKey>> {
        let kind_dir = self.kind_dir(gk);
        let ns_dir = if ns.is_empty() { kind_dir } else { format!("{kind_dir}/{ns}") };
        let entries = match self.fs.read_dir(ctx, &ns_dir)? {
            Some(e) => e,
            None => return Ok(vec![]),
        };
        let ext = self.extensions.extension_for(self.content_type)?;
        let mut out = vec![];
        match &self.sub_dir_file_name {
            Some(sub) => {
                let expected = format!("{sub}.{ext}");
                for entry in entries {
                    if entry.kind != crate::fs::FileKind::Directory {
                        continue;
                    }
                    let sub_path = format!("{}/{expected}", entry.path);
                    if self.fs.stat(ctx, &sub_path)?.is_some() {
                        out.push(ObjectKey::new(ns, kind_from_dir(&entry.path)));
                    }
                }
            }
            None => {
                let suffix = format!(".{ext}");
                for entry in entries {
                    if entry.kind != crate::fs::FileKind::File {
                        continue;
                    }
                    if let Some(name) = base_name(&entry.path).strip_suffix(&suffix) {
                        out.push(ObjectKey::new(ns, name));
                    }
                }
            }
        }
        Ok(out)
    }
}

impl<F: Filesystem, E: ExtensionResolver> SimpleFileFinder<F, E> {
    fn kind_dir(&self, gk: &GroupKind) -> String {
        match self.group_segment(gk) {
            Some(group) => format!("{group}/{}", gk.kind),
            None => gk.kind.clone(),
        }
    }
}

fn kind_from_dir(path: &str) -> &str {
    base_name(path)
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemFilesystem;
    use crate::policy::DefaultExtensionResolver;

    fn finder() -> SimpleFileFinder<MemFilesystem, DefaultExtensionResolver> {
        SimpleFileFinder::new(Arc::new(MemFilesystem::new()), DefaultExtensionResolver, ContentType::Yaml)
    }

    #[test]
    fn object_path_uses_core_group_and_namespace() {
        let f = finder();
        let ctx = Context::new("v1");
        let id = UnversionedObjectID::new(GroupKind::new("", "Car"), ObjectKey::new("default", "red"));
        assert_eq!(f.object_path(&ctx, &id).unwrap(), "core/Car/default/red.yaml");
    }

    #[test]
    fn object_path_omits_namespace_segment_when_cluster_scoped() {
        let f = finder();
        let ctx = Context::new("v1");
        let id = UnversionedObjectID::new(GroupKind::new("", "Node"), ObjectKey::cluster_scoped("n1"));
        assert_eq!(f.object_path(&ctx, &id).unwrap(), "core/Node/n1.yaml");
    }

    #[test]
    fn disable_group_directory_drops_leading_segment() {
        let f = SimpleFileFinder::new(Arc::new(MemFilesystem::new()), DefaultExtensionResolver, ContentType::Yaml)
            .with_disable_group_directory(true);
        let ctx = Context::new("v1");
        let id = UnversionedObjectID::new(GroupKind::new("", "Car"), ObjectKey::new("default", "red"));
        assert_eq!(f.object_path(&ctx, &id).unwrap(), "Car/default/red.yaml");
    }

    #[test]
    fn sub_dir_file_name_nests_object_under_its_own_directory() {
        let f = SimpleFileFinder::new(Arc::new(MemFilesystem::new()), DefaultExtensionResolver, ContentType::Yaml)
            .with_sub_dir_file_name("object");
        let ctx = Context::new("v1");
        let id = UnversionedObjectID::new(GroupKind::new("", "Car"), ObjectKey::new("default", "red"));
        assert_eq!(f.object_path(&ctx, &id).unwrap(), "core/Car/default/red/object.yaml");
    }

    #[test]
    fn list_object_ids_filters_by_extension_in_no_subdir_mode() {
        let f = finder();
        let ctx = Context::new("v1");
        f.fs.write_file(&ctx, "core/Car/default/red.yaml", b"x").unwrap();
        f.fs.write_file(&ctx, "core/Car/default/notes.txt", b"x").unwrap();
        let ids = f.list_object_ids(&ctx, &GroupKind::new("", "Car"), "default").unwrap();
        assert_eq!(ids, vec![ObjectKey::new("default", "red")]);
    }

    #[test]
    fn list_object_ids_requires_sub_file_presence_in_subdir_mode() {
        let f = SimpleFileFinder::new(Arc::new(MemFilesystem::new()), DefaultExtensionResolver, ContentType::Yaml)
            .with_sub_dir_file_name("object");
        let ctx = Context::new("v1");
        f.fs.write_file(&ctx, "core/Car/default/red/object.yaml", b"x").unwrap();
        f.fs.mkdir_all(&ctx, "core/Car/default/incomplete").unwrap();
        let ids = f.list_object_ids(&ctx, &GroupKind::new("", "Car"), "default").unwrap();
        assert_eq!(ids, vec![ObjectKey::new("default", "red")]);
    }

    #[test]
    fn list_group_kinds_walks_group_and_kind_directories() {
        let f = finder();
        let ctx = Context::new("v1");
        f.fs.write_file(&ctx, "core/Car/default/red.yaml", b"x").unwrap();
        f.fs.write_file(&ctx, "apps/Deployment/prod/web.yaml", b"x").unwrap();
        let mut gks = f.list_group_kinds(&ctx).unwrap();
        gks.sort();
        assert_eq!(gks, vec![GroupKind::new("", "Car"), GroupKind::new("apps", "Deployment")]);
    }
}
