//! Namespace loaders: resource-tree views over the classes an application can load.
//!
//! A loader answers two questions: "what is at this resource path?" (a directory with named
//! children, or a leaf resource) and "which class does this binary name denote?". Subtype scanning
//! in `sdx-reflect` is written purely against the [`ClassLoader`] trait, so it works the same over
//! the in-memory [`StoreLoader`] and the filesystem-backed [`DirectoryLoader`].

#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use sdx_types::{ClassId, ClassKind, TypeEnv, TypeStore};

/// Suffix marking a leaf resource as a class definition.
pub const CLASS_SUFFIX: &str = ".class";

#[derive(Debug, Error)]
pub enum ClasspathError {
    #[error("class {0} not found")]
    ClassNotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

pub type Result<T, E = ClasspathError> = std::result::Result<T, E>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resource {
    /// A directory-like resource and the base names of its children.
    Directory(Vec<String>),
    File,
}

pub trait ClassLoader: Send + Sync + fmt::Debug {
    /// Look up a `/`-separated resource path. The empty path denotes the root.
    ///
    /// Returns `Ok(None)` when nothing exists at `path`.
    fn resource(&self, path: &str) -> Result<Option<Resource>>;

    /// Load the class with the given binary name (`com.example.Foo$Bar`).
    fn load_class(&self, binary_name: &str) -> Result<ClassId>;
}

/// `com.example.pkg` -> `com/example/pkg`.
pub fn package_to_resource_path(package: &str) -> String {
    package.replace('.', "/")
}

/// `com/example/Foo.class` -> `com.example.Foo`.
///
/// Returns `None` for resources that do not end with `suffix` and for the `module-info` /
/// `package-info` pseudo-classes.
pub fn resource_path_to_binary_name(path: &str, suffix: &str) -> Option<String> {
    let internal = path.strip_suffix(suffix)?.trim_start_matches('/');
    if internal.is_empty() || is_ignored_class(internal) {
        return None;
    }
    Some(internal.replace('/', "."))
}

pub fn join_resource_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}/{child}")
    }
}

fn is_ignored_class(internal_name: &str) -> bool {
    internal_name == "module-info"
        || internal_name == "package-info"
        || internal_name.ends_with("/package-info")
}

fn load_from_store(store: &TypeStore, binary_name: &str) -> Result<ClassId> {
    // Hidden classes cannot be looked up by name.
    store
        .class_id(binary_name)
        .filter(|id| store.class(*id).is_some_and(|def| !def.hidden))
        .ok_or_else(|| ClasspathError::ClassNotFound(binary_name.to_string()))
}

/// A loader that derives its resource tree from the classes registered in a [`TypeStore`].
///
/// Every nameable class `a.b.C` appears as the leaf `a/b/C.class`.
pub struct StoreLoader {
    store: Arc<TypeStore>,
    directories: BTreeMap<String, BTreeSet<String>>,
    files: HashSet<String>,
}

impl StoreLoader {
    pub fn new(store: Arc<TypeStore>) -> Self {
        Self::with_suffix(store, CLASS_SUFFIX)
    }

    pub fn with_suffix(store: Arc<TypeStore>, suffix: &str) -> Self {
        let mut directories: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut files = HashSet::new();
        directories.entry(String::new()).or_default();

        for (_, def) in store.iter_classes() {
            if def.hidden || matches!(def.kind, ClassKind::Array | ClassKind::Primitive) {
                continue;
            }
            let path = format!("{}{suffix}", package_to_resource_path(&def.name));

            let mut parent = String::new();
            let mut segments = path.split('/').peekable();
            while let Some(segment) = segments.next() {
                directories
                    .entry(parent.clone())
                    .or_default()
                    .insert(segment.to_string());
                let child = join_resource_path(&parent, segment);
                if segments.peek().is_some() {
                    directories.entry(child.clone()).or_default();
                }
                parent = child;
            }
            files.insert(path);
        }

        Self {
            store,
            directories,
            files,
        }
    }

    pub fn store(&self) -> &Arc<TypeStore> {
        &self.store
    }
}

impl fmt::Debug for StoreLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreLoader")
            .field("directories", &self.directories.len())
            .field("files", &self.files.len())
            .finish_non_exhaustive()
    }
}

impl ClassLoader for StoreLoader {
    fn resource(&self, path: &str) -> Result<Option<Resource>> {
        let path = path.trim_matches('/');
        if let Some(children) = self.directories.get(path) {
            return Ok(Some(Resource::Directory(children.iter().cloned().collect())));
        }
        Ok(self.files.contains(path).then_some(Resource::File))
    }

    fn load_class(&self, binary_name: &str) -> Result<ClassId> {
        load_from_store(&self.store, binary_name)
    }
}

/// A loader over class output directories on disk.
///
/// Resource paths are resolved against each root in order; the first root containing the path
/// wins. Class names found on disk are resolved against the type store, so a `.class` file only
/// yields a class when a descriptor with that binary name is registered.
#[derive(Debug)]
pub struct DirectoryLoader {
    roots: Vec<PathBuf>,
    store: Arc<TypeStore>,
}

impl DirectoryLoader {
    pub fn new(store: Arc<TypeStore>, roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let roots = roots
            .into_iter()
            .map(|root| canonicalize_if_possible(&root))
            .collect();
        Self { roots, store }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn list_dir(dir: &Path) -> Result<Vec<String>> {
        let mut children = Vec::new();
        for entry in walkdir::WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry?;
            children.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(children)
    }
}

impl ClassLoader for DirectoryLoader {
    fn resource(&self, path: &str) -> Result<Option<Resource>> {
        let relative = Path::new(path.trim_matches('/'));
        // Never resolve outside of the configured roots.
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            tracing::debug!(
                target: "sdx.classpath",
                path,
                "rejecting resource path outside of the class roots"
            );
            return Ok(None);
        }

        for root in &self.roots {
            let candidate = root.join(relative);
            if candidate.is_dir() {
                return Ok(Some(Resource::Directory(Self::list_dir(&candidate)?)));
            }
            if candidate.is_file() {
                return Ok(Some(Resource::File));
            }
        }
        Ok(None)
    }

    fn load_class(&self, binary_name: &str) -> Result<ClassId> {
        load_from_store(&self.store, binary_name)
    }
}

fn canonicalize_if_possible(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
