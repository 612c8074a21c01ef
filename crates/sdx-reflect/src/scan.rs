use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use sdx_classpath::{
    join_resource_path, package_to_resource_path, resource_path_to_binary_name, ClassLoader,
    Resource,
};
use sdx_types::{is_subclass, ClassId, TypeEnv, TypeStore};

use crate::policy::non_instantiable_reason;

/// Lazily discovered instantiable subtypes of one supertype below a package root.
///
/// Entries that cannot be listed or loaded are skipped with a debug log. The iterator is
/// single-pass: the traversal state is consumed as it goes.
pub struct InstantiableSubtypes {
    loader: Arc<dyn ClassLoader>,
    types: Arc<TypeStore>,
    supertype: ClassId,
    type_suffix: String,
    stack: Vec<String>,
}

impl InstantiableSubtypes {
    pub(crate) fn new(
        loader: Arc<dyn ClassLoader>,
        types: Arc<TypeStore>,
        root: &str,
        supertype: ClassId,
        type_suffix: &str,
    ) -> Self {
        Self {
            loader,
            types,
            supertype,
            type_suffix: type_suffix.to_string(),
            stack: vec![package_to_resource_path(root)],
        }
    }

    fn candidate(&self, path: &str) -> Option<ClassId> {
        let Some(name) = resource_path_to_binary_name(path, &self.type_suffix) else {
            tracing::trace!(target: "sdx.reflect", path, "not a class resource");
            return None;
        };
        let class = match self.loader.load_class(&name) {
            Ok(class) => class,
            Err(err) => {
                tracing::debug!(
                    target: "sdx.reflect",
                    %name,
                    error = %err,
                    "skipping unloadable class"
                );
                return None;
            }
        };
        if self.types.class_name(class) != Some(name.as_str()) {
            tracing::debug!(target: "sdx.reflect", %name, "loader resolved another class");
            return None;
        }
        let def = self.types.class(class)?;
        if !is_subclass(self.types.as_ref(), class, self.supertype) {
            tracing::trace!(target: "sdx.reflect", %name, "not a subtype");
            return None;
        }
        if let Some(reason) = non_instantiable_reason(def, &name) {
            tracing::debug!(target: "sdx.reflect", %name, %reason, "skipping subtype");
            return None;
        }
        Some(class)
    }
}

impl Iterator for InstantiableSubtypes {
    type Item = ClassId;

    fn next(&mut self) -> Option<ClassId> {
        while let Some(path) = self.stack.pop() {
            match self.loader.resource(&path) {
                Ok(Some(Resource::Directory(children))) => {
                    self.stack
                        .extend(children.iter().map(|child| join_resource_path(&path, child)));
                }
                Ok(Some(Resource::File)) => {
                    if let Some(class) = self.candidate(&path) {
                        return Some(class);
                    }
                }
                Ok(None) => {
                    tracing::debug!(target: "sdx.reflect", %path, "resource not found");
                }
                Err(err) => {
                    tracing::debug!(
                        target: "sdx.reflect",
                        %path,
                        error = %err,
                        "failed to list resource"
                    );
                }
            }
        }
        None
    }
}

impl FusedIterator for InstantiableSubtypes {}

impl fmt::Debug for InstantiableSubtypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstantiableSubtypes")
            .field("supertype", &self.supertype)
            .field("pending", &self.stack.len())
            .finish_non_exhaustive()
    }
}
