//! Construction strategies.
//!
//! The bypass strategy hands out memoized [`Instantiator`]s built from a class's registered
//! allocator. The direct strategy locates the no-argument constructor; turning it into a handle is
//! left to the caller because it depends on the current lookup.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use sdx_types::{Allocator, ClassDef, ClassId, Constructor, TypeStore, Value, Visibility};

use crate::{ReflectionError, Result};

/// Fabricates instances of one class without running any constructor body.
pub struct Instantiator {
    class: ClassId,
    allocator: Allocator,
}

impl Instantiator {
    pub(crate) fn for_class(class: ClassId, def: &ClassDef, type_name: &str) -> Result<Self> {
        let allocator = def.allocator.clone().ok_or_else(|| {
            ReflectionError::NotInstantiable(format!(
                "Type {type_name} does not register a bypass allocator"
            ))
        })?;
        Ok(Self { class, allocator })
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn new_instance(&self) -> Value {
        self.allocator.allocate()
    }
}

impl fmt::Debug for Instantiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instantiator")
            .field("class", &self.class)
            .finish_non_exhaustive()
    }
}

/// Write-once cache of instantiators. Entries are never evicted.
#[derive(Default)]
pub(crate) struct InstantiatorCache {
    entries: RwLock<HashMap<ClassId, Arc<Instantiator>>>,
}

impl InstantiatorCache {
    /// The cached instantiator for `class`, computing it with `init` on a miss.
    ///
    /// Concurrent misses may each run `init`, but only the first published value is ever handed
    /// out; the others are dropped.
    pub(crate) fn get_or_try_insert(
        &self,
        class: ClassId,
        init: impl FnOnce() -> Result<Instantiator>,
    ) -> Result<Arc<Instantiator>> {
        if let Some(hit) = self.entries.read().get(&class) {
            return Ok(Arc::clone(hit));
        }

        let computed = init()?;
        let mut entries = self.entries.write();
        let entry = entries.entry(class).or_insert_with(|| {
            tracing::debug!(target: "sdx.reflect", class = class.to_raw(), "caching instantiator");
            Arc::new(computed)
        });
        Ok(Arc::clone(entry))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}

impl fmt::Debug for InstantiatorCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstantiatorCache")
            .field("len", &self.len())
            .finish()
    }
}

/// The declared no-argument constructor of `class`, made accessible when it is not public.
pub(crate) fn no_arg_constructor(
    types: &TypeStore,
    class: ClassId,
    type_name: &str,
) -> Result<Constructor> {
    let mut constructor = types.declared_constructor(class, &[]).ok_or_else(|| {
        ReflectionError::NotInstantiable(format!(
            "Class {type_name} must have a no-args constructor (but not necessarily public)"
        ))
    })?;
    if constructor.visibility() != Visibility::Public {
        constructor.set_accessible(true);
    }
    Ok(constructor)
}
