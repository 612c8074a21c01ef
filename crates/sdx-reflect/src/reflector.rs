use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;
use sdx_classpath::{ClassLoader, DirectoryLoader, StoreLoader};
use sdx_config::ReflectionConfig;
use sdx_types::{ClassDef, ClassId, Constructor, Field, Method, Type, TypeEnv, TypeStore, Value};

use crate::construct::{no_arg_constructor, Instantiator, InstantiatorCache};
use crate::hierarchy::resolve_type_argument;
use crate::invoke::{self, ConstructorHandle, FieldGetter, FieldSetter, MethodHandle};
use crate::policy::check_instantiable;
use crate::scan::InstantiableSubtypes;
use crate::{Lookup, ReflectionError, Result};

/// Entry point for reflective construction, invocation and generic-argument resolution.
///
/// One reflector is created at start-up and shared (it is `Send + Sync`). It owns the
/// instantiator cache; the lookup and the class loader can be replaced wholesale, which is meant
/// for start-up configuration and is not coordinated with calls in flight.
pub struct Reflector {
    types: Arc<TypeStore>,
    loader: RwLock<Arc<dyn ClassLoader>>,
    lookup: RwLock<Lookup>,
    type_suffix: String,
    instantiators: InstantiatorCache,
}

impl Reflector {
    pub fn new(types: Arc<TypeStore>, loader: Arc<dyn ClassLoader>, lookup: Lookup) -> Self {
        Self {
            types,
            loader: RwLock::new(loader),
            lookup: RwLock::new(lookup),
            type_suffix: sdx_config::DEFAULT_TYPE_SUFFIX.to_string(),
            instantiators: InstantiatorCache::default(),
        }
    }

    /// A reflector scanning the classes registered in `types`, with the public lookup.
    pub fn with_store_loader(types: Arc<TypeStore>) -> Self {
        let loader = Arc::new(StoreLoader::new(Arc::clone(&types)));
        Self::new(types, loader, Lookup::default())
    }

    /// Build a reflector from loaded configuration.
    ///
    /// Without scan roots the loader is derived from `types`; otherwise the roots are scanned on
    /// disk.
    pub fn from_config(types: Arc<TypeStore>, config: &ReflectionConfig) -> Self {
        let suffix = config.scan.type_suffix.as_str();
        let loader: Arc<dyn ClassLoader> = if config.scan.roots.is_empty() {
            Arc::new(StoreLoader::with_suffix(Arc::clone(&types), suffix))
        } else {
            Arc::new(DirectoryLoader::new(
                Arc::clone(&types),
                config.scan.roots.iter().cloned(),
            ))
        };
        tracing::debug!(
            target: "sdx.reflect",
            roots = config.scan.roots.len(),
            type_suffix = suffix,
            "creating reflector from config"
        );
        Self {
            type_suffix: suffix.to_string(),
            ..Self::new(types, loader, Lookup::from_config(&config.lookup))
        }
    }

    pub fn types(&self) -> &Arc<TypeStore> {
        &self.types
    }

    pub fn lookup(&self) -> Lookup {
        self.lookup.read().clone()
    }

    pub fn set_lookup(&self, lookup: Lookup) {
        tracing::debug!(target: "sdx.reflect", %lookup, "replacing lookup");
        *self.lookup.write() = lookup;
    }

    pub fn loader(&self) -> Arc<dyn ClassLoader> {
        self.loader.read().clone()
    }

    pub fn set_loader(&self, loader: Arc<dyn ClassLoader>) {
        tracing::debug!(target: "sdx.reflect", ?loader, "replacing class loader");
        *self.loader.write() = loader;
    }

    fn class_def(&self, class: ClassId) -> Result<&ClassDef> {
        self.types
            .class(class)
            .ok_or(ReflectionError::UnknownClass(class))
    }

    /// The memoized bypass instantiator for `class`.
    ///
    /// The instantiability policy is checked on every call, hit or miss.
    pub fn get_instantiator(&self, class: ClassId) -> Result<Arc<Instantiator>> {
        let def = self.class_def(class)?;
        self.get_instantiator_named(class, &def.name)
    }

    /// Like [`get_instantiator`](Self::get_instantiator), naming the type `type_name` in errors
    /// (e.g. a generic type's display name).
    pub fn get_instantiator_named(
        &self,
        class: ClassId,
        type_name: &str,
    ) -> Result<Arc<Instantiator>> {
        let def = self.class_def(class)?;
        check_instantiable(def, type_name)?;
        self.instantiators
            .get_or_try_insert(class, || Instantiator::for_class(class, def, type_name))
    }

    /// A handle to the no-argument constructor of `class`, whatever its visibility.
    pub fn get_creator(&self, class: ClassId) -> Result<ConstructorHandle> {
        let def = self.class_def(class)?;
        self.get_creator_named(class, &def.name)
    }

    /// Like [`get_creator`](Self::get_creator), naming the type `type_name` in errors.
    pub fn get_creator_named(&self, class: ClassId, type_name: &str) -> Result<ConstructorHandle> {
        let def = self.class_def(class)?;
        check_instantiable(def, type_name)?;
        let constructor = no_arg_constructor(&self.types, class, type_name)?;
        self.unreflect_constructor(&constructor)
    }

    pub fn unreflect_constructor(&self, constructor: &Constructor) -> Result<ConstructorHandle> {
        invoke::unreflect_constructor(&self.lookup.read(), self.types.as_ref(), constructor)
    }

    pub fn unreflect_getter(&self, field: &Field) -> Result<FieldGetter> {
        invoke::unreflect_getter(&self.lookup.read(), self.types.as_ref(), field)
    }

    pub fn unreflect_setter(&self, field: &Field) -> Result<FieldSetter> {
        invoke::unreflect_setter(&self.lookup.read(), self.types.as_ref(), field)
    }

    pub fn unreflect(&self, method: &Method) -> Result<MethodHandle> {
        invoke::unreflect_method(&self.lookup.read(), self.types.as_ref(), method)
    }

    pub fn invoke_creator(&self, creator: &ConstructorHandle, args: Vec<Value>) -> Result<Value> {
        invoke::invoke_creator(creator, args)
    }

    pub fn invoke_getter(&self, getter: &FieldGetter, instance: &dyn Any) -> Result<Value> {
        invoke::invoke_getter(getter, instance)
    }

    pub fn invoke_setter(
        &self,
        setter: &FieldSetter,
        instance: &mut dyn Any,
        value: Value,
    ) -> Result<()> {
        invoke::invoke_setter(setter, instance, value)
    }

    pub fn invoke(
        &self,
        handle: &MethodHandle,
        instance: &mut dyn Any,
        args: Vec<Value>,
    ) -> Result<Value> {
        invoke::invoke(handle, instance, args)
    }

    pub fn invoke_static(&self, handle: &MethodHandle, args: Vec<Value>) -> Result<Value> {
        invoke::invoke_static(handle, args)
    }

    pub fn invoke_with_arguments(
        &self,
        handle: &MethodHandle,
        instance: &mut dyn Any,
        args: Vec<Value>,
    ) -> Result<Value> {
        invoke::invoke_with_arguments(handle, instance, args)
    }

    /// Instantiable subtypes of `supertype` found below the package `root` (`""` for all).
    ///
    /// The iterator keeps using the loader that was current when it was created.
    pub fn scan_instantiable_subtypes(
        &self,
        root: &str,
        supertype: ClassId,
    ) -> InstantiableSubtypes {
        InstantiableSubtypes::new(
            self.loader(),
            Arc::clone(&self.types),
            root,
            supertype,
            &self.type_suffix,
        )
    }

    /// The type bound to parameter `index` of `ancestor` by the runtime class of `instance`.
    pub fn resolve_binding(
        &self,
        instance: &dyn Any,
        ancestor: ClassId,
        index: usize,
    ) -> Result<Type> {
        let leaf = self
            .types
            .class_of(instance)
            .ok_or_else(|| ReflectionError::UnregisteredType(instance.type_id()))?;
        self.resolve_binding_of(leaf, ancestor, index)
    }

    /// Like [`resolve_binding`](Self::resolve_binding), naming the ancestor by binary name.
    pub fn resolve_binding_named(
        &self,
        instance: &dyn Any,
        ancestor: &str,
        index: usize,
    ) -> Result<Type> {
        let ancestor = self
            .types
            .class_id(ancestor)
            .ok_or_else(|| ReflectionError::ClassNotFound(ancestor.to_string()))?;
        self.resolve_binding(instance, ancestor, index)
    }

    pub fn resolve_binding_of(
        &self,
        leaf: ClassId,
        ancestor: ClassId,
        index: usize,
    ) -> Result<Type> {
        resolve_type_argument(self.types.as_ref(), leaf, ancestor, index)
    }

    pub fn unchecked_cast<T: Any>(&self, value: Value) -> Result<T> {
        invoke::unchecked_cast(value)
    }
}

impl std::fmt::Debug for Reflector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reflector")
            .field("classes", &self.types.len())
            .field("lookup", &*self.lookup.read())
            .field("type_suffix", &self.type_suffix)
            .field("instantiators", &self.instantiators)
            .finish_non_exhaustive()
    }
}
