use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::{
    ClassDef, ClassId, ClassKind, Constructor, Field, Method, PrimitiveType, Type, TypeEnv,
    TypeParamDef, TypeVarId,
};

/// Append-only registry of class descriptors.
///
/// Build it mutably during start-up, then share it read-only (usually as `Arc<TypeStore>`).
/// Class ids are stable: re-defining a class keeps its id.
#[derive(Clone, Debug, Default)]
pub struct TypeStore {
    classes: Vec<ClassDef>,
    class_by_name: HashMap<String, ClassId>,
    type_params: Vec<TypeParamDef>,
    natives: HashMap<TypeId, ClassId>,
}

impl TypeStore {
    /// Reserve an id for `name`, creating an empty placeholder class if it is not known yet.
    ///
    /// Useful for self-referential or mutually-referential hierarchies: intern first, then
    /// [`define_class`](Self::define_class) once all ids exist.
    pub fn intern_class_id(&mut self, name: &str) -> ClassId {
        if let Some(id) = self.class_by_name.get(name) {
            return *id;
        }
        let id = self.next_class_id();
        self.classes.push(ClassDef::new(name, ClassKind::Class));
        self.class_by_name.insert(name.to_string(), id);
        id
    }

    /// Replace the definition behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not handed out by this store.
    pub fn define_class(&mut self, id: ClassId, def: ClassDef) {
        let slot = &mut self.classes[id.index()];
        if slot.name != def.name {
            self.class_by_name.remove(&slot.name);
            self.class_by_name.insert(def.name.clone(), id);
        }
        *slot = def;
    }

    /// Insert or overwrite the class named `def.name`.
    pub fn add_class(&mut self, def: ClassDef) -> ClassId {
        let id = self.intern_class_id(&def.name);
        self.define_class(id, def);
        id
    }

    pub fn add_type_param(
        &mut self,
        name: impl Into<String>,
        upper_bounds: Vec<Type>,
    ) -> TypeVarId {
        let id = TypeVarId::from_raw(
            self.type_params
                .len()
                .try_into()
                .expect("too many type parameters"),
        );
        self.type_params.push(TypeParamDef {
            name: name.into(),
            upper_bounds,
        });
        id
    }

    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.class_by_name.get(name).copied()
    }

    pub fn class_name(&self, id: ClassId) -> Option<&str> {
        self.class(id).map(|def| def.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter_classes(&self) -> impl Iterator<Item = (ClassId, &ClassDef)> + '_ {
        self.classes
            .iter()
            .enumerate()
            .map(|(idx, def)| (ClassId::from_raw(idx as u32), def))
    }

    /// The class descriptor for a primitive type (`int`, `boolean`, ...).
    pub fn primitive_class(&mut self, primitive: PrimitiveType) -> ClassId {
        if let Some(id) = self.class_id(primitive.name()) {
            return id;
        }
        self.add_class(ClassDef::new(primitive.name(), ClassKind::Primitive))
    }

    /// The array class whose component type is `component`, named like the JVM does
    /// (`[I`, `[Ljava.lang.String;`, `[[D`).
    pub fn array_class(&mut self, component: &Type) -> Option<ClassId> {
        let name = format!("[{}", self.descriptor_name(component)?);
        if let Some(id) = self.class_id(&name) {
            return Some(id);
        }
        Some(self.add_class(ClassDef::new(name, ClassKind::Array)))
    }

    fn descriptor_name(&self, ty: &Type) -> Option<String> {
        match ty {
            Type::Primitive(primitive) => Some(primitive.descriptor().to_string()),
            Type::Class(class) => Some(format!("L{};", self.class_name(class.def)?)),
            Type::Array(component) => Some(format!("[{}", self.descriptor_name(component)?)),
            Type::TypeVar(_) | Type::Wildcard(_) => None,
        }
    }

    /// Associate the Rust type `T` with the (erased) class `id`.
    ///
    /// Values of type `T` handed to reflective operations are then recognized as instances of
    /// that class. Several Rust types may map to the same class, e.g. every instantiation of a
    /// generic struct.
    pub fn bind_native<T: Any>(&mut self, id: ClassId) {
        self.natives.insert(TypeId::of::<T>(), id);
    }

    pub fn native_class(&self, type_id: TypeId) -> Option<ClassId> {
        self.natives.get(&type_id).copied()
    }

    /// Runtime class of `value`, if its Rust type was bound with
    /// [`bind_native`](Self::bind_native).
    pub fn class_of(&self, value: &dyn Any) -> Option<ClassId> {
        self.native_class(value.type_id())
    }

    pub fn declared_field(&self, class: ClassId, name: &str) -> Option<Field> {
        let def = self.class(class)?;
        let field = def.fields.iter().find(|field| field.name == name)?;
        Some(Field::new(class, field.clone()))
    }

    /// The declared constructor taking exactly `params`.
    pub fn declared_constructor(&self, class: ClassId, params: &[Type]) -> Option<Constructor> {
        let def = self.class(class)?;
        let ctor = def.constructors.iter().find(|ctor| ctor.params == params)?;
        Some(Constructor::new(class, ctor.clone()))
    }

    /// The declared method called `name` taking exactly `params`.
    pub fn declared_method(&self, class: ClassId, name: &str, params: &[Type]) -> Option<Method> {
        let def = self.class(class)?;
        let method = def
            .methods
            .iter()
            .find(|method| method.name == name && method.params == params)?;
        Some(Method::new(class, method.clone()))
    }

    fn next_class_id(&self) -> ClassId {
        ClassId::from_raw(self.classes.len().try_into().expect("too many classes"))
    }
}

impl TypeEnv for TypeStore {
    fn class(&self, id: ClassId) -> Option<&ClassDef> {
        self.classes.get(id.index())
    }

    fn type_param(&self, id: TypeVarId) -> Option<&TypeParamDef> {
        self.type_params.get(id.to_raw() as usize)
    }

    fn lookup_class(&self, name: &str) -> Option<ClassId> {
        self.class_id(name)
    }
}
