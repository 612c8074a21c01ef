//! Type descriptors for the sdx reflection toolkit.
//!
//! Rust erases generic arguments just like the JVM does, and offers no runtime reflection on top
//! of that. This crate is the explicit replacement: applications register class descriptors
//! (`ClassDef`) into a [`TypeStore`] at start-up, bind their Rust types to those descriptors, and
//! then freeze the store behind an `Arc`. Everything downstream (`sdx-reflect`) treats the store as
//! read-only host metadata.

#![forbid(unsafe_code)]

mod access;
mod members;
mod native;
mod store;

use std::collections::{HashSet, VecDeque};
use std::fmt;

pub use crate::access::{
    Visibility, ACC_ABSTRACT, ACC_ANNOTATION, ACC_ENUM, ACC_FINAL, ACC_INTERFACE, ACC_PRIVATE,
    ACC_PROTECTED, ACC_PUBLIC, ACC_STATIC, ACC_SYNTHETIC, ACC_VARARGS,
};
pub use crate::members::{Constructor, Field, Method};
pub use crate::native::{
    take_arg, Allocator, NativeConstructor, NativeGetter, NativeMethod, NativeSetter, Outcome,
    Thrown, Value,
};
pub use crate::store::TypeStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn to_raw(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVarId(u32);

impl TypeVarId {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn to_raw(self) -> u32 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Char => "char",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    /// Descriptor character used in array class names (`[I`, `[J`, ...).
    pub fn descriptor(self) -> char {
        match self {
            PrimitiveType::Boolean => 'Z',
            PrimitiveType::Byte => 'B',
            PrimitiveType::Short => 'S',
            PrimitiveType::Char => 'C',
            PrimitiveType::Int => 'I',
            PrimitiveType::Long => 'J',
            PrimitiveType::Float => 'F',
            PrimitiveType::Double => 'D',
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum WildcardBound {
    Unbounded,
    Extends(Box<Type>),
    Super(Box<Type>),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClassType {
    pub def: ClassId,
    pub args: Vec<Type>,
}

/// A (possibly generic) type reference as it appears in a class's declared signature.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Class(ClassType),
    TypeVar(TypeVarId),
    Array(Box<Type>),
    Primitive(PrimitiveType),
    Wildcard(WildcardBound),
}

impl Type {
    pub fn class(def: ClassId, args: Vec<Type>) -> Self {
        Type::Class(ClassType { def, args })
    }

    /// A class reference without type arguments.
    pub fn raw(def: ClassId) -> Self {
        Type::class(def, Vec::new())
    }

    pub fn class_id(&self) -> Option<ClassId> {
        match self {
            Type::Class(ClassType { def, .. }) => Some(*def),
            _ => None,
        }
    }

    pub fn is_type_var(&self) -> bool {
        matches!(self, Type::TypeVar(_))
    }

    /// Render the type with binary names, e.g. `java.util.Map<K, java.lang.String>`.
    pub fn display<'a>(&'a self, env: &'a dyn TypeEnv) -> TypeDisplay<'a> {
        TypeDisplay { ty: self, env }
    }
}

pub struct TypeDisplay<'a> {
    ty: &'a Type,
    env: &'a dyn TypeEnv,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            Type::Class(ClassType { def, args }) => {
                match self.env.class(*def) {
                    Some(class) => f.write_str(&class.name)?,
                    None => write!(f, "<class#{}>", def.to_raw())?,
                }
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (idx, arg) in args.iter().enumerate() {
                        if idx > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", arg.display(self.env))?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            Type::TypeVar(id) => match self.env.type_param(*id) {
                Some(param) => f.write_str(&param.name),
                None => write!(f, "<tv#{}>", id.to_raw()),
            },
            Type::Array(component) => write!(f, "{}[]", component.display(self.env)),
            Type::Primitive(primitive) => f.write_str(primitive.name()),
            Type::Wildcard(WildcardBound::Unbounded) => f.write_str("?"),
            Type::Wildcard(WildcardBound::Extends(bound)) => {
                write!(f, "? extends {}", bound.display(self.env))
            }
            Type::Wildcard(WildcardBound::Super(bound)) => {
                write!(f, "? super {}", bound.display(self.env))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeParamDef {
    pub name: String,
    pub upper_bounds: Vec<Type>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
    Annotation,
    Enum,
    Array,
    Primitive,
}

/// Where a class is declared relative to other classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Nesting {
    TopLevel,
    /// Declared directly inside another class; `static` nested classes carry `ACC_STATIC`.
    Member,
    /// Declared inside a method body.
    Local,
    Anonymous,
}

#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: String,
    pub ty: Type,
    pub access_flags: u16,
    pub getter: Option<NativeGetter>,
    pub setter: Option<NativeSetter>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: Type, access_flags: u16) -> Self {
        Self {
            name: name.into(),
            ty,
            access_flags,
            getter: None,
            setter: None,
        }
    }

    pub fn is_static(&self) -> bool {
        self.access_flags & ACC_STATIC != 0
    }

    pub fn is_final(&self) -> bool {
        self.access_flags & ACC_FINAL != 0
    }
}

#[derive(Clone, Debug)]
pub struct ConstructorDef {
    pub params: Vec<Type>,
    pub access_flags: u16,
    pub body: Option<NativeConstructor>,
}

#[derive(Clone, Debug)]
pub struct MethodDef {
    pub name: String,
    pub params: Vec<Type>,
    pub return_type: Option<Type>,
    pub access_flags: u16,
    pub body: Option<NativeMethod>,
}

impl MethodDef {
    pub fn is_static(&self) -> bool {
        self.access_flags & ACC_STATIC != 0
    }

    pub fn is_varargs(&self) -> bool {
        self.access_flags & ACC_VARARGS != 0
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags & ACC_ABSTRACT != 0
    }
}

/// Descriptor of a class, interface, enum, annotation, array class or primitive type.
#[derive(Clone, Debug)]
pub struct ClassDef {
    /// Binary name, e.g. `com.example.Outer$Inner`.
    pub name: String,
    pub kind: ClassKind,
    pub access_flags: u16,
    pub nesting: Nesting,
    /// Classes defined at runtime that cannot be referenced by name from other classes.
    pub hidden: bool,
    pub type_params: Vec<TypeVarId>,
    pub super_class: Option<Type>,
    /// Superinterfaces in declaration order.
    pub interfaces: Vec<Type>,
    pub fields: Vec<FieldDef>,
    pub constructors: Vec<ConstructorDef>,
    pub methods: Vec<MethodDef>,
    pub allocator: Option<Allocator>,
}

impl ClassDef {
    /// A public top-level class with no supertypes and no members.
    pub fn new(name: impl Into<String>, kind: ClassKind) -> Self {
        let mut access_flags = ACC_PUBLIC;
        match kind {
            ClassKind::Interface => access_flags |= ACC_INTERFACE | ACC_ABSTRACT,
            ClassKind::Annotation => {
                access_flags |= ACC_INTERFACE | ACC_ABSTRACT | ACC_ANNOTATION
            }
            ClassKind::Enum => access_flags |= ACC_ENUM | ACC_FINAL,
            ClassKind::Array | ClassKind::Primitive => access_flags |= ACC_FINAL | ACC_ABSTRACT,
            ClassKind::Class => {}
        }
        Self {
            name: name.into(),
            kind,
            access_flags,
            nesting: Nesting::TopLevel,
            hidden: false,
            type_params: Vec::new(),
            super_class: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            allocator: None,
        }
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.kind, ClassKind::Interface | ClassKind::Annotation)
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags & ACC_ABSTRACT != 0
    }

    pub fn is_public(&self) -> bool {
        self.access_flags & ACC_PUBLIC != 0
    }

    pub fn is_static(&self) -> bool {
        self.access_flags & ACC_STATIC != 0
    }

    pub fn is_synthetic(&self) -> bool {
        self.access_flags & ACC_SYNTHETIC != 0
    }

    /// Package portion of the binary name (empty for the unnamed package).
    pub fn package(&self) -> &str {
        package_name(&self.name)
    }

    pub fn top_level_name(&self) -> &str {
        top_level_name(&self.name)
    }
}

/// Package of a binary class name: `com.example.Foo$Bar` -> `com.example`.
pub fn package_name(binary_name: &str) -> &str {
    binary_name
        .rsplit_once('.')
        .map(|(pkg, _)| pkg)
        .unwrap_or("")
}

/// Outermost enclosing class of a binary name: `com.example.Foo$Bar` -> `com.example.Foo`.
pub fn top_level_name(binary_name: &str) -> &str {
    let simple_start = binary_name.rfind('.').map(|idx| idx + 1).unwrap_or(0);
    match binary_name[simple_start..].find('$') {
        Some(offset) => &binary_name[..simple_start + offset],
        None => binary_name,
    }
}

/// Read access to class and type parameter descriptors.
pub trait TypeEnv {
    fn class(&self, id: ClassId) -> Option<&ClassDef>;
    fn type_param(&self, id: TypeVarId) -> Option<&TypeParamDef>;
    fn lookup_class(&self, name: &str) -> Option<ClassId>;
}

/// Returns `true` when `sub` is `sup` or (transitively) extends or implements it.
///
/// Type arguments are ignored; this answers the erased `isAssignableFrom` question.
pub fn is_subclass(env: &dyn TypeEnv, sub: ClassId, sup: ClassId) -> bool {
    let mut queue = VecDeque::from([sub]);
    let mut seen = HashSet::new();
    while let Some(current) = queue.pop_front() {
        if current == sup {
            return true;
        }
        if !seen.insert(current) {
            continue;
        }
        let Some(def) = env.class(current) else {
            continue;
        };
        queue.extend(def.super_class.iter().filter_map(Type::class_id));
        queue.extend(def.interfaces.iter().filter_map(Type::class_id));
    }
    false
}
