//! Reflective construction, invocation and generic-argument resolution over an `sdx-types`
//! [`TypeStore`](sdx_types::TypeStore).
//!
//! Most callers only need a [`Reflector`]:
//!
//! * [`Reflector::resolve_binding`] recovers the concrete type an object's class binds to a
//!   generic parameter of one of its ancestors.
//! * [`Reflector::get_instantiator`] and [`Reflector::get_creator`] construct instances, either
//!   bypassing constructors or through the no-argument constructor.
//! * The `unreflect_*` / `invoke_*` pairs turn fields and methods into handles and call them.
//! * [`Reflector::scan_instantiable_subtypes`] discovers concrete implementations of a type.

#![forbid(unsafe_code)]

mod construct;
mod error;
pub mod hierarchy;
mod invoke;
mod lookup;
pub mod policy;
mod reflector;
mod scan;

pub use crate::construct::Instantiator;
pub use crate::error::{ReflectionError, Result};
pub use crate::hierarchy::resolve_type_argument;
pub use crate::invoke::{ConstructorHandle, FieldGetter, FieldSetter, MethodHandle};
pub use crate::lookup::{Lookup, LookupMode};
pub use crate::policy::{check_instantiable, non_instantiable_reason};
pub use crate::reflector::Reflector;
pub use crate::scan::InstantiableSubtypes;
