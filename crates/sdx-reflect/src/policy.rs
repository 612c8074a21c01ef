//! Which types may be constructed reflectively.

use sdx_types::{ClassDef, ClassKind, Nesting};

use crate::{ReflectionError, Result};

/// The first reason `def` cannot be instantiated, or `None` when it can.
///
/// `type_name` is the name used in the message; callers usually pass the binary name. Checks run
/// in a fixed order so the reported reason is deterministic.
pub fn non_instantiable_reason(def: &ClassDef, type_name: &str) -> Option<String> {
    let reason = if def.kind == ClassKind::Annotation {
        "an annotation"
    } else if def.nesting == Nesting::Anonymous {
        "an anonymous class"
    } else if def.kind == ClassKind::Array {
        "an array class"
    } else if def.kind == ClassKind::Enum {
        "an enum"
    } else if def.hidden {
        "hidden"
    } else if def.is_interface() {
        "an interface"
    } else if def.nesting == Nesting::Local {
        "a local class"
    } else if def.nesting == Nesting::Member && !def.is_static() {
        "a member class"
    } else if def.kind == ClassKind::Primitive {
        "primitive"
    } else if def.is_synthetic() {
        "synthetic"
    } else if !def.type_params.is_empty() {
        "generic"
    } else if def.is_abstract() {
        "an abstract class"
    } else {
        return None;
    };
    Some(format!("Type {type_name} cannot be {reason}"))
}

pub fn check_instantiable(def: &ClassDef, type_name: &str) -> Result<()> {
    match non_instantiable_reason(def, type_name) {
        Some(reason) => Err(ReflectionError::NotInstantiable(reason)),
        None => Ok(()),
    }
}
