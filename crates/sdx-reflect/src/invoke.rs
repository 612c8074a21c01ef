//! Invocation handles and the bridge that calls them.
//!
//! Handles are produced by the `unreflect_*` functions after an access check and can then be
//! invoked any number of times. Structural failures at call time (wrong arity, wrong receiver
//! type, a body that raises a checked failure) surface as
//! [`ReflectionError::InternalInvocation`]; unchecked failures raised by a member body propagate
//! as [`ReflectionError::Runtime`].

use std::any::Any;

use sdx_types::{
    ClassId, Constructor, Field, Method, NativeConstructor, NativeGetter, NativeMethod,
    NativeSetter, Thrown, TypeEnv, Value, Visibility,
};

use crate::{Lookup, ReflectionError, Result};

#[derive(Clone, Debug)]
pub struct ConstructorHandle {
    owner: String,
    arity: usize,
    body: Option<NativeConstructor>,
}

impl ConstructorHandle {
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Whether both handles call the same registered constructor body.
    pub fn same_target(&self, other: &Self) -> bool {
        match (&self.body, &other.body) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FieldGetter {
    field: String,
    body: Option<NativeGetter>,
}

#[derive(Clone, Debug)]
pub struct FieldSetter {
    field: String,
    body: Option<NativeSetter>,
}

#[derive(Clone, Debug)]
pub struct MethodHandle {
    method: String,
    arity: usize,
    is_static: bool,
    is_varargs: bool,
    body: Option<NativeMethod>,
}

impl MethodHandle {
    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_varargs(&self) -> bool {
        self.is_varargs
    }
}

fn owner_name(env: &dyn TypeEnv, owner: ClassId) -> String {
    env.class(owner)
        .map(|def| def.name.clone())
        .unwrap_or_else(|| format!("#{}", owner.to_raw()))
}

fn check_access(
    lookup: &Lookup,
    env: &dyn TypeEnv,
    owner: ClassId,
    visibility: Visibility,
    accessible: bool,
    member: impl FnOnce() -> String,
) -> Result<()> {
    if lookup.can_access(env, owner, visibility, accessible) {
        return Ok(());
    }
    let member = member();
    tracing::debug!(target: "sdx.reflect", %member, %lookup, "access denied");
    Err(ReflectionError::Access {
        member,
        lookup: lookup.to_string(),
    })
}

pub fn unreflect_constructor(
    lookup: &Lookup,
    env: &dyn TypeEnv,
    constructor: &Constructor,
) -> Result<ConstructorHandle> {
    let owner = owner_name(env, constructor.owner());
    check_access(
        lookup,
        env,
        constructor.owner(),
        constructor.visibility(),
        constructor.is_accessible(),
        || format!("{} constructor of {owner}", constructor.visibility().keyword()),
    )?;
    Ok(ConstructorHandle {
        owner,
        arity: constructor.params().len(),
        body: constructor.def().body.clone(),
    })
}

pub fn unreflect_getter(
    lookup: &Lookup,
    env: &dyn TypeEnv,
    field: &Field,
) -> Result<FieldGetter> {
    let name = format!("{}.{}", owner_name(env, field.owner()), field.name());
    check_access(
        lookup,
        env,
        field.owner(),
        field.visibility(),
        field.is_accessible(),
        || format!("{} field {name}", field.visibility().keyword()),
    )?;
    Ok(FieldGetter {
        body: field.def().getter.clone(),
        field: name,
    })
}

pub fn unreflect_setter(
    lookup: &Lookup,
    env: &dyn TypeEnv,
    field: &Field,
) -> Result<FieldSetter> {
    let name = format!("{}.{}", owner_name(env, field.owner()), field.name());
    // Final fields are only writable through an explicitly accessible field object.
    if field.def().is_final() && !field.is_accessible() {
        return Err(ReflectionError::Access {
            member: format!("final field {name}"),
            lookup: lookup.to_string(),
        });
    }
    check_access(
        lookup,
        env,
        field.owner(),
        field.visibility(),
        field.is_accessible(),
        || format!("{} field {name}", field.visibility().keyword()),
    )?;
    Ok(FieldSetter {
        body: field.def().setter.clone(),
        field: name,
    })
}

pub fn unreflect_method(
    lookup: &Lookup,
    env: &dyn TypeEnv,
    method: &Method,
) -> Result<MethodHandle> {
    let name = format!("{}.{}", owner_name(env, method.owner()), method.name());
    check_access(
        lookup,
        env,
        method.owner(),
        method.visibility(),
        method.is_accessible(),
        || format!("{} method {name}", method.visibility().keyword()),
    )?;
    let def = method.def();
    Ok(MethodHandle {
        arity: def.params.len(),
        is_static: def.is_static(),
        is_varargs: def.is_varargs() && !def.params.is_empty(),
        body: def.body.clone(),
        method: name,
    })
}

fn failure(member: &str, thrown: Thrown) -> ReflectionError {
    match thrown {
        Thrown::Unchecked(message) => ReflectionError::Runtime(message),
        Thrown::Checked(message) | Thrown::Mismatch(message) => {
            ReflectionError::InternalInvocation(format!("{member}: {message}"))
        }
    }
}

fn missing_body(member: &str) -> ReflectionError {
    ReflectionError::InternalInvocation(format!("{member} has no registered body"))
}

fn check_arity(member: &str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        return Ok(());
    }
    Err(ReflectionError::InternalInvocation(format!(
        "{member} expects {expected} argument(s) but got {actual}"
    )))
}

pub fn invoke_creator(handle: &ConstructorHandle, args: Vec<Value>) -> Result<Value> {
    let member = format!("constructor of {}", handle.owner);
    check_arity(&member, handle.arity, args.len())?;
    let body = handle.body.as_ref().ok_or_else(|| missing_body(&member))?;
    body.call(args).map_err(|thrown| failure(&member, thrown))
}

pub fn invoke_getter(getter: &FieldGetter, instance: &dyn Any) -> Result<Value> {
    let body = getter.body.as_ref().ok_or_else(|| missing_body(&getter.field))?;
    body.call(instance).map_err(|thrown| failure(&getter.field, thrown))
}

pub fn invoke_setter(setter: &FieldSetter, instance: &mut dyn Any, value: Value) -> Result<()> {
    let body = setter.body.as_ref().ok_or_else(|| missing_body(&setter.field))?;
    body.call(instance, value)
        .map_err(|thrown| failure(&setter.field, thrown))
}

/// Call an instance method with exactly `handle.arity()` arguments.
pub fn invoke(handle: &MethodHandle, instance: &mut dyn Any, args: Vec<Value>) -> Result<Value> {
    if handle.is_static {
        return Err(ReflectionError::InternalInvocation(format!(
            "static method {} invoked on an instance",
            handle.method
        )));
    }
    call_method(handle, Some(instance), args)
}

pub fn invoke_static(handle: &MethodHandle, args: Vec<Value>) -> Result<Value> {
    if !handle.is_static {
        return Err(ReflectionError::InternalInvocation(format!(
            "instance method {} invoked without a receiver",
            handle.method
        )));
    }
    call_method(handle, None, args)
}

/// Like [`invoke`], but a varargs method receives its trailing arguments collected into one
/// `Vec<Value>`.
///
/// When exactly `arity` arguments are passed and the last one already is a `Vec<Value>`, it is
/// passed through unchanged.
pub fn invoke_with_arguments(
    handle: &MethodHandle,
    instance: &mut dyn Any,
    args: Vec<Value>,
) -> Result<Value> {
    let args = spread_arguments(handle, args)?;
    invoke(handle, instance, args)
}

fn spread_arguments(handle: &MethodHandle, mut args: Vec<Value>) -> Result<Vec<Value>> {
    if !handle.is_varargs {
        return Ok(args);
    }
    if args.len() == handle.arity && args.last().is_some_and(|last| (**last).is::<Vec<Value>>()) {
        return Ok(args);
    }

    let fixed = handle.arity - 1;
    if args.len() < fixed {
        return Err(ReflectionError::InternalInvocation(format!(
            "{} expects at least {fixed} argument(s) but got {}",
            handle.method,
            args.len()
        )));
    }
    let trailing = args.split_off(fixed);
    args.push(Box::new(trailing));
    Ok(args)
}

fn call_method(
    handle: &MethodHandle,
    receiver: Option<&mut dyn Any>,
    args: Vec<Value>,
) -> Result<Value> {
    check_arity(&handle.method, handle.arity, args.len())?;
    let body = handle
        .body
        .as_ref()
        .ok_or_else(|| missing_body(&handle.method))?;
    body.call(receiver, args)
        .map_err(|thrown| failure(&handle.method, thrown))
}

/// Downcast a value returned by a reflective call.
pub fn unchecked_cast<T: Any>(value: Value) -> Result<T> {
    value.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
        ReflectionError::InternalInvocation(format!(
            "value is not a {}",
            std::any::type_name::<T>()
        ))
    })
}
