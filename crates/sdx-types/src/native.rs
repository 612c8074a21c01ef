//! Native bodies backing executable members.
//!
//! Rust has no runtime reflection, so every constructor, field accessor, method and bypass
//! allocator that should be reachable reflectively is registered as a closure over type-erased
//! values. The typed helpers (`NativeGetter::typed`, `NativeMethod::instance`, ...) take care of
//! the downcasts and report mismatches as [`Thrown::Mismatch`].

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// A type-erased value flowing through reflective calls.
pub type Value = Box<dyn Any + Send>;

/// Failure raised by a native body.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Thrown {
    /// A runtime failure the caller is expected to handle (bad input, violated precondition).
    #[error("{0}")]
    Unchecked(String),
    /// A failure the member declares but reflective callers are not prepared to handle.
    #[error("{0}")]
    Checked(String),
    /// The body was handed a receiver or argument of the wrong type.
    #[error("{0}")]
    Mismatch(String),
}

impl Thrown {
    pub fn unchecked(message: impl Into<String>) -> Self {
        Thrown::Unchecked(message.into())
    }

    pub fn checked(message: impl Into<String>) -> Self {
        Thrown::Checked(message.into())
    }

    pub fn mismatch<T: ?Sized>(what: &str) -> Self {
        Thrown::Mismatch(format!("expected {} for {what}", type_name::<T>()))
    }
}

pub type Outcome<T = Value> = Result<T, Thrown>;

/// Downcast an argument, reporting a [`Thrown::Mismatch`] on failure.
pub fn take_arg<T: Any>(value: Value, what: &str) -> Outcome<T> {
    value
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| Thrown::mismatch::<T>(what))
}

type ConstructorFn = dyn Fn(Vec<Value>) -> Outcome + Send + Sync;
type GetterFn = dyn Fn(&dyn Any) -> Outcome + Send + Sync;
type SetterFn = dyn Fn(&mut dyn Any, Value) -> Outcome<()> + Send + Sync;
type MethodFn = dyn Fn(Option<&mut dyn Any>, Vec<Value>) -> Outcome + Send + Sync;
type AllocatorFn = dyn Fn() -> Value + Send + Sync;

macro_rules! native_body {
    ($(#[$meta:meta])* $name:ident => $fn_ty:ty) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name(Arc<$fn_ty>);

        impl $name {
            /// Returns `true` when both values share the same registered closure.
            pub fn ptr_eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.0, &other.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($name), "(..)"))
            }
        }
    };
}

native_body!(
    /// Constructor body: receives the arguments and returns the new instance.
    NativeConstructor => ConstructorFn
);
native_body!(NativeGetter => GetterFn);
native_body!(NativeSetter => SetterFn);
native_body!(
    /// Method body. The receiver is `None` for static methods.
    NativeMethod => MethodFn
);
native_body!(
    /// Bypass allocator: fabricates an instance without running any constructor body.
    Allocator => AllocatorFn
);

impl NativeConstructor {
    pub fn new(body: impl Fn(Vec<Value>) -> Outcome + Send + Sync + 'static) -> Self {
        Self(Arc::new(body))
    }

    /// A no-argument constructor.
    pub fn nullary<T: Any + Send>(body: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self::new(move |_args| Ok(Box::new(body()) as Value))
    }

    pub fn call(&self, args: Vec<Value>) -> Outcome {
        (self.0)(args)
    }
}

impl NativeGetter {
    pub fn new(body: impl Fn(&dyn Any) -> Outcome + Send + Sync + 'static) -> Self {
        Self(Arc::new(body))
    }

    pub fn typed<T: Any, F: Any + Send>(get: impl Fn(&T) -> F + Send + Sync + 'static) -> Self {
        Self::new(move |receiver| {
            let receiver = receiver
                .downcast_ref::<T>()
                .ok_or_else(|| Thrown::mismatch::<T>("field receiver"))?;
            Ok(Box::new(get(receiver)) as Value)
        })
    }

    pub fn call(&self, receiver: &dyn Any) -> Outcome {
        (self.0)(receiver)
    }
}

impl NativeSetter {
    pub fn new(body: impl Fn(&mut dyn Any, Value) -> Outcome<()> + Send + Sync + 'static) -> Self {
        Self(Arc::new(body))
    }

    pub fn typed<T: Any, F: Any>(set: impl Fn(&mut T, F) + Send + Sync + 'static) -> Self {
        Self::new(move |receiver, value| {
            let receiver = receiver
                .downcast_mut::<T>()
                .ok_or_else(|| Thrown::mismatch::<T>("field receiver"))?;
            let value = take_arg::<F>(value, "field value")?;
            set(receiver, value);
            Ok(())
        })
    }

    pub fn call(&self, receiver: &mut dyn Any, value: Value) -> Outcome<()> {
        (self.0)(receiver, value)
    }
}

impl NativeMethod {
    pub fn new(
        body: impl Fn(Option<&mut dyn Any>, Vec<Value>) -> Outcome + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(body))
    }

    /// An instance method on `T`.
    pub fn instance<T: Any, R: Any + Send>(
        body: impl Fn(&mut T, Vec<Value>) -> Outcome<R> + Send + Sync + 'static,
    ) -> Self {
        Self::new(move |receiver, args| {
            let receiver = receiver
                .and_then(|receiver| receiver.downcast_mut::<T>())
                .ok_or_else(|| Thrown::mismatch::<T>("method receiver"))?;
            Ok(Box::new(body(receiver, args)?) as Value)
        })
    }

    /// A static method; any receiver passed in is ignored.
    pub fn static_fn<R: Any + Send>(
        body: impl Fn(Vec<Value>) -> Outcome<R> + Send + Sync + 'static,
    ) -> Self {
        Self::new(move |_receiver, args| Ok(Box::new(body(args)?) as Value))
    }

    pub fn call(&self, receiver: Option<&mut dyn Any>, args: Vec<Value>) -> Outcome {
        (self.0)(receiver, args)
    }
}

impl Allocator {
    pub fn new<T: Any + Send>(alloc: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self(Arc::new(move || Box::new(alloc()) as Value))
    }

    /// Allocate through `T::default()`, the usual "all fields zeroed" shape.
    pub fn default_of<T: Any + Send + Default>() -> Self {
        Self::new(T::default)
    }

    pub fn allocate(&self) -> Value {
        (self.0)()
    }
}
