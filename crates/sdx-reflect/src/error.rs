use std::any::TypeId;

use sdx_types::ClassId;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ReflectionError {
    /// The type fails the instantiability policy or lacks the constructor a strategy needs.
    #[error("{0}")]
    NotInstantiable(String),

    /// The requested ancestor is not a supertype of the leaf at all.
    #[error("Class {leaf} must specify type {parameter} of {ancestor}")]
    MissingAncestor {
        leaf: String,
        ancestor: String,
        parameter: String,
    },

    /// The ancestor was reached but no path binds the requested parameter.
    #[error("Class {leaf} must specify type {parameter} of {ancestor}")]
    UnresolvedBinding {
        leaf: String,
        ancestor: String,
        parameter: String,
    },

    #[error("type parameter index {index} is out of bounds for {ancestor}, which declares {count}")]
    ParameterIndexOutOfBounds {
        ancestor: String,
        index: usize,
        count: usize,
    },

    #[error("values of {0:?} are not bound to a registered class")]
    UnregisteredType(TypeId),

    #[error("class #{} is not registered", .0.to_raw())]
    UnknownClass(ClassId),

    #[error("class {0} is not registered")]
    ClassNotFound(String),

    #[error("{member} is not accessible from {lookup}")]
    Access { member: String, lookup: String },

    /// A handle failed structurally at call time. Always a defect, never a user error.
    #[error("internal invocation failure: {0}")]
    InternalInvocation(String),

    /// Unchecked failure raised by a member body, propagated unchanged.
    #[error("{0}")]
    Runtime(String),
}

pub type Result<T, E = ReflectionError> = std::result::Result<T, E>;
