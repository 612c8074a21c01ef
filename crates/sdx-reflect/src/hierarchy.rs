//! Recovering erased generic arguments from a class's declared ancestry.
//!
//! Resolution walks the supertype graph of a leaf class depth-first with an explicit stack. Every
//! node on the stack is a supertype of the node directly beneath it, so once the requested
//! ancestor shows up as a candidate the stack itself is the chain used to substitute type
//! variables back towards the leaf.
//!
//! Shared ancestors reached through several interfaces (diamonds) are visited once per path: each
//! path may bind the parameter differently, and the first path that binds it wins. Candidates are
//! visited superclass first, then interfaces in declaration order.

use sdx_types::{ClassDef, ClassId, Type, TypeEnv};

use crate::{ReflectionError, Result};

/// One frame of the traversal.
struct Node<'a> {
    def: &'a ClassDef,
    /// Candidates visited so far. The first candidate is the superclass, the rest are the
    /// interfaces.
    visited: usize,
}

impl<'a> Node<'a> {
    fn new(def: &'a ClassDef) -> Self {
        Self {
            def,
            visited: 0,
        }
    }

    fn move_to_next(&mut self) -> bool {
        self.visited += 1;
        self.visited <= 1 + self.def.interfaces.len()
    }

    /// The generic supertype currently being visited.
    fn current(&self) -> Option<&'a Type> {
        match self.visited {
            0 => None,
            1 => self.def.super_class.as_ref(),
            n => self.def.interfaces.get(n - 2),
        }
    }
}

/// Resolve the type bound to parameter `index` of `ancestor` along the ancestry of `leaf`.
///
/// Returns the bound type exactly as written in the binding supertype (a class type, array,
/// primitive or wildcard; never a type variable).
pub fn resolve_type_argument(
    env: &dyn TypeEnv,
    leaf: ClassId,
    ancestor: ClassId,
    index: usize,
) -> Result<Type> {
    let leaf_def = env.class(leaf).ok_or(ReflectionError::UnknownClass(leaf))?;
    let ancestor_def = env
        .class(ancestor)
        .ok_or(ReflectionError::UnknownClass(ancestor))?;
    let Some(&parameter) = ancestor_def.type_params.get(index) else {
        return Err(ReflectionError::ParameterIndexOutOfBounds {
            ancestor: ancestor_def.name.clone(),
            index,
            count: ancestor_def.type_params.len(),
        });
    };

    let mut reached = false;
    let mut stack = vec![Node::new(leaf_def)];
    while let Some(node) = stack.last_mut() {
        if !node.move_to_next() {
            stack.pop();
            continue;
        }
        let Some(class) = node.current().and_then(Type::class_id) else {
            continue;
        };

        if class == ancestor {
            reached = true;
            if let Some(ty) = substitute(&stack, index) {
                tracing::trace!(
                    target: "sdx.reflect",
                    leaf = %leaf_def.name,
                    ancestor = %ancestor_def.name,
                    index,
                    depth = stack.len(),
                    "resolved type argument"
                );
                return Ok(ty);
            }
            tracing::trace!(
                target: "sdx.reflect",
                leaf = %leaf_def.name,
                ancestor = %ancestor_def.name,
                via = %stack.last().map(|node| node.def.name.as_str()).unwrap_or_default(),
                "path leaves the type argument unbound"
            );
            continue;
        }

        match env.class(class) {
            Some(def) => stack.push(Node::new(def)),
            None => tracing::debug!(
                target: "sdx.reflect",
                class = class.to_raw(),
                "skipping unregistered supertype"
            ),
        }
    }

    let parameter = env
        .type_param(parameter)
        .map(|param| param.name.clone())
        .unwrap_or_else(|| format!("#{index}"));
    let leaf = leaf_def.name.clone();
    let ancestor = ancestor_def.name.clone();
    Err(if reached {
        ReflectionError::UnresolvedBinding {
            leaf,
            ancestor,
            parameter,
        }
    } else {
        ReflectionError::MissingAncestor {
            leaf,
            ancestor,
            parameter,
        }
    })
}

/// Follow argument `index` of the top node's current supertype down the stack until it is bound.
fn substitute(chain: &[Node<'_>], mut index: usize) -> Option<Type> {
    for node in chain.iter().rev() {
        // Raw supertypes carry no arguments and cannot bind anything.
        let Type::Class(supertype) = node.current()? else {
            return None;
        };
        match supertype.args.get(index)? {
            Type::TypeVar(var) => {
                index = node.def.type_params.iter().position(|param| param == var)?;
            }
            bound => return Some(bound.clone()),
        }
    }
    None
}
