//! Reflective member objects.
//!
//! Each lookup through [`TypeStore`](crate::TypeStore) returns a fresh object with its own
//! `accessible` flag, so suppressing access checks on one `Field` never leaks into another caller's
//! copy of the same member.

use crate::{ClassId, ConstructorDef, FieldDef, MethodDef, Type, Visibility};

#[derive(Clone, Debug)]
pub struct Field {
    owner: ClassId,
    def: FieldDef,
    accessible: bool,
}

impl Field {
    pub(crate) fn new(owner: ClassId, def: FieldDef) -> Self {
        Self {
            owner,
            def,
            accessible: false,
        }
    }

    pub fn owner(&self) -> ClassId {
        self.owner
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn ty(&self) -> &Type {
        &self.def.ty
    }

    pub fn def(&self) -> &FieldDef {
        &self.def
    }

    pub fn visibility(&self) -> Visibility {
        Visibility::from_flags(self.def.access_flags)
    }

    pub fn is_accessible(&self) -> bool {
        self.accessible
    }

    /// Suppress (or restore) access checks for this object.
    pub fn set_accessible(&mut self, accessible: bool) {
        self.accessible = accessible;
    }
}

#[derive(Clone, Debug)]
pub struct Constructor {
    owner: ClassId,
    def: ConstructorDef,
    accessible: bool,
}

impl Constructor {
    pub(crate) fn new(owner: ClassId, def: ConstructorDef) -> Self {
        Self {
            owner,
            def,
            accessible: false,
        }
    }

    pub fn owner(&self) -> ClassId {
        self.owner
    }

    pub fn params(&self) -> &[Type] {
        &self.def.params
    }

    pub fn def(&self) -> &ConstructorDef {
        &self.def
    }

    pub fn visibility(&self) -> Visibility {
        Visibility::from_flags(self.def.access_flags)
    }

    pub fn is_accessible(&self) -> bool {
        self.accessible
    }

    pub fn set_accessible(&mut self, accessible: bool) {
        self.accessible = accessible;
    }
}

#[derive(Clone, Debug)]
pub struct Method {
    owner: ClassId,
    def: MethodDef,
    accessible: bool,
}

impl Method {
    pub(crate) fn new(owner: ClassId, def: MethodDef) -> Self {
        Self {
            owner,
            def,
            accessible: false,
        }
    }

    pub fn owner(&self) -> ClassId {
        self.owner
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn def(&self) -> &MethodDef {
        &self.def
    }

    pub fn visibility(&self) -> Visibility {
        Visibility::from_flags(self.def.access_flags)
    }

    pub fn is_accessible(&self) -> bool {
        self.accessible
    }

    pub fn set_accessible(&mut self, accessible: bool) {
        self.accessible = accessible;
    }
}
