//! Type identities used to bind runners and key the cache

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Stable identity of a Rust type plus its name for diagnostics
///
/// Equality and hashing only consider the `TypeId`; the name is informational.
#[derive(Debug, Clone, Copy)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
}

impl TypeDescriptor {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The (context, result) type pair a runner is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    pub context: TypeDescriptor,
    pub result: TypeDescriptor,
}

impl Signature {
    pub fn of<C: ?Sized + 'static, R: ?Sized + 'static>() -> Self {
        Self {
            context: TypeDescriptor::of::<C>(),
            result: TypeDescriptor::of::<R>(),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) -> {}", self.context, self.result)
    }
}
