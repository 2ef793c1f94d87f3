//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Type handles: registry identities for concrete runtime types.

use std::any::{Any, TypeId};
use std::hash::{Hash, Hasher};

/// An opaque identity for a concrete runtime type.
///
/// A handle pairs the type's [`TypeId`] with the name it registers under, an
/// optional declared wire identifier, and an explicit ordered list of parent
/// types. Parents are captured here, at registration time; codec lookup
/// walks this list in declaration order and never inspects types at runtime.
///
/// # Example
///
/// ```rust
/// use tagwire::registry::TypeHandle;
///
/// struct Event;
/// struct UserCreated;
///
/// let handle = TypeHandle::of::<UserCreated>()
///     .named("users.UserCreated")
///     .extends::<Event>();
/// assert_eq!(handle.name(), "users.UserCreated");
/// ```
#[derive(Debug, Clone)]
pub struct TypeHandle {
    type_id: TypeId,
    name: String,
    declared_id: Option<u32>,
    parents: Vec<TypeId>,
}

impl TypeHandle {
    /// Creates a handle for `T` with its Rust type path as the name, no
    /// declared identifier and no parents.
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>().to_string(),
            declared_id: None,
            parents: Vec::new(),
        }
    }

    /// Replaces the registered name.
    ///
    /// The name is written on the wire for types registered without an
    /// identifier, so it must match on both ends.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Declares a preferred wire identifier, used when the type is
    /// registered without an explicit one.
    #[must_use]
    pub fn with_id(mut self, id: u32) -> Self {
        self.declared_id = Some(id);
        self
    }

    /// Appends `P` to the ordered parent list.
    ///
    /// Lookup falls back to parents in the order they were declared.
    #[must_use]
    pub fn extends<P: Any>(mut self) -> Self {
        self.parents.push(TypeId::of::<P>());
        self
    }

    /// The underlying [`TypeId`].
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared wire identifier, if any.
    #[must_use]
    pub fn declared_id(&self) -> Option<u32> {
        self.declared_id
    }

    /// The ordered parent list.
    #[must_use]
    pub fn parents(&self) -> &[TypeId] {
        &self.parents
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeHandle {}

impl Hash for TypeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}
