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

//! The type registry: the authoritative map between types, wire identifiers
//! and codec factories.
//!
//! A [`TypeRegistry`] owns three consistent indices: by type, by wire
//! identifier and by registered name. Types registered with an identifier
//! are framed by that identifier on the wire; types registered with a codec
//! but no identifier are framed by their registered name. Identifiers
//! 128–255 are reserved and rejected.
//!
//! Registration is not thread-safe: configure a registry at startup and
//! freeze it by convention. Engines deep-copy the registry on
//! [`fork`](crate::Engine::fork), so later mutation of one copy never leaks
//! into another.

mod error;
mod handle;
pub mod resolver;

pub use error::{RegistryError, RESERVED_ID_MAX, RESERVED_ID_MIN};
pub use handle::TypeHandle;

use crate::codec::{wireable_factory, CodecFactory, Wireable};
use resolver::{PrimitiveResolver, StandardResolver, TypeResolver};
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// First identifier handed out by automatic assignment, one past the
/// reserved range.
const AUTO_ID_START: u32 = 256;

/// A registered binding: the type's handle plus its optional identifier and
/// codec factory.
#[derive(Clone)]
struct RegistryEntry {
    handle: TypeHandle,
    wire_id: Option<u32>,
    factory: Option<CodecFactory>,
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("handle", &self.handle)
            .field("wire_id", &self.wire_id)
            .field("factory", &self.factory.as_ref().map(|_| "<codec factory>"))
            .finish()
    }
}

/// The binding the engine resolved for a concrete type.
///
/// The identifier and the factory always come from one registry entry (the
/// nearest entry along the ancestry walk that owns a binding), so the codec
/// that writes a payload is the codec its framing resolves to on read.
pub(crate) struct ResolvedBinding {
    pub(crate) handle: TypeHandle,
    pub(crate) wire_id: Option<u32>,
    pub(crate) factory: Option<CodecFactory>,
}

/// Authoritative map between types, wire identifiers and codec factories.
///
/// # Example
///
/// ```rust
/// use tagwire::builtin::I32Codec;
/// use tagwire::codec::codec_factory;
/// use tagwire::registry::TypeRegistry;
///
/// let mut registry = TypeRegistry::empty();
/// registry
///     .register_codec_with_id::<i32>(codec_factory::<i32, _>(|| I32Codec), 10)
///     .unwrap();
/// assert_eq!(registry.wire_id::<i32>(), Some(10));
/// ```
#[derive(Clone)]
pub struct TypeRegistry {
    by_type: HashMap<TypeId, RegistryEntry>,
    by_id: HashMap<u32, TypeId>,
    by_name: HashMap<String, TypeId>,
    next_id: u32,
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("by_type", &self.by_type)
            .field("by_id", &self.by_id)
            .field("by_name", &self.by_name)
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl TypeRegistry {
    /// Creates a registry with the default primitive and standard bindings
    /// installed.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();
        PrimitiveResolver
            .resolve(&mut registry)
            .expect("primitive ids are collision-free on an empty registry");
        StandardResolver
            .resolve(&mut registry)
            .expect("standard ids are collision-free after the primitives");
        registry
    }

    /// Creates a registry with no bindings at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_type: HashMap::new(),
            by_id: HashMap::new(),
            by_name: HashMap::new(),
            next_id: AUTO_ID_START,
        }
    }

    /// Creates a registry with the default bindings plus those contributed
    /// by the given resolvers, applied in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`RegistryError`] a resolver produces.
    pub fn with_resolvers(resolvers: &[&dyn TypeResolver]) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for resolver in resolvers {
            resolver.resolve(&mut registry)?;
        }
        Ok(registry)
    }

    /// Applies a resolver to this registry, appending its bindings.
    ///
    /// # Errors
    ///
    /// Returns the first [`RegistryError`] the resolver produces.
    pub fn resolve(&mut self, resolver: &dyn TypeResolver) -> Result<(), RegistryError> {
        resolver.resolve(self)
    }

    /// Registers a [`Wireable`] type.
    ///
    /// The identifier is the handle's declared one when present, otherwise
    /// the next free identifier outside the reserved range. Returns the
    /// identifier that was bound.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if a declared identifier is reserved,
    /// out of range or bound to a different type, or if the type's name is
    /// already bound to a different type.
    pub fn register<T: Wireable>(&mut self) -> Result<u32, RegistryError> {
        let handle = T::type_handle();
        let id = match handle.declared_id() {
            Some(id) => id,
            None => self.next_free_id(),
        };
        self.bind(handle, Some(wireable_factory::<T>()), Some(id))?;
        Ok(id)
    }

    /// Registers a [`Wireable`] type under a specific identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the identifier is reserved, out of range
    /// or bound to a different type, or if the name is already bound to a
    /// different type.
    pub fn register_with_id<T: Wireable>(&mut self, id: u32) -> Result<(), RegistryError> {
        self.bind(T::type_handle(), Some(wireable_factory::<T>()), Some(id))
    }

    /// Registers a codec factory for `T` without an identifier; values are
    /// framed by the registered type name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NameInUse`] if the type's name is already
    /// bound to a different type.
    pub fn register_codec<T: Any + Send>(
        &mut self,
        factory: CodecFactory,
    ) -> Result<(), RegistryError> {
        self.bind(TypeHandle::of::<T>(), Some(factory), None)
    }

    /// Registers a codec factory for `T` under a specific identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the identifier is reserved, out of range
    /// or bound to a different type, or if the name is already bound to a
    /// different type.
    pub fn register_codec_with_id<T: Any + Send>(
        &mut self,
        factory: CodecFactory,
        id: u32,
    ) -> Result<(), RegistryError> {
        self.bind(TypeHandle::of::<T>(), Some(factory), Some(id))
    }

    /// Registers a codec factory under an explicit handle (custom name or
    /// ancestry) without an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NameInUse`] if the handle's name is already
    /// bound to a different type.
    pub fn register_handle(
        &mut self,
        handle: TypeHandle,
        factory: CodecFactory,
    ) -> Result<(), RegistryError> {
        self.bind(handle, Some(factory), None)
    }

    /// Registers a codec factory under an explicit handle and identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the identifier is reserved, out of range
    /// or bound to a different type, or if the name is already bound to a
    /// different type.
    pub fn register_handle_with_id(
        &mut self,
        handle: TypeHandle,
        factory: CodecFactory,
        id: u32,
    ) -> Result<(), RegistryError> {
        self.bind(handle, Some(factory), Some(id))
    }

    /// Declares a handle without binding an identifier or factory.
    ///
    /// Declaration records the type's name and ancestry so values of this
    /// type can resolve bindings registered on a parent.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NameInUse`] if the handle's name is already
    /// bound to a different type.
    pub fn declare(&mut self, handle: TypeHandle) -> Result<(), RegistryError> {
        self.bind(handle, None, None)
    }

    /// Returns the codec factory for a type, walking its registered
    /// ancestry in declaration order when the type has no factory of its
    /// own. The first match wins.
    #[must_use]
    pub fn lookup(&self, type_id: TypeId) -> Option<CodecFactory> {
        let entry = self.by_type.get(&type_id)?;
        if let Some(factory) = &entry.factory {
            return Some(factory.clone());
        }
        entry
            .handle
            .parents()
            .iter()
            .find_map(|parent| self.lookup(*parent))
    }

    /// The wire identifier bound directly to `T`, if any.
    #[must_use]
    pub fn wire_id<T: Any>(&self) -> Option<u32> {
        self.wire_id_of(TypeId::of::<T>())
    }

    /// The wire identifier bound directly to a type, if any.
    #[must_use]
    pub fn wire_id_of(&self, type_id: TypeId) -> Option<u32> {
        self.by_type.get(&type_id).and_then(|entry| entry.wire_id)
    }

    /// The handle bound to a wire identifier, if any.
    #[must_use]
    pub fn handle_for_id(&self, id: u32) -> Option<&TypeHandle> {
        let type_id = self.by_id.get(&id)?;
        self.by_type.get(type_id).map(|entry| &entry.handle)
    }

    /// The handle registered under a name, if any.
    #[must_use]
    pub fn handle_by_name(&self, name: &str) -> Option<&TypeHandle> {
        let type_id = self.by_name.get(name)?;
        self.by_type.get(type_id).map(|entry| &entry.handle)
    }

    /// The handle registered for a type, if any.
    #[must_use]
    pub fn handle_of(&self, type_id: TypeId) -> Option<&TypeHandle> {
        self.by_type.get(&type_id).map(|entry| &entry.handle)
    }

    /// Iterates over all identifier bindings as `(id, handle)` pairs.
    pub fn ids(&self) -> impl Iterator<Item = (u32, &TypeHandle)> {
        self.by_id.iter().filter_map(|(id, type_id)| {
            self.by_type.get(type_id).map(|entry| (*id, &entry.handle))
        })
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    /// Returns `true` when no types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    /// Resolves the binding for a concrete type.
    ///
    /// The ancestry is walked once, exact entry first, parents in
    /// declaration order; the first entry that owns a binding (an
    /// identifier or a factory) supplies both. Within that entry an
    /// identifier takes precedence over name framing. Tying both sides of
    /// the binding to one entry keeps encode and decode on the same codec.
    pub(crate) fn binding(&self, type_id: TypeId) -> Option<ResolvedBinding> {
        let entry = self.by_type.get(&type_id)?;
        let (wire_id, factory) = match self.binding_owner(type_id) {
            Some(owner) => (owner.wire_id, owner.factory.clone()),
            None => (None, None),
        };
        Some(ResolvedBinding {
            handle: entry.handle.clone(),
            wire_id,
            factory,
        })
    }

    /// The first entry along the ancestry walk that owns a binding, exact
    /// entry first, parents in declaration order.
    fn binding_owner(&self, type_id: TypeId) -> Option<&RegistryEntry> {
        let entry = self.by_type.get(&type_id)?;
        if entry.wire_id.is_some() || entry.factory.is_some() {
            return Some(entry);
        }
        entry
            .handle
            .parents()
            .iter()
            .find_map(|parent| self.binding_owner(*parent))
    }

    /// Resolves the handle and factory for a wire identifier read off the
    /// wire: the entry that owns the identifier supplies the factory,
    /// falling back to its registered ancestry only when it has none of its
    /// own. This mirrors the entry selection [`binding`](Self::binding)
    /// makes on the write side.
    pub(crate) fn binding_for_id(&self, id: u32) -> Option<(TypeHandle, CodecFactory)> {
        let type_id = *self.by_id.get(&id)?;
        let entry = self.by_type.get(&type_id)?;
        let factory = entry.factory.clone().or_else(|| self.lookup(type_id))?;
        Some((entry.handle.clone(), factory))
    }

    fn next_free_id(&mut self) -> u32 {
        let mut id = self.next_id;
        while self.by_id.contains_key(&id) || (RESERVED_ID_MIN..=RESERVED_ID_MAX).contains(&id) {
            id += 1;
        }
        self.next_id = id + 1;
        id
    }

    fn validate_id(id: u32) -> Result<(), RegistryError> {
        if (RESERVED_ID_MIN..=RESERVED_ID_MAX).contains(&id) {
            return Err(RegistryError::ReservedId { id });
        }
        if id > i32::MAX as u32 {
            return Err(RegistryError::IdOutOfRange { id });
        }
        Ok(())
    }

    /// Installs a binding, evicting any prior binding of the same type.
    /// All validation happens before the indices are touched, so a failed
    /// registration leaves the registry unchanged.
    fn bind(
        &mut self,
        handle: TypeHandle,
        factory: Option<CodecFactory>,
        wire_id: Option<u32>,
    ) -> Result<(), RegistryError> {
        if let Some(id) = wire_id {
            Self::validate_id(id)?;
            if let Some(&bound) = self.by_id.get(&id) {
                if bound != handle.type_id() {
                    return Err(RegistryError::IdInUse { id });
                }
            }
        }
        if let Some(&bound) = self.by_name.get(handle.name()) {
            if bound != handle.type_id() {
                return Err(RegistryError::NameInUse {
                    name: handle.name().to_string(),
                });
            }
        }
        if let Some(previous) = self.by_type.remove(&handle.type_id()) {
            if let Some(previous_id) = previous.wire_id {
                self.by_id.remove(&previous_id);
            }
            self.by_name.remove(previous.handle.name());
        }
        if let Some(id) = wire_id {
            self.by_id.insert(id, handle.type_id());
        }
        self.by_name.insert(handle.name().to_string(), handle.type_id());
        self.by_type.insert(
            handle.type_id(),
            RegistryEntry {
                handle,
                wire_id,
                factory,
            },
        );
        Ok(())
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
