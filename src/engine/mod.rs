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

//! The serialization engine: tagged dispatch over a type registry.
//!
//! Every encoded value is framed by a one-byte tag that determines the
//! header grammar that follows:
//!
//! ```text
//! +------+--------------------------------+----------------+
//! | tag  | header                         | payload        |
//! +------+--------------------------------+----------------+
//! | 0x00 | (none)                         | (none)         | null
//! | 0x01 | (none)                         | buffer bytes   | raw buffer
//! | 0x02 | u8 id                          | codec bytes    | id <= 255
//! | 0x03 | u16 id                         | codec bytes    | id <= 65535
//! | 0x04 | u24 id                         | codec bytes    | id <= 16777215
//! | 0x05 | i32 id                         | codec bytes    | wider ids
//! | 0x07 | u16 length, UTF-8 name         | codec bytes    | name framing
//! | 0x08 | u16 length                     | opaque bytes   | escape hatch
//! +------+--------------------------------+----------------+
//! ```
//!
//! All integers are big-endian. Identifiers are written in the narrowest
//! width that fits; widths 8/16/24 are unsigned and width 32 is signed.
//!
//! An [`Engine`] owns a [`TypeRegistry`], a [`BufferAllocator`] and a
//! per-engine codec cache populated lazily from factories. Engines are not
//! thread-safe; a worker that needs its own engine calls
//! [`fork`](Engine::fork), which deep-copies the registry, copies the name
//! cache and starts with an empty codec cache, so codec instances are never
//! shared between engines.

mod error;

pub use error::SerializationError;

use crate::buffer::{Buffer, BufferAllocator, BufferError};
use crate::codec::{BoxedValue, Codec, CodecFactory, Null, OpaqueCodec};
use crate::registry::{TypeHandle, TypeRegistry};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

const TAG_NULL: u8 = 0x00;
const TAG_BUFFER: u8 = 0x01;
const TAG_ID8: u8 = 0x02;
const TAG_ID16: u8 = 0x03;
const TAG_ID24: u8 = 0x04;
const TAG_ID32: u8 = 0x05;
const TAG_CLASS: u8 = 0x07;
const TAG_OPAQUE: u8 = 0x08;

const MAX_ID_8: u32 = 0xFF;
const MAX_ID_16: u32 = 0xFFFF;
const MAX_ID_24: u32 = 0x00FF_FFFF;

/// The serialization engine.
///
/// # Example
///
/// ```rust
/// use tagwire::Engine;
///
/// let mut engine = Engine::new();
/// let mut buffer = engine.write_value(&"hello".to_string()).unwrap();
/// buffer.flip();
///
/// let decoded: String = engine.read(&mut buffer).unwrap();
/// assert_eq!(decoded, "hello");
/// ```
pub struct Engine {
    registry: TypeRegistry,
    allocator: BufferAllocator,
    codecs: HashMap<TypeId, Arc<dyn Codec>>,
    names: HashMap<String, TypeId>,
    opaque: Option<Arc<dyn OpaqueCodec>>,
}

impl Engine {
    /// Creates an engine over the default registry (primitive and standard
    /// bindings) and a fresh pooled allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_parts(TypeRegistry::new(), BufferAllocator::new())
    }

    /// Creates an engine over a specific registry.
    #[must_use]
    pub fn with_registry(registry: TypeRegistry) -> Self {
        Self::with_parts(registry, BufferAllocator::new())
    }

    /// Creates an engine over a specific registry and allocator.
    #[must_use]
    pub fn with_parts(registry: TypeRegistry, allocator: BufferAllocator) -> Self {
        Self {
            registry,
            allocator,
            codecs: HashMap::new(),
            names: HashMap::new(),
            opaque: None,
        }
    }

    /// The engine's registry.
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Mutable access to the engine's registry, for startup configuration.
    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    /// The engine's buffer allocator.
    #[must_use]
    pub fn allocator(&self) -> &BufferAllocator {
        &self.allocator
    }

    /// Allocates a buffer from the engine's allocator.
    #[must_use]
    pub fn allocate(&self) -> Buffer {
        self.allocator.allocate()
    }

    /// Allocates a buffer with explicit initial and maximum capacities.
    #[must_use]
    pub fn allocate_with(&self, initial_capacity: usize, max_capacity: usize) -> Buffer {
        self.allocator.allocate_with(initial_capacity, max_capacity)
    }

    /// Installs the opaque escape-hatch codec used for values outside the
    /// registry.
    pub fn set_opaque_codec(&mut self, codec: Arc<dyn OpaqueCodec>) {
        self.opaque = Some(codec);
    }

    /// Forks the engine for another worker: an equal deep-copied registry, a
    /// copied name cache and an empty codec cache, over the same allocator
    /// pool. Codec instances are never shared between an engine and its
    /// forks.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            allocator: self.allocator.clone(),
            codecs: HashMap::new(),
            names: self.names.clone(),
            opaque: self.opaque.clone(),
        }
    }

    /// Encodes a value into a fresh buffer from the engine's allocator.
    ///
    /// The returned buffer is not flipped; callers
    /// [`flip`](Buffer::flip) it before reading.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] if the value has no usable binding or
    /// the buffer rejects a write. The buffer is released on error.
    pub fn write_value(
        &mut self,
        value: &(dyn Any + Send),
    ) -> Result<Buffer, SerializationError> {
        let mut out = self.allocate();
        self.write_to(value, &mut out)?;
        Ok(out)
    }

    /// Encodes a value into a caller-supplied buffer at its cursor.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] if the value has no usable binding or
    /// the buffer rejects a write.
    pub fn write_to(
        &mut self,
        value: &(dyn Any + Send),
        out: &mut Buffer,
    ) -> Result<(), SerializationError> {
        if value.downcast_ref::<Null>().is_some() {
            out.write_u8(TAG_NULL)?;
            return Ok(());
        }
        if let Some(nested) = value.downcast_ref::<Buffer>() {
            out.write_u8(TAG_BUFFER)?;
            out.write_bytes(nested.readable())?;
            return Ok(());
        }

        let type_id = value.type_id();
        let binding = match self.registry.binding(type_id) {
            Some(binding) => binding,
            None => return self.write_opaque(value, out),
        };
        let factory = match binding.factory {
            Some(factory) => factory,
            None => return self.write_opaque(value, out),
        };
        let codec = self.codec_for(type_id, &factory, &binding.handle);

        match binding.wire_id {
            Some(id) if id <= MAX_ID_8 => {
                out.write_u8(TAG_ID8)?;
                out.write_u8(id as u8)?;
            }
            Some(id) if id <= MAX_ID_16 => {
                out.write_u8(TAG_ID16)?;
                out.write_u16(id as u16)?;
            }
            Some(id) if id <= MAX_ID_24 => {
                out.write_u8(TAG_ID24)?;
                out.write_u24(id)?;
            }
            Some(id) => {
                out.write_u8(TAG_ID32)?;
                out.write_i32(id as i32)?;
            }
            None => {
                out.write_u8(TAG_CLASS)?;
                out.write_str(binding.handle.name()).map_err(|error| match error {
                    BufferError::StringTooLong { length } => {
                        SerializationError::PayloadTooLarge { length }
                    }
                    other => other.into(),
                })?;
            }
        }
        codec.write(value, out, self)
    }

    /// Decodes one value from the buffer at its cursor.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] on an unknown tag, an unresolvable
    /// identifier or name, or a payload the codec rejects.
    pub fn read_value(&mut self, input: &mut Buffer) -> Result<BoxedValue, SerializationError> {
        let tag = input.read_u8()?;
        match tag {
            TAG_NULL => Ok(Box::new(Null)),
            TAG_BUFFER => self.read_buffer(input),
            TAG_ID8 => {
                let id = u32::from(input.read_u8()?);
                self.read_by_id(id, input)
            }
            TAG_ID16 => {
                let id = u32::from(input.read_u16()?);
                self.read_by_id(id, input)
            }
            TAG_ID24 => {
                let id = input.read_u24()?;
                self.read_by_id(id, input)
            }
            TAG_ID32 => {
                let raw = input.read_i32()?;
                if raw < 0 {
                    return Err(SerializationError::UnknownTypeId { id: i64::from(raw) });
                }
                self.read_by_id(raw as u32, input)
            }
            TAG_CLASS => self.read_by_name(input),
            TAG_OPAQUE => self.read_opaque(input),
            other => Err(SerializationError::UnknownTag { tag: other }),
        }
    }

    /// Decodes one value and downcasts it to `T`.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError::TypeMismatch`] when the decoded value
    /// is not a `T`, or any decode error from [`read_value`](Self::read_value).
    pub fn read<T: Any>(&mut self, input: &mut Buffer) -> Result<T, SerializationError> {
        self.read_value(input)?
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| SerializationError::type_mismatch::<T>())
    }

    /// Copies a value by encoding it into a scratch buffer and decoding it
    /// back. The scratch buffer is released before returning.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] if either direction fails.
    pub fn copy_value(
        &mut self,
        value: &(dyn Any + Send),
    ) -> Result<BoxedValue, SerializationError> {
        let mut scratch = self.write_value(value)?;
        scratch.flip();
        self.read_value(&mut scratch)
    }

    /// Typed [`copy_value`](Self::copy_value).
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] if either direction fails.
    pub fn copy<T: Any + Send>(&mut self, value: &T) -> Result<T, SerializationError> {
        self.copy_value(value)?
            .downcast::<T>()
            .map(|copied| *copied)
            .map_err(|_| SerializationError::type_mismatch::<T>())
    }

    fn codec_for(
        &mut self,
        type_id: TypeId,
        factory: &CodecFactory,
        handle: &TypeHandle,
    ) -> Arc<dyn Codec> {
        if let Some(codec) = self.codecs.get(&type_id) {
            return Arc::clone(codec);
        }
        trace!(type_name = handle.name(), "instantiating codec");
        let codec = factory(handle);
        self.codecs.insert(type_id, Arc::clone(&codec));
        codec
    }

    fn write_opaque(
        &mut self,
        value: &(dyn Any + Send),
        out: &mut Buffer,
    ) -> Result<(), SerializationError> {
        let opaque = self
            .opaque
            .clone()
            .ok_or(SerializationError::UnregisteredType {
                type_id: value.type_id(),
            })?;
        let bytes = opaque.encode(value)?;
        if bytes.len() > u16::MAX as usize {
            return Err(SerializationError::PayloadTooLarge { length: bytes.len() });
        }
        out.write_u8(TAG_OPAQUE)?;
        out.write_u16(bytes.len() as u16)?;
        out.write_bytes(&bytes)?;
        Ok(())
    }

    fn read_opaque(&mut self, input: &mut Buffer) -> Result<BoxedValue, SerializationError> {
        let length = input.read_u16()? as usize;
        let opaque = self
            .opaque
            .clone()
            .ok_or(SerializationError::OpaqueUnavailable)?;
        let bytes = input.read_slice(length)?;
        opaque.decode(bytes)
    }

    fn read_buffer(&mut self, input: &mut Buffer) -> Result<BoxedValue, SerializationError> {
        let mut nested = self.allocate();
        let remaining = input.remaining();
        let bytes = input.read_slice(remaining)?;
        nested.write_bytes(bytes)?;
        nested.flip();
        Ok(Box::new(nested))
    }

    fn read_by_id(&mut self, id: u32, input: &mut Buffer) -> Result<BoxedValue, SerializationError> {
        // The entry that owns the identifier also supplies the factory, the
        // same selection the write side makes.
        let (handle, factory) = self
            .registry
            .binding_for_id(id)
            .ok_or(SerializationError::UnknownTypeId { id: i64::from(id) })?;
        let codec = self.codec_for(handle.type_id(), &factory, &handle);
        codec.read(&handle, input, self)
    }

    fn read_by_name(&mut self, input: &mut Buffer) -> Result<BoxedValue, SerializationError> {
        let name = input.read_str()?;
        let type_id = match self.names.get(&name) {
            Some(type_id) => *type_id,
            None => {
                let handle = self.registry.handle_by_name(&name).ok_or_else(|| {
                    SerializationError::UnknownTypeName { name: name.clone() }
                })?;
                let type_id = handle.type_id();
                self.names.insert(name.clone(), type_id);
                type_id
            }
        };
        let handle = self
            .registry
            .handle_of(type_id)
            .cloned()
            .ok_or_else(|| SerializationError::UnknownTypeName { name: name.clone() })?;
        let factory = self
            .registry
            .lookup(type_id)
            .ok_or(SerializationError::UnknownTypeName { name })?;
        let codec = self.codec_for(type_id, &factory, &handle);
        codec.read(&handle, input, self)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::codec_factory;

    #[test]
    fn test_null_is_one_byte() {
        let mut engine = Engine::new();
        let mut buffer = engine.write_value(&Null).unwrap();
        buffer.flip();
        assert_eq!(buffer.readable(), &[0x00]);

        let value = engine.read_value(&mut buffer).unwrap();
        assert!(value.downcast_ref::<Null>().is_some());
    }

    #[test]
    fn test_unregistered_type_fails() {
        struct Stranger;
        let mut engine = Engine::new();
        let err = engine.write_value(&Stranger).unwrap_err();
        assert!(matches!(err, SerializationError::UnregisteredType { .. }));
    }

    #[test]
    fn test_unknown_tag() {
        let mut engine = Engine::new();
        let mut buffer = Buffer::wrap(vec![0x06]);
        let err = engine.read_value(&mut buffer).unwrap_err();
        assert_eq!(err, SerializationError::UnknownTag { tag: 0x06 });
    }

    #[test]
    fn test_unknown_id_on_decode() {
        let mut engine = Engine::with_registry(TypeRegistry::empty());
        let mut buffer = Buffer::wrap(vec![0x02, 0x30]);
        let err = engine.read_value(&mut buffer).unwrap_err();
        assert_eq!(err, SerializationError::UnknownTypeId { id: 0x30 });
    }

    #[test]
    fn test_negative_id32_rejected_on_decode() {
        let mut engine = Engine::new();
        let mut raw = vec![0x05];
        raw.extend_from_slice(&(-5i32).to_be_bytes());
        let mut buffer = Buffer::wrap(raw);
        let err = engine.read_value(&mut buffer).unwrap_err();
        assert_eq!(err, SerializationError::UnknownTypeId { id: -5 });
    }

    #[test]
    fn test_opaque_without_codec() {
        let mut engine = Engine::new();
        let mut buffer = Buffer::wrap(vec![0x08, 0x00, 0x01, 0xAA]);
        let err = engine.read_value(&mut buffer).unwrap_err();
        assert_eq!(err, SerializationError::OpaqueUnavailable);
    }

    #[test]
    fn test_copy_releases_scratch_buffer() {
        let mut engine = Engine::new();
        let before = engine.allocator().pooled();
        let copied = engine.copy(&42i32).unwrap();
        assert_eq!(copied, 42);
        // The scratch buffer went back to the pool.
        assert_eq!(engine.allocator().pooled(), before + 1);
    }

    #[test]
    fn test_fork_has_empty_codec_cache() {
        let mut engine = Engine::new();
        let mut buffer = engine.write_value(&7i32).unwrap();
        buffer.flip();
        assert!(!engine.codecs.is_empty());

        let fork = engine.fork();
        assert!(fork.codecs.is_empty());
    }

    #[test]
    fn test_buffer_value_round_trip() {
        let mut engine = Engine::new();
        let mut payload = engine.allocate();
        payload.write_bytes(b"raw bytes").unwrap();
        payload.flip();

        let mut encoded = engine.write_value(&payload).unwrap();
        encoded.flip();
        assert_eq!(encoded.readable()[0], TAG_BUFFER);

        let decoded = engine.read_value(&mut encoded).unwrap();
        let decoded = decoded.downcast::<Buffer>().unwrap();
        assert_eq!(decoded.readable(), b"raw bytes");
    }

    #[test]
    fn test_ancestry_binding_round_trips() {
        #[derive(Debug, Clone, PartialEq)]
        struct Base(i32);
        #[derive(Debug, Clone, PartialEq)]
        struct Leaf;

        struct BaseCodec;
        impl crate::codec::TypeCodec<Base> for BaseCodec {
            fn encode(
                &self,
                value: &Base,
                out: &mut Buffer,
                _engine: &mut Engine,
            ) -> Result<(), SerializationError> {
                out.write_i32(value.0)?;
                Ok(())
            }

            fn decode(
                &self,
                input: &mut Buffer,
                _engine: &mut Engine,
            ) -> Result<Base, SerializationError> {
                Ok(Base(input.read_i32()?))
            }
        }

        // Writes a single marker byte; confusing this codec with BaseCodec's
        // four-byte payload cannot round-trip.
        struct LeafCodec;
        impl crate::codec::TypeCodec<Leaf> for LeafCodec {
            fn encode(
                &self,
                _value: &Leaf,
                out: &mut Buffer,
                _engine: &mut Engine,
            ) -> Result<(), SerializationError> {
                out.write_u8(0xAB)?;
                Ok(())
            }

            fn decode(
                &self,
                input: &mut Buffer,
                _engine: &mut Engine,
            ) -> Result<Leaf, SerializationError> {
                if input.read_u8()? != 0xAB {
                    return Err(SerializationError::InvalidValue { type_name: "Leaf" });
                }
                Ok(Leaf)
            }
        }

        let mut registry = TypeRegistry::empty();
        registry
            .register_codec_with_id::<Base>(codec_factory::<Base, _>(|| BaseCodec), 90)
            .unwrap();
        registry
            .register_handle(
                TypeHandle::of::<Leaf>().named("wire.Leaf").extends::<Base>(),
                codec_factory::<Leaf, _>(|| LeafCodec),
            )
            .unwrap();

        let mut engine = Engine::with_registry(registry);

        // Leaf owns a factory, so its entry supplies the whole binding: name
        // framing with Leaf's own codec, never the ancestor's identifier.
        let mut encoded = engine.write_value(&Leaf).unwrap();
        encoded.flip();
        assert_eq!(encoded.readable()[0], TAG_CLASS);
        assert_eq!(engine.read::<Leaf>(&mut encoded).unwrap(), Leaf);

        // Base keeps identifier framing, and the identifier resolves back to
        // Base's own codec on read.
        let mut encoded = engine.write_value(&Base(7)).unwrap();
        encoded.flip();
        assert_eq!(encoded.readable(), &[TAG_ID8, 90, 0x00, 0x00, 0x00, 0x07]);
        assert_eq!(engine.read::<Base>(&mut encoded).unwrap(), Base(7));
    }
}
