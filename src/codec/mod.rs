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

//! Codec contracts and factories.
//!
//! A [`Codec`] is a bound pair of encode/decode operations for one type.
//! Codecs write and read payload bytes only (framing tags and type
//! identifiers are the engine's job) and may recurse into the engine for
//! nested values. The object-safe [`Codec`] trait is what the engine
//! dispatches on; the typed [`TypeCodec`] trait is the convenient surface
//! most codecs implement, lifted into `dyn Codec` by [`CodecAdapter`].
//!
//! Codec instances are produced by [`CodecFactory`] closures. One factory
//! may serve many types (a generic collection codec parameterized by element
//! type, for instance); the engine memoizes at most one instance per
//! (engine, type) pair.

use crate::buffer::Buffer;
use crate::engine::{Engine, SerializationError};
use crate::registry::TypeHandle;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

/// A dynamically typed value owned by the caller.
pub type BoxedValue = Box<dyn Any + Send>;

/// The encoded-null sentinel value.
///
/// Encoding a `Null` emits the single-byte null frame; decoding a null frame
/// yields a `Null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Null;

/// Object-safe per-type encode/decode pair, dispatched by the engine.
///
/// Implementations must advance the buffer cursor by exactly the number of
/// bytes their encoding defines, and must not write framing tags or type
/// identifiers.
pub trait Codec: Send + Sync {
    /// Appends the payload bytes for `value` to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] if the value is not of the codec's
    /// type or the payload cannot be written.
    fn write(
        &self,
        value: &(dyn Any + Send),
        out: &mut Buffer,
        engine: &mut Engine,
    ) -> Result<(), SerializationError>;

    /// Consumes payload bytes from `input` and reconstructs the value.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] if the payload cannot be decoded.
    fn read(
        &self,
        handle: &TypeHandle,
        input: &mut Buffer,
        engine: &mut Engine,
    ) -> Result<BoxedValue, SerializationError>;
}

/// Typed encode/decode pair for a concrete type `T`.
///
/// Most codecs implement this trait and are lifted into the object-safe
/// [`Codec`] by [`CodecAdapter`]; see [`codec_factory`] for the usual way to
/// register one.
pub trait TypeCodec<T>: Send + Sync {
    /// Appends the payload bytes for `value` to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] if the payload cannot be written.
    fn encode(
        &self,
        value: &T,
        out: &mut Buffer,
        engine: &mut Engine,
    ) -> Result<(), SerializationError>;

    /// Consumes payload bytes from `input` and reconstructs a `T`.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] if the payload cannot be decoded.
    fn decode(&self, input: &mut Buffer, engine: &mut Engine) -> Result<T, SerializationError>;
}

/// Bridges a typed [`TypeCodec`] into the object-safe [`Codec`] contract.
pub struct CodecAdapter<T, C> {
    codec: C,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C> CodecAdapter<T, C> {
    /// Wraps a typed codec.
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            _marker: PhantomData,
        }
    }
}

impl<T, C> Codec for CodecAdapter<T, C>
where
    T: Any + Send,
    C: TypeCodec<T>,
{
    fn write(
        &self,
        value: &(dyn Any + Send),
        out: &mut Buffer,
        engine: &mut Engine,
    ) -> Result<(), SerializationError> {
        let value = value
            .downcast_ref::<T>()
            .ok_or_else(SerializationError::type_mismatch::<T>)?;
        self.codec.encode(value, out, engine)
    }

    fn read(
        &self,
        _handle: &TypeHandle,
        input: &mut Buffer,
        engine: &mut Engine,
    ) -> Result<BoxedValue, SerializationError> {
        Ok(Box::new(self.codec.decode(input, engine)?))
    }
}

/// Constructs a codec instance for a concrete type.
///
/// Factories are registered once and invoked lazily, at most once per
/// (engine, type) pair; the engine memoizes the instance.
pub type CodecFactory = Arc<dyn Fn(&TypeHandle) -> Arc<dyn Codec> + Send + Sync>;

/// Builds a [`CodecFactory`] from a typed codec constructor.
///
/// # Example
///
/// ```rust
/// use tagwire::buffer::Buffer;
/// use tagwire::codec::{codec_factory, TypeCodec};
/// use tagwire::{Engine, SerializationError};
///
/// struct PointCodec;
/// #[derive(Debug, PartialEq)]
/// struct Point { x: i32, y: i32 }
///
/// impl TypeCodec<Point> for PointCodec {
///     fn encode(&self, value: &Point, out: &mut Buffer, _: &mut Engine)
///         -> Result<(), SerializationError>
///     {
///         out.write_i32(value.x)?;
///         out.write_i32(value.y)?;
///         Ok(())
///     }
///
///     fn decode(&self, input: &mut Buffer, _: &mut Engine)
///         -> Result<Point, SerializationError>
///     {
///         Ok(Point { x: input.read_i32()?, y: input.read_i32()? })
///     }
/// }
///
/// let factory = codec_factory::<Point, _>(|| PointCodec);
/// let mut engine = Engine::new();
/// engine.registry_mut().register_codec_with_id::<Point>(factory, 50).unwrap();
///
/// let mut buffer = engine.write_value(&Point { x: 1, y: 2 }).unwrap();
/// buffer.flip();
/// assert_eq!(engine.read::<Point>(&mut buffer).unwrap(), Point { x: 1, y: 2 });
/// ```
pub fn codec_factory<T, C>(make: impl Fn() -> C + Send + Sync + 'static) -> CodecFactory
where
    T: Any + Send,
    C: TypeCodec<T> + 'static,
{
    Arc::new(move |_handle| {
        let codec: Arc<dyn Codec> = Arc::new(CodecAdapter::<T, C>::new(make()));
        codec
    })
}

/// A type that serializes its own fields through the engine.
///
/// `Wireable` types register without an explicit codec; the registry serves
/// them with a built-in codec that delegates to these two methods. A type
/// may declare a preferred wire identifier or a custom registered name by
/// overriding [`type_handle`](Self::type_handle).
pub trait Wireable: Any + Send + Sized {
    /// The handle this type registers under.
    ///
    /// The default carries no declared identifier and the Rust type path as
    /// its name; override to declare either.
    #[must_use]
    fn type_handle() -> TypeHandle {
        TypeHandle::of::<Self>()
    }

    /// Appends this value's fields to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] if a field cannot be written.
    fn write_fields(&self, out: &mut Buffer, engine: &mut Engine)
        -> Result<(), SerializationError>;

    /// Reconstructs a value from fields previously written by
    /// [`write_fields`](Self::write_fields).
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] if a field cannot be read.
    fn read_fields(input: &mut Buffer, engine: &mut Engine) -> Result<Self, SerializationError>;
}

/// The built-in codec serving [`Wireable`] types.
struct WireableCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: Wireable> Codec for WireableCodec<T> {
    fn write(
        &self,
        value: &(dyn Any + Send),
        out: &mut Buffer,
        engine: &mut Engine,
    ) -> Result<(), SerializationError> {
        let value = value
            .downcast_ref::<T>()
            .ok_or_else(SerializationError::type_mismatch::<T>)?;
        value.write_fields(out, engine)
    }

    fn read(
        &self,
        _handle: &TypeHandle,
        input: &mut Buffer,
        engine: &mut Engine,
    ) -> Result<BoxedValue, SerializationError> {
        Ok(Box::new(T::read_fields(input, engine)?))
    }
}

/// Factory serving a [`Wireable`] type with its built-in codec.
pub(crate) fn wireable_factory<T: Wireable>() -> CodecFactory {
    Arc::new(|_handle| {
        let codec: Arc<dyn Codec> = Arc::new(WireableCodec::<T> {
            _marker: PhantomData,
        });
        codec
    })
}

/// Escape-hatch codec for types outside the registry.
///
/// The engine never reimplements a platform serialization mechanism; when a
/// value has no registered binding, an injected `OpaqueCodec` may encode it
/// into an opaque byte block (and decode such blocks on the way back in).
/// Without one installed, unregistered values fail to encode and opaque
/// frames fail to decode.
pub trait OpaqueCodec: Send + Sync {
    /// Encodes an arbitrary value into an opaque byte block.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] if the value is not supported.
    fn encode(&self, value: &(dyn Any + Send)) -> Result<Vec<u8>, SerializationError>;

    /// Decodes a value from an opaque byte block.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] if the block cannot be decoded.
    fn decode(&self, bytes: &[u8]) -> Result<BoxedValue, SerializationError>;
}
