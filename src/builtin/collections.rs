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

//! Generic collection codecs.
//!
//! These codecs recurse through the engine for every element, so nested
//! values carry their own framing and dispatch polymorphically. One codec
//! type serves every element-type instantiation; register the instantiation
//! you need.

use crate::buffer::Buffer;
use crate::codec::{Null, TypeCodec};
use crate::engine::{Engine, SerializationError};
use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;

/// Initial element capacity reserved when decoding; guards against
/// oversized counts in corrupt input.
const INITIAL_DECODE_CAPACITY: usize = 1024;

/// Raw byte-vector codec: unsigned 32-bit count followed by the bytes.
///
/// Unlike [`SequenceCodec`], elements are written directly with no
/// per-element framing.
#[derive(Debug, Default, Clone, Copy)]
pub struct BytesCodec;

impl TypeCodec<Vec<u8>> for BytesCodec {
    fn encode(
        &self,
        value: &Vec<u8>,
        out: &mut Buffer,
        _engine: &mut Engine,
    ) -> Result<(), SerializationError> {
        out.write_u32(value.len() as u32)?;
        out.write_bytes(value)?;
        Ok(())
    }

    fn decode(
        &self,
        input: &mut Buffer,
        _engine: &mut Engine,
    ) -> Result<Vec<u8>, SerializationError> {
        let count = input.read_u32()? as usize;
        Ok(input.read_slice(count)?.to_vec())
    }
}

/// Codec for `Vec<T>`: unsigned 32-bit count, then each element encoded
/// through the engine with its own framing.
pub struct SequenceCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SequenceCodec<T> {
    /// Creates the codec.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for SequenceCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Any + Send> TypeCodec<Vec<T>> for SequenceCodec<T> {
    fn encode(
        &self,
        value: &Vec<T>,
        out: &mut Buffer,
        engine: &mut Engine,
    ) -> Result<(), SerializationError> {
        out.write_u32(value.len() as u32)?;
        for item in value {
            engine.write_to(item, out)?;
        }
        Ok(())
    }

    fn decode(
        &self,
        input: &mut Buffer,
        engine: &mut Engine,
    ) -> Result<Vec<T>, SerializationError> {
        let count = input.read_u32()? as usize;
        let mut items = Vec::with_capacity(count.min(INITIAL_DECODE_CAPACITY));
        for _ in 0..count {
            let item = engine
                .read_value(input)?
                .downcast::<T>()
                .map_err(|_| SerializationError::type_mismatch::<T>())?;
            items.push(*item);
        }
        Ok(items)
    }
}

/// Codec for `HashMap<K, V>`: unsigned 32-bit entry count, then each key
/// and value encoded through the engine with their own framing.
pub struct MapCodec<K, V> {
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> MapCodec<K, V> {
    /// Creates the codec.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<K, V> Default for MapCodec<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TypeCodec<HashMap<K, V>> for MapCodec<K, V>
where
    K: Any + Send + Eq + Hash,
    V: Any + Send,
{
    fn encode(
        &self,
        value: &HashMap<K, V>,
        out: &mut Buffer,
        engine: &mut Engine,
    ) -> Result<(), SerializationError> {
        out.write_u32(value.len() as u32)?;
        for (key, entry) in value {
            engine.write_to(key, out)?;
            engine.write_to(entry, out)?;
        }
        Ok(())
    }

    fn decode(
        &self,
        input: &mut Buffer,
        engine: &mut Engine,
    ) -> Result<HashMap<K, V>, SerializationError> {
        let count = input.read_u32()? as usize;
        let mut entries = HashMap::with_capacity(count.min(INITIAL_DECODE_CAPACITY));
        for _ in 0..count {
            let key = engine
                .read_value(input)?
                .downcast::<K>()
                .map_err(|_| SerializationError::type_mismatch::<K>())?;
            let value = engine
                .read_value(input)?
                .downcast::<V>()
                .map_err(|_| SerializationError::type_mismatch::<V>())?;
            entries.insert(*key, *value);
        }
        Ok(entries)
    }
}

/// Codec for `Option<T>`: `None` encodes as a null frame, `Some` as the
/// inner value with its own framing.
pub struct OptionCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> OptionCodec<T> {
    /// Creates the codec.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for OptionCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Any + Send> TypeCodec<Option<T>> for OptionCodec<T> {
    fn encode(
        &self,
        value: &Option<T>,
        out: &mut Buffer,
        engine: &mut Engine,
    ) -> Result<(), SerializationError> {
        match value {
            Some(inner) => engine.write_to(inner, out),
            None => engine.write_to(&Null, out),
        }
    }

    fn decode(
        &self,
        input: &mut Buffer,
        engine: &mut Engine,
    ) -> Result<Option<T>, SerializationError> {
        let value = engine.read_value(input)?;
        if value.downcast_ref::<Null>().is_some() {
            return Ok(None);
        }
        value
            .downcast::<T>()
            .map(|inner| Some(*inner))
            .map_err(|_| SerializationError::type_mismatch::<T>())
    }
}
