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

//! Built-in codecs.
//!
//! Fixed-width codecs for the primitive types, plus generic collection
//! codecs that recurse through the engine per element. The default
//! resolvers register these under fixed identifiers; the generic codecs can
//! also be registered directly for further instantiations.

mod collections;
mod time;

pub use collections::{BytesCodec, MapCodec, OptionCodec, SequenceCodec};
pub use time::{DurationCodec, SystemTimeCodec};

use crate::buffer::Buffer;
use crate::codec::TypeCodec;
use crate::engine::{Engine, SerializationError};

macro_rules! fixed_codec {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $write:ident, $read:ident) => {
        $(#[$doc])*
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $name;

        impl TypeCodec<$ty> for $name {
            fn encode(
                &self,
                value: &$ty,
                out: &mut Buffer,
                _engine: &mut Engine,
            ) -> Result<(), SerializationError> {
                out.$write(*value)?;
                Ok(())
            }

            fn decode(
                &self,
                input: &mut Buffer,
                _engine: &mut Engine,
            ) -> Result<$ty, SerializationError> {
                Ok(input.$read()?)
            }
        }
    };
}

fixed_codec!(
    /// One-byte boolean codec.
    BoolCodec, bool, write_bool, read_bool
);
fixed_codec!(
    /// Signed 8-bit codec.
    I8Codec, i8, write_i8, read_i8
);
fixed_codec!(
    /// Unsigned 8-bit codec.
    U8Codec, u8, write_u8, read_u8
);
fixed_codec!(
    /// Signed 16-bit big-endian codec.
    I16Codec, i16, write_i16, read_i16
);
fixed_codec!(
    /// Unsigned 16-bit big-endian codec.
    U16Codec, u16, write_u16, read_u16
);
fixed_codec!(
    /// Signed 32-bit big-endian codec.
    I32Codec, i32, write_i32, read_i32
);
fixed_codec!(
    /// Unsigned 32-bit big-endian codec.
    U32Codec, u32, write_u32, read_u32
);
fixed_codec!(
    /// Signed 64-bit big-endian codec.
    I64Codec, i64, write_i64, read_i64
);
fixed_codec!(
    /// Unsigned 64-bit big-endian codec.
    U64Codec, u64, write_u64, read_u64
);
fixed_codec!(
    /// IEEE-754 single-precision codec.
    F32Codec, f32, write_f32, read_f32
);
fixed_codec!(
    /// IEEE-754 double-precision codec.
    F64Codec, f64, write_f64, read_f64
);

/// Unicode scalar codec: the code point as an unsigned 32-bit integer.
#[derive(Debug, Default, Clone, Copy)]
pub struct CharCodec;

impl TypeCodec<char> for CharCodec {
    fn encode(
        &self,
        value: &char,
        out: &mut Buffer,
        _engine: &mut Engine,
    ) -> Result<(), SerializationError> {
        out.write_u32(*value as u32)?;
        Ok(())
    }

    fn decode(&self, input: &mut Buffer, _engine: &mut Engine) -> Result<char, SerializationError> {
        char::from_u32(input.read_u32()?).ok_or(SerializationError::InvalidValue {
            type_name: "char",
        })
    }
}

/// String codec: unsigned 16-bit byte count followed by UTF-8.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringCodec;

impl TypeCodec<String> for StringCodec {
    fn encode(
        &self,
        value: &String,
        out: &mut Buffer,
        _engine: &mut Engine,
    ) -> Result<(), SerializationError> {
        out.write_str(value)?;
        Ok(())
    }

    fn decode(
        &self,
        input: &mut Buffer,
        _engine: &mut Engine,
    ) -> Result<String, SerializationError> {
        Ok(input.read_str()?)
    }
}
