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

//! Error types for the serialization engine.

use crate::buffer::BufferError;
use std::any::TypeId;
use thiserror::Error;

/// Errors raised while encoding or decoding values.
///
/// The engine does not recover: any error aborts the current encode or
/// decode, leaves the buffer cursor in an unspecified state and surfaces to
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializationError {
    /// The value's type has no binding and no opaque codec is installed.
    #[error("cannot serialize unregistered type {type_id:?}")]
    UnregisteredType {
        /// The concrete type of the rejected value.
        type_id: TypeId,
    },

    /// The frame began with a tag byte outside the defined set.
    #[error("unknown framing tag {tag:#04x}")]
    UnknownTag {
        /// The offending tag byte.
        tag: u8,
    },

    /// No type is bound to the identifier read off the wire.
    #[error("cannot deserialize: no type bound to wire id {id}")]
    UnknownTypeId {
        /// The unresolved identifier (negative values only occur in 32-bit
        /// framing).
        id: i64,
    },

    /// No type is registered under the name read off the wire.
    #[error("cannot deserialize: no type registered under name {name:?}")]
    UnknownTypeName {
        /// The unresolved name.
        name: String,
    },

    /// A value reached a codec for a different type.
    #[error("value is not of the expected type {expected}")]
    TypeMismatch {
        /// Name of the type the codec serves.
        expected: &'static str,
    },

    /// Decoded payload bytes do not form a valid value of the target type.
    #[error("decoded payload is not a valid {type_name}")]
    InvalidValue {
        /// Name of the target type.
        type_name: &'static str,
    },

    /// An opaque payload exceeded its 16-bit length prefix.
    #[error("opaque payload of {length} bytes exceeds the 65535-byte length prefix")]
    PayloadTooLarge {
        /// Encoded payload length.
        length: usize,
    },

    /// An opaque frame was read but no opaque codec is installed.
    #[error("opaque frame read without an opaque codec installed")]
    OpaqueUnavailable,

    /// The installed opaque codec failed.
    #[error("opaque codec failed: {message}")]
    Opaque {
        /// Description of the underlying failure.
        message: String,
    },

    /// Buffer I/O failed.
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

impl SerializationError {
    /// A [`TypeMismatch`](Self::TypeMismatch) for type `T`.
    #[must_use]
    pub fn type_mismatch<T>() -> Self {
        Self::TypeMismatch {
            expected: std::any::type_name::<T>(),
        }
    }

    /// An [`Opaque`](Self::Opaque) failure with the given description.
    #[must_use]
    pub fn opaque(message: impl Into<String>) -> Self {
        Self::Opaque {
            message: message.into(),
        }
    }
}
