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

//! Error types for type registration.

use thiserror::Error;

/// Lower bound of the reserved wire identifier range.
pub const RESERVED_ID_MIN: u32 = 128;

/// Upper bound (inclusive) of the reserved wire identifier range.
pub const RESERVED_ID_MAX: u32 = 255;

/// Errors raised by [`TypeRegistry`] registration.
///
/// A failed registration leaves the registry unchanged.
///
/// [`TypeRegistry`]: crate::registry::TypeRegistry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The identifier falls in the reserved range [128, 255].
    #[error("wire id {id} is reserved (ids {RESERVED_ID_MIN}..={RESERVED_ID_MAX} are reserved)")]
    ReservedId {
        /// The rejected identifier.
        id: u32,
    },

    /// The identifier is already bound to a different type.
    #[error("wire id {id} is already bound to another type")]
    IdInUse {
        /// The contested identifier.
        id: u32,
    },

    /// The registered name is already bound to a different type.
    #[error("type name {name:?} is already bound to another type")]
    NameInUse {
        /// The contested name.
        name: String,
    },

    /// The identifier does not fit the signed 32-bit wire encoding.
    #[error("wire id {id} exceeds the maximum encodable id {max}", max = i32::MAX)]
    IdOutOfRange {
        /// The rejected identifier.
        id: u32,
    },
}
