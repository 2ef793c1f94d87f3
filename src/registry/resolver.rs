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

//! Bulk type registration.
//!
//! A [`TypeResolver`] registers a family of types against a registry in one
//! call. Two resolvers are applied when a registry is constructed with
//! [`TypeRegistry::new`]: [`PrimitiveResolver`] binds the primitive types at
//! identifiers 1–13 and [`StandardResolver`] binds common standard-library
//! types (and the RPC error value) at identifiers 14–19. Both id catalogs
//! are part of the wire contract: peers must agree on them.

use crate::builtin::{
    BoolCodec, BytesCodec, CharCodec, DurationCodec, F32Codec, F64Codec, I16Codec, I32Codec,
    I64Codec, I8Codec, MapCodec, SequenceCodec, StringCodec, SystemTimeCodec, U16Codec, U32Codec,
    U64Codec, U8Codec,
};
use crate::codec::codec_factory;
use crate::connection::{ServiceError, ServiceErrorCodec};
use crate::registry::{RegistryError, TypeRegistry};
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

/// Registers a family of serializable types against a registry.
pub trait TypeResolver {
    /// Appends this resolver's bindings to the registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if a binding conflicts with an existing
    /// one.
    fn resolve(&self, registry: &mut TypeRegistry) -> Result<(), RegistryError>;
}

/// Binds the primitive types at fixed identifiers 1–13.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrimitiveResolver;

impl TypeResolver for PrimitiveResolver {
    fn resolve(&self, registry: &mut TypeRegistry) -> Result<(), RegistryError> {
        registry.register_codec_with_id::<bool>(codec_factory::<bool, _>(|| BoolCodec), 1)?;
        registry.register_codec_with_id::<i8>(codec_factory::<i8, _>(|| I8Codec), 2)?;
        registry.register_codec_with_id::<u8>(codec_factory::<u8, _>(|| U8Codec), 3)?;
        registry.register_codec_with_id::<i16>(codec_factory::<i16, _>(|| I16Codec), 4)?;
        registry.register_codec_with_id::<u16>(codec_factory::<u16, _>(|| U16Codec), 5)?;
        registry.register_codec_with_id::<i32>(codec_factory::<i32, _>(|| I32Codec), 6)?;
        registry.register_codec_with_id::<u32>(codec_factory::<u32, _>(|| U32Codec), 7)?;
        registry.register_codec_with_id::<i64>(codec_factory::<i64, _>(|| I64Codec), 8)?;
        registry.register_codec_with_id::<u64>(codec_factory::<u64, _>(|| U64Codec), 9)?;
        registry.register_codec_with_id::<f32>(codec_factory::<f32, _>(|| F32Codec), 10)?;
        registry.register_codec_with_id::<f64>(codec_factory::<f64, _>(|| F64Codec), 11)?;
        registry.register_codec_with_id::<char>(codec_factory::<char, _>(|| CharCodec), 12)?;
        registry.register_codec_with_id::<String>(codec_factory::<String, _>(|| StringCodec), 13)?;
        Ok(())
    }
}

/// Binds common standard-library types and the RPC error value at fixed
/// identifiers 14–19.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardResolver;

impl TypeResolver for StandardResolver {
    fn resolve(&self, registry: &mut TypeRegistry) -> Result<(), RegistryError> {
        registry.register_codec_with_id::<Vec<u8>>(codec_factory::<Vec<u8>, _>(|| BytesCodec), 14)?;
        registry.register_codec_with_id::<Duration>(
            codec_factory::<Duration, _>(|| DurationCodec),
            15,
        )?;
        registry.register_codec_with_id::<SystemTime>(
            codec_factory::<SystemTime, _>(|| SystemTimeCodec),
            16,
        )?;
        registry.register_codec_with_id::<Vec<String>>(
            codec_factory::<Vec<String>, _>(SequenceCodec::new),
            17,
        )?;
        registry.register_codec_with_id::<HashMap<String, String>>(
            codec_factory::<HashMap<String, String>, _>(MapCodec::new),
            18,
        )?;
        registry.register_codec_with_id::<ServiceError>(
            codec_factory::<ServiceError, _>(|| ServiceErrorCodec),
            19,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolvers_populate_fixed_ids() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.wire_id::<bool>(), Some(1));
        assert_eq!(registry.wire_id::<char>(), Some(12));
        assert_eq!(registry.wire_id::<Duration>(), Some(15));
        assert_eq!(registry.wire_id::<Vec<String>>(), Some(17));
        assert_eq!(registry.wire_id::<ServiceError>(), Some(19));
    }

    #[test]
    fn test_custom_resolver_appends() {
        struct AppResolver;

        impl TypeResolver for AppResolver {
            fn resolve(&self, registry: &mut TypeRegistry) -> Result<(), RegistryError> {
                registry.register_codec_with_id::<Vec<i64>>(
                    codec_factory::<Vec<i64>, _>(SequenceCodec::new),
                    300,
                )
            }
        }

        let registry = TypeRegistry::with_resolvers(&[&AppResolver]).unwrap();
        assert_eq!(registry.wire_id::<Vec<i64>>(), Some(300));
        assert_eq!(registry.wire_id::<bool>(), Some(1));
    }

    #[test]
    fn test_resolver_cannot_take_reserved_ids() {
        struct BadResolver;

        impl TypeResolver for BadResolver {
            fn resolve(&self, registry: &mut TypeRegistry) -> Result<(), RegistryError> {
                registry.register_codec_with_id::<Vec<i64>>(
                    codec_factory::<Vec<i64>, _>(SequenceCodec::new),
                    130,
                )
            }
        }

        let err = TypeRegistry::with_resolvers(&[&BadResolver]).unwrap_err();
        assert_eq!(err, RegistryError::ReservedId { id: 130 });
    }
}
