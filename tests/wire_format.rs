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

//! Integration tests for the tagged wire format.
//!
//! These tests pin the exact bytes the engine emits (tag values, identifier
//! widths and header layouts) as well as the registry behaviors the format
//! depends on: reserved identifiers, eviction, clone independence and the
//! identifier-over-name precedence.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;
use tagwire::buffer::Buffer;
use tagwire::builtin::I32Codec;
use tagwire::codec::{codec_factory, BoxedValue, Null, OpaqueCodec, TypeCodec};
use tagwire::{
    Engine, RegistryError, SerializationError, TypeHandle, TypeRegistry, Wireable,
};

/// Codec that writes no payload and reconstructs a default value.
struct NothingCodec<T>(PhantomData<fn() -> T>);

impl<T> NothingCodec<T> {
    fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: Any + Send + Default> TypeCodec<T> for NothingCodec<T> {
    fn encode(
        &self,
        _value: &T,
        _out: &mut Buffer,
        _engine: &mut Engine,
    ) -> Result<(), SerializationError> {
        Ok(())
    }

    fn decode(&self, _input: &mut Buffer, _engine: &mut Engine) -> Result<T, SerializationError> {
        Ok(T::default())
    }
}

fn encoded_bytes(engine: &mut Engine, value: &(dyn Any + Send)) -> Vec<u8> {
    let mut buffer = engine.write_value(value).unwrap();
    buffer.flip();
    buffer.readable().to_vec()
}

#[test]
fn test_i32_at_id_10_exact_bytes() {
    let mut registry = TypeRegistry::empty();
    registry
        .register_codec_with_id::<i32>(codec_factory::<i32, _>(|| I32Codec), 10)
        .unwrap();
    let mut engine = Engine::with_registry(registry);

    let bytes = encoded_bytes(&mut engine, &42i32);
    assert_eq!(bytes, vec![0x02, 0x0A, 0x00, 0x00, 0x00, 0x2A]);

    let mut buffer = Buffer::wrap(bytes);
    assert_eq!(engine.read::<i32>(&mut buffer).unwrap(), 42);
}

#[test]
fn test_null_is_a_single_byte() {
    let mut engine = Engine::new();
    let bytes = encoded_bytes(&mut engine, &Null);
    assert_eq!(bytes, vec![0x00]);

    let mut buffer = Buffer::wrap(bytes);
    let value = engine.read_value(&mut buffer).unwrap();
    assert!(value.downcast_ref::<Null>().is_some());
}

#[test]
fn test_name_framing_exact_bytes() {
    #[derive(Debug, Default, Clone, PartialEq)]
    struct Foo;

    struct FooCodec;
    impl TypeCodec<Foo> for FooCodec {
        fn encode(
            &self,
            _value: &Foo,
            out: &mut Buffer,
            _engine: &mut Engine,
        ) -> Result<(), SerializationError> {
            out.write_bytes(&[0xDE, 0xAD, 0xBE, 0xEF])?;
            Ok(())
        }

        fn decode(
            &self,
            input: &mut Buffer,
            _engine: &mut Engine,
        ) -> Result<Foo, SerializationError> {
            input.read_slice(4)?;
            Ok(Foo)
        }
    }

    let mut registry = TypeRegistry::empty();
    registry
        .register_handle(
            TypeHandle::of::<Foo>().named("a.b.Foo"),
            codec_factory::<Foo, _>(|| FooCodec),
        )
        .unwrap();
    let mut engine = Engine::with_registry(registry);

    let bytes = encoded_bytes(&mut engine, &Foo);
    let mut expected = vec![0x07, 0x00, 0x07];
    expected.extend_from_slice(b"a.b.Foo");
    expected.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
    assert_eq!(bytes, expected);

    let mut buffer = Buffer::wrap(bytes);
    assert_eq!(engine.read::<Foo>(&mut buffer).unwrap(), Foo);
}

#[test]
fn test_identifier_width_selection() {
    #[derive(Default)]
    struct W8;
    #[derive(Default)]
    struct W16;
    #[derive(Default)]
    struct W24;
    #[derive(Default)]
    struct W32;

    let mut registry = TypeRegistry::empty();
    registry
        .register_codec_with_id::<W8>(codec_factory::<W8, _>(NothingCodec::new), 1)
        .unwrap();
    registry
        .register_codec_with_id::<W16>(codec_factory::<W16, _>(NothingCodec::new), 1_000)
        .unwrap();
    registry
        .register_codec_with_id::<W24>(codec_factory::<W24, _>(NothingCodec::new), 1_000_000)
        .unwrap();
    registry
        .register_codec_with_id::<W32>(codec_factory::<W32, _>(NothingCodec::new), 20_000_000)
        .unwrap();
    let mut engine = Engine::with_registry(registry);

    // One tag byte plus the identifier in the narrowest width that fits.
    assert_eq!(encoded_bytes(&mut engine, &W8), vec![0x02, 0x01]);
    assert_eq!(encoded_bytes(&mut engine, &W16), vec![0x03, 0x03, 0xE8]);
    assert_eq!(encoded_bytes(&mut engine, &W24), vec![0x04, 0x0F, 0x42, 0x40]);
    assert_eq!(
        encoded_bytes(&mut engine, &W32),
        vec![0x05, 0x01, 0x31, 0x2D, 0x00]
    );
}

#[test]
fn test_reserved_ids_rejected_and_registry_unchanged() {
    let mut registry = TypeRegistry::empty();
    let err = registry
        .register_codec_with_id::<i32>(codec_factory::<i32, _>(|| I32Codec), 200)
        .unwrap_err();
    assert_eq!(err, RegistryError::ReservedId { id: 200 });
    assert_eq!(registry.wire_id::<i32>(), None);
}

#[test]
fn test_registered_views_stay_consistent() {
    let mut registry = TypeRegistry::empty();
    registry
        .register_codec_with_id::<i32>(codec_factory::<i32, _>(|| I32Codec), 300)
        .unwrap();

    assert_eq!(registry.wire_id::<i32>(), Some(300));
    let handle = registry.handle_for_id(300).unwrap();
    assert_eq!(handle.type_id(), std::any::TypeId::of::<i32>());
}

#[test]
fn test_primitive_round_trips_through_default_registry() {
    let mut engine = Engine::new();

    assert!(engine.copy(&true).unwrap());
    assert_eq!(engine.copy(&-12i8).unwrap(), -12);
    assert_eq!(engine.copy(&40_000u16).unwrap(), 40_000);
    assert_eq!(engine.copy(&-5i32).unwrap(), -5);
    assert_eq!(engine.copy(&u64::MAX).unwrap(), u64::MAX);
    assert_eq!(engine.copy(&1.25f64).unwrap(), 1.25);
    assert_eq!(engine.copy(&'è').unwrap(), 'è');
    assert_eq!(engine.copy(&"wire".to_string()).unwrap(), "wire");
}

#[test]
fn test_enum_variants_share_one_identifier() {
    #[derive(Debug, Clone, PartialEq, Default)]
    enum Op {
        #[default]
        Halt,
        Push(i32),
    }

    struct OpCodec;
    impl TypeCodec<Op> for OpCodec {
        fn encode(
            &self,
            value: &Op,
            out: &mut Buffer,
            _engine: &mut Engine,
        ) -> Result<(), SerializationError> {
            match value {
                Op::Halt => {
                    out.write_u8(0)?;
                }
                Op::Push(operand) => {
                    out.write_u8(1)?;
                    out.write_i32(*operand)?;
                }
            }
            Ok(())
        }

        fn decode(&self, input: &mut Buffer, _engine: &mut Engine) -> Result<Op, SerializationError> {
            match input.read_u8()? {
                0 => Ok(Op::Halt),
                1 => Ok(Op::Push(input.read_i32()?)),
                _ => Err(SerializationError::InvalidValue { type_name: "Op" }),
            }
        }
    }

    let mut engine = Engine::new();
    engine
        .registry_mut()
        .register_codec_with_id::<Op>(codec_factory::<Op, _>(|| OpCodec), 60)
        .unwrap();

    let halt = encoded_bytes(&mut engine, &Op::Halt);
    let push = encoded_bytes(&mut engine, &Op::Push(9));
    // Every variant is framed by the declaring enum's identifier.
    assert_eq!(&halt[..2], &[0x02, 60]);
    assert_eq!(&push[..2], &[0x02, 60]);

    assert_eq!(engine.copy(&Op::Push(9)).unwrap(), Op::Push(9));
}

#[test]
fn test_wireable_declared_id_and_round_trip() {
    #[derive(Debug, Clone, PartialEq)]
    struct Member {
        name: String,
        age: i32,
    }

    impl Wireable for Member {
        fn type_handle() -> TypeHandle {
            TypeHandle::of::<Self>().with_id(70)
        }

        fn write_fields(
            &self,
            out: &mut Buffer,
            _engine: &mut Engine,
        ) -> Result<(), SerializationError> {
            out.write_str(&self.name)?;
            out.write_i32(self.age)?;
            Ok(())
        }

        fn read_fields(
            input: &mut Buffer,
            _engine: &mut Engine,
        ) -> Result<Self, SerializationError> {
            Ok(Self {
                name: input.read_str()?,
                age: input.read_i32()?,
            })
        }
    }

    let mut engine = Engine::new();
    let id = engine.registry_mut().register::<Member>().unwrap();
    assert_eq!(id, 70);

    let value = Member {
        name: "ada".to_string(),
        age: 36,
    };
    assert_eq!(engine.copy(&value).unwrap(), value);
}

#[test]
fn test_forked_engines_decode_each_other() {
    let mut original = Engine::new();
    let mut fork = original.fork();

    let mut buffer = original.write_value(&"cross".to_string()).unwrap();
    buffer.flip();
    assert_eq!(fork.read::<String>(&mut buffer).unwrap(), "cross");

    // Mutating the fork's registry does not affect the original.
    #[derive(Default)]
    struct ForkOnly;
    fork.registry_mut()
        .register_codec_with_id::<ForkOnly>(codec_factory::<ForkOnly, _>(NothingCodec::new), 500)
        .unwrap();
    assert_eq!(fork.registry().wire_id::<ForkOnly>(), Some(500));
    assert_eq!(original.registry().wire_id::<ForkOnly>(), None);

    // The original can no longer decode the fork-only identifier.
    let mut encoded = fork.write_value(&ForkOnly).unwrap();
    encoded.flip();
    let err = original.read_value(&mut encoded).unwrap_err();
    assert_eq!(err, SerializationError::UnknownTypeId { id: 500 });
}

#[test]
fn test_opaque_escape_hatch() {
    #[derive(Debug, Clone, PartialEq)]
    struct Blob(Vec<u8>);

    struct BlobOpaque;
    impl OpaqueCodec for BlobOpaque {
        fn encode(&self, value: &(dyn Any + Send)) -> Result<Vec<u8>, SerializationError> {
            value
                .downcast_ref::<Blob>()
                .map(|blob| blob.0.clone())
                .ok_or_else(SerializationError::type_mismatch::<Blob>)
        }

        fn decode(&self, bytes: &[u8]) -> Result<BoxedValue, SerializationError> {
            Ok(Box::new(Blob(bytes.to_vec())))
        }
    }

    let mut engine = Engine::new();
    engine.set_opaque_codec(Arc::new(BlobOpaque));

    let value = Blob(vec![1, 2, 3]);
    let bytes = encoded_bytes(&mut engine, &value);
    assert_eq!(bytes, vec![0x08, 0x00, 0x03, 1, 2, 3]);

    let mut buffer = Buffer::wrap(bytes);
    let decoded = engine.read_value(&mut buffer).unwrap();
    assert_eq!(*decoded.downcast::<Blob>().unwrap(), value);
}

#[test]
fn test_opaque_payload_too_large() {
    #[derive(Debug)]
    struct Big;

    struct BigOpaque;
    impl OpaqueCodec for BigOpaque {
        fn encode(&self, _value: &(dyn Any + Send)) -> Result<Vec<u8>, SerializationError> {
            Ok(vec![0; u16::MAX as usize + 1])
        }

        fn decode(&self, _bytes: &[u8]) -> Result<BoxedValue, SerializationError> {
            Ok(Box::new(Big))
        }
    }

    let mut engine = Engine::new();
    engine.set_opaque_codec(Arc::new(BigOpaque));

    let err = engine.write_value(&Big).unwrap_err();
    assert_eq!(
        err,
        SerializationError::PayloadTooLarge {
            length: u16::MAX as usize + 1
        }
    );
}

#[test]
fn test_encode_releases_buffers_on_success_and_error() {
    let mut engine = Engine::new();
    let baseline = engine.allocator().pooled();

    // Successful copy: the scratch buffer returns to the pool.
    engine.copy(&7i32).unwrap();
    let after_copy = engine.allocator().pooled();
    assert!(after_copy > baseline);

    // Failed encode: the freshly allocated buffer still returns.
    struct Unknown;
    engine.write_value(&Unknown).unwrap_err();
    assert_eq!(engine.allocator().pooled(), after_copy);
}
