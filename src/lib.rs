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

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! # Architecture
//!
//! TagWire is organized into five layers, each building on the one below:
//!
//! - **[`buffer`]**: pooled, growable byte buffers with cursor-based I/O
//! - **[`codec`]**: the per-type encode/decode contract and codec factories
//! - **[`registry`]**: the map between types, wire identifiers and factories
//! - **[`engine`]**: tagged dispatch: framing tags, width selection and the
//!   per-engine codec cache
//! - **[`connection`]**: in-process request/response endpoints bound to
//!   single-threaded contexts
//!
//! The wire grammar is documented on the [`engine`] module; the RPC status
//! envelope on the [`connection`] module.
//!
//! # Registering types
//!
//! Types reach the wire in one of three ways:
//!
//! - **By identifier**: registered with a codec factory and a stable integer
//!   id, the compact, preferred framing.
//! - **By name**: registered with a codec factory only; the registered type
//!   name is written instead of an id.
//! - **As a [`Wireable`]**: the type serializes its own fields and may
//!   declare its preferred identifier.
//!
//! Identifiers 128–255 are reserved and rejected at registration.

pub mod buffer;
pub mod builtin;
pub mod codec;
pub mod connection;
pub mod engine;
pub mod registry;

pub use buffer::{Buffer, BufferAllocator, BufferError};
pub use codec::{BoxedValue, Codec, CodecFactory, Null, OpaqueCodec, TypeCodec, Wireable};
pub use connection::{
    Connection, ConnectionError, LocalConnection, ServiceError, ThreadContext,
};
pub use engine::{Engine, SerializationError};
pub use registry::{RegistryError, TypeHandle, TypeRegistry};
