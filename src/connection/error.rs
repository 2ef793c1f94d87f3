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

//! Error types for the connection layer.

use crate::buffer::Buffer;
use crate::codec::TypeCodec;
use crate::engine::{Engine, SerializationError};
use std::any::TypeId;
use thiserror::Error;

/// An application-level failure produced by a request handler.
///
/// Service errors are values: the receive path encodes them behind a `0`
/// status byte, and the caller decodes them back into an equal
/// `ServiceError`. The standard resolver binds this type at wire id 19 so
/// both directions agree without extra registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ServiceError {
    message: String,
}

impl ServiceError {
    /// Creates a service error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Codec for [`ServiceError`]: the message as a length-prefixed string.
pub(crate) struct ServiceErrorCodec;

impl TypeCodec<ServiceError> for ServiceErrorCodec {
    fn encode(
        &self,
        value: &ServiceError,
        out: &mut Buffer,
        _engine: &mut Engine,
    ) -> Result<(), SerializationError> {
        out.write_str(&value.message)?;
        Ok(())
    }

    fn decode(
        &self,
        input: &mut Buffer,
        _engine: &mut Engine,
    ) -> Result<ServiceError, SerializationError> {
        Ok(ServiceError {
            message: input.read_str()?,
        })
    }
}

/// Errors raised by the connection layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// The connection (or its peer) has been closed.
    #[error("connection closed")]
    Closed,

    /// No handler is installed for the request's type.
    #[error("no handler registered for request type {type_id:?}")]
    NoHandler {
        /// Concrete type of the rejected request.
        type_id: TypeId,
    },

    /// The remote handler failed; the error value round-tripped through the
    /// codec layer.
    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    /// Encoding or decoding a message failed.
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// The thread context backing this endpoint has stopped.
    #[error("thread context stopped")]
    ContextStopped,
}
