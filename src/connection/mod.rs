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

//! In-process request/response connections built on the codec engine.
//!
//! A [`LocalConnection`] is one half of a bidirectional endpoint pair. Each
//! endpoint is bound to a [`ThreadContext`] carrying its own engine; every
//! encode and decode an endpoint performs runs on its context. Requests and
//! responses travel between the peers as flipped buffers with a one-byte
//! status envelope:
//!
//! ```text
//! envelope := u8 status, message
//! status   := 1 (response) | 0 (error)
//! ```
//!
//! On status `0` the payload is a [`ServiceError`] value, reconstructed on
//! the caller's side and surfaced as [`ConnectionError::Service`].
//!
//! The protocol imposes no ordering across in-flight requests, and the
//! connection provides no timeouts; callers wrap [`send`](Connection::send)
//! in their own timeout when they need one.

mod context;
mod error;

pub use context::ThreadContext;
pub use error::{ConnectionError, ServiceError};

pub(crate) use error::ServiceErrorCodec;

use crate::buffer::Buffer;
use crate::codec::BoxedValue;
use crate::engine::SerializationError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Status byte prefixed to a successful response payload.
const RESPONSE_OK: u8 = 1;

/// Status byte prefixed to an error payload.
const RESPONSE_ERROR: u8 = 0;

/// Global counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// The future a request handler returns.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<BoxedValue, ServiceError>> + Send>>;

type HandlerFn = dyn Fn(BoxedValue) -> HandlerFuture + Send + Sync;
type CloseListener = Arc<dyn Fn() + Send + Sync>;
type ExceptionListener = Arc<dyn Fn(&SerializationError) + Send + Sync>;

/// A set of live connection IDs shared by related endpoints.
///
/// Endpoints created with [`LocalConnection::pair_in`] add themselves to the
/// group and remove themselves on close.
pub type ConnectionGroup = Arc<Mutex<HashSet<u64>>>;

/// A bidirectional request/response endpoint.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Sends a request and resolves with the peer's response value.
    ///
    /// The request is owned by the connection from this point on and is
    /// released once it has been encoded and handed off.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when the connection is closed, no handler
    /// is installed for the request type, the handler fails, or a codec
    /// error occurs on either side.
    async fn send(&self, request: BoxedValue) -> Result<BoxedValue, ConnectionError>;

    /// Closes the endpoint and its peer.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::ContextStopped`] if the endpoint's context
    /// is gone.
    async fn close(&self) -> Result<(), ConnectionError>;
}

/// Handler plus the context it executes on.
#[derive(Clone)]
struct HandlerHolder {
    handler: Arc<HandlerFn>,
    context: ThreadContext,
}

struct ConnectionInner {
    id: u64,
    context: ThreadContext,
    peer: Mutex<Weak<ConnectionInner>>,
    group: Option<ConnectionGroup>,
    handlers: Mutex<HashMap<TypeId, HandlerHolder>>,
    close_listeners: Mutex<Vec<CloseListener>>,
    exception_listeners: Mutex<Vec<ExceptionListener>>,
    closed: AtomicBool,
}

/// An in-process connection endpoint.
///
/// Endpoints are created in connected pairs and are cheap to clone; clones
/// address the same endpoint.
///
/// # Example
///
/// ```rust,no_run
/// use tagwire::connection::{Connection, LocalConnection, ThreadContext};
/// use tagwire::Engine;
///
/// # async fn example() -> Result<(), tagwire::connection::ConnectionError> {
/// let engine = Engine::new();
/// let server_ctx = ThreadContext::spawn(engine.fork());
/// let client_ctx = ThreadContext::spawn(engine.fork());
/// let (server, client) = LocalConnection::pair(&server_ctx, &client_ctx);
///
/// // Echo any string request back.
/// server.handler::<String, _>(|request| {
///     Box::pin(async move {
///         let response: tagwire::BoxedValue = Box::new(*request);
///         Ok(response)
///     })
/// });
///
/// let response = client.send(Box::new("ping".to_string())).await?;
/// assert_eq!(*response.downcast::<String>().unwrap(), "ping");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalConnection {
    inner: Arc<ConnectionInner>,
}

impl LocalConnection {
    /// Creates a connected endpoint pair bound to the given contexts.
    #[must_use]
    pub fn pair(left: &ThreadContext, right: &ThreadContext) -> (Self, Self) {
        Self::build_pair(None, left, right)
    }

    /// Creates a connected endpoint pair that registers itself in `group`.
    #[must_use]
    pub fn pair_in(
        group: &ConnectionGroup,
        left: &ThreadContext,
        right: &ThreadContext,
    ) -> (Self, Self) {
        Self::build_pair(Some(Arc::clone(group)), left, right)
    }

    fn build_pair(
        group: Option<ConnectionGroup>,
        left: &ThreadContext,
        right: &ThreadContext,
    ) -> (Self, Self) {
        let a = Self::endpoint(group.clone(), left.clone());
        let b = Self::endpoint(group, right.clone());
        *a.inner.peer.lock() = Arc::downgrade(&b.inner);
        *b.inner.peer.lock() = Arc::downgrade(&a.inner);
        debug!(left = a.inner.id, right = b.inner.id, "paired local connections");
        (a, b)
    }

    fn endpoint(group: Option<ConnectionGroup>, context: ThreadContext) -> Self {
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        if let Some(group) = &group {
            group.lock().insert(id);
        }
        Self {
            inner: Arc::new(ConnectionInner {
                id,
                context,
                peer: Mutex::new(Weak::new()),
                group,
                handlers: Mutex::new(HashMap::new()),
                close_listeners: Mutex::new(Vec::new()),
                exception_listeners: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// The endpoint's unique identifier.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The context this endpoint is bound to.
    #[must_use]
    pub fn context(&self) -> &ThreadContext {
        &self.inner.context
    }

    /// Returns `true` once the endpoint has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Installs a handler for requests of type `Req`, bound to this
    /// endpoint's context.
    pub fn handler<Req, F>(&self, handler: F) -> &Self
    where
        Req: Any + Send,
        F: Fn(Box<Req>) -> HandlerFuture + Send + Sync + 'static,
    {
        self.handler_on::<Req, F>(self.inner.context.clone(), handler)
    }

    /// Installs a handler for requests of type `Req`, bound to an explicit
    /// context.
    pub fn handler_on<Req, F>(&self, context: ThreadContext, handler: F) -> &Self
    where
        Req: Any + Send,
        F: Fn(Box<Req>) -> HandlerFuture + Send + Sync + 'static,
    {
        let wrapped: Arc<HandlerFn> = Arc::new(move |request: BoxedValue| {
            match request.downcast::<Req>() {
                Ok(request) => handler(request),
                Err(_) => Box::pin(async { Err(ServiceError::new("request type mismatch")) }),
            }
        });
        debug!(
            connection_id = self.inner.id,
            request_type = std::any::type_name::<Req>(),
            "installed handler"
        );
        self.inner.handlers.lock().insert(
            TypeId::of::<Req>(),
            HandlerHolder {
                handler: wrapped,
                context,
            },
        );
        self
    }

    /// Removes the handler for requests of type `Req`, if any.
    pub fn remove_handler<Req: Any>(&self) -> &Self {
        self.inner.handlers.lock().remove(&TypeId::of::<Req>());
        self
    }

    /// Registers a listener invoked on the endpoint's context when the
    /// connection closes.
    pub fn on_close(&self, listener: impl Fn() + Send + Sync + 'static) -> &Self {
        self.inner.close_listeners.lock().push(Arc::new(listener));
        self
    }

    /// Registers a listener invoked when the receive path hits a codec
    /// error.
    pub fn on_exception(
        &self,
        listener: impl Fn(&SerializationError) + Send + Sync + 'static,
    ) -> &Self {
        self.inner
            .exception_listeners
            .lock()
            .push(Arc::new(listener));
        self
    }

    fn peer(&self) -> Result<LocalConnection, ConnectionError> {
        self.inner
            .peer
            .lock()
            .upgrade()
            .map(|inner| LocalConnection { inner })
            .ok_or(ConnectionError::Closed)
    }

    fn fire_exception(&self, error: &SerializationError) {
        warn!(connection_id = self.inner.id, %error, "receive path failed");
        let listeners: Vec<ExceptionListener> =
            self.inner.exception_listeners.lock().clone();
        for listener in listeners {
            listener(error);
        }
    }

    /// Decodes a request, dispatches it to the installed handler and
    /// returns the encoded, flipped response buffer.
    async fn receive(&self, request_buffer: Buffer) -> Result<Buffer, ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }

        // Decode on this endpoint's context; the request buffer is released
        // as soon as the value is out of it.
        let decoded = self
            .inner
            .context
            .run(move |engine| {
                let mut buffer = request_buffer;
                engine.read_value(&mut buffer)
            })
            .await?;
        let request = match decoded {
            Ok(request) => request,
            Err(error) => {
                self.fire_exception(&error);
                return Err(error.into());
            }
        };

        let type_id = request.as_ref().type_id();
        let holder = self.inner.handlers.lock().get(&type_id).cloned();
        let Some(holder) = holder else {
            return Err(ConnectionError::NoHandler { type_id });
        };

        // The handler is invoked on its bound context; its future completes
        // wherever the work finishes.
        let handler = Arc::clone(&holder.handler);
        let pending = holder
            .context
            .run(move |_engine| handler(request))
            .await?;
        let outcome = pending.await;

        // Encode the status envelope and payload with this endpoint's
        // engine; the response value is released once encoded.
        let encoded = self
            .inner
            .context
            .run(move |engine| -> Result<Buffer, SerializationError> {
                let mut out = engine.allocate();
                match outcome {
                    Ok(response) => {
                        out.write_u8(RESPONSE_OK)?;
                        engine.write_to(response.as_ref(), &mut out)?;
                    }
                    Err(error) => {
                        out.write_u8(RESPONSE_ERROR)?;
                        engine.write_to(&error, &mut out)?;
                    }
                }
                Ok(out.flipped())
            })
            .await?;
        match encoded {
            Ok(buffer) => Ok(buffer),
            Err(error) => {
                self.fire_exception(&error);
                Err(error.into())
            }
        }
    }

    fn do_close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(connection_id = self.inner.id, "closing connection");
        if let Some(group) = &self.inner.group {
            group.lock().remove(&self.inner.id);
        }
        let listeners: Vec<CloseListener> = self.inner.close_listeners.lock().clone();
        for listener in listeners {
            let _ = self.inner.context.execute(move |_engine| listener());
        }
    }
}

#[async_trait]
impl Connection for LocalConnection {
    async fn send(&self, request: BoxedValue) -> Result<BoxedValue, ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }
        let peer = self.peer()?;

        // Encode on the caller's context; the request value is released
        // after the buffer is handed off.
        let request_buffer = self
            .inner
            .context
            .run(move |engine| -> Result<Buffer, SerializationError> {
                let mut out = engine.allocate();
                engine.write_to(request.as_ref(), &mut out)?;
                Ok(out.flipped())
            })
            .await??;

        let response_buffer = peer.receive(request_buffer).await?;

        // Decode on the caller's context; the response buffer is released
        // on every path.
        self.inner
            .context
            .run(move |engine| -> Result<BoxedValue, ConnectionError> {
                let mut response = response_buffer;
                let status = response.read_u8().map_err(SerializationError::from)?;
                let value = engine.read_value(&mut response)?;
                if status == RESPONSE_OK {
                    Ok(value)
                } else {
                    match value.downcast::<ServiceError>() {
                        Ok(error) => Err(ConnectionError::Service(*error)),
                        Err(_) => Err(SerializationError::type_mismatch::<ServiceError>().into()),
                    }
                }
            })
            .await?
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        self.do_close();
        if let Ok(peer) = self.peer() {
            peer.do_close();
        }
        // Drain one job through the queue so close listeners have run by
        // the time the future resolves.
        self.inner.context.run(|_engine| ()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Engine;

    fn contexts() -> (ThreadContext, ThreadContext) {
        let engine = Engine::new();
        (
            ThreadContext::spawn(engine.fork()),
            ThreadContext::spawn(engine.fork()),
        )
    }

    #[tokio::test]
    async fn test_echo_round_trip() {
        let (server_ctx, client_ctx) = contexts();
        let (server, client) = LocalConnection::pair(&server_ctx, &client_ctx);

        server.handler::<i64, _>(|request| {
            Box::pin(async move { Ok(Box::new(*request * 2) as BoxedValue) })
        });

        let response = client.send(Box::new(21i64)).await.unwrap();
        assert_eq!(*response.downcast::<i64>().unwrap(), 42);
    }

    #[tokio::test]
    async fn test_no_handler() {
        let (server_ctx, client_ctx) = contexts();
        let (_server, client) = LocalConnection::pair(&server_ctx, &client_ctx);

        let err = client.send(Box::new(1i64)).await.unwrap_err();
        assert_eq!(
            err,
            ConnectionError::NoHandler {
                type_id: TypeId::of::<i64>()
            }
        );
    }

    #[tokio::test]
    async fn test_removed_handler_stops_dispatch() {
        let (server_ctx, client_ctx) = contexts();
        let (server, client) = LocalConnection::pair(&server_ctx, &client_ctx);

        server.handler::<i64, _>(|request| Box::pin(async move { Ok(request as BoxedValue) }));
        client.send(Box::new(1i64)).await.unwrap();

        server.remove_handler::<i64>();
        let err = client.send(Box::new(1i64)).await.unwrap_err();
        assert!(matches!(err, ConnectionError::NoHandler { .. }));
    }

    #[tokio::test]
    async fn test_handler_error_round_trips() {
        let (server_ctx, client_ctx) = contexts();
        let (server, client) = LocalConnection::pair(&server_ctx, &client_ctx);

        server.handler::<String, _>(|_request| {
            Box::pin(async move { Err(ServiceError::new("boom")) })
        });

        let err = client.send(Box::new("hello".to_string())).await.unwrap_err();
        assert_eq!(err, ConnectionError::Service(ServiceError::new("boom")));
    }

    #[tokio::test]
    async fn test_close_cascades_and_fires_listeners() {
        let (server_ctx, client_ctx) = contexts();
        let group: ConnectionGroup = Arc::new(Mutex::new(HashSet::new()));
        let (server, client) = LocalConnection::pair_in(&group, &server_ctx, &client_ctx);
        assert_eq!(group.lock().len(), 2);

        let closed = Arc::new(AtomicBool::new(false));
        let observed = Arc::clone(&closed);
        client.on_close(move || observed.store(true, Ordering::SeqCst));

        client.close().await.unwrap();

        assert!(client.is_closed());
        assert!(server.is_closed());
        assert!(closed.load(Ordering::SeqCst));
        assert!(group.lock().is_empty());

        let err = client.send(Box::new(1i64)).await.unwrap_err();
        assert_eq!(err, ConnectionError::Closed);
    }

    #[tokio::test]
    async fn test_receive_after_close_rejected() {
        let (server_ctx, client_ctx) = contexts();
        let (server, client) = LocalConnection::pair(&server_ctx, &client_ctx);
        server.handler::<i64, _>(|request| Box::pin(async move { Ok(request as BoxedValue) }));

        server.do_close();
        let err = client.send(Box::new(1i64)).await.unwrap_err();
        assert_eq!(err, ConnectionError::Closed);
    }
}
