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

//! Single-threaded execution contexts carrying a dedicated engine.
//!
//! The engine is not thread-safe, so each connection endpoint binds to a
//! [`ThreadContext`]: a dedicated task that owns one [`Engine`] and runs
//! submitted jobs one at a time, in submission order. Everything an
//! endpoint encodes or decodes happens on its context, which is what makes
//! sharing a connection handle between tasks sound.

use crate::connection::ConnectionError;
use crate::engine::Engine;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

/// Global counter for generating unique context IDs.
static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

type Job = Box<dyn FnOnce(&mut Engine) + Send>;

/// A single-threaded executor owning a dedicated [`Engine`].
///
/// Contexts are cheap to clone; clones submit to the same task. The task
/// stops once every handle is dropped and the queue drains.
///
/// # Example
///
/// ```rust,no_run
/// use tagwire::connection::ThreadContext;
/// use tagwire::Engine;
///
/// # async fn example() {
/// let context = ThreadContext::spawn(Engine::new());
/// let id = context
///     .run(|engine| engine.registry().wire_id::<i32>())
///     .await
///     .unwrap();
/// assert_eq!(id, Some(6));
/// # }
/// ```
#[derive(Clone)]
pub struct ThreadContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    id: u64,
    jobs: mpsc::UnboundedSender<Job>,
}

impl ThreadContext {
    /// Spawns a context task that takes ownership of `engine`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(engine: Engine) -> Self {
        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();
        tokio::spawn(async move {
            let mut engine = engine;
            while let Some(job) = queue.recv().await {
                job(&mut engine);
            }
            trace!(context_id = id, "thread context stopped");
        });
        Self {
            inner: Arc::new(ContextInner { id, jobs }),
        }
    }

    /// The context's unique identifier.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Submits a job without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::ContextStopped`] if the context task is
    /// gone.
    pub fn execute(
        &self,
        job: impl FnOnce(&mut Engine) + Send + 'static,
    ) -> Result<(), ConnectionError> {
        self.inner
            .jobs
            .send(Box::new(job))
            .map_err(|_| ConnectionError::ContextStopped)
    }

    /// Runs a job on the context and resolves with its result.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::ContextStopped`] if the context task is
    /// gone.
    pub async fn run<F, R>(&self, job: F) -> Result<R, ConnectionError>
    where
        F: FnOnce(&mut Engine) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (done, result) = oneshot::channel();
        self.execute(move |engine| {
            let _ = done.send(job(engine));
        })?;
        result.await.map_err(|_| ConnectionError::ContextStopped)
    }
}
