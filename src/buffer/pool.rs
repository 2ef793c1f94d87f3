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

//! Pooled buffer allocation.
//!
//! Serialization allocates and discards buffers at a high rate, so backing
//! storage is recycled through a size-classed pool rather than returned to
//! the global allocator. A [`BufferAllocator`] is a cheap handle onto a
//! shared pool; every [`Buffer`] it hands out returns its storage to the
//! pool exactly once, when the buffer is dropped or explicitly released.

use crate::buffer::Buffer;
use parking_lot::Mutex;
use std::sync::Arc;

/// Size classes for pooled storage (powers of two).
const SIZE_CLASSES: &[usize] = &[
    256,     // 256 B
    1024,    // 1 KB
    4096,    // 4 KB
    16384,   // 16 KB
    65536,   // 64 KB
    262144,  // 256 KB
    1048576, // 1 MB
];

/// Maximum number of free buffers retained per size class.
const MAX_POOLED_PER_CLASS: usize = 32;

/// Storage larger than this is never pooled.
const MAX_POOLED_SIZE: usize = 1024 * 1024;

/// Shared pool state behind every allocator handle.
pub(crate) struct PoolShared {
    classes: Vec<Mutex<Vec<Vec<u8>>>>,
}

impl PoolShared {
    fn new() -> Self {
        Self {
            classes: SIZE_CLASSES.iter().map(|_| Mutex::new(Vec::new())).collect(),
        }
    }

    /// Checks out cleared storage with at least `min_capacity` bytes of capacity.
    fn checkout(&self, min_capacity: usize) -> Vec<u8> {
        let class = SIZE_CLASSES.iter().position(|&size| size >= min_capacity);
        if let Some(idx) = class {
            if let Some(mut storage) = self.classes[idx].lock().pop() {
                storage.clear();
                return storage;
            }
            Vec::with_capacity(SIZE_CLASSES[idx])
        } else {
            Vec::with_capacity(min_capacity)
        }
    }

    /// Returns storage to the pool, discarding it when the class is full.
    pub(crate) fn restore(&self, storage: Vec<u8>) {
        let capacity = storage.capacity();
        if capacity == 0 || capacity > MAX_POOLED_SIZE {
            return;
        }
        if let Some(idx) = SIZE_CLASSES.iter().position(|&size| size >= capacity) {
            let mut free = self.classes[idx].lock();
            if free.len() < MAX_POOLED_PER_CLASS {
                free.push(storage);
            }
        }
    }

    fn pooled(&self) -> usize {
        self.classes.iter().map(|class| class.lock().len()).sum()
    }
}

/// Allocates [`Buffer`]s backed by a shared storage pool.
///
/// Allocators are cheap to clone; clones share the same pool. The maximum
/// capacity of allocated buffers defaults to
/// [`DEFAULT_MAX_CAPACITY`](Self::DEFAULT_MAX_CAPACITY) and can be set
/// per-buffer with [`allocate_with`](Self::allocate_with).
///
/// # Example
///
/// ```rust
/// use tagwire::buffer::BufferAllocator;
///
/// let allocator = BufferAllocator::new();
/// let mut buffer = allocator.allocate();
/// buffer.write_u32(7).unwrap();
/// // Storage returns to the pool when the buffer drops.
/// ```
#[derive(Clone)]
pub struct BufferAllocator {
    shared: Arc<PoolShared>,
    max_capacity: usize,
}

impl BufferAllocator {
    /// Default maximum capacity of allocated buffers (16 MB).
    pub const DEFAULT_MAX_CAPACITY: usize = 16 * 1024 * 1024;

    /// Creates an allocator with its own pool and the default maximum capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(PoolShared::new()),
            max_capacity: Self::DEFAULT_MAX_CAPACITY,
        }
    }

    /// Creates an allocator whose buffers cap out at `max_capacity` bytes.
    #[must_use]
    pub fn with_max_capacity(max_capacity: usize) -> Self {
        Self {
            shared: Arc::new(PoolShared::new()),
            max_capacity,
        }
    }

    /// Allocates an empty buffer with the smallest pooled capacity.
    #[must_use]
    pub fn allocate(&self) -> Buffer {
        self.allocate_with(SIZE_CLASSES[0], self.max_capacity)
    }

    /// Allocates an empty buffer with at least `initial_capacity` bytes of
    /// storage and the given maximum capacity.
    #[must_use]
    pub fn allocate_with(&self, initial_capacity: usize, max_capacity: usize) -> Buffer {
        let storage = self.shared.checkout(initial_capacity);
        Buffer::pooled(storage, max_capacity, Arc::clone(&self.shared))
    }

    /// Number of free storage blocks currently held by the pool.
    #[must_use]
    pub fn pooled(&self) -> usize {
        self.shared.pooled()
    }
}

impl Default for BufferAllocator {
    fn default() -> Self {
        Self::new()
    }
}
