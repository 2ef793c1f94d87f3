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

//! Scoped byte buffers with cursor-based primitive I/O.
//!
//! A [`Buffer`] is a growable byte region with a current `position`, a read
//! `limit` and a `max_capacity`. Writes happen at the cursor and auto-grow
//! the region up to the maximum capacity; reads consume bytes between the
//! cursor and the limit. [`flip`](Buffer::flip) converts a freshly written
//! buffer into one ready for reading, mirroring the usual fill/drain cycle:
//!
//! ```text
//! write u8/u16/... ──► [ data | position ──► | max_capacity ]
//! flip()           ──► [ position = 0, limit = written bytes ]
//! read u8/u16/...  ──► consume position..limit
//! ```
//!
//! All multi-byte values are big-endian. Strings are length-prefixed with an
//! unsigned 16-bit byte count.
//!
//! Buffers are scoped resources: storage checked out of a
//! [`BufferAllocator`] pool is returned exactly once, when the buffer is
//! dropped (or explicitly [`release`](Buffer::release)d).

mod error;
mod pool;

pub use error::BufferError;
pub use pool::BufferAllocator;

use pool::PoolShared;
use std::fmt;
use std::sync::Arc;

/// A growable byte region with a cursor, a read limit and a capacity cap.
///
/// # Example
///
/// ```rust
/// use tagwire::buffer::BufferAllocator;
///
/// let allocator = BufferAllocator::new();
/// let mut buffer = allocator.allocate();
///
/// buffer.write_u16(0xBEEF).unwrap();
/// buffer.write_str("hello").unwrap();
/// buffer.flip();
///
/// assert_eq!(buffer.read_u16().unwrap(), 0xBEEF);
/// assert_eq!(buffer.read_str().unwrap(), "hello");
/// ```
pub struct Buffer {
    data: Vec<u8>,
    position: usize,
    limit: usize,
    max_capacity: usize,
    pool: Option<Arc<PoolShared>>,
}

impl Buffer {
    /// Creates a pooled buffer over checked-out storage.
    pub(crate) fn pooled(storage: Vec<u8>, max_capacity: usize, pool: Arc<PoolShared>) -> Self {
        Self {
            data: storage,
            position: 0,
            limit: 0,
            max_capacity,
            pool: Some(pool),
        }
    }

    /// Wraps an existing byte vector in an unpooled buffer ready for reading.
    ///
    /// The buffer's limit is the vector's length and its position is zero.
    #[must_use]
    pub fn wrap(data: Vec<u8>) -> Self {
        let limit = data.len();
        Self {
            data,
            position: 0,
            limit,
            max_capacity: usize::MAX,
            pool: None,
        }
    }

    /// Current cursor position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Read limit: one past the last readable byte.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of readable bytes between the cursor and the limit.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.position)
    }

    /// Returns `true` when readable bytes remain.
    #[must_use]
    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    /// Current storage capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Maximum capacity this buffer may grow to.
    #[must_use]
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Flips the buffer from writing to reading: the limit becomes the
    /// cursor position and the cursor rewinds to zero.
    pub fn flip(&mut self) -> &mut Self {
        self.limit = self.position;
        self.position = 0;
        self
    }

    /// Consumes the buffer, returning it flipped for reading.
    #[must_use]
    pub fn flipped(mut self) -> Self {
        self.flip();
        self
    }

    /// Rewinds the cursor to zero without touching the limit.
    pub fn rewind(&mut self) -> &mut Self {
        self.position = 0;
        self
    }

    /// Resets the buffer for reuse: cursor and limit return to zero.
    pub fn clear(&mut self) -> &mut Self {
        self.position = 0;
        self.limit = 0;
        self
    }

    /// The readable bytes between the cursor and the limit.
    #[must_use]
    pub fn readable(&self) -> &[u8] {
        &self.data[self.position..self.limit]
    }

    /// Releases the buffer, returning its storage to the pool.
    ///
    /// Dropping the buffer has the same effect; `release` exists to make the
    /// hand-back explicit at ownership boundaries.
    pub fn release(self) {}

    fn ensure(&mut self, additional: usize) -> Result<(), BufferError> {
        let needed = self.position + additional;
        if needed > self.data.len() {
            if needed > self.max_capacity {
                return Err(BufferError::CapacityExceeded {
                    requested: needed,
                    max_capacity: self.max_capacity,
                });
            }
            self.data.resize(needed, 0);
        }
        Ok(())
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        self.ensure(bytes.len())?;
        self.data[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
        if self.position > self.limit {
            self.limit = self.position;
        }
        Ok(())
    }

    fn take(&mut self, count: usize) -> Result<&[u8], BufferError> {
        if self.remaining() < count {
            return Err(BufferError::Underflow {
                requested: count,
                remaining: self.remaining(),
            });
        }
        let start = self.position;
        self.position += count;
        Ok(&self.data[start..self.position])
    }

    /// Writes raw bytes at the cursor.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, BufferError> {
        self.put(bytes)?;
        Ok(self)
    }

    /// Writes a single byte.
    pub fn write_u8(&mut self, value: u8) -> Result<&mut Self, BufferError> {
        self.put(&[value])?;
        Ok(self)
    }

    /// Writes a boolean as a single byte (1 or 0).
    pub fn write_bool(&mut self, value: bool) -> Result<&mut Self, BufferError> {
        self.write_u8(u8::from(value))
    }

    /// Writes a signed byte.
    pub fn write_i8(&mut self, value: i8) -> Result<&mut Self, BufferError> {
        self.write_u8(value as u8)
    }

    /// Writes an unsigned 16-bit integer, big-endian.
    pub fn write_u16(&mut self, value: u16) -> Result<&mut Self, BufferError> {
        self.put(&value.to_be_bytes())?;
        Ok(self)
    }

    /// Writes a signed 16-bit integer, big-endian.
    pub fn write_i16(&mut self, value: i16) -> Result<&mut Self, BufferError> {
        self.put(&value.to_be_bytes())?;
        Ok(self)
    }

    /// Writes the low 24 bits of `value` as an unsigned big-endian triple.
    pub fn write_u24(&mut self, value: u32) -> Result<&mut Self, BufferError> {
        let bytes = value.to_be_bytes();
        self.put(&bytes[1..4])?;
        Ok(self)
    }

    /// Writes an unsigned 32-bit integer, big-endian.
    pub fn write_u32(&mut self, value: u32) -> Result<&mut Self, BufferError> {
        self.put(&value.to_be_bytes())?;
        Ok(self)
    }

    /// Writes a signed 32-bit integer, big-endian.
    pub fn write_i32(&mut self, value: i32) -> Result<&mut Self, BufferError> {
        self.put(&value.to_be_bytes())?;
        Ok(self)
    }

    /// Writes an unsigned 64-bit integer, big-endian.
    pub fn write_u64(&mut self, value: u64) -> Result<&mut Self, BufferError> {
        self.put(&value.to_be_bytes())?;
        Ok(self)
    }

    /// Writes a signed 64-bit integer, big-endian.
    pub fn write_i64(&mut self, value: i64) -> Result<&mut Self, BufferError> {
        self.put(&value.to_be_bytes())?;
        Ok(self)
    }

    /// Writes an IEEE-754 single-precision float, big-endian.
    pub fn write_f32(&mut self, value: f32) -> Result<&mut Self, BufferError> {
        self.put(&value.to_be_bytes())?;
        Ok(self)
    }

    /// Writes an IEEE-754 double-precision float, big-endian.
    pub fn write_f64(&mut self, value: f64) -> Result<&mut Self, BufferError> {
        self.put(&value.to_be_bytes())?;
        Ok(self)
    }

    /// Writes a string as an unsigned 16-bit byte count followed by UTF-8.
    ///
    /// # Errors
    ///
    /// Fails with [`BufferError::StringTooLong`] when the UTF-8 encoding
    /// exceeds 65 535 bytes.
    pub fn write_str(&mut self, value: &str) -> Result<&mut Self, BufferError> {
        let bytes = value.as_bytes();
        if bytes.len() > u16::MAX as usize {
            return Err(BufferError::StringTooLong { length: bytes.len() });
        }
        self.write_u16(bytes.len() as u16)?;
        self.put(bytes)?;
        Ok(self)
    }

    /// Reads raw bytes into `dst`, filling it exactly.
    pub fn read_bytes(&mut self, dst: &mut [u8]) -> Result<(), BufferError> {
        let src = self.take(dst.len())?;
        dst.copy_from_slice(src);
        Ok(())
    }

    /// Reads `count` bytes, advancing the cursor past them.
    pub fn read_slice(&mut self, count: usize) -> Result<&[u8], BufferError> {
        self.take(count)
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> Result<u8, BufferError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a boolean written by [`write_bool`](Self::write_bool).
    pub fn read_bool(&mut self) -> Result<bool, BufferError> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads a signed byte.
    pub fn read_i8(&mut self) -> Result<i8, BufferError> {
        Ok(self.read_u8()? as i8)
    }

    /// Reads an unsigned 16-bit integer, big-endian.
    pub fn read_u16(&mut self) -> Result<u16, BufferError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Reads a signed 16-bit integer, big-endian.
    pub fn read_i16(&mut self) -> Result<i16, BufferError> {
        let bytes = self.take(2)?;
        Ok(i16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Reads an unsigned 24-bit integer, big-endian.
    pub fn read_u24(&mut self) -> Result<u32, BufferError> {
        let bytes = self.take(3)?;
        Ok(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
    }

    /// Reads an unsigned 32-bit integer, big-endian.
    pub fn read_u32(&mut self) -> Result<u32, BufferError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a signed 32-bit integer, big-endian.
    pub fn read_i32(&mut self) -> Result<i32, BufferError> {
        let bytes = self.take(4)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads an unsigned 64-bit integer, big-endian.
    pub fn read_u64(&mut self) -> Result<u64, BufferError> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(raw))
    }

    /// Reads a signed 64-bit integer, big-endian.
    pub fn read_i64(&mut self) -> Result<i64, BufferError> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(i64::from_be_bytes(raw))
    }

    /// Reads an IEEE-754 single-precision float, big-endian.
    pub fn read_f32(&mut self) -> Result<f32, BufferError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Reads an IEEE-754 double-precision float, big-endian.
    pub fn read_f64(&mut self) -> Result<f64, BufferError> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Reads a string written by [`write_str`](Self::write_str).
    pub fn read_str(&mut self) -> Result<String, BufferError> {
        let length = self.read_u16()? as usize;
        let bytes = self.take(length)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| BufferError::InvalidUtf8)
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("position", &self.position)
            .field("limit", &self.limit)
            .field("capacity", &self.data.capacity())
            .field("max_capacity", &self.max_capacity)
            .finish()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.restore(std::mem::take(&mut self.data));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> Buffer {
        BufferAllocator::new().allocate()
    }

    #[test]
    fn test_write_read_round_trip() {
        let mut buffer = scratch();
        buffer.write_u8(0xAB).unwrap();
        buffer.write_u16(0xCDEF).unwrap();
        buffer.write_u24(0x123456).unwrap();
        buffer.write_i32(-7).unwrap();
        buffer.write_i64(i64::MIN).unwrap();
        buffer.write_f64(2.5).unwrap();
        buffer.write_str("tagwire").unwrap();
        buffer.flip();

        assert_eq!(buffer.read_u8().unwrap(), 0xAB);
        assert_eq!(buffer.read_u16().unwrap(), 0xCDEF);
        assert_eq!(buffer.read_u24().unwrap(), 0x123456);
        assert_eq!(buffer.read_i32().unwrap(), -7);
        assert_eq!(buffer.read_i64().unwrap(), i64::MIN);
        assert_eq!(buffer.read_f64().unwrap(), 2.5);
        assert_eq!(buffer.read_str().unwrap(), "tagwire");
        assert!(!buffer.has_remaining());
    }

    #[test]
    fn test_big_endian_layout() {
        let mut buffer = scratch();
        buffer.write_u32(0xDEADBEEF).unwrap();
        buffer.flip();
        assert_eq!(buffer.readable(), &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_grow_up_to_max_capacity() {
        let allocator = BufferAllocator::new();
        let mut buffer = allocator.allocate_with(4, 8);
        buffer.write_u64(1).unwrap();

        let err = buffer.write_u8(0).unwrap_err();
        assert_eq!(
            err,
            BufferError::CapacityExceeded {
                requested: 9,
                max_capacity: 8
            }
        );
    }

    #[test]
    fn test_read_past_limit() {
        let mut buffer = scratch();
        buffer.write_u16(1).unwrap();
        buffer.flip();
        buffer.read_u8().unwrap();

        let err = buffer.read_u32().unwrap_err();
        assert_eq!(
            err,
            BufferError::Underflow {
                requested: 4,
                remaining: 1
            }
        );
    }

    #[test]
    fn test_flip_and_rewind() {
        let mut buffer = scratch();
        buffer.write_u8(9).unwrap();
        buffer.flip();
        assert_eq!(buffer.position(), 0);
        assert_eq!(buffer.limit(), 1);

        buffer.read_u8().unwrap();
        buffer.rewind();
        assert_eq!(buffer.read_u8().unwrap(), 9);
    }

    #[test]
    fn test_string_too_long() {
        let mut buffer = scratch();
        let long = "x".repeat(u16::MAX as usize + 1);
        let err = buffer.write_str(&long).unwrap_err();
        assert!(matches!(err, BufferError::StringTooLong { .. }));
    }

    #[test]
    fn test_wrap_is_readable() {
        let mut buffer = Buffer::wrap(vec![0x00, 0x2A]);
        assert_eq!(buffer.read_u16().unwrap(), 42);
    }
}
