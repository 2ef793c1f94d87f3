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

//! Error types for buffer I/O.

use thiserror::Error;

/// Errors that can occur while reading from or writing to a [`Buffer`].
///
/// [`Buffer`]: crate::buffer::Buffer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// A write would grow the buffer past its maximum capacity.
    #[error("write of {requested} bytes exceeds maximum capacity {max_capacity}")]
    CapacityExceeded {
        /// Total length the buffer would need to hold the write.
        requested: usize,
        /// The buffer's configured maximum capacity.
        max_capacity: usize,
    },

    /// A read asked for more bytes than remain before the limit.
    #[error("read of {requested} bytes but only {remaining} remaining")]
    Underflow {
        /// Number of bytes the read required.
        requested: usize,
        /// Number of readable bytes left.
        remaining: usize,
    },

    /// A string was too long for its 16-bit length prefix.
    #[error("string of {length} bytes exceeds the 65535-byte length prefix")]
    StringTooLong {
        /// Encoded byte length of the string.
        length: usize,
    },

    /// A length-prefixed string did not contain valid UTF-8.
    #[error("length-prefixed string is not valid UTF-8")]
    InvalidUtf8,
}
