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

//! Codecs for the standard time types.

use crate::buffer::Buffer;
use crate::codec::TypeCodec;
use crate::engine::{Engine, SerializationError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Codec for [`Duration`]: whole seconds as an unsigned 64-bit integer
/// followed by the subsecond nanoseconds as an unsigned 32-bit integer.
#[derive(Debug, Default, Clone, Copy)]
pub struct DurationCodec;

impl TypeCodec<Duration> for DurationCodec {
    fn encode(
        &self,
        value: &Duration,
        out: &mut Buffer,
        _engine: &mut Engine,
    ) -> Result<(), SerializationError> {
        out.write_u64(value.as_secs())?;
        out.write_u32(value.subsec_nanos())?;
        Ok(())
    }

    fn decode(
        &self,
        input: &mut Buffer,
        _engine: &mut Engine,
    ) -> Result<Duration, SerializationError> {
        let seconds = input.read_u64()?;
        let nanos = input.read_u32()?;
        if nanos >= 1_000_000_000 {
            return Err(SerializationError::InvalidValue {
                type_name: "Duration",
            });
        }
        Ok(Duration::new(seconds, nanos))
    }
}

/// Codec for [`SystemTime`], encoded as the duration since the Unix epoch.
///
/// Times before the epoch are not representable and fail to encode.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeCodec;

impl TypeCodec<SystemTime> for SystemTimeCodec {
    fn encode(
        &self,
        value: &SystemTime,
        out: &mut Buffer,
        engine: &mut Engine,
    ) -> Result<(), SerializationError> {
        let since_epoch = value
            .duration_since(UNIX_EPOCH)
            .map_err(|_| SerializationError::InvalidValue {
                type_name: "SystemTime",
            })?;
        DurationCodec.encode(&since_epoch, out, engine)
    }

    fn decode(
        &self,
        input: &mut Buffer,
        engine: &mut Engine,
    ) -> Result<SystemTime, SerializationError> {
        let since_epoch = DurationCodec.decode(input, engine)?;
        Ok(UNIX_EPOCH + since_epoch)
    }
}
