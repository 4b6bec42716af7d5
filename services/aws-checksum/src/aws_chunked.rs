// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! The `aws-chunked` content encoding with a trailing checksum.
//!
//! ```text
//! <hex-len>\r\n<data>\r\n
//! ...
//! 0\r\n
//! x-amz-checksum-<name>:<base64>\r\n
//! \r\n
//! ```

use std::fmt::{self, Debug};
use std::io::{self, Read};

use log::debug;
use tokio_util::sync::CancellationToken;

use crate::attempt::check_canceled;
use crate::constants::DEFAULT_CHUNK_SIZE;
use crate::{Algorithm, Checksum, TrailerSlot};

const CRLF: &[u8] = b"\r\n";
const LAST_CHUNK: &[u8] = b"0\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Data,
    Done,
}

/// Reader re-framing an inner body as `aws-chunked` with a checksum trailer.
///
/// Every data chunk but the last holds exactly `chunk_size` bytes. The
/// checksum covers the data bytes in order and is published to the slot
/// right before the trailer goes out.
pub struct AwsChunkedReader<R> {
    inner: R,
    algorithm: Algorithm,
    checksum: Option<Checksum>,
    slot: TrailerSlot,
    cancel: CancellationToken,
    chunk_size: usize,

    state: State,
    chunk: Vec<u8>,
    buf: Vec<u8>,
    pos: usize,
}

impl<R: Read> AwsChunkedReader<R> {
    /// Wrap `inner`, hashing it with `algorithm`.
    pub fn new(inner: R, algorithm: Algorithm, slot: TrailerSlot) -> Self {
        Self {
            inner,
            algorithm,
            checksum: Some(Checksum::new(algorithm)),
            slot,
            cancel: CancellationToken::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,

            state: State::Data,
            chunk: Vec::new(),
            buf: Vec::new(),
            pos: 0,
        }
    }

    /// Stop producing chunks once `token` is canceled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Read the inner body until a chunk is full or the body ends.
    fn fill_chunk(&mut self) -> io::Result<usize> {
        self.chunk.resize(self.chunk_size, 0);
        let mut filled = 0;
        while filled < self.chunk_size {
            match self.inner.read(&mut self.chunk[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        self.chunk.truncate(filled);
        Ok(filled)
    }

    /// Frame the next chunk into `buf`, or the trailer once the body ends.
    fn next_frame(&mut self) -> io::Result<()> {
        check_canceled(&self.cancel)?;

        self.buf.clear();
        self.pos = 0;

        let n = self.fill_chunk()?;
        if n > 0 {
            if let Some(checksum) = self.checksum.as_mut() {
                checksum.update(&self.chunk);
            }
            self.buf.extend_from_slice(format!("{n:x}").as_bytes());
            self.buf.extend_from_slice(CRLF);
            self.buf.extend_from_slice(&self.chunk);
            self.buf.extend_from_slice(CRLF);
        }
        if n < self.chunk_size {
            self.write_trailer();
        }
        Ok(())
    }

    fn write_trailer(&mut self) {
        let value = self
            .checksum
            .take()
            .map(Checksum::finalize_base64)
            .unwrap_or_default();
        debug!("aws-chunked body done, trailer {}: {value}", self.algorithm);

        self.buf.extend_from_slice(LAST_CHUNK);
        self.buf.extend_from_slice(self.algorithm.header_name().as_bytes());
        self.buf.push(b':');
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.extend_from_slice(CRLF);
        self.buf.extend_from_slice(CRLF);

        // The slot stays with the first value if the body is encoded twice.
        let _ = self.slot.set(value);
        self.state = State::Done;
    }
}

impl<R: Read> Read for AwsChunkedReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }

        while self.pos == self.buf.len() {
            if self.state == State::Done {
                return Ok(0);
            }
            self.next_frame()?;
        }

        let n = (self.buf.len() - self.pos).min(out.len());
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl<R> Debug for AwsChunkedReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsChunkedReader")
            .field("algorithm", &self.algorithm)
            .field("chunk_size", &self.chunk_size)
            .field("state", &self.state)
            .finish()
    }
}

/// Exact length of the encoded body for `len` bytes of data.
pub fn framed_length(len: u64, algorithm: Algorithm) -> u64 {
    framed_length_with_chunk_size(len, algorithm, DEFAULT_CHUNK_SIZE as u64)
}

fn framed_length_with_chunk_size(len: u64, algorithm: Algorithm, chunk_size: u64) -> u64 {
    let frame = |n: u64| hex_len(n) + CRLF.len() as u64 + n + CRLF.len() as u64;

    let full = len / chunk_size;
    let rest = len % chunk_size;
    let mut total = full * frame(chunk_size);
    if rest > 0 {
        total += frame(rest);
    }

    let trailer = algorithm.header_name().len() + 1 + algorithm.base64_len() + CRLF.len();
    total + (LAST_CHUNK.len() + trailer + CRLF.len()) as u64
}

fn hex_len(mut n: u64) -> u64 {
    let mut digits = 1;
    while n >= 16 {
        n >>= 4;
        digits += 1;
    }
    digits
}
