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

use std::fmt::{self, Debug};
use std::io::{self, Read, Seek};

use bytes::{Buf, Bytes};

/// A readable stream that can also be rewound.
pub trait SeekableStream: Read + Seek + Send {}

impl<T: Read + Seek + Send> SeekableStream for T {}

/// Outbound request body.
#[derive(Default)]
pub enum Body {
    /// No body at all.
    #[default]
    Empty,
    /// A fixed byte sequence.
    Bytes(Bytes),
    /// A stream that can be rewound and read again.
    Seekable(Box<dyn SeekableStream>),
    /// A stream that can only be read once.
    Stream(Box<dyn Read + Send>),
}

impl Body {
    /// Wrap a seekable stream.
    pub fn seekable(r: impl Read + Seek + Send + 'static) -> Self {
        Body::Seekable(Box::new(r))
    }

    /// Wrap a stream that can only be read once.
    pub fn stream(r: impl Read + Send + 'static) -> Self {
        Body::Stream(Box::new(r))
    }

    /// Returns true if the body is known to hold no bytes.
    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Bytes(bs) => bs.is_empty(),
            _ => false,
        }
    }

    /// Returns true if the body can't be read twice.
    pub fn is_unseekable(&self) -> bool {
        matches!(self, Body::Stream(_))
    }
}

impl From<Bytes> for Body {
    fn from(bs: Bytes) -> Self {
        Body::Bytes(bs)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bs: Vec<u8>) -> Self {
        Body::Bytes(bs.into())
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Body::Bytes(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Bytes(s.into())
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Body::Empty => Ok(0),
            Body::Bytes(bs) => {
                let n = bs.len().min(buf.len());
                buf[..n].copy_from_slice(&bs[..n]);
                bs.advance(n);
                Ok(n)
            }
            Body::Seekable(r) => r.read(buf),
            Body::Stream(r) => r.read(buf),
        }
    }
}

impl Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Body::Empty"),
            Body::Bytes(bs) => write!(f, "Body::Bytes({} bytes)", bs.len()),
            Body::Seekable(_) => f.write_str("Body::Seekable"),
            Body::Stream(_) => f.write_str("Body::Stream"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_bytes_body() -> anyhow::Result<()> {
        let mut body = Body::from("hello world");
        let mut buf = [0; 5];
        assert_eq!(body.read(&mut buf)?, 5);
        assert_eq!(&buf, b"hello");

        let mut rest = String::new();
        body.read_to_string(&mut rest)?;
        assert_eq!(rest, " world");
        Ok(())
    }

    #[test]
    fn test_body_kinds() {
        assert!(Body::Empty.is_empty());
        assert!(Body::from("").is_empty());
        assert!(!Body::seekable(Cursor::new(Vec::new())).is_empty());
        assert!(Body::stream(io::empty()).is_unseekable());
        assert!(!Body::seekable(Cursor::new(b"x")).is_unseekable());
    }
}
