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

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use reqsign_core::hash::base64_encode;
use reqsign_core::Error;
use sha1::Digest;

/// Checksum algorithms supported for payload integrity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Algorithm {
    /// CRC32 (ISO-HDLC), the default when a checksum is required.
    Crc32,
    /// CRC32C (Castagnoli).
    Crc32c,
    /// SHA-1.
    Sha1,
    /// SHA-256.
    Sha256,
    /// CRC64 with the NVMe polynomial.
    Crc64Nvme,
}

/// Order in which response checksum headers are looked up when the caller
/// doesn't configure one: strongest digest first.
pub const DEFAULT_VALIDATION_PRIORITY: [Algorithm; 5] = [
    Algorithm::Sha256,
    Algorithm::Sha1,
    Algorithm::Crc32,
    Algorithm::Crc32c,
    Algorithm::Crc64Nvme,
];

impl Algorithm {
    /// Every supported algorithm.
    pub const ALL: [Algorithm; 5] = [
        Algorithm::Crc32,
        Algorithm::Crc32c,
        Algorithm::Sha1,
        Algorithm::Sha256,
        Algorithm::Crc64Nvme,
    ];

    /// Name used on the wire, for example `CRC32`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Crc32 => "CRC32",
            Algorithm::Crc32c => "CRC32C",
            Algorithm::Sha1 => "SHA1",
            Algorithm::Sha256 => "SHA256",
            Algorithm::Crc64Nvme => "CRC64NVME",
        }
    }

    /// Lower-cased header carrying the checksum, for example
    /// `x-amz-checksum-crc32`.
    pub fn header_name(&self) -> &'static str {
        match self {
            Algorithm::Crc32 => "x-amz-checksum-crc32",
            Algorithm::Crc32c => "x-amz-checksum-crc32c",
            Algorithm::Sha1 => "x-amz-checksum-sha1",
            Algorithm::Sha256 => "x-amz-checksum-sha256",
            Algorithm::Crc64Nvme => "x-amz-checksum-crc64nvme",
        }
    }

    /// Size of the raw digest in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            Algorithm::Crc32 | Algorithm::Crc32c => 4,
            Algorithm::Crc64Nvme => 8,
            Algorithm::Sha1 => 20,
            Algorithm::Sha256 => 32,
        }
    }

    /// Size of the base64 encoded digest.
    pub fn base64_len(&self) -> usize {
        self.digest_len().div_ceil(3) * 4
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                Error::config_invalid(format!("failed to parse algorithm: unknown algorithm {s}"))
            })
    }
}

/// Running digest for one [`Algorithm`].
pub enum Checksum {
    /// CRC32 state.
    Crc32(crc32fast::Hasher),
    /// CRC32C state.
    Crc32c(u32),
    /// SHA-1 state.
    Sha1(sha1::Sha1),
    /// SHA-256 state.
    Sha256(sha2::Sha256),
    /// CRC64NVME state.
    Crc64Nvme(crc64fast_nvme::Digest),
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Checksum").field(&self.algorithm()).finish()
    }
}

impl Checksum {
    /// Start a new digest.
    pub fn new(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Crc32 => Checksum::Crc32(crc32fast::Hasher::new()),
            Algorithm::Crc32c => Checksum::Crc32c(0),
            Algorithm::Sha1 => Checksum::Sha1(sha1::Sha1::new()),
            Algorithm::Sha256 => Checksum::Sha256(sha2::Sha256::new()),
            Algorithm::Crc64Nvme => Checksum::Crc64Nvme(crc64fast_nvme::Digest::new()),
        }
    }

    /// The algorithm of this digest.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Checksum::Crc32(_) => Algorithm::Crc32,
            Checksum::Crc32c(_) => Algorithm::Crc32c,
            Checksum::Sha1(_) => Algorithm::Sha1,
            Checksum::Sha256(_) => Algorithm::Sha256,
            Checksum::Crc64Nvme(_) => Algorithm::Crc64Nvme,
        }
    }

    /// Feed more data.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Checksum::Crc32(h) => h.update(data),
            Checksum::Crc32c(v) => *v = crc32c::crc32c_append(*v, data),
            Checksum::Sha1(h) => h.update(data),
            Checksum::Sha256(h) => h.update(data),
            Checksum::Crc64Nvme(h) => h.write(data),
        }
    }

    /// Finish the digest and return the raw bytes, big-endian for CRCs.
    pub fn finalize(self) -> Bytes {
        match self {
            Checksum::Crc32(h) => Bytes::copy_from_slice(&h.finalize().to_be_bytes()),
            Checksum::Crc32c(v) => Bytes::copy_from_slice(&v.to_be_bytes()),
            Checksum::Sha1(h) => Bytes::copy_from_slice(&h.finalize()),
            Checksum::Sha256(h) => Bytes::copy_from_slice(&h.finalize()),
            Checksum::Crc64Nvme(h) => Bytes::copy_from_slice(&h.sum64().to_be_bytes()),
        }
    }

    /// Finish the digest and return it base64 encoded.
    pub fn finalize_base64(self) -> String {
        base64_encode(&self.finalize())
    }
}

/// Compute the base64 encoded checksum of `data`.
pub fn compute(algorithm: Algorithm, data: &[u8]) -> String {
    let mut h = Checksum::new(algorithm);
    h.update(data);
    h.finalize_base64()
}
