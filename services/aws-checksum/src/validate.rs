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
use std::io::{self, Read};

use http::Response;
use log::{debug, warn};
use reqsign_core::hash::base64_decode;
use reqsign_core::{Error, Result};

use crate::algorithm::DEFAULT_VALIDATION_PRIORITY;
use crate::{Algorithm, Attempt, Checksum};

/// Deserialize stage verifying a response body against its checksum header.
#[derive(Debug, Clone)]
pub struct ValidateOutputChecksum {
    algorithms: Vec<Algorithm>,
    ignore_multipart_validation: bool,
    log_validation_skipped: bool,
    log_multipart_validation_skipped: bool,
}

impl Default for ValidateOutputChecksum {
    fn default() -> Self {
        Self {
            algorithms: DEFAULT_VALIDATION_PRIORITY.to_vec(),
            ignore_multipart_validation: true,
            log_validation_skipped: true,
            log_multipart_validation_skipped: true,
        }
    }
}

impl ValidateOutputChecksum {
    /// Create a new stage checking headers in the default priority.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the algorithms to look for, first match wins.
    pub fn with_algorithms(mut self, algorithms: impl IntoIterator<Item = Algorithm>) -> Self {
        self.algorithms = algorithms.into_iter().collect();
        self
    }

    /// Set whether composite checksums of multipart objects are skipped.
    ///
    /// These look like `<base64>-<part count>` and can't be checked against
    /// the full body.
    pub fn with_ignore_multipart_validation(mut self, ignore: bool) -> Self {
        self.ignore_multipart_validation = ignore;
        self
    }

    /// Set whether a response without a supported checksum is logged.
    pub fn with_log_validation_skipped(mut self, enabled: bool) -> Self {
        self.log_validation_skipped = enabled;
        self
    }

    /// Set whether a skipped multipart checksum is logged.
    pub fn with_log_multipart_validation_skipped(mut self, enabled: bool) -> Self {
        self.log_multipart_validation_skipped = enabled;
        self
    }

    /// Run the stage.
    ///
    /// The returned body fails its final read if the checksum doesn't match.
    pub fn handle_deserialize<R: Read>(
        &self,
        resp: Response<R>,
        attempt: &mut Attempt,
    ) -> Result<Response<ResponseBody<R>>> {
        if !attempt.output_validation_enabled() {
            return Ok(resp.map(ResponseBody::Plain));
        }

        let found = self.algorithms.iter().find_map(|alg| {
            resp.headers()
                .get(alg.header_name())
                .map(|v| (*alg, v.to_str()))
        });
        let Some((algorithm, expected)) = found else {
            if self.log_validation_skipped {
                warn!("Response has no supported checksum. Not validating response payload.");
            }
            debug!("no supported checksum in response headers, skip validation");
            return Ok(resp.map(ResponseBody::Plain));
        };
        let expected = expected?;

        if self.ignore_multipart_validation && is_multipart_checksum(expected) {
            if self.log_multipart_validation_skipped {
                warn!("Skipped validation of multipart checksum.");
            }
            return Ok(resp.map(ResponseBody::Plain));
        }

        let expected = decode_expected(algorithm, expected)?;
        debug!("validating response payload with {algorithm}");
        attempt.record_validation(algorithm);
        Ok(resp.map(|body| {
            ResponseBody::Validating(ChecksumValidatingReader::new(body, algorithm, expected))
        }))
    }
}

/// Returns true for `<base64>-<digits>` values.
fn is_multipart_checksum(value: &str) -> bool {
    match value.rsplit_once('-') {
        Some((_, parts)) => !parts.is_empty() && parts.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

fn decode_expected(algorithm: Algorithm, value: &str) -> Result<Vec<u8>> {
    let digest = base64_decode(value).map_err(|e| {
        Error::checksum_mismatch(format!("invalid {algorithm} checksum value: {value}"))
            .with_source(e)
    })?;
    if digest.len() != algorithm.digest_len() {
        return Err(Error::checksum_mismatch(format!(
            "invalid {algorithm} checksum value: expected {} bytes, got {}",
            algorithm.digest_len(),
            digest.len()
        )));
    }
    Ok(digest)
}

/// Response body returned by [`ValidateOutputChecksum`].
pub enum ResponseBody<R> {
    /// The body is not validated.
    Plain(R),
    /// The body is checked once fully read.
    Validating(ChecksumValidatingReader<R>),
}

impl<R> ResponseBody<R> {
    /// Returns true if reading the body verifies its checksum.
    pub fn is_validating(&self) -> bool {
        matches!(self, ResponseBody::Validating(_))
    }
}

impl<R: Read> Read for ResponseBody<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ResponseBody::Plain(r) => r.read(buf),
            ResponseBody::Validating(r) => r.read(buf),
        }
    }
}

impl<R> Debug for ResponseBody<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Plain(_) => f.write_str("ResponseBody::Plain"),
            ResponseBody::Validating(r) => {
                f.debug_tuple("ResponseBody::Validating").field(r).finish()
            }
        }
    }
}

/// Reader hashing everything it hands out and comparing at EOF.
pub struct ChecksumValidatingReader<R> {
    inner: R,
    algorithm: Algorithm,
    checksum: Option<Checksum>,
    expected: Vec<u8>,
}

impl<R> ChecksumValidatingReader<R> {
    /// Wrap `inner`, expecting the raw digest `expected`.
    pub fn new(inner: R, algorithm: Algorithm, expected: Vec<u8>) -> Self {
        Self {
            inner,
            algorithm,
            checksum: Some(Checksum::new(algorithm)),
            expected,
        }
    }

    /// The algorithm in use.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

impl<R: Read> Read for ChecksumValidatingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            if let Some(checksum) = self.checksum.as_mut() {
                checksum.update(&buf[..n]);
            }
            return Ok(n);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        // EOF, compare once and keep returning EOF afterwards.
        if let Some(checksum) = self.checksum.take() {
            let actual = checksum.finalize();
            if actual[..] != self.expected[..] {
                return Err(Error::checksum_mismatch(format!(
                    "checksum did not match: algorithm {}, expect {}, actual {}",
                    self.algorithm,
                    reqsign_core::hash::base64_encode(&self.expected),
                    reqsign_core::hash::base64_encode(&actual),
                ))
                .into());
            }
            debug!("response payload {} checksum matched", self.algorithm);
        }
        Ok(0)
    }
}

impl<R> Debug for ChecksumValidatingReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChecksumValidatingReader")
            .field("algorithm", &self.algorithm)
            .field("done", &self.checksum.is_none())
            .finish()
    }
}
