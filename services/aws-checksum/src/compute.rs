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

use std::io::{Read, Seek, SeekFrom};

use http::uri::Scheme;
use http::{HeaderValue, Request};
use log::debug;
use reqsign_core::hash::base64_encode;
use reqsign_core::{Error, Result};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use crate::attempt::check_canceled;
use crate::constants::READ_BUFFER_SIZE;
use crate::{Algorithm, Attempt, Body, Checksum, InputChecksum};

/// Build stage computing the checksum of an outbound body.
///
/// The checksum is computed up front whenever the body can be read twice.
/// A body that can only be read once is left to
/// [`AddInputChecksumTrailer`](crate::AddInputChecksumTrailer).
#[derive(Debug, Clone, Copy)]
pub struct ComputeInputChecksum {
    enable_compute_payload_hash: bool,
    enable_trailing_checksum: bool,
}

impl Default for ComputeInputChecksum {
    fn default() -> Self {
        Self {
            enable_compute_payload_hash: true,
            enable_trailing_checksum: true,
        }
    }
}

impl ComputeInputChecksum {
    /// Create a new stage with payload hash and trailing checksum enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether the SHA-256 payload hash for the signer is computed.
    pub fn with_compute_payload_hash(mut self, enabled: bool) -> Self {
        self.enable_compute_payload_hash = enabled;
        self
    }

    /// Set whether an unseekable body may defer its checksum to a trailer.
    ///
    /// When disabled, an unseekable body is an error.
    pub fn with_trailing_checksum(mut self, enabled: bool) -> Self {
        self.enable_trailing_checksum = enabled;
        self
    }

    /// Run the stage.
    ///
    /// The payload hash is computed for every body that can be read twice,
    /// whether a checksum is attached or not.
    pub fn handle_build(&self, req: &mut Request<Body>, attempt: &mut Attempt) -> Result<()> {
        let compute_payload_hash =
            self.enable_compute_payload_hash && attempt.payload_hash().is_none();

        let Some(algorithm) = attempt.algorithm() else {
            debug!("no request checksum algorithm selected, skip computing");
            return self.handle_payload_hash(req, attempt, compute_payload_hash);
        };

        // A checksum set by the caller is trusted as is, whatever its algorithm.
        if let Some((preset, value)) = Algorithm::ALL
            .into_iter()
            .find_map(|a| req.headers().get(a.header_name()).map(|v| (a, v)))
        {
            debug!("request checksum {preset} already set, skip computing");
            attempt.set_input_checksum(InputChecksum::Computed {
                algorithm: preset,
                value: value.to_str()?.to_string(),
            });
            return self.handle_payload_hash(req, attempt, compute_payload_hash);
        }

        if req.body().is_unseekable() && !req.body().is_empty() && declared_length(req) != Some(0)
        {
            if !self.enable_trailing_checksum || req.uri().scheme() != Some(&Scheme::HTTPS) {
                return Err(Error::config_invalid(
                    "unseekable stream is not supported without TLS and trailing checksum",
                ));
            }

            debug!("request body is unseekable, defer {algorithm} checksum to trailer");
            attempt.set_input_checksum(InputChecksum::Deferred(algorithm));
            return Ok(());
        }

        let cancel = attempt.cancellation().clone();
        let (value, payload_hash) =
            compute_body(req.body_mut(), Some(algorithm), compute_payload_hash, &cancel)?;
        let value = value.unwrap_or_default();

        req.headers_mut().insert(
            algorithm.header_name(),
            HeaderValue::try_from(value.as_str())?,
        );
        if let Some(hash) = payload_hash {
            attempt.set_payload_hash(hash);
        }
        debug!("request checksum {algorithm} computed: {value}");
        attempt.set_input_checksum(InputChecksum::Computed { algorithm, value });
        Ok(())
    }

    /// Compute only the payload hash, leaving unseekable bodies alone.
    fn handle_payload_hash(
        &self,
        req: &mut Request<Body>,
        attempt: &mut Attempt,
        compute_payload_hash: bool,
    ) -> Result<()> {
        if !compute_payload_hash || req.body().is_unseekable() {
            return Ok(());
        }

        let cancel = attempt.cancellation().clone();
        let (_, payload_hash) = compute_body(req.body_mut(), None, true, &cancel)?;
        if let Some(hash) = payload_hash {
            debug!("request payload hash computed: {hash}");
            attempt.set_payload_hash(hash);
        }
        Ok(())
    }
}

fn declared_length<B>(req: &Request<B>) -> Option<u64> {
    req.headers()
        .get(http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Hash the whole body, leaving it positioned where it started.
///
/// Returns the base64 checksum if an algorithm is given and, if asked, the
/// hex SHA-256 payload hash.
///
/// An unseekable body only gets here when its declared length is zero, it
/// must hold no data.
fn compute_body(
    body: &mut Body,
    algorithm: Option<Algorithm>,
    compute_payload_hash: bool,
    cancel: &CancellationToken,
) -> Result<(Option<String>, Option<String>)> {
    let mut checksum = algorithm.map(Checksum::new);
    // SHA256 checksums already are the payload hash.
    let mut payload =
        (compute_payload_hash && algorithm != Some(Algorithm::Sha256)).then(Sha256::new);
    let mut update = |bs: &[u8]| {
        if let Some(c) = checksum.as_mut() {
            c.update(bs);
        }
        if let Some(h) = payload.as_mut() {
            h.update(bs);
        }
    };

    match body {
        Body::Empty => {}
        Body::Bytes(bs) => update(&bs[..]),
        Body::Stream(r) => {
            let n = r.read(&mut [0u8; 1]).map_err(|e| {
                Error::stream_failed("failed to read stream to compute hash").with_source(e)
            })?;
            if n != 0 {
                return Err(Error::request_invalid(
                    "unseekable stream holds data but its declared content length is 0",
                ));
            }
        }
        Body::Seekable(r) => {
            let start = r
                .stream_position()
                .map_err(|e| Error::stream_failed("failed to rewind stream").with_source(e))?;

            let mut buf = vec![0; READ_BUFFER_SIZE];
            loop {
                check_canceled(cancel).map_err(|e| {
                    Error::stream_failed("failed to read stream to compute hash")
                        .with_source(Error::from(e))
                })?;
                let n = r.read(&mut buf).map_err(|e| {
                    Error::stream_failed("failed to read stream to compute hash").with_source(e)
                })?;
                if n == 0 {
                    break;
                }
                update(&buf[..n]);
            }

            r.seek(SeekFrom::Start(start))
                .map_err(|e| Error::stream_failed("failed to rewind stream").with_source(e))?;
        }
    }

    let digest = checksum.map(Checksum::finalize);
    let payload_hash = match payload {
        Some(h) => Some(hex::encode(h.finalize())),
        None if compute_payload_hash => digest.as_ref().map(hex::encode),
        None => None,
    };
    Ok((digest.map(|d| base64_encode(&d)), payload_hash))
}
