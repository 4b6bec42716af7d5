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

use http::header::{CONTENT_ENCODING, CONTENT_LENGTH};
use http::{HeaderValue, Request};
use log::debug;
use reqsign_core::Result;

use crate::aws_chunked::{framed_length, AwsChunkedReader};
use crate::constants::{
    AWS_CHUNKED, STREAMING_UNSIGNED_PAYLOAD_TRAILER, X_AMZ_DECODED_CONTENT_LENGTH, X_AMZ_TRAILER,
};
use crate::{Attempt, Body, InputChecksum, TrailerSlot};

/// Finalize stage moving a deferred checksum into an `aws-chunked` trailer.
///
/// Must run after [`ComputeInputChecksum`](crate::ComputeInputChecksum) and
/// before the request is signed.
#[derive(Debug, Clone, Copy)]
pub struct AddInputChecksumTrailer {
    enable_decoded_content_length_header: bool,
}

impl Default for AddInputChecksumTrailer {
    fn default() -> Self {
        Self {
            enable_decoded_content_length_header: true,
        }
    }
}

impl AddInputChecksumTrailer {
    /// Create a new stage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether `X-Amz-Decoded-Content-Length` carries the original length.
    pub fn with_decoded_content_length_header(mut self, enabled: bool) -> Self {
        self.enable_decoded_content_length_header = enabled;
        self
    }

    /// Run the stage.
    ///
    /// Does nothing unless the input checksum was deferred.
    pub fn handle_finalize(&self, req: &mut Request<Body>, attempt: &mut Attempt) -> Result<()> {
        let InputChecksum::Deferred(algorithm) = *attempt.input_checksum() else {
            return Ok(());
        };

        let decoded_length = req
            .headers()
            .get(CONTENT_LENGTH)
            .map(|v| v.to_str())
            .transpose()?
            .and_then(|v| v.parse::<u64>().ok());

        let headers = req.headers_mut();
        headers.append(CONTENT_ENCODING, HeaderValue::from_static(AWS_CHUNKED));
        headers.insert(
            X_AMZ_TRAILER,
            HeaderValue::from_static(algorithm.header_name()),
        );
        match decoded_length {
            Some(len) => {
                if self.enable_decoded_content_length_header {
                    headers.insert(X_AMZ_DECODED_CONTENT_LENGTH, HeaderValue::from(len));
                }
                headers.insert(
                    CONTENT_LENGTH,
                    HeaderValue::from(framed_length(len, algorithm)),
                );
            }
            None => {
                headers.remove(CONTENT_LENGTH);
            }
        }

        let slot = TrailerSlot::default();
        let body = std::mem::take(req.body_mut());
        let reader = AwsChunkedReader::new(body, algorithm, slot.clone())
            .with_cancellation(attempt.cancellation().clone());
        *req.body_mut() = Body::stream(reader);

        debug!("request body framed as aws-chunked with {algorithm} trailer");
        attempt.set_payload_hash(STREAMING_UNSIGNED_PAYLOAD_TRAILER);
        attempt.set_input_checksum(InputChecksum::Trailing {
            algorithm,
            value: slot,
        });
        Ok(())
    }
}
