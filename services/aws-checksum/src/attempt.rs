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

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, OnceLock};

use reqsign_core::Error;
use tokio_util::sync::CancellationToken;

use crate::Algorithm;

/// Checksum values applied to a request, keyed by algorithm.
pub type ChecksumMetadata = BTreeMap<Algorithm, String>;

/// Slot the aws-chunked encoder fills with the base64 digest once the last
/// data byte went out.
pub type TrailerSlot = Arc<OnceLock<String>>;

/// Where the input checksum of an attempt stands.
#[derive(Debug, Clone, Default)]
pub enum InputChecksum {
    /// Nothing computed yet, or no checksum is wanted.
    #[default]
    NotStarted,
    /// The body can't be hashed up front, the checksum goes into a trailer.
    Deferred(Algorithm),
    /// The aws-chunked encoder is installed and will fill `value`.
    Trailing {
        /// Algorithm of the trailer.
        algorithm: Algorithm,
        /// Filled once the body has been fully read.
        value: TrailerSlot,
    },
    /// The checksum header is set on the request.
    Computed {
        /// Algorithm of the header.
        algorithm: Algorithm,
        /// Base64 digest.
        value: String,
    },
}

/// State of one request attempt, handed by reference from stage to stage.
///
/// A fresh `Attempt` is created for every try. Nothing in here outlives it.
#[derive(Debug, Clone, Default)]
pub struct Attempt {
    algorithm: Option<Algorithm>,
    input: InputChecksum,
    payload_hash: Option<String>,
    validate_output: bool,
    validated_with: Vec<Algorithm>,
    features: Vec<&'static str>,
    cancel: CancellationToken,
}

impl Attempt {
    /// Create a new attempt.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given token to cancel stream reads of this attempt.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Set the request checksum algorithm, usually picked by
    /// [`select_request_algorithm`](crate::select_request_algorithm).
    pub fn with_algorithm(mut self, algorithm: Option<Algorithm>) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Turn response validation on or off, usually decided by
    /// [`response_validation_enabled`](crate::response_validation_enabled).
    pub fn with_output_validation(mut self, enabled: bool) -> Self {
        self.validate_output = enabled;
        self
    }

    /// Set a payload hash computed outside the checksum stages.
    ///
    /// The input stage keeps a hash that is already there.
    pub fn with_payload_hash(mut self, hash: impl Into<String>) -> Self {
        self.payload_hash = Some(hash.into());
        self
    }

    /// The request checksum algorithm.
    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }

    /// The input checksum state.
    pub fn input_checksum(&self) -> &InputChecksum {
        &self.input
    }

    pub(crate) fn set_input_checksum(&mut self, state: InputChecksum) {
        self.input = state;
    }

    /// The payload hash the signer must sign: a hex digest or a sentinel.
    pub fn payload_hash(&self) -> Option<&str> {
        self.payload_hash.as_deref()
    }

    pub(crate) fn set_payload_hash(&mut self, hash: impl Into<String>) {
        self.payload_hash = Some(hash.into());
    }

    /// Whether the response of this attempt is validated.
    pub fn output_validation_enabled(&self) -> bool {
        self.validate_output
    }

    /// Algorithms used to validate the response.
    pub fn validated_with(&self) -> &[Algorithm] {
        &self.validated_with
    }

    pub(crate) fn record_validation(&mut self, algorithm: Algorithm) {
        self.validated_with.push(algorithm);
    }

    /// Feature ids recorded for this attempt, sorted and unique.
    ///
    /// They are meant for the `m/` section of the user agent.
    pub fn features(&self) -> &[&'static str] {
        &self.features
    }

    /// Record a feature id used by this attempt.
    pub fn record_feature(&mut self, id: &'static str) {
        if let Err(pos) = self.features.binary_search(&id) {
            self.features.insert(pos, id);
        }
    }

    /// The cancellation token of this attempt.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Checksums applied to the request so far.
    ///
    /// A trailer checksum shows up only after the body has been fully sent.
    pub fn checksum_metadata(&self) -> ChecksumMetadata {
        let mut m = ChecksumMetadata::new();
        match &self.input {
            InputChecksum::Computed { algorithm, value } => {
                m.insert(*algorithm, value.clone());
            }
            InputChecksum::Trailing { algorithm, value } => {
                if let Some(v) = value.get() {
                    m.insert(*algorithm, v.clone());
                }
            }
            InputChecksum::NotStarted | InputChecksum::Deferred(_) => {}
        }
        m
    }
}

/// Fail with a stream error if the token has been canceled.
pub(crate) fn check_canceled(token: &CancellationToken) -> io::Result<()> {
    if token.is_cancelled() {
        // Not `Interrupted`: std readers retry on that kind.
        return Err(Error::stream_failed("request attempt canceled").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_of_trailing_checksum() {
        let slot = TrailerSlot::default();
        let mut attempt = Attempt::new();
        attempt.set_input_checksum(InputChecksum::Trailing {
            algorithm: Algorithm::Crc32,
            value: slot.clone(),
        });
        assert!(attempt.checksum_metadata().is_empty());

        slot.set("DUoRhQ==".to_string()).unwrap();
        assert_eq!(
            attempt.checksum_metadata().get(&Algorithm::Crc32).map(String::as_str),
            Some("DUoRhQ==")
        );
    }

    #[test]
    fn test_features_are_sorted_and_unique() {
        let mut attempt = Attempt::new();
        attempt.record_feature("Z");
        attempt.record_feature("U");
        attempt.record_feature("Z");
        attempt.record_feature("W");
        assert_eq!(attempt.features(), &["U", "W", "Z"]);
    }

    #[test]
    fn test_canceled_token() {
        let token = CancellationToken::new();
        assert!(check_canceled(&token).is_ok());

        token.cancel();
        let err = check_canceled(&token).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert_eq!(
            reqsign_core::Error::from(err).kind(),
            reqsign_core::ErrorKind::StreamFailed
        );
    }
}
