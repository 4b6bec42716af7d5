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

//! AWS service support with convenience APIs
//!
//! This module re-exports the checksum stages and the SigV4A signer and
//! runs them in the order a request needs them through [`Pipeline`].

use std::io::Read;

use http::{Request, Response};
use log::debug;
pub use reqsign_aws_checksum::*;
pub use reqsign_aws_v4a::*;

use crate::{Context, OsEnv, Result, Signer};

/// Default AWS Signer type with commonly used components
pub type DefaultSigner = Signer<EcdsaCredential>;

/// Create a default SigV4A signer.
///
/// The access key pair is read from the process environment and the derived
/// key is cached until the pair changes.
///
/// # Example
///
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> reqsign_core::Result<()> {
/// // Valid in every region.
/// let signer = reqsign::aws::default_signer("s3", &["*"]);
///
/// let mut req = http::Request::builder()
///     .method("GET")
///     .uri("https://mrap.accesspoint.s3-global.amazonaws.com/my-object")
///     .body(())?
///     .into_parts()
///     .0;
///
/// signer.sign(&mut req, None, None).await?;
/// # Ok(())
/// # }
/// ```
pub fn default_signer(service: &str, region_set: &[&str]) -> DefaultSigner {
    let ctx = Context::new().with_env(OsEnv);
    let provider = SymmetricCredentialAdaptor::new(EnvCredentialProvider::new());
    Signer::new(ctx, provider, RequestSigner::new(service, region_set))
}

/// Fields of an operation input that steer the checksum stages.
#[derive(Debug, Clone, Default)]
pub struct Operation {
    request_algorithm: Option<String>,
    checksum_required: bool,
    validation_mode: Option<String>,
}

impl Operation {
    /// Create a new operation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the checksum algorithm picked by the caller, e.g. `CRC32C`.
    pub fn with_request_algorithm(mut self, algorithm: &str) -> Self {
        self.request_algorithm = Some(algorithm.to_string());
        self
    }

    /// Set whether the operation requires a request checksum.
    pub fn with_checksum_required(mut self, required: bool) -> Self {
        self.checksum_required = required;
        self
    }

    /// Set the validation mode field, `ENABLED` asks for response validation.
    pub fn with_validation_mode(mut self, mode: &str) -> Self {
        self.validation_mode = Some(mode.to_string());
        self
    }
}

/// Runs the checksum stages and the signer around one request.
///
/// 1. [`Pipeline::build`] selects the algorithm and computes the checksum.
/// 2. [`Pipeline::finalize`] adds the trailer if needed, then signs.
/// 3. [`Pipeline::deserialize`] validates the response checksum.
///
/// Every retry must start again from `build` with a fresh request.
#[derive(Debug)]
pub struct Pipeline {
    config: Config,
    compute: ComputeInputChecksum,
    trailer: AddInputChecksumTrailer,
    validate: ValidateOutputChecksum,
    signer: DefaultSigner,
}

impl Pipeline {
    /// Create a new pipeline with the default stages.
    pub fn new(config: Config, signer: DefaultSigner) -> Self {
        Self {
            config,
            compute: ComputeInputChecksum::new(),
            trailer: AddInputChecksumTrailer::new(),
            validate: ValidateOutputChecksum::new(),
            signer,
        }
    }

    /// Replace the input checksum stage.
    pub fn with_compute_input_checksum(mut self, stage: ComputeInputChecksum) -> Self {
        self.compute = stage;
        self
    }

    /// Replace the trailer stage.
    pub fn with_add_input_checksum_trailer(mut self, stage: AddInputChecksumTrailer) -> Self {
        self.trailer = stage;
        self
    }

    /// Replace the response validation stage.
    pub fn with_validate_output_checksum(mut self, stage: ValidateOutputChecksum) -> Self {
        self.validate = stage;
        self
    }

    /// Start an attempt: select the algorithm and compute the checksum.
    pub fn build(&self, op: &Operation, req: &mut Request<Body>) -> Result<Attempt> {
        self.build_attempt(op, req, Attempt::new())
    }

    /// Like [`Pipeline::build`], starting from a prepared attempt, e.g. one
    /// carrying a cancellation token.
    pub fn build_attempt(
        &self,
        op: &Operation,
        req: &mut Request<Body>,
        attempt: Attempt,
    ) -> Result<Attempt> {
        let algorithm = select_request_algorithm(
            op.request_algorithm.as_deref(),
            self.config.request_checksum_calculation(),
            op.checksum_required,
        )?;
        let validate = response_validation_enabled(
            self.config.response_checksum_validation(),
            op.validation_mode.as_deref(),
        );

        let mut attempt = attempt
            .with_algorithm(algorithm)
            .with_output_validation(validate);
        RequestChecksumMetricsTracking::new(self.config.request_checksum_calculation())
            .handle_build(req.headers(), &mut attempt);
        ResponseChecksumMetricsTracking::new(self.config.response_checksum_validation())
            .handle_build(&mut attempt);
        self.compute.handle_build(req, &mut attempt)?;
        Ok(attempt)
    }

    /// Finish the request: frame a deferred checksum as a trailer and sign.
    pub async fn finalize(
        &self,
        mut req: Request<Body>,
        attempt: &mut Attempt,
    ) -> Result<Request<Body>> {
        self.trailer.handle_finalize(&mut req, attempt)?;

        let (mut parts, body) = req.into_parts();
        debug!("signing request with payload hash {:?}", attempt.payload_hash());
        self.signer
            .sign(&mut parts, attempt.payload_hash(), None)
            .await?;
        Ok(Request::from_parts(parts, body))
    }

    /// Validate the response checksum while the body is read.
    pub fn deserialize<R: Read>(
        &self,
        resp: Response<R>,
        attempt: &mut Attempt,
    ) -> Result<Response<ResponseBody<R>>> {
        self.validate.handle_deserialize(resp, attempt)
    }
}
