//! Payload checksums for AWS requests and responses.
//!
//! This crate attaches an `x-amz-checksum-*` value to outbound requests and
//! verifies the one returned with responses.
//!
//! ## Overview
//!
//! A request goes through the stages in this order:
//!
//! 1. [`select_request_algorithm`] picks the algorithm for the attempt.
//! 2. [`ComputeInputChecksum`] hashes a body that can be read twice, or
//!    defers the checksum of a body that can't.
//! 3. [`AddInputChecksumTrailer`] frames a deferred body as `aws-chunked`
//!    and sends the checksum as a trailer.
//! 4. The request is signed with [`Attempt::payload_hash`].
//! 5. [`ValidateOutputChecksum`] wraps the response body in a reader that
//!    fails at EOF on mismatch.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::io::Read;
//!
//! use reqsign_aws_checksum::{
//!     select_request_algorithm, AddInputChecksumTrailer, Attempt, Body, ComputeInputChecksum,
//!     Config,
//! };
//! use reqsign_core::{Context, OsEnv};
//!
//! fn main() -> reqsign_core::Result<()> {
//!     let ctx = Context::new().with_env(OsEnv);
//!     let config = Config::new().from_env(&ctx)?;
//!
//!     let algorithm =
//!         select_request_algorithm(None, config.request_checksum_calculation(), true)?;
//!     let mut attempt = Attempt::new().with_algorithm(algorithm);
//!
//!     let mut req = http::Request::new(Body::from("hello world"));
//!     *req.method_mut() = http::Method::PUT;
//!     *req.uri_mut() = "https://bucket.s3.amazonaws.com/key".parse()?;
//!
//!     ComputeInputChecksum::new().handle_build(&mut req, &mut attempt)?;
//!     AddInputChecksumTrailer::new().handle_finalize(&mut req, &mut attempt)?;
//!
//!     println!("payload hash: {:?}", attempt.payload_hash());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

mod algorithm;
pub use algorithm::{compute, Algorithm, Checksum, DEFAULT_VALIDATION_PRIORITY};

mod attempt;
pub use attempt::{Attempt, ChecksumMetadata, InputChecksum, TrailerSlot};

mod aws_chunked;
pub use aws_chunked::{framed_length, AwsChunkedReader};

mod body;
pub use body::{Body, SeekableStream};

mod compute;
pub use compute::ComputeInputChecksum;

mod config;
pub use config::{Config, RequestChecksumCalculation, ResponseChecksumValidation};

mod metrics;
pub use metrics::{RequestChecksumMetricsTracking, ResponseChecksumMetricsTracking};

mod select;
pub use select::{response_validation_enabled, select_request_algorithm, DEFAULT_ALGORITHM};

mod trailer;
pub use trailer::AddInputChecksumTrailer;

mod validate;
pub use validate::{ChecksumValidatingReader, ResponseBody, ValidateOutputChecksum};

/// Names used on the wire by the checksum stages.
pub mod constants;
