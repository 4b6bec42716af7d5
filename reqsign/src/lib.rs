//! Signing and checksumming AWS API requests without effort.
//!
//! The `aws` feature (on by default) brings in the checksum stages and the
//! SigV4A signer, wired together by [`aws::Pipeline`].

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use reqsign_core::*;

#[cfg(feature = "aws")]
pub mod aws;
