//! AWS SigV4A signer.
//!
//! SigV4A signs requests with an ECDSA P-256 key derived from the access key
//! pair, so one signature is valid in a whole set of regions.
//!
//! ## Quick Start
//!
//! ```no_run
//! use reqsign_aws_v4a::{EnvCredentialProvider, RequestSigner, SymmetricCredentialAdaptor};
//! use reqsign_core::{Context, OsEnv, Signer};
//!
//! #[tokio::main]
//! async fn main() -> reqsign_core::Result<()> {
//!     let ctx = Context::new().with_env(OsEnv);
//!     let provider = SymmetricCredentialAdaptor::new(EnvCredentialProvider::new());
//!     let signer = Signer::new(ctx, provider, RequestSigner::new("s3", &["*"]));
//!
//!     let (mut parts, _) = http::Request::get("https://mrap.accesspoint.s3-global.amazonaws.com/key")
//!         .body(())?
//!         .into_parts();
//!     signer.sign(&mut parts, None, None).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

mod constants;

mod credential;
pub use credential::{Credential, EcdsaCredential};

mod derive;
pub use derive::derive_signing_key;

mod provide_credential;
pub use provide_credential::*;

mod sign_request;
pub use sign_request::{PresignedRequest, RequestSigner};
