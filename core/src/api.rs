use crate::{Context, Result};
use std::fmt::Debug;
use std::time::Duration;

/// SigningCredential is the trait used by signer as the signing credential.
pub trait SigningCredential: Clone + Debug + Send + Sync + Unpin + 'static {
    /// Check if the credential is valid.
    fn is_valid(&self) -> bool;
}

impl<T: SigningCredential> SigningCredential for Option<T> {
    fn is_valid(&self) -> bool {
        let Some(cred) = self else {
            return false;
        };

        cred.is_valid()
    }
}

/// ProvideCredential is the trait used by signer to load the credential
/// from a credential source.
///
/// Returning `Ok(None)` means the source has nothing to offer. The request
/// will then be sent anonymously.
#[async_trait::async_trait]
pub trait ProvideCredential: Debug + Send + Sync + Unpin + 'static {
    /// Credential returned by this provider.
    type Credential: Send + Sync + Unpin + 'static;

    /// Load credential from current env.
    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>>;
}

/// SignRequest is the trait used by signer to sign the request.
#[async_trait::async_trait]
pub trait SignRequest: Debug + Send + Sync + Unpin + 'static {
    /// Credential used by this signer.
    type Credential: Send + Sync + Unpin + 'static;

    /// Sign the request in place.
    ///
    /// ## Credential
    ///
    /// A `None` credential means the request is anonymous. Implementations
    /// must leave the request untouched and return `Ok(())`.
    ///
    /// ## Payload Hash
    ///
    /// `payload_hash` is the hex digest of the body, or a sentinel such as
    /// `UNSIGNED-PAYLOAD`, fixed by the stages that ran before signing.
    /// `None` lets the signer pick its own default.
    ///
    /// ## Expires In
    ///
    /// A `Some` value asks for a presigned request that stays valid for the
    /// given duration. The signature then travels in the query string.
    async fn sign_request(
        &self,
        ctx: &Context,
        req: &mut http::request::Parts,
        credential: Option<&Self::Credential>,
        payload_hash: Option<&str>,
        expires_in: Option<Duration>,
    ) -> Result<()>;
}
