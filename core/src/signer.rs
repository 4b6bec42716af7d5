use crate::{Context, ProvideCredential, Result, SignRequest, SigningCredential};
use log::debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Signer is the main struct used to sign the request.
///
/// It loads the credential on demand, keeps it until it's no longer valid
/// and hands it to the request signer.
#[derive(Clone, Debug)]
pub struct Signer<K: SigningCredential> {
    ctx: Context,
    provider: Arc<dyn ProvideCredential<Credential = K>>,
    signer: Arc<dyn SignRequest<Credential = K>>,
    credential: Arc<Mutex<Option<K>>>,
}

impl<K: SigningCredential> Signer<K> {
    /// Create a new signer.
    pub fn new(
        ctx: Context,
        provider: impl ProvideCredential<Credential = K>,
        signer: impl SignRequest<Credential = K>,
    ) -> Self {
        Self {
            ctx,

            provider: Arc::new(provider),
            signer: Arc::new(signer),
            credential: Arc::new(Mutex::new(None)),
        }
    }

    /// Replace the credential provider, dropping any loaded credential.
    pub fn with_credential_provider(
        mut self,
        provider: impl ProvideCredential<Credential = K>,
    ) -> Self {
        self.provider = Arc::new(provider);
        self.credential = Arc::new(Mutex::new(None));
        self
    }

    /// Get the context used by this signer.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Signing request.
    pub async fn sign(
        &self,
        req: &mut http::request::Parts,
        payload_hash: Option<&str>,
        expires_in: Option<Duration>,
    ) -> Result<()> {
        let credential = self.load_credential().await?;

        self.signer
            .sign_request(
                &self.ctx,
                req,
                credential.as_ref(),
                payload_hash,
                expires_in,
            )
            .await
    }

    async fn load_credential(&self) -> Result<Option<K>> {
        let cached = self
            .credential
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();
        if cached.is_valid() {
            return Ok(cached);
        }

        debug!("credential is missing or no longer valid, loading a new one");
        let loaded = self.provider.provide_credential(&self.ctx).await?;
        if let Ok(mut guard) = self.credential.lock() {
            *guard = loaded.clone();
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Debug)]
    struct TestCredential(bool);

    impl SigningCredential for TestCredential {
        fn is_valid(&self) -> bool {
            self.0
        }
    }

    #[derive(Debug, Default)]
    struct CountingProvider {
        valid: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ProvideCredential for CountingProvider {
        type Credential = TestCredential;

        async fn provide_credential(&self, _: &Context) -> Result<Option<TestCredential>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(TestCredential(self.valid)))
        }
    }

    #[derive(Debug)]
    struct HeaderSigner;

    #[async_trait]
    impl SignRequest for HeaderSigner {
        type Credential = TestCredential;

        async fn sign_request(
            &self,
            _: &Context,
            req: &mut http::request::Parts,
            credential: Option<&TestCredential>,
            payload_hash: Option<&str>,
            _: Option<Duration>,
        ) -> Result<()> {
            if credential.is_some() {
                req.headers
                    .insert("x-payload", payload_hash.unwrap_or("none").parse()?);
            }
            Ok(())
        }
    }

    fn parts() -> http::request::Parts {
        http::Request::get("https://example.com")
            .body(())
            .expect("request must be valid")
            .into_parts()
            .0
    }

    #[tokio::test]
    async fn test_valid_credential_is_reused() -> anyhow::Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = CountingProvider {
            valid: true,
            calls: calls.clone(),
        };
        let signer = Signer::new(Context::new(), provider, HeaderSigner);

        let mut req = parts();
        signer.sign(&mut req, Some("abc"), None).await?;
        signer.sign(&mut parts(), None, None).await?;

        assert_eq!(req.headers["x-payload"], "abc");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_credential_is_reloaded() -> anyhow::Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = CountingProvider {
            valid: false,
            calls: calls.clone(),
        };
        let signer = Signer::new(Context::new(), provider, HeaderSigner);

        signer.sign(&mut parts(), None, None).await?;
        signer.sign(&mut parts(), None, None).await?;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        Ok(())
    }
}
