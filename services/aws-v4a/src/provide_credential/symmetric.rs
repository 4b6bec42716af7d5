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

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use p256::ecdsa::SigningKey;
use parking_lot::RwLock;
use reqsign_core::utils::Redact;
use reqsign_core::{Context, ProvideCredential, Result};

use crate::{derive_signing_key, Credential, EcdsaCredential};

/// Turns a provider of access key pairs into a provider of SigV4A keys.
///
/// Deriving a key is costly, so the last derived key is kept and reused as
/// long as the inner provider returns the same access key pair. A new
/// session token or expiration alone doesn't trigger a new derivation.
///
/// Clones share the cache.
#[derive(Clone)]
pub struct SymmetricCredentialAdaptor<P> {
    provider: P,
    cache: Arc<RwLock<Option<Arc<CachedKey>>>>,
}

struct CachedKey {
    access_key_id: String,
    secret_access_key: String,
    key: Arc<SigningKey>,
}

impl CachedKey {
    fn derived_from(&self, cred: &Credential) -> bool {
        self.access_key_id == cred.access_key_id
            && self.secret_access_key == cred.secret_access_key
    }
}

impl<P> SymmetricCredentialAdaptor<P>
where
    P: ProvideCredential<Credential = Credential>,
{
    /// Wrap `provider`.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Load the access key pair from the inner provider, bypassing the cache.
    pub async fn provide_symmetric_credential(&self, ctx: &Context) -> Result<Option<Credential>> {
        self.provider.provide_credential(ctx).await
    }

    fn signing_key(&self, cred: &Credential) -> Result<Arc<SigningKey>> {
        let cached = self.cache.read().clone();
        if let Some(cached) = cached.filter(|c| c.derived_from(cred)) {
            return Ok(cached.key.clone());
        }

        debug!(
            "derive signing key for access key {:?}",
            Redact::from(&cred.access_key_id)
        );
        let key = Arc::new(derive_signing_key(&cred.access_key_id, &cred.secret_access_key)?);

        // Concurrent derivations of the same pair produce the same key, the
        // last one to finish wins.
        *self.cache.write() = Some(Arc::new(CachedKey {
            access_key_id: cred.access_key_id.clone(),
            secret_access_key: cred.secret_access_key.clone(),
            key: key.clone(),
        }));
        Ok(key)
    }
}

#[async_trait]
impl<P> ProvideCredential for SymmetricCredentialAdaptor<P>
where
    P: ProvideCredential<Credential = Credential>,
{
    type Credential = EcdsaCredential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let Some(cred) = self.provide_symmetric_credential(ctx).await? else {
            return Ok(None);
        };

        let key = self.signing_key(&cred)?;
        Ok(Some(EcdsaCredential {
            access_key_id: cred.access_key_id,
            session_token: cred.session_token,
            expires_in: cred.expires_in,
            key,
        }))
    }
}

impl<P: Debug> Debug for SymmetricCredentialAdaptor<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricCredentialAdaptor")
            .field("provider", &self.provider)
            .field("cached", &self.cache.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticCredentialProvider;
    use reqsign_core::Error;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Returns the pair at `index`, or fails when `fail` is set.
    #[derive(Debug, Default)]
    struct RotatingProvider {
        pairs: Vec<(&'static str, &'static str, Option<&'static str>)>,
        index: Arc<AtomicUsize>,
        fail: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ProvideCredential for RotatingProvider {
        type Credential = Credential;

        async fn provide_credential(&self, _: &Context) -> Result<Option<Credential>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::credential_denied("source is down"));
            }
            let (ak, sk, token) = self.pairs[self.index.load(Ordering::SeqCst)];
            Ok(Some(Credential {
                access_key_id: ak.to_string(),
                secret_access_key: sk.to_string(),
                session_token: token.map(String::from),
                expires_in: None,
            }))
        }
    }

    fn rotating() -> RotatingProvider {
        RotatingProvider {
            pairs: vec![
                ("AKISORANDOMAASORANDOM", "secret-a", None),
                ("AKISORANDOMAASORANDOM", "secret-a", Some("TOKEN")),
                ("AKISORANDOMBBSORANDOM", "secret-b", None),
            ],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_same_pair_reuses_key() -> anyhow::Result<()> {
        let ctx = Context::new();
        let adaptor = SymmetricCredentialAdaptor::new(StaticCredentialProvider::new(
            "AKISORANDOMAASORANDOM",
            "q+jcrXGc+0zWN6uzclKVhvMmUsIfRPa4rlRandom",
        ));

        let a = adaptor.provide_credential(&ctx).await?.unwrap();
        let b = adaptor.provide_credential(&ctx).await?.unwrap();
        assert!(Arc::ptr_eq(&a.key, &b.key));
        assert_eq!(a.access_key_id, "AKISORANDOMAASORANDOM");
        Ok(())
    }

    #[tokio::test]
    async fn test_rotation_forces_derivation() -> anyhow::Result<()> {
        let ctx = Context::new();
        let provider = rotating();
        let index = provider.index.clone();
        let adaptor = SymmetricCredentialAdaptor::new(provider);

        let first = adaptor.provide_credential(&ctx).await?.unwrap();

        // A new session token alone keeps the key.
        index.store(1, Ordering::SeqCst);
        let second = adaptor.provide_credential(&ctx).await?.unwrap();
        assert!(Arc::ptr_eq(&first.key, &second.key));
        assert_eq!(second.session_token.as_deref(), Some("TOKEN"));

        index.store(2, Ordering::SeqCst);
        let third = adaptor.provide_credential(&ctx).await?.unwrap();
        assert!(!Arc::ptr_eq(&first.key, &third.key));
        assert_ne!(first.key.to_bytes(), third.key.to_bytes());
        assert_eq!(third.access_key_id, "AKISORANDOMBBSORANDOM");
        Ok(())
    }

    #[tokio::test]
    async fn test_source_failure_keeps_cache() -> anyhow::Result<()> {
        let ctx = Context::new();
        let provider = rotating();
        let fail = provider.fail.clone();
        let adaptor = SymmetricCredentialAdaptor::new(provider);

        let first = adaptor.provide_credential(&ctx).await?.unwrap();

        fail.store(true, Ordering::SeqCst);
        let err = adaptor.provide_credential(&ctx).await.unwrap_err();
        assert_eq!(err.kind(), reqsign_core::ErrorKind::CredentialDenied);
        assert!(adaptor.cache.read().is_some());

        fail.store(false, Ordering::SeqCst);
        let again = adaptor.provide_credential(&ctx).await?.unwrap();
        assert!(Arc::ptr_eq(&first.key, &again.key));
        Ok(())
    }

    #[tokio::test]
    async fn test_symmetric_credential_pass_through() -> anyhow::Result<()> {
        let ctx = Context::new();
        let adaptor = SymmetricCredentialAdaptor::new(
            StaticCredentialProvider::new("ak", "sk").with_session_token("token"),
        );

        let cred = adaptor.provide_symmetric_credential(&ctx).await?.unwrap();
        assert_eq!(cred.secret_access_key, "sk");
        assert_eq!(cred.session_token.as_deref(), Some("token"));
        assert!(adaptor.cache.read().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_callers() -> anyhow::Result<()> {
        let ctx = Context::new();
        let adaptor = SymmetricCredentialAdaptor::new(StaticCredentialProvider::new(
            "AKISORANDOMAASORANDOM",
            "q+jcrXGc+0zWN6uzclKVhvMmUsIfRPa4rlRandom",
        ));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let adaptor = adaptor.clone();
            let ctx = ctx.clone();
            tasks.push(tokio::spawn(async move {
                adaptor.provide_credential(&ctx).await
            }));
        }

        let expected = derive_signing_key(
            "AKISORANDOMAASORANDOM",
            "q+jcrXGc+0zWN6uzclKVhvMmUsIfRPa4rlRandom",
        )?;
        for task in tasks {
            let cred = task.await??.unwrap();
            assert_eq!(cred.key.to_bytes(), expected.to_bytes());
        }
        assert!(adaptor.cache.read().is_some());
        Ok(())
    }
}
