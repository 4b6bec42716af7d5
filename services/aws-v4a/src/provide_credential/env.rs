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

use async_trait::async_trait;
use log::debug;
use reqsign_core::{Context, ProvideCredential, Result};

use crate::constants::*;
use crate::Credential;

/// EnvCredentialProvider loads the access key pair from environment variables.
///
/// - `AWS_ACCESS_KEY_ID`, or `AWS_ACCESS_KEY` when unset
/// - `AWS_SECRET_ACCESS_KEY`, or `AWS_SECRET_KEY` when unset
/// - `AWS_SESSION_TOKEN`, optional
///
/// Empty values count as unset.
#[derive(Debug, Default, Clone)]
pub struct EnvCredentialProvider;

impl EnvCredentialProvider {
    /// Create a new EnvCredentialProvider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProvideCredential for EnvCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let var = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| ctx.env_var(k))
                .find(|v| !v.is_empty())
        };

        let (Some(access_key_id), Some(secret_access_key)) = (
            var(&[AWS_ACCESS_KEY_ID, AWS_ACCESS_KEY]),
            var(&[AWS_SECRET_ACCESS_KEY, AWS_SECRET_KEY]),
        ) else {
            debug!("access key pair not found in env");
            return Ok(None);
        };

        Ok(Some(Credential {
            access_key_id,
            secret_access_key,
            session_token: var(&[AWS_SESSION_TOKEN]),
            expires_in: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqsign_core::{OsEnv, StaticEnv};

    fn context(pairs: &[(&str, &str)]) -> Context {
        Context::new().with_env(StaticEnv::from_pairs(pairs.iter().copied()))
    }

    #[tokio::test]
    async fn test_env_credential_provider() -> anyhow::Result<()> {
        let ctx = context(&[
            (AWS_ACCESS_KEY_ID, "test_access_key"),
            (AWS_SECRET_ACCESS_KEY, "test_secret_key"),
            (AWS_SESSION_TOKEN, "test_session_token"),
        ]);

        let cred = EnvCredentialProvider::new()
            .provide_credential(&ctx)
            .await?
            .expect("credential must be loaded");
        assert_eq!(cred.access_key_id, "test_access_key");
        assert_eq!(cred.secret_access_key, "test_secret_key");
        assert_eq!(cred.session_token.as_deref(), Some("test_session_token"));
        Ok(())
    }

    #[tokio::test]
    async fn test_env_credential_provider_fallback_names() -> anyhow::Result<()> {
        let ctx = context(&[
            (AWS_ACCESS_KEY_ID, ""),
            (AWS_ACCESS_KEY, "legacy_access_key"),
            (AWS_SECRET_KEY, "legacy_secret_key"),
        ]);

        let cred = EnvCredentialProvider::new()
            .provide_credential(&ctx)
            .await?
            .expect("credential must be loaded");
        assert_eq!(cred.access_key_id, "legacy_access_key");
        assert_eq!(cred.secret_access_key, "legacy_secret_key");
        assert!(cred.session_token.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_env_credential_provider_partial_credentials() -> anyhow::Result<()> {
        let ctx = context(&[(AWS_ACCESS_KEY_ID, "test_access_key")]);

        let cred = EnvCredentialProvider::new().provide_credential(&ctx).await?;
        assert!(cred.is_none());
        Ok(())
    }

    #[test]
    fn test_env_credential_provider_os_env() {
        let _ = env_logger::builder().is_test(true).try_init();

        temp_env::with_vars(
            vec![
                (AWS_ACCESS_KEY_ID, Some("os_access_key")),
                (AWS_SECRET_ACCESS_KEY, Some("os_secret_key")),
                (AWS_SESSION_TOKEN, None),
            ],
            || {
                let ctx = Context::new().with_env(OsEnv);
                let rt = tokio::runtime::Runtime::new().expect("runtime must be created");
                let cred = rt
                    .block_on(EnvCredentialProvider::new().provide_credential(&ctx))
                    .expect("load must succeed")
                    .expect("credential must be loaded");
                assert_eq!(cred.access_key_id, "os_access_key");
                assert!(cred.session_token.is_none());
            },
        );
    }
}
