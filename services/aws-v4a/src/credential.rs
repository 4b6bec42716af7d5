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

use p256::ecdsa::{SigningKey, VerifyingKey};
use reqsign_core::time::{now, DateTime};
use reqsign_core::utils::Redact;
use reqsign_core::SigningCredential;

/// Symmetric credential: the access key pair SigV4A keys are derived from.
#[derive(Default, Clone)]
pub struct Credential {
    /// Access key id for aws services.
    pub access_key_id: String,
    /// Secret access key for aws services.
    pub secret_access_key: String,
    /// Session token for aws services.
    pub session_token: Option<String>,
    /// Expiration time for this credential.
    pub expires_in: Option<DateTime>,
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl SigningCredential for Credential {
    fn is_valid(&self) -> bool {
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return false;
        }
        not_expired(self.expires_in)
    }
}

/// Asymmetric credential used to sign SigV4A requests.
///
/// Derived from exactly one [`Credential`]. The access key id is kept as
/// the identity the signature is bound to.
#[derive(Clone)]
pub struct EcdsaCredential {
    /// Access key id the key was derived from.
    pub access_key_id: String,
    /// Session token of the symmetric credential.
    pub session_token: Option<String>,
    /// Expiration time of the symmetric credential.
    pub expires_in: Option<DateTime>,
    /// P-256 private key.
    pub key: Arc<SigningKey>,
}

impl EcdsaCredential {
    /// Public half of the key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        self.key.verifying_key()
    }
}

impl Debug for EcdsaCredential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcdsaCredential")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("session_token", &Redact::from(&self.session_token))
            .field("expires_in", &self.expires_in)
            .field("key", &Redact::from("private key"))
            .finish()
    }
}

impl SigningCredential for EcdsaCredential {
    fn is_valid(&self) -> bool {
        !self.access_key_id.is_empty() && not_expired(self.expires_in)
    }
}

fn not_expired(expires_in: Option<DateTime>) -> bool {
    // Take 120s as buffer to avoid edge cases.
    match expires_in {
        Some(t) => t > now() + chrono::TimeDelta::minutes(2),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive_signing_key;
    use chrono::TimeDelta;

    #[test]
    fn test_credential_validity() {
        let mut cred = Credential {
            access_key_id: "ak".to_string(),
            secret_access_key: "sk".to_string(),
            ..Default::default()
        };
        assert!(cred.is_valid());

        cred.expires_in = Some(now() + TimeDelta::minutes(1));
        assert!(!cred.is_valid());

        cred.expires_in = Some(now() + TimeDelta::hours(1));
        assert!(cred.is_valid());

        cred.secret_access_key.clear();
        assert!(!cred.is_valid());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let cred = Credential {
            access_key_id: "AKISORANDOMAASORANDOM".to_string(),
            secret_access_key: "q+jcrXGc+0zWN6uzclKVhvMmUsIfRPa4rlRandom".to_string(),
            session_token: Some("TOKEN".to_string()),
            expires_in: None,
        };
        let s = format!("{cred:?}");
        assert!(!s.contains("q+jcrXGc+0zWN6uzclKVhvMmUsIfRPa4rlRandom"));
        assert!(!s.contains("TOKEN"));

        let key = derive_signing_key(&cred.access_key_id, &cred.secret_access_key).unwrap();
        let ecdsa = EcdsaCredential {
            access_key_id: cred.access_key_id.clone(),
            session_token: None,
            expires_in: None,
            key: Arc::new(key),
        };
        let s = format!("{ecdsa:?}");
        assert!(s.contains("EcdsaCredential"));
        assert!(!s.contains("AKISORANDOMAASORANDOM"));
    }
}
