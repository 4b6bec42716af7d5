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

//! Derive a P-256 key pair from an access key pair.
//!
//! The private scalar comes from a counter-mode HMAC-SHA256 KDF (NIST SP
//! 800-108) keyed with `"AWS4A" + secret_access_key`. A candidate outside
//! `[1, n - 1)` is dropped and the next counter value is tried.

use log::debug;
use p256::ecdsa::SigningKey;
use reqsign_core::hash::hmac_sha256_parts;
use reqsign_core::{Error, Result};

use crate::constants::SIGNING_ALGORITHM;

/// Order of the P-256 group minus two, big endian.
const N_MINUS_TWO: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xbc, 0xe6, 0xfa, 0xad, 0xa7, 0x17, 0x9e, 0x84, 0xf3, 0xb9, 0xca, 0xc2, 0xfc, 0x63, 0x25, 0x4f,
];

/// Length of the derived key in bits, as the KDF encodes it.
const KEY_BITS: u32 = 256;

/// Derive the SigV4A signing key of an access key pair.
///
/// The same pair always yields the same key.
pub fn derive_signing_key(access_key_id: &str, secret_access_key: &str) -> Result<SigningKey> {
    let secret = format!("AWS4A{secret_access_key}");

    for counter in 1..=u8::MAX {
        let k = hmac_sha256_parts(
            secret.as_bytes(),
            &[
                &1u32.to_be_bytes(),
                SIGNING_ALGORITHM.as_bytes(),
                &[0],
                access_key_id.as_bytes(),
                &[counter],
                &KEY_BITS.to_be_bytes(),
            ],
        );

        // Big endian arrays of equal length compare like the integers.
        if k >= N_MINUS_TWO {
            debug!("derived candidate {counter} out of range, retry");
            continue;
        }

        return SigningKey::from_slice(&add_one(k)).map_err(|e| {
            Error::credential_invalid("failed to build signing key from derived scalar")
                .with_source(e)
        });
    }

    Err(Error::credential_invalid("exhausted counter while deriving signing key"))
}

fn add_one(mut v: [u8; 32]) -> [u8; 32] {
    for b in v.iter_mut().rev() {
        let (sum, carry) = b.overflowing_add(1);
        *b = sum;
        if !carry {
            break;
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ACCESS_KEY: &str = "AKISORANDOMAASORANDOM";
    const SECRET_KEY: &str = "q+jcrXGc+0zWN6uzclKVhvMmUsIfRPa4rlRandom";

    #[test]
    fn test_derive_signing_key() -> anyhow::Result<()> {
        let key = derive_signing_key(ACCESS_KEY, SECRET_KEY)?;

        assert_eq!(
            hex::encode(key.to_bytes()),
            "7fd3bd010c0d9c292141c2b77bfbde1042c92e6836fff749d1269ec890fca1bd"
        );

        let point = key.verifying_key().to_encoded_point(false);
        assert_eq!(
            hex::encode_upper(point.x().expect("point must not be identity")),
            "15D242CEEBF8D8169FD6A8B5A746C41140414C3B07579038DA06AF89190FFFCB"
        );
        assert_eq!(
            hex::encode_upper(point.y().expect("point must not be identity")),
            "0515242CEDD82E94799482E4C0514B505AFCCF2C0C98D6A553BF539F424C5EC0"
        );
        Ok(())
    }

    #[test]
    fn test_derive_is_deterministic() -> anyhow::Result<()> {
        let a = derive_signing_key(ACCESS_KEY, SECRET_KEY)?;
        let b = derive_signing_key(ACCESS_KEY, SECRET_KEY)?;
        assert_eq!(a.to_bytes(), b.to_bytes());

        let c = derive_signing_key("AKISORANDOMBBSORANDOM", SECRET_KEY)?;
        assert_ne!(a.to_bytes(), c.to_bytes());
        Ok(())
    }

    #[test]
    fn test_add_one_carries() {
        let mut v = [0u8; 32];
        v[31] = 0xff;
        v[30] = 0xff;
        let out = add_one(v);
        assert_eq!(out[29], 1);
        assert_eq!(out[30], 0);
        assert_eq!(out[31], 0);
    }
}
