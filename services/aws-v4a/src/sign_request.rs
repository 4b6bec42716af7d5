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

use std::fmt::Write;
use std::time::Duration;

use async_trait::async_trait;
use http::header::{self, HeaderName};
use http::request::Parts;
use http::{HeaderMap, HeaderValue, Method, Uri};
use log::debug;
use p256::ecdsa::signature::Signer as _;
use p256::ecdsa::Signature;
use percent_encoding::utf8_percent_encode;
use reqsign_core::hash::hex_sha256;
use reqsign_core::time::{format_date, format_iso8601, now, DateTime};
use reqsign_core::{Context, Error, Result, SignRequest, SigningRequest};

use crate::constants::*;
use crate::EcdsaCredential;

/// RequestSigner that implements AWS SigV4A.
///
/// The signature is valid in every region of the region set, `*` being all
/// of them.
///
/// - [Signing AWS API requests](https://docs.aws.amazon.com/IAM/latest/UserGuide/reference_sigv-create-signed-request.html)
#[derive(Debug)]
pub struct RequestSigner {
    service: String,
    region_set: Vec<String>,

    time: Option<DateTime>,
    log_signing: bool,
    content_sha256_header: bool,
    disable_uri_path_escaping: bool,
}

/// A request signed through its query string.
///
/// Anyone holding it can send it until it expires.
#[derive(Debug)]
pub struct PresignedRequest {
    /// Method the request must be sent with.
    pub method: Method,
    /// URI carrying the signature.
    pub uri: Uri,
    /// Signed headers the request must still be sent with.
    pub headers: HeaderMap,
}

impl RequestSigner {
    /// Create a new signer for `service` valid in `region_set`.
    pub fn new(service: &str, region_set: &[&str]) -> Self {
        Self {
            service: service.into(),
            region_set: region_set.iter().map(|r| r.to_string()).collect(),

            time: None,
            log_signing: false,
            content_sha256_header: false,
            disable_uri_path_escaping: service == "s3",
        }
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Log the canonical request and the string to sign at debug level.
    pub fn with_log_signing(mut self, enabled: bool) -> Self {
        self.log_signing = enabled;
        self
    }

    /// Send the payload hash in `x-amz-content-sha256`, as S3 requires.
    pub fn with_content_sha256_header(mut self, enabled: bool) -> Self {
        self.content_sha256_header = enabled;
        self
    }

    /// Use the request path as-is in the canonical request instead of
    /// escaping it again.
    ///
    /// Enabled by default for `s3`, which signs the path as sent.
    pub fn with_disable_uri_path_escaping(mut self, disabled: bool) -> Self {
        self.disable_uri_path_escaping = disabled;
        self
    }

    /// Presign `req` without touching it.
    ///
    /// The body is not signed unless `payload_hash` is given.
    pub fn presign(
        &self,
        req: &Parts,
        credential: &EcdsaCredential,
        payload_hash: Option<&str>,
        expires_in: Duration,
    ) -> Result<PresignedRequest> {
        let (mut parts, _) = http::Request::builder()
            .method(req.method.clone())
            .uri(req.uri.clone())
            .version(req.version)
            .body(())?
            .into_parts();
        parts.headers = req.headers.clone();

        self.presign_parts(
            &mut parts,
            credential,
            payload_hash.unwrap_or(UNSIGNED_PAYLOAD),
            expires_in,
            self.time.unwrap_or_else(now),
        )?;
        Ok(PresignedRequest {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
        })
    }

    fn scope(&self, now: DateTime) -> String {
        // Scope: "20220313/<service>/aws4_request", no region in SigV4A.
        format!("{}/{}/aws4_request", format_date(now), self.service)
    }

    fn sign_headers(
        &self,
        req: &mut Parts,
        cred: &EcdsaCredential,
        payload_hash: &str,
        now: DateTime,
    ) -> Result<()> {
        let mut signed_req = SigningRequest::build(req)?;
        self.insert_signing_headers(&mut signed_req, cred, payload_hash, now)?;

        canonicalize_query(&mut signed_req);
        let headers = canonical_headers(&signed_req.headers)?;
        let signed_headers = signed_header_names(&headers);

        let scope = self.scope(now);
        let signature = self.sign(cred, &signed_req, &headers, payload_hash, &scope, now)?;

        let mut authorization = HeaderValue::from_str(&format!(
            "{SIGNING_ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            cred.access_key_id,
        ))?;
        authorization.set_sensitive(true);
        signed_req
            .headers
            .insert(header::AUTHORIZATION, authorization);

        signed_req.apply(req)
    }

    fn insert_signing_headers(
        &self,
        signed_req: &mut SigningRequest,
        cred: &EcdsaCredential,
        payload_hash: &str,
        now: DateTime,
    ) -> Result<()> {
        insert_host(signed_req)?;
        if self.content_sha256_header {
            signed_req
                .headers
                .insert(X_AMZ_CONTENT_SHA_256, HeaderValue::from_str(payload_hash)?);
        }
        signed_req
            .headers
            .insert(X_AMZ_DATE, HeaderValue::try_from(format_iso8601(now))?);
        signed_req.headers.insert(
            X_AMZ_REGION_SET,
            HeaderValue::try_from(self.region_set.join(","))?,
        );
        if let Some(token) = &cred.session_token {
            let mut value = HeaderValue::from_str(token)?;
            // Set token value sensitive to avoid leaking.
            value.set_sensitive(true);
            signed_req.headers.insert(X_AMZ_SECURITY_TOKEN, value);
        }
        Ok(())
    }

    fn presign_parts(
        &self,
        req: &mut Parts,
        cred: &EcdsaCredential,
        payload_hash: &str,
        expires_in: Duration,
        now: DateTime,
    ) -> Result<()> {
        let mut signed_req = SigningRequest::build(req)?;

        hoist_headers(&mut signed_req)?;
        insert_host(&mut signed_req)?;

        let scope = self.scope(now);
        query_set(&mut signed_req, X_AMZ_ALGORITHM_QUERY, SIGNING_ALGORITHM);
        query_set(
            &mut signed_req,
            X_AMZ_CREDENTIAL_QUERY,
            format!("{}/{scope}", cred.access_key_id),
        );
        query_set(&mut signed_req, X_AMZ_DATE_QUERY, format_iso8601(now));
        query_set(
            &mut signed_req,
            X_AMZ_EXPIRES_QUERY,
            expires_in.as_secs().to_string(),
        );
        query_set(
            &mut signed_req,
            X_AMZ_REGION_SET_QUERY,
            self.region_set.join(","),
        );
        if let Some(token) = &cred.session_token {
            query_set(&mut signed_req, X_AMZ_SECURITY_TOKEN_QUERY, token.as_str());
        }

        let headers = canonical_headers(&signed_req.headers)?;
        query_set(
            &mut signed_req,
            X_AMZ_SIGNED_HEADERS_QUERY,
            signed_header_names(&headers),
        );
        canonicalize_query(&mut signed_req);

        let signature = self.sign(cred, &signed_req, &headers, payload_hash, &scope, now)?;
        signed_req.query_push(X_AMZ_SIGNATURE_QUERY, signature);

        signed_req.apply(req)
    }

    /// Sign the canonical form of `req`, returning the hex DER signature.
    fn sign(
        &self,
        cred: &EcdsaCredential,
        req: &SigningRequest,
        headers: &[(String, String)],
        payload_hash: &str,
        scope: &str,
        now: DateTime,
    ) -> Result<String> {
        let creq =
            canonical_request_string(req, headers, payload_hash, self.disable_uri_path_escaping)?;
        if self.log_signing {
            debug!("calculated canonical request: {creq}");
        }

        // StringToSign:
        //
        // AWS4-ECDSA-P256-SHA256
        // 20220313T072004Z
        // 20220313/<service>/aws4_request
        // <hashed_canonical_request>
        let string_to_sign = {
            let mut f = String::new();
            writeln!(f, "{SIGNING_ALGORITHM}")?;
            writeln!(f, "{}", format_iso8601(now))?;
            writeln!(f, "{scope}")?;
            write!(f, "{}", hex_sha256(creq.as_bytes()))?;
            f
        };
        if self.log_signing {
            debug!("calculated string to sign: {string_to_sign}");
        }

        let signature: Signature = cred.key.try_sign(string_to_sign.as_bytes()).map_err(|e| {
            Error::unexpected("failed to sign string to sign").with_source(e)
        })?;
        Ok(hex::encode(signature.to_der()))
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = EcdsaCredential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        credential: Option<&Self::Credential>,
        payload_hash: Option<&str>,
        expires_in: Option<Duration>,
    ) -> Result<()> {
        let Some(cred) = credential else {
            debug!("no credential loaded, leave request unsigned");
            return Ok(());
        };

        let now = self.time.unwrap_or_else(now);
        let payload_hash = payload_hash.unwrap_or(UNSIGNED_PAYLOAD);
        match expires_in {
            Some(expires_in) => self.presign_parts(req, cred, payload_hash, expires_in, now),
            None => self.sign_headers(req, cred, payload_hash, now),
        }
    }
}

fn canonical_request_string(
    req: &SigningRequest,
    headers: &[(String, String)],
    payload_hash: &str,
    disable_uri_path_escaping: bool,
) -> Result<String> {
    // 256 is specially chosen to avoid reallocation for most requests.
    let mut f = String::with_capacity(256);

    // Insert method
    writeln!(f, "{}", req.method)?;
    // The path is already escaped as it is on the wire.
    if disable_uri_path_escaping {
        writeln!(f, "{}", req.path)?;
    } else {
        writeln!(f, "{}", utf8_percent_encode(&req.path, &AWS_URI_ENCODE_SET))?;
    }
    // Insert query
    writeln!(
        f,
        "{}",
        req.query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    )?;
    // Insert signed headers
    for (name, value) in headers {
        writeln!(f, "{name}:{value}")?;
    }
    writeln!(f)?;
    writeln!(f, "{}", signed_header_names(headers))?;
    write!(f, "{payload_hash}")?;

    Ok(f)
}

/// Sorted `(name, value)` pairs of the headers to sign.
///
/// Values are normalized and repeated headers are joined with `,`.
fn canonical_headers(headers: &HeaderMap) -> Result<Vec<(String, String)>> {
    let mut names: Vec<&str> = headers
        .keys()
        .map(|k| k.as_str())
        .filter(|k| !IGNORED_HEADERS.contains(k))
        .collect();
    names.sort_unstable();

    names
        .into_iter()
        .map(|name| {
            let values = headers
                .get_all(name)
                .iter()
                .map(SigningRequest::header_value_normalize)
                .collect::<Result<Vec<_>>>()?;
            Ok((name.to_string(), values.join(",")))
        })
        .collect()
}

fn signed_header_names(headers: &[(String, String)]) -> String {
    headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";")
}

fn insert_host(req: &mut SigningRequest) -> Result<()> {
    if req.headers.get(header::HOST).is_none() {
        let host = HeaderValue::from_str(req.authority.as_str())?;
        req.headers.insert(header::HOST, host);
    }
    Ok(())
}

/// Sort the query by name then value and encode it.
fn canonicalize_query(req: &mut SigningRequest) {
    if req.query.is_empty() {
        return;
    }

    req.query.sort();
    req.query = req
        .query
        .iter()
        .map(|(k, v)| {
            (
                utf8_percent_encode(k, &AWS_QUERY_ENCODE_SET).to_string(),
                utf8_percent_encode(v, &AWS_QUERY_ENCODE_SET).to_string(),
            )
        })
        .collect();
}

/// Replace every `key` pair in the query.
fn query_set(req: &mut SigningRequest, key: &str, value: impl Into<String>) {
    req.query.retain(|(k, _)| k != key);
    req.query_push(key, value);
}

/// Move `x-amz-*` headers that are not required to be signed into the query.
fn hoist_headers(req: &mut SigningRequest) -> Result<()> {
    let hoisted: Vec<HeaderName> = req
        .headers
        .keys()
        .filter(|k| {
            k.as_str().starts_with("x-amz-") && !REQUIRED_SIGNED_HEADERS.contains(k.as_str())
        })
        .cloned()
        .collect();

    for name in hoisted {
        let key = query_key(name.as_str());
        for value in req.headers.get_all(&name) {
            let value = value.to_str()?.to_string();
            req.query.push((key.clone(), value));
        }
        req.headers.remove(&name);
    }
    Ok(())
}

/// `x-amz-target` => `X-Amz-Target`
fn query_key(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper { c.to_ascii_uppercase() } else { c };
            upper = c == '-';
            out
        })
        .collect()
}
