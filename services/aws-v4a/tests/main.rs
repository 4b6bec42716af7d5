use std::time::Duration;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use http::header::AUTHORIZATION;
use http::request::Parts;
use log::debug;
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use p256::ecdsa::Signature;
use reqsign_aws_v4a::{
    derive_signing_key, EnvCredentialProvider, RequestSigner, StaticCredentialProvider,
    SymmetricCredentialAdaptor,
};
use reqsign_core::{Context, ProvideCredential, Signer, StaticEnv};

const ACCESS_KEY: &str = "AKISORANDOMAASORANDOM";
const SECRET_KEY: &str = "q+jcrXGc+0zWN6uzclKVhvMmUsIfRPa4rlRandom";
const EMPTY_STRING_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn request_signer() -> RequestSigner {
    RequestSigner::new("dynamodb", &["us-east-1"])
        .with_time(Utc.timestamp_opt(0, 0).unwrap())
        .with_log_signing(true)
}

fn dynamodb_request() -> Parts {
    let value = "some-value=!@#$%^&* (+)";
    http::Request::post("https://dynamodb.us-east-1.amazonaws.com/bucket/key-._~,!@%23$%25^&*()")
        .header("X-Amz-Target", "prefix.Operation")
        .header("Content-Type", "application/x-amz-json-1.0")
        .header("Content-Length", "1024")
        .header("X-Amz-Meta-Other-Header", value)
        .header("X-Amz-Meta-Other-Header_With_Underscore", value)
        .header("X-Amz-Meta-Other-Header_With_Underscore", value)
        .body(())
        .expect("request must be valid")
        .into_parts()
        .0
}

fn verify(string_to_sign_sha256: &str, signature: &str) -> Result<()> {
    let key = derive_signing_key(ACCESS_KEY, SECRET_KEY)?;
    let signature = Signature::from_der(&hex::decode(signature)?)?;
    key.verifying_key()
        .verify_prehash(&hex::decode(string_to_sign_sha256)?, &signature)?;
    Ok(())
}

#[tokio::test]
async fn test_signer_with_static_provider() -> Result<()> {
    init();

    let provider = SymmetricCredentialAdaptor::new(
        StaticCredentialProvider::new(ACCESS_KEY, SECRET_KEY).with_session_token("TOKEN"),
    );
    let signer = Signer::new(Context::new(), provider, request_signer());

    let mut req = dynamodb_request();
    signer
        .sign(&mut req, Some(EMPTY_STRING_SHA256), None)
        .await?;

    let authorization = req.headers[AUTHORIZATION].to_str()?;
    debug!("signed authorization: {authorization}");
    let signature = authorization
        .rsplit_once("Signature=")
        .map(|(_, v)| v)
        .expect("signature must be present");
    verify(
        "4ba7d0482cf4d5450cefdc067a00de1a4a715e444856fa3e1d85c35fb34d9730",
        signature,
    )?;
    assert_eq!(req.headers["x-amz-security-token"], "TOKEN");
    Ok(())
}

#[tokio::test]
async fn test_signer_with_env_provider() -> Result<()> {
    init();

    let ctx = Context::new().with_env(StaticEnv::from_pairs([
        ("AWS_ACCESS_KEY_ID", ACCESS_KEY),
        ("AWS_SECRET_ACCESS_KEY", SECRET_KEY),
    ]));
    let provider = SymmetricCredentialAdaptor::new(EnvCredentialProvider::new());
    let signer = Signer::new(ctx, provider, request_signer());

    let mut req = dynamodb_request();
    signer
        .sign(
            &mut req,
            Some(EMPTY_STRING_SHA256),
            Some(Duration::from_secs(18000)),
        )
        .await?;

    let query = req.uri.query().expect("query must be present");
    let signature = query
        .split('&')
        .find_map(|kv| kv.strip_prefix("X-Amz-Signature="))
        .expect("signature must be present");
    verify(
        "d7ffbd2fab644384c056957e6ac38de4ae68246764b5f5df171b3824153b6397",
        signature,
    )?;
    assert!(req.headers.get(AUTHORIZATION).is_none());
    Ok(())
}

#[tokio::test]
async fn test_signer_without_credential() -> Result<()> {
    init();

    let provider = SymmetricCredentialAdaptor::new(EnvCredentialProvider::new());
    let ctx = Context::new().with_env(StaticEnv::from_pairs(Vec::<(String, String)>::new()));
    assert!(provider.provide_credential(&ctx).await?.is_none());

    let signer = Signer::new(ctx, provider, request_signer());
    let mut req = dynamodb_request();
    signer.sign(&mut req, None, None).await?;

    assert!(req.headers.get(AUTHORIZATION).is_none());
    assert!(req.headers.get("x-amz-date").is_none());
    Ok(())
}

#[tokio::test]
async fn test_signature_is_deterministic() -> Result<()> {
    init();

    let provider = SymmetricCredentialAdaptor::new(StaticCredentialProvider::new(
        ACCESS_KEY, SECRET_KEY,
    ));
    let signer = Signer::new(Context::new(), provider, request_signer());

    let mut signatures = Vec::new();
    for _ in 0..2 {
        let mut req = dynamodb_request();
        signer
            .sign(&mut req, Some(EMPTY_STRING_SHA256), None)
            .await?;
        let authorization = req.headers[AUTHORIZATION].to_str()?;
        let signature = authorization
            .rsplit_once("Signature=")
            .map(|(_, v)| v.to_string())
            .expect("signature must be present");
        verify(
            "1aeefb422ae6aa0de7aec829da813e55cff35553cac212dffd5f9474c71e47ee",
            &signature,
        )?;
        signatures.push(signature);
    }
    // RFC 6979 nonces.
    assert_eq!(signatures[0], signatures[1]);
    Ok(())
}
