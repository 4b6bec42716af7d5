use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use anyhow::Result;
use http::header::CONTENT_LENGTH;
use http::{HeaderValue, Request, Response};
use log::debug;
use rand::{Rng, RngCore};
use reqsign_aws_checksum::constants::STREAMING_UNSIGNED_PAYLOAD_TRAILER;
use reqsign_aws_checksum::{
    compute, framed_length, AddInputChecksumTrailer, Algorithm, Attempt, Body,
    ComputeInputChecksum, InputChecksum, ValidateOutputChecksum,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn random_body(len: usize) -> Vec<u8> {
    let mut data = vec![0; len];
    rand::thread_rng().fill_bytes(&mut data);
    data
}

fn request(uri: &str, body: Body, length: Option<u64>) -> Request<Body> {
    let mut req = Request::new(body);
    *req.method_mut() = http::Method::PUT;
    *req.uri_mut() = uri.parse().expect("uri must be valid");
    if let Some(len) = length {
        req.headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from(len));
    }
    req
}

/// Run both request stages the way a client would.
fn build_and_finalize(req: &mut Request<Body>, algorithm: Algorithm) -> Result<Attempt> {
    let mut attempt = Attempt::new().with_algorithm(Some(algorithm));
    ComputeInputChecksum::new().handle_build(req, &mut attempt)?;
    AddInputChecksumTrailer::new().handle_finalize(req, &mut attempt)?;
    Ok(attempt)
}

/// Split an aws-chunked body into its data and its trailer.
fn decode_aws_chunked(mut input: &[u8]) -> (Vec<u8>, String) {
    let mut data = Vec::new();
    loop {
        let line_end = input
            .windows(2)
            .position(|w| w == b"\r\n")
            .expect("chunk size line must end");
        let size = usize::from_str_radix(std::str::from_utf8(&input[..line_end]).unwrap(), 16)
            .expect("chunk size must be hex");
        input = &input[line_end + 2..];
        if size == 0 {
            break;
        }
        data.extend_from_slice(&input[..size]);
        assert_eq!(&input[size..size + 2], b"\r\n");
        input = &input[size + 2..];
    }

    let trailer = std::str::from_utf8(input).expect("trailer must be utf-8");
    let trailer = trailer
        .strip_suffix("\r\n\r\n")
        .expect("trailer must end with an empty line");
    (data, trailer.to_string())
}

#[test]
fn test_trailer_matches_eager_checksum() -> Result<()> {
    init();

    let mut rng = rand::thread_rng();
    for algorithm in Algorithm::ALL {
        for _ in 0..4 {
            let len = rng.gen_range(1..200 * 1024);
            let data = random_body(len);
            debug!("checking {algorithm} with {len} bytes");

            let mut eager = request(
                "https://example.aws/key",
                Body::seekable(Cursor::new(data.clone())),
                Some(len as u64),
            );
            let eager_attempt = build_and_finalize(&mut eager, algorithm)?;
            let expected = eager.headers()[algorithm.header_name()].to_str()?.to_string();
            assert!(matches!(
                eager_attempt.input_checksum(),
                InputChecksum::Computed { .. }
            ));
            assert_eq!(expected, compute(algorithm, &data));

            let mut streamed = request(
                "https://example.aws/key",
                Body::stream(Cursor::new(data.clone())),
                Some(len as u64),
            );
            let attempt = build_and_finalize(&mut streamed, algorithm)?;
            assert_eq!(
                attempt.payload_hash(),
                Some(STREAMING_UNSIGNED_PAYLOAD_TRAILER)
            );

            let mut wire = Vec::new();
            streamed.body_mut().read_to_end(&mut wire)?;
            assert_eq!(
                streamed.headers()[CONTENT_LENGTH].to_str()?,
                wire.len().to_string()
            );
            assert_eq!(wire.len() as u64, framed_length(len as u64, algorithm));

            let (decoded, trailer) = decode_aws_chunked(&wire);
            assert_eq!(decoded, data);
            assert_eq!(trailer, format!("{}:{expected}", algorithm.header_name()));
            assert_eq!(attempt.checksum_metadata()[&algorithm], expected);
        }
    }
    Ok(())
}

#[test]
fn test_seekable_file_body() -> Result<()> {
    init();

    let mut file = tempfile::tempfile()?;
    file.write_all(b"Hello world")?;
    file.seek(SeekFrom::Start(0))?;

    let mut req = request("http://example.aws/key", Body::seekable(file), Some(11));
    let attempt = build_and_finalize(&mut req, Algorithm::Sha1)?;

    assert_eq!(
        req.headers()["x-amz-checksum-sha1"],
        "e1AsOh9IyGCa4hLN+2Od7jlnP14="
    );
    assert_eq!(
        attempt.payload_hash(),
        Some("64ec88ca00b268e5ba1a35678a1b5316d212f4f366b2477232534a8aeca37f3c")
    );

    let mut body = String::new();
    req.body_mut().read_to_string(&mut body)?;
    assert_eq!(body, "Hello world");
    Ok(())
}

#[test]
fn test_response_round_trip() -> Result<()> {
    init();

    let data = random_body(100 * 1024);
    let stage = ValidateOutputChecksum::new();

    let resp = Response::builder()
        .header("x-amz-checksum-crc64nvme", compute(Algorithm::Crc64Nvme, &data))
        .body(Cursor::new(data.clone()))?;
    let mut attempt = Attempt::new().with_output_validation(true);
    let mut body = Vec::new();
    stage
        .handle_deserialize(resp, &mut attempt)?
        .into_body()
        .read_to_end(&mut body)?;
    assert_eq!(body, data);
    assert_eq!(attempt.validated_with(), &[Algorithm::Crc64Nvme]);

    let mut tampered = data.clone();
    tampered[4096] ^= 0xff;
    let resp = Response::builder()
        .header("x-amz-checksum-crc64nvme", compute(Algorithm::Crc64Nvme, &data))
        .body(Cursor::new(tampered))?;
    let mut attempt = Attempt::new().with_output_validation(true);
    let err = stage
        .handle_deserialize(resp, &mut attempt)?
        .into_body()
        .read_to_end(&mut Vec::new())
        .unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    Ok(())
}
