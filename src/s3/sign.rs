//! Request signing for S3-compatible backends.
//!
//! Implements both AWS Signature Version 4 (header-based, SHA-256) and the
//! older Signature Version 2 (HMAC-SHA1 over a canonical string-to-sign).
//! V2 survives here only because Ceph-RGW class backends reject V4 on the
//! multipart upload path.

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// Hex SHA-256 of a payload, as required for `x-amz-content-sha256`.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Derive the V4 signing key: HMAC chain over date, region, service.
pub fn signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{}", secret_key).as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// The request parts that participate in signing.
///
/// `path` and `query` must be exactly the percent-encoded strings that go on
/// the wire: V4 signs the canonical form, and any mismatch with the sent
/// request is rejected by the backend.
pub struct CanonicalRequest<'a> {
    pub method: &'a str,
    pub host: &'a str,
    pub path: &'a str,
    /// Canonical (sorted, encoded) query string, empty when none.
    pub query: &'a str,
    pub content_type: Option<&'a str>,
    /// Hex SHA-256 of the payload (hash of the empty string for bodyless calls).
    pub payload_hash: &'a str,
}

/// Sign a request with AWS Signature Version 4.
///
/// Returns the headers to apply: `x-amz-date`, `x-amz-content-sha256`, and
/// `authorization`. The `host` header is signed but left to the transport to
/// set; `content-type`, when present, is signed and must be set by the
/// caller with the identical value.
pub fn sign_v4(
    req: &CanonicalRequest<'_>,
    access_key: &str,
    secret_key: &str,
    region: &str,
    now: DateTime<Utc>,
) -> Vec<(String, String)> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = now.format("%Y%m%d").to_string();

    let mut signed: Vec<(&str, &str)> = vec![
        ("host", req.host),
        ("x-amz-content-sha256", req.payload_hash),
        ("x-amz-date", &amz_date),
    ];
    if let Some(ct) = req.content_type {
        signed.push(("content-type", ct));
    }
    signed.sort_by(|a, b| a.0.cmp(b.0));

    let signed_headers = signed
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(";");
    let canonical_headers: String = signed
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
        .collect();

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        req.method, req.path, req.query, canonical_headers, signed_headers, req.payload_hash
    );

    let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, region);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        credential_scope,
        sha256_hex(canonical_request.as_bytes())
    );

    let key = signing_key(secret_key, &date_stamp, region, "s3");
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

    let authorization = format!(
        "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
        access_key, credential_scope, signed_headers, signature
    );

    vec![
        ("x-amz-date".to_string(), amz_date),
        ("x-amz-content-sha256".to_string(), req.payload_hash.to_string()),
        ("authorization".to_string(), authorization),
    ]
}

/// Assemble the V2 string-to-sign in protocol order.
///
/// `resource` is the canonicalized resource (`/bucket/key` plus any signed
/// subresources); `amz_headers` is the canonicalized `x-amz-*` block, empty
/// when no such headers are sent.
pub fn string_to_sign_v2(
    method: &str,
    content_md5: &str,
    content_type: &str,
    date: &str,
    amz_headers: &str,
    resource: &str,
) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}{}",
        method, content_md5, content_type, date, amz_headers, resource
    )
}

/// Sign a request with AWS Signature Version 2.
///
/// Returns the full `Authorization` header value (`AWS access:signature`).
/// The caller must send the same `Date` header and, when `content_type` is
/// given, the identical `Content-Type`.
pub fn sign_v2(
    method: &str,
    content_type: Option<&str>,
    date: &str,
    resource: &str,
    access_key: &str,
    secret_key: &str,
) -> String {
    let string_to_sign =
        string_to_sign_v2(method, "", content_type.unwrap_or(""), date, "", resource);
    let mut mac =
        HmacSha1::new_from_slice(secret_key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(string_to_sign.as_bytes());
    let signature = general_purpose::STANDARD.encode(mac.finalize().into_bytes());
    format!("AWS {}:{}", access_key, signature)
}

/// RFC 1123 date for the V2 `Date` header.
pub fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sha256_of_empty_payload() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn signing_key_matches_aws_derivation_example() {
        // Published AWS SigV4 key-derivation test vector.
        let key = signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20150830",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9"
        );
    }

    #[test]
    fn v4_headers_and_authorization_shape() {
        let now = Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap();
        let req = CanonicalRequest {
            method: "GET",
            host: "rgw.example.net:7480",
            path: "/demo-bucket/",
            query: "list-type=2&max-keys=100",
            content_type: None,
            payload_hash: "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        };
        let headers = sign_v4(&req, "AKIDEXAMPLE", "secret", "us-east-1", now);

        assert_eq!(headers[0], ("x-amz-date".into(), "20150830T123600Z".into()));
        let auth = &headers[2].1;
        assert!(auth.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/s3/aws4_request"
        ));
        assert!(auth.contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date"));
        assert!(auth.contains("Signature="));
    }

    #[test]
    fn v2_string_to_sign_field_order() {
        let sts = string_to_sign_v2(
            "PUT",
            "",
            "application/octet-stream",
            "Thu, 01 Jan 1970 00:00:00 GMT",
            "",
            "/demo-bucket/logs/a.txt",
        );
        assert_eq!(
            sts,
            "PUT\n\napplication/octet-stream\nThu, 01 Jan 1970 00:00:00 GMT\n/demo-bucket/logs/a.txt"
        );
    }

    #[test]
    fn v2_authorization_shape() {
        let auth = sign_v2(
            "PUT",
            None,
            "Thu, 01 Jan 1970 00:00:00 GMT",
            "/demo-bucket/a.txt",
            "AKIDEXAMPLE",
            "secret",
        );
        assert!(auth.starts_with("AWS AKIDEXAMPLE:"));
        // HMAC-SHA1 is 20 bytes, so the base64 signature is 28 chars.
        assert_eq!(auth.len(), "AWS AKIDEXAMPLE:".len() + 28);
    }

    #[test]
    fn http_date_is_rfc1123() {
        let epoch = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(http_date(epoch), "Thu, 01 Jan 1970 00:00:00 GMT");
    }
}
