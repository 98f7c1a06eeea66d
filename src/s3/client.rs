//! The storage client: one endpoint, one key pair, one signing mode.

use bytes::Bytes;
use chrono::Utc;
use reqwest::{Method, StatusCode, header};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::sign::{self, CanonicalRequest};
use super::xml::{self, ListObjectsPage};
use crate::models::bucket::BucketSummary;
use crate::models::credential::StoredCredential;

/// Explicit client-side ceiling; the underlying transport otherwise waits
/// indefinitely on a stalled backend.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Hex SHA-256 of the empty payload, used for bodyless V4 requests.
const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Query parameters that participate in the V2 canonicalized resource.
const V2_SUBRESOURCES: [&str; 3] = ["partNumber", "uploadId", "uploads"];

#[derive(Debug, Error)]
pub enum S3Error {
    #[error("invalid endpoint URL `{0}`")]
    InvalidEndpoint(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {status}: {code}: {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },
    #[error("malformed backend response: {0}")]
    Decode(String),
}

/// Which signature scheme the client applies to every request it sends.
///
/// The asymmetry is a backend compatibility requirement: Ceph-RGW class
/// stores accept only the older V2 scheme on the multipart upload path,
/// while everything else uses V4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningMode {
    /// AWS Signature Version 4 — list/get/delete and the login probe.
    Modern,
    /// AWS Signature Version 2 — the upload path.
    Legacy,
}

/// A finished multipart part, echoed back on completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    pub part_number: u32,
    pub etag: String,
}

/// Client bound to a specific endpoint and key pair.
///
/// Built fresh per request from session credential material; construction
/// parses the endpoint and sets up the HTTP transport but never contacts
/// the network.
pub struct S3Client {
    http: reqwest::Client,
    scheme: String,
    host: String,
    access_key: String,
    secret_key: String,
    region: String,
    mode: SigningMode,
}

impl S3Client {
    pub fn new(
        credential: &StoredCredential,
        mode: SigningMode,
        region: &str,
    ) -> Result<Self, S3Error> {
        let trimmed = credential.endpoint.trim().trim_end_matches('/');
        let url = Url::parse(trimmed)
            .map_err(|_| S3Error::InvalidEndpoint(credential.endpoint.clone()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(S3Error::InvalidEndpoint(credential.endpoint.clone()));
        }
        // Path-style addressing starts at the endpoint root; endpoints with
        // their own path prefix are not supported.
        if !matches!(url.path(), "" | "/") || url.query().is_some() {
            return Err(S3Error::InvalidEndpoint(credential.endpoint.clone()));
        }
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(S3Error::InvalidEndpoint(credential.endpoint.clone())),
        };

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            scheme: url.scheme().to_string(),
            host,
            access_key: credential.access_key.clone(),
            secret_key: credential.secret_key.clone(),
            region: region.to_string(),
            mode,
        })
    }

    /// `GET /` — list all buckets visible to the identity. Also serves as
    /// the low-cost credential probe at login.
    pub async fn list_buckets(&self) -> Result<Vec<BucketSummary>, S3Error> {
        let response = self.send(Method::GET, "/", &[], Bytes::new(), None).await?;
        let response = expect_success(response).await?;
        let body = response.bytes().await?;
        xml::parse_bucket_list(&body)
    }

    /// One page of `ListObjectsV2`. The continuation token is forwarded
    /// verbatim; `max_keys: None` leaves the page size to the backend.
    pub async fn list_objects_v2(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        max_keys: Option<usize>,
        continuation_token: Option<&str>,
    ) -> Result<ListObjectsPage, S3Error> {
        let mut query: Vec<(&str, String)> = vec![("list-type", "2".to_string())];
        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            query.push(("prefix", prefix.to_string()));
        }
        if let Some(max_keys) = max_keys {
            query.push(("max-keys", max_keys.to_string()));
        }
        if let Some(token) = continuation_token {
            query.push(("continuation-token", token.to_string()));
        }

        let path = format!("/{}", bucket);
        let response = self
            .send(Method::GET, &path, &query, Bytes::new(), None)
            .await?;
        let response = expect_success(response).await?;
        let body = response.bytes().await?;
        xml::parse_list_objects(&body)
    }

    /// Fetch a whole object into memory.
    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, S3Error> {
        let path = object_path(bucket, key);
        let response = self
            .send(Method::GET, &path, &[], Bytes::new(), None)
            .await?;
        let response = expect_success(response).await?;
        Ok(response.bytes().await?)
    }

    /// Single-request object write.
    pub async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), S3Error> {
        let path = object_path(bucket, key);
        let response = self
            .send(
                Method::PUT,
                &path,
                &[],
                body,
                Some("application/octet-stream"),
            )
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    /// Delete an object. Deleting an absent key succeeds (store semantics).
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), S3Error> {
        let path = object_path(bucket, key);
        let response = self
            .send(Method::DELETE, &path, &[], Bytes::new(), None)
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        expect_success(response).await?;
        Ok(())
    }

    pub async fn create_multipart_upload(&self, bucket: &str, key: &str) -> Result<String, S3Error> {
        let path = object_path(bucket, key);
        let query = [("uploads", String::new())];
        let response = self
            .send(
                Method::POST,
                &path,
                &query,
                Bytes::new(),
                Some("application/octet-stream"),
            )
            .await?;
        let response = expect_success(response).await?;
        let body = response.bytes().await?;
        xml::parse_initiate_multipart(&body)
    }

    pub async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
    ) -> Result<CompletedPart, S3Error> {
        let path = object_path(bucket, key);
        let query = [
            ("partNumber", part_number.to_string()),
            ("uploadId", upload_id.to_string()),
        ];
        let response = self.send(Method::PUT, &path, &query, body, None).await?;
        let response = expect_success(response).await?;
        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim_matches('"').to_string())
            .ok_or_else(|| S3Error::Decode("UploadPart response missing ETag header".into()))?;
        Ok(CompletedPart { part_number, etag })
    }

    pub async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<(), S3Error> {
        let path = object_path(bucket, key);
        let query = [("uploadId", upload_id.to_string())];
        let body = Bytes::from(xml::complete_multipart_body(parts));
        let response = self
            .send(Method::POST, &path, &query, body, Some("application/xml"))
            .await?;
        let response = expect_success(response).await?;
        // Some backends report completion failures inside a 200 body.
        let body = response.bytes().await?;
        if let Some((code, message)) = xml::parse_error(&body) {
            return Err(S3Error::Status {
                status: 200,
                code,
                message,
            });
        }
        Ok(())
    }

    pub async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), S3Error> {
        let path = object_path(bucket, key);
        let query = [("uploadId", upload_id.to_string())];
        let response = self
            .send(Method::DELETE, &path, &query, Bytes::new(), None)
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    /// Build, sign, and send one request.
    ///
    /// `path` must already be percent-encoded; the query is canonicalized
    /// here so the signed form and the sent form are the same string.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<reqwest::Response, S3Error> {
        let canonical_query = canonical_query(query);
        let mut url = format!("{}://{}{}", self.scheme, self.host, path);
        if !canonical_query.is_empty() {
            url.push('?');
            url.push_str(&canonical_query);
        }

        let now = Utc::now();
        let mut request = self.http.request(method.clone(), url);

        match self.mode {
            SigningMode::Modern => {
                let payload_hash = if body.is_empty() {
                    EMPTY_PAYLOAD_SHA256.to_string()
                } else {
                    sign::sha256_hex(&body)
                };
                let canonical = CanonicalRequest {
                    method: method.as_str(),
                    host: &self.host,
                    path,
                    query: &canonical_query,
                    content_type,
                    payload_hash: &payload_hash,
                };
                for (name, value) in sign::sign_v4(
                    &canonical,
                    &self.access_key,
                    &self.secret_key,
                    &self.region,
                    now,
                ) {
                    request = request.header(name.as_str(), value.as_str());
                }
            }
            SigningMode::Legacy => {
                let date = sign::http_date(now);
                let resource = canonical_resource_v2(path, query);
                let authorization = sign::sign_v2(
                    method.as_str(),
                    content_type,
                    &date,
                    &resource,
                    &self.access_key,
                    &self.secret_key,
                );
                request = request.header("date", date).header("authorization", authorization);
            }
        }

        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        Ok(request.send().await?)
    }
}

/// Map a non-2xx response to `S3Error::Status`, decoding the backend's
/// XML error body when one is present.
async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, S3Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    let (code, message) = xml::parse_error(&body).unwrap_or_else(|| {
        (
            "UnknownError".to_string(),
            String::from_utf8_lossy(&body).trim().to_string(),
        )
    });
    Err(S3Error::Status {
        status: status.as_u16(),
        code,
        message,
    })
}

/// Path-style request path: `/bucket` or `/bucket/encoded/key`.
fn object_path(bucket: &str, key: &str) -> String {
    if key.is_empty() {
        format!("/{}", bucket)
    } else {
        format!("/{}/{}", bucket, encode_key(key))
    }
}

/// Percent-encode each key segment, preserving `/` separators.
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Sorted, percent-encoded query string — the V4 canonical form, also used
/// verbatim on the wire.
fn canonical_query(params: &[(&str, String)]) -> String {
    let mut pairs: Vec<(String, String)> = params
        .iter()
        .map(|(name, value)| {
            (
                urlencoding::encode(name).into_owned(),
                urlencoding::encode(value).into_owned(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&")
}

/// The V2 canonicalized resource: path plus signed subresources.
fn canonical_resource_v2(path: &str, query: &[(&str, String)]) -> String {
    let mut subresources: Vec<String> = query
        .iter()
        .filter(|(name, _)| V2_SUBRESOURCES.contains(name))
        .map(|(name, value)| {
            if value.is_empty() {
                name.to_string()
            } else {
                format!("{}={}", name, value)
            }
        })
        .collect();
    subresources.sort();

    if subresources.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, subresources.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(endpoint: &str) -> StoredCredential {
        StoredCredential {
            endpoint: endpoint.to_string(),
            access_key: "AKIDEXAMPLE".to_string(),
            secret_key: "secret".to_string(),
        }
    }

    #[test]
    fn construction_is_offline_and_accepts_custom_ports() {
        let client = S3Client::new(
            &credential("http://rgw.example.net:7480/"),
            SigningMode::Modern,
            "us-east-1",
        )
        .unwrap();
        assert_eq!(client.host, "rgw.example.net:7480");
        assert_eq!(client.scheme, "http");
    }

    #[test]
    fn garbage_endpoints_are_rejected() {
        for endpoint in ["", "not a url", "ftp://example.net", "http://", "http://host/prefix"] {
            let result = S3Client::new(&credential(endpoint), SigningMode::Modern, "us-east-1");
            assert!(
                matches!(result, Err(S3Error::InvalidEndpoint(_))),
                "endpoint {:?} should be rejected",
                endpoint
            );
        }
    }

    #[test]
    fn object_paths_encode_segments_but_not_separators() {
        assert_eq!(object_path("demo", ""), "/demo");
        assert_eq!(object_path("demo", "a/b.txt"), "/demo/a/b.txt");
        assert_eq!(
            object_path("demo", "reports/q1 2026.pdf"),
            "/demo/reports/q1%202026.pdf"
        );
    }

    #[test]
    fn canonical_query_sorts_and_encodes() {
        let query = [
            ("prefix", "logs/app 1/".to_string()),
            ("list-type", "2".to_string()),
            ("max-keys", "100".to_string()),
        ];
        assert_eq!(
            canonical_query(&query),
            "list-type=2&max-keys=100&prefix=logs%2Fapp%201%2F"
        );
    }

    #[test]
    fn v2_resource_includes_only_signed_subresources() {
        let query = [
            ("partNumber", "3".to_string()),
            ("uploadId", "abc".to_string()),
        ];
        assert_eq!(
            canonical_resource_v2("/demo/big.bin", &query),
            "/demo/big.bin?partNumber=3&uploadId=abc"
        );

        let initiate = [("uploads", String::new())];
        assert_eq!(
            canonical_resource_v2("/demo/big.bin", &initiate),
            "/demo/big.bin?uploads"
        );

        let plain = [("list-type", "2".to_string())];
        assert_eq!(canonical_resource_v2("/demo", &plain), "/demo");
    }
}
