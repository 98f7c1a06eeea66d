//! src/services/storage_service.rs
//!
//! StorageService — the operations the proxy performs on behalf of an
//! authenticated session: credential validation at login, paginated
//! listing and prefix search, and object transfers. Each operation builds
//! a fresh storage client from the session's credential, issues exactly
//! one backend call chain, and maps failures into the closed error
//! taxonomy. Nothing is retried.

use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::models::bucket::BucketSummary;
use crate::models::credential::StoredCredential;
use crate::models::object::{ObjectDescriptor, ObjectPage};
use crate::s3::{S3Client, SigningMode};
use crate::services::session_store::{self, SessionStore};

/// Fixed listing page size. Bounds per-request latency and memory; not
/// user-configurable.
pub const LIST_PAGE_SIZE: usize = 100;

/// Threshold above which uploads switch to multipart, and the size of each
/// part. Matches the backend's minimum part size.
pub const UPLOAD_PART_SIZE: usize = 5 * 1024 * 1024;

/// Shared application state: session custody plus the configuration needed
/// to build per-request storage clients.
#[derive(Clone)]
pub struct StorageService {
    sessions: Arc<dyn SessionStore>,
    region: String,
    session_secret: String,
}

impl StorageService {
    pub fn new(sessions: Arc<dyn SessionStore>, region: String, session_secret: String) -> Self {
        Self {
            sessions,
            region,
            session_secret,
        }
    }

    /// Resolve a client-held token into the session's credential snapshot.
    ///
    /// Any defect — missing token, bad signature, no stored session —
    /// collapses to `Unauthenticated`.
    pub async fn credential_for_token(
        &self,
        token: Option<&str>,
    ) -> Result<(String, StoredCredential), AppError> {
        let token = token.ok_or(AppError::Unauthenticated)?;
        let session_id = session_store::verify_token(token, &self.session_secret)
            .ok_or(AppError::Unauthenticated)?;
        let credential = self
            .sessions
            .get(&session_id)
            .await
            .ok_or(AppError::Unauthenticated)?;
        Ok((session_id, credential))
    }

    /// Validate credentials and, on success, bind them to a new session.
    ///
    /// Returns the signed token the browser holds from now on. The session
    /// store is never touched when validation fails.
    pub async fn login(
        &self,
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Result<String, AppError> {
        let endpoint = endpoint.trim();
        let access_key = access_key.trim();
        let secret_key = secret_key.trim();
        if endpoint.is_empty() || access_key.is_empty() || secret_key.is_empty() {
            return Err(AppError::InvalidCredentials);
        }

        let credential = StoredCredential {
            endpoint: endpoint.to_string(),
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
        };
        self.validate_credentials(&credential).await?;

        let session_id = session_store::new_session_id();
        self.sessions.insert(&session_id, credential).await;
        Ok(session_store::mint_token(&session_id, &self.session_secret))
    }

    /// Drop the session's credential unconditionally.
    pub async fn logout(&self, session_id: &str) {
        self.sessions.remove(session_id).await;
    }

    /// Exercise the credentials with a zero-argument `ListBuckets` probe.
    ///
    /// Every failure class — unparseable endpoint, unreachable host, auth
    /// rejection — maps to the same `InvalidCredentials`; the cause is
    /// logged but deliberately not shown to the user.
    pub async fn validate_credentials(
        &self,
        credential: &StoredCredential,
    ) -> Result<(), AppError> {
        let client = S3Client::new(credential, SigningMode::Modern, &self.region).map_err(|err| {
            debug!("credential probe could not build a client: {}", err);
            AppError::InvalidCredentials
        })?;
        match client.list_buckets().await {
            Ok(_) => Ok(()),
            Err(err) => {
                debug!("credential probe rejected: {}", err);
                Err(AppError::InvalidCredentials)
            }
        }
    }

    /// Buckets visible to the session's identity, for the index view.
    pub async fn list_buckets(
        &self,
        credential: &StoredCredential,
    ) -> Result<Vec<BucketSummary>, AppError> {
        let client = self.client(credential, SigningMode::Modern)?;
        Ok(client.list_buckets().await?)
    }

    /// One page of objects under `prefix`, at most [`LIST_PAGE_SIZE`]
    /// entries. A supplied cursor is forwarded verbatim to the backend's
    /// continuation mechanism; the returned cursor is `None` on the last
    /// page. No merging across pages happens here.
    pub async fn list_objects(
        &self,
        credential: &StoredCredential,
        bucket: &str,
        prefix: &str,
        cursor: Option<&str>,
    ) -> Result<ObjectPage, AppError> {
        let client = self.client(credential, SigningMode::Modern)?;
        let page = client
            .list_objects_v2(bucket, Some(prefix), Some(LIST_PAGE_SIZE), cursor)
            .await?;
        Ok(ObjectPage {
            objects: page.objects,
            next_cursor: page.next_continuation_token,
        })
    }

    /// Prefix search: the query matches the *start* of object keys, not
    /// anywhere inside them. An empty query returns an empty result rather
    /// than falling back to a full listing, without touching the backend.
    /// Whatever single page the backend returns for the prefix is passed
    /// through as-is; search does not drain further pages.
    pub async fn search_objects(
        &self,
        credential: &StoredCredential,
        bucket: &str,
        query: &str,
    ) -> Result<Vec<ObjectDescriptor>, AppError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let client = self.client(credential, SigningMode::Modern)?;
        let page = client.list_objects_v2(bucket, Some(query), None, None).await?;
        Ok(page.objects)
    }

    /// Fetch a whole object and the file name to suggest for it.
    ///
    /// The object is buffered fully in memory before returning — acceptable
    /// for moderate sizes, and the known scalability ceiling of this design.
    pub async fn download_object(
        &self,
        credential: &StoredCredential,
        bucket: &str,
        key: &str,
    ) -> Result<(Bytes, String), AppError> {
        if bucket.is_empty() || key.is_empty() {
            return Err(AppError::InvalidRequest("bucket and key are required".into()));
        }
        let client = self.client(credential, SigningMode::Modern)?;
        let data = client.get_object(bucket, key).await?;
        Ok((data, download_file_name(key).to_string()))
    }

    /// Store an uploaded payload under `prefix + file_name`.
    ///
    /// Payloads up to [`UPLOAD_PART_SIZE`] go as a single PUT; larger ones
    /// are split into parts of that size (last part may be short) via the
    /// multipart protocol, aborting best-effort if a part fails. Uses the
    /// Legacy-signing client throughout — the backend accepts only the
    /// older signature scheme on this path.
    pub async fn upload_object(
        &self,
        credential: &StoredCredential,
        bucket: &str,
        prefix: &str,
        file_name: &str,
        data: Bytes,
    ) -> Result<String, AppError> {
        if bucket.is_empty() {
            return Err(AppError::InvalidRequest("bucket is required".into()));
        }
        let key = object_key(prefix, file_name);
        if key.is_empty() {
            return Err(AppError::InvalidRequest("file name is required".into()));
        }

        let client = self.client(credential, SigningMode::Legacy)?;

        if data.len() <= UPLOAD_PART_SIZE {
            client.put_object(bucket, &key, data).await?;
            return Ok(key);
        }

        let upload_id = client.create_multipart_upload(bucket, &key).await?;
        let mut parts = Vec::new();
        for (index, range) in part_ranges(data.len()).into_iter().enumerate() {
            let part_number = (index + 1) as u32;
            match client
                .upload_part(bucket, &key, &upload_id, part_number, data.slice(range))
                .await
            {
                Ok(part) => parts.push(part),
                Err(err) => {
                    // Abandoned parts linger at the backend until aborted.
                    if let Err(abort_err) =
                        client.abort_multipart_upload(bucket, &key, &upload_id).await
                    {
                        warn!(
                            "failed to abort multipart upload {}: {}",
                            upload_id, abort_err
                        );
                    }
                    return Err(err.into());
                }
            }
        }
        client
            .complete_multipart_upload(bucket, &key, &upload_id, &parts)
            .await?;
        Ok(key)
    }

    /// Delete one object. Parameters are checked before any backend
    /// contact; deleting an absent key succeeds (store semantics).
    pub async fn delete_object(
        &self,
        credential: &StoredCredential,
        bucket: &str,
        key: &str,
    ) -> Result<(), AppError> {
        if bucket.is_empty() {
            return Err(AppError::InvalidRequest("bucket is required".into()));
        }
        if key.is_empty() {
            return Err(AppError::InvalidRequest("key is required".into()));
        }
        let client = self.client(credential, SigningMode::Modern)?;
        client.delete_object(bucket, key).await?;
        Ok(())
    }

    fn client(
        &self,
        credential: &StoredCredential,
        mode: SigningMode,
    ) -> Result<S3Client, AppError> {
        Ok(S3Client::new(credential, mode, &self.region)?)
    }
}

/// Derived object key: destination prefix concatenated with the file name.
///
/// No separator is inserted and no collision check is made; last write wins,
/// matching the backend's native overwrite semantics.
pub fn object_key(prefix: &str, file_name: &str) -> String {
    format!("{}{}", prefix, file_name)
}

/// Suggested download file name: the final `/`-separated segment of the key
/// (the whole key when it contains no `/`).
pub fn download_file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

fn part_ranges(total: usize) -> Vec<std::ops::Range<usize>> {
    let mut ranges = Vec::with_capacity(total.div_ceil(UPLOAD_PART_SIZE));
    let mut start = 0;
    while start < total {
        let end = usize::min(start + UPLOAD_PART_SIZE, total);
        ranges.push(start..end);
        start = end;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::session_store::{InMemorySessionStore, mint_token};

    const MIB: usize = 1024 * 1024;

    fn service() -> StorageService {
        StorageService::new(
            Arc::new(InMemorySessionStore::new()),
            "us-east-1".to_string(),
            "test-secret".to_string(),
        )
    }

    fn bad_credential() -> StoredCredential {
        // Unparseable endpoint: any attempt to build a client fails, so a
        // passing call proves the backend path was never entered.
        StoredCredential {
            endpoint: "not a url".into(),
            access_key: "AKIDEXAMPLE".into(),
            secret_key: "secret".into(),
        }
    }

    #[test]
    fn object_key_is_plain_concatenation() {
        assert_eq!(object_key("logs/", "a.txt"), "logs/a.txt");
        assert_eq!(object_key("", "a.txt"), "a.txt");
        // No separator is inserted between prefix and name.
        assert_eq!(object_key("logs", "a.txt"), "logsa.txt");
    }

    #[test]
    fn download_name_is_last_path_segment() {
        assert_eq!(download_file_name("logs/2026/app.log"), "app.log");
        assert_eq!(download_file_name("plain.txt"), "plain.txt");
    }

    #[test]
    fn part_ranges_split_at_part_size() {
        assert!(part_ranges(0).is_empty());
        assert_eq!(part_ranges(5 * MIB), vec![0..5 * MIB]);
        assert_eq!(
            part_ranges(5 * MIB + 1),
            vec![0..5 * MIB, 5 * MIB..5 * MIB + 1]
        );
        assert_eq!(
            part_ranges(12 * MIB),
            vec![0..5 * MIB, 5 * MIB..10 * MIB, 10 * MIB..12 * MIB]
        );
    }

    #[tokio::test]
    async fn empty_search_short_circuits_before_any_backend_work() {
        let service = service();
        let result = service
            .search_objects(&bad_credential(), "demo", "")
            .await
            .unwrap();
        assert!(result.is_empty());

        // A non-empty query against the same credential does reach the
        // client-construction path and fails.
        assert!(
            service
                .search_objects(&bad_credential(), "demo", "logs/")
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn failed_login_never_creates_a_session() {
        let sessions = Arc::new(InMemorySessionStore::new());
        let service = StorageService::new(
            sessions.clone(),
            "us-east-1".to_string(),
            "test-secret".to_string(),
        );

        let err = service.login("not a url", "ak", "sk").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));

        let err = service.login("", "", "").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn delete_validates_parameters_before_contacting_the_backend() {
        let service = service();
        let err = service
            .delete_object(&bad_credential(), "demo", "")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));

        let err = service
            .delete_object(&bad_credential(), "", "a.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn token_resolution_requires_a_live_session() {
        let sessions = Arc::new(InMemorySessionStore::new());
        let service = StorageService::new(
            sessions.clone(),
            "us-east-1".to_string(),
            "test-secret".to_string(),
        );

        assert!(matches!(
            service.credential_for_token(None).await,
            Err(AppError::Unauthenticated)
        ));

        // Well-signed token, but nothing stored under the id.
        let orphan = mint_token("gone", "test-secret");
        assert!(matches!(
            service.credential_for_token(Some(&orphan)).await,
            Err(AppError::Unauthenticated)
        ));

        // Live session resolves to its credential snapshot.
        let credential = StoredCredential {
            endpoint: "http://rgw.example.net:7480".into(),
            access_key: "AKIDEXAMPLE".into(),
            secret_key: "secret".into(),
        };
        sessions.insert("live", credential).await;
        let token = mint_token("live", "test-secret");
        let (session_id, stored) = service.credential_for_token(Some(&token)).await.unwrap();
        assert_eq!(session_id, "live");
        assert_eq!(stored.access_key, "AKIDEXAMPLE");
    }
}
