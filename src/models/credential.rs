//! Credential material bound to one authenticated browser session.

use serde::{Deserialize, Serialize};

/// A validated endpoint/access-key/secret-key triple.
///
/// Never built straight from login input: the login flow probes the backend
/// first and persists the triple only on success, so a stored credential is
/// always non-empty in all three fields. Each session owns at most one.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StoredCredential {
    /// Base URL of the S3-compatible endpoint, e.g. `https://rgw.example.net:7480`.
    pub endpoint: String,

    /// Access key id presented to the backend.
    pub access_key: String,

    /// Secret key used for request signing.
    pub secret_key: String,
}
