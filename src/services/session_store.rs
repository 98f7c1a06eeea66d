//! Server-side custody of validated storage credentials.
//!
//! One session owns at most one credential triple. The triple is written
//! wholesale at login and removed wholesale at logout — there is no partial
//! mutation, so concurrent readers always see a consistent snapshot.
//!
//! The browser never holds the credential; it holds an opaque signed token
//! (`"<session-id>.<hmac-sha256-hex>"`) referencing the entry here. The
//! trait is the seam for swapping the in-memory map for a distributed
//! cache-backed store.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::credential::StoredCredential;

type HmacSha256 = Hmac<Sha256>;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Bind a validated credential to a session. Call only after the
    /// credential has passed the login probe.
    async fn insert(&self, session_id: &str, credential: StoredCredential);

    /// Snapshot of the credential bound to this session, if any.
    async fn get(&self, session_id: &str) -> Option<StoredCredential>;

    /// Drop the session unconditionally (logout).
    async fn remove(&self, session_id: &str);
}

/// Process-local session store. Sessions live as long as the process; a
/// TTL-bearing distributed implementation would plug in behind the same
/// trait.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, StoredCredential>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session_id: &str, credential: StoredCredential) {
        self.sessions
            .write()
            .await
            .insert(session_id.to_string(), credential);
    }

    async fn get(&self, session_id: &str) -> Option<StoredCredential> {
        self.sessions.read().await.get(session_id).cloned()
    }

    async fn remove(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }
}

/// Fresh random session id.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Produce the client-held token for a session id.
pub fn mint_token(session_id: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(session_id.as_bytes());
    format!(
        "{}.{}",
        session_id,
        hex::encode(mac.finalize().into_bytes())
    )
}

/// Verify a client-held token and recover the session id.
///
/// Anything unparseable, truncated, or with a bad signature yields `None` —
/// callers treat that the same as no session at all.
pub fn verify_token(token: &str, secret: &str) -> Option<String> {
    let (session_id, signature_hex) = token.rsplit_once('.')?;
    if session_id.is_empty() {
        return None;
    }
    let signature = hex::decode(signature_hex).ok()?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(session_id.as_bytes());
    mac.verify_slice(&signature).ok()?;
    Some(session_id.to_string())
}
