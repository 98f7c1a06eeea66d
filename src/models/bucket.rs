//! Bucket metadata from the account-level listing call.

use serde::{Deserialize, Serialize};

/// A bucket visible to the authenticated credential.
///
/// Only what `ListAllMyBuckets` reports; the proxy keeps no bucket state of
/// its own.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BucketSummary {
    /// Globally unique bucket name.
    pub name: String,

    /// Creation timestamp as reported by the backend.
    pub creation_date: Option<String>,
}
