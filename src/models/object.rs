//! Object metadata passed through from backend listing calls.

use serde::{Deserialize, Serialize};

/// A single object entry from a bucket listing.
///
/// Field values come verbatim from the backend's `ListObjectsV2` response;
/// the proxy does not reinterpret timestamps or checksums. JSON field names
/// follow the backend's own spelling so the browser sees the same shape the
/// store produced.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ObjectDescriptor {
    /// Object key (path-like identifier within the bucket).
    #[serde(rename = "Key")]
    pub key: String,

    /// Size in bytes.
    #[serde(rename = "Size")]
    pub size: i64,

    /// Last-modified timestamp as reported by the backend.
    #[serde(rename = "LastModified")]
    pub last_modified: Option<String>,

    /// ETag/checksum, surrounding quotes stripped.
    #[serde(rename = "ETag")]
    pub etag: Option<String>,

    /// Storage class (e.g. STANDARD) when the backend reports one.
    #[serde(rename = "StorageClass")]
    pub storage_class: Option<String>,
}

/// One page of a listing plus the cursor for the next page.
///
/// `next_cursor` is the backend's continuation token, round-tripped verbatim;
/// its absence signals end-of-listing.
#[derive(Serialize, Debug)]
pub struct ObjectPage {
    pub objects: Vec<ObjectDescriptor>,
    pub next_cursor: Option<String>,
}
