//! Hand-rolled client for S3-compatible backends.
//!
//! Talks the S3 REST dialect over `reqwest` with path-style addressing and
//! two request-signing schemes. Ceph-RGW class backends accept only the
//! older Signature V2 scheme for multipart/streamed uploads, so the client
//! is built in one of two modes:
//! - [`SigningMode::Modern`] (Signature V4) for list/get/delete and the
//!   login probe,
//! - [`SigningMode::Legacy`] (Signature V2) for everything on the upload
//!   path.
//!
//! Constructing a client never touches the network; failures surface at
//! first use.

pub mod client;
pub mod sign;
pub mod xml;

pub use client::{CompletedPart, S3Client, S3Error, SigningMode};
pub use xml::ListObjectsPage;
