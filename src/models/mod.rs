//! Core data models for the S3 browsing proxy.
//!
//! These entities describe what the proxy passes between the browser and the
//! storage backend: validated credential material and the object/bucket
//! metadata returned by listing calls. They serialize naturally as JSON via
//! `serde`.

pub mod bucket;
pub mod credential;
pub mod object;
