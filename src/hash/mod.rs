//! Integrity values for chunk payloads.
//!
//! When a transfer validates content, every request carries the MD5 of its
//! payload so the service can reject bytes corrupted in transit.
//!
//! - [`ContentMd5`] - Base64 MD5 digest sent alongside a payload

mod md5;

pub use md5::ContentMd5;
