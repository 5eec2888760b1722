//! MD5-based content validation.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use md5::{Digest, Md5};

/// The base64-encoded MD5 digest of a payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentMd5(String);

impl ContentMd5 {
    /// Hashes `data` in one shot.
    pub fn compute(data: &[u8]) -> Self {
        let digest = Md5::digest(data);
        Self(STANDARD.encode(digest))
    }

    /// Returns the digest in its base64 header form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the raw 16-byte digest.
    pub fn to_bytes(&self) -> Option<[u8; 16]> {
        let raw = STANDARD.decode(&self.0).ok()?;
        raw.try_into().ok()
    }
}

impl AsRef<str> for ContentMd5 {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentMd5 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
