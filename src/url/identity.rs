use crate::url::normalize_link;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Content-identity hash of a normalized URL
///
/// Hex-encoded SHA-256 digest. Used as the page store key and as the
/// search-index document ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityHash(String);

impl IdentityHash {
    /// Wraps an already computed hex digest (e.g. one read back from storage)
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the identity hash of a link
///
/// The link is normalized first, so `https://a.test` and `https://a.test/`
/// share an identity. Each call runs its own digest; there is no hashing
/// state shared between callers.
///
/// # Examples
///
/// ```
/// use loopcrawl::url::identity_hash;
///
/// assert_eq!(identity_hash("https://a.test/"), identity_hash("https://a.test"));
/// assert_eq!(identity_hash("https://a.test").as_str().len(), 64);
/// ```
pub fn identity_hash(link: &str) -> IdentityHash {
    let digest = Sha256::digest(normalize_link(link).as_bytes());
    IdentityHash(hex::encode(digest))
}
