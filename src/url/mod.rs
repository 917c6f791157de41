//! URL handling module
//!
//! This module decides whether a candidate link may enter the frontier and how
//! links are identified for revisit deduplication:
//! - syntactic validity checks (scheme, fragment, empty links)
//! - the narrow trailing-slash normalization
//! - the SHA-256 identity hash used as the storage and index key

mod identity;
mod normalize;

pub use identity::{identity_hash, IdentityHash};
pub use normalize::{check_link_format, normalize_link};
