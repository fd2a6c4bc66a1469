//! Stable identity for elements of unordered collections.
//!
//! - [`serialize_for_hash`] — the provider's canonical element serialization
//! - [`hash_string`] — CRC-32 (IEEE) string hash used for default identities
//! - [`SetIdentityResolver`] — per-set identities, canonical order and
//!   prior/proposed matching ([`SetMatching`])
//!
//! Identity is independent of the order elements arrive in. Two different
//! elements can share a hash; such collisions are tie-broken by position,
//! which keeps output deterministic but can hide a change inside the bucket.

mod resolver;
mod serialize;

pub use resolver::{ElementIdentity, SetIdentityResolver, SetMatching};
pub use serialize::{format_float, serialize_block, serialize_for_hash, serialize_value};

/// Hashes a string to a non-negative integer (CRC-32, IEEE polynomial).
#[must_use]
pub fn hash_string(s: &str) -> i64 {
    i64::from(crc32fast::hash(s.as_bytes()))
}
