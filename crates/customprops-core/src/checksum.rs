//! # Definition Checksums
//!
//! Deterministic fingerprints of a serialized definition, used to detect
//! whether a save actually changed anything.
//!
//! Both functions hash the canonical JSON form: object keys sorted at every
//! depth, no whitespace. Two definitions that differ only in key order
//! therefore hash the same.

use crate::primitives::{FNV_OFFSET_BASIS, FNV_PRIME};
use crate::types::{PropertyError, RawDefinition};
use serde_json::Value;

/// Rebuild `value` with object keys sorted recursively.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            Value::Object(
                keys.into_iter()
                    .filter_map(|key| map.get(key).map(|v| (key.clone(), canonicalize(v))))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Canonical JSON text of a definition.
pub fn canonical_json(definition: &RawDefinition) -> Result<String, PropertyError> {
    let value =
        serde_json::to_value(definition).map_err(|e| PropertyError::Serialization(e.to_string()))?;
    serde_json::to_string(&canonicalize(&value))
        .map_err(|e| PropertyError::Serialization(e.to_string()))
}

/// Compute a deterministic 64-bit checksum of a definition.
///
/// FNV-1a over the canonical JSON. This is **NOT** a cryptographic hash;
/// use `definition_crypto_hash` when tampering matters.
pub fn definition_checksum(definition: &RawDefinition) -> Result<u64, PropertyError> {
    let text = canonical_json(definition)?;
    Ok(text.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    }))
}

/// Compute a BLAKE3 hash of the canonical definition as a hex string.
///
/// # Requires
///
/// This function is only available with the `crypto-hash` feature enabled.
#[cfg(feature = "crypto-hash")]
pub fn definition_crypto_hash(definition: &RawDefinition) -> Result<String, PropertyError> {
    let text = canonical_json(definition)?;
    Ok(blake3::hash(text.as_bytes()).to_hex().to_string())
}
