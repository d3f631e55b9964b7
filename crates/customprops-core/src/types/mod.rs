//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the property container:
//! - Raw wire shapes (`AttributeMap`, `RawDefinition`)
//! - Validation output (`ErrorMap`)
//! - The opaque owner handle (`OwnerRef`)
//! - Error types (`PropertyError`)
//! - Host truthiness (`is_truthy`)
//!
//! ## Ordering Guarantees
//!
//! All maps in this module preserve insertion order so that a definition
//! serialized twice from the same container is byte-identical.

use indexmap::IndexMap;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// RAW SHAPES
// =============================================================================

/// Attribute name -> arbitrary JSON value, in insertion order.
pub type AttributeMap = serde_json::Map<String, Value>;

/// The sole storage format: sid -> attribute map.
pub type RawDefinition = IndexMap<String, AttributeMap>;

/// Attribute name -> validation messages for that attribute.
pub type ErrorMap = IndexMap<String, Vec<String>>;

// =============================================================================
// OWNER
// =============================================================================

/// Opaque handle to the domain object that owns a property set.
///
/// The container and every promoted property carry a clone of the same
/// handle. Nothing in this crate calls into the owner; property kinds that
/// need it downcast to the concrete type they expect.
#[derive(Clone)]
pub struct OwnerRef(Arc<dyn Any + Send + Sync>);

impl OwnerRef {
    /// Wrap an owned value.
    pub fn new<T: Any + Send + Sync>(owner: T) -> Self {
        Self(Arc::new(owner))
    }

    /// Borrow the owner as `T`, if that is what it is.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Check whether two handles point at the same owner.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnerRef").finish_non_exhaustive()
    }
}

// =============================================================================
// TRUTHINESS
// =============================================================================

/// Host-language truthiness of a JSON value.
///
/// Falsy values: `null`, `false`, `0`, `0.0`, `""`, `"0"`, `[]`, `{}`.
/// Everything else is truthy. Emptiness checks and bulk-load presence
/// checks both go through this function.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while working with a property set.
///
/// - `NotImplemented` and `InconsistentState` are programming errors and
///   abort the operation that hit them.
/// - Validation failures are NOT errors: they are reported through
///   `Property::errors` and a `false` save result.
#[derive(Debug, Error)]
pub enum PropertyError {
    /// An abstract capability was invoked without a concrete override.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// A property reports itself non-empty but flattens to no attributes.
    #[error("Inconsistent state: property '{sid}' is not empty but has no attributes")]
    InconsistentState { sid: String },

    /// A failure-intolerant save could not commit the property.
    #[error("Property '{sid}' could not be saved: {errors:?}")]
    SaveFailed { sid: String, errors: ErrorMap },

    /// Bulk-load input is present but has the wrong shape.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A persistence hook failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Encoding or decoding of stored attributes failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn falsy_values() {
        for value in [
            json!(null),
            json!(false),
            json!(0),
            json!(0.0),
            json!(""),
            json!("0"),
            json!([]),
            json!({}),
        ] {
            assert!(!is_truthy(&value), "{value} should be falsy");
        }
    }

    #[test]
    fn truthy_values() {
        for value in [
            json!(true),
            json!(-1),
            json!(0.5),
            json!("red"),
            json!("00"),
            json!([0]),
            json!({ "a": null }),
        ] {
            assert!(is_truthy(&value), "{value} should be truthy");
        }
    }

    #[test]
    fn owner_downcast() {
        let owner = OwnerRef::new(String::from("product-7"));
        assert_eq!(
            owner.downcast_ref::<String>().map(String::as_str),
            Some("product-7")
        );
        assert!(owner.downcast_ref::<u64>().is_none());
    }

    #[test]
    fn owner_clones_share_identity() {
        let owner = OwnerRef::new(7u32);
        let clone = owner.clone();
        assert!(owner.ptr_eq(&clone));
        assert!(!owner.ptr_eq(&OwnerRef::new(7u32)));
    }
}
