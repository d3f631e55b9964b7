//! # Behaviour Tier Tests (B0-B3)
//!
//! If ANY tier fails, the container is INVALID.
//!
//! ## Tiers
//! - B0: Lazy Round-Trip
//! - B1: Enumeration
//! - B2: Promotion & Serialization
//! - B3: Bulk Load & Save Aggregation

use customprops_core::{
    AttributeMap, ExternalKind, FlatPolicy, GenericKind, MemoryStore, Property, PropertyContainer,
    PropertyError, PropertyKind, PropertyStore, RawDefinition, TypeRegistry,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn definition(value: Value) -> RawDefinition {
    serde_json::from_value(value).expect("definition")
}

fn generic_container(def: Option<RawDefinition>) -> PropertyContainer {
    let registry = TypeRegistry::new().with_fallback(Arc::new(GenericKind::new()));
    PropertyContainer::from_definition(Arc::new(registry), def)
}

/// A kind that counts save attempts and succeeds or fails on demand.
#[derive(Debug)]
struct RecordingKind {
    succeed: bool,
    attempts: Arc<AtomicUsize>,
}

impl PropertyKind for RecordingKind {
    fn name(&self) -> &str {
        "recording"
    }

    fn save_internal(&self, _property: &Property) -> Result<bool, PropertyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Ok(self.succeed)
    }
}

/// A kind whose persistence hook errors out.
#[derive(Debug)]
struct BrokenHookKind;

impl PropertyKind for BrokenHookKind {
    fn name(&self) -> &str {
        "broken-hook"
    }

    fn save_internal(&self, _property: &Property) -> Result<bool, PropertyError> {
        Err(PropertyError::Storage("backend offline".to_string()))
    }
}

/// A kind whose emptiness policy disagrees with its attributes.
#[derive(Debug)]
struct NeverEmptyKind;

impl PropertyKind for NeverEmptyKind {
    fn name(&self) -> &str {
        "never-empty"
    }

    fn is_empty(&self, _property: &Property) -> bool {
        false
    }
}

// =============================================================================
// TIER B0: LAZY ROUND-TRIP
// =============================================================================

mod b0_lazy_round_trip {
    use super::*;

    /// B0.1: Without promotion, serialize(load(D)) == D.
    #[test]
    fn untouched_definition_round_trips() {
        let def = definition(json!({
            "color": { "value": "red" },
            "size": { "value": 42, "unit": "cm", "extra": [1, 2] },
            "flags": { "value": false, "note": "kept verbatim" }
        }));
        let container = generic_container(Some(def.clone()));
        assert_eq!(container.definition().expect("definition"), def);
    }

    /// B0.2: Raw passthrough keeps insertion order byte-for-byte.
    #[test]
    fn untouched_definition_is_byte_identical() {
        let text = r#"{"z":{"value":1},"a":{"b":2,"value":"x"}}"#;
        let def: RawDefinition = serde_json::from_str(text).expect("parse");
        let container = generic_container(Some(def));
        let out = serde_json::to_string(&container.definition().expect("definition"))
            .expect("serialize");
        assert_eq!(out, text);
    }

    /// B0.3: Flat containers round-trip without any type mapping.
    #[test]
    fn flat_container_round_trips() {
        let def = definition(json!({ "color": { "value": "red" } }));
        let container = PropertyContainer::from_definition(Arc::new(FlatPolicy), Some(def.clone()));
        assert_eq!(container.definition().expect("definition"), def);
    }

    /// B0.4: Promoting without changes yields the same entry.
    #[test]
    fn promoting_untouched_entry_is_a_no_op() {
        let def = definition(json!({ "color": { "value": "red" }, "size": { "value": 3 } }));
        let mut container = generic_container(Some(def.clone()));
        container.property("color").expect("promote");
        assert_eq!(container.definition().expect("definition"), def);
    }

    /// B0.5: Undeclared raw keys survive promotion verbatim.
    #[test]
    fn promotion_keeps_undeclared_keys() {
        let text = r#"{"color":{"value":"red","note":"keep me"}}"#;
        let def: RawDefinition = serde_json::from_str(text).expect("parse");
        let mut container = generic_container(Some(def));
        container.property("color").expect("promote");
        assert!(container.is_promoted("color"));

        let out = serde_json::to_string(&container.definition().expect("definition"))
            .expect("serialize");
        assert_eq!(out, text);
    }

    /// B0.6: Assigning a declared attribute leaves undeclared keys in place.
    #[test]
    fn mutation_keeps_undeclared_keys() {
        let def = definition(json!({ "color": { "value": "red", "note": "keep me" } }));
        let mut container = generic_container(Some(def));
        container.set("color", json!("blue"), false).expect("set");

        assert_eq!(
            container.definition().expect("definition"),
            definition(json!({ "color": { "value": "blue", "note": "keep me" } }))
        );
    }
}

// =============================================================================
// TIER B1: ENUMERATION
// =============================================================================

mod b1_enumeration {
    use super::*;

    /// B1.1: sids() is defined ∪ mandatory, defined first, no duplicates.
    #[test]
    fn sids_are_union_without_duplicates() {
        let registry = TypeRegistry::new().with_mandatory(["size", "color", "weight"]);
        let container = PropertyContainer::from_definition(
            Arc::new(registry),
            Some(definition(json!({ "color": { "value": "red" }, "material": { "value": "oak" } }))),
        );
        assert_eq!(container.sids(), vec!["color", "material", "size", "weight"]);
    }

    /// B1.2: has_any() is true with only mandatory sids.
    #[test]
    fn has_any_counts_mandatory() {
        let registry = TypeRegistry::new().with_mandatory(["size"]);
        let container = PropertyContainer::new(Arc::new(registry));
        assert!(container.has_any());
        assert!(!PropertyContainer::new(Arc::new(FlatPolicy)).has_any());
    }

    /// B1.3: Mandatory sids do not leak into the definition.
    #[test]
    fn mandatory_sids_are_not_serialized() {
        let registry = TypeRegistry::new()
            .with_fallback(Arc::new(GenericKind::new()))
            .with_mandatory(["size"]);
        let mut container = PropertyContainer::new(Arc::new(registry));
        container.property("size").expect("promote");
        assert!(container.definition().expect("definition").is_empty());
    }
}

// =============================================================================
// TIER B2: PROMOTION & SERIALIZATION
// =============================================================================

mod b2_promotion {
    use super::*;

    /// B2.1: Promoting an unknown sid yields an empty, unserialized property.
    #[test]
    fn undefined_sid_promotes_to_empty() {
        let mut container = generic_container(None);
        let property = container.property("color").expect("promote");
        assert!(property.is_empty());
        assert!(container.definition().expect("definition").is_empty());
        assert_eq!(container.sids(), vec!["color"]);
    }

    /// B2.2: Setting value then serializing includes it under "value".
    #[test]
    fn set_value_is_serialized() {
        let mut container = generic_container(Some(definition(json!({ "size": { "value": 1 } }))));
        container.set("color", json!("red"), false).expect("set");
        let def = container.definition().expect("definition");
        assert_eq!(def.get("color").and_then(|a| a.get("value")), Some(&json!("red")));
        assert_eq!(def.get("size").and_then(|a| a.get("value")), Some(&json!(1)));
    }

    /// B2.3: Clearing a promoted value drops the entry from the output.
    #[test]
    fn cleared_value_is_dropped() {
        let mut container = generic_container(Some(definition(json!({ "color": { "value": "red" } }))));
        container.set("color", json!(""), false).expect("set");
        assert!(container.definition().expect("definition").is_empty());
        // Still present in memory.
        assert!(container.is_promoted("color"));
    }

    /// B2.4: External properties never serialize, even with a value.
    #[test]
    fn external_property_is_never_serialized() {
        let store = Arc::new(MemoryStore::new());
        let registry = TypeRegistry::new().with(
            "stock",
            Arc::new(ExternalKind::new(Arc::new(GenericKind::new()), store.clone())),
        );
        let mut container = PropertyContainer::new(Arc::new(registry));
        container.set("stock", json!(17), false).expect("set");
        assert!(!container.property("stock").expect("promote").is_empty());
        assert!(container.definition().expect("definition").is_empty());

        assert!(container.save_all());
        let stored = store.get("stock").expect("get").unwrap_or_default();
        assert_eq!(stored.get("value"), Some(&json!(17)));
    }

    /// B2.5: Non-empty property with no attributes is a fatal inconsistency.
    #[test]
    fn inconsistent_emptiness_fails_loudly() {
        let registry = TypeRegistry::new().with("broken", Arc::new(NeverEmptyKind));
        let mut container = PropertyContainer::new(Arc::new(registry));
        container.property("broken").expect("promote");

        let err = container.definition().expect_err("must fail");
        assert!(matches!(err, PropertyError::InconsistentState { ref sid } if sid == "broken"));
        assert!(serde_json::to_string(&container).is_err());
    }

    /// B2.6: Unresolvable sids fail with NotImplemented.
    #[test]
    fn unresolvable_sid_is_not_implemented() {
        let mut container = PropertyContainer::new(Arc::new(TypeRegistry::new()));
        assert!(matches!(
            container.property("color"),
            Err(PropertyError::NotImplemented(_))
        ));
    }
}

// =============================================================================
// TIER B3: BULK LOAD & SAVE AGGREGATION
// =============================================================================

mod b3_load_and_save {
    use super::*;

    /// B3.1: Scoped load promotes, assigns and records the child scope.
    #[test]
    fn scoped_load_sets_value_and_child_scope() {
        let mut container = generic_container(None);
        let data = json!({ "properties": { "color": { "value": "red" } } });

        assert!(container.load(&data, Some("properties")).expect("load"));
        assert_eq!(container.load_scope(), Some("properties"));

        let property = container.get("color").expect("promoted");
        assert_eq!(property.value(), &json!("red"));
        assert_eq!(property.load_scope(), Some("properties[color]"));
    }

    /// B3.2: Unscoped load of non-empty data is not implemented.
    #[test]
    fn unscoped_load_is_not_implemented() {
        let mut container = generic_container(None);
        let result = container.load(&json!({ "color": { "value": "red" } }), None);
        assert!(matches!(result, Err(PropertyError::NotImplemented(_))));
        assert!(!container.is_promoted("color"));

        // The missing scope is reported before the shape of the data.
        let result = container.load(&json!("abc"), None);
        assert!(matches!(result, Err(PropertyError::NotImplemented(_))));
        let result = container.load(&json!({ "properties": "abc" }), Some("properties"));
        assert!(matches!(result, Err(PropertyError::InvalidData(_))));

        // Absent data stays a no-op even without a scope.
        assert!(!container.load(&json!({}), None).expect("load"));
    }

    /// B3.3: Missing scope key is a no-op, not an error.
    #[test]
    fn missing_scope_is_a_no_op() {
        let mut container = generic_container(None);
        assert!(!container.load(&json!({ "other": {} }), Some("properties")).expect("load"));
        assert!(container.sids().is_empty());
    }

    /// B3.4: save_all attempts every property and fails if any fails.
    #[test]
    fn save_all_does_not_short_circuit() {
        let failing = Arc::new(AtomicUsize::new(0));
        let passing = Arc::new(AtomicUsize::new(0));
        let registry = TypeRegistry::new()
            .with(
                "first",
                Arc::new(RecordingKind { succeed: false, attempts: failing.clone() }),
            )
            .with(
                "second",
                Arc::new(RecordingKind { succeed: true, attempts: passing.clone() }),
            );
        let mut container = PropertyContainer::new(Arc::new(registry));
        container.property("first").expect("promote");
        container.property("second").expect("promote");

        assert!(!container.save_all());
        assert_eq!(failing.load(Ordering::SeqCst), 1);
        assert_eq!(passing.load(Ordering::SeqCst), 1);
    }

    /// B3.5: save_all is true when every property saves.
    #[test]
    fn save_all_succeeds_when_all_succeed() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let kind = Arc::new(RecordingKind { succeed: true, attempts: attempts.clone() });
        let registry = TypeRegistry::new().with("a", kind.clone()).with("b", kind);
        let mut container = PropertyContainer::from_definition(
            Arc::new(registry),
            Some(definition(json!({ "a": { "value": 1 }, "b": { "value": 2 }, "c": { "value": 3 } }))),
        );
        container.property("a").expect("promote");
        container.property("b").expect("promote");

        assert!(container.save_all());
        // "c" was never promoted, so it was never saved.
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    /// B3.6: ensure_save aborts on the first property that cannot commit.
    #[test]
    fn ensure_save_aborts() {
        let failing = Arc::new(AtomicUsize::new(0));
        let later = Arc::new(AtomicUsize::new(0));
        let registry = TypeRegistry::new()
            .with(
                "first",
                Arc::new(RecordingKind { succeed: false, attempts: failing.clone() }),
            )
            .with(
                "second",
                Arc::new(RecordingKind { succeed: true, attempts: later.clone() }),
            );
        let mut container = PropertyContainer::new(Arc::new(registry));
        container.property("first").expect("promote");
        container.property("second").expect("promote");

        let err = container.ensure_save().expect_err("must abort");
        assert!(matches!(err, PropertyError::SaveFailed { ref sid, .. } if sid == "first"));
        assert_eq!(failing.load(Ordering::SeqCst), 1);
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    /// B3.6b: A hook error is a failed save, and ensure_save propagates it.
    #[test]
    fn hook_error_fails_save() {
        let registry = TypeRegistry::new().with("color", Arc::new(BrokenHookKind));
        let mut container = PropertyContainer::new(Arc::new(registry));

        assert!(!container.property("color").expect("promote").save(true));
        assert!(!container.save_all());
        assert!(matches!(
            container.ensure_save(),
            Err(PropertyError::Storage(ref message)) if message == "backend offline"
        ));
    }

    /// B3.7: errors() reports only promoted properties, keyed by sid.
    #[test]
    fn errors_only_cover_promoted() {
        let kind = Arc::new(
            GenericKind::new().with_rule(customprops_core::Rule::required("value")),
        );
        let registry = TypeRegistry::new().with_fallback(kind);
        let mut container = PropertyContainer::from_definition(
            Arc::new(registry),
            Some(definition(json!({ "untouched": {} }))),
        );
        container.property("color").expect("promote");

        assert!(!container.save_all());
        let errors = container.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.get("color").and_then(|e| e.get("value")).map(Vec::len),
            Some(1)
        );
    }

    /// B3.8: Loaded form data cannot set unsafe attributes.
    #[test]
    fn load_ignores_unsafe_attributes() {
        let registry = TypeRegistry::new().with(
            "width",
            Arc::new(customprops_core::CompositeKind::new(["unit"]).with_internal(["source"])),
        );
        let mut container = PropertyContainer::new(Arc::new(registry));
        let data = json!({ "p": { "width": { "value": 3, "unit": "cm", "source": "spoofed" } } });
        container.load(&data, Some("p")).expect("load");

        let def = container.definition().expect("definition");
        let mut expected = AttributeMap::new();
        expected.insert("value".to_string(), json!(3));
        expected.insert("unit".to_string(), json!("cm"));
        assert_eq!(def.get("width"), Some(&expected));
    }
}
