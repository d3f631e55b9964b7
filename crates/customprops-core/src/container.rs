//! # Property Container
//!
//! The lazy, polymorphic bag of properties attached to one owner.
//!
//! ## Laziness
//!
//! A container starts from a raw definition (sid -> attribute map) and keeps
//! every entry raw until it is touched. Touching a sid (`property`, `set`,
//! `load`) promotes that one entry to a typed [`Property`] resolved through
//! the injected [`PropertyPolicy`]. Untouched entries are never validated or
//! constructed, and serialize back exactly as they came in.
//!
//! ## Enumeration
//!
//! `sids()` is the union of defined sids and the policy's mandatory sids.
//! Mandatory sids are NOT inserted into the entry map: they only become
//! entries when promoted.

use crate::policy::PropertyPolicy;
use crate::primitives::{VALUE_ATTRIBUTE, child_scope};
use crate::property::Property;
use crate::types::{AttributeMap, ErrorMap, OwnerRef, PropertyError, RawDefinition, is_truthy};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

// =============================================================================
// ENTRY
// =============================================================================

/// One slot of the container: raw data or a promoted property.
#[derive(Debug)]
pub enum Entry {
    /// Untouched data from the definition.
    Raw(AttributeMap),
    /// A live property.
    Promoted(Box<Property>),
}

impl Entry {
    /// The property, if this entry has been promoted.
    #[must_use]
    pub fn as_promoted(&self) -> Option<&Property> {
        match self {
            Self::Promoted(property) => Some(property),
            Self::Raw(_) => None,
        }
    }

    fn as_promoted_mut(&mut self) -> Option<&mut Property> {
        match self {
            Self::Promoted(property) => Some(property),
            Self::Raw(_) => None,
        }
    }
}

// =============================================================================
// CONTAINER
// =============================================================================

/// A lazily promoted property set.
#[derive(Debug)]
pub struct PropertyContainer {
    policy: Arc<dyn PropertyPolicy>,
    owner: Option<OwnerRef>,
    entries: IndexMap<String, Entry>,
    load_scope: Option<String>,
}

impl PropertyContainer {
    /// Create an empty container.
    pub fn new(policy: Arc<dyn PropertyPolicy>) -> Self {
        Self {
            policy,
            owner: None,
            entries: IndexMap::new(),
            load_scope: None,
        }
    }

    /// Create a container from a raw definition; `None` means empty.
    pub fn from_definition(
        policy: Arc<dyn PropertyPolicy>,
        definition: Option<RawDefinition>,
    ) -> Self {
        let mut container = Self::new(policy);
        container.set_definition(definition);
        container
    }

    /// Attach the owner handed to every property promoted from now on.
    #[must_use]
    pub fn with_owner(mut self, owner: OwnerRef) -> Self {
        self.owner = Some(owner);
        self
    }

    /// The attached owner.
    #[must_use]
    pub fn owner(&self) -> Option<&OwnerRef> {
        self.owner.as_ref()
    }

    /// Replace all entries with `definition`, stored raw and verbatim.
    pub fn set_definition(&mut self, definition: Option<RawDefinition>) {
        self.entries = definition
            .unwrap_or_default()
            .into_iter()
            .map(|(sid, attributes)| (sid, Entry::Raw(attributes)))
            .collect();
    }

    // =========================================================================
    // PROMOTION
    // =========================================================================

    /// Get the property for `sid`, promoting it on first access.
    ///
    /// An unknown sid gets an empty raw entry first. Promotion is
    /// idempotent: later calls return the same instance.
    pub fn property(&mut self, sid: &str) -> Result<&mut Property, PropertyError> {
        let entry = self
            .entries
            .entry(sid.to_string())
            .or_insert_with(|| Entry::Raw(AttributeMap::new()));

        if let Entry::Raw(raw) = entry {
            let kind = self.policy.resolve(sid)?;
            tracing::debug!(sid, kind = kind.name(), "promoting property");
            let property = Property::build(sid, kind, raw, self.owner.clone())?;
            *entry = Entry::Promoted(Box::new(property));
        }

        entry
            .as_promoted_mut()
            .ok_or_else(|| PropertyError::InconsistentState {
                sid: sid.to_string(),
            })
    }

    /// The property for `sid` if it is already promoted. Never promotes.
    #[must_use]
    pub fn get(&self, sid: &str) -> Option<&Property> {
        self.entries.get(sid).and_then(Entry::as_promoted)
    }

    /// The raw or promoted entry for `sid`.
    #[must_use]
    pub fn entry(&self, sid: &str) -> Option<&Entry> {
        self.entries.get(sid)
    }

    /// Whether `sid` has been promoted.
    #[must_use]
    pub fn is_promoted(&self, sid: &str) -> bool {
        self.get(sid).is_some()
    }

    /// Promoted properties, in entry order.
    pub fn promoted(&self) -> impl Iterator<Item = &Property> {
        self.entries.values().filter_map(Entry::as_promoted)
    }

    fn promoted_mut(&mut self) -> impl Iterator<Item = &mut Property> {
        self.entries.values_mut().filter_map(Entry::as_promoted_mut)
    }

    // =========================================================================
    // ENUMERATION
    // =========================================================================

    /// Defined sids followed by mandatory sids not already defined.
    #[must_use]
    pub fn sids(&self) -> Vec<String> {
        let mut sids: Vec<String> = self.entries.keys().cloned().collect();
        for sid in self.policy.mandatory_sids() {
            if !sids.contains(&sid) {
                sids.push(sid);
            }
        }
        sids
    }

    /// Whether there is at least one defined or mandatory sid.
    #[must_use]
    pub fn has_any(&self) -> bool {
        !self.entries.is_empty() || !self.policy.mandatory_sids().is_empty()
    }

    // =========================================================================
    // MUTATION
    // =========================================================================

    /// Promote `sid` and assign `value`.
    ///
    /// A non-mapping value is wrapped as `{ "value": value }`. Untrusted
    /// assignment silently skips attributes that are not safe; the skipped
    /// names are returned.
    pub fn set(
        &mut self,
        sid: &str,
        value: Value,
        trusted: bool,
    ) -> Result<Vec<String>, PropertyError> {
        let input = match value {
            Value::Object(map) => map,
            other => AttributeMap::from_iter([(VALUE_ATTRIBUTE.to_string(), other)]),
        };
        Ok(self.property(sid)?.set_attributes(&input, trusted))
    }

    // =========================================================================
    // SERIALIZATION
    // =========================================================================

    /// Serialize back to the raw definition shape.
    ///
    /// Raw entries pass through untouched. Promoted entries are skipped when
    /// external or empty, otherwise flattened. Empty maps are omitted.
    ///
    /// # Errors
    ///
    /// `InconsistentState` if a property reports non-empty but flattens to
    /// no attributes.
    pub fn definition(&self) -> Result<RawDefinition, PropertyError> {
        let mut definition = RawDefinition::new();
        for (sid, entry) in &self.entries {
            let attributes = match entry {
                Entry::Raw(raw) => raw.clone(),
                Entry::Promoted(property) => {
                    if property.is_external() || property.is_empty() {
                        continue;
                    }
                    let attributes = property.attributes();
                    if attributes.is_empty() {
                        return Err(PropertyError::InconsistentState { sid: sid.clone() });
                    }
                    attributes
                }
            };
            if !attributes.is_empty() {
                definition.insert(sid.clone(), attributes);
            }
        }
        Ok(definition)
    }

    // =========================================================================
    // BULK LOAD
    // =========================================================================

    /// Scope of the last bulk load.
    #[must_use]
    pub fn load_scope(&self) -> Option<&str> {
        self.load_scope.as_deref()
    }

    /// Load form data into the properties it names.
    ///
    /// With a scope, `data[scope]` is read and each property records
    /// `scope[sid]` as its own load scope. Absent or falsy data is a no-op
    /// returning `false`.
    ///
    /// Only a single string scope is supported; nested scopes such as
    /// `Model[properties]` are not resolved.
    ///
    /// # Errors
    ///
    /// - `NotImplemented` when data is present but no scope is given,
    ///   whatever its shape. Nothing is promoted.
    /// - `InvalidData` when the scoped data is not a mapping.
    pub fn load(&mut self, data: &Value, scope: Option<&str>) -> Result<bool, PropertyError> {
        self.load_scope = scope.map(str::to_owned);
        let scope = scope.filter(|s| !s.is_empty());

        let data = match scope {
            Some(scope) => data.get(scope),
            None => Some(data),
        };
        let Some(data) = data.filter(|d| is_truthy(d)) else {
            return Ok(false);
        };
        let Some(scope) = scope else {
            return Err(PropertyError::NotImplemented(
                "bulk load without a scope".to_string(),
            ));
        };
        let Value::Object(fields) = data else {
            return Err(PropertyError::InvalidData(format!(
                "expected a mapping of sid -> data, got {data}"
            )));
        };

        for (sid, sub_data) in fields {
            let property = self.property(sid)?;
            property.set_load_scope(Some(child_scope(scope, sid)));
            property.load(sub_data, Some(""));
        }
        tracing::debug!(scope, count = fields.len(), "bulk load applied");

        Ok(true)
    }

    // =========================================================================
    // VALIDATION & SAVE
    // =========================================================================

    /// Validate every promoted property. Never short-circuits.
    pub fn validate(&mut self) -> bool {
        self.promoted_mut()
            .fold(true, |ok, property| property.validate() && ok)
    }

    /// Errors of promoted properties, keyed by sid. Unpromoted sids are
    /// never reported.
    #[must_use]
    pub fn errors(&self) -> IndexMap<String, ErrorMap> {
        self.promoted()
            .filter(|property| property.has_errors())
            .map(|property| (property.sid().to_string(), property.errors().clone()))
            .collect()
    }

    /// Save every promoted property, attempting all of them.
    ///
    /// Returns `true` only if every save succeeded.
    pub fn save_all(&mut self) -> bool {
        let mut ok = true;
        for property in self.promoted_mut() {
            if !property.save(true) {
                ok = false;
            }
        }
        ok
    }

    /// Save every promoted property or fail on the first that cannot commit.
    pub fn ensure_save(&mut self) -> Result<(), PropertyError> {
        for property in self.promoted_mut() {
            property.ensure_save()?;
        }
        Ok(())
    }

    // =========================================================================
    // REPLACEMENT BOOKKEEPING
    // =========================================================================

    /// Legacy field names this property set supersedes.
    #[must_use]
    pub fn replaced_field_names(&self) -> BTreeSet<String> {
        self.policy.replaced_field_names()
    }

    /// Whether `field_name` is superseded by this property set.
    #[must_use]
    pub fn is_replacing(&self, field_name: &str) -> bool {
        self.policy.replaced_field_names().contains(field_name)
    }
}

impl Serialize for PropertyContainer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.definition()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::GenericKind;
    use crate::policy::{FlatPolicy, TypeRegistry};
    use serde_json::json;

    fn definition(value: Value) -> RawDefinition {
        serde_json::from_value(value).expect("definition")
    }

    fn generic_registry() -> Arc<TypeRegistry> {
        Arc::new(
            TypeRegistry::new()
                .with_fallback(Arc::new(GenericKind::new()))
                .with_mandatory(["size"]),
        )
    }

    #[test]
    fn empty_definition_gives_empty_container() {
        let container = PropertyContainer::from_definition(Arc::new(FlatPolicy), None);
        assert!(!container.has_any());
        assert!(container.sids().is_empty());
        assert!(container.definition().expect("definition").is_empty());
    }

    #[test]
    fn flat_container_enumerates_but_cannot_promote() {
        let mut container = PropertyContainer::from_definition(
            Arc::new(FlatPolicy),
            Some(definition(json!({ "color": { "value": "red" } }))),
        );
        assert_eq!(container.sids(), vec!["color"]);
        assert!(matches!(
            container.property("color"),
            Err(PropertyError::NotImplemented(_))
        ));
        // Failed promotion leaves the raw entry intact.
        assert!(!container.is_promoted("color"));
        assert_eq!(
            container.definition().expect("definition"),
            definition(json!({ "color": { "value": "red" } }))
        );
    }

    #[test]
    fn promotion_is_idempotent() {
        let mut container = PropertyContainer::from_definition(
            generic_registry(),
            Some(definition(json!({ "color": { "value": "red" } }))),
        );
        container.property("color").expect("promote").set_value(json!("blue"));
        let again = container.property("color").expect("promote");
        assert_eq!(again.value(), &json!("blue"));
        assert_eq!(container.promoted().count(), 1);
    }

    #[test]
    fn promotion_attaches_owner() {
        let owner = OwnerRef::new(String::from("product-1"));
        let mut container =
            PropertyContainer::new(generic_registry()).with_owner(owner.clone());
        let property = container.property("color").expect("promote");
        assert!(property.owner().is_some_and(|o| o.ptr_eq(&owner)));
    }

    #[test]
    fn mandatory_sids_are_not_entries() {
        let container = PropertyContainer::from_definition(
            generic_registry(),
            Some(definition(json!({ "color": { "value": "red" } }))),
        );
        assert_eq!(container.sids(), vec!["color", "size"]);
        assert!(container.entry("size").is_none());
        assert!(container.has_any());
    }

    #[test]
    fn set_wraps_scalars_and_filters_unsafe() {
        let mut container = PropertyContainer::new(generic_registry());
        container.set("color", json!("red"), false).expect("set");
        assert_eq!(container.get("color").map(Property::value), Some(&json!("red")));

        let skipped = container
            .set("color", json!({ "value": "green", "bogus": 1 }), false)
            .expect("set");
        assert_eq!(skipped, vec!["bogus"]);
        assert_eq!(
            container.definition().expect("definition"),
            definition(json!({ "color": { "value": "green" } }))
        );
    }

    #[test]
    fn raw_empty_entries_are_omitted() {
        let container = PropertyContainer::from_definition(
            generic_registry(),
            Some(definition(json!({ "a": {}, "b": { "value": 1 } }))),
        );
        assert_eq!(
            container.definition().expect("definition"),
            definition(json!({ "b": { "value": 1 } }))
        );
    }

    #[test]
    fn serialize_matches_definition() {
        let mut container = PropertyContainer::from_definition(
            generic_registry(),
            Some(definition(json!({ "b": { "value": 1 } }))),
        );
        container.set("a", json!("x"), true).expect("set");
        let value = serde_json::to_value(&container).expect("serialize");
        assert_eq!(value, json!({ "b": { "value": 1 }, "a": { "value": "x" } }));
    }

    #[test]
    fn load_records_scope_even_when_nothing_loaded() {
        let mut container = PropertyContainer::new(generic_registry());
        assert!(!container.load(&json!({}), Some("properties")).expect("load"));
        assert_eq!(container.load_scope(), Some("properties"));
        assert!(!container.load(&json!({ "properties": {} }), Some("properties")).expect("load"));
        assert!(!container.load(&Value::Null, None).expect("load"));
        assert_eq!(container.load_scope(), None);
    }

    #[test]
    fn load_rejects_non_mapping_data() {
        let mut container = PropertyContainer::new(generic_registry());
        let result = container.load(&json!({ "properties": 5 }), Some("properties"));
        assert!(matches!(result, Err(PropertyError::InvalidData(_))));
    }

    #[test]
    fn validate_visits_every_promoted_property() {
        let registry = TypeRegistry::new()
            .with(
                "a",
                Arc::new(GenericKind::new().with_rule(crate::model::Rule::required("value"))),
            )
            .with(
                "b",
                Arc::new(GenericKind::new().with_rule(crate::model::Rule::required("value"))),
            );
        let mut container = PropertyContainer::new(Arc::new(registry));
        container.property("a").expect("promote");
        container.property("b").expect("promote");

        assert!(!container.validate());
        let errors = container.errors();
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn replacement_bookkeeping() {
        let container = PropertyContainer::new(Arc::new(
            TypeRegistry::new().with_replaces(["legacy_color"]),
        ));
        assert!(container.is_replacing("legacy_color"));
        assert!(!container.is_replacing("color"));
        assert!(PropertyContainer::new(Arc::new(FlatPolicy))
            .replaced_field_names()
            .is_empty());
    }
}
