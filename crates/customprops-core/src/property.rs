//! # Property
//!
//! A single named, validated value holder.
//!
//! A `Property` is only ever created by promotion inside a
//! [`PropertyContainer`](crate::PropertyContainer). Its shape comes from a
//! [`PropertyKind`]: the base schema `[value]` plus whatever the kind adds,
//! and the kind also decides emptiness, externality and how (or whether)
//! the property persists itself.

use crate::model::{
    AttributeDescriptor, AttributeModel, Rule, base_attributes, base_rules, merge_rules,
};
use crate::primitives::{VALUE_ATTRIBUTE, form_name_for};
use crate::types::{AttributeMap, ErrorMap, OwnerRef, PropertyError, is_truthy};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// PROPERTY KIND
// =============================================================================

/// The polymorphic part of a property.
///
/// Implementors describe a property type: extra attributes and rules,
/// emptiness and externality policy, and the persistence hook. Kinds are
/// shared (`Arc`) between every property they produce.
pub trait PropertyKind: fmt::Debug + Send + Sync {
    /// Stable kind name. Used as the `value` label when `label` is `None`.
    fn name(&self) -> &str;

    /// Human label for the `value` attribute.
    fn label(&self) -> Option<&str> {
        None
    }

    /// Attributes declared on top of the base `[value]` schema.
    fn attributes(&self) -> Vec<AttributeDescriptor> {
        Vec::new()
    }

    /// Rules merged over the base `value/safe` rule.
    fn rules(&self) -> Vec<Rule> {
        Vec::new()
    }

    /// Whether the property carries nothing worth serializing.
    ///
    /// The default only holds for the minimal schema: it is `true` when no
    /// extra attributes are declared and `value` is falsy. Kinds with a
    /// richer schema must override it.
    fn is_empty(&self, property: &Property) -> bool {
        property.has_base_schema() && !is_truthy(property.value())
    }

    /// External properties are persisted elsewhere and never appear in a
    /// serialized definition.
    fn is_external(&self) -> bool {
        false
    }

    /// Produce the initial attributes for a property being promoted.
    ///
    /// `raw` is the entry from the definition (`{}` for sids that were not
    /// defined). External kinds load from their own store here.
    fn hydrate(&self, _sid: &str, raw: &AttributeMap) -> Result<AttributeMap, PropertyError> {
        Ok(raw.clone())
    }

    /// Persistence hook run by `save` after validation.
    ///
    /// The default succeeds without doing anything: the property's data lives
    /// inside the owner's definition and is stored with it.
    fn save_internal(&self, _property: &Property) -> Result<bool, PropertyError> {
        Ok(true)
    }
}

// =============================================================================
// PROPERTY
// =============================================================================

/// A promoted property instance.
#[derive(Debug)]
pub struct Property {
    sid: String,
    form_name: String,
    owner: Option<OwnerRef>,
    kind: Arc<dyn PropertyKind>,
    model: AttributeModel,
    /// Raw attributes the kind does not declare, re-emitted verbatim.
    carried: AttributeMap,
    load_scope: Option<String>,
}

impl Property {
    /// Build a property for `sid` from its raw definition entry.
    ///
    /// Raw data is assigned trusted. Keys the kind does not declare are
    /// carried unchanged and flattened after the declared attributes.
    pub(crate) fn build(
        sid: &str,
        kind: Arc<dyn PropertyKind>,
        raw: &AttributeMap,
        owner: Option<OwnerRef>,
    ) -> Result<Self, PropertyError> {
        let value_label = kind.label().unwrap_or_else(|| kind.name()).to_string();
        let mut descriptors = base_attributes(&value_label);
        descriptors.extend(kind.attributes());
        let rules = merge_rules(base_rules(), kind.rules());

        let mut model = AttributeModel::new(descriptors, rules);
        let mut carried = AttributeMap::new();
        for (name, value) in kind.hydrate(sid, raw)? {
            if model.has_attribute(&name) {
                model.set(&name, value);
            } else {
                carried.insert(name, value);
            }
        }
        if !carried.is_empty() {
            tracing::debug!(
                sid,
                kind = kind.name(),
                carried = ?carried.keys().collect::<Vec<_>>(),
                "undeclared attributes carried on promotion"
            );
        }

        Ok(Self {
            sid: sid.to_string(),
            form_name: form_name_for(sid),
            owner,
            kind,
            model,
            carried,
            load_scope: None,
        })
    }

    // =========================================================================
    // IDENTITY
    // =========================================================================

    /// The sid this property was promoted for.
    #[must_use]
    pub fn sid(&self) -> &str {
        &self.sid
    }

    /// Form name used when loading without an explicit scope.
    #[must_use]
    pub fn form_name(&self) -> &str {
        &self.form_name
    }

    /// The owner attached at promotion.
    #[must_use]
    pub fn owner(&self) -> Option<&OwnerRef> {
        self.owner.as_ref()
    }

    /// Name of the kind that produced this property.
    #[must_use]
    pub fn kind_name(&self) -> &str {
        self.kind.name()
    }

    // =========================================================================
    // ATTRIBUTES
    // =========================================================================

    /// Current `value`.
    #[must_use]
    pub fn value(&self) -> &Value {
        self.model.get(VALUE_ATTRIBUTE).unwrap_or(&Value::Null)
    }

    /// Replace `value`.
    pub fn set_value(&mut self, value: Value) {
        self.model.set(VALUE_ATTRIBUTE, value);
    }

    /// Current value of any declared attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.model.get(name)
    }

    /// Set a declared attribute (trusted). Returns `false` if undeclared.
    pub fn set_attribute(&mut self, name: &str, value: Value) -> bool {
        self.model.set(name, value)
    }

    /// Bulk assignment; see [`AttributeModel::set_attributes`].
    pub fn set_attributes(&mut self, input: &AttributeMap, trusted: bool) -> Vec<String> {
        let skipped = self.model.set_attributes(input, trusted);
        if !skipped.is_empty() {
            tracing::debug!(sid = %self.sid, trusted, ?skipped, "attributes ignored on assignment");
        }
        skipped
    }

    /// Flattened raw attributes: declared ones (non-null, declaration
    /// order) followed by carried undeclared ones.
    #[must_use]
    pub fn attributes(&self) -> AttributeMap {
        let mut flat = self.model.to_map();
        for (name, value) in &self.carried {
            flat.insert(name.clone(), value.clone());
        }
        flat
    }

    /// Label of a declared attribute.
    #[must_use]
    pub fn attribute_label(&self, name: &str) -> String {
        self.model.attribute_label(name)
    }

    /// Attributes assignable from untrusted input.
    #[must_use]
    pub fn safe_attributes(&self) -> Vec<&str> {
        self.model.safe_attributes()
    }

    /// The underlying attribute model.
    #[must_use]
    pub fn model(&self) -> &AttributeModel {
        &self.model
    }

    /// Whether the schema is exactly the base `[value]` schema.
    #[must_use]
    pub fn has_base_schema(&self) -> bool {
        self.model.attribute_names().eq([VALUE_ATTRIBUTE])
    }

    /// Emptiness as decided by the kind. Carried attributes always make a
    /// property non-empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.carried.is_empty() && self.kind.is_empty(self)
    }

    /// Externality as decided by the kind.
    #[must_use]
    pub fn is_external(&self) -> bool {
        self.kind.is_external()
    }

    // =========================================================================
    // VALIDATION & SAVE
    // =========================================================================

    /// Run all rules. Returns `true` if there are no errors.
    pub fn validate(&mut self) -> bool {
        self.model.validate()
    }

    /// Errors from the last validation.
    #[must_use]
    pub fn errors(&self) -> &ErrorMap {
        self.model.errors()
    }

    /// Whether the last validation left any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.model.errors().is_empty()
    }

    /// Validate (optionally) and run the kind's persistence hook.
    ///
    /// Returns `false` on validation failure without touching persistence.
    /// A failing hook is logged and reported as `false`.
    pub fn save(&mut self, run_validation: bool) -> bool {
        if run_validation && !self.validate() {
            tracing::debug!(sid = %self.sid, errors = ?self.model.errors(), "validation failed, not saved");
            return false;
        }
        let kind = Arc::clone(&self.kind);
        match kind.save_internal(self) {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!(sid = %self.sid, error = %e, "persistence hook failed");
                false
            }
        }
    }

    /// Save or fail: validation errors and hook refusals become
    /// `SaveFailed`, hook errors propagate as-is.
    pub fn ensure_save(&mut self) -> Result<(), PropertyError> {
        let committed = self.validate() && Arc::clone(&self.kind).save_internal(self)?;
        if committed {
            Ok(())
        } else {
            Err(PropertyError::SaveFailed {
                sid: self.sid.clone(),
                errors: self.model.errors().clone(),
            })
        }
    }

    // =========================================================================
    // SCOPED LOAD
    // =========================================================================

    /// Scope recorded by the last bulk load that reached this property.
    #[must_use]
    pub fn load_scope(&self) -> Option<&str> {
        self.load_scope.as_deref()
    }

    /// Record the load scope.
    pub fn set_load_scope(&mut self, scope: Option<String>) {
        self.load_scope = scope;
    }

    /// Untrusted bulk load from form data.
    ///
    /// - `None`: read `data[form_name]`.
    /// - `Some("")`: read `data` itself; absent or falsy data loads nothing.
    /// - `Some(scope)`: read `data[scope]`.
    ///
    /// A non-mapping payload is treated like `set`'s scalar input and
    /// assigned to `value`. Returns whether anything was assigned.
    pub fn load(&mut self, data: &Value, scope: Option<&str>) -> bool {
        let payload = match scope {
            Some("") => Some(data).filter(|d| is_truthy(d)),
            Some(scope) => data.get(scope).filter(|d| !d.is_null()),
            None => data.get(&self.form_name).filter(|d| !d.is_null()),
        };
        let Some(payload) = payload else {
            return false;
        };
        let input = match payload {
            Value::Object(map) => map.clone(),
            other => AttributeMap::from_iter([(VALUE_ATTRIBUTE.to_string(), other.clone())]),
        };
        self.set_attributes(&input, false);
        true
    }
}

// =============================================================================
// TESTS
// =============================================================================
