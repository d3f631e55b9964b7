//! # Property Kinds
//!
//! The kinds shipped with the core:
//! - `GenericKind`: the minimal `[value]` schema
//! - `CompositeKind`: `[value]` plus extra attributes
//! - `ExternalKind`: wraps another kind and persists through a
//!   [`PropertyStore`] instead of the owner's definition

use crate::model::{AttributeDescriptor, Rule};
use crate::property::{Property, PropertyKind};
use crate::storage::PropertyStore;
use crate::types::{AttributeMap, PropertyError};
use std::sync::Arc;

// =============================================================================
// GENERIC
// =============================================================================

/// The simplest property type: a single `value`.
#[derive(Debug, Clone, Default)]
pub struct GenericKind {
    label: Option<String>,
    rules: Vec<Rule>,
}

impl GenericKind {
    /// Create an unlabelled kind with no extra rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Label for the `value` attribute.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Add a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }
}

impl PropertyKind for GenericKind {
    fn name(&self) -> &str {
        "generic"
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn rules(&self) -> Vec<Rule> {
        self.rules.clone()
    }
}

// =============================================================================
// COMPOSITE
// =============================================================================

/// `value` plus extra attributes, e.g. a measurement with a unit.
///
/// Extra attributes are assignable from forms; internal attributes are
/// declared but only settable through trusted assignment. The property is
/// empty when every attribute is falsy.
#[derive(Debug, Clone, Default)]
pub struct CompositeKind {
    label: Option<String>,
    extra: Vec<String>,
    internal: Vec<String>,
    rules: Vec<Rule>,
}

impl CompositeKind {
    /// Declare the form-assignable extra attributes.
    #[must_use]
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extra: extra.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Declare attributes that untrusted input may not set.
    #[must_use]
    pub fn with_internal<I, S>(mut self, internal: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.internal.extend(internal.into_iter().map(Into::into));
        self
    }

    /// Label for the `value` attribute.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Add a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }
}

impl PropertyKind for CompositeKind {
    fn name(&self) -> &str {
        "composite"
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn attributes(&self) -> Vec<AttributeDescriptor> {
        self.extra
            .iter()
            .chain(&self.internal)
            .map(AttributeDescriptor::new)
            .collect()
    }

    fn rules(&self) -> Vec<Rule> {
        self.extra
            .iter()
            .map(|name| Rule::safe(name))
            .chain(self.rules.iter().cloned())
            .collect()
    }

    fn is_empty(&self, property: &Property) -> bool {
        property.model().all_falsy()
    }
}

// =============================================================================
// EXTERNAL
// =============================================================================

/// A property whose data lives in a [`PropertyStore`].
///
/// It never appears in a serialized definition. Promotion reads the stored
/// attributes (falling back to the raw entry), saving writes them back, and
/// saving an empty property removes the stored record.
#[derive(Debug, Clone)]
pub struct ExternalKind {
    inner: Arc<dyn PropertyKind>,
    store: Arc<dyn PropertyStore>,
}

impl ExternalKind {
    /// Persist properties shaped by `inner` into `store`.
    pub fn new(inner: Arc<dyn PropertyKind>, store: Arc<dyn PropertyStore>) -> Self {
        Self { inner, store }
    }
}

impl PropertyKind for ExternalKind {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn label(&self) -> Option<&str> {
        self.inner.label()
    }

    fn attributes(&self) -> Vec<AttributeDescriptor> {
        self.inner.attributes()
    }

    fn rules(&self) -> Vec<Rule> {
        self.inner.rules()
    }

    fn is_empty(&self, property: &Property) -> bool {
        self.inner.is_empty(property)
    }

    fn is_external(&self) -> bool {
        true
    }

    fn hydrate(&self, sid: &str, raw: &AttributeMap) -> Result<AttributeMap, PropertyError> {
        match self.store.get(sid)? {
            Some(stored) => Ok(stored),
            None => self.inner.hydrate(sid, raw),
        }
    }

    fn save_internal(&self, property: &Property) -> Result<bool, PropertyError> {
        if property.is_empty() {
            self.store.remove(property.sid())?;
        } else {
            self.store.put(property.sid(), &property.attributes())?;
        }
        tracing::debug!(sid = property.sid(), "external property stored");
        Ok(true)
    }
}

// =============================================================================
// TESTS
// =============================================================================
