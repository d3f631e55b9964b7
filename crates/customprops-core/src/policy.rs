//! # Property Policy
//!
//! The collaborators a container consumes but does not own:
//! - type resolution (sid -> kind)
//! - the mandatory sid set
//! - the legacy field names the property set replaces
//!
//! `FlatPolicy` provides none of them, so a flat container can enumerate
//! and round-trip sids but fails with `NotImplemented` on promotion.
//! `TypeRegistry` is the injectable, data-driven implementation.

use crate::primitives::PATTERN_WILDCARD;
use crate::property::PropertyKind;
use crate::types::PropertyError;
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// What a container needs to know about the property set it holds.
pub trait PropertyPolicy: fmt::Debug + Send + Sync {
    /// Resolve the kind to instantiate for `sid`.
    fn resolve(&self, sid: &str) -> Result<Arc<dyn PropertyKind>, PropertyError> {
        Err(PropertyError::NotImplemented(format!(
            "no property kind for '{sid}'"
        )))
    }

    /// Sids always counted present, defined or not.
    fn mandatory_sids(&self) -> Vec<String> {
        Vec::new()
    }

    /// Externally named fields this property set supersedes.
    fn replaced_field_names(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }
}

/// A policy with no type mapping, no mandatory sids and no replacements.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatPolicy;

impl PropertyPolicy for FlatPolicy {}

// =============================================================================
// TYPE REGISTRY
// =============================================================================

/// Registry mapping sids (or `prefix*` patterns) to kinds.
///
/// Resolution order:
/// 1. exact sid
/// 2. longest matching prefix pattern
/// 3. fallback kind, if set
/// 4. `NotImplemented`
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    exact: IndexMap<String, Arc<dyn PropertyKind>>,
    prefixes: Vec<(String, Arc<dyn PropertyKind>)>,
    fallback: Option<Arc<dyn PropertyKind>>,
    mandatory: Vec<String>,
    replaces: BTreeSet<String>,
}

impl TypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind for a sid, or for every sid starting with `prefix`
    /// when the key ends with `*`. Re-registering a key replaces it.
    pub fn register(&mut self, key: &str, kind: Arc<dyn PropertyKind>) {
        match key.strip_suffix(PATTERN_WILDCARD) {
            Some(prefix) => {
                self.prefixes.retain(|(p, _)| p != prefix);
                self.prefixes.push((prefix.to_string(), kind));
            }
            None => {
                self.exact.insert(key.to_string(), kind);
            }
        }
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, key: &str, kind: Arc<dyn PropertyKind>) -> Self {
        self.register(key, kind);
        self
    }

    /// Kind used for sids nothing else matches.
    #[must_use]
    pub fn with_fallback(mut self, kind: Arc<dyn PropertyKind>) -> Self {
        self.fallback = Some(kind);
        self
    }

    /// Add mandatory sids (duplicates are ignored).
    #[must_use]
    pub fn with_mandatory<I, S>(mut self, sids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for sid in sids {
            let sid = sid.into();
            if !self.mandatory.contains(&sid) {
                self.mandatory.push(sid);
            }
        }
        self
    }

    /// Add replaced legacy field names.
    #[must_use]
    pub fn with_replaces<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replaces.extend(names.into_iter().map(Into::into));
        self
    }

    /// The kind `sid` would resolve to, without erroring.
    #[must_use]
    pub fn kind_for(&self, sid: &str) -> Option<&Arc<dyn PropertyKind>> {
        self.exact
            .get(sid)
            .or_else(|| {
                self.prefixes
                    .iter()
                    .filter(|(prefix, _)| sid.len() > prefix.len() && sid.starts_with(prefix))
                    .max_by_key(|(prefix, _)| prefix.len())
                    .map(|(_, kind)| kind)
            })
            .or(self.fallback.as_ref())
    }

    /// Number of exact and pattern registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.exact.len() + self.prefixes.len()
    }

    /// Whether nothing is registered (the fallback is not counted).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PropertyPolicy for TypeRegistry {
    fn resolve(&self, sid: &str) -> Result<Arc<dyn PropertyKind>, PropertyError> {
        self.kind_for(sid).cloned().ok_or_else(|| {
            PropertyError::NotImplemented(format!("no property kind registered for '{sid}'"))
        })
    }

    fn mandatory_sids(&self) -> Vec<String> {
        self.mandatory.clone()
    }

    fn replaced_field_names(&self) -> BTreeSet<String> {
        self.replaces.clone()
    }
}

// =============================================================================
// TESTS
// =============================================================================
