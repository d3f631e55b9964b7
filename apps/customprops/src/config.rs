//! # Schema Configuration
//!
//! The TOML schema file describing which kind each sid resolves to.
//!
//! ```toml
//! mandatory = ["color", "size"]
//! replaces = ["legacy_color"]
//! store = "properties.db"
//!
//! [default]
//! kind = "generic"
//!
//! [properties.color]
//! label = "Color"
//! required = true
//! max_length = 32
//! one_of = ["red", "green"]
//!
//! [properties."dim_*"]
//! kind = "composite"
//! attributes = ["unit"]
//!
//! [properties.stock]
//! external = true
//! ```

use crate::error::AppError;
use customprops_core::primitives::VALUE_ATTRIBUTE;
use customprops_core::{
    CompositeKind, ExternalKind, GenericKind, MemoryStore, PropertyKind, PropertyStore, RedbStore,
    Rule, TypeRegistry,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default schema file name.
pub const DEFAULT_SCHEMA_FILE: &str = "customprops.toml";

/// Shape of a configured property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindName {
    /// `[value]` only.
    #[default]
    Generic,
    /// `[value]` plus `attributes` and `internal`.
    Composite,
}

/// One `[properties.<key>]` (or `[default]`) table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyConfig {
    #[serde(default)]
    pub kind: KindName,
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
    pub max_length: Option<usize>,
    #[serde(default)]
    pub one_of: Vec<Value>,
    /// Extra form-assignable attributes (composite only).
    #[serde(default)]
    pub attributes: Vec<String>,
    /// Extra trusted-only attributes (composite only).
    #[serde(default)]
    pub internal: Vec<String>,
    /// Persist through the store instead of the definition.
    #[serde(default)]
    pub external: bool,
}

impl PropertyConfig {
    fn rules(&self) -> Vec<Rule> {
        let mut rules = Vec::new();
        if self.required {
            rules.push(Rule::required(VALUE_ATTRIBUTE));
        }
        if let Some(max) = self.max_length {
            rules.push(Rule::max_length(VALUE_ATTRIBUTE, max));
        }
        if !self.one_of.is_empty() {
            rules.push(Rule::one_of(VALUE_ATTRIBUTE, self.one_of.clone()));
        }
        rules
    }

    /// Build the kind this table describes.
    pub fn build_kind(&self, store: &Arc<dyn PropertyStore>) -> Arc<dyn PropertyKind> {
        let kind: Arc<dyn PropertyKind> = match self.kind {
            KindName::Generic => {
                let mut kind = GenericKind::new();
                if let Some(label) = &self.label {
                    kind = kind.with_label(label.clone());
                }
                Arc::new(self.rules().into_iter().fold(kind, GenericKind::with_rule))
            }
            KindName::Composite => {
                let mut kind = CompositeKind::new(self.attributes.iter().cloned())
                    .with_internal(self.internal.iter().cloned());
                if let Some(label) = &self.label {
                    kind = kind.with_label(label.clone());
                }
                Arc::new(self.rules().into_iter().fold(kind, CompositeKind::with_rule))
            }
        };
        if self.external {
            Arc::new(ExternalKind::new(kind, Arc::clone(store)))
        } else {
            kind
        }
    }
}

/// The whole schema file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    #[serde(default)]
    pub mandatory: Vec<String>,
    #[serde(default)]
    pub replaces: Vec<String>,
    /// redb file backing external properties; in-memory when absent.
    pub store: Option<PathBuf>,
    /// Kind for sids no other entry matches.
    pub default: Option<PropertyConfig>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyConfig>,
}

impl SchemaConfig {
    /// Parse a schema from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, AppError> {
        Ok(toml::from_str(text)?)
    }

    /// Load the schema at `path`. A missing file yields the empty schema.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "schema file not found, using empty schema");
                Ok(Self::default())
            }
            Err(source) => Err(AppError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Open the configured store.
    pub fn open_store(&self) -> Result<Arc<dyn PropertyStore>, AppError> {
        match &self.store {
            Some(path) => {
                tracing::debug!(path = %path.display(), "opening redb property store");
                Ok(Arc::new(RedbStore::open(path)?))
            }
            None => Ok(Arc::new(MemoryStore::new())),
        }
    }

    /// Build the type registry this schema describes.
    pub fn build_registry(&self, store: &Arc<dyn PropertyStore>) -> TypeRegistry {
        let mut registry = TypeRegistry::new()
            .with_mandatory(self.mandatory.iter().cloned())
            .with_replaces(self.replaces.iter().cloned());
        for (key, property) in &self.properties {
            registry.register(key, property.build_kind(store));
        }
        if let Some(default) = &self.default {
            registry = registry.with_fallback(default.build_kind(store));
        }
        registry
    }
}
