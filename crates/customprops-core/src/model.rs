//! # Attribute Model
//!
//! The validated-model layer every property is built on:
//! - attribute declaration (`AttributeDescriptor`)
//! - named validation rules (`Rule`, `Validator`)
//! - trusted/untrusted assignment filtered by the safe list
//! - rule execution producing an `ErrorMap`
//!
//! Schemas are composed, never inherited: a kind's descriptors and rules
//! are appended to the base ones, and a rule whose name already exists
//! replaces the earlier rule in place.

use crate::primitives::VALUE_ATTRIBUTE;
use crate::types::{AttributeMap, ErrorMap, is_truthy};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// ATTRIBUTE DESCRIPTORS
// =============================================================================

/// Declaration of a single attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDescriptor {
    name: String,
    label: Option<String>,
}

impl AttributeDescriptor {
    /// Declare an attribute with a generated label.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
        }
    }

    /// Attach an explicit label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Explicit label, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// The minimal schema shared by every property: just `value`.
#[must_use]
pub fn base_attributes(value_label: &str) -> Vec<AttributeDescriptor> {
    vec![AttributeDescriptor::new(VALUE_ATTRIBUTE).with_label(value_label)]
}

/// Rules of the minimal schema: `value` is assignable without constraints.
#[must_use]
pub fn base_rules() -> Vec<Rule> {
    vec![Rule::safe(VALUE_ATTRIBUTE)]
}

/// Turn `unit_code` into `Unit Code`.
fn humanize(name: &str) -> String {
    name.split(['_', '-'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// RULES
// =============================================================================

/// Predicate used by [`Validator::Custom`].
pub type Check = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// What a rule checks.
///
/// Messages may contain `{attribute}`, replaced by the attribute label.
#[derive(Clone)]
pub enum Validator {
    /// No constraint; only marks the attribute as safe for external input.
    Safe,
    /// Value must not be blank (`null`, whitespace-only string, `[]`).
    Required,
    /// Strings up to `n` characters. Skipped on blank values.
    MaxLength(usize),
    /// Value must equal one of the listed values. Skipped on blank values.
    OneOf(Vec<Value>),
    /// Arbitrary predicate. Runs on every value, blank or not.
    Custom { message: String, check: Check },
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => f.write_str("Safe"),
            Self::Required => f.write_str("Required"),
            Self::MaxLength(n) => f.debug_tuple("MaxLength").field(n).finish(),
            Self::OneOf(values) => f.debug_tuple("OneOf").field(values).finish(),
            Self::Custom { message, .. } => f
                .debug_struct("Custom")
                .field("message", message)
                .finish_non_exhaustive(),
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

impl Validator {
    /// Check a value, returning the failure message.
    fn check(&self, value: &Value, label: &str) -> Option<String> {
        let message = match self {
            Self::Safe => return None,
            Self::Required => {
                if !is_blank(value) {
                    return None;
                }
                "{attribute} cannot be blank."
            }
            Self::MaxLength(max) => {
                if is_blank(value) {
                    return None;
                }
                match value {
                    Value::String(s) if s.chars().count() <= *max => return None,
                    Value::String(_) => {
                        return Some(format!(
                            "{label} should contain at most {max} characters."
                        ));
                    }
                    _ => "{attribute} must be a string.",
                }
            }
            Self::OneOf(allowed) => {
                if is_blank(value) || allowed.contains(value) {
                    return None;
                }
                "{attribute} is invalid."
            }
            Self::Custom { message, check } => {
                if check(value) {
                    return None;
                }
                message.as_str()
            }
        };
        Some(message.replace("{attribute}", label))
    }
}

/// A named validation rule over one or more attributes.
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    attributes: Vec<String>,
    validator: Validator,
}

impl Rule {
    /// Build a rule.
    #[must_use]
    pub fn new(name: impl Into<String>, attributes: &[&str], validator: Validator) -> Self {
        Self {
            name: name.into(),
            attributes: attributes.iter().map(|a| (*a).to_string()).collect(),
            validator,
        }
    }

    /// `<attribute>/safe`: assignable from untrusted input, no constraint.
    #[must_use]
    pub fn safe(attribute: &str) -> Self {
        Self::new(format!("{attribute}/safe"), &[attribute], Validator::Safe)
    }

    /// `<attribute>/required`.
    #[must_use]
    pub fn required(attribute: &str) -> Self {
        Self::new(
            format!("{attribute}/required"),
            &[attribute],
            Validator::Required,
        )
    }

    /// `<attribute>/max-length`.
    #[must_use]
    pub fn max_length(attribute: &str, max: usize) -> Self {
        Self::new(
            format!("{attribute}/max-length"),
            &[attribute],
            Validator::MaxLength(max),
        )
    }

    /// `<attribute>/one-of`.
    #[must_use]
    pub fn one_of(attribute: &str, allowed: Vec<Value>) -> Self {
        Self::new(
            format!("{attribute}/one-of"),
            &[attribute],
            Validator::OneOf(allowed),
        )
    }

    /// `<attribute>/custom`.
    #[must_use]
    pub fn custom(
        attribute: &str,
        message: impl Into<String>,
        check: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(
            format!("{attribute}/custom"),
            &[attribute],
            Validator::Custom {
                message: message.into(),
                check: Arc::new(check),
            },
        )
    }

    /// Rule name; later rules with the same name replace earlier ones.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes the rule applies to.
    #[must_use]
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }
}

/// Merge `extra` into `base` by rule name.
///
/// Same-named rules replace the base rule at its original position; new
/// names are appended in order.
#[must_use]
pub fn merge_rules(base: Vec<Rule>, extra: Vec<Rule>) -> Vec<Rule> {
    let mut merged: IndexMap<String, Rule> = base
        .into_iter()
        .map(|rule| (rule.name.clone(), rule))
        .collect();
    for rule in extra {
        merged.insert(rule.name.clone(), rule);
    }
    merged.into_values().collect()
}

// =============================================================================
// ATTRIBUTE MODEL
// =============================================================================

/// Declared attributes, their current values, rules and last errors.
#[derive(Debug, Clone)]
pub struct AttributeModel {
    descriptors: Vec<AttributeDescriptor>,
    rules: Vec<Rule>,
    values: IndexMap<String, Value>,
    errors: ErrorMap,
}

impl AttributeModel {
    /// Create a model with every declared attribute set to `null`.
    ///
    /// A descriptor repeating an earlier name is ignored.
    #[must_use]
    pub fn new(descriptors: Vec<AttributeDescriptor>, rules: Vec<Rule>) -> Self {
        let mut unique: Vec<AttributeDescriptor> = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            if !unique.iter().any(|d| d.name == descriptor.name) {
                unique.push(descriptor);
            }
        }
        let values = unique
            .iter()
            .map(|d| (d.name.clone(), Value::Null))
            .collect();
        Self {
            descriptors: unique,
            rules,
            values,
            errors: ErrorMap::new(),
        }
    }

    /// Declared attributes, in declaration order.
    #[must_use]
    pub fn descriptors(&self) -> &[AttributeDescriptor] {
        &self.descriptors
    }

    /// Declared attribute names, in declaration order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(AttributeDescriptor::name)
    }

    /// Whether `name` is declared.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Effective rules after merging.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Label of a declared attribute; generated from its name if not set.
    #[must_use]
    pub fn attribute_label(&self, name: &str) -> String {
        self.descriptors
            .iter()
            .find(|d| d.name == name)
            .and_then(|d| d.label.clone())
            .unwrap_or_else(|| humanize(name))
    }

    /// Current value of a declared attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Set a declared attribute. Returns `false` if `name` is not declared.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Attributes that may be assigned from untrusted input: every declared
    /// attribute named by at least one rule.
    #[must_use]
    pub fn safe_attributes(&self) -> Vec<&str> {
        self.attribute_names()
            .filter(|name| {
                self.rules
                    .iter()
                    .any(|rule| rule.attributes.iter().any(|a| a == name))
            })
            .collect()
    }

    /// Bulk assignment.
    ///
    /// With `trusted == false` only safe attributes are assigned. Keys that
    /// are undeclared or not safe are skipped silently and returned so the
    /// caller may report them.
    pub fn set_attributes(&mut self, input: &AttributeMap, trusted: bool) -> Vec<String> {
        let safe: Vec<String> = if trusted {
            Vec::new()
        } else {
            self.safe_attributes()
                .into_iter()
                .map(str::to_owned)
                .collect()
        };
        let mut skipped = Vec::new();
        for (name, value) in input {
            let allowed = trusted || safe.iter().any(|s| s == name);
            if !(allowed && self.set(name, value.clone())) {
                skipped.push(name.clone());
            }
        }
        skipped
    }

    /// Run every rule, replacing previous errors. Returns `true` if valid.
    pub fn validate(&mut self) -> bool {
        let mut errors = ErrorMap::new();
        for rule in &self.rules {
            for attribute in &rule.attributes {
                let Some(value) = self.values.get(attribute) else {
                    continue;
                };
                let label = self.attribute_label(attribute);
                if let Some(message) = rule.validator.check(value, &label) {
                    errors.entry(attribute.clone()).or_default().push(message);
                }
            }
        }
        self.errors = errors;
        self.errors.is_empty()
    }

    /// Errors from the last validation.
    #[must_use]
    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    /// Whether every declared attribute is falsy.
    #[must_use]
    pub fn all_falsy(&self) -> bool {
        !self.values.values().any(is_truthy)
    }

    /// Flatten to a raw attribute map, omitting `null` attributes.
    #[must_use]
    pub fn to_map(&self) -> AttributeMap {
        self.values
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
