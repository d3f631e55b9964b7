//! # Fixed Primitives
//!
//! Hardcoded names and constants shared by the container, the property
//! model and the type registry.
//!
//! These values are part of the raw definition contract: changing any of
//! them changes what existing definitions and form payloads mean.

/// The attribute every property kind declares.
///
/// - Present in the base schema of every property.
/// - Scalar input to `set` is wrapped as `{ "value": <input> }`.
pub const VALUE_ATTRIBUTE: &str = "value";

/// Outer form name used to build a promoted property's own form name.
///
/// A property promoted for sid `color` answers to `Properties[color]`.
pub const FORM_NAME: &str = "Properties";

/// Trailing wildcard marking a registry key as a sid prefix pattern.
///
/// `dim_*` matches `dim_width`, `dim_height`, ... but not `dim` itself.
pub const PATTERN_WILDCARD: char = '*';

/// FNV-1a 64-bit offset basis used by the definition checksum.
pub const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a 64-bit prime used by the definition checksum.
pub const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Build the form name for a property sid.
#[must_use]
pub fn form_name_for(sid: &str) -> String {
    format!("{FORM_NAME}[{sid}]")
}

/// Build the child load scope recorded on a property during bulk load.
#[must_use]
pub fn child_scope(scope: &str, sid: &str) -> String {
    format!("{scope}[{sid}]")
}
