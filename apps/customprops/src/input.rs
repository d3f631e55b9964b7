//! # Command-Line Input
//!
//! Turning `set` arguments into the value handed to
//! [`PropertyContainer::set`](customprops_core::PropertyContainer::set).

use crate::error::AppError;
use customprops_core::AttributeMap;
use customprops_core::primitives::VALUE_ATTRIBUTE;
use serde_json::Value;

/// Parse a command-line value as JSON, falling back to a plain string.
pub fn parse_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Parse one `name=value` pair.
pub fn parse_attr(pair: &str) -> Result<(String, Value), AppError> {
    let (name, value) = pair
        .split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| AppError::Argument(format!("expected name=value, got '{pair}'")))?;
    Ok((name.to_string(), parse_value(value)))
}

/// Build the value for a `set` call.
///
/// Without `attrs` the parsed value is passed through as-is, so an object
/// argument is an attribute map and a scalar is wrapped by `set` itself.
/// With `attrs`, a scalar becomes `{ "value": .. }` first and every pair
/// is merged over it.
pub fn set_input(value: &str, attrs: &[String]) -> Result<Value, AppError> {
    let value = parse_value(value);
    if attrs.is_empty() {
        return Ok(value);
    }
    let mut map = match value {
        Value::Object(map) => map,
        other => AttributeMap::from_iter([(VALUE_ATTRIBUTE.to_string(), other)]),
    };
    for pair in attrs {
        let (name, value) = parse_attr(pair)?;
        map.insert(name, value);
    }
    Ok(Value::Object(map))
}
