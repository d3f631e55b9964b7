//! # customprops
//!
//! CLI support for editing property definition files through
//! `customprops-core`: schema configuration, the definition session, and
//! the application error type.

pub mod config;
pub mod error;
pub mod input;
pub mod session;

pub use config::{DEFAULT_SCHEMA_FILE, KindName, PropertyConfig, SchemaConfig};
pub use error::AppError;
pub use input::{parse_attr, parse_value, set_input};
pub use session::{Session, read_definition, read_json, write_definition};
