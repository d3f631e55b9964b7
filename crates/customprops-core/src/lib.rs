//! # customprops-core
//!
//! The lazy property container for customprops - THE LOGIC.
//!
//! An owner (a product, a document, ...) carries an open-ended bag of named
//! properties stored as a raw definition: sid -> attribute map. This crate
//! keeps that definition raw until a sid is touched, then promotes just that
//! entry into a typed, validated [`Property`] whose kind is resolved through
//! an injected [`PropertyPolicy`].
//!
//! ## Architecture
//!
//! - `container`: raw-or-promoted entries, enumeration, serialization, bulk load
//! - `property`: the promoted value holder and the `PropertyKind` seam
//! - `model`: attribute declaration, rules, safe-list assignment
//! - `kinds`: generic, composite and external kinds
//! - `policy`: type resolution, mandatory sids, replaced fields
//! - `storage`: persistence hooks for external kinds
//! - `checksum`: definition fingerprints
//!
//! ## Architectural Constraints
//!
//! - Single-threaded use per container; no locking, no async
//! - Untouched entries cost nothing and round-trip unchanged
//! - Programming errors (`NotImplemented`, `InconsistentState`) are `Err`s;
//!   validation failures are data

// =============================================================================
// MODULES
// =============================================================================

pub mod checksum;
pub mod container;
pub mod kinds;
pub mod model;
pub mod policy;
pub mod primitives;
pub mod property;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{AttributeMap, ErrorMap, OwnerRef, PropertyError, RawDefinition, is_truthy};

// =============================================================================
// RE-EXPORTS: Container & Properties
// =============================================================================

pub use container::{Entry, PropertyContainer};
pub use kinds::{CompositeKind, ExternalKind, GenericKind};
pub use model::{AttributeDescriptor, AttributeModel, Rule, Validator};
pub use policy::{FlatPolicy, PropertyPolicy, TypeRegistry};
pub use property::{Property, PropertyKind};

// =============================================================================
// RE-EXPORTS: Storage & Checksums
// =============================================================================

pub use checksum::{canonical_json, definition_checksum};
#[cfg(feature = "crypto-hash")]
pub use checksum::definition_crypto_hash;
pub use storage::{MemoryStore, PropertyStore, RedbStore};
