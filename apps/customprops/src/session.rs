//! # Definition Session
//!
//! A JSON definition file opened into a [`PropertyContainer`].
//!
//! The file holds the raw `sid -> attributes` mapping. `commit` writes it
//! back only when the serialized definition actually changed, so reading
//! and promoting without mutation never rewrites the file.

use crate::error::AppError;
use customprops_core::{
    OwnerRef, PropertyContainer, PropertyPolicy, RawDefinition, definition_checksum,
};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An open definition file.
#[derive(Debug)]
pub struct Session {
    path: PathBuf,
    container: PropertyContainer,
    checksum_at_open: u64,
}

impl Session {
    /// Open `path` against `policy`. A missing file is an empty definition.
    pub fn open(
        path: &Path,
        policy: Arc<dyn PropertyPolicy>,
        owner: Option<OwnerRef>,
    ) -> Result<Self, AppError> {
        let definition = read_definition(path)?;
        let checksum_at_open = definition_checksum(&definition)?;
        let mut container = PropertyContainer::from_definition(policy, Some(definition));
        if let Some(owner) = owner {
            container = container.with_owner(owner);
        }
        tracing::debug!(path = %path.display(), sids = container.sids().len(), "definition opened");

        Ok(Self {
            path: path.to_path_buf(),
            container,
            checksum_at_open,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn container(&self) -> &PropertyContainer {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut PropertyContainer {
        &mut self.container
    }

    /// Write the definition back if it changed since `open`.
    ///
    /// Returns whether the file was written.
    pub fn commit(&mut self) -> Result<bool, AppError> {
        let definition = self.container.definition()?;
        let checksum = definition_checksum(&definition)?;
        if checksum == self.checksum_at_open {
            tracing::debug!(path = %self.path.display(), "definition unchanged, not written");
            return Ok(false);
        }
        write_definition(&self.path, &definition)?;
        self.checksum_at_open = checksum;
        tracing::info!(path = %self.path.display(), entries = definition.len(), "definition written");
        Ok(true)
    }
}

// =============================================================================
// FILE HELPERS
// =============================================================================

/// Read a definition file. Missing or blank files yield an empty definition.
pub fn read_definition(path: &Path) -> Result<RawDefinition, AppError> {
    match std::fs::read_to_string(path) {
        Ok(text) if text.trim().is_empty() => Ok(RawDefinition::new()),
        Ok(text) => serde_json::from_str(&text).map_err(|source| AppError::Json {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RawDefinition::new()),
        Err(source) => Err(AppError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write a definition as pretty JSON.
pub fn write_definition(path: &Path, definition: &RawDefinition) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(definition).map_err(|source| AppError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, text + "\n").map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read any JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let text = std::fs::read_to_string(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| AppError::Json {
        path: path.to_path_buf(),
        source,
    })
}
