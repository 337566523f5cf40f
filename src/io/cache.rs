//! Signature cache persisted between runs, keyed by fidelity
//!
//! The file maps a fidelity (as a decimal string key) to a map from image path
//! to signature. Only the section for the requested fidelity is decoded; all
//! other sections are carried through untouched so caches written by other
//! fidelities, or by newer versions, survive a rewrite.

use crate::analysis::signature::Signature;
use crate::io::configuration::CACHE_FILE_NAME;
use crate::io::error::{MosaicError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Signatures computed at one fidelity, keyed by path identifier
pub type FidelitySection = BTreeMap<PathBuf, Signature>;

/// In-memory form of the whole cache file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistedCache {
    sections: BTreeMap<String, serde_json::Value>,
}

impl PersistedCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the section written for `fidelity`, if present
    ///
    /// # Errors
    ///
    /// Returns the decoding error if the section exists but is malformed
    pub fn section(&self, fidelity: u32) -> serde_json::Result<Option<FidelitySection>> {
        self.sections
            .get(&fidelity.to_string())
            .map(FidelitySection::deserialize)
            .transpose()
    }

    /// Replace the section for `fidelity`
    ///
    /// # Errors
    ///
    /// Returns the encoding error if a path cannot be represented as a JSON key
    pub fn set_section(
        &mut self,
        fidelity: u32,
        section: &FidelitySection,
    ) -> serde_json::Result<()> {
        let value = serde_json::to_value(section)?;
        self.sections.insert(fidelity.to_string(), value);
        Ok(())
    }

    /// Keys of every stored section, including ones this version cannot read
    pub fn section_keys(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}

/// Backing store for the persisted cache
pub trait SignatureStore: Sync {
    /// Human-readable location used in error messages
    fn location(&self) -> &Path;

    /// Read the cache, returning `None` when nothing has been stored yet
    ///
    /// # Errors
    ///
    /// Returns [`MosaicError::CacheLoad`] if the stored cache is unreadable
    fn load(&self) -> Result<Option<PersistedCache>>;

    /// Replace the stored cache
    ///
    /// # Errors
    ///
    /// Returns [`MosaicError::CachePersist`] if the cache cannot be written
    fn save(&self, cache: &PersistedCache) -> Result<()>;
}

/// Pretty-printed JSON file store
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by an explicit file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Conventional store for a library directory
    pub fn for_library(library_root: &Path) -> Self {
        Self::new(library_root.join(CACHE_FILE_NAME))
    }

    fn load_error(&self, reason: &impl ToString) -> MosaicError {
        MosaicError::CacheLoad {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    fn persist_error(&self, reason: &impl ToString) -> MosaicError {
        MosaicError::CachePersist {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl SignatureStore for JsonFileStore {
    fn location(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Option<PersistedCache>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| self.load_error(&e))?;
        let cache = serde_json::from_str(&contents).map_err(|e| self.load_error(&e))?;
        Ok(Some(cache))
    }

    fn save(&self, cache: &PersistedCache) -> Result<()> {
        let contents = serde_json::to_string_pretty(cache).map_err(|e| self.persist_error(&e))?;

        // Readers only ever observe a complete file
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, contents).map_err(|e| self.persist_error(&e))?;
        fs::rename(&staging, &self.path).map_err(|e| {
            let _ = fs::remove_file(&staging);
            self.persist_error(&e)
        })
    }
}
