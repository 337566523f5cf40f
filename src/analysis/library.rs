//! Photo library indexing with a fidelity-keyed signature cache
//!
//! A build walks the library directory, reuses every cached signature computed
//! at the same fidelity, extracts signatures for the remaining photos in
//! parallel and writes the merged result back to the cache store. Photos that
//! fail to decode are skipped and reported; only an unreadable library root is
//! fatal.

use crate::analysis::signature::{Signature, dimensions, sample_region};
use crate::io::cache::{FidelitySection, PersistedCache, SignatureStore};
use crate::io::configuration::{CHANNELS, PHOTO_EXTENSIONS};
use crate::io::error::{MosaicError, Result, invalid_parameter};
use crate::io::image::load_rgb;
use indicatif::ProgressBar;
use log::{debug, info, warn};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Unique set of library photos with signatures at a single fidelity
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryEntries {
    fidelity: u32,
    entries: BTreeMap<PathBuf, Signature>,
}

impl LibraryEntries {
    /// Create an empty set for signatures built at `fidelity`
    pub const fn new(fidelity: u32) -> Self {
        Self {
            fidelity,
            entries: BTreeMap::new(),
        }
    }

    /// Add a photo to the set
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The signature was built at a different fidelity
    /// - The path is already present
    pub fn insert(&mut self, path: PathBuf, signature: Signature) -> Result<()> {
        if !signature.matches_fidelity(self.fidelity) {
            return Err(invalid_parameter(
                "signature",
                &format!("{} values", signature.len() * CHANNELS),
                &format!(
                    "expected {} values for fidelity {}",
                    dimensions(self.fidelity),
                    self.fidelity
                ),
            ));
        }

        if self.entries.contains_key(&path) {
            return Err(MosaicError::DuplicateEntry { path });
        }

        self.entries.insert(path, signature);
        Ok(())
    }

    /// Fidelity every signature in the set was built at
    pub const fn fidelity(&self) -> u32 {
        self.fidelity
    }

    /// Number of photos
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set holds no photos
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a photo is present
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Signature of a photo
    pub fn get(&self, path: &Path) -> Option<&Signature> {
        self.entries.get(path)
    }

    /// Photos in path order
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Signature)> {
        self.entries
            .iter()
            .map(|(path, signature)| (path.as_path(), signature))
    }

    /// Consume the set, yielding photos in path order
    pub fn into_inner(self) -> BTreeMap<PathBuf, Signature> {
        self.entries
    }
}

/// A photo left out of the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    /// Photo path
    pub path: PathBuf,
    /// Why it was skipped
    pub reason: String,
}

/// What a build did, including the non-fatal cache failures
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Photos whose signature came from the cache
    pub cache_hits: usize,
    /// Photos whose signature was computed during this build
    pub extracted: usize,
    /// Photos that could not be indexed
    pub skipped: Vec<SkippedFile>,
    /// Cached entries dropped because their photo no longer exists
    pub pruned: usize,
    /// Cache read failure; the build fell back to full extraction
    pub cache_load_error: Option<MosaicError>,
    /// Cache write failure; the next run will extract again
    pub persist_error: Option<MosaicError>,
}

/// Result of indexing a library
#[derive(Debug)]
pub struct LibraryBuild {
    /// Indexed photos, ready to hand to the matcher
    pub entries: LibraryEntries,
    /// Build statistics and non-fatal failures
    pub report: BuildReport,
}

/// Indexes a directory tree of photos at a fixed fidelity
#[derive(Debug, Clone)]
pub struct LibraryIndex {
    root: PathBuf,
    fidelity: u32,
}

impl LibraryIndex {
    /// Prepare an index of `root` at `fidelity`
    pub fn new(root: impl Into<PathBuf>, fidelity: u32) -> Self {
        Self {
            root: root.into(),
            fidelity,
        }
    }

    /// Library directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Signature fidelity
    pub const fn fidelity(&self) -> u32 {
        self.fidelity
    }

    /// Build the entry set, consulting and refreshing `store` when given
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The fidelity is zero
    /// - The library root cannot be resolved or is not a directory
    ///
    /// Cache load and persist failures are reported in [`BuildReport`]
    /// instead.
    pub fn build(
        &self,
        store: Option<&dyn SignatureStore>,
        progress: Option<&ProgressBar>,
    ) -> Result<LibraryBuild> {
        if self.fidelity == 0 {
            return Err(invalid_parameter(
                "fidelity",
                &self.fidelity,
                &"must be at least 1",
            ));
        }

        let mut report = BuildReport::default();
        let (mut persisted, mut cached) = self.load_cached(store, &mut report);
        let photos = self.discover_photos()?;

        let mut entries = LibraryEntries::new(self.fidelity);
        let mut pending = Vec::new();
        for path in &photos {
            match cached.remove(path) {
                Some(signature) if signature.matches_fidelity(self.fidelity) => {
                    entries.insert(path.clone(), signature)?;
                    report.cache_hits += 1;
                }
                Some(_) => {
                    debug!("Discarding malformed cached signature for {}", path.display());
                    pending.push(path.clone());
                }
                None => pending.push(path.clone()),
            }
        }
        report.pruned = cached.len();

        if let Some(bar) = progress {
            bar.set_length(pending.len() as u64);
        }

        let extracted: Vec<(PathBuf, Result<Signature>)> = pending
            .par_iter()
            .map(|path| {
                let signature = self.extract(path);
                if let Some(bar) = progress {
                    bar.inc(1);
                }
                (path.clone(), signature)
            })
            .collect();

        for (path, signature) in extracted {
            match signature {
                Ok(signature) => {
                    entries.insert(path, signature)?;
                    report.extracted += 1;
                }
                Err(error) => {
                    warn!("Skipping {}: {error}", path.display());
                    report.skipped.push(SkippedFile {
                        path,
                        reason: error.to_string(),
                    });
                }
            }
        }

        if let Some(store) = store {
            report.persist_error = Self::persist(store, &mut persisted, &entries).err();
            if let Some(error) = &report.persist_error {
                warn!("{error}");
            }
        }

        info!(
            "Indexed {} photo(s) at fidelity {}: {} cached, {} extracted, {} skipped, {} pruned",
            entries.len(),
            self.fidelity,
            report.cache_hits,
            report.extracted,
            report.skipped.len(),
            report.pruned
        );

        Ok(LibraryBuild { entries, report })
    }

    // Cache failures degrade to an empty section
    fn load_cached(
        &self,
        store: Option<&dyn SignatureStore>,
        report: &mut BuildReport,
    ) -> (PersistedCache, FidelitySection) {
        let Some(store) = store else {
            return (PersistedCache::new(), FidelitySection::new());
        };

        match store.load() {
            Ok(Some(cache)) => match cache.section(self.fidelity) {
                Ok(section) => {
                    let section = section.unwrap_or_default();
                    debug!(
                        "Loaded {} cached signature(s) at fidelity {} from {}",
                        section.len(),
                        self.fidelity,
                        store.location().display()
                    );
                    (cache, section)
                }
                Err(error) => {
                    let error = MosaicError::CacheLoad {
                        path: store.location().to_path_buf(),
                        reason: error.to_string(),
                    };
                    warn!("{error}");
                    report.cache_load_error = Some(error);
                    (cache, FidelitySection::new())
                }
            },
            Ok(None) => (PersistedCache::new(), FidelitySection::new()),
            Err(error) => {
                warn!("{error}");
                report.cache_load_error = Some(error);
                (PersistedCache::new(), FidelitySection::new())
            }
        }
    }

    /// Photos under the root in path order
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be resolved or is not a directory
    pub fn discover_photos(&self) -> Result<Vec<PathBuf>> {
        let root = self
            .root
            .canonicalize()
            .map_err(|e| MosaicError::FileSystem {
                path: self.root.clone(),
                operation: "resolve library",
                source: e,
            })?;

        if !root.is_dir() {
            return Err(MosaicError::FileSystem {
                path: root,
                operation: "read library",
                source: std::io::Error::new(
                    std::io::ErrorKind::NotADirectory,
                    "library root is not a directory",
                ),
            });
        }

        let mut photos = Vec::new();
        for entry in WalkDir::new(&root).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_file() && is_photo(entry.path()) => {
                    photos.push(entry.into_path());
                }
                Ok(_) => {}
                Err(error) => warn!("Skipping unreadable library entry: {error}"),
            }
        }

        photos.sort();
        Ok(photos)
    }

    fn extract(&self, path: &Path) -> Result<Signature> {
        debug!("Processing {}", path.display());
        sample_region(&load_rgb(path)?, self.fidelity)
    }

    fn persist(
        store: &dyn SignatureStore,
        persisted: &mut PersistedCache,
        entries: &LibraryEntries,
    ) -> Result<()> {
        let section: FidelitySection = entries
            .iter()
            .map(|(path, signature)| (path.to_path_buf(), signature.clone()))
            .collect();

        persisted
            .set_section(entries.fidelity(), &section)
            .map_err(|e| MosaicError::CachePersist {
                path: store.location().to_path_buf(),
                reason: e.to_string(),
            })?;

        store.save(persisted)
    }
}

/// Whether a path carries a recognized photo extension (case-insensitive)
pub fn is_photo(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            PHOTO_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
