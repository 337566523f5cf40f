//! Error types and context management for mosaic operations

use std::fmt;
use std::path::PathBuf;

/// Main error type for all mosaic operations
#[derive(Debug)]
pub enum MosaicError {
    /// Failed to decode an image from the filesystem
    ImageLoad {
        /// Path to the image file
        path: PathBuf,
        /// Underlying image decoding error
        source: image::ImageError,
    },

    /// Failed to encode the finished mosaic to disk
    ImageExport {
        /// Path where export was attempted
        path: PathBuf,
        /// Underlying image encoding error
        source: image::ImageError,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The persisted signature cache could not be read or parsed
    CacheLoad {
        /// Location of the cache
        path: PathBuf,
        /// Description of the failure
        reason: String,
    },

    /// The persisted signature cache could not be written
    CachePersist {
        /// Location of the cache
        path: PathBuf,
        /// Description of the failure
        reason: String,
    },

    /// Fewer unclaimed library images than grid cells still waiting for one
    LibraryExhausted {
        /// Library images available to the run
        available: usize,
        /// Grid cells that need an image
        required: usize,
    },

    /// Tile geometry cannot be derived from the requested grid
    ///
    /// Occurs when:
    /// - A grid dimension is zero
    /// - The grid is finer than the image resolution
    /// - The fidelity is finer than a tile (or sampled region)
    /// - A paste falls outside its canvas band
    InvalidGeometry {
        /// Description of what's wrong with the geometry
        reason: String,
    },

    /// Parameter validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// The same path identifier was inserted into an index twice
    DuplicateEntry {
        /// Path identifier seen more than once
        path: PathBuf,
    },

    /// Failure while assembling a single grid cell
    CellAssembly {
        /// Grid cell coordinates `[x, y]`
        cell: [u32; 2],
        /// Error raised while processing the cell
        source: Box<MosaicError>,
    },

    /// Internal computation or synchronization failure
    Computation {
        /// Name of the computation that failed
        operation: &'static str,
        /// Description of the failure
        reason: String,
    },
}

impl fmt::Display for MosaicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageLoad { path, source } => {
                write!(f, "Failed to load image '{}': {source}", path.display())
            }
            Self::ImageExport { path, source } => {
                write!(
                    f,
                    "Failed to export image to '{}': {source}",
                    path.display()
                )
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
            Self::CacheLoad { path, reason } => {
                write!(
                    f,
                    "Failed to load signature cache '{}': {reason}",
                    path.display()
                )
            }
            Self::CachePersist { path, reason } => {
                write!(
                    f,
                    "Failed to persist signature cache '{}': {reason}",
                    path.display()
                )
            }
            Self::LibraryExhausted {
                available,
                required,
            } => {
                write!(
                    f,
                    "Library exhausted: {available} image(s) available for {required} grid cell(s)"
                )
            }
            Self::InvalidGeometry { reason } => {
                write!(f, "Invalid geometry: {reason}")
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::DuplicateEntry { path } => {
                write!(f, "Duplicate library entry '{}'", path.display())
            }
            Self::CellAssembly { cell, source } => {
                write!(f, "Grid cell ({}, {}) failed: {source}", cell[0], cell[1])
            }
            Self::Computation { operation, reason } => {
                write!(f, "Computation error in {operation}: {reason}")
            }
        }
    }
}

impl std::error::Error for MosaicError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ImageLoad { source, .. } | Self::ImageExport { source, .. } => Some(source),
            Self::FileSystem { source, .. } => Some(source),
            Self::CellAssembly { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl MosaicError {
    /// Strip any cell context and return the underlying error
    pub fn root(&self) -> &Self {
        match self {
            Self::CellAssembly { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Convenience type alias for mosaic results
pub type Result<T> = std::result::Result<T, MosaicError>;

/// Enriches errors with the grid cell being processed
pub trait WithContext<T> {
    /// Attach grid cell coordinates to an error
    ///
    /// # Errors
    ///
    /// Propagates the original error wrapped in [`MosaicError::CellAssembly`]
    fn with_cell(self, cell: [u32; 2]) -> Result<T>;
}

impl<T, E> WithContext<T> for std::result::Result<T, E>
where
    E: Into<MosaicError>,
{
    fn with_cell(self, cell: [u32; 2]) -> Result<T> {
        self.map_err(|e| {
            let error = e.into();
            // A cell already tagged keeps its innermost coordinates
            if matches!(error, MosaicError::CellAssembly { .. }) {
                error
            } else {
                MosaicError::CellAssembly {
                    cell,
                    source: Box::new(error),
                }
            }
        })
    }
}

impl From<image::ImageError> for MosaicError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageLoad {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

impl From<std::io::Error> for MosaicError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> MosaicError {
    MosaicError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create an invalid geometry error
pub fn invalid_geometry(reason: &impl ToString) -> MosaicError {
    MosaicError::InvalidGeometry {
        reason: reason.to_string(),
    }
}

/// Create a computation error
pub fn computation_error(operation: &'static str, reason: &impl ToString) -> MosaicError {
    MosaicError::Computation {
        operation,
        reason: reason.to_string(),
    }
}
