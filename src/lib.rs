//! Photomosaic assembly from a library of photos
//!
//! Every photo in a library is reduced to a color signature, the signatures
//! are indexed in a k-d tree, and each cell of the target image is replaced by
//! the closest photo that no other cell has claimed.

#![forbid(unsafe_code)]

/// Mosaic assembly and parallel cell dispatch
pub mod algorithm;
/// Color signatures and library indexing
pub mod analysis;
/// Input/output operations, configuration and error handling
pub mod io;
/// Grid geometry, nearest-neighbor matching and the output canvas
pub mod spatial;

pub use io::error::{MosaicError, Result};
