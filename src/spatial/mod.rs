//! Spatial data structures and grid manipulation
//!
//! This module contains spatial-related functionality including:
//! - Grid planning and tile geometry
//! - Nearest-neighbor matching over signatures
//! - The shared output canvas

/// Output canvas written by concurrent workers
pub mod canvas;
/// Tile geometry and cell ordering
pub mod grid;
/// Exclusive nearest-neighbor claims
pub mod matcher;

pub use grid::{GridCell, TileGeometry};
