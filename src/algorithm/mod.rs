//! Mosaic assembly driver

/// Mosaic configuration, cell dispatch and assembly
pub mod executor;
