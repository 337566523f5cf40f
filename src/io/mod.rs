//! Input/output operations and error handling

/// Persisted signature cache
pub mod cache;
/// Command-line interface
pub mod cli;
/// Constants and runtime defaults
pub mod configuration;
/// Error types and context helpers
pub mod error;
/// Image decoding and export
pub mod image;
/// Progress reporting
pub mod progress;
