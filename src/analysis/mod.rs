//! Signature extraction and photo library indexing

/// Photo library scanning and signature caching
pub mod library;
/// Block-averaged color signatures
pub mod signature;
