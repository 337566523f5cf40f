//! Mosaic constants and runtime configuration defaults

// Grid defaults match the 20x30 layout the tool has always produced
/// Default number of tile columns
pub const DEFAULT_GRID_WIDTH: u32 = 20;
/// Default number of tile rows
pub const DEFAULT_GRID_HEIGHT: u32 = 30;

/// Default signature resolution (fidelity x fidelity color blocks per image)
pub const DEFAULT_FIDELITY: u32 = 4;

// Safety limits to prevent excessive memory allocation
/// Maximum allowed grid dimension
pub const MAX_GRID_DIMENSION: u32 = 10_000;
/// Maximum allowed fidelity
pub const MAX_FIDELITY: u32 = 64;

/// Number of color channels per sample
pub const CHANNELS: usize = 3;

/// Signature cache file stored inside each library directory
pub const CACHE_FILE_NAME: &str = "truman.json";

/// Lower-cased file extensions recognized as library photos
pub const PHOTO_EXTENSIONS: [&str; 2] = ["jpg", "jpeg"];

// Output settings
/// Suffix added to output filenames
pub const OUTPUT_SUFFIX: &str = "_mosaic";
/// Extension used when no output path is given
pub const OUTPUT_EXTENSION: &str = "jpg";

// Progress bar display settings
/// Width of progress bars in characters
pub const PROGRESS_BAR_WIDTH: u16 = 40;

/// Default log filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info";
/// Log filter used in quiet mode
pub const QUIET_LOG_FILTER: &str = "warn";
