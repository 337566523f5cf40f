//! Image decoding and mosaic export

use crate::io::error::{MosaicError, Result};
use image::RgbImage;
use std::path::Path;

/// Decode an image file into 8-bit RGB
///
/// # Errors
///
/// Returns an error if the file cannot be opened or is not a decodable image
pub fn load_rgb(path: &Path) -> Result<RgbImage> {
    image::open(path)
        .map(|image| image.to_rgb8())
        .map_err(|e| MosaicError::ImageLoad {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Encode a mosaic, choosing the format from the file extension
///
/// # Errors
///
/// Returns an error if:
/// - The parent directory cannot be created
/// - The extension is not a supported format or encoding fails
pub fn export_mosaic(image: &RgbImage, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent).map_err(|e| MosaicError::FileSystem {
            path: parent.to_path_buf(),
            operation: "create directory",
            source: e,
        })?;
    }

    image
        .save(output_path)
        .map_err(|e| MosaicError::ImageExport {
            path: output_path.to_path_buf(),
            source: e,
        })
}
