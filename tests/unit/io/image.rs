//! Tests for image decoding and mosaic export

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};
    use truman::MosaicError;
    use truman::io::image::{export_mosaic, load_rgb};

    // Tests export creates missing parent directories
    // Verified by removing the create_dir_all call
    #[test]
    fn test_export_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("a/b/out.png");
        let image = RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]));

        export_mosaic(&image, &output).unwrap();

        let loaded = load_rgb(&output).unwrap();
        assert_eq!(loaded, image);
    }

    // Tests the output format follows the extension
    // Verified by always encoding PNG
    #[test]
    fn test_export_jpeg_is_lossy_but_close() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.jpg");
        let image = RgbImage::from_pixel(16, 16, Rgb([200, 100, 50]));

        export_mosaic(&image, &output).unwrap();

        let loaded = load_rgb(&output).unwrap();
        assert_eq!(loaded.dimensions(), (16, 16));
        let pixel = loaded.get_pixel(8, 8).0;
        for (actual, expected) in pixel.iter().zip([200u8, 100, 50]) {
            assert!(actual.abs_diff(expected) <= 8);
        }
    }

    // Tests unknown extensions fail as export errors
    // Verified by defaulting to PNG for unknown extensions
    #[test]
    fn test_export_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.notaformat");
        let image = RgbImage::new(1, 1);

        let result = export_mosaic(&image, &output);
        assert!(matches!(result, Err(MosaicError::ImageExport { .. })));
    }

    // Tests undecodable files report their path
    // Verified by using the generic From conversion
    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"nope").unwrap();

        match load_rgb(&path) {
            Err(MosaicError::ImageLoad { path: reported, .. }) => assert_eq!(reported, path),
            other => unreachable!("Expected ImageLoad error, got {other:?}"),
        }
    }
}
