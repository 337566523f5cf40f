//! Tests for block-averaged color signatures

#[cfg(test)]
mod tests {
    use image::{DynamicImage, Rgb, RgbImage};
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use truman::MosaicError;
    use truman::analysis::signature::{
        ColorSample, Signature, dimensions, sample_image, sample_region,
    };

    fn quadrant_image(size: u32, colors: [[u8; 3]; 4]) -> RgbImage {
        let half = size / 2;
        RgbImage::from_fn(size, size, |x, y| {
            let index = usize::from(y >= half) * 2 + usize::from(x >= half);
            Rgb(colors[index])
        })
    }

    // Tests a uniform image reduces to its color at fidelity 1
    // Verified by dividing totals by the full image area instead of block area
    #[test]
    fn test_uniform_image_average() {
        let image = RgbImage::from_pixel(7, 5, Rgb([10, 200, 33]));
        let signature = sample_region(&image, 1).unwrap();

        assert_eq!(signature.len(), 1);
        assert_eq!(
            signature.samples()[0],
            ColorSample::new(10.0, 200.0, 33.0)
        );
    }

    // Tests samples are laid out row-major over the blocks
    // Verified by swapping the block row and column indices
    #[test]
    fn test_blocks_are_row_major() {
        let image = quadrant_image(
            8,
            [[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 255]],
        );
        let signature = sample_region(&image, 2).unwrap();

        let channels: Vec<[f64; 3]> = signature.samples().iter().map(ColorSample::channels).collect();
        assert_eq!(
            channels,
            vec![
                [255.0, 0.0, 0.0],
                [0.0, 255.0, 0.0],
                [0.0, 0.0, 255.0],
                [255.0, 255.0, 255.0],
            ]
        );
    }

    // Tests remainder rows and columns are excluded from sampling
    // Verified by sampling the full image width and height
    #[test]
    fn test_remainder_pixels_are_ignored() {
        let image = RgbImage::from_fn(5, 5, |x, y| {
            if x == 4 || y == 4 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let signature = sample_region(&image, 2).unwrap();

        assert!(
            signature
                .samples()
                .iter()
                .all(|sample| sample.channels() == [0.0, 0.0, 0.0])
        );
    }

    // Tests sample count and channel bounds on random images
    // Verified by allocating one block fewer per row
    #[test]
    fn test_sample_count_and_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for fidelity in 1..=5 {
            let width = rng.random_range(fidelity..60);
            let height = rng.random_range(fidelity..60);
            let image = RgbImage::from_fn(width, height, |_, _| {
                Rgb([rng.random(), rng.random(), rng.random()])
            });

            let signature = sample_region(&image, fidelity).unwrap();
            assert_eq!(signature.len(), (fidelity * fidelity) as usize);
            assert!(signature.matches_fidelity(fidelity));
            for sample in signature.samples() {
                for channel in sample.channels() {
                    assert!((0.0..=255.0).contains(&channel));
                }
            }
        }
    }

    // Tests averages keep their fractional part
    // Verified by truncating totals to integers before dividing
    #[test]
    fn test_average_is_not_truncated() {
        let image = RgbImage::from_fn(2, 1, |x, _| if x == 0 { Rgb([0, 0, 0]) } else { Rgb([1, 3, 5]) });
        let signature = sample_region(&image, 1).unwrap();

        assert_eq!(signature.samples()[0].channels(), [0.5, 1.5, 2.5]);
    }

    // Tests regions too small for the fidelity are rejected
    // Verified by removing the zero block size check
    #[test]
    fn test_region_smaller_than_fidelity() {
        let image = RgbImage::from_pixel(3, 8, Rgb([1, 2, 3]));
        let result = sample_region(&image, 4);

        assert!(matches!(result, Err(MosaicError::InvalidGeometry { .. })));
    }

    // Tests zero fidelity is rejected
    // Verified by treating fidelity 0 as fidelity 1
    #[test]
    fn test_zero_fidelity() {
        let image = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        let result = sample_region(&image, 0);

        assert!(matches!(
            result,
            Err(MosaicError::InvalidParameter {
                parameter: "fidelity",
                ..
            })
        ));
    }

    // Tests feature vectors interleave channels per block
    // Verified by emitting all reds before greens
    #[test]
    fn test_to_vector_layout() {
        let signature = Signature::new(vec![
            ColorSample::new(1.0, 2.0, 3.0),
            ColorSample::new(4.0, 5.0, 6.0),
        ]);

        assert_eq!(signature.to_vector(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(dimensions(3), 27);
        assert!(!signature.matches_fidelity(1));
    }

    // Tests Euclidean distance between signatures
    // Verified by returning the squared distance
    #[test]
    fn test_distance() {
        let a = Signature::new(vec![ColorSample::new(0.0, 0.0, 0.0)]);
        let b = Signature::new(vec![ColorSample::new(3.0, 4.0, 0.0)]);

        assert!((a.distance(&b) - 5.0).abs() < f64::EPSILON);
        assert!(a.distance(&a).abs() < f64::EPSILON);
    }

    // Tests decoded images are converted before sampling
    // Verified by sampling the alpha channel as blue
    #[test]
    fn test_sample_image_converts_to_rgb() {
        let rgba = image::RgbaImage::from_pixel(4, 4, image::Rgba([20, 40, 60, 0]));
        let signature = sample_image(&DynamicImage::ImageRgba8(rgba), 2).unwrap();

        assert_eq!(signature.len(), 4);
        assert!(
            signature
                .samples()
                .iter()
                .all(|sample| sample.channels() == [20.0, 40.0, 60.0])
        );
    }

    // Tests a cropped view samples the same as a copied crop
    // Verified by reading the view from the parent image origin
    #[test]
    fn test_crop_view_matches_copy() {
        let image = quadrant_image(
            40,
            [[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 255]],
        );
        let view = image::imageops::crop_imm(&image, 20, 10, 20, 20);

        let from_view = sample_region(&*view, 2).unwrap();
        let from_copy = sample_region(&view.to_image(), 2).unwrap();

        assert_eq!(from_view, from_copy);
        assert_eq!(from_view.samples()[0].channels(), [0.0, 255.0, 0.0]);
        assert_eq!(from_view.samples()[3].channels(), [255.0, 255.0, 255.0]);
    }
}
