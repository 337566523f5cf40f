//! Color signatures summarizing an image as a grid of average colors
//!
//! A region is split into `fidelity x fidelity` equally sized blocks and each
//! block is reduced to its mean red, green and blue values. Blocks are ordered
//! row-major: block `(bx, by)` sits at index `by * fidelity + bx`. Remainder
//! columns on the right and rows at the bottom that do not fill a whole block
//! are not sampled.

use image::{DynamicImage, GenericImageView, Rgb};
use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::io::configuration::CHANNELS;
use crate::io::error::{Result, computation_error, invalid_geometry, invalid_parameter};

/// Average channel values of one rectangular block, each in `[0, 255]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorSample {
    /// Mean red channel value
    pub red: f64,
    /// Mean green channel value
    pub green: f64,
    /// Mean blue channel value
    pub blue: f64,
}

impl ColorSample {
    /// Create a sample from channel averages
    pub const fn new(red: f64, green: f64, blue: f64) -> Self {
        Self { red, green, blue }
    }

    /// Channel values in `[red, green, blue]` order
    pub const fn channels(&self) -> [f64; 3] {
        [self.red, self.green, self.blue]
    }
}

/// Ordered block colors describing an image at a given fidelity
///
/// Serializes as a plain list of samples so cached signatures stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature {
    samples: Vec<ColorSample>,
}

impl Signature {
    /// Wrap block samples already in row-major order
    pub const fn new(samples: Vec<ColorSample>) -> Self {
        Self { samples }
    }

    /// Block samples in row-major order
    pub fn samples(&self) -> &[ColorSample] {
        &self.samples
    }

    /// Number of block samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the signature holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Check that this signature was produced at `fidelity`
    pub fn matches_fidelity(&self, fidelity: u32) -> bool {
        self.samples.len() * CHANNELS == dimensions(fidelity)
    }

    /// Flatten into a feature vector `r0, g0, b0, r1, g1, b1, ...`
    pub fn to_vector(&self) -> Vec<f64> {
        self.samples
            .iter()
            .flat_map(ColorSample::channels)
            .collect()
    }

    /// Euclidean distance between two signatures in feature space
    ///
    /// Signatures of different lengths are compared over their common prefix.
    pub fn distance(&self, other: &Self) -> f64 {
        self.samples
            .iter()
            .zip(&other.samples)
            .flat_map(|(a, b)| {
                a.channels()
                    .into_iter()
                    .zip(b.channels())
                    .map(|(x, y)| (x - y) * (x - y))
            })
            .sum::<f64>()
            .sqrt()
    }
}

/// Length of the feature vector for signatures built at `fidelity`
pub const fn dimensions(fidelity: u32) -> usize {
    CHANNELS * (fidelity as usize) * (fidelity as usize)
}

/// Compute the signature of an RGB region
///
/// Works on any image view, so callers can sample a sub-view of a larger
/// image without copying it.
///
/// # Errors
///
/// Returns an error if:
/// - `fidelity` is zero
/// - The region is narrower or shorter than `fidelity` pixels, which would
///   leave blocks without pixels
pub fn sample_region<I>(region: &I, fidelity: u32) -> Result<Signature>
where
    I: GenericImageView<Pixel = Rgb<u8>>,
{
    if fidelity == 0 {
        return Err(invalid_parameter(
            "fidelity",
            &fidelity,
            &"must be at least 1",
        ));
    }

    let (width, height) = region.dimensions();
    let block_width = width / fidelity;
    let block_height = height / fidelity;
    if block_width == 0 || block_height == 0 {
        return Err(invalid_geometry(&format!(
            "{width}x{height} region cannot be split into {fidelity}x{fidelity} blocks"
        )));
    }

    let blocks = fidelity as usize;
    let mut totals = Array3::<f64>::zeros((blocks, blocks, CHANNELS));

    for y in 0..block_height * fidelity {
        let block_row = (y / block_height) as usize;
        for x in 0..block_width * fidelity {
            let block_col = (x / block_width) as usize;
            let Rgb(channels) = region.get_pixel(x, y);
            for (channel, value) in channels.into_iter().enumerate() {
                if let Some(total) = totals.get_mut((block_row, block_col, channel)) {
                    *total += f64::from(value);
                }
            }
        }
    }

    totals /= f64::from(block_width) * f64::from(block_height);

    let flat = totals
        .as_slice()
        .ok_or_else(|| computation_error("sample_region", &"block totals not contiguous"))?;

    let samples = flat
        .chunks_exact(CHANNELS)
        .filter_map(|chunk| match chunk {
            [red, green, blue] => Some(ColorSample::new(*red, *green, *blue)),
            _ => None,
        })
        .collect();

    Ok(Signature::new(samples))
}

/// Compute the signature of a whole decoded image
///
/// # Errors
///
/// Returns an error under the same conditions as [`sample_region`]
pub fn sample_image(image: &DynamicImage, fidelity: u32) -> Result<Signature> {
    sample_region(&image.to_rgb8(), fidelity)
}
