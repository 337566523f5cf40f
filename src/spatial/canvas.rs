//! Output canvas shared by concurrent tile writers
//!
//! The canvas is stored as one horizontal band per grid row. Every band is a
//! contiguous image behind its own lock, so a paste only ever blocks writers
//! of the same row and only for the copy itself.

use crate::io::error::{Result, computation_error, invalid_geometry};
use crate::spatial::grid::{GridCell, TileGeometry};
use image::{RgbImage, imageops};
use std::sync::Mutex;

/// Mosaic output buffer that accepts pastes from many threads
#[derive(Debug)]
pub struct Canvas {
    geometry: TileGeometry,
    bands: Vec<Mutex<RgbImage>>,
}

impl Canvas {
    /// Allocate a black canvas sized for `geometry`
    pub fn new(geometry: TileGeometry) -> Self {
        let bands = (0..geometry.grid_height)
            .map(|_| Mutex::new(RgbImage::new(geometry.canvas_width(), geometry.tile_height)))
            .collect();
        Self { geometry, bands }
    }

    /// Canvas width in pixels
    pub const fn width(&self) -> u32 {
        self.geometry.canvas_width()
    }

    /// Canvas height in pixels
    pub const fn height(&self) -> u32 {
        self.geometry.canvas_height()
    }

    /// Geometry the canvas was allocated for
    pub const fn geometry(&self) -> &TileGeometry {
        &self.geometry
    }

    /// Copy `tile` into the canvas with its top-left corner at the offset
    ///
    /// # Errors
    ///
    /// Returns an error if the destination rectangle leaves the canvas or
    /// straddles two grid rows
    pub fn paste(&self, offset_x: u32, offset_y: u32, tile: &RgbImage) -> Result<()> {
        let tile_height = self.geometry.tile_height;
        let band_index = offset_y.checked_div(tile_height).unwrap_or(u32::MAX);
        let local_y = offset_y.checked_rem(tile_height).unwrap_or(0);

        let fits_horizontally = offset_x
            .checked_add(tile.width())
            .is_some_and(|right| right <= self.width());
        let fits_band = local_y
            .checked_add(tile.height())
            .is_some_and(|bottom| bottom <= tile_height);

        let band = self
            .bands
            .get(band_index as usize)
            .filter(|_| fits_horizontally && fits_band)
            .ok_or_else(|| {
                invalid_geometry(&format!(
                    "{}x{} tile at ({offset_x}, {offset_y}) does not fit a {}x{} canvas band",
                    tile.width(),
                    tile.height(),
                    self.width(),
                    tile_height
                ))
            })?;

        let mut band = band
            .lock()
            .map_err(|e| computation_error("canvas lock", &e))?;
        imageops::replace(&mut *band, tile, i64::from(offset_x), i64::from(local_y));
        Ok(())
    }

    /// Copy a tile into the rectangle of `cell`
    ///
    /// # Errors
    ///
    /// Returns an error if the cell is outside the grid or the tile is not
    /// exactly tile-sized
    pub fn paste_cell(&self, cell: GridCell, tile: &RgbImage) -> Result<()> {
        let rect = self.geometry.cell_rect(cell);
        if !self.geometry.contains(cell) || tile.dimensions() != (rect.width, rect.height) {
            return Err(invalid_geometry(&format!(
                "{}x{} tile does not match cell ({}, {})",
                tile.width(),
                tile.height(),
                cell.x,
                cell.y
            )));
        }
        self.paste(rect.x, rect.y, tile)
    }

    /// Stitch the bands into the finished image
    ///
    /// # Errors
    ///
    /// Returns an error if a writer panicked while holding a band
    pub fn into_image(self) -> Result<RgbImage> {
        let (width, height) = (self.width(), self.height());
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);

        for band in self.bands {
            let band = band
                .into_inner()
                .map_err(|e| computation_error("canvas lock", &e))?;
            pixels.extend_from_slice(band.as_raw());
        }

        RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| computation_error("canvas stitch", &"band sizes do not add up"))
    }
}
