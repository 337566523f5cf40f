//! Grid planning: tile geometry and randomized cell order
//!
//! Tiles are `floor(image / grid)` pixels in each direction, so the mosaic
//! covers the top-left `tile_width * grid_width x tile_height * grid_height`
//! pixels of the target and drops any remainder on the right and bottom.

use crate::io::configuration::MAX_GRID_DIMENSION;
use crate::io::error::{Result, invalid_geometry};
use rand::Rng;
use rand::seq::SliceRandom;

/// One tile position, `x` in `[0, grid_width)` and `y` in `[0, grid_height)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
    /// Column index
    pub x: u32,
    /// Row index
    pub y: u32,
}

impl GridCell {
    /// Create a cell from its column and row
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Coordinates as `[x, y]`
    pub const fn coordinates(&self) -> [u32; 2] {
        [self.x, self.y]
    }
}

/// Axis-aligned pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    /// Left edge (inclusive)
    pub x: u32,
    /// Top edge (inclusive)
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl PixelRect {
    /// Whether two rectangles share at least one pixel
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    /// Number of pixels covered
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Tile size and grid size for one mosaic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGeometry {
    /// Tile width in pixels
    pub tile_width: u32,
    /// Tile height in pixels
    pub tile_height: u32,
    /// Number of tile columns
    pub grid_width: u32,
    /// Number of tile rows
    pub grid_height: u32,
}

impl TileGeometry {
    /// Derive tile size from image and grid dimensions
    ///
    /// # Errors
    ///
    /// Returns an error if a grid dimension is zero, exceeds the limit, or is
    /// larger than the corresponding image dimension
    pub fn new(
        image_width: u32,
        image_height: u32,
        grid_width: u32,
        grid_height: u32,
    ) -> Result<Self> {
        if grid_width == 0 || grid_height == 0 {
            return Err(invalid_geometry(&format!(
                "grid {grid_width}x{grid_height} must have at least one cell per axis"
            )));
        }
        if grid_width > MAX_GRID_DIMENSION || grid_height > MAX_GRID_DIMENSION {
            return Err(invalid_geometry(&format!(
                "grid {grid_width}x{grid_height} exceeds the {MAX_GRID_DIMENSION} cell limit"
            )));
        }
        if grid_width > image_width || grid_height > image_height {
            return Err(invalid_geometry(&format!(
                "grid {grid_width}x{grid_height} is finer than the {image_width}x{image_height} image"
            )));
        }

        Ok(Self {
            tile_width: image_width / grid_width,
            tile_height: image_height / grid_height,
            grid_width,
            grid_height,
        })
    }

    /// Width of the cropped output canvas
    pub const fn canvas_width(&self) -> u32 {
        self.tile_width * self.grid_width
    }

    /// Height of the cropped output canvas
    pub const fn canvas_height(&self) -> u32 {
        self.tile_height * self.grid_height
    }

    /// Total number of cells
    pub const fn cell_count(&self) -> usize {
        self.grid_width as usize * self.grid_height as usize
    }

    /// Whether a cell lies inside the grid
    pub const fn contains(&self, cell: GridCell) -> bool {
        cell.x < self.grid_width && cell.y < self.grid_height
    }

    /// Pixel rectangle a cell occupies, both in the target and the canvas
    pub const fn cell_rect(&self, cell: GridCell) -> PixelRect {
        PixelRect {
            x: cell.x * self.tile_width,
            y: cell.y * self.tile_height,
            width: self.tile_width,
            height: self.tile_height,
        }
    }

    /// Every cell in row-major order
    pub fn cells(&self) -> Vec<GridCell> {
        (0..self.grid_height)
            .flat_map(|y| (0..self.grid_width).map(move |x| GridCell::new(x, y)))
            .collect()
    }
}

/// Compute tile geometry and a uniformly shuffled processing order
///
/// # Errors
///
/// Returns an error if the geometry is invalid (see [`TileGeometry::new`])
pub fn plan<R: Rng + ?Sized>(
    image_width: u32,
    image_height: u32,
    grid_width: u32,
    grid_height: u32,
    rng: &mut R,
) -> Result<(TileGeometry, Vec<GridCell>)> {
    let geometry = TileGeometry::new(image_width, image_height, grid_width, grid_height)?;
    let mut cells = geometry.cells();
    cells.shuffle(rng);
    Ok((geometry, cells))
}
