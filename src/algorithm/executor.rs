use crate::{
    analysis::library::{BuildReport, LibraryIndex},
    analysis::signature::sample_region,
    io::cache::SignatureStore,
    io::configuration::{
        DEFAULT_FIDELITY, DEFAULT_GRID_HEIGHT, DEFAULT_GRID_WIDTH, MAX_FIDELITY, MAX_GRID_DIMENSION,
    },
    io::error::{
        MosaicError, Result, WithContext, computation_error, invalid_geometry, invalid_parameter,
    },
    io::image::load_rgb,
    io::progress::ProgressManager,
    spatial::canvas::Canvas,
    spatial::grid::{GridCell, TileGeometry, plan},
    spatial::matcher::{NearestMatcher, ReusePolicy},
};
use image::RgbImage;
use image::imageops::{self, FilterType};
use indicatif::ProgressBar;
use log::{debug, info};
use rand::{SeedableRng, rngs::StdRng};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Resampling used when shrinking a library photo to tile size
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResampleFilter {
    /// Nearest-neighbor sampling
    Nearest,
    /// Bilinear interpolation
    #[default]
    Bilinear,
}

impl ResampleFilter {
    /// Equivalent `image` filter
    pub const fn filter_type(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear => FilterType::Triangle,
        }
    }
}

/// Mosaic parameters shared by library indexing and assembly
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MosaicConfig {
    /// Number of tile columns
    pub grid_width: u32,
    /// Number of tile rows
    pub grid_height: u32,
    /// Signature resolution used for both the library and the tiles
    pub fidelity: u32,
    /// Seed for the cell order; `None` draws a fresh seed every run
    pub seed: Option<u64>,
    /// Worker count; `None` uses the available parallelism
    pub threads: Option<usize>,
    /// Behavior once the library runs out of unclaimed photos
    pub reuse: ReusePolicy,
    /// Resampling used for tiles
    pub filter: ResampleFilter,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            grid_width: DEFAULT_GRID_WIDTH,
            grid_height: DEFAULT_GRID_HEIGHT,
            fidelity: DEFAULT_FIDELITY,
            seed: None,
            threads: None,
            reuse: ReusePolicy::Never,
            filter: ResampleFilter::Bilinear,
        }
    }
}

impl MosaicConfig {
    /// Check parameter ranges that do not depend on the target image
    ///
    /// # Errors
    ///
    /// Returns an error if a grid dimension, the fidelity or the thread count
    /// is zero or above its limit
    pub fn validate(&self) -> Result<()> {
        for (parameter, value) in [
            ("grid_width", self.grid_width),
            ("grid_height", self.grid_height),
        ] {
            if value == 0 || value > MAX_GRID_DIMENSION {
                return Err(invalid_parameter(
                    parameter,
                    &value,
                    &format!("must be between 1 and {MAX_GRID_DIMENSION}"),
                ));
            }
        }

        if self.fidelity == 0 || self.fidelity > MAX_FIDELITY {
            return Err(invalid_parameter(
                "fidelity",
                &self.fidelity,
                &format!("must be between 1 and {MAX_FIDELITY}"),
            ));
        }

        if self.threads == Some(0) {
            return Err(invalid_parameter("threads", &0, &"must be at least 1"));
        }

        Ok(())
    }
}

/// Library photo assigned to a grid cell
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    /// Cell the photo fills
    pub cell: GridCell,
    /// Path identifier of the photo
    pub path: PathBuf,
    /// Signature distance between the cell and the photo
    pub distance: f64,
    /// Whether the photo also fills another cell
    pub reused: bool,
}

/// Finished mosaic and the assignment that produced it
#[derive(Debug)]
pub struct Mosaic {
    /// Composited output, cropped to whole tiles
    pub image: RgbImage,
    /// Tile layout
    pub geometry: TileGeometry,
    /// One placement per cell, in row-major order
    pub placements: Vec<Placement>,
}

impl Mosaic {
    /// Mean signature distance over all cells
    pub fn mean_distance(&self) -> f64 {
        if self.placements.is_empty() {
            return 0.0;
        }
        self.placements.iter().map(|p| p.distance).sum::<f64>() / self.placements.len() as f64
    }
}

/// Mosaic together with the library build that fed it
#[derive(Debug)]
pub struct MosaicRun {
    /// Assembled mosaic
    pub mosaic: Mosaic,
    /// Library indexing statistics and cache failures
    pub library: BuildReport,
}

/// Run `assign` for every cell on a bounded worker pool
///
/// Cells are processed concurrently in no particular order. The first failure
/// stops the remaining work and is returned tagged with its cell.
///
/// # Errors
///
/// Returns an error if the worker pool cannot be created or any cell fails
pub fn dispatch<F>(cells: &[GridCell], threads: Option<usize>, assign: F) -> Result<()>
where
    F: Fn(GridCell) -> Result<()> + Sync,
{
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = threads {
        builder = builder.num_threads(threads);
    }
    let pool = builder
        .build()
        .map_err(|e| computation_error("worker pool", &e))?;

    pool.install(|| {
        cells
            .par_iter()
            .try_for_each(|&cell| assign(cell).with_cell(cell.coordinates()))
    })
}

/// Replace every cell of `target` with the closest unclaimed library photo
///
/// Nothing is returned unless every cell was filled.
///
/// # Errors
///
/// Returns an error if:
/// - The configuration is invalid or its fidelity differs from the matcher's
/// - The grid is finer than the target, or the fidelity finer than a tile
/// - The library holds fewer photos than cells and reuse is not allowed
/// - A claimed photo cannot be decoded
pub fn assemble(
    target: &RgbImage,
    matcher: &NearestMatcher,
    config: &MosaicConfig,
    progress: Option<&ProgressBar>,
) -> Result<Mosaic> {
    config.validate()?;
    if matcher.fidelity() != config.fidelity {
        return Err(invalid_parameter(
            "fidelity",
            &config.fidelity,
            &format!("library was indexed at fidelity {}", matcher.fidelity()),
        ));
    }

    let mut rng = config
        .seed
        .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
    let (geometry, cells) = plan(
        target.width(),
        target.height(),
        config.grid_width,
        config.grid_height,
        &mut rng,
    )?;

    if geometry.tile_width < config.fidelity || geometry.tile_height < config.fidelity {
        return Err(invalid_geometry(&format!(
            "fidelity {} is finer than the {}x{} tiles",
            config.fidelity, geometry.tile_width, geometry.tile_height
        )));
    }

    let required = geometry.cell_count();
    let available = matcher.remaining()?;
    if !matcher.allows_reuse() && available < required {
        return Err(MosaicError::LibraryExhausted {
            available,
            required,
        });
    }

    info!(
        "Assembling {}x{} grid of {}x{} tiles from {available} photo(s)",
        geometry.grid_width, geometry.grid_height, geometry.tile_width, geometry.tile_height
    );

    if let Some(bar) = progress {
        bar.set_length(required as u64);
    }

    let canvas = Canvas::new(geometry);
    let placements = Mutex::new(Vec::with_capacity(required));
    let filter = config.filter.filter_type();

    dispatch(&cells, config.threads, |cell| {
        debug!("Working on {},{}", cell.x, cell.y);
        let rect = geometry.cell_rect(cell);
        let region = imageops::crop_imm(target, rect.x, rect.y, rect.width, rect.height);
        let signature = sample_region(&*region, config.fidelity)?;

        let claim = matcher.claim_signature(&signature)?;
        debug!(
            "Found {} for {},{}",
            claim.path.display(),
            cell.x,
            cell.y
        );

        let photo = load_rgb(&claim.path)?;
        let tile = imageops::resize(&photo, rect.width, rect.height, filter);
        canvas.paste(rect.x, rect.y, &tile)?;

        placements
            .lock()
            .map_err(|e| computation_error("placement log", &e))?
            .push(Placement {
                cell,
                path: claim.path,
                distance: claim.distance,
                reused: claim.reused,
            });

        if let Some(bar) = progress {
            bar.inc(1);
        }
        Ok(())
    })?;

    let image = canvas.into_image()?;
    let mut placements = placements
        .into_inner()
        .map_err(|e| computation_error("placement log", &e))?;
    placements.sort_by_key(|placement| (placement.cell.y, placement.cell.x));

    Ok(Mosaic {
        image,
        geometry,
        placements,
    })
}

/// Index `library`, then build a mosaic of the image at `target`
///
/// The cache store is read and rewritten before assembly starts.
///
/// # Errors
///
/// Returns an error if the target cannot be decoded, the library root cannot
/// be read, or assembly fails (see [`assemble`])
pub fn create_mosaic(
    target: &Path,
    library: &Path,
    config: &MosaicConfig,
    store: Option<&dyn SignatureStore>,
    progress: Option<&ProgressManager>,
) -> Result<MosaicRun> {
    config.validate()?;
    let target_image = load_rgb(target)?;

    let indexing = progress.map(|pm| pm.phase("Indexing"));
    let build = LibraryIndex::new(library, config.fidelity).build(store, indexing.as_ref())?;
    if let Some(bar) = &indexing {
        bar.finish();
    }

    let matcher = NearestMatcher::new(build.entries, config.reuse)?;

    let assembling = progress.map(|pm| pm.phase("Assembling"));
    let mosaic = assemble(&target_image, &matcher, config, assembling.as_ref())?;
    if let Some(bar) = &assembling {
        bar.finish();
    }

    Ok(MosaicRun {
        mosaic,
        library: build.report,
    })
}
