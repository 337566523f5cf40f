//! Command-line interface for building a photomosaic from a photo library

use crate::algorithm::executor::{MosaicConfig, MosaicRun, ResampleFilter, create_mosaic};
use crate::io::cache::{JsonFileStore, SignatureStore};
use crate::io::configuration::{
    DEFAULT_FIDELITY, DEFAULT_GRID_HEIGHT, DEFAULT_GRID_WIDTH, DEFAULT_LOG_FILTER,
    OUTPUT_EXTENSION, OUTPUT_SUFFIX, QUIET_LOG_FILTER,
};
use crate::io::error::Result;
use crate::io::image::export_mosaic;
use crate::io::progress::ProgressManager;
use crate::spatial::matcher::ReusePolicy;
use clap::{Parser, ValueEnum};
use log::info;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Resampling filter names accepted on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FilterArg {
    /// Nearest-neighbor sampling
    Nearest,
    /// Bilinear interpolation
    Bilinear,
}

impl From<FilterArg> for ResampleFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::Nearest => Self::Nearest,
            FilterArg::Bilinear => Self::Bilinear,
        }
    }
}

#[derive(Parser)]
#[command(name = "truman")]
#[command(
    author,
    version,
    about = "Rebuild an image as a mosaic of photos from a library"
)]
/// Command-line arguments for the mosaic tool
pub struct Cli {
    /// Image to reproduce
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Directory searched recursively for .jpg/.jpeg photos
    #[arg(value_name = "LIBRARY")]
    pub library: PathBuf,

    /// Output file (format follows the extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of tile columns
    #[arg(short = 'W', long, default_value_t = DEFAULT_GRID_WIDTH)]
    pub grid_width: u32,

    /// Number of tile rows
    #[arg(short = 'H', long, default_value_t = DEFAULT_GRID_HEIGHT)]
    pub grid_height: u32,

    /// Signature resolution (NxN color blocks per image)
    #[arg(short, long, default_value_t = DEFAULT_FIDELITY)]
    pub fidelity: u32,

    /// Random seed for a reproducible cell order
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Number of worker threads
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Reuse photos once the library is exhausted instead of failing
    #[arg(long)]
    pub allow_reuse: bool,

    /// Resampling filter for tiles
    #[arg(long, value_enum, default_value_t = FilterArg::Bilinear)]
    pub filter: FilterArg,

    /// Neither read nor write the signature cache
    #[arg(long)]
    pub no_cache: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }

    /// Log filter used when `RUST_LOG` is not set
    pub const fn log_filter(&self) -> &'static str {
        if self.quiet {
            QUIET_LOG_FILTER
        } else {
            DEFAULT_LOG_FILTER
        }
    }

    /// Mosaic parameters selected by the arguments
    pub fn config(&self) -> MosaicConfig {
        MosaicConfig {
            grid_width: self.grid_width,
            grid_height: self.grid_height,
            fidelity: self.fidelity,
            seed: self.seed,
            threads: self.threads,
            reuse: if self.allow_reuse {
                ReusePolicy::WhenExhausted
            } else {
                ReusePolicy::Never
            },
            filter: self.filter.into(),
        }
    }

    /// Where the mosaic will be written
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.target))
    }
}

/// Runs one mosaic from parsed arguments and writes the result
pub struct MosaicRunner {
    cli: Cli,
    progress_manager: ProgressManager,
}

impl MosaicRunner {
    /// Create a runner for the given CLI arguments
    pub fn new(cli: Cli) -> Self {
        let progress_manager = if cli.should_show_progress() {
            ProgressManager::new()
        } else {
            ProgressManager::hidden()
        };

        Self {
            cli,
            progress_manager,
        }
    }

    /// Index the library, assemble the mosaic and save it
    ///
    /// # Errors
    ///
    /// Returns an error if indexing, assembly or export fails; cache failures
    /// are only logged
    pub fn process(&mut self) -> Result<MosaicRun> {
        let start_time = Instant::now();
        let config = self.cli.config();
        let store = (!self.cli.no_cache).then(|| JsonFileStore::for_library(&self.cli.library));

        let run = create_mosaic(
            &self.cli.target,
            &self.cli.library,
            &config,
            store.as_ref().map(|store| store as &dyn SignatureStore),
            Some(&self.progress_manager),
        );
        self.progress_manager.finish();
        let run = run?;

        let output_path = self.cli.output_path();
        export_mosaic(&run.mosaic.image, &output_path)?;

        info!(
            "Wrote {}x{} mosaic to {} (mean distance {:.2}) in {:.1?}",
            run.mosaic.image.width(),
            run.mosaic.image.height(),
            output_path.display(),
            run.mosaic.mean_distance(),
            start_time.elapsed()
        );

        Ok(run)
    }
}

/// Default output location: `<target stem>_mosaic.jpg` beside the target
pub fn default_output_path(target: &Path) -> PathBuf {
    let stem = target.file_stem().unwrap_or_default();
    let output_name = format!(
        "{}{}.{}",
        stem.to_string_lossy(),
        OUTPUT_SUFFIX,
        OUTPUT_EXTENSION
    );

    if let Some(parent) = target.parent() {
        parent.join(output_name)
    } else {
        PathBuf::from(output_name)
    }
}
