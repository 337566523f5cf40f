//! CLI entry point for the photomosaic builder

use clap::Parser;
use truman::io::cli::{Cli, MosaicRunner};

fn main() -> truman::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .init();

    let mut runner = MosaicRunner::new(cli);
    runner.process().map(|_| ())
}
