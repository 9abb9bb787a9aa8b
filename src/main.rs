use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use modeverify::cli::{Cli, Commands};
use modeverify::commands::run_match;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();

    match &cli.command {
        Commands::Match(args) => run_match(&cli, args),
    }
}
