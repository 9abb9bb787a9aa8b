use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

/// Spatial object-based verification CLI (argument schema only)
#[derive(Parser, Debug)]
#[command(name = "modeverify", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Match a forecast field against an observation field
    Match(MatchArgs),
}

#[derive(Args, Debug)]
pub struct MatchArgs {
    /// Forecast grid (JSON)
    #[arg(value_hint = ValueHint::FilePath)]
    pub fcst: PathBuf,

    /// Observation grid (JSON)
    #[arg(value_hint = ValueHint::FilePath)]
    pub obs: PathBuf,

    /// Config file (JSON, deserialized into `StaticConfig`)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub config: PathBuf,
}
