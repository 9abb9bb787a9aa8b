use std::fs;
use std::rc::Rc;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::cli::{Cli, MatchArgs};
use crate::config::{Config, StaticConfig};
use crate::engine::Engine;
use crate::grid::ValueGrid;
use crate::io::{GridReader, JsonGridReader, JsonPaletteReader, PaletteReader};

pub fn run_match(_cli: &Cli, args: &MatchArgs) -> Result<()> {
    debug!(
        "match: fcst={} obs={} config={}",
        args.fcst.display(),
        args.obs.display(),
        args.config.display()
    );

    let config_bytes = fs::read(&args.config)
        .with_context(|| format!("reading config file {}", args.config.display()))?;
    let config: StaticConfig = serde_json::from_slice(&config_bytes)
        .with_context(|| format!("parsing config file {}", args.config.display()))?;
    config.validate().context("config out of range")?;

    let reader = JsonGridReader;
    let fcst: ValueGrid = reader
        .read(&args.fcst)
        .with_context(|| format!("reading forecast grid {}", args.fcst.display()))?;
    let obs: ValueGrid = reader
        .read(&args.obs)
        .with_context(|| format!("reading observation grid {}", args.obs.display()))?;

    let print_interest_thresh = config.print_interest_thresh();
    let mode_color_table = config.mode_color_table().to_string();
    let mut engine = Engine::new(Rc::new(config) as Rc<dyn Config>);
    engine.run(fcst, obs).context("running match/merge")?;

    info!(
        "match: n_fcst={} n_obs={} n_clus={}",
        engine.fcst_singles().len(),
        engine.obs_singles().len(),
        engine.n_sets()
    );
    println!(
        "n_fcst={} n_obs={} n_clus={}",
        engine.fcst_singles().len(),
        engine.obs_singles().len(),
        engine.n_sets()
    );
    for (i, &interest) in engine.cluster_interest().iter().enumerate() {
        if interest >= print_interest_thresh {
            println!("cluster {:>3}: total_interest={interest:.4}", i + 1);
        }
    }

    if !mode_color_table.is_empty() {
        let palette = JsonPaletteReader
            .read(std::path::Path::new(&mode_color_table))
            .with_context(|| format!("reading colour table {mode_color_table}"))?;
        let (fcst_colors, obs_colors) = engine.assign_colors(&palette).context("assigning cluster colours")?;
        let n_unmatched = fcst_colors.iter().chain(&obs_colors).filter(|c| c.is_none()).count();
        info!("match: painted {} clusters, {n_unmatched} unmatched objects", engine.n_sets());
    }

    Ok(())
}
