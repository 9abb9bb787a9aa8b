//! Pre-merge passes applied to one side before cross-field matching
//! (spec §4.8 "Pre-merge: threshold-only" / "Pre-merge: fuzzy-engine").

use std::collections::HashSet;
use std::rc::Rc;

use log::debug;

use crate::config::{
    Config, MatchFlag, MergeFlag, PiecewiseLinear, SingleThresh,
};
use crate::engine::engine::Engine;
use crate::engine::state::require;
use crate::error::{EngineResult, Side};
use crate::mask;

/// Wraps a parent [`Config`] for the fuzzy-engine pre-merge sub-engine,
/// forcing both merge flags to [`MergeFlag::Off`] so `sub.do_match_merge`
/// can never re-enter `fuzzy_engine_premerge` (spec §4.8's sub-engine
/// runs matching only, never its own pre-merge pass).
struct NoMergeConfig {
    inner: Rc<dyn Config>,
}

impl Config for NoMergeConfig {
    fn fcst_raw_thresh(&self) -> SingleThresh { self.inner.fcst_raw_thresh() }
    fn obs_raw_thresh(&self) -> SingleThresh { self.inner.obs_raw_thresh() }
    fn fcst_conv_thresh(&self) -> SingleThresh { self.inner.fcst_conv_thresh() }
    fn obs_conv_thresh(&self) -> SingleThresh { self.inner.obs_conv_thresh() }
    fn fcst_area_thresh(&self) -> SingleThresh { self.inner.fcst_area_thresh() }
    fn obs_area_thresh(&self) -> SingleThresh { self.inner.obs_area_thresh() }
    fn fcst_inten_perc(&self) -> u8 { self.inner.fcst_inten_perc() }
    fn obs_inten_perc(&self) -> u8 { self.inner.obs_inten_perc() }
    fn fcst_inten_perc_thresh(&self) -> SingleThresh { self.inner.fcst_inten_perc_thresh() }
    fn obs_inten_perc_thresh(&self) -> SingleThresh { self.inner.obs_inten_perc_thresh() }
    fn fcst_merge_thresh(&self) -> SingleThresh { self.inner.fcst_merge_thresh() }
    fn obs_merge_thresh(&self) -> SingleThresh { self.inner.obs_merge_thresh() }
    fn fcst_conv_radius(&self) -> usize { self.inner.fcst_conv_radius() }
    fn obs_conv_radius(&self) -> usize { self.inner.obs_conv_radius() }
    fn zero_border_size(&self) -> usize { self.inner.zero_border_size() }
    fn bad_data_thresh(&self) -> f64 { self.inner.bad_data_thresh() }
    fn intensity_percentile(&self) -> u8 { self.inner.intensity_percentile() }
    fn max_centroid_dist(&self) -> f64 { self.inner.max_centroid_dist() }
    fn total_interest_thresh(&self) -> f64 { self.inner.total_interest_thresh() }
    fn print_interest_thresh(&self) -> f64 { self.inner.print_interest_thresh() }
    fn fcst_merge_flag(&self) -> MergeFlag { MergeFlag::Off }
    fn obs_merge_flag(&self) -> MergeFlag { MergeFlag::Off }
    fn match_flag(&self) -> MatchFlag { self.inner.match_flag() }

    fn centroid_dist_weight(&self) -> f64 { self.inner.centroid_dist_weight() }
    fn boundary_dist_weight(&self) -> f64 { self.inner.boundary_dist_weight() }
    fn convex_hull_dist_weight(&self) -> f64 { self.inner.convex_hull_dist_weight() }
    fn angle_diff_weight(&self) -> f64 { self.inner.angle_diff_weight() }
    fn area_ratio_weight(&self) -> f64 { self.inner.area_ratio_weight() }
    fn int_area_ratio_weight(&self) -> f64 { self.inner.int_area_ratio_weight() }
    fn complexity_ratio_weight(&self) -> f64 { self.inner.complexity_ratio_weight() }
    fn intensity_ratio_weight(&self) -> f64 { self.inner.intensity_ratio_weight() }

    fn centroid_dist_if(&self) -> &PiecewiseLinear { self.inner.centroid_dist_if() }
    fn boundary_dist_if(&self) -> &PiecewiseLinear { self.inner.boundary_dist_if() }
    fn convex_hull_dist_if(&self) -> &PiecewiseLinear { self.inner.convex_hull_dist_if() }
    fn angle_diff_if(&self) -> &PiecewiseLinear { self.inner.angle_diff_if() }
    fn area_ratio_if(&self) -> &PiecewiseLinear { self.inner.area_ratio_if() }
    fn int_area_ratio_if(&self) -> &PiecewiseLinear { self.inner.int_area_ratio_if() }
    fn complexity_ratio_if(&self) -> &PiecewiseLinear { self.inner.complexity_ratio_if() }
    fn ratio_if(&self) -> &PiecewiseLinear { self.inner.ratio_if() }
    fn intensity_ratio_if(&self) -> &PiecewiseLinear { self.inner.intensity_ratio_if() }

    fn area_ratio_conf(&self) -> &PiecewiseLinear { self.inner.area_ratio_conf() }
    fn aspect_ratio_conf(&self) -> &PiecewiseLinear { self.inner.aspect_ratio_conf() }

    fn max_singles(&self) -> usize { self.inner.max_singles() }

    fn mode_color_table(&self) -> &str { self.inner.mode_color_table() }
}

impl Engine {
    /// Run whichever pre-merge passes `side`'s [`MergeFlag`] selects.
    pub(crate) fn do_merging_for(&mut self, side: Side) -> EngineResult<()> {
        let flag = match side {
            Side::Fcst => self.config.fcst_merge_flag(),
            Side::Obs => self.config.obs_merge_flag(),
        };
        if flag == MergeFlag::Off {
            return Ok(());
        }
        if flag.uses_thresh() {
            self.threshold_only_premerge(side)?;
        }
        if flag.uses_engine() {
            self.fuzzy_engine_premerge(side)?;
        }
        Ok(())
    }

    /// Apply a looser `merge_thresh` to the convolved field, split it
    /// into merge-shapes, and for every merge-shape containing at least
    /// two whole simple shapes, add one pre-merge set spanning them.
    fn threshold_only_premerge(&mut self, side: Side) -> EngineResult<()> {
        let state = match side {
            Side::Fcst => &self.fcst,
            Side::Obs => &self.obs,
        };
        let conv = require(&state.conv, "threshold_only_premerge: conv grid missing")?;
        let split = require(&state.split, "threshold_only_premerge: split grid missing")?;
        let n_objects = state.n_objects;

        let merge_thresh = match side {
            Side::Fcst => self.config.fcst_merge_thresh(),
            Side::Obs => self.config.obs_merge_thresh(),
        };
        let merge_mask = conv.threshold_double(merge_thresh);
        let (merge_shapes, n_merge) = mask::split(&merge_mask);

        for m in 1..=(n_merge as i32) {
            let m_pixels: HashSet<(usize, usize)> = merge_shapes.pixels_equal(m).into_iter().collect();
            let mut group: Vec<i32> = Vec::new();
            for k in 1..=(n_objects as i32) {
                let simple_pixels = split.pixels_equal(k);
                if simple_pixels.is_empty() {
                    continue;
                }
                let inside = simple_pixels.iter().filter(|p| m_pixels.contains(p)).count();
                if inside >= simple_pixels.len() {
                    group.push(k);
                }
            }
            if group.len() >= 2 {
                debug!("threshold_only_premerge[{side}]: merge-shape {m} groups {group:?}");
                match side {
                    Side::Fcst => self.collection.add_group(&group, &[]),
                    Side::Obs => self.collection.add_group(&[], &group),
                }
            }
        }
        Ok(())
    }

    /// Build a sub-engine whose fcst and obs inputs are both this side's
    /// already-derived field, seed it with this side's pre-merge sets so
    /// far, run its own full match-merge, and promote every multi-member
    /// result back into the parent's collection.
    fn fuzzy_engine_premerge(&mut self, side: Side) -> EngineResult<()> {
        let state = match side {
            Side::Fcst => self.fcst.clone(),
            Side::Obs => self.obs.clone(),
        };

        let sub_config: Rc<dyn Config> = Rc::new(NoMergeConfig { inner: self.config.clone() });
        let mut sub = Engine::seeded_from_side(sub_config, &state)?;
        for set in self.collection.sets() {
            let ids: Vec<i32> = match side {
                Side::Fcst => set.fcst_ids.clone(),
                Side::Obs => set.obs_ids.clone(),
            };
            if ids.len() >= 2 {
                match side {
                    Side::Fcst => sub.collection.add_group(&ids, &[]),
                    Side::Obs => sub.collection.add_group(&[], &ids),
                }
            }
        }

        sub.compute_singles()?;
        sub.do_match_merge()?;

        for set in sub.collection.sets() {
            let ids: Vec<i32> = match side {
                Side::Fcst => set.fcst_ids.clone(),
                Side::Obs => set.obs_ids.clone(),
            };
            if ids.len() >= 2 {
                match side {
                    Side::Fcst => self.collection.add_group(&ids, &[]),
                    Side::Obs => self.collection.add_group(&[], &ids),
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticConfig;
    use crate::grid::ValueGrid;

    fn engine_only_config() -> Rc<dyn Config> {
        let rising = PiecewiseLinear::new(vec![(0.0, 1.0), (10.0, 0.0)]).unwrap();
        let falling = PiecewiseLinear::new(vec![(0.0, 0.0), (1.0, 1.0)]).unwrap();
        Rc::new(StaticConfig {
            fcst_raw_thresh: SingleThresh::gt(0.0),
            obs_raw_thresh: SingleThresh::gt(0.0),
            fcst_conv_thresh: SingleThresh::gt(0.0),
            obs_conv_thresh: SingleThresh::gt(0.0),
            fcst_area_thresh: SingleThresh::gt(0.0),
            obs_area_thresh: SingleThresh::gt(0.0),
            fcst_inten_perc: 50,
            obs_inten_perc: 50,
            fcst_inten_perc_thresh: SingleThresh::gt(-10_000.0),
            obs_inten_perc_thresh: SingleThresh::gt(-10_000.0),
            fcst_merge_thresh: SingleThresh::gt(0.0),
            obs_merge_thresh: SingleThresh::gt(0.0),
            fcst_conv_radius: 0,
            obs_conv_radius: 0,
            zero_border_size: 0,
            bad_data_thresh: 1.0,
            intensity_percentile: 50,
            max_centroid_dist: 100.0,
            total_interest_thresh: 0.1,
            print_interest_thresh: 0.5,
            fcst_merge_flag: MergeFlag::EngineOnly,
            obs_merge_flag: MergeFlag::EngineOnly,
            match_flag: MatchFlag::MatchMerge,
            centroid_dist_weight: 1.0,
            boundary_dist_weight: 0.0,
            convex_hull_dist_weight: 0.0,
            angle_diff_weight: 0.0,
            area_ratio_weight: 0.0,
            int_area_ratio_weight: 0.0,
            complexity_ratio_weight: 0.0,
            intensity_ratio_weight: 0.0,
            centroid_dist_if: rising.clone(),
            boundary_dist_if: rising.clone(),
            convex_hull_dist_if: rising.clone(),
            angle_diff_if: rising,
            area_ratio_if: falling.clone(),
            int_area_ratio_if: falling.clone(),
            complexity_ratio_if: falling.clone(),
            ratio_if: falling.clone(),
            intensity_ratio_if: falling,
            area_ratio_conf: PiecewiseLinear::constant(1.0),
            aspect_ratio_conf: PiecewiseLinear::constant(1.0),
            max_singles: 10,
            mode_color_table: String::new(),
        })
    }

    fn two_blob_grid(nx: usize, ny: usize) -> ValueGrid {
        let mut g = ValueGrid::new(nx, ny);
        for &(x, y) in &[(1, 1), (2, 1), (1, 2), (2, 2)] {
            g.set(x, y, 5.0);
        }
        for &(x, y) in &[(4, 4), (5, 4), (4, 5), (5, 5)] {
            g.set(x, y, 5.0);
        }
        g
    }

    /// `MergeFlag::EngineOnly` used to hand the sub-engine the same
    /// config as the parent, so its own `do_match_merge` re-entered
    /// `fuzzy_engine_premerge` and recursed without bound. This must
    /// return instead of overflowing the stack.
    #[test]
    fn engine_only_premerge_does_not_recurse() {
        let cfg = engine_only_config();
        let mut engine = Engine::new(cfg);
        let fcst = two_blob_grid(7, 7);
        let obs = two_blob_grid(7, 7);
        engine.set(fcst, obs).unwrap();
        engine.do_merging_for(Side::Fcst).unwrap();
        engine.do_merging_for(Side::Obs).unwrap();
    }
}
