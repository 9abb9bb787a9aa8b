//! Per-object colour assignment (spec §6 "ancillary inputs"): matched
//! clusters are painted with one palette entry each, in cluster order;
//! objects belonging to no set are left unmatched.

use crate::engine::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::io::Color;

impl Engine {
    /// `palette[set_number]` for every object whose fcst/obs id belongs
    /// to a set, `None` for unmatched objects. Fails with
    /// [`EngineError::InsufficientColors`] if `palette` has fewer
    /// entries than there are sets (spec §6: "if fewer colours exist
    /// than clusters, the run fails").
    pub fn assign_colors(&self, palette: &[Color]) -> EngineResult<(Vec<Option<Color>>, Vec<Option<Color>>)> {
        let n_sets = self.collection.n_sets();
        if palette.len() < n_sets {
            return Err(EngineError::InsufficientColors { need: n_sets, have: palette.len() });
        }

        let fcst_colors = (1..=self.fcst.n_objects as i32)
            .map(|k| match self.collection.fcst_set_number(k) {
                set_no if set_no >= 0 => Some(palette[set_no as usize]),
                _ => None,
            })
            .collect();
        let obs_colors = (1..=self.obs.n_objects as i32)
            .map(|k| match self.collection.obs_set_number(k) {
                set_no if set_no >= 0 => Some(palette[set_no as usize]),
                _ => None,
            })
            .collect();

        Ok((fcst_colors, obs_colors))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{Config, MatchFlag, MergeFlag, PiecewiseLinear, SingleThresh, StaticConfig};
    use crate::engine::Engine;
    use crate::error::EngineError;
    use crate::grid::ValueGrid;
    use crate::io::Color;
    use std::rc::Rc;

    fn two_blob_config(match_flag: MatchFlag) -> Rc<dyn Config> {
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
            total_interest_thresh: 0.5,
            print_interest_thresh: 0.5,
            fcst_merge_flag: MergeFlag::Off,
            obs_merge_flag: MergeFlag::Off,
            match_flag,
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

    #[test]
    fn matched_objects_get_one_colour_per_cluster() {
        let mut engine = Engine::new(two_blob_config(MatchFlag::MatchMerge));
        engine.run(two_blob_grid(7, 7), two_blob_grid(7, 7)).unwrap();
        assert_eq!(engine.n_sets(), 2);

        let palette = vec![Color(255, 0, 0), Color(0, 255, 0)];
        let (fcst_colors, obs_colors) = engine.assign_colors(&palette).unwrap();
        assert_eq!(fcst_colors.len(), 2);
        assert_eq!(obs_colors.len(), 2);
        assert!(fcst_colors.iter().all(Option::is_some));
        assert!(obs_colors.iter().all(Option::is_some));
        // Both clusters are represented, order unspecified.
        let mut seen: Vec<Color> = fcst_colors.into_iter().flatten().collect();
        seen.sort_by_key(|c| (c.0, c.1, c.2));
        let mut expected = palette.clone();
        expected.sort_by_key(|c| (c.0, c.1, c.2));
        assert_eq!(seen, expected);
    }

    #[test]
    fn unmatched_objects_get_no_colour() {
        let mut engine = Engine::new(two_blob_config(MatchFlag::None));
        engine.run(two_blob_grid(7, 7), two_blob_grid(7, 7)).unwrap();
        assert_eq!(engine.n_sets(), 0);

        let (fcst_colors, obs_colors) = engine.assign_colors(&[]).unwrap();
        assert!(fcst_colors.iter().all(Option::is_none));
        assert!(obs_colors.iter().all(Option::is_none));
    }

    #[test]
    fn fewer_colours_than_clusters_is_an_error() {
        let mut engine = Engine::new(two_blob_config(MatchFlag::MatchMerge));
        engine.run(two_blob_grid(7, 7), two_blob_grid(7, 7)).unwrap();
        assert_eq!(engine.n_sets(), 2);

        let err = engine.assign_colors(&[Color(255, 0, 0)]).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientColors { need: 2, have: 1 }));
    }
}
