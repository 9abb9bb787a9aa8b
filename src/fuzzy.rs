//! Fuzzy-logic interest aggregation (spec §4.6), confirmed against the
//! original engine's `total_interest_print`: total interest is a
//! confidence-weighted sum of per-attribute interest values, normalised
//! by the sum of the weights actually used.

use crate::config::Config;
use crate::features::PairFeature;
use crate::grid::BAD_DATA;

/// One term of the weighted sum, exposed for diagnostics
/// ([`FuzzyInterest::total_interest_explain`]).
#[derive(Clone, Copy, Debug)]
pub struct InterestTerm {
    pub name: &'static str,
    pub weight: f64,
    pub interest: f64,
    pub confidence: f64,
}

impl InterestTerm {
    #[inline]
    fn contribution(&self) -> f64 {
        self.weight * self.interest * self.confidence
    }

    #[inline]
    fn normalizer(&self) -> f64 {
        self.weight * self.confidence
    }
}

/// Computes and aggregates fuzzy-logic interest from a [`PairFeature`].
pub struct FuzzyInterest;

impl FuzzyInterest {
    /// The confidence-weighted total interest in `[0,1]` for a pair.
    /// Vetoed pairs and pairs whose terms all carry zero weight*confidence
    /// report [`BAD_DATA`] (spec §4.6: "if the denominator is zero, the
    /// pair interest is the bad-data sentinel").
    pub fn total_interest(cfg: &dyn Config, pf: &PairFeature) -> f64 {
        Self::total_interest_explain(cfg, pf).0
    }

    /// As [`Self::total_interest`], but also returns each term for
    /// diagnostic reporting (supplemented from the original's verbose
    /// per-attribute interest printout).
    pub fn total_interest_explain(cfg: &dyn Config, pf: &PairFeature) -> (f64, Vec<InterestTerm>) {
        if pf.is_vetoed() {
            return (BAD_DATA, Vec::new());
        }
        let terms = Self::terms(cfg, pf);
        let num: f64 = terms.iter().map(InterestTerm::contribution).sum();
        let den: f64 = terms.iter().map(InterestTerm::normalizer).sum();
        let total = if den <= 0.0 { BAD_DATA } else { (num / den).clamp(0.0, 1.0) };
        (total, terms)
    }

    fn terms(cfg: &dyn Config, pf: &PairFeature) -> Vec<InterestTerm> {
        let aspect_conf = (cfg.aspect_ratio_conf().call(pf.obs_aspect_ratio)
            * cfg.aspect_ratio_conf().call(pf.fcst_aspect_ratio))
        .max(0.0)
        .sqrt();

        let complexity_interest = if pf.complexity_degenerate {
            cfg.ratio_if().call(pf.complexity_ratio)
        } else {
            cfg.complexity_ratio_if().call(pf.complexity_ratio)
        };

        vec![
            InterestTerm {
                name: "centroid_dist",
                weight: cfg.centroid_dist_weight(),
                interest: cfg.centroid_dist_if().call(pf.centroid_dist),
                confidence: cfg.area_ratio_conf().call(pf.area_ratio),
            },
            InterestTerm {
                name: "boundary_dist",
                weight: cfg.boundary_dist_weight(),
                interest: cfg.boundary_dist_if().call(pf.boundary_dist),
                confidence: 1.0,
            },
            InterestTerm {
                name: "convex_hull_dist",
                weight: cfg.convex_hull_dist_weight(),
                interest: cfg.convex_hull_dist_if().call(pf.convex_hull_dist),
                confidence: 1.0,
            },
            InterestTerm {
                name: "angle_diff",
                weight: cfg.angle_diff_weight(),
                interest: cfg.angle_diff_if().call(pf.angle_diff),
                confidence: aspect_conf,
            },
            InterestTerm {
                name: "area_ratio",
                weight: cfg.area_ratio_weight(),
                interest: cfg.area_ratio_if().call(pf.area_ratio),
                confidence: 1.0,
            },
            InterestTerm {
                name: "int_area_ratio",
                weight: cfg.int_area_ratio_weight(),
                interest: cfg.int_area_ratio_if().call(pf.int_area_ratio),
                confidence: 1.0,
            },
            InterestTerm {
                name: "complexity_ratio",
                weight: cfg.complexity_ratio_weight(),
                interest: complexity_interest,
                confidence: 1.0,
            },
            InterestTerm {
                name: "intensity_ratio",
                weight: cfg.intensity_ratio_weight(),
                interest: cfg.intensity_ratio_if().call(pf.intensity_ratio),
                confidence: 1.0,
            },
        ]
    }

    /// The `pct`-percentile of total interest across `values`
    /// (supplemented diagnostic: the original reports this alongside
    /// the interest histogram to characterize a whole match set).
    pub fn interest_percentile(values: &[f64], pct: f64) -> f64 {
        crate::mask::percentile(values, pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MatchFlag, MergeFlag, PiecewiseLinear, SingleThresh, StaticConfig};

    fn test_config() -> StaticConfig {
        let rising = PiecewiseLinear::new(vec![(0.0, 1.0), (10.0, 0.0)]).unwrap();
        let falling = PiecewiseLinear::new(vec![(0.0, 0.0), (1.0, 1.0)]).unwrap();
        StaticConfig {
            fcst_raw_thresh: SingleThresh::gt(0.0),
            obs_raw_thresh: SingleThresh::gt(0.0),
            fcst_conv_thresh: SingleThresh::gt(0.0),
            obs_conv_thresh: SingleThresh::gt(0.0),
            fcst_area_thresh: SingleThresh::gt(0.0),
            obs_area_thresh: SingleThresh::gt(0.0),
            fcst_inten_perc: 50,
            obs_inten_perc: 50,
            fcst_inten_perc_thresh: SingleThresh::gt(0.0),
            obs_inten_perc_thresh: SingleThresh::gt(0.0),
            fcst_merge_thresh: SingleThresh::gt(0.0),
            obs_merge_thresh: SingleThresh::gt(0.0),
            fcst_conv_radius: 1,
            obs_conv_radius: 1,
            zero_border_size: 1,
            bad_data_thresh: 0.5,
            intensity_percentile: 50,
            max_centroid_dist: 1000.0,
            total_interest_thresh: 0.7,
            print_interest_thresh: 0.5,
            fcst_merge_flag: MergeFlag::Both,
            obs_merge_flag: MergeFlag::Both,
            match_flag: MatchFlag::MatchMerge,
            centroid_dist_weight: 4.0,
            boundary_dist_weight: 2.0,
            convex_hull_dist_weight: 2.0,
            angle_diff_weight: 2.0,
            area_ratio_weight: 2.0,
            int_area_ratio_weight: 2.0,
            complexity_ratio_weight: 1.0,
            intensity_ratio_weight: 1.0,
            centroid_dist_if: rising.clone(),
            boundary_dist_if: rising.clone(),
            convex_hull_dist_if: rising.clone(),
            angle_diff_if: rising.clone(),
            area_ratio_if: falling.clone(),
            int_area_ratio_if: falling.clone(),
            complexity_ratio_if: falling.clone(),
            ratio_if: falling.clone(),
            intensity_ratio_if: falling,
            area_ratio_conf: PiecewiseLinear::constant(1.0),
            aspect_ratio_conf: PiecewiseLinear::constant(1.0),
            max_singles: 1000,
            mode_color_table: String::new(),
        }
    }

    fn perfect_pair() -> PairFeature {
        PairFeature {
            pair_number: 0,
            fcst_index: 0,
            obs_index: 0,
            centroid_dist: 0.0,
            boundary_dist: 0.0,
            convex_hull_dist: 0.0,
            angle_diff: 0.0,
            area_ratio: 1.0,
            intersection_area: 1.0,
            union_area: 1.0,
            symmetric_diff: 0.0,
            int_area_ratio: 1.0,
            complexity_ratio: 1.0,
            complexity_degenerate: false,
            intensity_ratio: 1.0,
            fcst_aspect_ratio: 1.0,
            obs_aspect_ratio: 1.0,
        }
    }

    #[test]
    fn perfect_match_has_total_interest_near_one() {
        let cfg = test_config();
        let pf = perfect_pair();
        let total = FuzzyInterest::total_interest(&cfg, &pf);
        approx::assert_relative_eq!(total, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn vetoed_pair_has_bad_data_interest() {
        let cfg = test_config();
        let mut pf = perfect_pair();
        pf.centroid_dist = BAD_DATA;
        assert_eq!(FuzzyInterest::total_interest(&cfg, &pf), BAD_DATA);
    }

    #[test]
    fn explain_returns_one_term_per_weight() {
        let cfg = test_config();
        let pf = perfect_pair();
        let (total, terms) = FuzzyInterest::total_interest_explain(&cfg, &pf);
        assert_eq!(terms.len(), 8);
        approx::assert_relative_eq!(total, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_complexity_uses_backup_ratio_curve() {
        let cfg = test_config();
        let mut pf = perfect_pair();
        pf.complexity_degenerate = true;
        pf.complexity_ratio = 0.25;
        let (_total, terms) = FuzzyInterest::total_interest_explain(&cfg, &pf);
        let complexity_term = terms.iter().find(|t| t.name == "complexity_ratio").unwrap();
        approx::assert_relative_eq!(complexity_term.interest, cfg.ratio_if.eval(0.25), epsilon = 1e-12);
    }
}
