//! The external configuration surface (spec §6): typed scalar, threshold,
//! and piecewise-linear settings the engine consumes but never parses
//! itself. [`StaticConfig`] is the in-process stand-in used by the CLI
//! and the tests; a real deployment might instead adapt a TOML/YAML
//! config file into this same [`Config`] trait.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A scalar comparison operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

/// A scalar threshold comparison: {value, op}.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SingleThresh {
    pub value: f64,
    pub op: CompareOp,
}

impl SingleThresh {
    pub fn new(value: f64, op: CompareOp) -> Self {
        Self { value, op }
    }

    pub fn gt(value: f64) -> Self {
        Self::new(value, CompareOp::Gt)
    }

    pub fn ge(value: f64) -> Self {
        Self::new(value, CompareOp::Ge)
    }

    /// Evaluate the comparison against `v`.
    #[inline]
    pub fn check(&self, v: f64) -> bool {
        match self.op {
            CompareOp::Lt => v < self.value,
            CompareOp::Le => v <= self.value,
            CompareOp::Eq => v == self.value,
            CompareOp::Ne => v != self.value,
            CompareOp::Ge => v >= self.value,
            CompareOp::Gt => v > self.value,
        }
    }
}

/// Ordered (x,y) knots with linear interpolation between, clamped at the
/// endpoints. Used for interest and confidence curves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PiecewiseLinear {
    knots: Vec<(f64, f64)>,
}

impl PiecewiseLinear {
    /// Construct from knots sorted by ascending x. Requires at least two
    /// knots (spec §6: "interest curves must have at least two knots").
    pub fn new(mut knots: Vec<(f64, f64)>) -> EngineResult<Self> {
        if knots.len() < 2 {
            return Err(EngineError::ConfigOutOfRange {
                detail: format!("piecewise-linear curve needs >=2 knots, got {}", knots.len()),
            });
        }
        knots.sort_by(|a, b| a.0.partial_cmp(&b.0).expect("NaN knot x"));
        Ok(Self { knots })
    }

    /// A curve that is constant at `y` everywhere (degenerate 2-knot form).
    pub fn constant(y: f64) -> Self {
        Self { knots: vec![(0.0, y), (1.0, y)] }
    }

    /// Evaluate at `x`, clamping to the endpoint value outside the knot range.
    pub fn eval(&self, x: f64) -> f64 {
        let knots = &self.knots;
        if x <= knots[0].0 {
            return knots[0].1;
        }
        if x >= knots[knots.len() - 1].0 {
            return knots[knots.len() - 1].1;
        }
        // Find the bracketing segment; knots.len() >= 2 is guaranteed by `new`.
        for w in knots.windows(2) {
            let (x0, y0) = w[0];
            let (x1, y1) = w[1];
            if x >= x0 && x <= x1 {
                if x1 == x0 {
                    return y0;
                }
                let t = (x - x0) / (x1 - x0);
                return y0 + t * (y1 - y0);
            }
        }
        knots[knots.len() - 1].1
    }

    /// Callable alias matching the original engine's `wconf.foo_if(x)` style.
    #[inline]
    pub fn call(&self, x: f64) -> f64 {
        self.eval(x)
    }
}

/// Pre-merge mode applied to a single side before cross-field matching.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeFlag {
    Off = 0,
    ThreshOnly = 1,
    EngineOnly = 2,
    Both = 3,
}

impl MergeFlag {
    pub fn uses_thresh(self) -> bool {
        matches!(self, MergeFlag::ThreshOnly | MergeFlag::Both)
    }

    pub fn uses_engine(self) -> bool {
        matches!(self, MergeFlag::EngineOnly | MergeFlag::Both)
    }
}

/// Cross-field matching mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchFlag {
    None = 0,
    MatchMerge = 1,
    MatchFcstMerge = 2,
    MatchOnly = 3,
}

/// The full set of named settings the core reads from the external
/// configuration service (spec §6). Implemented as a trait so the engine
/// never depends on a concrete file format for configuration.
pub trait Config {
    fn fcst_raw_thresh(&self) -> SingleThresh;
    fn obs_raw_thresh(&self) -> SingleThresh;
    fn fcst_conv_thresh(&self) -> SingleThresh;
    fn obs_conv_thresh(&self) -> SingleThresh;
    fn fcst_area_thresh(&self) -> SingleThresh;
    fn obs_area_thresh(&self) -> SingleThresh;
    fn fcst_inten_perc(&self) -> u8;
    fn obs_inten_perc(&self) -> u8;
    fn fcst_inten_perc_thresh(&self) -> SingleThresh;
    fn obs_inten_perc_thresh(&self) -> SingleThresh;
    fn fcst_merge_thresh(&self) -> SingleThresh;
    fn obs_merge_thresh(&self) -> SingleThresh;
    fn fcst_conv_radius(&self) -> usize;
    fn obs_conv_radius(&self) -> usize;
    fn zero_border_size(&self) -> usize;
    fn bad_data_thresh(&self) -> f64;
    fn intensity_percentile(&self) -> u8;
    fn max_centroid_dist(&self) -> f64;
    fn total_interest_thresh(&self) -> f64;
    fn print_interest_thresh(&self) -> f64;
    fn fcst_merge_flag(&self) -> MergeFlag;
    fn obs_merge_flag(&self) -> MergeFlag;
    fn match_flag(&self) -> MatchFlag;

    fn centroid_dist_weight(&self) -> f64;
    fn boundary_dist_weight(&self) -> f64;
    fn convex_hull_dist_weight(&self) -> f64;
    fn angle_diff_weight(&self) -> f64;
    fn area_ratio_weight(&self) -> f64;
    fn int_area_ratio_weight(&self) -> f64;
    fn complexity_ratio_weight(&self) -> f64;
    fn intensity_ratio_weight(&self) -> f64;

    fn centroid_dist_if(&self) -> &PiecewiseLinear;
    fn boundary_dist_if(&self) -> &PiecewiseLinear;
    fn convex_hull_dist_if(&self) -> &PiecewiseLinear;
    fn angle_diff_if(&self) -> &PiecewiseLinear;
    fn area_ratio_if(&self) -> &PiecewiseLinear;
    fn int_area_ratio_if(&self) -> &PiecewiseLinear;
    fn complexity_ratio_if(&self) -> &PiecewiseLinear;
    fn ratio_if(&self) -> &PiecewiseLinear;
    fn intensity_ratio_if(&self) -> &PiecewiseLinear;

    fn area_ratio_conf(&self) -> &PiecewiseLinear;
    fn aspect_ratio_conf(&self) -> &PiecewiseLinear;

    fn max_singles(&self) -> usize;

    /// Path to the colour palette the engine paints matched clusters
    /// with (spec §6's "ancillary inputs"). Read via a [`crate::io::PaletteReader`];
    /// the core never parses this path itself.
    fn mode_color_table(&self) -> &str;
}

/// Plain-struct `Config` implementation, populated by `serde` from a
/// JSON/TOML manifest or built programmatically in tests, following the
/// teacher's convention of plain derive-based config structs
/// (`src/packbuilder/types.rs`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StaticConfig {
    pub fcst_raw_thresh: SingleThresh,
    pub obs_raw_thresh: SingleThresh,
    pub fcst_conv_thresh: SingleThresh,
    pub obs_conv_thresh: SingleThresh,
    pub fcst_area_thresh: SingleThresh,
    pub obs_area_thresh: SingleThresh,
    pub fcst_inten_perc: u8,
    pub obs_inten_perc: u8,
    pub fcst_inten_perc_thresh: SingleThresh,
    pub obs_inten_perc_thresh: SingleThresh,
    pub fcst_merge_thresh: SingleThresh,
    pub obs_merge_thresh: SingleThresh,
    pub fcst_conv_radius: usize,
    pub obs_conv_radius: usize,
    pub zero_border_size: usize,
    pub bad_data_thresh: f64,
    pub intensity_percentile: u8,
    pub max_centroid_dist: f64,
    pub total_interest_thresh: f64,
    pub print_interest_thresh: f64,
    pub fcst_merge_flag: MergeFlag,
    pub obs_merge_flag: MergeFlag,
    pub match_flag: MatchFlag,

    pub centroid_dist_weight: f64,
    pub boundary_dist_weight: f64,
    pub convex_hull_dist_weight: f64,
    pub angle_diff_weight: f64,
    pub area_ratio_weight: f64,
    pub int_area_ratio_weight: f64,
    pub complexity_ratio_weight: f64,
    pub intensity_ratio_weight: f64,

    pub centroid_dist_if: PiecewiseLinear,
    pub boundary_dist_if: PiecewiseLinear,
    pub convex_hull_dist_if: PiecewiseLinear,
    pub angle_diff_if: PiecewiseLinear,
    pub area_ratio_if: PiecewiseLinear,
    pub int_area_ratio_if: PiecewiseLinear,
    pub complexity_ratio_if: PiecewiseLinear,
    pub ratio_if: PiecewiseLinear,
    pub intensity_ratio_if: PiecewiseLinear,

    pub area_ratio_conf: PiecewiseLinear,
    pub aspect_ratio_conf: PiecewiseLinear,

    pub max_singles: usize,
    pub mode_color_table: String,
}

impl StaticConfig {
    /// Validate the ranges spec §6/§7 call out as `CONFIG_OUT_OF_RANGE`.
    pub fn validate(&self) -> EngineResult<()> {
        let mut problems = Vec::new();
        if self.fcst_inten_perc > 100 || self.obs_inten_perc > 100 || self.intensity_percentile > 100 {
            problems.push("percentile must be in 0..=100".to_string());
        }
        if !(0.0..=1.0).contains(&self.bad_data_thresh) {
            problems.push("bad_data_thresh must be in (0,1]".to_string());
        }
        if self.max_centroid_dist <= 0.0 {
            problems.push("max_centroid_dist must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.total_interest_thresh) {
            problems.push("total_interest_thresh must be in [0,1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.print_interest_thresh) {
            problems.push("print_interest_thresh must be in [0,1]".to_string());
        }
        for (name, w) in [
            ("centroid_dist_weight", self.centroid_dist_weight),
            ("boundary_dist_weight", self.boundary_dist_weight),
            ("convex_hull_dist_weight", self.convex_hull_dist_weight),
            ("angle_diff_weight", self.angle_diff_weight),
            ("area_ratio_weight", self.area_ratio_weight),
            ("int_area_ratio_weight", self.int_area_ratio_weight),
            ("complexity_ratio_weight", self.complexity_ratio_weight),
            ("intensity_ratio_weight", self.intensity_ratio_weight),
        ] {
            if w < 0.0 {
                problems.push(format!("{name} must be >= 0"));
            }
        }
        if self.max_singles == 0 {
            problems.push("max_singles must be > 0".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(EngineError::ConfigOutOfRange { detail: problems.join("; ") })
        }
    }
}

impl Config for StaticConfig {
    fn fcst_raw_thresh(&self) -> SingleThresh { self.fcst_raw_thresh }
    fn obs_raw_thresh(&self) -> SingleThresh { self.obs_raw_thresh }
    fn fcst_conv_thresh(&self) -> SingleThresh { self.fcst_conv_thresh }
    fn obs_conv_thresh(&self) -> SingleThresh { self.obs_conv_thresh }
    fn fcst_area_thresh(&self) -> SingleThresh { self.fcst_area_thresh }
    fn obs_area_thresh(&self) -> SingleThresh { self.obs_area_thresh }
    fn fcst_inten_perc(&self) -> u8 { self.fcst_inten_perc }
    fn obs_inten_perc(&self) -> u8 { self.obs_inten_perc }
    fn fcst_inten_perc_thresh(&self) -> SingleThresh { self.fcst_inten_perc_thresh }
    fn obs_inten_perc_thresh(&self) -> SingleThresh { self.obs_inten_perc_thresh }
    fn fcst_merge_thresh(&self) -> SingleThresh { self.fcst_merge_thresh }
    fn obs_merge_thresh(&self) -> SingleThresh { self.obs_merge_thresh }
    fn fcst_conv_radius(&self) -> usize { self.fcst_conv_radius }
    fn obs_conv_radius(&self) -> usize { self.obs_conv_radius }
    fn zero_border_size(&self) -> usize { self.zero_border_size }
    fn bad_data_thresh(&self) -> f64 { self.bad_data_thresh }
    fn intensity_percentile(&self) -> u8 { self.intensity_percentile }
    fn max_centroid_dist(&self) -> f64 { self.max_centroid_dist }
    fn total_interest_thresh(&self) -> f64 { self.total_interest_thresh }
    fn print_interest_thresh(&self) -> f64 { self.print_interest_thresh }
    fn fcst_merge_flag(&self) -> MergeFlag { self.fcst_merge_flag }
    fn obs_merge_flag(&self) -> MergeFlag { self.obs_merge_flag }
    fn match_flag(&self) -> MatchFlag { self.match_flag }

    fn centroid_dist_weight(&self) -> f64 { self.centroid_dist_weight }
    fn boundary_dist_weight(&self) -> f64 { self.boundary_dist_weight }
    fn convex_hull_dist_weight(&self) -> f64 { self.convex_hull_dist_weight }
    fn angle_diff_weight(&self) -> f64 { self.angle_diff_weight }
    fn area_ratio_weight(&self) -> f64 { self.area_ratio_weight }
    fn int_area_ratio_weight(&self) -> f64 { self.int_area_ratio_weight }
    fn complexity_ratio_weight(&self) -> f64 { self.complexity_ratio_weight }
    fn intensity_ratio_weight(&self) -> f64 { self.intensity_ratio_weight }

    fn centroid_dist_if(&self) -> &PiecewiseLinear { &self.centroid_dist_if }
    fn boundary_dist_if(&self) -> &PiecewiseLinear { &self.boundary_dist_if }
    fn convex_hull_dist_if(&self) -> &PiecewiseLinear { &self.convex_hull_dist_if }
    fn angle_diff_if(&self) -> &PiecewiseLinear { &self.angle_diff_if }
    fn area_ratio_if(&self) -> &PiecewiseLinear { &self.area_ratio_if }
    fn int_area_ratio_if(&self) -> &PiecewiseLinear { &self.int_area_ratio_if }
    fn complexity_ratio_if(&self) -> &PiecewiseLinear { &self.complexity_ratio_if }
    fn ratio_if(&self) -> &PiecewiseLinear { &self.ratio_if }
    fn intensity_ratio_if(&self) -> &PiecewiseLinear { &self.intensity_ratio_if }

    fn area_ratio_conf(&self) -> &PiecewiseLinear { &self.area_ratio_conf }
    fn aspect_ratio_conf(&self) -> &PiecewiseLinear { &self.aspect_ratio_conf }

    fn max_singles(&self) -> usize { self.max_singles }

    fn mode_color_table(&self) -> &str { &self.mode_color_table }
}
