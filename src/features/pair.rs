//! Forecast/observation pair attribute record (spec §3, §4.5).

use crate::features::single::SingleFeature;
use crate::grid::BAD_DATA;

/// Attributes derived by comparing one forecast object against one
/// observation object, the raw input to [`crate::fuzzy::FuzzyInterest`].
#[derive(Clone, Copy, Debug)]
pub struct PairFeature {
    /// `obs_index * n_fcst + fcst_index` (spec §6: the pair-feature
    /// array's own index, so a stored `PairFeature` can be traced back to
    /// its slot without recomputing it from `fcst_index`/`obs_index`).
    pub pair_number: usize,
    /// 0-based position of the forecast single in its parent array.
    pub fcst_index: usize,
    /// 0-based position of the observation single in its parent array.
    pub obs_index: usize,
    pub centroid_dist: f64,
    pub boundary_dist: f64,
    pub convex_hull_dist: f64,
    pub angle_diff: f64,
    pub area_ratio: f64,
    pub intersection_area: f64,
    pub union_area: f64,
    pub symmetric_diff: f64,
    pub int_area_ratio: f64,
    pub complexity_ratio: f64,
    /// Whether either single's complexity was exactly zero, in which
    /// case `complexity_ratio`'s interest must be read off the backup
    /// `ratio_if` curve instead of `complexity_ratio_if` (spec §4.6).
    pub complexity_degenerate: bool,
    pub intensity_ratio: f64,
    /// Per-object aspect ratios, needed by `angle_diff`'s confidence
    /// term `sqrt(aspect_ratio_conf(A_obs) * aspect_ratio_conf(A_fcst))`.
    pub fcst_aspect_ratio: f64,
    pub obs_aspect_ratio: f64,
}

impl PairFeature {
    /// Compare `fcst` (at `fcst_index` in its parent array, one of
    /// `n_fcst`) against `obs` (at `obs_index`). If the centroid distance
    /// exceeds `max_centroid_dist`, every geometric field is set to
    /// [`BAD_DATA`] (spec §4.5: the centroid-distance veto short-circuits
    /// the remaining geometry so a too-distant pair can never accumulate
    /// interest); the back-pointers are always populated.
    #[allow(clippy::too_many_arguments)]
    pub fn compute(
        fcst: &SingleFeature,
        obs: &SingleFeature,
        fcst_index: usize,
        obs_index: usize,
        n_fcst: usize,
        max_centroid_dist: f64,
    ) -> Self {
        let pair_number = obs_index * n_fcst + fcst_index;
        let centroid_dist =
            ((fcst.centroid_x - obs.centroid_x).powi(2) + (fcst.centroid_y - obs.centroid_y).powi(2)).sqrt();

        if centroid_dist > max_centroid_dist {
            return Self {
                pair_number,
                fcst_index,
                obs_index,
                centroid_dist: BAD_DATA,
                boundary_dist: BAD_DATA,
                convex_hull_dist: BAD_DATA,
                angle_diff: BAD_DATA,
                area_ratio: BAD_DATA,
                intersection_area: BAD_DATA,
                union_area: BAD_DATA,
                symmetric_diff: BAD_DATA,
                int_area_ratio: BAD_DATA,
                complexity_ratio: BAD_DATA,
                complexity_degenerate: false,
                intensity_ratio: BAD_DATA,
                fcst_aspect_ratio: fcst.aspect_ratio,
                obs_aspect_ratio: obs.aspect_ratio,
            };
        }

        let boundary_dist = min_point_set_dist(fcst.boundary(), obs.boundary());
        let convex_hull_dist = min_point_set_dist(fcst.hull(), obs.hull());

        let mut angle_diff = (fcst.axis_angle - obs.axis_angle).abs();
        if angle_diff > 90.0 {
            angle_diff = 180.0 - angle_diff;
        }

        let area_ratio = symmetric_ratio(fcst.area as f64, obs.area as f64);
        let complexity_ratio = symmetric_ratio(fcst.complexity, obs.complexity);
        let complexity_degenerate = fcst.complexity == 0.0 || obs.complexity == 0.0;
        let intensity_ratio = symmetric_ratio(fcst.intensity.p_user, obs.intensity.p_user);

        let intersection_area = fcst.pixels().intersection(obs.pixels()).count() as f64;
        let union_area = fcst.pixels().union(obs.pixels()).count() as f64;
        let symmetric_diff = union_area - intersection_area;
        let min_area = (fcst.area.min(obs.area)) as f64;
        let int_area_ratio = if min_area > 0.0 { intersection_area / min_area } else { 0.0 };

        Self {
            pair_number,
            fcst_index,
            obs_index,
            centroid_dist,
            boundary_dist,
            convex_hull_dist,
            angle_diff,
            area_ratio,
            intersection_area,
            union_area,
            symmetric_diff,
            int_area_ratio,
            complexity_ratio,
            complexity_degenerate,
            intensity_ratio,
            fcst_aspect_ratio: fcst.aspect_ratio,
            obs_aspect_ratio: obs.aspect_ratio,
        }
    }

    pub fn is_vetoed(&self) -> bool {
        BAD_DATA == self.centroid_dist
    }
}

/// min-min distance between two point sets (the boundary/hull distance
/// definition used throughout spec §4.5).
fn min_point_set_dist(a: &[(f64, f64)], b: &[(f64, f64)]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return BAD_DATA;
    }
    let mut best = f64::INFINITY;
    for &(ax, ay) in a {
        for &(bx, by) in b {
            let d = ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt();
            if d < best {
                best = d;
            }
        }
    }
    best
}

/// `min(a,b)/max(a,b)`, in `[0,1]`; both zero is treated as perfect
/// agreement.
fn symmetric_ratio(a: f64, b: f64) -> f64 {
    let hi = a.max(b);
    if hi <= 0.0 {
        return 1.0;
    }
    a.min(b) / hi
}
