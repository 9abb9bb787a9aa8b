//! Per-object attribute record (spec §3, §4.4).

use ahash::AHashSet;

use crate::grid::{LabelGrid, ValueGrid, BAD_DATA};
use crate::mask;

/// Intensity percentiles computed from the raw-filtered field inside an
/// object's mask.
#[derive(Clone, Copy, Debug, Default)]
pub struct IntensityPercentiles {
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p_user: f64,
}

/// Per-object geometric and intensity summary.
#[derive(Clone, Debug)]
pub struct SingleFeature {
    pub object_number: usize,
    pub area: usize,
    pub area_filter: usize,
    pub area_thresh: usize,
    pub centroid_x: f64,
    pub centroid_y: f64,
    pub lonlat: Option<(f64, f64)>,
    pub axis_angle: f64,
    pub length: f64,
    pub width: f64,
    pub aspect_ratio: f64,
    pub curvature: f64,
    pub curvature_center: (f64, f64),
    pub complexity: f64,
    pub intensity: IntensityPercentiles,
    pub intensity_sum: f64,

    pub(crate) pixels: AHashSet<(usize, usize)>,
    pub(crate) boundary: Vec<(f64, f64)>,
    pub(crate) hull: Vec<(f64, f64)>,
}

impl SingleFeature {
    /// A zero-area placeholder for an empty object (spec §4.2 failure
    /// semantics: callers must not match or cluster empty singles).
    pub fn empty(object_number: usize) -> Self {
        Self {
            object_number,
            area: 0,
            area_filter: 0,
            area_thresh: 0,
            centroid_x: 0.0,
            centroid_y: 0.0,
            lonlat: None,
            axis_angle: 0.0,
            length: 0.0,
            width: 0.0,
            aspect_ratio: BAD_DATA,
            curvature: BAD_DATA,
            curvature_center: (BAD_DATA, BAD_DATA),
            complexity: BAD_DATA,
            intensity: IntensityPercentiles::default(),
            intensity_sum: 0.0,
            pixels: AHashSet::default(),
            boundary: Vec::new(),
            hull: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.area == 0
    }

    #[inline]
    pub fn pixels(&self) -> &AHashSet<(usize, usize)> {
        &self.pixels
    }

    #[inline]
    pub fn boundary(&self) -> &[(f64, f64)] {
        &self.boundary
    }

    #[inline]
    pub fn hull(&self) -> &[(f64, f64)] {
        &self.hull
    }

    /// Compute the full attribute set for one object (spec §4.4).
    ///
    /// - `raw_filter`: the raw-threshold-filtered field (not convolved).
    /// - `threshold_mask`: binary mask of pixels meeting the conv-threshold.
    /// - `object_mask`: binary mask of exactly this object.
    /// - `pct_user`: the extra user-chosen percentile.
    pub fn compute(
        object_number: usize,
        raw_filter: &ValueGrid,
        threshold_mask: &LabelGrid,
        object_mask: &LabelGrid,
        pct_user: u8,
    ) -> Self {
        let pixels: Vec<(usize, usize)> = (0..object_mask.ny())
            .flat_map(|y| (0..object_mask.nx()).map(move |x| (x, y)))
            .filter(|&(x, y)| object_mask.get(x, y) != 0)
            .collect();

        if pixels.is_empty() {
            return Self::empty(object_number);
        }

        let area = pixels.len();
        let area_filter = pixels.iter().filter(|&&(x, y)| !ValueGrid::is_bad(raw_filter.get(x, y))).count();
        let area_thresh = pixels.iter().filter(|&&(x, y)| threshold_mask.get(x, y) != 0).count();

        let m = mask::moments(&pixels);
        let axes = mask::length_width(&m);
        let axis_angle = mask::axis_angle(&m);

        let boundary_px = mask::boundary_pixels(&pixels);
        let boundary: Vec<(f64, f64)> = boundary_px.iter().map(|&(x, y)| (x as f64, y as f64)).collect();
        let hull = mask::convex_hull(&pixels);
        let complexity = mask::complexity(area as f64, &hull);

        let (curvature, curvature_center) = fit_circle(&boundary);

        let intensity_values: Vec<f64> =
            pixels.iter().map(|&(x, y)| raw_filter.get(x, y)).filter(|&v| !ValueGrid::is_bad(v)).collect();
        let intensity = IntensityPercentiles {
            p10: mask::percentile(&intensity_values, 10.0),
            p25: mask::percentile(&intensity_values, 25.0),
            p50: mask::percentile(&intensity_values, 50.0),
            p75: mask::percentile(&intensity_values, 75.0),
            p90: mask::percentile(&intensity_values, 90.0),
            p_user: mask::percentile(&intensity_values, pct_user as f64),
        };
        let intensity_sum = intensity_values.iter().sum();

        Self {
            object_number,
            area,
            area_filter,
            area_thresh,
            centroid_x: m.centroid_x,
            centroid_y: m.centroid_y,
            lonlat: None,
            axis_angle,
            length: axes.length,
            width: axes.width,
            aspect_ratio: axes.aspect_ratio,
            curvature,
            curvature_center,
            complexity,
            intensity,
            intensity_sum,
            pixels: pixels.into_iter().collect(),
            boundary,
            hull,
        }
    }

    /// Populate [`Self::lonlat`] from a projection.
    pub fn with_lonlat(mut self, projection: &dyn crate::io::Projection) -> Self {
        self.lonlat = Some(projection.to_lonlat(self.centroid_x, self.centroid_y));
        self
    }
}

/// Algebraic (Kasa) best-fit circle to a set of boundary points, used for
/// `curvature = 1/R`. Degenerate inputs (fewer than 3 distinct points, or
/// a singular normal-equation system) report zero curvature centered at
/// the points' centroid.
fn fit_circle(points: &[(f64, f64)]) -> (f64, (f64, f64)) {
    if points.len() < 3 {
        let (sx, sy) = points.iter().fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
        let n = points.len().max(1) as f64;
        return (0.0, (sx / n, sy / n));
    }

    // Solve for (A,B,C) in x^2+y^2 + A x + B y + C = 0 via the normal
    // equations of the linear least-squares system.
    let n = points.len() as f64;
    let (mut sx, mut sy, mut sxx, mut syy, mut sxy, mut sxb, mut syb, mut sb) =
        (0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    for &(x, y) in points {
        let b = x * x + y * y;
        sx += x;
        sy += y;
        sxx += x * x;
        syy += y * y;
        sxy += x * y;
        sxb += x * b;
        syb += y * b;
        sb += b;
    }

    // | sxx sxy sx | |A|   | -sxb |
    // | sxy syy sy | |B| = | -syb |
    // | sx  sy  n  | |C|   | -sb  |
    let mat = [[sxx, sxy, sx], [sxy, syy, sy], [sx, sy, n]];
    let rhs = [-sxb, -syb, -sb];

    match solve3(mat, rhs) {
        Some([a, b, c]) => {
            let center = (-a / 2.0, -b / 2.0);
            let radius = (center.0 * center.0 + center.1 * center.1 - c).max(0.0).sqrt();
            if radius > 1e-9 {
                (1.0 / radius, center)
            } else {
                (0.0, center)
            }
        }
        None => {
            let (sx, sy) = points.iter().fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
            (0.0, (sx / n, sy / n))
        }
    }
}

/// Solve a 3x3 linear system via Cramer's rule; `None` if singular.
fn solve3(m: [[f64; 3]; 3], rhs: [f64; 3]) -> Option<[f64; 3]> {
    let det3 = |m: [[f64; 3]; 3]| -> f64 {
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    };

    let d = det3(m);
    if d.abs() < 1e-12 {
        return None;
    }

    let mut solve_col = |col: usize| -> f64 {
        let mut mc = m;
        for row in 0..3 {
            mc[row][col] = rhs[row];
        }
        det3(mc) / d
    };

    Some([solve_col(0), solve_col(1), solve_col(2)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_masks(n: usize) -> (ValueGrid, LabelGrid, LabelGrid) {
        let mut raw = ValueGrid::new(n, n);
        let mut thresh = LabelGrid::new(n, n);
        let mut obj = LabelGrid::new(n, n);
        for y in 0..n {
            for x in 0..n {
                raw.set(x, y, (x + y) as f64);
                thresh.set(x, y, 1);
                obj.set(x, y, 1);
            }
        }
        (raw, thresh, obj)
    }

    #[test]
    fn compute_fills_basic_geometry() {
        let (raw, thresh, obj) = square_masks(4);
        let f = SingleFeature::compute(1, &raw, &thresh, &obj, 95);
        assert_eq!(f.area, 16);
        assert_eq!(f.area_thresh, 16);
        assert!((f.centroid_x - 1.5).abs() < 1e-9);
        assert!((f.centroid_y - 1.5).abs() < 1e-9);
        assert!(f.complexity < 0.3);
    }

    #[test]
    fn empty_object_mask_yields_empty_feature() {
        let raw = ValueGrid::new(3, 3);
        let thresh = LabelGrid::new(3, 3);
        let obj = LabelGrid::new(3, 3); // all zero: no pixels
        let f = SingleFeature::compute(1, &raw, &thresh, &obj, 50);
        assert!(f.is_empty());
        assert_eq!(f.area, 0);
    }

    #[test]
    fn fit_circle_on_circle_points_recovers_radius() {
        let r = 10.0;
        let points: Vec<(f64, f64)> = (0..16)
            .map(|i| {
                let theta = i as f64 / 16.0 * std::f64::consts::TAU;
                (r * theta.cos(), r * theta.sin())
            })
            .collect();
        let (curvature, center) = fit_circle(&points);
        assert!((1.0 / curvature - r).abs() < 1e-6, "got radius {}", 1.0 / curvature);
        assert!(center.0.abs() < 1e-6 && center.1.abs() < 1e-6);
    }
}
