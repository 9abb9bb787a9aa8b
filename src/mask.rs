//! Binary mask operations: thresholding, connected-component labeling,
//! and the geometric queries ([`moments`], [`convex_hull`], [`complexity`],
//! ...) built on top of an object's pixel set.

use geo::{Area, ConvexHull, MultiPoint, Point, Polygon};

use crate::config::SingleThresh;
use crate::grid::{LabelGrid, ValueGrid};

/// Percentile of `values` using linear interpolation between sorted
/// samples: rank = pct * (N-1) / 100 (spec §4.2, Open Question #1).
///
/// - N == 0: returns `BAD_DATA` (nothing to summarize).
/// - N == 1: returns the lone sample for any `pct`.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return crate::grid::BAD_DATA;
    }
    if values.len() == 1 {
        return values[0];
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("NaN in percentile input"));

    let rank = pct * (sorted.len() - 1) as f64 / 100.0;
    let lo = rank.floor().max(0.0) as usize;
    let hi = rank.ceil().min((sorted.len() - 1) as f64) as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// 4-connected neighbour offsets.
const NEIGHBORS4: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Standard 4-neighbour connected-component labeling of a binary mask
/// (non-zero = foreground). Labels are assigned in row-major scan order
/// starting at 1. Returns the labeled grid and the number of objects.
pub fn split(mask: &LabelGrid) -> (LabelGrid, usize) {
    let nx = mask.nx();
    let ny = mask.ny();
    let mut out = LabelGrid::new(nx, ny);
    let mut next_label = 0i32;
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for y in 0..ny {
        for x in 0..nx {
            if mask.get(x, y) == 0 || out.get(x, y) != 0 {
                continue;
            }
            next_label += 1;
            out.set(x, y, next_label);
            stack.push((x, y));
            while let Some((cx, cy)) = stack.pop() {
                for (dx, dy) in NEIGHBORS4 {
                    let nx_ = cx as isize + dx;
                    let ny_ = cy as isize + dy;
                    if !mask.grid().in_bounds(nx_, ny_) {
                        continue;
                    }
                    let (nx_, ny_) = (nx_ as usize, ny_ as usize);
                    if mask.get(nx_, ny_) != 0 && out.get(nx_, ny_) == 0 {
                        out.set(nx_, ny_, next_label);
                        stack.push((nx_, ny_));
                    }
                }
            }
        }
    }

    (out, next_label as usize)
}

/// Return a binary grid that is 1 where `labels == k`, else 0.
pub fn select(labels: &LabelGrid, k: i32) -> LabelGrid {
    labels.select(k)
}

/// Clear (zero) any connected component of `mask` whose area fails
/// `area_thresh`. 4-connectivity.
pub fn threshold_area(mask: &mut LabelGrid, area_thresh: SingleThresh) {
    let (labels, n) = split(mask);
    for k in 1..=(n as i32) {
        let area = labels.pixels_equal(k).len() as f64;
        if !area_thresh.check(area) {
            for (x, y) in labels.pixels_equal(k) {
                mask.set(x, y, 0);
            }
        }
    }
}

/// For each connected component of `mask`, compute the `pct`-percentile
/// of `raw_filter` values inside it and clear the component if the
/// threshold test on that percentile fails.
pub fn threshold_intensity(mask: &mut LabelGrid, raw_filter: &ValueGrid, pct: f64, thresh: SingleThresh) {
    let (labels, n) = split(mask);
    for k in 1..=(n as i32) {
        let pixels = labels.pixels_equal(k);
        let values: Vec<f64> = pixels
            .iter()
            .map(|&(x, y)| raw_filter.get(x, y))
            .filter(|&v| !ValueGrid::is_bad(v))
            .collect();
        let p = percentile(&values, pct);
        if ValueGrid::is_bad(p) || !thresh.check(p) {
            for (x, y) in pixels {
                mask.set(x, y, 0);
            }
        }
    }
}

/// Second-order centroid/moment summary of a pixel set.
#[derive(Clone, Copy, Debug, Default)]
pub struct Moments {
    pub centroid_x: f64,
    pub centroid_y: f64,
    pub m20: f64,
    pub m02: f64,
    pub m11: f64,
}

/// Compute centroid and central second moments over `pixels`.
pub fn moments(pixels: &[(usize, usize)]) -> Moments {
    if pixels.is_empty() {
        return Moments::default();
    }
    let n = pixels.len() as f64;
    let (sx, sy) = pixels.iter().fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x as f64, sy + y as f64));
    let (mx, my) = (sx / n, sy / n);

    let (mut m20, mut m02, mut m11) = (0.0, 0.0, 0.0);
    for &(x, y) in pixels {
        let dx = x as f64 - mx;
        let dy = y as f64 - my;
        m20 += dx * dx;
        m02 += dy * dy;
        m11 += dx * dy;
    }
    m20 /= n;
    m02 /= n;
    m11 /= n;

    Moments { centroid_x: mx, centroid_y: my, m20, m02, m11 }
}

/// Principal axis angle in degrees, normalised to (-90, 90].
pub fn axis_angle(m: &Moments) -> f64 {
    let theta = 0.5 * (2.0 * m.m11).atan2(m.m20 - m.m02);
    let mut deg = theta.to_degrees();
    // Normalise to (-90, 90].
    while deg <= -90.0 {
        deg += 180.0;
    }
    while deg > 90.0 {
        deg -= 180.0;
    }
    deg
}

/// Length/width from the eigenvalues of the 2x2 moment matrix, plus
/// aspect ratio clamped to (0,1].
pub struct ShapeAxes {
    pub length: f64,
    pub width: f64,
    pub aspect_ratio: f64,
}

pub fn length_width(m: &Moments) -> ShapeAxes {
    let trace = m.m20 + m.m02;
    let det = m.m20 * m.m02 - m.m11 * m.m11;
    let disc = ((trace * trace / 4.0) - det).max(0.0).sqrt();
    let lambda_max = (trace / 2.0 + disc).max(0.0);
    let lambda_min = (trace / 2.0 - disc).max(0.0);

    let length = 2.0 * lambda_max.sqrt();
    let width = 2.0 * lambda_min.sqrt();
    let aspect_ratio = if length > 0.0 { (width / length).clamp(1e-12, 1.0) } else { 1.0 };

    ShapeAxes { length, width, aspect_ratio }
}

/// The pixel coordinates of `pixels` that touch the mask's exterior: a
/// pixel is on the boundary if it has fewer than four in-mask
/// 4-neighbours (i.e. it borders the background or the grid edge).
pub fn boundary_pixels(pixels: &[(usize, usize)]) -> Vec<(usize, usize)> {
    use std::collections::HashSet;
    let set: HashSet<(usize, usize)> = pixels.iter().copied().collect();
    pixels
        .iter()
        .copied()
        .filter(|&(x, y)| {
            NEIGHBORS4.iter().any(|&(dx, dy)| {
                let nx = x as isize + dx;
                let ny = y as isize + dy;
                nx < 0 || ny < 0 || !set.contains(&(nx as usize, ny as usize))
            })
        })
        .collect()
}

/// Closed convex-hull polyline of `pixels`, as (x,y) vertices.
pub fn convex_hull(pixels: &[(usize, usize)]) -> Vec<(f64, f64)> {
    if pixels.is_empty() {
        return Vec::new();
    }
    let points: MultiPoint<f64> =
        pixels.iter().map(|&(x, y)| Point::new(x as f64, y as f64)).collect::<Vec<_>>().into();
    let hull: Polygon<f64> = points.convex_hull();
    hull.exterior().points().map(|p| (p.x(), p.y())).collect()
}

/// `1 - area(object) / area(convex_hull(object))`, clamped to [0,1].
pub fn complexity(area: f64, hull: &[(f64, f64)]) -> f64 {
    if hull.len() < 3 || area <= 0.0 {
        return 0.0;
    }
    let poly = Polygon::new(hull.to_vec().into(), vec![]);
    let hull_area = poly.unsigned_area();
    if hull_area <= 0.0 {
        return 0.0;
    }
    (1.0 - area / hull_area).clamp(0.0, 1.0)
}

/// Axis-aligned bounding box of a polyline: (x_ll, y_ll, x_ur, y_ur).
pub fn bounding_box(polyline: &[(f64, f64)]) -> (f64, f64, f64, f64) {
    polyline.iter().fold(
        (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        |(xl, yl, xu, yu), &(x, y)| (xl.min(x), yl.min(y), xu.max(x), yu.max(y)),
    )
}

/// Even-odd ray test; points on the boundary are considered inside.
pub fn is_inside(polyline: &[(f64, f64)], x: f64, y: f64) -> bool {
    let n = polyline.len();
    if n < 3 {
        return false;
    }

    // Boundary check: on any edge segment.
    for i in 0..n {
        let (x1, y1) = polyline[i];
        let (x2, y2) = polyline[(i + 1) % n];
        if on_segment(x1, y1, x2, y2, x, y) {
            return true;
        }
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = polyline[i];
        let (xj, yj) = polyline[j];
        let intersects = ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi);
        if intersects {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn on_segment(x1: f64, y1: f64, x2: f64, y2: f64, px: f64, py: f64) -> bool {
    let cross = (x2 - x1) * (py - y1) - (y2 - y1) * (px - x1);
    if cross.abs() > 1e-9 {
        return false;
    }
    let dot = (px - x1) * (px - x2) + (py - y1) * (py - y2);
    dot <= 1e-9
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompareOp;

    #[test]
    fn percentile_empty_is_bad() {
        assert!(ValueGrid::is_bad(percentile(&[], 50.0)));
    }

    #[test]
    fn percentile_single_sample_is_itself() {
        assert_eq!(percentile(&[3.0], 0.0), 3.0);
        assert_eq!(percentile(&[3.0], 100.0), 3.0);
    }

    #[test]
    fn percentile_median_of_four() {
        let v = [1.0, 2.0, 3.0, 4.0];
        // rank = 50 * 3 / 100 = 1.5 -> interpolate between index 1 and 2
        assert!((percentile(&v, 50.0) - 2.5).abs() < 1e-12);
        assert_eq!(percentile(&v, 0.0), 1.0);
        assert_eq!(percentile(&v, 100.0), 4.0);
    }

    #[test]
    fn split_labels_two_disjoint_blobs() {
        let mut m = LabelGrid::new(5, 1);
        m.set(0, 0, 1);
        m.set(1, 0, 1);
        m.set(3, 0, 1);
        let (labels, n) = split(&m);
        assert_eq!(n, 2);
        assert_eq!(labels.get(0, 0), labels.get(1, 0));
        assert_ne!(labels.get(0, 0), labels.get(3, 0));
    }

    #[test]
    fn split_assigns_labels_in_scan_order() {
        let mut m = LabelGrid::new(3, 2);
        m.set(2, 0, 1); // encountered first in row-major scan
        m.set(0, 1, 1); // encountered second
        let (labels, n) = split(&m);
        assert_eq!(n, 2);
        assert_eq!(labels.get(2, 0), 1);
        assert_eq!(labels.get(0, 1), 2);
    }

    #[test]
    fn threshold_area_removes_small_components_only() {
        let mut m = LabelGrid::new(10, 1);
        for x in 0..5 {
            m.set(x, 0, 1); // area 5
        }
        m.set(7, 0, 1); // area 1
        threshold_area(&mut m, SingleThresh::new(2.0, CompareOp::Gt));
        assert_eq!(m.popcount(), 5);
        assert_eq!(m.get(7, 0), 0);
    }

    #[test]
    fn moments_of_square_centroid() {
        let pixels: Vec<(usize, usize)> =
            (0..3).flat_map(|y| (0..3).map(move |x| (x, y))).collect();
        let m = moments(&pixels);
        assert!((m.centroid_x - 1.0).abs() < 1e-9);
        assert!((m.centroid_y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn axis_angle_of_square_is_degenerate_but_finite() {
        let pixels: Vec<(usize, usize)> =
            (0..4).flat_map(|y| (0..4).map(move |x| (x, y))).collect();
        let m = moments(&pixels);
        let angle = axis_angle(&m);
        assert!(angle > -90.0 && angle <= 90.0);
    }

    #[test]
    fn convex_hull_of_square_is_its_corners() {
        let pixels = vec![(0, 0), (1, 0), (0, 1), (1, 1)];
        let hull = convex_hull(&pixels);
        assert!(hull.len() >= 4);
        let (xl, yl, xu, yu) = bounding_box(&hull);
        assert_eq!((xl, yl, xu, yu), (0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn complexity_of_convex_square_is_zero() {
        let pixels: Vec<(usize, usize)> =
            (0..4).flat_map(|y| (0..4).map(move |x| (x, y))).collect();
        let hull = convex_hull(&pixels);
        let c = complexity(pixels.len() as f64, &hull);
        assert!(c < 0.3, "square should be near-convex, got {c}");
    }

    #[test]
    fn is_inside_even_odd_with_boundary_included() {
        let square = vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)];
        assert!(is_inside(&square, 2.0, 2.0));
        assert!(is_inside(&square, 0.0, 0.0)); // vertex
        assert!(is_inside(&square, 2.0, 0.0)); // edge
        assert!(!is_inside(&square, 5.0, 5.0));
    }
}
