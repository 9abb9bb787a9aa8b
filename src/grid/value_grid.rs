use std::path::Path;
use std::sync::Arc;

use crate::config::SingleThresh;
use crate::error::EngineResult;
use crate::grid::{Grid2D, LabelGrid};
use crate::io::{GridReader, Projection};

/// Reserved sentinel denoting "no valid measurement". Arithmetic on bad
/// pixels must be guarded explicitly; this constant is never produced by
/// ordinary floating-point computation, only ever assigned.
pub const BAD_DATA: f64 = -9999.0;

/// Non-numeric metadata carried alongside a [`ValueGrid`]: valid/lead
/// time and accumulation interval (Unix seconds), plus the projection
/// used to map pixel coordinates to lon/lat.
#[derive(Clone)]
pub struct GridMeta {
    pub valid_time: i64,
    pub lead_time: i64,
    pub accum_interval: i64,
    pub projection: Option<Arc<dyn Projection>>,
}

impl Default for GridMeta {
    fn default() -> Self {
        Self { valid_time: 0, lead_time: 0, accum_interval: 0, projection: None }
    }
}

impl std::fmt::Debug for GridMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridMeta")
            .field("valid_time", &self.valid_time)
            .field("lead_time", &self.lead_time)
            .field("accum_interval", &self.accum_interval)
            .field("projection", &self.projection.is_some())
            .finish()
    }
}

/// A dense Nx×Ny grid of real values with a reserved "bad" sentinel.
#[derive(Clone, Debug)]
pub struct ValueGrid {
    grid: Grid2D<f64>,
    pub meta: GridMeta,
}

impl ValueGrid {
    pub fn new(nx: usize, ny: usize) -> Self {
        Self { grid: Grid2D::new(nx, ny, BAD_DATA), meta: GridMeta::default() }
    }

    pub fn from_values(nx: usize, ny: usize, values: Vec<f64>) -> Self {
        Self { grid: Grid2D::from_vec(nx, ny, values), meta: GridMeta::default() }
    }

    #[inline]
    pub fn nx(&self) -> usize {
        self.grid.nx()
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.grid.ny()
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.grid.get(x, y)
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: f64) {
        self.grid.set(x, y, v);
    }

    #[inline]
    pub fn grid(&self) -> &Grid2D<f64> {
        &self.grid
    }

    #[inline]
    pub fn is_bad(v: f64) -> bool {
        v == BAD_DATA
    }

    /// Read from an external raw-field reader (spec §6); the on-disk
    /// representation is not prescribed by the core.
    pub fn read(reader: &dyn GridReader, path: &Path) -> EngineResult<Self> {
        reader.read(path)
    }

    /// Set to `bad` every pixel within `k` of any edge.
    pub fn zero_border(&mut self, k: usize, bad: f64) {
        self.grid.zero_border(k, bad);
    }

    /// Replace pixels not satisfying `thresh` with `BAD_DATA`; pixels
    /// already bad stay bad. Satisfying pixels are unchanged.
    pub fn filter(&self, thresh: SingleThresh) -> ValueGrid {
        let mut out = self.clone();
        for (x, y) in self.grid.iter_xy() {
            let v = self.grid.get(x, y);
            if Self::is_bad(v) || !thresh.check(v) {
                out.set(x, y, BAD_DATA);
            }
        }
        out
    }

    /// Produce a binary [`LabelGrid`]: 1 where `thresh` is satisfied, 0
    /// elsewhere; bad pixels are always excluded (mapped to 0).
    pub fn threshold_double(&self, thresh: SingleThresh) -> LabelGrid {
        let mut out = LabelGrid::new(self.nx(), self.ny());
        for (x, y) in self.grid.iter_xy() {
            let v = self.grid.get(x, y);
            if !Self::is_bad(v) && thresh.check(v) {
                out.set(x, y, 1);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompareOp;

    #[test]
    fn filter_clears_pixels_failing_threshold() {
        let mut g = ValueGrid::new(2, 1);
        g.set(0, 0, 1.0);
        g.set(1, 0, 10.0);
        let filtered = g.filter(SingleThresh::new(5.0, CompareOp::Gt));
        assert!(ValueGrid::is_bad(filtered.get(0, 0)));
        assert_eq!(filtered.get(1, 0), 10.0);
    }

    #[test]
    fn threshold_double_ignores_bad_pixels() {
        let g = ValueGrid::new(2, 1); // all BAD_DATA
        let mask = g.threshold_double(SingleThresh::new(-20000.0, CompareOp::Gt));
        assert_eq!(mask.get(0, 0), 0);
        assert_eq!(mask.get(1, 0), 0);
    }

    #[test]
    fn zero_border_sets_bad_sentinel() {
        let mut g = ValueGrid::new(4, 4);
        for y in 0..4 {
            for x in 0..4 {
                g.set(x, y, 1.0);
            }
        }
        g.zero_border(1, BAD_DATA);
        assert!(ValueGrid::is_bad(g.get(0, 0)));
        assert_eq!(g.get(1, 1), 1.0);
    }
}
