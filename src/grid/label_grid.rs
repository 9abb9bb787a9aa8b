use crate::grid::Grid2D;

/// A dense Nx×Ny grid of non-negative integer labels. Label 0 is
/// background; labels 1..N identify distinct objects.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelGrid {
    grid: Grid2D<i32>,
}

impl LabelGrid {
    pub fn new(nx: usize, ny: usize) -> Self {
        Self { grid: Grid2D::new(nx, ny, 0) }
    }

    pub fn from_values(nx: usize, ny: usize, values: Vec<i32>) -> Self {
        Self { grid: Grid2D::from_vec(nx, ny, values) }
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
    pub fn get(&self, x: usize, y: usize) -> i32 {
        self.grid.get(x, y)
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: i32) {
        self.grid.set(x, y, v);
    }

    #[inline]
    pub fn grid(&self) -> &Grid2D<i32> {
        &self.grid
    }

    pub fn zero_border(&mut self, k: usize) {
        self.grid.zero_border(k, 0);
    }

    /// The highest label present, i.e. the number of distinct non-zero
    /// labels when labels are dense (as `split` guarantees).
    pub fn max_label(&self) -> i32 {
        self.grid.data().iter().copied().max().unwrap_or(0)
    }

    /// Return a binary grid that is 1 where this grid equals `k`, 0 elsewhere.
    pub fn select(&self, k: i32) -> LabelGrid {
        let mut out = LabelGrid::new(self.nx(), self.ny());
        for (x, y) in self.grid.iter_xy() {
            if self.grid.get(x, y) == k {
                out.set(x, y, 1);
            }
        }
        out
    }

    /// Pixel coordinates where this grid equals `k`.
    pub fn pixels_equal(&self, k: i32) -> Vec<(usize, usize)> {
        self.grid.iter_xy().filter(|&(x, y)| self.grid.get(x, y) == k).collect()
    }

    /// Pixel count where this grid is non-zero.
    pub fn popcount(&self) -> usize {
        self.grid.data().iter().filter(|&&v| v != 0).count()
    }
}
