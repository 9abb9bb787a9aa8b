//! Dense Nx×Ny grids: the raw container shared by [`ValueGrid`] and
//! [`LabelGrid`].

mod label_grid;
mod value_grid;

use ndarray::Array2;

pub use label_grid::LabelGrid;
pub use value_grid::{GridMeta, ValueGrid, BAD_DATA};

/// A dense 2-D Nx×Ny array, indexed (x,y) with x across and y up.
///
/// Backed by `ndarray::Array2`, shaped `(ny, nx)` so that memory is
/// row-major in y (y varies slowest), matching how the engine scans
/// grids top-to-bottom for connected-component labeling.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid2D<T> {
    nx: usize,
    ny: usize,
    data: Array2<T>,
}

impl<T: Copy> Grid2D<T> {
    pub fn new(nx: usize, ny: usize, fill: T) -> Self {
        Self { nx, ny, data: Array2::from_elem((ny, nx), fill) }
    }

    /// Build from a pre-populated row-major (y-slowest) buffer.
    pub fn from_vec(nx: usize, ny: usize, data: Vec<T>) -> Self {
        let data = Array2::from_shape_vec((ny, nx), data).expect("data length must equal nx*ny");
        Self { nx, ny, data }
    }

    #[inline]
    pub fn nx(&self) -> usize {
        self.nx
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.ny
    }

    #[inline]
    pub fn in_bounds(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.nx && (y as usize) < self.ny
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[[y, x]]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: T) {
        self.data[[y, x]] = v;
    }

    /// The grid's values as a flat row-major (y-slowest) buffer.
    pub fn data(&self) -> Vec<T> {
        self.data.iter().copied().collect()
    }

    /// Iterate all (x,y) pixel coordinates in row-major scan order.
    pub fn iter_xy(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let nx = self.nx;
        (0..self.ny).flat_map(move |y| (0..nx).map(move |x| (x, y)))
    }

    /// Set every pixel with x<k, x>=nx-k, y<k, or y>=ny-k to `border`.
    pub fn zero_border(&mut self, k: usize, border: T) {
        if k == 0 {
            return;
        }
        for y in 0..self.ny {
            for x in 0..self.nx {
                if x < k || x + k >= self.nx || y < k || y + k >= self.ny {
                    self.set(x, y, border);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pos_is_row_major_in_y() {
        let mut g = Grid2D::<f64>::new(3, 2, 0.0);
        g.set(2, 0, 9.0);
        g.set(0, 1, 7.0);
        let flat = g.data();
        assert_eq!(flat[2], 9.0);
        assert_eq!(flat[3], 7.0);
    }

    #[test]
    fn zero_border_clears_k_pixel_ring() {
        let mut g = Grid2D::<f64>::new(5, 5, 1.0);
        g.zero_border(1, 0.0);
        for y in 0..5 {
            for x in 0..5 {
                let expect_border = x == 0 || y == 0 || x == 4 || y == 4;
                assert_eq!(g.get(x, y) == 0.0, expect_border, "pixel ({x},{y})");
            }
        }
    }

    #[test]
    fn zero_border_zero_is_noop() {
        let mut g = Grid2D::<f64>::new(4, 4, 1.0);
        g.zero_border(0, 0.0);
        assert!(g.data().iter().all(|&v| v == 1.0));
    }
}
