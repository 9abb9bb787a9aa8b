//! Circular-kernel mean-value smoothing with bad-data handling (spec §4.3).

use crate::grid::{ValueGrid, BAD_DATA};

/// Mean filter over a disc of radius `r` (diameter `2r+1`).
#[derive(Clone, Copy, Debug)]
pub struct Convolver {
    pub radius: usize,
    pub bad_data_frac: f64,
}

impl Convolver {
    pub fn new(radius: usize, bad_data_frac: f64) -> Self {
        Self { radius, bad_data_frac }
    }

    /// Apply the circular mean filter. `r=0` is a no-op (copy). Border
    /// zeroing is the caller's responsibility (spec §4.8:
    /// `do_fcst_convolution` border-zeroes after convolving).
    pub fn apply(&self, src: &ValueGrid) -> ValueGrid {
        if self.radius == 0 {
            return src.clone();
        }

        let r = self.radius as isize;
        let r2 = (r * r) as f64;
        let disc_area = std::f64::consts::PI * r2;

        // Precompute the disc's relative offsets once.
        let offsets: Vec<(isize, isize)> = (-r..=r)
            .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
            .filter(|&(dx, dy)| (dx * dx + dy * dy) as f64 <= r2)
            .collect();

        let mut out = src.clone();
        for y in 0..src.ny() {
            for x in 0..src.nx() {
                let mut sum = 0.0;
                let mut count = 0usize;
                for &(dx, dy) in &offsets {
                    let nx = x as isize + dx;
                    let ny = y as isize + dy;
                    if !src.grid().in_bounds(nx, ny) {
                        continue;
                    }
                    let v = src.get(nx as usize, ny as usize);
                    if ValueGrid::is_bad(v) {
                        continue;
                    }
                    sum += v;
                    count += 1;
                }

                if (count as f64) / disc_area < self.bad_data_frac {
                    out.set(x, y, BAD_DATA);
                } else {
                    out.set(x, y, sum / count as f64);
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_zero_is_identity() {
        let mut g = ValueGrid::new(3, 3);
        for y in 0..3 {
            for x in 0..3 {
                g.set(x, y, (x + y) as f64);
            }
        }
        let conv = Convolver::new(0, 0.0).apply(&g);
        assert_eq!(conv.grid(), g.grid());
    }

    #[test]
    fn uniform_field_convolves_to_itself() {
        let mut g = ValueGrid::new(7, 7);
        for y in 0..7 {
            for x in 0..7 {
                g.set(x, y, 5.0);
            }
        }
        let conv = Convolver::new(2, 0.1).apply(&g);
        assert!((conv.get(3, 3) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn starved_neighbourhood_becomes_bad() {
        let g = ValueGrid::new(5, 5); // all BAD_DATA
        let conv = Convolver::new(1, 0.1).apply(&g);
        assert!(ValueGrid::is_bad(conv.get(2, 2)));
    }
}
