//! Object attribute computation (spec §4.4, §4.5).

pub mod pair;
pub mod single;

pub use pair::PairFeature;
pub use single::{IntensityPercentiles, SingleFeature};
