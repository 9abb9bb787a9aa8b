//! Per-side derivation cache and the `raw → filter → conv → mask → split`
//! chain (spec §4.8).

use crate::config::{Config, SingleThresh};
use crate::convolve::Convolver;
use crate::error::{EngineError, EngineResult, Side};
use crate::grid::{LabelGrid, ValueGrid, BAD_DATA};
use crate::mask;

/// Where a side sits in the `raw → filter → conv → mask → split → merged`
/// chain (spec §4.8's state-machine table, up to `MERGED`; matching and
/// cluster-splitting are engine-level, not per side).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    New,
    Filtered,
    Convolved,
    Masked,
    Split,
    Merged,
}

impl Default for Stage {
    fn default() -> Self {
        Stage::New
    }
}

/// The full set of derived grids for one side (fcst or obs), each cached
/// once computed. `None` means "not yet derived" — the staleness flag is
/// simply the presence/absence of the cache entry plus [`Stage`].
#[derive(Clone, Debug, Default)]
pub struct SideState {
    pub raw: Option<ValueGrid>,
    /// `raw` after `raw_thresh` filtering; bad-data unchanged.
    pub filter: Option<ValueGrid>,
    /// Binary: `conv_thresh` applied to `filter` (used both to help seed
    /// `mask` and as the "threshold_mask" input to `SingleFeature::compute`).
    pub thresh: Option<LabelGrid>,
    pub conv: Option<ValueGrid>,
    pub mask: Option<LabelGrid>,
    pub split: Option<LabelGrid>,
    pub n_objects: usize,
    pub cluster_split: Option<LabelGrid>,
    pub stage: Stage,
}

pub(crate) fn require<'a, T>(opt: &'a Option<T>, detail: &str) -> EngineResult<&'a T> {
    opt.as_ref().ok_or_else(|| EngineError::InternalState { detail: detail.to_string() })
}

fn raw_thresh(cfg: &dyn Config, side: Side) -> SingleThresh {
    match side {
        Side::Fcst => cfg.fcst_raw_thresh(),
        Side::Obs => cfg.obs_raw_thresh(),
    }
}

fn conv_thresh(cfg: &dyn Config, side: Side) -> SingleThresh {
    match side {
        Side::Fcst => cfg.fcst_conv_thresh(),
        Side::Obs => cfg.obs_conv_thresh(),
    }
}

fn area_thresh(cfg: &dyn Config, side: Side) -> SingleThresh {
    match side {
        Side::Fcst => cfg.fcst_area_thresh(),
        Side::Obs => cfg.obs_area_thresh(),
    }
}

fn inten_perc(cfg: &dyn Config, side: Side) -> u8 {
    match side {
        Side::Fcst => cfg.fcst_inten_perc(),
        Side::Obs => cfg.obs_inten_perc(),
    }
}

fn inten_perc_thresh(cfg: &dyn Config, side: Side) -> SingleThresh {
    match side {
        Side::Fcst => cfg.fcst_inten_perc_thresh(),
        Side::Obs => cfg.obs_inten_perc_thresh(),
    }
}

fn conv_radius(cfg: &dyn Config, side: Side) -> usize {
    match side {
        Side::Fcst => cfg.fcst_conv_radius(),
        Side::Obs => cfg.obs_conv_radius(),
    }
}

impl SideState {
    pub fn new(raw: ValueGrid) -> Self {
        Self { raw: Some(raw), stage: Stage::New, ..Default::default() }
    }

    /// `raw_thresh` filters `raw`; `conv_thresh` on the filtered field
    /// seeds `thresh`. Clears this stage's own staleness and implicitly
    /// invalidates everything downstream (overwritten by later calls).
    pub fn do_filter(&mut self, cfg: &dyn Config, side: Side) -> EngineResult<()> {
        let raw = require(&self.raw, "do_filter: raw grid not set")?;
        let filtered = raw.filter(raw_thresh(cfg, side));
        let thresh = filtered.threshold_double(conv_thresh(cfg, side));
        self.filter = Some(filtered);
        self.thresh = Some(thresh);
        self.conv = None;
        self.mask = None;
        self.split = None;
        self.n_objects = 0;
        self.cluster_split = None;
        self.stage = Stage::Filtered;
        Ok(())
    }

    /// Circular mean filter over `filter`, border-zeroed to `BAD_DATA`.
    pub fn do_convolution(&mut self, cfg: &dyn Config, side: Side, zero_border: usize) -> EngineResult<()> {
        let filter = require(&self.filter, "do_convolution: filter grid not set")?;
        let conv = Convolver::new(conv_radius(cfg, side), cfg.bad_data_thresh()).apply(filter);
        let mut conv = conv;
        conv.zero_border(zero_border, BAD_DATA);
        self.conv = Some(conv);
        self.mask = None;
        self.split = None;
        self.n_objects = 0;
        self.cluster_split = None;
        self.stage = Stage::Convolved;
        Ok(())
    }

    /// `threshold_double` then `threshold_area` then `threshold_intensity`
    /// (using `filter`, not `conv`, for the intensity values per spec §4.8).
    pub fn do_thresholding(&mut self, cfg: &dyn Config, side: Side) -> EngineResult<()> {
        let conv = require(&self.conv, "do_thresholding: conv grid not set")?;
        let filter = require(&self.filter, "do_thresholding: filter grid not set")?.clone();
        let mut mask = conv.threshold_double(conv_thresh(cfg, side));
        mask::threshold_area(&mut mask, area_thresh(cfg, side));
        mask::threshold_intensity(&mut mask, &filter, inten_perc(cfg, side) as f64, inten_perc_thresh(cfg, side));
        self.mask = Some(mask);
        self.split = None;
        self.n_objects = 0;
        self.cluster_split = None;
        self.stage = Stage::Masked;
        Ok(())
    }

    pub fn do_splitting(&mut self) -> EngineResult<()> {
        let mask = require(&self.mask, "do_splitting: mask grid not set")?;
        let (split, n) = mask::split(mask);
        self.split = Some(split);
        self.n_objects = n;
        self.cluster_split = None;
        self.stage = Stage::Split;
        Ok(())
    }

    /// Run the full `filter → convolution → thresholding → splitting`
    /// chain for this side (spec §4.8's `set()` constructor sequence).
    pub fn run_chain(&mut self, cfg: &dyn Config, side: Side, zero_border: usize) -> EngineResult<()> {
        self.do_filter(cfg, side)?;
        self.do_convolution(cfg, side, zero_border)?;
        self.do_thresholding(cfg, side)?;
        self.do_splitting()
    }
}
