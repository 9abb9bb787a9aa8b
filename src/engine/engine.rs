//! The core engine: owns both sides' derivation caches, the running
//! [`SetCollection`], and the per-object/per-cluster feature arrays
//! (spec §4.8).

use std::rc::Rc;

use log::{debug, info, warn};

use crate::config::Config;
use crate::engine::state::{require, SideState};
use crate::error::{EngineError, EngineResult, Side};
use crate::features::{PairFeature, SingleFeature};
use crate::fuzzy::FuzzyInterest;
use crate::grid::ValueGrid;
use crate::sets::SetCollection;

/// Where the engine sits relative to matching, independent of either
/// side's own [`crate::engine::state::Stage`] (spec §4.8's state table
/// from `MERGED` onward is engine-wide, not per side).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MatchStage {
    PreMatch,
    Matched,
    ClusterSplit,
    Ready,
}

/// Which pool of per-object interest values [`Engine::interest_percentile`]
/// draws from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InterestSide {
    Fcst,
    Obs,
    Both,
}

/// The object-based verification engine: one forecast field, one
/// observation field, matched and merged into clusters.
///
/// Deliberately not `Clone` — an `Engine` owns a run's full derivation
/// state, and cloning it would silently duplicate that state rather
/// than share it. The one place a second engine is needed (the
/// fuzzy-engine pre-merge pass) uses [`Engine::seeded_from_side`], which
/// builds a fresh engine from a snapshot instead of duplicating `self`.
pub struct Engine {
    pub(crate) config: Rc<dyn Config>,
    pub fcst: SideState,
    pub obs: SideState,
    pub(crate) collection: SetCollection,
    pub(crate) fcst_singles: Vec<SingleFeature>,
    pub(crate) obs_singles: Vec<SingleFeature>,
    pub(crate) cluster_fcst_singles: Vec<SingleFeature>,
    pub(crate) cluster_obs_singles: Vec<SingleFeature>,
    pub(crate) cluster_interest: Vec<f64>,
    pub(crate) stage: MatchStage,
    /// Per-object maximum interest across all its candidate pairs,
    /// indexed by 0-based object number; populated by `do_matching_impl`
    /// over every scored pair regardless of `total_interest_thresh`.
    pub(crate) fcst_max_interest: Vec<f64>,
    pub(crate) obs_max_interest: Vec<f64>,
    /// Every (fcst, obs) single pair, size `n_fcst*n_obs`, indexed by
    /// `PairFeature::pair_number` (spec §6 output: the pair-feature array).
    pub(crate) pair_features: Vec<PairFeature>,
    /// One entry per matched cluster, size `n_clus` (spec §6 output: the
    /// cluster-pair-feature array).
    pub(crate) cluster_pair_features: Vec<PairFeature>,
}

impl Engine {
    pub fn new(config: Rc<dyn Config>) -> Self {
        Self {
            config,
            fcst: SideState::default(),
            obs: SideState::default(),
            collection: SetCollection::new(),
            fcst_singles: Vec::new(),
            obs_singles: Vec::new(),
            cluster_fcst_singles: Vec::new(),
            cluster_obs_singles: Vec::new(),
            cluster_interest: Vec::new(),
            stage: MatchStage::PreMatch,
            fcst_max_interest: Vec::new(),
            obs_max_interest: Vec::new(),
            pair_features: Vec::new(),
            cluster_pair_features: Vec::new(),
        }
    }

    /// Seed a sub-engine for the fuzzy-engine pre-merge pass: both the
    /// "fcst" and "obs" sides start from the same already-derived side
    /// state (spec §4.8, "no re-splitting"). Resolves the Open Question
    /// of which configuration the sub-engine runs under by sharing the
    /// parent's `Rc<dyn Config>` — the original engine also reuses its
    /// own `wconf` for this pass.
    pub(crate) fn seeded_from_side(config: Rc<dyn Config>, side_state: &SideState) -> EngineResult<Self> {
        let mut engine = Self::new(config);
        engine.fcst = side_state.clone();
        engine.obs = side_state.clone();
        engine.fcst.cluster_split = None;
        engine.obs.cluster_split = None;
        Ok(engine)
    }

    pub fn config(&self) -> &dyn Config {
        &*self.config
    }

    pub fn stage(&self) -> MatchStage {
        self.stage
    }

    pub fn n_sets(&self) -> usize {
        self.collection.n_sets()
    }

    pub fn fcst_singles(&self) -> &[SingleFeature] {
        &self.fcst_singles
    }

    pub fn obs_singles(&self) -> &[SingleFeature] {
        &self.obs_singles
    }

    pub fn cluster_fcst_singles(&self) -> &[SingleFeature] {
        &self.cluster_fcst_singles
    }

    pub fn cluster_obs_singles(&self) -> &[SingleFeature] {
        &self.cluster_obs_singles
    }

    pub fn cluster_interest(&self) -> &[f64] {
        &self.cluster_interest
    }

    /// The pair-feature array, size `n_fcst*n_obs`, indexed by
    /// `PairFeature::pair_number`.
    pub fn pair_features(&self) -> &[PairFeature] {
        &self.pair_features
    }

    /// One [`PairFeature`] per matched cluster, size `n_clus`, in cluster
    /// order.
    pub fn cluster_pair_features(&self) -> &[PairFeature] {
        &self.cluster_pair_features
    }

    /// The `pct`-percentile of each object's maximum interest across all
    /// its candidate pairs, pooled per `side` (supplemented from the
    /// original engine's `interest_percentile`). Returns [`crate::grid::BAD_DATA`]
    /// if the pool is empty.
    pub fn interest_percentile(&self, pct: f64, side: InterestSide) -> f64 {
        let pooled: Vec<f64> = match side {
            InterestSide::Fcst => self.fcst_max_interest.clone(),
            InterestSide::Obs => self.obs_max_interest.clone(),
            InterestSide::Both => self
                .fcst_max_interest
                .iter()
                .chain(self.obs_max_interest.iter())
                .copied()
                .collect(),
        };
        if pooled.is_empty() {
            return crate::grid::BAD_DATA;
        }
        FuzzyInterest::interest_percentile(&pooled, pct)
    }

    /// Copy in both raw fields, border-zero them, and run each side's
    /// `filter → convolution → thresholding → splitting` chain (spec
    /// §4.8's `set()` constructor sequence).
    pub fn set(&mut self, mut fcst_raw: ValueGrid, mut obs_raw: ValueGrid) -> EngineResult<()> {
        debug!("set: fcst {}x{}, obs {}x{}", fcst_raw.nx(), fcst_raw.ny(), obs_raw.nx(), obs_raw.ny());
        let zero_border = self.config.zero_border_size();
        fcst_raw.zero_border(zero_border, crate::grid::BAD_DATA);
        obs_raw.zero_border(zero_border, crate::grid::BAD_DATA);

        self.fcst = SideState::new(fcst_raw);
        self.obs = SideState::new(obs_raw);
        self.collection = SetCollection::new();
        self.fcst_singles.clear();
        self.obs_singles.clear();
        self.cluster_fcst_singles.clear();
        self.cluster_obs_singles.clear();
        self.cluster_interest.clear();
        self.stage = MatchStage::PreMatch;
        self.fcst_max_interest.clear();
        self.obs_max_interest.clear();
        self.pair_features.clear();
        self.cluster_pair_features.clear();

        self.fcst.run_chain(self.config.as_ref(), Side::Fcst, zero_border)?;
        self.check_object_count(Side::Fcst)?;
        self.obs.run_chain(self.config.as_ref(), Side::Obs, zero_border)?;
        self.check_object_count(Side::Obs)?;
        info!("set: n_fcst={} n_obs={}", self.fcst.n_objects, self.obs.n_objects);
        Ok(())
    }

    fn check_object_count(&self, side: Side) -> EngineResult<()> {
        let count = match side {
            Side::Fcst => self.fcst.n_objects,
            Side::Obs => self.obs.n_objects,
        };
        let max_singles = self.config.max_singles();
        if count > max_singles {
            warn!("{side} object count {count} exceeds max_singles {max_singles}");
            return Err(EngineError::ObjectCountExceeded { side, count, max_singles });
        }
        Ok(())
    }

    /// Compute [`SingleFeature`]s for every simple object on both sides,
    /// using each side's already-split grids.
    pub(crate) fn compute_singles(&mut self) -> EngineResult<()> {
        let pct_user = self.config.intensity_percentile();
        self.fcst_singles = Self::side_singles(&self.fcst, pct_user)?;
        self.obs_singles = Self::side_singles(&self.obs, pct_user)?;
        Ok(())
    }

    fn side_singles(state: &SideState, pct_user: u8) -> EngineResult<Vec<SingleFeature>> {
        let split = require(&state.split, "compute_singles: split grid missing")?;
        let filter = require(&state.filter, "compute_singles: filter grid missing")?;
        let thresh = require(&state.thresh, "compute_singles: thresh grid missing")?;
        Ok((1..=state.n_objects as i32)
            .map(|k| {
                let object_mask = split.select(k);
                SingleFeature::compute(k as usize, filter, thresh, &object_mask, pct_user)
            })
            .collect())
    }

    /// Pre-merge (both sides, per their configured [`crate::config::MergeFlag`])
    /// followed by cross-field matching (spec §4.8's top-level driver).
    pub fn do_match_merge(&mut self) -> EngineResult<()> {
        debug!("do_match_merge: entry");
        if self.fcst_singles.is_empty() && self.fcst.n_objects > 0 {
            self.compute_singles()?;
        }
        self.do_merging_for(Side::Fcst)?;
        self.do_merging_for(Side::Obs)?;
        self.do_matching_impl()?;
        self.stage = MatchStage::Matched;
        info!("do_match_merge: {} pre-cluster sets", self.collection.n_sets());
        Ok(())
    }

    /// Advance through cluster-splitting and cluster-feature computation,
    /// completing the engine's lifecycle (`MATCHED → CLUSTER_SPLIT → READY`).
    pub fn finish(&mut self) -> EngineResult<()> {
        debug!("finish: entry");
        self.do_cluster_splitting_impl()?;
        self.stage = MatchStage::ClusterSplit;
        self.do_cluster_features_impl()?;
        self.stage = MatchStage::Ready;
        info!("finish: n_clus={}", self.collection.n_sets());
        Ok(())
    }

    /// Run the full pipeline: `set` → `do_match_merge` → `finish`.
    pub fn run(&mut self, fcst_raw: ValueGrid, obs_raw: ValueGrid) -> EngineResult<()> {
        self.set(fcst_raw, obs_raw)?;
        self.do_match_merge()?;
        self.finish()
    }
}
