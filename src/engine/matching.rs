//! Cross-field matching, cluster-splitting, and cluster-feature
//! computation (spec §4.8 `do_matching`, "Cluster splitting", "Cluster
//! features").

use crate::config::MatchFlag;
use crate::engine::engine::Engine;
use crate::engine::state::{require, SideState};
use crate::error::{EngineResult, Side};
use crate::features::{PairFeature, SingleFeature};
use crate::fuzzy::FuzzyInterest;
use crate::grid::{LabelGrid, BAD_DATA};
use crate::sets::SetCollection;

impl Engine {
    /// Score every (fcst, obs) pair, sort by interest descending, and
    /// feed the accepted ones to `SetCollection::add_pair` per the
    /// configured [`MatchFlag`].
    pub(crate) fn do_matching_impl(&mut self) -> EngineResult<()> {
        let max_centroid_dist = self.config.max_centroid_dist();
        let n_fcst = self.fcst_singles.len();
        let n_obs = self.obs_singles.len();

        let mut fcst_max = vec![BAD_DATA; n_fcst];
        let mut obs_max = vec![BAD_DATA; n_obs];
        let mut scored: Vec<(i32, i32, f64)> = Vec::new();
        let mut pair_features = Vec::with_capacity(n_fcst * n_obs);
        for (fi, f) in self.fcst_singles.iter().enumerate() {
            for (oi, o) in self.obs_singles.iter().enumerate() {
                let pf = PairFeature::compute(f, o, fi, oi, n_fcst, max_centroid_dist);
                if f.is_empty() || o.is_empty() {
                    pair_features.push(pf);
                    continue;
                }
                let interest = FuzzyInterest::total_interest(self.config.as_ref(), &pf);
                pair_features.push(pf);
                if interest == BAD_DATA {
                    continue;
                }
                if interest > fcst_max[fi] {
                    fcst_max[fi] = interest;
                }
                if interest > obs_max[oi] {
                    obs_max[oi] = interest;
                }
                scored.push((f.object_number as i32, o.object_number as i32, interest));
            }
        }
        self.pair_features = pair_features;
        self.fcst_max_interest = fcst_max.into_iter().filter(|&v| v != BAD_DATA).collect();
        self.obs_max_interest = obs_max.into_iter().filter(|&v| v != BAD_DATA).collect();

        let match_flag = self.config.match_flag();
        if match_flag == MatchFlag::None {
            return Ok(());
        }
        let total_interest_thresh = self.config.total_interest_thresh();
        scored.sort_by(|a, b| b.2.partial_cmp(&a.2).expect("NaN total_interest"));

        for (fj, ok, interest) in scored {
            if interest < total_interest_thresh {
                continue;
            }
            match match_flag {
                MatchFlag::MatchMerge => self.collection.add_pair(fj, ok),
                MatchFlag::MatchFcstMerge => {
                    if self.collection.fcst_set_number(fj) == -1 {
                        self.collection.add_pair(fj, ok);
                    }
                }
                MatchFlag::MatchOnly => {
                    if self.collection.fcst_set_number(fj) == -1 && self.collection.obs_set_number(ok) == -1 {
                        self.collection.add_pair(fj, ok);
                    }
                }
                MatchFlag::None => unreachable!("checked above"),
            }
        }
        Ok(())
    }

    /// For each side, relabel `split` through the set collection: pixel
    /// labeled `k` becomes `set_number(k)+1`, or 0 if `k` is unmatched.
    pub(crate) fn do_cluster_splitting_impl(&mut self) -> EngineResult<()> {
        self.collection.clear_empty_sets();
        self.fcst.cluster_split = Some(relabel_by_set(&self.fcst, Side::Fcst, &self.collection)?);
        self.obs.cluster_split = Some(relabel_by_set(&self.obs, Side::Obs, &self.collection)?);
        Ok(())
    }

    /// Compute per-cluster fcst/obs singles and their pair interest
    /// (spec §4.8 "Cluster features").
    pub(crate) fn do_cluster_features_impl(&mut self) -> EngineResult<()> {
        let n_sets = self.collection.n_sets();
        let pct_user = self.config.intensity_percentile();
        let max_centroid_dist = self.config.max_centroid_dist();

        let fcst_filter = require(&self.fcst.filter, "do_cluster_features: fcst filter missing")?.clone();
        let fcst_thresh = require(&self.fcst.thresh, "do_cluster_features: fcst thresh missing")?.clone();
        let obs_filter = require(&self.obs.filter, "do_cluster_features: obs filter missing")?.clone();
        let obs_thresh = require(&self.obs.thresh, "do_cluster_features: obs thresh missing")?.clone();
        let fcst_cluster_split =
            require(&self.fcst.cluster_split, "do_cluster_features: fcst cluster_split missing")?.clone();
        let obs_cluster_split =
            require(&self.obs.cluster_split, "do_cluster_features: obs cluster_split missing")?.clone();

        let mut cluster_fcst = Vec::with_capacity(n_sets);
        let mut cluster_obs = Vec::with_capacity(n_sets);
        let mut cluster_interest = Vec::with_capacity(n_sets);
        let mut cluster_pair_features = Vec::with_capacity(n_sets);

        for s in 0..n_sets {
            let set_no = (s + 1) as i32;
            let fcst_mask = fcst_cluster_split.select(set_no);
            let obs_mask = obs_cluster_split.select(set_no);

            let fcst_single = SingleFeature::compute(s + 1, &fcst_filter, &fcst_thresh, &fcst_mask, pct_user);
            let obs_single = SingleFeature::compute(s + 1, &obs_filter, &obs_thresh, &obs_mask, pct_user);

            let pf = PairFeature::compute(&fcst_single, &obs_single, s, s, n_sets, max_centroid_dist);
            let interest = FuzzyInterest::total_interest(self.config.as_ref(), &pf);

            cluster_fcst.push(fcst_single);
            cluster_obs.push(obs_single);
            cluster_interest.push(interest);
            cluster_pair_features.push(pf);
        }

        self.cluster_fcst_singles = cluster_fcst;
        self.cluster_obs_singles = cluster_obs;
        self.cluster_interest = cluster_interest;
        self.cluster_pair_features = cluster_pair_features;
        Ok(())
    }
}

fn relabel_by_set(state: &SideState, side: Side, collection: &SetCollection) -> EngineResult<LabelGrid> {
    let split = require(&state.split, "relabel_by_set: split grid missing")?;
    let mut out = LabelGrid::new(split.nx(), split.ny());
    for (x, y) in split.grid().iter_xy() {
        let k = split.get(x, y);
        if k == 0 {
            continue;
        }
        let set_no = match side {
            Side::Fcst => collection.fcst_set_number(k),
            Side::Obs => collection.obs_set_number(k),
        };
        if set_no >= 0 {
            out.set(x, y, set_no + 1);
        }
    }
    Ok(out)
}
