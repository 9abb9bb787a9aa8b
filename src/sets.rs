//! Equivalence-set bookkeeping over 1-based fcst/obs object ids (spec
//! §4.7): `SetCollection` grows sets dynamically as `add_pair` unions
//! them, and each set tracks two independent id lists (fcst and obs)
//! rather than one.

/// An unordered pair of id lists sharing a cluster identity. `-1` on
/// either side only ever appears as a single sentinel pushed by the
/// one-sided `add_pair` case, never accumulated more than once per side
/// per set (the one-sided case always targets an existing or freshly
/// created set).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectSet {
    pub fcst_ids: Vec<i32>,
    pub obs_ids: Vec<i32>,
}

impl ObjectSet {
    pub fn has_fcst(&self, n: i32) -> bool {
        self.fcst_ids.contains(&n)
    }

    pub fn has_obs(&self, n: i32) -> bool {
        self.obs_ids.contains(&n)
    }

    pub fn is_empty(&self) -> bool {
        self.fcst_ids.is_empty() && self.obs_ids.is_empty()
    }

    fn push_fcst(&mut self, n: i32) {
        if n != -1 && !self.has_fcst(n) {
            self.fcst_ids.push(n);
        }
    }

    fn push_obs(&mut self, n: i32) {
        if n != -1 && !self.has_obs(n) {
            self.obs_ids.push(n);
        }
    }

    fn absorb(&mut self, other: &ObjectSet) {
        for &f in &other.fcst_ids {
            self.push_fcst(f);
        }
        for &o in &other.obs_ids {
            self.push_obs(o);
        }
    }
}

/// A growing sequence of [`ObjectSet`]s, built up by repeated
/// [`Self::add_pair`] calls over the course of a merge pass.
#[derive(Clone, Debug, Default)]
pub struct SetCollection {
    sets: Vec<ObjectSet>,
}

impl SetCollection {
    pub fn new() -> Self {
        Self { sets: Vec::new() }
    }

    pub fn n_sets(&self) -> usize {
        self.sets.len()
    }

    pub fn sets(&self) -> &[ObjectSet] {
        &self.sets
    }

    fn find_fcst(&self, n: i32) -> Option<usize> {
        if n == -1 {
            return None;
        }
        self.sets.iter().position(|s| s.has_fcst(n))
    }

    fn find_obs(&self, n: i32) -> Option<usize> {
        if n == -1 {
            return None;
        }
        self.sets.iter().position(|s| s.has_obs(n))
    }

    /// Merge `f` and `o` into a shared set (spec §4.7's six-way case
    /// split). `-1` means "no id on this side". Idempotent: calling
    /// `add_pair(f, o)` a second time with the same ids is a no-op.
    pub fn add_pair(&mut self, f: i32, o: i32) {
        let sf = self.find_fcst(f);
        let so = self.find_obs(o);

        match (sf, so) {
            (None, None) => {
                let mut set = ObjectSet::default();
                set.push_fcst(f);
                set.push_obs(o);
                self.sets.push(set);
            }
            (Some(i), None) => self.sets[i].push_obs(o),
            (None, Some(j)) => self.sets[j].push_fcst(f),
            (Some(i), Some(j)) if i == j => {}
            (Some(i), Some(j)) => {
                let (keep, drop) = if i < j { (i, j) } else { (j, i) };
                let removed = self.sets.remove(drop);
                self.sets[keep].absorb(&removed);
            }
        }
    }

    /// 0-based index of the set containing fcst id `n`, or `-1` if `n`
    /// is unmatched.
    pub fn fcst_set_number(&self, n: i32) -> i32 {
        self.find_fcst(n).map(|i| i as i32).unwrap_or(-1)
    }

    /// 0-based index of the set containing obs id `n`, or `-1` if `n`
    /// is unmatched.
    pub fn obs_set_number(&self, n: i32) -> i32 {
        self.find_obs(n).map(|i| i as i32).unwrap_or(-1)
    }

    /// Remove sets whose both id lists are empty.
    pub fn clear_empty_sets(&mut self) {
        self.sets.retain(|s| !s.is_empty());
    }

    /// Union `fcst_ids` and `obs_ids` into a single set, absorbing any
    /// existing sets that already hold one of these ids (the same
    /// first-match-wins partition invariant `add_pair` maintains). Used
    /// by the pre-merge passes (spec §4.8), which build a whole group
    /// from a single merge-shape inclusion test rather than pairwise.
    pub fn add_group(&mut self, fcst_ids: &[i32], obs_ids: &[i32]) {
        if fcst_ids.is_empty() && obs_ids.is_empty() {
            return;
        }
        let mut found: Vec<usize> = Vec::new();
        for &f in fcst_ids {
            if let Some(i) = self.find_fcst(f) {
                if !found.contains(&i) {
                    found.push(i);
                }
            }
        }
        for &o in obs_ids {
            if let Some(i) = self.find_obs(o) {
                if !found.contains(&i) {
                    found.push(i);
                }
            }
        }
        found.sort_unstable();

        let keep = if let Some(&first) = found.first() {
            for &idx in found[1..].iter().rev() {
                let removed = self.sets.remove(idx);
                self.sets[first].absorb(&removed);
            }
            first
        } else {
            self.sets.push(ObjectSet::default());
            self.sets.len() - 1
        };

        for &f in fcst_ids {
            self.sets[keep].push_fcst(f);
        }
        for &o in obs_ids {
            self.sets[keep].push_obs(o);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_pair_creates_new_set_when_neither_found() {
        let mut c = SetCollection::new();
        c.add_pair(1, 2);
        assert_eq!(c.n_sets(), 1);
        assert_eq!(c.fcst_set_number(1), 0);
        assert_eq!(c.obs_set_number(2), 0);
    }

    #[test]
    fn add_pair_extends_existing_fcst_set() {
        let mut c = SetCollection::new();
        c.add_pair(1, 2);
        c.add_pair(1, 3);
        assert_eq!(c.n_sets(), 1);
        assert_eq!(c.obs_set_number(3), 0);
    }

    #[test]
    fn add_pair_merges_two_distinct_sets() {
        let mut c = SetCollection::new();
        c.add_pair(1, 2);
        c.add_pair(3, 4);
        assert_eq!(c.n_sets(), 2);
        // (1,4) bridges set-of-1 and set-of-4 together.
        c.add_pair(1, 4);
        assert_eq!(c.n_sets(), 1);
        assert_eq!(c.fcst_set_number(1), c.fcst_set_number(3));
        assert_eq!(c.obs_set_number(2), c.obs_set_number(4));
    }

    #[test]
    fn add_pair_is_idempotent() {
        let mut c = SetCollection::new();
        c.add_pair(1, 2);
        c.add_pair(1, 2);
        assert_eq!(c.n_sets(), 1);
        assert_eq!(c.sets()[0].fcst_ids, vec![1]);
        assert_eq!(c.sets()[0].obs_ids, vec![2]);
    }

    #[test]
    fn add_group_absorbs_a_set_an_id_already_belongs_to() {
        let mut c = SetCollection::new();
        c.add_pair(1, 2); // 1 is already in set 0
        c.add_group(&[1, 3, 5], &[]);
        assert_eq!(c.n_sets(), 1);
        assert_eq!(c.fcst_set_number(1), 0);
        assert_eq!(c.fcst_set_number(3), 0);
        assert_eq!(c.fcst_set_number(5), 0);
        assert_eq!(c.obs_set_number(2), 0);
    }

    #[test]
    fn add_group_merges_multiple_existing_sets() {
        let mut c = SetCollection::new();
        c.add_pair(1, -1);
        c.add_pair(2, -1);
        c.add_pair(3, -1);
        assert_eq!(c.n_sets(), 3);
        c.add_group(&[1, 2, 3], &[9]);
        assert_eq!(c.n_sets(), 1);
        assert_eq!(c.fcst_set_number(1), c.fcst_set_number(2));
        assert_eq!(c.fcst_set_number(2), c.fcst_set_number(3));
        assert_eq!(c.obs_set_number(9), c.fcst_set_number(1));
    }

    #[test]
    fn add_group_with_no_prior_membership_creates_one_new_set() {
        let mut c = SetCollection::new();
        c.add_group(&[1, 3, 5], &[]);
        assert_eq!(c.n_sets(), 1);
        assert_eq!(c.sets()[0].fcst_ids, vec![1, 3, 5]);
    }

    #[test]
    fn one_sided_add_pair_creates_fcst_only_set() {
        let mut c = SetCollection::new();
        c.add_pair(5, -1);
        assert_eq!(c.n_sets(), 1);
        assert_eq!(c.fcst_set_number(5), 0);
        assert!(c.sets()[0].obs_ids.is_empty());
    }

    #[test]
    fn clear_empty_sets_drops_fully_vacated_sets() {
        let mut c = SetCollection::new();
        c.add_pair(1, -1);
        c.add_pair(2, 3);
        c.sets[0].fcst_ids.clear();
        c.clear_empty_sets();
        assert_eq!(c.n_sets(), 1);
        assert_eq!(c.fcst_set_number(2), 0);
    }
}
