use ahash::{AHashMap, AHashSet};
use std::collections::VecDeque;

use crate::region::{RegionGraph, RegionIndex};

/// A mutable set of member regions plus the bookkeeping the solver needs to
/// grow or shrink it in O(degree) time: boundary adjacency counts, a running
/// metric total, and remaining headroom against the balance bound.
///
/// `index == 0` marks a *provisional* district (an unused-district-forest
/// component, see [`crate::unused::UnusedForest`]) — for those, `metric`
/// and `remaining_overhead` are not maintained.
#[derive(Debug, Clone)]
pub struct District {
    pub index: u32,
    members: AHashSet<RegionIndex>,
    adj: AHashMap<RegionIndex, u32>,
    metric: i64,
    remaining_overhead: i64,
    metric_idx: usize,
}

impl District {
    pub fn new(index: u32, metric_idx: usize, max_acceptable: i64) -> Self {
        Self {
            index,
            members: AHashSet::new(),
            adj: AHashMap::new(),
            metric: 0,
            remaining_overhead: max_acceptable,
            metric_idx,
        }
    }

    #[inline] pub fn members(&self) -> &AHashSet<RegionIndex> { &self.members }

    #[inline] pub fn len(&self) -> usize { self.members.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.members.is_empty() }

    #[inline] pub fn contains(&self, r: RegionIndex) -> bool { self.members.contains(&r) }

    #[inline] pub fn adj(&self) -> &AHashMap<RegionIndex, u32> { &self.adj }

    #[inline] pub fn metric(&self) -> i64 { self.metric }

    #[inline] pub fn remaining_overhead(&self) -> i64 { self.remaining_overhead }

    /// Insert `r` into this district, updating metric totals and the
    /// boundary adjacency map.
    pub fn add_region(&mut self, graph: &RegionGraph, r: RegionIndex) {
        self.members.insert(r);
        if self.index != 0 {
            let m = graph.metric(r, self.metric_idx);
            self.metric += m;
            self.remaining_overhead -= m;
        }
        self.adj.remove(&r);
        for &code in graph.adj(r).iter() {
            if !self.members.contains(&code) {
                *self.adj.entry(code).or_insert(0) += 1;
            }
        }
    }

    /// Remove `r` from this district (the inverse of [`Self::add_region`]).
    pub fn remove_region(&mut self, graph: &RegionGraph, r: RegionIndex) {
        self.members.remove(&r);
        if self.index != 0 {
            let m = graph.metric(r, self.metric_idx);
            self.metric -= m;
            self.remaining_overhead += m;
        }

        let former_neighbors_remaining = graph.adj(r).iter().filter(|c| self.members.contains(c)).count() as u32;
        if former_neighbors_remaining > 0 {
            self.adj.insert(r, former_neighbors_remaining);
        } else {
            self.adj.remove(&r);
        }

        for &code in graph.adj(r).iter() {
            if let Some(count) = self.adj.get_mut(&code) {
                *count -= 1;
                if *count == 0 { self.adj.remove(&code); }
            }
        }
    }

    /// `index == 0` admits anything; otherwise the region's metric must fit
    /// within remaining overhead.
    #[inline]
    pub fn can_add(&self, graph: &RegionGraph, r: RegionIndex) -> bool {
        self.index == 0 || self.remaining_overhead >= graph.metric(r, self.metric_idx)
    }

    /// An empty `adj` admits a disconnected seed.
    #[inline]
    pub fn is_adjacent(&self, r: RegionIndex) -> bool {
        self.adj.is_empty() || self.adj.contains_key(&r)
    }

    /// True iff removing `r` would leave the remaining members connected.
    ///
    /// Only the members adjacent to `r` need to be mutually reachable
    /// without passing through `r` — everything else stays attached to one
    /// of them. Bounded BFS restricted to that adjacent set.
    pub fn can_remove(&self, graph: &RegionGraph, r: RegionIndex) -> bool {
        let neighbors: Vec<RegionIndex> = graph.adj(r).iter().copied()
            .filter(|n| self.members.contains(n))
            .collect();

        if neighbors.len() <= 1 { return true }

        let mut visited: AHashSet<RegionIndex> = AHashSet::new();
        visited.insert(r);
        visited.insert(neighbors[0]);

        let mut remaining = neighbors.len() - 1;
        let mut queue = VecDeque::from([neighbors[0]]);
        while let Some(u) = queue.pop_front() {
            for &v in graph.adj(u) {
                if v != r && self.members.contains(&v) && visited.insert(v) {
                    queue.push_back(v);
                    if neighbors.contains(&v) {
                        remaining -= 1;
                        if remaining == 0 { return true }
                    }
                }
            }
        }

        neighbors.iter().all(|n| visited.contains(n))
    }
}

impl PartialEq for District {
    fn eq(&self, other: &Self) -> bool { self.metric == other.metric }
}
impl Eq for District {}

impl PartialOrd for District {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> { Some(self.cmp(other)) }
}

/// Districts order by metric, smallest first — the solver repeatedly asks
/// for the minimum-metric district to grow next.
impl Ord for District {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering { self.metric.cmp(&other.metric) }
}
