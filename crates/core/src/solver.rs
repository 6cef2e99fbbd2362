use std::collections::HashMap;
use std::sync::Arc;

use ahash::AHashMap;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::balance::max_acceptable_metric;
use crate::district::District;
use crate::placement::Placements;
use crate::region::{MetricRef, RegionGraph, RegionIndex};
use crate::stats::SolverStats;
use crate::unused::UnusedForest;

/// One row of [`Solver::current_assignment`]: a placed region's name, code,
/// owning district index, and metric value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRow {
    pub name: String,
    pub code: String,
    pub district: u32,
    pub metric: i64,
}

/// Serializable solver state: placements as `code -> district index`, and
/// the unplaced set as a list of codes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverSnapshot {
    pub placements: HashMap<String, u32>,
    pub unplaced: Vec<String>,
}

/// The greedy-with-backtracking combinatorial districting solver.
///
/// Multiple `Solver`s may run concurrently as long as each owns its own
/// instance and they only share the immutable [`RegionGraph`];
/// a single instance is driven by `&mut self` and is not itself safe for
/// concurrent access. `in_progress` rejects reentrant `step()` calls but is
/// not a lock.
pub struct Solver {
    graph: Arc<RegionGraph>,
    metric_idx: usize,
    k: u32,
    max_acceptable: i64,
    districts: Vec<District>,
    placements: Placements,
    unused: UnusedForest,
    stats: SolverStats,
    in_progress: bool,
}

impl Solver {
    pub fn new(graph: Arc<RegionGraph>, metric: MetricRef, k: u32) -> Result<Self> {
        let mut solver = Self {
            metric_idx: 0,
            k: 0,
            max_acceptable: 0,
            districts: Vec::new(),
            placements: Placements::new(graph.len()),
            unused: UnusedForest::new(),
            stats: SolverStats::new(),
            in_progress: false,
            graph,
        };
        solver.reset(metric, k)?;
        Ok(solver)
    }

    /// Reinitialize without destroying the instance.
    pub fn reset(&mut self, metric: MetricRef, k: u32) -> Result<()> {
        if k < 1 {
            bail!("k must be at least 1, got {}", k);
        }
        let metric_idx = metric.resolve(self.graph.metrics())?;

        self.metric_idx = metric_idx;
        self.k = k;
        self.max_acceptable = max_acceptable_metric(&self.graph, metric_idx, k);
        self.districts = (0..k).map(|i| District::new(i + 1, metric_idx, self.max_acceptable)).collect();
        self.placements = Placements::new(self.graph.len());
        self.unused = UnusedForest::new();
        self.unused.rebuild(&self.graph, self.graph.iter_indices());
        self.stats = SolverStats::new();
        self.in_progress = false;
        Ok(())
    }

    #[inline] pub fn districts(&self) -> &[District] { &self.districts }

    #[inline] pub fn max_acceptable(&self) -> i64 { self.max_acceptable }

    #[inline] pub fn stats(&self) -> &SolverStats { &self.stats }

    #[inline] pub fn graph(&self) -> &RegionGraph { &self.graph }

    #[inline] pub fn num_failures(&self) -> usize { self.placements.num_failures() }

    pub fn is_solved(&self) -> bool {
        self.placements.all_placed() && self.districts.iter().all(|d| d.metric() <= self.max_acceptable)
    }

    /// `100 * pstdev(district metrics) / sum(district metrics)`, 0 if the
    /// sum is zero.
    pub fn standard_deviation_percent(&self) -> f64 {
        let metrics: Vec<f64> = self.districts.iter().map(|d| d.metric() as f64).collect();
        let sum: f64 = metrics.iter().sum();
        if sum == 0.0 { return 0.0; }

        let mean = sum / metrics.len() as f64;
        let variance = metrics.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / metrics.len() as f64;
        100.0 * variance.sqrt() / sum
    }

    pub fn elapsed_seconds(&self) -> f64 { self.stats.elapsed_seconds() }

    /// Per-member-region `(name, code, district, metric)` rows; a one-row
    /// sentinel when nothing has been placed yet.
    pub fn current_assignment(&self) -> Vec<AssignmentRow> {
        let mut rows: Vec<AssignmentRow> = self.districts.iter()
            .flat_map(|d| {
                let metric_idx = self.metric_idx;
                d.members().iter().map(move |&r| AssignmentRow {
                    name: self.graph.name(r).to_string(),
                    code: self.graph.code(r).to_string(),
                    district: d.index,
                    metric: self.graph.metric(r, metric_idx),
                })
            })
            .collect();

        if rows.is_empty() {
            rows.push(AssignmentRow { name: "none".into(), code: "none".into(), district: 0, metric: 0 });
        }
        rows.sort_by(|a, b| a.code.cmp(&b.code));
        rows
    }

    /// Advance the search by one placement.
    pub fn step(&mut self) -> Result<()> {
        if self.in_progress { return Ok(()); }
        self.in_progress = true;
        self.stats.tick(None);

        if self.is_solved() {
            self.in_progress = false;
            return Ok(());
        }

        let (region, district_idx) = match self.next_region() {
            Some(pair) => pair,
            None => {
                self.placements.record_failure();
                let pair = self.smart_unplace();
                self.stats.tick(Some("unplace"));
                pair
            }
        };

        self.place_region(region, district_idx);
        self.stats.tick(Some("place"));

        if self.districts.iter().all(|d| !d.adj().is_empty()) && !self.is_solved() {
            if !self.resolve_enclosures() {
                self.placements.record_failure();
            }
            self.stats.tick(Some("checkUnused"));
        }

        self.in_progress = false;
        Ok(())
    }

    /// Iterate `step()` until `is_solved()`.
    pub fn solve(&mut self) -> Result<()> {
        while !self.is_solved() {
            self.step()?;
        }
        Ok(())
    }

    pub fn snapshot(&self) -> SolverSnapshot {
        let placements = self.graph.iter_indices()
            .map(|r| (self.graph.code(r).to_string(), self.placements.assignment(r)))
            .collect();
        let unplaced = self.placements.unplaced().iter()
            .map(|&r| self.graph.code(r).to_string())
            .collect();
        SolverSnapshot { placements, unplaced }
    }

    /// Rebuild districts, placements, and the unused-district forest from a
    /// snapshot.
    pub fn restore(&mut self, snapshot: SolverSnapshot) -> Result<()> {
        let mut districts: Vec<District> = (0..self.k)
            .map(|i| District::new(i + 1, self.metric_idx, self.max_acceptable))
            .collect();
        let mut placements = Placements::new(self.graph.len());

        let mut codes: Vec<&String> = snapshot.placements.keys().collect();
        codes.sort();
        for code in codes {
            let district_idx = snapshot.placements[code];
            if district_idx == 0 { continue; }
            let r = self.graph.index_of_code(code)
                .ok_or_else(|| anyhow::anyhow!("unknown region code {:?} in snapshot", code))?;
            if district_idx as usize > districts.len() {
                bail!("district index {} out of range [1, {}]", district_idx, districts.len());
            }
            districts[(district_idx - 1) as usize].add_region(&self.graph, r);
            placements.record_place(r, district_idx);
        }

        debug_assert_eq!(placements.unplaced().len(), snapshot.unplaced.len());

        self.districts = districts;
        self.unused = UnusedForest::new();
        self.unused.rebuild(&self.graph, placements.unplaced().iter().copied());
        self.placements = placements;
        self.stats = SolverStats::new();
        Ok(())
    }

    // --- internal placement/unplacement, shared by step/smart_unplace/enclosures ---

    fn place_region(&mut self, r: RegionIndex, district_idx: u32) {
        self.districts[(district_idx - 1) as usize].add_region(&self.graph, r);
        self.placements.record_place(r, district_idx);
        self.unused.on_place(&self.graph, r);
    }

    fn unplace_region(&mut self, r: Option<RegionIndex>) -> RegionIndex {
        let target = match r {
            Some(x) => x,
            None => {
                let last = self.placements.placed().last();
                debug_assert!(last.is_some(), "unplace called with nothing placed");
                *last.unwrap()
            }
        };
        let district_idx = self.placements.assignment(target);
        self.districts[(district_idx - 1) as usize].remove_region(&self.graph, target);
        let removed = self.placements.record_unplace(Some(target));
        self.unused.on_unplace(&self.graph, removed);
        removed
    }

    fn is_in_disconnected_provisional(&self, r: RegionIndex) -> bool {
        self.unused.components().iter().any(|d| d.adj().is_empty() && d.contains(r))
    }

    /// Whether `r` could join `district_idx` right now: adjacency and
    /// balance-bound headroom, plus (when `only_failures` is set) skipping
    /// the adjacency/connectivity checks to test only against the cached
    /// failure set.
    fn can_add_to_district(&mut self, r: RegionIndex, district_idx: u32, only_failures: bool, allow_disconnected: bool) -> bool {
        if !only_failures {
            let district = &self.districts[(district_idx - 1) as usize];
            let ok = district.can_add(&self.graph, r)
                && (district.is_adjacent(r) || (allow_disconnected && self.is_in_disconnected_provisional(r)));
            if !ok { return false; }
        }
        !self.placements.would_repeat_failure(r, district_idx)
    }

    /// Pick the next `(region, district)` to place: grow the smallest
    /// district from its existing boundary, or seed a fresh one if it has
    /// none yet.
    fn next_region(&mut self) -> Option<(RegionIndex, u32)> {
        let min_pos = self.districts.iter().enumerate()
            .min_by_key(|(_, d)| d.metric())
            .map(|(i, _)| i);
        debug_assert!(min_pos.is_some(), "solver has no districts");
        let min_pos = min_pos.unwrap();
        self.stats.tick(Some("getMinDistrict"));

        let district_idx = self.districts[min_pos].index;
        let adj_empty = self.districts[min_pos].adj().is_empty();

        if adj_empty {
            if let Some(r) = self.next_starter(district_idx) {
                self.stats.tick(Some("getSeed"));
                return Some((r, district_idx));
            }
        }

        if let Some(r) = self.largest_unplaced_for(district_idx) {
            self.stats.tick(Some("getUnplaced"));
            return Some((r, district_idx));
        }

        self.stats.tick(Some("selectFailed"));
        None
    }

    /// Seed path: farthest-from-placed candidate at or above the median
    /// unplaced metric, falling back to the largest unplaced region overall.
    fn next_starter(&mut self, district_idx: u32) -> Option<RegionIndex> {
        let mut metrics: Vec<i64> = self.placements.unplaced().iter()
            .map(|&r| self.graph.metric(r, self.metric_idx))
            .collect();
        if metrics.is_empty() { return None; }
        metrics.sort_unstable();
        let median = percentile(&metrics, 50.0);

        let candidates: Vec<RegionIndex> = self.placements.unplaced().iter().copied()
            .filter(|&r| self.graph.metric(r, self.metric_idx) as f64 >= median)
            .filter(|&r| self.can_add_to_district(r, district_idx, false, true))
            .collect();

        let mut best: Option<(RegionIndex, u32, i64)> = None;
        for r in candidates {
            let max_dist = self.placements.placed().iter()
                .filter_map(|&p| self.graph.distance(r, p))
                .max();
            if let Some(d) = max_dist {
                let metric = self.graph.metric(r, self.metric_idx);
                let better = best.map_or(true, |(_, bd, bm)| (d, metric) > (bd, bm));
                if better { best = Some((r, d, metric)); }
            }
        }

        if let Some((r, _, _)) = best { return Some(r); }

        self.placements.unplaced().iter().copied()
            .max_by_key(|&r| self.graph.metric(r, self.metric_idx))
    }

    /// Grow path: among qualifying unplaced regions, minimize total hop
    /// distance to the target district's members, then maximize metric.
    fn largest_unplaced_for(&mut self, district_idx: u32) -> Option<RegionIndex> {
        let adj_codes: Vec<RegionIndex> = self.districts[(district_idx - 1) as usize].adj().keys().copied().collect();
        let any_unplaced_neighbor = adj_codes.iter().any(|&c| self.placements.is_unplaced(c));
        let allow_disconnected = !any_unplaced_neighbor;

        let candidates: Vec<RegionIndex> = self.placements.unplaced().iter().copied()
            .filter(|&r| self.can_add_to_district(r, district_idx, false, allow_disconnected))
            .collect();

        let members: Vec<RegionIndex> = self.districts[(district_idx - 1) as usize].members().iter().copied().collect();

        candidates.into_iter().max_by_key(|&r| {
            let dist_sum: i64 = members.iter()
                .map(|&p| self.graph.distance(r, p).unwrap_or(0) as i64)
                .sum();
            (-dist_sum, self.graph.metric(r, self.metric_idx))
        })
    }

    /// Back out of a dead end: pick a victim region to unplace, preferring
    /// one with few cross-district neighbors, and record the failure so it
    /// isn't retried immediately.
    fn smart_unplace(&mut self) -> (RegionIndex, u32) {
        loop {
            let min_pos = self.districts.iter().enumerate()
                .min_by_key(|(_, d)| d.metric())
                .map(|(i, _)| i);
            debug_assert!(min_pos.is_some(), "solver has no districts");
            let min_pos = min_pos.unwrap();
            let target_idx = self.districts[min_pos].index;
            let target_adj: AHashMap<RegionIndex, u32> = self.districts[min_pos].adj().clone();

            let placed: Vec<RegionIndex> = self.placements.placed().to_vec();
            let mut best: Option<(RegionIndex, (i64, i64, i64))> = None;

            for r in placed {
                let d_r_idx = self.placements.assignment(r);
                let (can_remove, adj_count, same_district_neighbors) = {
                    let d_r = &self.districts[(d_r_idx - 1) as usize];
                    let can_remove = d_r.can_remove(&self.graph, r);
                    let adj_count = *target_adj.get(&r).unwrap_or(&0) as i64;
                    let same = self.graph.adj(r).iter().filter(|c| d_r.contains(**c)).count() as i64;
                    (can_remove, adj_count, same)
                };
                if !can_remove { continue; }
                if !self.can_add_to_district(r, target_idx, false, true) { continue; }

                let metric = self.graph.metric(r, self.metric_idx);
                let key = (adj_count, adj_count - same_district_neighbors, metric);
                let better = best.map_or(true, |(_, bk)| key > bk);
                if better { best = Some((r, key)); }
            }

            if let Some((r, _)) = best {
                self.unplace_region(Some(r));
                return (r, target_idx);
            }

            self.unplace_region(None);
        }
    }

    /// Fold any unplaced component fully enclosed by one real district into
    /// that district atomically, once every member passes the
    /// failure-cache check.
    fn resolve_enclosures(&mut self) -> bool {
        let snapshot: Vec<(AHashMap<RegionIndex, u32>, Vec<RegionIndex>)> = self.unused.components().iter()
            .map(|d| (d.adj().clone(), d.members().iter().copied().collect()))
            .collect();

        for (adj, members) in snapshot {
            if adj.is_empty() { continue; }

            let enclosing = self.districts.iter()
                .find(|d| adj.keys().all(|c| d.contains(*c)))
                .map(|d| d.index);

            let Some(d_idx) = enclosing else { continue };

            for &r in &members {
                if !self.can_add_to_district(r, d_idx, true, true) {
                    return false;
                }
            }
            for r in members {
                if self.placements.is_unplaced(r) {
                    self.place_region(r, d_idx);
                }
            }
        }

        true
    }
}

/// Linear-interpolation percentile, matching `numpy.percentile`'s default
/// method. Used by `next_starter` to find the median unplaced metric.
fn percentile(sorted: &[i64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 { return 0.0; }
    if n == 1 { return sorted[0] as f64; }

    let rank = p / 100.0 * (n as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi { return sorted[lo] as f64; }

    let frac = rank - lo as f64;
    sorted[lo] as f64 * (1.0 - frac) + sorted[hi] as f64 * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::MetricTable;
    use ahash::AHashSet;

    fn graph_from(codes: &[&str], metrics: &[i64], edges: &[(usize, usize)]) -> RegionGraph {
        let n = codes.len();
        let mut adjacency = vec![AHashSet::new(); n];
        for &(a, b) in edges {
            adjacency[a].insert(RegionIndex(b as u32));
            adjacency[b].insert(RegionIndex(a as u32));
        }
        let codes = codes.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let names = codes.clone();
        let table = MetricTable::new(vec!["pop".into()]);
        let values = metrics.iter().map(|&m| vec![m]).collect();
        let mut g = RegionGraph::new(codes, names, table, values, adjacency);

        // Fill in BFS hop distances so seed/grow selection has something to work with.
        for r in g.iter_indices().collect::<Vec<_>>() {
            let mut dist = ahash::AHashMap::new();
            let mut queue = std::collections::VecDeque::new();
            dist.insert(r, 0u32);
            queue.push_back(r);
            while let Some(u) = queue.pop_front() {
                let d = dist[&u];
                for &v in g.adj(u) {
                    if !dist.contains_key(&v) {
                        dist.insert(v, d + 1);
                        queue.push_back(v);
                    }
                }
            }
            dist.remove(&r);
            g.set_distances(r, dist);
        }
        g
    }

    #[test]
    fn scenario_path_of_four_splits_evenly() {
        // A-B-C-D, metrics 10/10/10/10, k=2 -> {A,B} and {C,D}, stddev% == 0.
        let g = graph_from(&["A", "B", "C", "D"], &[10, 10, 10, 10], &[(0, 1), (1, 2), (2, 3)]);
        let mut solver = Solver::new(Arc::new(g), MetricRef::Index(0), 2).unwrap();
        solver.solve().unwrap();

        assert!(solver.is_solved());
        assert_eq!(solver.standard_deviation_percent(), 0.0);
        for d in solver.districts() {
            assert_eq!(d.len(), 2);
        }
    }

    #[test]
    fn scenario_triangle_balances_50_50() {
        // Triangle A-B-C, metrics 50/30/20, k=2 -> {A} and {B,C}, both 50.
        let g = graph_from(&["A", "B", "C"], &[50, 30, 20], &[(0, 1), (1, 2), (0, 2)]);
        let mut solver = Solver::new(Arc::new(g), MetricRef::Index(0), 2).unwrap();
        solver.solve().unwrap();

        assert!(solver.is_solved());
        assert_eq!(solver.standard_deviation_percent(), 0.0);
        let metrics: Vec<i64> = solver.districts().iter().map(|d| d.metric()).collect();
        let mut sorted = metrics.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![50, 50]);
    }

    #[test]
    fn scenario_outlier_lifts_bound_to_singletons() {
        // Line of 5, metrics 10/10/100/10/10, k=5 -> five singletons.
        let g = graph_from(
            &["A", "B", "C", "D", "E"],
            &[10, 10, 100, 10, 10],
            &[(0, 1), (1, 2), (2, 3), (3, 4)],
        );
        let mut solver = Solver::new(Arc::new(g), MetricRef::Index(0), 5).unwrap();
        assert_eq!(solver.max_acceptable(), 100);
        solver.solve().unwrap();

        assert!(solver.is_solved());
        for d in solver.districts() {
            assert_eq!(d.len(), 1);
        }
    }

    #[test]
    fn scenario_isolate_gets_its_own_district() {
        // Disconnected isolate I, plus triangle A-B-C, all metric 1, k=2.
        let g = graph_from(&["I", "A", "B", "C"], &[1, 1, 1, 1], &[(1, 2), (2, 3), (1, 3)]);
        let mut solver = Solver::new(Arc::new(g), MetricRef::Index(0), 2).unwrap();
        solver.solve().unwrap();

        assert!(solver.is_solved());
        let sizes: Vec<usize> = solver.districts().iter().map(|d| d.len()).collect();
        let mut sorted = sizes.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 3]);
    }

    #[test]
    fn snapshot_round_trips_through_restore() {
        let g = Arc::new(graph_from(&["A", "B", "C", "D"], &[10, 10, 10, 10], &[(0, 1), (1, 2), (2, 3)]));
        let mut solver = Solver::new(g, MetricRef::Index(0), 2).unwrap();
        solver.solve().unwrap();

        let snapshot = solver.snapshot();
        let before = solver.current_assignment();

        solver.reset(MetricRef::Index(0), 2).unwrap();
        assert!(!solver.is_solved());

        solver.restore(snapshot).unwrap();
        assert!(solver.is_solved());
        assert_eq!(solver.current_assignment(), before);
    }

    #[test]
    fn k_equals_region_count_is_all_singletons() {
        let g = graph_from(&["A", "B", "C"], &[5, 5, 5], &[(0, 1), (1, 2)]);
        let mut solver = Solver::new(Arc::new(g), MetricRef::Index(0), 3).unwrap();
        solver.solve().unwrap();

        assert!(solver.is_solved());
        assert!(solver.districts().iter().all(|d| d.len() == 1));
    }

    #[test]
    fn reset_rejects_zero_districts() {
        let g = Arc::new(graph_from(&["A"], &[1], &[]));
        assert!(Solver::new(g, MetricRef::Index(0), 0).is_err());
    }

    #[test]
    fn reset_rejects_unknown_metric_name() {
        let g = Arc::new(graph_from(&["A"], &[1], &[]));
        assert!(Solver::new(g, MetricRef::Name("nope".into()), 1).is_err());
    }

    #[test]
    fn resolve_enclosures_places_hole_atomically() {
        // Ring A-B-C-D (cycle) with a two-region hole X-Y: X touches A,B;
        // Y touches C,D. Once the whole ring is in one district, the hole's
        // only external adjacency (A,B,C,D) is entirely contained in it, so
        // both X and Y must be placed together in the same step.
        let codes = ["A", "B", "C", "D", "X", "Y"];
        let metrics = [10, 11, 12, 13, 1, 2];
        let edges = [(0, 1), (1, 2), (2, 3), (3, 0), (4, 0), (4, 1), (5, 2), (5, 3), (4, 5)];
        let g = graph_from(&codes, &metrics, &edges);
        let mut solver = Solver::new(Arc::new(g), MetricRef::Index(0), 2).unwrap();

        let (a, b, c, d, x, y) = (RegionIndex(0), RegionIndex(1), RegionIndex(2), RegionIndex(3), RegionIndex(4), RegionIndex(5));
        for r in [a, b, c, d] {
            solver.place_region(r, 1);
        }
        assert!(solver.placements.is_unplaced(x));
        assert!(solver.placements.is_unplaced(y));

        assert!(solver.resolve_enclosures());
        assert_eq!(solver.placements.assignment(x), 1);
        assert_eq!(solver.placements.assignment(y), 1);
    }

    #[test]
    fn smart_unplace_does_not_reintroduce_cached_failure() {
        let g = graph_from(&["A", "B", "C", "D"], &[10, 10, 10, 10], &[(0, 1), (1, 2), (2, 3)]);
        let mut solver = Solver::new(Arc::new(g), MetricRef::Index(0), 2).unwrap();

        let (a, b) = (RegionIndex(0), RegionIndex(1));
        solver.place_region(a, 1);
        solver.place_region(b, 1);
        solver.placements.record_failure();
        let cached: Vec<u32> = (0..4).map(|i| solver.placements.assignment(RegionIndex(i))).collect();

        solver.smart_unplace();
        let after: Vec<u32> = (0..4).map(|i| solver.placements.assignment(RegionIndex(i))).collect();

        assert_ne!(after, cached);
    }
}
