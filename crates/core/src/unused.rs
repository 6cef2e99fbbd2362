use ahash::AHashSet;
use std::collections::VecDeque;

use crate::district::District;
use crate::region::{RegionGraph, RegionIndex};

/// A forest of provisional (`index == 0`) districts, one per connected
/// component of the currently-unplaced regions — maintained incrementally
/// so enclosure detection stays cheap.
///
/// Invariant: every unplaced region belongs to exactly one component; two
/// unplaced regions share a component iff connected via unplaced-only edges.
#[derive(Debug, Clone, Default)]
pub struct UnusedForest {
    components: Vec<District>,
}

impl UnusedForest {
    pub fn new() -> Self { Self { components: Vec::new() } }

    #[inline] pub fn components(&self) -> &[District] { &self.components }

    /// Group `regions` into connected components, each its own provisional
    /// district.
    pub fn rebuild<I: IntoIterator<Item = RegionIndex>>(&mut self, graph: &RegionGraph, regions: I) {
        self.components.clear();

        let mut remaining: AHashSet<RegionIndex> = regions.into_iter().collect();
        while let Some(&seed) = remaining.iter().next() {
            remaining.remove(&seed);
            let mut district = District::new(0, 0, 0);
            district.add_region(graph, seed);

            let mut queue = VecDeque::from([seed]);
            while let Some(u) = queue.pop_front() {
                let neighbors: Vec<RegionIndex> = graph.adj(u).iter().copied()
                    .filter(|c| remaining.contains(c))
                    .collect();
                for v in neighbors {
                    remaining.remove(&v);
                    district.add_region(graph, v);
                    queue.push_back(v);
                }
            }

            self.components.push(district);
        }
    }

    fn index_containing(&self, r: RegionIndex) -> Option<usize> {
        self.components.iter().position(|d| d.contains(r))
    }

    /// Update after `r` is placed into a real district.
    ///
    /// Splits, if `r` was the sole connection holding its component
    /// together, are resolved by rebuilding over the component's former
    /// members (minus `r`), which may yield multiple new components.
    pub fn on_place(&mut self, graph: &RegionGraph, r: RegionIndex) {
        let idx = self.index_containing(r);
        debug_assert!(idx.is_some(), "region {} not found in any provisional district", graph.code(r));
        let idx = idx.unwrap();

        let split = !self.components[idx].can_remove(graph, r);
        let former_members: Vec<RegionIndex> = self.components[idx].members().iter().copied().collect();

        self.components[idx].remove_region(graph, r);

        if self.components[idx].is_empty() {
            self.components.remove(idx);
        } else if split {
            self.components.remove(idx);
            let remaining = former_members.into_iter().filter(|&m| m != r);
            let mut rebuilt = UnusedForest::new();
            rebuilt.rebuild(graph, remaining);
            self.components.extend(rebuilt.components);
        }
    }

    /// Update after `r` is unplaced: fold it back into
    /// whichever component(s) border it, merging if it reconnects more than
    /// one.
    pub fn on_unplace(&mut self, graph: &RegionGraph, r: RegionIndex) {
        let adjacent: Vec<usize> = self.components.iter().enumerate()
            .filter(|(_, d)| d.adj().contains_key(&r))
            .map(|(i, _)| i)
            .collect();

        match adjacent.len() {
            0 => {
                let mut district = District::new(0, 0, 0);
                district.add_region(graph, r);
                self.components.push(district);
            }
            1 => {
                self.components[adjacent[0]].add_region(graph, r);
            }
            _ => {
                // Merge into the largest, to minimize re-insertion work.
                let host = *adjacent.iter().max_by_key(|&&i| self.components[i].len()).unwrap();
                let others: Vec<usize> = adjacent.iter().copied().filter(|&i| i != host).collect();

                self.components[host].add_region(graph, r);
                let mut absorbed: Vec<RegionIndex> = Vec::new();
                for &i in &others {
                    absorbed.extend(self.components[i].members().iter().copied());
                }
                for member in absorbed {
                    self.components[host].add_region(graph, member);
                }

                // Remove merged components, highest index first to keep indices valid.
                let mut sorted_others = others;
                sorted_others.sort_unstable_by(|a, b| b.cmp(a));
                for i in sorted_others { self.components.remove(i); }
            }
        }
    }
}
