use crate::region::RegionGraph;

/// Compute `maxAcceptable`, the per-district metric ceiling.
///
/// Derives a closed-form upper bound `L` on a single district's metric such
/// that a hypothetical `(L, (S-L)/(n-1), ..., (S-L)/(n-1))` split of the
/// total `S` across `n` districts would have a population-stddev-as-percent
/// of `S` equal to the 0.5% target, then raises it to the largest single
/// region's metric if that's bigger (no district can be smaller than its
/// biggest member).
pub fn max_acceptable_metric(graph: &RegionGraph, metric_idx: usize, k: u32) -> i64 {
    let sum_all: i64 = graph.iter_indices().map(|r| graph.metric(r, metric_idx)).sum();

    if k <= 1 {
        return sum_all;
    }

    let s = sum_all as f64;
    let n = k as f64;
    let m = s / n;

    let a = 1.0 + 1.0 / (n - 1.0);
    let b = 2.0 * s / (n - 1.0);
    let c = s * s / (n - 1.0) - n * s * s / 40000.0 - 2.0 * m * s + n * m * m;

    let discriminant = b * b - 4.0 * a * c;
    // Not expected to go negative for real inputs (k >= 2, all metrics >= 0);
    // clamp defensively rather than propagate a NaN into the solver.
    let d = discriminant.max(0.0).sqrt();

    let l = ((-b + d) / (2.0 * a)).abs().max(((-b - d) / (2.0 * a)).abs());

    let max_region_metric = graph.iter_indices()
        .map(|r| graph.metric(r, metric_idx))
        .max()
        .unwrap_or(0);

    (l.ceil() as i64).max(max_region_metric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::MetricTable;
    use ahash::AHashSet;

    fn uniform_graph(n: usize, metric: i64) -> RegionGraph {
        let codes: Vec<String> = (0..n).map(|i| format!("R{i}")).collect();
        let names = codes.clone();
        let metrics = MetricTable::new(vec!["m".into()]);
        let values = vec![vec![metric]; n];
        let adjacency = vec![AHashSet::new(); n];
        RegionGraph::new(codes, names, metrics, values, adjacency)
    }

    #[test]
    fn k_one_returns_full_sum() {
        let g = uniform_graph(4, 10);
        assert_eq!(max_acceptable_metric(&g, 0, 1), 40);
    }

    #[test]
    fn bound_admits_outlier_region() {
        // 5 regions of metric 10, except one of 100 - k=5 singletons should
        // require the bound be lifted to at least 100.
        let codes = vec!["A".into(), "B".into(), "C".into(), "D".into(), "E".into()];
        let names = codes.clone();
        let metrics = MetricTable::new(vec!["m".into()]);
        let values = vec![vec![10], vec![10], vec![100], vec![10], vec![10]];
        let adjacency = vec![AHashSet::new(); 5];
        let g = RegionGraph::new(codes, names, metrics, values, adjacency);

        assert!(max_acceptable_metric(&g, 0, 5) >= 100);
    }

    #[test]
    fn uniform_split_bound_exceeds_even_share() {
        let g = uniform_graph(4, 10);
        // Even split across k=2 is 20 per district; the bound must be >= that.
        assert!(max_acceptable_metric(&g, 0, 2) >= 20);
    }
}
