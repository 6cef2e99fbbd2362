use ahash::{AHashMap, AHashSet};

/// A stable index into a [`RegionGraph`]'s region tables.
///
/// Regions are immutable once loaded, so an index assigned at load time is
/// valid for the graph's whole lifetime. District/placement bookkeeping
/// holds these rather than back-pointers into the graph (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionIndex(pub u32);

impl RegionIndex {
    #[inline] pub fn index(self) -> usize { self.0 as usize }
}

/// The fixed list of metric names available on a loaded graph (e.g.
/// `Population`, `Area (mi2)`). Resolved once at load from the region-data
/// table's header row.
#[derive(Debug, Clone)]
pub struct MetricTable {
    names: Vec<String>,
    index: AHashMap<String, usize>,
}

impl MetricTable {
    pub fn new(names: Vec<String>) -> Self {
        let index = names.iter().enumerate().map(|(i, name)| (name.clone(), i)).collect();
        Self { names, index }
    }

    #[inline] pub fn names(&self) -> &[String] { &self.names }

    #[inline] pub fn len(&self) -> usize { self.names.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.names.is_empty() }

    /// Resolve a metric name to its index.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

/// Either a metric name or its index into a graph's [`MetricTable`] — the
/// solver's constructor and `reset` accept both.
#[derive(Debug, Clone)]
pub enum MetricRef {
    Name(String),
    Index(usize),
}

impl MetricRef {
    pub fn resolve(&self, table: &MetricTable) -> anyhow::Result<usize> {
        match self {
            MetricRef::Name(name) => table.index_of(name)
                .ok_or_else(|| anyhow::anyhow!("unknown metric {:?}; allowed: {:?}", name, table.names())),
            MetricRef::Index(i) => {
                if *i < table.len() { Ok(*i) }
                else { Err(anyhow::anyhow!("metric index {} out of range [0, {})", i, table.len())) }
            }
        }
    }
}

/// Immutable region records and adjacency, loaded once at program start.
///
/// Data for region `r` (a [`RegionIndex`]) lives at position `r.index()` in
/// each parallel table below, rather than in a per-region struct — a
/// struct-of-arrays layout with set-based adjacency rather than dense
/// distance arrays.
#[derive(Debug)]
pub struct RegionGraph {
    codes: Vec<String>,
    names: Vec<String>,
    code_to_index: AHashMap<String, RegionIndex>,
    metrics: MetricTable,
    metric_values: Vec<Vec<i64>>,
    adjacency: Vec<AHashSet<RegionIndex>>,
    distances: Vec<AHashMap<RegionIndex, u32>>,
}

impl RegionGraph {
    pub fn new(
        codes: Vec<String>,
        names: Vec<String>,
        metrics: MetricTable,
        metric_values: Vec<Vec<i64>>,
        adjacency: Vec<AHashSet<RegionIndex>>,
    ) -> Self {
        assert_eq!(codes.len(), names.len());
        assert_eq!(codes.len(), metric_values.len());
        assert_eq!(codes.len(), adjacency.len());

        let code_to_index = codes.iter().enumerate()
            .map(|(i, code)| (code.clone(), RegionIndex(i as u32)))
            .collect();

        let n = codes.len();
        Self { codes, names, code_to_index, metrics, metric_values, adjacency, distances: vec![AHashMap::new(); n] }
    }

    #[inline] pub fn len(&self) -> usize { self.codes.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.codes.is_empty() }

    #[inline] pub fn metrics(&self) -> &MetricTable { &self.metrics }

    #[inline] pub fn code(&self, r: RegionIndex) -> &str { &self.codes[r.index()] }

    #[inline] pub fn name(&self, r: RegionIndex) -> &str { &self.names[r.index()] }

    pub fn index_of_code(&self, code: &str) -> Option<RegionIndex> {
        self.code_to_index.get(code).copied()
    }

    #[inline] pub fn metric(&self, r: RegionIndex, metric_idx: usize) -> i64 {
        self.metric_values[r.index()][metric_idx]
    }

    #[inline] pub fn adj(&self, r: RegionIndex) -> &AHashSet<RegionIndex> { &self.adjacency[r.index()] }

    /// True for a genuinely disconnected region (island) — the sole
    /// exception to "one connected subgraph per district".
    #[inline] pub fn is_isolate(&self, r: RegionIndex) -> bool { self.adjacency[r.index()].is_empty() }

    #[inline] pub fn distance(&self, from: RegionIndex, to: RegionIndex) -> Option<u32> {
        self.distances[from.index()].get(&to).copied()
    }

    pub fn set_distances(&mut self, r: RegionIndex, distances: AHashMap<RegionIndex, u32>) {
        self.distances[r.index()] = distances;
    }

    pub fn iter_indices(&self) -> impl Iterator<Item = RegionIndex> {
        (0..self.codes.len() as u32).map(RegionIndex)
    }

    /// Overwrite display names from a `code -> name` table, leaving the code itself as the name for anything not found.
    /// `read_region_data` has no access to the name table, so the region
    /// graph starts out with code-as-name placeholders until this runs.
    pub fn apply_names(&mut self, table: &std::collections::HashMap<String, String>) {
        for (i, code) in self.codes.iter().enumerate() {
            if let Some(name) = table.get(code) {
                self.names[i] = name.clone();
            }
        }
    }
}
