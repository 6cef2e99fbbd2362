use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use ahash::AHashMap;
use anyhow::{Context, Result};

use crate::region::{RegionGraph, RegionIndex};

/// Read the distance-matrix CSV if present; otherwise compute all-pairs hop
/// distances via per-region BFS over adjacency and write the file back,
/// omitting zero/unreachable entries.
pub fn read_or_build_distances(path: &Path, graph: &mut RegionGraph) -> Result<()> {
    if path.exists() {
        read_distances(path, graph)
    } else {
        build_distances(graph);
        write_distances(path, graph)
    }
}

fn read_distances(path: &Path, graph: &mut RegionGraph) -> Result<()> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading distance matrix {}", path.display()))?;
    let mut lines = contents.lines();

    let header = lines.next().context("distance matrix has no header row")?;
    let columns: Vec<&str> = header.split(',').skip(1).collect();

    for (line_no, line) in lines.enumerate() {
        if line.trim().is_empty() { continue; }
        let mut cells = line.split(',');
        let from_code = cells.next()
            .with_context(|| format!("{}:{}: missing source code", path.display(), line_no + 2))?;
        let Some(from) = graph.index_of_code(from_code) else { continue };

        let mut distances = AHashMap::new();
        for (cell, to_code) in cells.zip(&columns) {
            let cell = cell.trim();
            if cell.is_empty() { continue; }
            let Some(to) = graph.index_of_code(to_code) else { continue };
            let distance: u32 = cell.parse()
                .with_context(|| format!("{}:{}: invalid distance {:?}", path.display(), line_no + 2, cell))?;
            if distance > 0 {
                distances.insert(to, distance);
            }
        }
        graph.set_distances(from, distances);
    }

    Ok(())
}

fn build_distances(graph: &mut RegionGraph) {
    let regions: Vec<RegionIndex> = graph.iter_indices().collect();
    for &source in &regions {
        let mut distances: AHashMap<RegionIndex, u32> = AHashMap::new();
        let mut queue = VecDeque::from([source]);
        distances.insert(source, 0);

        while let Some(u) = queue.pop_front() {
            let d = distances[&u];
            for &v in graph.adj(u) {
                if !distances.contains_key(&v) {
                    distances.insert(v, d + 1);
                    queue.push_back(v);
                }
            }
        }
        distances.remove(&source);
        graph.set_distances(source, distances);
    }
}

fn write_distances(path: &Path, graph: &mut RegionGraph) -> Result<()> {
    let regions: Vec<RegionIndex> = graph.iter_indices().collect();

    let mut out = String::from("name");
    for &r in &regions {
        out.push(',');
        out.push_str(graph.code(r));
    }
    out.push('\n');

    for &from in &regions {
        out.push_str(graph.code(from));
        for &to in &regions {
            out.push(',');
            if from != to {
                if let Some(d) = graph.distance(from, to) {
                    out.push_str(&d.to_string());
                }
            }
        }
        out.push('\n');
    }

    fs::write(path, out).with_context(|| format!("writing distance matrix {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::MetricTable;
    use ahash::AHashSet;

    fn path_graph() -> RegionGraph {
        let codes = vec!["A".into(), "B".into(), "C".into()];
        let names = codes.clone();
        let metrics = MetricTable::new(vec!["m".into()]);
        let values = vec![vec![1]; 3];
        let adjacency = vec![
            AHashSet::from_iter([RegionIndex(1)]),
            AHashSet::from_iter([RegionIndex(0), RegionIndex(2)]),
            AHashSet::from_iter([RegionIndex(1)]),
        ];
        RegionGraph::new(codes, names, metrics, values, adjacency)
    }

    #[test]
    fn builds_bfs_distances_when_missing() {
        let path = std::env::temp_dir().join("districter-distances-build-test.csv");
        let _ = fs::remove_file(&path);

        let mut g = path_graph();
        read_or_build_distances(&path, &mut g).unwrap();

        let a = RegionIndex(0);
        let c = RegionIndex(2);
        assert_eq!(g.distance(a, c), Some(2));
        assert_eq!(g.distance(a, a), None); // self-distance omitted

        assert!(path.exists());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn reads_existing_matrix() {
        let path = std::env::temp_dir().join("districter-distances-read-test.csv");
        fs::write(&path, "name,A,B,C\nA,,1,2\nB,1,,1\nC,2,1,\n").unwrap();

        let mut g = path_graph();
        read_or_build_distances(&path, &mut g).unwrap();

        let a = RegionIndex(0);
        let c = RegionIndex(2);
        assert_eq!(g.distance(a, c), Some(2));

        fs::remove_file(&path).unwrap();
    }
}
