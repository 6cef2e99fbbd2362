use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};

use crate::solver::SolverSnapshot;

/// Write a solver snapshot as JSON, so a `solve` run can be resumed later.
pub fn write_snapshot(path: &Path, snapshot: &SolverSnapshot) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("creating snapshot file {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), snapshot)
        .with_context(|| format!("writing snapshot to {}", path.display()))
}

/// Read a solver snapshot previously written by [`write_snapshot`].
pub fn read_snapshot(path: &Path) -> Result<SolverSnapshot> {
    let file = File::open(path)
        .with_context(|| format!("opening snapshot file {}", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("parsing snapshot file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn round_trips_through_json() {
        let path = std::env::temp_dir().join("districter-snapshot-test.json");

        let snapshot = SolverSnapshot {
            placements: HashMap::from([("A".to_string(), 1u32), ("B".to_string(), 2u32)]),
            unplaced: vec!["C".to_string()],
        };
        write_snapshot(&path, &snapshot).unwrap();

        let restored = read_snapshot(&path).unwrap();
        assert_eq!(restored.placements.get("A"), Some(&1));
        assert_eq!(restored.unplaced, vec!["C".to_string()]);

        std::fs::remove_file(&path).unwrap();
    }
}
