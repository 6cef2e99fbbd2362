use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Read the adjacency CSV: one row per region, first cell = region code,
/// remaining cells = adjacent region codes.
///
/// Rows are ragged, so this is a manual line reader rather than `polars`,
/// which expects a rectangular frame.
pub fn read_adjacency(path: &Path) -> Result<HashMap<String, Vec<String>>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading adjacency file {}", path.display()))?;

    let mut adjacency = HashMap::new();
    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() { continue; }

        let mut cells = line.split(',').map(str::trim);
        let code = cells.next()
            .with_context(|| format!("{}:{}: empty row", path.display(), line_no + 1))?
            .to_string();
        let neighbors = cells.filter(|c| !c.is_empty()).map(str::to_string).collect();
        adjacency.insert(code, neighbors);
    }

    Ok(adjacency)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writes `contents` to a uniquely-named file under the OS temp dir and
    /// returns its path; there's no tempfile dependency in this workspace,
    /// so cleanup is manual.
    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn parses_ragged_rows() {
        let path = write_temp("districter-adjacency-ragged.csv", "A,B,C\nB,A\nC,A\n");
        let map = read_adjacency(&path).unwrap();
        assert_eq!(map.get("A").unwrap(), &vec!["B".to_string(), "C".to_string()]);
        assert_eq!(map.get("B").unwrap(), &vec!["A".to_string()]);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn skips_blank_lines() {
        let path = write_temp("districter-adjacency-blank.csv", "A,B\n\nB,A\n");
        let map = read_adjacency(&path).unwrap();
        assert_eq!(map.len(), 2);
        fs::remove_file(&path).unwrap();
    }
}
