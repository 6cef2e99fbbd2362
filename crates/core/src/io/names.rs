use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Read the region-code → human-readable-name table:
/// a two-column `code,name` CSV, one row per region.
pub fn read_name_table(path: &Path) -> Result<HashMap<String, String>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading name table {}", path.display()))?;

    let mut names = HashMap::new();
    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() { continue; }

        let (code, name) = line.split_once(',')
            .with_context(|| format!("{}:{}: expected `code,name`", path.display(), line_no + 1))?;
        names.insert(code.trim().to_string(), name.trim().to_string());
    }

    Ok(names)
}
