use std::collections::HashMap;
use std::path::Path;

use ahash::AHashSet;
use anyhow::{Context, Result};
use polars::prelude::*;

use crate::region::{MetricTable, RegionGraph, RegionIndex};

/// Read the region-data TSV: header row, `Region`
/// column holds the region code, remaining columns are metric name ->
/// integer value (thousands-grouped commas permitted). A row whose code is
/// `Total` is skipped.
///
/// This is genuinely rectangular, unlike the adjacency/distance files, so it
/// goes through `polars::CsvReader` rather than a hand-rolled line reader.
/// Every column is read back as a string (`infer_schema_length(0)`) since
/// thousands-grouped integers aren't valid numeric literals; comma-stripping
/// and parsing happens here.
///
/// Names start out as a copy of the code — `read_region_data` has no access
/// to the name table; call [`RegionGraph::apply_names`] afterward.
pub fn read_region_data(path: &Path, adjacency: &HashMap<String, Vec<String>>) -> Result<(RegionGraph, MetricTable)> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(CsvParseOptions::default().with_separator(b'\t'))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("opening region data file {}", path.display()))?
        .finish()
        .with_context(|| format!("parsing region data file {}", path.display()))?;

    let columns: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    let code_col = columns.first()
        .context("region data file has no columns")?
        .clone();
    let metric_names: Vec<String> = columns.into_iter().skip(1).collect();
    let metrics = MetricTable::new(metric_names.clone());

    let code_series = df.column(&code_col)?.str()
        .with_context(|| format!("{} column is not text", code_col))?;
    let metric_series: Vec<&StringChunked> = metric_names.iter()
        .map(|name| {
            df.column(name)?.str()
                .with_context(|| format!("{} column is not text", name))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut codes = Vec::with_capacity(df.height());
    let mut values: Vec<Vec<i64>> = Vec::with_capacity(df.height());

    for row in 0..df.height() {
        let code = code_series.get(row).unwrap_or_default().to_string();
        if code == "Total" { continue; }

        let mut row_values = Vec::with_capacity(metric_names.len());
        for (series, name) in metric_series.iter().zip(&metric_names) {
            let raw = series.get(row).unwrap_or("0");
            let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
            let value: i64 = cleaned.trim().parse()
                .with_context(|| format!("region {code}: invalid value {raw:?} for metric {name}"))?;
            row_values.push(value);
        }

        codes.push(code);
        values.push(row_values);
    }

    let names = codes.clone();
    let code_order: HashMap<&str, usize> = codes.iter().enumerate().map(|(i, c)| (c.as_str(), i)).collect();

    let mut adjacency_sets = vec![AHashSet::new(); codes.len()];
    for (i, code) in codes.iter().enumerate() {
        if let Some(neighbors) = adjacency.get(code) {
            for neighbor in neighbors {
                if let Some(&j) = code_order.get(neighbor.as_str()) {
                    adjacency_sets[i].insert(RegionIndex(j as u32));
                }
            }
        }
    }

    let graph = RegionGraph::new(codes, names, MetricTable::new(metric_names), values, adjacency_sets);
    Ok((graph, metrics))
}
