use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Partition a region-adjacency graph into `k` connected, metric-balanced
/// districts.
#[derive(Debug, Parser)]
#[command(name = "districter", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// -v for progress lines, -vv for per-tag timing too.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the solver to completion and write a CSV assignment.
    Solve(SolveArgs),
    /// Resume a solve from a previously written JSON snapshot.
    Resume(ResumeArgs),
}

#[derive(Debug, Args)]
pub struct SolveArgs {
    /// Adjacency CSV: one row per region, first cell = code, rest = neighbors.
    #[arg(long)]
    pub adjacency: PathBuf,

    /// Region-data TSV: `Region` column + one column per metric.
    #[arg(long)]
    pub regions: PathBuf,

    /// Distance-matrix CSV. Computed and written here if missing.
    #[arg(long)]
    pub distances: PathBuf,

    /// Region code -> display name table.
    #[arg(long)]
    pub names: PathBuf,

    /// Metric name to balance on (defaults to the first column after `Region`).
    #[arg(long)]
    pub metric: Option<String>,

    /// Number of districts.
    #[arg(short, long)]
    pub k: u32,

    /// Where to write the resulting assignment CSV.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Overwrite an existing output file.
    #[arg(long)]
    pub force: bool,

    /// Write a JSON snapshot of the final placement here, for later `resume`.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ResumeArgs {
    /// Adjacency CSV: one row per region, first cell = code, rest = neighbors.
    #[arg(long)]
    pub adjacency: PathBuf,

    /// Region-data TSV: `Region` column + one column per metric.
    #[arg(long)]
    pub regions: PathBuf,

    /// Distance-matrix CSV. Computed and written here if missing.
    #[arg(long)]
    pub distances: PathBuf,

    /// Region code -> display name table.
    #[arg(long)]
    pub names: PathBuf,

    /// Metric name to balance on (defaults to the first column after `Region`).
    #[arg(long)]
    pub metric: Option<String>,

    /// Number of districts. Must match the run that produced `--snapshot`.
    #[arg(short, long)]
    pub k: u32,

    /// JSON snapshot written by a previous `solve --snapshot`.
    #[arg(long)]
    pub snapshot: PathBuf,

    /// Where to write the resulting assignment CSV.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Overwrite an existing output file.
    #[arg(long)]
    pub force: bool,
}
