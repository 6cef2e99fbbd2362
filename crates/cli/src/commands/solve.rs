use std::fs;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use districter_core::{io, MetricRef, Solver};

use crate::cli::SolveArgs;

pub fn run(args: SolveArgs, verbose: u8) -> Result<()> {
    if args.output.exists() && !args.force {
        bail!("{} already exists; pass --force to overwrite", args.output.display());
    }

    if verbose > 0 {
        eprintln!("reading adjacency from {}", args.adjacency.display());
    }
    let adjacency = io::read_adjacency(&args.adjacency)?;

    if verbose > 0 {
        eprintln!("reading region data from {}", args.regions.display());
    }
    let (mut graph, metrics) = io::read_region_data(&args.regions, &adjacency)?;

    if verbose > 0 {
        eprintln!("reading name table from {}", args.names.display());
    }
    let names = io::read_name_table(&args.names)?;
    graph.apply_names(&names);

    if verbose > 0 {
        eprintln!("loading distances from {}", args.distances.display());
    }
    io::read_or_build_distances(&args.distances, &mut graph)?;

    if graph.is_empty() {
        bail!("no regions loaded from {}", args.regions.display());
    }

    let metric_ref = match &args.metric {
        Some(name) => MetricRef::Name(name.clone()),
        None => MetricRef::Index(0),
    };
    if verbose > 0 {
        eprintln!("allowed metrics: {:?}", metrics.names());
    }

    let mut solver = Solver::new(Arc::new(graph), metric_ref, args.k)?;
    if verbose > 0 {
        eprintln!("maxAcceptable = {}", solver.max_acceptable());
    }

    solver.solve()?;

    if verbose > 0 {
        let total = solver.graph().len();
        eprintln!("{}", solver.stats().summarize(total, total, solver.num_failures()));
        eprintln!("standardDeviationPercent = {:.3}", solver.standard_deviation_percent());
    }
    if verbose > 1 {
        for (tag, duration) in solver.stats().times() {
            eprintln!("  {tag}: {:.3}s", duration.as_secs_f64());
        }
    }

    write_assignment(&args.output, &solver)?;
    println!("wrote {}", args.output.display());

    if let Some(snapshot_path) = &args.snapshot {
        io::write_snapshot(snapshot_path, &solver.snapshot())?;
        println!("wrote snapshot {}", snapshot_path.display());
    }

    Ok(())
}

pub(crate) fn write_assignment(path: &std::path::Path, solver: &Solver) -> Result<()> {
    let mut out = String::from("name,code,district,metric\n");
    for row in solver.current_assignment() {
        out.push_str(&format!("{},{},{},{}\n", row.name, row.code, row.district, row.metric));
    }
    fs::write(path, out).with_context(|| format!("writing {}", path.display()))
}
