pub(crate) mod solve;
mod resume;

use anyhow::Result;

use crate::cli::{Cli, Commands};

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Solve(args) => solve::run(args, cli.verbose),
        Commands::Resume(args) => resume::run(args, cli.verbose),
    }
}
