use clap::{Parser, Subcommand};
use ttff_core::PrioritizerConfig;

use crate::error::Result;
use crate::evaluate::{EvaluateArgs, run_evaluate};
use crate::inspect::{InspectArgs, run_inspect};
use crate::prioritize::{PrioritizeArgs, run_prioritize};

#[derive(Debug, Parser)]
#[command(
    name = "ttff",
    about = "Order test cases to minimize expected time to first failure",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Search for the best ordering and compare it against baselines.
    Prioritize(PrioritizeArgs),

    /// Score one concrete ordering.
    Evaluate(EvaluateArgs),

    /// Summarize the test universe and per-case timing.
    Inspect(InspectArgs),

    /// Print the default configuration as TOML.
    #[command(name = "print-config")]
    PrintConfig,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Prioritize(args) => run_prioritize(args),
        Commands::Evaluate(args) => run_evaluate(args),
        Commands::Inspect(args) => run_inspect(args),
        Commands::PrintConfig => {
            print!("{}", PrioritizerConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}
