use std::path::PathBuf;

use clap::Args;
use ttff_core::{
    PrioritizationReport, Prioritizer, PrioritizerConfig, RunMatrix, Strategy, TtffError,
};

use crate::error::{CliError, Result};
use crate::util::{
    CliOutput, OutputIntegration, TableArgs, envelope, fmt_secs, json_mode, write_string,
};

#[derive(Debug, Clone, Args)]
pub struct PrioritizeArgs {
    #[command(flatten)]
    pub tables: TableArgs,

    /// TOML or JSON prioritizer configuration. Flags below override it.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Model-driven strategy to run; repeat for several.
    #[arg(long = "strategy", value_name = "STRATEGY")]
    pub strategies: Vec<String>,

    /// Additive smoothing pseudo-count (0 disables smoothing).
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Largest universe exact search may enumerate.
    #[arg(long = "max-exact")]
    pub max_exact: Option<usize>,

    /// Random orders averaged for the random baseline.
    #[arg(long = "random-samples")]
    pub random_samples: Option<usize>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Comma-separated test cases to restrict the universe to.
    #[arg(long, value_delimiter = ',')]
    pub cases: Option<Vec<String>>,

    /// Fail instead of skipping exact search on an oversized universe.
    #[arg(long)]
    pub strict: bool,

    /// Also write the JSON report to this file.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub json: bool,
}

impl PrioritizeArgs {
    /// Configuration file (or defaults) with command-line overrides applied.
    pub fn resolve_config(&self) -> Result<PrioritizerConfig> {
        let mut config = match &self.config {
            Some(path) => PrioritizerConfig::from_file(path)?,
            None => PrioritizerConfig::default(),
        };
        if !self.strategies.is_empty() {
            config.strategies = self
                .strategies
                .iter()
                .map(|raw| raw.parse::<Strategy>())
                .collect::<std::result::Result<_, TtffError>>()
                .map_err(|error| CliError::invalid(error.to_string()))?;
        }
        if let Some(alpha) = self.alpha {
            config.smoothing_alpha = alpha;
        }
        if let Some(max_exact) = self.max_exact {
            config.max_exact_cases = max_exact;
        }
        if let Some(samples) = self.random_samples {
            config.random_samples = samples;
        }
        if self.seed.is_some() {
            config.random_seed = self.seed;
        }
        if let Some(cases) = &self.cases {
            config.cases = Some(cases.clone());
        }
        Ok(config.validated()?)
    }
}

pub fn run_prioritize(args: PrioritizeArgs) -> Result<()> {
    let integration = OutputIntegration::detect();
    let json = json_mode(args.json, &integration);
    let ui = CliOutput::new(!json);

    let config = args.resolve_config()?;
    let matrix = args.tables.load()?;
    if args.strict {
        require_exact_feasible(&config, &matrix)?;
    }
    let report = Prioritizer::new(config).run(&matrix)?;

    let envelope = envelope("prioritize", &report)?;
    if let Some(path) = &args.output {
        write_string(path, &serde_json::to_string_pretty(&envelope)?)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else {
        print_report(&ui, &report);
        if let Some(path) = &args.output {
            ui.info(&format!("report written to {}", path.display()));
        }
    }
    Ok(())
}

/// Fail when `config` asks for exact search over a universe larger than its
/// limit. The universe is `config.cases` when set, else every case.
pub fn require_exact_feasible(config: &PrioritizerConfig, matrix: &RunMatrix) -> Result<()> {
    let cases = config.cases.as_ref().map_or(matrix.case_count(), Vec::len);
    if config.strategies.contains(&Strategy::Exact) && cases > config.max_exact_cases {
        return Err(TtffError::SearchInfeasible {
            cases,
            limit: config.max_exact_cases,
        }
        .into());
    }
    Ok(())
}

fn print_report(ui: &CliOutput, report: &PrioritizationReport) {
    ui.rule(Some("ttff prioritize"));
    ui.info(&format!(
        "{} runs, {} test cases, alpha = {}",
        report.runs,
        report.cases.len(),
        report.smoothing_alpha
    ));
    for skipped in &report.skipped {
        ui.warning(&format!("skipped {}: {}", skipped.strategy, skipped.reason));
    }
    for entry in &report.strategies {
        ui.info(&format!(
            "{:<20} expected {:>10}  observed {:>10}  ({} evaluations, {} pruned)",
            entry.strategy.as_str(),
            fmt_secs(entry.expected_ttff),
            fmt_secs(entry.true_mean_ttff),
            entry.evaluations,
            entry.pruned
        ));
    }
    ui.info(&format!(
        "{:<20} observed {:>10}",
        "default",
        fmt_secs(report.baselines.default.true_mean_ttff)
    ));
    ui.info(&format!(
        "{:<20} observed {:>10}  ({} samples)",
        "random",
        fmt_secs(report.baselines.random_mean_ttff),
        report.baselines.random_samples
    ));
    ui.info(&format!(
        "{:<20} observed {:>10}",
        "lower bound",
        fmt_secs(report.baselines.lower_bound_ttff)
    ));
    ui.success(&format!(
        "chosen ({}): {}",
        report.chosen.strategy,
        report.chosen.order.join(", ")
    ));
    if let Some(gain) = report.improvement_over_default() {
        ui.info(&format!("{:.1}% faster than declaration order", gain * 100.0));
    }
}
