use clap::Args;
use serde::Serialize;
use ttff_core::{CaseTimes, RunMatrix};

use crate::error::Result;
use crate::util::{CliOutput, OutputIntegration, TableArgs, envelope, fmt_secs, json_mode};

#[derive(Debug, Clone, Args)]
pub struct InspectArgs {
    #[command(flatten)]
    pub tables: TableArgs,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseSummary {
    pub name: String,
    pub failures: usize,
    pub failure_rate: f64,
    pub failure_time: f64,
    pub success_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniverseSummary {
    pub runs: usize,
    /// Runs with at least one failing case.
    pub failing_runs: usize,
    pub cases: Vec<CaseSummary>,
}

pub fn summarize(matrix: &RunMatrix) -> Result<UniverseSummary> {
    let times = CaseTimes::from_matrix(matrix)?;
    let runs = matrix.run_count();
    let cases = (0..matrix.case_count())
        .map(|case| -> Result<CaseSummary> {
            let failures = matrix.failure_count(case);
            Ok(CaseSummary {
                name: matrix.case_name(case).unwrap_or_default().to_string(),
                failures,
                failure_rate: if runs == 0 {
                    0.0
                } else {
                    failures as f64 / runs as f64
                },
                failure_time: times.failure_time(case)?,
                success_time: times.success_time(case)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let failing_runs = (0..runs)
        .filter(|&run| matrix.status_row(run).iter().any(|passed| !passed))
        .count();

    Ok(UniverseSummary {
        runs,
        failing_runs,
        cases,
    })
}

pub fn run_inspect(args: InspectArgs) -> Result<()> {
    let integration = OutputIntegration::detect();
    let json = json_mode(args.json, &integration);
    let summary = summarize(&args.tables.load()?)?;

    if json {
        let envelope = envelope("inspect", &summary)?;
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return Ok(());
    }

    let ui = CliOutput::new(true);
    ui.rule(Some("ttff inspect"));
    ui.info(&format!(
        "{} runs, {} with a failure, {} test cases",
        summary.runs,
        summary.failing_runs,
        summary.cases.len()
    ));
    for case in &summary.cases {
        ui.info(&format!(
            "{:<32} failed {:>4}x ({:>5.1}%)  f={:>9}  s={:>9}",
            case.name,
            case.failures,
            case.failure_rate * 100.0,
            fmt_secs(case.failure_time),
            fmt_secs(case.success_time)
        ));
    }
    if summary.failing_runs == 0 {
        ui.warning("no run has a failure; every ordering scores the same");
    }
    Ok(())
}
