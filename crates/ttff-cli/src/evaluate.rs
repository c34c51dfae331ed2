use clap::Args;
use serde::Serialize;
use ttff_core::{
    CaseTimes, RunMatrix, ScenarioEstimator, Smoothing, TestOrder, TtffCalculator,
    lower_bound_ttff, true_mean_ttff,
};

use crate::error::Result;
use crate::util::{CliOutput, OutputIntegration, TableArgs, envelope, fmt_secs, json_mode};

#[derive(Debug, Clone, Args)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub tables: TableArgs,

    /// Comma-separated ordering of every test case. Defaults to declaration
    /// order.
    #[arg(long, value_delimiter = ',')]
    pub order: Option<Vec<String>>,

    /// Additive smoothing pseudo-count for the expected value.
    #[arg(long, default_value_t = 0.0)]
    pub alpha: f64,

    #[arg(long)]
    pub json: bool,
}

/// Model and ground-truth scores for one concrete ordering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderEvaluation {
    pub order: Vec<String>,
    pub smoothing_alpha: f64,
    pub expected_ttff: f64,
    pub true_mean_ttff: f64,
    pub lower_bound_ttff: f64,
}

pub fn evaluate_order(
    matrix: &RunMatrix,
    names: Option<&[String]>,
    alpha: f64,
) -> Result<OrderEvaluation> {
    let order = match names {
        Some(names) => TestOrder::from_names(matrix, names)?,
        None => TestOrder::declaration(matrix),
    };
    let smoothing = Smoothing::from_alpha(alpha)?;
    let estimator = ScenarioEstimator::new(matrix, smoothing)?;
    let mut calc = TtffCalculator::new(estimator, CaseTimes::from_matrix(matrix)?);

    Ok(OrderEvaluation {
        order: order.names(matrix),
        smoothing_alpha: smoothing.alpha(),
        expected_ttff: calc.expected_ttff(order.as_slice(), f64::INFINITY)?,
        true_mean_ttff: true_mean_ttff(matrix, order.as_slice())?,
        lower_bound_ttff: lower_bound_ttff(matrix)?,
    })
}

pub fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let integration = OutputIntegration::detect();
    let json = json_mode(args.json, &integration);
    let matrix = args.tables.load()?;
    let evaluation = evaluate_order(&matrix, args.order.as_deref(), args.alpha)?;

    if json {
        let envelope = envelope("evaluate", &evaluation)?;
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return Ok(());
    }

    let ui = CliOutput::new(true);
    ui.rule(Some("ttff evaluate"));
    ui.info(&format!("order: {}", evaluation.order.join(", ")));
    ui.info(&format!("expected TTFF:   {}", fmt_secs(evaluation.expected_ttff)));
    ui.info(&format!("observed TTFF:   {}", fmt_secs(evaluation.true_mean_ttff)));
    ui.info(&format!("lower bound:     {}", fmt_secs(evaluation.lower_bound_ttff)));
    Ok(())
}
