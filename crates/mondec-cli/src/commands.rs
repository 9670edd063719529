//! Subcommand implementations.

use miette::IntoDiagnostic;
use mondec_engine::budget::SearchBudget;
use mondec_engine::generic::StrategyChoice;
use mondec_engine::scenarios::{self, Scenario, ScenarioReport};
use mondec_engine::{
    DecisionProcedure, GenericOptions, GenericProcedure, MondecError, OracleConfig,
    PresburgerProcedure, SolverChoice,
};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcedureChoice {
    Presburger,
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub(crate) struct SuiteOptions {
    pub(crate) procedures: Vec<ProcedureChoice>,
    pub(crate) solver: SolverChoice,
    pub(crate) timeout_secs: u64,
    pub(crate) max_classes: usize,
    pub(crate) strategy: StrategyChoice,
    pub(crate) scenario: Option<String>,
    pub(crate) format: OutputFormat,
}

pub(crate) fn parse_procedures(raw: &str) -> miette::Result<Vec<ProcedureChoice>> {
    match raw {
        "presburger" => Ok(vec![ProcedureChoice::Presburger]),
        "generic" => Ok(vec![ProcedureChoice::Generic]),
        "both" => Ok(vec![ProcedureChoice::Presburger, ProcedureChoice::Generic]),
        other => Err(miette::miette!(
            "Unknown procedure: {other}. Use 'presburger', 'generic' or 'both'."
        )),
    }
}

pub(crate) fn parse_solver_choice(raw: &str) -> miette::Result<SolverChoice> {
    match raw {
        "z3" => Ok(SolverChoice::Z3),
        "z3-process" => Ok(SolverChoice::Z3Process),
        "cvc5" => Ok(SolverChoice::Cvc5),
        other => Err(miette::miette!(
            "Unknown solver: {other}. Use 'z3', 'z3-process' or 'cvc5'."
        )),
    }
}

pub(crate) fn parse_strategy(raw: &str) -> miette::Result<StrategyChoice> {
    match raw {
        "cegar" => Ok(StrategyChoice::CounterexampleGuided),
        "enumerate" => Ok(StrategyChoice::Enumerate),
        other => Err(miette::miette!(
            "Unknown strategy: {other}. Use 'cegar' or 'enumerate'."
        )),
    }
}

pub(crate) fn parse_output_format(raw: &str) -> miette::Result<OutputFormat> {
    match raw {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        other => Err(miette::miette!("Unknown format: {other}. Use 'text' or 'json'.")),
    }
}

fn engine_err(e: MondecError) -> miette::Report {
    miette::miette!("{e}")
}

fn selected_scenarios(name: Option<&str>) -> miette::Result<Vec<Scenario>> {
    let suite = scenarios::all().map_err(engine_err)?;
    match name {
        None => Ok(suite),
        Some(name) => {
            let known: Vec<&str> = suite.iter().map(|s| s.name).collect();
            let picked: Vec<Scenario> = suite.iter().filter(|s| s.name == name).cloned().collect();
            if picked.is_empty() {
                return Err(miette::miette!(
                    "Unknown scenario: {name}. Known scenarios: {}",
                    known.join(", ")
                ));
            }
            Ok(picked)
        }
    }
}

fn build_procedure(
    choice: ProcedureChoice,
    options: &SuiteOptions,
) -> Result<Box<dyn DecisionProcedure>, MondecError> {
    let oracle = OracleConfig {
        solver: options.solver,
        timeout_secs: options.timeout_secs,
        ..OracleConfig::default()
    }
    .build()?;
    Ok(match choice {
        ProcedureChoice::Presburger => Box::new(PresburgerProcedure::new(oracle)),
        ProcedureChoice::Generic => {
            let generic = GenericOptions {
                strategy: options.strategy,
                budget: SearchBudget::unlimited().with_max_classes(options.max_classes),
            };
            Box::new(GenericProcedure::new(oracle, generic).with_timeout_secs(options.timeout_secs))
        }
    })
}

pub(crate) fn run_suite_command(options: &SuiteOptions) -> miette::Result<()> {
    let suite = selected_scenarios(options.scenario.as_deref())?;
    let mut reports = Vec::new();
    for &choice in &options.procedures {
        let mut procedure = build_procedure(choice, options).map_err(engine_err)?;
        for scenario in &suite {
            reports.push(scenarios::run(scenario, procedure.as_mut()).map_err(engine_err)?);
        }
    }

    match options.format {
        OutputFormat::Text => print!("{}", render_text(&reports)),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&reports).into_diagnostic()?)
        }
    }

    let failed: Vec<String> = reports
        .iter()
        .filter(|r| !r.passed)
        .map(|r| format!("{} [{}]", r.scenario, r.procedure))
        .collect();
    info!(runs = reports.len(), failed = failed.len(), "suite finished");
    if !failed.is_empty() {
        return Err(miette::miette!(
            "{} of {} scenario runs failed: {}",
            failed.len(),
            reports.len(),
            failed.join(", ")
        ));
    }
    Ok(())
}

pub(crate) fn render_text(reports: &[ScenarioReport]) -> String {
    let mut out = String::new();
    for report in reports {
        let status = if report.passed { "PASS" } else { "FAIL" };
        let vars: Vec<String> = report
            .variables
            .iter()
            .map(|v| {
                let expected = if v.expected_decomposable {
                    "decomposable"
                } else {
                    "not decomposable"
                };
                if v.passed {
                    format!("{}: {}", v.var, v.verdict)
                } else {
                    format!("{}: {} (expected {expected})", v.var, v.verdict)
                }
            })
            .collect();
        out.push_str(&format!(
            "{status} {} [{}] {}\n",
            report.scenario,
            report.procedure,
            vars.join(", ")
        ));
    }
    out
}

pub(crate) fn run_list_command() -> miette::Result<()> {
    print!("{}", render_list(&scenarios::all().map_err(engine_err)?));
    Ok(())
}

fn render_list(suite: &[Scenario]) -> String {
    let mut out = String::new();
    for scenario in suite {
        let on: Vec<&str> = scenario
            .decomposable_on
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        let on = if on.is_empty() {
            "none".to_string()
        } else {
            on.join(", ")
        };
        out.push_str(&format!(
            "{:<14} {}\n{:<14} decomposable on: {on}\n",
            scenario.name, scenario.description, ""
        ));
    }
    out
}
