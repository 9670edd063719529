//! Built-in formulas with known decomposability, run by the CLI and tests.

use mondec_smt::formula::{Formula, Var};
use mondec_smt::terms::SmtTerm;
use serde::Serialize;
use tracing::info;

use crate::error::MondecError;
use crate::procedure::{DecisionProcedure, Verdict};

#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    pub formula: Formula,
    /// Variables the formula is decomposable on; every other free
    /// variable is expected not to be.
    pub decomposable_on: Vec<Var>,
}

impl Scenario {
    pub fn expects_decomposable(&self, var: &Var) -> bool {
        self.decomposable_on.contains(var)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableReport {
    pub var: String,
    pub expected_decomposable: bool,
    pub verdict: Verdict,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub procedure: String,
    pub variables: Vec<VariableReport>,
    pub passed: bool,
}

fn v(name: &str) -> SmtTerm {
    SmtTerm::var(name)
}

fn int(n: i64) -> SmtTerm {
    SmtTerm::int(n)
}

fn non_negative(names: &[&str]) -> Vec<SmtTerm> {
    names.iter().map(|n| v(n).ge(int(0))).collect()
}

fn build(
    name: &'static str,
    description: &'static str,
    atoms: Vec<SmtTerm>,
    decomposable_on: &[&str],
) -> Result<Scenario, MondecError> {
    Ok(Scenario {
        name,
        description,
        formula: Formula::infer(SmtTerm::and(atoms))?,
        decomposable_on: decomposable_on.iter().map(|n| Var::int(*n)).collect(),
    })
}

/// The scenario suite, in a fixed order.
pub fn all() -> Result<Vec<Scenario>, MondecError> {
    let mut eq = non_negative(&["x", "y"]);
    eq.push(v("x").eq(v("y")));

    let mut le = non_negative(&["x", "y"]);
    le.push(v("x").le(v("y")));

    let mut ge = non_negative(&["x", "y"]);
    ge.push(v("x").ge(v("y")));

    let mut mixed = non_negative(&["x", "y", "z"]);
    mixed.push(v("x").add(int(2).mul(v("y"))).ge(int(5)));
    mixed.push(v("z").lt(int(5)));
    mixed.push(SmtTerm::congruent(v("x"), v("y"), 2));

    let independent = vec![v("x").ge(int(0)), v("y").lt(int(3))];

    Ok(vec![
        build("equal", "x >= 0 && y >= 0 && x = y", eq, &[])?,
        build("less-equal", "x >= 0 && y >= 0 && x <= y", le, &[])?,
        build("greater-equal", "x >= 0 && y >= 0 && x >= y", ge, &[])?,
        build(
            "mixed",
            "x >= 0 && y >= 0 && z >= 0 && x + 2y >= 5 && z < 5 && x = y (mod 2)",
            mixed,
            &["x", "y", "z"],
        )?,
        build("independent", "x >= 0 && y < 3", independent, &["x", "y"])?,
    ])
}

pub fn by_name(name: &str) -> Result<Option<Scenario>, MondecError> {
    Ok(all()?.into_iter().find(|s| s.name == name))
}

/// Whether `verdict` is consistent with the expectation. Budget exhaustion
/// counts as consistent with non-decomposability; inconclusive never passes.
fn consistent(expected_decomposable: bool, verdict: &Verdict) -> bool {
    match verdict {
        Verdict::Decomposable => expected_decomposable,
        Verdict::NotDecomposable | Verdict::BudgetExceeded(_) => !expected_decomposable,
        Verdict::Inconclusive(_) => false,
    }
}

/// Check every free variable of `scenario` with `procedure`.
pub fn run(
    scenario: &Scenario,
    procedure: &mut dyn DecisionProcedure,
) -> Result<ScenarioReport, MondecError> {
    let mut variables = Vec::new();
    for var in scenario.formula.free_vars() {
        let verdict = procedure.check(&scenario.formula, var)?;
        let expected = scenario.expects_decomposable(var);
        let passed = consistent(expected, &verdict);
        info!(
            scenario = scenario.name,
            procedure = procedure.name(),
            var = %var,
            %verdict,
            passed,
            "scenario: checked"
        );
        variables.push(VariableReport {
            var: var.name.clone(),
            expected_decomposable: expected,
            verdict,
            passed,
        });
    }
    let passed = variables.iter().all(|v| v.passed);
    Ok(ScenarioReport {
        scenario: scenario.name.to_string(),
        procedure: procedure.name().to_string(),
        variables,
        passed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    struct Always(Verdict);

    impl DecisionProcedure for Always {
        fn name(&self) -> &'static str {
            "always"
        }

        fn check(&mut self, _: &Formula, _: &Var) -> Result<Verdict, MondecError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn suite_is_well_formed() -> TestResult {
        let suite = all()?;
        assert_eq!(suite.len(), 5);
        for scenario in &suite {
            for var in &scenario.decomposable_on {
                assert!(scenario.formula.declares(var), "{}: {var}", scenario.name);
            }
        }
        let mixed = by_name("mixed")?.unwrap();
        assert_eq!(
            mixed.formula.free_vars(),
            &[Var::int("x"), Var::int("y"), Var::int("z")]
        );
        assert!(by_name("missing")?.is_none());
        Ok(())
    }

    #[test]
    fn budget_exhaustion_passes_only_negative_expectations() -> TestResult {
        let scenario = by_name("equal")?.unwrap();
        let report = run(&scenario, &mut Always(Verdict::BudgetExceeded("n".into())))?;
        assert!(report.passed);
        let scenario = by_name("independent")?.unwrap();
        let report = run(&scenario, &mut Always(Verdict::BudgetExceeded("n".into())))?;
        assert!(!report.passed);
        Ok(())
    }

    #[test]
    fn inconclusive_never_passes() -> TestResult {
        let scenario = by_name("equal")?.unwrap();
        let report = run(&scenario, &mut Always(Verdict::Inconclusive("t".into())))?;
        assert!(!report.passed);
        assert_eq!(report.variables.len(), 2);
        assert!(report.variables.iter().all(|v| !v.passed));
        Ok(())
    }

    #[test]
    fn report_serialises() -> TestResult {
        let scenario = by_name("independent")?.unwrap();
        let report = run(&scenario, &mut Always(Verdict::Decomposable))?;
        let json = serde_json::to_value(&report)?;
        assert_eq!(json["scenario"], "independent");
        assert_eq!(json["procedure"], "always");
        assert_eq!(json["passed"], true);
        assert_eq!(json["variables"][0]["verdict"], "decomposable");
        Ok(())
    }
}
