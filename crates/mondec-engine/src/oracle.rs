//! Validity and satisfiability queries over quantified formulas.

use mondec_smt::backends::smtlib_process::SmtLibProcess;
use mondec_smt::backends::z3_backend::Z3Solver;
use mondec_smt::formula::Formula;
use mondec_smt::solver::{Model, SatAnswer, SmtSolver};
use mondec_smt::terms::SmtTerm;
use tracing::{debug, warn};

use crate::error::MondecError;

/// Outcome of a validity query. Free variables are read universally.
#[derive(Debug, Clone, PartialEq)]
pub enum Validity {
    Valid,
    /// A counterexample assignment of the free variables.
    Invalid(Model),
    Unknown(String),
}

/// Outcome of a satisfiability query. Free variables are read existentially.
#[derive(Debug, Clone, PartialEq)]
pub enum Satisfiability {
    Sat(Model),
    Unsat,
    Unknown(String),
}

/// A black-box decision procedure for quantified arithmetic.
pub trait Oracle {
    fn name(&self) -> &str;

    fn check_validity(&mut self, formula: &Formula) -> Result<Validity, MondecError>;

    fn check_satisfiability(&mut self, formula: &Formula) -> Result<Satisfiability, MondecError>;

    /// Number of queries answered so far.
    fn queries(&self) -> u64;
}

impl<O: Oracle + ?Sized> Oracle for Box<O> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn check_validity(&mut self, formula: &Formula) -> Result<Validity, MondecError> {
        (**self).check_validity(formula)
    }

    fn check_satisfiability(&mut self, formula: &Formula) -> Result<Satisfiability, MondecError> {
        (**self).check_satisfiability(formula)
    }

    fn queries(&self) -> u64 {
        (**self).queries()
    }
}

impl<O: Oracle + ?Sized> Oracle for &mut O {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn check_validity(&mut self, formula: &Formula) -> Result<Validity, MondecError> {
        (**self).check_validity(formula)
    }

    fn check_satisfiability(&mut self, formula: &Formula) -> Result<Satisfiability, MondecError> {
        (**self).check_satisfiability(formula)
    }

    fn queries(&self) -> u64 {
        (**self).queries()
    }
}

/// Answers oracle queries with any [`SmtSolver`] backend.
///
/// Each query starts from a reset solver, so queries never share assertions.
pub struct SolverOracle<S: SmtSolver> {
    solver: S,
    queries: u64,
}

impl<S: SmtSolver> SolverOracle<S> {
    pub fn new(solver: S) -> Self {
        Self { solver, queries: 0 }
    }

    pub fn into_inner(self) -> S {
        self.solver
    }

    fn run(&mut self, formula: &Formula, assertion: &SmtTerm) -> Result<SatAnswer, MondecError> {
        self.queries += 1;
        debug!(
            solver = self.solver.name(),
            query = self.queries,
            vars = formula.free_vars().len(),
            "oracle: query"
        );
        let answer = self
            .solver
            .solve(formula.free_vars(), assertion)
            .map_err(|e| MondecError::Solver(e.to_string()))?;
        if let SatAnswer::Unknown(reason) = &answer {
            warn!(solver = self.solver.name(), %reason, "oracle: unknown");
        }
        Ok(answer)
    }
}

impl<S: SmtSolver> Oracle for SolverOracle<S> {
    fn name(&self) -> &str {
        self.solver.name()
    }

    fn check_validity(&mut self, formula: &Formula) -> Result<Validity, MondecError> {
        let negated = formula.term().clone().not();
        Ok(match self.run(formula, &negated)? {
            SatAnswer::Unsat => Validity::Valid,
            SatAnswer::Sat(model) => Validity::Invalid(model),
            SatAnswer::Unknown(reason) => Validity::Unknown(reason),
        })
    }

    fn check_satisfiability(&mut self, formula: &Formula) -> Result<Satisfiability, MondecError> {
        Ok(match self.run(formula, formula.term())? {
            SatAnswer::Sat(model) => Satisfiability::Sat(model),
            SatAnswer::Unsat => Satisfiability::Unsat,
            SatAnswer::Unknown(reason) => Satisfiability::Unknown(reason),
        })
    }

    fn queries(&self) -> u64 {
        self.queries
    }
}

/// Which solver answers oracle queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverChoice {
    /// In-process Z3.
    #[default]
    Z3,
    /// A `z3` binary driven over SMT-LIB2.
    Z3Process,
    /// A `cvc5` binary driven over SMT-LIB2.
    Cvc5,
}

/// Oracle construction options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleConfig {
    pub solver: SolverChoice,
    /// Per-query timeout; 0 disables it.
    pub timeout_secs: u64,
    /// SMT-LIB logic handed to the backend. `None` leaves the choice to the solver.
    pub logic: Option<String>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            solver: SolverChoice::Z3,
            timeout_secs: 60,
            logic: Some("LIA".into()),
        }
    }
}

impl OracleConfig {
    pub fn build(&self) -> Result<Box<dyn Oracle>, MondecError> {
        let process_err = |e: mondec_smt::backends::smtlib_process::SmtLibProcessError| {
            MondecError::Solver(e.to_string())
        };
        let logic = self.logic.as_deref();
        let oracle: Box<dyn Oracle> = match self.solver {
            SolverChoice::Z3 => {
                let solver = match logic {
                    Some(logic) => Z3Solver::for_logic(logic, self.timeout_secs)
                        .map_err(|e| MondecError::Solver(e.to_string()))?,
                    None => Z3Solver::with_timeout_secs(self.timeout_secs),
                };
                Box::new(SolverOracle::new(solver))
            }
            SolverChoice::Z3Process => Box::new(SolverOracle::new(
                SmtLibProcess::z3(logic.unwrap_or("ALL"), self.timeout_secs)
                    .map_err(process_err)?,
            )),
            SolverChoice::Cvc5 => Box::new(SolverOracle::new(
                SmtLibProcess::cvc5(logic.unwrap_or("ALL"), self.timeout_secs)
                    .map_err(process_err)?,
            )),
        };
        Ok(oracle)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A scripted oracle for exercising control flow without a solver.

    use std::collections::VecDeque;

    use super::*;

    #[derive(Default)]
    pub(crate) struct ScriptedOracle {
        pub validity: VecDeque<Validity>,
        pub satisfiability: VecDeque<Satisfiability>,
        pub seen: Vec<Formula>,
    }

    impl ScriptedOracle {
        pub fn with_validity(answers: impl IntoIterator<Item = Validity>) -> Self {
            Self {
                validity: answers.into_iter().collect(),
                ..Self::default()
            }
        }

        pub fn with_satisfiability(answers: impl IntoIterator<Item = Satisfiability>) -> Self {
            Self {
                satisfiability: answers.into_iter().collect(),
                ..Self::default()
            }
        }
    }

    impl Oracle for ScriptedOracle {
        fn name(&self) -> &str {
            "scripted"
        }

        fn check_validity(&mut self, formula: &Formula) -> Result<Validity, MondecError> {
            self.seen.push(formula.clone());
            self.validity
                .pop_front()
                .ok_or_else(|| MondecError::Solver("script exhausted".into()))
        }

        fn check_satisfiability(
            &mut self,
            formula: &Formula,
        ) -> Result<Satisfiability, MondecError> {
            self.seen.push(formula.clone());
            self.satisfiability
                .pop_front()
                .ok_or_else(|| MondecError::Solver("script exhausted".into()))
        }

        fn queries(&self) -> u64 {
            self.seen.len() as u64
        }
    }

    pub(crate) fn int_model(pairs: &[(&str, i64)]) -> Model {
        pairs
            .iter()
            .map(|(name, value)| (*name, mondec_smt::solver::ModelValue::Int(*value)))
            .collect()
    }
}
