//! One interface over both decision strategies.
//!
//! Callers pick the procedure by what they know about the theory; nothing
//! here inspects the formula to choose.

use mondec_smt::formula::{Formula, Var};
use serde::Serialize;

use crate::budget::SearchBudget;
use crate::error::MondecError;
use crate::generic::{Decomposition, GenericChecker, GenericOptions};
use crate::oracle::Oracle;
use crate::presburger::{PresburgerProcedure, PresburgerVerdict};
use crate::relation::Relation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Decomposable,
    NotDecomposable,
    Inconclusive(String),
    BudgetExceeded(String),
}

impl Verdict {
    pub fn is_decomposable(&self) -> bool {
        matches!(self, Verdict::Decomposable)
    }

    /// Whether the verdict is a definite answer.
    pub fn is_definite(&self) -> bool {
        matches!(self, Verdict::Decomposable | Verdict::NotDecomposable)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Decomposable => f.write_str("decomposable"),
            Verdict::NotDecomposable => f.write_str("not decomposable"),
            Verdict::Inconclusive(reason) => write!(f, "inconclusive ({reason})"),
            Verdict::BudgetExceeded(reason) => write!(f, "budget exceeded ({reason})"),
        }
    }
}

pub trait DecisionProcedure {
    fn name(&self) -> &'static str;

    fn check(&mut self, formula: &Formula, var: &Var) -> Result<Verdict, MondecError>;
}

impl From<PresburgerVerdict> for Verdict {
    fn from(verdict: PresburgerVerdict) -> Self {
        match verdict {
            PresburgerVerdict::Decomposable(_) => Verdict::Decomposable,
            PresburgerVerdict::NotDecomposable { .. } => Verdict::NotDecomposable,
            PresburgerVerdict::Inconclusive(reason) => Verdict::Inconclusive(reason),
        }
    }
}

impl From<&Decomposition> for Verdict {
    fn from(decomposition: &Decomposition) -> Self {
        match decomposition {
            Decomposition::Decomposable(_) => Verdict::Decomposable,
            Decomposition::Inconclusive { reason, .. } => Verdict::Inconclusive(reason.clone()),
            Decomposition::BudgetExceeded { reason, .. } => {
                Verdict::BudgetExceeded(reason.clone())
            }
        }
    }
}

impl<O: Oracle> DecisionProcedure for PresburgerProcedure<O> {
    fn name(&self) -> &'static str {
        "presburger"
    }

    fn check(&mut self, formula: &Formula, var: &Var) -> Result<Verdict, MondecError> {
        Ok(self.decomposable(formula, var)?.into())
    }
}

/// The generic checker behind [`DecisionProcedure`]. It never answers
/// [`Verdict::NotDecomposable`].
pub struct GenericProcedure<O: Oracle> {
    checker: GenericChecker<O>,
    /// Seconds each `check` may run; 0 keeps the deadline of the options.
    timeout_secs: u64,
    base_budget: SearchBudget,
}

impl<O: Oracle> GenericProcedure<O> {
    pub fn new(oracle: O, options: GenericOptions) -> Self {
        let base_budget = options.budget.clone();
        Self {
            checker: GenericChecker::new(oracle, options),
            timeout_secs: 0,
            base_budget,
        }
    }

    /// Give every `check` its own deadline, `timeout_secs` from its start.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn checker(&self) -> &GenericChecker<O> {
        &self.checker
    }
}

impl<O: Oracle> DecisionProcedure for GenericProcedure<O> {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn check(&mut self, formula: &Formula, var: &Var) -> Result<Verdict, MondecError> {
        if self.timeout_secs > 0 {
            *self.checker.budget_mut() = self
                .base_budget
                .clone()
                .with_timeout_secs(self.timeout_secs);
        }
        let relation = Relation::new(formula.clone(), var.clone())?;
        let decomposition = self.checker.decompose(&relation)?;
        Ok(Verdict::from(&decomposition))
    }
}
