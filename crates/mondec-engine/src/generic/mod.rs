//! Theory-agnostic monadic decomposition by oracle-driven class discovery.
//!
//! The checker grows a [`Partition`] of the distinguished variable's domain.
//! A value joins a class when the oracle proves it interchangeable with the
//! class representative, and a new class is opened only after it has been
//! shown interchangeable with none of them. The search ends when the
//! strategy reports the partition exhaustive.
//!
//! On a relation that is not decomposable the loop never ends by itself;
//! [`SearchBudget`] bounds it and exhaustion is reported as
//! [`Decomposition::BudgetExceeded`].

pub mod strategy;

use mondec_smt::formula::{Formula, Var};
use mondec_smt::solver::ModelValue;
use tracing::{debug, info};

use crate::budget::{SearchBudget, SearchStats};
use crate::error::MondecError;
use crate::oracle::{Oracle, Validity};
use crate::partition::Partition;
use crate::relation::Relation;

pub use strategy::{
    CandidateStrategy, Certification, CounterexampleGuided, Enumerate, Probe, Session,
    StrategyChoice,
};

/// Outcome of a generic decomposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decomposition {
    /// The partition is exhaustive and witnesses decomposability.
    Decomposable(Partition),
    /// The oracle returned unknown.
    Inconclusive { reason: String, partial: Partition },
    /// The budget ran out before the search finished.
    BudgetExceeded { reason: String, partial: Partition },
}

impl Decomposition {
    pub fn is_decomposable(&self) -> bool {
        matches!(self, Decomposition::Decomposable(_))
    }

    /// The partition reached, complete or not.
    pub fn partition(&self) -> &Partition {
        match self {
            Decomposition::Decomposable(p) => p,
            Decomposition::Inconclusive { partial, .. } => partial,
            Decomposition::BudgetExceeded { partial, .. } => partial,
        }
    }
}

/// Options for [`GenericChecker`].
#[derive(Debug, Clone, Default)]
pub struct GenericOptions {
    pub strategy: StrategyChoice,
    pub budget: SearchBudget,
}

pub struct GenericChecker<O: Oracle> {
    oracle: O,
    strategy: Box<dyn CandidateStrategy>,
    budget: SearchBudget,
    last_stats: SearchStats,
}

impl<O: Oracle> GenericChecker<O> {
    pub fn new(oracle: O, options: GenericOptions) -> Self {
        Self::with_strategy(oracle, options.strategy.build(), options.budget)
    }

    pub fn with_strategy(
        oracle: O,
        strategy: Box<dyn CandidateStrategy>,
        budget: SearchBudget,
    ) -> Self {
        Self {
            oracle,
            strategy,
            budget,
            last_stats: SearchStats::default(),
        }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn into_oracle(self) -> O {
        self.oracle
    }

    pub fn budget_mut(&mut self) -> &mut SearchBudget {
        &mut self.budget
    }

    /// Counters of the most recent [`decompose`](Self::decompose) call.
    pub fn last_stats(&self) -> SearchStats {
        self.last_stats
    }

    pub fn decompose(&mut self, relation: &Relation) -> Result<Decomposition, MondecError> {
        let mut partition = Partition::new(relation.var().clone());
        let mut stats = SearchStats::default();
        self.strategy.reset();
        let outcome = self.search(relation, &mut partition, &mut stats);
        self.last_stats = stats;
        let outcome = outcome?;
        match &outcome {
            Decomposition::Decomposable(p) => info!(
                var = %relation.var(),
                strategy = self.strategy.name(),
                classes = p.len(),
                queries = stats.queries,
                "generic: decomposable"
            ),
            Decomposition::Inconclusive { reason, .. } => info!(
                var = %relation.var(),
                %reason,
                "generic: inconclusive"
            ),
            Decomposition::BudgetExceeded { reason, partial } => info!(
                var = %relation.var(),
                %reason,
                classes = partial.len(),
                "generic: budget exceeded"
            ),
        }
        Ok(outcome)
    }

    fn search(
        &mut self,
        relation: &Relation,
        partition: &mut Partition,
        stats: &mut SearchStats,
    ) -> Result<Decomposition, MondecError> {
        loop {
            let probe = {
                let mut session = Session::new(&mut self.oracle, &self.budget, stats);
                self.strategy.next_probe(relation, partition, &mut session)?
            };
            let step = match probe {
                Probe::Exhaustive => return Ok(Decomposition::Decomposable(partition.clone())),
                Probe::Unknown(reason) => Step::Inconclusive(reason),
                Probe::Halted(reason) => Step::Halted(reason),
                Probe::Distinct(value) => {
                    stats.candidates += 1;
                    Self::open_class(partition, stats, value);
                    Step::Continue
                }
                Probe::Candidate(value) => {
                    stats.candidates += 1;
                    self.classify(relation, partition, stats, value)?
                }
            };
            let step = match step {
                Step::Continue => match self.budget.exhausted(stats) {
                    Some(reason) => Step::Halted(reason),
                    None => Step::Continue,
                },
                other => other,
            };
            match step {
                Step::Continue => {}
                Step::Inconclusive(reason) => {
                    return Ok(Decomposition::Inconclusive {
                        reason,
                        partial: partition.clone(),
                    })
                }
                Step::Halted(reason) => {
                    return Ok(Decomposition::BudgetExceeded {
                        reason,
                        partial: partition.clone(),
                    })
                }
            }
        }
    }

    /// Place `value` in the first class whose representative it is
    /// interchangeable with, or in a new class.
    fn classify(
        &mut self,
        relation: &Relation,
        partition: &mut Partition,
        stats: &mut SearchStats,
        value: ModelValue,
    ) -> Result<Step, MondecError> {
        if partition.contains(&value) {
            return Ok(Step::Continue);
        }
        for (idx, rep) in partition.representatives().into_iter().enumerate() {
            if let Some(reason) = self.budget.exhausted(stats) {
                return Ok(Step::Halted(reason));
            }
            let query = relation.interchangeability_query(&value, &rep)?;
            let answer = {
                let mut session = Session::new(&mut self.oracle, &self.budget, stats);
                session.validity(&query)?
            };
            match answer {
                Validity::Valid => {
                    debug!(var = %relation.var(), %value, %rep, "generic: joins class");
                    partition.join(idx, value);
                    return Ok(Step::Continue);
                }
                Validity::Invalid(_) => {}
                Validity::Unknown(reason) => return Ok(Step::Inconclusive(reason)),
            }
        }
        Self::open_class(partition, stats, value);
        Ok(Step::Continue)
    }

    fn open_class(partition: &mut Partition, stats: &mut SearchStats, value: ModelValue) {
        let idx = partition.open_class(value);
        stats.classes = partition.len();
        debug!(var = %partition.var(), %value, class = idx, "generic: new class");
    }
}

enum Step {
    Continue,
    Inconclusive(String),
    Halted(String),
}

/// Decompose `formula` with respect to `variables[0]`.
pub fn decompose<O: Oracle>(
    oracle: O,
    formula: &Formula,
    variables: &[Var],
    options: GenericOptions,
) -> Result<Decomposition, MondecError> {
    let relation = Relation::from_variables(formula.clone(), variables)?;
    GenericChecker::new(oracle, options).decompose(&relation)
}
