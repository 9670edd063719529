//! Candidate selection for the generic search.
//!
//! A strategy only proposes values; the checker owns the partition and
//! decides class membership, so strategies can be swapped freely.

use mondec_smt::formula::Formula;
use mondec_smt::solver::ModelValue;
use mondec_smt::sorts::SmtSort;
use tracing::debug;

use crate::budget::{SearchBudget, SearchStats};
use crate::error::MondecError;
use crate::oracle::{Oracle, Validity};
use crate::partition::Partition;
use crate::relation::Relation;

/// What a strategy wants the checker to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// Classify this value against the existing classes.
    Candidate(ModelValue),
    /// This value is already known to be interchangeable with no class.
    Distinct(ModelValue),
    /// The partition covers the whole domain.
    Exhaustive,
    /// The oracle could not answer.
    Unknown(String),
    /// The search budget ran out.
    Halted(String),
}

/// Result of asking the oracle whether a partition is exhaustive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Certification {
    Exhaustive,
    /// A value interchangeable with no current representative.
    Uncovered(ModelValue),
    Unknown(String),
    Halted(String),
}

/// Oracle access for one search, metered against its budget.
pub struct Session<'a> {
    oracle: &'a mut dyn Oracle,
    budget: &'a SearchBudget,
    stats: &'a mut SearchStats,
}

impl<'a> Session<'a> {
    pub(crate) fn new(
        oracle: &'a mut dyn Oracle,
        budget: &'a SearchBudget,
        stats: &'a mut SearchStats,
    ) -> Self {
        Self {
            oracle,
            budget,
            stats,
        }
    }

    pub fn stats(&self) -> &SearchStats {
        self.stats
    }

    /// Why the search must stop, checked before every query.
    pub fn halted(&self) -> Option<String> {
        self.budget.exhausted(self.stats)
    }

    /// Validity of `∀v. ⋁ᵢ v ~ repᵢ`.
    pub fn certify(
        &mut self,
        relation: &Relation,
        partition: &Partition,
    ) -> Result<Certification, MondecError> {
        if let Some(reason) = self.halted() {
            return Ok(Certification::Halted(reason));
        }
        let var = relation.var();
        let coverage = Formula::new(partition.coverage_term(relation), vec![var.clone()])?;
        debug!(var = %var, classes = partition.len(), "generic: certify");
        match self.validity(&coverage)? {
            Validity::Valid => Ok(Certification::Exhaustive),
            Validity::Invalid(model) => {
                let value = model.get(&var.name).ok_or_else(|| {
                    MondecError::Solver(format!("counterexample has no value for `{var}`"))
                })?;
                Ok(Certification::Uncovered(value))
            }
            Validity::Unknown(reason) => Ok(Certification::Unknown(reason)),
        }
    }

    pub(crate) fn validity(&mut self, formula: &Formula) -> Result<Validity, MondecError> {
        let answer = self.oracle.check_validity(formula)?;
        self.stats.queries += 1;
        Ok(answer)
    }
}

/// Proposes values of the distinguished variable.
pub trait CandidateStrategy {
    fn name(&self) -> &'static str;

    /// Forget state from a previous search.
    fn reset(&mut self) {}

    fn next_probe(
        &mut self,
        relation: &Relation,
        partition: &Partition,
        session: &mut Session<'_>,
    ) -> Result<Probe, MondecError>;
}

/// Certify the partition after every step; each counterexample opens a class.
#[derive(Debug, Clone, Default)]
pub struct CounterexampleGuided;

impl CandidateStrategy for CounterexampleGuided {
    fn name(&self) -> &'static str {
        "cegar"
    }

    fn next_probe(
        &mut self,
        relation: &Relation,
        partition: &Partition,
        session: &mut Session<'_>,
    ) -> Result<Probe, MondecError> {
        Ok(match session.certify(relation, partition)? {
            Certification::Exhaustive => Probe::Exhaustive,
            Certification::Uncovered(value) => Probe::Distinct(value),
            Certification::Unknown(reason) => Probe::Unknown(reason),
            Certification::Halted(reason) => Probe::Halted(reason),
        })
    }
}

/// Walk the domain in a fixed order: `0, 1, -1, 2, -2, ...` for `Int`,
/// `false, true` for `Bool`. The partition is certified whenever it has
/// grown since the last certification.
#[derive(Debug, Clone, Default)]
pub struct Enumerate {
    next: u64,
    certified_at: Option<usize>,
}

impl Enumerate {
    fn value_at(sort: SmtSort, index: u64) -> Option<ModelValue> {
        match sort {
            SmtSort::Bool => match index {
                0 => Some(ModelValue::Bool(false)),
                1 => Some(ModelValue::Bool(true)),
                _ => None,
            },
            SmtSort::Int => {
                let magnitude = i64::try_from(index.div_ceil(2)).ok()?;
                if index % 2 == 1 {
                    Some(ModelValue::Int(magnitude))
                } else {
                    Some(ModelValue::Int(-magnitude))
                }
            }
        }
    }

    fn domain_covered(sort: SmtSort, partition: &Partition) -> bool {
        match sort {
            SmtSort::Bool => {
                partition.contains(&ModelValue::Bool(false))
                    && partition.contains(&ModelValue::Bool(true))
            }
            SmtSort::Int => false,
        }
    }
}

impl CandidateStrategy for Enumerate {
    fn name(&self) -> &'static str {
        "enumerate"
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn next_probe(
        &mut self,
        relation: &Relation,
        partition: &Partition,
        session: &mut Session<'_>,
    ) -> Result<Probe, MondecError> {
        let sort = relation.var().sort;
        if Self::domain_covered(sort, partition) {
            return Ok(Probe::Exhaustive);
        }
        if !partition.is_empty() && self.certified_at != Some(partition.len()) {
            self.certified_at = Some(partition.len());
            match session.certify(relation, partition)? {
                Certification::Exhaustive => return Ok(Probe::Exhaustive),
                Certification::Uncovered(_) => {}
                Certification::Unknown(reason) => return Ok(Probe::Unknown(reason)),
                Certification::Halted(reason) => return Ok(Probe::Halted(reason)),
            }
        }
        loop {
            let Some(value) = Self::value_at(sort, self.next) else {
                return Ok(match sort.cardinality() {
                    Some(_) => Probe::Exhaustive,
                    None => Probe::Halted("integer enumeration overflowed".into()),
                });
            };
            self.next += 1;
            if !partition.contains(&value) {
                return Ok(Probe::Candidate(value));
            }
        }
    }
}

/// Strategy selection exposed through options and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyChoice {
    #[default]
    CounterexampleGuided,
    Enumerate,
}

impl StrategyChoice {
    pub fn build(self) -> Box<dyn CandidateStrategy> {
        match self {
            StrategyChoice::CounterexampleGuided => Box::new(CounterexampleGuided),
            StrategyChoice::Enumerate => Box::new(Enumerate::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_enumeration_order() {
        let values: Vec<ModelValue> = (0..5)
            .filter_map(|i| Enumerate::value_at(SmtSort::Int, i))
            .collect();
        assert_eq!(
            values,
            vec![
                ModelValue::Int(0),
                ModelValue::Int(1),
                ModelValue::Int(-1),
                ModelValue::Int(2),
                ModelValue::Int(-2),
            ]
        );
    }

    #[test]
    fn bool_domain_is_finite() {
        assert_eq!(
            Enumerate::value_at(SmtSort::Bool, 0),
            Some(ModelValue::Bool(false))
        );
        assert_eq!(
            Enumerate::value_at(SmtSort::Bool, 1),
            Some(ModelValue::Bool(true))
        );
        assert_eq!(Enumerate::value_at(SmtSort::Bool, 2), None);
    }

    #[test]
    fn int_enumeration_stops_before_overflow() {
        assert_eq!(Enumerate::value_at(SmtSort::Int, u64::MAX), None);
    }

    #[test]
    fn strategy_names() {
        assert_eq!(StrategyChoice::default().build().name(), "cegar");
        assert_eq!(StrategyChoice::Enumerate.build().name(), "enumerate");
    }
}
