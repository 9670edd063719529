//! The interface every backend implements, and the models it hands back.

use std::collections::BTreeMap;

use crate::formula::Var;
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Answer to one satisfiability check.
#[derive(Debug, Clone, PartialEq)]
pub enum SatAnswer {
    /// Satisfiable; carries the values the caller asked to read back.
    Sat(Model),
    Unsat,
    /// The solver gave up; carries its reason.
    Unknown(String),
}

impl SatAnswer {
    pub fn is_sat(&self) -> bool {
        matches!(self, SatAnswer::Sat(_))
    }
}

/// Values of some free constants in a satisfying assignment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub values: BTreeMap<String, ModelValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelValue {
    Int(i64),
    Bool(bool),
}

impl ModelValue {
    pub fn sort(&self) -> SmtSort {
        match self {
            ModelValue::Int(_) => SmtSort::Int,
            ModelValue::Bool(_) => SmtSort::Bool,
        }
    }

    /// The literal denoting this value.
    pub fn to_term(&self) -> SmtTerm {
        match self {
            ModelValue::Int(n) => SmtTerm::int(*n),
            ModelValue::Bool(b) => SmtTerm::bool(*b),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ModelValue::Int(n) => Some(*n),
            ModelValue::Bool(_) => None,
        }
    }
}

impl std::fmt::Display for ModelValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelValue::Int(n) => write!(f, "{n}"),
            ModelValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl Model {
    pub fn insert(&mut self, name: impl Into<String>, value: ModelValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<ModelValue> {
        self.values.get(name).copied()
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|v| v.as_int())
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            ModelValue::Bool(b) => Some(b),
            ModelValue::Int(_) => None,
        }
    }
}

impl<S: Into<String>> FromIterator<(S, ModelValue)> for Model {
    fn from_iter<I: IntoIterator<Item = (S, ModelValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (name, value) in &self.values {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{name} = {value}")?;
        }
        Ok(())
    }
}

/// A backend that decides satisfiability of quantified Bool terms over
/// declared Int and Bool constants.
pub trait SmtSolver {
    type Error: std::error::Error;

    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Declare a free constant. Redeclaring a name under another sort fails.
    fn declare(&mut self, var: &Var) -> Result<(), Self::Error>;

    /// Assert a Bool term; quantifiers are allowed.
    fn assert(&mut self, term: &SmtTerm) -> Result<(), Self::Error>;

    /// Check the assertions so far. On `Sat` the model holds every
    /// declared constant of `read_back` the solver assigned.
    fn check(&mut self, read_back: &[Var]) -> Result<SatAnswer, Self::Error>;

    /// Forget every assertion and declaration.
    fn reset(&mut self) -> Result<(), Self::Error>;

    /// Decide `term` from a clean state with `vars` declared, reading all of
    /// them back on `Sat`.
    fn solve(&mut self, vars: &[Var], term: &SmtTerm) -> Result<SatAnswer, Self::Error> {
        self.reset()?;
        for var in vars {
            self.declare(var)?;
        }
        self.assert(term)?;
        self.check(vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Records what it is told and answers with a fixed result.
    struct Recorder {
        answer: SatAnswer,
        declared: Vec<Var>,
        asserted: Vec<SmtTerm>,
        resets: usize,
    }

    impl Recorder {
        fn new(answer: SatAnswer) -> Self {
            Self {
                answer,
                declared: Vec::new(),
                asserted: Vec::new(),
                resets: 0,
            }
        }
    }

    impl SmtSolver for Recorder {
        type Error = io::Error;

        fn name(&self) -> &'static str {
            "recorder"
        }

        fn declare(&mut self, var: &Var) -> Result<(), io::Error> {
            self.declared.push(var.clone());
            Ok(())
        }

        fn assert(&mut self, term: &SmtTerm) -> Result<(), io::Error> {
            self.asserted.push(term.clone());
            Ok(())
        }

        fn check(&mut self, _read_back: &[Var]) -> Result<SatAnswer, io::Error> {
            Ok(self.answer.clone())
        }

        fn reset(&mut self) -> Result<(), io::Error> {
            self.resets += 1;
            self.declared.clear();
            self.asserted.clear();
            Ok(())
        }
    }

    #[test]
    fn model_getters_are_typed() {
        let model: Model = [("x", ModelValue::Int(42)), ("flag", ModelValue::Bool(true))]
            .into_iter()
            .collect();
        assert_eq!(model.get_int("x"), Some(42));
        assert_eq!(model.get_bool("flag"), Some(true));
        assert_eq!(model.get_int("flag"), None);
        assert_eq!(model.get_bool("x"), None);
        assert_eq!(model.get("missing"), None);
        assert_eq!(model.to_string(), "flag = true, x = 42");
    }

    #[test]
    fn values_map_to_literals() {
        assert_eq!(ModelValue::Int(-3).to_term(), SmtTerm::int(-3));
        assert_eq!(ModelValue::Bool(false).to_term(), SmtTerm::bool(false));
        assert_eq!(ModelValue::Bool(true).sort(), SmtSort::Bool);
    }

    #[test]
    fn solve_starts_from_a_clean_state() -> Result<(), io::Error> {
        let mut solver = Recorder::new(SatAnswer::Unsat);
        solver.assert(&SmtTerm::bool(false))?;
        let vars = [Var::int("x"), Var::boolean("p")];
        let answer = solver.solve(&vars, &SmtTerm::var("p"))?;
        assert_eq!(answer, SatAnswer::Unsat);
        assert_eq!(solver.resets, 1);
        assert_eq!(solver.declared, vars);
        assert_eq!(solver.asserted, vec![SmtTerm::var("p")]);
        Ok(())
    }
}
