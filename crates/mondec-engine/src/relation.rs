//! A formula viewed as a relation between one variable and the rest.

use mondec_smt::formula::{Formula, Var};
use mondec_smt::solver::ModelValue;
use mondec_smt::terms::SmtTerm;

use crate::error::MondecError;

#[derive(Debug, Clone)]
pub struct Relation {
    formula: Formula,
    var: Var,
    others: Vec<Var>,
}

impl Relation {
    /// The relation of `formula` between `var` and every other declared variable.
    pub fn new(formula: Formula, var: Var) -> Result<Self, MondecError> {
        if !formula.declares(&var) {
            return Err(MondecError::VariableNotFree(var.name));
        }
        let others = formula.others(&var);
        Ok(Self {
            formula,
            var,
            others,
        })
    }

    /// `variables[0]` is distinguished; declared variables missing from
    /// `variables` still count among the others.
    pub fn from_variables(formula: Formula, variables: &[Var]) -> Result<Self, MondecError> {
        let (var, rest) = variables.split_first().ok_or_else(|| {
            MondecError::InvalidArgument("at least one variable is required".into())
        })?;
        if let Some(stray) = rest.iter().find(|v| !formula.declares(v)) {
            return Err(MondecError::VariableNotFree(stray.name.clone()));
        }
        Self::new(formula, var.clone())
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn var(&self) -> &Var {
        &self.var
    }

    pub fn others(&self) -> &[Var] {
        &self.others
    }

    /// `φ[v := term]` as a bare term.
    pub fn at(&self, term: &SmtTerm) -> SmtTerm {
        self.formula.term().substitute(&self.var.name, term)
    }

    /// `φ[v := value]`, a formula over the other variables.
    pub fn instantiate(&self, value: &ModelValue) -> Result<Formula, MondecError> {
        self.check_sort(value)?;
        Ok(self.formula.instantiate(&self.var, &value.to_term())?)
    }

    /// `∀ others. φ[a] ↔ φ[b]`.
    pub fn interchangeable(&self, a: &SmtTerm, b: &SmtTerm) -> SmtTerm {
        let bindings = self.others.iter().map(Var::binding).collect();
        SmtTerm::forall(bindings, self.at(a).iff(self.at(b)))
    }

    /// Validity query for `a ~ b`, leaving the other variables free.
    pub fn interchangeability_query(
        &self,
        a: &ModelValue,
        b: &ModelValue,
    ) -> Result<Formula, MondecError> {
        self.check_sort(a)?;
        self.check_sort(b)?;
        let body = self.at(&a.to_term()).iff(self.at(&b.to_term()));
        Ok(Formula::new(body, self.others.clone())?)
    }

    fn check_sort(&self, value: &ModelValue) -> Result<(), MondecError> {
        if value.sort() != self.var.sort {
            return Err(MondecError::InvalidArgument(format!(
                "value {value} has sort {}, but `{}` is {}",
                value.sort(),
                self.var,
                self.var.sort
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn x() -> SmtTerm {
        SmtTerm::var("x")
    }

    fn y() -> SmtTerm {
        SmtTerm::var("y")
    }

    fn x_le_y() -> Formula {
        Formula::infer(x().le(y())).unwrap()
    }

    #[test]
    fn others_exclude_the_distinguished_variable() -> TestResult {
        let rel = Relation::new(x_le_y(), Var::int("y"))?;
        assert_eq!(rel.others(), &[Var::int("x")]);
        Ok(())
    }

    #[test]
    fn undeclared_variable_is_rejected() {
        let err = Relation::new(x_le_y(), Var::int("z")).unwrap_err();
        assert!(matches!(err, MondecError::VariableNotFree(name) if name == "z"));
    }

    #[test]
    fn empty_variable_list_is_rejected() {
        assert!(matches!(
            Relation::from_variables(x_le_y(), &[]),
            Err(MondecError::InvalidArgument(_))
        ));
    }

    #[test]
    fn interchangeable_binds_the_others() -> TestResult {
        let rel = Relation::new(x_le_y(), Var::int("x"))?;
        let term = rel.interchangeable(&SmtTerm::int(1), &SmtTerm::int(2));
        assert!(term.free_vars().is_empty());
        assert!(term.has_quantifier());
        Ok(())
    }

    #[test]
    fn instantiate_checks_the_sort() -> TestResult {
        let rel = Relation::new(x_le_y(), Var::int("x"))?;
        let phi = rel.instantiate(&ModelValue::Int(3))?;
        assert_eq!(phi.free_vars(), &[Var::int("y")]);
        assert!(matches!(
            rel.instantiate(&ModelValue::Bool(true)),
            Err(MondecError::InvalidArgument(_))
        ));
        Ok(())
    }

    #[test]
    fn interchangeability_query_is_over_the_others() -> TestResult {
        let rel = Relation::new(x_le_y(), Var::int("x"))?;
        let query = rel.interchangeability_query(&ModelValue::Int(0), &ModelValue::Int(5))?;
        assert_eq!(query.free_vars(), &[Var::int("y")]);
        assert!(!query.term().mentions("x"));
        Ok(())
    }
}
