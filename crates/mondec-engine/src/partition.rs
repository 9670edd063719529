//! Equivalence classes accumulated by the generic search.

use mondec_smt::formula::Var;
use mondec_smt::solver::ModelValue;
use mondec_smt::terms::SmtTerm;

use crate::relation::Relation;

/// One class of the distinguished variable's domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquivalenceClass {
    pub representative: ModelValue,
    /// Every value placed in this class, representative first.
    pub members: Vec<ModelValue>,
}

/// Classes of one variable, in creation order.
///
/// Each recorded value lives in exactly one class, and no two
/// representatives are interchangeable. The search establishes the second
/// property with the oracle before it calls [`Partition::open_class`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    var: Var,
    classes: Vec<EquivalenceClass>,
}

impl Partition {
    pub fn new(var: Var) -> Self {
        Self {
            var,
            classes: Vec::new(),
        }
    }

    pub fn var(&self) -> &Var {
        &self.var
    }

    pub fn classes(&self) -> &[EquivalenceClass] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn representatives(&self) -> Vec<ModelValue> {
        self.classes.iter().map(|c| c.representative).collect()
    }

    /// Index of the class already holding `value`.
    pub fn class_of(&self, value: &ModelValue) -> Option<usize> {
        self.classes
            .iter()
            .position(|c| c.members.contains(value))
    }

    pub fn contains(&self, value: &ModelValue) -> bool {
        self.class_of(value).is_some()
    }

    pub(crate) fn open_class(&mut self, value: ModelValue) -> usize {
        self.classes.push(EquivalenceClass {
            representative: value,
            members: vec![value],
        });
        self.classes.len() - 1
    }

    pub(crate) fn join(&mut self, class: usize, value: ModelValue) {
        if let Some(c) = self.classes.get_mut(class) {
            if !c.members.contains(&value) {
                c.members.push(value);
            }
        }
    }

    /// `v ~ repᵢ`: the unary predicate of class `i`.
    pub fn membership_term(&self, relation: &Relation, class: usize) -> Option<SmtTerm> {
        let class = self.classes.get(class)?;
        Some(relation.interchangeable(&self.var.term(), &class.representative.to_term()))
    }

    /// `⋁ᵢ v ~ repᵢ`; valid exactly when the partition covers the domain.
    pub fn coverage_term(&self, relation: &Relation) -> SmtTerm {
        SmtTerm::or(
            (0..self.classes.len())
                .filter_map(|i| self.membership_term(relation, i))
                .collect(),
        )
    }

    /// `⋁ᵢ (v ~ repᵢ) ∧ φ[v := repᵢ]`, equivalent to `φ` once the partition
    /// covers the domain.
    pub fn decomposition_term(&self, relation: &Relation) -> SmtTerm {
        SmtTerm::or(
            self.classes
                .iter()
                .enumerate()
                .filter_map(|(i, class)| {
                    let guard = self.membership_term(relation, i)?;
                    Some(SmtTerm::and(vec![
                        guard,
                        relation.at(&class.representative.to_term()),
                    ]))
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mondec_smt::formula::Formula;

    fn relation() -> Relation {
        let phi = Formula::infer(SmtTerm::and(vec![
            SmtTerm::var("x").ge(SmtTerm::int(0)),
            SmtTerm::var("y").lt(SmtTerm::int(3)),
        ]))
        .unwrap();
        Relation::new(phi, Var::int("x")).unwrap()
    }

    #[test]
    fn values_land_in_one_class() {
        let mut p = Partition::new(Var::int("x"));
        let a = p.open_class(ModelValue::Int(0));
        p.join(a, ModelValue::Int(7));
        p.join(a, ModelValue::Int(7));
        let b = p.open_class(ModelValue::Int(-1));
        assert_eq!(p.len(), 2);
        assert_eq!(p.class_of(&ModelValue::Int(7)), Some(a));
        assert_eq!(p.class_of(&ModelValue::Int(-1)), Some(b));
        assert_eq!(p.classes()[a].members.len(), 2);
        assert!(!p.contains(&ModelValue::Int(3)));
        assert_eq!(
            p.representatives(),
            vec![ModelValue::Int(0), ModelValue::Int(-1)]
        );
    }

    #[test]
    fn empty_partition_covers_nothing() {
        let p = Partition::new(Var::int("x"));
        assert_eq!(p.coverage_term(&relation()), SmtTerm::or(Vec::new()));
    }

    #[test]
    fn coverage_term_is_unary() {
        let rel = relation();
        let mut p = Partition::new(Var::int("x"));
        p.open_class(ModelValue::Int(0));
        p.open_class(ModelValue::Int(-1));
        let names: Vec<String> = p.coverage_term(&rel).free_vars().into_iter().collect();
        assert_eq!(names, vec!["x".to_string()]);
        let names: Vec<String> = p
            .decomposition_term(&rel)
            .free_vars()
            .into_iter()
            .collect();
        assert_eq!(names, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn membership_of_missing_class_is_none() {
        let p = Partition::new(Var::int("x"));
        assert!(p.membership_term(&relation(), 0).is_none());
    }
}
