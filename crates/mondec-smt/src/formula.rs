//! Formulas with an explicit, ordered set of sorted free variables.

use indexmap::IndexMap;
use thiserror::Error;

use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    #[error("variable `{0}` occurs free but is not declared")]
    Undeclared(String),
    #[error("variable `{0}` is declared twice")]
    DuplicateVariable(String),
    #[error("sort mismatch for `{name}`: used as {found}, declared as {expected}")]
    SortMismatch {
        name: String,
        expected: SmtSort,
        found: SmtSort,
    },
    #[error("formula must be Bool-valued, found an {0} term")]
    NotBoolean(SmtSort),
}

/// A sorted free variable of a formula.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Var {
    pub name: String,
    pub sort: SmtSort,
}

impl Var {
    pub fn new(name: impl Into<String>, sort: SmtSort) -> Self {
        Self {
            name: name.into(),
            sort,
        }
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, SmtSort::Int)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, SmtSort::Bool)
    }

    pub fn term(&self) -> SmtTerm {
        SmtTerm::var(self.name.clone())
    }

    pub fn binding(&self) -> (String, SmtSort) {
        (self.name.clone(), self.sort)
    }
}

impl std::fmt::Display for Var {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// An immutable Bool-valued term together with its declared free variables.
///
/// Every free name of the term is declared; declared variables need not occur.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    term: SmtTerm,
    vars: Vec<Var>,
}

impl Formula {
    pub fn new(term: SmtTerm, vars: Vec<Var>) -> Result<Self, FormulaError> {
        let mut declared: IndexMap<String, SmtSort> = IndexMap::new();
        for var in &vars {
            if declared.insert(var.name.clone(), var.sort).is_some() {
                return Err(FormulaError::DuplicateVariable(var.name.clone()));
            }
        }
        for name in term.free_vars() {
            if !declared.contains_key(&name) {
                return Err(FormulaError::Undeclared(name));
            }
        }
        infer_sorts(&term, declared.clone())?;
        if let Some(SmtSort::Int) = surface_sort(&term, &declared) {
            return Err(FormulaError::NotBoolean(SmtSort::Int));
        }
        Ok(Self { term, vars })
    }

    /// Build a formula whose declared variables are the free variables of
    /// `term`, in order of first occurrence, sorted from how they are used.
    /// Variables whose use does not fix a sort default to `Int`.
    pub fn infer(term: SmtTerm) -> Result<Self, FormulaError> {
        let mut sorts = infer_sorts(&term, SortTable::new())?;
        let free = term.free_vars();
        for name in &free {
            sorts.entry(name.clone()).or_insert(SmtSort::Int);
        }
        let vars = sorts
            .iter()
            .filter(|(name, _)| free.contains(*name))
            .map(|(name, sort)| Var::new(name.clone(), *sort))
            .collect();
        Self::new(term, vars)
    }

    pub fn term(&self) -> &SmtTerm {
        &self.term
    }

    pub fn free_vars(&self) -> &[Var] {
        &self.vars
    }

    pub fn var(&self, name: &str) -> Option<&Var> {
        self.vars.iter().find(|v| v.name == name)
    }

    /// Whether `var` is declared with the same sort.
    pub fn declares(&self, var: &Var) -> bool {
        self.vars.iter().any(|v| v == var)
    }

    /// Whether `var` actually occurs free in the term.
    pub fn mentions(&self, var: &Var) -> bool {
        self.declares(var) && self.term.mentions(&var.name)
    }

    /// Variables other than `var`, in declaration order.
    pub fn others(&self, var: &Var) -> Vec<Var> {
        self.vars.iter().filter(|v| *v != var).cloned().collect()
    }

    /// Replace `var` by `replacement`.
    ///
    /// `var` is dropped from the declarations and the free variables of
    /// `replacement` are added; a fresh symbol therefore stays free.
    pub fn instantiate(&self, var: &Var, replacement: &SmtTerm) -> Result<Formula, FormulaError> {
        let term = self.term.substitute(&var.name, replacement);
        let mut vars: Vec<Var> = self.vars.iter().filter(|v| *v != var).cloned().collect();
        for name in replacement.free_vars() {
            if !vars.iter().any(|v| v.name == name) {
                vars.push(Var::new(name, var.sort));
            }
        }
        Formula::new(term, vars)
    }

    /// Rename `var` to a fresh symbol derived from `base`.
    pub fn rename(&self, var: &Var, base: &str) -> Result<(Formula, Var), FormulaError> {
        let fresh = Var::new(self.fresh_name(base), var.sort);
        let renamed = self.instantiate(var, &fresh.term())?;
        Ok((renamed, fresh))
    }

    /// A name that occurs nowhere in the formula, free or bound.
    pub fn fresh_name(&self, base: &str) -> String {
        fresh_name_avoiding(base, |candidate| {
            self.term.names().contains(candidate) || self.vars.iter().any(|v| v.name == candidate)
        })
    }

    /// Bindings for every declared variable except `var`.
    pub fn other_bindings(&self, var: &Var) -> Vec<(String, SmtSort)> {
        self.others(var).iter().map(Var::binding).collect()
    }
}

/// `base!0`, `base!1`, ... : the first candidate for which `taken` is false.
pub fn fresh_name_avoiding(base: &str, taken: impl Fn(&str) -> bool) -> String {
    let mut idx = 0usize;
    loop {
        let candidate = format!("{base}!{idx}");
        if !taken(&candidate) {
            return candidate;
        }
        idx += 1;
    }
}

type SortTable = IndexMap<String, SmtSort>;

/// Sorts of free names as fixed by their uses, starting from `table`.
/// Names whose uses do not fix a sort are absent from the result.
fn infer_sorts(term: &SmtTerm, mut table: SortTable) -> Result<SortTable, FormulaError> {
    let mut scopes: Vec<Vec<(String, SmtSort)>> = Vec::new();
    infer(term, Some(SmtSort::Bool), &mut table, &mut scopes)?;
    Ok(table)
}

fn bound_sort(scopes: &[Vec<(String, SmtSort)>], name: &str) -> Option<SmtSort> {
    scopes
        .iter()
        .rev()
        .flat_map(|s| s.iter().rev())
        .find(|(n, _)| n == name)
        .map(|(_, s)| *s)
}

fn record(
    name: &str,
    sort: SmtSort,
    table: &mut SortTable,
    scopes: &[Vec<(String, SmtSort)>],
) -> Result<(), FormulaError> {
    if let Some(bound) = bound_sort(scopes, name) {
        if bound != sort {
            return Err(FormulaError::SortMismatch {
                name: name.to_string(),
                expected: bound,
                found: sort,
            });
        }
        return Ok(());
    }
    match table.get(name) {
        Some(existing) if *existing != sort => Err(FormulaError::SortMismatch {
            name: name.to_string(),
            expected: *existing,
            found: sort,
        }),
        Some(_) => Ok(()),
        None => {
            table.insert(name.to_string(), sort);
            Ok(())
        }
    }
}

/// Sort of a term when it can be read off syntactically.
fn known_sort(
    term: &SmtTerm,
    table: &SortTable,
    scopes: &[Vec<(String, SmtSort)>],
) -> Option<SmtSort> {
    match term {
        SmtTerm::Var(name) => bound_sort(scopes, name).or_else(|| table.get(name).copied()),
        SmtTerm::IntLit(_)
        | SmtTerm::Add(..)
        | SmtTerm::Sub(..)
        | SmtTerm::Mul(..)
        | SmtTerm::Neg(_)
        | SmtTerm::Mod(..) => Some(SmtSort::Int),
        SmtTerm::Ite(_, t, e) => {
            known_sort(t, table, scopes).or_else(|| known_sort(e, table, scopes))
        }
        _ => Some(SmtSort::Bool),
    }
}

fn surface_sort(term: &SmtTerm, declared: &IndexMap<String, SmtSort>) -> Option<SmtSort> {
    known_sort(term, declared, &[])
}

fn infer(
    term: &SmtTerm,
    expected: Option<SmtSort>,
    table: &mut SortTable,
    scopes: &mut Vec<Vec<(String, SmtSort)>>,
) -> Result<(), FormulaError> {
    match term {
        SmtTerm::Var(name) => {
            if let Some(sort) = expected {
                record(name, sort, table, scopes)?;
            }
            Ok(())
        }
        SmtTerm::IntLit(_) | SmtTerm::BoolLit(_) => Ok(()),
        SmtTerm::Add(l, r)
        | SmtTerm::Sub(l, r)
        | SmtTerm::Mul(l, r)
        | SmtTerm::Mod(l, r)
        | SmtTerm::Lt(l, r)
        | SmtTerm::Le(l, r)
        | SmtTerm::Gt(l, r)
        | SmtTerm::Ge(l, r) => {
            infer(l, Some(SmtSort::Int), table, scopes)?;
            infer(r, Some(SmtSort::Int), table, scopes)
        }
        SmtTerm::Neg(inner) => infer(inner, Some(SmtSort::Int), table, scopes),
        SmtTerm::Eq(l, r) => {
            let sort = known_sort(l, table, scopes).or_else(|| known_sort(r, table, scopes));
            infer(l, sort, table, scopes)?;
            infer(r, sort, table, scopes)
        }
        SmtTerm::And(terms) | SmtTerm::Or(terms) => {
            for t in terms {
                infer(t, Some(SmtSort::Bool), table, scopes)?;
            }
            Ok(())
        }
        SmtTerm::Not(inner) => infer(inner, Some(SmtSort::Bool), table, scopes),
        SmtTerm::Implies(l, r) => {
            infer(l, Some(SmtSort::Bool), table, scopes)?;
            infer(r, Some(SmtSort::Bool), table, scopes)
        }
        SmtTerm::ForAll(bindings, body) | SmtTerm::Exists(bindings, body) => {
            scopes.push(bindings.clone());
            let result = infer(body, Some(SmtSort::Bool), table, scopes);
            scopes.pop();
            result
        }
        SmtTerm::Ite(c, t, e) => {
            infer(c, Some(SmtSort::Bool), table, scopes)?;
            let sort = expected
                .or_else(|| known_sort(t, table, scopes))
                .or_else(|| known_sort(e, table, scopes));
            infer(t, sort, table, scopes)?;
            infer(e, sort, table, scopes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> SmtTerm {
        SmtTerm::var("x")
    }

    fn y() -> SmtTerm {
        SmtTerm::var("y")
    }

    #[test]
    fn infer_orders_variables_by_first_occurrence() {
        let phi = SmtTerm::and(vec![
            y().ge(SmtTerm::int(0)),
            x().ge(SmtTerm::int(0)),
            x().eq(y()),
        ]);
        let formula = Formula::infer(phi).unwrap();
        let names: Vec<_> = formula.free_vars().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["y", "x"]);
        assert!(formula.free_vars().iter().all(|v| v.sort == SmtSort::Int));
    }

    #[test]
    fn infer_detects_boolean_variables() {
        let phi = SmtTerm::var("p").implies(x().gt(SmtTerm::int(3)));
        let formula = Formula::infer(phi).unwrap();
        assert_eq!(formula.var("p"), Some(&Var::boolean("p")));
        assert_eq!(formula.var("x"), Some(&Var::int("x")));
    }

    #[test]
    fn new_rejects_undeclared_names() {
        let err = Formula::new(x().ge(y()), vec![Var::int("x")]).unwrap_err();
        assert_eq!(err, FormulaError::Undeclared("y".into()));
    }

    #[test]
    fn new_rejects_sort_mismatch() {
        let err = Formula::new(x().ge(SmtTerm::int(0)), vec![Var::boolean("x")]).unwrap_err();
        assert!(matches!(err, FormulaError::SortMismatch { .. }));
    }

    #[test]
    fn new_rejects_integer_formula() {
        let err = Formula::new(x().add(SmtTerm::int(1)), vec![Var::int("x")]).unwrap_err();
        assert_eq!(err, FormulaError::NotBoolean(SmtSort::Int));
    }

    #[test]
    fn instantiate_drops_the_variable() {
        let formula = Formula::infer(x().le(y())).unwrap();
        let inst = formula.instantiate(&Var::int("x"), &SmtTerm::int(4)).unwrap();
        assert_eq!(inst.free_vars(), &[Var::int("y")]);
        assert_eq!(inst.term(), &SmtTerm::int(4).le(y()));
    }

    #[test]
    fn rename_introduces_a_fresh_free_symbol() {
        let formula = Formula::infer(x().le(y())).unwrap();
        let (renamed, fresh) = formula.rename(&Var::int("x"), "x").unwrap();
        assert_eq!(fresh.name, "x!0");
        assert!(renamed.declares(&fresh));
        assert!(renamed.declares(&Var::int("y")));
        assert!(!renamed.term().mentions("x"));
    }

    #[test]
    fn fresh_name_avoids_bound_names() {
        let phi = SmtTerm::and(vec![
            x().ge(SmtTerm::int(0)),
            SmtTerm::exists(
                vec![("x!0".to_string(), SmtSort::Int)],
                SmtTerm::var("x!0").lt(x()),
            ),
        ]);
        let formula = Formula::infer(phi).unwrap();
        assert_eq!(formula.fresh_name("x"), "x!1");
    }
}
