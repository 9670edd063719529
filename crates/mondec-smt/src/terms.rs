use std::collections::BTreeSet;

use crate::sorts::SmtSort;

/// Terms over linear integer arithmetic with Bool connectives and quantifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SmtTerm {
    Var(String),
    IntLit(i64),
    BoolLit(bool),

    Add(Box<SmtTerm>, Box<SmtTerm>),
    Sub(Box<SmtTerm>, Box<SmtTerm>),
    Mul(Box<SmtTerm>, Box<SmtTerm>),
    Neg(Box<SmtTerm>),
    /// Euclidean remainder, always in `[0, |divisor|)`.
    Mod(Box<SmtTerm>, Box<SmtTerm>),

    Eq(Box<SmtTerm>, Box<SmtTerm>),
    Lt(Box<SmtTerm>, Box<SmtTerm>),
    Le(Box<SmtTerm>, Box<SmtTerm>),
    Gt(Box<SmtTerm>, Box<SmtTerm>),
    Ge(Box<SmtTerm>, Box<SmtTerm>),

    And(Vec<SmtTerm>),
    Or(Vec<SmtTerm>),
    Not(Box<SmtTerm>),
    Implies(Box<SmtTerm>, Box<SmtTerm>),
    Ite(Box<SmtTerm>, Box<SmtTerm>, Box<SmtTerm>),

    ForAll(Vec<(String, SmtSort)>, Box<SmtTerm>),
    Exists(Vec<(String, SmtSort)>, Box<SmtTerm>),
}

/// `self OP other` builders, one per binary variant.
macro_rules! binary_builders {
    ($($method:ident => $variant:ident),* $(,)?) => {
        $(
            pub fn $method(self, other: SmtTerm) -> Self {
                SmtTerm::$variant(Box::new(self), Box::new(other))
            }
        )*
    };
}

#[allow(clippy::should_implement_trait)]
impl SmtTerm {
    pub fn var(name: impl Into<String>) -> Self {
        SmtTerm::Var(name.into())
    }

    pub fn int(n: i64) -> Self {
        SmtTerm::IntLit(n)
    }

    pub fn bool(b: bool) -> Self {
        SmtTerm::BoolLit(b)
    }

    binary_builders! {
        add => Add,
        sub => Sub,
        mul => Mul,
        modulo => Mod,
        eq => Eq,
        lt => Lt,
        le => Le,
        gt => Gt,
        ge => Ge,
        implies => Implies,
    }

    pub fn neg(self) -> Self {
        SmtTerm::Neg(Box::new(self))
    }

    pub fn not(self) -> Self {
        SmtTerm::Not(Box::new(self))
    }

    pub fn and(conjuncts: Vec<SmtTerm>) -> Self {
        SmtTerm::And(conjuncts)
    }

    pub fn or(disjuncts: Vec<SmtTerm>) -> Self {
        SmtTerm::Or(disjuncts)
    }

    /// Boolean equivalence, encoded as `=` over two `Bool` terms.
    pub fn iff(self, other: SmtTerm) -> Self {
        self.eq(other)
    }

    pub fn ite(cond: SmtTerm, then: SmtTerm, els: SmtTerm) -> Self {
        SmtTerm::Ite(Box::new(cond), Box::new(then), Box::new(els))
    }

    /// Universal closure over `bindings`; an empty binding list returns `body` unchanged.
    pub fn forall(bindings: Vec<(String, SmtSort)>, body: SmtTerm) -> Self {
        if bindings.is_empty() {
            body
        } else {
            SmtTerm::ForAll(bindings, Box::new(body))
        }
    }

    /// Existential closure over `bindings`; an empty binding list returns `body` unchanged.
    pub fn exists(bindings: Vec<(String, SmtSort)>, body: SmtTerm) -> Self {
        if bindings.is_empty() {
            body
        } else {
            SmtTerm::Exists(bindings, Box::new(body))
        }
    }

    /// `a ≡ b (mod m)`, encoded as `(a - b) mod m = 0`.
    pub fn congruent(a: SmtTerm, b: SmtTerm, m: i64) -> Self {
        a.sub(b).modulo(SmtTerm::int(m)).eq(SmtTerm::int(0))
    }

    /// Names occurring free in this term.
    pub fn free_vars(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let mut bound = Vec::new();
        self.collect_free(&mut bound, &mut out);
        out
    }

    /// Whether `name` occurs free in this term.
    pub fn mentions(&self, name: &str) -> bool {
        self.free_vars().contains(name)
    }

    /// Every name in the term, free or bound.
    pub fn names(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.visit(&mut |t| match t {
            SmtTerm::Var(name) => {
                out.insert(name.clone());
            }
            SmtTerm::ForAll(bindings, _) | SmtTerm::Exists(bindings, _) => {
                out.extend(bindings.iter().map(|(n, _)| n.clone()));
            }
            _ => {}
        });
        out
    }

    /// Whether the term contains a quantifier anywhere.
    pub fn has_quantifier(&self) -> bool {
        let mut found = false;
        self.visit(&mut |t| {
            if matches!(t, SmtTerm::ForAll(..) | SmtTerm::Exists(..)) {
                found = true;
            }
        });
        found
    }

    /// Replace free occurrences of `name` by `replacement`.
    ///
    /// Binders that rebind `name` shadow it. The replacement is inserted as-is,
    /// so callers substituting open terms must pick names that no binder in
    /// `self` captures (see [`crate::formula::Formula::fresh_name`]).
    pub fn substitute(&self, name: &str, replacement: &SmtTerm) -> SmtTerm {
        match self {
            SmtTerm::Var(n) if n == name => replacement.clone(),
            SmtTerm::ForAll(bindings, _) | SmtTerm::Exists(bindings, _)
                if bindings.iter().any(|(n, _)| n == name) =>
            {
                self.clone()
            }
            _ => self.map_children(|child| child.substitute(name, replacement)),
        }
    }

    /// Rebuild this node with `f` applied to each immediate subterm.
    pub fn map_children(&self, mut f: impl FnMut(&SmtTerm) -> SmtTerm) -> SmtTerm {
        let mut bx = |t: &SmtTerm| Box::new(f(t));
        match self {
            SmtTerm::Var(_) | SmtTerm::IntLit(_) | SmtTerm::BoolLit(_) => self.clone(),
            SmtTerm::Add(l, r) => SmtTerm::Add(bx(l), bx(r)),
            SmtTerm::Sub(l, r) => SmtTerm::Sub(bx(l), bx(r)),
            SmtTerm::Mul(l, r) => SmtTerm::Mul(bx(l), bx(r)),
            SmtTerm::Mod(l, r) => SmtTerm::Mod(bx(l), bx(r)),
            SmtTerm::Eq(l, r) => SmtTerm::Eq(bx(l), bx(r)),
            SmtTerm::Lt(l, r) => SmtTerm::Lt(bx(l), bx(r)),
            SmtTerm::Le(l, r) => SmtTerm::Le(bx(l), bx(r)),
            SmtTerm::Gt(l, r) => SmtTerm::Gt(bx(l), bx(r)),
            SmtTerm::Ge(l, r) => SmtTerm::Ge(bx(l), bx(r)),
            SmtTerm::Implies(l, r) => SmtTerm::Implies(bx(l), bx(r)),
            SmtTerm::Neg(inner) => SmtTerm::Neg(bx(inner)),
            SmtTerm::Not(inner) => SmtTerm::Not(bx(inner)),
            SmtTerm::Ite(c, t, e) => SmtTerm::Ite(bx(c), bx(t), bx(e)),
            SmtTerm::ForAll(bindings, body) => SmtTerm::ForAll(bindings.clone(), bx(body)),
            SmtTerm::Exists(bindings, body) => SmtTerm::Exists(bindings.clone(), bx(body)),
            SmtTerm::And(terms) => SmtTerm::And(terms.iter().map(|t| *bx(t)).collect()),
            SmtTerm::Or(terms) => SmtTerm::Or(terms.iter().map(|t| *bx(t)).collect()),
        }
    }

    /// Immediate subterms, left to right.
    pub fn children(&self) -> Vec<&SmtTerm> {
        match self {
            SmtTerm::Var(_) | SmtTerm::IntLit(_) | SmtTerm::BoolLit(_) => Vec::new(),
            SmtTerm::Neg(inner) | SmtTerm::Not(inner) => vec![&**inner],
            SmtTerm::ForAll(_, body) | SmtTerm::Exists(_, body) => vec![&**body],
            SmtTerm::Add(l, r)
            | SmtTerm::Sub(l, r)
            | SmtTerm::Mul(l, r)
            | SmtTerm::Mod(l, r)
            | SmtTerm::Eq(l, r)
            | SmtTerm::Lt(l, r)
            | SmtTerm::Le(l, r)
            | SmtTerm::Gt(l, r)
            | SmtTerm::Ge(l, r)
            | SmtTerm::Implies(l, r) => vec![&**l, &**r],
            SmtTerm::And(terms) | SmtTerm::Or(terms) => terms.iter().collect(),
            SmtTerm::Ite(c, t, e) => vec![&**c, &**t, &**e],
        }
    }

    /// Pre-order traversal.
    pub fn visit<F: FnMut(&SmtTerm)>(&self, f: &mut F) {
        f(self);
        for child in self.children() {
            child.visit(f);
        }
    }

    fn collect_free(&self, bound: &mut Vec<String>, out: &mut BTreeSet<String>) {
        match self {
            SmtTerm::Var(name) => {
                if !bound.iter().any(|b| b == name) {
                    out.insert(name.clone());
                }
            }
            SmtTerm::ForAll(bindings, body) | SmtTerm::Exists(bindings, body) => {
                let mark = bound.len();
                bound.extend(bindings.iter().map(|(n, _)| n.clone()));
                body.collect_free(bound, out);
                bound.truncate(mark);
            }
            other => {
                for child in other.children() {
                    child.collect_free(bound, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn free_vars_skip_bound_names() {
        let term = SmtTerm::forall(
            vec![("y".to_string(), SmtSort::Int)],
            SmtTerm::var("x").le(SmtTerm::var("y")),
        );
        let free: Vec<_> = term.free_vars().into_iter().collect();
        assert_eq!(free, vec!["x".to_string()]);
        assert!(term.names().contains("y"));
    }

    #[test]
    fn substitute_respects_shadowing() {
        let inner = SmtTerm::exists(
            vec![("x".to_string(), SmtSort::Int)],
            SmtTerm::var("x").eq(SmtTerm::int(1)),
        );
        let term = SmtTerm::and(vec![SmtTerm::var("x").ge(SmtTerm::int(0)), inner.clone()]);
        let replaced = term.substitute("x", &SmtTerm::int(7));
        assert_eq!(
            replaced,
            SmtTerm::and(vec![SmtTerm::int(7).ge(SmtTerm::int(0)), inner])
        );
    }

    #[test]
    fn congruent_builds_mod_equation() {
        let term = SmtTerm::congruent(SmtTerm::var("x"), SmtTerm::var("y"), 2);
        assert_eq!(
            term,
            SmtTerm::var("x")
                .sub(SmtTerm::var("y"))
                .modulo(SmtTerm::int(2))
                .eq(SmtTerm::int(0))
        );
    }

    #[test]
    fn empty_quantifier_collapses_to_body() {
        let body = SmtTerm::var("p");
        assert_eq!(SmtTerm::forall(Vec::new(), body.clone()), body);
        assert_eq!(SmtTerm::exists(Vec::new(), body.clone()), body);
    }

    proptest! {
        #[test]
        fn substituting_a_literal_removes_the_name(c in -100i64..100, k in 1i64..10) {
            let term = SmtTerm::and(vec![
                SmtTerm::var("x").mul(SmtTerm::int(k)).ge(SmtTerm::var("y")),
                SmtTerm::congruent(SmtTerm::var("x"), SmtTerm::int(c), k),
            ]);
            let replaced = term.substitute("x", &SmtTerm::int(c));
            prop_assert!(!replaced.mentions("x"));
            prop_assert!(replaced.mentions("y"));
        }
    }
}
