//! Decision procedure for monadic decomposability in linear integer arithmetic.
//!
//! For a quantifier-free Presburger formula `φ` and an integer variable `x`,
//! the interchangeability relation has finite index exactly when, for some
//! modulus `M` derived from `φ`, every residue class modulo `M` becomes a
//! single class far enough above and far enough below zero. Each of the
//! `2M` residue/side pairs is one satisfiability query with a free
//! threshold `B`:
//!
//! ```text
//! ∀x₁ x₂ ȳ. (x₁ > B ∧ x₂ > B ∧ x₁ ≡ r ∧ x₂ ≡ r (mod M)) → (φ[x₁] ↔ φ[x₂])
//! ```
//!
//! and the symmetric query with `x₁, x₂ < -B`. The check is sound for any
//! positive `M` and complete for multiples of the formula's period, so the
//! procedure always terminates after at most `2M` queries.

pub mod linear;
pub mod profile;

use mondec_smt::formula::{fresh_name_avoiding, Formula, Var};
use mondec_smt::sorts::SmtSort;
use mondec_smt::terms::SmtTerm;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::congruence::lcm;
use crate::error::MondecError;
use crate::oracle::{Oracle, Satisfiability};

pub use linear::{required_modulus, LinearAnalysis, LinearForm};
pub use profile::{ClassKey, ResidueProfile, Side};

/// Outcome of the residue-class check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PresburgerVerdict {
    Decomposable(ResidueProfile),
    /// No threshold makes this residue class uniform on this side.
    NotDecomposable { residue: i64, side: Side },
    Inconclusive(String),
}

impl PresburgerVerdict {
    pub fn is_decomposable(&self) -> bool {
        matches!(self, PresburgerVerdict::Decomposable(_))
    }
}

/// Outcome of the modulus-free finite-index check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FiniteIndexVerdict {
    /// Every value is interchangeable with some value in `[-bound, bound]`.
    Decomposable { bound: i64 },
    NotDecomposable,
    Inconclusive(String),
}

impl FiniteIndexVerdict {
    pub fn is_decomposable(&self) -> bool {
        matches!(self, FiniteIndexVerdict::Decomposable { .. })
    }
}

pub struct PresburgerProcedure<O: Oracle> {
    oracle: O,
}

impl<O: Oracle> PresburgerProcedure<O> {
    pub fn new(oracle: O) -> Self {
        Self { oracle }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn into_oracle(self) -> O {
        self.oracle
    }

    /// Decide with the modulus derived from `phi`.
    pub fn decomposable(&mut self, phi: &Formula, v: &Var) -> Result<PresburgerVerdict, MondecError> {
        let modulus = validate(phi, v)?;
        self.check_with_modulus(phi, v, modulus)
    }

    /// Decide with a caller-supplied bound, which must cover the derived
    /// modulus. The check runs with `lcm(bound, M)`.
    pub fn decomposable_with_bound(
        &mut self,
        phi: &Formula,
        v: &Var,
        bound: i64,
    ) -> Result<PresburgerVerdict, MondecError> {
        if bound <= 0 {
            return Err(MondecError::NonPositiveBound(bound));
        }
        let required = validate(phi, v)?;
        if bound < required {
            return Err(MondecError::BoundTooSmall {
                required,
                supplied: bound,
            });
        }
        let modulus = lcm(bound, required).ok_or_else(|| {
            MondecError::InvalidArgument(format!(
                "lcm of bound {bound} and modulus {required} does not fit in 64 bits"
            ))
        })?;
        self.check_with_modulus(phi, v, modulus)
    }

    /// Decide finite index directly, without a modulus:
    /// `∃B ∀x ∃x'. -B ≤ x' ≤ B ∧ ∀ȳ. φ[x] ↔ φ[x']`.
    pub fn decomposable_by_finite_index(
        &mut self,
        phi: &Formula,
        v: &Var,
    ) -> Result<FiniteIndexVerdict, MondecError> {
        validate(phi, v)?;
        let names = phi.term().names();
        let taken = |n: &str| names.contains(n) || phi.var(n).is_some();
        let twin = fresh_name_avoiding(&v.name, taken);
        let bound = fresh_name_avoiding("B", |n| taken(n) || n == twin);
        let b = SmtTerm::var(bound.clone());
        let twin_term = SmtTerm::var(twin.clone());

        let same = SmtTerm::forall(
            phi.other_bindings(v),
            phi.term()
                .clone()
                .iff(phi.term().substitute(&v.name, &twin_term)),
        );
        let in_window = SmtTerm::and(vec![
            b.clone().neg().le(twin_term.clone()),
            twin_term.le(b),
        ]);
        let body = SmtTerm::forall(
            vec![(v.name.clone(), SmtSort::Int)],
            SmtTerm::exists(
                vec![(twin, SmtSort::Int)],
                SmtTerm::and(vec![in_window, same]),
            ),
        );
        let query = Formula::new(body, vec![Var::int(bound.clone())])?;
        let verdict = match self.oracle.check_satisfiability(&query)? {
            Satisfiability::Sat(model) => FiniteIndexVerdict::Decomposable {
                bound: model.get_int(&bound).ok_or_else(|| missing_witness(&bound))?,
            },
            Satisfiability::Unsat => FiniteIndexVerdict::NotDecomposable,
            Satisfiability::Unknown(reason) => {
                warn!(var = %v, %reason, "presburger: finite-index query unknown");
                FiniteIndexVerdict::Inconclusive(reason)
            }
        };
        info!(var = %v, decomposable = verdict.is_decomposable(), "presburger: finite index");
        Ok(verdict)
    }

    fn check_with_modulus(
        &mut self,
        phi: &Formula,
        v: &Var,
        modulus: i64,
    ) -> Result<PresburgerVerdict, MondecError> {
        let queries = ResidueQueries::new(phi, v, modulus);
        let mut threshold = 0i64;
        let mut unknown: Option<String> = None;
        for r in 0..modulus {
            for side in [Side::Above, Side::Below] {
                let query = queries.build(r, side)?;
                debug!(var = %v, residue = r, %side, modulus, "presburger: residue query");
                match self.oracle.check_satisfiability(&query)? {
                    Satisfiability::Sat(model) => {
                        let witness = model
                            .get_int(&queries.bound)
                            .ok_or_else(|| missing_witness(&queries.bound))?;
                        threshold = threshold.max(witness);
                    }
                    Satisfiability::Unsat => {
                        info!(var = %v, residue = r, %side, modulus, "presburger: not decomposable");
                        return Ok(PresburgerVerdict::NotDecomposable { residue: r, side });
                    }
                    Satisfiability::Unknown(reason) => {
                        warn!(var = %v, residue = r, %side, %reason, "presburger: query unknown");
                        unknown.get_or_insert(reason);
                    }
                }
            }
        }
        if let Some(reason) = unknown {
            return Ok(PresburgerVerdict::Inconclusive(reason));
        }
        info!(var = %v, modulus, threshold, "presburger: decomposable");
        Ok(PresburgerVerdict::Decomposable(ResidueProfile { modulus, threshold }))
    }
}

/// Check `v` and `phi`, returning the derived modulus.
fn validate(phi: &Formula, v: &Var) -> Result<i64, MondecError> {
    if v.sort != SmtSort::Int {
        return Err(MondecError::InvalidArgument(format!(
            "`{v}` has sort {}, the Presburger procedure needs Int",
            v.sort
        )));
    }
    if !phi.mentions(v) {
        return Err(MondecError::VariableNotFree(v.name.clone()));
    }
    required_modulus(phi, v)
}

fn missing_witness(name: &str) -> MondecError {
    MondecError::Solver(format!("model has no value for threshold `{name}`"))
}

/// Fresh names and shared pieces of the `2M` residue queries.
struct ResidueQueries<'a> {
    phi: &'a Formula,
    v: &'a Var,
    modulus: i64,
    left: String,
    right: String,
    bound: String,
}

impl<'a> ResidueQueries<'a> {
    fn new(phi: &'a Formula, v: &'a Var, modulus: i64) -> Self {
        let names = phi.term().names();
        let taken = |n: &str| names.contains(n) || phi.var(n).is_some();
        let left = fresh_name_avoiding(&v.name, taken);
        let right = fresh_name_avoiding(&v.name, |n| taken(n) || n == left);
        let bound = fresh_name_avoiding("B", |n| taken(n) || n == left || n == right);
        Self {
            phi,
            v,
            modulus,
            left,
            right,
            bound,
        }
    }

    fn build(&self, residue: i64, side: Side) -> Result<Formula, MondecError> {
        let b = SmtTerm::var(self.bound.clone());
        let mut guard = Vec::new();
        for name in [&self.left, &self.right] {
            let x = SmtTerm::var(name.clone());
            guard.push(match side {
                Side::Above => x.clone().gt(b.clone()),
                Side::Below => x.clone().lt(b.clone().neg()),
            });
            if self.modulus > 1 {
                guard.push(SmtTerm::congruent(x, SmtTerm::int(residue), self.modulus));
            }
        }
        let at = |name: &str| {
            self.phi
                .term()
                .substitute(&self.v.name, &SmtTerm::var(name.to_string()))
        };
        let mut bindings = vec![
            (self.left.clone(), SmtSort::Int),
            (self.right.clone(), SmtSort::Int),
        ];
        bindings.extend(self.phi.other_bindings(self.v));
        let body = SmtTerm::and(guard).implies(at(&self.left).iff(at(&self.right)));
        Ok(Formula::new(
            SmtTerm::forall(bindings, body),
            vec![Var::int(self.bound.clone())],
        )?)
    }
}

/// [`PresburgerProcedure::decomposable`] with a one-off procedure.
pub fn decomposable<O: Oracle>(
    oracle: O,
    phi: &Formula,
    v: &Var,
) -> Result<PresburgerVerdict, MondecError> {
    PresburgerProcedure::new(oracle).decomposable(phi, v)
}

/// [`PresburgerProcedure::decomposable_with_bound`] with a one-off procedure.
pub fn decomposable_with_bound<O: Oracle>(
    oracle: O,
    phi: &Formula,
    v: &Var,
    bound: i64,
) -> Result<PresburgerVerdict, MondecError> {
    PresburgerProcedure::new(oracle).decomposable_with_bound(phi, v, bound)
}

/// [`PresburgerProcedure::decomposable_by_finite_index`] with a one-off procedure.
pub fn decomposable_by_finite_index<O: Oracle>(
    oracle: O,
    phi: &Formula,
    v: &Var,
) -> Result<FiniteIndexVerdict, MondecError> {
    PresburgerProcedure::new(oracle).decomposable_by_finite_index(phi, v)
}
