//! Linear normal form and modulus derivation for Presburger formulas.

use std::collections::{BTreeMap, HashMap};

use mondec_smt::formula::{Formula, Var};
use mondec_smt::sorts::SmtSort;
use mondec_smt::terms::SmtTerm;

use crate::congruence::lcm;
use crate::error::MondecError;

/// `coefficient * (argument mod divisor)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remainder {
    pub coefficient: i64,
    pub argument: LinearForm,
    pub divisor: i64,
}

/// `Σ cᵢ·xᵢ + Σ remainders + constant`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearForm {
    pub coeffs: BTreeMap<String, i64>,
    pub remainders: Vec<Remainder>,
    pub constant: i64,
}

impl LinearForm {
    pub fn constant(value: i64) -> Self {
        Self {
            constant: value,
            ..Self::default()
        }
    }

    pub fn variable(name: &str) -> Self {
        let mut form = Self::default();
        form.coeffs.insert(name.to_string(), 1);
        form
    }

    /// The value of the form when it mentions no variable.
    pub fn as_constant(&self) -> Option<i64> {
        (self.coeffs.values().all(|c| *c == 0) && self.remainders.is_empty())
            .then_some(self.constant)
    }

    pub fn coefficient(&self, name: &str) -> i64 {
        self.coeffs.get(name).copied().unwrap_or(0)
    }

    /// Whether `name` has a non-zero coefficient here or inside a remainder.
    pub fn mentions(&self, name: &str) -> bool {
        self.coefficient(name) != 0 || self.remainders.iter().any(|r| r.argument.mentions(name))
    }

    pub fn add(mut self, other: LinearForm) -> Result<Self, MondecError> {
        for (name, c) in other.coeffs {
            let entry = self.coeffs.entry(name).or_insert(0);
            *entry = entry.checked_add(c).ok_or_else(overflow)?;
        }
        self.remainders.extend(other.remainders);
        self.constant = self.constant.checked_add(other.constant).ok_or_else(overflow)?;
        Ok(self)
    }

    pub fn scale(mut self, k: i64) -> Result<Self, MondecError> {
        for c in self.coeffs.values_mut() {
            *c = c.checked_mul(k).ok_or_else(overflow)?;
        }
        for r in &mut self.remainders {
            r.coefficient = r.coefficient.checked_mul(k).ok_or_else(overflow)?;
        }
        self.constant = self.constant.checked_mul(k).ok_or_else(overflow)?;
        Ok(self)
    }

    /// Normalise an integer-valued term.
    pub fn of(term: &SmtTerm) -> Result<Self, MondecError> {
        match term {
            SmtTerm::Var(name) => Ok(Self::variable(name)),
            SmtTerm::IntLit(n) => Ok(Self::constant(*n)),
            SmtTerm::Add(a, b) => Self::of(a)?.add(Self::of(b)?),
            SmtTerm::Sub(a, b) => Self::of(a)?.add(Self::of(b)?.scale(-1)?),
            SmtTerm::Neg(a) => Self::of(a)?.scale(-1),
            SmtTerm::Mul(a, b) => {
                let (a, b) = (Self::of(a)?, Self::of(b)?);
                match (a.as_constant(), b.as_constant()) {
                    (Some(k), _) => b.scale(k),
                    (_, Some(k)) => a.scale(k),
                    _ => Err(MondecError::OutsideFragment(
                        "product of two non-constant terms".into(),
                    )),
                }
            }
            SmtTerm::Mod(a, b) => {
                let divisor = Self::of(b)?
                    .as_constant()
                    .filter(|d| *d > 0)
                    .ok_or_else(|| {
                        MondecError::OutsideFragment(
                            "mod by something other than a positive constant".into(),
                        )
                    })?;
                Ok(Self {
                    remainders: vec![Remainder {
                        coefficient: 1,
                        argument: Self::of(a)?,
                        divisor,
                    }],
                    ..Self::default()
                })
            }
            SmtTerm::Ite(..) => Err(MondecError::OutsideFragment(
                "integer-valued ite".into(),
            )),
            other => Err(MondecError::OutsideFragment(format!(
                "boolean term in integer position: {other:?}"
            ))),
        }
    }
}

fn overflow() -> MondecError {
    MondecError::InvalidArgument("coefficient overflow".into())
}

/// The linear atoms of a quantifier-free Presburger formula.
#[derive(Debug, Clone, Default)]
pub struct LinearAnalysis {
    /// One `lhs - rhs` form per arithmetic comparison.
    pub atoms: Vec<LinearForm>,
}

impl LinearAnalysis {
    /// Walk `formula`, rejecting anything outside quantifier-free linear
    /// integer arithmetic.
    pub fn of(formula: &Formula) -> Result<Self, MondecError> {
        let sorts: HashMap<&str, SmtSort> = formula
            .free_vars()
            .iter()
            .map(|v| (v.name.as_str(), v.sort))
            .collect();
        let mut analysis = Self::default();
        analysis.walk(formula.term(), &sorts)?;
        Ok(analysis)
    }

    fn walk(&mut self, term: &SmtTerm, sorts: &HashMap<&str, SmtSort>) -> Result<(), MondecError> {
        match term {
            SmtTerm::BoolLit(_) | SmtTerm::Var(_) => Ok(()),
            SmtTerm::And(ts) | SmtTerm::Or(ts) => {
                ts.iter().try_for_each(|t| self.walk(t, sorts))
            }
            SmtTerm::Not(t) => self.walk(t, sorts),
            SmtTerm::Implies(a, b) => {
                self.walk(a, sorts)?;
                self.walk(b, sorts)
            }
            SmtTerm::Ite(c, t, e) => {
                self.walk(c, sorts)?;
                self.walk(t, sorts)?;
                self.walk(e, sorts)
            }
            SmtTerm::Eq(a, b) if is_boolean(a, sorts) => {
                self.walk(a, sorts)?;
                self.walk(b, sorts)
            }
            SmtTerm::Eq(a, b)
            | SmtTerm::Lt(a, b)
            | SmtTerm::Le(a, b)
            | SmtTerm::Gt(a, b)
            | SmtTerm::Ge(a, b) => {
                let form = LinearForm::of(a)?.add(LinearForm::of(b)?.scale(-1)?)?;
                self.atoms.push(form);
                Ok(())
            }
            SmtTerm::ForAll(..) | SmtTerm::Exists(..) => {
                Err(MondecError::OutsideFragment("quantified formula".into()))
            }
            other => Err(MondecError::OutsideFragment(format!(
                "integer term in boolean position: {other:?}"
            ))),
        }
    }

    /// `lcm` of `1`, every `|coefficient|` of `var`, and every divisor of a
    /// `mod` whose argument mentions `var`.
    pub fn modulus(&self, var: &Var) -> Result<i64, MondecError> {
        let mut m = 1i64;
        for atom in &self.atoms {
            m = fold_modulus(m, atom, &var.name)?;
        }
        Ok(m)
    }
}

fn fold_modulus(mut m: i64, form: &LinearForm, name: &str) -> Result<i64, MondecError> {
    let c = form.coefficient(name);
    if c != 0 {
        let magnitude = c.checked_abs().ok_or_else(overflow)?;
        m = lcm(m, magnitude).ok_or_else(modulus_overflow)?;
    }
    for r in &form.remainders {
        if r.argument.mentions(name) {
            m = lcm(m, r.divisor).ok_or_else(modulus_overflow)?;
        }
        m = fold_modulus(m, &r.argument, name)?;
    }
    Ok(m)
}

fn modulus_overflow() -> MondecError {
    MondecError::InvalidArgument("modulus does not fit in 64 bits".into())
}

fn is_boolean(term: &SmtTerm, sorts: &HashMap<&str, SmtSort>) -> bool {
    match term {
        SmtTerm::Var(name) => sorts.get(name.as_str()) == Some(&SmtSort::Bool),
        SmtTerm::BoolLit(_)
        | SmtTerm::Eq(..)
        | SmtTerm::Lt(..)
        | SmtTerm::Le(..)
        | SmtTerm::Gt(..)
        | SmtTerm::Ge(..)
        | SmtTerm::And(_)
        | SmtTerm::Or(_)
        | SmtTerm::Not(_)
        | SmtTerm::Implies(..)
        | SmtTerm::ForAll(..)
        | SmtTerm::Exists(..) => true,
        SmtTerm::Ite(_, t, _) => is_boolean(t, sorts),
        SmtTerm::IntLit(_)
        | SmtTerm::Add(..)
        | SmtTerm::Sub(..)
        | SmtTerm::Mul(..)
        | SmtTerm::Neg(_)
        | SmtTerm::Mod(..) => false,
    }
}

/// Modulus for deciding `formula` with respect to `var`.
pub fn required_modulus(formula: &Formula, var: &Var) -> Result<i64, MondecError> {
    LinearAnalysis::of(formula)?.modulus(var)
}
