//! In-process Z3 through the `z3` crate's thread-local context.

use std::collections::HashMap;

use thiserror::Error;
use z3::ast::{Bool, Int};
use z3::SatResult as Z3SatResult;

use crate::formula::Var;
use crate::solver::{Model, ModelValue, SatAnswer, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

#[derive(Debug, Error)]
pub enum Z3Error {
    #[error("Z3 error: {0}")]
    Internal(String),
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
    #[error("Sort mismatch for variable {0}")]
    SortMismatch(String),
    #[error("ill-sorted term: {0}")]
    IllSorted(&'static str),
    #[error("Z3 does not support logic `{0}`")]
    UnsupportedLogic(String),
}

pub struct Z3Solver {
    solver: z3::Solver,
    logic: Option<String>,
    timeout_ms: Option<u32>,
    consts: HashMap<String, Value>,
}

impl Z3Solver {
    pub fn new() -> Self {
        Self::from_raw(z3::Solver::new(), None, 0)
    }

    pub fn with_timeout_secs(timeout_secs: u64) -> Self {
        Self::from_raw(z3::Solver::new(), None, timeout_secs)
    }

    /// A solver specialised to an SMT-LIB logic. `LIA` selects Z3's
    /// quantifier-elimination strategy for quantified linear integer arithmetic.
    pub fn for_logic(logic: &str, timeout_secs: u64) -> Result<Self, Z3Error> {
        let solver = z3::Solver::new_for_logic(logic)
            .ok_or_else(|| Z3Error::UnsupportedLogic(logic.to_string()))?;
        Ok(Self::from_raw(solver, Some(logic.to_string()), timeout_secs))
    }

    pub fn logic(&self) -> Option<&str> {
        self.logic.as_deref()
    }

    fn from_raw(solver: z3::Solver, logic: Option<String>, timeout_secs: u64) -> Self {
        let timeout_ms = (timeout_secs > 0)
            .then(|| timeout_secs.saturating_mul(1000).min(u64::from(u32::MAX)) as u32);
        let mut out = Self {
            solver,
            logic,
            timeout_ms,
            consts: HashMap::new(),
        };
        out.apply_timeout();
        out
    }

    // Z3 drops solver parameters on reset, so this runs again after each one.
    fn apply_timeout(&mut self) {
        if let Some(ms) = self.timeout_ms {
            let mut params = z3::Params::new();
            params.set_u32("timeout", ms);
            self.solver.set_params(&params);
        }
    }

    fn unknown_reason(&self) -> String {
        self.solver
            .get_reason_unknown()
            .unwrap_or_else(|| "Z3 returned unknown".to_string())
    }

    fn read_model(&self, read_back: &[Var]) -> Result<Model, Z3Error> {
        let z3_model = self
            .solver
            .get_model()
            .ok_or_else(|| Z3Error::Internal("SAT but no model available".into()))?;
        let mut model = Model::default();
        for var in read_back {
            let value = match self.consts.get(&var.name) {
                Some(Value::Int(c)) => z3_model
                    .eval::<Int>(c, true)
                    .and_then(|v| v.as_i64())
                    .map(ModelValue::Int),
                Some(Value::Bool(c)) => z3_model
                    .eval::<Bool>(c, true)
                    .and_then(|v| v.as_bool())
                    .map(ModelValue::Bool),
                None => None,
            };
            if let Some(value) = value {
                model.insert(var.name.clone(), value);
            }
        }
        Ok(model)
    }
}

impl Default for Z3Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl SmtSolver for Z3Solver {
    type Error = Z3Error;

    fn name(&self) -> &'static str {
        "z3"
    }

    fn declare(&mut self, var: &Var) -> Result<(), Z3Error> {
        if let Some(existing) = self.consts.get(&var.name) {
            if existing.sort() != var.sort {
                return Err(Z3Error::SortMismatch(var.name.clone()));
            }
            return Ok(());
        }
        self.consts
            .insert(var.name.clone(), Value::fresh(&var.name, var.sort));
        Ok(())
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Z3Error> {
        let lowered = Lowering::new(&self.consts).boolean(term)?;
        self.solver.assert(&lowered);
        Ok(())
    }

    fn check(&mut self, read_back: &[Var]) -> Result<SatAnswer, Z3Error> {
        match self.solver.check() {
            Z3SatResult::Sat => Ok(SatAnswer::Sat(self.read_model(read_back)?)),
            Z3SatResult::Unsat => Ok(SatAnswer::Unsat),
            Z3SatResult::Unknown => Ok(SatAnswer::Unknown(self.unknown_reason())),
        }
    }

    fn reset(&mut self) -> Result<(), Z3Error> {
        self.solver.reset();
        self.apply_timeout();
        self.consts.clear();
        Ok(())
    }
}

#[derive(Clone)]
enum Value {
    Int(Int),
    Bool(Bool),
}

impl Value {
    fn fresh(name: &str, sort: SmtSort) -> Self {
        match sort {
            SmtSort::Int => Value::Int(Int::new_const(name)),
            SmtSort::Bool => Value::Bool(Bool::new_const(name)),
        }
    }

    fn sort(&self) -> SmtSort {
        match self {
            Value::Int(_) => SmtSort::Int,
            Value::Bool(_) => SmtSort::Bool,
        }
    }

    fn as_ast(&self) -> &dyn z3::ast::Ast {
        match self {
            Value::Int(i) => i,
            Value::Bool(b) => b,
        }
    }
}

/// Lowers [`SmtTerm`]s to Z3 ASTs. Quantifier bindings shadow declared
/// constants of the same name for the extent of their body.
struct Lowering<'a> {
    consts: &'a HashMap<String, Value>,
    scopes: Vec<(String, Value)>,
}

impl<'a> Lowering<'a> {
    fn new(consts: &'a HashMap<String, Value>) -> Self {
        Self {
            consts,
            scopes: Vec::new(),
        }
    }

    fn int(&mut self, term: &SmtTerm) -> Result<Int, Z3Error> {
        match self.lower(term)? {
            Value::Int(i) => Ok(i),
            Value::Bool(_) => Err(Z3Error::IllSorted("expected Int, got Bool")),
        }
    }

    fn boolean(&mut self, term: &SmtTerm) -> Result<Bool, Z3Error> {
        match self.lower(term)? {
            Value::Bool(b) => Ok(b),
            Value::Int(_) => Err(Z3Error::IllSorted("expected Bool, got Int")),
        }
    }

    fn arith(
        &mut self,
        lhs: &SmtTerm,
        rhs: &SmtTerm,
        op: impl FnOnce(&Int, &Int) -> Int,
    ) -> Result<Value, Z3Error> {
        let l = self.int(lhs)?;
        let r = self.int(rhs)?;
        Ok(Value::Int(op(&l, &r)))
    }

    fn compare(
        &mut self,
        lhs: &SmtTerm,
        rhs: &SmtTerm,
        op: impl FnOnce(&Int, &Int) -> Bool,
    ) -> Result<Value, Z3Error> {
        let l = self.int(lhs)?;
        let r = self.int(rhs)?;
        Ok(Value::Bool(op(&l, &r)))
    }

    fn bools(&mut self, terms: &[SmtTerm]) -> Result<Vec<Bool>, Z3Error> {
        terms.iter().map(|t| self.boolean(t)).collect()
    }

    fn lower(&mut self, term: &SmtTerm) -> Result<Value, Z3Error> {
        match term {
            SmtTerm::Var(name) => self.resolve(name),
            SmtTerm::IntLit(n) => Ok(Value::Int(Int::from_i64(*n))),
            SmtTerm::BoolLit(b) => Ok(Value::Bool(Bool::from_bool(*b))),
            SmtTerm::Add(l, r) => self.arith(l, r, |a, b| a + b),
            SmtTerm::Sub(l, r) => self.arith(l, r, |a, b| a - b),
            SmtTerm::Mul(l, r) => self.arith(l, r, |a, b| a * b),
            SmtTerm::Mod(l, r) => self.arith(l, r, |a, b| a.modulo(b)),
            SmtTerm::Neg(inner) => Ok(Value::Int(self.int(inner)?.unary_minus())),
            SmtTerm::Lt(l, r) => self.compare(l, r, |a, b| a.lt(b)),
            SmtTerm::Le(l, r) => self.compare(l, r, |a, b| a.le(b)),
            SmtTerm::Gt(l, r) => self.compare(l, r, |a, b| a.gt(b)),
            SmtTerm::Ge(l, r) => self.compare(l, r, |a, b| a.ge(b)),
            SmtTerm::Eq(l, r) => match (self.lower(l)?, self.lower(r)?) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a.eq(&b))),
                (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a.eq(&b))),
                _ => Err(Z3Error::IllSorted("operands of = differ in sort")),
            },
            SmtTerm::And(terms) => {
                let parts = self.bools(terms)?;
                let refs: Vec<&Bool> = parts.iter().collect();
                Ok(Value::Bool(Bool::and(&refs)))
            }
            SmtTerm::Or(terms) => {
                let parts = self.bools(terms)?;
                let refs: Vec<&Bool> = parts.iter().collect();
                Ok(Value::Bool(Bool::or(&refs)))
            }
            SmtTerm::Not(inner) => Ok(Value::Bool(self.boolean(inner)?.not())),
            SmtTerm::Implies(l, r) => {
                let a = self.boolean(l)?;
                let b = self.boolean(r)?;
                Ok(Value::Bool(a.implies(&b)))
            }
            SmtTerm::Ite(cond, then, other) => {
                let c = self.boolean(cond)?;
                match (self.lower(then)?, self.lower(other)?) {
                    (Value::Int(t), Value::Int(e)) => Ok(Value::Int(c.ite(&t, &e))),
                    (Value::Bool(t), Value::Bool(e)) => Ok(Value::Bool(c.ite(&t, &e))),
                    _ => Err(Z3Error::IllSorted("branches of ite differ in sort")),
                }
            }
            SmtTerm::ForAll(bindings, body) => self.quantifier(bindings, body, true),
            SmtTerm::Exists(bindings, body) => self.quantifier(bindings, body, false),
        }
    }

    fn resolve(&self, name: &str) -> Result<Value, Z3Error> {
        self.scopes
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .or_else(|| self.consts.get(name))
            .cloned()
            .ok_or_else(|| Z3Error::UnknownVariable(name.to_string()))
    }

    fn quantifier(
        &mut self,
        bindings: &[(String, SmtSort)],
        body: &SmtTerm,
        universal: bool,
    ) -> Result<Value, Z3Error> {
        let mark = self.scopes.len();
        let bound: Vec<Value> = bindings
            .iter()
            .map(|(name, sort)| Value::fresh(name, *sort))
            .collect();
        self.scopes.extend(
            bindings
                .iter()
                .map(|(name, _)| name.clone())
                .zip(bound.iter().cloned()),
        );
        let body = self.boolean(body);
        self.scopes.truncate(mark);
        let body = body?;

        let vars: Vec<&dyn z3::ast::Ast> = bound.iter().map(Value::as_ast).collect();
        let quantified = if universal {
            z3::ast::forall_const(&vars, &[], &body)
        } else {
            z3::ast::exists_const(&vars, &[], &body)
        };
        Ok(Value::Bool(quantified))
    }
}
