//! Backend parity: the in-process Z3 solver and the SMT-LIB process
//! backends must agree on the quantified LIA queries the engine issues.
//!
//! Process tests are `#[ignore]`d since they need a `z3` or `cvc5` binary on
//! PATH. Run them with `cargo test -- --ignored`.

use mondec_smt::backends::smtlib_process::SmtLibProcess;
use mondec_smt::backends::z3_backend::Z3Solver;
use mondec_smt::formula::Var;
use mondec_smt::solver::{SatAnswer, SmtSolver};
use mondec_smt::sorts::SmtSort;
use mondec_smt::terms::SmtTerm;

fn x() -> SmtTerm {
    SmtTerm::var("x")
}

fn y() -> SmtTerm {
    SmtTerm::var("y")
}

/// A query and the free constants it needs.
struct Query {
    vars: Vec<Var>,
    term: SmtTerm,
}

impl Query {
    fn on<S: SmtSolver>(&self, solver: &mut S) -> SatAnswer {
        solver.solve(&self.vars, &self.term).unwrap()
    }

    /// Same answer kind; models may differ between backends.
    fn agree<A: SmtSolver, B: SmtSolver>(&self, a: &mut A, b: &mut B) -> bool {
        std::mem::discriminant(&self.on(a)) == std::mem::discriminant(&self.on(b))
    }
}

/// `exists b. forall y. y > b => y + x > 3`, satisfiable for every x.
fn eventually_above() -> Query {
    let body = y().gt(SmtTerm::var("b")).implies(y().add(x()).gt(SmtTerm::int(3)));
    Query {
        vars: vec![Var::int("b"), Var::int("x")],
        term: SmtTerm::forall(vec![("y".into(), SmtSort::Int)], body),
    }
}

/// `forall y. y mod 2 = 0`, unsatisfiable.
fn all_even() -> Query {
    Query {
        vars: Vec::new(),
        term: SmtTerm::forall(
            vec![("y".into(), SmtSort::Int)],
            SmtTerm::congruent(y(), SmtTerm::int(0), 2),
        ),
    }
}

/// `x = 2 (mod 4) && x = 1 (mod 2)`, unsatisfiable.
fn clashing_residues() -> Query {
    Query {
        vars: vec![Var::int("x")],
        term: SmtTerm::and(vec![
            SmtTerm::congruent(x(), SmtTerm::int(2), 4),
            SmtTerm::congruent(x(), SmtTerm::int(1), 2),
        ]),
    }
}

#[test]
fn z3_bounded_range_is_sat() {
    let query = Query {
        vars: vec![Var::int("x")],
        term: SmtTerm::and(vec![x().gt(SmtTerm::int(0)), x().lt(SmtTerm::int(2))]),
    };
    match query.on(&mut Z3Solver::new()) {
        SatAnswer::Sat(model) => assert_eq!(model.get_int("x"), Some(1)),
        other => panic!("expected sat, got {other:?}"),
    }
}

#[test]
fn z3_congruence_unsat() {
    assert_eq!(clashing_residues().on(&mut Z3Solver::new()), SatAnswer::Unsat);
}

#[test]
fn z3_lia_quantified_sat() {
    let mut solver = Z3Solver::for_logic("LIA", 30).unwrap();
    assert!(eventually_above().on(&mut solver).is_sat());
}

#[test]
fn z3_lia_quantified_unsat() {
    let mut solver = Z3Solver::for_logic("LIA", 30).unwrap();
    assert_eq!(all_even().on(&mut solver), SatAnswer::Unsat);
}

#[test]
fn z3_solve_forgets_previous_assertions() {
    let mut solver = Z3Solver::new();
    assert_eq!(all_even().on(&mut solver), SatAnswer::Unsat);
    let query = Query {
        vars: vec![Var::int("x")],
        term: x().eq(SmtTerm::int(1)),
    };
    assert!(query.on(&mut solver).is_sat());
}

#[test]
#[ignore = "requires a z3 binary on PATH"]
fn z3_process_matches_in_process() {
    let mut in_process = Z3Solver::for_logic("LIA", 30).unwrap();
    let mut process = SmtLibProcess::z3("LIA", 30).unwrap();
    for query in [eventually_above(), all_even(), clashing_residues()] {
        assert!(query.agree(&mut in_process, &mut process));
    }
}

#[test]
#[ignore = "requires cvc5 binary on PATH"]
fn cvc5_matches_z3() {
    let mut z3 = Z3Solver::for_logic("LIA", 30).unwrap();
    let mut cvc5 = SmtLibProcess::cvc5("LIA", 30).unwrap();
    for query in [eventually_above(), all_even(), clashing_residues()] {
        assert!(query.agree(&mut z3, &mut cvc5));
    }
}

#[test]
#[ignore = "requires cvc5 binary on PATH"]
fn cvc5_model_extraction() {
    let mut cvc5 = SmtLibProcess::cvc5("LIA", 30).unwrap();
    let query = Query {
        vars: vec![Var::int("x")],
        term: x().add(SmtTerm::int(3)).eq(SmtTerm::int(0)),
    };
    match query.on(&mut cvc5) {
        SatAnswer::Sat(model) => assert_eq!(model.get_int("x"), Some(-3)),
        other => panic!("expected sat, got {other:?}"),
    }
}
