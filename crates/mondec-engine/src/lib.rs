#![doc = include_str!("../README.md")]

pub mod budget;
pub mod congruence;
pub mod error;
pub mod generic;
pub mod oracle;
pub mod partition;
pub mod presburger;
pub mod procedure;
pub mod relation;
pub mod scenarios;

pub use congruence::congruent;
pub use error::MondecError;
pub use generic::{decompose, Decomposition, GenericChecker, GenericOptions};
pub use oracle::{Oracle, OracleConfig, SolverChoice, SolverOracle};
pub use presburger::{
    decomposable, decomposable_by_finite_index, decomposable_with_bound, PresburgerProcedure,
    PresburgerVerdict,
};
pub use procedure::{DecisionProcedure, GenericProcedure, Verdict};
