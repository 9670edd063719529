#![doc = include_str!("../README.md")]

//! Solver-agnostic terms and formulas for monadic decomposition queries.
//!
//! This crate provides the term language (with quantifiers and `mod`),
//! formulas carrying their sorted free variables, substitution and fresh
//! naming, and pluggable Z3 and SMT-LIB2 process backends behind
//! [`solver::SmtSolver`].

pub mod backends;
pub mod formula;
pub mod solver;
pub mod sorts;
pub mod terms;
