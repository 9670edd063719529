//! Solver backends: in-process Z3 and external SMT-LIB2 processes.

pub mod smtlib_printer;
pub mod smtlib_process;
pub mod z3_backend;
