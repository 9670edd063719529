use mondec_smt::formula::FormulaError;
use thiserror::Error;

/// Errors surfaced by the decision procedures.
///
/// Oracle inconclusiveness and budget exhaustion are results, not errors.
#[derive(Debug, Error)]
pub enum MondecError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Variable `{0}` does not occur free in the formula")]
    VariableNotFree(String),
    #[error("Bound must be positive, got {0}")]
    NonPositiveBound(i64),
    #[error("Bound {supplied} is too small: the formula requires a modulus of {required}")]
    BoundTooSmall { required: i64, supplied: i64 },
    #[error("Formula is outside linear integer arithmetic: {0}")]
    OutsideFragment(String),
    #[error("Solver error: {0}")]
    Solver(String),
    #[error("Formula error: {0}")]
    Formula(#[from] FormulaError),
}
