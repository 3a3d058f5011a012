/// Error alphabet for the calculus engine (§6: `Parse, InvalidExpression,
/// Eval, OutOfMemory, InvalidDimension, NullPointer`).
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CalcError {
    #[error("parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },
    #[error("invalid expression: {0}")]
    InvalidExpression(String),
    #[error("evaluation error: {0}")]
    Eval(String),
    #[error("invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("null pointer")]
    NullPointer,
}

pub type Result<T> = std::result::Result<T, CalcError>;
