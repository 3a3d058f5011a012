/// Error alphabet for the overlay orchestrator (§6: `InvalidInputs,
/// NullBuffer, EvalError, GradientError`; `Success` is the `Ok` case).
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum OverlayError {
    #[error("invalid overlay inputs")]
    InvalidInputs,
    #[error("required output buffer missing or undersized")]
    NullBuffer,
    #[error("calculus evaluation failed: {0}")]
    EvalError(String),
    #[error("gradient magnitude at probe point is too small")]
    GradientError,
}

pub type Result<T> = std::result::Result<T, OverlayError>;
