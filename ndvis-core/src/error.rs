/// Error alphabet shared across the geometry/projection/PCA/hyperplane surface.
///
/// Mirrors the §6 `InvalidInputs` family at the FFI boundary: callers never
/// see a panic, only one of these variants converted to a status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("dimension out of range [1, 31]")]
    InvalidDimension,
    #[error("output buffer too small for the requested write")]
    ShortBuffer,
    #[error("null or empty input buffer")]
    NullBuffer,
}

pub type Result<T> = std::result::Result<T, CoreError>;
