//! n-dimensional polytope generation, rigid rotation, projection to ℝ³,
//! PCA, and hyperplane slicing.

pub mod buffers;
pub mod eigen;
pub mod error;
pub mod geometry;
pub mod hyperplane;
pub mod pca;
pub mod projection;
pub mod rotation;

pub use error::{CoreError, Result};
