//! Per-frame overlay orchestrator composing projection, hyperplane
//! slicing, and calculus overlays.

pub mod error;
pub mod orchestrator;

pub use error::OverlayError;
pub use orchestrator::{
    compute_overlays, CalculusRequest, GeometryInput, HyperplaneInput, OverlayBuffers, OverlayFailure, OverlaySummary,
};
