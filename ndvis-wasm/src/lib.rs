//! Native-callable and (on `wasm32`) `wasm-bindgen` entry points over
//! `ndvis-core` / `ndcalc-core` / `ndvis-overlays` (§6).
//!
//! [`api`] and [`calculus_api`] are plain Rust, compiled for every
//! target; [`wasm`] is the thin `wasm-bindgen` wrapper, compiled only
//! for `wasm32` where its dependencies are pulled in.

pub mod api;
pub mod calculus_api;

#[cfg(target_arch = "wasm32")]
mod wasm;
