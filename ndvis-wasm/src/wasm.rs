/// `wasm-bindgen` glue: one thin export per [`crate::api`]/
/// [`crate::calculus_api`] function, following the teacher's pattern of
/// unpacking typed-array arguments and delegating straight into plain
/// Rust logic (see the teacher's `render_scanlines`/`paint_gbuffer`).
use wasm_bindgen::prelude::*;

use crate::{api, calculus_api};

#[wasm_bindgen(start)]
pub fn init() {}

#[wasm_bindgen]
pub fn polytope_counts(kind: u32, dim: u32) -> Vec<u32> {
    api::polytope_counts(kind, dim).to_vec()
}

#[wasm_bindgen]
pub fn generate_polytope(kind: u32, dim: u32, out_vertices: &mut [f32], out_edges: &mut [u32]) -> Vec<u32> {
    api::generate_polytope(kind, dim, out_vertices, out_edges).to_vec()
}

#[wasm_bindgen]
pub fn apply_plane_rotations(mat: &mut [f32], n: usize, planes: &[f32]) {
    api::apply_plane_rotations(mat, n, planes);
}

#[wasm_bindgen]
pub fn orthogonality_drift(mat: &[f32], n: usize) -> f32 {
    api::orthogonality_drift(mat, n)
}

#[wasm_bindgen]
pub fn reorthonormalize(mat: &mut [f32], n: usize) {
    api::reorthonormalize(mat, n);
}

#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn project_to_3d(
    vertices: &[f32],
    dim: usize,
    vertex_count: usize,
    rotation: &[f32],
    rotation_stride: usize,
    basis3: &[f32],
    out_positions: &mut [f32],
) -> usize {
    api::project_to_3d(vertices, dim, vertex_count, rotation, rotation_stride, basis3, out_positions)
}

#[wasm_bindgen]
pub fn compute_pca(vertices: &[f32], vertex_count: usize, dim: usize, out_basis3: &mut [f32], out_eigenvalues: &mut [f64]) -> bool {
    api::compute_pca(vertices, vertex_count, dim, out_basis3, out_eigenvalues)
}

#[wasm_bindgen]
pub fn point_to_hyperplane_distance(point: &[f32], normal: &[f32], offset: f32) -> f32 {
    api::point_to_hyperplane_distance(point, normal, offset)
}

#[wasm_bindgen]
pub fn classify_vertices(vertices: &[f32], vertex_count: usize, dim: usize, normal: &[f32], offset: f32, out_class: &mut [i8]) -> usize {
    api::classify_vertices(vertices, vertex_count, dim, normal, offset, out_class)
}

#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn slice_polytope(
    vertices: &[f32],
    vertex_count: usize,
    dim: usize,
    edges: &[u32],
    edge_count: usize,
    normal: &[f32],
    offset: f32,
    out_points: &mut [f32],
    out_points_capacity: usize,
    out_edge_indices: &mut [u32],
) -> usize {
    api::slice_polytope(
        vertices,
        vertex_count,
        dim,
        edges,
        edge_count,
        normal,
        offset,
        out_points,
        out_points_capacity,
        out_edge_indices,
    )
}

#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn compute_overlays(
    vertices: &[f32],
    dim: usize,
    vertex_count: usize,
    edges: &[u32],
    edge_count: usize,
    rotation: &[f32],
    rotation_stride: usize,
    basis3: &[f32],
    has_hyperplane: bool,
    hyperplane_normal: &[f32],
    hyperplane_offset: f32,
    expression: &str,
    probe: &[f64],
    level_values: &[f64],
    want_gradient: bool,
    want_tangent: bool,
    gradient_scale: f64,
    out_projected: &mut [f32],
    out_slice_points: &mut [f32],
    out_slice_edge_indices: &mut [u32],
    out_gradient_arrow: &mut [f32],
    out_tangent_patch: &mut [f32],
    out_level_positions: &mut [f32],
    out_level_counts: &mut [usize],
    level_capacity_per_level: usize,
) -> Vec<u32> {
    api::compute_overlays(
        vertices,
        dim,
        vertex_count,
        edges,
        edge_count,
        rotation,
        rotation_stride,
        basis3,
        has_hyperplane,
        hyperplane_normal,
        hyperplane_offset,
        expression,
        probe,
        level_values,
        want_gradient,
        want_tangent,
        gradient_scale,
        out_projected,
        out_slice_points,
        out_slice_edge_indices,
        out_gradient_arrow,
        out_tangent_patch,
        out_level_positions,
        out_level_counts,
        level_capacity_per_level,
    )
    .to_vec()
}

#[wasm_bindgen]
pub fn context_create() -> u32 {
    calculus_api::context_create()
}

#[wasm_bindgen]
pub fn context_destroy(handle: u32) {
    calculus_api::context_destroy(handle);
}

#[wasm_bindgen]
pub fn set_ad_mode(ctx_handle: u32, mode: u32) -> bool {
    calculus_api::set_ad_mode(ctx_handle, mode)
}

#[wasm_bindgen]
pub fn set_fd_epsilon(ctx_handle: u32, epsilon: f64) -> bool {
    calculus_api::set_fd_epsilon(ctx_handle, epsilon)
}

/// `var_names` is a comma-separated list (e.g. `"x,y,z"`), the simplest
/// wasm-bindgen-friendly rendering of §6's `var_names` array.
#[wasm_bindgen]
pub fn compile(ctx_handle: u32, expression: &str, var_names: &str) -> u32 {
    let names: Vec<String> = var_names.split(',').filter(|s| !s.is_empty()).map(str::to_string).collect();
    calculus_api::compile(ctx_handle, expression, &names)
}

#[wasm_bindgen]
pub fn program_destroy(handle: u32) {
    calculus_api::program_destroy(handle);
}

#[wasm_bindgen]
pub fn program_set_ad_mode(program_handle: u32, mode: u32) -> bool {
    calculus_api::program_set_ad_mode(program_handle, mode)
}

#[wasm_bindgen]
pub fn program_set_fd_epsilon(program_handle: u32, epsilon: f64) -> bool {
    calculus_api::program_set_fd_epsilon(program_handle, epsilon)
}

#[wasm_bindgen]
pub fn eval(ctx_handle: u32, program_handle: u32, inputs: &[f64]) -> Option<f64> {
    calculus_api::eval(ctx_handle, program_handle, inputs)
}

#[wasm_bindgen]
pub fn eval_batch(ctx_handle: u32, program_handle: u32, inputs: &[f64], out: &mut [f64]) -> bool {
    calculus_api::eval_batch(ctx_handle, program_handle, inputs, out)
}

#[wasm_bindgen]
pub fn gradient(ctx_handle: u32, program_handle: u32, inputs: &[f64]) -> Option<Vec<f64>> {
    calculus_api::gradient(ctx_handle, program_handle, inputs)
}

#[wasm_bindgen]
pub fn hessian(ctx_handle: u32, program_handle: u32, inputs: &[f64]) -> Option<Vec<f64>> {
    calculus_api::hessian(ctx_handle, program_handle, inputs)
}

#[wasm_bindgen]
pub fn error_string(code: u32) -> String {
    calculus_api::error_string(code).to_string()
}

#[wasm_bindgen]
pub fn last_error_message(ctx_handle: u32) -> Option<String> {
    calculus_api::last_error_message(ctx_handle)
}
