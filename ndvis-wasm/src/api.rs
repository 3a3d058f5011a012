//! Geometry / projection / PCA / hyperplane / overlays API (§6), exposed
//! as plain Rust functions over flat slices so the same code is callable
//! natively (via the `rlib` target) and wrapped one-to-one by
//! `#[wasm_bindgen]` in [`crate::wasm`].

use ndvis_core::buffers::{EdgeBuffer, EdgeBufferMut, VertexBuffer, VertexBufferMut};
use ndvis_core::geometry::{generate_polytope as core_generate_polytope, polytope_counts as core_polytope_counts, PolytopeKind};
use ndvis_core::hyperplane::{classify_vertices as core_classify_vertices, signed_distance, slice_polytope as core_slice_polytope, Hyperplane};
use ndvis_core::pca::compute_pca as core_compute_pca;
use ndvis_core::projection::{project_to_3d as core_project_to_3d, Basis3};
use ndvis_core::rotation::{
    apply_plane_rotations as core_apply_plane_rotations, orthogonality_drift as core_orthogonality_drift,
    reorthonormalize as core_reorthonormalize, PlaneRotation,
};
use ndvis_overlays::{
    compute_overlays as orchestrate_overlays, CalculusRequest, GeometryInput, HyperplaneInput, OverlayBuffers, OverlayError,
};

pub const OVERLAY_SUCCESS: u32 = 0;
pub const OVERLAY_INVALID_INPUTS: u32 = 1;
pub const OVERLAY_NULL_BUFFER: u32 = 2;
pub const OVERLAY_EVAL_ERROR: u32 = 3;
pub const OVERLAY_GRADIENT_ERROR: u32 = 4;

fn kind_from_u32(kind: u32) -> Option<PolytopeKind> {
    match kind {
        0 => Some(PolytopeKind::Cube),
        1 => Some(PolytopeKind::Simplex),
        2 => Some(PolytopeKind::Orthoplex),
        _ => None,
    }
}

/// `(vertex_count, edge_count)` for `kind`/`dim`, `[0, 0]` if `kind` or
/// `dim` is invalid.
pub fn polytope_counts(kind: u32, dim: u32) -> [u32; 2] {
    match kind_from_u32(kind) {
        Some(k) => {
            let (v, e) = core_polytope_counts(k, dim);
            [v as u32, e as u32]
        }
        None => [0, 0],
    }
}

/// Fill `out_vertices`/`out_edges`; returns `[written_vertices,
/// written_edges]`, `[0, 0]` on any invalid input or undersized buffer.
pub fn generate_polytope(kind: u32, dim: u32, out_vertices: &mut [f32], out_edges: &mut [u32]) -> [u32; 2] {
    let Some(k) = kind_from_u32(kind) else { return [0, 0] };
    let (nv, ne) = core_polytope_counts(k, dim);
    if nv == 0 {
        return [0, 0];
    }
    let Some(mut vb) = VertexBufferMut::new(out_vertices, dim as usize, nv) else { return [0, 0] };
    let Some(mut eb) = EdgeBufferMut::new(out_edges, ne) else { return [0, 0] };
    match core_generate_polytope(k, dim, &mut vb, &mut eb) {
        Ok((wv, we)) => [wv as u32, we as u32],
        Err(_) => [0, 0],
    }
}

/// `planes` is a flat list of `(i, j, theta)` triples.
pub fn apply_plane_rotations(mat: &mut [f32], n: usize, planes: &[f32]) {
    let rotations: Vec<PlaneRotation> = planes
        .chunks_exact(3)
        .map(|c| PlaneRotation { i: c[0] as usize, j: c[1] as usize, theta: c[2] })
        .collect();
    core_apply_plane_rotations(mat, n, &rotations);
}

pub fn orthogonality_drift(mat: &[f32], n: usize) -> f32 {
    core_orthogonality_drift(mat, n)
}

pub fn reorthonormalize(mat: &mut [f32], n: usize) {
    core_reorthonormalize(mat, n);
}

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
    let Some(vb) = VertexBuffer::new(vertices, dim, vertex_count) else { return 0 };
    let Some(basis) = Basis3::new(basis3, dim) else { return 0 };
    core_project_to_3d(vb, rotation, rotation_stride, &basis, out_positions)
}

/// Fills `out_basis3` (`dim*3` floats) and, if non-empty, `out_eigenvalues`
/// (up to 3 values). Returns `false` on invalid input.
pub fn compute_pca(vertices: &[f32], vertex_count: usize, dim: usize, out_basis3: &mut [f32], out_eigenvalues: &mut [f64]) -> bool {
    let Some(vb) = VertexBuffer::new(vertices, dim, vertex_count) else { return false };
    if out_basis3.len() < dim * 3 {
        return false;
    }
    let (basis, eigenvalues) = core_compute_pca(vb);
    out_basis3[..dim * 3].copy_from_slice(basis.as_slice());
    let n = out_eigenvalues.len().min(eigenvalues.len());
    out_eigenvalues[..n].copy_from_slice(&eigenvalues[..n]);
    true
}

pub fn point_to_hyperplane_distance(point: &[f32], normal: &[f32], offset: f32) -> f32 {
    signed_distance(point, normal, offset)
}

pub fn classify_vertices(vertices: &[f32], vertex_count: usize, dim: usize, normal: &[f32], offset: f32, out_class: &mut [i8]) -> usize {
    let Some(vb) = VertexBuffer::new(vertices, dim, vertex_count) else { return 0 };
    let plane = Hyperplane { normal, offset };
    core_classify_vertices(vb, &plane, out_class)
}

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
    let Some(vb) = VertexBuffer::new(vertices, dim, vertex_count) else { return 0 };
    let Some(eb) = EdgeBuffer::new(edges, edge_count) else { return 0 };
    let Some(mut ob) = VertexBufferMut::new(out_points, dim, out_points_capacity) else { return 0 };
    let plane = Hyperplane { normal, offset };
    core_slice_polytope(vb, eb, &plane, &mut ob, out_edge_indices)
}

fn overlay_status(err: &OverlayError) -> u32 {
    match err {
        OverlayError::InvalidInputs => OVERLAY_INVALID_INPUTS,
        OverlayError::NullBuffer => OVERLAY_NULL_BUFFER,
        OverlayError::EvalError(_) => OVERLAY_EVAL_ERROR,
        OverlayError::GradientError => OVERLAY_GRADIENT_ERROR,
    }
}

/// Single-frame overlay orchestration (§4.13/§6). Empty optional output
/// buffers are treated as "not supplied" for the overlay they back.
/// Returns `[status, projected_count, slice_count]`; per-level counts
/// land in `out_level_counts`.
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
) -> [u32; 3] {
    let Some(vb) = VertexBuffer::new(vertices, dim, vertex_count) else { return [OVERLAY_INVALID_INPUTS, 0, 0] };
    let Some(eb) = EdgeBuffer::new(edges, edge_count) else { return [OVERLAY_INVALID_INPUTS, 0, 0] };
    let Some(basis) = Basis3::new(basis3, dim) else { return [OVERLAY_INVALID_INPUTS, 0, 0] };
    let geometry = GeometryInput { vertices: vb, edges: eb, rotation, rotation_stride, basis3: basis };

    let hyperplane = has_hyperplane.then_some(HyperplaneInput { normal: hyperplane_normal, offset: hyperplane_offset });
    let calculus = (!expression.is_empty()).then_some(CalculusRequest {
        expression,
        probe,
        level_values,
        want_gradient,
        want_tangent,
        gradient_scale,
    });

    let slice_points = if has_hyperplane && !out_slice_points.is_empty() {
        VertexBufferMut::new(out_slice_points, dim, out_slice_points.len() / dim.max(1))
    } else {
        None
    };

    let mut buffers = OverlayBuffers {
        projected_vertices: out_projected,
        slice_points,
        slice_edge_indices: (has_hyperplane && !out_slice_edge_indices.is_empty()).then_some(out_slice_edge_indices),
        gradient_arrow: (want_gradient && !out_gradient_arrow.is_empty()).then_some(out_gradient_arrow),
        tangent_patch: (want_tangent && !out_tangent_patch.is_empty()).then_some(out_tangent_patch),
        level_positions: (!level_values.is_empty() && !out_level_positions.is_empty()).then_some(out_level_positions),
        level_counts: (!level_values.is_empty() && !out_level_counts.is_empty()).then_some(out_level_counts),
        level_capacity_per_level,
    };

    match orchestrate_overlays(geometry, hyperplane, calculus, &mut buffers) {
        Ok(summary) => [OVERLAY_SUCCESS, summary.projected_count as u32, summary.slice_count as u32],
        // projection/slicing (steps 1-2) already ran: report their valid
        // counts instead of discarding them on a later calculus failure.
        Err(failure) => [
            overlay_status(&failure.error),
            failure.summary.projected_count as u32,
            failure.summary.slice_count as u32,
        ],
    }
}
