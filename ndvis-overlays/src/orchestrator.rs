//! Per-frame overlay orchestrator (§4.13): runs the geometry and
//! calculus cores together for one frame — projection, optional
//! hyperplane slicing, and optional gradient arrow / tangent patch /
//! level-set curves around a probe point.

use ndcalc_core::{AdMode, Context};
use ndvis_core::buffers::{EdgeBuffer, VertexBuffer, VertexBufferMut};
use ndvis_core::hyperplane::{slice_polytope, Hyperplane};
use ndvis_core::projection::{project_to_3d, Basis3};

use crate::error::{OverlayError, Result};

const GRADIENT_EPS: f64 = 1e-8;
const TANGENT_COLLAPSE_EPS: f64 = 1e-9;

/// A geometry snapshot for the frame: SoA vertices/edges, the current
/// rotation matrix, and the projection basis.
pub struct GeometryInput<'a> {
    pub vertices: VertexBuffer<'a>,
    pub edges: EdgeBuffer<'a>,
    pub rotation: &'a [f32],
    pub rotation_stride: usize,
    pub basis3: Basis3<'a>,
}

/// An optional slicing hyperplane.
pub struct HyperplaneInput<'a> {
    pub normal: &'a [f32],
    pub offset: f32,
}

/// A calculus overlay request: an expression over `x1..xd` (`d` is the
/// geometry's dimension), a probe point, and the overlays to compute.
pub struct CalculusRequest<'a> {
    pub expression: &'a str,
    pub probe: &'a [f64],
    pub level_values: &'a [f64],
    pub want_gradient: bool,
    pub want_tangent: bool,
    pub gradient_scale: f64,
}

/// Caller-owned output buffers. Every buffer an enabled overlay needs
/// must be `Some`, sized appropriately, or the call fails with
/// [`OverlayError::NullBuffer`].
pub struct OverlayBuffers<'a> {
    pub projected_vertices: &'a mut [f32],
    pub slice_points: Option<VertexBufferMut<'a>>,
    pub slice_edge_indices: Option<&'a mut [u32]>,
    /// Two interleaved 3-vectors: probe, then probe + scale*unit_gradient.
    pub gradient_arrow: Option<&'a mut [f32]>,
    /// Four interleaved 3-vectors, the tangent-plane quad corners.
    pub tangent_patch: Option<&'a mut [f32]>,
    /// `level_values.len()` contiguous blocks of `level_capacity_per_level`
    /// interleaved 3-vectors each.
    pub level_positions: Option<&'a mut [f32]>,
    pub level_counts: Option<&'a mut [usize]>,
    pub level_capacity_per_level: usize,
}

/// Counts of what was actually written, for the caller to know how much
/// of each buffer is valid.
#[derive(Clone, Debug, Default)]
pub struct OverlaySummary {
    pub projected_count: usize,
    pub slice_count: usize,
    pub level_counts: Vec<usize>,
}

/// A failed frame, carrying whatever [`OverlaySummary`] fields steps
/// 1-2 already computed before the failing step — projection and
/// slicing always run first and their outputs stay valid in the
/// caller's buffers even when a later calculus step fails (§9).
#[derive(Clone, Debug)]
pub struct OverlayFailure {
    pub error: OverlayError,
    pub summary: OverlaySummary,
}

impl std::fmt::Display for OverlayFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for OverlayFailure {}

/// Run one frame of the orchestrator (§4.13, steps 1-8). On failure,
/// [`OverlayFailure::summary`] still reports the projected/slice counts
/// steps 1-2 wrote, and `buffers.level_counts` (if supplied) is zeroed
/// so a caller reusing buffers across frames doesn't read a stale count
/// left over from an earlier successful frame.
pub fn compute_overlays(
    geometry: GeometryInput<'_>,
    hyperplane: Option<HyperplaneInput<'_>>,
    calculus: Option<CalculusRequest<'_>>,
    buffers: &mut OverlayBuffers<'_>,
) -> std::result::Result<OverlaySummary, OverlayFailure> {
    let mut summary = OverlaySummary::default();
    match run(geometry, hyperplane, calculus, buffers, &mut summary) {
        Ok(()) => Ok(summary),
        Err(error) => {
            if let Some(level_counts) = buffers.level_counts.as_deref_mut() {
                level_counts.fill(0);
            }
            Err(OverlayFailure { error, summary })
        }
    }
}

fn run(
    geometry: GeometryInput<'_>,
    hyperplane: Option<HyperplaneInput<'_>>,
    calculus: Option<CalculusRequest<'_>>,
    buffers: &mut OverlayBuffers<'_>,
    summary: &mut OverlaySummary,
) -> Result<()> {
    let dim = geometry.vertices.dim();

    // 1. project current vertices.
    summary.projected_count = project_to_3d(
        geometry.vertices,
        geometry.rotation,
        geometry.rotation_stride,
        &geometry.basis3,
        buffers.projected_vertices,
    );

    // 2. slice, if a hyperplane is supplied.
    if let Some(hp) = &hyperplane {
        let plane = Hyperplane { normal: hp.normal, offset: hp.offset };
        let out_points = buffers.slice_points.as_mut().ok_or(OverlayError::NullBuffer)?;
        let out_edges = buffers.slice_edge_indices.as_deref_mut().ok_or(OverlayError::NullBuffer)?;
        summary.slice_count = slice_polytope(geometry.vertices, geometry.edges, &plane, out_points, out_edges);
    }

    // 3. no calculus overlay requested: done.
    let calc = match calculus {
        Some(c) => c,
        None => return Ok(()),
    };
    if calc.probe.len() != dim {
        return Err(OverlayError::InvalidInputs);
    }

    // 4. compile with an internal Forward-AD context; variables are x1..xd.
    let var_names: Vec<String> = (1..=dim).map(|i| format!("x{i}")).collect();
    let mut ctx = Context::new();
    ctx.set_ad_mode(AdMode::Forward);
    let mut program = ctx
        .compile(calc.expression, &var_names)
        .map_err(|e| OverlayError::EvalError(e.to_string()))?;

    if calc.want_gradient || calc.want_tangent {
        let grad = program
            .gradient(&mut ctx, calc.probe)
            .map_err(|e| OverlayError::EvalError(e.to_string()))?;
        let norm = grad.iter().map(|g| g * g).sum::<f64>().sqrt();
        if norm <= GRADIENT_EPS {
            return Err(OverlayError::GradientError);
        }
        let unit: Vec<f64> = grad.iter().map(|g| g / norm).collect();

        // 6. gradient arrow: probe and probe + scale*unit_gradient.
        if calc.want_gradient {
            let tip: Vec<f64> = calc
                .probe
                .iter()
                .zip(unit.iter())
                .map(|(p, u)| p + calc.gradient_scale * u)
                .collect();
            let out = buffers.gradient_arrow.as_deref_mut().ok_or(OverlayError::NullBuffer)?;
            project_points(&[calc.probe.to_vec(), tip], dim, &geometry, out)?;
        }

        // 7. tangent patch: a quad around probe spanned by two unit
        // tangents orthogonal to the gradient.
        if calc.want_tangent {
            let (tu, tv) = build_tangent_basis(&unit)?;
            let corners = quad_corners(calc.probe, &tu, &tv);
            let out = buffers.tangent_patch.as_deref_mut().ok_or(OverlayError::NullBuffer)?;
            project_points(&corners, dim, &geometry, out)?;
        }
    }

    // 8. level-set curves.
    if !calc.level_values.is_empty() {
        let cap = buffers.level_capacity_per_level;
        let level_counts = buffers.level_counts.as_deref_mut().ok_or(OverlayError::NullBuffer)?;
        if level_counts.len() < calc.level_values.len() {
            return Err(OverlayError::InvalidInputs);
        }
        let level_positions = buffers.level_positions.as_deref_mut().ok_or(OverlayError::NullBuffer)?;
        if level_positions.len() < calc.level_values.len() * cap * 3 {
            return Err(OverlayError::NullBuffer);
        }

        let n = geometry.vertices.len();
        let mut values = vec![0.0f64; n];
        let mut point = vec![0.0f32; dim];
        for (v, value) in values.iter_mut().enumerate() {
            geometry.vertices.vertex_into(v, &mut point);
            let point64: Vec<f64> = point.iter().map(|&x| x as f64).collect();
            *value = program.eval(&mut ctx, &point64).map_err(|e| OverlayError::EvalError(e.to_string()))?;
        }

        for (li, &c) in calc.level_values.iter().enumerate() {
            let mut count = 0usize;
            let mut pa = vec![0.0f32; dim];
            let mut pb = vec![0.0f32; dim];
            for e in 0..geometry.edges.len() {
                if count >= cap {
                    break;
                }
                let (a, b) = geometry.edges.pair(e);
                let (va, vb) = (values[a as usize] - c, values[b as usize] - c);
                let crosses = va == 0.0 || vb == 0.0 || (va > 0.0) != (vb > 0.0);
                if !crosses {
                    continue;
                }
                let t = if (va - vb).abs() > 1e-9 { (va / (va - vb)).clamp(0.0, 1.0) } else { 0.0 };
                geometry.vertices.vertex_into(a as usize, &mut pa);
                geometry.vertices.vertex_into(b as usize, &mut pb);
                let interp: Vec<f64> = pa
                    .iter()
                    .zip(pb.iter())
                    .map(|(&x, &y)| x as f64 + (y as f64 - x as f64) * t)
                    .collect();
                let slot = (li * cap + count) * 3;
                project_points(&[interp], dim, &geometry, &mut level_positions[slot..slot + 3])?;
                count += 1;
            }
            if count == 0 && cap == 0 {
                return Err(OverlayError::NullBuffer);
            }
            level_counts[li] = count;
            summary.level_counts.push(count);
        }
    }

    Ok(())
}

/// Project a handful of ad-hoc nD points (probe, arrow tip, patch
/// corners, a level-set intersection) through the frame's rotation and
/// basis, writing interleaved 3-vectors into `out`.
fn project_points(points: &[Vec<f64>], dim: usize, geometry: &GeometryInput<'_>, out: &mut [f32]) -> Result<()> {
    let n = points.len();
    if out.len() < n * 3 {
        return Err(OverlayError::NullBuffer);
    }
    let mut data = vec![0.0f32; dim * n];
    for (v, p) in points.iter().enumerate() {
        for (a, slot) in p.iter().enumerate().take(dim) {
            data[a * n + v] = *slot as f32;
        }
    }
    let vertices = VertexBuffer::new(&data, dim, n).ok_or(OverlayError::InvalidInputs)?;
    let written = project_to_3d(vertices, geometry.rotation, geometry.rotation_stride, &geometry.basis3, out);
    if written != n {
        return Err(OverlayError::NullBuffer);
    }
    Ok(())
}

fn canonical(dim: usize, axis: usize) -> Vec<f64> {
    let mut v = vec![0.0; dim];
    v[axis] = 1.0;
    v
}

/// Project `seed` against every vector in `basis` (assumed orthonormal)
/// and normalize the remainder. `None` if the remainder collapses.
fn orthonormalize_against(mut seed: Vec<f64>, basis: &[&[f64]]) -> Option<Vec<f64>> {
    for b in basis {
        let dot: f64 = seed.iter().zip(b.iter()).map(|(s, x)| s * x).sum();
        for (s, x) in seed.iter_mut().zip(b.iter()) {
            *s -= dot * x;
        }
    }
    let norm = seed.iter().map(|s| s * s).sum::<f64>().sqrt();
    if norm < TANGENT_COLLAPSE_EPS {
        None
    } else {
        for s in seed.iter_mut() {
            *s /= norm;
        }
        Some(seed)
    }
}

/// Build two orthonormal tangent vectors orthogonal to `unit_gradient`
/// (§4.13 step 7): seed from the axis where the gradient is smallest in
/// magnitude, then re-orthonormalize against the gradient and, for the
/// second vector, against the first tangent too.
fn build_tangent_basis(unit_gradient: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
    let dim = unit_gradient.len();
    if dim < 2 {
        return Err(OverlayError::InvalidInputs);
    }
    let mut axes: Vec<usize> = (0..dim).collect();
    axes.sort_by(|&a, &b| unit_gradient[a].abs().partial_cmp(&unit_gradient[b].abs()).unwrap());

    let mut tangent_u = None;
    let mut seed_axis = None;
    for &axis in &axes {
        if let Some(v) = orthonormalize_against(canonical(dim, axis), &[unit_gradient]) {
            tangent_u = Some(v);
            seed_axis = Some(axis);
            break;
        }
    }
    let tangent_u = tangent_u.ok_or(OverlayError::GradientError)?;

    let mut tangent_v = None;
    for &axis in &axes {
        if Some(axis) == seed_axis {
            continue;
        }
        if let Some(v) = orthonormalize_against(canonical(dim, axis), &[unit_gradient, &tangent_u]) {
            tangent_v = Some(v);
            break;
        }
    }
    let tangent_v = tangent_v.ok_or(OverlayError::GradientError)?;
    Ok((tangent_u, tangent_v))
}

/// The four corners of a unit-scaled quad around `probe`, spanned by
/// `tangent_u`/`tangent_v`.
fn quad_corners(probe: &[f64], tangent_u: &[f64], tangent_v: &[f64]) -> Vec<Vec<f64>> {
    [(0.5, 0.5), (0.5, -0.5), (-0.5, -0.5), (-0.5, 0.5)]
        .iter()
        .map(|&(su, sv)| {
            probe
                .iter()
                .enumerate()
                .map(|(i, &p)| p + su * tangent_u[i] + sv * tangent_v[i])
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndvis_core::geometry::{generate_polytope, polytope_counts, PolytopeKind};

    fn identity_rotation(n: usize) -> Vec<f32> {
        let mut m = vec![0.0f32; n * n];
        for i in 0..n {
            m[i * n + i] = 1.0;
        }
        m
    }

    fn canonical_basis3(dim: usize) -> Vec<f32> {
        let mut b = vec![0.0f32; dim * 3];
        for c in 0..3.min(dim) {
            b[c * dim + c] = 1.0;
        }
        b
    }

    struct CubeFixture {
        vdata: Vec<f32>,
        edata: Vec<u32>,
        rotation: Vec<f32>,
        basis_data: Vec<f32>,
        dim: usize,
        nv: usize,
        ne: usize,
    }

    fn cube_fixture() -> CubeFixture {
        let dim = 3usize;
        let (nv, ne) = polytope_counts(PolytopeKind::Cube, dim as u32);
        let mut vdata = vec![0.0f32; dim * nv];
        let mut edata = vec![0u32; ne * 2];
        {
            let mut vb = VertexBufferMut::new(&mut vdata, dim, nv).unwrap();
            let mut eb = ndvis_core::buffers::EdgeBufferMut::new(&mut edata, ne).unwrap();
            generate_polytope(PolytopeKind::Cube, dim as u32, &mut vb, &mut eb).unwrap();
        }
        CubeFixture {
            vdata,
            edata,
            rotation: identity_rotation(dim),
            basis_data: canonical_basis3(dim),
            dim,
            nv,
            ne,
        }
    }

    #[test]
    fn projection_only_fills_projected_vertices() {
        let fx = cube_fixture();
        let verts = VertexBuffer::new(&fx.vdata, fx.dim, fx.nv).unwrap();
        let edges = EdgeBuffer::new(&fx.edata, fx.ne).unwrap();
        let basis = Basis3::new(&fx.basis_data, fx.dim).unwrap();
        let geometry = GeometryInput { vertices: verts, edges, rotation: &fx.rotation, rotation_stride: fx.dim, basis3: basis };

        let mut projected = vec![0.0f32; fx.nv * 3];
        let mut buffers = OverlayBuffers {
            projected_vertices: &mut projected,
            slice_points: None,
            slice_edge_indices: None,
            gradient_arrow: None,
            tangent_patch: None,
            level_positions: None,
            level_counts: None,
            level_capacity_per_level: 0,
        };

        let summary = compute_overlays(geometry, None, None, &mut buffers).unwrap();
        assert_eq!(summary.projected_count, fx.nv);
        assert_eq!(summary.slice_count, 0);
    }

    #[test]
    fn gradient_arrow_points_away_from_probe_along_ascent() {
        let fx = cube_fixture();
        let verts = VertexBuffer::new(&fx.vdata, fx.dim, fx.nv).unwrap();
        let edges = EdgeBuffer::new(&fx.edata, fx.ne).unwrap();
        let basis = Basis3::new(&fx.basis_data, fx.dim).unwrap();
        let geometry = GeometryInput { vertices: verts, edges, rotation: &fx.rotation, rotation_stride: fx.dim, basis3: basis };

        let mut projected = vec![0.0f32; fx.nv * 3];
        let mut arrow = vec![0.0f32; 6];
        let calc = CalculusRequest {
            expression: "x1^2 + x2^2 + x3^2",
            probe: &[1.0, 0.0, 0.0],
            level_values: &[],
            want_gradient: true,
            want_tangent: false,
            gradient_scale: 1.0,
        };
        let mut buffers = OverlayBuffers {
            projected_vertices: &mut projected,
            slice_points: None,
            slice_edge_indices: None,
            gradient_arrow: Some(&mut arrow),
            tangent_patch: None,
            level_positions: None,
            level_counts: None,
            level_capacity_per_level: 0,
        };

        compute_overlays(geometry, None, Some(calc), &mut buffers).unwrap();
        // gradient of x1^2+x2^2+x3^2 at (1,0,0) is (2,0,0); tip should sit
        // further out along +x than the probe.
        assert!((arrow[0] - 1.0).abs() < 1e-5);
        assert!(arrow[3] > arrow[0]);
    }

    #[test]
    fn tangent_patch_is_orthogonal_to_gradient() {
        let fx = cube_fixture();
        let verts = VertexBuffer::new(&fx.vdata, fx.dim, fx.nv).unwrap();
        let edges = EdgeBuffer::new(&fx.edata, fx.ne).unwrap();
        let basis = Basis3::new(&fx.basis_data, fx.dim).unwrap();
        let geometry = GeometryInput { vertices: verts, edges, rotation: &fx.rotation, rotation_stride: fx.dim, basis3: basis };

        let mut projected = vec![0.0f32; fx.nv * 3];
        let mut patch = vec![0.0f32; 12];
        let calc = CalculusRequest {
            expression: "x1^2 + x2^2 + x3^2",
            probe: &[1.0, 0.5, 0.25],
            level_values: &[],
            want_gradient: false,
            want_tangent: true,
            gradient_scale: 1.0,
        };
        let mut buffers = OverlayBuffers {
            projected_vertices: &mut projected,
            slice_points: None,
            slice_edge_indices: None,
            gradient_arrow: None,
            tangent_patch: Some(&mut patch),
            level_positions: None,
            level_counts: None,
            level_capacity_per_level: 0,
        };

        compute_overlays(geometry, None, Some(calc), &mut buffers).unwrap();
        // with identity rotation/canonical basis, projected == nD coords;
        // the quad's center should sit at the probe.
        let center_x = (patch[0] + patch[3] + patch[6] + patch[9]) / 4.0;
        assert!((center_x - 1.0).abs() < 1e-4);
    }

    #[test]
    fn gradient_at_critical_point_fails() {
        let fx = cube_fixture();
        let verts = VertexBuffer::new(&fx.vdata, fx.dim, fx.nv).unwrap();
        let edges = EdgeBuffer::new(&fx.edata, fx.ne).unwrap();
        let basis = Basis3::new(&fx.basis_data, fx.dim).unwrap();
        let geometry = GeometryInput { vertices: verts, edges, rotation: &fx.rotation, rotation_stride: fx.dim, basis3: basis };

        let mut projected = vec![0.0f32; fx.nv * 3];
        let mut arrow = vec![0.0f32; 6];
        let calc = CalculusRequest {
            expression: "x1^2 + x2^2 + x3^2",
            probe: &[0.0, 0.0, 0.0],
            level_values: &[],
            want_gradient: true,
            want_tangent: false,
            gradient_scale: 1.0,
        };
        let mut buffers = OverlayBuffers {
            projected_vertices: &mut projected,
            slice_points: None,
            slice_edge_indices: None,
            gradient_arrow: Some(&mut arrow),
            tangent_patch: None,
            level_positions: None,
            level_counts: None,
            level_capacity_per_level: 0,
        };

        let failure = compute_overlays(geometry, None, Some(calc), &mut buffers).unwrap_err();
        assert_eq!(failure.error, OverlayError::GradientError);
    }

    #[test]
    fn level_set_through_origin_matches_slice_count() {
        let fx = cube_fixture();
        let verts = VertexBuffer::new(&fx.vdata, fx.dim, fx.nv).unwrap();
        let edges = EdgeBuffer::new(&fx.edata, fx.ne).unwrap();
        let basis = Basis3::new(&fx.basis_data, fx.dim).unwrap();
        let geometry = GeometryInput { vertices: verts, edges, rotation: &fx.rotation, rotation_stride: fx.dim, basis3: basis };

        let mut projected = vec![0.0f32; fx.nv * 3];
        let mut level_positions = vec![0.0f32; 8 * 3];
        let mut level_counts = vec![0usize; 1];
        let calc = CalculusRequest {
            expression: "x1",
            probe: &[0.5, 0.0, 0.0],
            level_values: &[0.0],
            want_gradient: false,
            want_tangent: false,
            gradient_scale: 1.0,
        };
        let mut buffers = OverlayBuffers {
            projected_vertices: &mut projected,
            slice_points: None,
            slice_edge_indices: None,
            gradient_arrow: None,
            tangent_patch: None,
            level_positions: Some(&mut level_positions),
            level_counts: Some(&mut level_counts),
            level_capacity_per_level: 8,
        };

        let summary = compute_overlays(geometry, None, Some(calc), &mut buffers).unwrap();
        // the level set x1=0 on the unit cube crosses the same 4 edges
        // the x1=0 hyperplane slice does.
        assert_eq!(summary.level_counts, vec![4]);
    }

    #[test]
    fn overlay_only_failure_leaves_projection_valid() {
        let fx = cube_fixture();
        let verts = VertexBuffer::new(&fx.vdata, fx.dim, fx.nv).unwrap();
        let edges = EdgeBuffer::new(&fx.edata, fx.ne).unwrap();
        let basis = Basis3::new(&fx.basis_data, fx.dim).unwrap();
        let geometry = GeometryInput { vertices: verts, edges, rotation: &fx.rotation, rotation_stride: fx.dim, basis3: basis };

        let mut projected = vec![0.0f32; fx.nv * 3];
        // stale counts left behind by a prior successful frame.
        let mut level_counts = vec![7usize, 3];
        let calc = CalculusRequest {
            expression: "x1^2 + x2^2 + x3^2",
            probe: &[0.0, 0.0, 0.0],
            level_values: &[],
            want_gradient: true,
            want_tangent: false,
            gradient_scale: 1.0,
        };
        let mut buffers = OverlayBuffers {
            projected_vertices: &mut projected,
            slice_points: None,
            slice_edge_indices: None,
            gradient_arrow: None, // missing on purpose: NullBuffer before GradientError check path differs, but projection already written
            tangent_patch: None,
            level_positions: None,
            level_counts: Some(&mut level_counts),
            level_capacity_per_level: 0,
        };

        let failure = compute_overlays(geometry, None, Some(calc), &mut buffers).unwrap_err();
        assert_eq!(failure.error, OverlayError::GradientError);
        // steps 1-2 already ran: the partial summary still reports them.
        assert_eq!(failure.summary.projected_count, fx.nv);
        assert_eq!(failure.summary.slice_count, 0);
        // projection (step 1) ran before the calculus overlay failed.
        assert!(projected.iter().any(|&x| x != 0.0));
        // the stale per-level counts from a prior frame are zeroed, not left dangling.
        assert!(level_counts.iter().all(|&c| c == 0));
    }
}
