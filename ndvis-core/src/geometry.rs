//! Polytope generators — n-cube, n-simplex, n-orthoplex (§4.1).
//!
//! Each generator fills caller-provided SoA vertex/edge buffers in place
//! and returns the counts actually written; none of them allocate.

use crate::buffers::{EdgeBufferMut, VertexBufferMut};
use crate::error::{CoreError, Result};

pub const MIN_DIM: u32 = 1;
pub const MAX_DIM: u32 = 31;

/// Which polytope family to generate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolytopeKind {
    Cube,
    Simplex,
    Orthoplex,
}

/// Vertex and edge counts a polytope of this kind and dimension will
/// produce, without generating it. Returns `(0, 0)` for an out-of-range
/// dimension.
pub fn polytope_counts(kind: PolytopeKind, dim: u32) -> (usize, usize) {
    if !(MIN_DIM..=MAX_DIM).contains(&dim) {
        return (0, 0);
    }
    let d = dim as usize;
    match kind {
        PolytopeKind::Cube => {
            let n = 1usize << d;
            (n, d * (n / 2))
        }
        PolytopeKind::Simplex => {
            let n = d + 1;
            (n, n * (n - 1) / 2)
        }
        PolytopeKind::Orthoplex => {
            let n = 2 * d;
            (n, 2 * d * (d - 1))
        }
    }
}

/// Fill `out_vertices`/`out_edges` with the requested polytope and return
/// the counts actually written. Fails without writing anything if `dim`
/// is out of range or either buffer is too small to hold the full result
/// (§4.1 failure policy: no writes beyond asserted capacity).
pub fn generate_polytope(
    kind: PolytopeKind,
    dim: u32,
    out_vertices: &mut VertexBufferMut<'_>,
    out_edges: &mut EdgeBufferMut<'_>,
) -> Result<(usize, usize)> {
    let (n, e) = polytope_counts(kind, dim);
    if n == 0 || out_vertices.dim() != dim as usize {
        return Err(CoreError::InvalidDimension);
    }
    if out_vertices.capacity() < n || out_edges.capacity() < e {
        log::debug!(
            "generate_polytope: buffer too small (need {n} verts / {e} edges)"
        );
        return Err(CoreError::ShortBuffer);
    }
    let d = dim as usize;
    match kind {
        PolytopeKind::Cube => generate_cube(d, n, out_vertices, out_edges),
        PolytopeKind::Simplex => generate_simplex(d, n, out_vertices, out_edges),
        PolytopeKind::Orthoplex => generate_orthoplex(d, out_vertices, out_edges),
    }
    Ok((n, e))
}

fn generate_cube(d: usize, n: usize, verts: &mut VertexBufferMut<'_>, edges: &mut EdgeBufferMut<'_>) {
    for v in 0..n {
        for a in 0..d {
            let bit_set = (v >> a) & 1 == 1;
            verts.set(a, v, if bit_set { 1.0 } else { -1.0 });
        }
    }
    let mut edge_i = 0;
    for a in 0..d {
        let mask = 1usize << a;
        for v in 0..n {
            let w = v ^ mask;
            if v < w {
                edges.set(edge_i, v as u32, w as u32);
                edge_i += 1;
            }
        }
    }
}

fn generate_simplex(d: usize, n: usize, verts: &mut VertexBufferMut<'_>, edges: &mut EdgeBufferMut<'_>) {
    for v in 0..n {
        for a in 0..d {
            verts.set(a, v, if v == a + 1 { 1.0 } else { 0.0 });
        }
    }
    let mut edge_i = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            edges.set(edge_i, i as u32, j as u32);
            edge_i += 1;
        }
    }
}

fn generate_orthoplex(d: usize, verts: &mut VertexBufferMut<'_>, edges: &mut EdgeBufferMut<'_>) {
    let n = 2 * d;
    for v in 0..n {
        for a in 0..d {
            verts.set(a, v, 0.0);
        }
    }
    for a in 0..d {
        verts.set(a, 2 * a, 1.0);
        verts.set(a, 2 * a + 1, -1.0);
    }
    // positive-axis id of vertex v: v/2 for +e_a at 2a, -e_a at 2a+1
    let mut edge_i = 0;
    for v in 0..n {
        let av = v / 2;
        for w in (v + 1)..n {
            let aw = w / 2;
            if av != aw {
                edges.set(edge_i, v as u32, w as u32);
                edge_i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gen(kind: PolytopeKind, dim: u32) -> (Vec<f32>, Vec<u32>, usize, usize) {
        let (nv, ne) = polytope_counts(kind, dim);
        let mut vdata = vec![0.0f32; dim as usize * nv];
        let mut edata = vec![0u32; ne * 2];
        let (wn, we) = {
            let mut vb = VertexBufferMut::new(&mut vdata, dim as usize, nv).unwrap();
            let mut eb = EdgeBufferMut::new(&mut edata, ne).unwrap();
            generate_polytope(kind, dim, &mut vb, &mut eb).unwrap()
        };
        (vdata, edata, wn, we)
    }

    #[test]
    fn cube_counts_and_edges_differ_by_one_bit() {
        for dim in 1..=8u32 {
            let (verts, edges, n, e) = gen(PolytopeKind::Cube, dim);
            assert_eq!(n, 1usize << dim);
            assert_eq!(e, dim as usize * (n / 2));
            let d = dim as usize;
            for i in 0..e {
                let (a, b) = (edges[i * 2] as usize, edges[i * 2 + 1] as usize);
                assert_ne!(a, b);
                let diff = a ^ b;
                assert_eq!(diff.count_ones(), 1, "edge {a}-{b} differs in more than one bit");
                let _ = &verts;
                let _ = d;
            }
        }
    }

    #[test]
    fn simplex_vertex_zero_is_origin() {
        let (verts, _edges, n, _e) = gen(PolytopeKind::Simplex, 3);
        assert_eq!(n, 4);
        for a in 0..3 {
            assert_eq!(verts[a * n], 0.0);
        }
    }

    #[test]
    fn orthoplex_has_no_antipodal_edges() {
        let (_verts, edges, n, e) = gen(PolytopeKind::Orthoplex, 4);
        assert_eq!(n, 8);
        assert_eq!(e, 2 * 4 * 3);
        for i in 0..e {
            let (a, b) = (edges[i * 2] as usize, edges[i * 2 + 1] as usize);
            assert_ne!(a / 2, b / 2, "edge {a}-{b} connects antipodal vertices");
        }
    }

    #[test]
    fn short_buffer_yields_empty_result() {
        let dim = 4u32;
        let mut vdata = vec![0.0f32; 2]; // far too small
        let mut edata = vec![0u32; 2];
        let mut vb = VertexBufferMut::new(&mut vdata, dim as usize, 0).unwrap();
        let mut eb = EdgeBufferMut::new(&mut edata, 0).unwrap();
        let err = generate_polytope(PolytopeKind::Cube, dim, &mut vb, &mut eb).unwrap_err();
        assert_eq!(err, CoreError::ShortBuffer);
    }

    #[test]
    fn invalid_dimension_yields_empty_result() {
        assert_eq!(polytope_counts(PolytopeKind::Cube, 0), (0, 0));
        assert_eq!(polytope_counts(PolytopeKind::Cube, 32), (0, 0));
    }

    #[test]
    fn out_of_range_dimension_is_rejected_by_generate() {
        let dim = 0u32;
        let mut vdata = vec![0.0f32; 1];
        let mut edata = vec![0u32; 2];
        let mut vb = VertexBufferMut::new(&mut vdata, dim as usize, 1).unwrap();
        let mut eb = EdgeBufferMut::new(&mut edata, 1).unwrap();
        let err = generate_polytope(PolytopeKind::Cube, dim, &mut vb, &mut eb).unwrap_err();
        assert_eq!(err, CoreError::InvalidDimension);
    }
}
