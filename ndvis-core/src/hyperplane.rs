//! Hyperplane distance, vertex classification, and edge slicing (§4.6).

use crate::buffers::{EdgeBuffer, VertexBuffer, VertexBufferMut};

const ON_PLANE_EPS: f32 = 1e-5;
const DEGENERATE_EDGE_EPS: f32 = 1e-5;

/// A hyperplane `{x : normal·x = offset}` (§3 Data model invariant: the
/// normal is non-zero in slicing mode; callers may normalize it first).
pub struct Hyperplane<'a> {
    pub normal: &'a [f32],
    pub offset: f32,
}

/// Signed distance of `point` (length `dim`) to the hyperplane.
pub fn signed_distance(point: &[f32], normal: &[f32], offset: f32) -> f32 {
    let dot: f32 = point.iter().zip(normal.iter()).map(|(p, n)| p * n).sum();
    dot - offset
}

/// Vertex classification relative to the plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Above,
    Below,
    On,
}

fn classify(distance: f32) -> Side {
    if distance.abs() < ON_PLANE_EPS {
        Side::On
    } else if distance > 0.0 {
        Side::Above
    } else {
        Side::Below
    }
}

/// Classify every vertex of `vertices` against `plane`, writing `+1`,
/// `-1`, or `0` into `out_class`. Returns the number of vertices
/// classified, or `0` if `out_class` is too small.
pub fn classify_vertices(vertices: VertexBuffer<'_>, plane: &Hyperplane<'_>, out_class: &mut [i8]) -> usize {
    let n = vertices.len();
    if out_class.len() < n {
        return 0;
    }
    let dim = vertices.dim();
    let mut point = vec![0.0f32; dim];
    for (v, slot) in out_class.iter_mut().enumerate().take(n) {
        vertices.vertex_into(v, &mut point);
        let d = signed_distance(&point, plane.normal, plane.offset);
        *slot = match classify(d) {
            Side::Above => 1,
            Side::Below => -1,
            Side::On => 0,
        };
    }
    n
}

/// One slice intersection: the original edge index and its interpolation
/// parameter along the edge (`u` at `t=0`, `v` at `t=1`).
#[derive(Clone, Copy, Debug)]
pub struct SliceHit {
    pub edge_index: u32,
    pub t: f32,
}

/// Intersect every edge of `(vertices, edges)` with `plane`, writing the
/// interpolated nD points into `out_points` (same SoA layout as
/// `vertices`, strided by `out_points`'s own vertex capacity) and the
/// originating edge index into `out_edge_indices`. Stops at capacity
/// (§4.6, §9: axis-major strided by output capacity, not intersection
/// count, so a partial fill stays readable).
pub fn slice_polytope(
    vertices: VertexBuffer<'_>,
    edges: EdgeBuffer<'_>,
    plane: &Hyperplane<'_>,
    out_points: &mut VertexBufferMut<'_>,
    out_edge_indices: &mut [u32],
) -> usize {
    let dim = vertices.dim();
    let cap = out_points.capacity().min(out_edge_indices.len());
    if cap == 0 {
        return 0;
    }

    let mut pu = vec![0.0f32; dim];
    let mut pv = vec![0.0f32; dim];
    let mut count = 0usize;

    for e in 0..edges.len() {
        if count >= cap {
            break;
        }
        let (u, v) = edges.pair(e);
        vertices.vertex_into(u as usize, &mut pu);
        vertices.vertex_into(v as usize, &mut pv);
        let d0 = signed_distance(&pu, plane.normal, plane.offset);
        let d1 = signed_distance(&pv, plane.normal, plane.offset);
        let on0 = d0.abs() < ON_PLANE_EPS;
        let on1 = d1.abs() < ON_PLANE_EPS;

        if on0 && on1 {
            continue; // degenerate: both endpoints on-plane, skip
        }
        let crosses = d0 * d1 < 0.0;
        if !crosses && !on0 && !on1 {
            continue;
        }

        let t = if (d0 - d1).abs() > DEGENERATE_EDGE_EPS {
            (d0 / (d0 - d1)).clamp(0.0, 1.0)
        } else if on0 {
            0.0
        } else {
            1.0
        };

        for a in 0..dim {
            let val = pu[a] + (pv[a] - pu[a]) * t;
            out_points.set(a, count, val);
        }
        out_edge_indices[count] = e as u32;
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::{EdgeBufferMut, VertexBufferMut};
    use crate::geometry::{generate_polytope, PolytopeKind};

    #[test]
    fn cube_slice_through_origin_yields_four_intersections() {
        let dim = 3u32;
        let (nv, ne) = crate::geometry::polytope_counts(PolytopeKind::Cube, dim);
        let mut vdata = vec![0.0f32; dim as usize * nv];
        let mut edata = vec![0u32; ne * 2];
        {
            let mut vb = VertexBufferMut::new(&mut vdata, dim as usize, nv).unwrap();
            let mut eb = EdgeBufferMut::new(&mut edata, ne).unwrap();
            generate_polytope(PolytopeKind::Cube, dim, &mut vb, &mut eb).unwrap();
        }
        let verts = VertexBuffer::new(&vdata, dim as usize, nv).unwrap();
        let edges = EdgeBuffer::new(&edata, ne).unwrap();
        let normal = [1.0f32, 0.0, 0.0];
        let plane = Hyperplane { normal: &normal, offset: 0.0 };

        let mut out_points_data = vec![0.0f32; dim as usize * 8];
        let mut out_edge_indices = vec![0u32; 8];
        let mut out_points = VertexBufferMut::new(&mut out_points_data, dim as usize, 8).unwrap();
        let count = slice_polytope(verts, edges, &plane, &mut out_points, &mut out_edge_indices);
        assert_eq!(count, 4);

        let view = out_points.as_const(out_points.capacity());
        for i in 0..count {
            assert!(view.coord(0, i).abs() < 1e-5);
            assert!((view.coord(1, i).abs() - 1.0).abs() < 1e-5);
            assert!((view.coord(2, i).abs() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn signed_distance_matches_plane_equation() {
        let normal = [0.0f32, 1.0, 0.0];
        let point = [3.0f32, 2.0, -1.0];
        assert!((signed_distance(&point, &normal, 1.0) - 1.0).abs() < 1e-6);
    }
}
