//! Projection ℝⁿ → ℝ³ (§4.3): rotate each SoA vertex by the rotation
//! matrix, then dot with each of the three Basis3 columns.

use crate::buffers::VertexBuffer;

/// Three orthonormal basis vectors in ℝ^dim, stored as three contiguous
/// `dim`-long columns (§3 Data model).
pub struct Basis3<'a> {
    columns: &'a [f32],
    dim: usize,
}

impl<'a> Basis3<'a> {
    pub fn new(columns: &'a [f32], dim: usize) -> Option<Self> {
        if columns.len() < dim * 3 {
            return None;
        }
        Some(Self { columns, dim })
    }

    #[inline]
    fn component(&self, which: usize, axis: usize) -> f32 {
        self.columns[which * self.dim + axis]
    }
}

/// An owned `dim`×3 Basis3 table, for callers (PCA, tests) that need to
/// build one rather than borrow caller storage.
#[derive(Clone, Debug)]
pub struct Basis3Storage {
    data: Vec<f32>,
    dim: usize,
}

impl Basis3Storage {
    /// The canonical basis: column `c` is the unit vector along axis `c`
    /// (zero columns beyond `dim.min(3)`), per §4.5's `d < 3` rule.
    pub fn canonical(dim: usize) -> Self {
        let mut data = vec![0.0f32; dim * 3];
        for c in 0..dim.min(3) {
            data[c * dim + c] = 1.0;
        }
        Self { data, dim }
    }

    #[inline]
    pub fn get(&self, which: usize, axis: usize) -> f32 {
        self.data[which * self.dim + axis]
    }

    #[inline]
    pub fn set(&mut self, which: usize, axis: usize, value: f32) {
        self.data[which * self.dim + axis] = value;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_basis3(&self) -> Basis3<'_> {
        Basis3 { columns: &self.data, dim: self.dim }
    }
}

/// Project `vertices` (SoA, `dim`×`vertex_count`) through `rotation`
/// (row-major `dim`×`dim`, row stride `rotation_stride >= dim`) and
/// `basis3` into `out_positions`, an interleaved `vertex_count*3` buffer.
///
/// Writes nothing if any input is empty, `dim` is zero, or `out_positions`
/// is too small (§4.3 failure policy).
pub fn project_to_3d(
    vertices: VertexBuffer<'_>,
    rotation: &[f32],
    rotation_stride: usize,
    basis3: &Basis3<'_>,
    out_positions: &mut [f32],
) -> usize {
    let dim = vertices.dim();
    let n = vertices.len();
    if dim == 0 || n == 0 {
        return 0;
    }
    if rotation_stride < dim || rotation.len() < dim * rotation_stride {
        return 0;
    }
    if out_positions.len() < n * 3 {
        return 0;
    }

    let mut scratch = vec![0.0f32; dim];
    let mut rotated = vec![0.0f32; dim];
    for v in 0..n {
        vertices.vertex_into(v, &mut scratch);
        for r in 0..dim {
            let row = &rotation[r * rotation_stride..r * rotation_stride + dim];
            rotated[r] = row.iter().zip(scratch.iter()).map(|(m, x)| m * x).sum();
        }
        for c in 0..3 {
            let mut acc = 0.0f32;
            for (a, &ra) in rotated.iter().enumerate().take(dim) {
                acc += ra * basis3.component(c, a);
            }
            out_positions[v * 3 + c] = acc;
        }
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn identity_cube_projects_to_axis_aligned_positions() {
        let dim = 3;
        let n = 8;
        let mut vdata = vec![0.0f32; dim * n];
        for v in 0..n {
            for a in 0..dim {
                vdata[a * n + v] = if (v >> a) & 1 == 1 { 1.0 } else { -1.0 };
            }
        }
        let verts = VertexBuffer::new(&vdata, dim, n).unwrap();
        let rotation = identity_rotation(dim);
        let basis_data = canonical_basis3(dim);
        let basis = Basis3::new(&basis_data, dim).unwrap();
        let mut out = vec![0.0f32; n * 3];
        let written = project_to_3d(verts, &rotation, dim, &basis, &mut out);
        assert_eq!(written, n);
        for v in 0..n {
            for a in 0..dim {
                let expected = if (v >> a) & 1 == 1 { 1.0 } else { -1.0 };
                assert_eq!(out[v * 3 + a], expected);
            }
        }
    }

    #[test]
    fn short_output_buffer_writes_nothing() {
        let dim = 2;
        let n = 4;
        let vdata = vec![0.0f32; dim * n];
        let verts = VertexBuffer::new(&vdata, dim, n).unwrap();
        let rotation = identity_rotation(dim);
        let basis_data = canonical_basis3(dim);
        let basis = Basis3::new(&basis_data, dim).unwrap();
        let mut out = vec![0.0f32; 2]; // too small
        assert_eq!(project_to_3d(verts, &rotation, dim, &basis, &mut out), 0);
    }
}
