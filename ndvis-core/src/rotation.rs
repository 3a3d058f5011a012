//! Plane rotation composition, orthogonality drift, and the Gram-Schmidt
//! re-orthonormalization stabilizer (§4.2).
//!
//! The rotation matrix is `n`×`n`, row-major, stored as a flat `&mut [f32]`
//! with `row*n + col` indexing (§3 Data model).

/// One Givens rotation in the `(i, j)` coordinate plane by angle `theta`.
#[derive(Clone, Copy, Debug)]
pub struct PlaneRotation {
    pub i: usize,
    pub j: usize,
    pub theta: f32,
}

/// Apply a single plane rotation in place to an `n`×`n` row-major matrix.
pub fn apply_plane_rotation(mat: &mut [f32], n: usize, rot: PlaneRotation) {
    let (c, s) = (rot.theta.cos(), rot.theta.sin());
    for r in 0..n {
        let idx_i = r * n + rot.i;
        let idx_j = r * n + rot.j;
        let mi = mat[idx_i];
        let mj = mat[idx_j];
        mat[idx_i] = c * mi - s * mj;
        mat[idx_j] = s * mi + c * mj;
    }
}

/// Apply a batch of plane rotations, composing strictly in list order
/// (§5 ordering guarantee).
pub fn apply_plane_rotations(mat: &mut [f32], n: usize, planes: &[PlaneRotation]) {
    for &rot in planes {
        apply_plane_rotation(mat, n, rot);
    }
}

/// Frobenius norm of `MᵀM − I`, the drift of `mat` from orthonormal.
pub fn orthogonality_drift(mat: &[f32], n: usize) -> f32 {
    let mut sum_sq = 0.0f64;
    for i in 0..n {
        for j in 0..n {
            let mut dot = 0.0f64;
            for r in 0..n {
                dot += mat[r * n + i] as f64 * mat[r * n + j] as f64;
            }
            let target = if i == j { 1.0 } else { 0.0 };
            let diff = dot - target;
            sum_sq += diff * diff;
        }
    }
    sum_sq.sqrt() as f32
}

/// Modified Gram-Schmidt re-orthonormalization of `mat`'s columns in
/// place. If a column collapses to (numeric) zero after subtracting its
/// projections, substitute the canonical unit vector `e_k` to preserve
/// rank, as §4.2 requires.
pub fn reorthonormalize(mat: &mut [f32], n: usize) {
    const ZERO_TOL: f32 = 1e-6;
    let mut col = vec![0.0f32; n];
    let mut done: Vec<Vec<f32>> = Vec::with_capacity(n);

    for k in 0..n {
        for r in 0..n {
            col[r] = mat[r * n + k];
        }
        for prev in &done {
            let dot: f32 = (0..n).map(|r| col[r] * prev[r]).sum();
            for r in 0..n {
                col[r] -= dot * prev[r];
            }
        }
        let norm = (col.iter().map(|v| v * v).sum::<f32>()).sqrt();
        if norm < ZERO_TOL {
            log::debug!("reorthonormalize: column {k} collapsed, substituting e_{k}");
            col.iter_mut().for_each(|v| *v = 0.0);
            col[k] = 1.0;
        } else {
            for v in col.iter_mut() {
                *v /= norm;
            }
        }
        for r in 0..n {
            mat[r * n + k] = col[r];
        }
        done.push(col.clone());
    }
}
