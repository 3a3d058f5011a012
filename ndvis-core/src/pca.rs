//! Principal component analysis on an SoA vertex set (§4.5).

use crate::buffers::VertexBuffer;
use crate::eigen::{jacobi_eigen, sort_eigenpairs, Matrix};
use crate::projection::Basis3Storage;

/// Compute the top-3 PCA basis (and optionally full eigenvalues) of
/// `vertices`. Returns `Some((basis, eigenvalues))`; `basis` is a
/// `dim`×3 column-major table suitable for [`crate::projection::Basis3`].
///
/// `vertices.len() == 0` yields the canonical identity basis and zero
/// eigenvalues (§4.5 degenerate case).
pub fn compute_pca(vertices: VertexBuffer<'_>) -> (Basis3Storage, Vec<f64>) {
    let dim = vertices.dim();
    let n = vertices.len();

    if n == 0 {
        return (Basis3Storage::canonical(dim), vec![0.0; dim]);
    }

    let mut mean = vec![0.0f64; dim];
    for v in 0..n {
        for (a, slot) in mean.iter_mut().enumerate() {
            *slot += vertices.coord(a, v) as f64;
        }
    }
    for m in mean.iter_mut() {
        *m /= n as f64;
    }

    let divisor = if n == 1 { 1.0 } else { (n - 1) as f64 };
    let mut cov = Matrix::zeros(dim);
    for v in 0..n {
        for i in 0..dim {
            let di = vertices.coord(i, v) as f64 - mean[i];
            for (j, &mj) in mean.iter().enumerate().take(i + 1) {
                let dj = vertices.coord(j, v) as f64 - mj;
                let prev = cov.get(i, j);
                cov.set(i, j, prev + di * dj);
            }
        }
    }
    for i in 0..dim {
        for j in 0..=i {
            let val = cov.get(i, j) / divisor;
            cov.set(i, j, val);
            cov.set(j, i, val);
        }
    }

    let mut result = jacobi_eigen(cov);
    sort_eigenpairs(&mut result);

    let eigenvalues: Vec<f64> = result.eigenvalues.iter().map(|v| v.max(0.0)).collect();

    let mut basis = Basis3Storage::canonical(dim);
    let top = dim.min(3);
    for c in 0..top {
        for a in 0..dim {
            basis.set(c, a, result.vectors.get(a, c) as f32);
        }
    }
    (basis, eigenvalues)
}
