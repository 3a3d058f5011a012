//! Finite-difference fallback on raw VM evaluation (§4.11).

use crate::bytecode::CompiledProgram;
use crate::error::Result;
use crate::vm::Vm;

pub const DEFAULT_EPSILON: f64 = 1e-8;

/// Central-difference gradient: `∂f/∂xᵢ ≈ (f(x+hē_i) − f(x−hē_i))/(2h)`.
pub fn gradient(vm: &mut Vm, program: &CompiledProgram, point: &[f64], h: f64) -> Result<Vec<f64>> {
    let n = program.arity;
    let mut grad = vec![0.0; n];
    let mut plus = point.to_vec();
    let mut minus = point.to_vec();
    for (i, slot) in grad.iter_mut().enumerate() {
        plus[i] = point[i] + h;
        minus[i] = point[i] - h;
        let f_plus = vm.eval(program, &plus)?;
        let f_minus = vm.eval(program, &minus)?;
        *slot = (f_plus - f_minus) / (2.0 * h);
        plus[i] = point[i];
        minus[i] = point[i];
    }
    Ok(grad)
}

/// Second-order central-difference Hessian, explicitly symmetrized by
/// averaging `H[i][j]` and `H[j][i]` (§4.11).
pub fn hessian(vm: &mut Vm, program: &CompiledProgram, point: &[f64], h: f64) -> Result<Vec<Vec<f64>>> {
    let n = program.arity;
    let f0 = vm.eval(program, point)?;
    let mut hess = vec![vec![0.0; n]; n];

    for (i, row) in hess.iter_mut().enumerate() {
        let mut pp = point.to_vec();
        pp[i] += h;
        let mut pm = point.to_vec();
        pm[i] -= h;
        let f_plus = vm.eval(program, &pp)?;
        let f_minus = vm.eval(program, &pm)?;
        row[i] = (f_plus - 2.0 * f0 + f_minus) / (h * h);
    }

    for i in 0..n {
        for j in (i + 1)..n {
            let mut pp = point.to_vec();
            pp[i] += h;
            pp[j] += h;
            let mut pm = point.to_vec();
            pm[i] += h;
            pm[j] -= h;
            let mut mp = point.to_vec();
            mp[i] -= h;
            mp[j] += h;
            let mut mm = point.to_vec();
            mm[i] -= h;
            mm[j] -= h;

            let f_pp = vm.eval(program, &pp)?;
            let f_pm = vm.eval(program, &pm)?;
            let f_mp = vm.eval(program, &mp)?;
            let f_mm = vm.eval(program, &mm)?;
            let value = (f_pp - f_pm - f_mp + f_mm) / (4.0 * h * h);
            hess[i][j] = value;
            hess[j][i] = value; // symmetrize by construction + explicit mirror
        }
    }
    Ok(hess)
}
