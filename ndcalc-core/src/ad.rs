//! Automatic differentiation: bytecode reinterpreted over dual numbers
//! (§4.10).

use crate::bytecode::{CompiledProgram, Instruction};
use crate::dual::Dual;
use crate::error::{CalcError, Result};

pub const DEFAULT_HESSIAN_STEP: f64 = 1e-8;

fn step(stack: &mut Vec<Dual>, program: &CompiledProgram, instr: Instruction, inputs: &[Dual]) -> Result<()> {
    let pop = |stack: &mut Vec<Dual>| {
        stack.pop().ok_or_else(|| CalcError::Eval("stack underflow".into()))
    };
    match instr {
        Instruction::PushConst(i) => stack.push(Dual::constant(program.constants[i])),
        Instruction::LoadVar(i) => {
            let v = inputs
                .get(i)
                .ok_or_else(|| CalcError::Eval(format!("variable index {i} out of range")))?;
            stack.push(*v);
        }
        Instruction::Add => {
            let b = pop(stack)?;
            let a = pop(stack)?;
            stack.push(a + b);
        }
        Instruction::Sub => {
            let b = pop(stack)?;
            let a = pop(stack)?;
            stack.push(a - b);
        }
        Instruction::Mul => {
            let b = pop(stack)?;
            let a = pop(stack)?;
            stack.push(a * b);
        }
        Instruction::Div => {
            let b = pop(stack)?;
            let a = pop(stack)?;
            if b.v == 0.0 {
                return Err(CalcError::Eval("division by zero".into()));
            }
            stack.push(a / b);
        }
        Instruction::Pow => {
            let b = pop(stack)?;
            let a = pop(stack)?;
            stack.push(a.powd(b));
        }
        Instruction::Neg => {
            let a = pop(stack)?;
            stack.push(-a);
        }
        Instruction::Sin => {
            let a = pop(stack)?;
            stack.push(a.sin());
        }
        Instruction::Cos => {
            let a = pop(stack)?;
            stack.push(a.cos());
        }
        Instruction::Tan => {
            let a = pop(stack)?;
            stack.push(a.tan());
        }
        Instruction::Exp => {
            let a = pop(stack)?;
            stack.push(a.exp());
        }
        Instruction::Log => {
            let a = pop(stack)?;
            if a.v <= 0.0 {
                return Err(CalcError::Eval(format!("log of non-positive value {}", a.v)));
            }
            stack.push(a.log());
        }
        Instruction::Sqrt => {
            let a = pop(stack)?;
            if a.v < 0.0 {
                return Err(CalcError::Eval(format!("sqrt of negative value {}", a.v)));
            }
            stack.push(a.sqrt());
        }
        Instruction::Abs => {
            let a = pop(stack)?;
            stack.push(a.abs());
        }
        Instruction::Return => {}
    }
    Ok(())
}

/// Evaluate `program` over dual inputs, returning the result dual (value
/// and tangent under whatever seeding `inputs` carries).
pub fn eval_dual(program: &CompiledProgram, inputs: &[Dual]) -> Result<Dual> {
    let mut stack = Vec::with_capacity(8);
    for instr in &program.instructions {
        step(&mut stack, program, *instr, inputs)?;
    }
    stack.pop().ok_or_else(|| CalcError::Eval("stack underflow at return".into()))
}

/// Gradient via the seed sweep: for each variable `i`, evaluate with
/// tangent 1 on `i` and 0 elsewhere; the tangent of the result is
/// `∂f/∂xᵢ` (§4.10).
pub fn gradient(program: &CompiledProgram, point: &[f64]) -> Result<Vec<f64>> {
    let n = program.arity;
    let mut grad = vec![0.0; n];
    for (i, slot) in grad.iter_mut().enumerate() {
        let duals: Vec<Dual> = point
            .iter()
            .enumerate()
            .map(|(j, &x)| Dual::seed(x, if i == j { 1.0 } else { 0.0 }))
            .collect();
        *slot = eval_dual(program, &duals)?.d;
    }
    Ok(grad)
}

/// Hybrid Hessian: AD gradient at `x`, finite-differenced with step `h`
/// (§4.10). Not symmetrized automatically — callers that need exact
/// symmetry average `H[i][j]` and `H[j][i]` themselves (§8 tolerance is
/// 1e-4, which this hybrid scheme meets without post-processing).
pub fn hessian(program: &CompiledProgram, point: &[f64], h: f64) -> Result<Vec<Vec<f64>>> {
    let n = program.arity;
    let g0 = gradient(program, point)?;
    let mut hess = vec![vec![0.0; n]; n];
    for (i, row) in hess.iter_mut().enumerate() {
        let mut perturbed = point.to_vec();
        perturbed[i] += h;
        let gi = gradient(program, &perturbed)?;
        for (j, entry) in row.iter_mut().enumerate() {
            *entry = (gi[j] - g0[j]) / h;
        }
    }
    Ok(hess)
}
