//! Deterministic stack interpreter over `f64` (§4.9).
//!
//! One [`Vm`] per thread holds a reusable stack; evaluating many points
//! with the same `Vm` avoids reallocating it each call (§5).

use crate::bytecode::{CompiledProgram, Instruction};
use crate::error::{CalcError, Result};

#[derive(Default)]
pub struct Vm {
    stack: Vec<f64>,
}

impl Vm {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    /// Evaluate `program` against `inputs` (length `>= program.arity`).
    pub fn eval(&mut self, program: &CompiledProgram, inputs: &[f64]) -> Result<f64> {
        self.stack.clear();
        for instr in &program.instructions {
            self.step(program, *instr, inputs)?;
        }
        self.stack.pop().ok_or_else(|| CalcError::Eval("stack underflow at return".into()))
    }

    /// Evaluate `program` once per point over `k = program.arity` input
    /// arrays, each of length `point_count`, writing results into `out`
    /// (also length `point_count`). A failure at any point aborts the
    /// batch and returns that error; entries before the failing point
    /// may already be written (§4.9 batch semantics).
    pub fn eval_batch(&mut self, program: &CompiledProgram, inputs: &[&[f64]], out: &mut [f64]) -> Result<()> {
        let point_count = out.len();
        let mut point = vec![0.0f64; program.arity];
        for p in 0..point_count {
            for (i, arr) in inputs.iter().enumerate().take(program.arity) {
                point[i] = arr[p];
            }
            out[p] = self.eval(program, &point)?;
        }
        Ok(())
    }

    fn pop(&mut self) -> Result<f64> {
        self.stack.pop().ok_or_else(|| CalcError::Eval("stack underflow".into()))
    }

    fn step(&mut self, program: &CompiledProgram, instr: Instruction, inputs: &[f64]) -> Result<()> {
        match instr {
            Instruction::PushConst(i) => self.stack.push(program.constants[i]),
            Instruction::LoadVar(i) => {
                let v = inputs
                    .get(i)
                    .ok_or_else(|| CalcError::Eval(format!("variable index {i} out of range")))?;
                self.stack.push(*v);
            }
            Instruction::Add => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(a + b);
            }
            Instruction::Sub => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(a - b);
            }
            Instruction::Mul => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(a * b);
            }
            Instruction::Div => {
                let b = self.pop()?;
                let a = self.pop()?;
                if b == 0.0 {
                    return Err(CalcError::Eval("division by zero".into()));
                }
                self.stack.push(a / b);
            }
            Instruction::Pow => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(a.powf(b));
            }
            Instruction::Neg => {
                let a = self.pop()?;
                self.stack.push(-a);
            }
            Instruction::Sin => {
                let a = self.pop()?;
                self.stack.push(a.sin());
            }
            Instruction::Cos => {
                let a = self.pop()?;
                self.stack.push(a.cos());
            }
            Instruction::Tan => {
                let a = self.pop()?;
                self.stack.push(a.tan());
            }
            Instruction::Exp => {
                let a = self.pop()?;
                self.stack.push(a.exp());
            }
            Instruction::Log => {
                let a = self.pop()?;
                if a <= 0.0 {
                    return Err(CalcError::Eval(format!("log of non-positive value {a}")));
                }
                self.stack.push(a.ln());
            }
            Instruction::Sqrt => {
                let a = self.pop()?;
                if a < 0.0 {
                    return Err(CalcError::Eval(format!("sqrt of negative value {a}")));
                }
                self.stack.push(a.sqrt());
            }
            Instruction::Abs => {
                let a = self.pop()?;
                self.stack.push(a.abs());
            }
            Instruction::Return => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::parser::parse;

    fn eval_str(src: &str, vars: &[&str], inputs: &[f64]) -> Result<f64> {
        let vars: Vec<String> = vars.iter().map(|s| s.to_string()).collect();
        let expr = parse(src, &vars).map_err(|e| CalcError::Eval(format!("{e:?}")))?;
        let program = compile(&expr, vars.len(), src);
        Vm::new().eval(&program, inputs)
    }

    #[test]
    fn simple_addition() {
        assert_eq!(eval_str("x + y", &["x", "y"], &[3.0, 4.0]).unwrap(), 7.0);
    }

    #[test]
    fn precedence_scenarios_from_testable_properties() {
        assert!((eval_str("2^3^2", &[], &[]).unwrap() - 512.0).abs() < 1e-9);
        // `^` binds tighter than unary minus: -2^2 = -(2^2) = -4.
        assert!((eval_str("-2^2", &[], &[]).unwrap() - (-4.0)).abs() < 1e-9);
        assert!((eval_str("2 + 3*4^2", &[], &[]).unwrap() - 50.0).abs() < 1e-9);
        assert!((eval_str("2*3/4", &[], &[]).unwrap() - 1.5).abs() < 1e-9);
        assert!((eval_str("2 + 3 - 1", &[], &[]).unwrap() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn division_by_zero_fails() {
        assert!(eval_str("1/0", &[], &[]).is_err());
    }

    #[test]
    fn log_of_negative_fails() {
        assert!(eval_str("log(-1)", &[], &[]).is_err());
    }

    #[test]
    fn sqrt_of_negative_fails() {
        assert!(eval_str("sqrt(-4)", &[], &[]).is_err());
    }

    #[test]
    fn batch_aborts_on_first_failure() {
        let vars = vec!["x".to_string()];
        let expr = parse("1/x", &vars).unwrap();
        let program = compile(&expr, 1, "1/x");
        let xs = [1.0, 2.0, 0.0, 4.0];
        let mut out = vec![0.0; 4];
        let mut vm = Vm::new();
        let result = vm.eval_batch(&program, &[&xs], &mut out);
        assert!(result.is_err());
        assert_eq!(out[0], 1.0);
        assert_eq!(out[1], 0.5);
    }
}
