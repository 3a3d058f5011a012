//! AST → bytecode compiler (§4.8): a left-to-right Reverse-Polish
//! translation of the parsed expression tree.

use crate::bytecode::{CompiledProgram, Instruction};
use crate::parser::{Expr, Func};

struct Compiler {
    instructions: Vec<Instruction>,
    constants: Vec<f64>,
}

impl Compiler {
    fn push_const(&mut self, v: f64) {
        let idx = self.constants.len();
        self.constants.push(v);
        self.instructions.push(Instruction::PushConst(idx));
    }

    fn emit(&mut self, expr: &Expr) {
        match expr {
            Expr::Const(v) => self.push_const(*v),
            Expr::Var(i) => self.instructions.push(Instruction::LoadVar(*i)),
            Expr::Neg(inner) => {
                self.emit(inner);
                self.instructions.push(Instruction::Neg);
            }
            Expr::Add(a, b) => self.emit_binary(a, b, Instruction::Add),
            Expr::Sub(a, b) => self.emit_binary(a, b, Instruction::Sub),
            Expr::Mul(a, b) => self.emit_binary(a, b, Instruction::Mul),
            Expr::Div(a, b) => self.emit_binary(a, b, Instruction::Div),
            Expr::Pow(a, b) => self.emit_binary(a, b, Instruction::Pow),
            Expr::Call(func, args) => {
                for arg in args {
                    self.emit(arg);
                }
                self.instructions.push(match func {
                    Func::Sin => Instruction::Sin,
                    Func::Cos => Instruction::Cos,
                    Func::Tan => Instruction::Tan,
                    Func::Exp => Instruction::Exp,
                    Func::Log => Instruction::Log,
                    Func::Sqrt => Instruction::Sqrt,
                    Func::Abs => Instruction::Abs,
                    Func::Pow => Instruction::Pow,
                });
            }
        }
    }

    fn emit_binary(&mut self, a: &Expr, b: &Expr, op: Instruction) {
        self.emit(a);
        self.emit(b);
        self.instructions.push(op);
    }
}

/// Compile a parsed expression into a [`CompiledProgram`] with declared
/// variable `arity` and `source` retained for error reporting.
pub fn compile(expr: &Expr, arity: usize, source: &str) -> CompiledProgram {
    let mut compiler = Compiler { instructions: Vec::new(), constants: Vec::new() };
    compiler.emit(expr);
    compiler.instructions.push(Instruction::Return);
    CompiledProgram {
        instructions: compiler.instructions,
        constants: compiler.constants,
        arity,
        source: source.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn compiles_to_well_formed_program() {
        let vars = vec!["x".to_string(), "y".to_string()];
        let expr = parse("x + y * 2", &vars).unwrap();
        let program = compile(&expr, vars.len(), "x + y * 2");
        assert!(program.is_well_formed());
        assert_eq!(program.instructions.last(), Some(&Instruction::Return));
    }
}
