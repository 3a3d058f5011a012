//! Calculus engine: `Context`/`Program` lifecycle and mode dispatch
//! (§4.12, §3 Context/Program lifecycles).

use crate::ad;
use crate::bytecode::CompiledProgram;
use crate::compiler::compile as compile_ast;
use crate::error::{CalcError, Result};
use crate::fd;
use crate::parser::parse;
use crate::vm::Vm;

/// Automatic-differentiation mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdMode {
    /// Try forward AD; fall back to finite differences if AD signals a
    /// domain failure (e.g. `log` of zero at the evaluation point).
    Auto,
    /// Forward AD only; a domain failure propagates as an error.
    Forward,
    /// Always use finite differences.
    FiniteDiff,
}

/// Per-caller configuration handle: AD mode, FD epsilon, and the last
/// error message (§3 Data model). Concurrent access by multiple threads
/// is not supported (§5).
pub struct Context {
    mode: AdMode,
    fd_epsilon: f64,
    last_error: Option<String>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self { mode: AdMode::Auto, fd_epsilon: fd::DEFAULT_EPSILON, last_error: None }
    }

    pub fn set_ad_mode(&mut self, mode: AdMode) {
        self.mode = mode;
    }

    pub fn set_fd_epsilon(&mut self, epsilon: f64) {
        self.fd_epsilon = epsilon;
    }

    /// The last error message recorded by an operation on this context,
    /// retained until the next operation succeeds (§7).
    pub fn last_error_message(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.last_error = None,
            Err(e) => self.last_error = Some(e.to_string()),
        }
        result
    }

    /// Compile `expression` against the ordered `variable_names`. The new
    /// [`Program`] snapshots this context's current mode/epsilon as its
    /// defaults (§3: "at compile time a program snapshots the context
    /// defaults; per-program setters override afterwards").
    pub fn compile(&mut self, expression: &str, variable_names: &[String]) -> Result<Program> {
        let result = (|| {
            let ast = parse(expression, variable_names)?;
            let compiled = compile_ast(&ast, variable_names.len(), expression);
            if !compiled.is_well_formed() {
                return Err(CalcError::InvalidExpression(format!(
                    "compiled program for '{expression}' is not well-formed"
                )));
            }
            Ok(Program {
                compiled,
                mode: self.mode,
                fd_epsilon: self.fd_epsilon,
                vm: Vm::new(),
            })
        })();
        self.record(result)
    }
}

/// A compiled, immutable expression program plus its own mode/epsilon
/// configuration and a reusable VM stack (§5: one VM per thread).
pub struct Program {
    compiled: CompiledProgram,
    mode: AdMode,
    fd_epsilon: f64,
    vm: Vm,
}

impl Program {
    pub fn arity(&self) -> usize {
        self.compiled.arity
    }

    pub fn source(&self) -> &str {
        &self.compiled.source
    }

    pub fn set_ad_mode(&mut self, mode: AdMode) {
        self.mode = mode;
    }

    pub fn set_fd_epsilon(&mut self, epsilon: f64) {
        self.fd_epsilon = epsilon;
    }

    /// Evaluate the program at `inputs` (§4.9: raw VM evaluation; mode
    /// does not affect plain evaluation, only gradient/Hessian).
    pub fn eval(&mut self, ctx: &mut Context, inputs: &[f64]) -> Result<f64> {
        ctx.record(self.vm.eval(&self.compiled, inputs))
    }

    /// Batched evaluation; see [`Vm::eval_batch`] for partial-output
    /// semantics on failure.
    pub fn eval_batch(&mut self, ctx: &mut Context, inputs: &[&[f64]], out: &mut [f64]) -> Result<()> {
        ctx.record(self.vm.eval_batch(&self.compiled, inputs, out))
    }

    /// Gradient at `inputs`, dispatched per §4.12 mode semantics.
    pub fn gradient(&mut self, ctx: &mut Context, inputs: &[f64]) -> Result<Vec<f64>> {
        let result = match self.mode {
            AdMode::Forward => ad::gradient(&self.compiled, inputs),
            AdMode::FiniteDiff => fd::gradient(&mut self.vm, &self.compiled, inputs, self.fd_epsilon),
            AdMode::Auto => match ad::gradient(&self.compiled, inputs) {
                Ok(g) => Ok(g),
                Err(_) => {
                    log::debug!("AD gradient failed in Auto mode, falling back to finite differences");
                    fd::gradient(&mut self.vm, &self.compiled, inputs, self.fd_epsilon)
                }
            },
        };
        ctx.record(result)
    }

    /// Hessian at `inputs`, using the same mode dispatch as [`Self::gradient`].
    pub fn hessian(&mut self, ctx: &mut Context, inputs: &[f64]) -> Result<Vec<Vec<f64>>> {
        let result = match self.mode {
            AdMode::Forward => ad::hessian(&self.compiled, inputs, self.fd_epsilon),
            AdMode::FiniteDiff => fd::hessian(&mut self.vm, &self.compiled, inputs, self.fd_epsilon),
            AdMode::Auto => match ad::hessian(&self.compiled, inputs, self.fd_epsilon) {
                Ok(h) => Ok(h),
                Err(_) => {
                    log::debug!("AD hessian failed in Auto mode, falling back to finite differences");
                    fd::hessian(&mut self.vm, &self.compiled, inputs, self.fd_epsilon)
                }
            },
        };
        ctx.record(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn scenario_linear_sum() {
        let mut ctx = Context::new();
        let mut program = ctx.compile("x + y", &vars(&["x", "y"])).unwrap();
        assert_eq!(program.eval(&mut ctx, &[3.0, 4.0]).unwrap(), 7.0);
        let grad = program.gradient(&mut ctx, &[3.0, 4.0]).unwrap();
        assert!((grad[0] - 1.0).abs() < 1e-6);
        assert!((grad[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn scenario_sum_of_squares_gradient_and_hessian() {
        let mut ctx = Context::new();
        let mut program = ctx.compile("x^2 + y^2", &vars(&["x", "y"])).unwrap();
        assert_eq!(program.eval(&mut ctx, &[3.0, 4.0]).unwrap(), 25.0);
        let grad = program.gradient(&mut ctx, &[3.0, 4.0]).unwrap();
        assert!((grad[0] - 6.0).abs() < 1e-6);
        assert!((grad[1] - 8.0).abs() < 1e-6);
        let hess = program.hessian(&mut ctx, &[3.0, 4.0]).unwrap();
        assert!((hess[0][0] - 2.0).abs() < 1e-4);
        assert!((hess[1][1] - 2.0).abs() < 1e-4);
        assert!(hess[0][1].abs() < 1e-4);
    }

    #[test]
    fn auto_mode_falls_back_to_fd_on_domain_failure() {
        let mut ctx = Context::new();
        ctx.set_ad_mode(AdMode::Auto);
        // At x=0, AD must evaluate log(abs(sin(0))) = log(0), a domain
        // failure. The central-difference neighbors x=+h and x=-h both
        // land on log(abs(sin(±h))) ≈ log(h), which `abs` keeps positive
        // on both sides, so FD succeeds where AD cannot.
        let mut program = ctx.compile("log(abs(sin(x)))", &vars(&["x"])).unwrap();
        let grad = program.gradient(&mut ctx, &[0.0]).unwrap();
        assert!(grad[0].is_finite());
    }

    #[test]
    fn forward_mode_propagates_domain_errors() {
        let mut ctx = Context::new();
        ctx.set_ad_mode(AdMode::Forward);
        let mut program = ctx.compile("sqrt(x)", &vars(&["x"])).unwrap();
        let result = program.gradient(&mut ctx, &[-1.0]);
        assert!(result.is_err());
        assert!(ctx.last_error_message().is_some());
    }

    #[test]
    fn context_clears_error_after_success() {
        let mut ctx = Context::new();
        ctx.set_ad_mode(AdMode::Forward);
        let mut program = ctx.compile("sqrt(x)", &vars(&["x"])).unwrap();
        assert!(program.gradient(&mut ctx, &[-1.0]).is_err());
        assert!(ctx.last_error_message().is_some());
        assert!(program.gradient(&mut ctx, &[4.0]).is_ok());
        assert!(ctx.last_error_message().is_none());
    }

    #[test]
    fn ad_and_fd_agree_on_gradient() {
        let mut ctx = Context::new();
        ctx.set_ad_mode(AdMode::Forward);
        let mut program = ctx.compile("x^2 * sin(y)", &vars(&["x", "y"])).unwrap();
        let ad_grad = program.gradient(&mut ctx, &[1.3, 0.7]).unwrap();
        program.set_ad_mode(AdMode::FiniteDiff);
        let fd_grad = program.gradient(&mut ctx, &[1.3, 0.7]).unwrap();
        for (a, b) in ad_grad.iter().zip(fd_grad.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }
}
