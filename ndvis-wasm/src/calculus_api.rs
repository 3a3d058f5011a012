//! Opaque-handle calculus API (§6 "Calculus" entry points): `Context`s
//! and `Program`s live in thread-local slot arenas and are addressed by
//! `u32` handles across the FFI boundary, since neither wasm-bindgen nor
//! a C ABI can hand back a borrowed Rust reference.

use std::cell::RefCell;

use ndcalc_core::{AdMode, CalcError, Context, Program};

pub const INVALID_HANDLE: u32 = u32::MAX;

/// Shared alphabet from §6: `Ok, Parse, InvalidExpression, Eval,
/// OutOfMemory, InvalidDimension, NullPointer`.
pub const CALC_OK: u32 = 0;
pub const CALC_PARSE: u32 = 1;
pub const CALC_INVALID_EXPRESSION: u32 = 2;
pub const CALC_EVAL: u32 = 3;
pub const CALC_OUT_OF_MEMORY: u32 = 4;
pub const CALC_INVALID_DIMENSION: u32 = 5;
pub const CALC_NULL_POINTER: u32 = 6;

pub fn error_code(err: &CalcError) -> u32 {
    match err {
        CalcError::Parse { .. } => CALC_PARSE,
        CalcError::InvalidExpression(_) => CALC_INVALID_EXPRESSION,
        CalcError::Eval(_) => CALC_EVAL,
        CalcError::InvalidDimension(_) => CALC_INVALID_DIMENSION,
        CalcError::NullPointer => CALC_NULL_POINTER,
    }
}

/// A short, stable string for each code, for `error_string(code)` (§6).
pub fn error_string(code: u32) -> &'static str {
    match code {
        CALC_OK => "ok",
        CALC_PARSE => "parse error",
        CALC_INVALID_EXPRESSION => "invalid expression",
        CALC_EVAL => "evaluation error",
        CALC_OUT_OF_MEMORY => "out of memory",
        CALC_INVALID_DIMENSION => "invalid dimension",
        CALC_NULL_POINTER => "null pointer",
        _ => "unknown error code",
    }
}

thread_local! {
    static CONTEXTS: RefCell<Vec<Option<Context>>> = const { RefCell::new(Vec::new()) };
    static PROGRAMS: RefCell<Vec<Option<Program>>> = const { RefCell::new(Vec::new()) };
}

fn insert<T>(slots: &RefCell<Vec<Option<T>>>, value: T) -> u32 {
    let mut slots = slots.borrow_mut();
    for (i, slot) in slots.iter_mut().enumerate() {
        if slot.is_none() {
            *slot = Some(value);
            return i as u32;
        }
    }
    slots.push(Some(value));
    (slots.len() - 1) as u32
}

fn ad_mode_from_u32(mode: u32) -> Option<AdMode> {
    match mode {
        0 => Some(AdMode::Auto),
        1 => Some(AdMode::Forward),
        2 => Some(AdMode::FiniteDiff),
        _ => None,
    }
}

pub fn context_create() -> u32 {
    CONTEXTS.with(|c| insert(c, Context::new()))
}

pub fn context_destroy(handle: u32) {
    CONTEXTS.with(|c| {
        if let Some(slot) = c.borrow_mut().get_mut(handle as usize) {
            *slot = None;
        }
    });
}

pub fn set_ad_mode(ctx_handle: u32, mode: u32) -> bool {
    let Some(mode) = ad_mode_from_u32(mode) else { return false };
    CONTEXTS.with(|c| match c.borrow_mut().get_mut(ctx_handle as usize) {
        Some(Some(ctx)) => {
            ctx.set_ad_mode(mode);
            true
        }
        _ => false,
    })
}

pub fn set_fd_epsilon(ctx_handle: u32, epsilon: f64) -> bool {
    CONTEXTS.with(|c| match c.borrow_mut().get_mut(ctx_handle as usize) {
        Some(Some(ctx)) => {
            ctx.set_fd_epsilon(epsilon);
            true
        }
        _ => false,
    })
}

pub fn last_error_message(ctx_handle: u32) -> Option<String> {
    CONTEXTS.with(|c| match c.borrow().get(ctx_handle as usize) {
        Some(Some(ctx)) => ctx.last_error_message().map(str::to_string),
        _ => None,
    })
}

/// Compile `expression` over `var_names`, returning a new program handle
/// or `INVALID_HANDLE` on failure (check `last_error_message` for why).
pub fn compile(ctx_handle: u32, expression: &str, var_names: &[String]) -> u32 {
    let program = CONTEXTS.with(|c| {
        let mut contexts = c.borrow_mut();
        let ctx = contexts.get_mut(ctx_handle as usize)?.as_mut()?;
        ctx.compile(expression, var_names).ok()
    });
    match program {
        Some(p) => PROGRAMS.with(|p_slots| insert(p_slots, p)),
        None => INVALID_HANDLE,
    }
}

pub fn program_destroy(handle: u32) {
    PROGRAMS.with(|p| {
        if let Some(slot) = p.borrow_mut().get_mut(handle as usize) {
            *slot = None;
        }
    });
}

pub fn program_set_ad_mode(program_handle: u32, mode: u32) -> bool {
    let Some(mode) = ad_mode_from_u32(mode) else { return false };
    PROGRAMS.with(|p| match p.borrow_mut().get_mut(program_handle as usize) {
        Some(Some(program)) => {
            program.set_ad_mode(mode);
            true
        }
        _ => false,
    })
}

pub fn program_set_fd_epsilon(program_handle: u32, epsilon: f64) -> bool {
    PROGRAMS.with(|p| match p.borrow_mut().get_mut(program_handle as usize) {
        Some(Some(program)) => {
            program.set_fd_epsilon(epsilon);
            true
        }
        _ => false,
    })
}

pub fn program_arity(program_handle: u32) -> Option<usize> {
    PROGRAMS.with(|p| match p.borrow().get(program_handle as usize) {
        Some(Some(program)) => Some(program.arity()),
        _ => None,
    })
}

/// Evaluate `program_handle` at `inputs`, recording any error on
/// `ctx_handle`. Returns `None` if either handle is stale/invalid.
pub fn eval(ctx_handle: u32, program_handle: u32, inputs: &[f64]) -> Option<f64> {
    with_ctx_and_program(ctx_handle, program_handle, |ctx, program| program.eval(ctx, inputs).ok()).flatten()
}

/// Batched evaluation; `inputs` is `program.arity()` contiguous arrays
/// of length `out.len()`, each `inputs[i*point_count..(i+1)*point_count]`.
pub fn eval_batch(ctx_handle: u32, program_handle: u32, inputs: &[f64], out: &mut [f64]) -> bool {
    with_ctx_and_program(ctx_handle, program_handle, |ctx, program| {
        let point_count = out.len();
        let arity = program.arity();
        if inputs.len() < arity * point_count {
            return false;
        }
        let arrays: Vec<&[f64]> = (0..arity).map(|i| &inputs[i * point_count..(i + 1) * point_count]).collect();
        program.eval_batch(ctx, &arrays, out).is_ok()
    })
    .unwrap_or(false)
}

pub fn gradient(ctx_handle: u32, program_handle: u32, inputs: &[f64]) -> Option<Vec<f64>> {
    with_ctx_and_program(ctx_handle, program_handle, |ctx, program| program.gradient(ctx, inputs).ok()).flatten()
}

/// Hessian flattened row-major, `arity * arity` entries.
pub fn hessian(ctx_handle: u32, program_handle: u32, inputs: &[f64]) -> Option<Vec<f64>> {
    with_ctx_and_program(ctx_handle, program_handle, |ctx, program| {
        program.hessian(ctx, inputs).ok().map(|rows| rows.into_iter().flatten().collect())
    })
    .flatten()
}

fn with_ctx_and_program<T>(ctx_handle: u32, program_handle: u32, f: impl FnOnce(&mut Context, &mut Program) -> T) -> Option<T> {
    CONTEXTS.with(|c| {
        PROGRAMS.with(|p| {
            let mut contexts = c.borrow_mut();
            let mut programs = p.borrow_mut();
            let ctx = contexts.get_mut(ctx_handle as usize)?.as_mut()?;
            let program = programs.get_mut(program_handle as usize)?.as_mut()?;
            Some(f(ctx, program))
        })
    })
}
