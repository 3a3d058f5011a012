//! Recursive-descent parser for the expression language (§4.7).
//!
//! Precedence, low to high: `expression` (`+ -`, left-assoc) → `term`
//! (`* /`, left-assoc) → `unary` (prefix `+ -`) → `factor` (`^`,
//! **right**-assoc, binds tighter than unary minus so `-2^2 = -(2^2)`)
//! → `primary` (number, variable, function call, parenthesized
//! expression).

use crate::error::{CalcError, Result};
use crate::lexer::{tokenize, Token, TokenKind};

pub const DEFAULT_MAX_DEPTH: usize = 100;

/// A reserved function name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Exp,
    Log,
    Sqrt,
    Abs,
    Pow,
}

impl Func {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "exp" => Func::Exp,
            "log" => Func::Log,
            "sqrt" => Func::Sqrt,
            "abs" => Func::Abs,
            "pow" => Func::Pow,
            _ => return None,
        })
    }

    fn arity(self) -> usize {
        match self {
            Func::Pow => 2,
            _ => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Exp => "exp",
            Func::Log => "log",
            Func::Sqrt => "sqrt",
            Func::Abs => "abs",
            Func::Pow => "pow",
        }
    }
}

/// Parsed expression tree.
#[derive(Clone, Debug)]
pub enum Expr {
    Const(f64),
    Var(usize),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Call(Func, Vec<Expr>),
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    variables: &'a [String],
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(CalcError::Parse {
                offset: self.peek().offset,
                message: format!("expression nesting exceeds max depth {}", self.max_depth),
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<()> {
        if &self.peek().kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(CalcError::Parse {
                offset: self.peek().offset,
                message: format!("expected {what}"),
            })
        }
    }

    fn parse_expression(&mut self) -> Result<Expr> {
        self.enter()?;
        let mut lhs = self.parse_term()?;
        loop {
            match self.peek().kind {
                TokenKind::Plus => {
                    self.advance();
                    let rhs = self.parse_term()?;
                    lhs = Expr::Add(Box::new(lhs), Box::new(rhs));
                }
                TokenKind::Minus => {
                    self.advance();
                    let rhs = self.parse_term()?;
                    lhs = Expr::Sub(Box::new(lhs), Box::new(rhs));
                }
                _ => break,
            }
        }
        self.leave();
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr> {
        self.enter()?;
        let mut lhs = self.parse_unary()?;
        loop {
            match self.peek().kind {
                TokenKind::Star => {
                    self.advance();
                    let rhs = self.parse_unary()?;
                    lhs = Expr::Mul(Box::new(lhs), Box::new(rhs));
                }
                TokenKind::Slash => {
                    self.advance();
                    let rhs = self.parse_unary()?;
                    lhs = Expr::Div(Box::new(lhs), Box::new(rhs));
                }
                _ => break,
            }
        }
        self.leave();
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        self.enter()?;
        let result = match self.peek().kind {
            TokenKind::Plus => {
                self.advance();
                self.parse_unary()?
            }
            TokenKind::Minus => {
                self.advance();
                Expr::Neg(Box::new(self.parse_unary()?))
            }
            _ => self.parse_factor()?,
        };
        self.leave();
        Ok(result)
    }

    /// `^`, right-associative, binding tighter than unary minus: the
    /// exponent is parsed via [`Self::parse_unary`] so `2^-2` still
    /// works, but a leading sign on the base is handled by the caller.
    fn parse_factor(&mut self) -> Result<Expr> {
        self.enter()?;
        let base = self.parse_primary()?;
        let result = if self.peek().kind == TokenKind::Caret {
            self.advance();
            let rhs = self.parse_unary()?;
            Expr::Pow(Box::new(base), Box::new(rhs))
        } else {
            base
        };
        self.leave();
        Ok(result)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        self.enter()?;
        let tok = self.peek().clone();
        let result = match tok.kind {
            TokenKind::Number(v) => {
                self.advance();
                Expr::Const(v)
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RParen, "closing parenthesis")?;
                inner
            }
            TokenKind::Ident(ref name) => {
                self.advance();
                if let Some(func) = Func::from_name(name) {
                    self.expect(&TokenKind::LParen, "'(' after function name")?;
                    let mut args = vec![self.parse_expression()?];
                    while self.peek().kind == TokenKind::Comma {
                        self.advance();
                        args.push(self.parse_expression()?);
                    }
                    self.expect(&TokenKind::RParen, "closing parenthesis")?;
                    if args.len() != func.arity() {
                        return Err(CalcError::Parse {
                            offset: tok.offset,
                            message: format!(
                                "function '{}' expects {} argument(s), got {}",
                                func.name(),
                                func.arity(),
                                args.len()
                            ),
                        });
                    }
                    Expr::Call(func, args)
                } else if let Some(idx) = self.variables.iter().position(|v| v == name) {
                    Expr::Var(idx)
                } else {
                    return Err(CalcError::Parse {
                        offset: tok.offset,
                        message: format!("unknown identifier '{name}'"),
                    });
                }
            }
            _ => {
                return Err(CalcError::Parse {
                    offset: tok.offset,
                    message: "unexpected token".to_string(),
                });
            }
        };
        self.leave();
        Ok(result)
    }
}

/// Parse `source` against the ordered `variables` list. Variable matches
/// are case-sensitive and taken verbatim from the caller-supplied list.
pub fn parse(source: &str, variables: &[String]) -> Result<Expr> {
    parse_with_depth(source, variables, DEFAULT_MAX_DEPTH)
}

/// Same as [`parse`] with an explicit recursion depth cap.
pub fn parse_with_depth(source: &str, variables: &[String], max_depth: usize) -> Result<Expr> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        variables,
        depth: 0,
        max_depth,
    };
    let expr = parser.parse_expression()?;
    if parser.peek().kind != TokenKind::End {
        return Err(CalcError::Parse {
            offset: parser.peek().offset,
            message: "trailing input after expression".to_string(),
        });
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn caret_is_right_associative() {
        // 2^3^2 = 2^(3^2) = 512; verified via the VM in vm.rs tests too.
        let expr = parse("2^3^2", &vars(&[])).unwrap();
        match expr {
            Expr::Pow(base, exp) => {
                assert!(matches!(*base, Expr::Const(v) if v == 2.0));
                assert!(matches!(*exp, Expr::Pow(_, _)));
            }
            _ => panic!("expected Pow"),
        }
    }

    #[test]
    fn rejects_unknown_identifier() {
        let err = parse("x + 1", &vars(&[])).unwrap_err();
        assert!(matches!(err, CalcError::Parse { .. }));
    }

    #[test]
    fn depth_cap_triggers_on_deep_nesting() {
        let deep = "(".repeat(200) + "1" + &")".repeat(200);
        let err = parse_with_depth(&deep, &vars(&[]), 50).unwrap_err();
        assert!(matches!(err, CalcError::Parse { .. }));
    }

    #[test]
    fn missing_closing_paren_fails() {
        let err = parse("(1 + 2", &vars(&[])).unwrap_err();
        assert!(matches!(err, CalcError::Parse { .. }));
    }

    #[test]
    fn function_arity_mismatch_fails() {
        let err = parse("sin(1, 2)", &vars(&[])).unwrap_err();
        assert!(matches!(err, CalcError::Parse { .. }));
    }
}
