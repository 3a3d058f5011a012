//! Forward-mode dual numbers `(value, tangent)` (§4.10, §9: "a plain
//! value type with two fields ... derive arithmetic via operator
//! traits").

use std::ops::{Add, Div, Mul, Neg, Sub};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dual {
    pub v: f64,
    pub d: f64,
}

impl Dual {
    pub fn constant(v: f64) -> Self {
        Self { v, d: 0.0 }
    }

    pub fn seed(v: f64, d: f64) -> Self {
        Self { v, d }
    }

    pub fn sin(self) -> Self {
        Self { v: self.v.sin(), d: self.d * self.v.cos() }
    }

    pub fn cos(self) -> Self {
        Self { v: self.v.cos(), d: -self.d * self.v.sin() }
    }

    pub fn tan(self) -> Self {
        let c = self.v.cos();
        Self { v: self.v.tan(), d: self.d / (c * c) }
    }

    pub fn exp(self) -> Self {
        let e = self.v.exp();
        Self { v: e, d: self.d * e }
    }

    /// Natural log; caller must ensure `self.v > 0` (checked by the VM's
    /// domain guard before AD ever sees it, §4.9/§4.10).
    pub fn log(self) -> Self {
        Self { v: self.v.ln(), d: self.d / self.v }
    }

    /// Square root; caller must ensure `self.v >= 0`.
    pub fn sqrt(self) -> Self {
        let s = self.v.sqrt();
        Self { v: s, d: self.d / (2.0 * s) }
    }

    pub fn abs(self) -> Self {
        let sign = if self.v >= 0.0 { 1.0 } else { -1.0 };
        Self { v: self.v.abs(), d: self.d * sign }
    }

    /// `pow(a, b)` for two duals: `(aᵥ^bᵥ, aᵥ^bᵥ · (bₐ·ln aᵥ + bᵥ·aₐ/aᵥ))`.
    /// When `b` is a constant (`bd == 0`) this reduces to the ordinary
    /// power rule and tolerates `aᵥ <= 0` the way `f64::powf` does.
    pub fn powd(self, other: Dual) -> Self {
        let value = self.v.powf(other.v);
        if other.d == 0.0 {
            let deriv = other.v * self.v.powf(other.v - 1.0) * self.d;
            return Self { v: value, d: deriv };
        }
        let deriv = value * (other.d * self.v.ln() + other.v * self.d / self.v);
        Self { v: value, d: deriv }
    }
}

impl Add for Dual {
    type Output = Dual;
    fn add(self, rhs: Dual) -> Dual {
        Dual { v: self.v + rhs.v, d: self.d + rhs.d }
    }
}

impl Sub for Dual {
    type Output = Dual;
    fn sub(self, rhs: Dual) -> Dual {
        Dual { v: self.v - rhs.v, d: self.d - rhs.d }
    }
}

impl Mul for Dual {
    type Output = Dual;
    fn mul(self, rhs: Dual) -> Dual {
        Dual { v: self.v * rhs.v, d: self.d * rhs.v + self.v * rhs.d }
    }
}

impl Div for Dual {
    type Output = Dual;
    fn div(self, rhs: Dual) -> Dual {
        Dual {
            v: self.v / rhs.v,
            d: (self.d * rhs.v - self.v * rhs.d) / (rhs.v * rhs.v),
        }
    }
}

impl Neg for Dual {
    type Output = Dual;
    fn neg(self) -> Dual {
        Dual { v: -self.v, d: -self.d }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_rule_matches_hand_derivative() {
        // d/dx[x * x^2] at x=3 is 3x^2 = 27.
        let x = Dual::seed(3.0, 1.0);
        let result = x * (x * x);
        assert!((result.v - 27.0).abs() < 1e-10);
        assert!((result.d - 27.0).abs() < 1e-10);
    }

    #[test]
    fn sin_cos_identity_on_tangent() {
        let x = Dual::seed(0.6, 1.0);
        let s = x.sin();
        let c = x.cos();
        assert!((s.v * s.v + c.v * c.v - 1.0).abs() < 1e-10);
        assert!((s.d - c.v).abs() < 1e-10);
    }
}
