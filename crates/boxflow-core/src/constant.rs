//! Numeric literals and constant folding.
//!
//! Integer arithmetic follows 32-bit wrapping semantics. Mixed integer/real
//! operands promote to real. Operations with no defined constant result
//! (integer division by zero, bitwise ops on reals, non-finite results)
//! fold to `None`.

use core::fmt;
use core::hash::{Hash, Hasher};

use crate::op::{BinaryOp, UnaryOp};

/// A real literal with bitwise equality, so it can be hashed and interned.
///
/// Two reals are equal iff their bit patterns are equal: `0.0` and `-0.0`
/// are distinct nodes, and a NaN equals itself.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Real(pub f64);

impl PartialEq for Real {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Real {}

impl Hash for Real {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl fmt::Display for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// A folded numeric constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Constant {
    /// 32-bit integer.
    Int(i32),
    /// Real number.
    Real(Real),
}

impl Constant {
    /// Returns the value as `f64`.
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(n) => f64::from(n),
            Self::Real(r) => r.0,
        }
    }

    /// Returns the value as an integer if it is one exactly.
    ///
    /// Reals with an integral value are accepted.
    pub fn as_int(self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(i64::from(n)),
            Self::Real(r) if r.0.is_finite() && r.0.fract() == 0.0 => Some(r.0 as i64),
            Self::Real(_) => None,
        }
    }

    /// Returns the value as a positive count, if it is one.
    pub fn as_count(self) -> Option<usize> {
        self.as_int()
            .filter(|&n| n > 0)
            .and_then(|n| usize::try_from(n).ok())
    }

    fn real(x: f64) -> Option<Self> {
        x.is_finite().then_some(Self::Real(Real(x)))
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Real(r) => write!(f, "{r}"),
        }
    }
}

/// Folds a binary operator over two constants.
pub fn fold_binary(op: BinaryOp, a: Constant, b: Constant) -> Option<Constant> {
    if op.is_comparison() {
        let (x, y) = (a.as_f64(), b.as_f64());
        let truth = match op {
            BinaryOp::Gt => x > y,
            BinaryOp::Lt => x < y,
            BinaryOp::Ge => x >= y,
            BinaryOp::Le => x <= y,
            BinaryOp::Eq => x == y,
            _ => x != y,
        };
        return Some(Constant::Int(i32::from(truth)));
    }

    match (a, b) {
        (Constant::Int(x), Constant::Int(y)) => fold_int(op, x, y),
        _ => fold_real(op, a.as_f64(), b.as_f64()),
    }
}

fn fold_int(op: BinaryOp, x: i32, y: i32) -> Option<Constant> {
    let n = match op {
        BinaryOp::Add => x.wrapping_add(y),
        BinaryOp::Sub => x.wrapping_sub(y),
        BinaryOp::Mul => x.wrapping_mul(y),
        BinaryOp::Div => x.checked_div(y)?,
        BinaryOp::Rem => x.checked_rem(y)?,
        BinaryOp::LeftShift => x.wrapping_shl(y as u32),
        BinaryOp::ARightShift => x.wrapping_shr(y as u32),
        BinaryOp::LRightShift => ((x as u32).wrapping_shr(y as u32)) as i32,
        BinaryOp::And => x & y,
        BinaryOp::Or => x | y,
        BinaryOp::Xor => x ^ y,
        BinaryOp::Min => x.min(y),
        BinaryOp::Max => x.max(y),
        _ => return fold_real(op, f64::from(x), f64::from(y)),
    };
    Some(Constant::Int(n))
}

fn fold_real(op: BinaryOp, x: f64, y: f64) -> Option<Constant> {
    let r = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => x / y,
        BinaryOp::Rem | BinaryOp::Fmod => x % y,
        BinaryOp::Pow => x.powf(y),
        BinaryOp::Min => x.min(y),
        BinaryOp::Max => x.max(y),
        BinaryOp::Remainder => x - (x / y).round_ties_even() * y,
        BinaryOp::Atan2 => x.atan2(y),
        _ => return None,
    };
    Constant::real(r)
}

/// Folds a unary math function over a constant. The result is always real.
pub fn fold_unary(op: UnaryOp, a: Constant) -> Option<Constant> {
    Constant::real(op.apply(a.as_f64()))
}

/// Integer cast: truncates toward zero, saturating at the `i32` range.
pub fn cast_int(a: Constant) -> Constant {
    match a {
        Constant::Int(_) => a,
        Constant::Real(r) => Constant::Int(r.0 as i32),
    }
}

/// Real cast.
pub fn cast_real(a: Constant) -> Constant {
    Constant::Real(Real(a.as_f64()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_arithmetic_wraps() {
        let r = fold_binary(BinaryOp::Add, Constant::Int(i32::MAX), Constant::Int(1));
        assert_eq!(r, Some(Constant::Int(i32::MIN)));
    }

    #[test]
    fn int_division_by_zero_is_not_constant() {
        assert_eq!(
            fold_binary(BinaryOp::Div, Constant::Int(3), Constant::Int(0)),
            None
        );
        assert_eq!(
            fold_binary(BinaryOp::Rem, Constant::Int(3), Constant::Int(0)),
            None
        );
    }

    #[test]
    fn mixed_operands_promote_to_real() {
        let r = fold_binary(BinaryOp::Mul, Constant::Int(2), Constant::Real(Real(0.5)));
        assert_eq!(r, Some(Constant::Real(Real(1.0))));
    }

    #[test]
    fn comparisons_yield_zero_or_one() {
        let r = fold_binary(BinaryOp::Lt, Constant::Int(1), Constant::Real(Real(1.5)));
        assert_eq!(r, Some(Constant::Int(1)));
        let r = fold_binary(BinaryOp::Eq, Constant::Int(2), Constant::Int(3));
        assert_eq!(r, Some(Constant::Int(0)));
    }

    #[test]
    fn bitwise_on_reals_does_not_fold() {
        let r = fold_binary(BinaryOp::And, Constant::Real(Real(1.0)), Constant::Int(1));
        assert_eq!(r, None);
    }

    #[test]
    fn as_count_accepts_integral_reals() {
        assert_eq!(Constant::Real(Real(3.0)).as_count(), Some(3));
        assert_eq!(Constant::Real(Real(3.5)).as_count(), None);
        assert_eq!(Constant::Int(0).as_count(), None);
        assert_eq!(Constant::Int(-2).as_count(), None);
    }

    #[test]
    fn real_equality_is_bitwise() {
        assert_ne!(Real(0.0), Real(-0.0));
        assert_eq!(Real(f64::NAN), Real(f64::NAN));
    }

    #[test]
    fn casts() {
        assert_eq!(cast_int(Constant::Real(Real(-2.7))), Constant::Int(-2));
        assert_eq!(cast_real(Constant::Int(4)), Constant::Real(Real(4.0)));
    }
}
