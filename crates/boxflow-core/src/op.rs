//! Operator tags shared by boxes and signals.

use core::fmt;

/// Binary primitive operators (2 inputs, 1 output).
///
/// Covers the arithmetic, shift, comparison and bitwise set plus the
/// extended math functions (`pow`, `min`, `max`, `fmod`, `remainder`,
/// `atan2`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryOp {
    /// `x + y`
    Add,
    /// `x - y`
    Sub,
    /// `x * y`
    Mul,
    /// `x / y`
    Div,
    /// Integer remainder `x % y`.
    Rem,
    /// `x << y`
    LeftShift,
    /// Arithmetic right shift.
    ARightShift,
    /// Logical right shift.
    LRightShift,
    /// `x > y`
    Gt,
    /// `x < y`
    Lt,
    /// `x >= y`
    Ge,
    /// `x <= y`
    Le,
    /// `x == y`
    Eq,
    /// `x != y`
    Ne,
    /// Bitwise and.
    And,
    /// Bitwise or.
    Or,
    /// Bitwise xor.
    Xor,
    /// `pow(x, y)`
    Pow,
    /// `min(x, y)`
    Min,
    /// `max(x, y)`
    Max,
    /// `fmod(x, y)`
    Fmod,
    /// IEEE `remainder(x, y)`.
    Remainder,
    /// `atan2(x, y)`
    Atan2,
}

impl BinaryOp {
    /// Every binary operator, in declaration order.
    pub const ALL: [Self; 23] = [
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Rem,
        Self::LeftShift,
        Self::ARightShift,
        Self::LRightShift,
        Self::Gt,
        Self::Lt,
        Self::Ge,
        Self::Le,
        Self::Eq,
        Self::Ne,
        Self::And,
        Self::Or,
        Self::Xor,
        Self::Pow,
        Self::Min,
        Self::Max,
        Self::Fmod,
        Self::Remainder,
        Self::Atan2,
    ];

    /// Short lowercase name used in diagnostics and signal rendering.
    pub fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Rem => "rem",
            Self::LeftShift => "lsh",
            Self::ARightShift => "arsh",
            Self::LRightShift => "lrsh",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Ge => "ge",
            Self::Le => "le",
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Pow => "pow",
            Self::Min => "min",
            Self::Max => "max",
            Self::Fmod => "fmod",
            Self::Remainder => "remainder",
            Self::Atan2 => "atan2",
        }
    }

    /// Returns `true` for comparison operators (result is 0 or 1).
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Gt | Self::Lt | Self::Ge | Self::Le | Self::Eq | Self::Ne
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unary math functions (1 input, 1 output).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum UnaryOp {
    Abs,
    Acos,
    Asin,
    Atan,
    Ceil,
    Cos,
    Exp,
    Exp10,
    Floor,
    Log,
    Log10,
    Rint,
    Sin,
    Sqrt,
    Tan,
}

impl UnaryOp {
    /// Short lowercase name used in diagnostics and signal rendering.
    pub fn name(self) -> &'static str {
        match self {
            Self::Abs => "abs",
            Self::Acos => "acos",
            Self::Asin => "asin",
            Self::Atan => "atan",
            Self::Ceil => "ceil",
            Self::Cos => "cos",
            Self::Exp => "exp",
            Self::Exp10 => "exp10",
            Self::Floor => "floor",
            Self::Log => "log",
            Self::Log10 => "log10",
            Self::Rint => "rint",
            Self::Sin => "sin",
            Self::Sqrt => "sqrt",
            Self::Tan => "tan",
        }
    }

    /// Applies the function to a real value.
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Abs => x.abs(),
            Self::Acos => x.acos(),
            Self::Asin => x.asin(),
            Self::Atan => x.atan(),
            Self::Ceil => x.ceil(),
            Self::Cos => x.cos(),
            Self::Exp => x.exp(),
            Self::Exp10 => 10f64.powf(x),
            Self::Floor => x.floor(),
            Self::Log => x.ln(),
            Self::Log10 => x.log10(),
            Self::Rint => x.round_ties_even(),
            Self::Sin => x.sin(),
            Self::Sqrt => x.sqrt(),
            Self::Tan => x.tan(),
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric type of a foreign constant or variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SType {
    /// Integer-valued.
    Int,
    /// Real-valued (float or double, chosen by the backend).
    Real,
}
