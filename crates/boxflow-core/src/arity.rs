//! Box arity: the `(inputs, outputs)` pair every box carries.

use core::fmt;

/// Number of inputs and outputs of a box.
///
/// Computed once when a box is registered in the [`BoxStore`](crate::BoxStore)
/// and never recomputed afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Arity {
    /// Number of input signals consumed.
    pub inputs: usize,
    /// Number of output signals produced.
    pub outputs: usize,
}

impl Arity {
    /// Creates an arity from input and output counts.
    #[inline]
    pub const fn new(inputs: usize, outputs: usize) -> Self {
        Self { inputs, outputs }
    }

    /// Arity of a source: no inputs, one output.
    pub const SOURCE: Self = Self::new(0, 1);

    /// Returns `true` if the box has no open inputs.
    #[inline]
    pub fn is_closed(self) -> bool {
        self.inputs == 0
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} -> {})", self.inputs, self.outputs)
    }
}
