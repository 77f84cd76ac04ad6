//! Conservative value intervals for signals.
//!
//! Each signal gets a closed range `[lo, hi]` that contains every value it
//! can take. Literals are points, controls span their declared range and
//! anything the analysis cannot bound is `(-inf, +inf)`. The cycle resolver
//! uses the lower bound of delay amounts to decide whether a feedback loop
//! keeps at least one sample of delay.

use core::fmt;

use crate::op::{BinaryOp, UnaryOp};
use crate::signal::{SigId, Signal, SignalStore};

/// A closed range of values. Bounds may be infinite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interval {
    /// Lower bound.
    pub lo: f64,
    /// Upper bound.
    pub hi: f64,
}

impl Interval {
    /// The unbounded interval.
    pub const FULL: Self = Self {
        lo: f64::NEG_INFINITY,
        hi: f64::INFINITY,
    };

    /// `[0, 1]`, the range of booleans.
    pub const UNIT: Self = Self { lo: 0.0, hi: 1.0 };

    /// Creates `[lo, hi]`, widening to [`FULL`](Self::FULL) on NaN bounds.
    pub fn new(lo: f64, hi: f64) -> Self {
        if lo.is_nan() || hi.is_nan() {
            return Self::FULL;
        }
        Self {
            lo: lo.min(hi),
            hi: lo.max(hi),
        }
    }

    /// The single-value interval `[x, x]`.
    pub fn point(x: f64) -> Self {
        Self::new(x, x)
    }

    /// Returns `true` if `x` lies inside the interval.
    pub fn contains(self, x: f64) -> bool {
        self.lo <= x && x <= self.hi
    }

    /// Smallest interval containing both.
    pub fn union(self, other: Self) -> Self {
        Self::new(self.lo.min(other.lo), self.hi.max(other.hi))
    }

    /// Interval negation: bounds swap and change sign.
    pub fn neg(self) -> Self {
        Self::new(-self.hi, -self.lo)
    }

    /// Interval sum.
    pub fn add(self, other: Self) -> Self {
        Self::new(self.lo + other.lo, self.hi + other.hi)
    }

    /// Interval difference.
    pub fn sub(self, other: Self) -> Self {
        self.add(other.neg())
    }

    /// Interval product.
    pub fn mul(self, other: Self) -> Self {
        let products = [
            mul_bound(self.lo, other.lo),
            mul_bound(self.lo, other.hi),
            mul_bound(self.hi, other.lo),
            mul_bound(self.hi, other.hi),
        ];
        Self::new(
            products.iter().copied().fold(f64::INFINITY, f64::min),
            products.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        )
    }

    /// Interval quotient; unbounded when the divisor may be zero.
    pub fn div(self, other: Self) -> Self {
        if other.contains(0.0) {
            return Self::FULL;
        }
        self.mul(Self::new(1.0 / other.hi, 1.0 / other.lo))
    }

    /// Range of `min(a, b)`.
    pub fn min(self, other: Self) -> Self {
        Self::new(self.lo.min(other.lo), self.hi.min(other.hi))
    }

    /// Range of `max(a, b)`.
    pub fn max(self, other: Self) -> Self {
        Self::new(self.lo.max(other.lo), self.hi.max(other.hi))
    }

    /// Range of `|x|`.
    pub fn abs(self) -> Self {
        if self.lo >= 0.0 {
            self
        } else if self.hi <= 0.0 {
            self.neg()
        } else {
            Self::new(0.0, (-self.lo).max(self.hi))
        }
    }

    /// Applies a non-decreasing function to both bounds.
    fn monotone(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.lo), f(self.hi))
    }

    /// Lower bound rounded down to a whole number of samples.
    ///
    /// `i64::MIN` stands for an amount unbounded below.
    pub fn floor_samples(self) -> i64 {
        if self.lo.is_nan() || self.lo == f64::NEG_INFINITY {
            i64::MIN
        } else if self.lo == f64::INFINITY {
            i64::MAX
        } else {
            // saturating float-to-int conversion
            self.lo.floor() as i64
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lo, self.hi)
    }
}

fn mul_bound(a: f64, b: f64) -> f64 {
    if a == 0.0 || b == 0.0 { 0.0 } else { a * b }
}

fn binary(op: BinaryOp, a: Interval, b: Interval) -> Interval {
    match op {
        BinaryOp::Add => a.add(b),
        BinaryOp::Sub => a.sub(b),
        BinaryOp::Mul => a.mul(b),
        BinaryOp::Div => a.div(b),
        BinaryOp::Min => a.min(b),
        BinaryOp::Max => a.max(b),
        BinaryOp::Gt
        | BinaryOp::Lt
        | BinaryOp::Ge
        | BinaryOp::Le
        | BinaryOp::Eq
        | BinaryOp::Ne => Interval::UNIT,
        BinaryOp::Atan2 => Interval::new(-core::f64::consts::PI, core::f64::consts::PI),
        BinaryOp::Rem | BinaryOp::Fmod | BinaryOp::Remainder => {
            let m = b.abs().hi;
            Interval::new(-m, m)
        }
        _ => Interval::FULL,
    }
}

fn unary(op: UnaryOp, x: Interval) -> Interval {
    match op {
        UnaryOp::Abs => x.abs(),
        UnaryOp::Sin | UnaryOp::Cos => Interval::new(-1.0, 1.0),
        UnaryOp::Atan => x.monotone(f64::atan),
        UnaryOp::Exp | UnaryOp::Exp10 | UnaryOp::Ceil | UnaryOp::Floor | UnaryOp::Rint => {
            x.monotone(|v| op.apply(v))
        }
        UnaryOp::Sqrt | UnaryOp::Log | UnaryOp::Log10 if x.lo >= 0.0 => x.monotone(|v| op.apply(v)),
        UnaryOp::Acos => Interval::new(0.0, core::f64::consts::PI),
        UnaryOp::Asin => Interval::new(-core::f64::consts::FRAC_PI_2, core::f64::consts::FRAC_PI_2),
        _ => Interval::FULL,
    }
}

/// Incremental interval analysis over a [`SignalStore`].
///
/// Operands are always interned before their users, so one forward pass over
/// new nodes is enough; [`update`](Self::update) only visits signals added
/// since the previous call.
#[derive(Debug, Default, Clone)]
pub struct IntervalAnalysis {
    bounds: Vec<Interval>,
}

impl IntervalAnalysis {
    /// Creates an empty analysis.
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyses every signal of `store` not seen yet.
    pub fn update(&mut self, store: &SignalStore) {
        for (id, sig) in store.iter().skip(self.bounds.len()) {
            let range = self.compute(sig);
            debug_assert_eq!(id.index(), self.bounds.len());
            self.bounds.push(range);
        }
    }

    /// Interval of an analysed signal; unknown ids are unbounded.
    pub fn get(&self, id: SigId) -> Interval {
        self.bounds.get(id.index()).copied().unwrap_or(Interval::FULL)
    }

    fn compute(&self, sig: &Signal) -> Interval {
        match sig {
            Signal::Int(n) => Interval::point(f64::from(*n)),
            Signal::Real(r) => Interval::point(r.0),
            Signal::BinOp(op, a, b) => binary(*op, self.get(*a), self.get(*b)),
            Signal::Unary(op, x) => unary(*op, self.get(*x)),
            // delay lines start out filled with zeros
            Signal::Delay(x, _) | Signal::Delay1(x) => self.get(*x).union(Interval::point(0.0)),
            Signal::IntCast(x) => self.get(*x).monotone(f64::trunc),
            Signal::FloatCast(x) | Signal::Attach(x, _) => self.get(*x),
            Signal::Bargraph { input, .. } => self.get(*input),
            Signal::Select { branches, .. } => branches
                .iter()
                .map(|b| self.get(*b))
                .reduce(Interval::union)
                .unwrap_or(Interval::FULL),
            Signal::Button { .. } => Interval::UNIT,
            Signal::Slider { min, max, .. } => Interval::new(self.get(*min).lo, self.get(*max).hi),
            Signal::Waveform(values) => values
                .iter()
                .map(|c| Interval::point(c.as_f64()))
                .reduce(Interval::union)
                .unwrap_or(Interval::FULL),
            Signal::ReadOnlyTable { init, .. } => self.get(*init),
            Signal::WriteReadTable { write_value, .. } => {
                self.get(*write_value).union(Interval::point(0.0))
            }
            Signal::Soundfile { .. }
            | Signal::SoundfileLength { .. }
            | Signal::SoundfileRate { .. }
            | Signal::SoundfileBuffer { .. }
            | Signal::FConst { .. }
            | Signal::FVar { .. }
            | Signal::RecRef(_)
            | Signal::RecDef { .. }
            | Signal::Proj { .. } => Interval::FULL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::Real;
    use crate::node::SliderKind;

    #[test]
    fn negation_swaps_bounds() {
        assert_eq!(Interval::new(-2.0, 5.0).neg(), Interval::new(-5.0, 2.0));
        assert_eq!(Interval::FULL.neg(), Interval::FULL);
    }

    #[test]
    fn arithmetic() {
        let a = Interval::new(1.0, 2.0);
        let b = Interval::new(-3.0, 4.0);
        assert_eq!(a.add(b), Interval::new(-2.0, 6.0));
        assert_eq!(a.sub(b), Interval::new(-3.0, 5.0));
        assert_eq!(a.mul(b), Interval::new(-6.0, 8.0));
        assert_eq!(a.div(b), Interval::FULL);
        assert_eq!(b.div(Interval::point(2.0)), Interval::new(-1.5, 2.0));
    }

    #[test]
    fn zero_times_infinity_is_zero() {
        let z = Interval::point(0.0);
        assert_eq!(z.mul(Interval::FULL), z);
    }

    #[test]
    fn floor_samples() {
        assert_eq!(Interval::new(1.5, 3.0).floor_samples(), 1);
        assert_eq!(Interval::new(-0.5, 3.0).floor_samples(), -1);
        assert_eq!(Interval::FULL.floor_samples(), i64::MIN);
    }

    #[test]
    fn analysis_follows_store_order() {
        let mut store = SignalStore::new();
        let init = store.intern(Signal::Real(Real(0.5)));
        let lo = store.intern(Signal::Int(0));
        let hi = store.intern(Signal::Int(10));
        let step = store.intern(Signal::Int(1));
        let slider = store.intern(Signal::Slider {
            kind: SliderKind::Horizontal,
            label: "gain".into(),
            init,
            min: lo,
            max: hi,
            step,
        });
        let neg = store.intern(Signal::BinOp(BinaryOp::Sub, lo, slider));

        let mut analysis = IntervalAnalysis::new();
        analysis.update(&store);
        assert_eq!(analysis.get(slider), Interval::new(0.0, 10.0));
        assert_eq!(analysis.get(neg), Interval::new(-10.0, 0.0));

        let delayed = store.intern(Signal::Delay1(init));
        analysis.update(&store);
        assert_eq!(analysis.get(delayed), Interval::new(0.0, 0.5));
    }
}
