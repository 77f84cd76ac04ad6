//! Primitive constructors.
//!
//! Every constructor registers a leaf with a fixed arity. Constructors whose
//! parameters are plain values cannot fail; those taking parameter boxes
//! check that the boxes belong to the session and have the expected shape.

use crate::arity::Arity;
use crate::constant::{Constant, Real};
use crate::error::BoxError;
use crate::node::{BargraphKind, BoxId, BoxNode, ButtonKind, Leaf, SliderKind};
use crate::op::{BinaryOp, SType, UnaryOp};
use crate::session::Session;

macro_rules! binary_shorthands {
    ($($(#[$doc:meta])* $name:ident => $op:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name(&mut self) -> BoxId {
                self.bin_op(BinaryOp::$op)
            }
        )*
    };
}

macro_rules! unary_shorthands {
    ($($name:ident => $op:ident),* $(,)?) => {
        $(
            #[doc = concat!("`", stringify!($name), "` function (1→1).")]
            pub fn $name(&mut self) -> BoxId {
                self.unary(UnaryOp::$op)
            }
        )*
    };
}

impl Session {
    fn leaf(&mut self, leaf: Leaf) -> BoxId {
        let arity = leaf.arity();
        self.intern(BoxNode::Leaf(leaf), arity)
    }

    /// Integer constant (0→1).
    pub fn int(&mut self, n: i32) -> BoxId {
        self.leaf(Leaf::Int(n))
    }

    /// Real constant (0→1).
    pub fn real(&mut self, x: f64) -> BoxId {
        self.leaf(Leaf::Real(Real(x)))
    }

    /// Identity (1→1).
    pub fn wire(&mut self) -> BoxId {
        self.leaf(Leaf::Wire)
    }

    /// Terminator (1→0).
    pub fn cut(&mut self) -> BoxId {
        self.leaf(Leaf::Cut)
    }

    /// Binary operator (2→1).
    pub fn bin_op(&mut self, op: BinaryOp) -> BoxId {
        self.leaf(Leaf::BinOp(op))
    }

    binary_shorthands! {
        /// `+` (2→1).
        add => Add,
        /// `-` (2→1).
        sub => Sub,
        /// `*` (2→1).
        mul => Mul,
        /// `/` (2→1).
        div => Div,
        /// `%` (2→1).
        rem => Rem,
        /// `<<` (2→1).
        left_shift => LeftShift,
        /// Logical `>>` (2→1).
        l_right_shift => LRightShift,
        /// Arithmetic `>>` (2→1).
        a_right_shift => ARightShift,
        /// `>` (2→1).
        gt => Gt,
        /// `<` (2→1).
        lt => Lt,
        /// `>=` (2→1).
        ge => Ge,
        /// `<=` (2→1).
        le => Le,
        /// `==` (2→1).
        eq => Eq,
        /// `!=` (2→1).
        ne => Ne,
        /// Bitwise and (2→1).
        and => And,
        /// Bitwise or (2→1).
        or => Or,
        /// Bitwise xor (2→1).
        xor => Xor,
        /// `pow` (2→1).
        pow => Pow,
        /// `min` (2→1).
        min => Min,
        /// `max` (2→1).
        max => Max,
        /// `fmod` (2→1).
        fmod => Fmod,
        /// IEEE `remainder` (2→1).
        remainder => Remainder,
        /// `atan2` (2→1).
        atan2 => Atan2,
    }

    /// Unary math function (1→1).
    pub fn unary(&mut self, op: UnaryOp) -> BoxId {
        self.leaf(Leaf::Unary(op))
    }

    unary_shorthands! {
        abs => Abs,
        acos => Acos,
        asin => Asin,
        atan => Atan,
        ceil => Ceil,
        cos => Cos,
        exp => Exp,
        exp10 => Exp10,
        floor => Floor,
        log => Log,
        log10 => Log10,
        rint => Rint,
        sin => Sin,
        sqrt => Sqrt,
        tan => Tan,
    }

    /// Momentary button (0→1).
    pub fn button(&mut self, label: impl Into<String>) -> BoxId {
        self.leaf(Leaf::Button {
            kind: ButtonKind::Button,
            label: label.into(),
        })
    }

    /// Toggle (0→1).
    pub fn checkbox(&mut self, label: impl Into<String>) -> BoxId {
        self.leaf(Leaf::Button {
            kind: ButtonKind::Checkbox,
            label: label.into(),
        })
    }

    /// Vertical slider (0→1). `init`, `min`, `max` and `step` must be 0→1 boxes.
    pub fn vslider(
        &mut self,
        label: impl Into<String>,
        init: BoxId,
        min: BoxId,
        max: BoxId,
        step: BoxId,
    ) -> Result<BoxId, BoxError> {
        self.slider(SliderKind::Vertical, label.into(), [init, min, max, step])
    }

    /// Horizontal slider (0→1). `init`, `min`, `max` and `step` must be 0→1 boxes.
    pub fn hslider(
        &mut self,
        label: impl Into<String>,
        init: BoxId,
        min: BoxId,
        max: BoxId,
        step: BoxId,
    ) -> Result<BoxId, BoxError> {
        self.slider(SliderKind::Horizontal, label.into(), [init, min, max, step])
    }

    /// Numeric entry (0→1). `init`, `min`, `max` and `step` must be 0→1 boxes.
    pub fn num_entry(
        &mut self,
        label: impl Into<String>,
        init: BoxId,
        min: BoxId,
        max: BoxId,
        step: BoxId,
    ) -> Result<BoxId, BoxError> {
        self.slider(SliderKind::NumEntry, label.into(), [init, min, max, step])
    }

    fn slider(
        &mut self,
        kind: SliderKind,
        label: String,
        [init, min, max, step]: [BoxId; 4],
    ) -> Result<BoxId, BoxError> {
        let op = match kind {
            SliderKind::Vertical => "vslider",
            SliderKind::Horizontal => "hslider",
            SliderKind::NumEntry => "nentry",
        };
        for param in [init, min, max, step] {
            self.source_param(op, param)?;
        }
        Ok(self.leaf(Leaf::Slider {
            kind,
            label,
            init,
            min,
            max,
            step,
        }))
    }

    /// Vertical bargraph (1→1). `min` and `max` must be 0→1 boxes.
    pub fn vbargraph(
        &mut self,
        label: impl Into<String>,
        min: BoxId,
        max: BoxId,
    ) -> Result<BoxId, BoxError> {
        self.bargraph(BargraphKind::Vertical, label.into(), min, max)
    }

    /// Horizontal bargraph (1→1). `min` and `max` must be 0→1 boxes.
    pub fn hbargraph(
        &mut self,
        label: impl Into<String>,
        min: BoxId,
        max: BoxId,
    ) -> Result<BoxId, BoxError> {
        self.bargraph(BargraphKind::Horizontal, label.into(), min, max)
    }

    fn bargraph(
        &mut self,
        kind: BargraphKind,
        label: String,
        min: BoxId,
        max: BoxId,
    ) -> Result<BoxId, BoxError> {
        let op = match kind {
            BargraphKind::Vertical => "vbargraph",
            BargraphKind::Horizontal => "hbargraph",
        };
        self.source_param(op, min)?;
        self.source_param(op, max)?;
        Ok(self.leaf(Leaf::Bargraph {
            kind,
            label,
            min,
            max,
        }))
    }

    /// Periodic waveform (0→2: size, content). Every value must be a constant
    /// numerical expression.
    pub fn waveform(&mut self, values: &[BoxId]) -> Result<BoxId, BoxError> {
        let mut content = Vec::with_capacity(values.len());
        for &value in values {
            let folded = self.eval_constant(value)?.ok_or(BoxError::NotConstant {
                op: "waveform",
                what: "every value",
            })?;
            content.push(folded);
        }
        Ok(self.leaf(Leaf::Waveform(content)))
    }

    /// Read-only table of `size` elements (2→1: init content, read index).
    pub fn read_only_table(&mut self, size: usize) -> BoxId {
        self.leaf(Leaf::ReadOnlyTable { size })
    }

    /// Read/write table of `size` zero-initialised elements
    /// (3→1: write index, write value, read index).
    pub fn write_read_table(&mut self, size: usize) -> BoxId {
        self.leaf(Leaf::WriteReadTable { size })
    }

    /// Soundfile with `chan` channels (2→chan+2: part, read index → length,
    /// rate, channels). `chan` must be a positive integer constant.
    pub fn soundfile(&mut self, label: impl Into<String>, chan: BoxId) -> Result<BoxId, BoxError> {
        let channels = self
            .eval_constant(chan)?
            .and_then(Constant::as_count)
            .ok_or(BoxError::NotConstant {
                op: "soundfile",
                what: "channel count",
            })?;
        Ok(self.leaf(Leaf::Soundfile {
            label: label.into(),
            channels,
        }))
    }

    /// Foreign constant (0→1).
    pub fn fconst(&mut self, ty: SType, name: impl Into<String>, file: impl Into<String>) -> BoxId {
        self.leaf(Leaf::FConst {
            ty,
            name: name.into(),
            file: file.into(),
        })
    }

    /// Foreign variable (0→1).
    pub fn fvar(&mut self, ty: SType, name: impl Into<String>, file: impl Into<String>) -> BoxId {
        self.leaf(Leaf::FVar {
            ty,
            name: name.into(),
            file: file.into(),
        })
    }

    /// Variable delay (2→1: signal, amount in samples).
    pub fn delay(&mut self) -> BoxId {
        self.leaf(Leaf::Delay)
    }

    /// Integer cast (1→1).
    pub fn int_cast(&mut self) -> BoxId {
        self.leaf(Leaf::IntCast)
    }

    /// Float cast (1→1).
    pub fn float_cast(&mut self) -> BoxId {
        self.leaf(Leaf::FloatCast)
    }

    /// Two-way selector (3→1: selector, branch 0, branch 1).
    pub fn select2(&mut self) -> BoxId {
        self.leaf(Leaf::Select(2))
    }

    /// Three-way selector (4→1: selector, branches 0..3).
    pub fn select3(&mut self) -> BoxId {
        self.leaf(Leaf::Select(3))
    }

    /// `n`-way selector ((n+1)→1). Needs at least two branches.
    pub fn select(&mut self, n: usize) -> Result<BoxId, BoxError> {
        if n < 2 {
            return Err(BoxError::ArityMismatch {
                op: "select",
                rule: "a selector needs at least two branches",
                left: Leaf::Select(n).arity(),
                right: Leaf::Select(2).arity(),
            });
        }
        if n.checked_add(1).is_none() {
            return Err(BoxError::ArityMismatch {
                op: "select",
                rule: "the branch count plus the selector must fit in usize",
                left: Leaf::Select(n).arity(),
                right: Leaf::Select(2).arity(),
            });
        }
        Ok(self.leaf(Leaf::Select(n)))
    }

    /// Attach primitive (2→1): outputs its first input and keeps the second
    /// in the same compiled unit.
    pub fn attach_primitive(&mut self) -> BoxId {
        self.leaf(Leaf::Attach)
    }

    fn source_param(&self, op: &'static str, param: BoxId) -> Result<(), BoxError> {
        let arity = self.arity(param)?;
        if arity != Arity::SOURCE {
            return Err(BoxError::ArityMismatch {
                op,
                rule: "parameters must be closed boxes with one output",
                left: arity,
                right: Arity::SOURCE,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_arity_is_deterministic() {
        let mut s = Session::new().unwrap();
        let a = s.int(7);
        let b = s.int(7);
        assert_eq!(a, b);
        assert_eq!(s.arity(a).unwrap(), Arity::new(0, 1));
        let wire = s.wire();
        assert_eq!(s.arity(wire).unwrap(), Arity::new(1, 1));
    }

    #[test]
    fn shorthand_matches_bin_op() {
        let mut s = Session::new().unwrap();
        assert_eq!(s.add(), s.bin_op(BinaryOp::Add));
        assert_eq!(s.sin(), s.unary(UnaryOp::Sin));
        let atan2 = s.atan2();
        assert_eq!(s.arity(atan2).unwrap(), Arity::new(2, 1));
    }

    #[test]
    fn slider_takes_parameter_boxes() {
        let mut s = Session::new().unwrap();
        let init = s.real(0.5);
        let min = s.int(0);
        let max = s.int(1);
        let step = s.real(0.01);
        let slider = s
            .hslider("gain [unit:dB] [midi:ctrl 7]", init, min, max, step)
            .unwrap();
        assert_eq!(s.arity(slider).unwrap(), Arity::SOURCE);
        match s.node(slider).unwrap() {
            BoxNode::Leaf(Leaf::Slider { label, .. }) => {
                assert_eq!(label, "gain [unit:dB] [midi:ctrl 7]");
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn malformed_label_is_accepted_verbatim() {
        let mut s = Session::new().unwrap();
        let b = s.button("go [unterminated");
        assert!(s.node(b).is_ok());
    }

    #[test]
    fn slider_rejects_open_parameter() {
        let mut s = Session::new().unwrap();
        let wire = s.wire();
        let zero = s.int(0);
        let err = s.vslider("x", wire, zero, zero, zero).unwrap_err();
        assert!(matches!(
            err,
            BoxError::ArityMismatch { op: "vslider", .. }
        ));
    }

    #[test]
    fn waveform_requires_constants() {
        let mut s = Session::new().unwrap();
        let a = s.int(1);
        let b = s.real(0.5);
        let wf = s.waveform(&[a, b]).unwrap();
        assert_eq!(s.arity(wf).unwrap(), Arity::new(0, 2));

        let ctl = s.button("b");
        assert_eq!(
            s.waveform(&[a, ctl]),
            Err(BoxError::NotConstant {
                op: "waveform",
                what: "every value"
            })
        );
    }

    #[test]
    fn soundfile_channel_count_from_constant_expression() {
        let mut s = Session::new().unwrap();
        let one = s.int(1);
        let args = s.par(one, one).unwrap();
        let add = s.add();
        let two = s.seq(args, add).unwrap();
        let sf = s.soundfile("snd[url:{'a.wav'}]", two).unwrap();
        assert_eq!(s.arity(sf).unwrap(), Arity::new(2, 4));

        let zero = s.int(0);
        assert!(matches!(
            s.soundfile("bad", zero),
            Err(BoxError::NotConstant { op: "soundfile", .. })
        ));
    }

    #[test]
    fn selectors() {
        let mut s = Session::new().unwrap();
        let select2 = s.select2();
        assert_eq!(s.arity(select2).unwrap(), Arity::new(3, 1));
        let select3 = s.select3();
        assert_eq!(s.arity(select3).unwrap(), Arity::new(4, 1));
        let sel5 = s.select(5).unwrap();
        assert_eq!(s.arity(sel5).unwrap(), Arity::new(6, 1));
        assert!(s.select(1).is_err());
        assert!(matches!(
            s.select(usize::MAX),
            Err(BoxError::ArityMismatch { op: "select", .. })
        ));
    }

    #[test]
    fn tables_and_casts() {
        let mut s = Session::new().unwrap();
        let rd = s.read_only_table(16);
        let rw = s.write_read_table(16);
        assert_eq!(s.arity(rd).unwrap(), Arity::new(2, 1));
        assert_eq!(s.arity(rw).unwrap(), Arity::new(3, 1));
        let int_cast = s.int_cast();
        assert_eq!(s.arity(int_cast).unwrap(), Arity::new(1, 1));
        let delay = s.delay();
        assert_eq!(s.arity(delay).unwrap(), Arity::new(2, 1));
        let attach_primitive = s.attach_primitive();
        assert_eq!(s.arity(attach_primitive).unwrap(), Arity::new(2, 1));
    }

    #[test]
    fn foreign_symbols() {
        let mut s = Session::new().unwrap();
        let sr = s.fconst(SType::Int, "fSamplingFreq", "<math.h>");
        let v = s.fvar(SType::Real, "gTime", "time.h");
        assert_eq!(s.arity(sr).unwrap(), Arity::SOURCE);
        assert_eq!(s.arity(v).unwrap(), Arity::SOURCE);
    }
}
