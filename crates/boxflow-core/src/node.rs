//! Box node types.
//!
//! A box is either a [`Leaf`] primitive with a fixed arity, a binary
//! [`Composite`](BoxNode::Composite) built by the composition algebra, or an
//! explicit [`Route`](BoxNode::Route). Nodes are immutable once registered in
//! the [`BoxStore`](crate::BoxStore); composites refer to their operands by
//! [`BoxId`], never by owning pointer.

use core::fmt;

use crate::arity::Arity;
use crate::constant::Constant;
use crate::op::{BinaryOp, SType, UnaryOp};

/// Handle to a box in a session's node store.
///
/// Carries the id of the session that created it, so a handle presented to
/// any other session (including a later one, after its own was destroyed) is
/// rejected instead of silently aliasing an unrelated node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoxId {
    pub(crate) session: u32,
    pub(crate) index: u32,
}

impl BoxId {
    /// Returns the index of the node inside its store.
    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }

    /// Returns the id of the session that owns the node.
    #[inline]
    pub fn session(self) -> u32 {
        self.session
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "box#{}@s{}", self.index, self.session)
    }
}

/// Push-button style controls (0 inputs, 1 output).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ButtonKind {
    /// Momentary button.
    Button,
    /// Toggle.
    Checkbox,
}

/// Continuous input controls (0 inputs, 1 output).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SliderKind {
    /// Vertical slider.
    Vertical,
    /// Horizontal slider.
    Horizontal,
    /// Numeric entry field.
    NumEntry,
}

/// Display-only controls (1 input passed through, 1 output).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BargraphKind {
    /// Vertical bargraph.
    Vertical,
    /// Horizontal bargraph.
    Horizontal,
}

/// Primitive box kinds.
///
/// Labels are stored verbatim: any bracketed metadata they carry is left for
/// the UI layer to interpret.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Leaf {
    /// Integer constant.
    Int(i32),
    /// Real constant.
    Real(crate::constant::Real),
    /// Identity.
    Wire,
    /// Terminator.
    Cut,
    /// Binary operator.
    BinOp(BinaryOp),
    /// Unary math function.
    Unary(UnaryOp),
    /// Button or checkbox.
    Button {
        /// Which control.
        kind: ButtonKind,
        /// Opaque label.
        label: String,
    },
    /// Slider or numeric entry; parameters are closed 0→1 boxes.
    Slider {
        /// Which control.
        kind: SliderKind,
        /// Opaque label.
        label: String,
        /// Initial value.
        init: BoxId,
        /// Lower bound.
        min: BoxId,
        /// Upper bound.
        max: BoxId,
        /// Step.
        step: BoxId,
    },
    /// Bargraph; parameters are closed 0→1 boxes.
    Bargraph {
        /// Which control.
        kind: BargraphKind,
        /// Opaque label.
        label: String,
        /// Lower bound.
        min: BoxId,
        /// Upper bound.
        max: BoxId,
    },
    /// Periodic waveform from constant values.
    Waveform(Vec<Constant>),
    /// Read-only table of `size` elements.
    ReadOnlyTable {
        /// Number of elements.
        size: usize,
    },
    /// Read/write table of `size` elements, zero-initialised.
    WriteReadTable {
        /// Number of elements.
        size: usize,
    },
    /// Soundfile with `channels` audio outputs.
    Soundfile {
        /// Opaque label (may carry a url list).
        label: String,
        /// Number of audio channels.
        channels: usize,
    },
    /// Foreign constant.
    FConst {
        /// Numeric type.
        ty: SType,
        /// Symbol name.
        name: String,
        /// Include file declaring it.
        file: String,
    },
    /// Foreign variable.
    FVar {
        /// Numeric type.
        ty: SType,
        /// Symbol name.
        name: String,
        /// Include file declaring it.
        file: String,
    },
    /// Variable delay: signal, amount.
    Delay,
    /// Integer cast.
    IntCast,
    /// Float cast.
    FloatCast,
    /// Selector over `n` branches; the selector signal is the first input.
    Select(usize),
    /// Attach primitive: outputs its first input, keeps the second alive.
    Attach,
}

impl Leaf {
    /// Fixed arity of the primitive.
    pub fn arity(&self) -> Arity {
        match self {
            Self::Int(_)
            | Self::Real(_)
            | Self::Button { .. }
            | Self::Slider { .. }
            | Self::FConst { .. }
            | Self::FVar { .. } => Arity::SOURCE,
            Self::Wire
            | Self::Unary(_)
            | Self::Bargraph { .. }
            | Self::IntCast
            | Self::FloatCast => Arity::new(1, 1),
            Self::Cut => Arity::new(1, 0),
            Self::BinOp(_) | Self::Delay | Self::Attach | Self::ReadOnlyTable { .. } => {
                Arity::new(2, 1)
            }
            Self::WriteReadTable { .. } => Arity::new(3, 1),
            Self::Waveform(_) => Arity::new(0, 2),
            Self::Soundfile { channels, .. } => Arity::new(2, channels.saturating_add(2)),
            Self::Select(n) => Arity::new(n.saturating_add(1), 1),
        }
    }

    /// Short kind name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Real(_) => "real",
            Self::Wire => "wire",
            Self::Cut => "cut",
            Self::BinOp(_) => "binop",
            Self::Unary(_) => "unary",
            Self::Button {
                kind: ButtonKind::Button,
                ..
            } => "button",
            Self::Button {
                kind: ButtonKind::Checkbox,
                ..
            } => "checkbox",
            Self::Slider {
                kind: SliderKind::Vertical,
                ..
            } => "vslider",
            Self::Slider {
                kind: SliderKind::Horizontal,
                ..
            } => "hslider",
            Self::Slider {
                kind: SliderKind::NumEntry,
                ..
            } => "nentry",
            Self::Bargraph {
                kind: BargraphKind::Vertical,
                ..
            } => "vbargraph",
            Self::Bargraph {
                kind: BargraphKind::Horizontal,
                ..
            } => "hbargraph",
            Self::Waveform(_) => "waveform",
            Self::ReadOnlyTable { .. } => "rdtable",
            Self::WriteReadTable { .. } => "rwtable",
            Self::Soundfile { .. } => "soundfile",
            Self::FConst { .. } => "fconst",
            Self::FVar { .. } => "fvar",
            Self::Delay => "delay",
            Self::IntCast => "int_cast",
            Self::FloatCast => "float_cast",
            Self::Select(_) => "select",
            Self::Attach => "attach",
        }
    }

    /// Boxes this leaf refers to as parameters.
    pub fn params(&self) -> Vec<BoxId> {
        match self {
            Self::Slider {
                init,
                min,
                max,
                step,
                ..
            } => vec![*init, *min, *max, *step],
            Self::Bargraph { min, max, .. } => vec![*min, *max],
            _ => Vec::new(),
        }
    }
}

/// Binary composition operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompositeOp {
    /// `A : B`
    Seq,
    /// `A , B`
    Par,
    /// `A <: B`
    Split,
    /// `A :> B`
    Merge,
    /// `A ~ B`
    Rec,
    /// A's signal, with closed B kept in the same compiled unit.
    Attach,
}

impl CompositeOp {
    /// Operator name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Seq => "seq",
            Self::Par => "par",
            Self::Split => "split",
            Self::Merge => "merge",
            Self::Rec => "rec",
            Self::Attach => "attach",
        }
    }
}

impl fmt::Display for CompositeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A node of the box graph.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BoxNode {
    /// Primitive.
    Leaf(Leaf),
    /// Binary composition.
    Composite {
        /// Operator tag.
        op: CompositeOp,
        /// Left operand (`A`).
        left: BoxId,
        /// Right operand (`B`).
        right: BoxId,
    },
    /// Explicit routing matrix.
    Route {
        /// Input-count box.
        n: BoxId,
        /// Output-count box.
        m: BoxId,
        /// Routing-pairs box.
        r: BoxId,
        /// Evaluated input count.
        inputs: usize,
        /// Evaluated output count.
        outputs: usize,
        /// Evaluated 1-based `(source, destination)` pairs.
        pairs: Vec<(usize, usize)>,
    },
}

impl BoxNode {
    /// Short kind name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Leaf(leaf) => leaf.kind_name(),
            Self::Composite { op, .. } => op.name(),
            Self::Route { .. } => "route",
        }
    }

    /// Every box this node refers to, operands first.
    pub fn children(&self) -> Vec<BoxId> {
        match self {
            Self::Leaf(leaf) => leaf.params(),
            Self::Composite { left, right, .. } => vec![*left, *right],
            Self::Route { n, m, r, .. } => vec![*n, *m, *r],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_arities_match_catalogue() {
        assert_eq!(Leaf::Int(1).arity(), Arity::new(0, 1));
        assert_eq!(Leaf::Wire.arity(), Arity::new(1, 1));
        assert_eq!(Leaf::Cut.arity(), Arity::new(1, 0));
        assert_eq!(Leaf::BinOp(BinaryOp::Add).arity(), Arity::new(2, 1));
        assert_eq!(Leaf::Unary(UnaryOp::Sin).arity(), Arity::new(1, 1));
        assert_eq!(Leaf::Select(2).arity(), Arity::new(3, 1));
        assert_eq!(Leaf::Select(3).arity(), Arity::new(4, 1));
        assert_eq!(Leaf::ReadOnlyTable { size: 8 }.arity(), Arity::new(2, 1));
        assert_eq!(Leaf::WriteReadTable { size: 8 }.arity(), Arity::new(3, 1));
        assert_eq!(Leaf::Waveform(vec![]).arity(), Arity::new(0, 2));
        assert_eq!(
            Leaf::Soundfile {
                label: "s".into(),
                channels: 2
            }
            .arity(),
            Arity::new(2, 4)
        );
    }

    #[test]
    fn box_id_display() {
        let id = BoxId {
            session: 3,
            index: 7,
        };
        assert_eq!(id.to_string(), "box#7@s3");
    }
}
