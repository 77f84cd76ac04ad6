//! Flattened signal expressions.
//!
//! The flattener turns a closed box into one [`Signal`] tree per output.
//! Signals live in a hash-consed arena ([`SignalStore`]): a structurally
//! identical expression reached along different paths is one node, so a
//! control read in two places is read once.
//!
//! Recursion is expressed without cycles. A feedback group `R<n>` is
//! defined by a [`Signal::RecDef`] whose bodies may mention the group only
//! through the named leaf [`Signal::RecRef`]. Outputs of a group are read
//! with [`Signal::Proj`].

use core::fmt;
use std::collections::HashMap;

use crate::constant::{Constant, Real};
use crate::node::{BargraphKind, ButtonKind, SliderKind};
use crate::op::{BinaryOp, SType, UnaryOp};
use crate::store::content_hash;

/// Handle to a signal in a [`SignalStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SigId(pub(crate) u32);

impl SigId {
    /// Returns the raw index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Name of a recursion group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecVar(pub(crate) u32);

impl fmt::Display for RecVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// A per-sample scalar expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Integer constant.
    Int(i32),
    /// Real constant.
    Real(Real),
    /// Binary operator application.
    BinOp(BinaryOp, SigId, SigId),
    /// Unary math function application.
    Unary(UnaryOp, SigId),
    /// `x` delayed by `amount` samples.
    Delay(SigId, SigId),
    /// `x` delayed by exactly one sample (feedback edge).
    Delay1(SigId),
    /// Integer cast.
    IntCast(SigId),
    /// Float cast.
    FloatCast(SigId),
    /// Selects `branches[selector]`.
    Select {
        /// Selector.
        selector: SigId,
        /// Candidate signals.
        branches: Vec<SigId>,
    },
    /// Button or checkbox read.
    Button {
        /// Which control.
        kind: ButtonKind,
        /// Opaque label.
        label: String,
    },
    /// Slider or numeric entry read.
    Slider {
        /// Which control.
        kind: SliderKind,
        /// Opaque label.
        label: String,
        /// Initial value.
        init: SigId,
        /// Lower bound.
        min: SigId,
        /// Upper bound.
        max: SigId,
        /// Step.
        step: SigId,
    },
    /// Bargraph display of `input`; evaluates to `input`.
    Bargraph {
        /// Which control.
        kind: BargraphKind,
        /// Opaque label.
        label: String,
        /// Lower bound.
        min: SigId,
        /// Upper bound.
        max: SigId,
        /// Displayed signal.
        input: SigId,
    },
    /// Periodic content of a waveform.
    Waveform(Vec<Constant>),
    /// Read from a read-only table filled from `init`.
    ReadOnlyTable {
        /// Number of elements.
        size: usize,
        /// Content generator.
        init: SigId,
        /// Read index.
        index: SigId,
    },
    /// Read from a zero-initialised read/write table.
    WriteReadTable {
        /// Number of elements.
        size: usize,
        /// Write index.
        write_index: SigId,
        /// Value written.
        write_value: SigId,
        /// Read index.
        index: SigId,
    },
    /// A soundfile resource.
    Soundfile {
        /// Opaque label.
        label: String,
        /// Number of channels.
        channels: usize,
    },
    /// Length (in frames) of a soundfile part.
    SoundfileLength {
        /// The soundfile.
        file: SigId,
        /// Part index.
        part: SigId,
    },
    /// Sample rate of a soundfile part.
    SoundfileRate {
        /// The soundfile.
        file: SigId,
        /// Part index.
        part: SigId,
    },
    /// One channel of a soundfile part at a read position.
    SoundfileBuffer {
        /// The soundfile.
        file: SigId,
        /// Channel number.
        channel: usize,
        /// Part index.
        part: SigId,
        /// Read index.
        index: SigId,
    },
    /// Foreign constant.
    FConst {
        /// Numeric type.
        ty: SType,
        /// Symbol name.
        name: String,
        /// Include file.
        file: String,
    },
    /// Foreign variable.
    FVar {
        /// Numeric type.
        ty: SType,
        /// Symbol name.
        name: String,
        /// Include file.
        file: String,
    },
    /// First signal, compiled together with the second.
    Attach(SigId, SigId),
    /// Back-reference to the recursion group `R<n>`.
    RecRef(RecVar),
    /// Definition of recursion group `R<n>`: one body per group output.
    RecDef {
        /// Group name.
        var: RecVar,
        /// Bodies, which may mention `RecRef(var)`.
        bodies: Vec<SigId>,
    },
    /// Output `index` of a recursion group (`RecRef` or `RecDef`).
    Proj {
        /// Output index.
        index: usize,
        /// The group.
        group: SigId,
    },
}

impl Signal {
    /// Operand signals in evaluation order.
    pub fn children(&self) -> Vec<SigId> {
        match self {
            Self::Int(_)
            | Self::Real(_)
            | Self::Button { .. }
            | Self::Waveform(_)
            | Self::Soundfile { .. }
            | Self::FConst { .. }
            | Self::FVar { .. }
            | Self::RecRef(_) => Vec::new(),
            Self::Unary(_, x)
            | Self::Delay1(x)
            | Self::IntCast(x)
            | Self::FloatCast(x)
            | Self::Proj { group: x, .. } => vec![*x],
            Self::BinOp(_, a, b) | Self::Delay(a, b) | Self::Attach(a, b) => vec![*a, *b],
            Self::Select { selector, branches } => {
                let mut v = vec![*selector];
                v.extend_from_slice(branches);
                v
            }
            Self::Slider {
                init,
                min,
                max,
                step,
                ..
            } => vec![*init, *min, *max, *step],
            Self::Bargraph {
                min, max, input, ..
            } => vec![*min, *max, *input],
            Self::ReadOnlyTable { init, index, .. } => vec![*init, *index],
            Self::WriteReadTable {
                write_index,
                write_value,
                index,
                ..
            } => vec![*write_index, *write_value, *index],
            Self::SoundfileLength { file, part } | Self::SoundfileRate { file, part } => {
                vec![*file, *part]
            }
            Self::SoundfileBuffer {
                file, part, index, ..
            } => vec![*file, *part, *index],
            Self::RecDef { bodies, .. } => bodies.clone(),
        }
    }

    /// The literal value, if this is a constant.
    pub fn constant(&self) -> Option<Constant> {
        match self {
            Self::Int(n) => Some(Constant::Int(*n)),
            Self::Real(r) => Some(Constant::Real(*r)),
            _ => None,
        }
    }
}

impl From<Constant> for Signal {
    fn from(c: Constant) -> Self {
        match c {
            Constant::Int(n) => Self::Int(n),
            Constant::Real(r) => Self::Real(r),
        }
    }
}

/// Hash-consed arena of signals.
///
/// Each signal is stored once, in creation order; the lookup table maps a
/// content hash to the ids carrying it.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SignalStore {
    nodes: Vec<Signal>,
    buckets: HashMap<u64, Vec<SigId>>,
}

impl SignalStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `signal`, adding it if it is new.
    pub fn intern(&mut self, signal: Signal) -> SigId {
        let hash = content_hash(&signal);
        if let Some(id) = self.lookup(hash, &signal) {
            return id;
        }
        let id = SigId(self.nodes.len() as u32);
        self.nodes.push(signal);
        self.buckets.entry(hash).or_default().push(id);
        id
    }

    /// Looks up a signal.
    pub fn get(&self, id: SigId) -> Option<&Signal> {
        self.nodes.get(id.index())
    }

    /// Number of distinct signals.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over all signals in creation order. Operands always precede
    /// the signals that use them.
    pub fn iter(&self) -> impl Iterator<Item = (SigId, &Signal)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, s)| (SigId(i as u32), s))
    }

    /// Id of an already interned signal.
    pub(crate) fn find(&self, signal: &Signal) -> Option<SigId> {
        self.lookup(content_hash(signal), signal)
    }

    pub(crate) fn node(&self, id: SigId) -> &Signal {
        &self.nodes[id.index()]
    }

    fn lookup(&self, hash: u64, signal: &Signal) -> Option<SigId> {
        self.buckets
            .get(&hash)?
            .iter()
            .copied()
            .find(|id| self.nodes[id.index()] == *signal)
    }
}

/// Result of flattening: the signal arena plus one root per box output.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalList {
    store: SignalStore,
    outputs: Vec<SigId>,
    retained: Vec<SigId>,
}

impl SignalList {
    pub(crate) fn new(store: SignalStore, outputs: Vec<SigId>) -> Self {
        Self {
            store,
            outputs,
            retained: Vec::new(),
        }
    }

    pub(crate) fn with_retained(mut self, retained: Vec<SigId>) -> Self {
        self.retained = retained;
        self
    }

    /// Output roots, in the box's output order.
    pub fn outputs(&self) -> &[SigId] {
        &self.outputs
    }

    /// Signals attached to a box without outputs.
    ///
    /// They feed no output but must be compiled with the program (table
    /// writes, bargraphs).
    pub fn retained(&self) -> &[SigId] {
        &self.retained
    }

    /// Number of outputs.
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Returns `true` if there are no outputs.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Looks up a signal node.
    pub fn get(&self, id: SigId) -> Option<&Signal> {
        self.store.get(id)
    }

    /// Number of distinct signal nodes across all outputs.
    pub fn node_count(&self) -> usize {
        self.store.len()
    }

    /// The underlying arena.
    pub fn store(&self) -> &SignalStore {
        &self.store
    }

    /// Renders the expression rooted at `id` as text.
    ///
    /// Shared nodes are printed at each use; recursion groups print their
    /// bodies once, at the `RecDef`.
    pub fn render(&self, id: SigId) -> String {
        let mut out = String::new();
        let mut pending = vec![Piece::Expr(id)];
        while let Some(piece) = pending.pop() {
            match piece {
                Piece::Text(text) => out.push_str(&text),
                Piece::Expr(id) => {
                    let (head, args, tail) = self.parts(id);
                    out.push_str(&head);
                    pending.push(Piece::Text(tail));
                    for (i, &arg) in args.iter().enumerate().rev() {
                        pending.push(Piece::Expr(arg));
                        if i > 0 {
                            pending.push(Piece::Text(", ".to_owned()));
                        }
                    }
                }
            }
        }
        out
    }

    /// Splits a node into the text before its operands, the operands, and
    /// the text after them.
    fn parts(&self, id: SigId) -> (String, Vec<SigId>, String) {
        let call = |name: &str, args: Vec<SigId>| (format!("{name}("), args, ")".to_owned());
        let text = |t: String| (t, Vec::new(), String::new());

        let Some(sig) = self.store.get(id) else {
            return text(format!("<dangling {}>", id.0));
        };
        match sig {
            Signal::Int(n) => text(n.to_string()),
            Signal::Real(r) => text(r.to_string()),
            Signal::BinOp(op, a, b) => call(op.name(), vec![*a, *b]),
            Signal::Unary(op, x) => call(op.name(), vec![*x]),
            Signal::Delay(x, d) => call("delay", vec![*x, *d]),
            Signal::Delay1(x) => call("mem", vec![*x]),
            Signal::IntCast(x) => call("int", vec![*x]),
            Signal::FloatCast(x) => call("float", vec![*x]),
            Signal::Select { .. } => call("select", sig.children()),
            Signal::Button { kind, label } => {
                let name = match kind {
                    ButtonKind::Button => "button",
                    ButtonKind::Checkbox => "checkbox",
                };
                text(format!("{name}({label:?})"))
            }
            Signal::Slider { kind, label, .. } => {
                let name = match kind {
                    SliderKind::Vertical => "vslider",
                    SliderKind::Horizontal => "hslider",
                    SliderKind::NumEntry => "nentry",
                };
                (format!("{name}({label:?}, "), sig.children(), ")".to_owned())
            }
            Signal::Bargraph { kind, label, .. } => {
                let name = match kind {
                    BargraphKind::Vertical => "vbargraph",
                    BargraphKind::Horizontal => "hbargraph",
                };
                (format!("{name}({label:?}, "), sig.children(), ")".to_owned())
            }
            Signal::Waveform(values) => {
                let parts: Vec<String> = values.iter().map(ToString::to_string).collect();
                text(format!("waveform{{{}}}", parts.join(", ")))
            }
            Signal::ReadOnlyTable { size, .. } => {
                (format!("rdtable[{size}]("), sig.children(), ")".to_owned())
            }
            Signal::WriteReadTable { size, .. } => {
                (format!("rwtable[{size}]("), sig.children(), ")".to_owned())
            }
            Signal::Soundfile { label, channels } => {
                text(format!("soundfile({label:?}, {channels})"))
            }
            Signal::SoundfileLength { .. } => call("length", sig.children()),
            Signal::SoundfileRate { .. } => call("rate", sig.children()),
            Signal::SoundfileBuffer { channel, .. } => {
                (format!("buffer[{channel}]("), sig.children(), ")".to_owned())
            }
            Signal::FConst { name, .. } => text(format!("fconst({name})")),
            Signal::FVar { name, .. } => text(format!("fvar({name})")),
            Signal::Attach(a, b) => call("attach", vec![*a, *b]),
            Signal::RecRef(var) => text(var.to_string()),
            Signal::RecDef { var, bodies } => {
                (format!("rec {var} = ("), bodies.clone(), ")".to_owned())
            }
            Signal::Proj { index, group } => match self.store.get(*group) {
                Some(Signal::RecRef(var)) => text(format!("{var}[{index}]")),
                _ => ("(".to_owned(), vec![*group], format!(")[{index}]")),
            },
        }
    }
}

/// Output still to be written by [`SignalList::render`].
enum Piece {
    Text(String),
    Expr(SigId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_shares_identical_signals() {
        let mut store = SignalStore::new();
        let one = store.intern(Signal::Int(1));
        let a = store.intern(Signal::BinOp(BinaryOp::Add, one, one));
        let b = store.intern(Signal::BinOp(BinaryOp::Add, one, one));
        assert_eq!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn operands_precede_users() {
        let mut store = SignalStore::new();
        let x = store.intern(Signal::Real(Real(0.5)));
        let y = store.intern(Signal::Unary(UnaryOp::Sin, x));
        for (id, sig) in store.iter() {
            for child in sig.children() {
                assert!(child < id);
            }
        }
        assert!(x < y);
    }

    #[test]
    fn render_recursion() {
        let mut store = SignalStore::new();
        let var = RecVar(0);
        let r = store.intern(Signal::RecRef(var));
        let p = store.intern(Signal::Proj { index: 0, group: r });
        let fb = store.intern(Signal::Delay1(p));
        let one = store.intern(Signal::Int(1));
        let body = store.intern(Signal::BinOp(BinaryOp::Add, fb, one));
        let def = store.intern(Signal::RecDef {
            var,
            bodies: vec![body],
        });
        let out = store.intern(Signal::Proj {
            index: 0,
            group: def,
        });
        let list = SignalList::new(store, vec![out]);
        assert_eq!(list.render(out), "(rec R0 = (add(mem(R0[0]), 1)))[0]");
    }
    #[test]
    fn each_signal_is_stored_once() {
        let mut store = SignalStore::new();
        let one = store.intern(Signal::Int(1));
        for _ in 0..3 {
            store.intern(Signal::Unary(UnaryOp::Sin, one));
        }
        let sin = store.find(&Signal::Unary(UnaryOp::Sin, one));
        assert_eq!(sin, Some(SigId(1)));
        assert_eq!(store.find(&Signal::Int(2)), None);
        let indexed: usize = store.buckets.values().map(Vec::len).sum();
        assert_eq!(indexed, store.len());
    }

    #[test]
    fn render_deep_chain() {
        const DEPTH: usize = 200_000;
        let mut store = SignalStore::new();
        let one = store.intern(Signal::Int(1));
        let mut acc = one;
        for _ in 0..DEPTH {
            acc = store.intern(Signal::BinOp(BinaryOp::Add, acc, one));
        }
        let list = SignalList::new(store, vec![acc]);
        let text = list.render(acc);
        assert!(text.starts_with("add(add(add("));
        assert!(text.ends_with(", 1), 1)"));
        assert_eq!(text.matches("add(").count(), DEPTH);
    }
}
