//! Boxflow Core - signal-flow box IR
//!
//! This crate builds, validates and flattens block diagrams ("boxes") of
//! per-sample signal processors. A front end creates primitive boxes and
//! combines them with a small composition algebra; the engine checks every
//! composition against its arity rule and finally lowers a closed box into
//! one acyclic signal expression per output for a code generator.
//!
//! # Core Abstractions
//!
//! ## Sessions
//!
//! - [`Session`] - Explicit compilation context owning every box
//! - [`SessionOptions`] - Depth limit and constant folding
//! - [`create_lib_context`] / [`with_lib_context`] / [`destroy_lib_context`] -
//!   Thread-local context for create/destroy style callers
//!
//! ## Boxes
//!
//! - [`BoxId`] - Handle to a box, tagged with its session
//! - [`BoxNode`], [`Leaf`], [`CompositeOp`] - Closed set of node kinds
//! - [`Arity`] - `(inputs, outputs)` of a box
//! - [`compose_arity`] - Legality rules of `seq`, `par`, `split`, `merge`,
//!   `rec` and `attach`
//!
//! ## Signals
//!
//! - [`SignalList`] - Flattened output: hash-consed arena plus output roots
//! - [`Signal`], [`SigId`], [`RecVar`] - Expression nodes; recursion is
//!   named, never cyclic
//! - [`IntervalAnalysis`] - Conservative value ranges
//!
//! # Example
//!
//! A one-pole smoother `y[n] = 0.1 * x + 0.9 * y[n-1]`, with the input
//! taken from a slider:
//!
//! ```rust
//! use boxflow_core::{Session, Signal};
//!
//! let mut s = Session::new()?;
//! let (init, lo, hi, step) = (s.real(0.5), s.real(0.0), s.real(1.0), s.real(0.01));
//! let input = s.hslider("level", init, lo, hi, step)?;
//!
//! // A: y = x' + 0.1 * x, duplicated so one copy feeds back
//! let (k_in, k_fb) = (s.real(0.1), s.real(0.9));
//! let mul = s.mul();
//! let wire = s.wire();
//! let k_in_wire = s.par(wire, k_in)?;
//! let scale_in = s.seq(k_in_wire, mul)?;
//! let add = s.add();
//! let body = s.par(wire, scale_in)?;
//! let sum = s.seq(body, add)?;
//! let pair = s.par(wire, wire)?;
//! let dup = s.split(wire, pair)?;
//! let a = s.seq(sum, dup)?;
//! // B: x' = 0.9 * y[n-1]
//! let k_fb_wire = s.par(wire, k_fb)?;
//! let b = s.seq(k_fb_wire, mul)?;
//!
//! let smoother = s.rec(a, b)?;
//! let program = s.seq(input, smoother)?;
//! let signals = s.flatten(program)?;
//!
//! assert_eq!(signals.len(), 1);
//! assert!(matches!(signals.get(signals.outputs()[0]), Some(Signal::Proj { .. })));
//! # Ok::<(), boxflow_core::BoxError>(())
//! ```

pub mod algebra;
pub mod arity;
pub mod constant;
pub mod context;
pub mod error;
pub mod flatten;
pub mod interval;
pub mod node;
pub mod op;
pub mod primitives;
mod resolve;
pub mod session;
pub mod signal;
pub mod store;

// Re-export main types at crate root
pub use algebra::compose_arity;
pub use arity::Arity;
pub use constant::{Constant, Real};
pub use context::{
    create_lib_context, create_lib_context_with, destroy_lib_context, with_lib_context,
};
pub use error::BoxError;
pub use interval::{Interval, IntervalAnalysis};
pub use node::{BargraphKind, BoxId, BoxNode, ButtonKind, CompositeOp, Leaf, SliderKind};
pub use op::{BinaryOp, SType, UnaryOp};
pub use session::{Session, SessionOptions};
pub use signal::{RecVar, SigId, Signal, SignalList, SignalStore};
pub use store::BoxStore;
