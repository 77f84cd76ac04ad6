//! Cycle resolution.
//!
//! Two passes keep the flattener a plain tree walker:
//!
//! - [`check_structure`] visits every box reachable from the root in
//!   post-order and re-derives composite arities from their operands. Boxes
//!   admitted through [`Session::insert_unchecked`](crate::Session::insert_unchecked)
//!   are only trusted after this pass.
//! - [`RecResolver`] turns each `rec(A, B)` met during flattening into a
//!   named recursion group. The feedback wires become one-sample delayed
//!   projections of `RecRef(R<n>)`, and A's outputs become the bodies of
//!   `RecDef(R<n>)`. Closing a group checks that every path from a body back
//!   to its own reference keeps at least one sample of delay.

use std::collections::HashSet;

use crate::algebra::{check_route_pairs, compose_arity};
use crate::arity::Arity;
use crate::error::BoxError;
use crate::interval::IntervalAnalysis;
use crate::node::{BoxId, BoxNode};
use crate::signal::{RecVar, SigId, Signal, SignalStore};
use crate::store::BoxStore;

/// Re-checks the arity of every box reachable from `root`.
///
/// # Errors
///
/// [`BoxError::MalformedGraph`] naming the first inconsistent box.
pub(crate) fn check_structure(store: &BoxStore, root: BoxId) -> Result<(), BoxError> {
    let mut visited = HashSet::new();
    // (box, children pushed)
    let mut stack = vec![(root, false)];
    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            check_node(store, id)?;
            continue;
        }
        if !visited.insert(id) {
            continue;
        }
        stack.push((id, true));
        for child in store.node(id)?.children() {
            store.check(child)?;
            if !visited.contains(&child) {
                stack.push((child, false));
            }
        }
    }
    Ok(())
}

fn check_node(store: &BoxStore, id: BoxId) -> Result<(), BoxError> {
    let node = store.node(id)?;
    let stored = store.arity(id)?;
    let derived = match node {
        BoxNode::Leaf(leaf) => {
            for param in leaf.params() {
                let arity = store.arity(param)?;
                if arity != Arity::SOURCE {
                    return Err(BoxError::malformed(format!(
                        "{} {id}: parameter {param} has arity {arity}, expected {}",
                        leaf.kind_name(),
                        Arity::SOURCE
                    )));
                }
            }
            leaf.arity()
        }
        BoxNode::Composite { op, left, right } => {
            compose_arity(*op, store.arity(*left)?, store.arity(*right)?)
                .map_err(|err| BoxError::malformed(format!("{id}: {err}")))?
        }
        BoxNode::Route {
            inputs,
            outputs,
            pairs,
            ..
        } => {
            check_route_pairs(*inputs, *outputs, pairs)
                .map_err(|msg| BoxError::malformed(format!("route {id}: {msg}")))?;
            Arity::new(*inputs, *outputs)
        }
    };
    if derived != stored {
        return Err(BoxError::malformed(format!(
            "{} {id}: recorded arity {stored} but its structure gives {derived}",
            node.kind_name()
        )));
    }
    Ok(())
}

/// Allocates recursion groups and checks their feedback delays.
#[derive(Debug, Default)]
pub(crate) struct RecResolver {
    next_var: u32,
    intervals: IntervalAnalysis,
}

impl RecResolver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Opens a fresh group and returns the delayed feedback signals for the
    /// first `feedback` outputs.
    pub(crate) fn open(&mut self, signals: &mut SignalStore, feedback: usize) -> (RecVar, Vec<SigId>) {
        let var = RecVar(self.next_var);
        self.next_var += 1;
        let group = signals.intern(Signal::RecRef(var));
        let wires = (0..feedback)
            .map(|index| {
                let proj = signals.intern(Signal::Proj { index, group });
                signals.intern(Signal::Delay1(proj))
            })
            .collect();
        (var, wires)
    }

    /// Closes a group over its bodies and returns the `RecDef` signal.
    ///
    /// # Errors
    ///
    /// [`BoxError::UnresolvableRecursion`] if some body can reach its own
    /// group with less than one sample of delay.
    pub(crate) fn close(
        &mut self,
        signals: &mut SignalStore,
        var: RecVar,
        bodies: Vec<SigId>,
    ) -> Result<SigId, BoxError> {
        self.intervals.update(signals);
        let delays = LoopDelay::compute(signals, &self.intervals, var);
        for &body in &bodies {
            if let Some(delay) = delays.get(body)
                && delay < 1
            {
                return Err(BoxError::UnresolvableRecursion {
                    var: var.to_string(),
                    delay: render_delay(delay),
                });
            }
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(%var, outputs = bodies.len(), "rec_resolved");
        Ok(signals.intern(Signal::RecDef { var, bodies }))
    }
}

fn render_delay(delay: i64) -> String {
    if delay == i64::MIN {
        "-inf".to_owned()
    } else {
        delay.to_string()
    }
}

/// Minimum accumulated delay from each signal back to `RecRef(var)`.
///
/// Operands precede their users in the store, and nothing created before
/// the group's reference can depend on it, so one forward pass starting at
/// that reference settles every signal.
struct LoopDelay<'a> {
    signals: &'a SignalStore,
    intervals: &'a IntervalAnalysis,
    start: usize,
    delays: Vec<Option<i64>>,
}

impl<'a> LoopDelay<'a> {
    fn compute(signals: &'a SignalStore, intervals: &'a IntervalAnalysis, var: RecVar) -> Self {
        let start = signals
            .find(&Signal::RecRef(var))
            .map_or(signals.len(), SigId::index);
        let mut walk = Self {
            signals,
            intervals,
            start,
            delays: Vec::with_capacity(signals.len() - start),
        };
        for (_, sig) in signals.iter().skip(start) {
            let delay = walk.delay_of(sig, var);
            walk.delays.push(delay);
        }
        walk
    }

    /// `None` if the signal does not depend on the group at all.
    fn get(&self, id: SigId) -> Option<i64> {
        id.index()
            .checked_sub(self.start)
            .and_then(|i| self.delays.get(i).copied().flatten())
    }

    fn delay_of(&self, sig: &Signal, var: RecVar) -> Option<i64> {
        match sig {
            Signal::RecRef(v) => (*v == var).then_some(0),
            Signal::Delay1(x) => self.get(*x).map(|d| d.saturating_add(1)),
            Signal::Delay(x, amount) => {
                let samples = self.intervals.get(*amount).floor_samples();
                let through_signal = self.get(*x).map(|d| d.saturating_add(samples));
                min_option(through_signal, self.get(*amount))
            }
            Signal::Proj { index, group } => match self.signals.node(*group) {
                Signal::RecDef { bodies, .. } => bodies.get(*index).and_then(|&b| self.get(b)),
                _ => self.get(*group),
            },
            other => other
                .children()
                .into_iter()
                .fold(None, |acc, c| min_option(acc, self.get(c))),
        }
    }
}

fn min_option(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) => x,
        (None, y) => y,
    }
}
