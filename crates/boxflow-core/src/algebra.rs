//! Composition algebra.
//!
//! Each operator checks its legality rule against the operand arities and
//! either registers a composite with the derived arity or returns
//! [`BoxError::ArityMismatch`]. No composite with an illegal arity pairing
//! can be built through these methods.
//!
//! | Operator | Rule | Arity |
//! |---|---|---|
//! | `seq(A, B)` | `oa == ib` | `(ia, ob)` |
//! | `par(A, B)` | sums fit in `usize` | `(ia + ib, oa + ob)` |
//! | `split(A, B)` | `oa > 0`, `ib = k·oa`, `k ≥ 1` | `(ia, ob)` |
//! | `merge(A, B)` | `ib > 0`, `oa = k·ib`, `k ≥ 1` | `(ia, ob)` |
//! | `rec(A, B)` | `oa ≥ ib`, `ia ≥ ob` | `(ia − ob, oa − ib)` |
//! | `attach(A, B)` | `ib == 0` | `(ia, oa)` |
//! | `route(n, m, r)` | `n`, `m` positive constants, pairs in range | `(n, m)` |

use crate::arity::Arity;
use crate::error::BoxError;
use crate::node::{BoxId, BoxNode, CompositeOp};
use crate::session::Session;

/// Derives the arity of `op(A, B)` from the operand arities.
pub fn compose_arity(op: CompositeOp, a: Arity, b: Arity) -> Result<Arity, BoxError> {
    let mismatch = |rule| BoxError::ArityMismatch {
        op: op.name(),
        rule,
        left: a,
        right: b,
    };
    match op {
        CompositeOp::Seq => {
            if a.outputs != b.inputs {
                return Err(mismatch("outputs(A) must equal inputs(B)"));
            }
            Ok(Arity::new(a.inputs, b.outputs))
        }
        CompositeOp::Par => match (
            a.inputs.checked_add(b.inputs),
            a.outputs.checked_add(b.outputs),
        ) {
            (Some(inputs), Some(outputs)) => Ok(Arity::new(inputs, outputs)),
            _ => Err(mismatch("the summed port counts must fit in usize")),
        },
        CompositeOp::Split => {
            if a.outputs == 0 || b.inputs == 0 || b.inputs % a.outputs != 0 {
                return Err(mismatch(
                    "inputs(B) must be a positive multiple of outputs(A)",
                ));
            }
            Ok(Arity::new(a.inputs, b.outputs))
        }
        CompositeOp::Merge => {
            if b.inputs == 0 || a.outputs == 0 || a.outputs % b.inputs != 0 {
                return Err(mismatch(
                    "outputs(A) must be a positive multiple of inputs(B)",
                ));
            }
            Ok(Arity::new(a.inputs, b.outputs))
        }
        CompositeOp::Rec => {
            if a.outputs < b.inputs || a.inputs < b.outputs {
                return Err(mismatch(
                    "outputs(A) >= inputs(B) and inputs(A) >= outputs(B) required",
                ));
            }
            Ok(Arity::new(a.inputs - b.outputs, a.outputs - b.inputs))
        }
        CompositeOp::Attach => {
            if b.inputs != 0 {
                return Err(mismatch("the attached box B must have no inputs"));
            }
            Ok(a)
        }
    }
}

/// Checks that every 1-based route pair lies within the declared counts.
pub(crate) fn check_route_pairs(
    inputs: usize,
    outputs: usize,
    pairs: &[(usize, usize)],
) -> Result<(), String> {
    for &(src, dst) in pairs {
        if !(1..=inputs).contains(&src) || !(1..=outputs).contains(&dst) {
            return Err(format!(
                "pair ({src}, {dst}) lies outside 1..={inputs} x 1..={outputs}"
            ));
        }
    }
    Ok(())
}

impl Session {
    /// Composes two boxes with `op`.
    pub fn compose(&mut self, op: CompositeOp, a: BoxId, b: BoxId) -> Result<BoxId, BoxError> {
        self.check(a)?;
        self.check(b)?;
        let arity = compose_arity(op, self.arity(a)?, self.arity(b)?)?;
        let id = self.intern(
            BoxNode::Composite {
                op,
                left: a,
                right: b,
            },
            arity,
        );
        #[cfg(feature = "tracing")]
        tracing::trace!(op = op.name(), %a, %b, %arity, "compose");
        Ok(id)
    }

    /// Sequential composition `A : B`.
    pub fn seq(&mut self, a: BoxId, b: BoxId) -> Result<BoxId, BoxError> {
        self.compose(CompositeOp::Seq, a, b)
    }

    /// Parallel composition `A , B`.
    pub fn par(&mut self, a: BoxId, b: BoxId) -> Result<BoxId, BoxError> {
        self.compose(CompositeOp::Par, a, b)
    }

    /// Split composition `A <: B`: A's outputs are fanned out cyclically over
    /// B's inputs.
    pub fn split(&mut self, a: BoxId, b: BoxId) -> Result<BoxId, BoxError> {
        self.compose(CompositeOp::Split, a, b)
    }

    /// Merge composition `A :> B`: A's outputs are summed cyclically into
    /// B's inputs.
    pub fn merge(&mut self, a: BoxId, b: BoxId) -> Result<BoxId, BoxError> {
        self.compose(CompositeOp::Merge, a, b)
    }

    /// Recursive composition `A ~ B`, closing the loop through a one-sample
    /// delay.
    pub fn rec(&mut self, a: BoxId, b: BoxId) -> Result<BoxId, BoxError> {
        self.compose(CompositeOp::Rec, a, b)
    }

    /// Attaches the closed box `B` to `A`: the result carries A's signals
    /// and compiles B alongside them.
    pub fn attach(&mut self, a: BoxId, b: BoxId) -> Result<BoxId, BoxError> {
        self.compose(CompositeOp::Attach, a, b)
    }

    /// Folds a non-empty list of boxes with `par`.
    pub fn par_all(&mut self, boxes: &[BoxId]) -> Result<BoxId, BoxError> {
        self.fold(CompositeOp::Par, boxes)
    }

    /// Folds a non-empty list of boxes with `seq`.
    pub fn seq_all(&mut self, boxes: &[BoxId]) -> Result<BoxId, BoxError> {
        self.fold(CompositeOp::Seq, boxes)
    }

    fn fold(&mut self, op: CompositeOp, boxes: &[BoxId]) -> Result<BoxId, BoxError> {
        let (&first, rest) = boxes.split_first().ok_or_else(|| {
            BoxError::malformed(format!("{} over an empty list of boxes", op.name()))
        })?;
        rest.iter().try_fold(first, |acc, &next| self.compose(op, acc, next))
    }

    /// Explicit routing box with `n` inputs and `m` outputs.
    ///
    /// `n` and `m` must be positive integer constants. `r` is a closed box
    /// whose outputs are integer constants read as consecutive 1-based
    /// `(source, destination)` pairs, typically a `par` of `int` boxes.
    /// Several pairs may target the same output (their sources are summed);
    /// outputs no pair targets are silent.
    pub fn route(&mut self, n: BoxId, m: BoxId, r: BoxId) -> Result<BoxId, BoxError> {
        let inputs = self.route_count(n, "input")?;
        let outputs = self.route_count(m, "output")?;

        let values = self.eval_constants(r)?.ok_or_else(|| {
            BoxError::InvalidRoute("routing pairs must be a closed box of constants".into())
        })?;
        if values.len() % 2 != 0 {
            return Err(BoxError::InvalidRoute(format!(
                "routing description has {} values, expected pairs",
                values.len()
            )));
        }
        let mut pairs = Vec::with_capacity(values.len() / 2);
        for pair in values.chunks_exact(2) {
            let index = |c: crate::constant::Constant| {
                c.as_count().ok_or_else(|| {
                    BoxError::InvalidRoute(format!("route index {c} is not a positive integer"))
                })
            };
            pairs.push((index(pair[0])?, index(pair[1])?));
        }
        check_route_pairs(inputs, outputs, &pairs).map_err(BoxError::InvalidRoute)?;

        let id = self.intern(
            BoxNode::Route {
                n,
                m,
                r,
                inputs,
                outputs,
                pairs,
            },
            Arity::new(inputs, outputs),
        );
        Ok(id)
    }

    fn route_count(&mut self, id: BoxId, which: &str) -> Result<usize, BoxError> {
        self.eval_constant(id)?
            .and_then(crate::constant::Constant::as_count)
            .ok_or_else(|| {
                BoxError::InvalidRoute(format!(
                    "{which} count must be a positive integer constant"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arity(i: usize, o: usize) -> Arity {
        Arity::new(i, o)
    }

    #[test]
    fn seq_requires_matching_counts() {
        assert_eq!(
            compose_arity(CompositeOp::Seq, arity(2, 1), arity(1, 1)),
            Ok(arity(2, 1))
        );
        assert!(matches!(
            compose_arity(CompositeOp::Seq, arity(2, 1), arity(2, 1)),
            Err(BoxError::ArityMismatch { op: "seq", .. })
        ));
    }

    #[test]
    fn par_always_legal() {
        assert_eq!(
            compose_arity(CompositeOp::Par, arity(0, 0), arity(3, 2)),
            Ok(arity(3, 2))
        );
    }

    #[test]
    fn par_overflow_is_reported() {
        assert!(matches!(
            compose_arity(CompositeOp::Par, arity(0, usize::MAX), arity(0, 1)),
            Err(BoxError::ArityMismatch { op: "par", .. })
        ));

        let mut s = Session::new().unwrap();
        let mut bus = s.int(1);
        let mut failed = None;
        for level in 0..70 {
            match s.par(bus, bus) {
                Ok(next) => bus = next,
                Err(err) => {
                    failed = Some((level, err));
                    break;
                }
            }
        }
        let (level, err) = failed.expect("doubling must overflow");
        assert_eq!(level, usize::BITS as usize - 1);
        assert!(matches!(err, BoxError::ArityMismatch { op: "par", .. }));
    }

    #[test]
    fn split_requires_multiple() {
        assert_eq!(
            compose_arity(CompositeOp::Split, arity(0, 1), arity(3, 1)),
            Ok(arity(0, 1))
        );
        assert!(compose_arity(CompositeOp::Split, arity(0, 2), arity(3, 1)).is_err());
        assert!(compose_arity(CompositeOp::Split, arity(0, 0), arity(3, 1)).is_err());
        assert!(compose_arity(CompositeOp::Split, arity(0, 2), arity(0, 1)).is_err());
    }

    #[test]
    fn merge_requires_multiple() {
        assert_eq!(
            compose_arity(CompositeOp::Merge, arity(1, 4), arity(2, 1)),
            Ok(arity(1, 1))
        );
        assert!(compose_arity(CompositeOp::Merge, arity(1, 3), arity(2, 1)).is_err());
        assert!(compose_arity(CompositeOp::Merge, arity(1, 3), arity(0, 1)).is_err());
        assert!(compose_arity(CompositeOp::Merge, arity(1, 0), arity(2, 1)).is_err());
    }

    #[test]
    fn rec_arity() {
        assert_eq!(
            compose_arity(CompositeOp::Rec, arity(2, 2), arity(1, 1)),
            Ok(arity(1, 1))
        );
        assert!(compose_arity(CompositeOp::Rec, arity(1, 0), arity(1, 1)).is_err());
        assert!(compose_arity(CompositeOp::Rec, arity(0, 1), arity(1, 1)).is_err());
    }

    #[test]
    fn attach_requires_closed_right_operand() {
        assert_eq!(
            compose_arity(CompositeOp::Attach, arity(1, 1), arity(0, 3)),
            Ok(arity(1, 1))
        );
        assert!(compose_arity(CompositeOp::Attach, arity(1, 1), arity(1, 0)).is_err());
    }

    #[test]
    fn session_operators_register_composites() {
        let mut s = Session::new().unwrap();
        let add = s.add();
        let wire = s.wire();
        let chain = s.seq(add, wire).unwrap();
        assert_eq!(s.arity(chain).unwrap(), arity(2, 1));
        assert_eq!(s.seq(add, wire).unwrap(), chain);
    }

    #[test]
    fn mismatch_reports_both_arities() {
        let mut s = Session::new().unwrap();
        let add = s.add();
        let err = s.seq(add, add).unwrap_err();
        assert_eq!(
            err,
            BoxError::ArityMismatch {
                op: "seq",
                rule: "outputs(A) must equal inputs(B)",
                left: arity(2, 1),
                right: arity(2, 1),
            }
        );
    }

    #[test]
    fn fold_helpers() {
        let mut s = Session::new().unwrap();
        let wire = s.wire();
        let bus = s.par_all(&[wire, wire, wire]).unwrap();
        assert_eq!(s.arity(bus).unwrap(), arity(3, 3));
        let chain = s.seq_all(&[wire, wire]).unwrap();
        assert_eq!(s.arity(chain).unwrap(), arity(1, 1));
        assert!(matches!(
            s.par_all(&[]),
            Err(BoxError::MalformedGraph(_))
        ));
    }

    #[test]
    fn route_from_constant_descriptor() {
        let mut s = Session::new().unwrap();
        let two = s.int(2);
        let one = s.int(1);
        let pairs = s.par_all(&[one, two, two, one]).unwrap();
        let swap = s.route(two, two, pairs).unwrap();
        assert_eq!(s.arity(swap).unwrap(), arity(2, 2));
        match s.node(swap).unwrap() {
            BoxNode::Route { pairs, .. } => assert_eq!(pairs, &vec![(1, 2), (2, 1)]),
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn route_rejects_bad_descriptors() {
        let mut s = Session::new().unwrap();
        let zero = s.int(0);
        let one = s.int(1);
        let two = s.int(2);
        let three = s.int(3);
        let ok_pairs = s.par(one, one).unwrap();

        assert!(matches!(
            s.route(zero, one, ok_pairs),
            Err(BoxError::InvalidRoute(_))
        ));

        let odd = s.par_all(&[one, one, two]).unwrap();
        assert!(matches!(
            s.route(two, two, odd),
            Err(BoxError::InvalidRoute(_))
        ));

        let out_of_range = s.par(three, one).unwrap();
        assert!(matches!(
            s.route(two, two, out_of_range),
            Err(BoxError::InvalidRoute(_))
        ));

        let ctl = s.button("b");
        let dynamic = s.par(ctl, one).unwrap();
        assert!(matches!(
            s.route(two, two, dynamic),
            Err(BoxError::InvalidRoute(_))
        ));
    }
}
