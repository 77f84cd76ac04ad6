//! Flattener: closed box → list of signal expressions.
//!
//! The walk is a depth-first propagation: each box receives the signals on
//! its inputs and returns the signals on its outputs. Composites wire their
//! operands according to the algebra; `rec` goes through the
//! [`RecResolver`] so the result never contains a cycle. Results are
//! memoized on `(box, input signals)` and every signal is hash-consed, so a
//! box reached along two paths with the same inputs yields the same nodes.
//!
//! The walk runs on an explicit task stack with a parallel stack of
//! intermediate results, so nesting depth never touches the thread stack.

use std::collections::HashMap;
use std::ops::Range;

use crate::arity::Arity;
use crate::constant::{Constant, cast_int, cast_real, fold_binary, fold_unary};
use crate::error::BoxError;
use crate::node::{BoxId, BoxNode, CompositeOp, Leaf};
use crate::op::{BinaryOp, UnaryOp};
use crate::resolve::{RecResolver, check_structure};
use crate::session::Session;
use crate::signal::{RecVar, SigId, Signal, SignalList, SignalStore};
use crate::store::BoxStore;

/// Pending step of the walk.
///
/// Continuation tasks read the outputs of the operand they wait for from
/// the top of the result stack.
enum Task {
    /// Flatten `id` with `inputs` on its input wires.
    Visit {
        id: BoxId,
        inputs: Vec<SigId>,
        depth: usize,
    },
    /// Check and memoize the outputs of `id`.
    Finish {
        id: BoxId,
        inputs: Vec<SigId>,
        expected: usize,
    },
    /// Build a primitive once its `params` parameter signals are available.
    Leaf {
        id: BoxId,
        inputs: Vec<SigId>,
        params: usize,
    },
    SeqRight {
        right: BoxId,
        depth: usize,
    },
    ParRight {
        right: BoxId,
        inputs: Vec<SigId>,
        depth: usize,
    },
    SplitRight {
        right: BoxId,
        width: usize,
        depth: usize,
    },
    MergeRight {
        right: BoxId,
        width: usize,
        depth: usize,
    },
    RecLeft {
        left: BoxId,
        inputs: Vec<SigId>,
        var: RecVar,
        exposed: Range<usize>,
        depth: usize,
    },
    RecClose {
        var: RecVar,
        exposed: Range<usize>,
    },
    AttachRight {
        right: BoxId,
        depth: usize,
    },
    /// Append the top result to the one below it.
    Concat,
    /// Attach the top result onto the first signal of the one below it.
    AttachJoin,
}

struct Flattener<'a> {
    boxes: &'a BoxStore,
    max_depth: usize,
    fold: bool,
    signals: SignalStore,
    resolver: RecResolver,
    memo: HashMap<(BoxId, Vec<SigId>), Vec<SigId>>,
    tasks: Vec<Task>,
    results: Vec<Vec<SigId>>,
    retained: Vec<SigId>,
}

impl<'a> Flattener<'a> {
    fn new(boxes: &'a BoxStore, max_depth: usize, fold: bool) -> Self {
        Self {
            boxes,
            max_depth,
            fold,
            signals: SignalStore::new(),
            resolver: RecResolver::new(),
            memo: HashMap::new(),
            tasks: Vec::new(),
            results: Vec::new(),
            retained: Vec::new(),
        }
    }

    fn run(mut self, root: BoxId) -> Result<SignalList, BoxError> {
        self.tasks.push(Task::Visit {
            id: root,
            inputs: Vec::new(),
            depth: 0,
        });
        while let Some(task) = self.tasks.pop() {
            self.step(task)?;
        }
        let outputs = self.pop()?;
        Ok(SignalList::new(self.signals, outputs).with_retained(self.retained))
    }

    fn pop(&mut self) -> Result<Vec<SigId>, BoxError> {
        self.results
            .pop()
            .ok_or_else(|| BoxError::malformed("flattener result stack underflow"))
    }

    fn step(&mut self, task: Task) -> Result<(), BoxError> {
        match task {
            Task::Visit { id, inputs, depth } => self.visit(id, inputs, depth)?,
            Task::Finish {
                id,
                inputs,
                expected,
            } => {
                let outputs = self.pop()?;
                if outputs.len() != expected {
                    return Err(BoxError::malformed(format!(
                        "{} {id} produced {} output(s), expected {expected}",
                        self.boxes.node(id)?.kind_name(),
                        outputs.len(),
                    )));
                }
                self.memo.insert((id, inputs), outputs.clone());
                self.results.push(outputs);
            }
            Task::Leaf { id, inputs, params } => {
                let boxes = self.boxes;
                let BoxNode::Leaf(leaf) = boxes.node(id)? else {
                    return Err(BoxError::malformed(format!("{id} is not a primitive")));
                };
                let at = self
                    .results
                    .len()
                    .checked_sub(params)
                    .ok_or_else(|| BoxError::malformed("flattener result stack underflow"))?;
                let params = self
                    .results
                    .split_off(at)
                    .into_iter()
                    .map(|out| match out.as_slice() {
                        [sig] => Ok(*sig),
                        _ => Err(BoxError::malformed(format!(
                            "parameter of {id} yields {} signals, expected 1",
                            out.len()
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let out = self.leaf(leaf, &inputs, &params)?;
                self.results.push(out);
            }
            Task::SeqRight { right, depth } => {
                let mid = self.pop()?;
                self.push_visit(right, mid, depth);
            }
            Task::ParRight {
                right,
                inputs,
                depth,
            } => {
                self.tasks.push(Task::Concat);
                self.push_visit(right, inputs, depth);
            }
            Task::SplitRight {
                right,
                width,
                depth,
            } => {
                let fan = self.pop()?;
                if fan.is_empty() {
                    return Err(BoxError::malformed("split from a box without outputs"));
                }
                let spread = (0..width).map(|j| fan[j % fan.len()]).collect();
                self.push_visit(right, spread, depth);
            }
            Task::MergeRight {
                right,
                width,
                depth,
            } => {
                let many = self.pop()?;
                let mut sums = Vec::with_capacity(width);
                for j in 0..width {
                    let mut group = many.iter().skip(j).step_by(width).copied();
                    let first = group.next().ok_or_else(|| {
                        BoxError::malformed(format!("merge input {j} receives no signal"))
                    })?;
                    let sum = group.fold(first, |acc, x| self.binary(BinaryOp::Add, acc, x));
                    sums.push(sum);
                }
                self.push_visit(right, sums, depth);
            }
            Task::RecLeft {
                left,
                inputs,
                var,
                exposed,
                depth,
            } => {
                let mut a_inputs = self.pop()?;
                a_inputs.extend(inputs);
                self.tasks.push(Task::RecClose { var, exposed });
                self.push_visit(left, a_inputs, depth);
            }
            Task::RecClose { var, exposed } => {
                let bodies = self.pop()?;
                let def = self.resolver.close(&mut self.signals, var, bodies)?;
                let out = exposed
                    .map(|index| self.signals.intern(Signal::Proj { index, group: def }))
                    .collect();
                self.results.push(out);
            }
            Task::AttachRight { right, depth } => {
                self.tasks.push(Task::AttachJoin);
                self.push_visit(right, Vec::new(), depth);
            }
            Task::Concat => {
                let rhs = self.pop()?;
                let mut lhs = self.pop()?;
                lhs.extend(rhs);
                self.results.push(lhs);
            }
            Task::AttachJoin => {
                let kept = self.pop()?;
                let mut out = self.pop()?;
                match out.first_mut() {
                    Some(first) => {
                        for sig in kept {
                            *first = self.signals.intern(Signal::Attach(*first, sig));
                        }
                    }
                    None => {
                        for sig in kept {
                            if !self.retained.contains(&sig) {
                                self.retained.push(sig);
                            }
                        }
                    }
                }
                self.results.push(out);
            }
        }
        Ok(())
    }

    fn push_visit(&mut self, id: BoxId, inputs: Vec<SigId>, depth: usize) {
        self.tasks.push(Task::Visit { id, inputs, depth });
    }

    /// Starts flattening `id`: answers from the memo, or schedules the work
    /// followed by a [`Task::Finish`].
    fn visit(&mut self, id: BoxId, inputs: Vec<SigId>, depth: usize) -> Result<(), BoxError> {
        if depth > self.max_depth {
            return Err(BoxError::DepthLimitExceeded {
                limit: self.max_depth,
            });
        }
        let arity = self.boxes.arity(id)?;
        if inputs.len() != arity.inputs {
            return Err(BoxError::malformed(format!(
                "{id} expects {} input(s), {} supplied",
                arity.inputs,
                inputs.len()
            )));
        }
        let key = (id, inputs);
        if let Some(outputs) = self.memo.get(&key) {
            self.results.push(outputs.clone());
            return Ok(());
        }
        let (id, inputs) = key;

        let boxes = self.boxes;
        self.tasks.push(Task::Finish {
            id,
            inputs: inputs.clone(),
            expected: arity.outputs,
        });
        let next = depth + 1;
        match boxes.node(id)? {
            BoxNode::Leaf(leaf) => {
                let params = leaf.params();
                self.tasks.push(Task::Leaf {
                    id,
                    inputs,
                    params: params.len(),
                });
                for &param in params.iter().rev() {
                    self.push_visit(param, Vec::new(), next);
                }
            }
            BoxNode::Composite { op, left, right } => {
                let (left, right) = (*left, *right);
                let a = boxes.arity(left)?;
                let b = boxes.arity(right)?;
                match op {
                    CompositeOp::Seq => {
                        self.tasks.push(Task::SeqRight { right, depth: next });
                        self.push_visit(left, inputs, next);
                    }
                    CompositeOp::Par => {
                        let (lhs, rhs) = inputs.split_at(a.inputs.min(inputs.len()));
                        self.tasks.push(Task::ParRight {
                            right,
                            inputs: rhs.to_vec(),
                            depth: next,
                        });
                        self.push_visit(left, lhs.to_vec(), next);
                    }
                    CompositeOp::Split => {
                        self.tasks.push(Task::SplitRight {
                            right,
                            width: b.inputs,
                            depth: next,
                        });
                        self.push_visit(left, inputs, next);
                    }
                    CompositeOp::Merge => {
                        if b.inputs == 0 {
                            return Err(BoxError::malformed("merge into a box without inputs"));
                        }
                        self.tasks.push(Task::MergeRight {
                            right,
                            width: b.inputs,
                            depth: next,
                        });
                        self.push_visit(left, inputs, next);
                    }
                    CompositeOp::Rec => {
                        if a.outputs < b.inputs || a.inputs < b.outputs {
                            return Err(BoxError::malformed(format!(
                                "rec of {a} with {b} has no consistent wiring"
                            )));
                        }
                        let (var, feedback) = self.resolver.open(&mut self.signals, b.inputs);
                        self.tasks.push(Task::RecLeft {
                            left,
                            inputs,
                            var,
                            exposed: b.inputs..a.outputs,
                            depth: next,
                        });
                        self.push_visit(right, feedback, next);
                    }
                    CompositeOp::Attach => {
                        self.tasks.push(Task::AttachRight { right, depth: next });
                        self.push_visit(left, inputs, next);
                    }
                }
            }
            BoxNode::Route { outputs, pairs, .. } => {
                let out = self.route(*outputs, pairs, &inputs)?;
                self.results.push(out);
            }
        }
        Ok(())
    }

    fn route(
        &mut self,
        outputs: usize,
        pairs: &[(usize, usize)],
        inputs: &[SigId],
    ) -> Result<Vec<SigId>, BoxError> {
        let mut slots: Vec<Option<SigId>> = vec![None; outputs];
        for &(src, dst) in pairs {
            let sig = src
                .checked_sub(1)
                .and_then(|i| inputs.get(i))
                .copied()
                .ok_or_else(|| BoxError::malformed(format!("route source {src} out of range")))?;
            let slot = dst
                .checked_sub(1)
                .and_then(|i| slots.get_mut(i))
                .ok_or_else(|| {
                    BoxError::malformed(format!("route destination {dst} out of range"))
                })?;
            let merged = match *slot {
                Some(acc) => self.binary(BinaryOp::Add, acc, sig),
                None => sig,
            };
            *slot = Some(merged);
        }
        Ok(slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| self.signals.intern(Signal::Int(0))))
            .collect())
    }

    /// Builds a primitive from its input signals and flattened parameters.
    fn leaf(
        &mut self,
        leaf: &Leaf,
        inputs: &[SigId],
        params: &[SigId],
    ) -> Result<Vec<SigId>, BoxError> {
        let missing = || BoxError::malformed(format!("{} is missing parameters", leaf.kind_name()));
        let out = match leaf {
            Leaf::Int(n) => vec![self.signals.intern(Signal::Int(*n))],
            Leaf::Real(r) => vec![self.signals.intern(Signal::Real(*r))],
            Leaf::Wire => inputs.to_vec(),
            Leaf::Cut => Vec::new(),
            Leaf::BinOp(op) => vec![self.binary(*op, inputs[0], inputs[1])],
            Leaf::Unary(op) => vec![self.unary(*op, inputs[0])],
            Leaf::Button { kind, label } => vec![self.signals.intern(Signal::Button {
                kind: *kind,
                label: label.clone(),
            })],
            Leaf::Slider { kind, label, .. } => {
                let &[init, min, max, step] = params else {
                    return Err(missing());
                };
                vec![self.signals.intern(Signal::Slider {
                    kind: *kind,
                    label: label.clone(),
                    init,
                    min,
                    max,
                    step,
                })]
            }
            Leaf::Bargraph { kind, label, .. } => {
                let &[min, max] = params else {
                    return Err(missing());
                };
                vec![self.signals.intern(Signal::Bargraph {
                    kind: *kind,
                    label: label.clone(),
                    min,
                    max,
                    input: inputs[0],
                })]
            }
            Leaf::Waveform(values) => {
                let size = i32::try_from(values.len())
                    .map_err(|_| BoxError::malformed("waveform too large"))?;
                vec![
                    self.signals.intern(Signal::Int(size)),
                    self.signals.intern(Signal::Waveform(values.clone())),
                ]
            }
            Leaf::ReadOnlyTable { size } => vec![self.signals.intern(Signal::ReadOnlyTable {
                size: *size,
                init: inputs[0],
                index: inputs[1],
            })],
            Leaf::WriteReadTable { size } => vec![self.signals.intern(Signal::WriteReadTable {
                size: *size,
                write_index: inputs[0],
                write_value: inputs[1],
                index: inputs[2],
            })],
            Leaf::Soundfile { label, channels } => {
                let file = self.signals.intern(Signal::Soundfile {
                    label: label.clone(),
                    channels: *channels,
                });
                let (part, index) = (inputs[0], inputs[1]);
                let mut out = vec![
                    self.signals.intern(Signal::SoundfileLength { file, part }),
                    self.signals.intern(Signal::SoundfileRate { file, part }),
                ];
                out.extend((0..*channels).map(|channel| {
                    self.signals.intern(Signal::SoundfileBuffer {
                        file,
                        channel,
                        part,
                        index,
                    })
                }));
                out
            }
            Leaf::FConst { ty, name, file } => vec![self.signals.intern(Signal::FConst {
                ty: *ty,
                name: name.clone(),
                file: file.clone(),
            })],
            Leaf::FVar { ty, name, file } => vec![self.signals.intern(Signal::FVar {
                ty: *ty,
                name: name.clone(),
                file: file.clone(),
            })],
            Leaf::Delay => {
                let (x, amount) = (inputs[0], inputs[1]);
                if self.fold && self.constant(amount) == Some(Constant::Int(0)) {
                    vec![x]
                } else {
                    vec![self.signals.intern(Signal::Delay(x, amount))]
                }
            }
            Leaf::IntCast => {
                let x = inputs[0];
                vec![match self.folded(x) {
                    Some(c) => self.signals.intern(cast_int(c).into()),
                    None => self.signals.intern(Signal::IntCast(x)),
                }]
            }
            Leaf::FloatCast => {
                let x = inputs[0];
                vec![match self.folded(x) {
                    Some(c) => self.signals.intern(cast_real(c).into()),
                    None => self.signals.intern(Signal::FloatCast(x)),
                }]
            }
            Leaf::Select(_) => {
                let (selector, branches) = (inputs[0], &inputs[1..]);
                let picked = self
                    .folded(selector)
                    .and_then(Constant::as_int)
                    .and_then(|k| usize::try_from(k).ok())
                    .and_then(|k| branches.get(k).copied());
                vec![match picked {
                    Some(sig) => sig,
                    None => self.signals.intern(Signal::Select {
                        selector,
                        branches: branches.to_vec(),
                    }),
                }]
            }
            Leaf::Attach => vec![self.signals.intern(Signal::Attach(inputs[0], inputs[1]))],
        };
        Ok(out)
    }

    fn binary(&mut self, op: BinaryOp, a: SigId, b: SigId) -> SigId {
        if let (Some(x), Some(y)) = (self.folded(a), self.folded(b))
            && let Some(c) = fold_binary(op, x, y)
        {
            return self.signals.intern(c.into());
        }
        self.signals.intern(Signal::BinOp(op, a, b))
    }

    fn unary(&mut self, op: UnaryOp, x: SigId) -> SigId {
        if let Some(c) = self.folded(x).and_then(|c| fold_unary(op, c)) {
            return self.signals.intern(c.into());
        }
        self.signals.intern(Signal::Unary(op, x))
    }

    /// The constant value of `id` when folding is enabled.
    fn folded(&self, id: SigId) -> Option<Constant> {
        if self.fold { self.constant(id) } else { None }
    }

    fn constant(&self, id: SigId) -> Option<Constant> {
        self.signals.get(id).and_then(Signal::constant)
    }
}

impl Session {
    /// Flattens a closed box into one signal expression per output.
    ///
    /// # Errors
    ///
    /// - [`BoxError::OpenInput`] if `root` still has inputs.
    /// - [`BoxError::MalformedGraph`] if a box admitted without checks turns
    ///   out to be inconsistent.
    /// - [`BoxError::DepthLimitExceeded`] if nesting exceeds
    ///   [`max_depth`](crate::SessionOptions::max_depth).
    /// - [`BoxError::UnresolvableRecursion`] if a feedback loop can lose its
    ///   one-sample delay.
    pub fn flatten(&self, root: BoxId) -> Result<SignalList, BoxError> {
        self.flatten_with(root, self.options().fold_constants)
    }

    /// Flattens `root`, reporting failure through `error` instead of a
    /// `Result`.
    ///
    /// On failure the returned list is empty and `error` holds the
    /// diagnostic; on success `error` is cleared.
    pub fn boxes_to_signals(&self, root: BoxId, error: &mut String) -> SignalList {
        error.clear();
        match self.flatten(root) {
            Ok(list) => list,
            Err(err) => {
                *error = err.to_string();
                SignalList::new(SignalStore::new(), Vec::new())
            }
        }
    }

    /// Evaluates a 0→1 box to a constant, if it is a constant numerical
    /// expression.
    ///
    /// Returns `Ok(None)` for boxes that are not closed single-output boxes
    /// or that do not fold (controls, foreign symbols, delays).
    pub fn eval_constant(&self, id: BoxId) -> Result<Option<Constant>, BoxError> {
        if self.arity(id)? != Arity::SOURCE {
            return Ok(None);
        }
        Ok(self.eval_constants(id)?.and_then(|values| values.first().copied()))
    }

    /// Evaluates every output of a closed box to a constant.
    ///
    /// Returns `Ok(None)` if the box has inputs or any output does not fold.
    pub fn eval_constants(&self, id: BoxId) -> Result<Option<Vec<Constant>>, BoxError> {
        if self.arity(id)?.inputs != 0 {
            return Ok(None);
        }
        let list = self.flatten_with(id, true)?;
        Ok(list
            .outputs()
            .iter()
            .map(|&sig| list.get(sig).and_then(Signal::constant))
            .collect())
    }

    fn flatten_with(&self, root: BoxId, fold: bool) -> Result<SignalList, BoxError> {
        let arity = self.arity(root)?;
        if arity.inputs != 0 {
            return Err(BoxError::OpenInput {
                inputs: arity.inputs,
            });
        }
        check_structure(self.store(), root)?;
        let list = Flattener::new(self.store(), self.options().max_depth, fold).run(root)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            %root,
            outputs = list.len(),
            nodes = list.node_count(),
            fold,
            "flatten"
        );
        Ok(list)
    }
}
