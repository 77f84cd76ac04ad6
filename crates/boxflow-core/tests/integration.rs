//! Integration tests for boxflow-core.
//!
//! Builds small but complete box programs through the public API and checks
//! the flattened signal lists: wiring of every composition operator,
//! subexpression sharing, recursion resolution and the error paths of the
//! flatten boundary.

use boxflow_core::{
    Arity, BinaryOp, BoxError, BoxId, BoxNode, CompositeOp, Constant, Session, Signal,
    SignalList, create_lib_context, destroy_lib_context, with_lib_context,
};

/// `hslider(label, init, min, max, 1)` with integer parameters.
fn slider(s: &mut Session, label: &str, init: i32, min: i32, max: i32) -> BoxId {
    let init = s.int(init);
    let min = s.int(min);
    let max = s.int(max);
    let step = s.int(1);
    s.hslider(label, init, min, max, step).unwrap()
}

/// `A = (+ <: _, _)`, `B = _`: a plain accumulator `y = x + y[n-1]`.
fn accumulator(s: &mut Session) -> BoxId {
    let add = s.add();
    let wire = s.wire();
    let pair = s.par(wire, wire).unwrap();
    let a = s.split(add, pair).unwrap();
    s.rec(a, wire).unwrap()
}

/// `levels` nested `par(x, x)` of the constant 1: a source with
/// `2^levels` outputs.
fn wide_bus(s: &mut Session, levels: u32) -> BoxId {
    let mut bus = s.int(1);
    for _ in 0..levels {
        bus = s.par(bus, bus).unwrap();
    }
    bus
}

fn only_output(list: &SignalList) -> &Signal {
    assert_eq!(list.len(), 1);
    list.get(list.outputs()[0]).unwrap()
}

// ============================================================================
// 1. Arity laws on concrete boxes
// ============================================================================

#[test]
fn seq_add_then_wire() {
    let mut s = Session::new().unwrap();
    let add = s.add();
    let wire = s.wire();
    let chain = s.seq(add, wire).unwrap();
    assert_eq!(s.arity(chain).unwrap(), Arity::new(2, 1));
}

#[test]
fn split_one_to_three() {
    let mut s = Session::new().unwrap();
    let b = s.button("go");
    let wire = s.wire();
    let three = s.par_all(&[wire, wire, wire]).unwrap();
    let fan = s.split(b, three).unwrap();
    assert_eq!(s.arity(fan).unwrap(), Arity::new(0, 3));

    let list = s.flatten(fan).unwrap();
    let out = list.outputs();
    assert_eq!(out.len(), 3);
    assert!(out.iter().all(|&o| o == out[0]));
}

#[test]
fn split_two_to_three_is_rejected() {
    let mut s = Session::new().unwrap();
    let one = s.int(1);
    let two = s.par(one, one).unwrap();
    let wire = s.wire();
    let three = s.par_all(&[wire, wire, wire]).unwrap();
    assert!(matches!(
        s.split(two, three),
        Err(BoxError::ArityMismatch { op: "split", .. })
    ));
}

#[test]
fn rec_two_by_two_with_wire() {
    let mut s = Session::new().unwrap();
    let wire = s.wire();
    let a = s.par(wire, wire).unwrap();
    let looped = s.rec(a, wire).unwrap();
    assert_eq!(s.arity(looped).unwrap(), Arity::new(1, 1));
}

#[test]
fn leaves_are_deterministic() {
    let mut s = Session::new().unwrap();
    let first = slider(&mut s, "gain", 0, 0, 10);
    let second = slider(&mut s, "gain", 0, 0, 10);
    assert_eq!(first, second);
    assert_eq!(s.arity(first).unwrap(), s.arity(second).unwrap());
}

// ============================================================================
// 2. Flattening
// ============================================================================

#[test]
fn flatten_returns_one_tree_per_output() {
    let mut s = Session::new().unwrap();
    let ints: Vec<BoxId> = (0..5).map(|n| s.int(n)).collect();
    let bus = s.par_all(&ints).unwrap();
    let list = s.flatten(bus).unwrap();
    assert_eq!(list.len(), 5);
    for (n, &out) in list.outputs().iter().enumerate() {
        assert_eq!(list.get(out), Some(&Signal::Int(n as i32)));
    }
}

#[test]
fn flatten_is_idempotent() {
    let mut s = Session::new().unwrap();
    let acc = accumulator(&mut s);
    let gain = slider(&mut s, "gain", 1, 0, 4);
    let prog = s.seq(gain, acc).unwrap();

    let first = s.flatten(prog).unwrap();
    let second = s.flatten(prog).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first.render(first.outputs()[0]),
        second.render(second.outputs()[0])
    );
}

#[test]
fn shared_control_is_one_node() {
    let mut s = Session::new().unwrap();
    let gain = slider(&mut s, "gain", 1, 0, 4);
    let sin = s.sin();
    let cos = s.cos();
    let left = s.seq(gain, sin).unwrap();
    let right = s.seq(gain, cos).unwrap();
    let both = s.par(left, right).unwrap();
    let mul = s.mul();
    let prog = s.seq(both, mul).unwrap();

    let list = s.flatten(prog).unwrap();
    let sliders = list
        .store()
        .iter()
        .filter(|(_, sig)| matches!(sig, Signal::Slider { .. }))
        .count();
    assert_eq!(sliders, 1);

    let Signal::BinOp(BinaryOp::Mul, a, b) = only_output(&list) else {
        panic!("expected a product");
    };
    let (Some(Signal::Unary(_, x)), Some(Signal::Unary(_, y))) = (list.get(*a), list.get(*b))
    else {
        panic!("expected two unary calls");
    };
    assert_eq!(x, y);
}

#[test]
fn accumulator_resolves_to_named_recursion() {
    let mut s = Session::new().unwrap();
    let acc = accumulator(&mut s);
    let one = s.int(1);
    let prog = s.seq(one, acc).unwrap();
    let list = s.flatten(prog).unwrap();

    let Signal::Proj { index, group } = only_output(&list) else {
        panic!("expected a projection");
    };
    assert_eq!(*index, 1);
    let Some(Signal::RecDef { var, bodies }) = list.get(*group) else {
        panic!("expected a recursion group");
    };
    assert_eq!(var.to_string(), "R0");
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0], bodies[1]);
    assert_eq!(
        list.render(list.outputs()[0]),
        "(rec R0 = (add(mem(R0[0]), 1), add(mem(R0[0]), 1)))[1]"
    );
}

#[test]
fn recursion_variables_follow_visit_order() {
    let mut s = Session::new().unwrap();
    let acc = accumulator(&mut s);
    let one = s.int(1);
    let two = s.int(2);
    let first = s.seq(one, acc).unwrap();
    let second = s.seq(two, acc).unwrap();
    let both = s.par(first, second).unwrap();
    let list = s.flatten(both).unwrap();
    assert!(list.render(list.outputs()[0]).contains("R0"));
    assert!(list.render(list.outputs()[1]).contains("R1"));
}

#[test]
fn negative_delay_in_feedback_is_unresolvable() {
    let mut s = Session::new().unwrap();
    // A = (delay(_, d) <: _, _) with d in [-2, 2]
    let amount = slider(&mut s, "d", 0, -2, 2);
    let wire = s.wire();
    let shifted_in = s.par(wire, amount).unwrap();
    let delay = s.delay();
    let delayed = s.seq(shifted_in, delay).unwrap();
    let pair = s.par(wire, wire).unwrap();
    let a = s.split(delayed, pair).unwrap();
    let looped = s.rec(a, wire).unwrap();
    assert_eq!(s.arity(looped).unwrap(), Arity::new(0, 1));

    let err = s.flatten(looped).unwrap_err();
    assert!(matches!(err, BoxError::UnresolvableRecursion { .. }));
    assert!(err.to_string().contains("R0"));
}

#[test]
fn non_negative_delay_in_feedback_is_accepted() {
    let mut s = Session::new().unwrap();
    let amount = slider(&mut s, "d", 0, 0, 8);
    let wire = s.wire();
    let shifted_in = s.par(wire, amount).unwrap();
    let delay = s.delay();
    let delayed = s.seq(shifted_in, delay).unwrap();
    let pair = s.par(wire, wire).unwrap();
    let a = s.split(delayed, pair).unwrap();
    let looped = s.rec(a, wire).unwrap();
    assert!(s.flatten(looped).is_ok());
}

#[test]
fn merge_folds_groups() {
    let mut s = Session::new().unwrap();
    let one = s.int(1);
    let six = s.par_all(&[one, one, one, one, one, one]).unwrap();
    let wire = s.wire();
    let prog = s.merge(six, wire).unwrap();

    let list = s.flatten(prog).unwrap();
    assert_eq!(
        list.render(list.outputs()[0]),
        "add(add(add(add(add(1, 1), 1), 1), 1), 1)"
    );
    assert_eq!(s.eval_constant(prog), Ok(Some(Constant::Int(6))));
}

#[test]
fn wide_merge_renders_as_one_deep_sum() {
    let mut s = Session::new().unwrap();
    let bus = wide_bus(&mut s, 18);
    let wire = s.wire();
    let sum = s.merge(bus, wire).unwrap();

    let list = s.flatten(sum).unwrap();
    let text = list.render(list.outputs()[0]);
    assert_eq!(text.matches("add(").count(), (1 << 18) - 1);
}

#[test]
fn wide_merge_inside_feedback_is_resolved() {
    let mut s = Session::new().unwrap();
    let bus = wide_bus(&mut s, 18);
    let wire = s.wire();
    let sum = s.merge(bus, wire).unwrap();
    let inputs = s.par(wire, sum).unwrap();
    let add = s.add();
    let body = s.seq(inputs, add).unwrap();
    let pair = s.par(wire, wire).unwrap();
    let dup = s.split(wire, pair).unwrap();
    let a = s.seq(body, dup).unwrap();
    let looped = s.rec(a, wire).unwrap();

    let list = s.flatten(looped).unwrap();
    assert!(matches!(only_output(&list), Signal::Proj { index: 1, .. }));
}

#[test]
fn attach_to_a_sink_keeps_the_side_box() {
    let mut s = Session::new().unwrap();
    let meter = {
        let lo = s.int(0);
        let hi = s.int(1);
        s.vbargraph("level", lo, hi).unwrap()
    };
    let cut = s.cut();
    let gate = s.button("gate");
    let metered = s.seq(gate, meter).unwrap();
    let sink = s.seq(metered, cut).unwrap();
    let side = s.checkbox("keep");
    let prog = s.attach(sink, side).unwrap();
    assert_eq!(s.arity(prog).unwrap(), Arity::new(0, 0));

    let list = s.flatten(prog).unwrap();
    assert!(list.is_empty());
    assert_eq!(list.retained().len(), 1);
    assert_eq!(list.render(list.retained()[0]), "checkbox(\"keep\")");
}

#[test]
fn route_swaps_channels() {
    let mut s = Session::new().unwrap();
    let one = s.int(1);
    let two = s.int(2);
    let desc = s.par_all(&[one, two, two, one]).unwrap();
    let swap = s.route(two, two, desc).unwrap();
    let a = s.button("a");
    let b = s.button("b");
    let src = s.par(a, b).unwrap();
    let prog = s.seq(src, swap).unwrap();

    let list = s.flatten(prog).unwrap();
    assert_eq!(list.render(list.outputs()[0]), "button(\"b\")");
    assert_eq!(list.render(list.outputs()[1]), "button(\"a\")");
}

#[test]
fn tables_and_waveforms() {
    let mut s = Session::new().unwrap();
    let values: Vec<BoxId> = [0.0, 0.5, 1.0].iter().map(|&v| s.real(v)).collect();
    let wave = s.waveform(&values).unwrap();
    let list = s.flatten(wave).unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list.get(list.outputs()[0]), Some(&Signal::Int(3)));

    let table = s.read_only_table(3);
    let size_cut = s.cut();
    let content = s.wire();
    let drop_size = s.par(size_cut, content).unwrap();
    let init = s.seq(wave, drop_size).unwrap();
    let index = s.int(1);
    let args = s.par(init, index).unwrap();
    let read = s.seq(args, table).unwrap();
    let list = s.flatten(read).unwrap();
    assert!(matches!(
        only_output(&list),
        Signal::ReadOnlyTable { size: 3, .. }
    ));
}

// ============================================================================
// 3. Error boundary
// ============================================================================

#[test]
fn open_input_is_reported_not_flattened() {
    let mut s = Session::new().unwrap();
    let acc = accumulator(&mut s);
    let mut error = String::new();
    let list = s.boxes_to_signals(acc, &mut error);
    assert!(list.is_empty());
    assert!(!error.is_empty());
}

#[test]
fn unchecked_route_is_malformed_at_flatten() {
    let mut s = Session::new().unwrap();
    let two = s.int(2);
    let one = s.int(1);
    let desc = s.par(one, one).unwrap();
    let bogus = s
        .insert_unchecked(
            BoxNode::Route {
                n: two,
                m: two,
                r: desc,
                inputs: 2,
                outputs: 2,
                pairs: vec![(1, 5)],
            },
            Arity::new(2, 2),
        )
        .unwrap();
    let src = s.par(one, one).unwrap();
    let prog = s
        .insert_unchecked(
            BoxNode::Composite {
                op: CompositeOp::Seq,
                left: src,
                right: bogus,
            },
            Arity::new(0, 2),
        )
        .unwrap();

    let mut error = String::new();
    let list = s.boxes_to_signals(prog, &mut error);
    assert!(list.is_empty());
    assert!(error.starts_with("malformed graph"), "{error}");
}

#[test]
fn stale_boxes_fail_everywhere() {
    let mut old = Session::new().unwrap();
    let add = old.add();
    old.destroy();

    let mut fresh = Session::new().unwrap();
    let wire = fresh.wire();
    assert_eq!(fresh.seq(add, wire), Err(BoxError::StaleBox(add)));
    assert_eq!(fresh.flatten(add), Err(BoxError::StaleBox(add)));
    assert_eq!(fresh.arity(add), Err(BoxError::StaleBox(add)));
}

#[test]
fn global_context_round_trip() {
    create_lib_context().unwrap();
    let outputs = with_lib_context(|s| {
        let acc = accumulator(s);
        let one = s.int(1);
        let prog = s.seq(one, acc)?;
        Ok(s.flatten(prog)?.len())
    })
    .unwrap();
    assert_eq!(outputs, 1);
    destroy_lib_context().unwrap();
    assert_eq!(destroy_lib_context(), Err(BoxError::NoActiveContext));
}
