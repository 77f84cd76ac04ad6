//! Built-in demo programs.
//!
//! Each demo builds a small closed box program through the session API,
//! flattens it under the active profile and prints one line per output.

use anyhow::Context;
use boxflow_config::CompileProfile;
use boxflow_core::{BoxError, BoxId, Session, SessionOptions};
use clap::{Args, ValueEnum};

/// Demo programs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Demo {
    /// One-pole smoother `y = 0.1*x + 0.9*y'` on a slider
    OnePole,
    /// Running sum of a button: `+ ~ _`
    Accumulator,
    /// Mono slider split to stereo, then merged back with a gain
    SplitMerge,
    /// Two buttons with their channels swapped by a route
    Swap,
    /// Constant arithmetic (shows folding with `--fold`)
    Arithmetic,
    /// Feedback through a delay that may be negative (rejected)
    BadDelay,
}

impl Demo {
    const ALL: [Self; 6] = [
        Self::OnePole,
        Self::Accumulator,
        Self::SplitMerge,
        Self::Swap,
        Self::Arithmetic,
        Self::BadDelay,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::OnePole => "one-pole",
            Self::Accumulator => "accumulator",
            Self::SplitMerge => "split-merge",
            Self::Swap => "swap",
            Self::Arithmetic => "arithmetic",
            Self::BadDelay => "bad-delay",
        }
    }

    fn build(self, s: &mut Session) -> Result<BoxId, BoxError> {
        match self {
            Self::OnePole => one_pole(s),
            Self::Accumulator => accumulator(s),
            Self::SplitMerge => split_merge(s),
            Self::Swap => swap(s),
            Self::Arithmetic => arithmetic(s),
            Self::BadDelay => bad_delay(s),
        }
    }
}

/// Arguments for `boxflow demo`.
#[derive(Args)]
pub struct DemoArgs {
    /// Demo to run (omit to list the demos)
    program: Option<Demo>,

    /// Fold constant arithmetic regardless of the profile
    #[arg(long)]
    fold: bool,

    /// Also print the signal node count
    #[arg(long)]
    stats: bool,
}

pub fn run(args: DemoArgs, profile: &CompileProfile) -> anyhow::Result<()> {
    let Some(program) = args.program else {
        println!("Demo programs:");
        for demo in Demo::ALL {
            println!("  {}", demo.name());
        }
        return Ok(());
    };

    let options = SessionOptions {
        fold_constants: args.fold || profile.options.fold_constants,
        ..profile.options.clone()
    };
    let lines = flatten_demo(program, options)
        .with_context(|| format!("demo '{}' failed", program.name()))?;
    for line in &lines.outputs {
        println!("{line}");
    }
    if args.stats {
        println!();
        println!("boxes:   {}", lines.boxes);
        println!("signals: {}", lines.signals);
    }
    Ok(())
}

/// Rendered result of one demo.
#[derive(Debug)]
struct DemoOutput {
    outputs: Vec<String>,
    boxes: usize,
    signals: usize,
}

fn flatten_demo(program: Demo, options: SessionOptions) -> Result<DemoOutput, BoxError> {
    let mut session = Session::with_options(options)?;
    let root = program.build(&mut session)?;
    let arity = session.arity(root)?;
    tracing::info!(demo = program.name(), %arity, "built");

    let list = session.flatten(root)?;
    let outputs = list
        .outputs()
        .iter()
        .enumerate()
        .map(|(i, &sig)| format!("out[{i}] = {}", list.render(sig)))
        .collect();
    Ok(DemoOutput {
        outputs,
        boxes: session.len(),
        signals: list.node_count(),
    })
}

fn real_slider(
    s: &mut Session,
    label: &str,
    init: f64,
    min: f64,
    max: f64,
) -> Result<BoxId, BoxError> {
    let init = s.real(init);
    let min = s.real(min);
    let max = s.real(max);
    let step = s.real(0.01);
    s.hslider(label, init, min, max, step)
}

/// `_ <: _, _`
fn dup(s: &mut Session) -> Result<BoxId, BoxError> {
    let wire = s.wire();
    let pair = s.par(wire, wire)?;
    s.split(wire, pair)
}

/// `_ * k`
fn gain(s: &mut Session, k: f64) -> Result<BoxId, BoxError> {
    let wire = s.wire();
    let k = s.real(k);
    let args = s.par(wire, k)?;
    let mul = s.mul();
    s.seq(args, mul)
}

fn one_pole(s: &mut Session) -> Result<BoxId, BoxError> {
    let input = real_slider(s, "level", 0.5, 0.0, 1.0)?;
    let wire = s.wire();
    let scaled = gain(s, 0.1)?;
    let inputs = s.par(wire, scaled)?;
    let add = s.add();
    let sum = s.seq(inputs, add)?;
    let dup = dup(s)?;
    let a = s.seq(sum, dup)?;
    let b = gain(s, 0.9)?;
    let smoother = s.rec(a, b)?;
    s.seq(input, smoother)
}

fn accumulator(s: &mut Session) -> Result<BoxId, BoxError> {
    let gate = s.button("gate");
    let add = s.add();
    let wire = s.wire();
    let pair = s.par(wire, wire)?;
    let a = s.split(add, pair)?;
    let running = s.rec(a, wire)?;
    s.seq(gate, running)
}

fn split_merge(s: &mut Session) -> Result<BoxId, BoxError> {
    let input = real_slider(s, "in", 0.0, -1.0, 1.0)?;
    let left = gain(s, 0.7)?;
    let right = gain(s, 0.3)?;
    let stereo = s.par(left, right)?;
    let spread = s.split(input, stereo)?;
    let wire = s.wire();
    s.merge(spread, wire)
}

fn swap(s: &mut Session) -> Result<BoxId, BoxError> {
    let a = s.button("a");
    let b = s.button("b");
    let src = s.par(a, b)?;
    let one = s.int(1);
    let two = s.int(2);
    let desc = s.par_all(&[one, two, two, one])?;
    let route = s.route(two, two, desc)?;
    s.seq(src, route)
}

fn arithmetic(s: &mut Session) -> Result<BoxId, BoxError> {
    let six = s.int(6);
    let seven = s.int(7);
    let args = s.par(six, seven)?;
    let mul = s.mul();
    let product = s.seq(args, mul)?;
    let half = s.real(0.5);
    let args = s.par(product, half)?;
    let add = s.add();
    s.seq(args, add)
}

fn bad_delay(s: &mut Session) -> Result<BoxId, BoxError> {
    let amount = real_slider(s, "shift", 0.0, -2.0, 2.0)?;
    let wire = s.wire();
    let args = s.par(wire, amount)?;
    let delay = s.delay();
    let delayed = s.seq(args, delay)?;
    let dup = dup(s)?;
    let a = s.seq(delayed, dup)?;
    s.rec(a, wire)
}
