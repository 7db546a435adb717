//! Loop rewriting. Loops are dispatched on the parser's summaries: pure
//! loops (no I/O, no nesting) collapse into dedicated forms, I/O loops get
//! their commands merged but never reordered, and nested loops recurse.

use num::integer::gcd;

use crate::parser::{Ast, BasicOp, Block};
use crate::Cell;

use super::summarize::{emit_deltas, move_to, simulate, summarize_ops, RunEffect};
use super::{Ir, LANES};

/// Rewrites a child sequence: maximal straight-line runs collapse through
/// [`summarize_ops`], loops dispatch on their summaries. Shared by the root
/// and by every nested loop.
pub(crate) fn analyze_children(children: Vec<Ast>) -> Vec<Ir> {
    let mut out = Vec::new();
    let mut run: Vec<BasicOp> = Vec::new();

    for child in children {
        match child {
            Ast::Op(op, _) => run.push(op),
            Ast::Loop(block, _) => {
                out.extend(summarize_ops(&run));
                run.clear();
                out.push(analyze_loop(block));
            }
            Ast::Root(block) => out.extend(analyze_children(block.children)),
        }
    }
    out.extend(summarize_ops(&run));

    out
}

fn analyze_loop(block: Block) -> Ir {
    let summary = block.summary;
    if !summary.has_nested_loops && !summary.has_io {
        analyze_pure_loop(block)
    } else if !summary.has_nested_loops {
        analyze_io_loop(block)
    } else {
        analyze_nested_loop(block)
    }
}

/// A loop without I/O or nesting collapses into one of the dedicated forms.
fn analyze_pure_loop(block: Block) -> Ir {
    let summary = block.summary;
    let ops = basic_ops(block);

    match (summary.has_add, summary.has_addptr) {
        // nothing can change, the flag decides everything
        (false, false) => Ir::EmptyLoop,

        (true, false) => {
            let step = flag_step_of(&ops);
            if step == 0 {
                Ir::EmptyLoop
            } else if gcd(u32::from(step), 256) == 1 {
                // every entry value reaches 0
                Ir::SetZero
            } else {
                // termination depends on the entry value, decided at run time
                Ir::CountedLoop {
                    body: vec![Ir::Add(step)],
                    tail: Vec::new(),
                    flag_step: step,
                    vec_begin: 0,
                    vec_end: 0,
                }
            }
        }

        (false, true) => {
            let net = net_move_of(&ops);
            if net == 0 {
                Ir::EmptyLoop
            } else {
                Ir::JumpToNextZero(net)
            }
        }

        (true, true) => {
            if net_move_of(&ops) != 0 {
                return Ir::Loop(summarize_ops(&ops));
            }

            let effect = simulate(&ops);
            let flag_step = effect.delta(0);
            if flag_step == 0 {
                // the flag is out of the loop's own hands
                Ir::Loop(summarize_ops(&ops))
            } else {
                let (body, vec_begin, vec_end) = counted_body(&effect);
                Ir::CountedLoop {
                    body,
                    tail: Vec::new(),
                    flag_step,
                    vec_begin,
                    vec_end,
                }
            }
        }
    }
}

/// A loop with I/O merges neighbouring commands and nothing else. I/O is a
/// barrier, so no update may cross another command here.
fn analyze_io_loop(block: Block) -> Ir {
    let mut items: Vec<Ir> = Vec::new();

    for op in basic_ops(block) {
        match (op, items.last_mut()) {
            (BasicOp::Add, Some(Ir::Add(v))) => {
                *v = v.wrapping_add(1);
                if *v == 0 {
                    items.pop();
                }
            }
            (BasicOp::Sub, Some(Ir::Add(v))) => {
                *v = v.wrapping_sub(1);
                if *v == 0 {
                    items.pop();
                }
            }
            (BasicOp::IncPtr, Some(Ir::MovePtr(d))) => {
                *d += 1;
                if *d == 0 {
                    items.pop();
                }
            }
            (BasicOp::DecPtr, Some(Ir::MovePtr(d))) => {
                *d -= 1;
                if *d == 0 {
                    items.pop();
                }
            }
            (BasicOp::Read, Some(Ir::Read(n))) => *n += 1,
            (BasicOp::Write, Some(Ir::Write(n))) => *n += 1,
            (BasicOp::Add, _) => items.push(Ir::Add(1)),
            (BasicOp::Sub, _) => items.push(Ir::Add(255)),
            (BasicOp::IncPtr, _) => items.push(Ir::MovePtr(1)),
            (BasicOp::DecPtr, _) => items.push(Ir::MovePtr(-1)),
            (BasicOp::Read, _) => items.push(Ir::Read(1)),
            (BasicOp::Write, _) => items.push(Ir::Write(1)),
        }
    }

    Ir::Loop(items)
}

fn analyze_nested_loop(block: Block) -> Ir {
    Ir::Loop(analyze_children(block.children))
}

/// One pass of a counted loop in canonical offset form. Wide when the dirty
/// envelope warrants it, scalar otherwise. Returns the body and the
/// vectorized span `[vec_begin, vec_end)` relative to the flag cell.
fn counted_body(effect: &RunEffect) -> (Vec<Ir>, i64, i64) {
    let Some((lo, hi)) = effect.dirty_range() else {
        return (Vec::new(), 0, 0);
    };

    let mut out = Vec::new();
    let mut at = 0i64;

    let range = (hi - lo + 1) as usize;
    if range < LANES / 2 {
        emit_deltas(effect, &mut out, &mut at);
        move_to(&mut out, &mut at, 0);
        return (out, 0, 0);
    }

    // whole vectors only; the trailing partial stretch stays scalar so no
    // cell is ever covered twice
    let mut vec_end = lo;
    let mut chunk = lo;
    while chunk + LANES as i64 <= hi + 1 {
        let mut lanes = [0 as Cell; LANES];
        for (k, lane) in lanes.iter_mut().enumerate() {
            *lane = effect.delta(chunk + k as i64);
        }
        if lanes.iter().any(|&v| v != 0) {
            move_to(&mut out, &mut at, chunk);
            out.push(Ir::VecAdd(Box::new(lanes)));
            vec_end = chunk + LANES as i64;
        }
        chunk += LANES as i64;
    }

    // scalar fringe past the last whole vector
    for cell in chunk..=hi {
        if effect.delta(cell) != 0 {
            move_to(&mut out, &mut at, cell);
            out.push(Ir::Add(effect.delta(cell)));
        }
    }

    move_to(&mut out, &mut at, 0);
    (out, lo, vec_end)
}

fn basic_ops(block: Block) -> Vec<BasicOp> {
    block
        .children
        .into_iter()
        .filter_map(|child| match child {
            Ast::Op(op, _) => Some(op),
            _ => None,
        })
        .collect()
}

fn flag_step_of(ops: &[BasicOp]) -> Cell {
    ops.iter().fold(0 as Cell, |acc, op| match op {
        BasicOp::Add => acc.wrapping_add(1),
        BasicOp::Sub => acc.wrapping_sub(1),
        _ => acc,
    })
}

fn net_move_of(ops: &[BasicOp]) -> i64 {
    ops.iter().fold(0i64, |acc, op| match op {
        BasicOp::IncPtr => acc + 1,
        BasicOp::DecPtr => acc - 1,
        _ => acc,
    })
}
