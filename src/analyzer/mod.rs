//! Rewrites the parse tree into the semantic program form.
//!
//! Straight-line command runs collapse into offset-sorted cell updates
//! ([`summarize::summarize_ops`]), and loops are recognized by idiom: clears
//! become [`Ir::SetZero`], scans become [`Ir::JumpToNextZero`], balanced
//! counted loops become [`Ir::CountedLoop`] with wide-add bodies, and loops
//! that can never run become [`Ir::EmptyLoop`]. Anything else stays an
//! ordinary [`Ir::Loop`] over a canonicalized body.

mod loops;
mod summarize;

use std::fmt::{self, Display};

use crate::parser::Ast;
use crate::Cell;

/// How many cells a single [`Ir::VecAdd`] touches. Picked from the widest
/// byte vector the target carries; the emitted program is therefore not
/// portable across hosts with different vector widths.
pub const LANES: usize = if cfg!(target_feature = "avx512bw") {
    64
} else if cfg!(target_feature = "avx2") {
    32
} else {
    16
};

/// The semantic program form walked by the executor.
///
/// All cell arithmetic is modulo 256. Offsets are relative to the pointer
/// position at the node's entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ir {
    /// The program entry, an ordered child sequence.
    Root(Vec<Ir>),
    /// Adds the payload into the current cell, wrapping.
    Add(Cell),
    /// Adds a lane vector into the cells starting at the pointer, wrapping
    /// per byte. Does not move the pointer.
    VecAdd(Box<[Cell; LANES]>),
    /// Moves the pointer by a signed delta.
    MovePtr(i64),
    /// Drops `n - 1` input bytes, then reads one into the current cell.
    Read(u32),
    /// Emits the current cell `n` times.
    Write(u32),
    /// Executes the children while the current cell is nonzero.
    Loop(Vec<Ir>),
    /// A balanced loop whose pass count follows from the flag cell and
    /// `flag_step` alone.
    CountedLoop {
        /// One pass over the loop, in canonical offset form.
        body: Vec<Ir>,
        /// Runs once after the final pass.
        tail: Vec<Ir>,
        /// What one pass adds to the flag cell.
        flag_step: Cell,
        /// Start of the vectorized cell span, relative to the flag cell.
        vec_begin: i64,
        /// One past the end of the vectorized cell span.
        vec_end: i64,
    },
    /// A loop that cannot make progress. A no-op on a zero flag, a dead-loop
    /// failure otherwise.
    EmptyLoop,
    /// Clears the current cell.
    SetZero,
    /// Steps the pointer by the payload until it rests on a zero cell.
    JumpToNextZero(i64),
}

/// Rewrites a parse tree into its semantic form, consuming it.
pub fn analyze(ast: Ast) -> Ir {
    match ast {
        Ast::Root(block) => Ir::Root(loops::analyze_children(block.children)),
        other => Ir::Root(loops::analyze_children(vec![other])),
    }
}

impl Ir {
    fn fmt_adds(f: &mut fmt::Formatter<'_>, delta: Cell) -> fmt::Result {
        if delta <= 128 {
            f.write_str(&"+".repeat(usize::from(delta)))
        } else {
            f.write_str(&"-".repeat(256 - usize::from(delta)))
        }
    }

    fn fmt_moves(f: &mut fmt::Formatter<'_>, delta: i64) -> fmt::Result {
        if delta >= 0 {
            f.write_str(&">".repeat(delta as usize))
        } else {
            f.write_str(&"<".repeat(delta.unsigned_abs() as usize))
        }
    }
}

/// Renders the program back as source text in canonical form. Backs the
/// `--show` flag and makes the rewrite testable as text.
impl Display for Ir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ir::Root(children) => children.iter().try_for_each(|c| write!(f, "{c}")),
            Ir::Add(delta) => Ir::fmt_adds(f, *delta),
            Ir::VecAdd(lanes) => {
                let mut at = 0usize;
                for (lane, &delta) in lanes.iter().enumerate() {
                    if delta == 0 {
                        continue;
                    }
                    f.write_str(&">".repeat(lane - at))?;
                    at = lane;
                    Ir::fmt_adds(f, delta)?;
                }
                f.write_str(&"<".repeat(at))
            }
            Ir::MovePtr(delta) => Ir::fmt_moves(f, *delta),
            Ir::Read(count) => f.write_str(&",".repeat(*count as usize)),
            Ir::Write(count) => f.write_str(&".".repeat(*count as usize)),
            Ir::Loop(children) => {
                f.write_str("[")?;
                children.iter().try_for_each(|c| write!(f, "{c}"))?;
                f.write_str("]")
            }
            Ir::CountedLoop { body, tail, .. } => {
                f.write_str("[")?;
                body.iter().try_for_each(|c| write!(f, "{c}"))?;
                f.write_str("]")?;
                tail.iter().try_for_each(|c| write!(f, "{c}"))
            }
            Ir::EmptyLoop => f.write_str("[]"),
            Ir::SetZero => f.write_str("[-]"),
            Ir::JumpToNextZero(step) => {
                f.write_str("[")?;
                Ir::fmt_moves(f, *step)?;
                f.write_str("]")
            }
        }
    }
}
