//! Collapses straight-line command runs into canonical offset form.
//!
//! Cell updates commute freely with each other because they touch
//! independent cells; ',' and '.' are barriers that pin the order of
//! everything touching their cell. The run is walked in reverse onto a
//! simulation buffer, so by the time a barrier is met every update that
//! belongs after it has already been accumulated and can be split off.

use crate::parser::BasicOp;
use crate::Cell;

use super::Ir;

/// The net effect of one straight-line run.
pub(crate) struct RunEffect {
    /// Net delta per cell, indexed from `min_ptr`.
    mem: Vec<Cell>,
    /// Lowest pointer offset the run moves through.
    min_ptr: i64,
    /// Net pointer delta of the run.
    pub net: i64,
    /// Barrier-ordered I/O and the updates pinned behind it, in reverse
    /// execution order, tagged with cell offsets.
    deferred: Vec<(i64, Deferred)>,
}

enum Deferred {
    Add(Cell),
    Read(u32),
    Write(u32),
}

impl RunEffect {
    /// Net delta of the cell at `offset`, zero outside the envelope.
    pub fn delta(&self, offset: i64) -> Cell {
        let idx = offset - self.min_ptr;
        if idx < 0 {
            return 0;
        }
        self.mem.get(idx as usize).copied().unwrap_or(0)
    }

    /// The envelope of cells with a nonzero net delta, or `None` when the
    /// run nets out to nothing.
    pub fn dirty_range(&self) -> Option<(i64, i64)> {
        let first = self.mem.iter().position(|&v| v != 0)?;
        let last = self.mem.iter().rposition(|&v| v != 0)?;
        Some((self.min_ptr + first as i64, self.min_ptr + last as i64))
    }
}

/// Replays `ops` backwards onto a zeroed buffer, splitting I/O (and the
/// updates ordered after it) into the deferred list.
pub(crate) fn simulate(ops: &[BasicOp]) -> RunEffect {
    // forward scan for the pointer envelope
    let (mut p, mut min, mut max) = (0i64, 0i64, 0i64);
    for op in ops {
        match op {
            BasicOp::IncPtr => p += 1,
            BasicOp::DecPtr => p -= 1,
            _ => (),
        }
        min = min.min(p);
        max = max.max(p);
    }
    let net = p;

    let width = (max - min) as usize + 1;
    let mut mem = vec![0 as Cell; width];
    let mut dirty = vec![false; width];
    let mut deferred: Vec<(i64, Deferred)> = Vec::new();

    // reverse walk from the resting place; pointer motion inverts
    let mut idx = (net - min) as usize;
    for op in ops.iter().rev() {
        match op {
            BasicOp::Add => {
                mem[idx] = mem[idx].wrapping_add(1);
                dirty[idx] = true;
            }
            BasicOp::Sub => {
                mem[idx] = mem[idx].wrapping_sub(1);
                dirty[idx] = true;
            }
            BasicOp::IncPtr => idx -= 1,
            BasicOp::DecPtr => idx += 1,
            BasicOp::Read | BasicOp::Write => {
                let cell = min + idx as i64;
                if dirty[idx] {
                    // everything gathered so far at this cell runs after
                    // the barrier, split it off
                    deferred.push((cell, Deferred::Add(mem[idx])));
                    mem[idx] = 0;
                    dirty[idx] = false;
                }
                match (op, deferred.last_mut()) {
                    (BasicOp::Read, Some((at, Deferred::Read(n)))) if *at == cell => *n += 1,
                    (BasicOp::Write, Some((at, Deferred::Write(n)))) if *at == cell => *n += 1,
                    (BasicOp::Read, _) => deferred.push((cell, Deferred::Read(1))),
                    (BasicOp::Write, _) => deferred.push((cell, Deferred::Write(1))),
                    _ => unreachable!("only io reaches the barrier arm"),
                }
            }
        }
    }

    RunEffect {
        mem,
        min_ptr: min,
        net,
        deferred,
    }
}

/// Collapses a run into `MovePtr`/`Add` pairs followed by its I/O in
/// original order, landing exactly on the run's net pointer delta.
pub(crate) fn summarize_ops(ops: &[BasicOp]) -> Vec<Ir> {
    if ops.is_empty() {
        return Vec::new();
    }

    let effect = simulate(ops);
    let mut out = Vec::new();
    let mut at = 0i64;

    emit_deltas(&effect, &mut out, &mut at);

    // deferred entries come out in reverse capture order, which restores
    // the order the program executed them in
    for (cell, op) in effect.deferred.iter().rev() {
        move_to(&mut out, &mut at, *cell);
        out.push(match op {
            Deferred::Add(delta) => Ir::Add(*delta),
            Deferred::Read(count) => Ir::Read(*count),
            Deferred::Write(count) => Ir::Write(*count),
        });
    }

    move_to(&mut out, &mut at, effect.net);
    out
}

/// Emits the net cell deltas: the entry cell first, then a sweep down to
/// the lowest dirty cell, then up to the highest.
pub(crate) fn emit_deltas(effect: &RunEffect, out: &mut Vec<Ir>, at: &mut i64) {
    let Some((lo, hi)) = effect.dirty_range() else {
        return;
    };

    if effect.delta(0) != 0 {
        move_to(out, at, 0);
        out.push(Ir::Add(effect.delta(0)));
    }
    for cell in (lo..=-1).rev() {
        if effect.delta(cell) != 0 {
            move_to(out, at, cell);
            out.push(Ir::Add(effect.delta(cell)));
        }
    }
    for cell in 1..=hi {
        if effect.delta(cell) != 0 {
            move_to(out, at, cell);
            out.push(Ir::Add(effect.delta(cell)));
        }
    }
}

pub(crate) fn move_to(out: &mut Vec<Ir>, at: &mut i64, target: i64) {
    if target != *at {
        out.push(Ir::MovePtr(target - *at));
        *at = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(source: &str) -> Vec<BasicOp> {
        source
            .bytes()
            .map(|b| match b {
                b'+' => BasicOp::Add,
                b'-' => BasicOp::Sub,
                b'>' => BasicOp::IncPtr,
                b'<' => BasicOp::DecPtr,
                b',' => BasicOp::Read,
                b'.' => BasicOp::Write,
                other => panic!("not a basic op: {other}"),
            })
            .collect()
    }

    #[test]
    fn collapses_cell_updates() {
        let out = summarize_ops(&ops("+>+<"));
        assert_eq!(
            out,
            vec![Ir::Add(1), Ir::MovePtr(1), Ir::Add(1), Ir::MovePtr(-1)]
        );
    }

    #[test]
    fn cancelling_runs_vanish() {
        assert_eq!(summarize_ops(&ops("+-")), vec![]);
        assert_eq!(summarize_ops(&ops("><")), vec![]);
        assert_eq!(summarize_ops(&ops(">>+--+<<")), vec![]);
    }

    #[test]
    fn net_pointer_motion_survives() {
        assert_eq!(summarize_ops(&ops(">><")), vec![Ir::MovePtr(1)]);
        let out = summarize_ops(&ops(">>."));
        assert_eq!(out, vec![Ir::MovePtr(2), Ir::Write(1)]);
    }

    #[test]
    fn write_pins_the_updates_around_it() {
        // add before the write stays before, add after stays after
        assert_eq!(summarize_ops(&ops("+.")), vec![Ir::Add(1), Ir::Write(1)]);
        assert_eq!(summarize_ops(&ops(".+")), vec![Ir::Write(1), Ir::Add(1)]);
        assert_eq!(
            summarize_ops(&ops(".+.")),
            vec![Ir::Write(1), Ir::Add(1), Ir::Write(1)]
        );
    }

    #[test]
    fn consecutive_io_coalesces() {
        assert_eq!(summarize_ops(&ops("...")), vec![Ir::Write(3)]);
        assert_eq!(summarize_ops(&ops(",,,")), vec![Ir::Read(3)]);
        // a cell update in between keeps the writes apart
        assert_eq!(
            summarize_ops(&ops(".-.")),
            vec![Ir::Write(1), Ir::Add(255), Ir::Write(1)]
        );
    }

    #[test]
    fn io_on_distinct_cells_keeps_its_order() {
        let out = summarize_ops(&ops(".>.<"));
        assert_eq!(
            out,
            vec![Ir::Write(1), Ir::MovePtr(1), Ir::Write(1), Ir::MovePtr(-1)]
        );
    }

    #[test]
    fn reads_consume_even_when_overwritten() {
        // the first read still has to eat its input byte
        let out = summarize_ops(&ops(",,"));
        assert_eq!(out, vec![Ir::Read(2)]);

        let out = summarize_ops(&ops(",+,"));
        assert_eq!(out, vec![Ir::Read(1), Ir::Add(1), Ir::Read(1)]);
    }

    #[test]
    fn sweep_covers_both_sides_of_the_entry() {
        let out = summarize_ops(&ops("<+>>+<"));
        assert_eq!(
            out,
            vec![
                Ir::MovePtr(-1),
                Ir::Add(1),
                Ir::MovePtr(2),
                Ir::Add(1),
                Ir::MovePtr(-1)
            ]
        );
    }

    #[test]
    fn wrapping_deltas() {
        let mut source = String::new();
        for _ in 0..256 {
            source.push('+');
        }
        assert_eq!(summarize_ops(&ops(&source)), vec![]);
        source.push('-');
        assert_eq!(summarize_ops(&ops(&source)), vec![Ir::Add(255)]);
    }
}
