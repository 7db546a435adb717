//! Walks the semantic program form against a tape and a pair of byte
//! streams.

use std::io::{self, Read, Write};

use num::integer::gcd;

use crate::analyzer::Ir;
use crate::error::VmError;
use crate::tape::Tape;
use crate::Cell;

/// Executes a program against a [`Tape`] and two byte streams. The machine
/// owns all three for the length of a run.
#[derive(Debug)]
pub struct Machine<T, In, Out> {
    tape: T,
    input: In,
    output: Out,
    ptr: i64,
}

impl<T: Tape, In: Read, Out: Write> Machine<T, In, Out> {
    /// Creates a machine with its pointer resting on cell 0.
    pub fn new(tape: T, input: In, output: Out) -> Machine<T, In, Out> {
        Machine {
            tape,
            input,
            output,
            ptr: 0,
        }
    }

    /// Runs a whole program and flushes the output stream.
    pub fn run(&mut self, program: &Ir) -> Result<(), VmError> {
        self.step(program)?;
        self.output.flush().map_err(VmError::OutputFailed)
    }

    /// References the tape, for statistics and dumps after a run.
    pub fn tape(&self) -> &T {
        &self.tape
    }

    /// References the output stream.
    pub fn output(&self) -> &Out {
        &self.output
    }

    /// Where the pointer rests.
    pub fn pointer(&self) -> i64 {
        self.ptr
    }

    fn step(&mut self, node: &Ir) -> Result<(), VmError> {
        match node {
            Ir::Root(children) => self.run_seq(children),

            Ir::Add(delta) => {
                let value = self.tape.read(self.ptr)?;
                self.tape.write(self.ptr, value.wrapping_add(*delta))
            }
            Ir::VecAdd(lanes) => self.tape.vec_add(self.ptr, lanes),
            Ir::MovePtr(delta) => {
                self.ptr += delta;
                self.tape.ensure(self.ptr)
            }
            Ir::Read(count) => self.read_input(*count),
            Ir::Write(count) => self.write_output(*count),

            Ir::Loop(children) => {
                while self.tape.read(self.ptr)? != 0 {
                    self.run_seq(children)?;
                }
                Ok(())
            }
            Ir::CountedLoop {
                body,
                tail,
                flag_step,
                vec_begin,
                vec_end,
            } => self.run_counted(body, tail, *flag_step, *vec_begin, *vec_end),
            Ir::EmptyLoop => {
                let flag = self.tape.read(self.ptr)?;
                if flag == 0 {
                    Ok(())
                } else {
                    Err(VmError::DeadLoop { flag, step: 0 })
                }
            }
            Ir::SetZero => self.tape.write(self.ptr, 0),
            Ir::JumpToNextZero(step) => {
                while self.tape.read(self.ptr)? != 0 {
                    self.ptr += step;
                    self.tape.ensure(self.ptr)?;
                }
                Ok(())
            }
        }
    }

    fn run_seq(&mut self, nodes: &[Ir]) -> Result<(), VmError> {
        for node in nodes {
            self.step(node)?;
        }
        Ok(())
    }

    fn run_counted(
        &mut self,
        body: &[Ir],
        tail: &[Ir],
        flag_step: Cell,
        vec_begin: i64,
        vec_end: i64,
    ) -> Result<(), VmError> {
        let flag = self.tape.read(self.ptr)?;
        if flag == 0 {
            return Ok(());
        }

        let passes = pass_count(flag, flag_step).ok_or(VmError::DeadLoop {
            flag,
            step: flag_step,
        })?;

        // touch the vector span once instead of growing inside the loop
        if vec_end > vec_begin {
            self.tape.ensure(self.ptr + vec_begin)?;
            self.tape.ensure(self.ptr + vec_end - 1)?;
        }

        for _ in 0..passes {
            self.run_seq(body)?;
        }
        self.run_seq(tail)
    }

    fn read_input(&mut self, count: u32) -> Result<(), VmError> {
        let mut byte = [0u8; 1];
        for _ in 0..count {
            self.input
                .read_exact(&mut byte)
                .map_err(|_| VmError::InputExhausted)?;
        }
        self.tape.write(self.ptr, byte[0])
    }

    fn write_output(&mut self, count: u32) -> Result<(), VmError> {
        let byte = self.tape.read(self.ptr)?;
        for _ in 0..count {
            self.output
                .write_all(&[byte])
                .map_err(VmError::OutputFailed)?;
        }
        Ok(())
    }
}

/// Smallest pass count `k` with `flag + k * step = 0 (mod 256)`, or `None`
/// when the flag can never come down to 0.
fn pass_count(flag: Cell, step: Cell) -> Option<u32> {
    let needed = 256 - u32::from(flag);
    if needed % gcd(u32::from(step), 256) != 0 {
        return None;
    }

    let mut value = flag;
    let mut passes = 0u32;
    loop {
        value = value.wrapping_add(step);
        passes += 1;
        if value == 0 {
            return Some(passes);
        }
    }
}

/// Sinks every write, for programs run purely for their tape effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOutput;

impl Write for NullOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
