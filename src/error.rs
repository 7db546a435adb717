//! Error taxonomy and terminal reporting.

use std::io;

use colored::Colorize;
use thiserror::Error;

use crate::lexer::token::Location;
use crate::parser::ParseError;

/// Everything the driver can surface, from compilation or from a run.
#[derive(Error, Debug)]
pub enum Error {
    /// The brackets of the program do not pair up.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The program failed while executing.
    #[error(transparent)]
    Vm(#[from] VmError),
}

impl Diagnostic for Error {
    fn location(&self) -> Option<Location> {
        match self {
            Error::Parse(e) => e.location(),
            Error::Vm(e) => e.location(),
        }
    }
}

/// An error raised while a program is executing.
#[derive(Error, Debug)]
pub enum VmError {
    /// The pointer crossed the configured tape limit.
    #[error("tape limit exceeded, tried to reach cell {index} with a limit of {limit} cells")]
    MemoryLimitExceeded {
        /// The cell index that was requested.
        index: i64,
        /// The tape size limit, in cells.
        limit: usize,
    },
    /// The pointer moved left of cell 0 on a tape without negative cells.
    #[error("the pointer moved left of cell 0 (cell {index})")]
    PointerUnderflow {
        /// The cell index that was requested.
        index: i64,
    },
    /// A loop whose flag cell can never reach 0 was entered.
    #[error("dead loop entered with flag {flag} stepping by {step}, the flag can never reach 0")]
    DeadLoop {
        /// The flag cell's value when the loop was entered.
        flag: u8,
        /// How much one pass of the loop body adds to the flag cell.
        step: u8,
    },
    /// A ',' was executed with no input bytes left.
    #[error("input exhausted while executing ','")]
    InputExhausted,
    /// The output stream rejected a write.
    #[error("output stream failure")]
    OutputFailed(#[source] io::Error),
    /// The tape could not grow.
    #[error("tape allocation of {bytes} more bytes failed")]
    OutOfMemory {
        /// How many extra bytes the tape asked for.
        bytes: usize,
    },
}

impl Diagnostic for VmError {}

/// Trait to add to all the errors within this crate.
/// Allows uniform, print-ready descriptions with the source position when one
/// is known.
pub trait Diagnostic: std::error::Error {
    /// Returns the source position tied to the error.
    fn location(&self) -> Option<Location> {
        None
    }

    /// Returns a fancy print-ready description of the error.
    fn report(&self) -> String {
        let mut out = String::new();

        out.push_str(&"Error:".red().bold().to_string());
        if let Some(l) = self.location() {
            out.push_str(&format!(" at {l}"));
        }
        out.push('\n');
        out.push_str(&format!(" -> {}", self.to_string().underline()));

        out
    }
}
