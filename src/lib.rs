//! An optimizing brainfuck interpreter.
//!
//! Source bytes go through [`lexer::lex`] into located commands, through
//! [`parser::parse`] into a bracket-balanced tree with static summaries, and
//! through [`analyzer::analyze`] into a compact semantic form that
//! [`executor::Machine`] walks against an expandable tape. Each stage
//! consumes its input whole, so nothing is shared across the pipeline.

/// The cell type, aka what each slot on the tape holds.
pub type Cell = u8;

pub mod analyzer;
pub mod error;
pub mod executor;
pub mod lexer;
pub mod parser;
pub mod tape;

pub use analyzer::{analyze, Ir, LANES};
pub use error::{Diagnostic, Error, VmError};
pub use executor::Machine;
pub use lexer::lex;
pub use parser::{parse, ParseError};
pub use tape::{FlatTape, SegmentedTape, Tape};

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use either::Either;
use tracing::debug;

/// Knobs for a run. The defaults match the command line's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Cells the flat tape starts with.
    pub initial_cells: usize,
    /// Hard limit on tape growth, in cells.
    pub tape_limit: usize,
    /// Picks the segmented tape even when the program never moves left of
    /// the origin.
    pub force_segmented: bool,
}

impl Default for RunOptions {
    fn default() -> RunOptions {
        RunOptions {
            initial_cells: 2048,
            tape_limit: 1 << 26,
            force_segmented: false,
        }
    }
}

/// What a finished run reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Time spent lexing, parsing and analyzing.
    pub compile_time: Duration,
    /// Time spent executing.
    pub execute_time: Duration,
    /// Bytes backing the tape when the program finished.
    pub tape_allocated: usize,
    /// One past the widest cell the program reached.
    pub tape_high_water: usize,
}

/// A compiled program, ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledProgram {
    /// The program in its optimized semantic form.
    pub ir: Ir,
    /// Whether top-level code was seen left of the origin while parsing.
    pub wants_negative_cells: bool,
}

/// Compiles source bytes down to the semantic form.
pub fn compile(source: &[u8]) -> Result<CompiledProgram, Error> {
    let tokens = lexer::lex(source);
    debug!(tokens = tokens.len(), "lexed");

    let ast = parser::parse(tokens)?;
    let wants_negative_cells = match &ast {
        parser::Ast::Root(block) => block.summary.min_ptr < 0,
        _ => false,
    };

    let ir = analyzer::analyze(ast);
    debug!(negative = wants_negative_cells, "analyzed");

    Ok(CompiledProgram {
        ir,
        wants_negative_cells,
    })
}

/// Flat tape for programs that stay right of the origin, segmented
/// otherwise.
pub fn select_tape(
    program: &CompiledProgram,
    options: &RunOptions,
) -> Either<FlatTape, SegmentedTape> {
    if options.force_segmented || program.wants_negative_cells {
        debug!("using the segmented tape");
        Either::Right(SegmentedTape::new(options.tape_limit))
    } else {
        Either::Left(FlatTape::new(options.initial_cells, options.tape_limit))
    }
}

/// Compiles and executes `source` end to end against the given streams.
pub fn run<In: Read, Out: Write>(
    source: &[u8],
    input: In,
    output: Out,
    options: &RunOptions,
) -> Result<RunReport, Error> {
    let compile_start = Instant::now();
    let program = compile(source)?;
    let compile_time = compile_start.elapsed();

    let tape = select_tape(&program, options);
    let mut machine = Machine::new(tape, input, output);

    let execute_start = Instant::now();
    machine.run(&program.ir)?;
    let execute_time = execute_start.elapsed();

    let tape = machine.tape();
    Ok(RunReport {
        compile_time,
        execute_time,
        tape_allocated: tape.allocated_bytes(),
        tape_high_water: tape.high_water(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    /// A byte-by-byte reference interpreter. Deliberately free of every
    /// rewrite the real pipeline performs.
    mod naive {
        pub fn run(
            source: &[u8],
            mut input: &[u8],
            mut fuel: u64,
        ) -> Result<(Vec<u8>, Vec<u8>), &'static str> {
            let code: Vec<u8> = source
                .iter()
                .copied()
                .filter(|b| b"+-><[],.".contains(b))
                .collect();

            let mut jumps = vec![0usize; code.len()];
            let mut stack = Vec::new();
            for (at, &byte) in code.iter().enumerate() {
                match byte {
                    b'[' => stack.push(at),
                    b']' => {
                        let open = stack.pop().ok_or("unbalanced")?;
                        jumps[open] = at;
                        jumps[at] = open;
                    }
                    _ => (),
                }
            }
            if !stack.is_empty() {
                return Err("unbalanced");
            }

            let mut tape = vec![0u8; 1];
            let mut dp = 0usize;
            let mut ip = 0usize;
            let mut out = Vec::new();

            while ip < code.len() {
                fuel = fuel.checked_sub(1).ok_or("out of fuel")?;
                match code[ip] {
                    b'+' => tape[dp] = tape[dp].wrapping_add(1),
                    b'-' => tape[dp] = tape[dp].wrapping_sub(1),
                    b'>' => {
                        dp += 1;
                        if dp == tape.len() {
                            tape.push(0);
                        }
                    }
                    b'<' => dp = dp.checked_sub(1).ok_or("underflow")?,
                    b'.' => out.push(tape[dp]),
                    b',' => {
                        let (&byte, rest) = input.split_first().ok_or("input dry")?;
                        tape[dp] = byte;
                        input = rest;
                    }
                    b'[' => {
                        if tape[dp] == 0 {
                            ip = jumps[ip];
                        }
                    }
                    b']' => {
                        if tape[dp] != 0 {
                            ip = jumps[ip];
                        }
                    }
                    _ => unreachable!(),
                }
                ip += 1;
            }

            Ok((tape, out))
        }
    }

    /// Runs `source` through both interpreters and demands identical output
    /// and identical tape contents. Programs the reference cannot finish
    /// (dead loops, underflows, dry input) are skipped.
    fn check_against_naive(source: &str, input: &[u8]) -> bool {
        let Ok((naive_tape, naive_out)) = naive::run(source.as_bytes(), input, 4_000_000) else {
            return false;
        };

        let program = compile(source.as_bytes()).unwrap();
        let tape = select_tape(&program, &RunOptions::default());
        let mut machine = Machine::new(tape, Cursor::new(input.to_vec()), Vec::new());
        machine
            .run(&program.ir)
            .unwrap_or_else(|e| panic!("optimized run failed on {source:?}: {e}"));

        let span = naive_tape.len().max(machine.tape().high_water());
        for cell in 0..span {
            let expected = naive_tape.get(cell).copied().unwrap_or(0);
            let got = machine.tape().read(cell as i64).unwrap();
            assert_eq!(got, expected, "cell {cell} diverged on {source:?}");
        }

        assert_eq!(machine.output(), &naive_out, "output diverged on {source:?}");
        true
    }

    #[test]
    fn hello_world() {
        let source = include_str!("../test-resources/hello.bf");
        let mut output = Vec::new();
        run(source.as_bytes(), io::empty(), &mut output, &RunOptions::default()).unwrap();
        assert_eq!(output, b"Hello World!\n");
    }

    #[test]
    fn hello_world_matches_the_reference() {
        assert!(check_against_naive(
            include_str!("../test-resources/hello.bf"),
            b""
        ));
    }

    #[test]
    fn empty_source_does_nothing() {
        let mut output = Vec::new();
        let report = run(b"", io::empty(), &mut output, &RunOptions::default()).unwrap();
        assert!(output.is_empty());
        assert_eq!(report.tape_high_water, 0);
    }

    #[test]
    fn runs_are_deterministic() {
        let source = include_str!("../test-resources/hello.bf");
        let mut first = Vec::new();
        let mut second = Vec::new();
        run(source.as_bytes(), io::empty(), &mut first, &RunOptions::default()).unwrap();
        run(source.as_bytes(), io::empty(), &mut second, &RunOptions::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn echo_loop_copies_its_input() {
        let mut output = Vec::new();
        run(
            b",[.,]",
            Cursor::new(b"squeak\0".to_vec()),
            &mut output,
            &RunOptions::default(),
        )
        .unwrap();
        assert_eq!(output, b"squeak");
    }

    #[test]
    fn negative_cells_pick_the_segmented_tape() {
        let program = compile(b"<+>").unwrap();
        assert!(program.wants_negative_cells);

        let mut output = Vec::new();
        let report = run(b"<+>", io::empty(), &mut output, &RunOptions::default()).unwrap();
        assert_eq!(report.tape_high_water, 1);
    }

    #[test]
    fn fixture_corpus_matches_the_reference() {
        let fixtures: &[(&str, &[u8])] = &[
            ("++++[>++++<-]", b""),
            ("+++[>++[>+++<-]<-]>>.", b""),
            ("+++>++>+<<[>]>.", b""),
            (",>,<[->+<]>.", b"AB"),
            ("++++++[->++++++<]>.", b""),
            (".+.+.", b""),
            (",[.,]", b"abc\0"),
            ("+[>+<-]>[<+>-]<.", b""),
            (">>>>+<<<<[>]>.", b""),
        ];

        for (source, input) in fixtures {
            assert!(
                check_against_naive(source, input),
                "reference could not finish {source:?}"
            );
        }
    }

    #[test]
    fn seeded_program_soup_matches_the_reference() {
        // a small multiplicative generator keeps the corpus reproducible
        struct Lcg(u64);
        impl Lcg {
            fn next(&mut self) -> u64 {
                self.0 = self
                    .0
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                self.0 >> 33
            }
        }

        let mut checked = 0;
        for seed in 0..400u64 {
            let mut rng = Lcg(seed.wrapping_add(0x9e3779b97f4a7c15));
            let mut source = String::new();
            let mut depth = 0usize;
            for _ in 0..48 {
                match rng.next() % 12 {
                    0..=2 => source.push('+'),
                    3..=4 => source.push('-'),
                    5..=6 => source.push('>'),
                    7 => source.push('<'),
                    8 => source.push('.'),
                    9 => source.push(','),
                    10 => {
                        source.push('[');
                        depth += 1;
                    }
                    _ => {
                        if depth > 0 {
                            source.push(']');
                            depth -= 1;
                        }
                    }
                }
            }
            for _ in 0..depth {
                source.push(']');
            }

            if check_against_naive(&source, b"some reproducible input bytes") {
                checked += 1;
            }
        }

        // enough of the soup must actually terminate for the test to mean
        // anything
        assert!(checked > 25, "only {checked} programs survived");
    }
}
