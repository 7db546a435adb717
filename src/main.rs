use std::io::{self, BufWriter};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser as _;
use tracing_subscriber::EnvFilter;

use bfrun::{Diagnostic, Machine, RunOptions, Tape};

mod cli;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = cli::Cli::parse();
    let Some(path) = args.file_path else {
        let program = std::env::args().next().unwrap_or_else(|| "bfrun".to_string());
        println!("Usage: {program} <.bf filepath>");
        return ExitCode::SUCCESS;
    };

    let source = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(error) => {
            eprintln!("could not read {path}: {error}");
            return ExitCode::FAILURE;
        }
    };

    // driven stage by stage so --show and --dump can reach in between
    let compile_start = Instant::now();
    let program = match bfrun::compile(&source) {
        Ok(program) => program,
        Err(error) => {
            eprintln!("{}", error.report());
            return ExitCode::FAILURE;
        }
    };
    let compile_time = compile_start.elapsed();

    if args.show {
        println!("{}", program.ir);
    }

    let options = RunOptions {
        initial_cells: args.initial_cells,
        tape_limit: args.tape_limit,
        force_segmented: args.segmented,
    };
    let tape = bfrun::select_tape(&program, &options);

    let stdin = io::stdin().lock();
    let stdout = BufWriter::new(io::stdout().lock());
    let mut machine = Machine::new(tape, stdin, stdout);

    let execute_start = Instant::now();
    if let Err(error) = machine.run(&program.ir) {
        eprintln!("{}", error.report());
        return ExitCode::FAILURE;
    }
    let execute_time = execute_start.elapsed();

    if args.dump {
        dump_tape(machine.tape(), machine.pointer());
    }

    println!("compile time usage: {:.6}s", compile_time.as_secs_f64());
    println!("execute time usage: {:.6}s", execute_time.as_secs_f64());
    println!("bf memory allocated: {}", machine.tape().allocated_bytes());
    println!("bf memory used: {}", machine.tape().high_water());

    ExitCode::SUCCESS
}

/// Prints the stretch of cells the program actually reached, which can sit
/// left of the origin on the segmented tape.
fn dump_tape<T: Tape>(tape: &T, pointer: i64) {
    let touched = tape.touched();
    let cells = touched
        .clone()
        .map(|cell| tape.read(cell).unwrap_or(0))
        .collect::<Vec<_>>();
    println!(
        "tape[{}..{}]: {cells:?} (pointer at {pointer})",
        touched.start, touched.end
    );
}
