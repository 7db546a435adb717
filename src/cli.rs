//! The command line surface, defined via the clap crate.

use clap::Parser;

/// An optimizing brainfuck interpreter.
#[derive(Parser)]
#[command(version, about, long_about = None)]
#[derive(Debug, PartialEq, Clone)]
pub struct Cli {
    /// Path to the brainfuck source file
    pub file_path: Option<String>,

    /// Number of cells the tape starts with
    #[arg(long, default_value_t = 2048)]
    pub initial_cells: usize,

    /// Limits the tape to this many cells, aborts execution past it
    #[arg(long, short = 't', default_value_t = 1 << 26)]
    pub tape_limit: usize,

    /// Uses the segmented tape even when the program never moves left of cell 0
    #[arg(long, short = 's', default_value_t = false)]
    pub segmented: bool,

    /// Print the canonicalized program before running it
    #[arg(long, short = 'p', default_value_t = false)]
    pub show: bool,

    /// Dump the used stretch of the tape once the program ends
    #[arg(long, short = 'd', default_value_t = false)]
    pub dump: bool,
}
