//! The eight significant characters of the language and where they sit in the source.

use std::fmt::{self, Display};

/// A 1-based position in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    #[allow(missing_docs)]
    pub line: u32,
    #[allow(missing_docs)]
    pub col: u32,
}

impl Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ln {}, Col {}", self.line, self.col)
    }
}

/// One of the eight commands. Everything else in a source file is a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// The '+' operator.
    Inc,
    /// The '-' operator.
    Dec,
    /// The '>' operator.
    Right,
    /// The '<' operator.
    Left,
    /// The '[' operator.
    Open,
    /// The ']' operator.
    Close,
    /// The ',' operator.
    Input,
    /// The '.' operator.
    Output,
}

impl Command {
    /// Maps a source byte to its command, or `None` for comment bytes.
    pub fn from_byte(byte: u8) -> Option<Command> {
        let command = match byte {
            b'+' => Command::Inc,
            b'-' => Command::Dec,
            b'>' => Command::Right,
            b'<' => Command::Left,
            b'[' => Command::Open,
            b']' => Command::Close,
            b',' => Command::Input,
            b'.' => Command::Output,
            _ => return None,
        };

        Some(command)
    }

    /// The source character this command was read from.
    pub fn as_char(self) -> char {
        match self {
            Command::Inc => '+',
            Command::Dec => '-',
            Command::Right => '>',
            Command::Left => '<',
            Command::Open => '[',
            Command::Close => ']',
            Command::Input => ',',
            Command::Output => '.',
        }
    }
}

/// A significant source character together with its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    #[allow(missing_docs)]
    pub command: Command,
    #[allow(missing_docs)]
    pub location: Location,
}
