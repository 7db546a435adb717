//! Turns raw source bytes into a chain of located commands.
//! As a user, you should probably be looking for [`lex`]; everything else
//! in this module exists to serve it.

pub mod token;

use token::{Command, Location, Token};

/// Streams `source` once and collects every significant character with its position.
///
/// Comment bytes (anything outside the eight commands) are skipped but still
/// advance the column counter; a newline advances the line counter and resets
/// the column. Lexing cannot fail on content.
pub fn lex(source: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut line = 1u32;
    let mut col = 1u32;

    for &byte in source {
        if byte == b'\n' {
            line += 1;
            col = 1;
            continue;
        }

        if let Some(command) = Command::from_byte(byte) {
            tokens.push(Token {
                command,
                location: Location { line, col },
            });
        }
        col += 1;
    }

    tokens
}
