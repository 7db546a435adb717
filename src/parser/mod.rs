//! Parses the token chain into a bracket-balanced tree.
//!
//! Every [`Block`] carries a [`Summary`] of static facts (I/O use, cell
//! arithmetic, pointer envelope, net pointer delta) gathered while the tokens
//! are consumed. The analyzer dispatches on these summaries, which is why they
//! are computed here in a single pass and not recovered later.

use thiserror::Error;

use crate::error::Diagnostic;
use crate::lexer::token::{Command, Location, Token};

/// One of the six loop-free commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicOp {
    /// The '+' operator.
    Add,
    /// The '-' operator.
    Sub,
    /// The '>' operator.
    IncPtr,
    /// The '<' operator.
    DecPtr,
    /// The ',' operator.
    Read,
    /// The '.' operator.
    Write,
}

/// A parsed node. The program root and every loop own their children
/// through a [`Block`].
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    /// The whole program.
    Root(Block),
    /// A single loop-free command.
    Op(BasicOp, Location),
    /// A `[` ... `]` pair; the location is the opening bracket's.
    Loop(Block, Location),
}

/// An ordered child sequence plus the facts the analyzer branches on.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    #[allow(missing_docs)]
    pub children: Vec<Ast>,
    #[allow(missing_docs)]
    pub summary: Summary,
}

/// Static facts about a block, known as soon as its closing bracket is seen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Summary {
    /// Whether any direct child is a loop.
    pub has_nested_loops: bool,
    /// Whether the block contains ',' or '.', transitively.
    pub has_io: bool,
    /// Whether the block contains '+' or '-', transitively.
    pub has_add: bool,
    /// Whether the block contains '>' or '<', transitively.
    pub has_addptr: bool,
    /// Lowest pointer offset reached by the block's own basic ops.
    /// Nested loops do not extend this.
    pub min_ptr: i64,
    /// Highest pointer offset reached by the block's own basic ops.
    pub max_ptr: i64,
    /// Net pointer delta of one pass over the block. `None` when a nested
    /// loop has a nonzero or unknown delta of its own.
    pub net_move: Option<i64>,
}

/// An error raised while pairing brackets.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// A loop was opened but its ']' never came.
    #[error("unmatched '[' opened at {0}")]
    UnmatchedLeftBracket(Location),
    /// A ']' was found with no loop open.
    #[error("unmatched ']' at {0}")]
    UnmatchedRightBracket(Location),
}

impl Diagnostic for ParseError {
    fn location(&self) -> Option<Location> {
        match self {
            ParseError::UnmatchedLeftBracket(l) | ParseError::UnmatchedRightBracket(l) => Some(*l),
        }
    }
}

/// Parses the tokens into a [`Ast::Root`], consuming them.
pub fn parse(tokens: Vec<Token>) -> Result<Ast, ParseError> {
    let mut cursor = 0usize;
    let block = parse_block(&tokens, &mut cursor, None)?;

    Ok(Ast::Root(block))
}

/// One scope of the descent. `opening` is `None` at the root and the
/// location of the '[' inside a loop.
fn parse_block(
    tokens: &[Token],
    cursor: &mut usize,
    opening: Option<Location>,
) -> Result<Block, ParseError> {
    let mut children = Vec::new();
    let mut summary = Summary::default();

    // running offset since entry, reset after each nested loop
    let mut p = 0i64;
    // accumulated basic-op delta, meaningful only while `net_known` holds
    let mut net = 0i64;
    let mut net_known = true;

    while let Some(token) = tokens.get(*cursor) {
        *cursor += 1;

        let op = match token.command {
            Command::Open => {
                let inner = parse_block(tokens, cursor, Some(token.location))?;

                summary.has_nested_loops = true;
                summary.has_io |= inner.summary.has_io;
                summary.has_add |= inner.summary.has_add;
                summary.has_addptr |= inner.summary.has_addptr;
                if inner.summary.net_move != Some(0) {
                    net_known = false;
                }
                // the nested delta is captured in the child's own summary
                p = 0;

                children.push(Ast::Loop(inner, token.location));
                continue;
            }
            Command::Close => {
                return match opening {
                    Some(_) => {
                        summary.net_move = net_known.then_some(net);
                        Ok(Block { children, summary })
                    }
                    None => Err(ParseError::UnmatchedRightBracket(token.location)),
                };
            }
            Command::Inc => BasicOp::Add,
            Command::Dec => BasicOp::Sub,
            Command::Right => BasicOp::IncPtr,
            Command::Left => BasicOp::DecPtr,
            Command::Input => BasicOp::Read,
            Command::Output => BasicOp::Write,
        };

        match op {
            BasicOp::Add | BasicOp::Sub => summary.has_add = true,
            BasicOp::Read | BasicOp::Write => summary.has_io = true,
            BasicOp::IncPtr => {
                summary.has_addptr = true;
                p += 1;
                net += 1;
            }
            BasicOp::DecPtr => {
                summary.has_addptr = true;
                p -= 1;
                net -= 1;
            }
        }
        summary.min_ptr = summary.min_ptr.min(p);
        summary.max_ptr = summary.max_ptr.max(p);

        children.push(Ast::Op(op, token.location));
    }

    // ran out of tokens
    match opening {
        None => {
            summary.net_move = net_known.then_some(net);
            Ok(Block { children, summary })
        }
        Some(location) => Err(ParseError::UnmatchedLeftBracket(location)),
    }
}
