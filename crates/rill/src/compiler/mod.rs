// Bytecode compiler - lexes and parses rill source and emits stack-machine
// instructions directly, one pass, no AST.

mod lexer;
mod parser;

use bitflags::bitflags;
use thiserror::Error;

use crate::rill_value::Chunk;

use parser::Parser;

bitflags! {
    /// Internal compiler modes. The public API flags never reach the
    /// compiler directly; `api_eval` translates them into this namespace.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CompileMode: u8 {
        /// Program mode: the unit's completion value is the value of the
        /// last executed expression statement.
        const EVAL = 1 << 0;
        /// The source is a function body; top-level `return` is legal and
        /// the completion value is the returned value.
        const FUNCEXPR = 1 << 1;
        /// Compile the unit strict regardless of directives.
        const STRICT = 1 << 2;
    }
}

/// Static error produced by the lexer or parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (line {line})")]
pub struct CompileError {
    pub message: String,
    pub line: u32,
}

/// Compiler service entry point: source plus mode bits in, compiled
/// template out.
pub fn compile_source(
    source: &str,
    chunk_name: &str,
    mode: CompileMode,
) -> Result<Chunk, CompileError> {
    Parser::new(source, chunk_name, mode)?.parse_unit()
}
