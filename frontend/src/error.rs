use std::fmt;

use thiserror::Error;

/// A position in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
}

impl Pos {
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Diagnostics produced by the frontend. The backend never produces
/// user-facing errors; anything wrong past this point is a bug and
/// panics.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{pos}: unexpected character {ch:?}")]
    UnexpectedChar { pos: Pos, ch: char },

    #[error("{pos}: integer literal out of range")]
    IntOutOfRange { pos: Pos },

    #[error("{pos}: unexpected {found}, expected {expected}")]
    UnexpectedToken {
        pos: Pos,
        found: String,
        expected: String,
    },

    #[error("{pos}: unexpected end of input, expected {expected}")]
    UnexpectedEof { pos: Pos, expected: String },

    #[error("{pos}: left side of assignment must be a variable")]
    BadAssignTarget { pos: Pos },

    #[error("{pos}: `{name}` is already declared in this scope")]
    Redeclared { pos: Pos, name: String },

    #[error("{pos}: `{name}` has not been declared")]
    Undeclared { pos: Pos, name: String },

    #[error("{pos}: `{name}` is not a function")]
    NotAFunction { pos: Pos, name: String },

    #[error("{pos}: `{name}` is not a variable")]
    NotAVariable { pos: Pos, name: String },

    #[error("{pos}: `{name}` takes {expected} argument(s), {found} given")]
    BadArity {
        pos: Pos,
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("{pos}: function `{name}` is defined more than once")]
    Redefined { pos: Pos, name: String },

    #[error("{pos}: conflicting declarations of `{name}`")]
    ConflictingDecl { pos: Pos, name: String },

    #[error("{pos}: `{name}` is called but never defined")]
    CalledButUndefined { pos: Pos, name: String },

    #[error("{pos}: `break` outside of a loop")]
    BreakOutsideLoop { pos: Pos },

    #[error("{pos}: `continue` outside of a loop")]
    ContinueOutsideLoop { pos: Pos },

    #[error("{pos}: global initializer must be an integer constant")]
    NonConstInit { pos: Pos },

    #[error("program has no `main` function")]
    NoMain,
}
