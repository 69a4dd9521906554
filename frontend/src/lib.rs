pub mod ast;
pub mod error;
pub mod lex;
pub mod parse;
pub mod sema;
pub mod symbol;
pub mod trans;

pub use error::{CompileError, Pos};
pub use parse::parse;
pub use sema::analyze;
pub use symbol::{FuncId, SymbolTable, VarId};
pub use trans::translate;

use mind_core::TacProgram;

/// Front half of the pipeline: source text → TAC.
pub fn compile_to_tac(input: &str) -> Result<TacProgram, CompileError> {
    let mut ast = parse(input)?;
    let syms = analyze(&mut ast)?;
    Ok(translate(&ast, &syms))
}
