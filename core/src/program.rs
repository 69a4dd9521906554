use crate::label::{LabelIdx, LabelTable};
use crate::tac::Tac;
use crate::temp::{TempIdx, TempPool};

/// The TAC of one function: entry label, formal parameters in
/// positional order, and the instruction body.
#[derive(Debug, Clone)]
pub struct TacFunc {
    pub entry: LabelIdx,
    pub params: Vec<TempIdx>,
    pub body: Vec<Tac>,
}

/// A top-level emission unit, kept in source order.
#[derive(Debug, Clone)]
pub enum Piece {
    Function(TacFunc),
    /// A global word variable with its initial value.
    Global { name: String, value: i32 },
}

/// A whole compilation in TAC form.
///
/// Owns the temp pool and label table shared by all pieces; temps and
/// labels live until the program is dropped.
#[derive(Debug)]
pub struct TacProgram {
    pub temps: TempPool,
    pub labels: LabelTable,
    pub pieces: Vec<Piece>,
}

impl TacProgram {
    /// Iterate over the function pieces only.
    pub fn funcs(&self) -> impl Iterator<Item = &TacFunc> {
        self.pieces.iter().filter_map(|p| match p {
            Piece::Function(f) => Some(f),
            Piece::Global { .. } => None,
        })
    }
}
