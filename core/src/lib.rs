pub mod builder;
pub mod dump;
pub mod label;
pub mod program;
pub mod tac;
pub mod temp;

pub use builder::{TacBuilder, WORD_SIZE};
pub use label::{Label, LabelIdx, LabelKind, LabelTable};
pub use program::{Piece, TacFunc, TacProgram};
pub use tac::{BinaryOp, Tac, TacKind, TempSet, UnaryOp};
pub use temp::{Temp, TempIdx, TempPool};
