//! The RV32 target: register bank, instruction model, code generator.

pub mod codegen;
pub mod instr;
pub mod regs;

pub use codegen::{dump_flow_graphs, emit_assembly};
pub use instr::{AsmInstr, AsmLine, BinaryAsm, UnaryAsm};
pub use regs::{Reg, RegEntry, RegFile, NUM_REGS};
