//! RV32 instructions and the assembly line format.
//!
//! Instructions render with the mnemonic left-justified in 6 columns;
//! whole lines indent the instruction body by 10 spaces and pad it to
//! 30 before an optional `# comment` tail.

use std::fmt;

use derive_more::Display;

use super::regs::Reg;

/// Unary register-register mnemonics.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum UnaryAsm {
    #[display("neg")]
    Neg,
    #[display("not")]
    Not,
    #[display("seqz")]
    Seqz,
    #[display("snez")]
    Snez,
}

/// Binary register-register-register mnemonics.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum BinaryAsm {
    #[display("add")]
    Add,
    #[display("sub")]
    Sub,
    #[display("mul")]
    Mul,
    #[display("div")]
    Div,
    #[display("rem")]
    Rem,
    #[display("and")]
    And,
    #[display("or")]
    Or,
    #[display("xor")]
    Xor,
    #[display("slt")]
    Slt,
    #[display("sgt")]
    Sgt,
}

/// One emitted instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AsmInstr {
    Li { dst: Reg, imm: i32 },
    La { dst: Reg, symbol: String },
    Lw { dst: Reg, base: Reg, offset: i32 },
    Sw { src: Reg, base: Reg, offset: i32 },
    Mv { dst: Reg, src: Reg },
    Unary { op: UnaryAsm, dst: Reg, src: Reg },
    Binary { op: BinaryAsm, dst: Reg, lhs: Reg, rhs: Reg },
    Addi { dst: Reg, src: Reg, imm: i32 },
    Beqz { cond: Reg, target: String },
    J { target: String },
    Call { target: String },
    Ret,
}

impl fmt::Display for AsmInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use AsmInstr::*;
        match self {
            Li { dst, imm } => write!(f, "{:<6}{dst}, {imm}", "li"),
            La { dst, symbol } => write!(f, "{:<6}{dst}, {symbol}", "la"),
            Lw { dst, base, offset } => {
                write!(f, "{:<6}{dst}, {offset}({base})", "lw")
            }
            Sw { src, base, offset } => {
                write!(f, "{:<6}{src}, {offset}({base})", "sw")
            }
            Mv { dst, src } => write!(f, "{:<6}{dst}, {src}", "mv"),
            Unary { op, dst, src } => {
                write!(f, "{:<6}{dst}, {src}", op.to_string())
            }
            Binary { op, dst, lhs, rhs } => {
                write!(f, "{:<6}{dst}, {lhs}, {rhs}", op.to_string())
            }
            Addi { dst, src, imm } => write!(f, "{:<6}{dst}, {src}, {imm}", "addi"),
            Beqz { cond, target } => write!(f, "{:<6}{cond}, {target}", "beqz"),
            J { target } => write!(f, "{:<6}{target}", "j"),
            Call { target } => write!(f, "{:<6}{target}", "call"),
            Ret => write!(f, "ret"),
        }
    }
}

/// One line of assembly output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AsmLine {
    /// An instruction, with an optional trailing comment.
    Instr {
        instr: AsmInstr,
        comment: Option<String>,
    },
    /// An assembler directive such as `.text` or `.word 7`.
    Directive(String),
    /// A label definition, with an optional trailing comment.
    Label {
        name: String,
        comment: Option<String>,
    },
    /// A comment-only line.
    Comment(String),
    Blank,
}

impl fmt::Display for AsmLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmLine::Instr { instr, comment } => {
                let body = instr.to_string();
                match comment {
                    Some(c) => write!(f, "          {body:<30}# {c}"),
                    None => write!(f, "          {body}"),
                }
            }
            AsmLine::Directive(d) => write!(f, "          {d}"),
            AsmLine::Label { name, comment } => {
                let head = format!("{name}:");
                match comment {
                    Some(c) => write!(f, "{head:<40}# {c}"),
                    None => write!(f, "{head}"),
                }
            }
            AsmLine::Comment(c) => {
                write!(f, "                                  # {c}")
            }
            AsmLine::Blank => Ok(()),
        }
    }
}
