//! TAC dump: human-readable text output.
//!
//! Used by the `--out tac` stage of the driver and, line by line, as the
//! comments the code generator attaches to its assembly output.

use std::io::{self, Write};

use crate::label::LabelTable;
use crate::program::{Piece, TacProgram};
use crate::tac::{BinaryOp, Tac, TacKind, UnaryOp};

fn unary_sym(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "-",
        UnaryOp::BNot => "~",
        UnaryOp::LNot => "!",
    }
}

fn binary_sym(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Xor => "^",
        BinaryOp::Equ => "==",
        BinaryOp::Neq => "!=",
        BinaryOp::Les => "<",
        BinaryOp::Leq => "<=",
        BinaryOp::Gtr => ">",
        BinaryOp::Geq => ">=",
        BinaryOp::LAnd => "&&",
        BinaryOp::LOr => "||",
    }
}

/// Format a single TAC instruction.
pub fn format_tac(labels: &LabelTable, tac: &Tac) -> String {
    use TacKind::*;
    match &tac.kind {
        LoadImm4 { dst, value } => format!("{dst} = {value}"),
        LoadSymbol { dst, symbol } => format!("{dst} = &{symbol}"),
        Load { dst, base, offset } => format!("{dst} = *({base} + {offset})"),
        Store { src, base, offset } => format!("*({base} + {offset}) = {src}"),
        Assign { dst, src } => format!("{dst} = {src}"),
        Unary { op, dst, src } => format!("{dst} = {} {src}", unary_sym(*op)),
        Binary { op, dst, lhs, rhs } => {
            format!("{dst} = ({lhs} {} {rhs})", binary_sym(*op))
        }
        Jump { target } => format!("jump {}", labels.render(*target)),
        JZero { cond, target } => {
            format!("if ({cond} == 0) jump {}", labels.render(*target))
        }
        Mark { label } => format!("{}:", labels.render(*label)),
        Call { dst, entry } => format!("{dst} = call {}", labels.render(*entry)),
        Push { src } => format!("push {src}"),
        Pop => "pop".to_string(),
        Param { src } => format!("param {src}"),
        Return { value } => format!("return {value}"),
        MarkParams { params } if params.is_empty() => "params".to_string(),
        MarkParams { params } => {
            let list: Vec<String> = params.iter().map(|p| p.to_string()).collect();
            format!("params {}", list.join(", "))
        }
    }
}

/// Dump a whole program's TAC to the given writer.
pub fn dump_program(prog: &TacProgram, w: &mut impl Write) -> io::Result<()> {
    for piece in &prog.pieces {
        match piece {
            Piece::Global { name, value } => {
                writeln!(w, "global {name} = {value}")?;
                writeln!(w)?;
            }
            Piece::Function(f) => {
                writeln!(w, "{}:", prog.labels.render(f.entry))?;
                for tac in &f.body {
                    match tac.kind {
                        // labels flush left, body indented
                        TacKind::Mark { .. } => {
                            writeln!(w, "{}", format_tac(&prog.labels, tac))?
                        }
                        _ => writeln!(w, "    {}", format_tac(&prog.labels, tac))?,
                    }
                }
                writeln!(w)?;
            }
        }
    }
    Ok(())
}
