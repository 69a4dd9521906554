//! The peephole pass, run per block under `-O`.
//!
//! Deliberately tiny: it only drops moves from a register to itself,
//! which the allocator can produce when a temp already sits where an
//! assignment wants it. Nothing here changes observable behavior.

use crate::riscv::instr::{AsmInstr, AsmLine};

pub fn peephole(lines: &mut Vec<AsmLine>) {
    lines.retain(|line| {
        !matches!(
            line,
            AsmLine::Instr {
                instr: AsmInstr::Mv { dst, src },
                ..
            } if dst == src
        )
    });
}
