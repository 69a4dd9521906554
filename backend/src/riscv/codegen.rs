//! TAC → RV32 instruction selection with on-the-fly register
//! allocation.
//!
//! One pass per basic block. The allocator keeps a bidirectional
//! register↔temp map in the bank: reads bind a temp to a register
//! (loading from its frame slot, or zero-initializing on first
//! appearance), writes mark the register dirty, and eviction spills
//! dirty live temps to frame slots on demand. Every control-flow
//! boundary spills all dirty live registers, so no value crosses a
//! block edge in a register.
//!
//! Calls use a uniform caller-saves protocol: the live set is saved
//! below `sp`, the staged arguments are stored into a fresh argument
//! area, and everything is reloaded after the `call`. Correctness does
//! not depend on which registers the callee clobbers.

use std::io::{self, Write};

use log::{debug, trace};

use mind_core::dump::format_tac;
use mind_core::{
    BinaryOp, LabelIdx, LabelTable, Piece, Tac, TacFunc, TacKind, TacProgram,
    TempIdx, TempPool, TempSet, UnaryOp, WORD_SIZE,
};

use crate::flow::{EndKind, FlowGraph};
use crate::frame::StackFrame;
use crate::liveness;
use crate::optimize::peephole;

use super::instr::{AsmInstr, AsmLine, BinaryAsm, UnaryAsm};
use super::regs::{Reg, RegFile, NUM_REGS, ZERO};

/// Emit the whole program as assembly text.
pub fn emit_assembly(
    prog: &mut TacProgram,
    w: &mut impl Write,
    optimize: bool,
) -> io::Result<()> {
    let TacProgram {
        ref mut temps,
        ref labels,
        ref pieces,
    } = *prog;
    let mut gen = CodeGen::new(temps, labels, optimize);
    gen.emit_program(pieces, w)
}

/// Dump every function's CFG with its liveness solution, instead of
/// generating code.
pub fn dump_flow_graphs(prog: &TacProgram, w: &mut impl Write) -> io::Result<()> {
    for f in prog.funcs() {
        writeln!(w, "flow graph of {}:", prog.labels.render(f.entry))?;
        let mut g = FlowGraph::build(f);
        g.simplify();
        liveness::analyze(&mut g);
        g.dump(&prog.labels, w)?;
        writeln!(w)?;
    }
    Ok(())
}

struct CodeGen<'a> {
    temps: &'a mut TempPool,
    labels: &'a LabelTable,
    regs: RegFile,
    frame: StackFrame,
    /// Lines of the block currently being translated.
    buf: Vec<AsmLine>,
    /// Round-robin cursor of the third spill tier.
    last_used: usize,
    /// Counter behind the `__LLn` block entry labels, shared by all
    /// functions of the compilation.
    label_counter: u32,
    opt: bool,
}

impl<'a> CodeGen<'a> {
    fn new(temps: &'a mut TempPool, labels: &'a LabelTable, opt: bool) -> Self {
        Self {
            temps,
            labels,
            regs: RegFile::new(),
            frame: StackFrame::new(),
            buf: Vec::new(),
            last_used: 0,
            label_counter: 0,
            opt,
        }
    }

    fn emit_program(&mut self, pieces: &[Piece], w: &mut impl Write) -> io::Result<()> {
        write_line(w, &AsmLine::Directive(".text".into()))?;
        write_line(w, &AsmLine::Directive(".globl main".into()))?;
        write_line(w, &AsmLine::Directive(".align 2".into()))?;
        for piece in pieces {
            match piece {
                Piece::Global { name, value } => {
                    write_line(w, &AsmLine::Directive(".data".into()))?;
                    write_line(w, &AsmLine::Directive(format!(".global {name}")))?;
                    write_line(
                        w,
                        &AsmLine::Label {
                            name: name.clone(),
                            comment: None,
                        },
                    )?;
                    write_line(w, &AsmLine::Directive(format!(".word {value}")))?;
                }
                Piece::Function(f) => self.emit_func(f, w)?,
            }
        }
        Ok(())
    }

    fn new_block_label(&mut self) -> String {
        assert!(self.label_counter < 10000);
        let s = format!("__LL{}", self.label_counter);
        self.label_counter += 1;
        s
    }

    fn emit_func(&mut self, f: &TacFunc, w: &mut impl Write) -> io::Result<()> {
        debug!("compiling function {}", self.labels.render(f.entry));
        let mut g = FlowGraph::build(f);
        g.simplify();
        liveness::analyze(&mut g);

        // temps in any block-level live-out cross a block boundary and
        // need a deterministic home before any code is emitted
        self.frame = StackFrame::new();
        for b in &mut g.blocks {
            let crossing: Vec<TempIdx> = b.live_out.iter().copied().collect();
            for t in crossing {
                self.frame.reserve(self.temps, t);
            }
            b.entry_label = self.new_block_label();
        }

        // translate every block body, collecting the lines so the
        // prolog below can state the final frame size
        let mut code: Vec<Vec<AsmLine>> = Vec::with_capacity(g.len());
        for id in 0..g.len() {
            liveness::attach_instr_liveness(&mut g.blocks[id]);
            self.regs.reset();
            let mut lines = self.prepare_block(&g, id);
            if self.opt {
                peephole(&mut lines);
            }
            code.push(lines);
        }

        // prolog
        let frame_size = self.frame.stack_frame_size();
        write_line(w, &AsmLine::Blank)?;
        write_line(w, &AsmLine::Directive(".text".into()))?;
        write_line(
            w,
            &AsmLine::Label {
                name: self.labels.render(f.entry),
                comment: Some("function entry".into()),
            },
        )?;
        for instr in [
            AsmInstr::Sw {
                src: Reg::Ra,
                base: Reg::Sp,
                offset: -WORD_SIZE,
            },
            AsmInstr::Sw {
                src: Reg::Fp,
                base: Reg::Sp,
                offset: -2 * WORD_SIZE,
            },
            AsmInstr::Mv {
                dst: Reg::Fp,
                src: Reg::Sp,
            },
            AsmInstr::Addi {
                dst: Reg::Sp,
                src: Reg::Sp,
                imm: -(frame_size + 2 * WORD_SIZE),
            },
        ] {
            write_line(
                w,
                &AsmLine::Instr {
                    instr,
                    comment: None,
                },
            )?;
        }

        // body, as a depth-first trace preferring fall-through edges
        let mut mark = vec![false; g.len()];
        for id in 0..g.len() {
            self.emit_trace(&g, id, &code, &mut mark, w)?;
        }
        Ok(())
    }

    fn emit_trace(
        &self,
        g: &FlowGraph,
        id: usize,
        code: &[Vec<AsmLine>],
        mark: &mut [bool],
        w: &mut impl Write,
    ) -> io::Result<()> {
        if mark[id] {
            return Ok(());
        }
        mark[id] = true;
        let b = g.block(id);
        write_line(
            w,
            &AsmLine::Label {
                name: b.entry_label.clone(),
                comment: None,
            },
        )?;
        for line in &code[id] {
            write_line(w, line)?;
        }
        match b.end {
            // the branch terminator handles the taken edge itself
            EndKind::ByJump => self.emit_trace(g, b.next[0].unwrap(), code, mark, w),
            EndKind::ByJZero => self.emit_trace(g, b.next[1].unwrap(), code, mark, w),
            EndKind::ByReturn => Ok(()),
        }
    }

    // -- per-block translation --

    fn prepare_block(&mut self, g: &FlowGraph, id: usize) -> Vec<AsmLine> {
        let b = g.block(id);
        self.buf.clear();
        for i in 0..b.tac.len() {
            self.emit_tac(&b.tac, i);
        }
        match b.end {
            EndKind::ByJump => {
                self.spill_dirty_regs(&b.live_out);
                let target = g.block(b.next[0].unwrap()).entry_label.clone();
                self.push(AsmInstr::J { target });
            }
            EndKind::ByJZero => {
                let r = self.reg_for_read(b.var.unwrap(), None, &b.live_out);
                self.spill_dirty_regs(&b.live_out);
                let cond = self.regs.reg(r);
                let zero_target = g.block(b.next[0].unwrap()).entry_label.clone();
                let fall_target = g.block(b.next[1].unwrap()).entry_label.clone();
                self.push(AsmInstr::Beqz {
                    cond,
                    target: zero_target,
                });
                self.push(AsmInstr::J {
                    target: fall_target,
                });
            }
            EndKind::ByReturn => {
                let r = self.reg_for_read(b.var.unwrap(), None, &b.live_out);
                self.spill_dirty_regs(&b.live_out);
                let src = self.regs.reg(r);
                self.push(AsmInstr::Mv { dst: Reg::A0, src });
                self.push(AsmInstr::Mv {
                    dst: Reg::Sp,
                    src: Reg::Fp,
                });
                self.push(AsmInstr::Lw {
                    dst: Reg::Ra,
                    base: Reg::Fp,
                    offset: -WORD_SIZE,
                });
                self.push(AsmInstr::Lw {
                    dst: Reg::Fp,
                    base: Reg::Fp,
                    offset: -2 * WORD_SIZE,
                });
                self.push(AsmInstr::Ret);
            }
        }
        std::mem::take(&mut self.buf)
    }

    fn emit_tac(&mut self, tacs: &[Tac], i: usize) {
        let t = &tacs[i];
        if !self.opt {
            self.buf
                .push(AsmLine::Comment(format_tac(self.labels, t)));
        }
        let live = &t.live_out;
        match &t.kind {
            TacKind::LoadImm4 { dst, value } => {
                // dead destination: nothing to compute
                if !live.contains(dst) {
                    return;
                }
                let r0 = self.reg_for_write(*dst, None, None, live);
                let dst = self.regs.reg(r0);
                self.push(AsmInstr::Li { dst, imm: *value });
            }
            TacKind::LoadSymbol { dst, symbol } => {
                if !live.contains(dst) {
                    return;
                }
                let r0 = self.reg_for_write(*dst, None, None, live);
                let dst = self.regs.reg(r0);
                self.push(AsmInstr::La {
                    dst,
                    symbol: symbol.clone(),
                });
            }
            TacKind::Load { dst, base, offset } => {
                if !live.contains(dst) {
                    return;
                }
                let r1 = self.reg_for_read(*base, None, live);
                let r0 = self.reg_for_write(*dst, Some(r1), None, live);
                let (dst, base) = (self.regs.reg(r0), self.regs.reg(r1));
                self.push(AsmInstr::Lw {
                    dst,
                    base,
                    offset: *offset,
                });
            }
            TacKind::Store { src, base, offset } => {
                // keep both operands safe from each other's loads
                let mut ext = live.clone();
                ext.insert(*src);
                ext.insert(*base);
                let r1 = self.reg_for_read(*src, None, &ext);
                let r2 = self.reg_for_read(*base, Some(r1), &ext);
                let (src, base) = (self.regs.reg(r1), self.regs.reg(r2));
                self.push(AsmInstr::Sw {
                    src,
                    base,
                    offset: *offset,
                });
            }
            TacKind::Assign { dst, src } => {
                if !live.contains(dst) {
                    return;
                }
                let r1 = self.reg_for_read(*src, None, live);
                let r0 = self.reg_for_write(*dst, Some(r1), None, live);
                let (dst, src) = (self.regs.reg(r0), self.regs.reg(r1));
                self.push(AsmInstr::Mv { dst, src });
            }
            TacKind::Unary { op, dst, src } => {
                if !live.contains(dst) {
                    return;
                }
                let r1 = self.reg_for_read(*src, None, live);
                let r0 = self.reg_for_write(*dst, Some(r1), None, live);
                let (dst, src) = (self.regs.reg(r0), self.regs.reg(r1));
                let op = match op {
                    UnaryOp::Neg => UnaryAsm::Neg,
                    UnaryOp::BNot => UnaryAsm::Not,
                    UnaryOp::LNot => UnaryAsm::Seqz,
                };
                self.push(AsmInstr::Unary { op, dst, src });
            }
            TacKind::Binary { op, dst, lhs, rhs } => {
                if !live.contains(dst) {
                    return;
                }
                self.emit_binary(*op, *dst, *lhs, *rhs, live);
            }
            TacKind::Call { dst, entry } => {
                self.emit_call(tacs, i, *dst, *entry, live);
            }
            TacKind::Push { src } => {
                let r1 = self.reg_for_read(*src, None, live);
                let src = self.regs.reg(r1);
                self.push(AsmInstr::Addi {
                    dst: Reg::Sp,
                    src: Reg::Sp,
                    imm: -WORD_SIZE,
                });
                self.push(AsmInstr::Sw {
                    src,
                    base: Reg::Sp,
                    offset: 0,
                });
            }
            TacKind::Pop => {
                self.push(AsmInstr::Addi {
                    dst: Reg::Sp,
                    src: Reg::Sp,
                    imm: WORD_SIZE,
                });
            }
            // arguments are marshalled by the upcoming Call
            TacKind::Param { .. } => {}
            TacKind::MarkParams { .. } => {}
            TacKind::Jump { .. }
            | TacKind::JZero { .. }
            | TacKind::Return { .. }
            | TacKind::Mark { .. } => {
                unreachable!("terminator or label inside a basic block body")
            }
        }
    }

    fn emit_binary(
        &mut self,
        op: BinaryOp,
        dst: TempIdx,
        lhs: TempIdx,
        rhs: TempIdx,
        live: &TempSet,
    ) {
        // both sources join the live set, so acquiring a register for
        // one can never evict the other
        let mut ext = live.clone();
        ext.insert(lhs);
        ext.insert(rhs);
        let r1 = self.reg_for_read(lhs, None, &ext);
        let r2 = self.reg_for_read(rhs, Some(r1), &ext);
        let r0 = self.reg_for_write(dst, Some(r1), Some(r2), &ext);
        let (d, a, b) = (self.regs.reg(r0), self.regs.reg(r1), self.regs.reg(r2));

        let simple = |op| AsmInstr::Binary {
            op,
            dst: d,
            lhs: a,
            rhs: b,
        };
        match op {
            BinaryOp::Add => self.push(simple(BinaryAsm::Add)),
            BinaryOp::Sub => self.push(simple(BinaryAsm::Sub)),
            BinaryOp::Mul => self.push(simple(BinaryAsm::Mul)),
            BinaryOp::Div => self.push(simple(BinaryAsm::Div)),
            BinaryOp::Mod => self.push(simple(BinaryAsm::Rem)),
            BinaryOp::Xor => self.push(simple(BinaryAsm::Xor)),
            // operands are 0/1 by the translator's contract
            BinaryOp::LAnd => self.push(simple(BinaryAsm::And)),
            BinaryOp::LOr => self.push(simple(BinaryAsm::Or)),
            BinaryOp::Les => self.push(simple(BinaryAsm::Slt)),
            BinaryOp::Gtr => self.push(simple(BinaryAsm::Sgt)),
            BinaryOp::Equ => {
                self.push(simple(BinaryAsm::Sub));
                self.push(AsmInstr::Unary {
                    op: UnaryAsm::Seqz,
                    dst: d,
                    src: d,
                });
            }
            BinaryOp::Neq => {
                self.push(simple(BinaryAsm::Sub));
                self.push(AsmInstr::Unary {
                    op: UnaryAsm::Snez,
                    dst: d,
                    src: d,
                });
            }
            BinaryOp::Geq => {
                self.push(simple(BinaryAsm::Slt));
                self.push(AsmInstr::Unary {
                    op: UnaryAsm::Seqz,
                    dst: d,
                    src: d,
                });
            }
            BinaryOp::Leq => {
                self.push(simple(BinaryAsm::Sgt));
                self.push(AsmInstr::Unary {
                    op: UnaryAsm::Seqz,
                    dst: d,
                    src: d,
                });
            }
        }
    }

    /// The call-site protocol: save the live set below `sp`, marshal
    /// the staged arguments, `call`, restore, and move `a0` into the
    /// destination.
    fn emit_call(
        &mut self,
        tacs: &[Tac],
        i: usize,
        dst: TempIdx,
        entry: LabelIdx,
        live_out: &TempSet,
    ) {
        // the contiguous Param run immediately preceding the call
        let mut first = i;
        while first > 0 && matches!(tacs[first - 1].kind, TacKind::Param { .. }) {
            first -= 1;
        }
        let args: Vec<TempIdx> = tacs[first..i]
            .iter()
            .map(|t| match t.kind {
                TacKind::Param { src } => src,
                _ => unreachable!(),
            })
            .collect();

        let live: Vec<TempIdx> = live_out.iter().copied().collect();
        // argument temps must survive the register traffic below; an
        // eviction must spill them to a slot, not discard them
        let mut ext = live_out.clone();
        ext.extend(args.iter().copied());

        // save every live temp just below sp
        let mut cnt = 0;
        for &v in &live {
            cnt -= WORD_SIZE;
            let r = self.reg_for_read(v, None, &ext);
            let src = self.regs.reg(r);
            self.push(AsmInstr::Sw {
                src,
                base: Reg::Sp,
                offset: cnt,
            });
        }
        if cnt != 0 {
            self.push(AsmInstr::Addi {
                dst: Reg::Sp,
                src: Reg::Sp,
                imm: cnt,
            });
        }

        // argument area: arg k at 4k(sp)
        let arg_bytes = args.len() as i32 * WORD_SIZE;
        if arg_bytes > 0 {
            self.push(AsmInstr::Addi {
                dst: Reg::Sp,
                src: Reg::Sp,
                imm: -arg_bytes,
            });
            for (k, &a) in args.iter().enumerate() {
                let r = self.reg_for_read(a, None, &ext);
                let src = self.regs.reg(r);
                self.push(AsmInstr::Sw {
                    src,
                    base: Reg::Sp,
                    offset: k as i32 * WORD_SIZE,
                });
            }
        }

        self.push(AsmInstr::Call {
            target: self.labels.render(entry),
        });

        // pop both areas, then reload the live set
        let total = arg_bytes + live.len() as i32 * WORD_SIZE;
        if total != 0 {
            self.push(AsmInstr::Addi {
                dst: Reg::Sp,
                src: Reg::Sp,
                imm: total,
            });
        }
        let mut cnt = 0;
        for &v in &live {
            cnt -= WORD_SIZE;
            let r = self.reg_for_write(v, None, None, live_out);
            let dst = self.regs.reg(r);
            self.push(AsmInstr::Lw {
                dst,
                base: Reg::Sp,
                offset: cnt,
            });
        }

        let r0 = self.reg_for_write(dst, None, None, live_out);
        let dst = self.regs.reg(r0);
        self.push(AsmInstr::Mv { dst, src: Reg::A0 });
    }

    // -- the register allocator --

    /// Register holding `v`, loading it first if needed.
    fn reg_for_read(&mut self, v: TempIdx, avoid1: Option<usize>, live: &TempSet) -> usize {
        if let Some(i) = self.regs.lookup(v) {
            return i;
        }
        let i = match self.regs.lookup_free() {
            Some(i) => i,
            None => {
                let i = self.select_reg_to_spill(avoid1, None, live);
                self.spill_reg(i, live);
                i
            }
        };
        self.regs.entry_mut(i).var = Some(v);
        let reg = self.regs.reg(i);
        let t = self.temps.temp(v);
        if t.is_offset_fixed {
            let off = t.offset;
            self.push_cmt(
                AsmInstr::Lw {
                    dst: reg,
                    base: Reg::Fp,
                    offset: off,
                },
                format!("load {v} from (fp{off:+}) into {reg}"),
            );
        } else {
            // first appearance: the temp has no home yet
            self.push_cmt(
                AsmInstr::Mv {
                    dst: reg,
                    src: Reg::Zero,
                },
                format!("initialize {v} with 0"),
            );
        }
        self.regs.entry_mut(i).dirty = false;
        i
    }

    /// Register to write `v` into. A dead destination gets the `zero`
    /// register, turning the write into a no-op.
    fn reg_for_write(
        &mut self,
        v: TempIdx,
        avoid1: Option<usize>,
        avoid2: Option<usize>,
        live: &TempSet,
    ) -> usize {
        if !live.contains(&v) {
            return ZERO;
        }
        let i = if let Some(i) = self.regs.lookup(v) {
            i
        } else {
            match self.regs.lookup_free() {
                Some(i) => i,
                None => {
                    let i = self.select_reg_to_spill(avoid1, avoid2, live);
                    self.spill_reg(i, live);
                    i
                }
            }
        };
        self.regs.entry_mut(i).var = Some(v);
        self.regs.entry_mut(i).dirty = true;
        i
    }

    /// Pick a victim register. Three tiers: a register whose temp is
    /// dead (free to take), then a clean one (no store needed), then
    /// round-robin among the rest.
    fn select_reg_to_spill(
        &mut self,
        avoid1: Option<usize>,
        avoid2: Option<usize>,
        live: &TempSet,
    ) -> usize {
        let avoided = |i: usize| Some(i) == avoid1 || Some(i) == avoid2;

        for i in 0..NUM_REGS {
            if !self.regs.reg(i).is_general() || avoided(i) {
                continue;
            }
            let held_live = self.regs.entry(i).var.is_some_and(|v| live.contains(&v));
            if !held_live {
                return i;
            }
        }
        for i in 0..NUM_REGS {
            if !self.regs.reg(i).is_general() || avoided(i) {
                continue;
            }
            if !self.regs.entry(i).dirty {
                return i;
            }
        }
        loop {
            self.last_used = (self.last_used + 1) % NUM_REGS;
            let i = self.last_used;
            if self.regs.reg(i).is_general() && !avoided(i) {
                return i;
            }
        }
    }

    /// Unbind register `i`, first storing its temp to the frame when
    /// the value would otherwise be lost.
    fn spill_reg(&mut self, i: usize, live: &TempSet) {
        if let Some(v) = self.regs.entry(i).var {
            if self.regs.entry(i).dirty && live.contains(&v) {
                if !self.temps.temp(v).is_offset_fixed {
                    self.frame.slot_to_write(self.temps, v, live);
                }
                let off = self.temps.temp(v).offset;
                let reg = self.regs.reg(i);
                trace!("spilling {v} from {reg} to (fp{off:+})");
                self.push_cmt(
                    AsmInstr::Sw {
                        src: reg,
                        base: Reg::Fp,
                        offset: off,
                    },
                    format!("spill {v} from {reg} to (fp{off:+})"),
                );
            }
        }
        let e = self.regs.entry_mut(i);
        e.var = None;
        e.dirty = false;
    }

    /// Spill every dirty live register and unbind them all. Run at
    /// every control-flow boundary.
    fn spill_dirty_regs(&mut self, live: &TempSet) {
        let needs_save = (0..NUM_REGS).any(|i| {
            let e = self.regs.entry(i);
            e.dirty && e.var.is_some_and(|v| live.contains(&v))
        });
        if needs_save {
            self.push_comment("(save modified registers before control flow changes)");
        }
        for i in 0..NUM_REGS {
            self.spill_reg(i, live);
        }
    }

    // -- output helpers --

    fn push(&mut self, instr: AsmInstr) {
        self.buf.push(AsmLine::Instr {
            instr,
            comment: None,
        });
    }

    fn push_cmt(&mut self, instr: AsmInstr, comment: String) {
        self.buf.push(AsmLine::Instr {
            instr,
            comment: Some(comment),
        });
    }

    fn push_comment(&mut self, c: &str) {
        // comment lines disappear under -O; comment tails stay
        if !self.opt {
            self.buf.push(AsmLine::Comment(c.to_string()));
        }
    }
}

fn write_line(w: &mut impl Write, line: &AsmLine) -> io::Result<()> {
    writeln!(w, "{line}")
}
