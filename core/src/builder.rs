//! The TAC emission builder.
//!
//! One builder per compilation. The translator drives it through the
//! `start_func`/`end_func` bracketing and the `gen_*` family, one method
//! per instruction tag. Value-producing `gen_*` methods take their
//! destination explicitly and return it, so callers can chain.

use crate::label::{LabelIdx, LabelTable};
use crate::program::{Piece, TacFunc, TacProgram};
use crate::tac::{BinaryOp, Tac, TacKind, UnaryOp};
use crate::temp::{TempIdx, TempPool};

/// Word size of the target, in bytes.
pub const WORD_SIZE: i32 = 4;

struct OpenFunc {
    entry: LabelIdx,
    params: Vec<TempIdx>,
    body: Vec<Tac>,
}

/// Builder for a [`TacProgram`].
#[derive(Default)]
pub struct TacBuilder {
    temps: TempPool,
    labels: LabelTable,
    pieces: Vec<Piece>,
    cur: Option<OpenFunc>,
}

impl TacBuilder {
    pub fn new() -> Self {
        Self {
            temps: TempPool::new(),
            labels: LabelTable::new(),
            pieces: Vec::new(),
            cur: None,
        }
    }

    // -- Temps and labels --

    /// Fresh 4-byte temporary.
    pub fn new_temp(&mut self) -> TempIdx {
        self.temps.new_temp_i4()
    }

    /// Fresh temporary bound to a source symbol name (dump-only).
    pub fn new_temp_for(&mut self, name: &str) -> TempIdx {
        self.temps.new_temp_for(name)
    }

    /// Fresh synthetic control-flow label.
    pub fn new_label(&mut self) -> LabelIdx {
        self.labels.new_label()
    }

    /// Entry label for the named function.
    pub fn entry_label(&mut self, name: &str) -> LabelIdx {
        self.labels.new_entry_label(name)
    }

    pub fn temps(&self) -> &TempPool {
        &self.temps
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    // -- Piece bracketing --

    /// Open a function. Fixes the formals' frame offsets (`+0, +4, …`
    /// from the frame pointer, matching the caller's argument area) and
    /// records them with a `MarkParams` at the head of the body.
    pub fn start_func(&mut self, entry: LabelIdx, params: &[TempIdx]) {
        assert!(self.cur.is_none(), "a function is already open");
        self.cur = Some(OpenFunc {
            entry,
            params: Vec::new(),
            body: Vec::new(),
        });
        for &p in params {
            self.mark_parameter(p);
        }
        self.emit(TacKind::MarkParams {
            params: params.to_vec(),
        });
    }

    /// Associate a temporary with the next positional argument slot.
    pub fn mark_parameter(&mut self, t: TempIdx) {
        let cur = self.cur.as_mut().expect("no open function");
        let index = cur.params.len() as i32;
        cur.params.push(t);
        self.temps.fix_offset(t, index * WORD_SIZE);
    }

    /// Whether the open function's body currently ends with a
    /// `Return`. Lets the translator decide if an implicit return is
    /// needed.
    pub fn body_ends_with_return(&self) -> bool {
        let cur = self.cur.as_ref().expect("no open function");
        matches!(cur.body.last(), Some(t) if matches!(t.kind, TacKind::Return { .. }))
    }

    /// Close the open function and append it to the piece list.
    pub fn end_func(&mut self) {
        let cur = self.cur.take().expect("no open function");
        self.pieces.push(Piece::Function(TacFunc {
            entry: cur.entry,
            params: cur.params,
            body: cur.body,
        }));
    }

    /// Append a global word variable.
    pub fn add_global(&mut self, name: &str, value: i32) {
        self.pieces.push(Piece::Global {
            name: name.to_string(),
            value,
        });
    }

    /// Finish the compilation.
    pub fn finish(self) -> TacProgram {
        assert!(self.cur.is_none(), "unclosed function");
        TacProgram {
            temps: self.temps,
            labels: self.labels,
            pieces: self.pieces,
        }
    }

    // -- Emission --

    fn emit(&mut self, kind: TacKind) {
        self.cur
            .as_mut()
            .expect("no open function")
            .body
            .push(Tac::new(kind));
    }

    fn emit_unary(&mut self, op: UnaryOp, dst: TempIdx, src: TempIdx) -> TempIdx {
        self.emit(TacKind::Unary { op, dst, src });
        dst
    }

    fn emit_binary(
        &mut self,
        op: BinaryOp,
        dst: TempIdx,
        lhs: TempIdx,
        rhs: TempIdx,
    ) -> TempIdx {
        self.emit(TacKind::Binary { op, dst, lhs, rhs });
        dst
    }

    pub fn gen_load_imm4(&mut self, dst: TempIdx, value: i32) -> TempIdx {
        self.emit(TacKind::LoadImm4 { dst, value });
        dst
    }

    pub fn gen_load_symbol(&mut self, dst: TempIdx, symbol: &str) -> TempIdx {
        self.emit(TacKind::LoadSymbol {
            dst,
            symbol: symbol.to_string(),
        });
        dst
    }

    pub fn gen_load(&mut self, dst: TempIdx, base: TempIdx, offset: i32) -> TempIdx {
        self.emit(TacKind::Load { dst, base, offset });
        dst
    }

    pub fn gen_store(&mut self, src: TempIdx, base: TempIdx, offset: i32) {
        self.emit(TacKind::Store { src, base, offset });
    }

    pub fn gen_assign(&mut self, dst: TempIdx, src: TempIdx) -> TempIdx {
        self.emit(TacKind::Assign { dst, src });
        dst
    }

    pub fn gen_neg(&mut self, dst: TempIdx, src: TempIdx) -> TempIdx {
        self.emit_unary(UnaryOp::Neg, dst, src)
    }

    pub fn gen_bnot(&mut self, dst: TempIdx, src: TempIdx) -> TempIdx {
        self.emit_unary(UnaryOp::BNot, dst, src)
    }

    pub fn gen_lnot(&mut self, dst: TempIdx, src: TempIdx) -> TempIdx {
        self.emit_unary(UnaryOp::LNot, dst, src)
    }

    pub fn gen_add(&mut self, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(BinaryOp::Add, d, a, b)
    }

    pub fn gen_sub(&mut self, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(BinaryOp::Sub, d, a, b)
    }

    pub fn gen_mul(&mut self, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(BinaryOp::Mul, d, a, b)
    }

    pub fn gen_div(&mut self, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(BinaryOp::Div, d, a, b)
    }

    pub fn gen_mod(&mut self, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(BinaryOp::Mod, d, a, b)
    }

    pub fn gen_xor(&mut self, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(BinaryOp::Xor, d, a, b)
    }

    pub fn gen_equ(&mut self, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(BinaryOp::Equ, d, a, b)
    }

    pub fn gen_neq(&mut self, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(BinaryOp::Neq, d, a, b)
    }

    pub fn gen_les(&mut self, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(BinaryOp::Les, d, a, b)
    }

    pub fn gen_leq(&mut self, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(BinaryOp::Leq, d, a, b)
    }

    pub fn gen_gtr(&mut self, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(BinaryOp::Gtr, d, a, b)
    }

    pub fn gen_geq(&mut self, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(BinaryOp::Geq, d, a, b)
    }

    pub fn gen_land(&mut self, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(BinaryOp::LAnd, d, a, b)
    }

    pub fn gen_lor(&mut self, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(BinaryOp::LOr, d, a, b)
    }

    pub fn gen_jump(&mut self, target: LabelIdx) {
        self.emit(TacKind::Jump { target });
    }

    pub fn gen_jzero(&mut self, cond: TempIdx, target: LabelIdx) {
        self.emit(TacKind::JZero { cond, target });
    }

    pub fn gen_mark(&mut self, label: LabelIdx) {
        self.emit(TacKind::Mark { label });
    }

    pub fn gen_call(&mut self, dst: TempIdx, entry: LabelIdx) -> TempIdx {
        self.emit(TacKind::Call { dst, entry });
        dst
    }

    pub fn gen_push(&mut self, src: TempIdx) {
        self.emit(TacKind::Push { src });
    }

    pub fn gen_pop(&mut self) {
        self.emit(TacKind::Pop);
    }

    pub fn gen_param(&mut self, src: TempIdx) {
        self.emit(TacKind::Param { src });
    }

    pub fn gen_return(&mut self, value: TempIdx) {
        self.emit(TacKind::Return { value });
    }
}
