//! Syntax-directed translation: validated AST → TAC.
//!
//! One pass over the AST, threading the emission builder. Every
//! expression produces the temp carrying its run-time value; every
//! statement emits code with no value. Evaluation order is strictly
//! left to right, and `&&`/`||` are lowered to short-circuit control
//! flow, so the right operand never runs when the left decides the
//! result.

use log::debug;

use mind_core::{LabelIdx, TacBuilder, TacProgram, TempIdx};

use crate::ast::*;
use crate::sema::const_int;
use crate::symbol::SymbolTable;

struct Translator<'a> {
    b: TacBuilder,
    syms: &'a SymbolTable,
    /// Temp bound to each variable symbol (locals and parameters).
    var_temp: Vec<Option<TempIdx>>,
    /// Entry label of each function symbol.
    func_label: Vec<LabelIdx>,
    /// Innermost-last stack of (break target, continue target).
    loops: Vec<(LabelIdx, LabelIdx)>,
}

/// Lower a validated program to TAC.
pub fn translate(prog: &Program, syms: &SymbolTable) -> TacProgram {
    let mut b = TacBuilder::new();
    // entry labels first, so calls to later definitions resolve
    let func_label: Vec<LabelIdx> = syms
        .funcs()
        .map(|(_, f)| b.entry_label(&f.name))
        .collect();
    let mut tr = Translator {
        b,
        syms,
        var_temp: vec![None; syms.num_vars()],
        func_label,
        loops: Vec::new(),
    };
    for decl in &prog.decls {
        match decl {
            Decl::Global(vd) => tr.emit_global(vd),
            Decl::Func(fd) => tr.emit_func(fd),
        }
    }
    tr.b.finish()
}

impl Translator<'_> {
    fn var_of(&self, v: &VarRef) -> TempIdx {
        let id = v.sym.expect("unresolved variable");
        self.var_temp[id.0 as usize].expect("variable has no temp")
    }

    fn emit_global(&mut self, vd: &VarDecl) {
        let value = match &vd.init {
            Some(init) => const_int(init).expect("checked constant initializer"),
            None => 0,
        };
        self.b.add_global(&vd.name, value);
    }

    fn emit_func(&mut self, fd: &FuncDefn) {
        let Some(body) = &fd.body else {
            return; // forward declaration, nothing to emit
        };
        let fid = fd.sym.expect("unresolved function");
        let entry = self.func_label[fid.0 as usize];
        debug!("lowering function `{}`", fd.name);

        let params: Vec<TempIdx> = fd
            .params
            .iter()
            .map(|p| {
                let t = self.b.new_temp_for(&p.name);
                self.var_temp[p.sym.expect("unresolved parameter").0 as usize] = Some(t);
                t
            })
            .collect();
        self.b.start_func(entry, &params);
        for stmt in body {
            self.emit_stmt(stmt);
        }
        if !self.b.body_ends_with_return() {
            // control can fall off the end: return 0
            let t = self.b.new_temp();
            self.b.gen_load_imm4(t, 0);
            self.b.gen_return(t);
        }
        self.b.end_func();
    }

    // -- statements --

    fn emit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Decl(vd) => self.emit_decl(vd),
            Stmt::Expr(e) => {
                self.emit_expr(e);
            }
            Stmt::Empty => {}
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.emit_stmt(s);
                }
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let c = self.emit_expr(cond);
                let l_else = self.b.new_label();
                let l_end = self.b.new_label();
                self.b.gen_jzero(c, l_else);
                self.emit_stmt(then_branch);
                self.b.gen_jump(l_end);
                self.b.gen_mark(l_else);
                self.emit_stmt(else_branch);
                self.b.gen_mark(l_end);
            }
            Stmt::While { cond, body } => {
                let l_cond = self.b.new_label();
                let l_break = self.b.new_label();
                self.b.gen_mark(l_cond);
                let c = self.emit_expr(cond);
                self.b.gen_jzero(c, l_break);
                self.loops.push((l_break, l_cond));
                self.emit_stmt(body);
                self.loops.pop();
                self.b.gen_jump(l_cond);
                self.b.gen_mark(l_break);
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                match init {
                    ForInit::Decl(vd) => self.emit_decl(vd),
                    ForInit::Expr(e) => {
                        self.emit_expr(e);
                    }
                    ForInit::Empty => {}
                }
                let l_cond = self.b.new_label();
                let l_update = self.b.new_label();
                let l_break = self.b.new_label();
                self.b.gen_mark(l_cond);
                if let Some(c) = cond {
                    let c = self.emit_expr(c);
                    self.b.gen_jzero(c, l_break);
                }
                // continue runs the update first
                self.loops.push((l_break, l_update));
                self.emit_stmt(body);
                self.loops.pop();
                self.b.gen_mark(l_update);
                if let Some(u) = update {
                    self.emit_expr(u);
                }
                self.b.gen_jump(l_cond);
                self.b.gen_mark(l_break);
            }
            Stmt::Break(_) => {
                let (l_break, _) = *self.loops.last().expect("break outside loop");
                self.b.gen_jump(l_break);
            }
            Stmt::Continue(_) => {
                let (_, l_continue) = *self.loops.last().expect("continue outside loop");
                self.b.gen_jump(l_continue);
            }
            Stmt::Return { value, .. } => {
                let v = self.emit_expr(value);
                self.b.gen_return(v);
            }
        }
    }

    fn emit_decl(&mut self, vd: &VarDecl) {
        let t = self.b.new_temp_for(&vd.name);
        self.var_temp[vd.sym.expect("unresolved declaration").0 as usize] = Some(t);
        if let Some(init) = &vd.init {
            let v = self.emit_expr(init);
            self.b.gen_assign(t, v);
        }
    }

    // -- expressions --

    fn emit_expr(&mut self, e: &Expr) -> TempIdx {
        match e {
            Expr::IntConst { value, .. } => {
                let t = self.b.new_temp();
                self.b.gen_load_imm4(t, *value)
            }
            Expr::Var(v) => self.emit_var_read(v),
            Expr::Unary { op, operand, .. } => {
                let s = self.emit_expr(operand);
                let t = self.b.new_temp();
                match op {
                    UnOp::Neg => self.b.gen_neg(t, s),
                    UnOp::BNot => self.b.gen_bnot(t, s),
                    UnOp::LNot => self.b.gen_lnot(t, s),
                }
            }
            Expr::Binary { op, lhs, rhs, .. } => match op {
                BinOp::And => self.emit_and(lhs, rhs),
                BinOp::Or => self.emit_or(lhs, rhs),
                _ => {
                    let a = self.emit_expr(lhs);
                    let b = self.emit_expr(rhs);
                    let t = self.b.new_temp();
                    match op {
                        BinOp::Add => self.b.gen_add(t, a, b),
                        BinOp::Sub => self.b.gen_sub(t, a, b),
                        BinOp::Mul => self.b.gen_mul(t, a, b),
                        BinOp::Div => self.b.gen_div(t, a, b),
                        BinOp::Mod => self.b.gen_mod(t, a, b),
                        BinOp::Xor => self.b.gen_xor(t, a, b),
                        BinOp::Equ => self.b.gen_equ(t, a, b),
                        BinOp::Neq => self.b.gen_neq(t, a, b),
                        BinOp::Les => self.b.gen_les(t, a, b),
                        BinOp::Leq => self.b.gen_leq(t, a, b),
                        BinOp::Gtr => self.b.gen_gtr(t, a, b),
                        BinOp::Geq => self.b.gen_geq(t, a, b),
                        BinOp::And | BinOp::Or => unreachable!(),
                    }
                }
            },
            Expr::Assign { lhs, rhs, .. } => {
                let v = self.emit_expr(rhs);
                let id = lhs.sym.expect("unresolved variable");
                if self.syms.var(id).is_global {
                    let name = self.syms.var(id).name.clone();
                    let addr = self.b.new_temp();
                    self.b.gen_load_symbol(addr, &name);
                    self.b.gen_store(v, addr, 0);
                    v
                } else {
                    let dst = self.var_of(lhs);
                    self.b.gen_assign(dst, v);
                    dst
                }
            }
            Expr::Cond {
                cond,
                then_expr,
                else_expr,
                ..
            } => {
                let dst = self.b.new_temp();
                let c = self.emit_expr(cond);
                let l_else = self.b.new_label();
                let l_end = self.b.new_label();
                self.b.gen_jzero(c, l_else);
                let a = self.emit_expr(then_expr);
                self.b.gen_assign(dst, a);
                self.b.gen_jump(l_end);
                self.b.gen_mark(l_else);
                let b = self.emit_expr(else_expr);
                self.b.gen_assign(dst, b);
                self.b.gen_mark(l_end);
                dst
            }
            Expr::Call { args, sym, .. } => {
                let arg_temps: Vec<TempIdx> =
                    args.iter().map(|a| self.emit_expr(a)).collect();
                // the Param run must immediately precede the Call
                for &a in &arg_temps {
                    self.b.gen_param(a);
                }
                let entry = self.func_label[sym.expect("unresolved call").0 as usize];
                let dst = self.b.new_temp();
                self.b.gen_call(dst, entry)
            }
        }
    }

    fn emit_var_read(&mut self, v: &VarRef) -> TempIdx {
        let id = v.sym.expect("unresolved variable");
        if self.syms.var(id).is_global {
            let name = self.syms.var(id).name.clone();
            let addr = self.b.new_temp();
            self.b.gen_load_symbol(addr, &name);
            let val = self.b.new_temp();
            self.b.gen_load(val, addr, 0)
        } else {
            self.var_of(v)
        }
    }

    /// `a && b`, short-circuit: if `a` is 0 the result is 0 and `b`
    /// never runs; otherwise the result is `b` normalized to 0/1.
    fn emit_and(&mut self, lhs: &Expr, rhs: &Expr) -> TempIdx {
        let dst = self.b.new_temp();
        let a = self.emit_expr(lhs);
        self.b.gen_assign(dst, a);
        let l_false = self.b.new_label();
        let l_end = self.b.new_label();
        self.b.gen_jzero(dst, l_false);
        let b = self.emit_expr(rhs);
        let n = self.b.new_temp();
        self.b.gen_lnot(n, b);
        self.b.gen_lnot(dst, n);
        self.b.gen_jump(l_end);
        self.b.gen_mark(l_false);
        self.b.gen_load_imm4(dst, 0);
        self.b.gen_mark(l_end);
        dst
    }

    /// `a || b`, short-circuit, symmetric with reversed polarity.
    fn emit_or(&mut self, lhs: &Expr, rhs: &Expr) -> TempIdx {
        let dst = self.b.new_temp();
        let a = self.emit_expr(lhs);
        self.b.gen_assign(dst, a);
        let l_rhs = self.b.new_label();
        let l_end = self.b.new_label();
        self.b.gen_jzero(dst, l_rhs);
        self.b.gen_load_imm4(dst, 1);
        self.b.gen_jump(l_end);
        self.b.gen_mark(l_rhs);
        let b = self.emit_expr(rhs);
        let n = self.b.new_temp();
        self.b.gen_lnot(n, b);
        self.b.gen_lnot(dst, n);
        self.b.gen_mark(l_end);
        dst
    }
}
