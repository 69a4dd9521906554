//! Semantic analysis.
//!
//! Two passes over the AST:
//!
//! 1. **Resolution** builds the symbol table and scope structure and
//!    decorates every `VarRef`/`CallExpr` with its symbol handle.
//!    Every top-level function and global is declared before any
//!    function body is entered, so bodies may freely refer to
//!    functions and globals defined further down the file (mutual
//!    recursion included).
//! 2. **Checking** validates what resolution alone cannot: call
//!    arities, constant global initializers, `break`/`continue`
//!    placement, the presence of `main`, and that every called
//!    function has a definition.
//!
//! Everything downstream assumes these checks passed; the translator
//! and code generator treat violations as bugs and panic.

use log::debug;

use crate::ast::*;
use crate::error::CompileError;
use crate::symbol::{NameDef, ScopeStack, SymbolTable};

/// Evaluate a constant integer expression, if it is one. Only literal
/// constants and arithmetic negation qualify.
pub fn const_int(e: &Expr) -> Option<i32> {
    match e {
        Expr::IntConst { value, .. } => Some(*value),
        Expr::Unary {
            op: UnOp::Neg,
            operand,
            ..
        } => const_int(operand).map(i32::wrapping_neg),
        _ => None,
    }
}

/// Run both passes. On success the AST is fully decorated and the
/// returned table owns every symbol.
pub fn analyze(prog: &mut Program) -> Result<SymbolTable, CompileError> {
    let mut syms = SymbolTable::new();
    resolve(prog, &mut syms)?;
    check(prog, &syms)?;
    debug!(
        "semantic analysis done: {} variables, {} functions",
        syms.num_vars(),
        syms.num_funcs()
    );
    Ok(syms)
}

// -- Pass 1: resolution --

struct Resolver<'a> {
    syms: &'a mut SymbolTable,
    scopes: ScopeStack,
}

fn resolve(prog: &mut Program, syms: &mut SymbolTable) -> Result<(), CompileError> {
    let mut r = Resolver {
        syms,
        scopes: ScopeStack::new(),
    };
    r.scopes.open(); // global scope
    // declare every top-level name first; bodies come after, against
    // the complete table, so definition order never matters
    for decl in &mut prog.decls {
        match decl {
            Decl::Global(vd) => r.declare_global(vd)?,
            Decl::Func(fd) => r.declare_func(fd)?,
        }
    }
    for decl in &mut prog.decls {
        match decl {
            Decl::Global(vd) => {
                if let Some(init) = &mut vd.init {
                    r.resolve_expr(init)?;
                }
            }
            Decl::Func(fd) => r.resolve_body(fd)?,
        }
    }
    r.scopes.close();
    Ok(())
}

impl Resolver<'_> {
    fn declare_global(&mut self, vd: &mut VarDecl) -> Result<(), CompileError> {
        if self.scopes.lookup_local(&vd.name).is_some() {
            return Err(CompileError::Redeclared {
                pos: vd.pos,
                name: vd.name.clone(),
            });
        }
        let id = self.syms.add_var(&vd.name, true, vd.pos);
        self.scopes.declare(&vd.name, NameDef::Var(id));
        vd.sym = Some(id);
        Ok(())
    }

    fn declare_func(&mut self, fd: &mut FuncDefn) -> Result<(), CompileError> {
        let id = match self.scopes.lookup_local(&fd.name) {
            Some(NameDef::Func(id)) => {
                let existing = self.syms.func(id);
                if existing.arity != fd.params.len() {
                    return Err(CompileError::ConflictingDecl {
                        pos: fd.pos,
                        name: fd.name.clone(),
                    });
                }
                if existing.defined && fd.body.is_some() {
                    return Err(CompileError::Redefined {
                        pos: fd.pos,
                        name: fd.name.clone(),
                    });
                }
                if fd.body.is_some() {
                    self.syms.func_mut(id).defined = true;
                }
                id
            }
            Some(NameDef::Var(_)) => {
                return Err(CompileError::ConflictingDecl {
                    pos: fd.pos,
                    name: fd.name.clone(),
                });
            }
            None => {
                let id =
                    self.syms
                        .add_func(&fd.name, fd.params.len(), fd.body.is_some(), fd.pos);
                self.scopes.declare(&fd.name, NameDef::Func(id));
                id
            }
        };
        fd.sym = Some(id);
        Ok(())
    }

    fn resolve_body(&mut self, fd: &mut FuncDefn) -> Result<(), CompileError> {
        let Some(body) = &mut fd.body else {
            return Ok(()); // forward declaration
        };
        self.scopes.open(); // function scope
        for p in &mut fd.params {
            if self.scopes.lookup_local(&p.name).is_some() {
                return Err(CompileError::Redeclared {
                    pos: p.pos,
                    name: p.name.clone(),
                });
            }
            let vid = self.syms.add_var(&p.name, false, p.pos);
            self.scopes.declare(&p.name, NameDef::Var(vid));
            p.sym = Some(vid);
        }
        for stmt in body {
            self.resolve_stmt(stmt)?;
        }
        self.scopes.close();
        Ok(())
    }

    fn declare_local(&mut self, vd: &mut VarDecl) -> Result<(), CompileError> {
        // the initializer resolves before the name is visible
        if let Some(init) = &mut vd.init {
            self.resolve_expr(init)?;
        }
        if self.scopes.lookup_local(&vd.name).is_some() {
            return Err(CompileError::Redeclared {
                pos: vd.pos,
                name: vd.name.clone(),
            });
        }
        let id = self.syms.add_var(&vd.name, false, vd.pos);
        self.scopes.declare(&vd.name, NameDef::Var(id));
        vd.sym = Some(id);
        Ok(())
    }

    fn resolve_stmt(&mut self, stmt: &mut Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Decl(vd) => self.declare_local(vd),
            Stmt::Expr(e) => self.resolve_expr(e),
            Stmt::Empty => Ok(()),
            Stmt::Block(stmts) => {
                self.scopes.open();
                for s in stmts {
                    self.resolve_stmt(s)?;
                }
                self.scopes.close();
                Ok(())
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(cond)?;
                self.resolve_stmt(then_branch)?;
                self.resolve_stmt(else_branch)
            }
            Stmt::While { cond, body } => {
                self.resolve_expr(cond)?;
                self.resolve_stmt(body)
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                // the init declaration scopes over the whole loop
                self.scopes.open();
                match init {
                    ForInit::Decl(vd) => self.declare_local(vd)?,
                    ForInit::Expr(e) => self.resolve_expr(e)?,
                    ForInit::Empty => {}
                }
                if let Some(c) = cond {
                    self.resolve_expr(c)?;
                }
                if let Some(u) = update {
                    self.resolve_expr(u)?;
                }
                self.resolve_stmt(body)?;
                self.scopes.close();
                Ok(())
            }
            Stmt::Break(_) | Stmt::Continue(_) => Ok(()),
            Stmt::Return { value, .. } => self.resolve_expr(value),
        }
    }

    fn resolve_var(&mut self, v: &mut VarRef) -> Result<(), CompileError> {
        match self.scopes.lookup(&v.name) {
            Some(NameDef::Var(id)) => {
                v.sym = Some(id);
                Ok(())
            }
            Some(NameDef::Func(_)) => Err(CompileError::NotAVariable {
                pos: v.pos,
                name: v.name.clone(),
            }),
            None => Err(CompileError::Undeclared {
                pos: v.pos,
                name: v.name.clone(),
            }),
        }
    }

    fn resolve_expr(&mut self, e: &mut Expr) -> Result<(), CompileError> {
        match e {
            Expr::IntConst { .. } => Ok(()),
            Expr::Var(v) => self.resolve_var(v),
            Expr::Unary { operand, .. } => self.resolve_expr(operand),
            Expr::Binary { lhs, rhs, .. } => {
                self.resolve_expr(lhs)?;
                self.resolve_expr(rhs)
            }
            Expr::Assign { lhs, rhs, .. } => {
                self.resolve_var(lhs)?;
                self.resolve_expr(rhs)
            }
            Expr::Cond {
                cond,
                then_expr,
                else_expr,
                ..
            } => {
                self.resolve_expr(cond)?;
                self.resolve_expr(then_expr)?;
                self.resolve_expr(else_expr)
            }
            Expr::Call {
                name,
                args,
                pos,
                sym,
            } => {
                match self.scopes.lookup(name) {
                    Some(NameDef::Func(id)) => {
                        *sym = Some(id);
                        let f = self.syms.func_mut(id);
                        if f.used_at.is_none() {
                            f.used_at = Some(*pos);
                        }
                    }
                    Some(NameDef::Var(_)) => {
                        return Err(CompileError::NotAFunction {
                            pos: *pos,
                            name: name.clone(),
                        });
                    }
                    None => {
                        return Err(CompileError::Undeclared {
                            pos: *pos,
                            name: name.clone(),
                        });
                    }
                }
                for a in args {
                    self.resolve_expr(a)?;
                }
                Ok(())
            }
        }
    }
}

// -- Pass 2: checking --

struct Checker<'a> {
    syms: &'a SymbolTable,
    loop_depth: u32,
}

fn check(prog: &Program, syms: &SymbolTable) -> Result<(), CompileError> {
    let mut c = Checker {
        syms,
        loop_depth: 0,
    };
    for decl in &prog.decls {
        match decl {
            Decl::Global(vd) => {
                if let Some(init) = &vd.init {
                    if const_int(init).is_none() {
                        return Err(CompileError::NonConstInit { pos: vd.pos });
                    }
                }
            }
            Decl::Func(fd) => {
                if let Some(body) = &fd.body {
                    for stmt in body {
                        c.check_stmt(stmt)?;
                    }
                }
            }
        }
    }

    if !syms.funcs().any(|(_, f)| f.name == "main" && f.defined) {
        return Err(CompileError::NoMain);
    }
    for (_, f) in syms.funcs() {
        if let Some(pos) = f.used_at {
            if !f.defined {
                return Err(CompileError::CalledButUndefined {
                    pos,
                    name: f.name.clone(),
                });
            }
        }
    }
    Ok(())
}

impl Checker<'_> {
    fn check_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Decl(vd) => match &vd.init {
                Some(init) => self.check_expr(init),
                None => Ok(()),
            },
            Stmt::Expr(e) => self.check_expr(e),
            Stmt::Empty => Ok(()),
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.check_stmt(s)?;
                }
                Ok(())
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.check_expr(cond)?;
                self.check_stmt(then_branch)?;
                self.check_stmt(else_branch)
            }
            Stmt::While { cond, body } => {
                self.check_expr(cond)?;
                self.loop_depth += 1;
                self.check_stmt(body)?;
                self.loop_depth -= 1;
                Ok(())
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                match init {
                    ForInit::Decl(vd) => {
                        if let Some(i) = &vd.init {
                            self.check_expr(i)?;
                        }
                    }
                    ForInit::Expr(e) => self.check_expr(e)?,
                    ForInit::Empty => {}
                }
                if let Some(c) = cond {
                    self.check_expr(c)?;
                }
                if let Some(u) = update {
                    self.check_expr(u)?;
                }
                self.loop_depth += 1;
                self.check_stmt(body)?;
                self.loop_depth -= 1;
                Ok(())
            }
            Stmt::Break(pos) => {
                if self.loop_depth == 0 {
                    Err(CompileError::BreakOutsideLoop { pos: *pos })
                } else {
                    Ok(())
                }
            }
            Stmt::Continue(pos) => {
                if self.loop_depth == 0 {
                    Err(CompileError::ContinueOutsideLoop { pos: *pos })
                } else {
                    Ok(())
                }
            }
            Stmt::Return { value, .. } => self.check_expr(value),
        }
    }

    fn check_expr(&mut self, e: &Expr) -> Result<(), CompileError> {
        match e {
            Expr::IntConst { .. } | Expr::Var(_) => Ok(()),
            Expr::Unary { operand, .. } => self.check_expr(operand),
            Expr::Binary { lhs, rhs, .. } => {
                self.check_expr(lhs)?;
                self.check_expr(rhs)
            }
            Expr::Assign { rhs, .. } => self.check_expr(rhs),
            Expr::Cond {
                cond,
                then_expr,
                else_expr,
                ..
            } => {
                self.check_expr(cond)?;
                self.check_expr(then_expr)?;
                self.check_expr(else_expr)
            }
            Expr::Call {
                name,
                args,
                pos,
                sym,
            } => {
                let f = self.syms.func(sym.expect("unresolved call"));
                if f.arity != args.len() {
                    return Err(CompileError::BadArity {
                        pos: *pos,
                        name: name.clone(),
                        expected: f.arity,
                        found: args.len(),
                    });
                }
                for a in args {
                    self.check_expr(a)?;
                }
                Ok(())
            }
        }
    }
}
