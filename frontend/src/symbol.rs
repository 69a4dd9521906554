//! Symbols and scopes.
//!
//! Symbols live in an index-based table; AST nodes refer to them with
//! the `VarId`/`FuncId` handles filled in by semantic analysis. The
//! scope stack only exists during resolution.

use std::collections::HashMap;

use crate::error::Pos;

/// Handle of a variable symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub u32);

/// Handle of a function symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(pub u32);

#[derive(Debug)]
pub struct VarSymbol {
    pub name: String,
    pub is_global: bool,
    pub pos: Pos,
}

#[derive(Debug)]
pub struct FuncSymbol {
    pub name: String,
    pub arity: usize,
    /// Whether a full definition (with a body) has been seen.
    pub defined: bool,
    pub pos: Pos,
    /// First call site, if any. Drives the called-but-never-defined
    /// check.
    pub used_at: Option<Pos>,
}

/// All symbols of one compilation.
#[derive(Debug, Default)]
pub struct SymbolTable {
    vars: Vec<VarSymbol>,
    funcs: Vec<FuncSymbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_var(&mut self, name: &str, is_global: bool, pos: Pos) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(VarSymbol {
            name: name.to_string(),
            is_global,
            pos,
        });
        id
    }

    pub fn add_func(&mut self, name: &str, arity: usize, defined: bool, pos: Pos) -> FuncId {
        let id = FuncId(self.funcs.len() as u32);
        self.funcs.push(FuncSymbol {
            name: name.to_string(),
            arity,
            defined,
            pos,
            used_at: None,
        });
        id
    }

    pub fn var(&self, id: VarId) -> &VarSymbol {
        &self.vars[id.0 as usize]
    }

    pub fn func(&self, id: FuncId) -> &FuncSymbol {
        &self.funcs[id.0 as usize]
    }

    pub fn func_mut(&mut self, id: FuncId) -> &mut FuncSymbol {
        &mut self.funcs[id.0 as usize]
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn num_funcs(&self) -> usize {
        self.funcs.len()
    }

    pub fn funcs(&self) -> impl Iterator<Item = (FuncId, &FuncSymbol)> {
        self.funcs
            .iter()
            .enumerate()
            .map(|(i, f)| (FuncId(i as u32), f))
    }
}

/// What a name resolves to.
#[derive(Debug, Clone, Copy)]
pub enum NameDef {
    Var(VarId),
    Func(FuncId),
}

/// The resolution-time scope stack. The global scope sits at the
/// bottom; each function body and each nested block pushes a scope.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<HashMap<String, NameDef>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn close(&mut self) {
        self.scopes.pop().expect("scope stack underflow");
    }

    /// Declare a name in the innermost scope. Returns the previous
    /// definition if the name is already declared there.
    pub fn declare(&mut self, name: &str, def: NameDef) -> Option<NameDef> {
        let top = self.scopes.last_mut().expect("no open scope");
        top.insert(name.to_string(), def)
    }

    /// Look a name up, innermost scope first.
    pub fn lookup(&self, name: &str) -> Option<NameDef> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    /// Look a name up in the innermost scope only.
    pub fn lookup_local(&self, name: &str) -> Option<NameDef> {
        self.scopes
            .last()
            .and_then(|scope| scope.get(name).copied())
    }
}
