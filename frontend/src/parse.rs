//! The parser.
//!
//! Hand-written recursive descent over the token stream. Expressions
//! use one function per precedence level:
//!
//! ```text
//! assignment   =              (right)
//! conditional  ?:             (right)
//! logical or   ||
//! logical and  &&
//! xor          ^
//! equality     == !=
//! relational   < <= > >=
//! additive     + -
//! multiplicative * / %
//! unary        - ! ~
//! primary      literal, variable, call, (expr)
//! ```

use crate::ast::*;
use crate::error::{CompileError, Pos};
use crate::lex::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    // -- utilities --

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn kind(&self) -> Option<TokenKind> {
        self.current().map(|t| t.kind)
    }

    fn here(&self) -> Pos {
        match self.current() {
            Some(t) => t.pos,
            None => self.tokens.last().map(|t| t.pos).unwrap_or_default(),
        }
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        self.pos += 1;
        t
    }

    /// Consume the current token if it has the given kind.
    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, CompileError> {
        match self.current() {
            Some(t) if t.kind == kind => Ok(self.advance()),
            Some(t) => Err(CompileError::UnexpectedToken {
                pos: t.pos,
                found: format!("`{}`", t.text),
                expected: what.to_string(),
            }),
            None => Err(CompileError::UnexpectedEof {
                pos: self.here(),
                expected: what.to_string(),
            }),
        }
    }

    fn unexpected(&self, what: &str) -> CompileError {
        match self.current() {
            Some(t) => CompileError::UnexpectedToken {
                pos: t.pos,
                found: format!("`{}`", t.text),
                expected: what.to_string(),
            },
            None => CompileError::UnexpectedEof {
                pos: self.here(),
                expected: what.to_string(),
            },
        }
    }

    // -- declarations --

    pub fn parse_program(&mut self) -> Result<Program, CompileError> {
        let mut decls = Vec::new();
        while self.current().is_some() {
            decls.push(self.parse_top_level()?);
        }
        Ok(Program { decls })
    }

    fn parse_top_level(&mut self) -> Result<Decl, CompileError> {
        self.expect(TokenKind::Int, "`int`")?;
        let name_tok = self.expect(TokenKind::Id, "a name")?;
        if self.kind() == Some(TokenKind::LParen) {
            self.parse_func_rest(name_tok).map(Decl::Func)
        } else {
            self.parse_var_rest(name_tok).map(Decl::Global)
        }
    }

    /// Rest of a variable declaration, after `int name`.
    fn parse_var_rest(&mut self, name_tok: Token) -> Result<VarDecl, CompileError> {
        let init = if self.eat(TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semi, "`;`")?;
        Ok(VarDecl {
            name: name_tok.text,
            init,
            pos: name_tok.pos,
            sym: None,
        })
    }

    /// Rest of a function definition or forward declaration, after
    /// `int name`.
    fn parse_func_rest(&mut self, name_tok: Token) -> Result<FuncDefn, CompileError> {
        self.expect(TokenKind::LParen, "`(`")?;
        let mut params = Vec::new();
        if !self.eat(TokenKind::RParen) {
            loop {
                self.expect(TokenKind::Int, "`int`")?;
                let p = self.expect(TokenKind::Id, "a parameter name")?;
                params.push(VarDecl {
                    name: p.text,
                    init: None,
                    pos: p.pos,
                    sym: None,
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "`)`")?;
        }
        let body = if self.eat(TokenKind::Semi) {
            None
        } else {
            Some(self.parse_block_body()?)
        };
        Ok(FuncDefn {
            name: name_tok.text,
            params,
            body,
            pos: name_tok.pos,
            sym: None,
        })
    }

    // -- statements --

    fn parse_block_body(&mut self) -> Result<Vec<Stmt>, CompileError> {
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut stmts = Vec::new();
        while self.kind() != Some(TokenKind::RBrace) {
            if self.current().is_none() {
                return Err(self.unexpected("`}`"));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, CompileError> {
        match self.kind() {
            Some(TokenKind::Int) => {
                self.advance();
                let name_tok = self.expect(TokenKind::Id, "a name")?;
                Ok(Stmt::Decl(self.parse_var_rest(name_tok)?))
            }
            Some(TokenKind::Semi) => {
                self.advance();
                Ok(Stmt::Empty)
            }
            Some(TokenKind::LBrace) => Ok(Stmt::Block(self.parse_block_body()?)),
            Some(TokenKind::If) => self.parse_if(),
            Some(TokenKind::While) => self.parse_while(),
            Some(TokenKind::For) => self.parse_for(),
            Some(TokenKind::Break) => {
                let t = self.advance();
                self.expect(TokenKind::Semi, "`;`")?;
                Ok(Stmt::Break(t.pos))
            }
            Some(TokenKind::Continue) => {
                let t = self.advance();
                self.expect(TokenKind::Semi, "`;`")?;
                Ok(Stmt::Continue(t.pos))
            }
            Some(TokenKind::Return) => {
                let t = self.advance();
                let value = self.parse_expr()?;
                self.expect(TokenKind::Semi, "`;`")?;
                Ok(Stmt::Return { value, pos: t.pos })
            }
            Some(_) => {
                let e = self.parse_expr()?;
                self.expect(TokenKind::Semi, "`;`")?;
                Ok(Stmt::Expr(e))
            }
            None => Err(self.unexpected("a statement")),
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, CompileError> {
        self.expect(TokenKind::If, "`if`")?;
        self.expect(TokenKind::LParen, "`(`")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "`)`")?;
        let then_branch = Box::new(self.parse_stmt()?);
        let else_branch = if self.eat(TokenKind::Else) {
            Box::new(self.parse_stmt()?)
        } else {
            Box::new(Stmt::Empty)
        };
        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, CompileError> {
        self.expect(TokenKind::While, "`while`")?;
        self.expect(TokenKind::LParen, "`(`")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "`)`")?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::While { cond, body })
    }

    fn parse_for(&mut self) -> Result<Stmt, CompileError> {
        self.expect(TokenKind::For, "`for`")?;
        self.expect(TokenKind::LParen, "`(`")?;
        let init = match self.kind() {
            Some(TokenKind::Int) => {
                self.advance();
                let name_tok = self.expect(TokenKind::Id, "a name")?;
                // the declaration consumes its own `;`
                ForInit::Decl(self.parse_var_rest(name_tok)?)
            }
            Some(TokenKind::Semi) => {
                self.advance();
                ForInit::Empty
            }
            _ => {
                let e = self.parse_expr()?;
                self.expect(TokenKind::Semi, "`;`")?;
                ForInit::Expr(e)
            }
        };
        let cond = if self.kind() == Some(TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::Semi, "`;`")?;
        let update = if self.kind() == Some(TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::RParen, "`)`")?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::For {
            init,
            cond,
            update,
            body,
        })
    }

    // -- expressions --

    pub fn parse_expr(&mut self) -> Result<Expr, CompileError> {
        self.parse_assign()
    }

    fn parse_assign(&mut self) -> Result<Expr, CompileError> {
        let lhs = self.parse_cond()?;
        if self.kind() == Some(TokenKind::Assign) {
            let pos = self.advance().pos;
            let rhs = self.parse_assign()?;
            match lhs {
                Expr::Var(v) => Ok(Expr::Assign {
                    lhs: v,
                    rhs: Box::new(rhs),
                    pos,
                }),
                other => Err(CompileError::BadAssignTarget { pos: other.pos() }),
            }
        } else {
            Ok(lhs)
        }
    }

    fn parse_cond(&mut self) -> Result<Expr, CompileError> {
        let cond = self.parse_binary(0)?;
        if self.kind() == Some(TokenKind::Question) {
            let pos = self.advance().pos;
            let then_expr = self.parse_expr()?;
            self.expect(TokenKind::Colon, "`:`")?;
            let else_expr = self.parse_cond()?;
            Ok(Expr::Cond {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
                pos,
            })
        } else {
            Ok(cond)
        }
    }

    /// Left-associative binary levels, loosest first.
    const LEVELS: &'static [&'static [(TokenKind, BinOp)]] = &[
        &[(TokenKind::OrOr, BinOp::Or)],
        &[(TokenKind::AndAnd, BinOp::And)],
        &[(TokenKind::Caret, BinOp::Xor)],
        &[(TokenKind::EqEq, BinOp::Equ), (TokenKind::NotEq, BinOp::Neq)],
        &[
            (TokenKind::Less, BinOp::Les),
            (TokenKind::LessEq, BinOp::Leq),
            (TokenKind::Greater, BinOp::Gtr),
            (TokenKind::GreaterEq, BinOp::Geq),
        ],
        &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)],
        &[
            (TokenKind::Star, BinOp::Mul),
            (TokenKind::Slash, BinOp::Div),
            (TokenKind::Percent, BinOp::Mod),
        ],
    ];

    fn parse_binary(&mut self, level: usize) -> Result<Expr, CompileError> {
        if level == Self::LEVELS.len() {
            return self.parse_unary();
        }
        let mut lhs = self.parse_binary(level + 1)?;
        'outer: loop {
            for &(kind, op) in Self::LEVELS[level] {
                if self.kind() == Some(kind) {
                    let pos = self.advance().pos;
                    let rhs = self.parse_binary(level + 1)?;
                    lhs = Expr::Binary {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                        pos,
                    };
                    continue 'outer;
                }
            }
            return Ok(lhs);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        let op = match self.kind() {
            Some(TokenKind::Minus) => Some(UnOp::Neg),
            Some(TokenKind::Bang) => Some(UnOp::LNot),
            Some(TokenKind::Tilde) => Some(UnOp::BNot),
            _ => None,
        };
        if let Some(op) = op {
            let pos = self.advance().pos;
            let operand = Box::new(self.parse_unary()?);
            return Ok(Expr::Unary { op, operand, pos });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        match self.kind() {
            Some(TokenKind::Num) => {
                let t = self.advance();
                let value: i64 = t
                    .text
                    .parse()
                    .map_err(|_| CompileError::IntOutOfRange { pos: t.pos })?;
                if value > i32::MAX as i64 {
                    return Err(CompileError::IntOutOfRange { pos: t.pos });
                }
                Ok(Expr::IntConst {
                    value: value as i32,
                    pos: t.pos,
                })
            }
            Some(TokenKind::Id) => {
                let t = self.advance();
                if self.eat(TokenKind::LParen) {
                    let mut args = Vec::new();
                    if !self.eat(TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.eat(TokenKind::Comma) {
                                break;
                            }
                        }
                        self.expect(TokenKind::RParen, "`)`")?;
                    }
                    Ok(Expr::Call {
                        name: t.text,
                        args,
                        pos: t.pos,
                        sym: None,
                    })
                } else {
                    Ok(Expr::Var(VarRef {
                        name: t.text,
                        pos: t.pos,
                        sym: None,
                    }))
                }
            }
            Some(TokenKind::LParen) => {
                self.advance();
                let e = self.parse_expr()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(e)
            }
            _ => Err(self.unexpected("an expression")),
        }
    }
}

/// Parse a whole program from source text.
pub fn parse(input: &str) -> Result<Program, CompileError> {
    let tokens = crate::lex::tokenize(input)?;
    Parser::new(tokens).parse_program()
}
