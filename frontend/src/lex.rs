//! The lexer.
//!
//! A regex-table scanner: whitespace and comments are skipped by one
//! pattern, then each matcher is tried in order at the current position.
//! Identifier matches are re-classified as keywords afterwards.

use regex::Regex;

use crate::error::{CompileError, Pos};

/// Token classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Id,
    Num,
    // keywords
    Int,
    Return,
    If,
    Else,
    While,
    For,
    Break,
    Continue,
    // punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    Semi,
    Comma,
    // operators
    AndAnd,
    OrOr,
    EqEq,
    NotEq,
    LessEq,
    GreaterEq,
    Less,
    Greater,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Bang,
    Tilde,
    Question,
    Colon,
}

/// One token with its source text and position.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub pos: Pos,
}

fn keyword(text: &str) -> Option<TokenKind> {
    use TokenKind::*;
    match text {
        "int" => Some(Int),
        "return" => Some(Return),
        "if" => Some(If),
        "else" => Some(Else),
        "while" => Some(While),
        "for" => Some(For),
        "break" => Some(Break),
        "continue" => Some(Continue),
        _ => None,
    }
}

pub struct Lexer<'input> {
    input: &'input str,
    pos: usize,
    line: u32,
    col: u32,
    skip: Regex,
    matchers: Vec<(Regex, TokenKind)>,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        use TokenKind::*;
        let table: &[(&str, TokenKind)] = &[
            (r"\A[A-Za-z_][A-Za-z0-9_]*", Id),
            (r"\A[0-9]+", Num),
            // two-character operators must come before their prefixes
            (r"\A&&", AndAnd),
            (r"\A\|\|", OrOr),
            (r"\A==", EqEq),
            (r"\A!=", NotEq),
            (r"\A<=", LessEq),
            (r"\A>=", GreaterEq),
            (r"\A<", Less),
            (r"\A>", Greater),
            (r"\A=", Assign),
            (r"\A\+", Plus),
            (r"\A-", Minus),
            (r"\A\*", Star),
            (r"\A/", Slash),
            (r"\A%", Percent),
            (r"\A\^", Caret),
            (r"\A!", Bang),
            (r"\A~", Tilde),
            (r"\A\?", Question),
            (r"\A:", Colon),
            (r"\A\(", LParen),
            (r"\A\)", RParen),
            (r"\A\{", LBrace),
            (r"\A\}", RBrace),
            (r"\A;", Semi),
            (r"\A,", Comma),
        ];
        Lexer {
            input,
            pos: 0,
            line: 1,
            col: 1,
            skip: Regex::new(r"\A(?:[ \t\r\n]|//[^\n]*|(?s:/\*.*?\*/))*").unwrap(),
            matchers: table
                .iter()
                .map(|(re, kind)| (Regex::new(re).unwrap(), *kind))
                .collect(),
        }
    }

    /// Advance past `len` bytes, keeping line/column in sync.
    fn advance(&mut self, len: usize) {
        for ch in self.input[self.pos..self.pos + len].chars() {
            if ch == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        self.pos += len;
    }

    fn skip_trivia(&mut self) {
        if let Some(m) = self.skip.find(&self.input[self.pos..]) {
            self.advance(m.end());
        }
    }

    fn here(&self) -> Pos {
        Pos::new(self.line, self.col)
    }

    /// Next token, `Ok(None)` at end of input.
    pub fn next(&mut self) -> Result<Option<Token>, CompileError> {
        self.skip_trivia();
        if self.pos == self.input.len() {
            return Ok(None);
        }
        let rest: &'input str = &self.input[self.pos..];
        let pos = self.here();
        let mut matched = None;
        for (re, kind) in &self.matchers {
            if let Some(m) = re.find(rest) {
                matched = Some((m.end(), *kind));
                break;
            }
        }
        match matched {
            Some((len, kind)) => {
                let text = rest[..len].to_string();
                let kind = match kind {
                    TokenKind::Id => keyword(&text).unwrap_or(TokenKind::Id),
                    k => k,
                };
                self.advance(len);
                Ok(Some(Token { kind, text, pos }))
            }
            None => Err(CompileError::UnexpectedChar {
                pos,
                ch: rest.chars().next().unwrap(),
            }),
        }
    }

    /// Position just past the last consumed token.
    pub fn end_pos(&self) -> Pos {
        self.here()
    }
}

/// Lex the whole input.
pub fn tokenize(input: &str) -> Result<Vec<Token>, CompileError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    while let Some(tok) = lexer.next()? {
        tokens.push(tok);
    }
    Ok(tokens)
}
