use mind_frontend::lex::{tokenize, TokenKind};
use mind_frontend::CompileError;

fn kinds(input: &str) -> Vec<TokenKind> {
    tokenize(input).unwrap().iter().map(|t| t.kind).collect()
}

#[test]
fn lexes_a_minimal_program() {
    use TokenKind::*;
    assert_eq!(
        kinds("int main() { return 42; }"),
        vec![Int, Id, LParen, RParen, LBrace, Return, Num, Semi, RBrace]
    );
}

#[test]
fn keywords_are_not_identifiers() {
    use TokenKind::*;
    assert_eq!(kinds("while whilex"), vec![While, Id]);
    assert_eq!(kinds("breakcontinue"), vec![Id]);
}

#[test]
fn lexes_multi_char_operators_greedily() {
    use TokenKind::*;
    assert_eq!(kinds("= == ! != < <= > >="), vec![
        Assign, EqEq, Bang, NotEq, Less, LessEq, Greater, GreaterEq
    ]);
    assert_eq!(kinds("a&&b||c"), vec![Id, AndAnd, Id, OrOr, Id]);
}

#[test]
fn skips_comments_and_whitespace() {
    use TokenKind::*;
    let src = "int x; // trailing\n/* block\n comment */ int y;";
    assert_eq!(kinds(src), vec![Int, Id, Semi, Int, Id, Semi]);
}

#[test]
fn tracks_line_and_column() {
    let toks = tokenize("int\n  x;").unwrap();
    assert_eq!((toks[0].pos.line, toks[0].pos.col), (1, 1));
    assert_eq!((toks[1].pos.line, toks[1].pos.col), (2, 3));
}

#[test]
fn rejects_unknown_characters() {
    let err = tokenize("int a = 1 & 2;").unwrap_err();
    assert!(matches!(err, CompileError::UnexpectedChar { ch: '&', .. }));
}
