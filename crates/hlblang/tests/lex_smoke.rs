use std::sync::Arc;

use hlblang::lex::{lex_all, Tok};
use pretty_assertions::assert_eq;

fn toks(src: &[u8]) -> Vec<Tok> {
    lex_all(src, Arc::from("test.hlb"))
        .unwrap()
        .into_iter()
        .map(|t| t.tok)
        .collect()
}

#[test]
fn lexes_a_minimal_function() {
    let ts = toks(b"fs default() {\n}");
    assert_eq!(
        ts,
        vec![
            Tok::KwFs,
            Tok::Ident("default".to_string()),
            Tok::LParen,
            Tok::RParen,
            Tok::LBrace,
            Tok::Newline,
            Tok::RBrace,
            Tok::Eof,
        ]
    );
}

#[test]
fn tracks_positions() {
    let tokens = lex_all(b"fs default()", Arc::from("test.hlb")).unwrap();
    assert_eq!(tokens[0].span.start.line, 1);
    assert_eq!(tokens[0].span.start.column, 1);
    assert_eq!(tokens[1].span.start.column, 4);
    assert_eq!(tokens[1].span.end.column, 11);
}

#[test]
fn integer_literals_keep_their_base() {
    let ts = toks(b"777 0o644 0x1f 0b101");
    let ints: Vec<(i64, u32)> = ts
        .iter()
        .filter_map(|t| match t {
            Tok::Int(lit) => Some((lit.value, lit.base)),
            _ => None,
        })
        .collect();
    assert_eq!(ints, vec![(777, 10), (0o644, 8), (0x1f, 16), (0b101, 2)]);
}

#[test]
fn string_escapes() {
    let ts = toks(br#""a\nb\t\"q\"""#);
    assert_eq!(ts[0], Tok::Str("a\nb\t\"q\"".to_string()));
}

#[test]
fn unterminated_string_is_an_error() {
    assert!(lex_all(b"\"abc", Arc::from("test.hlb")).is_err());
}

#[test]
fn keywords_and_bools() {
    let ts = toks(b"with as variadic import from export breakpoint true false");
    assert_eq!(
        ts,
        vec![
            Tok::KwWith,
            Tok::KwAs,
            Tok::KwVariadic,
            Tok::KwImport,
            Tok::KwFrom,
            Tok::KwExport,
            Tok::KwBreakpoint,
            Tok::Bool(true),
            Tok::Bool(false),
            Tok::Eof,
        ]
    );
}

#[test]
fn comments_and_hyphenated_idents() {
    let ts = toks(b"# note\nno-cache");
    assert_eq!(ts[0], Tok::Comment(" note".to_string()));
    assert_eq!(ts[1], Tok::Newline);
    assert_eq!(ts[2], Tok::Ident("no-cache".to_string()));
}
