use std::sync::Arc;

use crate::ast::{IntLit, Position, Span};
use crate::diag::Diagnostic;

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Ident(String),
    Str(String),
    Int(IntLit),
    Bool(bool),

    // Type keywords
    KwString,
    KwInt,
    KwBool,
    KwFs,
    KwOption,

    // Reserved keywords
    KwWith,
    KwAs,
    KwVariadic,
    KwImport,
    KwFrom,
    KwExport,
    KwBreakpoint,

    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semi,
    ColonColon,

    Comment(String),
    Newline,
    Eof,
}

impl Tok {
    /// Short name used in expected-token sets.
    pub fn describe(&self) -> String {
        match self {
            Tok::Ident(s) => format!("identifier {s:?}"),
            Tok::Str(_) => "string literal".to_string(),
            Tok::Int(_) => "integer literal".to_string(),
            Tok::Bool(b) => format!("{b}"),
            Tok::KwString => "string".to_string(),
            Tok::KwInt => "int".to_string(),
            Tok::KwBool => "bool".to_string(),
            Tok::KwFs => "fs".to_string(),
            Tok::KwOption => "option".to_string(),
            Tok::KwWith => "with".to_string(),
            Tok::KwAs => "as".to_string(),
            Tok::KwVariadic => "variadic".to_string(),
            Tok::KwImport => "import".to_string(),
            Tok::KwFrom => "from".to_string(),
            Tok::KwExport => "export".to_string(),
            Tok::KwBreakpoint => "breakpoint".to_string(),
            Tok::LParen => "(".to_string(),
            Tok::RParen => ")".to_string(),
            Tok::LBrace => "{".to_string(),
            Tok::RBrace => "}".to_string(),
            Tok::Comma => ",".to_string(),
            Tok::Semi => ";".to_string(),
            Tok::ColonColon => "::".to_string(),
            Tok::Comment(_) => "comment".to_string(),
            Tok::Newline => "newline".to_string(),
            Tok::Eof => "end of file".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub span: Span,
}

pub struct Lexer<'a> {
    s: &'a [u8],
    i: usize,
    line: usize,
    column: usize,
    filename: Arc<str>,
}

impl<'a> Lexer<'a> {
    pub fn new(bytes: &'a [u8], filename: Arc<str>) -> Self {
        Self {
            s: bytes,
            i: 0,
            line: 1,
            column: 1,
            filename,
        }
    }

    fn pos(&self) -> Position {
        Position {
            filename: self.filename.clone(),
            offset: self.i,
            line: self.line,
            column: self.column,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.s.get(self.i).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.i += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(b)
    }

    fn is_ident_start(b: u8) -> bool {
        matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'_')
    }

    fn is_ident_cont(b: u8) -> bool {
        Self::is_ident_start(b) || matches!(b, b'0'..=b'9' | b'-')
    }

    fn err(&self, start: Position, message: impl Into<String>) -> Diagnostic {
        Diagnostic::parse_error(
            Span {
                start: start.clone(),
                end: self.pos(),
            },
            message.into(),
            vec![],
        )
    }

    fn lex_ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(b) = self.peek() {
            if Self::is_ident_cont(b) {
                self.bump();
                out.push(char::from(b));
            } else {
                break;
            }
        }
        out
    }

    fn lex_string(&mut self, start: Position) -> Result<String, Diagnostic> {
        // assumes opening '"' consumed
        let mut out = String::new();
        while let Some(b) = self.bump() {
            match b {
                b'"' => return Ok(out),
                b'\n' => return Err(self.err(start, "unterminated string literal")),
                b'\\' => {
                    let e = self
                        .bump()
                        .ok_or_else(|| self.err(start.clone(), "bad escape"))?;
                    match e {
                        b'"' => out.push('"'),
                        b'\\' => out.push('\\'),
                        b'n' => out.push('\n'),
                        b'r' => out.push('\r'),
                        b't' => out.push('\t'),
                        b'b' => out.push('\x08'),
                        b'f' => out.push('\x0c'),
                        b'0' => out.push('\0'),
                        _ => return Err(self.err(start, "unsupported escape")),
                    }
                }
                _ => out.push(char::from(b)),
            }
        }
        Err(self.err(start, "unterminated string literal"))
    }

    fn lex_int(&mut self, start: Position) -> Result<IntLit, Diagnostic> {
        let mut raw = String::new();
        let base = if self.peek() == Some(b'0') {
            match self.s.get(self.i + 1) {
                Some(b'b') | Some(b'B') => 2,
                Some(b'o') | Some(b'O') => 8,
                Some(b'x') | Some(b'X') => 16,
                _ => 10,
            }
        } else {
            10
        };
        if base != 10 {
            raw.push(char::from(self.bump().unwrap()));
            raw.push(char::from(self.bump().unwrap()));
        }
        let digits_at = raw.len();
        while let Some(b) = self.peek() {
            let ok = match base {
                2 => matches!(b, b'0' | b'1'),
                8 => matches!(b, b'0'..=b'7'),
                16 => b.is_ascii_hexdigit(),
                _ => b.is_ascii_digit(),
            };
            if !ok {
                break;
            }
            self.bump();
            raw.push(char::from(b));
        }
        if raw.len() == digits_at {
            return Err(self.err(start, "expected digits"));
        }
        let value = i64::from_str_radix(&raw[digits_at..], base)
            .map_err(|_| self.err(start.clone(), format!("integer literal {raw} out of range")))?;
        Ok(IntLit {
            value,
            base,
            digits: raw,
        })
    }

    pub fn next_token(&mut self) -> Result<Token, Diagnostic> {
        // skip horizontal whitespace; newlines are tokens
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r')) {
            self.bump();
        }

        let start = self.pos();
        let tok = match self.peek() {
            None => Tok::Eof,
            Some(b'\n') => {
                self.bump();
                Tok::Newline
            }
            Some(b'#') => {
                self.bump();
                let mut text = String::new();
                while let Some(b) = self.peek() {
                    if b == b'\n' {
                        break;
                    }
                    self.bump();
                    text.push(char::from(b));
                }
                Tok::Comment(text)
            }
            Some(b'(') => {
                self.bump();
                Tok::LParen
            }
            Some(b')') => {
                self.bump();
                Tok::RParen
            }
            Some(b'{') => {
                self.bump();
                Tok::LBrace
            }
            Some(b'}') => {
                self.bump();
                Tok::RBrace
            }
            Some(b',') => {
                self.bump();
                Tok::Comma
            }
            Some(b';') => {
                self.bump();
                Tok::Semi
            }
            Some(b':') => {
                self.bump();
                if self.peek() == Some(b':') {
                    self.bump();
                    Tok::ColonColon
                } else {
                    return Err(self.err(start, "expected ::"));
                }
            }
            Some(b'"') => {
                self.bump();
                Tok::Str(self.lex_string(start.clone())?)
            }
            Some(b'0'..=b'9') => Tok::Int(self.lex_int(start.clone())?),
            Some(b) if Self::is_ident_start(b) => {
                let id = self.lex_ident();
                match id.as_str() {
                    "string" => Tok::KwString,
                    "int" => Tok::KwInt,
                    "bool" => Tok::KwBool,
                    "fs" => Tok::KwFs,
                    "option" => Tok::KwOption,
                    "with" => Tok::KwWith,
                    "as" => Tok::KwAs,
                    "variadic" => Tok::KwVariadic,
                    "import" => Tok::KwImport,
                    "from" => Tok::KwFrom,
                    "export" => Tok::KwExport,
                    "breakpoint" => Tok::KwBreakpoint,
                    "true" => Tok::Bool(true),
                    "false" => Tok::Bool(false),
                    _ => Tok::Ident(id),
                }
            }
            Some(b) => {
                self.bump();
                return Err(self.err(start, format!("unexpected character {:?}", char::from(b))));
            }
        };

        Ok(Token {
            tok,
            span: Span {
                start,
                end: self.pos(),
            },
        })
    }
}

/// Tokenize an entire buffer. Tokens are produced once and consumed once by
/// the parser.
pub fn lex_all(bytes: &[u8], filename: Arc<str>) -> Result<Vec<Token>, Diagnostic> {
    let mut lx = Lexer::new(bytes, filename);
    let mut out = Vec::new();
    loop {
        let t = lx.next_token()?;
        let eof = t.tok == Tok::Eof;
        out.push(t);
        if eof {
            return Ok(out);
        }
    }
}
