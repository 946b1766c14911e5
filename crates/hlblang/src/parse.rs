use std::sync::Arc;

use crate::ast::*;
use crate::diag::Diagnostic;
use crate::lex::{lex_all, Tok, Token};
use crate::source::IndexedBuffer;

/// Parse a whole buffer into a module. The returned [`IndexedBuffer`] holds
/// the verbatim bytes (with a synthetic trailing newline) for diagnostics.
pub fn parse_module(bytes: &[u8], filename: &str) -> Result<(Module, IndexedBuffer), Diagnostic> {
    let ib = IndexedBuffer::from_bytes(bytes.to_vec());
    let fname: Arc<str> = Arc::from(filename);
    let toks = lex_all(ib.bytes(), fname.clone())?;
    let module = Parser::new(toks, fname).parse()?;
    Ok((module, ib))
}

struct Parser {
    toks: Vec<Token>,
    i: usize,
    filename: Arc<str>,
    next_id: NodeId,
}

impl Parser {
    fn new(toks: Vec<Token>, filename: Arc<str>) -> Self {
        Self {
            toks,
            i: 0,
            filename,
            next_id: 0,
        }
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn peek(&self) -> &Token {
        &self.toks[self.i.min(self.toks.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let t = self.peek().clone();
        if self.i < self.toks.len() - 1 {
            self.i += 1;
        }
        t
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek().tok, Tok::Newline | Tok::Semi) {
            self.bump();
        }
    }

    fn unexpected(&self, expected: &[&str]) -> Diagnostic {
        let t = self.peek();
        Diagnostic::parse_error(
            t.span.clone(),
            format!("unexpected {}", t.tok.describe()),
            expected.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn expect(&mut self, want: Tok, expected: &str) -> Result<Token, Diagnostic> {
        if self.peek().tok == want {
            Ok(self.bump())
        } else {
            Err(self.unexpected(&[expected]))
        }
    }

    fn expect_ident(&mut self) -> Result<Ident, Diagnostic> {
        match &self.peek().tok {
            Tok::Ident(_) => {
                let t = self.bump();
                let Tok::Ident(text) = t.tok else { unreachable!() };
                Ok(Ident { text, span: t.span })
            }
            _ => Err(self.unexpected(&["identifier"])),
        }
    }

    fn parse(mut self) -> Result<Module, Diagnostic> {
        let start = self.peek().span.start.clone();
        let mut decls = Vec::new();

        loop {
            self.skip_newlines();
            match &self.peek().tok {
                Tok::Eof => break,
                Tok::Comment(_) => decls.push(Decl::Comment(self.parse_comment_group())),
                Tok::KwImport => decls.push(Decl::Import(self.parse_import()?)),
                Tok::KwExport => decls.push(Decl::Export(self.parse_export()?)),
                Tok::KwString | Tok::KwInt | Tok::KwBool | Tok::KwFs | Tok::KwOption => {
                    decls.push(Decl::Func(self.parse_func_decl()?))
                }
                _ => {
                    return Err(self.unexpected(&[
                        "import",
                        "export",
                        "string",
                        "int",
                        "bool",
                        "fs",
                        "option",
                    ]))
                }
            }
        }

        let end = self.peek().span.end.clone();
        Ok(Module {
            filename: self.filename.clone(),
            decls,
            span: Span { start, end },
        })
    }

    /// Consecutive comment lines with no blank line between them.
    fn parse_comment_group(&mut self) -> CommentGroup {
        let mut comments = Vec::new();
        let start = self.peek().span.start.clone();
        let mut end = self.peek().span.end.clone();

        while let Tok::Comment(_) = &self.peek().tok {
            let t = self.bump();
            let Tok::Comment(text) = t.tok else { unreachable!() };
            end = t.span.end.clone();
            comments.push(Comment { text, span: t.span });

            // a comment is followed by its newline; a second newline is a
            // blank line and ends the group
            if self.peek().tok == Tok::Newline {
                self.bump();
            }
            if !matches!(self.peek().tok, Tok::Comment(_)) {
                break;
            }
        }

        CommentGroup {
            comments,
            span: Span { start, end },
        }
    }

    fn parse_import(&mut self) -> Result<ImportDecl, Diagnostic> {
        let kw = self.expect(Tok::KwImport, "import")?;
        let name = self.expect_ident()?;
        match &self.peek().tok {
            Tok::KwFrom => {
                self.bump();
                let expr = self.parse_expr()?;
                let end = expr.span.end.clone();
                Ok(ImportDecl {
                    name,
                    from: Some(expr),
                    deprecated_path: None,
                    span: Span {
                        start: kw.span.start,
                        end,
                    },
                })
            }
            Tok::Str(_) => {
                let t = self.bump();
                let Tok::Str(s) = t.tok else { unreachable!() };
                let lit = BasicLit {
                    kind: LitKind::Str(s),
                    span: t.span.clone(),
                };
                Ok(ImportDecl {
                    name,
                    from: None,
                    deprecated_path: Some(lit),
                    span: Span {
                        start: kw.span.start,
                        end: t.span.end,
                    },
                })
            }
            _ => Err(self.unexpected(&["from", "string literal"])),
        }
    }

    fn parse_export(&mut self) -> Result<ExportDecl, Diagnostic> {
        let kw = self.expect(Tok::KwExport, "export")?;
        let name = self.expect_ident()?;
        let end = name.span.end.clone();
        Ok(ExportDecl {
            name,
            span: Span {
                start: kw.span.start,
                end,
            },
        })
    }

    fn parse_type(&mut self) -> Result<Type, Diagnostic> {
        let t = self.bump();
        let start = t.span.start.clone();
        let mut end = t.span.end.clone();
        let obj = match t.tok {
            Tok::KwString => ObjType::Str,
            Tok::KwInt => ObjType::Int,
            Tok::KwBool => ObjType::Bool,
            Tok::KwFs => ObjType::Fs,
            Tok::KwOption => {
                if self.peek().tok == Tok::ColonColon {
                    self.bump();
                    let sub = self.expect_ident()?;
                    let ns = OptionNs::parse(&sub.text).ok_or_else(|| {
                        Diagnostic::parse_error(
                            sub.span.clone(),
                            format!("unknown option namespace {}", sub.text),
                            OptionNs::ALL.iter().map(|ns| ns.as_str().to_string()).collect(),
                        )
                    })?;
                    end = sub.span.end.clone();
                    ObjType::Option(Some(ns))
                } else {
                    ObjType::Option(None)
                }
            }
            _ => {
                self.i = self.i.saturating_sub(1);
                return Err(self.unexpected(&["string", "int", "bool", "fs", "option"]));
            }
        };
        Ok(Type {
            obj,
            span: Span { start, end },
        })
    }

    fn at_type(&self) -> bool {
        matches!(
            self.peek().tok,
            Tok::KwString | Tok::KwInt | Tok::KwBool | Tok::KwFs | Tok::KwOption
        )
    }

    fn parse_func_decl(&mut self) -> Result<FuncDecl, Diagnostic> {
        let id = self.fresh_id();
        let typ = self.parse_type()?;
        let name = self.expect_ident()?;
        self.expect(Tok::LParen, "(")?;

        let mut params = Vec::new();
        if self.peek().tok != Tok::RParen {
            loop {
                params.push(self.parse_field()?);
                if self.peek().tok == Tok::Comma {
                    self.bump();
                    continue;
                }
                break;
            }
        }
        self.expect(Tok::RParen, ")")?;
        self.skip_newlines();

        let body = self.parse_block()?;
        let span = Span {
            start: typ.span.start.clone(),
            end: body.span.end.clone(),
        };
        Ok(FuncDecl {
            id,
            typ,
            name,
            params,
            body: Some(body),
            doc: None,
            span,
        })
    }

    fn parse_field(&mut self) -> Result<Field, Diagnostic> {
        let variadic = if self.peek().tok == Tok::KwVariadic {
            self.bump();
            true
        } else {
            false
        };
        let typ = self.parse_type()?;
        let name = self.expect_ident()?;
        let span = Span {
            start: typ.span.start.clone(),
            end: name.span.end.clone(),
        };
        Ok(Field {
            variadic,
            typ,
            name,
            span,
        })
    }

    fn parse_block(&mut self) -> Result<BlockStmt, Diagnostic> {
        let open = self.expect(Tok::LBrace, "{")?;
        let mut stmts = Vec::new();
        loop {
            self.skip_newlines();
            match &self.peek().tok {
                Tok::RBrace => break,
                Tok::Eof => return Err(self.unexpected(&["}"])),
                Tok::Comment(_) => stmts.push(Stmt::Comment(self.parse_comment_group())),
                _ => stmts.push(Stmt::Call(self.parse_call_stmt()?)),
            }
        }
        let close = self.bump();
        Ok(BlockStmt {
            stmts,
            span: Span {
                start: open.span.start,
                end: close.span.end,
            },
        })
    }

    fn parse_call_stmt(&mut self) -> Result<CallStmt, Diagnostic> {
        let id = self.fresh_id();
        let name = match &self.peek().tok {
            Tok::Ident(_) => self.expect_ident()?,
            Tok::KwBreakpoint => {
                let t = self.bump();
                Ident {
                    text: "breakpoint".to_string(),
                    span: t.span,
                }
            }
            _ => return Err(self.unexpected(&["identifier"])),
        };

        let mut args = Vec::new();
        while self.at_expr() {
            args.push(self.parse_expr()?);
        }

        let mut with_opt = None;
        if self.peek().tok == Tok::KwWith {
            self.bump();
            with_opt = Some(self.parse_expr()?);
        }

        let mut alias = None;
        if self.peek().tok == Tok::KwAs {
            self.bump();
            alias = Some(self.expect_ident()?);
        }

        match &self.peek().tok {
            Tok::Newline | Tok::Semi | Tok::RBrace | Tok::Eof => {}
            _ => return Err(self.unexpected(&["newline", ";", "}"])),
        }

        let end = alias
            .as_ref()
            .map(|a| a.span.end.clone())
            .or_else(|| with_opt.as_ref().map(|w| w.span.end.clone()))
            .or_else(|| args.last().map(|a| a.span.end.clone()))
            .unwrap_or_else(|| name.span.end.clone());
        let span = Span {
            start: name.span.start.clone(),
            end,
        };
        Ok(CallStmt {
            id,
            name,
            args,
            with_opt,
            alias,
            doc: None,
            span,
        })
    }

    fn at_expr(&self) -> bool {
        match &self.peek().tok {
            Tok::Ident(_) | Tok::Str(_) | Tok::Int(_) | Tok::Bool(_) => true,
            // a type keyword begins a function literal
            Tok::KwString | Tok::KwInt | Tok::KwBool | Tok::KwFs | Tok::KwOption => true,
            _ => false,
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, Diagnostic> {
        match &self.peek().tok {
            Tok::Ident(_) => {
                let id = self.expect_ident()?;
                let span = id.span.clone();
                Ok(Expr {
                    kind: ExprKind::Ident(id),
                    span,
                })
            }
            Tok::Str(_) => {
                let t = self.bump();
                let Tok::Str(s) = t.tok else { unreachable!() };
                Ok(Expr {
                    kind: ExprKind::Lit(BasicLit {
                        kind: LitKind::Str(s),
                        span: t.span.clone(),
                    }),
                    span: t.span,
                })
            }
            Tok::Int(_) => {
                let t = self.bump();
                let Tok::Int(lit) = t.tok else { unreachable!() };
                Ok(Expr {
                    kind: ExprKind::Lit(BasicLit {
                        kind: LitKind::Int(lit),
                        span: t.span.clone(),
                    }),
                    span: t.span,
                })
            }
            Tok::Bool(_) => {
                let t = self.bump();
                let Tok::Bool(b) = t.tok else { unreachable!() };
                Ok(Expr {
                    kind: ExprKind::Lit(BasicLit {
                        kind: LitKind::Bool(b),
                        span: t.span.clone(),
                    }),
                    span: t.span,
                })
            }
            Tok::KwString | Tok::KwInt | Tok::KwBool | Tok::KwFs | Tok::KwOption => {
                let fl = self.parse_func_lit()?;
                let span = fl.span.clone();
                Ok(Expr {
                    kind: ExprKind::FuncLit(Box::new(fl)),
                    span,
                })
            }
            _ => Err(self.unexpected(&["expression"])),
        }
    }

    fn parse_func_lit(&mut self) -> Result<FuncLit, Diagnostic> {
        let typ = self.parse_type()?;
        self.skip_newlines();
        let body = self.parse_block()?;
        let span = Span {
            start: typ.span.start.clone(),
            end: body.span.end.clone(),
        };
        Ok(FuncLit { typ, body, span })
    }
}
