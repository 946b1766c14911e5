use std::fmt;
use std::sync::Arc;

/// Stable per-module node identity, assigned by the parser. Alias capture
/// and breakpoints compare nodes by id rather than by address.
pub type NodeId = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub filename: Arc<str>,
    pub offset: usize,
    /// 1-based.
    pub line: usize,
    /// 1-based.
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.filename, self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// The option namespaces: one per operation that accepts a `with` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionNs {
    Image,
    Http,
    Git,
    Local,
    Generate,
    Run,
    Ssh,
    Secret,
    Mount,
    Mkdir,
    Mkfile,
    Rm,
    Copy,
}

impl OptionNs {
    pub const ALL: [OptionNs; 13] = [
        OptionNs::Image,
        OptionNs::Http,
        OptionNs::Git,
        OptionNs::Local,
        OptionNs::Generate,
        OptionNs::Run,
        OptionNs::Ssh,
        OptionNs::Secret,
        OptionNs::Mount,
        OptionNs::Mkdir,
        OptionNs::Mkfile,
        OptionNs::Rm,
        OptionNs::Copy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OptionNs::Image => "image",
            OptionNs::Http => "http",
            OptionNs::Git => "git",
            OptionNs::Local => "local",
            OptionNs::Generate => "generate",
            OptionNs::Run => "run",
            OptionNs::Ssh => "ssh",
            OptionNs::Secret => "secret",
            OptionNs::Mount => "mount",
            OptionNs::Mkdir => "mkdir",
            OptionNs::Mkfile => "mkfile",
            OptionNs::Rm => "rm",
            OptionNs::Copy => "copy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        OptionNs::ALL.iter().copied().find(|ns| ns.as_str() == s)
    }
}

/// The object type of an expression, block, or parameter. `Option(None)` is
/// the unqualified `option` type; `Option(Some(ns))` is `option::<ns>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjType {
    Str,
    Int,
    Bool,
    Fs,
    Option(Option<OptionNs>),
}

impl ObjType {
    /// Structural equality: an unqualified `option` matches any qualified
    /// option type, in either direction. All other kinds compare exactly.
    pub fn equals(self, other: ObjType) -> bool {
        match (self, other) {
            (ObjType::Option(_), ObjType::Option(_)) => true,
            (a, b) => a == b,
        }
    }

    pub fn subtype(self) -> Option<OptionNs> {
        match self {
            ObjType::Option(ns) => ns,
            _ => None,
        }
    }

    pub fn is_option(self) -> bool {
        matches!(self, ObjType::Option(_))
    }
}

impl fmt::Display for ObjType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjType::Str => write!(f, "string"),
            ObjType::Int => write!(f, "int"),
            ObjType::Bool => write!(f, "bool"),
            ObjType::Fs => write!(f, "fs"),
            ObjType::Option(None) => write!(f, "option"),
            ObjType::Option(Some(ns)) => write!(f, "option::{}", ns.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub filename: Arc<str>,
    pub decls: Vec<Decl>,
    pub span: Span,
}

impl Module {
    /// Top-level function declarations in source order.
    pub fn funcs(&self) -> impl Iterator<Item = &FuncDecl> {
        self.decls.iter().filter_map(|d| match d {
            Decl::Func(f) => Some(f),
            _ => None,
        })
    }

    pub fn func_named(&self, name: &str) -> Option<&FuncDecl> {
        self.funcs().find(|f| f.name.text == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    Import(ImportDecl),
    Export(ExportDecl),
    Func(FuncDecl),
    Comment(CommentGroup),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    pub name: Ident,
    /// `import foo from <expr>`.
    pub from: Option<Expr>,
    /// Deprecated `import foo "path"` form; surfaced by the linter.
    pub deprecated_path: Option<BasicLit>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDecl {
    pub name: Ident,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub id: NodeId,
    pub typ: Type,
    pub name: Ident,
    pub params: Vec<Field>,
    pub body: Option<BlockStmt>,
    pub doc: Option<CommentGroup>,
    pub span: Span,
}

impl FuncDecl {
    pub fn num_params(&self) -> usize {
        self.params.len()
    }
}

/// An alias declaration synthesized from `as <ident>` on a call statement.
/// It owns no body; evaluating it evaluates the host function and captures
/// the value produced at the aliased call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasDecl {
    pub ident: Ident,
    /// Index of the host function in `Module::funcs()` order.
    pub func: usize,
    /// Id of the call statement carrying the `as` clause.
    pub call: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    pub obj: ObjType,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub variadic: bool,
    pub typ: Type,
    pub name: Ident,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockStmt {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl BlockStmt {
    /// Call statements only, skipping interleaved comment groups.
    pub fn calls(&self) -> impl Iterator<Item = &CallStmt> {
        self.stmts.iter().filter_map(|s| match s {
            Stmt::Call(c) => Some(c),
            Stmt::Comment(_) => None,
        })
    }

    pub fn num_calls(&self) -> usize {
        self.calls().count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Call(CallStmt),
    Comment(CommentGroup),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallStmt {
    pub id: NodeId,
    pub name: Ident,
    pub args: Vec<Expr>,
    pub with_opt: Option<Expr>,
    pub alias: Option<Ident>,
    pub doc: Option<CommentGroup>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Ident(Ident),
    Lit(BasicLit),
    FuncLit(Box<FuncLit>),
}

impl Expr {
    pub fn as_ident(&self) -> Option<&Ident> {
        match &self.kind {
            ExprKind::Ident(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_lit(&self) -> Option<&BasicLit> {
        match &self.kind {
            ExprKind::Lit(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_func_lit(&self) -> Option<&FuncLit> {
        match &self.kind {
            ExprKind::FuncLit(fl) => Some(fl),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicLit {
    pub kind: LitKind,
    pub span: Span,
}

impl BasicLit {
    /// The object type a literal of this kind satisfies.
    pub fn obj_type(&self) -> ObjType {
        match self.kind {
            LitKind::Str(_) => ObjType::Str,
            LitKind::Int(_) => ObjType::Int,
            LitKind::Bool(_) => ObjType::Bool,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LitKind {
    Str(String),
    Int(IntLit),
    Bool(bool),
}

/// Integer literal keeping the written base so the linter can flag
/// non-octal file modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntLit {
    pub value: i64,
    /// 2, 8, 10, or 16.
    pub base: u32,
    /// The raw lexeme, prefix included.
    pub digits: String,
}

impl IntLit {
    pub fn base_name(&self) -> &'static str {
        match self.base {
            2 => "binary",
            8 => "octal",
            16 => "hexadecimal",
            _ => "decimal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncLit {
    pub typ: Type,
    pub body: BlockStmt,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentGroup {
    pub comments: Vec<Comment>,
    pub span: Span,
}

impl CommentGroup {
    /// Line number of the last comment in the group.
    pub fn end_line(&self) -> usize {
        self.span.end.line
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Text after the `#`, without the trailing newline.
    pub text: String,
    pub span: Span,
}
