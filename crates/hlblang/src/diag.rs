//! Structured, source-pointing diagnostics shared by the CLI and the
//! language server surface. Rendering mirrors rustc's gutter-aligned
//! annotated blocks.

use std::fmt;

use crate::ast::{Position, Span};
use crate::source::SourceMap;

const BLUE: &str = "\x1b[34m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Error taxonomy. Kinds are matched in tests and by the CLI; the carried
/// fields feed the rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagKind {
    ParseError { expected: Vec<String> },
    DuplicateDecl,
    DuplicateField,
    NoSource,
    FirstSource,
    OnlyFirstSource,
    InvalidFunc,
    IdentNotDefined,
    FuncArg,
    NumArgs { expected: usize, found: usize },
    WrongArgType { expected: String, found: String },
    InvalidTarget,
    UndefinedReference,
    NonOctalFileMode,
    Deprecated,
    CodeGen,
}

impl DiagKind {
    fn label(&self) -> &'static str {
        match self {
            DiagKind::ParseError { .. } => "syntax error",
            DiagKind::NonOctalFileMode | DiagKind::Deprecated => "lint",
            DiagKind::CodeGen => "codegen error",
            _ => "semantic error",
        }
    }
}

/// One underlined source segment with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub span: Span,
    pub message: String,
}

/// A primary position with one or more annotations and an optional help
/// line. A diagnostic may carry several groups (e.g. duplicate declaration
/// sites).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationGroup {
    pub pos: Position,
    pub annotations: Vec<Annotation>,
    pub help: Option<String>,
}

/// A call frame recorded while unwinding a code generation error, innermost
/// first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub span: Span,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", self.summary())]
pub struct Diagnostic {
    pub kind: DiagKind,
    pub severity: Severity,
    pub message: String,
    pub groups: Vec<AnnotationGroup>,
    /// Codegen backtrace, innermost frame first. Empty for other kinds.
    pub frames: Vec<Frame>,
}

impl Diagnostic {
    fn new(kind: DiagKind, message: String, groups: Vec<AnnotationGroup>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            message,
            groups,
            frames: vec![],
        }
    }

    fn single(kind: DiagKind, span: Span, message: String, help: Option<String>) -> Self {
        let group = AnnotationGroup {
            pos: span.start.clone(),
            annotations: vec![Annotation {
                span,
                message: message.clone(),
            }],
            help,
        };
        Self::new(kind, message, vec![group])
    }

    pub fn parse_error(span: Span, message: String, expected: Vec<String>) -> Self {
        let help = if expected.is_empty() {
            None
        } else {
            Some(format!("expected {}", expected.join(", ")))
        };
        Self::single(DiagKind::ParseError { expected }, span, message, help)
    }

    pub fn duplicate_decl(name: &str, spans: Vec<Span>) -> Self {
        let message = format!("duplicate declaration {name}");
        let groups = spans
            .iter()
            .enumerate()
            .map(|(i, span)| AnnotationGroup {
                pos: span.start.clone(),
                annotations: vec![Annotation {
                    span: span.clone(),
                    message: if i == 0 {
                        format!("{name} first declared here")
                    } else {
                        format!("{name} declared again here")
                    },
                }],
                help: Some(format!("remove or rename the duplicate {name}")),
            })
            .collect();
        Self::new(DiagKind::DuplicateDecl, message, groups)
    }

    pub fn duplicate_field(name: &str, spans: Vec<Span>) -> Self {
        let message = format!("duplicate parameter {name}");
        let groups = spans
            .iter()
            .enumerate()
            .map(|(i, span)| AnnotationGroup {
                pos: span.start.clone(),
                annotations: vec![Annotation {
                    span: span.clone(),
                    message: if i == 0 {
                        format!("{name} first defined here")
                    } else {
                        format!("{name} defined again here")
                    },
                }],
                help: None,
            })
            .collect();
        Self::new(DiagKind::DuplicateField, message, groups)
    }

    pub fn no_source(span: Span, typ: &str) -> Self {
        Self::single(
            DiagKind::NoSource,
            span,
            format!("{typ} block must start with a source"),
            Some(format!("add a source operation for type {typ}")),
        )
    }

    pub fn first_source(span: Span, name: &str, typ: &str) -> Self {
        Self::single(
            DiagKind::FirstSource,
            span,
            format!("{name} is not a source for {typ}"),
            Some(format!("the first statement must introduce a {typ} value")),
        )
    }

    pub fn only_first_source(span: Span, name: &str) -> Self {
        Self::single(
            DiagKind::OnlyFirstSource,
            span,
            format!("source {name} must be the first statement"),
            None,
        )
    }

    pub fn invalid_func(span: Span, name: &str) -> Self {
        Self::single(
            DiagKind::InvalidFunc,
            span,
            format!("{name} is not a valid operation here"),
            None,
        )
    }

    pub fn ident_not_defined(span: Span, name: &str) -> Self {
        Self::single(
            DiagKind::IdentNotDefined,
            span,
            format!("{name} is not defined"),
            None,
        )
    }

    pub fn func_arg(span: Span, name: &str) -> Self {
        Self::single(
            DiagKind::FuncArg,
            span,
            format!("{name} takes parameters and cannot be passed bare"),
            Some("wrap it in a function literal instead".to_string()),
        )
    }

    pub fn num_args(span: Span, name: &str, expected: usize, found: usize) -> Self {
        Self::single(
            DiagKind::NumArgs { expected, found },
            span,
            format!("{name} expects {expected} argument(s), found {found}"),
            None,
        )
    }

    pub fn wrong_arg_type(span: Span, expected: &str, found: &str) -> Self {
        Self::single(
            DiagKind::WrongArgType {
                expected: expected.to_string(),
                found: found.to_string(),
            },
            span,
            format!("expected {expected}, found {found}"),
            None,
        )
    }

    pub fn invalid_target(span: Span, name: &str) -> Self {
        Self::single(
            DiagKind::InvalidTarget,
            span,
            format!("{name} is not a valid build target"),
            None,
        )
    }

    pub fn undefined_reference(span: Span, name: &str) -> Self {
        Self::single(
            DiagKind::UndefinedReference,
            span,
            format!("undefined reference to {name}"),
            None,
        )
    }

    pub fn non_octal_file_mode(span: Span, base: &str) -> Self {
        let mut d = Self::single(
            DiagKind::NonOctalFileMode,
            span,
            format!("file mode written as {base}"),
            Some("write file modes in octal, e.g. 0o644".to_string()),
        );
        d.severity = Severity::Warning;
        d
    }

    pub fn deprecated(span: Span, message: String, help: String) -> Self {
        let mut d = Self::single(DiagKind::Deprecated, span, message, Some(help));
        d.severity = Severity::Warning;
        d
    }

    pub fn codegen(span: Span, message: String) -> Self {
        Self::single(DiagKind::CodeGen, span, message, None)
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Append a call frame while unwinding.
    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn position(&self) -> Option<&Position> {
        self.groups.first().map(|g| &g.pos)
    }

    fn summary(&self) -> String {
        match self.position() {
            Some(pos) => format!("{pos}: {}: {}", self.severity, self.message),
            None => format!("{}: {}", self.severity, self.message),
        }
    }

    /// Render the full annotated block.
    pub fn render(&self, sources: &SourceMap, color: bool) -> String {
        let paint = Paint { on: color };
        let mut out = String::new();
        for (gi, group) in self.groups.iter().enumerate() {
            if gi > 0 {
                out.push('\n');
            }
            out.push_str(&self.render_group(group, sources, &paint));
        }
        if !self.frames.is_empty() {
            out.push('\n');
            out.push_str(&self.render_backtrace(sources, &paint, false));
        }
        out
    }

    fn render_group(&self, group: &AnnotationGroup, sources: &SourceMap, paint: &Paint) -> String {
        let max_ln = group
            .annotations
            .iter()
            .map(|a| a.span.start.line.to_string().len())
            .max()
            .unwrap_or(1);
        let gutter = " ".repeat(max_ln);

        let mut out = format!(
            "{} {}\n",
            paint.blue(&format!("{gutter}-->")),
            paint.bold(&format!(
                "{}: {}: {}",
                group.pos,
                self.severity,
                self.kind.label()
            )),
        );

        let mut blocks = Vec::new();
        for an in &group.annotations {
            let line_no = an.span.start.line;
            let segment = sources
                .get(&an.span.start.filename)
                .and_then(|ib| ib.line(line_no))
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_default();

            let col = an.span.start.column.saturating_sub(1).min(segment.len());
            // keep tabs so the caret column lines up
            let padding: String = segment
                .get(..col)
                .unwrap_or("")
                .chars()
                .map(|c| if c.is_whitespace() { c } else { ' ' })
                .collect();
            let width = (an.span.end.offset.saturating_sub(an.span.start.offset)).max(1);

            let ln = line_no.to_string();
            let pad = " ".repeat(max_ln - ln.len());
            let mut block = String::new();
            block.push_str(&format!("{}\n", paint.blue(&format!("{gutter} | "))));
            block.push_str(&format!(
                "{}{}\n",
                paint.blue(&format!("{ln}{pad} | ")),
                segment
            ));
            block.push_str(&format!(
                "{}{}{}\n",
                paint.blue(&format!("{gutter} | ")),
                padding,
                paint.red(&"^".repeat(width))
            ));
            block.push_str(&format!(
                "{}{}{}",
                paint.blue(&format!("{gutter} | ")),
                padding,
                an.message
            ));
            blocks.push(block);
        }
        out.push_str(&blocks.join(&format!("\n{}\n", paint.blue(&format!("{gutter} ⫶")))));

        if let Some(help) = &group.help {
            out.push('\n');
            out.push_str(&format!("{}\n", paint.blue(&format!("{gutter} | "))));
            out.push_str(&format!("{}{help}", paint.green(&format!("{gutter}[?] help: "))));
        }
        out.push('\n');
        out
    }

    /// Render the codegen backtrace. Collapsed to the innermost frame unless
    /// `full` is set.
    pub fn render_backtrace(&self, sources: &SourceMap, paint: &Paint, full: bool) -> String {
        let mut out = String::new();
        let shown: Vec<&Frame> = if full {
            self.frames.iter().collect()
        } else {
            self.frames.iter().take(1).collect()
        };
        for (i, frame) in shown.iter().enumerate() {
            let pos = &frame.span.start;
            out.push_str(&format!(
                "{} {} {}\n",
                paint.blue(&format!("{i:>2}:")),
                frame.name,
                paint.bold(&pos.to_string()),
            ));
            if let Some(seg) = sources
                .get(&pos.filename)
                .and_then(|ib| ib.line(pos.line))
            {
                out.push_str(&format!("      {}\n", String::from_utf8_lossy(seg)));
            }
        }
        if !full && self.frames.len() > 1 {
            out.push_str(&format!(
                "    ({} more frames; run with --backtrace for the full trace)\n",
                self.frames.len() - 1
            ));
        }
        out
    }
}

pub struct Paint {
    pub on: bool,
}

impl Paint {
    fn wrap(&self, code: &str, s: &str) -> String {
        if self.on {
            format!("{code}{s}{RESET}")
        } else {
            s.to_string()
        }
    }

    pub fn blue(&self, s: &str) -> String {
        self.wrap(BLUE, s)
    }

    pub fn red(&self, s: &str) -> String {
        self.wrap(RED, s)
    }

    pub fn green(&self, s: &str) -> String {
        self.wrap(GREEN, s)
    }

    pub fn bold(&self, s: &str) -> String {
        self.wrap(BOLD, s)
    }
}


/// A composite of one or more diagnostics. The semantic checker collects as
/// many independent errors as it can before returning one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", self.summary())]
pub struct Error {
    pub diagnostics: Vec<Diagnostic>,
}

impl Error {
    pub fn one(d: Diagnostic) -> Self {
        Self {
            diagnostics: vec![d],
        }
    }

    pub fn from_vec(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    pub fn render(&self, sources: &SourceMap, color: bool) -> String {
        self.diagnostics
            .iter()
            .map(|d| d.render(sources, color))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn summary(&self) -> String {
        self.diagnostics
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<Diagnostic> for Error {
    fn from(d: Diagnostic) -> Self {
        Error::one(d)
    }
}
