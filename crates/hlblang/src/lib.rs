//! Language front-end for the HLB build language: source indexing, lexing,
//! parsing, doc linking, semantic analysis, linting, and diagnostics.

pub mod ast;
pub mod builtin;
pub mod check;
pub mod diag;
pub mod doc;
pub mod lex;
pub mod lint;
pub mod parse;
pub mod scope;
pub mod source;

pub use ast::{Module, ObjType, OptionNs};
pub use check::{check, Analysis};
pub use diag::{Diagnostic, Error, Severity};
pub use parse::parse_module;
pub use source::{IndexedBuffer, SourceMap};
