//! Lint-grade checks. Findings are diagnostics whose severity is
//! configurable; the default reports warnings.

use crate::ast::*;
use crate::diag::{Diagnostic, Severity};

fn path_text(lit: &BasicLit) -> String {
    match &lit.kind {
        LitKind::Str(s) => s.clone(),
        _ => String::new(),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LintConfig {
    pub non_octal_file_mode: Severity,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            non_octal_file_mode: Severity::Warning,
        }
    }
}

pub fn lint(module: &Module, config: LintConfig) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for f in module.funcs() {
        if let Some(body) = &f.body {
            lint_block(body, config, &mut out);
        }
    }
    for decl in &module.decls {
        if let Decl::Import(id) = decl {
            if let Some(path) = &id.deprecated_path {
                out.push(Diagnostic::deprecated(
                    path.span.clone(),
                    "import without \"from\" is deprecated".to_string(),
                    format!("write: import {} from {:?}", id.name.text, path_text(path)),
                ));
            }
        }
    }
    out
}

fn lint_block(block: &BlockStmt, config: LintConfig, out: &mut Vec<Diagnostic>) {
    for call in block.calls() {
        lint_call(call, config, out);
        for arg in &call.args {
            if let Some(fl) = arg.as_func_lit() {
                lint_block(&fl.body, config, out);
            }
        }
        if let Some(with) = &call.with_opt {
            if let Some(fl) = with.as_func_lit() {
                lint_block(&fl.body, config, out);
            }
        }
    }
}

/// File-mode arguments must be written in octal.
fn lint_call(call: &CallStmt, config: LintConfig, out: &mut Vec<Diagnostic>) {
    let mode_arg = match call.name.text.as_str() {
        "chmod" | "mode" => call.args.first(),
        "mkdir" | "mkfile" => call.args.get(1),
        _ => None,
    };
    let Some(arg) = mode_arg else { return };
    let Some(lit) = arg.as_lit() else { return };
    let LitKind::Int(int) = &lit.kind else { return };
    if int.base != 8 {
        out.push(
            Diagnostic::non_octal_file_mode(lit.span.clone(), int.base_name())
                .with_severity(config.non_octal_file_mode),
        );
    }
}
