//! Compile facade: parse -> doc link -> semantic check -> code generation,
//! plus run configuration and the solve driver.

pub mod cli;
pub mod codegen;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use hlblang::ast::Module;
use hlblang::check::Analysis;
use hlblang::diag::{Diagnostic, Severity};
use hlblang::lint::LintConfig;
use hlblang::source::SourceMap;
use opgraph::{Definition, Value};
use solver::{Manager, SolveClient};

use codegen::debug::DebugControl;
use codegen::{CodeGen, CodegenError};

/// Run configuration, loaded from TOML and overridden by environment
/// variables (`BUILDKIT_HOST`, `HLB_BACKTRACE`).
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub addr: Option<String>,
    #[serde(default)]
    pub log_output: Option<String>,
    #[serde(default)]
    pub backtrace: bool,
    #[serde(default)]
    pub lint: LintCfg,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LintCfg {
    /// "warn" (default) or "error".
    #[serde(default)]
    pub non_octal_file_mode: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read config {path:?}"))?;
        let cfg: Config = toml::from_str(&s).with_context(|| format!("parse TOML {path:?}"))?;
        Ok(cfg)
    }

    pub fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("BUILDKIT_HOST") {
            if !addr.is_empty() {
                self.addr = Some(addr);
            }
        }
        if let Ok(bt) = std::env::var("HLB_BACKTRACE") {
            if bt == "1" || bt.eq_ignore_ascii_case("true") {
                self.backtrace = true;
            }
        }
    }

    pub fn lint_config(&self) -> LintConfig {
        let mut cfg = LintConfig::default();
        if self.lint.non_octal_file_mode.as_deref() == Some("error") {
            cfg.non_octal_file_mode = Severity::Error;
        }
        cfg
    }
}

/// A parsed and checked module, ready for code generation.
pub struct Compiled {
    pub module: Module,
    pub analysis: Analysis,
    pub sources: SourceMap,
    pub warnings: Vec<Diagnostic>,
}

/// A failed compile, carrying the source map so diagnostics can still be
/// rendered against the offending buffer.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct CompileFailure {
    pub error: hlblang::Error,
    pub sources: SourceMap,
}

impl CompileFailure {
    pub fn render(&self, color: bool) -> String {
        self.error.render(&self.sources, color)
    }
}

/// Parse, link docs, semantic-check, and lint one buffer. Lint findings at
/// error severity fail the compile alongside semantic errors.
pub fn parse_and_check(
    filename: &str,
    bytes: &[u8],
    lint_cfg: LintConfig,
) -> Result<Compiled, CompileFailure> {
    let mut sources = SourceMap::new();
    sources.insert(
        Arc::from(filename),
        hlblang::IndexedBuffer::from_bytes(bytes.to_vec()),
    );
    let fail = |error: hlblang::Error, sources: &SourceMap| CompileFailure {
        error,
        sources: sources.clone(),
    };

    let (mut module, _) =
        hlblang::parse_module(bytes, filename).map_err(|d| fail(d.into(), &sources))?;

    hlblang::doc::link_docs(&mut module);
    let analysis = hlblang::check(&module).map_err(|e| fail(e, &sources))?;

    let findings = hlblang::lint::lint(&module, lint_cfg);
    let (errors, warnings): (Vec<_>, Vec<_>) = findings
        .into_iter()
        .partition(|d| d.severity == Severity::Error);
    if !errors.is_empty() {
        return Err(fail(hlblang::Error::from_vec(errors), &sources));
    }

    Ok(Compiled {
        module,
        analysis,
        sources,
        warnings,
    })
}

/// Evaluate one target. Returns `None` when an interactive debug session
/// exited early; `restart` from the debugger re-runs the target.
pub fn compile_target(
    cg: &mut CodeGen<'_>,
    target: &str,
) -> Result<Option<Value>, CodegenError> {
    loop {
        match cg.emit_target(target) {
            Ok(v) => return Ok(Some(v)),
            Err(CodegenError::Debug(DebugControl::Exit)) => return Ok(None),
            Err(CodegenError::Debug(DebugControl::Restart)) => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Submit a marshaled graph to a solve client, draining its status stream
/// through a progress manager. Blocks until the solve settles.
pub fn solve(client: Arc<dyn SolveClient>, def: Definition) -> Result<()> {
    let mut manager = Manager::new();
    let job = manager.new_job("solve");
    let status_tx = job.new_channel();
    let cancel = manager.cancel_token();

    manager.go(move || client.solve(&def, status_tx, cancel));

    manager.release();
    manager.wait()
}
