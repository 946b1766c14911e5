//! The interactive debugger, re-entered mid-evaluation as a synchronous
//! callback. History snapshots support deterministic reverse-stepping
//! within the current call stack.

use std::io::{BufRead, Write};
use std::process::{Command, Stdio};

use hlblang::ast::{Module, NodeId, Span};
use hlblang::builtin::Registry;
use hlblang::source::SourceMap;
use opgraph::{write_dot, FsState, Value};

use super::FrameVals;

/// Distinguished control errors raised from inside a debug session. The
/// outer runner treats `Exit` as a clean early return and `Restart` as a
/// request to re-run the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DebugControl {
    #[error("debug exit")]
    Exit,
    #[error("debug restart")]
    Restart,
}

/// Everything the generator exposes at a suspension point.
pub struct DebugCx<'a> {
    pub node: NodeId,
    pub span: &'a Span,
    /// Call or function name at this stop.
    pub name: &'a str,
    /// Name of the enclosing function.
    pub in_fn: &'a str,
    /// Call-stack depth; the target function's body is depth 1.
    pub depth: usize,
    pub locals: &'a FrameVals,
    pub value: &'a Value,
    pub is_function: bool,
}

/// Invoked on function entry and before each call statement.
pub trait Debugger {
    fn stop(&mut self, cx: DebugCx<'_>) -> Result<(), DebugControl>;
}

/// The default debugger returns immediately.
pub struct NoopDebugger;

impl Debugger for NoopDebugger {
    fn stop(&mut self, _cx: DebugCx<'_>) -> Result<(), DebugControl> {
        Ok(())
    }
}

/// Runs `exec` REPL requests inside a container built from the current
/// filesystem value. External collaborator; absent by default.
pub trait ExecHandler {
    fn exec(&self, fs: &FsState, argv: &[String]) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub node: NodeId,
    pub span: Span,
    pub name: String,
    pub in_fn: String,
    pub depth: usize,
    pub locals: FrameVals,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StepMode {
    Step,
    Continue,
    /// Stop at the next statement inside the named function.
    Next(String),
    /// Run until the call stack drops below the recorded depth.
    StepOut(usize),
}

/// Static breakpoints: every `breakpoint` call found at parse time.
pub fn static_breakpoints(module: &Module) -> Vec<Breakpoint> {
    let mut out = Vec::new();
    for f in module.funcs() {
        if let Some(body) = &f.body {
            collect_breakpoints(body, &mut out);
        }
    }
    out
}

fn collect_breakpoints(block: &hlblang::ast::BlockStmt, out: &mut Vec<Breakpoint>) {
    for call in block.calls() {
        if call.name.text == "breakpoint" {
            out.push(Breakpoint {
                line: call.span.start.line,
            });
        }
        for arg in &call.args {
            if let Some(fl) = arg.as_func_lit() {
                collect_breakpoints(&fl.body, out);
            }
        }
        if let Some(with) = &call.with_opt {
            if let Some(fl) = with.as_func_lit() {
                collect_breakpoints(&fl.body, out);
            }
        }
    }
}

pub struct InteractiveDebugger<R: BufRead, W: Write> {
    input: R,
    output: W,
    sources: SourceMap,
    history: Vec<Snapshot>,
    /// Index of the snapshot currently shown; reverse-step moves it back.
    cursor: usize,
    breakpoints: Vec<Breakpoint>,
    mode: StepMode,
    exec: Option<Box<dyn ExecHandler>>,
    funcs: Vec<String>,
}

impl<R: BufRead, W: Write> InteractiveDebugger<R, W> {
    pub fn new(module: &Module, sources: SourceMap, input: R, output: W) -> Self {
        Self {
            input,
            output,
            sources,
            history: Vec::new(),
            cursor: 0,
            breakpoints: static_breakpoints(module),
            mode: StepMode::Step,
            exec: None,
            funcs: module.funcs().map(|f| f.name.text.clone()).collect(),
        }
    }

    pub fn with_exec_handler(mut self, handler: Box<dyn ExecHandler>) -> Self {
        self.exec = Some(handler);
        self
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.history.get(self.cursor)
    }

    fn should_stop(&self, cx: &DebugCx<'_>) -> bool {
        if cx.name == "breakpoint" {
            return true;
        }
        match &self.mode {
            StepMode::Step => true,
            StepMode::Continue => self
                .breakpoints
                .iter()
                .any(|bp| bp.line == cx.span.start.line),
            StepMode::Next(target) => !cx.is_function && cx.in_fn == target,
            StepMode::StepOut(depth) => cx.depth < *depth,
        }
    }

    fn print_context(&mut self, snapshot: &Snapshot) {
        let pos = &snapshot.span.start;
        let _ = writeln!(self.output, "=> {} at {}", snapshot.name, pos);
        if let Some(seg) = self.sources.get(&pos.filename).and_then(|ib| ib.line(pos.line)) {
            let _ = writeln!(self.output, "{:>5} | {}", pos.line, String::from_utf8_lossy(seg));
        }
    }

    fn print_list(&mut self, snapshot: &Snapshot) {
        let pos = &snapshot.span.start;
        let Some(ib) = self.sources.get(&pos.filename) else {
            return;
        };
        let first = pos.line.saturating_sub(3).max(1);
        let last = (pos.line + 3).min(ib.line_count());
        let mut lines = Vec::new();
        for ln in first..=last {
            if let Some(seg) = ib.line(ln) {
                let marker = if ln == pos.line { "=>" } else { "  " };
                lines.push(format!("{marker} {ln:>4} | {}", String::from_utf8_lossy(seg)));
            }
        }
        for line in lines {
            let _ = writeln!(self.output, "{line}");
        }
    }

    fn summarize(value: &Value) -> String {
        match value {
            Value::Filesystem(fs) => match fs.vertex() {
                Some(v) => format!("fs({})", v.digest.short()),
                None => "fs(scratch)".to_string(),
            },
            Value::Str(s) => format!("{s:?}"),
            Value::Int(i) => i.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Options(entries) => format!("option({} entries)", entries.len()),
        }
    }

    fn repl(&mut self) -> Result<(), DebugControl> {
        loop {
            let _ = write!(self.output, "(hlb) ");
            let _ = self.output.flush();

            let mut line = String::new();
            match self.input.read_line(&mut line) {
                Ok(0) => return Err(DebugControl::Exit),
                Ok(_) => {}
                Err(_) => return Err(DebugControl::Exit),
            }
            let args: Vec<&str> = line.split_whitespace().collect();
            let Some(&cmd) = args.first() else { continue };

            match cmd {
                "break" | "b" => {
                    let line_no = args.get(1).and_then(|s| s.parse::<usize>().ok());
                    match line_no {
                        Some(line) => {
                            self.breakpoints.push(Breakpoint { line });
                            let _ = writeln!(self.output, "breakpoint set at line {line}");
                        }
                        None => {
                            let _ = writeln!(self.output, "usage: break <line>");
                        }
                    }
                }
                "breakpoints" => {
                    let lines: Vec<String> = self
                        .breakpoints
                        .iter()
                        .enumerate()
                        .map(|(i, bp)| format!("{i}: line {}", bp.line))
                        .collect();
                    for l in lines {
                        let _ = writeln!(self.output, "{l}");
                    }
                }
                "clear" => match args.get(1).and_then(|s| s.parse::<usize>().ok()) {
                    Some(i) if i < self.breakpoints.len() => {
                        self.breakpoints.remove(i);
                    }
                    _ => {
                        self.breakpoints.clear();
                        let _ = writeln!(self.output, "cleared all breakpoints");
                    }
                },
                "continue" | "c" => {
                    self.mode = StepMode::Continue;
                    return Ok(());
                }
                "next" | "n" => {
                    let target = self
                        .current()
                        .map(|s| s.in_fn.clone())
                        .unwrap_or_default();
                    self.mode = StepMode::Next(target);
                    return Ok(());
                }
                "step" | "s" => {
                    self.mode = StepMode::Step;
                    return Ok(());
                }
                "stepout" => {
                    let depth = self.current().map(|s| s.depth).unwrap_or(0);
                    self.mode = StepMode::StepOut(depth);
                    return Ok(());
                }
                "reverse-step" | "rs" => {
                    if self.cursor > 0 {
                        self.cursor -= 1;
                        // trim history so forward steps replay from here
                        self.history.truncate(self.cursor + 1);
                    }
                    if let Some(s) = self.current().cloned() {
                        self.print_context(&s);
                    }
                }
                "restart" | "r" => return Err(DebugControl::Restart),
                "exit" => return Err(DebugControl::Exit),
                "list" | "l" => {
                    if let Some(s) = self.current().cloned() {
                        self.print_list(&s);
                    } else {
                        let _ = writeln!(self.output, "program has not started yet");
                    }
                }
                "locals" => {
                    let entries: Vec<String> = self
                        .current()
                        .map(|s| {
                            s.locals
                                .iter()
                                .map(|(n, v)| format!("{n} = {}", Self::summarize(v)))
                                .collect()
                        })
                        .unwrap_or_default();
                    for e in entries {
                        let _ = writeln!(self.output, "{e}");
                    }
                }
                "funcs" => {
                    let funcs = self.funcs.clone();
                    for f in funcs {
                        let _ = writeln!(self.output, "{f}");
                    }
                }
                "types" => {
                    for t in ["string", "int", "bool", "fs", "option"] {
                        let _ = writeln!(self.output, "{t}");
                    }
                }
                "print" => {
                    let name = args.get(1).map(|s| s.to_string());
                    let msg = match &name {
                        None => "usage: print <name>".to_string(),
                        Some(n) => self
                            .current()
                            .and_then(|s| s.locals.iter().rev().find(|(ln, _)| ln == n))
                            .map(|(_, v)| Self::summarize(v))
                            .unwrap_or_else(|| format!("{n} is not defined")),
                    };
                    let _ = writeln!(self.output, "{msg}");
                }
                "whatis" => {
                    let name = args.get(1).map(|s| s.to_string());
                    let msg = match &name {
                        None => "usage: whatis <name>".to_string(),
                        Some(n) => self
                            .current()
                            .and_then(|s| s.locals.iter().rev().find(|(ln, _)| ln == n))
                            .map(|(_, v)| v.kind().to_string())
                            .unwrap_or_else(|| format!("{n} is not defined")),
                    };
                    let _ = writeln!(self.output, "{msg}");
                }
                "dir" | "env" | "network" | "security" => {
                    let msg = match self.current().map(|s| s.value.clone()) {
                        Some(Value::Filesystem(fs)) => match cmd {
                            "dir" => format!("working directory {:?}", fs.cwd()),
                            "env" => {
                                let pairs: Vec<String> = fs
                                    .env()
                                    .iter()
                                    .map(|(k, v)| format!("{k}={v}"))
                                    .collect();
                                format!("environment [{}]", pairs.join(", "))
                            }
                            "network" => format!("network {}", fs.network()),
                            _ => format!("security {}", fs.security()),
                        },
                        _ => "current step is not in a fs scope".to_string(),
                    };
                    let _ = writeln!(self.output, "{msg}");
                }
                "dot" => {
                    let fs = match self.current().map(|s| s.value.clone()) {
                        Some(Value::Filesystem(fs)) => fs,
                        _ => {
                            let _ = writeln!(self.output, "current step is not in a fs scope");
                            continue;
                        }
                    };
                    match args.get(1) {
                        None => {
                            let _ = write_dot(&fs, &mut self.output);
                        }
                        Some(sh) => {
                            if let Err(e) = pipe_dot(&fs, sh) {
                                let _ = writeln!(self.output, "err: {e}");
                            }
                        }
                    }
                }
                "exec" => {
                    let fs = match self.current().map(|s| s.value.clone()) {
                        Some(Value::Filesystem(fs)) => fs,
                        _ => {
                            let _ = writeln!(self.output, "current step is not in a fs scope");
                            continue;
                        }
                    };
                    let argv: Vec<String> = args[1..].iter().map(|s| s.to_string()).collect();
                    match &self.exec {
                        Some(handler) => {
                            if let Err(e) = handler.exec(&fs, &argv) {
                                let _ = writeln!(self.output, "err: {e}");
                            }
                        }
                        None => {
                            let _ = writeln!(
                                self.output,
                                "exec requires a connection to a build daemon"
                            );
                        }
                    }
                }
                "help" => {
                    let _ = writeln!(self.output, "# Inspect");
                    let _ = writeln!(self.output, "list locals funcs types print whatis");
                    let _ = writeln!(self.output, "# Movement");
                    let _ = writeln!(
                        self.output,
                        "break breakpoints clear continue next step stepout reverse-step restart exit"
                    );
                    let _ = writeln!(self.output, "# Filesystem");
                    let _ = writeln!(self.output, "dir env network security dot exec");
                }
                other => {
                    let _ = writeln!(self.output, "unrecognized command {other}");
                }
            }
        }
    }
}

impl<R: BufRead, W: Write> Debugger for InteractiveDebugger<R, W> {
    fn stop(&mut self, cx: DebugCx<'_>) -> Result<(), DebugControl> {
        self.history.push(Snapshot {
            node: cx.node,
            span: cx.span.clone(),
            name: cx.name.to_string(),
            in_fn: cx.in_fn.to_string(),
            depth: cx.depth,
            locals: cx.locals.clone(),
            value: cx.value.clone(),
        });
        self.cursor = self.history.len() - 1;

        if !self.should_stop(&cx) {
            return Ok(());
        }

        let snapshot = self.history[self.cursor].clone();
        self.print_context(&snapshot);
        self.repl()
    }
}

fn pipe_dot(fs: &FsState, sh: &str) -> anyhow::Result<()> {
    let mut dot = Vec::new();
    write_dot(fs, &mut dot)?;
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(sh)
        .stdin(Stdio::piped())
        .spawn()?;
    if let Some(stdin) = child.stdin.as_mut() {
        stdin.write_all(&dot)?;
    }
    child.wait()?;
    Ok(())
}

/// The registry-backed completion surface for REPL commands; shared with
/// the language server.
pub fn completions() -> Vec<&'static str> {
    let reg = Registry::get();
    let mut out: Vec<&'static str> = Vec::new();
    out.extend(reg.sources(hlblang::ast::ObjType::Fs));
    out.extend(reg.sources(hlblang::ast::ObjType::Str));
    out.extend(reg.ops());
    out.extend(reg.debugs());
    out.sort_unstable();
    out.dedup();
    out
}
