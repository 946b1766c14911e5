//! Tree-walking evaluator: walks the checked AST and emits a build-op
//! graph. Single-threaded and deterministic; may suspend inside the
//! debugger hook or an image-resolver call.

pub mod debug;
pub mod expr;
pub mod local;

use std::collections::BTreeMap;
use std::sync::Arc;

use hlblang::ast::{
    BlockStmt, CallStmt, FuncDecl, Module, NodeId, ObjType, Span,
};
use hlblang::builtin::Registry;
use hlblang::check::Analysis;
use hlblang::diag::{Diagnostic, Frame};
use hlblang::scope::{NodeRef, ScopeId};
use opgraph::{
    CopyOpts, ExecOptions, FsState, HostEntry, ImageResolver, MountSpec, OptionEntry,
    ResolverCache, SecretOpt, SshOpt, Value,
};

use self::debug::{DebugControl, DebugCx, Debugger, NoopDebugger};
use self::local::LocalEnv;

#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error(transparent)]
    Diag(#[from] Diagnostic),
    #[error(transparent)]
    Debug(#[from] DebugControl),
}

impl CodegenError {
    fn with_frame(self, frame: Frame) -> Self {
        match self {
            CodegenError::Diag(d) => CodegenError::Diag(d.with_frame(frame)),
            other => other,
        }
    }
}

/// Parameter bindings for one function evaluation, in declaration order.
pub type FrameVals = Vec<(String, Value)>;

pub(crate) fn frame_lookup<'a>(frame: &'a FrameVals, name: &str) -> Option<&'a Value> {
    frame.iter().rev().find(|(n, _)| n == name).map(|(_, v)| v)
}

pub struct CodeGen<'m> {
    pub(crate) module: &'m Module,
    pub(crate) funcs: Vec<&'m FuncDecl>,
    pub(crate) analysis: &'m Analysis,
    pub(crate) debugger: Box<dyn Debugger>,
    pub(crate) resolver: Option<Arc<dyn ImageResolver>>,
    pub(crate) resolver_cache: ResolverCache,
    pub(crate) local_env: LocalEnv,
    current_fn: String,
    depth: usize,
}

impl<'m> CodeGen<'m> {
    pub fn new(module: &'m Module, analysis: &'m Analysis) -> Self {
        Self {
            module,
            funcs: module.funcs().collect(),
            analysis,
            debugger: Box::new(NoopDebugger),
            resolver: None,
            resolver_cache: ResolverCache::new(),
            local_env: LocalEnv::from_process(),
            current_fn: String::new(),
            depth: 0,
        }
    }

    pub fn with_debugger(mut self, debugger: Box<dyn Debugger>) -> Self {
        self.debugger = debugger;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ImageResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_local_env(mut self, env: LocalEnv) -> Self {
        self.local_env = env;
        self
    }

    /// Evaluate a top-level target by name.
    pub fn emit_target(&mut self, target: &str) -> Result<Value, CodegenError> {
        let obj = self
            .analysis
            .scopes
            .lookup(ScopeId::MODULE, target)
            .ok_or_else(|| {
                Diagnostic::invalid_target(self.module.span.clone(), target)
            })?;
        match obj.node {
            NodeRef::Func(i) => {
                let f = self.funcs[i];
                let mut noop = |_: NodeId, _: &Value| {};
                self.emit_func_decl(f, &vec![], None, "", &mut noop)
            }
            NodeRef::Alias(i) => self.emit_alias_decl(i),
            NodeRef::Param { .. } => Err(Diagnostic::invalid_target(
                self.module.span.clone(),
                target,
            )
            .into()),
        }
    }

    fn codegen_err(&self, span: &Span, message: impl Into<String>) -> CodegenError {
        Diagnostic::codegen(span.clone(), message.into()).into()
    }

    pub(crate) fn debug_stop(
        &mut self,
        node: NodeId,
        span: &Span,
        name: &str,
        locals: &FrameVals,
        value: &Value,
        is_function: bool,
    ) -> Result<(), CodegenError> {
        let cx = DebugCx {
            node,
            span,
            name,
            in_fn: &self.current_fn,
            depth: self.depth,
            locals,
            value,
            is_function,
        };
        self.debugger.stop(cx).map_err(CodegenError::from)
    }

    /// Evaluate a function declaration: bind parameters from the caller's
    /// frame, invoke the debugger, then dispatch on the return type.
    pub(crate) fn emit_func_decl(
        &mut self,
        f: &FuncDecl,
        caller_frame: &FrameVals,
        call: Option<&CallStmt>,
        op: &str,
        ac: &mut dyn FnMut(NodeId, &Value),
    ) -> Result<Value, CodegenError> {
        let empty: Vec<hlblang::ast::Expr> = vec![];
        let args = call.map(|c| c.args.as_slice()).unwrap_or(&empty);

        if args.len() != f.params.len() {
            return Err(Diagnostic::num_args(
                f.name.span.clone(),
                &f.name.text,
                f.params.len(),
                args.len(),
            )
            .into());
        }

        let mut frame: FrameVals = Vec::with_capacity(f.params.len());
        for (param, arg) in f.params.iter().zip(args) {
            let v = match param.typ.obj {
                ObjType::Str => Value::Str(self.emit_string_expr(caller_frame, arg, ac)?),
                ObjType::Int => Value::Int(self.emit_int_expr(caller_frame, arg)?),
                ObjType::Bool => Value::Bool(self.emit_bool_expr(caller_frame, arg)?),
                ObjType::Fs => Value::Filesystem(self.emit_fs_expr(caller_frame, arg, ac)?),
                ObjType::Option(_) => Value::Options(self.emit_option_expr(caller_frame, arg, op, ac)?),
            };
            frame.push((param.name.text.clone(), v));
        }

        let prev_fn = std::mem::replace(&mut self.current_fn, f.name.text.clone());
        self.depth += 1;
        let result = self.emit_func_body(f, &frame, op, ac);
        self.depth -= 1;
        self.current_fn = prev_fn;
        result.map_err(|e| {
            e.with_frame(Frame {
                span: f.name.span.clone(),
                name: f.name.text.clone(),
            })
        })
    }

    fn emit_func_body(
        &mut self,
        f: &FuncDecl,
        frame: &FrameVals,
        op: &str,
        ac: &mut dyn FnMut(NodeId, &Value),
    ) -> Result<Value, CodegenError> {
        let zero = match f.typ.obj {
            ObjType::Fs => Value::Filesystem(FsState::scratch()),
            ObjType::Str => Value::Str(String::new()),
            ObjType::Option(_) => Value::Options(vec![]),
            ObjType::Int => Value::Int(0),
            ObjType::Bool => Value::Bool(false),
        };

        // Before executing the function body.
        self.debug_stop(f.id, &f.span, &f.name.text, frame, &zero, true)?;

        let body = f
            .body
            .as_ref()
            .ok_or_else(|| self.codegen_err(&f.span, format!("{} has no body", f.name.text)))?;

        match f.typ.obj {
            ObjType::Fs => self
                .emit_fs_block(frame, body, ac)
                .map(Value::Filesystem),
            ObjType::Str => self.emit_string_block(frame, body, ac).map(Value::Str),
            ObjType::Option(_) => {
                let ns = f
                    .typ
                    .obj
                    .subtype()
                    .map(|ns| ns.as_str().to_string())
                    .unwrap_or_else(|| op.to_string());
                self.emit_options(frame, &ns, body, ac).map(Value::Options)
            }
            _ => Err(Diagnostic::invalid_target(f.name.span.clone(), &f.name.text).into()),
        }
    }

    /// Evaluate the host function of an alias, capturing the value produced
    /// at the aliased call.
    pub(crate) fn emit_alias_decl(&mut self, alias_index: usize) -> Result<Value, CodegenError> {
        let alias = self.analysis.aliases[alias_index].clone();
        let f = self.funcs[alias.func];
        let mut captured: Option<Value> = None;
        {
            let target = alias.call;
            let mut capture = |id: NodeId, v: &Value| {
                if id == target && captured.is_none() {
                    captured = Some(v.clone());
                }
            };
            self.emit_func_decl(f, &vec![], None, "", &mut capture)?;
        }
        captured.ok_or_else(|| {
            self.codegen_err(
                &alias.ident.span,
                format!("alias {} never produced a value", alias.ident.text),
            )
        })
    }

    /// Walk a filesystem block, threading the current state through each
    /// call in source order.
    pub(crate) fn emit_fs_block(
        &mut self,
        frame: &FrameVals,
        block: &BlockStmt,
        ac: &mut dyn FnMut(NodeId, &Value),
    ) -> Result<FsState, CodegenError> {
        let mut state = FsState::scratch();
        for call in block.calls() {
            let current = Value::Filesystem(state.clone());
            self.debug_stop(call.id, &call.span, &call.name.text, frame, &current, false)?;
            if Registry::get().is_debug(&call.name.text) {
                continue;
            }
            state = self
                .emit_fs_call(frame, state, call, ac)
                .map_err(|e| {
                    e.with_frame(Frame {
                        span: call.span.clone(),
                        name: call.name.text.clone(),
                    })
                })?;
            if call.alias.is_some() {
                ac(call.id, &Value::Filesystem(state.clone()));
            }
        }
        Ok(state)
    }

    fn emit_fs_call(
        &mut self,
        frame: &FrameVals,
        state: FsState,
        call: &CallStmt,
        ac: &mut dyn FnMut(NodeId, &Value),
    ) -> Result<FsState, CodegenError> {
        let name = call.name.text.as_str();

        let with_entries: Vec<OptionEntry> = match &call.with_opt {
            Some(expr) => self.emit_option_expr(frame, expr, name, ac)?,
            None => vec![],
        };

        match name {
            "scratch" => Ok(FsState::scratch()),
            "image" => {
                let reference = self.emit_string_expr(frame, &call.args[0], ac)?;
                let mut attrs = common_attrs(&with_entries);
                if with_entries.iter().any(|e| e.name == "resolve") {
                    if let Some(resolver) = self.resolver.clone() {
                        let resolved = self
                            .resolver_cache
                            .resolve(resolver.as_ref(), &reference)
                            .map_err(|e| self.codegen_err(&call.span, e.to_string()))?;
                        attrs.insert("digest".to_string(), resolved.digest.as_str().to_string());
                        attrs.insert("os".to_string(), resolved.platform.os);
                        attrs.insert("arch".to_string(), resolved.platform.arch);
                    }
                }
                Ok(FsState::image(&reference, attrs))
            }
            "http" => {
                let url = self.emit_string_expr(frame, &call.args[0], ac)?;
                let mut attrs = common_attrs(&with_entries);
                for entry in &with_entries {
                    match entry.name.as_str() {
                        "checksum" => {
                            if let Some(d) = entry.str_arg(0) {
                                attrs.insert("checksum".to_string(), d.to_string());
                            }
                        }
                        "chmod" => {
                            if let Some(m) = entry.int_arg(0) {
                                attrs.insert("chmod".to_string(), format!("0o{m:o}"));
                            }
                        }
                        "filename" => {
                            if let Some(f) = entry.str_arg(0) {
                                attrs.insert("filename".to_string(), f.to_string());
                            }
                        }
                        _ => {}
                    }
                }
                Ok(FsState::http(&url, attrs))
            }
            "git" => {
                let remote = self.emit_string_expr(frame, &call.args[0], ac)?;
                let reference = self.emit_string_expr(frame, &call.args[1], ac)?;
                let mut attrs = common_attrs(&with_entries);
                if with_entries.iter().any(|e| e.name == "keepGitDir") {
                    attrs.insert("keep-git-dir".to_string(), "true".to_string());
                }
                Ok(FsState::git(&remote, &reference, attrs))
            }
            "local" => {
                let path = self.emit_string_expr(frame, &call.args[0], ac)?;
                let resolved = self
                    .local_env
                    .resolve(&path)
                    .map_err(|e| self.codegen_err(&call.span, e.to_string()))?;
                let mut attrs = common_attrs(&with_entries);
                for entry in &with_entries {
                    let patterns: Vec<&str> = entry
                        .args
                        .iter()
                        .filter_map(|v| v.expect_str().ok())
                        .collect();
                    match entry.name.as_str() {
                        "includePatterns" => {
                            attrs.insert("include-patterns".to_string(), patterns.join(","));
                        }
                        "excludePatterns" => {
                            attrs.insert("exclude-patterns".to_string(), patterns.join(","));
                        }
                        "followPaths" => {
                            attrs.insert("follow-paths".to_string(), patterns.join(","));
                        }
                        _ => {}
                    }
                }
                Ok(FsState::local(&resolved, attrs))
            }
            "generate" => {
                let frontend = self.emit_fs_expr(frame, &call.args[0], ac)?;
                let mut attrs = common_attrs(&with_entries);
                for entry in &with_entries {
                    match entry.name.as_str() {
                        "frontendInput" => {
                            if let (Some(key), Some(fs)) = (entry.str_arg(0), entry.fs_arg(1)) {
                                let digest = fs
                                    .vertex()
                                    .map(|v| v.digest.as_str().to_string())
                                    .unwrap_or_else(|| "scratch".to_string());
                                attrs.insert(format!("input:{key}"), digest);
                            }
                        }
                        "frontendOpt" => {
                            if let (Some(key), Some(value)) = (entry.str_arg(0), entry.str_arg(1)) {
                                attrs.insert(format!("opt:{key}"), value.to_string());
                            }
                        }
                        _ => {}
                    }
                }
                Ok(FsState::generate(&frontend, attrs))
            }
            "shell" => {
                let args = self.emit_string_args(frame, &call.args, ac)?;
                Ok(state.with_shell(args))
            }
            "run" => {
                let args = self.emit_string_args(frame, &call.args, ac)?;
                let opts = self.exec_options(call, &with_entries)?;
                let result = state.run(args, opts);
                for (tag, mount_state) in &result.mounts {
                    if let Some(tag) = tag {
                        ac(*tag as NodeId, &Value::Filesystem(mount_state.clone()));
                    }
                }
                Ok(result.root)
            }
            "env" => {
                let key = self.emit_string_expr(frame, &call.args[0], ac)?;
                let value = self.emit_string_expr(frame, &call.args[1], ac)?;
                Ok(state.with_env(&key, &value))
            }
            "dir" => {
                let path = self.emit_string_expr(frame, &call.args[0], ac)?;
                Ok(state.with_cwd(&path))
            }
            "user" => {
                let user = self.emit_string_expr(frame, &call.args[0], ac)?;
                Ok(state.with_user(&user))
            }
            "entrypoint" => {
                let command = self.emit_string_args(frame, &call.args, ac)?;
                Ok(state.with_entrypoint(command))
            }
            "mkdir" => {
                let path = self.emit_string_expr(frame, &call.args[0], ac)?;
                let mode = self.emit_int_expr(frame, &call.args[1])?;
                let make_parents = with_entries.iter().any(|e| e.name == "createParents");
                let owner = entry_str(&with_entries, "chown");
                let created = entry_str(&with_entries, "createdTime");
                Ok(state.mkdir(&path, mode, make_parents, owner, created))
            }
            "mkfile" => {
                let path = self.emit_string_expr(frame, &call.args[0], ac)?;
                let mode = self.emit_int_expr(frame, &call.args[1])?;
                let content = self.emit_string_expr(frame, &call.args[2], ac)?;
                let owner = entry_str(&with_entries, "chown");
                let created = entry_str(&with_entries, "createdTime");
                Ok(state.mkfile(&path, mode, &content, owner, created))
            }
            "rm" => {
                let path = self.emit_string_expr(frame, &call.args[0], ac)?;
                let allow_not_found = with_entries.iter().any(|e| e.name == "allowNotFound");
                let allow_wildcard = with_entries.iter().any(|e| e.name == "allowWildcard");
                Ok(state.rm(&path, allow_not_found, allow_wildcard))
            }
            "copy" => {
                let input = self.emit_fs_expr(frame, &call.args[0], ac)?;
                let src = self.emit_string_expr(frame, &call.args[1], ac)?;
                let dest = self.emit_string_expr(frame, &call.args[2], ac)?;
                let opts = CopyOpts {
                    follow_symlinks: with_entries.iter().any(|e| e.name == "followSymlinks"),
                    contents_only: with_entries.iter().any(|e| e.name == "contentsOnly"),
                    unpack: with_entries.iter().any(|e| e.name == "unpack"),
                    create_dest_path: with_entries.iter().any(|e| e.name == "createDestPath"),
                    allow_wildcard: with_entries.iter().any(|e| e.name == "allowWildcard"),
                    allow_empty_wildcard: with_entries
                        .iter()
                        .any(|e| e.name == "allowEmptyWildcard"),
                    owner: entry_str(&with_entries, "chown"),
                    created: entry_str(&with_entries, "createdTime"),
                };
                Ok(state.copy(&input, &src, &dest, opts))
            }
            _ => {
                // user-defined: function, alias, or a filesystem parameter
                if let Some(v) = frame_lookup(frame, name) {
                    return v
                        .expect_fs()
                        .cloned()
                        .map_err(|e| self.codegen_err(&call.span, e.to_string()));
                }
                let obj = self
                    .analysis
                    .scopes
                    .lookup(ScopeId::MODULE, name)
                    .ok_or_else(|| {
                        CodegenError::from(Diagnostic::undefined_reference(
                            call.name.span.clone(),
                            name,
                        ))
                    })?;
                let v = match obj.node {
                    NodeRef::Func(i) => {
                        let f = self.funcs[i];
                        self.emit_func_decl(f, frame, Some(call), "", ac)?
                    }
                    NodeRef::Alias(i) => self.emit_alias_decl(i)?,
                    NodeRef::Param { .. } => {
                        return Err(self.codegen_err(&call.span, format!("{name} is not bound")))
                    }
                };
                v.expect_fs()
                    .cloned()
                    .map_err(|e| self.codegen_err(&call.span, e.to_string()))
            }
        }
    }

    fn exec_options(
        &mut self,
        call: &CallStmt,
        entries: &[OptionEntry],
    ) -> Result<ExecOptions, CodegenError> {
        let reg = Registry::get();
        let mut opts = ExecOptions::default();
        for entry in entries {
            match entry.name.as_str() {
                "readonlyRootfs" => opts.readonly_rootfs = true,
                "no-cache" => opts.no_cache = true,
                "env" => {
                    if let (Some(k), Some(v)) = (entry.str_arg(0), entry.str_arg(1)) {
                        opts.env.push((k.to_string(), v.to_string()));
                    }
                }
                "dir" => opts.cwd = entry.str_arg(0).map(str::to_string),
                "user" => opts.user = entry.str_arg(0).map(str::to_string),
                "network" => {
                    let mode = entry.str_arg(0).unwrap_or_default().to_string();
                    let valid = reg
                        .enum_values("network")
                        .map_or(false, |vs| vs.iter().any(|v| *v == mode));
                    if !valid {
                        return Err(self.codegen_err(
                            &call.span,
                            format!("invalid network mode {mode:?}"),
                        ));
                    }
                    opts.network = Some(mode);
                }
                "security" => {
                    let mode = entry.str_arg(0).unwrap_or_default().to_string();
                    let valid = reg
                        .enum_values("security")
                        .map_or(false, |vs| vs.iter().any(|v| *v == mode));
                    if !valid {
                        return Err(self.codegen_err(
                            &call.span,
                            format!("invalid security mode {mode:?}"),
                        ));
                    }
                    opts.security = Some(mode);
                }
                "host" => {
                    if let (Some(h), Some(a)) = (entry.str_arg(0), entry.str_arg(1)) {
                        opts.hosts.push(HostEntry {
                            hostname: h.to_string(),
                            address: a.to_string(),
                        });
                    }
                }
                "ssh" => opts.ssh.push(SshOpt::default()),
                "secret" => {
                    let mountpoint = entry.str_arg(0).unwrap_or_default().to_string();
                    opts.secrets.push(SecretOpt {
                        mountpoint,
                        ..SecretOpt::default()
                    });
                }
                "mount" => {
                    let input = entry
                        .fs_arg(0)
                        .cloned()
                        .ok_or_else(|| self.codegen_err(&call.span, "mount expects fs input"))?;
                    let dest = entry.str_arg(1).unwrap_or_default().to_string();
                    let mut spec = MountSpec::new(input, dest);
                    spec.tag = entry.tag;
                    opts.mounts.push(spec);
                }
                _ => {}
            }
        }
        Ok(opts)
    }

    /// Walk a string block. `value` and `format` overwrite the running
    /// value; user calls replace it with their result.
    pub(crate) fn emit_string_block(
        &mut self,
        frame: &FrameVals,
        block: &BlockStmt,
        ac: &mut dyn FnMut(NodeId, &Value),
    ) -> Result<String, CodegenError> {
        let mut current = String::new();
        for call in block.calls() {
            let value = Value::Str(current.clone());
            self.debug_stop(call.id, &call.span, &call.name.text, frame, &value, false)?;
            let name = call.name.text.as_str();
            if Registry::get().is_debug(name) {
                continue;
            }
            current = match name {
                "value" => self.emit_string_expr(frame, &call.args[0], ac)?,
                "format" => {
                    let fmt = self.emit_string_expr(frame, &call.args[0], ac)?;
                    let values = self.emit_string_args(frame, &call.args[1..], ac)?;
                    format_verbs(&fmt, &values)
                        .map_err(|e| self.codegen_err(&call.span, e))?
                }
                _ => {
                    if let Some(v) = frame_lookup(frame, name) {
                        v.expect_str()
                            .map(str::to_string)
                            .map_err(|e| self.codegen_err(&call.span, e.to_string()))?
                    } else {
                        let obj = self
                            .analysis
                            .scopes
                            .lookup(ScopeId::MODULE, name)
                            .ok_or_else(|| {
                                CodegenError::from(Diagnostic::undefined_reference(
                                    call.name.span.clone(),
                                    name,
                                ))
                            })?;
                        let v = match obj.node {
                            NodeRef::Func(i) => {
                                let f = self.funcs[i];
                                self.emit_func_decl(f, frame, Some(call), "", ac)?
                            }
                            NodeRef::Alias(i) => self.emit_alias_decl(i)?,
                            NodeRef::Param { .. } => {
                                return Err(
                                    self.codegen_err(&call.span, format!("{name} is not bound"))
                                )
                            }
                        };
                        v.expect_str()
                            .map(str::to_string)
                            .map_err(|e| self.codegen_err(&call.span, e.to_string()))?
                    }
                }
            };
            if call.alias.is_some() {
                ac(call.id, &Value::Str(current.clone()));
            }
        }
        Ok(current)
    }

    /// Walk an option block, appending one entry per call tagged with the
    /// owning namespace. User option functions splice their entries in.
    pub(crate) fn emit_options(
        &mut self,
        frame: &FrameVals,
        ns: &str,
        block: &BlockStmt,
        ac: &mut dyn FnMut(NodeId, &Value),
    ) -> Result<Vec<OptionEntry>, CodegenError> {
        let reg = Registry::get();
        let mut entries = Vec::new();
        for call in block.calls() {
            let value = Value::Options(entries.clone());
            self.debug_stop(call.id, &call.span, &call.name.text, frame, &value, false)?;
            let name = call.name.text.as_str();
            if reg.is_debug(name) {
                continue;
            }

            let effective = ObjType::Option(hlblang::ast::OptionNs::parse(ns));
            if let Some(sig) = reg.signature(effective, name) {
                let args = self.eval_sig_args(frame, sig, &call.args, ns, ac)?;
                entries.push(OptionEntry {
                    ns: ns.to_string(),
                    name: name.to_string(),
                    args,
                    tag: call.alias.as_ref().map(|_| u64::from(call.id)),
                });
                continue;
            }

            // user-defined option function
            if let Some(v) = frame_lookup(frame, name) {
                let nested = v
                    .expect_options()
                    .map_err(|e| self.codegen_err(&call.span, e.to_string()))?;
                entries.extend(nested.iter().cloned());
                continue;
            }
            let obj = self
                .analysis
                .scopes
                .lookup(ScopeId::MODULE, name)
                .ok_or_else(|| {
                    CodegenError::from(Diagnostic::undefined_reference(
                        call.name.span.clone(),
                        name,
                    ))
                })?;
            let v = match obj.node {
                NodeRef::Func(i) => {
                    let f = self.funcs[i];
                    self.emit_func_decl(f, frame, Some(call), ns, ac)?
                }
                NodeRef::Alias(i) => self.emit_alias_decl(i)?,
                NodeRef::Param { .. } => {
                    return Err(self.codegen_err(&call.span, format!("{name} is not bound")))
                }
            };
            let nested = v
                .expect_options()
                .map_err(|e| self.codegen_err(&call.span, e.to_string()))?;
            entries.extend(nested.iter().cloned());
        }
        Ok(entries)
    }

    /// Evaluate call arguments against a builtin signature, flattening a
    /// trailing variadic parameter.
    fn eval_sig_args(
        &mut self,
        frame: &FrameVals,
        sig: &[hlblang::builtin::BuiltinField],
        args: &[hlblang::ast::Expr],
        op: &str,
        ac: &mut dyn FnMut(NodeId, &Value),
    ) -> Result<Vec<Value>, CodegenError> {
        let mut out = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let typ = sig
                .get(i)
                .or_else(|| sig.last().filter(|f| f.variadic))
                .map(|f| f.typ)
                .unwrap_or(ObjType::Str);
            let v = match typ {
                ObjType::Str => Value::Str(self.emit_string_expr(frame, arg, ac)?),
                ObjType::Int => Value::Int(self.emit_int_expr(frame, arg)?),
                ObjType::Bool => Value::Bool(self.emit_bool_expr(frame, arg)?),
                ObjType::Fs => Value::Filesystem(self.emit_fs_expr(frame, arg, ac)?),
                ObjType::Option(_) => Value::Options(self.emit_option_expr(frame, arg, op, ac)?),
            };
            out.push(v);
        }
        Ok(out)
    }

    fn emit_string_args(
        &mut self,
        frame: &FrameVals,
        args: &[hlblang::ast::Expr],
        ac: &mut dyn FnMut(NodeId, &Value),
    ) -> Result<Vec<String>, CodegenError> {
        args.iter()
            .map(|a| self.emit_string_expr(frame, a, ac))
            .collect()
    }
}

fn entry_str(entries: &[OptionEntry], name: &str) -> Option<String> {
    entries
        .iter()
        .find(|e| e.name == name)
        .and_then(|e| e.str_arg(0))
        .map(str::to_string)
}

fn common_attrs(entries: &[OptionEntry]) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    if entries.iter().any(|e| e.name == "no-cache") {
        attrs.insert("no-cache".to_string(), "true".to_string());
    }
    attrs
}

/// Substitute `%s`/`%d`/`%v` verbs positionally; `%%` escapes a percent.
pub(crate) fn format_verbs(fmt: &str, values: &[String]) -> Result<String, String> {
    let mut out = String::with_capacity(fmt.len());
    let mut values_iter = values.iter();
    let mut chars = fmt.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('s') | Some('d') | Some('v') => match values_iter.next() {
                Some(v) => out.push_str(v),
                None => return Err(format!("format {fmt:?} has more verbs than values")),
            },
            Some(other) => return Err(format!("unsupported format verb %{other}")),
            None => return Err("format string ends with bare %".to_string()),
        }
    }
    if values_iter.next().is_some() {
        return Err(format!("format {fmt:?} has fewer verbs than values"));
    }
    Ok(out)
}
