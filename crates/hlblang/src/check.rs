//! Semantic analysis: scoping, duplicate detection, source/ordering rules,
//! and call signature checks. Runs in two phases; declaration-level errors
//! short-circuit the per-function checks to avoid cascades.

use std::collections::HashMap;

use crate::ast::*;
use crate::builtin::{BuiltinField, Registry};
use crate::diag::{Diagnostic, Error};
use crate::scope::{NodeRef, ObjKind, Object, ScopeId, Scopes};

/// The artifact of a successful semantic pass. The AST itself stays
/// untouched; resolution state lives here.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub scopes: Scopes,
    /// FuncDecl id -> the function's own scope.
    pub fn_scope: HashMap<NodeId, ScopeId>,
    pub aliases: Vec<AliasDecl>,
}

impl Analysis {
    pub fn scope_of(&self, f: &FuncDecl) -> ScopeId {
        self.fn_scope.get(&f.id).copied().unwrap_or(ScopeId::MODULE)
    }
}

pub fn check(module: &Module) -> Result<Analysis, Error> {
    let funcs: Vec<&FuncDecl> = module.funcs().collect();
    let mut scopes = Scopes::new();
    let mut fn_scope = HashMap::new();
    let mut aliases = Vec::new();

    // Phase A: declaration scope.
    let mut dups: Vec<(String, Vec<Span>)> = Vec::new();
    for (i, f) in funcs.iter().enumerate() {
        if let Some(existing) = scopes.lookup_local(ScopeId::MODULE, &f.name.text) {
            let first_span = match existing.node {
                NodeRef::Func(j) => funcs[j].name.span.clone(),
                _ => f.name.span.clone(),
            };
            match dups.iter_mut().find(|(n, _)| n == &f.name.text) {
                Some((_, spans)) => spans.push(f.name.span.clone()),
                None => dups.push((f.name.text.clone(), vec![first_span, f.name.span.clone()])),
            }
            continue;
        }
        scopes.insert(
            ScopeId::MODULE,
            Object {
                kind: ObjKind::Decl,
                name: f.name.text.clone(),
                node: NodeRef::Func(i),
            },
        );

        let fs = scopes.push(ScopeId::MODULE);
        fn_scope.insert(f.id, fs);
        for (pi, param) in f.params.iter().enumerate() {
            scopes.insert(
                fs,
                Object {
                    kind: ObjKind::Field,
                    name: param.name.text.clone(),
                    node: NodeRef::Param { func: i, param: pi },
                },
            );
        }

        if let Some(body) = &f.body {
            register_aliases(&mut scopes, &mut aliases, i, body);
        }
    }

    if !dups.is_empty() {
        let diagnostics = dups
            .into_iter()
            .map(|(name, spans)| Diagnostic::duplicate_decl(&name, spans))
            .collect();
        return Err(Error::from_vec(diagnostics));
    }

    let analysis = Analysis {
        scopes,
        fn_scope,
        aliases,
    };

    // Phase B: body checks, collecting one error per failing function.
    let mut errs = Vec::new();
    for f in &funcs {
        if let Err(d) = check_field_list(&f.params) {
            errs.push(d);
            continue;
        }
        let Some(body) = &f.body else { continue };
        let scope = analysis.scope_of(f);
        let op = f.typ.obj.subtype();
        if let Err(d) = check_block(&analysis, &funcs, scope, f.typ.obj, body, op) {
            errs.push(d);
        }
    }

    if !errs.is_empty() {
        return Err(Error::from_vec(errs));
    }
    Ok(analysis)
}

/// Record every `as` clause inside a function body (function literal bodies
/// included) as an alias declaration in the module scope.
fn register_aliases(
    scopes: &mut Scopes,
    aliases: &mut Vec<AliasDecl>,
    func_index: usize,
    block: &BlockStmt,
) {
    for call in block.calls() {
        if let Some(ident) = &call.alias {
            let idx = aliases.len();
            aliases.push(AliasDecl {
                ident: ident.clone(),
                func: func_index,
                call: call.id,
            });
            scopes.insert(
                ScopeId::MODULE,
                Object {
                    kind: ObjKind::Decl,
                    name: ident.text.clone(),
                    node: NodeRef::Alias(idx),
                },
            );
        }
        for arg in &call.args {
            if let Some(fl) = arg.as_func_lit() {
                register_aliases(scopes, aliases, func_index, &fl.body);
            }
        }
        if let Some(with) = &call.with_opt {
            if let Some(fl) = with.as_func_lit() {
                register_aliases(scopes, aliases, func_index, &fl.body);
            }
        }
    }
}

fn check_field_list(fields: &[Field]) -> Result<(), Diagnostic> {
    let mut seen: HashMap<&str, &Field> = HashMap::new();
    let mut dup_spans: Vec<Span> = Vec::new();
    let mut dup_name = String::new();
    for field in fields {
        if let Some(first) = seen.get(field.name.text.as_str()) {
            if dup_spans.is_empty() {
                dup_name = field.name.text.clone();
                dup_spans.push(first.name.span.clone());
            }
            dup_spans.push(field.name.span.clone());
            continue;
        }
        seen.insert(&field.name.text, field);
    }
    if dup_spans.is_empty() {
        Ok(())
    } else {
        Err(Diagnostic::duplicate_field(&dup_name, dup_spans))
    }
}

/// The resolved return type of a scope object, if it can head a call.
fn object_type(funcs: &[&FuncDecl], analysis: &Analysis, obj: &Object) -> Option<ObjType> {
    match obj.node {
        NodeRef::Func(i) => Some(funcs[i].typ.obj),
        NodeRef::Alias(a) => {
            let alias = analysis.aliases.get(a)?;
            Some(funcs[alias.func].typ.obj)
        }
        NodeRef::Param { func, param } => Some(funcs[func].params.get(param)?.typ.obj),
    }
}

fn check_block(
    analysis: &Analysis,
    funcs: &[&FuncDecl],
    scope: ScopeId,
    typ: ObjType,
    block: &BlockStmt,
    op: Option<OptionNs>,
) -> Result<(), Diagnostic> {
    if typ.is_option() {
        return check_option_block(analysis, funcs, scope, block, op);
    }

    if block.num_calls() == 0 {
        return Err(Diagnostic::no_source(block.span.clone(), &typ.to_string()));
    }

    let reg = Registry::get();
    let mut found_source = false;
    let mut index: usize = 0;

    for call in block.calls() {
        let name = call.name.text.as_str();
        if reg.is_debug(name) {
            continue;
        }

        if !found_source {
            if !reg.is_source(typ, name) {
                let resolved = analysis
                    .scopes
                    .lookup(scope, name)
                    .and_then(|obj| object_type(funcs, analysis, obj));
                match resolved {
                    Some(t) if t.equals(typ) => {}
                    _ => {
                        return Err(Diagnostic::first_source(
                            call.name.span.clone(),
                            name,
                            &typ.to_string(),
                        ))
                    }
                }
            }
            found_source = true;
            check_call(analysis, funcs, scope, typ, index, call, op)?;
            index += 1;
            continue;
        }

        if reg.is_source(typ, name) {
            return Err(Diagnostic::only_first_source(call.name.span.clone(), name));
        }

        check_call(analysis, funcs, scope, typ, index, call, op)?;
        index += 1;
    }

    Ok(())
}

fn check_option_block(
    analysis: &Analysis,
    funcs: &[&FuncDecl],
    scope: ScopeId,
    block: &BlockStmt,
    op: Option<OptionNs>,
) -> Result<(), Diagnostic> {
    for (index, call) in block.calls().enumerate() {
        check_call(analysis, funcs, scope, ObjType::Option(op), index, call, op)?;
    }
    Ok(())
}

fn check_call(
    analysis: &Analysis,
    funcs: &[&FuncDecl],
    scope: ScopeId,
    typ: ObjType,
    index: usize,
    call: &CallStmt,
    op: Option<OptionNs>,
) -> Result<(), Diagnostic> {
    let reg = Registry::get();
    let name = call.name.text.as_str();

    let effective = match typ {
        ObjType::Option(_) => ObjType::Option(op),
        other => other,
    };

    let allowed = reg.allowed_names(effective, index == 0);

    let params: Vec<BuiltinField> = if allowed.iter().any(|n| *n == name) {
        let sig = reg.signature(effective, name).unwrap_or(&[]);
        expand_variadic(sig, call.args.len())
    } else {
        let obj = analysis
            .scopes
            .lookup(scope, name)
            .ok_or_else(|| Diagnostic::invalid_func(call.name.span.clone(), name))?;
        let fields: Vec<BuiltinField> = match (obj.kind, obj.node) {
            (ObjKind::Decl, NodeRef::Func(i)) => field_sig(&funcs[i].params),
            (ObjKind::Decl, NodeRef::Alias(a)) => field_sig(&funcs[analysis.aliases[a].func].params),
            _ => vec![],
        };
        expand_variadic(&fields, call.args.len())
    };

    if params.len() != call.args.len() {
        return Err(Diagnostic::num_args(
            call.name.span.clone(),
            name,
            params.len(),
            call.args.len(),
        ));
    }

    for (param, arg) in params.iter().zip(&call.args) {
        match &arg.kind {
            ExprKind::Ident(id) => check_ident_arg(analysis, funcs, scope, param.typ, id)?,
            ExprKind::Lit(lit) => check_basic_lit_arg(param.typ, lit)?,
            ExprKind::FuncLit(fl) => {
                check_func_lit_arg(analysis, funcs, scope, param.typ, fl, OptionNs::parse(name))?
            }
        }
    }

    if let Some(with) = &call.with_opt {
        match &with.kind {
            ExprKind::Ident(id) => {
                check_ident_arg(analysis, funcs, scope, ObjType::Option(None), id)?
            }
            ExprKind::FuncLit(fl) => check_func_lit_arg(
                analysis,
                funcs,
                scope,
                ObjType::Option(None),
                fl,
                OptionNs::parse(name),
            )?,
            ExprKind::Lit(lit) => {
                return Err(Diagnostic::wrong_arg_type(
                    lit.span.clone(),
                    "option",
                    &lit.obj_type().to_string(),
                ))
            }
        }
    }

    Ok(())
}

fn field_sig(fields: &[Field]) -> Vec<BuiltinField> {
    fields
        .iter()
        .map(|f| BuiltinField {
            name: "",
            typ: f.typ.obj,
            variadic: f.variadic,
        })
        .collect()
}

/// Expand a trailing variadic parameter into one synthetic parameter per
/// trailing argument.
fn expand_variadic(fields: &[BuiltinField], nargs: usize) -> Vec<BuiltinField> {
    let mut params: Vec<BuiltinField> = fields.to_vec();
    if let Some(last) = params.last().cloned() {
        if last.variadic {
            params.pop();
            while params.len() < nargs {
                params.push(BuiltinField {
                    name: last.name,
                    typ: last.typ,
                    variadic: false,
                });
            }
        }
    }
    params
}

fn check_ident_arg(
    analysis: &Analysis,
    funcs: &[&FuncDecl],
    scope: ScopeId,
    typ: ObjType,
    ident: &Ident,
) -> Result<(), Diagnostic> {
    // nullary builtin sources (`scratch`) pass as bare value arguments
    let reg = Registry::get();
    if reg.is_source(typ, &ident.text)
        && reg
            .signature(typ, &ident.text)
            .map_or(false, |sig| sig.is_empty())
    {
        return Ok(());
    }

    let obj = analysis
        .scopes
        .lookup(scope, &ident.text)
        .ok_or_else(|| Diagnostic::ident_not_defined(ident.span.clone(), &ident.text))?;

    match (obj.kind, obj.node) {
        (ObjKind::Decl, NodeRef::Func(i)) => {
            if funcs[i].num_params() > 0 {
                return Err(Diagnostic::func_arg(ident.span.clone(), &ident.text));
            }
        }
        (ObjKind::Decl, NodeRef::Alias(a)) => {
            if funcs[analysis.aliases[a].func].num_params() > 0 {
                return Err(Diagnostic::func_arg(ident.span.clone(), &ident.text));
            }
        }
        (ObjKind::Field, NodeRef::Param { func, param }) => {
            let field_typ = funcs[func].params[param].typ.obj;
            if !field_typ.equals(typ) {
                return Err(Diagnostic::wrong_arg_type(
                    ident.span.clone(),
                    &typ.to_string(),
                    &field_typ.to_string(),
                ));
            }
        }
        _ => {}
    }
    Ok(())
}

fn check_basic_lit_arg(typ: ObjType, lit: &BasicLit) -> Result<(), Diagnostic> {
    let ok = matches!(
        (typ, &lit.kind),
        (ObjType::Str, LitKind::Str(_))
            | (ObjType::Int, LitKind::Int(_))
            | (ObjType::Bool, LitKind::Bool(_))
    );
    if ok {
        Ok(())
    } else {
        Err(Diagnostic::wrong_arg_type(
            lit.span.clone(),
            &typ.to_string(),
            &lit.obj_type().to_string(),
        ))
    }
}

fn check_func_lit_arg(
    analysis: &Analysis,
    funcs: &[&FuncDecl],
    scope: ScopeId,
    typ: ObjType,
    lit: &FuncLit,
    op: Option<OptionNs>,
) -> Result<(), Diagnostic> {
    if !lit.typ.obj.equals(typ) {
        return Err(Diagnostic::wrong_arg_type(
            lit.typ.span.clone(),
            &typ.to_string(),
            &lit.typ.obj.to_string(),
        ));
    }
    check_block(analysis, funcs, scope, lit.typ.obj, &lit.body, op)
}
