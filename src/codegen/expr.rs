//! Expression evaluators, one per value kind. Identifiers resolve through
//! the current frame first, then the module scope.

use hlblang::ast::{Expr, ExprKind, LitKind, NodeId};
use hlblang::diag::Diagnostic;
use hlblang::scope::{NodeRef, ScopeId};
use opgraph::{FsState, OptionEntry, Value};

use super::{frame_lookup, CodeGen, CodegenError, FrameVals};

impl<'m> CodeGen<'m> {
    fn module_value(
        &mut self,
        frame: &FrameVals,
        name: &str,
        expr: &Expr,
        op: &str,
        ac: &mut dyn FnMut(NodeId, &Value),
    ) -> Result<Value, CodegenError> {
        if let Some(v) = frame_lookup(frame, name) {
            return Ok(v.clone());
        }
        let obj = self
            .analysis
            .scopes
            .lookup(ScopeId::MODULE, name)
            .ok_or_else(|| {
                CodegenError::from(Diagnostic::undefined_reference(expr.span.clone(), name))
            })?;
        match obj.node {
            NodeRef::Func(i) => {
                let f = self.funcs[i];
                self.emit_func_decl(f, frame, None, op, ac)
            }
            NodeRef::Alias(i) => self.emit_alias_decl(i),
            NodeRef::Param { .. } => Err(CodegenError::from(Diagnostic::codegen(
                expr.span.clone(),
                format!("{name} is not bound"),
            ))),
        }
    }

    pub(crate) fn emit_string_expr(
        &mut self,
        frame: &FrameVals,
        expr: &Expr,
        ac: &mut dyn FnMut(NodeId, &Value),
    ) -> Result<String, CodegenError> {
        match &expr.kind {
            ExprKind::Ident(id) => {
                let v = self.module_value(frame, &id.text, expr, "", ac)?;
                v.expect_str().map(str::to_string).map_err(|e| {
                    CodegenError::from(Diagnostic::codegen(expr.span.clone(), e.to_string()))
                })
            }
            ExprKind::Lit(lit) => match &lit.kind {
                LitKind::Str(s) => Ok(s.clone()),
                other => Err(CodegenError::from(Diagnostic::codegen(
                    expr.span.clone(),
                    format!("expected string literal, found {other:?}"),
                ))),
            },
            ExprKind::FuncLit(fl) => self.emit_string_block(frame, &fl.body, ac),
        }
    }

    pub(crate) fn emit_int_expr(
        &mut self,
        frame: &FrameVals,
        expr: &Expr,
    ) -> Result<i64, CodegenError> {
        match &expr.kind {
            ExprKind::Ident(id) => match frame_lookup(frame, &id.text) {
                Some(v) => v.expect_int().map_err(|e| {
                    CodegenError::from(Diagnostic::codegen(expr.span.clone(), e.to_string()))
                }),
                None => Err(CodegenError::from(Diagnostic::undefined_reference(
                    expr.span.clone(),
                    &id.text,
                ))),
            },
            ExprKind::Lit(lit) => match &lit.kind {
                LitKind::Int(int) => Ok(int.value),
                other => Err(CodegenError::from(Diagnostic::codegen(
                    expr.span.clone(),
                    format!("expected integer literal, found {other:?}"),
                ))),
            },
            ExprKind::FuncLit(_) => Err(CodegenError::from(Diagnostic::codegen(
                expr.span.clone(),
                "int function literals are not supported".to_string(),
            ))),
        }
    }

    pub(crate) fn emit_bool_expr(
        &mut self,
        frame: &FrameVals,
        expr: &Expr,
    ) -> Result<bool, CodegenError> {
        match &expr.kind {
            ExprKind::Ident(id) => match frame_lookup(frame, &id.text) {
                Some(v) => v.expect_bool().map_err(|e| {
                    CodegenError::from(Diagnostic::codegen(expr.span.clone(), e.to_string()))
                }),
                None => Err(CodegenError::from(Diagnostic::undefined_reference(
                    expr.span.clone(),
                    &id.text,
                ))),
            },
            ExprKind::Lit(lit) => match &lit.kind {
                LitKind::Bool(b) => Ok(*b),
                other => Err(CodegenError::from(Diagnostic::codegen(
                    expr.span.clone(),
                    format!("expected bool literal, found {other:?}"),
                ))),
            },
            ExprKind::FuncLit(_) => Err(CodegenError::from(Diagnostic::codegen(
                expr.span.clone(),
                "bool function literals are not supported".to_string(),
            ))),
        }
    }

    pub(crate) fn emit_fs_expr(
        &mut self,
        frame: &FrameVals,
        expr: &Expr,
        ac: &mut dyn FnMut(NodeId, &Value),
    ) -> Result<FsState, CodegenError> {
        match &expr.kind {
            ExprKind::Ident(id) if id.text == "scratch" => Ok(FsState::scratch()),
            ExprKind::Ident(id) => {
                let v = self.module_value(frame, &id.text, expr, "", ac)?;
                v.expect_fs().cloned().map_err(|e| {
                    CodegenError::from(Diagnostic::codegen(expr.span.clone(), e.to_string()))
                })
            }
            ExprKind::Lit(_) => Err(CodegenError::from(Diagnostic::codegen(
                expr.span.clone(),
                "a literal cannot be a filesystem".to_string(),
            ))),
            ExprKind::FuncLit(fl) => self.emit_fs_block(frame, &fl.body, ac),
        }
    }

    pub(crate) fn emit_option_expr(
        &mut self,
        frame: &FrameVals,
        expr: &Expr,
        op: &str,
        ac: &mut dyn FnMut(NodeId, &Value),
    ) -> Result<Vec<OptionEntry>, CodegenError> {
        match &expr.kind {
            ExprKind::Ident(id) => {
                let v = self.module_value(frame, &id.text, expr, op, ac)?;
                v.expect_options().map(|e| e.to_vec()).map_err(|e| {
                    CodegenError::from(Diagnostic::codegen(expr.span.clone(), e.to_string()))
                })
            }
            ExprKind::Lit(_) => Err(CodegenError::from(Diagnostic::codegen(
                expr.span.clone(),
                "a literal cannot be an option block".to_string(),
            ))),
            ExprKind::FuncLit(fl) => self.emit_options(frame, op, &fl.body, ac),
        }
    }
}
