use crate::ast::*;

/// Attach each comment group whose last line ends immediately before a
/// declaration or call statement as that node's doc. Consumed or not,
/// comment groups are then dropped from the tree; the raw source keeps them
/// retrievable by position.
pub fn link_docs(module: &mut Module) {
    let mut last_cg: Option<CommentGroup> = None;

    for decl in &mut module.decls {
        match decl {
            Decl::Comment(cg) => last_cg = Some(cg.clone()),
            Decl::Func(f) => {
                if let Some(cg) = &last_cg {
                    if cg.end_line() == f.span.start.line.saturating_sub(1) {
                        f.doc = Some(cg.clone());
                    }
                }
                last_cg = None;
                if let Some(body) = &mut f.body {
                    link_block(body);
                }
            }
            _ => last_cg = None,
        }
    }

    module.decls.retain(|d| !matches!(d, Decl::Comment(_)));
}

fn link_block(block: &mut BlockStmt) {
    let mut last_cg: Option<CommentGroup> = None;

    for stmt in &mut block.stmts {
        match stmt {
            Stmt::Comment(cg) => last_cg = Some(cg.clone()),
            Stmt::Call(call) => {
                if let Some(cg) = &last_cg {
                    if cg.end_line() == call.span.start.line.saturating_sub(1) {
                        call.doc = Some(cg.clone());
                    }
                }
                last_cg = None;

                for arg in &mut call.args {
                    if let ExprKind::FuncLit(fl) = &mut arg.kind {
                        link_block(&mut fl.body);
                    }
                }
                if let Some(with) = &mut call.with_opt {
                    if let ExprKind::FuncLit(fl) = &mut with.kind {
                        link_block(&mut fl.body);
                    }
                }
            }
        }
    }

    block.stmts.retain(|s| !matches!(s, Stmt::Comment(_)));
}
