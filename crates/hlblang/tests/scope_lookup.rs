use hlblang::scope::{NodeRef, ObjKind};

#[test]
fn lookup_walks_to_the_module_scope() {
    let src = b"fs base() {\n\tscratch\n}\nfs child(string ref) {\n\timage ref\n}\n";
    let (module, _) = hlblang::parse_module(src, "test.hlb").unwrap();
    let analysis = hlblang::check(&module).unwrap();

    let child = module.func_named("child").unwrap();
    let scope = analysis.scope_of(child);

    // the parameter resolves locally
    let param = analysis.scopes.lookup(scope, "ref").unwrap();
    assert_eq!(param.kind, ObjKind::Field);

    // sibling functions resolve through the parent chain
    let base = analysis.scopes.lookup(scope, "base").unwrap();
    assert_eq!(base.kind, ObjKind::Decl);
    assert!(matches!(base.node, NodeRef::Func(0)));
}

#[test]
fn lookup_is_none_iff_nothing_is_reachable() {
    let src = b"fs base() {\n\tscratch\n}\n";
    let (module, _) = hlblang::parse_module(src, "test.hlb").unwrap();
    let analysis = hlblang::check(&module).unwrap();

    let base = module.func_named("base").unwrap();
    let scope = analysis.scope_of(base);
    assert!(analysis.scopes.lookup(scope, "nope").is_none());
    assert!(analysis.scopes.lookup(scope, "base").is_some());
}

#[test]
fn aliases_land_in_the_module_scope() {
    let src = b"fs build() {
\timage \"alpine\"
\trun \"make\" with option {
\t\tmount scratch \"/out\" as artifacts
\t}
}
";
    let (module, _) = hlblang::parse_module(src, "test.hlb").unwrap();
    let analysis = hlblang::check(&module).unwrap();

    let alias = analysis
        .scopes
        .lookup(hlblang::scope::ScopeId::MODULE, "artifacts")
        .unwrap();
    assert!(matches!(alias.node, NodeRef::Alias(0)));
    assert_eq!(analysis.aliases.len(), 1);
    assert_eq!(analysis.aliases[0].ident.text, "artifacts");
}

#[test]
fn defined_lists_nearest_first_without_shadowed_repeats() {
    let src = b"fs base() {\n\tscratch\n}\nfs child(fs base) {\n\tbase\n}\n";
    let (module, _) = hlblang::parse_module(src, "test.hlb").unwrap();
    let analysis = hlblang::check(&module).unwrap();

    let child = module.func_named("child").unwrap();
    let scope = analysis.scope_of(child);
    let defined = analysis.scopes.defined(scope);

    let bases: Vec<_> = defined.iter().filter(|o| o.name == "base").collect();
    assert_eq!(bases.len(), 1, "shadowed names appear once");
    assert_eq!(bases[0].kind, ObjKind::Field, "the nearest binding wins");
}
