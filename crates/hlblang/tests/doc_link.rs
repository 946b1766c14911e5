use hlblang::doc::link_docs;

#[test]
fn attaches_adjacent_comment_groups_to_functions() {
    let src = b"# builds the base image
# for all services
fs base() {
\timage \"alpine\"
}
";
    let (mut module, _) = hlblang::parse_module(src, "test.hlb").unwrap();
    link_docs(&mut module);
    let f = module.func_named("base").unwrap();
    let doc = f.doc.as_ref().unwrap();
    assert_eq!(doc.comments.len(), 2);
    assert_eq!(doc.comments[0].text, " builds the base image");
}

#[test]
fn a_blank_line_breaks_the_link() {
    let src = b"# orphan comment

fs base() {
\timage \"alpine\"
}
";
    let (mut module, _) = hlblang::parse_module(src, "test.hlb").unwrap();
    link_docs(&mut module);
    assert!(module.func_named("base").unwrap().doc.is_none());
}

#[test]
fn attaches_docs_to_call_statements() {
    let src = b"fs base() {
\t# pull the base image
\timage \"alpine\"
\trun \"true\"
}
";
    let (mut module, _) = hlblang::parse_module(src, "test.hlb").unwrap();
    link_docs(&mut module);
    let f = module.func_named("base").unwrap();
    let body = f.body.as_ref().unwrap();
    let image = body.calls().next().unwrap();
    assert_eq!(
        image.doc.as_ref().unwrap().comments[0].text,
        " pull the base image"
    );
    assert!(body.calls().nth(1).unwrap().doc.is_none());
}

#[test]
fn consumed_groups_are_dropped_from_the_tree() {
    let src = b"# doc
fs base() {
\t# inner
\timage \"alpine\"
}
";
    let (mut module, _) = hlblang::parse_module(src, "test.hlb").unwrap();
    link_docs(&mut module);
    assert_eq!(module.decls.len(), 1);
    let f = module.func_named("base").unwrap();
    assert_eq!(f.body.as_ref().unwrap().stmts.len(), 1);
}
