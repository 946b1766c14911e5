use hlblang::diag::DiagKind;

#[test]
fn duplicate_declarations_report_both_spans() {
    let src = b"fs x() {\n\tscratch\n}\nfs x() {\n\tscratch\n}\n";
    let (module, _) = hlblang::parse_module(src, "test.hlb").unwrap();
    let err = hlblang::check(&module).unwrap_err();
    assert_eq!(err.diagnostics.len(), 1);
    let d = &err.diagnostics[0];
    assert_eq!(d.kind, DiagKind::DuplicateDecl);
    assert_eq!(d.groups.len(), 2);
    assert_eq!(d.groups[0].pos.line, 1);
    assert_eq!(d.groups[1].pos.line, 4);
}

#[test]
fn duplicates_short_circuit_body_checks() {
    // the empty bodies would be NoSource errors, but duplicate detection
    // returns first to avoid cascades
    let src = b"fs x() {}\nfs x() {}\n";
    let (module, _) = hlblang::parse_module(src, "test.hlb").unwrap();
    let err = hlblang::check(&module).unwrap_err();
    assert_eq!(err.diagnostics.len(), 1);
    assert_eq!(err.diagnostics[0].kind, DiagKind::DuplicateDecl);
}

#[test]
fn duplicate_parameters_are_rejected() {
    let src = b"fs f(string a, string a) {\n\timage \"alpine\"\n}\n";
    let (module, _) = hlblang::parse_module(src, "test.hlb").unwrap();
    let err = hlblang::check(&module).unwrap_err();
    assert_eq!(err.diagnostics[0].kind, DiagKind::DuplicateField);
    assert_eq!(err.diagnostics[0].groups.len(), 2);
}

#[test]
fn distinct_names_pass() {
    let src = b"fs x() {\n\tscratch\n}\nfs y() {\n\tscratch\n}\n";
    let (module, _) = hlblang::parse_module(src, "test.hlb").unwrap();
    assert!(hlblang::check(&module).is_ok());
}
