use hlblang::source::{IndexedBuffer, SourceMap};

fn sources_for(src: &[u8]) -> SourceMap {
    let mut map = SourceMap::new();
    map.insert(
        std::sync::Arc::from("test.hlb"),
        IndexedBuffer::from_bytes(src.to_vec()),
    );
    map
}

#[test]
fn renders_a_caret_under_the_offending_token() {
    let src = b"fs bad() {\n\trun \"echo\"\n}\n";
    let (module, _) = hlblang::parse_module(src, "test.hlb").unwrap();
    let err = hlblang::check(&module).unwrap_err();
    let rendered = err.render(&sources_for(src), false);

    assert!(rendered.contains("test.hlb:2:2"), "{rendered}");
    assert!(rendered.contains("run \"echo\""), "{rendered}");
    assert!(rendered.contains("^^^"), "{rendered}");
    assert!(rendered.contains("semantic error"), "{rendered}");
    // plain mode carries no escape codes
    assert!(!rendered.contains('\x1b'), "{rendered}");
}

#[test]
fn color_mode_emits_ansi_codes() {
    let src = b"fs bad() {\n\trun \"echo\"\n}\n";
    let (module, _) = hlblang::parse_module(src, "test.hlb").unwrap();
    let err = hlblang::check(&module).unwrap_err();
    let rendered = err.render(&sources_for(src), true);
    assert!(rendered.contains('\x1b'));
}

#[test]
fn duplicate_decls_render_every_site() {
    let src = b"fs x() {\n\tscratch\n}\nfs x() {\n\tscratch\n}\n";
    let (module, _) = hlblang::parse_module(src, "test.hlb").unwrap();
    let err = hlblang::check(&module).unwrap_err();
    let rendered = err.render(&sources_for(src), false);
    assert!(rendered.contains("test.hlb:1:4"), "{rendered}");
    assert!(rendered.contains("test.hlb:4:4"), "{rendered}");
    assert!(rendered.contains("first declared here"), "{rendered}");
    assert!(rendered.contains("declared again here"), "{rendered}");
}

#[test]
fn parse_errors_render_a_help_line() {
    let src = b"fs () {}\n";
    let err = hlblang::parse_module(src, "test.hlb").unwrap_err();
    let rendered = err.render(&sources_for(src), false);
    assert!(rendered.contains("syntax error"), "{rendered}");
    assert!(rendered.contains("help:"), "{rendered}");
    assert!(rendered.contains("identifier"), "{rendered}");
}

#[test]
fn short_display_has_position_and_severity() {
    let src = b"fs bad() {\n\trun \"echo\"\n}\n";
    let (module, _) = hlblang::parse_module(src, "test.hlb").unwrap();
    let err = hlblang::check(&module).unwrap_err();
    let display = err.to_string();
    assert!(display.contains("test.hlb:2:2"), "{display}");
    assert!(display.contains("error"), "{display}");
}
