use hlblang::diag::{DiagKind, Severity};
use hlblang::lint::{lint, LintConfig};

fn findings(src: &[u8], config: LintConfig) -> Vec<hlblang::Diagnostic> {
    let (module, _) = hlblang::parse_module(src, "test.hlb").unwrap();
    lint(&module, config)
}

#[test]
fn decimal_file_modes_are_flagged() {
    let found = findings(
        b"fs x() {\n\tscratch\n\tmkdir \"d\" 777\n}\n",
        LintConfig::default(),
    );
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].kind, DiagKind::NonOctalFileMode);
    assert_eq!(found[0].severity, Severity::Warning);
    assert!(found[0].message.contains("decimal"), "{}", found[0].message);
}

#[test]
fn octal_file_modes_pass() {
    let found = findings(
        b"fs x() {\n\tscratch\n\tmkdir \"d\" 0o755\n\tmkfile \"f\" 0o644 \"hi\"\n}\n",
        LintConfig::default(),
    );
    assert!(found.is_empty());
}

#[test]
fn hex_file_modes_are_flagged_with_their_base() {
    let found = findings(
        b"fs x() {\n\tscratch\n\tmkfile \"f\" 0x1ff \"hi\"\n}\n",
        LintConfig::default(),
    );
    assert_eq!(found.len(), 1);
    assert!(found[0].message.contains("hexadecimal"));
}

#[test]
fn option_block_chmod_is_linted() {
    let src = b"fs x() {\n\thttp \"https://example.com/f\" with option {\n\t\tchmod 644\n\t}\n}\n";
    let found = findings(src, LintConfig::default());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].kind, DiagKind::NonOctalFileMode);
}

#[test]
fn severity_is_configurable() {
    let config = LintConfig {
        non_octal_file_mode: Severity::Error,
    };
    let found = findings(b"fs x() {\n\tscratch\n\tmkdir \"d\" 777\n}\n", config);
    assert_eq!(found[0].severity, Severity::Error);
}

#[test]
fn deprecated_imports_are_flagged() {
    let found = findings(b"import utils \"./utils.hlb\"\n", LintConfig::default());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].kind, DiagKind::Deprecated);
}
