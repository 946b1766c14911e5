use hlb::codegen::local::LocalEnv;
use hlb::codegen::CodeGen;
use hlb::compile_target;
use hlblang::lint::LintConfig;
use opgraph::Op;

#[test]
fn paths_resolve_against_the_working_directory() {
    let env = LocalEnv::new("/work");
    assert_eq!(env.resolve("src").unwrap(), "/work/src");
    assert_eq!(env.resolve("a/./b/../c").unwrap(), "/work/a/c");
    assert_eq!(env.resolve(".").unwrap(), "/work");
}

#[test]
fn escaping_the_working_directory_is_rejected() {
    let env = LocalEnv::new("/work");
    assert!(env.resolve("../secrets").unwrap_err().to_string().contains("escapes"));
    assert!(env.resolve("a/../../x").is_err());
    assert!(env.resolve("/absolute").is_err());
}

#[test]
fn env_vars_shadow_in_insertion_order() {
    let mut env = LocalEnv::new("/work");
    env.vars.push(("PATH".to_string(), "/usr/bin".to_string()));
    env.vars.push(("PATH".to_string(), "/usr/local/bin".to_string()));
    assert_eq!(env.var("PATH"), Some("/usr/local/bin"));
    assert_eq!(env.var("HOME"), None);
}

#[test]
fn local_sources_use_the_resolved_path() {
    let src = b"fs vendor() {\n\tlocal \"vendor\"\n}\n";
    let compiled = hlb::parse_and_check("test.hlb", src, LintConfig::default()).unwrap();
    let mut cg = CodeGen::new(&compiled.module, &compiled.analysis)
        .with_local_env(LocalEnv::new("/work"));
    let v = compile_target(&mut cg, "vendor").unwrap().unwrap();
    let fs = v.expect_fs().unwrap();
    let Op::Source { identifier, .. } = &fs.vertex().unwrap().op else {
        panic!("expected source");
    };
    assert_eq!(identifier, "local:///work/vendor");
}

#[test]
fn escaping_local_sources_fail_codegen() {
    let src = b"fs bad() {\n\tlocal \"../outside\"\n}\n";
    let compiled = hlb::parse_and_check("test.hlb", src, LintConfig::default()).unwrap();
    let mut cg = CodeGen::new(&compiled.module, &compiled.analysis)
        .with_local_env(LocalEnv::new("/work"));
    assert!(compile_target(&mut cg, "bad").is_err());
}
