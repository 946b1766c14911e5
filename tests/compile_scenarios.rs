use hlb::codegen::CodeGen;
use hlb::compile_target;
use hlblang::diag::DiagKind;
use hlblang::lint::LintConfig;
use opgraph::{marshal, FileAction, Op, Value};
use pretty_assertions::assert_eq;

fn compile(src: &[u8], target: &str) -> Value {
    let compiled = hlb::parse_and_check("test.hlb", src, LintConfig::default())
        .unwrap_or_else(|e| panic!("compile failed: {e}"));
    let mut cg = CodeGen::new(&compiled.module, &compiled.analysis);
    compile_target(&mut cg, target)
        .unwrap_or_else(|e| panic!("codegen failed: {e}"))
        .expect("debugger did not run")
}

fn compile_err(src: &[u8]) -> hlblang::Error {
    hlb::parse_and_check("test.hlb", src, LintConfig::default())
        .err()
        .expect("expected a compile failure")
        .error
}

#[test]
fn minimal_image_emits_a_single_vertex() {
    let v = compile(b"fs default() {\n\timage \"alpine\"\n}\n", "default");
    let def = marshal(v.expect_fs().unwrap());
    assert_eq!(def.ops.len(), 1);
    let Op::Source { identifier, .. } = &def.ops[0].op else {
        panic!("expected a source op");
    };
    assert_eq!(identifier, "docker-image://alpine");
}

#[test]
fn two_stage_mount_selects_the_mount_output() {
    let src = b"fs echoOutput() {
\timage \"alpine\"
\trun \"echo hello > /opt/out\" with option {
\t\tmount scratch \"/opt\" as output
\t}
}
";
    let v = compile(src, "output");
    let fs = v.expect_fs().unwrap();
    assert_eq!(fs.output(), 1, "the alias selects the mount output slot");

    let def = marshal(fs);
    assert_eq!(def.ops.len(), 3);

    let scratch = def
        .ops
        .iter()
        .find(|o| matches!(&o.op, Op::Source { identifier, .. } if identifier == "scratch"))
        .expect("scratch vertex");
    let exec = def
        .ops
        .iter()
        .find(|o| matches!(o.op, Op::Exec { .. }))
        .expect("exec vertex");
    assert!(
        exec.inputs
            .iter()
            .any(|i| i.digest == scratch.digest && i.mount_dest.as_deref() == Some("/opt")),
        "the run vertex has an edge to the mounted scratch at /opt"
    );

    // the root output of the same program is the run's rootfs
    let root = compile(src, "echoOutput");
    assert_eq!(root.expect_fs().unwrap().output(), 0);
}

#[test]
fn a_missing_source_is_a_first_source_error() {
    let err = compile_err(b"fs bad() {\n\trun \"echo\"\n}\n");
    assert_eq!(err.diagnostics[0].kind, DiagKind::FirstSource);
    let ann = &err.diagnostics[0].groups[0].annotations[0];
    assert_eq!(ann.span.end.offset - ann.span.start.offset, "run".len());
}

#[test]
fn duplicate_declarations_list_both_spans() {
    let err = compile_err(b"fs x() {\n\tscratch\n}\nfs x() {\n\tscratch\n}\n");
    assert_eq!(err.diagnostics[0].kind, DiagKind::DuplicateDecl);
    assert_eq!(err.diagnostics[0].groups.len(), 2);
}

#[test]
fn arity_mismatch_reports_counts() {
    let err = compile_err(b"fs bad() {\n\timage \"a\" \"b\"\n}\n");
    assert_eq!(
        err.diagnostics[0].kind,
        DiagKind::NumArgs {
            expected: 1,
            found: 2
        }
    );
}

#[test]
fn variadic_format_substitutes_values() {
    let src = b"string greet(string name) {
\tformat \"hi %s\" name
}
string message() {
\tgreet \"world\"
}
";
    let v = compile(src, "message");
    assert_eq!(v.expect_str().unwrap(), "hi world");
}

#[test]
fn env_metadata_propagates_into_run_ops() {
    let src = b"fs e() {\n\timage \"alpine\"\n\tenv \"FOO\" \"bar\"\n\trun \"env\"\n}\n";
    let v = compile(src, "e");
    let fs = v.expect_fs().unwrap();
    let Op::Exec { env, .. } = &fs.vertex().unwrap().op else {
        panic!("expected exec");
    };
    assert!(env.contains(&"FOO=bar".to_string()), "{env:?}");
}

#[test]
fn run_options_shape_the_exec_op() {
    let src = b"fs r() {
\timage \"alpine\"
\trun \"make\" with option {
\t\tenv \"K\" \"V\"
\t\tdir \"/tmp\"
\t\tuser \"builder\"
\t\tnetwork \"none\"
\t\treadonlyRootfs
\t}
}
";
    let v = compile(src, "r");
    let fs = v.expect_fs().unwrap();
    let Op::Exec {
        env,
        cwd,
        user,
        network,
        readonly_rootfs,
        ..
    } = &fs.vertex().unwrap().op
    else {
        panic!("expected exec");
    };
    assert!(env.contains(&"K=V".to_string()));
    assert_eq!(cwd, "/tmp");
    assert_eq!(user.as_deref(), Some("builder"));
    assert_eq!(network, "none");
    assert!(readonly_rootfs);
}

#[test]
fn invalid_network_modes_fail_codegen() {
    let src = b"fs r() {
\timage \"alpine\"
\trun \"make\" with option {
\t\tnetwork \"wifi\"
\t}
}
";
    let compiled = hlb::parse_and_check("test.hlb", src, LintConfig::default()).unwrap();
    let mut cg = CodeGen::new(&compiled.module, &compiled.analysis);
    let err = compile_target(&mut cg, "r").unwrap_err();
    assert!(err.to_string().contains("network"), "{err}");
}

#[test]
fn call_aliases_capture_intermediate_states() {
    let src = b"fs multi() {
\timage \"alpine\"
\trun \"first\" as afterFirst
\trun \"second\"
}
";
    let aliased = compile(src, "afterFirst");
    let def = marshal(aliased.expect_fs().unwrap());
    // image + first run; the second run is past the capture point
    assert_eq!(def.ops.len(), 2);

    let full = compile(src, "multi");
    assert_eq!(marshal(full.expect_fs().unwrap()).ops.len(), 3);
}

#[test]
fn user_functions_compose_across_blocks() {
    let src = b"fs base() {
\timage \"alpine\"
\trun \"apk add build-base\"
}
fs default() {
\tbase
\trun \"make\"
}
";
    let v = compile(src, "default");
    let def = marshal(v.expect_fs().unwrap());
    assert_eq!(def.ops.len(), 3);
}

#[test]
fn file_ops_carry_their_modes() {
    let src = b"fs m() {\n\tscratch\n\tmkdir \"/data\" 0o755\n}\n";
    let v = compile(src, "m");
    let fs = v.expect_fs().unwrap();
    let Op::File { actions } = &fs.vertex().unwrap().op else {
        panic!("expected file op");
    };
    let FileAction::Mkdir { path, mode, .. } = &actions[0] else {
        panic!("expected mkdir action");
    };
    assert_eq!(path, "/data");
    assert_eq!(*mode, 0o755);
}

#[test]
fn unknown_targets_are_invalid() {
    let compiled = hlb::parse_and_check(
        "test.hlb",
        b"fs default() {\n\tscratch\n}\n",
        LintConfig::default(),
    )
    .unwrap();
    let mut cg = CodeGen::new(&compiled.module, &compiled.analysis);
    assert!(compile_target(&mut cg, "nope").is_err());
}

#[test]
fn string_parameters_thread_through_fs_calls() {
    let src = b"fs pull(string ref) {
\timage ref
}
fs default() {
\tpull \"busybox\"
}
";
    let v = compile(src, "default");
    let Op::Source { identifier, .. } = &v.expect_fs().unwrap().vertex().unwrap().op else {
        panic!("expected source");
    };
    assert_eq!(identifier, "docker-image://busybox");
}
