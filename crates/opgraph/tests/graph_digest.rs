use std::collections::BTreeMap;
use std::collections::BTreeSet;

use opgraph::{collect, marshal, Digest, ExecOptions, FsState, MountSpec, Op};
use pretty_assertions::{assert_eq, assert_ne};

fn image(reference: &str) -> FsState {
    FsState::image(reference, BTreeMap::new())
}

#[test]
fn digests_have_the_sha256_form() {
    let fs = image("alpine");
    let digest = fs.vertex().unwrap().digest.clone();
    assert!(digest.as_str().starts_with("sha256:"));
    assert_eq!(digest.as_str().len(), "sha256:".len() + 64);
    assert!(Digest::parse(digest.as_str()).is_some());
}

#[test]
fn identical_chains_share_digests() {
    let a = image("alpine").run(vec!["echo hi".to_string()], ExecOptions::default());
    let b = image("alpine").run(vec!["echo hi".to_string()], ExecOptions::default());
    assert_eq!(
        a.root.vertex().unwrap().digest,
        b.root.vertex().unwrap().digest
    );
}

#[test]
fn different_ops_differ() {
    let a = image("alpine").run(vec!["echo hi".to_string()], ExecOptions::default());
    let b = image("alpine").run(vec!["echo bye".to_string()], ExecOptions::default());
    assert_ne!(
        a.root.vertex().unwrap().digest,
        b.root.vertex().unwrap().digest
    );
    assert_ne!(
        image("alpine").vertex().unwrap().digest,
        image("ubuntu").vertex().unwrap().digest
    );
}

#[test]
fn metadata_ops_shape_later_exec_digests() {
    let plain = image("alpine").run(vec!["env".to_string()], ExecOptions::default());
    let with_env = image("alpine")
        .with_env("FOO", "bar")
        .run(vec!["env".to_string()], ExecOptions::default());
    assert_ne!(
        plain.root.vertex().unwrap().digest,
        with_env.root.vertex().unwrap().digest
    );
}

#[test]
fn single_arg_runs_are_wrapped_with_the_shell() {
    let result = image("alpine").run(vec!["echo hi".to_string()], ExecOptions::default());
    let Op::Exec { args, .. } = &result.root.vertex().unwrap().op else {
        panic!("expected exec op");
    };
    assert_eq!(args, &["/bin/sh", "-c", "echo hi"]);
}

#[test]
fn mounts_become_labeled_input_edges() {
    let mut opts = ExecOptions::default();
    opts.mounts.push(MountSpec::new(
        FsState::scratch(),
        "/opt".to_string(),
    ));
    let result = image("alpine").run(vec!["true".to_string()], opts);
    let root = result.root.vertex().unwrap();

    assert_eq!(root.inputs.len(), 2);
    assert_eq!(root.inputs[0].mount_dest, None);
    assert_eq!(root.inputs[1].mount_dest.as_deref(), Some("/opt"));

    // the mount's output selects slot 1 of the same exec vertex
    assert_eq!(result.mounts.len(), 1);
    let (_, mount_state) = &result.mounts[0];
    assert_eq!(mount_state.output(), 1);
    assert_eq!(
        mount_state.vertex().unwrap().digest,
        root.digest
    );
}

#[test]
fn copy_links_both_filesystems() {
    let dest = image("alpine");
    let src = image("ubuntu");
    let out = dest.copy(&src, "/a", "/b", Default::default());
    assert_eq!(out.vertex().unwrap().inputs.len(), 2);
}

#[test]
fn the_vertex_set_is_closed_under_inputs() {
    let mut opts = ExecOptions::default();
    opts.mounts
        .push(MountSpec::new(FsState::scratch(), "/opt".to_string()));
    let result = image("alpine").run(vec!["true".to_string()], opts);

    let vertices = collect(result.root.vertex().unwrap());
    let digests: BTreeSet<&str> = vertices.iter().map(|v| v.digest.as_str()).collect();
    for v in &vertices {
        for input in &v.inputs {
            assert!(digests.contains(input.vertex.digest.as_str()));
        }
    }
    // image, scratch, exec
    assert_eq!(vertices.len(), 3);
}

#[test]
fn marshal_lists_dependencies_before_dependents() {
    let chained = image("alpine").mkdir("/data", 0o755, true, None, None);
    let def = marshal(&chained);
    assert_eq!(def.ops.len(), 2);
    assert!(matches!(def.ops[0].op, Op::Source { .. }));
    assert!(matches!(def.ops[1].op, Op::File { .. }));
    assert_eq!(def.ops[1].inputs[0].digest, def.ops[0].digest);
}
