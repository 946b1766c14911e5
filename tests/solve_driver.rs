use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Result;
use hlb::codegen::CodeGen;
use hlb::compile_target;
use hlblang::lint::LintConfig;
use opgraph::Definition;
use solver::{CancelToken, SolveClient, SolveStatus, VertexUpdate};

/// Fake daemon: reports every op as started and completed.
struct FakeClient {
    solved: Arc<AtomicUsize>,
    fail: bool,
}

impl SolveClient for FakeClient {
    fn solve(
        &self,
        def: &Definition,
        status: SyncSender<SolveStatus>,
        _cancel: CancelToken,
    ) -> Result<()> {
        for op in &def.ops {
            let now = SystemTime::now();
            status.send(SolveStatus {
                vertexes: vec![VertexUpdate {
                    digest: op.digest.clone(),
                    name: op.name.clone(),
                    cached: false,
                    started: Some(now),
                    completed: Some(now),
                    error: String::new(),
                }],
                ..SolveStatus::default()
            })?;
            self.solved.fetch_add(1, Ordering::SeqCst);
        }
        if self.fail {
            anyhow::bail!("daemon rejected the graph");
        }
        Ok(())
    }
}

fn emitted_definition() -> Definition {
    let src = b"fs default() {\n\timage \"alpine\"\n\trun \"true\"\n}\n";
    let compiled = hlb::parse_and_check("test.hlb", src, LintConfig::default()).unwrap();
    let mut cg = CodeGen::new(&compiled.module, &compiled.analysis);
    let v = compile_target(&mut cg, "default").unwrap().unwrap();
    opgraph::marshal(v.expect_fs().unwrap())
}

#[test]
fn the_emitted_graph_drives_a_solve() {
    let def = emitted_definition();
    let ops = def.ops.len();
    let solved = Arc::new(AtomicUsize::new(0));
    let client = Arc::new(FakeClient {
        solved: solved.clone(),
        fail: false,
    });

    hlb::solve(client, def).unwrap();
    assert_eq!(solved.load(Ordering::SeqCst), ops);
}

#[test]
fn daemon_errors_propagate() {
    let def = emitted_definition();
    let client = Arc::new(FakeClient {
        solved: Arc::new(AtomicUsize::new(0)),
        fail: true,
    });
    let err = hlb::solve(client, def).unwrap_err();
    assert!(err.to_string().contains("rejected"), "{err}");
}

#[test]
fn definitions_round_trip_as_json() {
    let def = emitted_definition();
    let json = serde_json::to_string(&def).unwrap();
    let back: Definition = serde_json::from_str(&json).unwrap();
    assert_eq!(back.ops.len(), def.ops.len());
    assert_eq!(back.ops[0].digest, def.ops[0].digest);
}
