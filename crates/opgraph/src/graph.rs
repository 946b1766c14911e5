//! The content-addressed build-op graph. Each vertex carries a digest
//! derived from its operation and inputs; vertices are never mutated after
//! creation, and `Arc` reference counts keep the graph alive after the
//! emitter is gone.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Digest(String);

impl Digest {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut h = Sha256::new();
        h.update(bytes);
        let out = h.finalize();
        let mut hex = String::with_capacity(out.len() * 2);
        for byte in out {
            hex.push(HEX[(byte >> 4) as usize] as char);
            hex.push(HEX[(byte & 0x0f) as usize] as char);
        }
        Digest(format!("sha256:{hex}"))
    }

    /// Accepts a pre-computed `sha256:<hex>` reference (e.g. from the image
    /// resolver).
    pub fn parse(s: &str) -> Option<Self> {
        let hex = s.strip_prefix("sha256:")?;
        if hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Digest(s.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A short prefix for display.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(19)]
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn linux_amd64() -> Self {
        Self {
            os: "linux".to_string(),
            arch: "amd64".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEntry {
    pub hostname: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SshOpt {
    pub target: Option<String>,
    pub cacheid: Option<String>,
    pub uid: Option<i64>,
    pub gid: Option<i64>,
    pub mode: Option<i64>,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecretOpt {
    pub mountpoint: String,
    pub cacheid: Option<String>,
    pub uid: Option<i64>,
    pub gid: Option<i64>,
    pub mode: Option<i64>,
    pub optional: bool,
}

/// A mount slot on an exec op. `input` indexes the vertex input list;
/// tmpfs mounts have none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSlot {
    pub dest: String,
    pub input: Option<usize>,
    pub readonly: bool,
    pub tmpfs: bool,
    pub source_path: Option<String>,
    pub cache_id: Option<String>,
    pub cache_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileAction {
    Mkdir {
        path: String,
        mode: i64,
        make_parents: bool,
        owner: Option<String>,
        created: Option<String>,
    },
    Mkfile {
        path: String,
        mode: i64,
        content: String,
        owner: Option<String>,
        created: Option<String>,
    },
    Rm {
        path: String,
        allow_not_found: bool,
        allow_wildcard: bool,
    },
    Copy {
        src: String,
        dest: String,
        follow_symlinks: bool,
        contents_only: bool,
        unpack: bool,
        create_dest_path: bool,
        allow_wildcard: bool,
        allow_empty_wildcard: bool,
        owner: Option<String>,
        created: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Source {
        identifier: String,
        attrs: BTreeMap<String, String>,
    },
    Exec {
        args: Vec<String>,
        env: Vec<String>,
        cwd: String,
        user: Option<String>,
        network: String,
        security: String,
        hosts: Vec<HostEntry>,
        ssh: Vec<SshOpt>,
        secrets: Vec<SecretOpt>,
        readonly_rootfs: bool,
        no_cache: bool,
        mounts: Vec<MountSlot>,
        platform: Platform,
    },
    File {
        actions: Vec<FileAction>,
    },
}

impl Op {
    /// Display name of a vertex carrying this op.
    pub fn display_name(&self) -> String {
        match self {
            Op::Source { identifier, .. } => identifier.clone(),
            Op::Exec { args, .. } => args.join(" "),
            Op::File { actions } => actions
                .iter()
                .map(|a| match a {
                    FileAction::Mkdir { path, .. } => format!("mkdir {path}"),
                    FileAction::Mkfile { path, .. } => format!("mkfile {path}"),
                    FileAction::Rm { path, .. } => format!("rm {path}"),
                    FileAction::Copy { src, dest, .. } => format!("copy {src} {dest}"),
                })
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// An input slot: the referenced vertex plus optional per-edge metadata.
#[derive(Debug, Clone)]
pub struct Input {
    pub vertex: Arc<Vertex>,
    pub mount_dest: Option<String>,
}

#[derive(Debug)]
pub struct Vertex {
    pub op: Op,
    pub inputs: Vec<Input>,
    pub digest: Digest,
    pub name: String,
}

#[derive(Serialize)]
struct CanonicalOp<'a> {
    op: &'a Op,
    inputs: Vec<(&'a str, Option<&'a str>)>,
}

impl Vertex {
    pub fn new(op: Op, inputs: Vec<Input>) -> Arc<Vertex> {
        let canonical = CanonicalOp {
            op: &op,
            inputs: inputs
                .iter()
                .map(|i| (i.vertex.digest.as_str(), i.mount_dest.as_deref()))
                .collect(),
        };
        // BTreeMap fields keep the canonical JSON deterministic
        let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
        let digest = Digest::from_bytes(&bytes);
        let name = op.display_name();
        Arc::new(Vertex {
            op,
            inputs,
            digest,
            name,
        })
    }
}

/// Walk a vertex's transitive inputs, deduplicated by digest, dependencies
/// before dependents.
pub fn collect(root: &Arc<Vertex>) -> Vec<Arc<Vertex>> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    fn visit(v: &Arc<Vertex>, seen: &mut BTreeSet<Digest>, out: &mut Vec<Arc<Vertex>>) {
        if !seen.insert(v.digest.clone()) {
            return;
        }
        for input in &v.inputs {
            visit(&input.vertex, seen, out);
        }
        out.push(v.clone());
    }
    visit(root, &mut seen, &mut out);
    out
}

/// Serialized form handed to the build daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Definition {
    pub ops: Vec<OpEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpEntry {
    pub digest: String,
    pub name: String,
    pub op: Op,
    pub inputs: Vec<InputEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputEntry {
    pub digest: String,
    pub mount_dest: Option<String>,
}

pub fn marshal(state: &FsState) -> Definition {
    let mut ops = Vec::new();
    if let Some(root) = state.vertex() {
        for v in collect(root) {
            ops.push(OpEntry {
                digest: v.digest.as_str().to_string(),
                name: v.name.clone(),
                op: v.op.clone(),
                inputs: v
                    .inputs
                    .iter()
                    .map(|i| InputEntry {
                        digest: i.vertex.digest.as_str().to_string(),
                        mount_dest: i.mount_dest.clone(),
                    })
                    .collect(),
            });
        }
    }
    Definition { ops }
}

/// Render the graph rooted at `state` as Graphviz dot.
pub fn write_dot<W: Write>(state: &FsState, w: &mut W) -> io::Result<()> {
    writeln!(w, "digraph {{")?;
    if let Some(root) = state.vertex() {
        let vertices = collect(root);
        for v in &vertices {
            let shape = match v.op {
                Op::Source { .. } => "ellipse",
                Op::Exec { .. } => "box",
                Op::File { .. } => "note",
            };
            writeln!(w, "  {:?} [label={:?} shape={:?}];", v.digest.as_str(), v.name, shape)?;
        }
        for v in &vertices {
            for input in &v.inputs {
                let label = input.mount_dest.as_deref().unwrap_or("");
                writeln!(
                    w,
                    "  {:?} -> {:?} [label={:?}];",
                    input.vertex.digest.as_str(),
                    v.digest.as_str(),
                    label
                )?;
            }
        }
    }
    writeln!(w, "}}")
}

/// Render the graph rooted at `state` as an indented tree, dependents first.
pub fn write_tree<W: Write>(state: &FsState, w: &mut W) -> io::Result<()> {
    fn visit<W: Write>(v: &Arc<Vertex>, depth: usize, w: &mut W) -> io::Result<()> {
        writeln!(w, "{}{} {}", "  ".repeat(depth), v.digest.short(), v.name)?;
        for input in &v.inputs {
            visit(&input.vertex, depth + 1, w)?;
        }
        Ok(())
    }
    if let Some(root) = state.vertex() {
        visit(root, 0, w)?;
    }
    Ok(())
}

/// Options accumulated for one exec op.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub env: Vec<(String, String)>,
    pub cwd: Option<String>,
    pub user: Option<String>,
    pub network: Option<String>,
    pub security: Option<String>,
    pub hosts: Vec<HostEntry>,
    pub ssh: Vec<SshOpt>,
    pub secrets: Vec<SecretOpt>,
    pub readonly_rootfs: bool,
    pub no_cache: bool,
    pub mounts: Vec<MountSpec>,
}

/// One mount requested on an exec op. `tag` correlates back to the call
/// that produced it so alias capture can select this mount's output.
#[derive(Debug, Clone)]
pub struct MountSpec {
    pub input: Option<FsState>,
    pub dest: String,
    pub readonly: bool,
    pub tmpfs: bool,
    pub source_path: Option<String>,
    pub cache: Option<(String, String)>,
    pub tag: Option<u64>,
}

impl MountSpec {
    pub fn new(input: FsState, dest: String) -> Self {
        Self {
            input: Some(input),
            dest,
            readonly: false,
            tmpfs: false,
            source_path: None,
            cache: None,
            tag: None,
        }
    }
}

/// The root filesystem result of an exec plus the output state of every
/// mount, pairing each with its originating tag.
#[derive(Debug, Clone)]
pub struct ExecResult {
    pub root: FsState,
    pub mounts: Vec<(Option<u64>, FsState)>,
}

/// A handle to a node in the build-op DAG plus the filesystem metadata that
/// shapes future operations. Cloning is cheap; all mutation is
/// copy-on-write via the `with_*` methods.
#[derive(Debug, Clone)]
pub struct FsState {
    vertex: Option<Arc<Vertex>>,
    /// Output slot of `vertex` this state selects (0 = root filesystem,
    /// 1 + i = mount i of an exec op).
    output: usize,
    env: Vec<(String, String)>,
    cwd: String,
    user: Option<String>,
    entrypoint: Vec<String>,
    shell: Vec<String>,
    network: String,
    security: String,
    platform: Platform,
}

impl Default for FsState {
    fn default() -> Self {
        Self::scratch()
    }
}

impl FsState {
    fn base() -> Self {
        Self {
            vertex: None,
            output: 0,
            env: vec![],
            cwd: "/".to_string(),
            user: None,
            entrypoint: vec![],
            shell: vec!["/bin/sh".to_string(), "-c".to_string()],
            network: "unset".to_string(),
            security: "sandbox".to_string(),
            platform: Platform::linux_amd64(),
        }
    }

    pub fn scratch() -> Self {
        let vertex = Vertex::new(
            Op::Source {
                identifier: "scratch".to_string(),
                attrs: BTreeMap::new(),
            },
            vec![],
        );
        Self::base().with_vertex(vertex)
    }

    pub fn vertex(&self) -> Option<&Arc<Vertex>> {
        self.vertex.as_ref()
    }

    pub fn output(&self) -> usize {
        self.output
    }

    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn security(&self) -> &str {
        &self.security
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    fn with_vertex(&self, vertex: Arc<Vertex>) -> Self {
        let mut next = self.clone();
        next.vertex = Some(vertex);
        next.output = 0;
        next
    }

    fn source(identifier: String, attrs: BTreeMap<String, String>) -> Arc<Vertex> {
        Vertex::new(Op::Source { identifier, attrs }, vec![])
    }

    pub fn image(reference: &str, attrs: BTreeMap<String, String>) -> Self {
        let v = Self::source(format!("docker-image://{reference}"), attrs);
        Self::base().with_vertex(v)
    }

    pub fn http(url: &str, attrs: BTreeMap<String, String>) -> Self {
        let v = Self::source(url.to_string(), attrs);
        Self::base().with_vertex(v)
    }

    pub fn git(remote: &str, reference: &str, attrs: BTreeMap<String, String>) -> Self {
        let v = Self::source(format!("git://{remote}#{reference}"), attrs);
        Self::base().with_vertex(v)
    }

    pub fn local(name: &str, attrs: BTreeMap<String, String>) -> Self {
        let v = Self::source(format!("local://{name}"), attrs);
        Self::base().with_vertex(v)
    }

    pub fn generate(frontend: &FsState, attrs: BTreeMap<String, String>) -> Self {
        let mut inputs = vec![];
        if let Some(v) = frontend.vertex() {
            inputs.push(Input {
                vertex: v.clone(),
                mount_dest: None,
            });
        }
        let v = Vertex::new(
            Op::Source {
                identifier: "frontend://generate".to_string(),
                attrs,
            },
            inputs,
        );
        Self::base().with_vertex(v)
    }

    pub fn with_env(&self, key: &str, value: &str) -> Self {
        let mut next = self.clone();
        next.env.push((key.to_string(), value.to_string()));
        next
    }

    pub fn with_cwd(&self, path: &str) -> Self {
        let mut next = self.clone();
        next.cwd = path.to_string();
        next
    }

    pub fn with_user(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.user = Some(name.to_string());
        next
    }

    pub fn with_entrypoint(&self, command: Vec<String>) -> Self {
        let mut next = self.clone();
        next.entrypoint = command;
        next
    }

    pub fn with_shell(&self, shell: Vec<String>) -> Self {
        let mut next = self.clone();
        next.shell = shell;
        next
    }

    /// Chain an exec op onto this filesystem. A single argument is wrapped
    /// with the current shell; multiple arguments run verbatim.
    pub fn run(&self, args: Vec<String>, opts: ExecOptions) -> ExecResult {
        let exec_args = if args.len() == 1 {
            let mut v = self.shell.clone();
            v.push(args[0].clone());
            v
        } else {
            args
        };

        let mut env: Vec<String> = self
            .env
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        env.extend(opts.env.iter().map(|(k, v)| format!("{k}={v}")));

        let mut inputs = Vec::new();
        if let Some(v) = &self.vertex {
            inputs.push(Input {
                vertex: v.clone(),
                mount_dest: None,
            });
        }

        let mut slots = Vec::new();
        for spec in &opts.mounts {
            let input_index = spec.input.as_ref().and_then(|fs| {
                fs.vertex().map(|v| {
                    inputs.push(Input {
                        vertex: v.clone(),
                        mount_dest: Some(spec.dest.clone()),
                    });
                    inputs.len() - 1
                })
            });
            slots.push(MountSlot {
                dest: spec.dest.clone(),
                input: input_index,
                readonly: spec.readonly,
                tmpfs: spec.tmpfs,
                source_path: spec.source_path.clone(),
                cache_id: spec.cache.as_ref().map(|(id, _)| id.clone()),
                cache_mode: spec.cache.as_ref().map(|(_, m)| m.clone()),
            });
        }

        let op = Op::Exec {
            args: exec_args,
            env,
            cwd: opts.cwd.clone().unwrap_or_else(|| self.cwd.clone()),
            user: opts.user.clone().or_else(|| self.user.clone()),
            network: opts.network.clone().unwrap_or_else(|| self.network.clone()),
            security: opts
                .security
                .clone()
                .unwrap_or_else(|| self.security.clone()),
            hosts: opts.hosts.clone(),
            ssh: opts.ssh.clone(),
            secrets: opts.secrets.clone(),
            readonly_rootfs: opts.readonly_rootfs,
            no_cache: opts.no_cache,
            mounts: slots,
            platform: self.platform.clone(),
        };
        let vertex = Vertex::new(op, inputs);

        let root = self.with_vertex(vertex.clone());
        let mounts = opts
            .mounts
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let mut out = self.clone();
                out.vertex = Some(vertex.clone());
                out.output = 1 + i;
                (spec.tag, out)
            })
            .collect();
        ExecResult { root, mounts }
    }

    fn file_action(&self, action: FileAction) -> Self {
        let mut inputs = Vec::new();
        if let Some(v) = &self.vertex {
            inputs.push(Input {
                vertex: v.clone(),
                mount_dest: None,
            });
        }
        self.with_vertex(Vertex::new(
            Op::File {
                actions: vec![action],
            },
            inputs,
        ))
    }

    pub fn mkdir(&self, path: &str, mode: i64, make_parents: bool, owner: Option<String>, created: Option<String>) -> Self {
        self.file_action(FileAction::Mkdir {
            path: path.to_string(),
            mode,
            make_parents,
            owner,
            created,
        })
    }

    pub fn mkfile(&self, path: &str, mode: i64, content: &str, owner: Option<String>, created: Option<String>) -> Self {
        self.file_action(FileAction::Mkfile {
            path: path.to_string(),
            mode,
            content: content.to_string(),
            owner,
            created,
        })
    }

    pub fn rm(&self, path: &str, allow_not_found: bool, allow_wildcard: bool) -> Self {
        self.file_action(FileAction::Rm {
            path: path.to_string(),
            allow_not_found,
            allow_wildcard,
        })
    }

    pub fn copy(&self, from: &FsState, src: &str, dest: &str, opts: CopyOpts) -> Self {
        let mut inputs = Vec::new();
        if let Some(v) = &self.vertex {
            inputs.push(Input {
                vertex: v.clone(),
                mount_dest: None,
            });
        }
        if let Some(v) = from.vertex() {
            inputs.push(Input {
                vertex: v.clone(),
                mount_dest: None,
            });
        }
        self.with_vertex(Vertex::new(
            Op::File {
                actions: vec![FileAction::Copy {
                    src: src.to_string(),
                    dest: dest.to_string(),
                    follow_symlinks: opts.follow_symlinks,
                    contents_only: opts.contents_only,
                    unpack: opts.unpack,
                    create_dest_path: opts.create_dest_path,
                    allow_wildcard: opts.allow_wildcard,
                    allow_empty_wildcard: opts.allow_empty_wildcard,
                    owner: opts.owner,
                    created: opts.created,
                }],
            },
            inputs,
        ))
    }
}

/// Options for a copy file action.
#[derive(Debug, Clone, Default)]
pub struct CopyOpts {
    pub follow_symlinks: bool,
    pub contents_only: bool,
    pub unpack: bool,
    pub create_dest_path: bool,
    pub allow_wildcard: bool,
    pub allow_empty_wildcard: bool,
    pub owner: Option<String>,
    pub created: Option<String>,
}
