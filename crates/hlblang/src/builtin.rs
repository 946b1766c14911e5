//! The builtin registry: one static catalogue of every builtin operation,
//! its signature, and its option namespace. The semantic checker, the code
//! generator, and the completion surface all consult this table.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::ast::{ObjType, OptionNs};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinField {
    pub name: &'static str,
    pub typ: ObjType,
    pub variadic: bool,
}

fn f(name: &'static str, typ: ObjType) -> BuiltinField {
    BuiltinField {
        name,
        typ,
        variadic: false,
    }
}

fn v(name: &'static str, typ: ObjType) -> BuiltinField {
    BuiltinField {
        name,
        typ,
        variadic: true,
    }
}

pub type SigTable = BTreeMap<&'static str, Vec<BuiltinField>>;

#[derive(Debug)]
pub struct Registry {
    sources_fs: Vec<&'static str>,
    sources_str: Vec<&'static str>,
    ops_fs: Vec<&'static str>,
    debugs: Vec<&'static str>,

    fs_sigs: SigTable,
    str_sigs: SigTable,
    /// Options valid in every namespace.
    common_sigs: SigTable,
    option_sigs: BTreeMap<OptionNs, SigTable>,

    enums: BTreeMap<&'static str, Vec<&'static str>>,
}

impl Registry {
    /// The process-wide registry; built once, read-only thereafter.
    pub fn get() -> &'static Registry {
        static REG: OnceLock<Registry> = OnceLock::new();
        REG.get_or_init(build)
    }

    pub fn is_debug(&self, name: &str) -> bool {
        self.debugs.contains(&name)
    }

    /// Is `name` a builtin source for blocks of type `typ`?
    pub fn is_source(&self, typ: ObjType, name: &str) -> bool {
        match typ {
            ObjType::Fs => self.sources_fs.contains(&name),
            ObjType::Str => self.sources_str.contains(&name),
            _ => false,
        }
    }

    /// Builtin names callable at statement position `index` in a block of
    /// type `typ`. Debug builtins are always allowed.
    pub fn allowed_names(&self, typ: ObjType, first: bool) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = match typ {
            ObjType::Fs if first => self.sources_fs.clone(),
            ObjType::Str if first => self.sources_str.clone(),
            ObjType::Option(Some(ns)) => self.namespace_members(ns),
            ObjType::Option(None) => self.common_sigs.keys().copied().collect(),
            _ => self.ops_fs.clone(),
        };
        out.extend(&self.debugs);
        out
    }

    /// Every operation name valid inside `with` blocks for `ns`, common
    /// options included.
    pub fn namespace_members(&self, ns: OptionNs) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = self.common_sigs.keys().copied().collect();
        if let Some(table) = self.option_sigs.get(&ns) {
            out.extend(table.keys().copied());
        }
        out
    }

    /// The signature of a builtin, or None for user-defined names.
    pub fn signature(&self, typ: ObjType, name: &str) -> Option<&[BuiltinField]> {
        let table = match typ {
            ObjType::Fs => Some(&self.fs_sigs),
            ObjType::Str => Some(&self.str_sigs),
            ObjType::Option(Some(ns)) => {
                if let Some(sig) = self.option_sigs.get(&ns).and_then(|t| t.get(name)) {
                    return Some(sig);
                }
                Some(&self.common_sigs)
            }
            ObjType::Option(None) => Some(&self.common_sigs),
            _ => None,
        }?;
        table.get(name).map(|v| v.as_slice())
    }

    pub fn sources(&self, typ: ObjType) -> &[&'static str] {
        match typ {
            ObjType::Str => &self.sources_str,
            _ => &self.sources_fs,
        }
    }

    pub fn ops(&self) -> &[&'static str] {
        &self.ops_fs
    }

    pub fn debugs(&self) -> &[&'static str] {
        &self.debugs
    }

    /// Enum keyword values, e.g. `network` -> unset|host|none.
    pub fn enum_values(&self, name: &str) -> Option<&[&'static str]> {
        self.enums.get(name).map(|v| v.as_slice())
    }

    /// Consistency surface for tests: every membership table name and its
    /// signature table, paired.
    pub fn option_tables(&self) -> impl Iterator<Item = (OptionNs, &SigTable)> {
        self.option_sigs.iter().map(|(ns, t)| (*ns, t))
    }
}

fn build() -> Registry {
    let sources_fs = vec!["scratch", "image", "http", "git", "local", "generate"];
    let sources_str = vec!["value", "format"];
    let ops_fs = vec![
        "shell",
        "run",
        "env",
        "dir",
        "user",
        "entrypoint",
        "mkdir",
        "mkfile",
        "rm",
        "copy",
    ];
    let debugs = vec!["breakpoint"];

    let mut fs_sigs: SigTable = BTreeMap::new();
    fs_sigs.insert("breakpoint", vec![]);
    fs_sigs.insert("scratch", vec![]);
    fs_sigs.insert("image", vec![f("ref", ObjType::Str)]);
    fs_sigs.insert("http", vec![f("url", ObjType::Str)]);
    fs_sigs.insert("git", vec![f("remote", ObjType::Str), f("ref", ObjType::Str)]);
    fs_sigs.insert("local", vec![f("path", ObjType::Str)]);
    fs_sigs.insert("generate", vec![f("frontend", ObjType::Fs)]);
    fs_sigs.insert("shell", vec![v("arg", ObjType::Str)]);
    fs_sigs.insert("run", vec![v("arg", ObjType::Str)]);
    fs_sigs.insert("env", vec![f("key", ObjType::Str), f("value", ObjType::Str)]);
    fs_sigs.insert("dir", vec![f("path", ObjType::Str)]);
    fs_sigs.insert("user", vec![f("name", ObjType::Str)]);
    fs_sigs.insert("entrypoint", vec![v("command", ObjType::Str)]);
    fs_sigs.insert(
        "mkdir",
        vec![f("path", ObjType::Str), f("filemode", ObjType::Int)],
    );
    fs_sigs.insert(
        "mkfile",
        vec![
            f("path", ObjType::Str),
            f("filemode", ObjType::Int),
            f("content", ObjType::Str),
        ],
    );
    fs_sigs.insert("rm", vec![f("path", ObjType::Str)]);
    fs_sigs.insert(
        "copy",
        vec![
            f("input", ObjType::Fs),
            f("src", ObjType::Str),
            f("dest", ObjType::Str),
        ],
    );

    let mut str_sigs: SigTable = BTreeMap::new();
    str_sigs.insert("value", vec![f("literal", ObjType::Str)]);
    str_sigs.insert(
        "format",
        vec![f("format", ObjType::Str), v("values", ObjType::Str)],
    );

    let mut common_sigs: SigTable = BTreeMap::new();
    common_sigs.insert("no-cache", vec![]);

    let mut option_sigs: BTreeMap<OptionNs, SigTable> = BTreeMap::new();

    let mut image: SigTable = BTreeMap::new();
    image.insert("resolve", vec![]);
    option_sigs.insert(OptionNs::Image, image);

    let mut http: SigTable = BTreeMap::new();
    http.insert("checksum", vec![f("digest", ObjType::Str)]);
    http.insert("chmod", vec![f("filemode", ObjType::Int)]);
    http.insert("filename", vec![f("name", ObjType::Str)]);
    option_sigs.insert(OptionNs::Http, http);

    let mut git: SigTable = BTreeMap::new();
    git.insert("keepGitDir", vec![]);
    option_sigs.insert(OptionNs::Git, git);

    let mut local: SigTable = BTreeMap::new();
    local.insert("includePatterns", vec![v("patterns", ObjType::Str)]);
    local.insert("excludePatterns", vec![v("patterns", ObjType::Str)]);
    local.insert("followPaths", vec![v("paths", ObjType::Str)]);
    option_sigs.insert(OptionNs::Local, local);

    let mut generate: SigTable = BTreeMap::new();
    generate.insert(
        "frontendInput",
        vec![f("key", ObjType::Str), f("value", ObjType::Fs)],
    );
    generate.insert(
        "frontendOpt",
        vec![f("key", ObjType::Str), f("value", ObjType::Str)],
    );
    option_sigs.insert(OptionNs::Generate, generate);

    let mut run: SigTable = BTreeMap::new();
    run.insert("readonlyRootfs", vec![]);
    run.insert("env", vec![f("key", ObjType::Str), f("value", ObjType::Str)]);
    run.insert("dir", vec![f("path", ObjType::Str)]);
    run.insert("user", vec![f("name", ObjType::Str)]);
    run.insert("network", vec![f("networkmode", ObjType::Str)]);
    run.insert("security", vec![f("securitymode", ObjType::Str)]);
    run.insert(
        "host",
        vec![f("hostname", ObjType::Str), f("address", ObjType::Str)],
    );
    run.insert("ssh", vec![]);
    run.insert("secret", vec![f("mountpoint", ObjType::Str)]);
    run.insert(
        "mount",
        vec![f("input", ObjType::Fs), f("mountpoint", ObjType::Str)],
    );
    option_sigs.insert(OptionNs::Run, run);

    let mut ssh: SigTable = BTreeMap::new();
    ssh.insert("target", vec![f("path", ObjType::Str)]);
    ssh.insert("id", vec![f("cacheid", ObjType::Str)]);
    ssh.insert("uid", vec![f("value", ObjType::Int)]);
    ssh.insert("gid", vec![f("value", ObjType::Int)]);
    ssh.insert("mode", vec![f("filemode", ObjType::Int)]);
    ssh.insert("optional", vec![]);
    option_sigs.insert(OptionNs::Ssh, ssh);

    let mut secret: SigTable = BTreeMap::new();
    secret.insert("id", vec![f("cacheid", ObjType::Str)]);
    secret.insert("uid", vec![f("value", ObjType::Int)]);
    secret.insert("gid", vec![f("value", ObjType::Int)]);
    secret.insert("mode", vec![f("filemode", ObjType::Int)]);
    secret.insert("optional", vec![]);
    option_sigs.insert(OptionNs::Secret, secret);

    let mut mount: SigTable = BTreeMap::new();
    mount.insert("readonly", vec![]);
    mount.insert("tmpfs", vec![]);
    mount.insert("sourcePath", vec![f("path", ObjType::Str)]);
    mount.insert(
        "cache",
        vec![f("cacheid", ObjType::Str), f("cachemode", ObjType::Str)],
    );
    option_sigs.insert(OptionNs::Mount, mount);

    let mut mkdir: SigTable = BTreeMap::new();
    mkdir.insert("createParents", vec![]);
    mkdir.insert("chown", vec![f("owner", ObjType::Str)]);
    mkdir.insert("createdTime", vec![f("created", ObjType::Str)]);
    option_sigs.insert(OptionNs::Mkdir, mkdir);

    let mut mkfile: SigTable = BTreeMap::new();
    mkfile.insert("chown", vec![f("owner", ObjType::Str)]);
    mkfile.insert("createdTime", vec![f("created", ObjType::Str)]);
    option_sigs.insert(OptionNs::Mkfile, mkfile);

    let mut rm: SigTable = BTreeMap::new();
    rm.insert("allowNotFound", vec![]);
    rm.insert("allowWildcard", vec![]);
    option_sigs.insert(OptionNs::Rm, rm);

    let mut copy: SigTable = BTreeMap::new();
    copy.insert("followSymlinks", vec![]);
    copy.insert("contentsOnly", vec![]);
    copy.insert("unpack", vec![]);
    copy.insert("createDestPath", vec![]);
    copy.insert("allowWildcard", vec![]);
    copy.insert("allowEmptyWildcard", vec![]);
    copy.insert("chown", vec![f("owner", ObjType::Str)]);
    copy.insert("createdTime", vec![f("created", ObjType::Str)]);
    option_sigs.insert(OptionNs::Copy, copy);

    let mut enums: BTreeMap<&'static str, Vec<&'static str>> = BTreeMap::new();
    enums.insert("network", vec!["unset", "host", "none"]);
    enums.insert("security", vec!["sandbox", "insecure"]);
    enums.insert("cache", vec!["shared", "private", "locked"]);

    Registry {
        sources_fs,
        sources_str,
        ops_fs,
        debugs,
        fs_sigs,
        str_sigs,
        common_sigs,
        option_sigs,
        enums,
    }
}
