//! Typed value model and content-addressed build-op graph for the HLB
//! code generator.

pub mod graph;
pub mod resolve;
pub mod value;

pub use graph::{
    collect, marshal, write_dot, write_tree, CopyOpts, Definition, Digest, ExecOptions,
    ExecResult, FileAction, FsState, HostEntry, Input, InputEntry, MountSlot, MountSpec, Op,
    OpEntry, Platform, SecretOpt, SshOpt, Vertex,
};
pub use resolve::{ImageResolver, ResolvedImage, ResolverCache};
pub use value::{OptionEntry, Value, ValueError};
