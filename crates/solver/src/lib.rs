//! Solve contract and progress management.
//!
//! The build daemon itself is an external collaborator: this crate defines
//! what the emitter hands it (a marshaled [`opgraph::Definition`]) and what
//! it reports back (a [`SolveStatus`] stream), plus the progress manager
//! that folds that stream into task state for UI consumers.

pub mod job;
pub mod manager;
pub mod status;
pub mod task;

use std::sync::mpsc::SyncSender;

use anyhow::Result;

pub use job::Job;
pub use manager::{BuildStatus, CancelToken, Canceled, Manager, TaggedStatus};
pub use status::{SolveStatus, VertexLog, VertexStatusRow, VertexUpdate};
pub use task::{Task, TaskOutcome, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Auto,
    Tty,
    Plain,
}

/// A client of the remote build daemon. Implementations submit the graph
/// and stream every status event into `status` until the solve finishes;
/// dropping the sender signals completion.
pub trait SolveClient: Send + Sync {
    fn solve(
        &self,
        def: &opgraph::Definition,
        status: SyncSender<SolveStatus>,
        cancel: CancelToken,
    ) -> Result<()>;
}
