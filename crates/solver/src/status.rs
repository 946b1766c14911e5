//! Wire types of the build daemon's status stream. One [`SolveStatus`] is
//! one unit of progress: vertex state changes, status rows, and log chunks.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolveStatus {
    pub vertexes: Vec<VertexUpdate>,
    pub statuses: Vec<VertexStatusRow>,
    pub logs: Vec<VertexLog>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexUpdate {
    pub digest: String,
    pub name: String,
    #[serde(default)]
    pub cached: bool,
    pub started: Option<SystemTime>,
    pub completed: Option<SystemTime>,
    /// Empty when the vertex succeeded.
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexStatusRow {
    pub vertex: String,
    pub id: String,
    pub current: u64,
    pub total: u64,
    pub timestamp: SystemTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexLog {
    pub vertex: String,
    /// 1 = stdout, 2 = stderr.
    pub stream: u32,
    pub data: Vec<u8>,
    pub timestamp: SystemTime,
}
