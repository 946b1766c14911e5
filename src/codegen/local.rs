//! Per-run local environment: working directory, platform, and environment
//! variables. `local` sources resolve against the working directory and may
//! not escape it.

use anyhow::{bail, Result};
use opgraph::Platform;

#[derive(Debug, Clone)]
pub struct LocalEnv {
    pub cwd: String,
    pub platform: Platform,
    pub vars: Vec<(String, String)>,
}

impl LocalEnv {
    pub fn new(cwd: impl Into<String>) -> Self {
        Self {
            cwd: cwd.into(),
            platform: Platform::linux_amd64(),
            vars: vec![],
        }
    }

    pub fn from_process() -> Self {
        let cwd = std::env::current_dir()
            .ok()
            .and_then(|p| p.to_str().map(str::to_string))
            .unwrap_or_else(|| "/".to_string());
        Self {
            cwd,
            platform: Platform::linux_amd64(),
            vars: std::env::vars().collect(),
        }
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Join a relative path against the working directory, normalizing `.`
    /// and `..` components. Paths that escape the working directory are
    /// rejected.
    pub fn resolve(&self, path: &str) -> Result<String> {
        let mut stack: Vec<&str> = Vec::new();
        for component in path.split('/') {
            match component {
                "" | "." => {}
                ".." => {
                    if stack.pop().is_none() {
                        bail!("local path {path:?} escapes the working directory");
                    }
                }
                other => stack.push(other),
            }
        }
        if path.starts_with('/') {
            bail!("local path {path:?} must be relative to the working directory");
        }
        let base = self.cwd.trim_end_matches('/');
        if stack.is_empty() {
            Ok(base.to_string())
        } else {
            Ok(format!("{base}/{}", stack.join("/")))
        }
    }
}
