use crate::graph::FsState;

/// The code generator's typed value model. Filesystem values are immutable
/// handles into the build-op graph; applying an operation produces a new
/// value whose DAG references the predecessor.
#[derive(Debug, Clone)]
pub enum Value {
    Filesystem(FsState),
    Str(String),
    Int(i64),
    Bool(bool),
    Options(Vec<OptionEntry>),
}

/// A typed key/value produced inside a `with` block, tagged with its owning
/// option namespace. `tag` correlates the entry back to the front-end call
/// that produced it (used for alias capture of mount outputs).
#[derive(Debug, Clone)]
pub struct OptionEntry {
    pub ns: String,
    pub name: String,
    pub args: Vec<Value>,
    pub tag: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected {expected}, found {found}")]
pub struct ValueError {
    pub expected: &'static str,
    pub found: &'static str,
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Filesystem(_) => "fs",
            Value::Str(_) => "string",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Options(_) => "option",
        }
    }

    fn mismatch(&self, expected: &'static str) -> ValueError {
        ValueError {
            expected,
            found: self.kind(),
        }
    }

    pub fn expect_fs(&self) -> Result<&FsState, ValueError> {
        match self {
            Value::Filesystem(fs) => Ok(fs),
            other => Err(other.mismatch("fs")),
        }
    }

    pub fn expect_str(&self) -> Result<&str, ValueError> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    pub fn expect_int(&self) -> Result<i64, ValueError> {
        match self {
            Value::Int(i) => Ok(*i),
            other => Err(other.mismatch("int")),
        }
    }

    pub fn expect_bool(&self) -> Result<bool, ValueError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn expect_options(&self) -> Result<&[OptionEntry], ValueError> {
        match self {
            Value::Options(entries) => Ok(entries),
            other => Err(other.mismatch("option")),
        }
    }
}

impl OptionEntry {
    pub fn str_arg(&self, i: usize) -> Option<&str> {
        self.args.get(i).and_then(|v| v.expect_str().ok())
    }

    pub fn int_arg(&self, i: usize) -> Option<i64> {
        self.args.get(i).and_then(|v| v.expect_int().ok())
    }

    pub fn fs_arg(&self, i: usize) -> Option<&FsState> {
        self.args.get(i).and_then(|v| v.expect_fs().ok())
    }
}
