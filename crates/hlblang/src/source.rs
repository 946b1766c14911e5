use std::collections::HashMap;
use std::sync::Arc;

/// Buffered source with a newline index. Supports byte- and line-addressed
/// reads for diagnostic rendering. A synthetic final newline is appended to
/// inputs that do not end with one, so later stages need no end-of-file
/// special case.
#[derive(Debug, Clone)]
pub struct IndexedBuffer {
    buf: Vec<u8>,
    /// Byte offsets of every `\n` in `buf`, ascending.
    offsets: Vec<usize>,
}

impl IndexedBuffer {
    pub fn from_bytes(mut bytes: Vec<u8>) -> Self {
        if bytes.last() != Some(&b'\n') {
            bytes.push(b'\n');
        }
        let offsets = bytes
            .iter()
            .enumerate()
            .filter_map(|(i, b)| (*b == b'\n').then_some(i))
            .collect();
        Self { buf: bytes, offsets }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn line_count(&self) -> usize {
        self.offsets.len()
    }

    /// Read a full line by 1-based number, without its newline.
    pub fn line(&self, num: usize) -> Option<&[u8]> {
        if num == 0 || num > self.offsets.len() {
            return None;
        }
        let start = if num == 1 { 0 } else { self.offsets[num - 2] + 1 };
        let end = self.offsets[num - 1];
        Some(&self.buf[start..end])
    }

    /// The segment `[line_start .. next_newline)` containing a byte offset.
    pub fn segment(&self, offset: usize) -> Option<&[u8]> {
        let (line, _) = self.position_for(offset)?;
        self.line(line)
    }

    /// 1-based `(line, column)` of a byte offset.
    pub fn position_for(&self, offset: usize) -> Option<(usize, usize)> {
        if offset >= self.buf.len() {
            return None;
        }
        let line = self.offsets.partition_point(|&nl| nl < offset);
        let start = if line == 0 { 0 } else { self.offsets[line - 1] + 1 };
        Some((line + 1, offset - start + 1))
    }
}

/// Every buffer parsed during a run, keyed by filename. Diagnostics carry
/// positions back into these buffers.
#[derive(Debug, Default, Clone)]
pub struct SourceMap {
    buffers: HashMap<Arc<str>, IndexedBuffer>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, filename: Arc<str>, buffer: IndexedBuffer) {
        self.buffers.insert(filename, buffer);
    }

    pub fn get(&self, filename: &str) -> Option<&IndexedBuffer> {
        self.buffers.get(filename)
    }
}
