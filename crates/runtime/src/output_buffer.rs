// SPDX-License-Identifier: MIT

//! C10 Output Buffer (§4.10).
//!
//! Append-only byte buffer with a tail cap: once the cap is exceeded, the
//! oldest bytes are dropped to keep the most recent `cap_bytes` (I5).
//! `window_start` tracks the absolute stream offset of byte zero in the
//! retained window, so [`OutputBuffer::read`] can report a gap to a caller
//! reading from before the window.

#[derive(Debug, Clone)]
pub struct OutputBuffer {
    data: Vec<u8>,
    cap_bytes: usize,
    truncated: bool,
    window_start: u64,
}

/// Result of a [`OutputBuffer::read`]: the bytes available from `offset` (or
/// later, if the requested offset fell inside a truncated gap), decoded
/// lossily, plus the actual start offset and the buffer's truncated flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRead {
    pub data: String,
    pub offset: u64,
    pub truncated: bool,
}

impl OutputBuffer {
    pub fn new(cap_bytes: usize) -> Self {
        Self {
            data: Vec::new(),
            cap_bytes,
            truncated: false,
            window_start: 0,
        }
    }

    /// Append `chunk`, dropping from the head if the cap is exceeded (I5).
    pub fn append(&mut self, chunk: &[u8]) {
        self.data.extend_from_slice(chunk);
        if self.data.len() > self.cap_bytes {
            let excess = self.data.len() - self.cap_bytes;
            self.data.drain(0..excess);
            self.window_start += excess as u64;
            self.truncated = true;
        }
    }

    /// Read the tail of the buffer from `offset` (absolute stream offset).
    /// If `offset` precedes the retained window, the read starts at the
    /// window instead and `truncated` tells the caller a gap was skipped.
    pub fn read(&self, offset: u64) -> OutputRead {
        let effective_offset = offset.max(self.window_start);
        let skip = (effective_offset - self.window_start) as usize;
        let skip = skip.min(self.data.len());
        OutputRead {
            data: String::from_utf8_lossy(&self.data[skip..]).into_owned(),
            offset: effective_offset,
            truncated: self.truncated,
        }
    }

    /// The full retained contents, lossily decoded.
    pub fn as_str(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

#[cfg(test)]
#[path = "output_buffer_tests.rs"]
mod tests;
