use std::cmp;

/// Tunables for a decode session. The defaults suit most HTTP responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Capacity of each internal buffer (raw input, and framed payload).
    /// This is also the most that's requested from the source in one read.
    pub buffer_size: usize,

    /// Longest chunk-size or trailer line accepted, line break excluded.
    pub max_line_len: usize,

    /// Target size of the byte chunks yielded by the chunk iterator and
    /// stream front-ends.
    pub chunk_size: usize,
}

impl DecodeOptions {
    /// Default for [Self::buffer_size]
    pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

    /// Default for [Self::max_line_len]
    pub const DEFAULT_MAX_LINE_LEN: usize = 4 * 1024;

    /// Default for [Self::chunk_size]
    pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

    const MIN_BUFFER_SIZE: usize = 1024;

    /// Sets [Self::buffer_size]. Values under 1 KiB are raised to 1 KiB.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = cmp::max(buffer_size, Self::MIN_BUFFER_SIZE);
        self
    }

    /// Sets [Self::max_line_len]
    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    /// Sets [Self::chunk_size]. Zero is raised to one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = cmp::max(chunk_size, 1);
        self
    }

    pub(crate) fn effective_buffer_size(&self) -> usize {
        cmp::max(self.buffer_size, Self::MIN_BUFFER_SIZE)
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            buffer_size: Self::DEFAULT_BUFFER_SIZE,
            max_line_len: Self::DEFAULT_MAX_LINE_LEN,
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
        }
    }
}
