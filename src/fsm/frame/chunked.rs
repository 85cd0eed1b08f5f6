use std::cmp;

use pretty_hex::PrettyHex;
use tracing::trace;
use winnow::{
    combinator::{eof, opt, preceded, rest},
    token::take_while,
    PResult, Parser,
};

use crate::error::{Error, FramingError, TruncationError};

use super::{Framer, HasMoreInput, Outcome};

#[derive(Debug, Clone, Copy, Default)]
enum State {
    /// Accumulating a chunk-size line
    #[default]
    SizeLine,

    /// Passing chunk payload through
    Data {
        /// Payload bytes left in the current chunk
        remaining: u64,
    },

    /// Expecting the line break that follows chunk payload
    DataTerminator {
        /// Whether the CR of a CRLF was already consumed
        seen_cr: bool,
    },

    /// After the last chunk: skipping trailer lines up to an empty one
    Trailers,

    Done,
}

/// Undoes chunked transfer-encoding (RFC 9112, section 7.1).
pub(crate) struct ChunkFramer {
    state: State,

    /// Partial chunk-size or trailer line, without its line break. Cleared
    /// after each complete line; never longer than `max_line_len + 1`.
    line: Vec<u8>,

    max_line_len: usize,

    /// Number of chunks seen so far, including the last one
    chunks: u64,
}

impl ChunkFramer {
    pub(crate) fn new(max_line_len: usize) -> Self {
        Self {
            state: State::SizeLine,
            line: Vec::with_capacity(cmp::min(max_line_len.saturating_add(1), 64)),
            max_line_len,
            chunks: 0,
        }
    }

    /// Moves bytes from `input` into the line buffer, up to and including the
    /// next LF. Returns true if a whole line is now buffered, with its line
    /// break stripped.
    fn take_line(&mut self, input: &[u8], outcome: &mut Outcome) -> Result<bool, FramingError> {
        let (part, complete) = match input.iter().position(|&b| b == b'\n') {
            Some(pos) => (&input[..pos], true),
            None => (input, false),
        };

        // leave room for the CR of a CRLF line break
        if self.line.len() + part.len() > self.max_line_len.saturating_add(1) {
            return Err(FramingError::LineTooLong {
                max: self.max_line_len,
            });
        }
        self.line.extend_from_slice(part);
        outcome.bytes_read += part.len() + usize::from(complete);

        if complete {
            if self.line.last() == Some(&b'\r') {
                self.line.pop();
            }
            if self.line.len() > self.max_line_len {
                return Err(FramingError::LineTooLong {
                    max: self.max_line_len,
                });
            }
        }
        Ok(complete)
    }

    fn truncation(&self) -> TruncationError {
        match self.state {
            State::SizeLine => TruncationError::ChunkSizeLine,
            State::Data { remaining } => TruncationError::ChunkData { remaining },
            State::DataTerminator { .. } => TruncationError::ChunkTerminator,
            State::Trailers => TruncationError::Trailers,
            State::Done => unreachable!("a finished body cannot be truncated"),
        }
    }
}

impl Framer for ChunkFramer {
    fn unframe(
        &mut self,
        in_buf: &[u8],
        out: &mut [u8],
        has_more_input: HasMoreInput,
    ) -> Result<Outcome, Error> {
        let mut outcome = Outcome::default();

        loop {
            let input = &in_buf[outcome.bytes_read..];
            match self.state {
                State::SizeLine => {
                    if !self.take_line(input, &mut outcome)? {
                        break;
                    }
                    let size = parse_chunk_size(&self.line)?;
                    self.line.clear();
                    self.chunks += 1;
                    trace!(chunk = self.chunks, size, "chunk header");

                    self.state = if size == 0 {
                        State::Trailers
                    } else {
                        State::Data { remaining: size }
                    };
                }
                State::Data { remaining } => {
                    let out = &mut out[outcome.bytes_written..];
                    let len = cmp::min(input.len(), out.len());
                    let len = cmp::min(len as u64, remaining) as usize;
                    if len == 0 {
                        break;
                    }

                    out[..len].copy_from_slice(&input[..len]);
                    outcome.bytes_read += len;
                    outcome.bytes_written += len;

                    let remaining = remaining - len as u64;
                    self.state = if remaining == 0 {
                        State::DataTerminator { seen_cr: false }
                    } else {
                        State::Data { remaining }
                    };
                }
                State::DataTerminator { seen_cr } => {
                    let Some(&byte) = input.first() else {
                        break;
                    };
                    self.state = match byte {
                        b'\r' if !seen_cr => State::DataTerminator { seen_cr: true },
                        b'\n' => State::SizeLine,
                        found => return Err(FramingError::MissingChunkTerminator { found }.into()),
                    };
                    outcome.bytes_read += 1;
                }
                State::Trailers => {
                    if !self.take_line(input, &mut outcome)? {
                        break;
                    }
                    if self.line.is_empty() {
                        trace!(chunks = self.chunks, "end of chunked body");
                        self.state = State::Done;
                    } else {
                        trace!(len = self.line.len(), "skipping trailer line");
                        self.line.clear();
                    }
                }
                State::Done => break,
            }
        }

        if !self.is_done()
            && has_more_input == HasMoreInput::No
            && outcome.bytes_read == in_buf.len()
            && outcome.bytes_written == 0
        {
            return Err(self.truncation().into());
        }

        Ok(outcome)
    }

    fn is_done(&self) -> bool {
        matches!(self.state, State::Done)
    }
}

/// Hex digits, optional whitespace, then either nothing or a chunk extension.
fn chunk_size_line<'i>(i: &mut &'i [u8]) -> PResult<&'i [u8]> {
    let digits = take_while(1.., (b'0'..=b'9', b'a'..=b'f', b'A'..=b'F')).parse_next(i)?;
    let _ = take_while(0.., (b' ', b'\t')).parse_next(i)?;
    let _ = opt(preceded(b';', rest)).parse_next(i)?;
    let _ = eof.parse_next(i)?;
    Ok(digits)
}

fn parse_chunk_size(line: &[u8]) -> Result<u64, FramingError> {
    let mut input = line;
    let digits = match chunk_size_line.parse_next(&mut input) {
        Ok(digits) => digits,
        Err(_) => {
            trace!("rejected chunk size line: {}", line.hex_dump());
            return Err(FramingError::InvalidChunkSize {
                line: String::from_utf8_lossy(line).into_owned(),
            });
        }
    };

    digits
        .iter()
        .try_fold(0u64, |size, &digit| {
            let digit = char::from(digit).to_digit(16)?;
            size.checked_mul(16)?.checked_add(u64::from(digit))
        })
        .ok_or_else(|| FramingError::ChunkSizeOverflow {
            line: String::from_utf8_lossy(line).into_owned(),
        })
}
