use oval::Buffer;
use tracing::trace;

use crate::{
    error::{Error, TruncationError},
    Codec, DecodeOptions,
};

use super::{
    decompress::{AnyDecompressor, Decompressor},
    frame::{AnyFramer, Framer},
    FsmResult, HasMoreInput, Outcome,
};

#[derive(Default)]
enum State {
    /// Payload goes through the framer, then the decompressor
    Decoding { decompressor: AnyDecompressor },

    /// The compressed stream ended: the framer is still driven to its own
    /// end, and whatever payload it yields is thrown away
    Draining {
        /// Payload bytes discarded so far
        discarded: u64,
    },

    Done,

    #[default]
    Transition,
}

/// A state machine that decodes one HTTP message body: it removes chunked
/// framing (if any), then decompresses the payload (if compressed).
///
/// Both stages are picked once, when the state machine is created.
/// Memory use is bounded by two buffers of
/// [buffer_size](DecodeOptions::buffer_size) bytes each, a chunk line buffer
/// of at most [max_line_len](DecodeOptions::max_line_len) bytes, plus the
/// codec's own state, no matter how large the body is. For gzip, that state
/// includes a header buffer of up to 64 KiB (file name and comment
/// included), whatever `buffer_size` is.
pub struct BodyFsm {
    state: State,
    framer: AnyFramer,
    codec: Codec,

    /// Raw bytes from the body source
    raw: Buffer,

    /// Payload bytes, with the framing removed
    framed: Buffer,

    /// Total bytes handed to us through [Self::fill]
    raw_bytes_read: u64,

    eof: bool,
}

impl BodyFsm {
    /// Create a new state machine with the default [DecodeOptions].
    ///
    /// Fails if `codec` was not enabled at build time.
    pub fn new(chunked: bool, codec: Codec) -> Result<Self, Error> {
        Self::with_options(chunked, codec, &DecodeOptions::default())
    }

    /// Create a new state machine with custom [DecodeOptions].
    pub fn with_options(
        chunked: bool,
        codec: Codec,
        options: &DecodeOptions,
    ) -> Result<Self, Error> {
        let buffer_size = options.effective_buffer_size();
        trace!(chunked, %codec, buffer_size, max_line_len = options.max_line_len, "new body fsm");

        Ok(Self {
            state: State::Decoding {
                decompressor: AnyDecompressor::new(codec)?,
            },
            framer: AnyFramer::new(chunked, options),
            codec,
            raw: Buffer::with_capacity(buffer_size),
            framed: Buffer::with_capacity(buffer_size),
            raw_bytes_read: 0,
            eof: false,
        })
    }

    /// Whether chunked framing is being removed
    pub fn is_chunked(&self) -> bool {
        self.framer.is_chunked()
    }

    /// The codec being undone
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Total number of raw bytes received so far
    pub fn raw_bytes_read(&self) -> u64 {
        self.raw_bytes_read
    }

    /// If this returns true, the caller should read data into
    /// [Self::space], then call [Self::fill] with the number
    /// of bytes written.
    ///
    /// This only asks for more once every buffered byte was used up, so
    /// that a blocking source is never waited on while there's still
    /// something to decode.
    pub fn wants_read(&self) -> bool {
        match self.state {
            State::Decoding { .. } | State::Draining { .. } => {
                !self.eof && !self.framer.is_done() && self.raw.available_data() == 0
            }
            State::Done => false,
            State::Transition => unreachable!(),
        }
    }

    /// Returns a mutable slice with all the available space to write to.
    ///
    /// After writing to this, call [Self::fill] with the number of bytes written.
    #[inline]
    pub fn space(&mut self) -> &mut [u8] {
        if self.raw.available_space() == 0 {
            self.raw.shift();
        }
        self.raw.space()
    }

    /// After having written data to [Self::space], call this to indicate how
    /// many bytes were written.
    ///
    /// If this is called with zero, it indicates the source reached
    /// end-of-stream.
    #[inline]
    pub fn fill(&mut self, count: usize) -> usize {
        if count == 0 {
            trace!(raw_bytes_read = self.raw_bytes_read, "body source eof");
            self.eof = true;
        }
        self.raw_bytes_read += count as u64;
        self.raw.fill(count)
    }

    /// Raw bytes received but not consumed yet. Once a chunked body's end
    /// was seen, these are the bytes that came after it.
    pub fn leftover(&self) -> &[u8] {
        self.raw.data()
    }

    /// Decode as much as possible into `out`.
    ///
    /// Returns [FsmResult::Continue] with the number of bytes written, which
    /// is zero only if more input is needed (see [Self::wants_read]) or
    /// `out` is empty. Returns [FsmResult::Done] once the body was fully
    /// decoded and validated.
    pub fn process(mut self, out: &mut [u8]) -> Result<FsmResult<(Self, Outcome), ()>, Error> {
        use State as S;

        if out.is_empty() && !matches!(self.state, S::Done) {
            return Ok(FsmResult::Continue((self, Outcome::default())));
        }

        loop {
            match &mut self.state {
                S::Decoding { decompressor } => {
                    let unframed =
                        unframe(&mut self.framer, &mut self.raw, &mut self.framed, self.eof)?;
                    let has_more_input = HasMoreInput::from_eof(self.framer.is_done());
                    let outcome = decompressor.decompress(self.framed.data(), out, has_more_input)?;
                    self.framed.consume(outcome.bytes_read);
                    trace!(?unframed, ?outcome, eof = self.eof, "decoding");

                    if outcome.bytes_written > 0 {
                        return Ok(FsmResult::Continue((self, outcome)));
                    }

                    if decompressor.is_done() {
                        let codec = self.codec;
                        transition!(self.state => (S::Decoding { .. }) {
                            trace!(%codec, "end of compressed stream");
                            S::Draining { discarded: 0 }
                        });
                        continue;
                    }

                    if unframed == Outcome::default() && outcome.bytes_read == 0 {
                        if self.eof || self.framer.is_done() {
                            // every stage has seen the end of its input and
                            // none of them reported an error or an end
                            return Err(TruncationError::Compressed { codec: self.codec }.into());
                        }
                        return Ok(FsmResult::Continue((self, outcome)));
                    }
                }
                S::Draining { discarded } => {
                    let unframed =
                        unframe(&mut self.framer, &mut self.raw, &mut self.framed, self.eof)?;
                    let n = self.framed.available_data();
                    self.framed.consume(n);
                    *discarded += n as u64;

                    if self.framer.is_done() {
                        trace!(discarded = *discarded, "end of body");
                        self.state = S::Done;
                        continue;
                    }
                    if unframed == Outcome::default() {
                        return Ok(FsmResult::Continue((self, Outcome::default())));
                    }
                }
                S::Done => return Ok(FsmResult::Done(())),
                S::Transition => {
                    unreachable!("the state machine should never be in the transition state")
                }
            }
        }
    }
}

/// Runs the framer over buffered raw bytes, appending payload to `framed`.
fn unframe(
    framer: &mut AnyFramer,
    raw: &mut Buffer,
    framed: &mut Buffer,
    eof: bool,
) -> Result<Outcome, Error> {
    if framer.is_done() {
        return Ok(Outcome::default());
    }
    if framed.available_space() == 0 {
        framed.shift();
        if framed.available_space() == 0 {
            // the decompressor has to catch up first
            return Ok(Outcome::default());
        }
    }

    let outcome = framer.unframe(raw.data(), framed.space(), HasMoreInput::from_eof(eof))?;
    raw.consume(outcome.bytes_read);
    framed.fill(outcome.bytes_written);
    Ok(outcome)
}
