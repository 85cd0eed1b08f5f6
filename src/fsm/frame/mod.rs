mod chunked;
mod identity;

use crate::{error::Error, DecodeOptions};

use super::{HasMoreInput, Outcome};

/// Strips transfer framing off raw body bytes, yielding payload bytes.
pub(crate) trait Framer {
    /// Consumes bytes from `in_buf` and writes payload bytes to `out`.
    ///
    /// Implementations make as much progress as the two buffers allow. When
    /// `has_more_input` is [HasMoreInput::No] and all of `in_buf` was consumed
    /// without reaching the end of the framing, that's a truncation error.
    fn unframe(
        &mut self,
        in_buf: &[u8],
        out: &mut [u8],
        has_more_input: HasMoreInput,
    ) -> Result<Outcome, Error>;

    /// Whether the end of the framed body was seen. Once this is true,
    /// no more bytes are consumed.
    fn is_done(&self) -> bool;
}

pub(crate) enum AnyFramer {
    Identity(identity::IdentityFramer),
    Chunked(chunked::ChunkFramer),
}

impl AnyFramer {
    pub(crate) fn new(chunked: bool, options: &DecodeOptions) -> Self {
        if chunked {
            Self::Chunked(chunked::ChunkFramer::new(options.max_line_len))
        } else {
            Self::Identity(Default::default())
        }
    }

    pub(crate) fn is_chunked(&self) -> bool {
        matches!(self, Self::Chunked(_))
    }
}

impl Framer for AnyFramer {
    #[inline]
    fn unframe(
        &mut self,
        in_buf: &[u8],
        out: &mut [u8],
        has_more_input: HasMoreInput,
    ) -> Result<Outcome, Error> {
        match self {
            Self::Identity(framer) => framer.unframe(in_buf, out, has_more_input),
            Self::Chunked(framer) => framer.unframe(in_buf, out, has_more_input),
        }
    }

    #[inline]
    fn is_done(&self) -> bool {
        match self {
            Self::Identity(framer) => framer.is_done(),
            Self::Chunked(framer) => framer.is_done(),
        }
    }
}
