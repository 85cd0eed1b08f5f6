use flate2::{Decompress, FlushDecompress, Status};
use tracing::trace;

use crate::{
    error::{Error, TruncationError},
    Codec,
};

use super::{Decompressor, HasMoreInput, Outcome};

/// Raw deflate (RFC 1951). Also used by [GzipDec](super::gzip_dec::GzipDec)
/// for the body of each gzip member.
pub(crate) struct DeflateDec {
    /// flate2's inflater, which keeps its own 32 KiB window
    inner: Decompress,

    /// Codec reported in errors
    codec: Codec,

    /// Set once the final deflate block was decoded
    eof: bool,
}

impl Default for DeflateDec {
    fn default() -> Self {
        Self::new(Codec::Deflate)
    }
}

impl DeflateDec {
    pub(crate) fn new(codec: Codec) -> Self {
        Self {
            // no zlib header: raw deflate
            inner: Decompress::new(false),
            codec,
            eof: false,
        }
    }
}

impl Decompressor for DeflateDec {
    fn decompress(
        &mut self,
        in_buf: &[u8],
        out: &mut [u8],
        has_more_input: HasMoreInput,
    ) -> Result<Outcome, Error> {
        if self.eof {
            return Ok(Outcome::default());
        }

        let before_in = self.inner.total_in();
        let before_out = self.inner.total_out();

        let status = self
            .inner
            .decompress(in_buf, out, FlushDecompress::None)
            .map_err(|e| Error::decompression(self.codec, e.to_string()))?;

        let outcome = Outcome {
            bytes_read: (self.inner.total_in() - before_in) as usize,
            bytes_written: (self.inner.total_out() - before_out) as usize,
        };
        trace!(
            in_buf_len = in_buf.len(),
            out_len = out.len(),
            ?status,
            ?outcome,
            total_in = self.inner.total_in(),
            total_out = self.inner.total_out(),
            "DeflateDec::decompress",
        );

        match status {
            Status::StreamEnd => {
                self.eof = true;
            }
            Status::Ok | Status::BufError => {
                if in_buf.is_empty()
                    && outcome.bytes_written == 0
                    && has_more_input == HasMoreInput::No
                {
                    return Err(TruncationError::Compressed { codec: self.codec }.into());
                }
            }
        }

        Ok(outcome)
    }

    fn is_done(&self) -> bool {
        self.eof
    }
}
