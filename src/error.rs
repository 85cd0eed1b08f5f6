//! All error types used in this crate

use crate::Codec;

/// Any body-decoding error, from broken chunk framing to corrupted
/// compressed data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The chunked transfer-encoding framing is malformed.
    #[error("framing: {0}")]
    Framing(#[from] FramingError),

    /// The body ended before the framer or the decompressor was done with it.
    #[error("truncated: {0}")]
    Truncated(#[from] TruncationError),

    /// Decompression-related error
    #[error("{codec} decompression error: {msg}")]
    Decompression {
        /// The codec that failed
        codec: Codec,
        /// Additional information
        msg: String,
    },

    /// Something is not supported by this crate, or not by this build of it
    #[error("unsupported: {0}")]
    Unsupported(#[from] UnsupportedError),

    /// I/O-related error
    ///
    /// Only returned by the reader front-ends, since [BodyFsm](crate::fsm::BodyFsm)
    /// lets you do your own I/O.
    #[error("io: {0}")]
    IO(#[from] std::io::Error),
}

/// Coarse classification of an [Error], for callers that map decoding
/// failures onto their own retry or reporting policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [Error::Framing]
    Framing,
    /// See [Error::Truncated]
    Truncation,
    /// See [Error::Decompression]
    Decompression,
    /// See [Error::Unsupported]
    Unsupported,
    /// See [Error::IO]
    Io,
}

impl Error {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Framing(_) => ErrorKind::Framing,
            Error::Truncated(_) => ErrorKind::Truncation,
            Error::Decompression { .. } => ErrorKind::Decompression,
            Error::Unsupported(_) => ErrorKind::Unsupported,
            Error::IO(_) => ErrorKind::Io,
        }
    }

    /// Create a new error indicating that the given codec is not enabled.
    pub fn codec_not_enabled(codec: Codec) -> Self {
        Self::Unsupported(UnsupportedError::CodecNotEnabled(codec))
    }

    pub(crate) fn decompression(codec: Codec, msg: impl Into<String>) -> Self {
        Self::Decompression {
            codec,
            msg: msg.into(),
        }
    }
}

/// Chunked transfer-encoding syntax errors.
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    /// The chunk-size line does not start with a hexadecimal number, or has
    /// something other than a chunk extension after it.
    #[error("invalid chunk size line: {line:?}")]
    InvalidChunkSize {
        /// the offending line, lossily decoded, without its line break
        line: String,
    },

    /// The chunk size does not fit in 64 bits.
    #[error("chunk size overflows 64 bits: {line:?}")]
    ChunkSizeOverflow {
        /// the offending line, lossily decoded, without its line break
        line: String,
    },

    /// Chunk data was not followed by a line break.
    #[error("expected line break after chunk data, found byte {found:#04x}")]
    MissingChunkTerminator {
        /// the first unexpected byte
        found: u8,
    },

    /// A chunk-size or trailer line is longer than allowed.
    #[error("line exceeds {max} bytes")]
    LineTooLong {
        /// the configured maximum, see [DecodeOptions](crate::DecodeOptions)
        max: usize,
    },
}

/// The body source reached end-of-stream in the middle of something.
#[derive(Debug, thiserror::Error)]
pub enum TruncationError {
    /// In the middle of, or before, a chunk-size line
    #[error("end of stream while reading chunk size line")]
    ChunkSizeLine,

    /// In the middle of chunk data
    #[error("end of stream with {remaining} bytes of chunk data remaining")]
    ChunkData {
        /// how many bytes the chunk still announced
        remaining: u64,
    },

    /// Right after chunk data, before its line break
    #[error("end of stream while reading chunk terminator")]
    ChunkTerminator,

    /// After the last chunk, before the empty line ending the trailers
    #[error("end of stream while reading trailers")]
    Trailers,

    /// In the middle of a gzip member header
    #[error("end of stream while reading gzip header")]
    GzipHeader,

    /// In the middle of a gzip member trailer
    #[error("end of stream while reading gzip trailer")]
    GzipTrailer,

    /// Before the compressed stream signalled its own end
    #[error("end of stream before end of {codec} data")]
    Compressed {
        /// the codec whose stream was cut short
        codec: Codec,
    },
}

/// Some part of the body encoding is not supported by this crate.
#[derive(Debug, thiserror::Error)]
pub enum UnsupportedError {
    /// The codec is supported, but not enabled in this build.
    #[error("codec supported, but not enabled in this build: {0}")]
    CodecNotEnabled(Codec),

    /// The content-encoding token does not name a known codec.
    #[error("unknown content-encoding: {0:?}")]
    UnknownContentEncoding(String),
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::IO(e) => e,
            e @ Error::Truncated(_) => std::io::Error::new(std::io::ErrorKind::UnexpectedEof, e),
            e => std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_kinds() {
        let e: std::io::Error = Error::from(TruncationError::ChunkSizeLine).into();
        assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof);

        let e: std::io::Error = Error::from(FramingError::LineTooLong { max: 8 }).into();
        assert_eq!(e.kind(), std::io::ErrorKind::InvalidData);
        assert!(e.to_string().contains("line exceeds 8 bytes"));

        let e: std::io::Error =
            Error::IO(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone")).into();
        assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn kinds() {
        assert_eq!(
            Error::decompression(Codec::Gzip, "nope").kind(),
            ErrorKind::Decompression
        );
        assert_eq!(
            Error::codec_not_enabled(Codec::Bzip2).kind(),
            ErrorKind::Unsupported
        );
        assert_eq!(
            Error::decompression(Codec::Deflate, "bad block").to_string(),
            "deflate decompression error: bad block"
        );
    }
}
