use std::{fmt, str::FromStr};

use crate::error::UnsupportedError;

/// Content compression applied to a body, as announced by the
/// `Content-Encoding` response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Codec {
    /// No compression: bytes pass through unchanged
    #[default]
    None,
    /// A gzip container (RFC 1952) around a deflate stream
    Gzip,
    /// A raw deflate stream (RFC 1951), with no gzip or zlib container
    Deflate,
    /// A bzip2 stream
    Bzip2,
}

impl Codec {
    /// Maps a single `Content-Encoding` token to a codec. Matching ignores
    /// ASCII case and surrounding whitespace.
    pub fn from_content_encoding(token: &str) -> Result<Self, UnsupportedError> {
        let token = token.trim();
        let codec = if token.is_empty() || token.eq_ignore_ascii_case("identity") {
            Codec::None
        } else if token.eq_ignore_ascii_case("gzip") || token.eq_ignore_ascii_case("x-gzip") {
            Codec::Gzip
        } else if token.eq_ignore_ascii_case("deflate") {
            Codec::Deflate
        } else if token.eq_ignore_ascii_case("bzip2") || token.eq_ignore_ascii_case("x-bzip2") {
            Codec::Bzip2
        } else {
            return Err(UnsupportedError::UnknownContentEncoding(token.to_string()));
        };
        Ok(codec)
    }

    /// The canonical content-encoding token for this codec
    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::None => "identity",
            Codec::Gzip => "gzip",
            Codec::Deflate => "deflate",
            Codec::Bzip2 => "bzip2",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Codec {
    type Err = UnsupportedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_content_encoding(s)
    }
}
