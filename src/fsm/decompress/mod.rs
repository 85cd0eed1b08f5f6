mod store_dec;

#[cfg(feature = "deflate")]
mod deflate_dec;

#[cfg(feature = "deflate")]
mod gzip_dec;

#[cfg(feature = "bzip2")]
mod bzip2_dec;

use cfg_if::cfg_if;

use crate::{error::Error, Codec};

use super::{HasMoreInput, Outcome};

/// Turns compressed payload bytes into decompressed payload bytes.
pub(crate) trait Decompressor {
    /// Consumes bytes from `in_buf` and writes decompressed bytes to `out`,
    /// which is never empty.
    ///
    /// A call that writes nothing either consumed some input, or finished
    /// the stream (see [Self::is_done]). When `has_more_input` is
    /// [HasMoreInput::No], `in_buf` is empty, nothing is written and the
    /// stream isn't finished, that's a truncation error.
    fn decompress(
        &mut self,
        in_buf: &[u8],
        out: &mut [u8],
        has_more_input: HasMoreInput,
    ) -> Result<Outcome, Error>;

    /// Whether the compressed stream reached its logical end.
    fn is_done(&self) -> bool;
}

pub(crate) enum AnyDecompressor {
    Store(store_dec::StoreDec),
    #[cfg(feature = "deflate")]
    Gzip(Box<gzip_dec::GzipDec>),
    #[cfg(feature = "deflate")]
    Deflate(Box<deflate_dec::DeflateDec>),
    #[cfg(feature = "bzip2")]
    Bzip2(bzip2_dec::Bzip2Dec),
}

impl AnyDecompressor {
    pub(crate) fn new(codec: Codec) -> Result<Self, Error> {
        let dec = match codec {
            Codec::None => Self::Store(Default::default()),
            Codec::Gzip => {
                cfg_if! {
                    if #[cfg(feature = "deflate")] {
                        Self::Gzip(Default::default())
                    } else {
                        return Err(Error::codec_not_enabled(codec));
                    }
                }
            }
            Codec::Deflate => {
                cfg_if! {
                    if #[cfg(feature = "deflate")] {
                        Self::Deflate(Default::default())
                    } else {
                        return Err(Error::codec_not_enabled(codec));
                    }
                }
            }
            Codec::Bzip2 => {
                cfg_if! {
                    if #[cfg(feature = "bzip2")] {
                        Self::Bzip2(Default::default())
                    } else {
                        return Err(Error::codec_not_enabled(codec));
                    }
                }
            }
        };
        Ok(dec)
    }
}

impl Decompressor for AnyDecompressor {
    #[inline]
    fn decompress(
        &mut self,
        in_buf: &[u8],
        out: &mut [u8],
        has_more_input: HasMoreInput,
    ) -> Result<Outcome, Error> {
        // forward to the appropriate decompressor
        match self {
            Self::Store(dec) => dec.decompress(in_buf, out, has_more_input),
            #[cfg(feature = "deflate")]
            Self::Gzip(dec) => dec.decompress(in_buf, out, has_more_input),
            #[cfg(feature = "deflate")]
            Self::Deflate(dec) => dec.decompress(in_buf, out, has_more_input),
            #[cfg(feature = "bzip2")]
            Self::Bzip2(dec) => dec.decompress(in_buf, out, has_more_input),
        }
    }

    #[inline]
    fn is_done(&self) -> bool {
        match self {
            Self::Store(dec) => dec.is_done(),
            #[cfg(feature = "deflate")]
            Self::Gzip(dec) => dec.is_done(),
            #[cfg(feature = "deflate")]
            Self::Deflate(dec) => dec.is_done(),
            #[cfg(feature = "bzip2")]
            Self::Bzip2(dec) => dec.is_done(),
        }
    }
}
