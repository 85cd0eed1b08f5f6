//! Blocking front-end, over any [io::Read].

use std::{io, iter::FusedIterator};

use tracing::trace;

use crate::{
    fsm::{BodyFsm, FsmResult},
    Codec, DecodeOptions, Error,
};

/// Decodes a body read from `source`, as a sequence of byte chunks.
///
/// Pass `&mut source` to keep using the source afterwards: the decoder never
/// closes it. Bytes read past the end of a chunked body are not decoded.
///
/// If `codec` can't be decoded by this build, the first item is the error.
pub fn decode<R>(source: R, chunked: bool, codec: Codec) -> DecodedChunks<R>
where
    R: io::Read,
{
    decode_with_options(source, chunked, codec, &DecodeOptions::default())
}

/// Like [decode], with custom [DecodeOptions].
pub fn decode_with_options<R>(
    source: R,
    chunked: bool,
    codec: Codec,
    options: &DecodeOptions,
) -> DecodedChunks<R>
where
    R: io::Read,
{
    let state = match BodyReader::with_options(source, chunked, codec, options) {
        Ok(reader) => ChunksState::Reading(reader),
        Err(e) => ChunksState::Failed(e),
    };
    DecodedChunks {
        state,
        chunk_size: options.chunk_size.max(1),
    }
}

/// Reads the decoded body out of a raw body source.
///
/// Errors are reported as [io::Error] by the [io::Read] implementation (see
/// the `From<Error>` implementation for how they map), after which the reader
/// is poisoned: it only ever returns `Ok(0)` again.
pub struct BodyReader<R>
where
    R: io::Read,
{
    rd: R,
    fsm: Option<BodyFsm>,
}

impl<R> BodyReader<R>
where
    R: io::Read,
{
    /// Create a reader with the default [DecodeOptions].
    pub fn new(rd: R, chunked: bool, codec: Codec) -> Result<Self, Error> {
        Self::with_options(rd, chunked, codec, &DecodeOptions::default())
    }

    /// Create a reader with custom [DecodeOptions].
    pub fn with_options(
        rd: R,
        chunked: bool,
        codec: Codec,
        options: &DecodeOptions,
    ) -> Result<Self, Error> {
        Ok(Self {
            rd,
            fsm: Some(BodyFsm::with_options(chunked, codec, options)?),
        })
    }

    /// Whether the body was fully decoded, or decoding failed.
    pub fn is_finished(&self) -> bool {
        self.fsm.is_none()
    }

    /// Gives the source back.
    pub fn into_inner(self) -> R {
        self.rd
    }

    /// Reads decoded bytes into `buf`, returning the typed error on failure.
    /// `Ok(0)` means the body is over (or `buf` is empty).
    pub fn read_decoded(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            let mut fsm = match self.fsm.take() {
                Some(fsm) => fsm,
                None => return Ok(0),
            };

            if fsm.wants_read() {
                let n = match self.rd.read(fsm.space()) {
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                        self.fsm = Some(fsm);
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };
                trace!("giving fsm {} bytes from source", n);
                fsm.fill(n);
            }

            match fsm.process(buf)? {
                FsmResult::Continue((fsm, outcome)) => {
                    self.fsm = Some(fsm);
                    if outcome.bytes_written > 0 {
                        return Ok(outcome.bytes_written);
                    }
                    // needs more input
                }
                FsmResult::Done(()) => {
                    trace!("body fully decoded");
                    return Ok(0);
                }
            }
        }
    }
}

impl<R> io::Read for BodyReader<R>
where
    R: io::Read,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_decoded(buf)?)
    }
}

/// The decoded body, as an iterator of byte chunks.
///
/// Chunks are at most [chunk_size](DecodeOptions::chunk_size) bytes long,
/// and never empty. Their boundaries have nothing to do with the chunks on
/// the wire. The iterator ends after the first error.
pub struct DecodedChunks<R>
where
    R: io::Read,
{
    state: ChunksState<R>,
    chunk_size: usize,
}

enum ChunksState<R>
where
    R: io::Read,
{
    Failed(Error),
    Reading(BodyReader<R>),
    Finished,
}

impl<R> Iterator for DecodedChunks<R>
where
    R: io::Read,
{
    type Item = Result<Vec<u8>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match std::mem::replace(&mut self.state, ChunksState::Finished) {
            ChunksState::Failed(e) => Some(Err(e)),
            ChunksState::Finished => None,
            ChunksState::Reading(mut reader) => {
                let mut chunk = vec![0u8; self.chunk_size];
                let mut filled = 0;

                // fill the chunk as far as the decoder goes, so that small
                // source reads don't turn into tiny chunks
                while filled < chunk.len() {
                    match reader.read_decoded(&mut chunk[filled..]) {
                        Ok(0) => break,
                        Ok(n) => filled += n,
                        Err(e) if filled == 0 => return Some(Err(e)),
                        Err(e) => {
                            // hand out what was decoded first
                            self.state = ChunksState::Failed(e);
                            chunk.truncate(filled);
                            return Some(Ok(chunk));
                        }
                    }
                }

                if filled == 0 {
                    return None;
                }
                chunk.truncate(filled);
                if !reader.is_finished() {
                    self.state = ChunksState::Reading(reader);
                }
                Some(Ok(chunk))
            }
        }
    }
}

impl<R> FusedIterator for DecodedChunks<R> where R: io::Read {}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn borrows_the_source() {
        let mut source = io::Cursor::new(b"3\r\nabc\r\n0\r\n\r\n".to_vec());
        let body = decode(&mut source, true, Codec::None)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
            .concat();
        assert_eq!(body, b"abc");
        assert_eq!(source.position(), 13);
    }

    #[test]
    fn chunks_are_bounded() {
        let input = vec![b'x'; 1000];
        let options = DecodeOptions::default().with_chunk_size(300);
        let sizes: Vec<usize> = decode_with_options(&input[..], false, Codec::None, &options)
            .map(|chunk| chunk.unwrap().len())
            .collect();
        assert_eq!(sizes, [300, 300, 300, 100]);
    }

    struct OneByteAtATime<'a>(&'a [u8]);

    impl io::Read for OneByteAtATime<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match (self.0.split_first(), buf.first_mut()) {
                (Some((&b, rest)), Some(slot)) => {
                    *slot = b;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    #[test]
    fn output_before_an_error_is_handed_out() {
        let source = OneByteAtATime(b"3\r\nabc\r\nzz\r\n");
        let mut chunks = decode(source, true, Codec::None);
        assert_eq!(chunks.next().unwrap().unwrap(), b"abc");
        assert!(chunks.next().unwrap().is_err());
        assert!(chunks.next().is_none());
    }

    #[test]
    fn poisoned_after_error() {
        let mut chunks = decode(&b"zz\r\n"[..], true, Codec::None);
        let err = chunks.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Framing);
        assert!(chunks.next().is_none());

        let mut reader = BodyReader::new(&b"zz\r\n"[..], true, Codec::None).unwrap();
        let mut buf = [0u8; 16];
        let err = reader.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(reader.is_finished());
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn empty_read_buffer() {
        let mut reader = BodyReader::new(&b"abc"[..], false, Codec::None).unwrap();
        assert_eq!(reader.read(&mut []).unwrap(), 0);
        assert!(!reader.is_finished());

        let mut body = String::new();
        reader.read_to_string(&mut body).unwrap();
        assert_eq!(body, "abc");
    }
}
