//! Async front-end, over any [AsyncRead].
//!
//! The decoder has no suspension points of its own: it only waits when the
//! source does.

use std::{
    io,
    pin::Pin,
    task::{self, ready, Poll},
};

use futures::stream::{FusedStream, Stream};
use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, ReadBuf};
use tracing::trace;

use crate::{
    fsm::{BodyFsm, FsmResult},
    Codec, DecodeOptions, Error,
};

/// Decodes a body read from `source`, as a stream of byte chunks.
///
/// If `codec` can't be decoded by this build, the first item is the error.
pub fn decode_async<R>(source: R, chunked: bool, codec: Codec) -> DecodedStream<R>
where
    R: AsyncRead,
{
    decode_async_with_options(source, chunked, codec, &DecodeOptions::default())
}

/// Like [decode_async], with custom [DecodeOptions].
pub fn decode_async_with_options<R>(
    source: R,
    chunked: bool,
    codec: Codec,
    options: &DecodeOptions,
) -> DecodedStream<R>
where
    R: AsyncRead,
{
    let (reader, failed) = match AsyncBodyReader::with_options(source, chunked, codec, options) {
        Ok(reader) => (Some(reader), None),
        Err(e) => (None, Some(e)),
    };
    DecodedStream {
        reader,
        failed,
        chunk: Vec::new(),
        filled: 0,
        chunk_size: options.chunk_size.max(1),
    }
}

pin_project! {
    /// Reads the decoded body out of a raw body source.
    ///
    /// Like its blocking counterpart, it's poisoned by the first error.
    pub struct AsyncBodyReader<R>
    where
        R: AsyncRead,
    {
        #[pin]
        rd: R,
        fsm: Option<BodyFsm>,
    }
}

impl<R> AsyncBodyReader<R>
where
    R: AsyncRead,
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
    pub fn poll_read_decoded(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
        buf: &mut [u8],
    ) -> Poll<Result<usize, Error>> {
        let mut this = self.project();
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }

        loop {
            let mut fsm = match this.fsm.take() {
                Some(fsm) => fsm,
                None => return Poll::Ready(Ok(0)),
            };

            if fsm.wants_read() {
                let mut read_buf = ReadBuf::new(fsm.space());
                match this.rd.as_mut().poll_read(cx, &mut read_buf) {
                    Poll::Ready(Ok(())) => {}
                    Poll::Ready(Err(e)) => return Poll::Ready(Err(e.into())),
                    Poll::Pending => {
                        *this.fsm = Some(fsm);
                        return Poll::Pending;
                    }
                }
                let n = read_buf.filled().len();
                trace!("giving fsm {} bytes from source", n);
                fsm.fill(n);
            }

            match fsm.process(buf) {
                Ok(FsmResult::Continue((fsm, outcome))) => {
                    *this.fsm = Some(fsm);
                    if outcome.bytes_written > 0 {
                        return Poll::Ready(Ok(outcome.bytes_written));
                    }
                }
                Ok(FsmResult::Done(())) => {
                    trace!("body fully decoded");
                    return Poll::Ready(Ok(0));
                }
                Err(e) => return Poll::Ready(Err(e)),
            }
        }
    }
}

impl<R> AsyncRead for AsyncBodyReader<R>
where
    R: AsyncRead,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let n = ready!(self.poll_read_decoded(cx, buf.initialize_unfilled()))?;
        buf.advance(n);
        Poll::Ready(Ok(()))
    }
}

pin_project! {
    /// The decoded body, as a stream of byte chunks.
    ///
    /// Chunks are at most [chunk_size](DecodeOptions::chunk_size) bytes long,
    /// and never empty. A chunk is handed out early if the source has nothing
    /// ready. The stream ends after the first error.
    pub struct DecodedStream<R>
    where
        R: AsyncRead,
    {
        #[pin]
        reader: Option<AsyncBodyReader<R>>,
        failed: Option<Error>,
        chunk: Vec<u8>,
        filled: usize,
        chunk_size: usize,
    }
}

impl<R> Stream for DecodedStream<R>
where
    R: AsyncRead,
{
    type Item = Result<Vec<u8>, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        if let Some(e) = this.failed.take() {
            return Poll::Ready(Some(Err(e)));
        }

        loop {
            let reader = match this.reader.as_mut().as_pin_mut() {
                Some(reader) => reader,
                None => return Poll::Ready(None),
            };
            if this.chunk.len() != *this.chunk_size {
                this.chunk.resize(*this.chunk_size, 0);
            }

            match reader.poll_read_decoded(cx, &mut this.chunk[*this.filled..]) {
                Poll::Pending if *this.filled == 0 => return Poll::Pending,
                Poll::Pending => {}
                Poll::Ready(Ok(0)) => {
                    this.reader.set(None);
                    if *this.filled == 0 {
                        return Poll::Ready(None);
                    }
                }
                Poll::Ready(Ok(n)) => {
                    *this.filled += n;
                    if *this.filled < *this.chunk_size {
                        continue;
                    }
                }
                Poll::Ready(Err(e)) => {
                    this.reader.set(None);
                    if *this.filled == 0 {
                        return Poll::Ready(Some(Err(e)));
                    }
                    // hand out what was decoded first
                    *this.failed = Some(e);
                }
            }

            let mut chunk = std::mem::take(this.chunk);
            chunk.truncate(*this.filled);
            *this.filled = 0;
            return Poll::Ready(Some(Ok(chunk)));
        }
    }
}

impl<R> FusedStream for DecodedStream<R>
where
    R: AsyncRead,
{
    fn is_terminated(&self) -> bool {
        self.reader.is_none() && self.failed.is_none()
    }
}
