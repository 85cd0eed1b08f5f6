#![warn(missing_docs)]

//! dechunk decodes HTTP message bodies as a stream: it undoes chunked
//! transfer-encoding framing and gzip, raw deflate or bzip2 content
//! compression, without ever holding the whole body in memory.
//!
//! The core is a [sans-io](https://sans-io.readthedocs.io/how-to-sans-io.html)
//! state machine, [fsm::BodyFsm], which never touches a socket or a file
//! itself. Two front-ends drive it:
//!
//!   * [reader::sync] (feature `sync`, on by default) for `std::io::Read` sources
//!   * [reader::tokio] (feature `tokio`) for `tokio::io::AsyncRead` sources
//!
//! ```
//! # fn main() -> Result<(), dechunk::Error> {
//! use dechunk::Codec;
//!
//! let wire = b"4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n";
//! let mut body = Vec::new();
//! for chunk in dechunk::decode(&wire[..], true, Codec::None) {
//!     body.extend_from_slice(&chunk?);
//! }
//! assert_eq!(body, b"Wikipedia");
//! # Ok(())
//! # }
//! ```

mod codec;
pub use codec::Codec;

pub mod error;
pub use error::{Error, ErrorKind};

pub mod fsm;

mod options;
pub use options::DecodeOptions;

pub mod reader;

#[cfg(feature = "sync")]
pub use reader::sync::{decode, decode_with_options, BodyReader, DecodedChunks};

#[cfg(feature = "tokio")]
pub use reader::tokio::{decode_async, decode_async_with_options, AsyncBodyReader, DecodedStream};
