use std::cmp;

use tracing::trace;
use winnow::{
    binary::{le_u16, le_u32, le_u8},
    error::ErrMode,
    stream::{AsBytes, Offset},
    token::{tag, take, take_till0},
    PResult, Parser, Partial,
};

use crate::{
    error::{Error, TruncationError},
    Codec,
};

use super::{deflate_dec::DeflateDec, Decompressor, HasMoreInput, Outcome};

/// Header of a gzip member (RFC 1952, section 2.3)
#[derive(Debug)]
struct GzipHeader {
    /// compression method, 8 is deflate
    method: u8,

    /// FTEXT, FHCRC, FEXTRA, FNAME, FCOMMENT and reserved bits
    flags: u8,

    /// modification time of the original file, unix timestamp
    mtime: u32,

    /// original file name, if any
    name: Option<String>,

    /// low 16 bits of the CRC32 of all header bytes before this field
    header_crc: Option<u16>,
}

impl GzipHeader {
    const MAGIC: &'static [u8] = b"\x1f\x8b";
    const METHOD_DEFLATE: u8 = 8;

    const FHCRC: u8 = 0b0000_0010;
    const FEXTRA: u8 = 0b0000_0100;
    const FNAME: u8 = 0b0000_1000;
    const FCOMMENT: u8 = 0b0001_0000;
    const FRESERVED: u8 = 0b1110_0000;

    fn parser(i: &mut Partial<&'_ [u8]>) -> PResult<Self> {
        let _ = tag(Self::MAGIC).parse_next(i)?;
        let method = le_u8.parse_next(i)?;
        let flags = le_u8.parse_next(i)?;
        let mtime = le_u32.parse_next(i)?;
        // extra flags and OS, informative only
        let _ = take(2usize).parse_next(i)?;

        if flags & Self::FEXTRA != 0 {
            let extra_len = le_u16.parse_next(i)?;
            let _ = take(extra_len).parse_next(i)?;
        }
        let name = if flags & Self::FNAME != 0 {
            Some(zero_terminated.parse_next(i)?)
        } else {
            None
        };
        if flags & Self::FCOMMENT != 0 {
            let _ = zero_terminated.parse_next(i)?;
        }
        let header_crc = if flags & Self::FHCRC != 0 {
            Some(le_u16.parse_next(i)?)
        } else {
            None
        };

        Ok(Self {
            method,
            flags,
            mtime,
            name,
            header_crc,
        })
    }
}

fn zero_terminated(i: &mut Partial<&'_ [u8]>) -> PResult<String> {
    let s = take_till0(b'\0').parse_next(i)?;
    let _ = le_u8.parse_next(i)?;
    Ok(String::from_utf8_lossy(s).into_owned())
}

#[derive(Default)]
enum State {
    /// Accumulating a member header
    Header { buf: Vec<u8> },

    /// Inflating the member's deflate stream
    Body {
        inflater: Box<DeflateDec>,
        hasher: crc32fast::Hasher,
        /// uncompressed size, modulo 2^32
        size: u32,
    },

    /// Accumulating the 8-byte member trailer
    Trailer {
        crc32: u32,
        size: u32,
        buf: Vec<u8>,
    },

    /// A member was fully verified; another one may follow
    MemberEnd,

    /// Zero bytes after the last member
    Padding,

    #[default]
    Transition,
}

/// Gzip (RFC 1952): one or more members, each a header, a raw deflate stream
/// and a CRC32/ISIZE trailer, which is verified.
pub(crate) struct GzipDec {
    state: State,

    /// Number of members fully decoded
    members: u64,

    /// Set once all input was consumed and no more is coming
    input_exhausted: bool,
}

impl Default for GzipDec {
    fn default() -> Self {
        Self {
            state: State::Header { buf: Vec::new() },
            members: 0,
            input_exhausted: false,
        }
    }
}

impl GzipDec {
    /// Longest member header accepted, file name and comment included.
    const MAX_HEADER_LEN: usize = 64 * 1024;

    const TRAILER_LEN: usize = 8;
}

impl Decompressor for GzipDec {
    fn decompress(
        &mut self,
        in_buf: &[u8],
        out: &mut [u8],
        has_more_input: HasMoreInput,
    ) -> Result<Outcome, Error> {
        use State as S;

        let mut outcome = Outcome::default();

        loop {
            let input = &in_buf[outcome.bytes_read..];
            match &mut self.state {
                S::Header { buf } => {
                    if input.is_empty() {
                        break;
                    }
                    let room = Self::MAX_HEADER_LEN - buf.len();
                    if room == 0 {
                        return Err(Error::decompression(Codec::Gzip, "gzip header too long"));
                    }
                    let take_len = cmp::min(input.len(), room);
                    let prior_len = buf.len();
                    buf.extend_from_slice(&input[..take_len]);

                    let mut header_input = Partial::new(buf.as_slice());
                    match GzipHeader::parser.parse_next(&mut header_input) {
                        Ok(header) => {
                            let consumed = header_input.as_bytes().offset_from(&buf.as_slice());
                            trace!(
                                name = ?header.name,
                                mtime = header.mtime,
                                consumed,
                                member = self.members,
                                "gzip member header"
                            );

                            if header.method != GzipHeader::METHOD_DEFLATE {
                                return Err(Error::decompression(
                                    Codec::Gzip,
                                    format!("unsupported gzip compression method {}", header.method),
                                ));
                            }
                            if header.flags & GzipHeader::FRESERVED != 0 {
                                return Err(Error::decompression(
                                    Codec::Gzip,
                                    format!("reserved gzip header flags set: {:#04x}", header.flags),
                                ));
                            }
                            if let Some(expected) = header.header_crc {
                                let actual = crc32fast::hash(&buf[..consumed - 2]) as u16;
                                if expected != actual {
                                    return Err(Error::decompression(
                                        Codec::Gzip,
                                        format!("gzip header checksum didn't match: expected {expected:04x}, got {actual:04x}"),
                                    ));
                                }
                            }

                            // the rest of what was appended belongs to the deflate stream
                            outcome.bytes_read += consumed - prior_len;
                            self.state = S::Body {
                                inflater: Box::new(DeflateDec::new(Codec::Gzip)),
                                hasher: crc32fast::Hasher::new(),
                                size: 0,
                            };
                        }
                        Err(ErrMode::Incomplete(_)) => {
                            outcome.bytes_read += take_len;
                        }
                        Err(_e) => {
                            return Err(Error::decompression(Codec::Gzip, "invalid gzip header"));
                        }
                    }
                }
                S::Body {
                    inflater,
                    hasher,
                    size,
                } => {
                    let out = &mut out[outcome.bytes_written..];
                    if out.is_empty() || (input.is_empty() && outcome.bytes_written > 0) {
                        break;
                    }

                    let step = inflater.decompress(input, out, has_more_input)?;
                    hasher.update(&out[..step.bytes_written]);
                    *size = size.wrapping_add(step.bytes_written as u32);
                    outcome.bytes_read += step.bytes_read;
                    outcome.bytes_written += step.bytes_written;

                    if inflater.is_done() {
                        transition!(self.state => (S::Body { hasher, size, .. }) {
                            S::Trailer {
                                crc32: hasher.finalize(),
                                size,
                                buf: Vec::with_capacity(Self::TRAILER_LEN),
                            }
                        });
                    } else if step == Outcome::default() {
                        break;
                    }
                }
                S::Trailer { crc32, size, buf } => {
                    let take_len = cmp::min(Self::TRAILER_LEN - buf.len(), input.len());
                    if take_len == 0 {
                        break;
                    }
                    buf.extend_from_slice(&input[..take_len]);
                    outcome.bytes_read += take_len;
                    if buf.len() < Self::TRAILER_LEN {
                        continue;
                    }

                    let (expected_crc32, expected_size) = trailer(buf);
                    if expected_crc32 != *crc32 {
                        return Err(Error::decompression(
                            Codec::Gzip,
                            format!("checksum didn't match: expected {expected_crc32:08x}, got {crc32:08x}"),
                        ));
                    }
                    if expected_size != *size {
                        return Err(Error::decompression(
                            Codec::Gzip,
                            format!("uncompressed size didn't match: expected {expected_size} (mod 2^32), got {size}"),
                        ));
                    }

                    self.members += 1;
                    trace!(members = self.members, "gzip member verified");
                    self.state = S::MemberEnd;
                }
                S::MemberEnd => {
                    self.state = match input.first() {
                        None => break,
                        Some(0) => S::Padding,
                        // the header parser rejects anything that isn't another member
                        Some(_) => S::Header { buf: Vec::new() },
                    };
                }
                S::Padding => {
                    if let Some(&byte) = input.iter().find(|&&b| b != 0) {
                        return Err(Error::decompression(
                            Codec::Gzip,
                            format!("trailing garbage after gzip data, starting with {byte:#04x}"),
                        ));
                    }
                    outcome.bytes_read += input.len();
                    break;
                }
                S::Transition => unreachable!(),
            }
        }

        if has_more_input == HasMoreInput::No && outcome.bytes_read == in_buf.len() {
            if outcome.bytes_written == 0 {
                match self.state {
                    S::Header { .. } => return Err(TruncationError::GzipHeader.into()),
                    S::Trailer { .. } => return Err(TruncationError::GzipTrailer.into()),
                    _ => {}
                }
            }
            self.input_exhausted = true;
        }

        Ok(outcome)
    }

    fn is_done(&self) -> bool {
        self.input_exhausted && matches!(self.state, State::MemberEnd | State::Padding)
    }
}

fn trailer(buf: &[u8]) -> (u32, u32) {
    let mut input = buf;
    let parsed: PResult<(u32, u32)> = (le_u32, le_u32).parse_next(&mut input);
    match parsed {
        Ok(fields) => fields,
        Err(_) => unreachable!("trailer buffer holds exactly 8 bytes"),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::{write::DeflateEncoder, Compression, GzBuilder};

    use super::*;

    fn drive(input: &[u8], step: usize) -> Result<Vec<u8>, Error> {
        let mut dec = GzipDec::default();
        let mut body = Vec::new();
        let mut out = [0u8; 5];
        let mut pos = 0;

        loop {
            let end = cmp::min(pos + step, input.len());
            let has_more = HasMoreInput::from_eof(end == input.len());
            let outcome = dec.decompress(&input[pos..end], &mut out, has_more)?;
            pos += outcome.bytes_read;
            body.extend_from_slice(&out[..outcome.bytes_written]);
            if dec.is_done() {
                return Ok(body);
            }
        }
    }

    fn gzip(payload: &[u8]) -> Vec<u8> {
        let mut enc = GzBuilder::new()
            .filename("payload.txt")
            .comment("made by a test")
            .extra(vec![b'A', b'B', 2, 0, 1, 2])
            .write(Vec::new(), Compression::default());
        enc.write_all(payload).unwrap();
        enc.finish().unwrap()
    }

    fn raw_deflate(payload: &[u8]) -> Vec<u8> {
        let mut enc = DeflateEncoder::new(Vec::new(), Compression::best());
        enc.write_all(payload).unwrap();
        enc.finish().unwrap()
    }

    /// A member with a FHCRC header checksum, which flate2 can't write
    fn gzip_with_header_crc(payload: &[u8], corrupt: bool) -> Vec<u8> {
        let mut member = vec![0x1f, 0x8b, 8, GzipHeader::FHCRC, 0, 0, 0, 0, 0, 255];
        let mut crc16 = crc32fast::hash(&member) as u16;
        if corrupt {
            crc16 ^= 1;
        }
        member.extend_from_slice(&crc16.to_le_bytes());
        member.extend_from_slice(&raw_deflate(payload));
        member.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
        member.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        member
    }

    #[test]
    fn hello_world() {
        let input = gzip(b"hello world");
        for step in [1, 2, 7, input.len()] {
            assert_eq!(drive(&input, step).unwrap(), b"hello world");
        }
    }

    #[test]
    fn header_fields_are_skipped() {
        let input = gzip(b"hello world");
        let mut header_input = Partial::new(input.as_slice());
        let header = GzipHeader::parser.parse_next(&mut header_input).unwrap();
        assert_eq!(header.name.as_deref(), Some("payload.txt"));
        assert_eq!(header.flags & GzipHeader::FEXTRA, GzipHeader::FEXTRA);
        assert_eq!(header.flags & GzipHeader::FCOMMENT, GzipHeader::FCOMMENT);
        assert_eq!(header.header_crc, None);
        assert_eq!(header.mtime, 0);

        let mut partial = Partial::new(&input[..12]);
        assert!(matches!(
            GzipHeader::parser.parse_next(&mut partial),
            Err(ErrMode::Incomplete(_))
        ));
    }

    #[test]
    fn header_checksum() {
        let input = gzip_with_header_crc(b"checked", false);
        assert_eq!(drive(&input, 1).unwrap(), b"checked");

        let input = gzip_with_header_crc(b"checked", true);
        let err = drive(&input, 3).unwrap_err();
        assert!(err.to_string().contains("header checksum"), "{err}");
    }

    #[test]
    fn concatenated_members() {
        let mut input = gzip(b"hello ");
        input.extend_from_slice(&gzip(b"world"));
        assert_eq!(drive(&input, 3).unwrap(), b"hello world");
    }

    #[test]
    fn zero_padding() {
        let mut input = gzip(b"padded");
        input.extend_from_slice(&[0u8; 16]);
        assert_eq!(drive(&input, 5).unwrap(), b"padded");
    }

    #[test]
    fn trailing_garbage() {
        let mut input = gzip(b"garbage follows");
        input.extend_from_slice(b"\0\0junk");
        assert!(matches!(
            drive(&input, 4),
            Err(Error::Decompression { codec: Codec::Gzip, .. })
        ));

        let mut input = gzip(b"garbage follows");
        input.extend_from_slice(b"junk");
        assert!(matches!(
            drive(&input, 4),
            Err(Error::Decompression { codec: Codec::Gzip, .. })
        ));
    }

    #[test]
    fn bad_magic_and_method() {
        let mut input = gzip(b"x");
        input[0] = b'P';
        let err = drive(&input, input.len()).unwrap_err();
        assert!(err.to_string().contains("invalid gzip header"), "{err}");

        let mut input = gzip(b"x");
        input[2] = 7;
        let err = drive(&input, input.len()).unwrap_err();
        assert!(err.to_string().contains("compression method 7"), "{err}");

        let mut input = gzip(b"x");
        input[3] |= 0b1000_0000;
        let err = drive(&input, input.len()).unwrap_err();
        assert!(err.to_string().contains("reserved"), "{err}");
    }

    #[test]
    fn header_too_long() {
        // a file name that never ends
        let mut input = vec![0x1f, 0x8b, 8, GzipHeader::FNAME, 0, 0, 0, 0, 0, 255];
        input.extend(std::iter::repeat(b'a').take(GzipDec::MAX_HEADER_LEN + 16));
        for step in [4096, input.len()] {
            let err = drive(&input, step).unwrap_err();
            assert!(err.to_string().contains("gzip header too long"), "{err}");
        }

        // long, but within bounds
        let mut input = vec![0x1f, 0x8b, 8, GzipHeader::FNAME, 0, 0, 0, 0, 0, 255];
        input.extend(std::iter::repeat(b'a').take(GzipDec::MAX_HEADER_LEN - 100));
        input.push(0);
        input.extend_from_slice(&raw_deflate(b"named"));
        input.extend_from_slice(&crc32fast::hash(b"named").to_le_bytes());
        input.extend_from_slice(&5u32.to_le_bytes());
        assert_eq!(drive(&input, 1000).unwrap(), b"named");
    }

    #[test]
    fn trailer_mismatch() {
        let payload = b"the trailer is verified";
        let input = gzip(payload);
        let len = input.len();

        let mut bad_crc = input.clone();
        bad_crc[len - 8] ^= 0xff;
        let err = drive(&bad_crc, 4).unwrap_err();
        assert!(err.to_string().contains("checksum didn't match"), "{err}");

        let mut bad_size = input;
        bad_size[len - 4] ^= 0xff;
        let err = drive(&bad_size, 4).unwrap_err();
        assert!(err.to_string().contains("size didn't match"), "{err}");
    }

    #[test]
    fn truncation() {
        let input = gzip(b"cut short, cut short, cut short");
        let len = input.len();

        assert!(matches!(
            drive(&[], 1),
            Err(Error::Truncated(TruncationError::GzipHeader))
        ));
        assert!(matches!(
            drive(&input[..5], 1),
            Err(Error::Truncated(TruncationError::GzipHeader))
        ));
        assert!(matches!(
            drive(&input[..len - 3], 2),
            Err(Error::Truncated(TruncationError::GzipTrailer))
        ));
        assert!(matches!(
            drive(&input[..len - 12], 2),
            Err(Error::Truncated(TruncationError::Compressed {
                codec: Codec::Gzip
            }))
        ));
    }
}
