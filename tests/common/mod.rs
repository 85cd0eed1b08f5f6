#![allow(dead_code)]

use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

use dechunk::Codec;

/// A recorded HTTP body, along with what it decodes to
pub struct Case {
    pub name: &'static str,
    pub chunked: bool,
    pub codec: Codec,
}

impl Case {
    pub fn input(&self) -> Vec<u8> {
        read_fixture(self.name)
    }

    pub fn expected(&self) -> Vec<u8> {
        read_fixture(&format!("{}.expected", self.name))
    }
}

pub fn testdata_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata/http_content")
}

fn read_fixture(name: &str) -> Vec<u8> {
    let path = testdata_dir().join(name);
    std::fs::read(&path).unwrap_or_else(|e| panic!("reading {}: {e}", path.display()))
}

pub fn test_cases() -> Vec<Case> {
    vec![
        Case {
            name: "chunked",
            chunked: true,
            codec: Codec::None,
        },
        Case {
            name: "chunked_gzipped",
            chunked: true,
            codec: Codec::Gzip,
        },
        Case {
            name: "chunked_deflate",
            chunked: true,
            codec: Codec::Deflate,
        },
        Case {
            name: "gzipped",
            chunked: false,
            codec: Codec::Gzip,
        },
        Case {
            name: "deflate",
            chunked: false,
            codec: Codec::Deflate,
        },
        Case {
            name: "bzipped",
            chunked: false,
            codec: Codec::Bzip2,
        },
    ]
}

/// Wraps a reader so that every read returns at most one byte
pub struct OneByteReadWrapper<R>(pub R)
where
    R: io::Read;

impl<R> io::Read for OneByteReadWrapper<R>
where
    R: io::Read,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.0.read(&mut buf[..1])
    }
}

/// Wraps a reader so that reads return at most `n` bytes
pub struct SmallReadWrapper<R>(pub R, pub usize)
where
    R: io::Read;

impl<R> io::Read for SmallReadWrapper<R>
where
    R: io::Read,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(self.1);
        self.0.read(&mut buf[..len])
    }
}

/// Frames `payload` with chunked transfer-encoding, `chunk_len` bytes per chunk
pub fn chunk(payload: &[u8], chunk_len: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for piece in payload.chunks(chunk_len) {
        out.extend_from_slice(format!("{:x}\r\n", piece.len()).as_bytes());
        out.extend_from_slice(piece);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"0\r\n\r\n");
    out
}

pub fn gzip(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    flate2::read::GzEncoder::new(payload, flate2::Compression::default())
        .read_to_end(&mut out)
        .unwrap();
    out
}

pub fn deflate(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    flate2::read::DeflateEncoder::new(payload, flate2::Compression::default())
        .read_to_end(&mut out)
        .unwrap();
    out
}

pub fn bzip2(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    bzip2::read::BzEncoder::new(payload, bzip2::Compression::default())
        .read_to_end(&mut out)
        .unwrap();
    out
}

pub fn compress(payload: &[u8], codec: Codec) -> Vec<u8> {
    match codec {
        Codec::None => payload.to_vec(),
        Codec::Gzip => gzip(payload),
        Codec::Deflate => deflate(payload),
        Codec::Bzip2 => bzip2(payload),
    }
}

/// Some text that compresses, but not too well
pub fn sample_payload(len: usize) -> Vec<u8> {
    let mut state = 0x2545_f491_u32;
    (0..len)
        .map(|i| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            if i % 7 == 0 {
                b' '
            } else {
                b'a' + (state % 26) as u8
            }
        })
        .collect()
}
