#![no_main]

use dechunk::{Codec, DecodeOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let options = DecodeOptions::default()
        .with_buffer_size(1024)
        .with_max_line_len(64);

    for chunked in [false, true] {
        for codec in [Codec::None, Codec::Gzip, Codec::Deflate, Codec::Bzip2] {
            for chunk in dechunk::decode_with_options(data, chunked, codec, &options) {
                if chunk.is_err() {
                    break;
                }
            }
        }
    }
});
