use std::cmp;

use crate::error::Error;

use super::{Decompressor, HasMoreInput, Outcome};

#[derive(Default)]
pub(crate) struct StoreDec {
    eof: bool,
}

impl Decompressor for StoreDec {
    fn decompress(
        &mut self,
        in_buf: &[u8],
        out_buf: &mut [u8],
        has_more_input: HasMoreInput,
    ) -> Result<Outcome, Error> {
        let len = cmp::min(in_buf.len(), out_buf.len());
        out_buf[..len].copy_from_slice(&in_buf[..len]);
        if len == in_buf.len() && has_more_input == HasMoreInput::No {
            self.eof = true;
        }
        Ok(Outcome {
            bytes_read: len,
            bytes_written: len,
        })
    }

    fn is_done(&self) -> bool {
        self.eof
    }
}
