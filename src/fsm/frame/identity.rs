use std::cmp;

use crate::error::Error;

use super::{Framer, HasMoreInput, Outcome};

/// The body is not framed: it ends where the source ends.
#[derive(Default)]
pub(crate) struct IdentityFramer {
    eof: bool,
}

impl Framer for IdentityFramer {
    fn unframe(
        &mut self,
        in_buf: &[u8],
        out: &mut [u8],
        has_more_input: HasMoreInput,
    ) -> Result<Outcome, Error> {
        let len = cmp::min(in_buf.len(), out.len());
        out[..len].copy_from_slice(&in_buf[..len]);

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
