//! Decoding a body involves two stages: undoing the transfer framing, then
//! undoing the content compression. Each stage is a small state machine that
//! consumes input bytes and produces output bytes, and [BodyFsm] stacks
//! them on top of a pair of bounded buffers.
//!
//! None of this does any I/O: the caller fills [BodyFsm::space], reports it
//! with [BodyFsm::fill], and pulls decoded bytes out with [BodyFsm::process].

macro_rules! transition {
    ($state: expr => ($pattern: pat) $body: expr) => {
        $state = if let $pattern = std::mem::take(&mut $state) {
            $body
        } else {
            unreachable!()
        };
    };
}

mod body;
pub use body::BodyFsm;

mod decompress;

mod frame;

/// Indicates whether or not the state machine has completed its work
pub enum FsmResult<M, R> {
    /// The I/O loop needs to continue, the state machine is given back.
    Continue(M),

    /// The state machine is done, and the result is returned.
    Done(R),
}

/// How many bytes a single processing step took in, and gave out.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Number of bytes read from input
    pub bytes_read: usize,

    /// Number of bytes written to output
    pub bytes_written: usize,
}

/// Whether the stage below may still hand over more bytes after the ones
/// currently offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HasMoreInput {
    Yes,
    No,
}

impl HasMoreInput {
    pub(crate) fn from_eof(eof: bool) -> Self {
        if eof {
            Self::No
        } else {
            Self::Yes
        }
    }
}
