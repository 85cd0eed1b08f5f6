//! I/O front-ends for [BodyFsm](crate::fsm::BodyFsm).
//!
//! Both drive the same state machine: they only differ in how the body
//! source is read from.

#[cfg(feature = "sync")]
pub mod sync;

#[cfg(feature = "tokio")]
pub mod tokio;
