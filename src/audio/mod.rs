//! Audio plumbing: WAV I/O, silence-region scanning, encode/decode.
//!
//! All in-memory audio in the pipeline is 16-bit PCM, mono, at
//! [`crate::defaults::SAMPLE_RATE`]. Sources at other rates or channel
//! counts are converted on load.

pub mod codec;
pub mod silence;
pub mod wav;
