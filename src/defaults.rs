//! Default configuration constants for articast.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Audio sample rate in Hz used throughout the pipeline.
///
/// 16kHz is the native output rate of the speech models and keeps artifact
/// files small; anything the engine or the jingle file delivers at another
/// rate is resampled on load.
pub const SAMPLE_RATE: u32 = 16000;

/// Maximum number of words per synthesis chunk.
///
/// The speech models degrade noticeably past short-utterance lengths, so
/// sentences above this budget are re-split into fixed word windows before
/// synthesis.
pub const MAX_CHUNK_WORDS: usize = 25;

/// Marker word wrapped around every chunk before synthesis.
///
/// The models truncate or garble the first and last fraction of a second of
/// audio; synthesizing `"prima. <chunk>. prima."` moves that damage into a
/// throwaway utterance that is trimmed off afterwards.
pub const PADDING_WORD: &str = "prima";

/// Minimum length of a silence region in milliseconds.
///
/// Matches the pause the models insert around the padding word; shorter dips
/// in level are not treated as region boundaries.
pub const MIN_SILENCE_MS: usize = 50;

/// Level below which a window counts as silence, in dBFS.
pub const SILENCE_THRESHOLD_DBFS: f64 = -30.0;

/// Step between silence-scan windows in milliseconds.
pub const SILENCE_SEEK_STEP_MS: usize = 1;

/// Guard band kept around the trimmed utterance in milliseconds.
///
/// Expands the crop outward into the surrounding silence so the utterance
/// keeps natural breathing room instead of starting on the first voiced
/// sample.
pub const TRIM_GUARD_MS: usize = 50;

/// Bitrate for encoded artifact and podcast files.
pub const MP3_BITRATE: &str = "160k";

/// Headroom left below full scale when normalizing the assembled podcast, in dB.
pub const NORMALIZE_HEADROOM_DB: f64 = 0.1;

/// Broker key the submission gateway publishes job ids to.
pub const QUEUE_KEY: &str = "articast:jobs";

/// Prefix for per-job record keys in the broker.
pub const JOB_KEY_PREFIX: &str = "articast:job:";

/// Seconds a worker blocks on the queue before re-checking for shutdown.
pub const CONSUME_TIMEOUT_SECS: u64 = 5;

/// Command used to invoke the speech synthesis engine.
pub const PIPER_BIN: &str = "piper";

/// Command used for audio encoding and decoding.
pub const FFMPEG_BIN: &str = "ffmpeg";
