//! Utterance synthesis: turning an article's text into one waveform.
//!
//! The text is segmented into short chunks, each chunk is wrapped in a
//! padding utterance, synthesized, trimmed back to the real content, and the
//! trimmed pieces are concatenated in original order.

pub mod chunker;
pub mod synthesizer;
pub mod trim;

pub use synthesizer::UtteranceSynthesizer;
