//! articast - articles in, one podcast out
//!
//! A pool of workers turns submitted article URLs into a single audio file:
//! extract the text, synthesize it chunk by chunk, cache per-article audio,
//! stitch the articles together with jingles, and record the job's fate in a
//! broker-backed store.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod cache;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod diagnostics;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod job;
pub mod podcast;
pub mod queue;
pub mod store;
pub mod synth;
pub mod tts;
pub mod worker;

// Core traits (extract → synthesize → assemble, store ↔ queue)
pub use audio::codec::Codec;
pub use extract::ArticleExtractor;
pub use queue::{Delivery, JobQueue};
pub use store::JobStore;
pub use tts::SpeechModel;

// Pipeline components
pub use cache::ArticleCache;
pub use podcast::PodcastAssembler;
pub use synth::UtteranceSynthesizer;
pub use tts::ModelBank;
pub use worker::Worker;

// Error handling
pub use error::{ArticastError, Result};

// Data model
pub use config::Config;
pub use job::{Job, JobId, JobStatus, Voice};
