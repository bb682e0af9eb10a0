//! Speech synthesis engines.
//!
//! One model per (worker process, voice), constructed at startup and held
//! for the process lifetime. Everything downstream sees only the
//! [`SpeechModel`] capability trait.

pub mod model;
pub mod piper;

pub use model::{MockSpeechModel, ModelBank, SpeechModel};
pub use piper::PiperModel;
