//! Speech model trait and the per-process model bank.

use crate::config::TtsConfig;
use crate::error::{ArticastError, Result};
use crate::job::Voice;
use crate::tts::piper::PiperModel;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Trait for text-to-speech synthesis.
///
/// This trait allows swapping implementations (real engine vs mock). Output
/// is assumed deterministic enough for idempotent caching, not bit-exact.
pub trait SpeechModel: Send + Sync {
    /// Synthesize a short text span to a waveform.
    ///
    /// # Arguments
    /// * `text` - A single padded chunk, at most a couple of sentences
    ///
    /// # Returns
    /// 16-bit PCM at 16kHz mono, or error
    fn synthesize(&self, text: &str) -> Result<Vec<i16>>;

    /// Get the name of the loaded model
    fn model_name(&self) -> &str;

    /// Check if the model is ready
    fn is_ready(&self) -> bool;
}

/// Implement SpeechModel for Arc<T> to allow sharing across components.
impl<T: SpeechModel> SpeechModel for Arc<T> {
    fn synthesize(&self, text: &str) -> Result<Vec<i16>> {
        (**self).synthesize(text)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// The models a worker process serves, one per voice, loaded once at startup.
pub struct ModelBank {
    models: BTreeMap<Voice, Arc<dyn SpeechModel>>,
}

impl ModelBank {
    /// Builds one engine instance per configured voice.
    ///
    /// Model construction is the expensive part of worker startup; after
    /// this, per-job work only borrows the loaded models.
    pub fn from_config(config: &TtsConfig) -> Result<Self> {
        let mut models: BTreeMap<Voice, Arc<dyn SpeechModel>> = BTreeMap::new();
        for (&voice, model_path) in &config.voices {
            let model = PiperModel::new(&config.piper_bin, model_path)?;
            models.insert(voice, Arc::new(model));
        }
        if models.is_empty() {
            return Err(ArticastError::ConfigInvalidValue {
                key: "tts.voices".to_string(),
                message: "no voices configured".to_string(),
            });
        }
        Ok(Self { models })
    }

    /// Creates an empty bank; populate with [`ModelBank::insert`].
    pub fn empty() -> Self {
        Self {
            models: BTreeMap::new(),
        }
    }

    /// Registers a model for a voice, replacing any existing one.
    pub fn insert(&mut self, voice: Voice, model: Arc<dyn SpeechModel>) {
        self.models.insert(voice, model);
    }

    /// Looks up the model serving a voice.
    pub fn get(&self, voice: Voice) -> Option<&Arc<dyn SpeechModel>> {
        self.models.get(&voice)
    }

    /// Voices this bank can serve.
    pub fn voices(&self) -> impl Iterator<Item = Voice> + '_ {
        self.models.keys().copied()
    }
}

/// Mock speech model for testing.
///
/// Produces a deterministic waveform with the same silence structure a real
/// engine emits: a leading pause, one burst per word separated by short
/// gaps, and a trailing pause — enough structure for the trimmer to find the
/// padding utterances.
pub struct MockSpeechModel {
    model_name: String,
    should_fail: bool,
    calls: AtomicUsize,
}

impl MockSpeechModel {
    /// Create a new mock model with default settings
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            should_fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Configure the mock to fail on synthesize
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Number of synthesize calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Samples per word burst (140ms at 16kHz).
    pub const BURST_SAMPLES: usize = 140 * 16;
}

impl SpeechModel for MockSpeechModel {
    fn synthesize(&self, text: &str) -> Result<Vec<i16>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(ArticastError::Synthesis {
                message: "mock synthesis failure".to_string(),
            });
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        let word_count = words.len().max(1);

        let mut samples = vec![0i16; 120 * 16];
        for i in 0..word_count {
            // Amplitude varies per word so tests can tell bursts apart.
            let amplitude = 5000 + ((i % 5) as i16) * 500;
            samples.extend(std::iter::repeat_n(amplitude, Self::BURST_SAMPLES));
            samples.extend(std::iter::repeat_n(0i16, 80 * 16));
        }
        samples.extend(std::iter::repeat_n(0i16, 40 * 16));
        Ok(samples)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        !self.should_fail
    }
}
