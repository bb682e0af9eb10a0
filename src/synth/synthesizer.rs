//! The utterance synthesizer: article text in, one waveform out.

use crate::error::{ArticastError, Result};
use crate::synth::chunker;
use crate::synth::trim::{self, TrimOutcome};
use crate::tts::model::SpeechModel;
use std::sync::Arc;

/// Turns arbitrary-length text into one continuous waveform.
///
/// Chunks are synthesized and trimmed independently but always concatenated
/// in original text order; any chunk failure aborts the whole article — a
/// partial article is never emitted.
pub struct UtteranceSynthesizer {
    model: Arc<dyn SpeechModel>,
}

impl UtteranceSynthesizer {
    pub fn new(model: Arc<dyn SpeechModel>) -> Self {
        Self { model }
    }

    /// Name of the model doing the synthesis.
    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Synthesize the full text to a single 16kHz mono waveform.
    pub fn text_to_speech(&self, text: &str) -> Result<Vec<i16>> {
        let chunks = chunker::chunk_text(text);
        if chunks.is_empty() {
            return Err(ArticastError::Synthesis {
                message: "no synthesizable text".to_string(),
            });
        }

        let mut waveform = Vec::new();
        for chunk in &chunks {
            let padded = chunker::pad_chunk(chunk);
            let raw = self.model.synthesize(&padded)?;
            let (trimmed, outcome) = trim::trim_padding(&raw);
            if outcome == TrimOutcome::TooFewRegions {
                // Known fragility of the fixed silence-region indexing;
                // keep the audio rather than risk slicing out of bounds.
                eprintln!(
                    "articast: could not locate padding in synthesized chunk ({} samples), keeping untrimmed",
                    raw.len()
                );
            }
            waveform.extend(trimmed);
        }
        Ok(waveform)
    }
}
