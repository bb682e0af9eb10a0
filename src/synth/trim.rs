//! Padding removal from synthesized chunks.
//!
//! Every chunk is synthesized as `"prima. <chunk>. prima."`; the marker
//! utterances are located through the silence regions around them and
//! cropped off, keeping a guard band of natural silence on both sides.

use crate::audio::silence::{self, SilenceRegion};
use crate::defaults::{
    MIN_SILENCE_MS, SAMPLE_RATE, SILENCE_SEEK_STEP_MS, SILENCE_THRESHOLD_DBFS, TRIM_GUARD_MS,
};

/// Outcome of a trim attempt, for callers that want to log the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimOutcome {
    /// Padding located and cropped.
    Trimmed,
    /// Too few silence regions to locate the padding; waveform returned as-is.
    TooFewRegions,
}

/// Crop the padding utterances off a synthesized chunk waveform.
///
/// The utterance proper starts at the end of the second silence region (the
/// first one sits inside the leading marker) and ends at the start of the
/// second-to-last region, each expanded outward by [`TRIM_GUARD_MS`].
///
/// The fixed region indexing is undefined for pathologically short or
/// silence-free synthesis: with fewer than four regions, or a degenerate
/// crop range, the waveform is returned untrimmed rather than sliced out of
/// bounds.
pub fn trim_padding(samples: &[i16]) -> (Vec<i16>, TrimOutcome) {
    let regions = silence::detect_silence(
        samples,
        SAMPLE_RATE,
        MIN_SILENCE_MS,
        SILENCE_THRESHOLD_DBFS,
        SILENCE_SEEK_STEP_MS,
    );
    trim_with_regions(samples, &regions)
}

fn trim_with_regions(samples: &[i16], regions: &[SilenceRegion]) -> (Vec<i16>, TrimOutcome) {
    if regions.len() < 4 {
        return (samples.to_vec(), TrimOutcome::TooFewRegions);
    }

    let samples_per_ms = (SAMPLE_RATE / 1000) as usize;
    let total_ms = samples.len() / samples_per_ms;

    let start_ms = regions[1].end_ms.saturating_sub(TRIM_GUARD_MS);
    let end_ms = (regions[regions.len() - 2].start_ms + TRIM_GUARD_MS).min(total_ms);

    if start_ms >= end_ms {
        return (samples.to_vec(), TrimOutcome::TooFewRegions);
    }

    let start = start_ms * samples_per_ms;
    let end = (end_ms * samples_per_ms).min(samples.len());
    (samples[start..end].to_vec(), TrimOutcome::Trimmed)
}
