//! Podcast assembly: articles in, one jingle-bracketed waveform out.

use crate::audio::codec::Codec;
use crate::audio::wav;
use crate::defaults::NORMALIZE_HEADROOM_DB;
use crate::error::Result;
use std::path::Path;

/// Stitches per-article audio into the final podcast.
///
/// The jingle brackets every article: jingle, then per article in input
/// order [article, jingle], so N articles carry N+1 jingles. The fully
/// concatenated result is peak-normalized. Given valid article audio this
/// step has nothing left to fail on.
pub struct PodcastAssembler {
    jingle: Vec<i16>,
}

impl PodcastAssembler {
    /// Assembler around an already-loaded jingle waveform.
    pub fn new(jingle: Vec<i16>) -> Self {
        Self { jingle }
    }

    /// Load the jingle clip from a file, once, at worker startup.
    ///
    /// WAV files are read directly; anything else goes through the codec.
    pub fn from_file(path: &Path, codec: &dyn Codec) -> Result<Self> {
        let jingle = if path.extension().and_then(|e| e.to_str()) == Some("wav") {
            wav::read_samples(path)?
        } else {
            codec.decode(path)?
        };
        Ok(Self::new(jingle))
    }

    pub fn jingle_len(&self) -> usize {
        self.jingle.len()
    }

    /// Concatenate the articles with interleaved jingles and normalize.
    pub fn assemble(&self, articles: &[Vec<i16>]) -> Vec<i16> {
        let article_samples: usize = articles.iter().map(Vec::len).sum();
        let total = self.jingle.len() * (articles.len() + 1) + article_samples;

        let mut podcast = Vec::with_capacity(total);
        podcast.extend_from_slice(&self.jingle);
        for article in articles {
            podcast.extend_from_slice(article);
            podcast.extend_from_slice(&self.jingle);
        }
        normalize_peak(podcast)
    }
}

/// Scale the waveform so its peak sample sits just under full scale.
///
/// The gain is uniform, so relative article/jingle levels are preserved;
/// [`NORMALIZE_HEADROOM_DB`] of headroom keeps the peak off the clip point.
/// An all-silent buffer is returned unchanged.
pub fn normalize_peak(samples: Vec<i16>) -> Vec<i16> {
    let peak = samples
        .iter()
        .map(|s| f64::from(s.unsigned_abs()))
        .fold(0.0, f64::max);
    if peak == 0.0 {
        return samples;
    }

    let target = f64::from(i16::MAX) * 10f64.powf(-NORMALIZE_HEADROOM_DB / 20.0);
    let gain = target / peak;
    samples
        .into_iter()
        .map(|s| {
            (f64::from(s) * gain)
                .round()
                .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Collapse a waveform into its run of distinct sample values, dropping
    /// run lengths. `[5, 5, 9, 9, 5]` becomes `[5, 9, 5]`.
    fn value_runs(samples: &[i16]) -> Vec<i16> {
        let mut runs = Vec::new();
        for &s in samples {
            if runs.last() != Some(&s) {
                runs.push(s);
            }
        }
        runs
    }

    #[test]
    fn jingle_brackets_every_article() {
        let assembler = PodcastAssembler::new(vec![1000i16; 40]);
        let a = vec![2000i16; 60];
        let b = vec![3000i16; 50];

        let podcast = assembler.assemble(&[a, b]);

        // Normalization scales everything by the same positive gain, so the
        // value ordering jingle < a < b survives; the run pattern must read
        // jingle, a, jingle, b, jingle.
        let runs = value_runs(&podcast);
        assert_eq!(runs.len(), 5, "runs: {runs:?}");
        assert_eq!(runs[0], runs[2]);
        assert_eq!(runs[2], runs[4]);
        assert!(runs[0] < runs[1] && runs[1] < runs[3]);
    }

    #[test]
    fn article_count_determines_jingle_count() {
        let jingle_len = 40;
        let assembler = PodcastAssembler::new(vec![1000i16; jingle_len]);

        for n in 0..4 {
            let articles: Vec<Vec<i16>> = (0..n).map(|i| vec![2000 + i as i16; 30]).collect();
            let podcast = assembler.assemble(&articles);
            let expected = jingle_len * (n + 1) + 30 * n;
            assert_eq!(podcast.len(), expected, "n = {n}");
        }
    }

    #[test]
    fn single_article_podcast_preserves_article_body() {
        let assembler = PodcastAssembler::new(vec![500i16; 20]);
        let article = vec![4000i16; 100];

        let podcast = assembler.assemble(&[article]);
        let runs = value_runs(&podcast);
        assert_eq!(runs.len(), 3);
        // Article body sits between the two jingle runs.
        assert!(runs[1] > runs[0]);
    }

    #[test]
    fn assembled_podcast_is_normalized_to_peak() {
        let assembler = PodcastAssembler::new(vec![1000i16; 40]);
        let podcast = assembler.assemble(&[vec![4000i16; 60]]);

        let peak = podcast.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
        let target = (f64::from(i16::MAX) * 10f64.powf(-NORMALIZE_HEADROOM_DB / 20.0)) as u16;
        // Rounding leaves the peak within a sample step of the target.
        assert!(peak.abs_diff(target) <= 1, "peak {peak}, target {target}");
    }

    #[test]
    fn normalize_scales_quiet_audio_up() {
        let quiet = vec![100i16, -200, 150, 0];
        let loud = normalize_peak(quiet);
        let peak = loud.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
        assert!(peak > 30000);
        // Silence stays silent and signs are preserved.
        assert_eq!(loud[3], 0);
        assert!(loud[1] < 0);
    }

    #[test]
    fn normalize_scales_hot_audio_down() {
        let hot = vec![i16::MAX, i16::MIN, 0];
        let normalized = normalize_peak(hot);
        let peak = normalized.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
        assert!(peak < i16::MAX as u16);
        assert!(peak > 32000);
    }

    #[test]
    fn normalize_leaves_silence_untouched() {
        let silence = vec![0i16; 100];
        assert_eq!(normalize_peak(silence.clone()), silence);
    }

    #[test]
    fn empty_input_yields_one_jingle() {
        let assembler = PodcastAssembler::new(vec![1000i16; 40]);
        let podcast = assembler.assemble(&[]);
        assert_eq!(podcast.len(), 40);
    }

    #[test]
    fn jingle_loads_from_wav_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jingle.wav");
        crate::audio::wav::write_samples(&path, &[1000i16; 80]).unwrap();

        let assembler =
            PodcastAssembler::from_file(&path, &crate::audio::codec::WavCodec).unwrap();
        assert_eq!(assembler.jingle_len(), 80);
    }

    #[test]
    fn missing_jingle_file_is_an_error() {
        let result = PodcastAssembler::from_file(
            Path::new("/nonexistent/jingle.wav"),
            &crate::audio::codec::WavCodec,
        );
        assert!(result.is_err());
    }
}
