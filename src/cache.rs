//! Per-article artifact cache.
//!
//! Synthesized article audio is keyed by (url, voice) under a deterministic
//! file name, so any worker that needs the same article under the same voice
//! finds the finished file instead of re-extracting and re-synthesizing.
//! Entries are never invalidated or deleted; an existing file is trusted
//! as-is. Two workers racing on the same key both do the work and the last
//! rename wins, which is safe because outputs for the same input are
//! equivalent.

use crate::audio::codec::Codec;
use crate::error::{ArticastError, Result};
use crate::extract::ArticleExtractor;
use crate::job::Voice;
use crate::synth::UtteranceSynthesizer;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shared, lock-free article artifact store.
pub struct ArticleCache {
    dir: PathBuf,
    codec: Arc<dyn Codec>,
}

impl ArticleCache {
    /// Open (creating if needed) the cache directory.
    pub fn new(dir: impl Into<PathBuf>, codec: Arc<dyn Codec>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, codec })
    }

    /// Deterministic file address for an (url, voice) pair.
    ///
    /// The URL is hashed rather than reusing any of its path segments, so
    /// distinct articles can never collide on a shared file name.
    pub fn address(&self, url: &str, voice: Voice) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        let key: String = digest[..8].iter().map(|b| format!("{b:02x}")).collect();
        self.dir
            .join(format!("{key}_{voice}.{}", self.codec.extension()))
    }

    /// Whether an artifact already exists for the pair.
    pub fn contains(&self, url: &str, voice: Voice) -> bool {
        self.address(url, voice).exists()
    }

    /// Return the artifact for (url, voice), synthesizing it on first use.
    ///
    /// A present file is returned untouched. On a miss the article text is
    /// extracted, synthesized, encoded, and published with a write-then-rename
    /// so a partially written file is never visible at the final address.
    /// Extraction failure is terminal for the caller's job.
    pub fn get_or_create(
        &self,
        url: &str,
        voice: Voice,
        extractor: &dyn ArticleExtractor,
        synthesizer: &UtteranceSynthesizer,
    ) -> Result<PathBuf> {
        let address = self.address(url, voice);
        if address.exists() {
            return Ok(address);
        }

        let text = extractor.extract(url)?;
        let waveform = synthesizer.text_to_speech(&text)?;

        let staging = tempfile::Builder::new()
            .prefix(".articast-artifact-")
            .tempfile_in(&self.dir)
            .map_err(|e| ArticastError::Audio {
                message: format!("Failed to create staging file in {}: {}", self.dir.display(), e),
            })?;
        self.codec.encode(&waveform, staging.path())?;
        staging
            .persist(&address)
            .map_err(|e| ArticastError::Audio {
                message: format!("Failed to publish artifact {}: {}", address.display(), e.error),
            })?;
        Ok(address)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
