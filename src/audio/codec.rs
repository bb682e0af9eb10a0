//! Audio container encode/decode.
//!
//! Artifacts and podcasts are stored as MP3 at a fixed bitrate; ffmpeg does
//! the codec work as a subprocess, fed raw 16kHz mono PCM. The trait exists
//! so tests and the WAV fallback can swap the container without touching the
//! pipeline.

use crate::audio::wav;
use crate::defaults::{self, SAMPLE_RATE};
use crate::error::{ArticastError, Result};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Encode/decode between in-memory PCM and an on-disk audio container.
pub trait Codec: Send + Sync {
    /// Encode 16kHz mono samples to a file at `path`.
    fn encode(&self, samples: &[i16], path: &Path) -> Result<()>;

    /// Decode a file back to 16kHz mono samples.
    fn decode(&self, path: &Path) -> Result<Vec<i16>>;

    /// File extension for this container (without the dot).
    fn extension(&self) -> &'static str;
}

/// MP3 codec backed by an ffmpeg subprocess, fixed bitrate.
pub struct Mp3Codec {
    ffmpeg_bin: String,
    bitrate: String,
}

impl Mp3Codec {
    pub fn new() -> Self {
        Self {
            ffmpeg_bin: defaults::FFMPEG_BIN.to_string(),
            bitrate: defaults::MP3_BITRATE.to_string(),
        }
    }

    pub fn with_ffmpeg_bin(mut self, bin: &str) -> Self {
        self.ffmpeg_bin = bin.to_string();
        self
    }
}

impl Default for Mp3Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for Mp3Codec {
    fn encode(&self, samples: &[i16], path: &Path) -> Result<()> {
        let mut child = Command::new(&self.ffmpeg_bin)
            .args(["-y", "-loglevel", "error"])
            .args(["-f", "s16le", "-ar", &SAMPLE_RATE.to_string(), "-ac", "1", "-i", "-"])
            .args(["-b:a", &self.bitrate, "-f", "mp3"])
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ArticastError::Encode {
                message: format!("Failed to spawn {}: {}", self.ffmpeg_bin, e),
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| ArticastError::Encode {
            message: "Failed to open ffmpeg stdin".to_string(),
        })?;
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        stdin.write_all(&bytes).map_err(|e| ArticastError::Encode {
            message: format!("Failed to feed samples to ffmpeg: {}", e),
        })?;
        drop(stdin);

        let output = child.wait_with_output().map_err(|e| ArticastError::Encode {
            message: format!("ffmpeg did not run to completion: {}", e),
        })?;
        if !output.status.success() {
            return Err(ArticastError::Encode {
                message: format!(
                    "ffmpeg exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }

    fn decode(&self, path: &Path) -> Result<Vec<i16>> {
        let output = Command::new(&self.ffmpeg_bin)
            .args(["-loglevel", "error", "-i"])
            .arg(path)
            .args(["-f", "s16le", "-ar", &SAMPLE_RATE.to_string(), "-ac", "1", "-"])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ArticastError::Encode {
                message: format!("Failed to run {}: {}", self.ffmpeg_bin, e),
            })?;

        if !output.status.success() {
            return Err(ArticastError::Encode {
                message: format!(
                    "ffmpeg failed to decode {}: {}",
                    path.display(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(output
            .stdout
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect())
    }

    fn extension(&self) -> &'static str {
        "mp3"
    }
}

/// WAV codec backed by hound. Uncompressed; used by tests and as an escape
/// hatch on hosts without ffmpeg.
pub struct WavCodec;

impl Codec for WavCodec {
    fn encode(&self, samples: &[i16], path: &Path) -> Result<()> {
        wav::write_samples(path, samples)
    }

    fn decode(&self, path: &Path) -> Result<Vec<i16>> {
        wav::read_samples(path)
    }

    fn extension(&self) -> &'static str {
        "wav"
    }
}

/// Returns true if ffmpeg can be invoked.
pub fn ffmpeg_available() -> bool {
    Command::new(defaults::FFMPEG_BIN)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_codec_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let samples = vec![0i16, 500, -500, 10000, -10000];

        let codec = WavCodec;
        codec.encode(&samples, &path).unwrap();
        let decoded = codec.decode(&path).unwrap();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn wav_codec_extension() {
        assert_eq!(WavCodec.extension(), "wav");
        assert_eq!(Mp3Codec::new().extension(), "mp3");
    }

    #[test]
    fn mp3_codec_round_trips_when_ffmpeg_present() {
        if !ffmpeg_available() {
            eprintln!("ffmpeg not installed; skipping mp3 round-trip test");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp3");
        // 200ms of a constant tone survives lossy encoding recognizably.
        let samples = vec![8000i16; 3200];

        let codec = Mp3Codec::new();
        codec.encode(&samples, &path).unwrap();
        assert!(path.exists());

        let decoded = codec.decode(&path).unwrap();
        assert!(!decoded.is_empty());
        // The decoded midsection should still be loud.
        let mid = &decoded[decoded.len() / 4..decoded.len() * 3 / 4];
        let peak = mid.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
        assert!(peak > 4000, "peak after mp3 round trip: {peak}");
    }

    #[test]
    fn mp3_decode_missing_file_is_an_error() {
        if !ffmpeg_available() {
            eprintln!("ffmpeg not installed; skipping");
            return;
        }
        let codec = Mp3Codec::new();
        let result = codec.decode(Path::new("/nonexistent/audio.mp3"));
        assert!(matches!(result, Err(ArticastError::Encode { .. })));
    }
}
