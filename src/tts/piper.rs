//! Piper-based speech synthesis.
//!
//! Each call spawns the `piper` binary with the voice's model file, feeds
//! the chunk on stdin, and parses the WAV it writes. The model file itself
//! is opaque to the pipeline; piper keeps its own process-level cache warm
//! between invocations of the same model.

use crate::audio::wav;
use crate::error::{ArticastError, Result};
use crate::tts::model::SpeechModel;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Piper-backed implementation of the SpeechModel trait.
pub struct PiperModel {
    piper_bin: String,
    model_path: PathBuf,
    model_name: String,
}

impl std::fmt::Debug for PiperModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PiperModel")
            .field("piper_bin", &self.piper_bin)
            .field("model_path", &self.model_path)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl PiperModel {
    /// Create a new piper model handle.
    ///
    /// # Errors
    /// Returns `ArticastError::ConfigInvalidValue` if the model file doesn't
    /// exist — better to fail at worker startup than on the first job.
    pub fn new(piper_bin: &str, model_path: &Path) -> Result<Self> {
        if !model_path.exists() {
            return Err(ArticastError::ConfigInvalidValue {
                key: "tts.voices".to_string(),
                message: format!("model file not found: {}", model_path.display()),
            });
        }

        let model_name = model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            piper_bin: piper_bin.to_string(),
            model_path: model_path.to_path_buf(),
            model_name,
        })
    }
}

impl SpeechModel for PiperModel {
    fn synthesize(&self, text: &str) -> Result<Vec<i16>> {
        let out_file = tempfile::Builder::new()
            .prefix("articast-chunk-")
            .suffix(".wav")
            .tempfile()
            .map_err(|e| ArticastError::Synthesis {
                message: format!("Failed to create scratch file: {}", e),
            })?;

        let model_path = self.model_path.to_str().ok_or_else(|| ArticastError::Synthesis {
            message: "Invalid UTF-8 in model path".to_string(),
        })?;
        let out_path = out_file.path().to_str().ok_or_else(|| ArticastError::Synthesis {
            message: "Invalid UTF-8 in scratch path".to_string(),
        })?;

        let mut child = Command::new(&self.piper_bin)
            .args(["--model", model_path, "--output_file", out_path])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ArticastError::Synthesis {
                message: format!("Failed to spawn {}: {}", self.piper_bin, e),
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| ArticastError::Synthesis {
            message: "Failed to open piper stdin".to_string(),
        })?;
        stdin
            .write_all(text.as_bytes())
            .map_err(|e| ArticastError::Synthesis {
                message: format!("Failed to feed text to piper: {}", e),
            })?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .map_err(|e| ArticastError::Synthesis {
                message: format!("piper did not run to completion: {}", e),
            })?;
        if !output.status.success() {
            return Err(ArticastError::Synthesis {
                message: format!(
                    "piper exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        wav::read_samples(out_file.path())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        self.model_path.exists()
    }
}
