//! WAV reading and writing for the synthesis pipeline.
//!
//! Readers accept arbitrary sample rates and channel counts and deliver
//! 16kHz mono, which is what the rest of the pipeline works in.

use crate::defaults::SAMPLE_RATE;
use crate::error::{ArticastError, Result};
use std::io::Read;
use std::path::Path;

/// Read a WAV file and convert it to 16kHz mono samples.
pub fn read_samples(path: &Path) -> Result<Vec<i16>> {
    let reader = hound::WavReader::open(path).map_err(|e| ArticastError::Audio {
        message: format!("Failed to open WAV file {}: {}", path.display(), e),
    })?;
    decode_reader(reader)
}

/// Read WAV data from any reader and convert it to 16kHz mono samples.
pub fn read_samples_from(reader: impl Read) -> Result<Vec<i16>> {
    let reader = hound::WavReader::new(reader).map_err(|e| ArticastError::Audio {
        message: format!("Failed to parse WAV data: {}", e),
    })?;
    decode_reader(reader)
}

fn decode_reader<R: Read>(mut reader: hound::WavReader<R>) -> Result<Vec<i16>> {
    let spec = reader.spec();
    let source_rate = spec.sample_rate;
    let source_channels = spec.channels;

    let raw_samples: Vec<i16> = reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ArticastError::Audio {
            message: format!("Failed to read WAV samples: {}", e),
        })?;

    // Downmix to mono
    let mono_samples = if source_channels > 1 {
        raw_samples
            .chunks_exact(source_channels as usize)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / source_channels as i32) as i16
            })
            .collect()
    } else {
        raw_samples
    };

    if source_rate == SAMPLE_RATE {
        Ok(mono_samples)
    } else {
        Ok(resample(&mono_samples, source_rate, SAMPLE_RATE))
    }
}

/// Write 16kHz mono samples as a 16-bit PCM WAV file.
pub fn write_samples(path: &Path, samples: &[i16]) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).map_err(|e| ArticastError::Audio {
        message: format!("Failed to create WAV file {}: {}", path.display(), e),
    })?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| ArticastError::Audio {
                message: format!("Failed to write WAV sample: {}", e),
            })?;
    }
    writer.finalize().map_err(|e| ArticastError::Audio {
        message: format!("Failed to finalize WAV file: {}", e),
    })?;
    Ok(())
}

/// Simple linear interpolation resampling.
pub fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[samples.len() - 1]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as i16
            }
        })
        .collect()
}
