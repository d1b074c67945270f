// src/media/audio.rs
use crate::error::StepError;
use std::path::Path;

/// Narration sample rate requested from the speech synthesizer.
pub const SAMPLE_RATE: u32 = 44_100;
/// Raw narration is mono f32.
pub const BYTES_PER_SAMPLE: usize = 4;

/// Length in seconds of a raw f32 mono buffer: `bytes / (4 * rate)`.
pub fn duration_from_bytes(byte_len: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    byte_len as f64 / (BYTES_PER_SAMPLE as f64 * sample_rate as f64)
}

/// Write raw little-endian f32 samples as a 32-bit float mono WAV and return
/// the duration of the raw buffer in seconds. A trailing partial sample is
/// not written.
pub fn write_wav(raw: &[u8], sample_rate: u32, output: &Path) -> Result<f64, StepError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(output, spec)
        .map_err(|e| StepError::transient("audio", format!("can't create WAV file: {}", e)))?;
    for chunk in raw.chunks_exact(BYTES_PER_SAMPLE) {
        let sample = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        writer
            .write_sample(sample)
            .map_err(|e| StepError::transient("audio", format!("can't write WAV sample: {}", e)))?;
    }
    writer
        .finalize()
        .map_err(|e| StepError::transient("audio", format!("can't finalize WAV file: {}", e)))?;

    Ok(duration_from_bytes(raw.len(), sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_is_bytes_over_four_times_rate() {
        assert_eq!(duration_from_bytes(4 * 44_100, SAMPLE_RATE), 1.0);
        assert_eq!(duration_from_bytes(0, SAMPLE_RATE), 0.0);
        assert_eq!(duration_from_bytes(1024, 0), 0.0);
    }

    #[test]
    fn test_partial_trailing_sample_still_counts_toward_duration() {
        let bytes = 2 * 4 * 44_100 + 3;
        let expected = bytes as f64 / (4.0 * 44_100.0);
        let duration = duration_from_bytes(bytes, SAMPLE_RATE);
        assert!((duration - expected).abs() < 1e-6, "got {} want {}", duration, expected);
        assert!(duration > 2.0);
    }

    #[test]
    fn test_write_wav_round_trips_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("full_audio.wav");
        let samples = [0.0f32, 0.5, -0.25, 1.0];
        let raw: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();

        let duration = write_wav(&raw, 4, &path).unwrap();
        assert_eq!(duration, 1.0);

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_format, hound::SampleFormat::Float);
        assert_eq!(reader.spec().channels, 1);
        let decoded: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }
}
