//! RIFF/WAVE header parser.

use crate::defaults::MIN_WAV_HEADER;
use crate::error::{Result, SoundscopeError};

fn malformed(message: &str) -> SoundscopeError {
    SoundscopeError::MalformedAudio {
        format: "wav".to_string(),
        message: message.to_string(),
    }
}

/// Duration in seconds from the canonical 44-byte WAV header.
///
/// `duration = chunkSize / (sampleRate × channels × bytesPerSample)`,
/// all fields little-endian at their fixed header offsets.
pub(crate) fn duration(data: &[u8]) -> Result<f64> {
    if data.len() < MIN_WAV_HEADER {
        return Err(malformed("buffer shorter than 44-byte header"));
    }

    if &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return Err(malformed("missing RIFF/WAVE markers"));
    }

    let chunk_size = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    let num_channels = u16::from_le_bytes([data[22], data[23]]);
    let sample_rate = u32::from_le_bytes([data[24], data[25], data[26], data[27]]);
    let bits_per_sample = u16::from_le_bytes([data[34], data[35]]);

    // Header fields are untrusted; u64 math keeps extreme values from
    // overflowing (max is ~2^51, well inside u64).
    let bytes_per_sample = u64::from(bits_per_sample) / 8;
    let byte_rate = u64::from(sample_rate) * u64::from(num_channels) * bytes_per_sample;
    if byte_rate == 0 {
        return Err(malformed("zero byte rate in format header"));
    }

    Ok(f64::from(chunk_size) / byte_rate as f64)
}
