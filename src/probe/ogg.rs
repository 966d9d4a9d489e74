//! OGG/Vorbis duration probe.
//!
//! Two independent signature scans: the last `OggS` page header in the
//! file carries the final granule position (total samples), and the
//! first `vorbis` identification marker carries the sample rate.

use crate::error::{Result, SoundscopeError};

fn malformed(message: &str) -> SoundscopeError {
    SoundscopeError::MalformedAudio {
        format: "ogg".to_string(),
        message: message.to_string(),
    }
}

/// Granule position of the last page: scan backward from the end for
/// `OggS`; the 8-byte little-endian field sits at header offset 6.
fn last_granule_position(data: &[u8]) -> u64 {
    if data.len() < 14 {
        return 0;
    }
    let mut i = data.len() - 14;
    loop {
        if &data[i..i + 4] == b"OggS" {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&data[i + 6..i + 14]);
            let granule = u64::from_le_bytes(bytes);
            if granule != 0 {
                return granule;
            }
        }
        if i == 0 {
            return 0;
        }
        i -= 1;
    }
}

/// Sample rate from the identification header: scan forward for the
/// 6-byte `vorbis` marker; the 4-byte little-endian rate sits 11 bytes
/// past the marker start.
fn vorbis_sample_rate(data: &[u8]) -> u32 {
    if data.len() < 15 {
        return 0;
    }
    for i in 0..data.len() - 14 {
        if &data[i..i + 6] == b"vorbis" {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&data[i + 11..i + 15]);
            let rate = u32::from_le_bytes(bytes);
            if rate != 0 {
                return rate;
            }
        }
    }
    0
}

/// `duration = granulePosition / sampleRate`.
pub(crate) fn duration(data: &[u8]) -> Result<f64> {
    let granule = last_granule_position(data);
    let rate = vorbis_sample_rate(data);

    if granule == 0 || rate == 0 {
        return Err(malformed("OggS or vorbis signature not found"));
    }

    Ok(granule as f64 / f64::from(rate))
}
