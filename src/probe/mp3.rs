//! MPEG-1 Layer III frame scanner.
//!
//! Walks the buffer frame by frame without decoding audio. An optional
//! leading ID3v2 tag is skipped, then every valid frame header advances
//! the scan by the computed frame length; anything that is not a valid
//! sync advances by a single byte, which tolerates trailing garbage and
//! embedded tag data.

use crate::defaults::{MIN_MP3_SIZE, MP3_SAMPLES_PER_FRAME};
use crate::error::{Result, SoundscopeError};

/// Bitrate table for MPEG-1 Layer III, kbps, indices 1..=14.
const BITRATES_KBPS: [u32; 14] = [32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];

/// Sample-rate table for MPEG-1, Hz, indices 0..=2.
const SAMPLE_RATES: [u32; 3] = [44_100, 48_000, 32_000];

fn malformed(message: &str) -> SoundscopeError {
    SoundscopeError::MalformedAudio {
        format: "mp3".to_string(),
        message: message.to_string(),
    }
}

struct FrameHeader {
    /// Bitrate in bits per second.
    bitrate: u32,
    sample_rate: u32,
    /// Total frame length in bytes, padding included.
    length: usize,
}

/// Decodes the 4-byte header at `data[pos..]`, if it is a valid
/// MPEG-1 Layer III frame sync.
fn decode_frame_header(data: &[u8], pos: usize) -> Option<FrameHeader> {
    if pos + 4 > data.len() {
        return None;
    }
    if data[pos] != 0xFF || data[pos + 1] & 0xE0 != 0xE0 {
        return None;
    }

    // Version must be MPEG-1 (0b11), layer must be III (0b01)
    let b1 = data[pos + 1];
    if (b1 >> 3) & 0x03 != 0b11 || (b1 >> 1) & 0x03 != 0b01 {
        return None;
    }

    let b2 = data[pos + 2];
    let bitrate_index = (b2 >> 4) & 0x0F;
    if bitrate_index == 0 || bitrate_index as usize > BITRATES_KBPS.len() {
        return None;
    }
    let sr_index = (b2 >> 2) & 0x03;
    if sr_index as usize >= SAMPLE_RATES.len() {
        return None;
    }
    let padding = u32::from((b2 >> 1) & 0x01);

    let bitrate = BITRATES_KBPS[bitrate_index as usize - 1] * 1000;
    let sample_rate = SAMPLE_RATES[sr_index as usize];
    let length = (144 * bitrate / sample_rate + padding) as usize;

    Some(FrameHeader {
        bitrate,
        sample_rate,
        length,
    })
}

/// Byte offset of the first audio frame, past an optional ID3v2 tag.
///
/// The tag size is a 28-bit big-endian value with the top bit of each
/// byte masked off, plus the 10 header bytes themselves.
fn id3v2_end(data: &[u8]) -> usize {
    if data.len() < 10 || &data[0..3] != b"ID3" {
        return 0;
    }
    let size = (usize::from(data[6] & 0x7F) << 21)
        | (usize::from(data[7] & 0x7F) << 14)
        | (usize::from(data[8] & 0x7F) << 7)
        | usize::from(data[9] & 0x7F);
    (size + 10).min(data.len())
}

/// Duration in seconds from a full frame scan.
///
/// Constant bitrate: `frames × 1152 / sampleRate`. When the bitrate
/// varies across frames (VBR), the frame count is not a reliable clock
/// and the estimate falls back to `fileSize / (lastBitrate / 8)`.
pub(crate) fn duration(data: &[u8]) -> Result<f64> {
    if data.len() <= MIN_MP3_SIZE {
        return Err(malformed("file too small to contain an audio frame"));
    }

    let mut pos = id3v2_end(data);
    let mut frames: u64 = 0;
    let mut sample_rate: u32 = 0;
    let mut last_bitrate: u32 = 0;
    let mut vbr = false;

    while pos + 4 <= data.len() {
        match decode_frame_header(data, pos) {
            Some(header) => {
                if last_bitrate != 0 && header.bitrate != last_bitrate {
                    vbr = true;
                }
                last_bitrate = header.bitrate;
                sample_rate = header.sample_rate;
                frames += 1;
                pos += header.length;
            }
            None => pos += 1,
        }
    }

    if frames == 0 || sample_rate == 0 {
        return Err(malformed("no valid MPEG frames found"));
    }

    if vbr {
        Ok(data.len() as f64 / (f64::from(last_bitrate) / 8.0))
    } else {
        Ok((frames * MP3_SAMPLES_PER_FRAME) as f64 / f64::from(sample_rate))
    }
}
