//! Byte-level audio metadata probe.
//!
//! Extracts authoritative duration and format metadata directly from raw
//! audio bytes. No decoder and no external process is involved: each
//! parser is a pure function over an in-memory buffer, which keeps the
//! probe fully deterministic and data-driven testable.

mod mp3;
mod ogg;
mod wav;

use std::path::Path;

use crate::error::Result;
use crate::types::{AudioFormat, AudioInfo};

/// Probes raw audio bytes using the format declared by the file name.
///
/// The extension (lower-cased, leading dot stripped) selects which parser
/// runs; an extension outside {wav, mp3, ogg} fails before any byte is
/// inspected. Structural problems in the bytes themselves surface as
/// `MalformedAudio`, never as a wrong duration.
pub fn probe(data: &[u8], file_name: &str) -> Result<AudioInfo> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    let format = AudioFormat::from_extension(extension)?;

    let duration = match format {
        AudioFormat::Wav => wav::duration(data)?,
        AudioFormat::Mp3 => mp3::duration(data)?,
        AudioFormat::Ogg => ogg::duration(data)?,
    };

    let base_name = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name);

    Ok(AudioInfo {
        duration,
        size: data.len() as u64,
        format,
        file_name: base_name.to_string(),
    })
}
