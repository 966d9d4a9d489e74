//! Data model shared by the probe, the pipelines and the backend clients.
//!
//! Everything here is created fresh per analysis request and dropped once
//! the response (or error) has been produced.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SoundscopeError};

/// Canonical audio format tag, derived from the declared file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Mp3,
    Ogg,
}

impl AudioFormat {
    /// Parses a file extension (case-insensitive, optional leading dot).
    ///
    /// Extensions outside {wav, mp3, ogg} are rejected before any byte
    /// parsing happens.
    pub fn from_extension(ext: &str) -> Result<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "wav" => Ok(AudioFormat::Wav),
            "mp3" => Ok(AudioFormat::Mp3),
            "ogg" => Ok(AudioFormat::Ogg),
            _ => Err(SoundscopeError::UnsupportedFormat { format: ext }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Ogg => "ogg",
        }
    }

    /// MIME-style content type sent to both backends.
    pub fn content_type(&self) -> String {
        format!("audio/{}", self.as_str())
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authoritative metadata extracted from raw audio bytes.
///
/// Immutable once produced by the probe; both pipelines read it, neither
/// mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInfo {
    /// Duration in seconds.
    pub duration: f64,
    /// Total size in bytes.
    pub size: u64,
    /// Canonical format tag.
    pub format: AudioFormat,
    /// Display file name (base name of the original reference).
    pub file_name: String,
}

/// Handle to a server-side analysis session.
///
/// The backend is the source of truth; this is only the handle the
/// session pipeline drives for the lifetime of one request.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisSession {
    pub session_id: String,
    pub chunk_sequence: u32,
    #[serde(default)]
    pub window_size: u32,
    #[serde(default)]
    pub window_hop: u32,
}

/// Acknowledgement for a single chunk upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadAck {
    pub session_id: String,
    pub chunk_sequence: u32,
}

/// Inference state reported by the event-detection backend.
///
/// Anything that is not `done` keeps the poll loop running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Done,
    #[serde(other)]
    Pending,
}

/// One detected acoustic event tag with its confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub probability: f64,
}

/// One temporal window of detected events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start_time: u64,
    pub end_time: u64,
    pub tags: Vec<Tag>,
}

/// Full result document polled from the event-detection backend.
#[derive(Debug, Clone, Deserialize)]
pub struct InferenceResult {
    pub state: SessionState,
    #[serde(rename = "data", default)]
    pub segments: Vec<Segment>,
}

/// Caption text for one audio chunk, keyed by its split index.
///
/// Transient: only ordering by `index` matters, completion order does not.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionChunkResult {
    pub index: usize,
    pub caption: String,
}

/// Final caption segment covering `[start_time, end_time)` of the audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinedCaption {
    pub caption: String,
    pub start_time: u64,
    pub end_time: u64,
}

/// One analysis request as submitted by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    /// Audio file URL or local absolute path (wav/mp3/ogg).
    pub file_url: String,
    /// Generate a natural-language caption alongside event detection.
    #[serde(default)]
    pub with_caption: bool,
}

/// Merged output of one analysis request.
///
/// Never partially populated: on any failure the request yields an error
/// and no output at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyzeOutput {
    /// Temporal segments with detected sounds/events and probability scores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sense: Option<Vec<Segment>>,
    /// Time-ordered captions covering the whole audio duration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<Vec<RefinedCaption>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension_accepts_known_formats() {
        assert_eq!(AudioFormat::from_extension("wav").unwrap(), AudioFormat::Wav);
        assert_eq!(AudioFormat::from_extension("mp3").unwrap(), AudioFormat::Mp3);
        assert_eq!(AudioFormat::from_extension("ogg").unwrap(), AudioFormat::Ogg);
    }

    #[test]
    fn format_from_extension_normalizes_case_and_dot() {
        assert_eq!(AudioFormat::from_extension(".WAV").unwrap(), AudioFormat::Wav);
        assert_eq!(AudioFormat::from_extension("Mp3").unwrap(), AudioFormat::Mp3);
    }

    #[test]
    fn format_from_extension_rejects_unknown() {
        let err = AudioFormat::from_extension("flac").unwrap_err();
        match err {
            SoundscopeError::UnsupportedFormat { format } => assert_eq!(format, "flac"),
            other => panic!("Expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn format_content_type() {
        assert_eq!(AudioFormat::Ogg.content_type(), "audio/ogg");
    }

    #[test]
    fn session_state_deserializes_done_and_other() {
        let done: SessionState = serde_json::from_str("\"done\"").unwrap();
        assert_eq!(done, SessionState::Done);

        let pending: SessionState = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(pending, SessionState::Pending);

        // Unknown states keep the poll loop running instead of failing
        let unknown: SessionState = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(unknown, SessionState::Pending);
    }

    #[test]
    fn inference_result_deserializes_backend_shape() {
        let body = r#"{
            "state": "done",
            "data": [
                {
                    "start_time": 0,
                    "end_time": 1,
                    "tags": [{"name": "Gunshot", "probability": 0.92}]
                }
            ]
        }"#;
        let result: InferenceResult = serde_json::from_str(body).unwrap();
        assert_eq!(result.state, SessionState::Done);
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].tags[0].name, "Gunshot");
    }

    #[test]
    fn inference_result_tolerates_missing_data_while_pending() {
        let body = r#"{"state": "pending"}"#;
        let result: InferenceResult = serde_json::from_str(body).unwrap();
        assert_eq!(result.state, SessionState::Pending);
        assert!(result.segments.is_empty());
    }

    #[test]
    fn analyze_output_serializes_only_populated_fields() {
        let output = AnalyzeOutput {
            sense: Some(vec![]),
            caption: None,
        };
        let json = serde_json::to_string(&output).unwrap();
        assert_eq!(json, r#"{"sense":[]}"#);
    }

    #[test]
    fn analyze_request_defaults_with_caption_to_false() {
        let req: AnalyzeRequest =
            serde_json::from_str(r#"{"file_url": "/tmp/a.wav"}"#).unwrap();
        assert!(!req.with_caption);
    }
}
