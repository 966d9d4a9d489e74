//! Default configuration constants for soundscope.
//!
//! Shared constants used by the probe and both analysis pipelines,
//! kept in one place so the threshold and chunk length stay in sync.

use std::time::Duration;

/// Captioning chunk length in seconds.
///
/// Audio at or below this duration is captioned in a single request;
/// anything longer is split into chunks of exactly this length (the
/// final chunk may be shorter).
pub const CHUNK_DURATION_SECS: u64 = 10;

/// Maximum number of caption chunk requests in flight at once.
pub const MAX_CONCURRENT_CAPTIONS: usize = 5;

/// Interval between polls of the event-detection result endpoint.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Wall-clock budget for the event-detection poll loop.
///
/// Enforced independently of any caller-side cancellation.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Minimum plausible MP3 file size in bytes.
///
/// A single MPEG-1 Layer III frame at the lowest supported bitrate is
/// larger than this; smaller buffers cannot contain a decodable frame.
pub const MIN_MP3_SIZE: usize = 128;

/// Minimum WAV buffer size: the canonical 44-byte RIFF/WAVE header.
pub const MIN_WAV_HEADER: usize = 44;

/// Samples per MPEG-1 Layer III frame.
pub const MP3_SAMPLES_PER_FRAME: u64 = 1152;

/// Default base URL for the analysis backends.
pub const DEFAULT_BASE_URL: &str = "https://api.cochl.ai";
