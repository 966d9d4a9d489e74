//! soundscope - Acoustic event detection and captioning for audio files
//!
//! Probes raw audio bytes for authoritative metadata, then fans the
//! payload out to a remote event-detection session and an optional
//! chunked captioning pipeline.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod backend;
pub mod config;
pub mod defaults;
pub mod error;
pub mod pipeline;
pub mod probe;
pub mod resolve;
pub mod types;

// Collaborator seams (backend services and the splitter)
pub use backend::splitter::{CommandExecutor, FfmpegSplitter, SystemCommandExecutor};
pub use backend::{AudioSplitter, CaptionBackend, EventDetectionBackend};
pub use backend::{MockCaptionBackend, MockEventBackend, MockSplitter};

// Orchestration
pub use pipeline::{Analyzer, CaptionPipeline, SessionPipeline};

// Probe
pub use probe::probe;

// Error handling
pub use error::{Result, SoundscopeError};

// Config
pub use config::Config;

// Request/response model
pub use types::{AnalyzeOutput, AnalyzeRequest, AudioFormat, AudioInfo, RefinedCaption, Segment};
