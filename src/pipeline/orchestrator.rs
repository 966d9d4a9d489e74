//! Per-request analysis orchestrator.
//!
//! Resolves the audio reference, probes the bytes once, then fans out to
//! the event-detection session and (optionally) the caption pipeline
//! concurrently. Results are merged only when every launched stage
//! succeeded; otherwise the request fails with every stage failure named.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crate::backend::splitter::FfmpegSplitter;
use crate::backend::{AudioSplitter, CaptionBackend, EventDetectionBackend};
use crate::backend::{caption::CaptionClient, sense::SenseClient};
use crate::config::Config;
use crate::error::{Result, SoundscopeError};
use crate::pipeline::{CaptionPipeline, SessionPipeline};
use crate::probe;
use crate::resolve::PathResolver;
use crate::types::{AnalyzeOutput, AnalyzeRequest};

pub struct Analyzer {
    resolver: PathResolver,
    session: SessionPipeline,
    caption: CaptionPipeline,
}

impl Analyzer {
    pub fn new(
        event_backend: Arc<dyn EventDetectionBackend>,
        caption_backend: Arc<dyn CaptionBackend>,
        splitter: Arc<dyn AudioSplitter>,
    ) -> Self {
        Self {
            resolver: PathResolver::new(),
            session: SessionPipeline::new(event_backend),
            caption: CaptionPipeline::new(caption_backend, splitter),
        }
    }

    /// Wires up the production backends from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let sense = SenseClient::new(&config.api.key, &config.api.base_url)?;
        let caption = CaptionClient::new(&config.api.key, &config.api.base_url)?;
        Ok(Self::new(
            Arc::new(sense),
            Arc::new(caption),
            Arc::new(FfmpegSplitter::new()),
        ))
    }

    /// Overrides the session poll cadence (for deterministic testing).
    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.session = self.session.with_polling(interval, timeout);
        self
    }

    pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeOutput> {
        self.analyze_with_cancel(request, Arc::new(AtomicBool::new(false)))
            .await
    }

    /// Runs one analysis request to completion.
    ///
    /// The payload is fetched and probed exactly once, then shared by
    /// both stages. Event detection always runs; captioning runs only
    /// when requested. Both stages are awaited unconditionally, and any
    /// stage failure fails the whole request with no partial output.
    pub async fn analyze_with_cancel(
        &self,
        request: &AnalyzeRequest,
        cancel: Arc<AtomicBool>,
    ) -> Result<AnalyzeOutput> {
        if request.file_url.trim().is_empty() {
            return Err(SoundscopeError::Validation {
                message: "file_url is required".to_string(),
            });
        }

        let (data, file_name) = self.resolver.fetch(&request.file_url).await?;
        let info = probe::probe(&data, &file_name)?;
        tracing::info!(
            file = %info.file_name,
            format = %info.format,
            duration = info.duration,
            with_caption = request.with_caption,
            "starting analysis"
        );

        let sense_stage = self.session.run(&info, &data);
        let caption_stage = async {
            if request.with_caption {
                Some(self.caption.run(&info, &data, cancel).await)
            } else {
                None
            }
        };
        let (sense_result, caption_result) = tokio::join!(sense_stage, caption_stage);

        let mut failures = Vec::new();
        let sense = match sense_result {
            Ok(segments) => Some(segments),
            Err(e) => {
                failures.push(SoundscopeError::Other(format!("sense audio failed: {e}")));
                None
            }
        };
        let caption = match caption_result {
            Some(Ok(captions)) => Some(captions),
            Some(Err(e)) => {
                failures.push(SoundscopeError::Other(format!("caption audio failed: {e}")));
                None
            }
            None => None,
        };

        if !failures.is_empty() {
            return Err(SoundscopeError::aggregate(failures));
        }

        Ok(AnalyzeOutput { sense, caption })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockCaptionBackend, MockEventBackend, MockSplitter};
    use crate::probe::fixtures::wav_bytes;
    use crate::types::{Segment, Tag};

    struct Harness {
        event: Arc<MockEventBackend>,
        caption: Arc<MockCaptionBackend>,
        _dir: tempfile::TempDir,
        file_url: String,
    }

    // One-second 16kHz mono WAV on disk, mocks everywhere else.
    fn harness(event: MockEventBackend, caption: MockCaptionBackend, chunks: usize) -> (Analyzer, Harness) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("street.wav");
        std::fs::write(&path, wav_bytes(32000, 16000, 1, 16)).unwrap();

        let event = Arc::new(event);
        let caption = Arc::new(caption);
        let analyzer = Analyzer::new(
            event.clone(),
            caption.clone(),
            Arc::new(MockSplitter::new(chunks)),
        );
        let file_url = path.to_str().unwrap().to_string();
        (
            analyzer,
            Harness {
                event,
                caption,
                _dir: dir,
                file_url,
            },
        )
    }

    fn siren_segment() -> Segment {
        Segment {
            start_time: 0,
            end_time: 1,
            tags: vec![Tag {
                name: "Siren".to_string(),
                probability: 0.93,
            }],
        }
    }

    #[tokio::test]
    async fn empty_file_url_is_rejected_before_any_work() {
        let (analyzer, h) = harness(MockEventBackend::new(), MockCaptionBackend::new(), 0);
        let request = AnalyzeRequest {
            file_url: "  ".to_string(),
            with_caption: true,
        };

        let err = analyzer.analyze(&request).await.unwrap_err();
        assert!(matches!(err, SoundscopeError::Validation { .. }));
        assert_eq!(h.event.poll_calls(), 0);
        assert!(h.caption.requests().is_empty());
    }

    #[tokio::test]
    async fn unresolvable_reference_fails_with_path_resolution() {
        let (analyzer, _h) = harness(MockEventBackend::new(), MockCaptionBackend::new(), 0);
        let request = AnalyzeRequest {
            file_url: "/no/such/clip.wav".to_string(),
            with_caption: false,
        };

        let err = analyzer.analyze(&request).await.unwrap_err();
        assert!(matches!(err, SoundscopeError::PathResolution { .. }));
    }

    #[tokio::test]
    async fn sense_only_request_skips_the_caption_stage() {
        let (analyzer, h) = harness(
            MockEventBackend::new().with_segments(vec![siren_segment()]),
            MockCaptionBackend::new(),
            0,
        );
        let request = AnalyzeRequest {
            file_url: h.file_url.clone(),
            with_caption: false,
        };

        let output = analyzer.analyze(&request).await.unwrap();
        assert_eq!(output.sense, Some(vec![siren_segment()]));
        assert!(output.caption.is_none());
        assert!(h.caption.requests().is_empty());
    }

    #[tokio::test]
    async fn captioned_request_populates_both_outputs() {
        let (analyzer, h) = harness(
            MockEventBackend::new().with_segments(vec![siren_segment()]),
            MockCaptionBackend::new().with_response("city traffic"),
            0,
        );
        let request = AnalyzeRequest {
            file_url: h.file_url.clone(),
            with_caption: true,
        };

        let output = analyzer.analyze(&request).await.unwrap();
        assert_eq!(output.sense, Some(vec![siren_segment()]));

        let captions = output.caption.unwrap();
        assert_eq!(captions.len(), 1);
        assert!(captions[0].caption.contains("city traffic"));
        assert_eq!(captions[0].start_time, 0);
        assert_eq!(captions[0].end_time, 1);
    }

    #[tokio::test]
    async fn sense_failure_fails_the_request_even_when_caption_succeeds() {
        let (analyzer, h) = harness(
            MockEventBackend::new().with_create_failure(),
            MockCaptionBackend::new(),
            0,
        );
        let request = AnalyzeRequest {
            file_url: h.file_url.clone(),
            with_caption: true,
        };

        let err = analyzer.analyze(&request).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("sense audio failed"), "got: {message}");
        assert!(!message.contains("caption audio failed"), "got: {message}");
        // The caption stage still ran to completion
        assert_eq!(h.caption.requests().len(), 1);
    }

    #[tokio::test]
    async fn caption_failure_fails_the_request_even_when_sense_succeeds() {
        let (analyzer, h) = harness(
            MockEventBackend::new().with_segments(vec![siren_segment()]),
            MockCaptionBackend::new().with_failure_matching("street.wav"),
            0,
        );
        let request = AnalyzeRequest {
            file_url: h.file_url.clone(),
            with_caption: true,
        };

        let err = analyzer.analyze(&request).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("caption audio failed"), "got: {message}");
        assert!(!message.contains("sense audio failed"), "got: {message}");
    }

    #[tokio::test]
    async fn both_stage_failures_are_reported_together() {
        let (analyzer, h) = harness(
            MockEventBackend::new().with_poll_failure(),
            MockCaptionBackend::new().with_failure_matching("street.wav"),
            0,
        );
        let request = AnalyzeRequest {
            file_url: h.file_url.clone(),
            with_caption: true,
        };

        let err = analyzer.analyze(&request).await.unwrap_err();
        match &err {
            SoundscopeError::Aggregate { failures } => assert_eq!(failures.len(), 2),
            other => panic!("Expected Aggregate, got {other:?}"),
        }
        let message = err.to_string();
        assert!(message.contains("sense audio failed"));
        assert!(message.contains("caption audio failed"));
    }

    #[tokio::test]
    async fn unsupported_extension_fails_before_any_backend_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.flac");
        std::fs::write(&path, b"fLaC....").unwrap();

        let event = Arc::new(MockEventBackend::new());
        let analyzer = Analyzer::new(
            event.clone(),
            Arc::new(MockCaptionBackend::new()),
            Arc::new(MockSplitter::new(0)),
        );
        let request = AnalyzeRequest {
            file_url: path.to_str().unwrap().to_string(),
            with_caption: false,
        };

        let err = analyzer.analyze(&request).await.unwrap_err();
        assert!(matches!(err, SoundscopeError::UnsupportedFormat { .. }));
        assert_eq!(event.upload_calls(), 0);
    }
}
