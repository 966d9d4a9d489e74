//! Collaborator contracts for the remote analysis backends.
//!
//! These traits are the seams between the orchestration core and the
//! outside world: the event-detection service, the captioning service
//! and the audio splitter. Each has a production implementation and a
//! mock for deterministic testing.

pub mod caption;
pub mod sense;
pub mod splitter;

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{Result, SoundscopeError};
use crate::types::{AnalysisSession, InferenceResult, Segment, SessionState, UploadAck};

/// Remote acoustic event-detection service.
///
/// Any non-success response from any call is a `Backend` error carrying
/// the raw response text.
#[async_trait]
pub trait EventDetectionBackend: Send + Sync {
    /// Opens an analysis session for one audio payload.
    async fn create_session(
        &self,
        file_name: &str,
        content_type: &str,
        duration: f64,
        total_bytes: u64,
    ) -> Result<AnalysisSession>;

    /// Uploads one payload chunk into an open session.
    async fn upload_chunk(
        &self,
        session_id: &str,
        chunk_sequence: u32,
        data: &[u8],
    ) -> Result<UploadAck>;

    /// Fetches the current inference state and any segments so far.
    async fn get_result(&self, session_id: &str) -> Result<InferenceResult>;

    /// Deletes a session. Idempotent, best-effort cleanup.
    async fn delete_session(&self, session_id: &str) -> Result<()>;
}

/// Remote audio captioning service.
#[async_trait]
pub trait CaptionBackend: Send + Sync {
    /// Captions one audio payload, returning the caption text.
    async fn infer(&self, content_type: &str, file_name: &str, data: Vec<u8>) -> Result<String>;
}

/// Splits an audio file into fixed-length chunk files.
///
/// Chunks are contiguous and non-overlapping; the returned paths are
/// ordered by chunk index and the last chunk may be shorter.
#[async_trait]
pub trait AudioSplitter: Send + Sync {
    async fn split(
        &self,
        input: &Path,
        output_dir: &Path,
        chunk_duration_secs: u64,
    ) -> Result<Vec<PathBuf>>;
}

// ─── Mock collaborators ──────────────────────────────────────────────

/// Mock event-detection backend for testing.
///
/// Configured with the number of `pending` polls to serve before `done`
/// and the segments to return; individual calls can be made to fail.
pub struct MockEventBackend {
    session_id: String,
    pending_polls: AtomicUsize,
    segments: Vec<Segment>,
    fail_create: bool,
    fail_upload: bool,
    fail_poll: bool,
    create_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    poll_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MockEventBackend {
    pub fn new() -> Self {
        Self {
            session_id: "mock-session".to_string(),
            pending_polls: AtomicUsize::new(0),
            segments: Vec::new(),
            fail_create: false,
            fail_upload: false,
            fail_poll: false,
            create_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Serve this many `pending` states before reporting `done`.
    pub fn with_pending_polls(self, polls: usize) -> Self {
        self.pending_polls.store(polls, Ordering::SeqCst);
        self
    }

    pub fn with_segments(mut self, segments: Vec<Segment>) -> Self {
        self.segments = segments;
        self
    }

    pub fn with_create_failure(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn with_upload_failure(mut self) -> Self {
        self.fail_upload = true;
        self
    }

    pub fn with_poll_failure(mut self) -> Self {
        self.fail_poll = true;
        self
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn backend_error(message: &str) -> SoundscopeError {
        SoundscopeError::Backend {
            backend: "sense".to_string(),
            message: message.to_string(),
        }
    }
}

impl Default for MockEventBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventDetectionBackend for MockEventBackend {
    async fn create_session(
        &self,
        _file_name: &str,
        _content_type: &str,
        _duration: f64,
        _total_bytes: u64,
    ) -> Result<AnalysisSession> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create {
            return Err(Self::backend_error("mock create_session failure"));
        }
        Ok(AnalysisSession {
            session_id: self.session_id.clone(),
            chunk_sequence: 0,
            window_size: 1,
            window_hop: 1,
        })
    }

    async fn upload_chunk(
        &self,
        session_id: &str,
        chunk_sequence: u32,
        _data: &[u8],
    ) -> Result<UploadAck> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upload {
            return Err(Self::backend_error("mock upload_chunk failure"));
        }
        Ok(UploadAck {
            session_id: session_id.to_string(),
            chunk_sequence,
        })
    }

    async fn get_result(&self, _session_id: &str) -> Result<InferenceResult> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_poll {
            return Err(Self::backend_error("mock get_result failure"));
        }
        let remaining = self.pending_polls.load(Ordering::SeqCst);
        if remaining > 0 {
            self.pending_polls.store(remaining - 1, Ordering::SeqCst);
            return Ok(InferenceResult {
                state: SessionState::Pending,
                segments: Vec::new(),
            });
        }
        Ok(InferenceResult {
            state: SessionState::Done,
            segments: self.segments.clone(),
        })
    }

    async fn delete_session(&self, _session_id: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Mock caption backend for testing.
///
/// Tracks concurrency so tests can assert the bounded-pool ceiling, and
/// can be configured to fail specific chunk indices by file-name match.
pub struct MockCaptionBackend {
    response: String,
    fail_matching: Option<String>,
    hold: std::time::Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
    requests: Mutex<Vec<String>>,
}

impl MockCaptionBackend {
    pub fn new() -> Self {
        Self {
            response: "mock caption".to_string(),
            fail_matching: None,
            hold: std::time::Duration::ZERO,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Fail any request whose file name contains this fragment.
    pub fn with_failure_matching(mut self, fragment: &str) -> Self {
        self.fail_matching = Some(fragment.to_string());
        self
    }

    /// Hold each request open for this long, so overlap is observable.
    pub fn with_hold(mut self, hold: std::time::Duration) -> Self {
        self.hold = hold;
        self
    }

    /// Highest number of requests that were in flight at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// File names of every request received, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Default for MockCaptionBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptionBackend for MockCaptionBackend {
    async fn infer(&self, _content_type: &str, file_name: &str, _data: Vec<u8>) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(file_name.to_string());
        }

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_active, Ordering::SeqCst);

        if !self.hold.is_zero() {
            tokio::time::sleep(self.hold).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if let Some(ref fragment) = self.fail_matching
            && file_name.contains(fragment.as_str())
        {
            return Err(SoundscopeError::Backend {
                backend: "caption".to_string(),
                message: format!("mock caption failure for {file_name}"),
            });
        }

        Ok(format!("{} [{}]", self.response, file_name))
    }
}

/// Mock splitter that writes `chunk_count` small files into the output
/// directory instead of invoking a real splitter.
pub struct MockSplitter {
    chunk_count: usize,
    fail: bool,
}

impl MockSplitter {
    pub fn new(chunk_count: usize) -> Self {
        Self {
            chunk_count,
            fail: false,
        }
    }

    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl AudioSplitter for MockSplitter {
    async fn split(
        &self,
        input: &Path,
        output_dir: &Path,
        _chunk_duration_secs: u64,
    ) -> Result<Vec<PathBuf>> {
        if self.fail {
            return Err(SoundscopeError::Split {
                message: "mock splitter failure".to_string(),
            });
        }

        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("chunk");
        let mut paths = Vec::with_capacity(self.chunk_count);
        for index in 0..self.chunk_count {
            let path = output_dir.join(format!("{stem}_{index:03}.bin"));
            tokio::fs::write(&path, [index as u8]).await?;
            paths.push(path);
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_event_backend_serves_pending_then_done() {
        let backend = MockEventBackend::new().with_pending_polls(2);

        let first = backend.get_result("s").await.unwrap();
        assert_eq!(first.state, SessionState::Pending);
        let second = backend.get_result("s").await.unwrap();
        assert_eq!(second.state, SessionState::Pending);
        let third = backend.get_result("s").await.unwrap();
        assert_eq!(third.state, SessionState::Done);
        assert_eq!(backend.poll_calls(), 3);
    }

    #[tokio::test]
    async fn mock_event_backend_create_failure() {
        let backend = MockEventBackend::new().with_create_failure();
        let err = backend.create_session("a.wav", "audio/wav", 1.0, 10).await;
        assert!(matches!(err, Err(SoundscopeError::Backend { .. })));
    }

    #[tokio::test]
    async fn mock_caption_backend_records_requests() {
        let backend = MockCaptionBackend::new().with_response("birds chirping");
        let caption = backend
            .infer("audio/wav", "a.wav_chunk_0", vec![1, 2, 3])
            .await
            .unwrap();
        assert!(caption.contains("birds chirping"));
        assert_eq!(backend.requests(), vec!["a.wav_chunk_0".to_string()]);
    }

    #[tokio::test]
    async fn mock_caption_backend_fails_matching_names() {
        let backend = MockCaptionBackend::new().with_failure_matching("_chunk_1");
        assert!(backend.infer("audio/wav", "a_chunk_0", vec![]).await.is_ok());
        assert!(backend.infer("audio/wav", "a_chunk_1", vec![]).await.is_err());
    }

    #[tokio::test]
    async fn mock_splitter_writes_ordered_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let splitter = MockSplitter::new(3);
        let paths = splitter
            .split(Path::new("/tmp/in.wav"), dir.path(), 10)
            .await
            .unwrap();
        assert_eq!(paths.len(), 3);
        assert!(paths[0].file_name().unwrap().to_str().unwrap() < paths[2].file_name().unwrap().to_str().unwrap());
        for path in &paths {
            assert!(path.exists());
        }
    }
}
