//! Event-detection session pipeline.
//!
//! Drives the create → upload → poll state machine against the remote
//! backend for one audio payload. Polling retries only the read of a
//! still-pending state; any transport or backend failure is propagated
//! immediately.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::backend::EventDetectionBackend;
use crate::defaults::{POLL_INTERVAL, POLL_TIMEOUT};
use crate::error::{Result, SoundscopeError};
use crate::types::{AudioInfo, Segment, SessionState};

pub struct SessionPipeline {
    backend: Arc<dyn EventDetectionBackend>,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl SessionPipeline {
    pub fn new(backend: Arc<dyn EventDetectionBackend>) -> Self {
        Self {
            backend,
            poll_interval: POLL_INTERVAL,
            poll_timeout: POLL_TIMEOUT,
        }
    }

    /// Overrides the poll cadence (for deterministic testing).
    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_timeout = timeout;
        self
    }

    /// Runs the full session lifecycle and returns the detected segments.
    ///
    /// The payload is uploaded in a single chunk; chunked upload for
    /// oversized files is deferred. After a successful poll the session
    /// is deleted best-effort — teardown failure never fails the run.
    pub async fn run(&self, info: &AudioInfo, data: &[u8]) -> Result<Vec<Segment>> {
        let session = self
            .backend
            .create_session(
                &info.file_name,
                &info.format.content_type(),
                info.duration,
                info.size,
            )
            .await?;
        tracing::debug!(
            session_id = %session.session_id,
            duration = info.duration,
            "created analysis session"
        );

        self.backend
            .upload_chunk(&session.session_id, session.chunk_sequence, data)
            .await?;

        let segments = self.poll_until_done(&session.session_id).await?;

        if let Err(e) = self.backend.delete_session(&session.session_id).await {
            tracing::warn!(session_id = %session.session_id, error = %e, "session cleanup failed");
        }

        Ok(segments)
    }

    /// Polls the result endpoint on a fixed interval until `done`.
    ///
    /// The wall-clock deadline is enforced independently of the caller:
    /// a backend that never reports `done` yields `Timeout` at the
    /// configured budget, never earlier.
    async fn poll_until_done(&self, session_id: &str) -> Result<Vec<Segment>> {
        let deadline = Instant::now() + self.poll_timeout;

        loop {
            tokio::select! {
                biased;
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(SoundscopeError::Timeout {
                        seconds: self.poll_timeout.as_secs(),
                    });
                }
                _ = tokio::time::sleep(self.poll_interval) => {
                    let result = self.backend.get_result(session_id).await?;
                    if result.state == SessionState::Done {
                        tracing::debug!(
                            session_id,
                            segments = result.segments.len(),
                            "inference complete"
                        );
                        return Ok(result.segments);
                    }
                }
            }
        }
    }
}
