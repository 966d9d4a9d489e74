//! Chunked captioning pipeline.
//!
//! Short audio is captioned in a single request. Longer audio is split
//! into fixed-length chunks which are captioned concurrently under a
//! bounded pool, then reassembled into time-ordered caption segments.
//! Any chunk failure fails the whole stage; partial captions are never
//! returned.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::backend::{AudioSplitter, CaptionBackend};
use crate::defaults::{CHUNK_DURATION_SECS, MAX_CONCURRENT_CAPTIONS};
use crate::error::{Result, SoundscopeError};
use crate::types::{AudioInfo, CaptionChunkResult, RefinedCaption};

pub struct CaptionPipeline {
    backend: Arc<dyn CaptionBackend>,
    splitter: Arc<dyn AudioSplitter>,
    chunk_duration_secs: u64,
    max_concurrency: usize,
}

impl CaptionPipeline {
    pub fn new(backend: Arc<dyn CaptionBackend>, splitter: Arc<dyn AudioSplitter>) -> Self {
        Self {
            backend,
            splitter,
            chunk_duration_secs: CHUNK_DURATION_SECS,
            max_concurrency: MAX_CONCURRENT_CAPTIONS,
        }
    }

    /// Captions the payload, honoring `cancel` between chunk dispatches.
    ///
    /// A triggered cancel stops new dispatches; chunks already in flight
    /// run to their own completion before the stage reports.
    pub async fn run(
        &self,
        info: &AudioInfo,
        data: &[u8],
        cancel: Arc<AtomicBool>,
    ) -> Result<Vec<RefinedCaption>> {
        if info.duration <= self.chunk_duration_secs as f64 {
            return self.caption_single(info, data).await;
        }
        self.caption_chunked(info, data, cancel).await
    }

    /// Single request covering the whole payload.
    async fn caption_single(&self, info: &AudioInfo, data: &[u8]) -> Result<Vec<RefinedCaption>> {
        let caption = self
            .backend
            .infer(&info.format.content_type(), &info.file_name, data.to_vec())
            .await?;
        Ok(vec![RefinedCaption {
            caption,
            start_time: 0,
            end_time: info.duration as u64,
        }])
    }

    /// Split, caption under the bounded pool, reassemble by index.
    async fn caption_chunked(
        &self,
        info: &AudioInfo,
        data: &[u8],
        cancel: Arc<AtomicBool>,
    ) -> Result<Vec<RefinedCaption>> {
        // Scratch area for the input copy and the chunk files; removed
        // on drop whichever way this function exits.
        let scratch = tempfile::tempdir()?;
        let input_path = scratch.path().join(&info.file_name);
        tokio::fs::write(&input_path, data).await?;

        let chunks = self
            .splitter
            .split(&input_path, scratch.path(), self.chunk_duration_secs)
            .await?;
        tracing::debug!(
            file = %info.file_name,
            chunks = chunks.len(),
            "captioning in chunks"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let content_type = info.format.content_type();

        let mut tasks: JoinSet<(usize, Result<String>)> = JoinSet::new();
        let mut failures: Vec<SoundscopeError> = Vec::new();

        for (index, chunk_path) in chunks.iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                failures.push(SoundscopeError::Other(format!(
                    "caption cancelled before chunk {index} was dispatched"
                )));
                break;
            }

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    failures.push(SoundscopeError::Other(
                        "caption worker pool closed unexpectedly".to_string(),
                    ));
                    break;
                }
            };

            let backend = self.backend.clone();
            let content_type = content_type.clone();
            let chunk_name = format!("{}_chunk_{index}", info.file_name);
            let chunk_path = chunk_path.clone();

            tasks.spawn(async move {
                let _permit = permit;
                let result = async {
                    let bytes = tokio::fs::read(&chunk_path).await?;
                    backend.infer(&content_type, &chunk_name, bytes).await
                }
                .await;
                (index, result)
            });
        }

        // Join every started task before reporting anything; in-flight
        // work is never aborted, not even after cancellation.
        let mut results: Vec<CaptionChunkResult> = Vec::with_capacity(chunks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(caption))) => results.push(CaptionChunkResult { index, caption }),
                Ok((index, Err(e))) => failures.push(SoundscopeError::Other(format!(
                    "caption chunk {index} failed: {e}"
                ))),
                Err(e) => failures.push(SoundscopeError::Other(format!(
                    "caption worker panicked: {e}"
                ))),
            }
        }

        if !failures.is_empty() {
            return Err(SoundscopeError::aggregate(failures));
        }

        // Completion order is unconstrained; index order is the contract
        results.sort_by_key(|r| r.index);
        Ok(self.refine(info, results))
    }

    /// Synthesizes time ranges: chunk i covers
    /// `[i × chunkDuration, (i+1) × chunkDuration)`, with the final end
    /// clamped to the true total duration.
    fn refine(&self, info: &AudioInfo, results: Vec<CaptionChunkResult>) -> Vec<RefinedCaption> {
        let total = info.duration as u64;
        results
            .into_iter()
            .map(|r| {
                let start = r.index as u64 * self.chunk_duration_secs;
                let end = ((r.index as u64 + 1) * self.chunk_duration_secs).min(total);
                RefinedCaption {
                    caption: r.caption,
                    start_time: start,
                    end_time: end,
                }
            })
            .collect()
    }
}
