//! Audio chunk splitting via an external ffmpeg process.
//!
//! The process invocation sits behind a command-executor seam so the
//! splitter logic (argument construction, output collection, ordering)
//! is testable without ffmpeg installed.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;

use crate::backend::AudioSplitter;
use crate::error::{Result, SoundscopeError};

/// Executes an external command and returns its stdout.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &str, args: &[String]) -> Result<String>;
}

/// Production command executor using tokio's process support.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandExecutor;

impl SystemCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandExecutor for SystemCommandExecutor {
    async fn execute(&self, command: &str, args: &[String]) -> Result<String> {
        let output = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SoundscopeError::Split {
                message: format!("failed to run {command}: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SoundscopeError::Split {
                message: format!("{command} exited with {}: {}", output.status, stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Splits audio into fixed-length chunks with `ffmpeg -f segment`.
///
/// Chunk files keep the input's container format (stream copy, no
/// re-encode) and are named `<stem>_chunk_<index>.<ext>` so sorting by
/// file name is sorting by chunk index.
pub struct FfmpegSplitter {
    executor: Arc<dyn CommandExecutor>,
}

impl FfmpegSplitter {
    pub fn new() -> Self {
        Self {
            executor: Arc::new(SystemCommandExecutor::new()),
        }
    }

    /// Swaps the command executor (for testing).
    pub fn with_executor(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    fn segment_args(input: &Path, output_pattern: &Path, chunk_duration_secs: u64) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
            "-f".to_string(),
            "segment".to_string(),
            "-segment_time".to_string(),
            chunk_duration_secs.to_string(),
            "-c".to_string(),
            "copy".to_string(),
            output_pattern.to_string_lossy().into_owned(),
        ]
    }
}

impl Default for FfmpegSplitter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioSplitter for FfmpegSplitter {
    async fn split(
        &self,
        input: &Path,
        output_dir: &Path,
        chunk_duration_secs: u64,
    ) -> Result<Vec<PathBuf>> {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        let ext = input
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("wav");

        let pattern = output_dir.join(format!("{stem}_chunk_%03d.{ext}"));
        let args = Self::segment_args(input, &pattern, chunk_duration_secs);
        self.executor.execute("ffmpeg", &args).await?;

        let prefix = format!("{stem}_chunk_");
        let mut chunks = Vec::new();
        let mut entries = tokio::fs::read_dir(output_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(&prefix) {
                chunks.push(entry.path());
            }
        }

        if chunks.is_empty() {
            return Err(SoundscopeError::Split {
                message: format!("ffmpeg produced no chunks for {}", input.display()),
            });
        }

        // %03d numbering makes lexicographic order chunk order
        chunks.sort();
        Ok(chunks)
    }
}
