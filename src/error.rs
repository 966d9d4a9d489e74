//! Error types for soundscope.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SoundscopeError {
    // Request validation errors
    #[error("Invalid request: {message}")]
    Validation { message: String },

    // Audio probe errors
    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Malformed {format} data: {message}")]
    MalformedAudio { format: String, message: String },

    // Path resolution errors
    #[error("Failed to resolve audio reference {reference}: {message}")]
    PathResolution { reference: String, message: String },

    // Remote backend errors
    #[error("{backend} request failed: {message}")]
    Backend { backend: String, message: String },

    #[error("Timeout waiting for inference result after {seconds} seconds")]
    Timeout { seconds: u64 },

    // Chunk splitting errors
    #[error("Audio splitting failed: {message}")]
    Split { message: String },

    // Fan-out stages collect every underlying failure before reporting
    #[error("{}", format_aggregate(.failures))]
    Aggregate { failures: Vec<SoundscopeError> },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

fn format_aggregate(failures: &[SoundscopeError]) -> String {
    let parts: Vec<String> = failures.iter().map(|e| e.to_string()).collect();
    format!("{} stage(s) failed: {}", failures.len(), parts.join("; "))
}

impl SoundscopeError {
    /// Wraps one-or-more failures from a fan-out stage into a single error.
    ///
    /// Even a single failure stays wrapped, so callers always see which
    /// stage(s) of a fan-out went wrong.
    pub fn aggregate(failures: Vec<SoundscopeError>) -> Self {
        if failures.is_empty() {
            return SoundscopeError::Other("aggregate of zero failures".to_string());
        }
        SoundscopeError::Aggregate { failures }
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, SoundscopeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_validation_display() {
        let error = SoundscopeError::Validation {
            message: "file_url is required".to_string(),
        };
        assert_eq!(error.to_string(), "Invalid request: file_url is required");
    }

    #[test]
    fn test_unsupported_format_display() {
        let error = SoundscopeError::UnsupportedFormat {
            format: "flac".to_string(),
        };
        assert_eq!(error.to_string(), "Unsupported audio format: flac");
    }

    #[test]
    fn test_malformed_audio_display() {
        let error = SoundscopeError::MalformedAudio {
            format: "wav".to_string(),
            message: "missing RIFF marker".to_string(),
        };
        assert_eq!(error.to_string(), "Malformed wav data: missing RIFF marker");
    }

    #[test]
    fn test_backend_display() {
        let error = SoundscopeError::Backend {
            backend: "sense".to_string(),
            message: "502 Bad Gateway".to_string(),
        };
        assert_eq!(error.to_string(), "sense request failed: 502 Bad Gateway");
    }

    #[test]
    fn test_timeout_display() {
        let error = SoundscopeError::Timeout { seconds: 30 };
        assert_eq!(
            error.to_string(),
            "Timeout waiting for inference result after 30 seconds"
        );
    }

    #[test]
    fn test_aggregate_display_names_every_failure() {
        let error = SoundscopeError::Aggregate {
            failures: vec![
                SoundscopeError::Backend {
                    backend: "sense".to_string(),
                    message: "session create rejected".to_string(),
                },
                SoundscopeError::Timeout { seconds: 30 },
            ],
        };
        let msg = error.to_string();
        assert!(msg.starts_with("2 stage(s) failed"), "got: {msg}");
        assert!(msg.contains("session create rejected"));
        assert!(msg.contains("after 30 seconds"));
    }

    #[test]
    fn test_aggregate_helper_wraps_single_failure() {
        let error = SoundscopeError::aggregate(vec![SoundscopeError::Timeout { seconds: 30 }]);
        assert!(
            matches!(error, SoundscopeError::Aggregate { ref failures } if failures.len() == 1)
        );
        assert!(error.to_string().contains("after 30 seconds"));
    }

    #[test]
    fn test_aggregate_helper_keeps_multiple_failures() {
        let error = SoundscopeError::aggregate(vec![
            SoundscopeError::Timeout { seconds: 30 },
            SoundscopeError::Other("boom".to_string()),
        ]);
        assert!(
            matches!(error, SoundscopeError::Aggregate { ref failures } if failures.len() == 2)
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: SoundscopeError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<SoundscopeError>();
        assert_sync::<SoundscopeError>();
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }
}
