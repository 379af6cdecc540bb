//! Error handling for Voicebox
//!
//! Every error carries the context needed to reproduce it: the file path,
//! the requested parameters and the underlying tool's diagnostic text.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for Voicebox operations
pub type Result<T> = std::result::Result<T, VoiceboxError>;

/// Main error type for Voicebox operations
#[derive(Error, Debug)]
pub enum VoiceboxError {
    // Input Errors
    #[error("Failed to decode audio file {}: {reason}", .path.display())]
    DecodeError { path: PathBuf, reason: String },

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    // Processing Errors
    #[error("Processing error during {operation}{}: {reason}", describe_path(.path))]
    ProcessingError {
        operation: String,
        reason: String,
        path: Option<PathBuf>,
    },

    #[error("Failed to encode {format}: {reason}")]
    EncodeError { format: String, reason: String },

    // File Errors
    #[error("Failed to read file: {}: {source}", .path.display())]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {}: {source}", .path.display())]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory creation failed: {}: {source}", .path.display())]
    DirectoryCreateError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Collaborator Errors
    #[error("History entry not found: {id}")]
    HistoryEntryNotFound { id: String },

    #[error("Clip extraction failed for {url}: {reason}")]
    ClipExtractionError { url: String, reason: String },

    #[error("Synthesis failed: {reason}")]
    SynthesisError { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn describe_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" of {}", path.display()),
        None => String::new(),
    }
}

impl VoiceboxError {
    /// Build a processing error for a DSP stage
    pub fn processing(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        VoiceboxError::ProcessingError {
            operation: operation.into(),
            reason: reason.into(),
            path: None,
        }
    }

    /// Attach the source file path to a processing error that lacks one.
    ///
    /// Other variants are returned untouched.
    pub fn with_source_path(self, source_path: &Path) -> Self {
        match self {
            VoiceboxError::ProcessingError {
                operation,
                reason,
                path: None,
            } => VoiceboxError::ProcessingError {
                operation,
                reason,
                path: Some(source_path.to_path_buf()),
            },
            other => other,
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            VoiceboxError::DecodeError { .. } => "DECODE_ERROR",
            VoiceboxError::InvalidParameter { .. } => "INVALID_PARAMETER",
            VoiceboxError::ProcessingError { .. } => "PROCESSING_ERROR",
            VoiceboxError::EncodeError { .. } => "ENCODE_ERROR",
            VoiceboxError::FileReadError { .. } => "FILE_READ_ERROR",
            VoiceboxError::FileWriteError { .. } => "FILE_WRITE_ERROR",
            VoiceboxError::DirectoryCreateError { .. } => "DIRECTORY_CREATE_ERROR",
            VoiceboxError::HistoryEntryNotFound { .. } => "HISTORY_ENTRY_NOT_FOUND",
            VoiceboxError::ClipExtractionError { .. } => "CLIP_EXTRACTION_ERROR",
            VoiceboxError::SynthesisError { .. } => "SYNTHESIS_ERROR",
            VoiceboxError::Io(_) => "IO_ERROR",
            VoiceboxError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Whether the failure was caused by the caller's input rather than the host.
    ///
    /// Decode and processing failures depend on the submitted file and
    /// parameters; encode and filesystem failures point at missing tooling or
    /// storage problems.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            VoiceboxError::DecodeError { .. }
                | VoiceboxError::InvalidParameter { .. }
                | VoiceboxError::ProcessingError { .. }
                | VoiceboxError::HistoryEntryNotFound { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            VoiceboxError::DecodeError { .. } => vec![
                "Check the file path is correct",
                "Check if the file plays in another application",
                "Try converting the file to WAV first",
            ],
            VoiceboxError::InvalidParameter { .. } => vec![
                "Pitch shift must be between -12 and +12 semitones",
                "Speed factor must be between 0.5 and 2.0",
            ],
            VoiceboxError::ProcessingError { .. } => vec![
                "The audio may be too short for the requested effect",
                "Try a longer clip or milder settings",
            ],
            VoiceboxError::EncodeError { .. } => vec![
                "Make sure ffmpeg is installed and on PATH",
                "Set VOICEBOX_FFMPEG or ffmpeg_path in settings",
                "Export to WAV, which needs no external encoder",
            ],
            VoiceboxError::DirectoryCreateError { .. } | VoiceboxError::FileWriteError { .. } => {
                vec![
                    "Check write permissions on the output directory",
                    "Free up disk space",
                ]
            }
            VoiceboxError::ClipExtractionError { .. } => vec![
                "Make sure yt-dlp is installed and up to date",
                "Check the URL and the requested time range",
            ],
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = VoiceboxError::DecodeError {
            path: PathBuf::from("voice.wav"),
            reason: "end of stream".to_string(),
        };
        assert_eq!(err.error_code(), "DECODE_ERROR");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_encode_error_is_server_side() {
        let err = VoiceboxError::EncodeError {
            format: "mp3".to_string(),
            reason: "ffmpeg: not found".to_string(),
        };
        assert!(!err.is_client_error());
        assert!(!err.recovery_suggestions().is_empty());
        assert_eq!(err.to_string(), "Failed to encode mp3: ffmpeg: not found");
    }

    #[test]
    fn test_with_source_path_fills_processing_error() {
        let err = VoiceboxError::processing("time stretch x2.0", "buffer too short")
            .with_source_path(Path::new("/tmp/voice.wav"));
        let message = err.to_string();
        assert!(message.contains("/tmp/voice.wav"), "{}", message);
        assert!(message.contains("time stretch x2.0"), "{}", message);
    }

    #[test]
    fn test_with_source_path_keeps_other_variants() {
        let err = VoiceboxError::HistoryEntryNotFound {
            id: "abc".to_string(),
        }
        .with_source_path(Path::new("/tmp/voice.wav"));
        assert_eq!(err.error_code(), "HISTORY_ENTRY_NOT_FOUND");
    }
}
