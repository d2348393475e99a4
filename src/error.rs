//! Error types for stream-sound.
//!
//! Every failure is logged where it happens and then returned as a
//! [`PlaybackError`]. Cancellation is not an error; it is reported through
//! [`PlaybackOutcome::Cancelled`](crate::PlaybackOutcome::Cancelled).

use std::path::PathBuf;

/// Errors that prevent or abort playback of an audio file.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// The path does not exist.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path that was requested.
        path: PathBuf,
    },

    /// The path exists but is not a regular file.
    #[error("not a regular file: {}", path.display())]
    NotAFile {
        /// Path that was requested.
        path: PathBuf,
    },

    /// Reading the file failed.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// Path being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file content is not a WAV, AIFF or AU container.
    #[error("unsupported container: {reason}")]
    UnsupportedContainer {
        /// What the header held instead.
        reason: String,
    },

    /// The container is recognized but its sample encoding is not playable.
    #[error("unsupported audio format: {format}")]
    UnsupportedFormat {
        /// Description of the rejected encoding.
        format: String,
    },

    /// The container header is truncated or inconsistent.
    #[error("malformed header: {reason}")]
    MalformedHeader {
        /// What was wrong with the header.
        reason: String,
    },

    /// The output device exists but a line could not be opened on it.
    #[error("output line unavailable: {reason}")]
    LineUnavailable {
        /// Why the line could not be opened.
        reason: String,
    },

    /// No default output device is configured on this system.
    #[error("no default output device configured")]
    NoDefaultDevice,

    /// The requested output device was not found.
    #[error("output device not found: {name}")]
    DeviceNotFound {
        /// Name of the device that wasn't found.
        name: String,
    },

    /// The output line failed while audio was being written or drained.
    #[error("output line failed: {reason}")]
    LineFailed {
        /// Description of the backend failure.
        reason: String,
    },

    /// The player configuration is invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Which setting was rejected.
        reason: String,
    },

    /// A background playback task panicked or was aborted.
    #[error("playback task failed: {0}")]
    TaskFailed(String),
}

impl PlaybackError {
    /// Creates an I/O error for the given path.
    ///
    /// `NotFound` errors are mapped to [`PlaybackError::FileNotFound`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::FileNotFound { path };
        }
        Self::Io { path, source }
    }

    /// Creates a malformed header error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedHeader {
            reason: reason.into(),
        }
    }

    /// Creates an unsupported format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Creates a line failure error.
    pub fn line_failed(reason: impl Into<String>) -> Self {
        Self::LineFailed {
            reason: reason.into(),
        }
    }

    /// Creates a line unavailable error.
    pub fn line_unavailable(reason: impl Into<String>) -> Self {
        Self::LineUnavailable {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error means the file itself cannot be played,
    /// as opposed to a device or runtime failure.
    pub fn is_rejected_input(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound { .. }
                | Self::NotAFile { .. }
                | Self::UnsupportedContainer { .. }
                | Self::UnsupportedFormat { .. }
                | Self::MalformedHeader { .. }
        )
    }
}
