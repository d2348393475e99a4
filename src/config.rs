//! Configuration types for playback.

use std::time::Duration;

use crate::PlaybackError;

/// Default transfer buffer size for streamed playback (512 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 512 * 1024;

/// Configuration for a [`Player`](crate::Player).
///
/// Use [`PlaybackConfig::default()`] for sensible defaults, or customize as needed.
///
/// # Example
///
/// ```
/// use stream_sound::PlaybackConfig;
/// use std::time::Duration;
///
/// let config = PlaybackConfig {
///     line_buffer: Duration::from_millis(250),
///     ..Default::default()
/// };
/// assert_eq!(config.buffer_size, 512 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Size of the transfer buffer used for each read/write cycle, in bytes.
    ///
    /// Reads are rounded down to whole frames, so the effective size may be
    /// a few bytes smaller.
    /// Default: 512 KiB
    pub buffer_size: usize,

    /// Amount of audio the output line queues ahead of the device.
    ///
    /// Larger values tolerate scheduling hiccups; smaller values make
    /// cancellation and drain more responsive.
    /// Default: 500ms
    pub line_buffer: Duration,

    /// Name of the output device to use, or `None` for the system default.
    pub output_device: Option<String>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            line_buffer: Duration::from_millis(500),
            output_device: None,
        }
    }
}

impl PlaybackConfig {
    /// Checks that the configuration can be used for playback.
    pub(crate) fn validate(&self) -> Result<(), PlaybackError> {
        if self.buffer_size == 0 {
            return Err(PlaybackError::InvalidConfig {
                reason: "buffer_size must be greater than zero".to_string(),
            });
        }
        if self.line_buffer.is_zero() {
            return Err(PlaybackError::InvalidConfig {
                reason: "line_buffer must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
