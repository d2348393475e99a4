//! Output line abstraction and backends.
//!
//! An [`OutputLine`] is an open handle to an audio output with a strict
//! lifecycle:
//!
//! ```text
//! open (LineProvider) → start → write* → drain → stop → close
//! ```
//!
//! The crate provides two [`LineProvider`]s:
//!
//! - [`CpalBackend`]: plays through a system output device via CPAL
//! - [`MockBackend`]: records every operation, for tests and CI
//!
//! [`LineGuard`] makes sure a line is stopped and closed on every exit path.

mod cpal_line;
mod mock;

pub use cpal_line::{default_output_device_name, list_output_devices, CpalBackend};
pub use mock::{LineOp, MockBackend, MockLineRecord};

use crate::format::AudioFormat;
use crate::PlaybackError;

/// An open audio output accepting raw sample bytes in its opening format.
///
/// Lines are used from the thread that opened them and are not required to
/// be `Send` (CPAL streams are not on every platform).
pub trait OutputLine {
    /// The format the line was opened with.
    fn format(&self) -> &AudioFormat;

    /// Starts consuming written audio.
    fn start(&mut self) -> Result<(), PlaybackError>;

    /// Writes raw sample bytes, blocking until the line has accepted all of them.
    ///
    /// `data` must be encoded in [`format()`](OutputLine::format).
    fn write(&mut self, data: &[u8]) -> Result<(), PlaybackError>;

    /// Blocks until all written audio has physically played.
    fn drain(&mut self) -> Result<(), PlaybackError>;

    /// Stops playback. Queued audio that hasn't played yet is discarded.
    fn stop(&mut self);

    /// Releases the underlying device resources. Idempotent.
    fn close(&mut self);
}

/// Opens output lines. Shared across threads by the [`Player`](crate::Player).
pub trait LineProvider: Send + Sync {
    /// Human-readable name for logging and error messages.
    fn name(&self) -> &str;

    /// Opens a line that accepts exactly `format`.
    ///
    /// # Errors
    ///
    /// Returns `LineUnavailable`, `NoDefaultDevice` or `DeviceNotFound` if
    /// no line can be opened.
    fn open_line(&self, format: &AudioFormat) -> Result<Box<dyn OutputLine>, PlaybackError>;
}

/// Scoped owner of an open line.
///
/// Dropping the guard without calling [`finish`](LineGuard::finish) stops
/// and closes the line, so errors and cancellation never leak a device.
pub struct LineGuard {
    line: Box<dyn OutputLine>,
    open: bool,
}

impl LineGuard {
    /// Opens a line for `format` from `provider`.
    pub fn open(provider: &dyn LineProvider, format: &AudioFormat) -> Result<Self, PlaybackError> {
        let line = provider.open_line(format)?;
        tracing::debug!(backend = provider.name(), %format, "Output line opened");
        Ok(Self { line, open: true })
    }

    /// Starts the line.
    pub fn start(&mut self) -> Result<(), PlaybackError> {
        self.line.start()
    }

    /// Writes raw sample bytes to the line.
    pub fn write(&mut self, data: &[u8]) -> Result<(), PlaybackError> {
        self.line.write(data)
    }

    /// Drains, stops and closes the line.
    ///
    /// The line is closed even if draining fails.
    pub fn finish(mut self) -> Result<(), PlaybackError> {
        let drained = self.line.drain();
        self.release();
        drained
    }

    /// Stops and closes the line without draining.
    pub fn abort(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.open {
            self.open = false;
            self.line.stop();
            self.line.close();
            tracing::debug!("Output line closed");
        }
    }
}

impl Drop for LineGuard {
    fn drop(&mut self) {
        self.release();
    }
}
