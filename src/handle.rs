//! Handles to background playback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{PlaybackError, PlaybackReport};

/// Snapshot of how far a playback has progressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackProgress {
    /// Plays that ran to completion.
    pub iterations_completed: u64,
    /// Sample bytes written to output lines across all iterations.
    pub bytes_written: u64,
}

/// Counters shared between a playback and its handle.
#[derive(Debug, Default)]
pub(crate) struct ProgressState {
    iterations_completed: AtomicU64,
    bytes_written: AtomicU64,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bytes(&self, bytes: usize) {
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn complete_iteration(&self) {
        self.iterations_completed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> PlaybackProgress {
        PlaybackProgress {
            iterations_completed: self.iterations_completed.load(Ordering::SeqCst),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
        }
    }
}

/// Handle to playback running on Tokio's blocking worker pool.
///
/// Returned by [`Player::spawn_play`], [`Player::spawn_loop`] and
/// [`Player::spawn_clip`].
///
/// # Lifecycle
///
/// 1. Playback starts on a blocking worker as soon as the handle is created
/// 2. Call [`cancel()`](PlaybackHandle::cancel) to stop it early
/// 3. Call [`wait()`](PlaybackHandle::wait) to get the [`PlaybackReport`]
/// 4. Dropping the handle cancels playback unless it was
///    [detached](PlaybackHandle::detach)
///
/// Cancellation is observed before the next buffer is read, so a cancelled
/// playback stops within one buffer's worth of audio.
///
/// # Example
///
/// ```ignore
/// let handle = player.spawn_loop("ambience.wav", LoopCount::Forever)?;
///
/// tokio::time::sleep(Duration::from_secs(30)).await;
/// handle.cancel();
///
/// let report = handle.wait().await?;
/// assert!(report.is_cancelled());
/// ```
///
/// [`Player::spawn_play`]: crate::Player::spawn_play
/// [`Player::spawn_loop`]: crate::Player::spawn_loop
/// [`Player::spawn_clip`]: crate::Player::spawn_clip
pub struct PlaybackHandle {
    token: CancellationToken,
    progress: Arc<ProgressState>,
    task: Option<JoinHandle<Result<PlaybackReport, PlaybackError>>>,
    detached: bool,
}

impl PlaybackHandle {
    pub(crate) fn new(
        token: CancellationToken,
        progress: Arc<ProgressState>,
        task: JoinHandle<Result<PlaybackReport, PlaybackError>>,
    ) -> Self {
        Self {
            token,
            progress,
            task: Some(task),
            detached: false,
        }
    }

    /// Requests that playback stop. Returns immediately.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns `true` if the playback task has finished.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Returns current playback progress.
    pub fn progress(&self) -> PlaybackProgress {
        self.progress.snapshot()
    }

    /// Lets playback run to the end without this handle.
    ///
    /// Returns the token, which can still stop the playback.
    pub fn detach(mut self) -> CancellationToken {
        self.detached = true;
        self.token.clone()
    }

    /// Waits for playback to end.
    ///
    /// # Errors
    ///
    /// Returns the playback's error, or `TaskFailed` if the task panicked.
    pub async fn wait(mut self) -> Result<PlaybackReport, PlaybackError> {
        let Some(task) = self.task.take() else {
            return Err(PlaybackError::TaskFailed("playback already awaited".to_string()));
        };

        match task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Playback task failed: {}", e);
                Err(PlaybackError::TaskFailed(e.to_string()))
            }
        }
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        if !self.detached && !self.is_finished() {
            // Handle dropped while playing - stop the worker at its next check
            tracing::debug!("Playback handle dropped, cancelling");
            self.token.cancel();
        }
    }
}

impl std::fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("cancelled", &self.is_cancelled())
            .field("finished", &self.is_finished())
            .field("progress", &self.progress())
            .finish_non_exhaustive()
    }
}
