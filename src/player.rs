//! The player facade and the default-player free functions.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

use crate::beep::{beep_detached, beep_with};
use crate::builder::PlayerBuilder;
use crate::clip::Clip;
use crate::engine::Engine;
use crate::format::AudioFileFormat;
use crate::handle::{PlaybackHandle, ProgressState};
use crate::line::{CpalBackend, LineProvider};
use crate::looping::{self, LoopCount, PlaybackOutcome, PlaybackReport};
use crate::stream::AudioInputStream;
use crate::{EventCallback, PlaybackConfig, PlaybackError, PlaybackEvent};

/// Plays WAV, AIFF and AU files through an output backend.
///
/// Blocking methods (`play*`) run on the calling thread until playback
/// ends. `spawn_*` methods run the same work on Tokio's blocking worker
/// pool and return a [`PlaybackHandle`].
///
/// Every playback opens its own line and transfer buffer, so a `Player`
/// can be shared and cloned freely. Two simultaneous playbacks may contend
/// for the device; the second may fail with `LineUnavailable`.
///
/// # Example
///
/// ```ignore
/// use stream_sound::{LoopCount, Player};
///
/// let player = Player::builder().build()?;
/// player.play("chime.wav")?;
///
/// let handle = player.spawn_loop("rain.aiff", LoopCount::Forever)?;
/// // ...
/// handle.cancel();
/// ```
#[derive(Clone)]
pub struct Player {
    backend: Arc<dyn LineProvider>,
    config: PlaybackConfig,
    event_callback: Option<EventCallback>,
}

impl Player {
    /// Creates a new builder for configuring a player.
    pub fn builder() -> PlayerBuilder {
        PlayerBuilder::new()
    }

    pub(crate) fn new(
        backend: Arc<dyn LineProvider>,
        config: PlaybackConfig,
        event_callback: Option<EventCallback>,
    ) -> Self {
        Self {
            backend,
            config,
            event_callback,
        }
    }

    /// Returns the player's configuration.
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Returns the name of the output backend.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Plays `path` once, blocking until the audio has finished playing.
    ///
    /// The file is validated first; a rejected file opens no line.
    ///
    /// # Errors
    ///
    /// Returns the validation error for unsupported files, or the line or
    /// I/O error that ended playback. The error is also logged.
    pub fn play(&self, path: impl AsRef<Path>) -> Result<PlaybackOutcome, PlaybackError> {
        self.play_with_cancel(path, &CancellationToken::new())
    }

    /// Plays `path` once, stopping early if `token` is cancelled.
    ///
    /// # Errors
    ///
    /// Same as [`play`](Player::play).
    pub fn play_with_cancel(
        &self,
        path: impl AsRef<Path>,
        token: &CancellationToken,
    ) -> Result<PlaybackOutcome, PlaybackError> {
        let report = self.run_play(path.as_ref(), token, &ProgressState::new())?;
        Ok(report.outcome)
    }

    /// Plays `path` `count` times in sequence, each pass on a new line.
    ///
    /// `count` may be a [`LoopCount`] or a `u32`, where `0` means forever.
    /// A forever loop only ends when `token` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns the first error; later passes are not attempted.
    pub fn play_loop(
        &self,
        path: impl AsRef<Path>,
        count: impl Into<LoopCount>,
        token: &CancellationToken,
    ) -> Result<PlaybackReport, PlaybackError> {
        self.run_loop(path.as_ref(), count.into(), token, &ProgressState::new())
    }

    /// Plays `path` once on the blocking worker pool.
    ///
    /// # Errors
    ///
    /// Returns `TaskFailed` if called outside a Tokio runtime. Playback
    /// errors are reported by [`PlaybackHandle::wait`].
    pub fn spawn_play(&self, path: impl AsRef<Path>) -> Result<PlaybackHandle, PlaybackError> {
        let path = path.as_ref().to_path_buf();
        self.spawn(move |player, token, progress| player.run_play(&path, token, progress))
    }

    /// Loops `path` on the blocking worker pool.
    ///
    /// # Errors
    ///
    /// Returns `TaskFailed` if called outside a Tokio runtime.
    pub fn spawn_loop(
        &self,
        path: impl AsRef<Path>,
        count: impl Into<LoopCount>,
    ) -> Result<PlaybackHandle, PlaybackError> {
        let path = path.as_ref().to_path_buf();
        let count = count.into();
        self.spawn(move |player, token, progress| player.run_loop(&path, count, token, progress))
    }

    /// Loads `path` into memory for repeated playback.
    ///
    /// # Errors
    ///
    /// Returns the validation or I/O error. The error is also logged.
    pub fn load_clip(&self, path: impl AsRef<Path>) -> Result<Clip, PlaybackError> {
        let path = path.as_ref();
        Clip::load(path).inspect_err(|e| self.report_failure(path, e))
    }

    /// Plays a preloaded clip `count` times on a single line.
    ///
    /// # Errors
    ///
    /// Returns the line error that ended playback.
    pub fn play_clip(
        &self,
        clip: &Clip,
        count: impl Into<LoopCount>,
        token: &CancellationToken,
    ) -> Result<PlaybackReport, PlaybackError> {
        self.run_clip(clip, count.into(), token, &ProgressState::new())
    }

    /// Plays a preloaded clip on the blocking worker pool.
    ///
    /// # Errors
    ///
    /// Returns `TaskFailed` if called outside a Tokio runtime.
    pub fn spawn_clip(
        &self,
        clip: Clip,
        count: impl Into<LoopCount>,
    ) -> Result<PlaybackHandle, PlaybackError> {
        let count = count.into();
        self.spawn(move |player, token, progress| player.run_clip(&clip, count, token, progress))
    }

    /// Sounds a short alert tone without waiting for it. Never fails.
    ///
    /// The tone plays on its own thread. Falls back to the terminal bell if
    /// no line can be opened.
    pub fn beep(&self) {
        beep_detached(Arc::clone(&self.backend));
    }

    /// Sounds the alert tone and returns once it has played. Never fails.
    pub fn beep_blocking(&self) {
        beep_with(self.backend.as_ref());
    }

    fn spawn<F>(&self, run: F) -> Result<PlaybackHandle, PlaybackError>
    where
        F: FnOnce(&Player, &CancellationToken, &ProgressState) -> Result<PlaybackReport, PlaybackError>
            + Send
            + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| PlaybackError::TaskFailed(format!("no Tokio runtime: {e}")))?;

        let token = CancellationToken::new();
        let progress = Arc::new(ProgressState::new());

        let player = self.clone();
        let task_token = token.clone();
        let task_progress = Arc::clone(&progress);
        let task = runtime.spawn_blocking(move || run(&player, &task_token, task_progress.as_ref()));

        Ok(PlaybackHandle::new(token, progress, task))
    }

    fn engine<'a>(&'a self, progress: &'a ProgressState) -> Engine<'a> {
        Engine::new(self.backend.as_ref(), self.config.buffer_size, progress)
    }

    fn run_play(
        &self,
        path: &Path,
        token: &CancellationToken,
        progress: &ProgressState,
    ) -> Result<PlaybackReport, PlaybackError> {
        let result = AudioInputStream::open(path).and_then(|stream| {
            self.started(path, stream.file_format());
            let outcome = self.engine(progress).play_stream(stream, token)?;
            let mut iterations = 0;
            if outcome == PlaybackOutcome::Completed {
                iterations = 1;
                self.iteration_completed(path, 1, progress);
            }
            Ok(PlaybackReport {
                iterations_completed: iterations,
                outcome,
            })
        });
        self.conclude(path, result)
    }

    fn run_loop(
        &self,
        path: &Path,
        count: LoopCount,
        token: &CancellationToken,
        progress: &ProgressState,
    ) -> Result<PlaybackReport, PlaybackError> {
        let result = AudioInputStream::open(path).and_then(|stream| {
            tracing::info!(path = %path.display(), %count, "Looping playback");
            self.started(path, stream.file_format());

            let engine = self.engine(progress);
            let mut first = Some(stream);
            looping::drive(count, token, |iteration| {
                // Later passes reopen the file, which re-validates it
                let outcome = match first.take() {
                    Some(stream) => engine.play_stream(stream, token)?,
                    None => engine.play_file(path, token)?,
                };
                if outcome == PlaybackOutcome::Completed {
                    self.iteration_completed(path, iteration, progress);
                }
                Ok(outcome)
            })
        });
        self.conclude(path, result)
    }

    fn run_clip(
        &self,
        clip: &Clip,
        count: LoopCount,
        token: &CancellationToken,
        progress: &ProgressState,
    ) -> Result<PlaybackReport, PlaybackError> {
        let path = clip.path();
        self.started(path, clip.file_format());
        let result = self
            .engine(progress)
            .play_clip(clip, count, token, |iteration| {
                self.iteration_completed(path, iteration, progress);
            });
        self.conclude(path, result)
    }

    fn started(&self, path: &Path, file_format: &AudioFileFormat) {
        tracing::info!(
            path = %path.display(),
            container = %file_format.container,
            format = %file_format.format,
            "Playback started"
        );
        self.emit(PlaybackEvent::Started {
            source: path.to_path_buf(),
            format: file_format.format,
        });
    }

    fn iteration_completed(&self, path: &Path, iteration: u64, progress: &ProgressState) {
        progress.complete_iteration();
        tracing::debug!(path = %path.display(), iteration, "Pass completed");
        self.emit(PlaybackEvent::IterationCompleted {
            source: path.to_path_buf(),
            iteration,
        });
    }

    /// Logs the end of a playback and emits its final event.
    fn conclude(
        &self,
        path: &Path,
        result: Result<PlaybackReport, PlaybackError>,
    ) -> Result<PlaybackReport, PlaybackError> {
        match &result {
            Ok(report) => {
                let source = path.to_path_buf();
                let iterations = report.iterations_completed;
                match report.outcome {
                    PlaybackOutcome::Completed => {
                        tracing::info!(path = %path.display(), iterations, "Playback finished");
                        self.emit(PlaybackEvent::Finished { source, iterations });
                    }
                    PlaybackOutcome::Cancelled => {
                        tracing::info!(path = %path.display(), iterations, "Playback cancelled");
                        self.emit(PlaybackEvent::Cancelled { source, iterations });
                    }
                }
            }
            Err(e) => self.report_failure(path, e),
        }
        result
    }

    fn report_failure(&self, path: &Path, error: &PlaybackError) {
        if error.is_rejected_input() {
            tracing::warn!(path = %path.display(), %error, "Rejected audio file");
        } else {
            tracing::warn!(path = %path.display(), %error, "Playback failed");
        }
        self.emit(PlaybackEvent::Failed {
            source: PathBuf::from(path),
            error: error.to_string(),
        });
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(callback) = &self.event_callback {
            callback(event);
        }
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .field("has_event_callback", &self.event_callback.is_some())
            .finish()
    }
}

/// The player behind the free functions: default config, default device.
fn default_player() -> &'static Player {
    static DEFAULT: OnceLock<Player> = OnceLock::new();
    DEFAULT.get_or_init(|| {
        let config = PlaybackConfig::default();
        let backend = CpalBackend::new(config.output_device.clone(), config.line_buffer);
        Player::new(Arc::new(backend), config, None)
    })
}

/// Plays `path` once on the default output device, blocking until done.
///
/// # Errors
///
/// See [`Player::play`].
pub fn play(path: impl AsRef<Path>) -> Result<PlaybackOutcome, PlaybackError> {
    default_player().play(path)
}

/// Plays `path` `count` times on the default output device; `0` loops
/// forever.
///
/// A forever loop started here cannot be stopped; use
/// [`Player::spawn_loop`] for a cancellable loop.
///
/// # Errors
///
/// See [`Player::play_loop`].
pub fn play_loop(path: impl AsRef<Path>, count: u32) -> Result<PlaybackReport, PlaybackError> {
    default_player().play_loop(path, count, &CancellationToken::new())
}

/// Sounds a short alert tone on the default output device. Never fails.
///
/// Returns without waiting for the tone. A process that exits right away
/// may cut it short; use [`Player::beep_blocking`] to wait.
pub fn beep() {
    default_player().beep();
}
