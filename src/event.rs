//! Playback lifecycle events.
//!
//! Events are notifications for logging, metrics or UI. They never change
//! the result of a playback; errors are still returned to the caller.

use std::path::PathBuf;
use std::sync::Arc;

use crate::format::AudioFormat;

/// Lifecycle events emitted by a [`Player`](crate::Player).
///
/// # Example
///
/// ```
/// use stream_sound::PlaybackEvent;
///
/// fn handle_event(event: PlaybackEvent) {
///     match event {
///         PlaybackEvent::Started { source, format } => {
///             eprintln!("Playing {} ({})", source.display(), format);
///         }
///         PlaybackEvent::IterationCompleted { source, iteration } => {
///             eprintln!("{} finished pass {}", source.display(), iteration);
///         }
///         PlaybackEvent::Finished { source, iterations } => {
///             eprintln!("{} done after {} plays", source.display(), iterations);
///         }
///         PlaybackEvent::Cancelled { source, iterations } => {
///             eprintln!("{} cancelled after {} plays", source.display(), iterations);
///         }
///         PlaybackEvent::Failed { source, error } => {
///             eprintln!("{} failed: {}", source.display(), error);
///         }
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// A validated source is about to be played.
    Started {
        /// File being played.
        source: PathBuf,
        /// Format the output line is opened with.
        format: AudioFormat,
    },

    /// One pass over the source finished playing.
    ///
    /// Emitted for every pass, including single plays.
    IterationCompleted {
        /// File being played.
        source: PathBuf,
        /// 1-based number of the pass that finished.
        iteration: u64,
    },

    /// Playback ran to the end.
    Finished {
        /// File that was played.
        source: PathBuf,
        /// Number of completed passes.
        iterations: u64,
    },

    /// Playback was stopped through its cancellation token.
    Cancelled {
        /// File that was playing.
        source: PathBuf,
        /// Number of passes that completed before cancellation.
        iterations: u64,
    },

    /// Playback failed. The same error is returned to the caller.
    Failed {
        /// File that was rejected or failed mid-play.
        source: PathBuf,
        /// Description of the error.
        error: String,
    },
}

/// Callback type for receiving playback events.
///
/// Register one via [`PlayerBuilder::on_event()`]. The callback runs on
/// the playback thread, so keep it short.
///
/// [`PlayerBuilder::on_event()`]: crate::PlayerBuilder::on_event
///
/// # Example
///
/// ```ignore
/// use stream_sound::Player;
///
/// let player = Player::builder()
///     .on_event(|event| {
///         tracing::info!(?event, "playback event");
///     })
///     .build()?;
/// ```
pub type EventCallback = Arc<dyn Fn(PlaybackEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// This is a convenience function for creating event callbacks without
/// manually wrapping in `Arc`.
///
/// # Example
///
/// ```
/// use stream_sound::{event_callback, PlaybackEvent};
///
/// let callback = event_callback(|event| {
///     println!("Got event: {:?}", event);
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(PlaybackEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}
