//! Builder pattern for [`Player`].

use std::sync::Arc;
use std::time::Duration;

use crate::line::{CpalBackend, LineProvider};
use crate::{event_callback, EventCallback, PlaybackConfig, PlaybackError, PlaybackEvent, Player};

/// Builder for configuring a [`Player`].
///
/// Use [`Player::builder()`] to create a new builder.
///
/// # Example
///
/// ```
/// use stream_sound::line::MockBackend;
/// use stream_sound::Player;
///
/// let player = Player::builder()
///     .buffer_size(64 * 1024)
///     .backend(MockBackend::new())
///     .on_event(|event| tracing::info!(?event, "playback event"))
///     .build()
///     .unwrap();
/// assert_eq!(player.config().buffer_size, 65_536);
/// ```
#[must_use]
pub struct PlayerBuilder {
    /// Playback configuration.
    config: PlaybackConfig,
    /// Output backend; CPAL when unset.
    backend: Option<Arc<dyn LineProvider>>,
    /// Event callback.
    event_callback: Option<EventCallback>,
}

impl Default for PlayerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: PlaybackConfig::default(),
            backend: None,
            event_callback: None,
        }
    }

    /// Set the transfer buffer size in bytes.
    ///
    /// Default: 512 KiB
    pub fn buffer_size(mut self, bytes: usize) -> Self {
        self.config.buffer_size = bytes;
        self
    }

    /// Set how much audio the CPAL line queues ahead of the device.
    ///
    /// Default: 500ms
    pub fn line_buffer(mut self, duration: Duration) -> Self {
        self.config.line_buffer = duration;
        self
    }

    /// Play through the named output device instead of the system default.
    ///
    /// See [`list_output_devices()`](crate::line::list_output_devices).
    pub fn output_device(mut self, name: impl Into<String>) -> Self {
        self.config.output_device = Some(name.into());
        self
    }

    /// Use a custom output backend, e.g. [`MockBackend`](crate::line::MockBackend).
    ///
    /// `output_device` and `line_buffer` only apply to the CPAL backend.
    pub fn backend<P: LineProvider + 'static>(mut self, backend: P) -> Self {
        self.backend = Some(Arc::new(backend));
        self
    }

    /// Set a callback to receive playback events.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(PlaybackEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(event_callback(callback));
        self
    }

    /// Set custom playback configuration.
    pub fn with_config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the player.
    ///
    /// No device is opened here; lines are opened per playback.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the buffer size or line buffer is zero.
    pub fn build(self) -> Result<Player, PlaybackError> {
        self.config.validate()?;

        let backend: Arc<dyn LineProvider> = match self.backend {
            Some(backend) => {
                if self.config.output_device.is_some() {
                    tracing::debug!("output_device ignored with a custom backend");
                }
                backend
            }
            None => Arc::new(CpalBackend::new(
                self.config.output_device.clone(),
                self.config.line_buffer,
            )),
        };

        tracing::debug!(
            backend = backend.name(),
            buffer_size = self.config.buffer_size,
            "Player built"
        );

        Ok(Player::new(backend, self.config, self.event_callback))
    }
}
