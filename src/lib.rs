//! # stream-sound
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Streaming and preloaded playback of WAV, AIFF and AU audio files.
//!
//! `stream-sound` plays uncompressed audio files through the system output
//! device via CPAL. Files are identified by content, streamed through a
//! fixed 512 KiB transfer buffer, and can be looped a fixed number of times
//! or until cancelled.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stream_sound::{LoopCount, Player};
//!
//! // One-shot playback on the default device
//! stream_sound::play("chime.wav")?;
//!
//! // Background loop, stopped from elsewhere
//! let player = Player::builder()
//!     .on_event(|e| tracing::info!(?e, "playback event"))
//!     .build()?;
//! let handle = player.spawn_loop("rain.aiff", LoopCount::Forever)?;
//!
//! tokio::time::sleep(std::time::Duration::from_secs(60)).await;
//! handle.cancel();
//! let report = handle.wait().await?;
//! println!("played {} times", report.iterations_completed);
//! ```
//!
//! ## Architecture
//!
//! Playback keeps a strict thread boundary:
//!
//! - **Playback thread**: reads the file and writes each buffer to the line,
//!   blocking while the line is full
//! - **Ring Buffer**: lock-free SPSC queue between the line and the device
//! - **CPAL Thread**: high-priority audio callback that never blocks
//!
//! Background playback runs on Tokio's blocking worker pool and is stopped
//! through a [`CancellationToken`], checked before every buffer read.

#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod beep;
mod builder;
mod clip;
mod config;
mod duration;
mod engine;
mod error;
mod event;
pub mod format;
mod handle;
pub mod line;
mod looping;
mod player;
mod stream;
mod validate;

pub use builder::PlayerBuilder;
pub use clip::Clip;
pub use config::{PlaybackConfig, DEFAULT_BUFFER_SIZE};
pub use duration::{estimate_duration, estimate_duration_ms, UNKNOWN_DURATION_MS};
pub use error::PlaybackError;
pub use event::{event_callback, EventCallback, PlaybackEvent};
pub use handle::{PlaybackHandle, PlaybackProgress};
pub use line::{default_output_device_name, list_output_devices};
pub use looping::{LoopCount, PlaybackOutcome, PlaybackReport};
pub use player::{beep, play, play_loop, Player};
pub use stream::AudioInputStream;
pub use validate::{check_supported, is_supported};

pub use tokio_util::sync::CancellationToken;
