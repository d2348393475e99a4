//! Alert tone.
//!
//! The beep is generated in memory and played through a regular output
//! line on a background thread. If that fails for any reason, the ASCII
//! bell character is written to stderr so the terminal can sound its own
//! bell.

use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::format::{encode_i16_le, f32_to_i16, AudioFormat};
use crate::line::{LineGuard, LineProvider};
use crate::PlaybackError;

/// Pitch of the beep.
const BEEP_FREQUENCY_HZ: f64 = 880.0;

/// Length of the beep.
const BEEP_DURATION_MS: u64 = 120;

/// Sample rate of the generated tone.
const BEEP_SAMPLE_RATE: u32 = 44100;

/// Fade in/out length, avoids clicks at the edges.
const FADE_MS: u64 = 5;

/// Peak amplitude relative to full scale.
const AMPLITUDE: f64 = 0.5;

/// Format of the generated tone: 16-bit signed little-endian mono.
pub(crate) fn beep_format() -> AudioFormat {
    AudioFormat::pcm_i16_le(BEEP_SAMPLE_RATE, 1)
}

/// Generates a sine tone as 16-bit little-endian mono bytes.
pub(crate) fn tone_bytes(frequency: f64, duration_ms: u64, sample_rate: u32) -> Vec<u8> {
    let num_frames = (u64::from(sample_rate) * duration_ms / 1000) as usize;
    let fade_frames = ((u64::from(sample_rate) * FADE_MS / 1000) as usize).min(num_frames / 2);
    let rate = f64::from(sample_rate);

    let samples: Vec<i16> = (0..num_frames)
        .map(|i| {
            let t = i as f64 / rate;
            let envelope = if fade_frames == 0 {
                1.0
            } else {
                let edge = i.min(num_frames - 1 - i);
                (edge as f64 / fade_frames as f64).min(1.0)
            };
            let value = (2.0 * std::f64::consts::PI * frequency * t).sin() * AMPLITUDE * envelope;
            f32_to_i16(value as f32)
        })
        .collect();

    encode_i16_le(&samples)
}

/// Plays the beep tone through a line from `provider`.
pub(crate) fn play_tone(provider: &dyn LineProvider) -> Result<(), PlaybackError> {
    let bytes = tone_bytes(BEEP_FREQUENCY_HZ, BEEP_DURATION_MS, BEEP_SAMPLE_RATE);
    let mut line = LineGuard::open(provider, &beep_format())?;
    line.start()?;
    line.write(&bytes)?;
    line.finish()
}

/// Sounds a beep through `provider`, falling back to the terminal bell.
///
/// Never fails and never panics.
pub(crate) fn beep_with(provider: &dyn LineProvider) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| play_tone(provider)));
    match result {
        Ok(Ok(())) => tracing::debug!("Beep played"),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Beep failed, using terminal bell");
            terminal_bell();
        }
        Err(_) => {
            tracing::warn!("Beep panicked, using terminal bell");
            terminal_bell();
        }
    }
}

/// Sounds a beep on a background thread and returns at once.
///
/// Returns `None` if the thread couldn't be spawned; the terminal bell has
/// rung instead.
pub(crate) fn beep_detached(provider: Arc<dyn LineProvider>) -> Option<JoinHandle<()>> {
    let spawned = std::thread::Builder::new()
        .name("stream-sound-beep".to_string())
        .spawn(move || beep_with(provider.as_ref()));
    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to spawn beep thread, using terminal bell");
            terminal_bell();
            None
        }
    }
}

fn terminal_bell() {
    let mut stderr = std::io::stderr();
    if let Err(e) = stderr.write_all(b"\x07").and_then(|()| stderr.flush()) {
        tracing::debug!("Failed to write terminal bell: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::i16_to_f32;
    use crate::line::{LineOp, MockBackend};
    use std::time::{Duration, Instant};

    #[test]
    fn test_tone_length() {
        let bytes = tone_bytes(880.0, 120, 44100);
        // 5292 frames * 2 bytes
        assert_eq!(bytes.len(), 10_584);
    }

    #[test]
    fn test_tone_fades_at_edges() {
        let bytes = tone_bytes(880.0, 120, 44100);
        let first = i16::from_le_bytes([bytes[0], bytes[1]]);
        let last = i16::from_le_bytes([bytes[bytes.len() - 2], bytes[bytes.len() - 1]]);
        assert_eq!(first, 0);
        assert_eq!(last, 0);
    }

    #[test]
    fn test_tone_stays_below_full_scale() {
        let bytes = tone_bytes(880.0, 120, 44100);
        let peak = bytes
            .chunks_exact(2)
            .map(|b| i16_to_f32(i16::from_le_bytes([b[0], b[1]])).abs())
            .fold(0.0f32, f32::max);
        assert!(peak > 0.4 && peak <= 0.51, "peak {peak}");
    }

    #[test]
    fn test_beep_plays_one_line() {
        let backend = MockBackend::new();
        beep_with(&backend);

        let lines = backend.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].format, beep_format());
        assert_eq!(
            lines[0].ops,
            vec![
                LineOp::Start,
                LineOp::Write(10_584),
                LineOp::Drain,
                LineOp::Stop,
                LineOp::Close
            ]
        );
    }

    #[test]
    fn test_beep_survives_open_failure() {
        let backend = MockBackend::new().with_open_failure("no device");
        beep_with(&backend);
        assert_eq!(backend.lines_opened(), 0);
    }

    #[test]
    fn test_beep_survives_write_failure() {
        let backend = MockBackend::new().with_write_failure_after(0);
        beep_with(&backend);
        assert!(backend.lines()[0].is_closed());
    }

    #[test]
    fn test_detached_beep_returns_before_the_tone_ends() {
        let backend = MockBackend::new().with_write_delay(Duration::from_millis(400));
        let started = Instant::now();
        let handle = beep_detached(Arc::new(backend.clone())).unwrap();
        assert!(started.elapsed() < Duration::from_millis(400));

        handle.join().unwrap();
        let lines = backend.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].was_drained());
        assert!(lines[0].is_closed());
    }
}
