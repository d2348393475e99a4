//! The streaming playback engine.
//!
//! Audio moves from file to device through one transfer buffer:
//!
//! ```text
//! AudioInputStream ──read──► [buffer] ──write──► OutputLine
//!                    (repeat until a read returns 0, then drain)
//! ```
//!
//! Each write carries exactly the bytes the preceding read returned. The
//! cancellation token is checked before every read, and the line is closed
//! on every exit path through [`LineGuard`].

use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::clip::Clip;
use crate::handle::ProgressState;
use crate::line::{LineGuard, LineProvider};
use crate::looping::{self, LoopCount, PlaybackOutcome, PlaybackReport};
use crate::stream::AudioInputStream;
use crate::PlaybackError;

/// Plays sources through lines opened from one provider.
pub(crate) struct Engine<'a> {
    provider: &'a dyn LineProvider,
    buffer_size: usize,
    progress: &'a ProgressState,
}

impl<'a> Engine<'a> {
    pub fn new(
        provider: &'a dyn LineProvider,
        buffer_size: usize,
        progress: &'a ProgressState,
    ) -> Self {
        Self {
            provider,
            buffer_size,
            progress,
        }
    }

    /// Opens `path` and streams it through a freshly opened line.
    pub fn play_file(
        &self,
        path: &Path,
        token: &CancellationToken,
    ) -> Result<PlaybackOutcome, PlaybackError> {
        if token.is_cancelled() {
            return Ok(PlaybackOutcome::Cancelled);
        }

        let stream = AudioInputStream::open(path)?;
        self.play_stream(stream, token)
    }

    /// Streams `stream` to the end through a freshly opened line.
    pub fn play_stream(
        &self,
        mut stream: AudioInputStream,
        token: &CancellationToken,
    ) -> Result<PlaybackOutcome, PlaybackError> {
        if token.is_cancelled() {
            return Ok(PlaybackOutcome::Cancelled);
        }

        let format = *stream.format();
        let mut line = LineGuard::open(self.provider, &format)?;
        line.start()?;

        let mut buffer = vec![0u8; self.buffer_size.max(format.frame_size())];
        loop {
            if token.is_cancelled() {
                tracing::debug!(
                    path = %stream.path().display(),
                    bytes_read = stream.bytes_read(),
                    "Playback cancelled"
                );
                line.abort();
                return Ok(PlaybackOutcome::Cancelled);
            }

            let read = stream.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            line.write(&buffer[..read])?;
            self.progress.add_bytes(read);
        }

        line.finish()?;
        tracing::debug!(
            path = %stream.path().display(),
            bytes = stream.bytes_read(),
            "Stream played to end"
        );
        Ok(PlaybackOutcome::Completed)
    }

    /// Plays an in-memory clip `count` times on a single line.
    ///
    /// `on_iteration` runs after each completed pass.
    pub fn play_clip<F>(
        &self,
        clip: &Clip,
        count: LoopCount,
        token: &CancellationToken,
        mut on_iteration: F,
    ) -> Result<PlaybackReport, PlaybackError>
    where
        F: FnMut(u64),
    {
        if token.is_cancelled() || count == LoopCount::Times(0) {
            let outcome = if token.is_cancelled() {
                PlaybackOutcome::Cancelled
            } else {
                PlaybackOutcome::Completed
            };
            return Ok(PlaybackReport {
                iterations_completed: 0,
                outcome,
            });
        }

        let format = *clip.format();
        let frame_size = format.frame_size().max(1);
        let chunk_size = (self.buffer_size / frame_size).max(1) * frame_size;

        // An empty clip would spin an endless loop without ever blocking
        let count = if clip.is_empty() && count.is_forever() {
            LoopCount::Times(1)
        } else {
            count
        };

        let mut line = LineGuard::open(self.provider, &format)?;
        line.start()?;

        let report = looping::drive(count, token, |iteration| {
            for chunk in clip.data().chunks(chunk_size) {
                if token.is_cancelled() {
                    return Ok(PlaybackOutcome::Cancelled);
                }
                line.write(chunk)?;
                self.progress.add_bytes(chunk.len());
            }
            on_iteration(iteration);
            Ok(PlaybackOutcome::Completed)
        })?;

        if report.is_cancelled() {
            line.abort();
        } else {
            line.finish()?;
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::test_support::wav_bytes;
    use crate::line::{LineOp, MockBackend};
    use std::time::Duration;

    fn write_temp(bytes: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        std::fs::write(&path, bytes).unwrap();
        (dir, path)
    }

    fn play(
        backend: &MockBackend,
        buffer_size: usize,
        path: &Path,
        token: &CancellationToken,
    ) -> Result<PlaybackOutcome, PlaybackError> {
        let progress = ProgressState::new();
        let engine = Engine::new(backend, buffer_size, &progress);
        engine.play_file(path, token)
    }

    #[test]
    fn test_writes_exactly_what_was_read() {
        // 1000 bytes of 16-bit mono, 256-byte buffer: 256, 256, 256, 232
        let (_dir, path) = write_temp(&wav_bytes(8000, 1, 16, &[0u8; 1000]));
        let backend = MockBackend::new();

        let outcome = play(&backend, 256, &path, &CancellationToken::new()).unwrap();
        assert_eq!(outcome, PlaybackOutcome::Completed);

        let lines = backend.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0].ops,
            vec![
                LineOp::Start,
                LineOp::Write(256),
                LineOp::Write(256),
                LineOp::Write(256),
                LineOp::Write(232),
                LineOp::Drain,
                LineOp::Stop,
                LineOp::Close,
            ]
        );
    }

    #[test]
    fn test_odd_buffer_rounds_to_frames() {
        // Stereo 16-bit: 4-byte frames, so a 10-byte buffer moves 8 bytes
        let (_dir, path) = write_temp(&wav_bytes(8000, 2, 16, &[0u8; 20]));
        let backend = MockBackend::new();
        play(&backend, 10, &path, &CancellationToken::new()).unwrap();

        let line = &backend.lines()[0];
        assert_eq!(line.bytes_written(), 20);
        assert_eq!(line.write_count(), 3);
    }

    #[test]
    fn test_buffer_smaller_than_frame_still_plays() {
        let (_dir, path) = write_temp(&wav_bytes(8000, 2, 16, &[0u8; 8]));
        let backend = MockBackend::new();
        play(&backend, 1, &path, &CancellationToken::new()).unwrap();
        assert_eq!(backend.lines()[0].bytes_written(), 8);
    }

    #[test]
    fn test_empty_payload_opens_and_drains() {
        let (_dir, path) = write_temp(&wav_bytes(8000, 1, 16, &[]));
        let backend = MockBackend::new();
        play(&backend, 256, &path, &CancellationToken::new()).unwrap();

        let line = &backend.lines()[0];
        assert_eq!(line.write_count(), 0);
        assert!(line.was_drained());
        assert!(line.is_closed());
    }

    #[test]
    fn test_write_failure_closes_line() {
        let (_dir, path) = write_temp(&wav_bytes(8000, 1, 16, &[0u8; 1000]));
        let backend = MockBackend::new().with_write_failure_after(1);

        let err = play(&backend, 256, &path, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, PlaybackError::LineFailed { .. }));

        let line = &backend.lines()[0];
        assert_eq!(line.write_count(), 1);
        assert!(!line.was_drained());
        assert!(line.is_closed());
    }

    #[test]
    fn test_open_failure_propagates() {
        let (_dir, path) = write_temp(&wav_bytes(8000, 1, 16, &[0u8; 10]));
        let backend = MockBackend::new().with_open_failure("busy");
        let err = play(&backend, 256, &path, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, PlaybackError::LineUnavailable { .. }));
        assert_eq!(backend.lines_opened(), 0);
    }

    #[test]
    fn test_pre_cancelled_opens_nothing() {
        let (_dir, path) = write_temp(&wav_bytes(8000, 1, 16, &[0u8; 10]));
        let backend = MockBackend::new();
        let token = CancellationToken::new();
        token.cancel();

        let outcome = play(&backend, 256, &path, &token).unwrap();
        assert_eq!(outcome, PlaybackOutcome::Cancelled);
        assert_eq!(backend.lines_opened(), 0);
    }

    #[test]
    fn test_cancel_mid_stream_skips_drain() {
        // 2000 writes of 2 bytes at 5ms each would take 10s
        let (_dir, path) = write_temp(&wav_bytes(8000, 1, 16, &[0u8; 4000]));
        let backend = MockBackend::new().with_write_delay(Duration::from_millis(5));
        let token = CancellationToken::new();

        let canceller = {
            let token = token.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                token.cancel();
            })
        };

        let outcome = play(&backend, 2, &path, &token).unwrap();
        canceller.join().unwrap();

        assert_eq!(outcome, PlaybackOutcome::Cancelled);
        let line = &backend.lines()[0];
        assert!(line.write_count() < 2000);
        assert!(!line.was_drained());
        assert!(line.is_closed());
    }

    #[test]
    fn test_progress_counts_bytes() {
        let (_dir, path) = write_temp(&wav_bytes(8000, 1, 16, &[0u8; 600]));
        let backend = MockBackend::new();
        let progress = ProgressState::new();
        let engine = Engine::new(&backend, 256, &progress);
        engine.play_file(&path, &CancellationToken::new()).unwrap();
        assert_eq!(progress.snapshot().bytes_written, 600);
    }

    #[test]
    fn test_opened_stream_cancelled_before_line() {
        let (_dir, path) = write_temp(&wav_bytes(8000, 1, 16, &[0u8; 10]));
        let stream = AudioInputStream::open(&path).unwrap();
        let backend = MockBackend::new();
        let progress = ProgressState::new();
        let token = CancellationToken::new();
        token.cancel();

        let outcome = Engine::new(&backend, 256, &progress)
            .play_stream(stream, &token)
            .unwrap();
        assert_eq!(outcome, PlaybackOutcome::Cancelled);
        assert_eq!(backend.lines_opened(), 0);
    }

    #[test]
    fn test_clip_loops_on_one_line() {
        let (_dir, path) = write_temp(&wav_bytes(8000, 1, 16, &[0u8; 100]));
        let clip = Clip::load(&path).unwrap();
        let backend = MockBackend::new();
        let progress = ProgressState::new();
        let engine = Engine::new(&backend, 64, &progress);

        let mut passes = Vec::new();
        let report = engine
            .play_clip(&clip, LoopCount::Times(3), &CancellationToken::new(), |n| {
                passes.push(n);
            })
            .unwrap();

        assert_eq!(report.iterations_completed, 3);
        assert_eq!(passes, vec![1, 2, 3]);
        assert_eq!(backend.lines_opened(), 1);

        let line = &backend.lines()[0];
        assert_eq!(line.bytes_written(), 300);
        // 64 + 36 per pass
        assert_eq!(line.write_count(), 6);
        assert!(line.was_drained());
        assert!(line.is_closed());
    }

    #[test]
    fn test_clip_forever_until_cancelled() {
        let (_dir, path) = write_temp(&wav_bytes(8000, 1, 16, &[0u8; 32]));
        let clip = Clip::load(&path).unwrap();
        let backend = MockBackend::new();
        let progress = ProgressState::new();
        let engine = Engine::new(&backend, 1024, &progress);
        let token = CancellationToken::new();

        let report = engine
            .play_clip(&clip, LoopCount::Forever, &token, |n| {
                if n == 4 {
                    token.cancel();
                }
            })
            .unwrap();

        assert!(report.is_cancelled());
        assert_eq!(report.iterations_completed, 4);
        let line = &backend.lines()[0];
        assert!(!line.was_drained());
        assert!(line.is_closed());
    }

    #[test]
    fn test_empty_clip_forever_plays_once() {
        let (_dir, path) = write_temp(&wav_bytes(8000, 1, 16, &[]));
        let clip = Clip::load(&path).unwrap();
        let backend = MockBackend::new();
        let progress = ProgressState::new();
        let engine = Engine::new(&backend, 1024, &progress);

        let report = engine
            .play_clip(&clip, LoopCount::Forever, &CancellationToken::new(), |_| {})
            .unwrap();
        assert_eq!(report.iterations_completed, 1);
        assert_eq!(report.outcome, PlaybackOutcome::Completed);
    }
}
