//! Mock output backend for testing without hardware.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{LineProvider, OutputLine};
use crate::format::AudioFormat;
use crate::PlaybackError;

/// An operation performed on a mock line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOp {
    /// `start()` was called.
    Start,
    /// `write()` was called with this many bytes.
    Write(usize),
    /// `drain()` was called.
    Drain,
    /// `stop()` was called.
    Stop,
    /// `close()` was called.
    Close,
}

/// Snapshot of everything that happened to one mock line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockLineRecord {
    /// Format the line was opened with.
    pub format: AudioFormat,
    /// Operations in call order.
    pub ops: Vec<LineOp>,
}

impl MockLineRecord {
    /// Total bytes accepted by successful writes.
    pub fn bytes_written(&self) -> usize {
        self.ops
            .iter()
            .map(|op| match op {
                LineOp::Write(n) => *n,
                _ => 0,
            })
            .sum()
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, LineOp::Write(_)))
            .count()
    }

    /// Returns `true` if the line was drained.
    pub fn was_drained(&self) -> bool {
        self.ops.contains(&LineOp::Drain)
    }

    /// Returns `true` if the line was closed.
    pub fn is_closed(&self) -> bool {
        self.ops.contains(&LineOp::Close)
    }
}

#[derive(Default)]
struct MockState {
    lines_opened: AtomicUsize,
    lines: Mutex<Vec<Arc<Mutex<MockLineRecord>>>>,
    open_failure: Mutex<Option<String>>,
    write_failure_after: Mutex<Option<usize>>,
    write_delay: Mutex<Option<Duration>>,
}

/// A line provider that records operations instead of playing audio.
///
/// This allows testing playback without actual audio hardware, making it
/// suitable for CI environments. Clones share the same recording.
///
/// # Example
///
/// ```
/// use stream_sound::line::{LineOp, LineProvider, MockBackend};
/// use stream_sound::format::AudioFormat;
///
/// let backend = MockBackend::new();
/// let mut line = backend.open_line(&AudioFormat::pcm_i16_le(8000, 1)).unwrap();
/// line.start().unwrap();
/// line.write(&[0, 0, 0, 0]).unwrap();
/// line.close();
///
/// let record = &backend.lines()[0];
/// assert_eq!(record.bytes_written(), 4);
/// assert!(record.is_closed());
/// ```
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<MockState>,
}

impl MockBackend {
    /// Creates a backend whose lines accept everything instantly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `open_line` call fail with `LineUnavailable`.
    pub fn with_open_failure(self, reason: impl Into<String>) -> Self {
        self.set_open_failure(Some(reason.into()));
        self
    }

    /// Makes each line fail on the write after `writes` successful writes.
    pub fn with_write_failure_after(self, writes: usize) -> Self {
        *self.state.write_failure_after.lock() = Some(writes);
        self
    }

    /// Makes every write block for `delay`, simulating real-time playback.
    pub fn with_write_delay(self, delay: Duration) -> Self {
        *self.state.write_delay.lock() = Some(delay);
        self
    }

    /// Changes the open failure at runtime. `None` lets lines open again.
    pub fn set_open_failure(&self, reason: Option<String>) {
        *self.state.open_failure.lock() = reason;
    }

    /// Number of lines successfully opened so far.
    pub fn lines_opened(&self) -> usize {
        self.state.lines_opened.load(Ordering::SeqCst)
    }

    /// Snapshots of all opened lines, in open order.
    pub fn lines(&self) -> Vec<MockLineRecord> {
        self.state
            .lines
            .lock()
            .iter()
            .map(|record| record.lock().clone())
            .collect()
    }
}

impl LineProvider for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn open_line(&self, format: &AudioFormat) -> Result<Box<dyn OutputLine>, PlaybackError> {
        if let Some(reason) = self.state.open_failure.lock().clone() {
            return Err(PlaybackError::line_unavailable(reason));
        }

        let record = Arc::new(Mutex::new(MockLineRecord {
            format: *format,
            ops: Vec::new(),
        }));
        self.state.lines.lock().push(Arc::clone(&record));
        self.state.lines_opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MockLine {
            format: *format,
            record,
            writes: 0,
            fail_after: *self.state.write_failure_after.lock(),
            delay: *self.state.write_delay.lock(),
            closed: false,
        }))
    }
}

struct MockLine {
    format: AudioFormat,
    record: Arc<Mutex<MockLineRecord>>,
    writes: usize,
    fail_after: Option<usize>,
    delay: Option<Duration>,
    closed: bool,
}

impl MockLine {
    fn push(&self, op: LineOp) {
        self.record.lock().ops.push(op);
    }
}

impl OutputLine for MockLine {
    fn format(&self) -> &AudioFormat {
        &self.format
    }

    fn start(&mut self) -> Result<(), PlaybackError> {
        self.push(LineOp::Start);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), PlaybackError> {
        if self.closed {
            return Err(PlaybackError::line_failed("write after close"));
        }
        if data.len() % self.format.frame_size().max(1) != 0 {
            return Err(PlaybackError::line_failed(format!(
                "write of {} bytes is not frame aligned",
                data.len()
            )));
        }
        if self.fail_after.is_some_and(|limit| self.writes >= limit) {
            return Err(PlaybackError::line_failed("injected write failure"));
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.writes += 1;
        self.push(LineOp::Write(data.len()));
        Ok(())
    }

    fn drain(&mut self) -> Result<(), PlaybackError> {
        self.push(LineOp::Drain);
        Ok(())
    }

    fn stop(&mut self) {
        self.push(LineOp::Stop);
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.push(LineOp::Close);
        }
    }
}
