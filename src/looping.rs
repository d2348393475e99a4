//! Loop counts, playback outcomes and the looping driver.

use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::PlaybackError;

/// How many times to play a source.
///
/// `LoopCount::from(0)` means [`LoopCount::Forever`]; any other number
/// means exactly that many plays.
///
/// # Example
///
/// ```
/// use stream_sound::LoopCount;
///
/// assert_eq!(LoopCount::from(3), LoopCount::Times(3));
/// assert_eq!(LoopCount::from(0), LoopCount::Forever);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopCount {
    /// Play exactly this many times. `Times(0)` plays nothing.
    Times(u32),
    /// Play until cancelled.
    Forever,
}

impl LoopCount {
    /// Returns `true` for [`LoopCount::Forever`].
    pub fn is_forever(self) -> bool {
        matches!(self, Self::Forever)
    }

    /// Returns `true` if another iteration follows `completed` finished ones.
    pub(crate) fn permits(self, completed: u64) -> bool {
        match self {
            Self::Times(n) => completed < u64::from(n),
            Self::Forever => true,
        }
    }
}

impl From<u32> for LoopCount {
    fn from(count: u32) -> Self {
        if count == 0 {
            Self::Forever
        } else {
            Self::Times(count)
        }
    }
}

impl fmt::Display for LoopCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Times(n) => write!(f, "{n}x"),
            Self::Forever => f.write_str("forever"),
        }
    }
}

/// How a playback ended when it didn't fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackOutcome {
    /// All audio was written and has finished playing.
    Completed,
    /// Playback was stopped through its cancellation token.
    Cancelled,
}

/// Summary of a finished playback or loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackReport {
    /// Number of plays that ran to completion.
    pub iterations_completed: u64,
    /// Whether the loop ran out or was cancelled.
    pub outcome: PlaybackOutcome,
}

impl PlaybackReport {
    /// Returns `true` if playback was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.outcome == PlaybackOutcome::Cancelled
    }
}

/// Runs `iteration` sequentially as many times as `count` allows.
///
/// The token is checked before every iteration. The closure receives the
/// 1-based number of the iteration it runs. The first error ends the loop.
pub(crate) fn drive<F>(
    count: LoopCount,
    token: &CancellationToken,
    mut iteration: F,
) -> Result<PlaybackReport, PlaybackError>
where
    F: FnMut(u64) -> Result<PlaybackOutcome, PlaybackError>,
{
    let mut completed = 0;
    while count.permits(completed) {
        if token.is_cancelled() {
            return Ok(PlaybackReport {
                iterations_completed: completed,
                outcome: PlaybackOutcome::Cancelled,
            });
        }

        match iteration(completed + 1)? {
            PlaybackOutcome::Completed => completed += 1,
            PlaybackOutcome::Cancelled => {
                return Ok(PlaybackReport {
                    iterations_completed: completed,
                    outcome: PlaybackOutcome::Cancelled,
                });
            }
        }
    }

    Ok(PlaybackReport {
        iterations_completed: completed,
        outcome: PlaybackOutcome::Completed,
    })
}
