//! Playback duration estimates.

use std::path::Path;
use std::time::Duration;

use crate::format;
use crate::PlaybackError;

/// Returned by [`estimate_duration_ms`] when the file can't be inspected.
pub const UNKNOWN_DURATION_MS: f64 = -1.0;

/// Estimates how long `path` plays, in milliseconds.
///
/// The estimate is `file_len / sample_rate / (bits_per_sample / 8) /
/// channels * 1000`, where `file_len` is the size of the whole file
/// including its header. It therefore slightly overestimates; use
/// [`Clip::duration`](crate::Clip::duration) or
/// [`AudioFileFormat::duration`](crate::format::AudioFileFormat::duration)
/// for the exact payload length.
///
/// Returns [`UNKNOWN_DURATION_MS`] (negative) if the file is missing or not
/// a supported audio file. The failure is logged.
pub fn estimate_duration_ms(path: impl AsRef<Path>) -> f64 {
    let path = path.as_ref();
    match estimate_ms(path) {
        Ok(ms) => ms,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot estimate duration");
            UNKNOWN_DURATION_MS
        }
    }
}

/// Estimates how long `path` plays, using the same formula as
/// [`estimate_duration_ms`].
///
/// # Errors
///
/// Returns the header error if the file is missing or unsupported.
pub fn estimate_duration(path: impl AsRef<Path>) -> Result<Duration, PlaybackError> {
    let ms = estimate_ms(path.as_ref())?;
    Ok(Duration::from_secs_f64(ms / 1000.0))
}

fn estimate_ms(path: &Path) -> Result<f64, PlaybackError> {
    let file_format = format::read_header(path)?;
    let audio = &file_format.format;

    let bytes_per_sample = f64::from(audio.bits_per_sample) / 8.0;
    Ok(file_format.file_len as f64
        / f64::from(audio.sample_rate)
        / bytes_per_sample
        / f64::from(audio.channels)
        * 1000.0)
}
