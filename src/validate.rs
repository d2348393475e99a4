//! Format validation.
//!
//! A file is playable when it exists, is a regular file, and its content
//! (never its extension) identifies it as WAVE, AIFF or AU with a sample
//! encoding the output line can accept.

use std::path::Path;

use crate::format::{self, AudioFileFormat};
use crate::PlaybackError;

/// Returns `true` if `path` is a playable WAV, AIFF or AU file.
///
/// Never fails: any problem inspecting the file is logged and reported
/// as `false`. Use [`check_supported`] to learn why a file was rejected.
///
/// # Example
///
/// ```
/// assert!(!stream_sound::is_supported("/definitely/not/here.wav"));
/// ```
pub fn is_supported(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    match check_supported(path) {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unsupported audio file");
            false
        }
    }
}

/// Validates `path` and returns the format its header declares.
///
/// # Errors
///
/// - `FileNotFound` / `NotAFile` if the path is not a regular file
/// - `UnsupportedContainer` if the content is not WAV, AIFF or AU
/// - `UnsupportedFormat` / `MalformedHeader` if the header can't be played
pub fn check_supported(path: impl AsRef<Path>) -> Result<AudioFileFormat, PlaybackError> {
    format::read_header(path.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::test_support::{aiff_bytes, au_bytes, wav_bytes};
    use crate::format::Container;

    fn write_temp(name: &str, bytes: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        (dir, path)
    }

    #[test]
    fn test_accepts_all_three_containers() {
        let (_a, wav) = write_temp("a.wav", &wav_bytes(44100, 2, 16, &[0; 16]));
        let (_b, aiff) = write_temp("b.aiff", &aiff_bytes(22050, 1, 16, None, &[0; 8]));
        let (_c, au) = write_temp("c.au", &au_bytes(8000, 1, 1, &[0xFF; 8]));

        assert!(is_supported(&wav));
        assert!(is_supported(&aiff));
        assert!(is_supported(&au));

        assert_eq!(check_supported(&aiff).unwrap().container, Container::Aiff);
    }

    #[test]
    fn test_sniffs_content_not_extension() {
        // A WAV file with a misleading extension is still a WAV
        let (_a, misnamed) = write_temp("song.mp3", &wav_bytes(8000, 1, 8, &[0x80; 4]));
        assert!(is_supported(&misnamed));

        // A text file with an audio extension is not
        let (_b, fake) = write_temp("fake.wav", b"just some text, definitely no RIFF");
        assert!(!is_supported(&fake));
        assert!(matches!(
            check_supported(&fake),
            Err(PlaybackError::UnsupportedContainer { .. })
        ));
    }

    #[test]
    fn test_rejects_missing_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_supported(dir.path()));
        assert!(matches!(
            check_supported(dir.path()),
            Err(PlaybackError::NotAFile { .. })
        ));

        let missing = dir.path().join("missing.wav");
        assert!(!is_supported(&missing));
        assert!(matches!(
            check_supported(&missing),
            Err(PlaybackError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_rejects_oversized_aiff_sample_width() {
        // Widths near u16::MAX must be rejected, not overflow
        for bits in [65529u16, 65535] {
            let (_dir, path) = write_temp("wide.aiff", &aiff_bytes(8000, 1, bits, None, &[0; 16]));
            assert!(!is_supported(&path));
            assert!(check_supported(&path).unwrap_err().is_rejected_input());
        }
    }

    #[test]
    fn test_rejects_empty_file() {
        let (_dir, empty) = write_temp("empty.wav", &[]);
        assert!(!is_supported(&empty));
    }
}
