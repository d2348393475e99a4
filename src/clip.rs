//! Preloaded clips.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::format::{AudioFileFormat, AudioFormat};
use crate::stream::AudioInputStream;
use crate::PlaybackError;

/// An audio file whose whole sample payload is held in memory.
///
/// Loading costs one full read up front; after that the clip can be played
/// or looped any number of times without touching the file. Best for short
/// sounds played often. Cloning is cheap: clones share the payload.
///
/// # Example
///
/// ```ignore
/// let clip = Clip::load("click.wav")?;
/// println!("{} ms", clip.duration().as_millis());
/// player.play_clip(&clip, LoopCount::Times(2), &CancellationToken::new())?;
/// ```
#[derive(Clone)]
pub struct Clip {
    path: PathBuf,
    file_format: AudioFileFormat,
    data: Arc<[u8]>,
}

impl Clip {
    /// Validates `path` and reads its sample payload into memory.
    ///
    /// # Errors
    ///
    /// Returns the validation error for unsupported files, or `Io` if the
    /// payload can't be read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlaybackError> {
        let path = path.as_ref();
        let mut stream = AudioInputStream::open(path)?;
        let data = stream.read_to_end()?;
        let file_format = stream.file_format().clone();

        tracing::debug!(
            path = %path.display(),
            bytes = data.len(),
            "Clip loaded"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file_format,
            data: data.into(),
        })
    }

    /// Returns the path the clip was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the sample format of the clip.
    pub fn format(&self) -> &AudioFormat {
        &self.file_format.format
    }

    /// Returns everything the source file's header declared.
    pub fn file_format(&self) -> &AudioFileFormat {
        &self.file_format
    }

    /// Returns the exact playback length of one pass.
    pub fn duration(&self) -> Duration {
        self.file_format.format.duration_of(self.data.len() as u64)
    }

    /// Returns the payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the clip has no audio.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }
}

impl std::fmt::Debug for Clip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clip")
            .field("path", &self.path)
            .field("format", &self.file_format.format)
            .field("len", &self.data.len())
            .finish()
    }
}
