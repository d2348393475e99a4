//! Frame-aligned reader over the sample payload of an audio file.

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::format::{self, AudioFileFormat, AudioFormat, Payload};
use crate::PlaybackError;

/// A readable stream of raw sample bytes from a WAV, AIFF or AU file.
///
/// Reads never split a frame: every successful read returns a multiple of
/// [`AudioFormat::frame_size`] bytes, and a read of `0` means the payload
/// is exhausted.
pub struct AudioInputStream {
    path: PathBuf,
    file_format: AudioFileFormat,
    reader: Payload,
    bytes_read: u64,
}

impl AudioInputStream {
    /// Parses the header of `path` and opens a stream positioned at its
    /// first sample.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound`, `NotAFile` or `Io` if the file can't be
    /// opened, and the header error for unsupported or malformed files.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PlaybackError> {
        let path = path.as_ref();
        let (file_format, reader) = format::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file_format,
            reader,
            bytes_read: 0,
        })
    }

    /// Returns the sample format of the stream.
    pub fn format(&self) -> &AudioFormat {
        &self.file_format.format
    }

    /// Returns everything the header declared.
    pub fn file_format(&self) -> &AudioFileFormat {
        &self.file_format
    }

    /// Returns the path the stream reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of payload bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Reads up to `buf.len()` bytes, rounded down to whole frames.
    ///
    /// Fills the buffer as far as the file allows before returning, so a
    /// short read only happens at the end of the payload. Returns `Ok(0)`
    /// once no complete frame is left.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the underlying read fails.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, PlaybackError> {
        let frame_size = self.file_format.format.frame_size().max(1);
        let wanted = buf.len() / frame_size * frame_size;
        if wanted == 0 {
            return Ok(0);
        }

        let mut filled = 0;
        while filled < wanted {
            match self.reader.read(&mut buf[filled..wanted]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(PlaybackError::io(&self.path, e)),
            }
        }

        // A dangling partial frame at end of file is dropped
        let whole = filled / frame_size * frame_size;
        if whole < filled {
            tracing::debug!(
                path = %self.path.display(),
                dropped = filled - whole,
                "Discarding partial frame at end of payload"
            );
        }
        self.bytes_read += whole as u64;
        Ok(whole)
    }

    /// Reads the remaining payload into memory.
    pub(crate) fn read_to_end(&mut self) -> Result<Vec<u8>, PlaybackError> {
        // Headers can overstate the payload; the file length bounds it
        let declared = self.file_format.data_len().unwrap_or(0);
        let capacity = usize::try_from(declared.min(self.file_format.file_len)).unwrap_or(0);
        let mut data = Vec::with_capacity(capacity);
        self.reader
            .read_to_end(&mut data)
            .map_err(|e| PlaybackError::io(&self.path, e))?;
        let frame_size = self.file_format.format.frame_size().max(1);
        data.truncate(data.len() / frame_size * frame_size);
        self.bytes_read += data.len() as u64;
        Ok(data)
    }
}

impl std::fmt::Debug for AudioInputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioInputStream")
            .field("path", &self.path)
            .field("format", &self.file_format.format)
            .field("bytes_read", &self.bytes_read)
            .finish_non_exhaustive()
    }
}
