//! Audio container parsing and sample format utilities.
//!
//! Files are identified by content, never by extension:
//! - WAVE (`RIFF`/`WAVE`) and AIFF/AIFF-C (`FORM`/`AIFF`, `FORM`/`AIFC`)
//!   through symphonia's format readers
//! - Sun/NeXT AU (`.snd`), which symphonia doesn't read, through a small
//!   header parser
//!
//! It also provides the conversions the output line needs:
//! - Byte decoding to f32 samples (symphonia's PCM codec)
//! - Channel mapping
//! - Sample rate conversion (resampling)

mod au;
mod convert;
mod decode;
mod demux;
mod resample;

pub use convert::{encode_i16_le, f32_to_i16, i16_to_f32, remap_channels};
pub use decode::SampleDecoder;
pub use resample::LinearResampler;

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Take};
use std::path::Path;
use std::time::Duration;

use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatReader;
use symphonia::core::io::MediaSource;

use crate::PlaybackError;

/// Bytes read up front to tell AU apart from the symphonia containers.
const MAGIC_LEN: usize = 12;

/// File-level audio encapsulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    /// Microsoft RIFF WAVE.
    Wave,
    /// Apple AIFF or AIFF-C.
    Aiff,
    /// Sun/NeXT AU.
    Au,
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Wave => "WAVE",
            Self::Aiff => "AIFF",
            Self::Au => "AU",
        };
        f.write_str(name)
    }
}

/// How individual samples are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Two's-complement linear PCM.
    PcmSigned,
    /// Offset-binary linear PCM (8-bit WAV).
    PcmUnsigned,
    /// IEEE floating point.
    PcmFloat,
    /// G.711 µ-law.
    ULaw,
    /// G.711 A-law.
    ALaw,
}

/// Byte order of multi-byte samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Least significant byte first (WAV).
    LittleEndian,
    /// Most significant byte first (AIFF, AU).
    BigEndian,
}

/// Sample format of an audio stream.
///
/// An output line is always opened with exactly the format of the stream
/// that feeds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    /// Sample encoding.
    pub encoding: Encoding,
    /// Frames per second.
    pub sample_rate: u32,
    /// Bits per sample (8 for the G.711 codecs).
    pub bits_per_sample: u16,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Byte order of multi-byte samples.
    pub byte_order: ByteOrder,
}

impl AudioFormat {
    /// 16-bit signed little-endian PCM, the format used for generated tones.
    pub fn pcm_i16_le(sample_rate: u32, channels: u16) -> Self {
        Self {
            encoding: Encoding::PcmSigned,
            sample_rate,
            bits_per_sample: 16,
            channels,
            byte_order: ByteOrder::LittleEndian,
        }
    }

    /// Returns the number of bytes per sample.
    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bits_per_sample).div_ceil(8)
    }

    /// Returns the number of bytes per frame (one sample per channel).
    pub fn frame_size(&self) -> usize {
        self.bytes_per_sample() * usize::from(self.channels)
    }

    /// Returns the playback duration of `bytes` bytes of this format.
    pub fn duration_of(&self, bytes: u64) -> Duration {
        let frame_size = self.frame_size() as u64;
        if frame_size == 0 || self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let frames = bytes / frame_size;
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate))
    }

    /// Checks that the encoding, width, rate and channel count are playable.
    pub fn validate(&self) -> Result<(), PlaybackError> {
        let width_ok = match self.encoding {
            Encoding::PcmSigned => matches!(self.bits_per_sample, 8 | 16 | 24 | 32),
            Encoding::PcmUnsigned | Encoding::ULaw | Encoding::ALaw => self.bits_per_sample == 8,
            Encoding::PcmFloat => matches!(self.bits_per_sample, 32 | 64),
        };
        if !width_ok {
            return Err(PlaybackError::unsupported_format(format!(
                "{}-bit {:?}",
                self.bits_per_sample, self.encoding
            )));
        }
        if self.channels == 0 {
            return Err(PlaybackError::malformed("channel count is zero"));
        }
        if self.sample_rate == 0 {
            return Err(PlaybackError::malformed("sample rate is zero"));
        }
        Ok(())
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} {}Hz {}-bit {}ch {:?}",
            self.encoding, self.sample_rate, self.bits_per_sample, self.channels, self.byte_order
        )
    }
}

/// Everything learned from an audio file's header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFileFormat {
    /// Container type.
    pub container: Container,
    /// Sample format of the payload.
    pub format: AudioFormat,
    /// Number of frames the header declares, when it declares one.
    pub frames: Option<u64>,
    /// Total length of the file in bytes.
    pub file_len: u64,
}

impl AudioFileFormat {
    /// Returns the length of the sample payload in bytes, if known.
    pub fn data_len(&self) -> Option<u64> {
        self.frames
            .map(|frames| frames.saturating_mul(self.format.frame_size() as u64))
    }

    /// Returns the exact playback duration of the payload, if known.
    pub fn duration(&self) -> Option<Duration> {
        self.data_len().map(|len| self.format.duration_of(len))
    }
}

/// Raw sample bytes of an opened audio file.
///
/// WAV and AIFF payloads come out of symphonia's demuxer packet by packet;
/// AU payloads are read straight from the file.
pub(crate) enum Payload {
    Packets {
        reader: Box<dyn FormatReader>,
        track_id: u32,
        pending: Vec<u8>,
        offset: usize,
    },
    Raw(Take<BufReader<Box<dyn MediaSource>>>),
}

impl Read for Payload {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Raw(reader) => reader.read(buf),
            Self::Packets {
                reader,
                track_id,
                pending,
                offset,
            } => {
                while *offset >= pending.len() {
                    let packet = match reader.next_packet() {
                        Ok(packet) => packet,
                        Err(SymphoniaError::IoError(e))
                            if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                        {
                            return Ok(0);
                        }
                        Err(SymphoniaError::IoError(e)) => return Err(e),
                        Err(e) => {
                            return Err(std::io::Error::new(
                                std::io::ErrorKind::InvalidData,
                                e.to_string(),
                            ));
                        }
                    };
                    if packet.track_id() != *track_id {
                        continue;
                    }
                    pending.clear();
                    pending.extend_from_slice(packet.buf());
                    *offset = 0;
                }

                let n = buf.len().min(pending.len() - *offset);
                buf[..n].copy_from_slice(&pending[*offset..*offset + n]);
                *offset += n;
                Ok(n)
            }
        }
    }
}

/// Identifies the container of `path` and parses its header.
///
/// The payload is not read.
///
/// # Errors
///
/// - `FileNotFound` / `NotAFile` if the path is not a readable regular file
/// - `UnsupportedContainer` if the content is not WAV, AIFF or AU
/// - `UnsupportedFormat` / `MalformedHeader` if the header can't be used
pub fn read_header(path: &Path) -> Result<AudioFileFormat, PlaybackError> {
    open(path).map(|(file_format, _)| file_format)
}

/// Parses the header of `path` and returns a reader over its payload.
pub(crate) fn open(path: &Path) -> Result<(AudioFileFormat, Payload), PlaybackError> {
    let metadata = std::fs::metadata(path).map_err(|e| PlaybackError::io(path, e))?;
    if !metadata.is_file() {
        return Err(PlaybackError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path).map_err(|e| PlaybackError::io(path, e))?;
    open_source(Box::new(file), metadata.len(), path)
}

/// Opens an already opened source positioned at the start of the file.
pub(crate) fn open_source(
    mut source: Box<dyn MediaSource>,
    file_len: u64,
    path: &Path,
) -> Result<(AudioFileFormat, Payload), PlaybackError> {
    if file_len < MAGIC_LEN as u64 {
        return Err(PlaybackError::UnsupportedContainer {
            reason: format!("file is only {file_len} bytes"),
        });
    }
    let mut magic = [0u8; MAGIC_LEN];
    source
        .read_exact(&mut magic)
        .map_err(|e| header_error(path, e))?;

    let (file_format, payload) = if &magic[0..4] == b".snd" {
        au::open(source, file_len, &magic, path)?
    } else {
        source
            .seek(SeekFrom::Start(0))
            .map_err(|e| PlaybackError::io(path, e))?;
        demux::open(source, file_len, &magic, path)?
    };

    file_format.format.validate()?;

    tracing::debug!(
        path = %path.display(),
        container = %file_format.container,
        format = %file_format.format,
        frames = ?file_format.frames,
        "Opened audio file"
    );

    Ok((file_format, payload))
}

/// Maps a failed header read. Running out of bytes mid-header is a
/// malformed file, not an I/O error.
pub(crate) fn header_error(path: &Path, e: std::io::Error) -> PlaybackError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        PlaybackError::malformed("header truncated")
    } else {
        PlaybackError::io(path, e)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Builders for in-memory container files.

    /// Builds a canonical 44-byte-header PCM WAV file.
    pub fn wav_bytes(sample_rate: u32, channels: u16, bits: u16, payload: &[u8]) -> Vec<u8> {
        let block_align = channels * bits.div_ceil(8);
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + payload.len() as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * u32::from(block_align)).to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&bits.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    /// Encodes an integer sample rate as an 80-bit IEEE extended float.
    pub fn extended(rate: u32) -> [u8; 10] {
        let mut out = [0u8; 10];
        if rate == 0 {
            return out;
        }
        let exponent = 31 - rate.leading_zeros();
        let biased = (16383 + exponent) as u16;
        out[0..2].copy_from_slice(&biased.to_be_bytes());
        let mantissa = u64::from(rate) << (63 - exponent);
        out[2..10].copy_from_slice(&mantissa.to_be_bytes());
        out
    }

    /// Builds an AIFF (or AIFF-C when `compression` is set) file.
    pub fn aiff_bytes(
        sample_rate: u32,
        channels: u16,
        bits: u16,
        compression: Option<&[u8; 4]>,
        payload: &[u8],
    ) -> Vec<u8> {
        let frame_size = usize::from(channels) * usize::from(bits.div_ceil(8));
        let frames = (payload.len() / frame_size.max(1)) as u32;

        let mut comm = Vec::new();
        comm.extend_from_slice(&channels.to_be_bytes());
        comm.extend_from_slice(&frames.to_be_bytes());
        comm.extend_from_slice(&bits.to_be_bytes());
        comm.extend_from_slice(&extended(sample_rate));
        if let Some(kind) = compression {
            comm.extend_from_slice(kind);
            comm.extend_from_slice(&[0, 0]); // empty pascal string, padded
        }

        let mut body = Vec::new();
        body.extend_from_slice(if compression.is_some() { b"AIFC" } else { b"AIFF" });
        body.extend_from_slice(b"COMM");
        body.extend_from_slice(&(comm.len() as u32).to_be_bytes());
        body.extend_from_slice(&comm);
        body.extend_from_slice(b"SSND");
        body.extend_from_slice(&(payload.len() as u32 + 8).to_be_bytes());
        body.extend_from_slice(&0u32.to_be_bytes());
        body.extend_from_slice(&0u32.to_be_bytes());
        body.extend_from_slice(payload);
        if payload.len() % 2 == 1 {
            body.push(0);
        }

        let mut out = Vec::new();
        out.extend_from_slice(b"FORM");
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(&body);
        out
    }

    /// Builds an AU file with a 24-byte header.
    pub fn au_bytes(sample_rate: u32, channels: u32, encoding: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b".snd");
        out.extend_from_slice(&24u32.to_be_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&encoding.to_be_bytes());
        out.extend_from_slice(&sample_rate.to_be_bytes());
        out.extend_from_slice(&channels.to_be_bytes());
        out.extend_from_slice(payload);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use std::io::Cursor;

    fn parse(bytes: &[u8]) -> Result<AudioFileFormat, PlaybackError> {
        open_source(
            Box::new(Cursor::new(bytes.to_vec())),
            bytes.len() as u64,
            Path::new("mem"),
        )
        .map(|(file_format, _)| file_format)
    }

    #[test]
    fn test_reads_wav_header() {
        let parsed = parse(&wav_bytes(44100, 2, 16, &[0u8; 400])).unwrap();
        assert_eq!(parsed.container, Container::Wave);
        assert_eq!(parsed.format, AudioFormat::pcm_i16_le(44100, 2));
        assert_eq!(parsed.frames, Some(100));
        assert_eq!(parsed.data_len(), Some(400));
    }

    #[test]
    fn test_reads_aiff_header() {
        let parsed = parse(&aiff_bytes(22050, 1, 16, None, &[0u8; 200])).unwrap();
        assert_eq!(parsed.container, Container::Aiff);
        assert_eq!(parsed.format.encoding, Encoding::PcmSigned);
        assert_eq!(parsed.frames, Some(100));
    }

    #[test]
    fn test_reads_au_header() {
        let parsed = parse(&au_bytes(8000, 1, 1, &[0xFFu8; 80])).unwrap();
        assert_eq!(parsed.container, Container::Au);
        assert_eq!(parsed.format.encoding, Encoding::ULaw);
        assert_eq!(parsed.duration(), Some(Duration::from_millis(10)));
    }

    #[test]
    fn test_rejects_unknown_magic() {
        let err = parse(b"ID3\x04\x00\x00\x00\x00\x00\x00\x00\x00 not audio").unwrap_err();
        assert!(matches!(err, PlaybackError::UnsupportedContainer { .. }));
    }

    #[test]
    fn test_rejects_tiny_file() {
        let err = parse(b"RIFF").unwrap_err();
        assert!(matches!(err, PlaybackError::UnsupportedContainer { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = read_header(Path::new("/definitely/not/here.wav")).unwrap_err();
        assert!(matches!(err, PlaybackError::FileNotFound { .. }));
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_header(dir.path()).unwrap_err();
        assert!(matches!(err, PlaybackError::NotAFile { .. }));
    }

    #[test]
    fn test_format_frame_size() {
        let format = AudioFormat {
            encoding: Encoding::PcmSigned,
            sample_rate: 48000,
            bits_per_sample: 24,
            channels: 2,
            byte_order: ByteOrder::LittleEndian,
        };
        assert_eq!(format.bytes_per_sample(), 3);
        assert_eq!(format.frame_size(), 6);
        assert_eq!(format.duration_of(48000 * 6), Duration::from_secs(1));
    }

    #[test]
    fn test_format_validate_rejects_odd_width() {
        let format = AudioFormat {
            bits_per_sample: 12,
            ..AudioFormat::pcm_i16_le(8000, 1)
        };
        assert!(matches!(
            format.validate(),
            Err(PlaybackError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_unknown_frame_count_has_no_duration() {
        let file_format = AudioFileFormat {
            container: Container::Wave,
            format: AudioFormat::pcm_i16_le(8000, 1),
            frames: None,
            file_len: 44,
        };
        assert_eq!(file_format.data_len(), None);
        assert_eq!(file_format.duration(), None);
    }
}
