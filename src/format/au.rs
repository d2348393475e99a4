//! Sun/NeXT AU header parsing. All fields are big-endian.
//!
//! symphonia has no AU reader, so this container keeps its own parser. The
//! payload is handed to the line as raw bytes.

use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use symphonia::core::io::MediaSource;

use super::{header_error, AudioFileFormat, AudioFormat, ByteOrder, Container, Encoding, Payload};
use crate::PlaybackError;

/// Size of the fixed AU header.
const AU_HEADER_SIZE: u32 = 24;
/// Data size value meaning "unknown, read to end of file".
const AU_UNKNOWN_SIZE: u32 = u32::MAX;

/// Parses an AU header and positions a reader at the first sample.
///
/// `prefix` holds the magic, header size and data size already read from
/// `source`.
pub(super) fn open(
    mut source: Box<dyn MediaSource>,
    file_len: u64,
    prefix: &[u8; 12],
    path: &Path,
) -> Result<(AudioFileFormat, Payload), PlaybackError> {
    let header_size = u32::from_be_bytes([prefix[4], prefix[5], prefix[6], prefix[7]]);
    let data_size = u32::from_be_bytes([prefix[8], prefix[9], prefix[10], prefix[11]]);

    let mut fields = [0u8; 12];
    source
        .read_exact(&mut fields)
        .map_err(|e| header_error(path, e))?;
    let field = |i: usize| u32::from_be_bytes([fields[i], fields[i + 1], fields[i + 2], fields[i + 3]]);
    let (encoding_code, sample_rate, channels) = (field(0), field(4), field(8));

    if header_size < AU_HEADER_SIZE {
        return Err(PlaybackError::malformed(format!(
            "AU header size {header_size} smaller than {AU_HEADER_SIZE}"
        )));
    }
    let channels = u16::try_from(channels)
        .map_err(|_| PlaybackError::malformed(format!("AU channel count {channels}")))?;

    let (encoding, bits_per_sample) = match encoding_code {
        1 => (Encoding::ULaw, 8),
        2 => (Encoding::PcmSigned, 8),
        3 => (Encoding::PcmSigned, 16),
        4 => (Encoding::PcmSigned, 24),
        5 => (Encoding::PcmSigned, 32),
        6 => (Encoding::PcmFloat, 32),
        7 => (Encoding::PcmFloat, 64),
        27 => (Encoding::ALaw, 8),
        other => {
            return Err(PlaybackError::unsupported_format(format!(
                "AU encoding {other}"
            )));
        }
    };
    let format = AudioFormat {
        encoding,
        sample_rate,
        bits_per_sample,
        channels,
        byte_order: ByteOrder::BigEndian,
    };

    let data_offset = u64::from(header_size);
    if data_offset > file_len {
        return Err(PlaybackError::malformed(format!(
            "AU data offset {data_offset} beyond end of file ({file_len} bytes)"
        )));
    }
    let available = file_len - data_offset;
    // A zero or oversized declared length plays whatever follows the header.
    // AU has no trailing chunks, so the rest of the file is all payload.
    let data_len = match data_size {
        AU_UNKNOWN_SIZE | 0 => available,
        declared => u64::from(declared).min(available),
    };

    source
        .seek(SeekFrom::Start(data_offset))
        .map_err(|e| PlaybackError::io(path, e))?;

    let frame_size = format.frame_size().max(1) as u64;
    let file_format = AudioFileFormat {
        container: Container::Au,
        format,
        frames: Some(data_len / frame_size),
        file_len,
    };
    Ok((file_format, Payload::Raw(BufReader::new(source).take(data_len))))
}
