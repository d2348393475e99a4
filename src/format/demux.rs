//! WAV and AIFF through symphonia's format readers.

use std::path::Path;

use symphonia::core::codecs::{
    CodecParameters, CODEC_TYPE_NULL, CODEC_TYPE_PCM_ALAW, CODEC_TYPE_PCM_F32BE,
    CODEC_TYPE_PCM_F32LE, CODEC_TYPE_PCM_F64BE, CODEC_TYPE_PCM_F64LE, CODEC_TYPE_PCM_MULAW,
    CODEC_TYPE_PCM_S16BE, CODEC_TYPE_PCM_S16LE, CODEC_TYPE_PCM_S24BE, CODEC_TYPE_PCM_S24LE,
    CODEC_TYPE_PCM_S32BE, CODEC_TYPE_PCM_S32LE, CODEC_TYPE_PCM_S8, CODEC_TYPE_PCM_U8,
};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::{AudioFileFormat, AudioFormat, ByteOrder, Container, Encoding, Payload};
use crate::PlaybackError;

/// Lets symphonia parse the file, then maps its first audio track to an
/// [`AudioFormat`].
///
/// `magic` is the first 12 bytes of the file. Anything but a RIFF/WAVE or
/// FORM/AIFF(-C) header is rejected before symphonia sees it.
pub(super) fn open(
    source: Box<dyn MediaSource>,
    file_len: u64,
    magic: &[u8; 12],
    path: &Path,
) -> Result<(AudioFileFormat, Payload), PlaybackError> {
    let Some(container) = container_of(magic) else {
        return Err(PlaybackError::UnsupportedContainer {
            reason: format!(
                "unrecognized magic {:?}",
                String::from_utf8_lossy(&magic[0..4])
            ),
        });
    };

    let mss = MediaSourceStream::new(source, Default::default());
    let found = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| map_error(e, path))?;

    let reader = found.format;
    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PlaybackError::malformed("no audio track"))?;
    let track_id = track.id;
    let format = format_for(&track.codec_params, container)?;
    let frames = track.codec_params.n_frames;

    let file_format = AudioFileFormat {
        container,
        format,
        frames,
        file_len,
    };
    let payload = Payload::Packets {
        reader,
        track_id,
        pending: Vec::new(),
        offset: 0,
    };
    Ok((file_format, payload))
}

fn container_of(magic: &[u8; 12]) -> Option<Container> {
    match (&magic[0..4], &magic[8..12]) {
        (b"RIFF", b"WAVE") => Some(Container::Wave),
        (b"FORM", b"AIFF" | b"AIFC") => Some(Container::Aiff),
        _ => None,
    }
}

/// The header already identified the container, so symphonia's
/// `Unsupported` means a codec or layout inside it.
fn map_error(error: SymphoniaError, path: &Path) -> PlaybackError {
    match error {
        SymphoniaError::IoError(e) => super::header_error(path, e),
        SymphoniaError::Unsupported(what) => PlaybackError::unsupported_format(what),
        SymphoniaError::DecodeError(what) => PlaybackError::malformed(what),
        other => PlaybackError::malformed(other.to_string()),
    }
}

/// Maps symphonia's codec parameters to the byte layout of the payload.
fn format_for(params: &CodecParameters, container: Container) -> Result<AudioFormat, PlaybackError> {
    use ByteOrder::{BigEndian, LittleEndian};

    // 8-bit samples have no byte order; report the container's
    let native = match container {
        Container::Wave => LittleEndian,
        Container::Aiff | Container::Au => BigEndian,
    };

    let (encoding, bits_per_sample, byte_order) = match params.codec {
        CODEC_TYPE_PCM_U8 => (Encoding::PcmUnsigned, 8, native),
        CODEC_TYPE_PCM_S8 => (Encoding::PcmSigned, 8, native),
        CODEC_TYPE_PCM_S16LE => (Encoding::PcmSigned, 16, LittleEndian),
        CODEC_TYPE_PCM_S16BE => (Encoding::PcmSigned, 16, BigEndian),
        CODEC_TYPE_PCM_S24LE => (Encoding::PcmSigned, 24, LittleEndian),
        CODEC_TYPE_PCM_S24BE => (Encoding::PcmSigned, 24, BigEndian),
        CODEC_TYPE_PCM_S32LE => (Encoding::PcmSigned, 32, LittleEndian),
        CODEC_TYPE_PCM_S32BE => (Encoding::PcmSigned, 32, BigEndian),
        CODEC_TYPE_PCM_F32LE => (Encoding::PcmFloat, 32, LittleEndian),
        CODEC_TYPE_PCM_F32BE => (Encoding::PcmFloat, 32, BigEndian),
        CODEC_TYPE_PCM_F64LE => (Encoding::PcmFloat, 64, LittleEndian),
        CODEC_TYPE_PCM_F64BE => (Encoding::PcmFloat, 64, BigEndian),
        CODEC_TYPE_PCM_MULAW => (Encoding::ULaw, 8, native),
        CODEC_TYPE_PCM_ALAW => (Encoding::ALaw, 8, native),
        other => {
            return Err(PlaybackError::unsupported_format(format!(
                "{container} codec {other:?}"
            )));
        }
    };

    let sample_rate = params
        .sample_rate
        .ok_or_else(|| PlaybackError::malformed("sample rate missing"))?;
    let channels = params
        .channels
        .map(|c| c.count())
        .ok_or_else(|| PlaybackError::malformed("channel count missing"))?;
    let channels = u16::try_from(channels)
        .map_err(|_| PlaybackError::malformed(format!("channel count {channels}")))?;

    Ok(AudioFormat {
        encoding,
        sample_rate,
        bits_per_sample,
        channels,
        byte_order,
    })
}
