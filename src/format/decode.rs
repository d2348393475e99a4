//! Sample decoding through symphonia's PCM codec.
//!
//! The line receives raw payload bytes in the source format. They are
//! wrapped into packets and decoded by the same codec symphonia would use
//! for the file, then flattened to interleaved f32.

use std::sync::OnceLock;

use symphonia::core::audio::{Channels, SampleBuffer};
use symphonia::core::codecs::{
    CodecParameters, CodecRegistry, CodecType, Decoder, DecoderOptions, CODEC_TYPE_PCM_ALAW,
    CODEC_TYPE_PCM_F32BE, CODEC_TYPE_PCM_F32LE, CODEC_TYPE_PCM_F64BE, CODEC_TYPE_PCM_F64LE,
    CODEC_TYPE_PCM_MULAW, CODEC_TYPE_PCM_S16BE, CODEC_TYPE_PCM_S16LE, CODEC_TYPE_PCM_S24BE,
    CODEC_TYPE_PCM_S24LE, CODEC_TYPE_PCM_S32BE, CODEC_TYPE_PCM_S32LE, CODEC_TYPE_PCM_S8,
    CODEC_TYPE_PCM_U8,
};
use symphonia::core::formats::Packet;

use super::{AudioFormat, ByteOrder, Encoding};
use crate::PlaybackError;

/// Largest number of frames handed to the codec in one packet.
const MAX_FRAMES_PER_PACKET: usize = 4096;

fn codec_registry() -> &'static CodecRegistry {
    static CODEC_REGISTRY: OnceLock<CodecRegistry> = OnceLock::new();
    CODEC_REGISTRY.get_or_init(|| {
        let mut registry = CodecRegistry::new();
        registry.register_all::<symphonia::default::codecs::PcmDecoder>();
        registry
    })
}

/// Returns the symphonia codec that decodes `format`.
fn codec_for(format: &AudioFormat) -> Result<CodecType, PlaybackError> {
    let little = format.byte_order == ByteOrder::LittleEndian;
    let codec = match (format.encoding, format.bits_per_sample) {
        (Encoding::PcmUnsigned, 8) => CODEC_TYPE_PCM_U8,
        (Encoding::PcmSigned, 8) => CODEC_TYPE_PCM_S8,
        (Encoding::PcmSigned, 16) if little => CODEC_TYPE_PCM_S16LE,
        (Encoding::PcmSigned, 16) => CODEC_TYPE_PCM_S16BE,
        (Encoding::PcmSigned, 24) if little => CODEC_TYPE_PCM_S24LE,
        (Encoding::PcmSigned, 24) => CODEC_TYPE_PCM_S24BE,
        (Encoding::PcmSigned, 32) if little => CODEC_TYPE_PCM_S32LE,
        (Encoding::PcmSigned, 32) => CODEC_TYPE_PCM_S32BE,
        (Encoding::PcmFloat, 32) if little => CODEC_TYPE_PCM_F32LE,
        (Encoding::PcmFloat, 32) => CODEC_TYPE_PCM_F32BE,
        (Encoding::PcmFloat, 64) if little => CODEC_TYPE_PCM_F64LE,
        (Encoding::PcmFloat, 64) => CODEC_TYPE_PCM_F64BE,
        (Encoding::ULaw, 8) => CODEC_TYPE_PCM_MULAW,
        (Encoding::ALaw, 8) => CODEC_TYPE_PCM_ALAW,
        _ => return Err(PlaybackError::unsupported_format(format.to_string())),
    };
    Ok(codec)
}

/// Builds a channel mask with the first `count` positions set.
fn channel_layout(count: u16) -> Result<Channels, PlaybackError> {
    let mask = 1u32
        .checked_shl(u32::from(count))
        .map_or(u32::MAX, |bit| bit - 1);
    let channels = Channels::from_bits_truncate(mask);
    if channels.count() != usize::from(count) {
        return Err(PlaybackError::unsupported_format(format!(
            "{count} channels"
        )));
    }
    Ok(channels)
}

/// Decodes raw sample bytes of one [`AudioFormat`] to interleaved f32.
pub struct SampleDecoder {
    decoder: Box<dyn Decoder>,
    samples: Option<SampleBuffer<f32>>,
    frame_size: usize,
    ts: u64,
}

impl SampleDecoder {
    /// Creates a decoder for bytes laid out as `format`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` if no PCM codec handles `format`.
    pub fn new(format: &AudioFormat) -> Result<Self, PlaybackError> {
        format.validate()?;

        let bits = u32::from(format.bits_per_sample);
        let mut params = CodecParameters::new();
        params
            .for_codec(codec_for(format)?)
            .with_sample_rate(format.sample_rate)
            .with_channels(channel_layout(format.channels)?)
            .with_bits_per_sample(bits)
            .with_bits_per_coded_sample(bits)
            .with_max_frames_per_packet(MAX_FRAMES_PER_PACKET as u64);

        let decoder = codec_registry()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| PlaybackError::unsupported_format(format!("{format}: {e}")))?;

        Ok(Self {
            decoder,
            samples: None,
            frame_size: format.frame_size(),
            ts: 0,
        })
    }

    /// Returns the number of bytes in one frame of the source format.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Decodes the whole frames at the front of `bytes`, appending their
    /// samples to `out`. Returns the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns `LineFailed` if the codec rejects a packet.
    pub fn decode(&mut self, bytes: &[u8], out: &mut Vec<f32>) -> Result<usize, PlaybackError> {
        let whole = bytes.len() / self.frame_size * self.frame_size;

        for chunk in bytes[..whole].chunks(self.frame_size * MAX_FRAMES_PER_PACKET) {
            let frames = (chunk.len() / self.frame_size) as u64;
            let packet = Packet::new_from_slice(0, self.ts, frames, chunk);
            self.ts += frames;

            let decoded = self
                .decoder
                .decode(&packet)
                .map_err(|e| PlaybackError::line_failed(format!("decode failed: {e}")))?;
            let buffer = self
                .samples
                .get_or_insert_with(|| SampleBuffer::new(decoded.capacity() as u64, *decoded.spec()));
            buffer.copy_interleaved_ref(decoded);
            out.extend_from_slice(buffer.samples());
        }

        Ok(whole)
    }

    /// Forgets any codec state, as after a seek.
    pub fn reset(&mut self) {
        self.decoder.reset();
        self.ts = 0;
    }
}

impl std::fmt::Debug for SampleDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleDecoder")
            .field("frame_size", &self.frame_size)
            .field("ts", &self.ts)
            .finish_non_exhaustive()
    }
}
