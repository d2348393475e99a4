//! Sample scaling and channel conversion.

/// Converts f32 samples to i16.
///
/// Input should be in the range [-1.0, 1.0].
/// Values outside this range are clamped.
///
/// Uses × 32767 (not 32768) for symmetric scaling. This means -1.0 maps
/// to -32767 rather than -32768, losing 1 LSB at the negative extreme.
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// Converts i16 samples to f32.
///
/// Output will be in the range [-1.0, 1.0].
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    f32::from(sample) / 32768.0
}

/// Encodes i16 samples as little-endian bytes.
pub fn encode_i16_le(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Converts interleaved samples between channel counts.
///
/// - Equal counts pass through
/// - Down to mono averages all channels
/// - Up from mono duplicates the single channel
/// - Anything else keeps the shared channels and fills extra outputs by
///   repeating the input channels in order
pub fn remap_channels(samples: &[f32], from: u16, to: u16) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return samples.to_vec();
    }
    let from = usize::from(from);
    let to = usize::from(to);

    samples
        .chunks_exact(from)
        .flat_map(|frame| {
            (0..to).map(move |c| {
                if to == 1 {
                    frame.iter().sum::<f32>() / from as f32
                } else {
                    frame[c % from]
                }
            })
        })
        .collect()
}
