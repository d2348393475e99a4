//! Sample rate conversion.
//!
//! This module provides basic resampling using linear interpolation.
//! Output lines feed audio through it block by block, so the resampler
//! carries its position and the last input frame across calls.

/// Streaming linear-interpolation resampler for interleaved audio.
///
/// Fast, but may introduce artifacts for large rate changes. Good enough
/// for alert sounds and short clips played on a device that doesn't offer
/// the file's native rate.
#[derive(Debug, Clone)]
pub struct LinearResampler {
    channels: usize,
    /// Input frames advanced per output frame.
    step: f64,
    /// Position of the next output frame, relative to the first frame of
    /// `history` (or of the next input block when history is empty).
    position: f64,
    /// Last frame of the previous block.
    history: Vec<f32>,
}

impl LinearResampler {
    /// Creates a resampler from `from_rate` to `to_rate`.
    pub fn new(from_rate: u32, to_rate: u32, channels: u16) -> Self {
        let step = if from_rate == 0 || to_rate == 0 {
            1.0
        } else {
            f64::from(from_rate) / f64::from(to_rate)
        };
        Self {
            channels: usize::from(channels.max(1)),
            step,
            position: 0.0,
            history: Vec::new(),
        }
    }

    /// Returns `true` if input passes through unchanged.
    pub fn is_passthrough(&self) -> bool {
        (self.step - 1.0).abs() < f64::EPSILON
    }

    /// Resamples one block of interleaved input.
    ///
    /// Incomplete trailing frames are ignored.
    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        if self.is_passthrough() {
            return input.to_vec();
        }

        let channels = self.channels;
        let mut frames: Vec<f32> = Vec::with_capacity(self.history.len() + input.len());
        frames.extend_from_slice(&self.history);
        frames.extend_from_slice(&input[..input.len() / channels * channels]);

        let frame_count = frames.len() / channels;
        if frame_count == 0 {
            return Vec::new();
        }

        let estimate = ((frame_count as f64) / self.step).ceil() as usize * channels;
        let mut output = Vec::with_capacity(estimate);

        while self.position + 1.0 < frame_count as f64 {
            let index = self.position.floor() as usize;
            let frac = (self.position - index as f64) as f32;
            let current = &frames[index * channels..(index + 1) * channels];
            let next = &frames[(index + 1) * channels..(index + 2) * channels];
            for (a, b) in current.iter().zip(next) {
                output.push(a + (b - a) * frac);
            }
            self.position += self.step;
        }

        // Re-anchor on the last frame, which becomes the next block's history
        self.position -= (frame_count - 1) as f64;
        self.history.clear();
        self.history
            .extend_from_slice(&frames[(frame_count - 1) * channels..frame_count * channels]);

        output
    }

    /// Clears carried state, for reuse on an unrelated stream.
    pub fn reset(&mut self) {
        self.position = 0.0;
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_same_rate() {
        let mut resampler = LinearResampler::new(16000, 16000, 1);
        assert!(resampler.is_passthrough());
        assert_eq!(resampler.process(&[0.1, 0.2, 0.3]), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_resample_empty() {
        let mut resampler = LinearResampler::new(16000, 8000, 1);
        assert!(resampler.process(&[]).is_empty());
    }

    #[test]
    fn test_resample_downsample_ratio() {
        // 48kHz to 16kHz = 3:1 ratio
        let mut resampler = LinearResampler::new(48000, 16000, 1);
        let input: Vec<f32> = (0..481).map(|i| i as f32).collect();
        let output = resampler.process(&input);
        assert_eq!(output.len(), 160);
        assert_eq!(output[0], 0.0);
        assert_eq!(output[1], 3.0);
    }

    #[test]
    fn test_resample_upsample_interpolates() {
        // 1:2 ratio inserts midpoints
        let mut resampler = LinearResampler::new(1, 2, 1);
        let output = resampler.process(&[0.0, 1.0, 2.0]);
        assert_eq!(output, vec![0.0, 0.5, 1.0, 1.5]);
    }

    #[test]
    fn test_resample_is_continuous_across_blocks() {
        let input: Vec<f32> = (0..100).map(|i| i as f32).collect();

        let mut whole = LinearResampler::new(2, 3, 1);
        let expected = whole.process(&input);

        let mut split = LinearResampler::new(2, 3, 1);
        let mut actual = split.process(&input[..37]);
        actual.extend(split.process(&input[37..]));

        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(&expected) {
            assert!((a - e).abs() < 1e-4);
        }
    }

    #[test]
    fn test_resample_stereo_keeps_frames_interleaved() {
        let mut resampler = LinearResampler::new(2, 4, 2);
        let output = resampler.process(&[0.0, 10.0, 1.0, 11.0]);
        assert_eq!(output, vec![0.0, 10.0, 0.5, 10.5]);
        assert_eq!(output.len() % 2, 0);
    }

    #[test]
    fn test_resample_zero_rate_falls_back_to_passthrough() {
        let resampler = LinearResampler::new(0, 16000, 1);
        assert!(resampler.is_passthrough());
    }

    #[test]
    fn test_reset_clears_history() {
        let mut resampler = LinearResampler::new(1, 2, 1);
        resampler.process(&[5.0, 6.0]);
        resampler.reset();
        let output = resampler.process(&[0.0, 1.0]);
        assert_eq!(output, vec![0.0, 0.5]);
    }
}
