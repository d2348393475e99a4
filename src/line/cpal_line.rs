//! CPAL output line.
//!
//! Written bytes are decoded to f32 by symphonia's PCM codec, mapped to the
//! device's channel count,
//! resampled to the device rate and pushed into a lock-free ring buffer.
//! The CPAL callback pops from the ring buffer and never blocks; it plays
//! silence when the buffer runs dry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SampleRate, SizedSample, Stream, SupportedStreamConfig};
use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;

use super::{LineProvider, OutputLine};
use crate::format::{remap_channels, AudioFormat, LinearResampler, SampleDecoder};
use crate::PlaybackError;

/// How long a blocked write sleeps before retrying a full ring buffer.
const WRITE_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// How often drain checks whether the ring buffer has emptied.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Extra time drain allows beyond the queued audio before giving up.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Lists all available output devices.
///
/// # Errors
///
/// Returns an error if the audio host cannot be accessed.
pub fn list_output_devices() -> Result<Vec<String>, PlaybackError> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| PlaybackError::line_unavailable(e.to_string()))?;

    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

/// Gets the name of the default output device, if any.
pub fn default_output_device_name() -> Option<String> {
    cpal::default_host()
        .default_output_device()
        .and_then(|d| d.name().ok())
}

/// Line provider backed by a CPAL output device.
///
/// The device is resolved each time a line opens, so unplugging and
/// replugging a device between clips works.
#[derive(Debug, Clone)]
pub struct CpalBackend {
    device_name: Option<String>,
    line_buffer: Duration,
}

impl CpalBackend {
    /// Creates a backend for the default device (`None`) or a named device.
    pub fn new(device_name: Option<String>, line_buffer: Duration) -> Self {
        Self {
            device_name,
            line_buffer,
        }
    }

    fn resolve_device(&self) -> Result<Device, PlaybackError> {
        let host = cpal::default_host();
        let Some(name) = &self.device_name else {
            return host
                .default_output_device()
                .ok_or(PlaybackError::NoDefaultDevice);
        };

        let devices = host
            .output_devices()
            .map_err(|e| PlaybackError::line_unavailable(e.to_string()))?;
        for device in devices {
            if device.name().is_ok_and(|device_name| &device_name == name) {
                return Ok(device);
            }
        }

        Err(PlaybackError::DeviceNotFound { name: name.clone() })
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new(None, Duration::from_millis(500))
    }
}

impl LineProvider for CpalBackend {
    fn name(&self) -> &str {
        self.device_name.as_deref().unwrap_or("default")
    }

    fn open_line(&self, format: &AudioFormat) -> Result<Box<dyn OutputLine>, PlaybackError> {
        let decoder = SampleDecoder::new(format)?;
        let device = self.resolve_device()?;
        let supported = choose_config(&device, format)?;
        let line = CpalLine::open(&device, supported, *format, decoder, self.line_buffer)?;
        Ok(Box::new(line))
    }
}

/// Picks a device config matching the source channels and rate if offered,
/// preferring f32 output, else the device default.
fn choose_config(
    device: &Device,
    format: &AudioFormat,
) -> Result<SupportedStreamConfig, PlaybackError> {
    let wanted_rate = SampleRate(format.sample_rate);

    if let Ok(ranges) = device.supported_output_configs() {
        let mut fallback = None;
        for range in ranges {
            let usable = matches!(
                range.sample_format(),
                SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16
            );
            if !usable
                || range.channels() != format.channels
                || wanted_rate < range.min_sample_rate()
                || wanted_rate > range.max_sample_rate()
            {
                continue;
            }
            let config = range.with_sample_rate(wanted_rate);
            if config.sample_format() == SampleFormat::F32 {
                return Ok(config);
            }
            fallback.get_or_insert(config);
        }
        if let Some(config) = fallback {
            return Ok(config);
        }
    }

    device
        .default_output_config()
        .map_err(|e| PlaybackError::line_unavailable(e.to_string()))
}

/// State shared with the CPAL callbacks.
struct LineShared {
    /// Last stream error reported by the backend.
    error: Mutex<Option<String>>,
    /// Samples requested by the most recent callback (device period).
    period_samples: AtomicUsize,
}

struct CpalLine {
    format: AudioFormat,
    stream: Option<Stream>,
    producer: ringbuf::HeapProd<f32>,
    shared: Arc<LineShared>,
    device_rate: u32,
    device_channels: u16,
    resampler: LinearResampler,
    decoder: SampleDecoder,
    /// Bytes of an incomplete frame carried to the next write.
    remainder: Vec<u8>,
    decoded: Vec<f32>,
    playing: bool,
}

impl CpalLine {
    fn open(
        device: &Device,
        supported: SupportedStreamConfig,
        format: AudioFormat,
        decoder: SampleDecoder,
        line_buffer: Duration,
    ) -> Result<Self, PlaybackError> {
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let device_rate = config.sample_rate.0;
        let device_channels = config.channels;

        let capacity = ((f64::from(device_rate) * line_buffer.as_secs_f64()) as usize).max(1024)
            * usize::from(device_channels);
        let ring_buffer = HeapRb::<f32>::new(capacity);
        let (producer, consumer) = ring_buffer.split();

        let shared = Arc::new(LineShared {
            error: Mutex::new(None),
            period_samples: AtomicUsize::new(0),
        });

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(device, &config, consumer, &shared)?,
            SampleFormat::I16 => build_stream::<i16>(device, &config, consumer, &shared)?,
            SampleFormat::U16 => build_stream::<u16>(device, &config, consumer, &shared)?,
            other => {
                return Err(PlaybackError::line_unavailable(format!(
                    "device sample format {other:?} not supported"
                )));
            }
        };

        tracing::debug!(
            source_rate = format.sample_rate,
            source_channels = format.channels,
            device_rate,
            device_channels,
            "CPAL output line configured"
        );

        Ok(Self {
            format,
            stream: Some(stream),
            producer,
            shared,
            device_rate,
            device_channels,
            resampler: LinearResampler::new(format.sample_rate, device_rate, device_channels),
            decoder,
            remainder: Vec::new(),
            decoded: Vec::new(),
            playing: false,
        })
    }

    fn check_error(&self) -> Result<(), PlaybackError> {
        take_error(&self.shared)
    }

    fn queued_duration(&self) -> Duration {
        let samples_per_second =
            f64::from(self.device_rate) * f64::from(self.device_channels.max(1));
        let queued = self.producer.occupied_len() + self.shared.period_samples.load(Ordering::Relaxed);
        Duration::from_secs_f64(queued as f64 / samples_per_second)
    }

    fn push_blocking(&mut self, samples: &[f32]) -> Result<(), PlaybackError> {
        let stall_limit = self.queued_duration() + DRAIN_GRACE;
        let playing = self.playing;
        let shared = &self.shared;
        push_until_stalled(&mut self.producer, samples, stall_limit, || {
            take_error(shared)?;
            if !playing {
                return Err(PlaybackError::line_failed(
                    "line buffer full and line not started",
                ));
            }
            Ok(())
        })
    }
}

fn take_error(shared: &LineShared) -> Result<(), PlaybackError> {
    match shared.error.lock().take() {
        Some(reason) => Err(PlaybackError::line_failed(reason)),
        None => Ok(()),
    }
}

/// Pushes all of `samples`, sleeping while the ring buffer is full.
///
/// `check` runs before every sleep. Fails once the buffer has accepted
/// nothing for `stall_limit`.
fn push_until_stalled<P>(
    producer: &mut P,
    samples: &[f32],
    stall_limit: Duration,
    mut check: impl FnMut() -> Result<(), PlaybackError>,
) -> Result<(), PlaybackError>
where
    P: Producer<Item = f32>,
{
    let mut offset = 0;
    let mut last_progress = Instant::now();
    loop {
        let pushed = producer.push_slice(&samples[offset..]);
        offset += pushed;
        if offset == samples.len() {
            return Ok(());
        }
        check()?;

        let now = Instant::now();
        if pushed > 0 {
            last_progress = now;
        } else if now.duration_since(last_progress) > stall_limit {
            return Err(PlaybackError::line_failed(format!(
                "output stalled for {} ms",
                stall_limit.as_millis()
            )));
        }
        std::thread::sleep(WRITE_POLL_INTERVAL);
    }
}

fn build_stream<T>(
    device: &Device,
    config: &cpal::StreamConfig,
    mut consumer: ringbuf::HeapCons<f32>,
    shared: &Arc<LineShared>,
) -> Result<Stream, PlaybackError>
where
    T: SizedSample + FromSample<f32>,
{
    let callback_shared = Arc::clone(shared);
    let error_shared = Arc::clone(shared);

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                callback_shared
                    .period_samples
                    .store(data.len(), Ordering::Relaxed);
                for out in data.iter_mut() {
                    // Non-blocking pop - plays silence if the writer is behind
                    let sample = consumer.try_pop().unwrap_or(0.0);
                    *out = T::from_sample(sample);
                }
            },
            move |err| {
                tracing::error!("Audio output stream error: {}", err);
                *error_shared.error.lock() = Some(err.to_string());
            },
            None,
        )
        .map_err(|e| PlaybackError::line_unavailable(e.to_string()))
}

impl OutputLine for CpalLine {
    fn format(&self) -> &AudioFormat {
        &self.format
    }

    fn start(&mut self) -> Result<(), PlaybackError> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| PlaybackError::line_failed("line is closed"))?;
        stream
            .play()
            .map_err(|e| PlaybackError::line_failed(e.to_string()))?;
        self.playing = true;
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), PlaybackError> {
        if self.stream.is_none() {
            return Err(PlaybackError::line_failed("line is closed"));
        }
        self.check_error()?;

        let mut pending = std::mem::take(&mut self.remainder);
        pending.extend_from_slice(data);

        self.decoded.clear();
        let consumed = self.decoder.decode(&pending, &mut self.decoded)?;
        self.remainder = pending.split_off(consumed);
        if self.decoded.is_empty() {
            return Ok(());
        }

        let mapped = remap_channels(&self.decoded, self.format.channels, self.device_channels);
        let resampled = self.resampler.process(&mapped);
        self.push_blocking(&resampled)
    }

    fn drain(&mut self) -> Result<(), PlaybackError> {
        if !self.playing {
            return Ok(());
        }

        let deadline = Instant::now() + self.queued_duration() + DRAIN_GRACE;
        while self.producer.occupied_len() > 0 {
            self.check_error()?;
            if Instant::now() > deadline {
                return Err(PlaybackError::line_failed("drain timed out"));
            }
            std::thread::sleep(DRAIN_POLL_INTERVAL);
        }

        // The last callback's buffer is still in the device
        let period = self.shared.period_samples.load(Ordering::Relaxed);
        let samples_per_second =
            f64::from(self.device_rate) * f64::from(self.device_channels.max(1));
        std::thread::sleep(Duration::from_secs_f64(period as f64 / samples_per_second));
        self.check_error()
    }

    fn stop(&mut self) {
        if let Some(stream) = &self.stream {
            if let Err(e) = stream.pause() {
                tracing::debug!("Failed to pause output stream: {}", e);
            }
        }
        self.playing = false;
    }

    fn close(&mut self) {
        // Dropping the CPAL stream releases the device
        self.stream = None;
        self.remainder.clear();
        self.decoder.reset();
        self.resampler.reset();
    }
}
