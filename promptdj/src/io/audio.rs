//! Audio sampling: the live `level` + `spectrum` snapshot the render loop
//! reads every frame.

use cpal::{Device, Stream, StreamConfig, traits::*};
use parking_lot::Mutex;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::error::Error;
use std::sync::Arc;

use crate::framework::prelude::*;

pub const FFT_SIZE: usize = 1024;
pub const SPECTRUM_BINS: usize = 64;

/// Ephemeral per-frame snapshot. Always replaced wholesale.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioFrame {
    /// Overall loudness in `[0, 1]`.
    pub level: f32,
    /// Byte magnitudes, low to high frequency.
    pub spectrum: Vec<u8>,
}

impl AudioFrame {
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn is_silent(&self) -> bool {
        self.level == 0.0 && self.spectrum.is_empty()
    }
}

pub trait AudioSampler {
    fn start(&mut self) -> Result<(), Box<dyn Error>>;
    fn stop(&mut self);
    /// Latest values; never blocks and may repeat the previous frame.
    fn current(&self) -> AudioFrame;
}

/// Sampler for hosts with no audio source.
#[derive(Debug, Default)]
pub struct SilentSampler;

impl AudioSampler for SilentSampler {
    fn start(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }

    fn stop(&mut self) {}

    fn current(&self) -> AudioFrame {
        AudioFrame::silent()
    }
}

/// Turns a window of mono samples into an [`AudioFrame`].
pub struct Analyser {
    fft: Arc<dyn Fft<f32>>,
    size: usize,
    bins: usize,
}

impl Analyser {
    pub fn new(size: usize, bins: usize) -> Self {
        let size = size.max(2);
        let mut planner = FftPlanner::new();
        Self {
            fft: planner.plan_fft_forward(size),
            size,
            bins: bins.clamp(1, size / 2),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// `samples` shorter than the FFT size are zero padded; longer ones use
    /// the most recent window.
    pub fn analyse(&self, samples: &[f32]) -> AudioFrame {
        let start = samples.len().saturating_sub(self.size);
        let window = &samples[start..];

        let rms = if window.is_empty() {
            0.0
        } else {
            (window.iter().map(|s| s * s).sum::<f32>() / window.len() as f32)
                .sqrt()
        };

        let mut buffer: Vec<Complex<f32>> = window
            .iter()
            .map(|&s| Complex::new(s, 0.0))
            .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
            .take(self.size)
            .collect();
        self.fft.process(&mut buffer);

        let half = self.size / 2;
        let per_bin = (half / self.bins).max(1);
        let normalize = |db: f32| ((db + 80.0) / 60.0).clamp(0.0, 1.0);

        let spectrum = buffer[..half]
            .chunks(per_bin)
            .take(self.bins)
            .map(|chunk| {
                let peak = chunk
                    .iter()
                    .map(|c| c.norm() / self.size as f32)
                    .fold(0.0_f32, f32::max);
                let db = 20.0 * peak.max(1e-8).log10();
                (normalize(db) * 255.0).round() as u8
            })
            .collect();

        AudioFrame {
            level: clamp01(rms * std::f32::consts::SQRT_2),
            spectrum,
        }
    }
}

/// Samples an audio input device with `cpal` and analyses the most recent
/// window on demand.
pub struct InputSampler {
    device_name: Option<String>,
    samples: Arc<Mutex<Vec<f32>>>,
    analyser: Analyser,
    stream: Option<Stream>,
}

impl InputSampler {
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name: device_name.filter(|n| !n.is_empty()),
            samples: Arc::new(Mutex::new(Vec::with_capacity(FFT_SIZE))),
            analyser: Analyser::new(FFT_SIZE, SPECTRUM_BINS),
            stream: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    fn device_and_stream_config(
        device_name: Option<&str>,
    ) -> Result<(Device, StreamConfig), Box<dyn Error>> {
        let host = cpal::default_host();
        let device = match device_name {
            Some(name) => host
                .input_devices()?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| {
                    format!("Audio device '{}' not found", name)
                })?,
            None => host
                .default_input_device()
                .ok_or("No default audio input device")?,
        };

        let stream_config = device.default_input_config()?.into();
        Ok((device, stream_config))
    }
}

impl AudioSampler for InputSampler {
    fn start(&mut self) -> Result<(), Box<dyn Error>> {
        if self.stream.is_some() {
            return Ok(());
        }

        let (device, stream_config) =
            Self::device_and_stream_config(self.device_name.as_deref())?;

        let channels = stream_config.channels as usize;
        if channels < 1 {
            return Err("Device must have at least one channel".into());
        }

        let shared = self.samples.clone();
        let capacity = self.analyser.size();

        let stream = device.build_input_stream(
            &stream_config,
            move |data: &[f32], _| {
                let mut samples = shared.lock();
                samples.extend(data.iter().step_by(channels));
                let excess = samples.len().saturating_sub(capacity);
                if excess > 0 {
                    samples.drain(..excess);
                }
            },
            move |err| error!("Error in audio stream: {}", err),
            None,
        )?;

        stream.play()?;
        self.stream = Some(stream);
        info!(
            "Audio connected to device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        Ok(())
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            self.samples.lock().clear();
            debug!("Audio stream stopped");
        }
    }

    fn current(&self) -> AudioFrame {
        if self.stream.is_none() {
            return AudioFrame::silent();
        }
        let samples = self.samples.lock().clone();
        self.analyser.analyse(&samples)
    }
}

pub fn list_audio_devices() -> Result<Vec<String>, Box<dyn Error>> {
    let host = cpal::default_host();
    let mut devices = Vec::new();
    for device in host.input_devices()? {
        devices.push(device.name()?);
    }
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(bin: usize, size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| {
                (2.0 * std::f32::consts::PI * bin as f32 * i as f32
                    / size as f32)
                    .sin()
            })
            .collect()
    }

    #[test]
    fn silence_is_level_zero() {
        let analyser = Analyser::new(256, 16);
        let frame = analyser.analyse(&vec![0.0; 256]);
        assert_eq!(frame.level, 0.0);
        assert_eq!(frame.spectrum.len(), 16);
        assert!(frame.spectrum.iter().all(|&b| b == 0));
    }

    #[test]
    fn full_scale_sine_peaks_in_its_bin() {
        let analyser = Analyser::new(256, 16);
        // 128 usable bins / 16 = 8 FFT bins per spectrum bin; FFT bin 20
        // lands in spectrum bin 2.
        let frame = analyser.analyse(&sine(20, 256));
        assert!(frame.level > 0.95 && frame.level <= 1.0);
        assert_eq!(frame.spectrum[2], 255);
        assert!(frame.spectrum[10] < frame.spectrum[2]);
    }

    #[test]
    fn short_input_is_zero_padded() {
        let analyser = Analyser::new(256, 8);
        let frame = analyser.analyse(&[0.5; 10]);
        assert_eq!(frame.spectrum.len(), 8);
        assert!(frame.level > 0.0);
    }

    #[test]
    fn silent_sampler_reports_rest_state() {
        assert!(SilentSampler.current().is_silent());
    }
}
