use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::AudioEvent;

pub const MIN_DECIBELS: f32 = -100.0;
pub const MAX_DECIBELS: f32 = -30.0;
const SMOOTHING: f32 = 0.8;

/// Turns PCM samples into the byte spectra consumed by the providers.
///
/// Follows the usual analyser-node conventions: a Hann-windowed FFT over the
/// newest `fft_size` samples, magnitudes normalised by the FFT size and
/// smoothed over time, then mapped from `[MIN_DECIBELS, MAX_DECIBELS]` onto
/// `0..=255`. Only the lower `fft_size / 2` bins carry data; the rest stay
/// zero so both arrays share the FFT length.
pub struct AudioAnalyser {
    fft_size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    history: Vec<f32>,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl AudioAnalyser {
    pub fn new(fft_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        Self {
            fft_size,
            fft,
            window: (0..fft_size).map(|i| hann_window(i, fft_size)).collect(),
            history: vec![0.0; fft_size],
            smoothed: vec![0.0; fft_size / 2],
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Appends mono samples in `[-1, 1]`, keeping the newest `fft_size`.
    pub fn push_samples(&mut self, samples: &[f32]) {
        if samples.len() >= self.fft_size {
            self.history
                .copy_from_slice(&samples[samples.len() - self.fft_size..]);
            return;
        }
        self.history.drain(..samples.len());
        self.history.extend_from_slice(samples);
    }

    pub fn analyse(&mut self) -> AudioEvent {
        for ((slot, sample), weight) in self
            .scratch
            .iter_mut()
            .zip(&self.history)
            .zip(&self.window)
        {
            *slot = Complex::new(sample * weight, 0.0);
        }
        self.fft.process(&mut self.scratch);

        let scale = 1.0 / self.fft_size as f32;
        let mut frequency = vec![0u8; self.fft_size];
        for (bin, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.scratch[bin].norm() * scale;
            *smoothed = SMOOTHING * *smoothed + (1.0 - SMOOTHING) * magnitude;
            frequency[bin] = decibels_to_byte(*smoothed);
        }

        let time_domain = self
            .history
            .iter()
            .map(|sample| (128.0 + sample * 128.0).clamp(0.0, 255.0) as u8)
            .collect();

        AudioEvent::new(frequency, time_domain)
    }
}

fn decibels_to_byte(magnitude: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let decibels = 20.0 * magnitude.log10();
    let scaled = 255.0 * (decibels - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS);
    scaled.clamp(0.0, 255.0) as u8
}

pub fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_window_shape() {
        let size = 1024;
        assert!(hann_window(0, size).abs() < 0.01);
        assert!(hann_window(size - 1, size).abs() < 0.01);
        assert!((hann_window(size / 2, size) - 1.0).abs() < 0.01);
    }

    #[test]
    fn silence_maps_to_empty_spectrum_and_centred_waveform() {
        let mut analyser = AudioAnalyser::new(256);
        analyser.push_samples(&[0.0; 256]);
        let event = analyser.analyse();
        assert_eq!(event.frequency.len(), 256);
        assert!(event.frequency.iter().all(|&value| value == 0));
        assert!(event.time_domain.iter().all(|&value| value == 128));
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let size = 512;
        let bin = 32;
        let samples: Vec<f32> = (0..size)
            .map(|i| (2.0 * PI * bin as f32 * i as f32 / size as f32).sin() * 0.8)
            .collect();

        let mut analyser = AudioAnalyser::new(size);
        analyser.push_samples(&samples);
        // Let the smoothing settle.
        let mut event = analyser.analyse();
        for _ in 0..20 {
            event = analyser.analyse();
        }

        let peak = event.frequency[..size / 2]
            .iter()
            .enumerate()
            .max_by_key(|(_, value)| **value)
            .map(|(index, _)| index)
            .unwrap();
        assert!((peak as i64 - bin as i64).abs() <= 1);
        assert!(event.frequency[size / 2..].iter().all(|&value| value == 0));
    }

    #[test]
    fn push_keeps_newest_samples() {
        let mut analyser = AudioAnalyser::new(4);
        analyser.push_samples(&[0.5, 0.5]);
        analyser.push_samples(&[-1.0]);
        let event = analyser.analyse();
        assert_eq!(&event.time_domain[..], &[128, 192, 192, 0]);
    }
}
