use std::collections::VecDeque;

use super::AudioEvent;

/// Number of equal-width spectrum bands reported as `eqs`.
pub const EQ_BANDS: usize = 3;

/// Energy history length, roughly one second at 60 ticks per second.
const BEAT_HISTORY: usize = 43;
const BEAT_WARMUP: usize = 8;
const BEAT_DECAY: f32 = 0.9;

/// Per-tick audio summary consumed by the simulation and the providers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioFeatures {
    /// Mean spectrum byte divided by 128.
    pub loudness: f32,
    pub accumulated_loudness: f32,
    /// 1.0 on a detected beat, decaying towards zero afterwards.
    pub beat: f32,
    pub eqs: [f32; EQ_BANDS],
}

/// Flags ticks whose spectral energy exceeds the recent average by a factor.
#[derive(Debug, Default)]
pub struct BeatDetector {
    history: VecDeque<f32>,
    pulse: f32,
}

impl BeatDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, energy: f32, beat_constant: f32) -> f32 {
        let warmed_up = self.history.len() >= BEAT_WARMUP;
        let average = if self.history.is_empty() {
            0.0
        } else {
            self.history.iter().sum::<f32>() / self.history.len() as f32
        };

        if warmed_up && energy > 0.0 && energy > beat_constant * average {
            self.pulse = 1.0;
        } else {
            self.pulse *= BEAT_DECAY;
        }

        self.history.push_back(energy);
        if self.history.len() > BEAT_HISTORY {
            self.history.pop_front();
        }
        self.pulse
    }

    pub fn pulse(&self) -> f32 {
        self.pulse
    }
}

/// Folds audio events into [`AudioFeatures`], accumulating loudness.
#[derive(Debug, Default)]
pub struct FeatureTracker {
    beat: BeatDetector,
    features: AudioFeatures,
}

impl FeatureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn features(&self) -> AudioFeatures {
        self.features
    }

    pub fn update(&mut self, event: &AudioEvent, volume: f32, beat_constant: f32) -> AudioFeatures {
        let spectrum = &event.frequency[..];
        let loudness = if spectrum.is_empty() {
            0.0
        } else {
            spectrum.iter().map(|&value| f32::from(value)).sum::<f32>()
                / spectrum.len() as f32
                / 128.0
        };

        // Only the lower half of the spectrum carries analyser bins.
        let active = &spectrum[..spectrum.len() / 2];
        let energy = if active.is_empty() {
            0.0
        } else {
            active
                .iter()
                .map(|&value| {
                    let normalised = f32::from(value) / 255.0;
                    normalised * normalised
                })
                .sum::<f32>()
                / active.len() as f32
        };

        self.features = AudioFeatures {
            loudness,
            accumulated_loudness: self.features.accumulated_loudness + loudness * volume,
            beat: self.beat.update(energy, beat_constant),
            eqs: band_levels(active),
        };
        self.features
    }
}

fn band_levels(spectrum: &[u8]) -> [f32; EQ_BANDS] {
    let mut levels = [0.0; EQ_BANDS];
    let width = spectrum.len() / EQ_BANDS;
    if width == 0 {
        return levels;
    }
    for (band, level) in levels.iter_mut().enumerate() {
        let bins = &spectrum[band * width..(band + 1) * width];
        *level = bins.iter().map(|&value| f32::from(value)).sum::<f32>() / (width as f32 * 255.0);
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loudness_is_mean_over_128_and_accumulates_with_volume() {
        let mut tracker = FeatureTracker::new();
        let event = AudioEvent::new(vec![64; 16], vec![128; 16]);

        let first = tracker.update(&event, 1.0, 1.4);
        assert!((first.loudness - 0.5).abs() < 1e-6);
        assert!((first.accumulated_loudness - 0.5).abs() < 1e-6);

        let second = tracker.update(&event, 2.0, 1.4);
        assert!((second.accumulated_loudness - 1.5).abs() < 1e-6);
    }

    #[test]
    fn beat_fires_on_energy_spike_then_decays() {
        let mut detector = BeatDetector::new();
        for _ in 0..20 {
            assert_eq!(detector.update(0.1, 1.4), 0.0);
        }
        assert_eq!(detector.update(0.5, 1.4), 1.0);
        let decayed = detector.update(0.1, 1.4);
        assert!((decayed - 0.9).abs() < 1e-6);
    }

    #[test]
    fn eq_bands_split_lower_half() {
        let mut spectrum = vec![0u8; 12];
        spectrum[0..2].fill(255);
        let mut tracker = FeatureTracker::new();
        let features = tracker.update(&AudioEvent::new(spectrum, vec![128; 12]), 1.0, 1.4);
        assert_eq!(features.eqs, [1.0, 0.0, 0.0]);
    }
}
