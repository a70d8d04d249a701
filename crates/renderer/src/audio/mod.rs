//! Audio input plumbing.
//!
//! An `AudioEvent` carries one tick of analyser output: spectral magnitude
//! per bin and time-domain amplitude per sample, both as bytes and both as
//! long as the configured FFT size. `AudioManager` fans each event out to the
//! registered sinks (providers and the feature tracker).
mod analyser;
mod features;

use std::sync::Arc;

pub use analyser::{hann_window, AudioAnalyser, MAX_DECIBELS, MIN_DECIBELS};
pub use features::{AudioFeatures, BeatDetector, FeatureTracker, EQ_BANDS};

/// Default analyser size.
pub const FFT_SIZE: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct AudioEvent {
    pub frequency: Arc<[u8]>,
    pub time_domain: Arc<[u8]>,
}

impl AudioEvent {
    pub fn new(frequency: Vec<u8>, time_domain: Vec<u8>) -> Self {
        Self {
            frequency: frequency.into(),
            time_domain: time_domain.into(),
        }
    }

    /// Silence: empty spectrum and a centred waveform.
    pub fn silent(fft_size: usize) -> Self {
        Self::new(vec![0; fft_size], vec![128; fft_size])
    }
}

pub trait AudioSink: Send + Sync {
    fn on_audio(&self, event: &AudioEvent);
}

pub struct AudioManager {
    fft_size: usize,
    sinks: Vec<Arc<dyn AudioSink>>,
}

impl AudioManager {
    pub fn new(fft_size: usize) -> Self {
        Self {
            fft_size,
            sinks: Vec::new(),
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn register(&mut self, sink: Arc<dyn AudioSink>) {
        self.sinks.push(sink);
    }

    /// Dispatches `event` to every sink. Events whose buffers do not match the
    /// configured FFT size are dropped.
    pub fn dispatch(&self, event: &AudioEvent) -> bool {
        if event.frequency.len() != self.fft_size || event.time_domain.len() != self.fft_size {
            tracing::warn!(
                expected = self.fft_size,
                frequency = event.frequency.len(),
                time_domain = event.time_domain.len(),
                "audio event ignored due to mismatched buffer length"
            );
            return false;
        }

        for sink in &self.sinks {
            sink.on_audio(event);
        }
        true
    }
}
