use std::sync::{Arc, Mutex, PoisonError};

use crate::audio::{AudioEvent, AudioFeatures, AudioSink, FeatureTracker};
use crate::provider::{PropertyProvider, Snapshot, SnapshotHub, SnapshotSink};
use crate::types::UniformDescriptor;

use super::ControlsProvider;

const DEFAULT_VOLUME: f32 = 1.0;
const DEFAULT_BEAT_CONSTANT: f32 = 1.4;

/// Publishes `loudness` and `accumulatedLoudness` for every audio tick.
///
/// Accumulation is weighted by the `volume` control and beat detection uses
/// `beatConstant` when a controls provider is attached.
pub struct LoudnessProvider {
    tracker: Mutex<FeatureTracker>,
    controls: Option<Arc<ControlsProvider>>,
    hub: SnapshotHub,
}

impl LoudnessProvider {
    pub fn new(controls: Option<Arc<ControlsProvider>>) -> Self {
        Self {
            tracker: Mutex::new(FeatureTracker::new()),
            controls,
            hub: SnapshotHub::new(descriptors(&AudioFeatures::default())),
        }
    }

    /// Latest features, including beat and EQ bands.
    pub fn features(&self) -> AudioFeatures {
        self.tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .features()
    }
}

fn descriptors(features: &AudioFeatures) -> Vec<UniformDescriptor> {
    vec![
        UniformDescriptor::scalar("loudness", features.loudness),
        UniformDescriptor::scalar("accumulatedLoudness", features.accumulated_loudness),
    ]
}

impl AudioSink for LoudnessProvider {
    fn on_audio(&self, event: &AudioEvent) {
        let (volume, beat_constant) = match &self.controls {
            Some(controls) => (
                controls.value_or("volume", DEFAULT_VOLUME),
                controls.value_or("beatConstant", DEFAULT_BEAT_CONSTANT),
            ),
            None => (DEFAULT_VOLUME, DEFAULT_BEAT_CONSTANT),
        };
        let features = self
            .tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update(event, volume, beat_constant);
        self.hub.publish(descriptors(&features));
    }
}

impl PropertyProvider for LoudnessProvider {
    fn name(&self) -> &str {
        "loudness"
    }

    fn snapshot(&self) -> Snapshot {
        self.hub.latest()
    }

    fn attach(&self, sink: SnapshotSink) {
        self.hub.attach(sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ControlParameter;

    #[test]
    fn volume_control_scales_accumulation() {
        let controls = Arc::new(ControlsProvider::new(vec![ControlParameter::new(
            "volume", 0.0, 2.0, 1.0,
        )]));
        let provider = LoudnessProvider::new(Some(controls.clone()));
        let event = AudioEvent::new(vec![128; 8], vec![128; 8]);

        provider.on_audio(&event);
        controls.set("volume", 0.5);
        provider.on_audio(&event);

        let snapshot = provider.snapshot();
        assert_eq!(snapshot[0].as_scalar(), Some(1.0));
        assert_eq!(snapshot[1].as_scalar(), Some(1.5));
    }
}
