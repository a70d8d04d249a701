use crate::provider::{PropertyProvider, Snapshot, SnapshotHub, SnapshotSink};
use crate::types::{TextureSource, UniformDescriptor};

use super::{Channel, Side, SlotId};

/// Publishes the committed position surface as `texturePosition` together
/// with the last step's `delta`.
pub struct SimulationProvider {
    hub: SnapshotHub,
}

impl SimulationProvider {
    pub fn new() -> Self {
        Self {
            hub: SnapshotHub::new(descriptors(SlotId::new(Channel::Position, Side::A), 0.0)),
        }
    }

    pub fn update(&self, position: SlotId, delta: f32) {
        self.hub.publish(descriptors(position, delta));
    }
}

impl Default for SimulationProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn descriptors(position: SlotId, delta: f32) -> Vec<UniformDescriptor> {
    vec![
        UniformDescriptor::texture("texturePosition", TextureSource::Surface(position)),
        UniformDescriptor::scalar("delta", delta),
    ]
}

impl PropertyProvider for SimulationProvider {
    fn name(&self) -> &str {
        "simulation"
    }

    fn snapshot(&self) -> Snapshot {
        self.hub.latest()
    }

    fn attach(&self, sink: SnapshotSink) {
        self.hub.attach(sink);
    }
}
