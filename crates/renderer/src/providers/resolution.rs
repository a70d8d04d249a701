use crate::provider::{PropertyProvider, Snapshot, SnapshotHub, SnapshotSink};
use crate::types::UniformDescriptor;

/// Publishes the render target size as `resolution`.
pub struct ResolutionProvider {
    hub: SnapshotHub,
}

impl ResolutionProvider {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            hub: SnapshotHub::new(descriptors(width, height)),
        }
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.hub.publish(descriptors(width, height));
    }
}

fn descriptors(width: u32, height: u32) -> Vec<UniformDescriptor> {
    vec![UniformDescriptor::vector2(
        "resolution",
        [width as f32, height as f32],
    )]
}

impl PropertyProvider for ResolutionProvider {
    fn name(&self) -> &str {
        "resolution"
    }

    fn snapshot(&self) -> Snapshot {
        self.hub.latest()
    }

    fn attach(&self, sink: SnapshotSink) {
        self.hub.attach(sink);
    }
}
